use crate::manifest::ManifestError;
use crate::marker::CommentMarker;
use clap::Parser;

/// How a single requirement should be treated on the conda side.
///
/// Written in a comment as `p2c: [-p|--pip] [-s|--skip] [-c|--channel NAME] [PACKAGES...]`,
/// or supplied per package through `[tool.pyproject2conda.dependencies]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directive {
    /// Install with pip instead of conda.
    pub pip: bool,
    /// Leave the requirement out of the conda list.
    pub skip: bool,
    /// Conda channel prefix (`channel::requirement`).
    pub channel: Option<String>,
    /// Extra conda packages added after the requirement.
    pub packages: Vec<String>,
}

#[derive(Debug, Parser)]
#[command(
    name = "p2c:",
    no_binary_name = true,
    disable_help_flag = true,
    disable_version_flag = true
)]
struct DirectiveArgs {
    #[arg(short, long)]
    channel: Option<String>,
    #[arg(short, long)]
    pip: bool,
    #[arg(short, long)]
    skip: bool,
    packages: Vec<String>,
}

impl Directive {
    pub fn new(pip: bool, skip: bool, channel: Option<String>, packages: Vec<String>) -> Self {
        // a pip/pypi "channel" means install with pip
        let (pip, channel) = match channel.as_deref().map(str::trim) {
            Some("pip" | "pypi") => (true, None),
            Some("") => (pip, None),
            Some(c) => (pip, Some(c.to_owned())),
            None => (pip, None),
        };
        Self {
            pip,
            skip,
            channel,
            packages,
        }
    }

    /// Parse the directive embedded in `comment`, if there is one.
    pub fn from_comment(comment: &str, marker: &CommentMarker) -> Result<Option<Self>, ManifestError> {
        let Some((_, args_start, end)) = marker.directive_span(comment) else {
            return Ok(None);
        };
        let err = |message: String| ManifestError::Directive {
            comment: comment.to_owned(),
            message,
        };
        let tokens = split_args(&comment[args_start..end]).map_err(err)?;
        let args = DirectiveArgs::try_parse_from(tokens).map_err(|e| err(first_line(&e.to_string())))?;
        Ok(Some(Self::new(args.pip, args.skip, args.channel, args.packages)))
    }
}

fn first_line(s: &str) -> String {
    s.lines().next().unwrap_or_default().trim_start_matches("error: ").to_owned()
}

/// Shell-like word splitting: whitespace separates, single quotes are
/// literal, double quotes allow backslash escapes.
fn split_args(input: &str) -> Result<Vec<String>, String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(c) => current.push(c),
                        None => return Err("unterminated single quote".to_owned()),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(c) => current.push(c),
                            None => return Err("unterminated double quote".to_owned()),
                        },
                        Some(c) => current.push(c),
                        None => return Err("unterminated double quote".to_owned()),
                    }
                }
            }
            '\\' => {
                in_word = true;
                if let Some(c) = chars.next() {
                    current.push(c);
                }
            }
            c => {
                in_word = true;
                current.push(c);
            }
        }
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(comment: &str) -> Option<Directive> {
        Directive::from_comment(comment, &CommentMarker::default()).unwrap()
    }

    fn expected(pip: bool, skip: bool, channel: Option<&str>, packages: &[&str]) -> Option<Directive> {
        Some(Directive {
            pip,
            skip,
            channel: channel.map(str::to_owned),
            packages: packages.iter().map(|p| (*p).to_owned()).collect(),
        })
    }

    #[test]
    fn parses_flags() {
        assert_eq!(parse("p2c: --pip"), expected(true, false, None, &[]));
        assert_eq!(parse("p2c: -p"), expected(true, false, None, &[]));
        assert_eq!(parse("p2c: --skip"), expected(false, true, None, &[]));
        assert_eq!(parse("p2c: -s"), expected(false, true, None, &[]));
        assert_eq!(
            parse("p2c: -s -c conda-forge"),
            expected(false, true, Some("conda-forge"), &[])
        );
    }

    #[test]
    fn parses_packages() {
        assert_eq!(
            parse("p2c: athing>=0.3,<0.2 "),
            expected(false, false, None, &["athing>=0.3,<0.2"])
        );
        assert_eq!(
            parse("p2c: athing>=0.3,<0.2 bthing "),
            expected(false, false, None, &["athing>=0.3,<0.2", "bthing"])
        );
        assert_eq!(
            parse("p2c: -s 'spaced pkg >=1'"),
            expected(false, true, None, &["spaced pkg >=1"])
        );
    }

    #[test]
    fn directive_stops_at_next_marker() {
        assert_eq!(
            parse("p2c: -p # a comment"),
            expected(true, false, None, &[])
        );
        assert_eq!(
            parse("some other thing # p2c: -c conda-forge # another thing"),
            expected(false, false, Some("conda-forge"), &[])
        );
    }

    #[test]
    fn pip_channel_means_pip() {
        assert_eq!(parse("p2c: -c pip"), expected(true, false, None, &[]));
        assert_eq!(parse("p2c: --channel pypi"), expected(true, false, None, &[]));
    }

    #[test]
    fn no_directive() {
        assert_eq!(parse("just a note"), None);
        assert_eq!(parse("# p2c: -p"), None);
    }

    #[test]
    fn bad_option_is_error() {
        let err = Directive::from_comment("p2c: --bogus", &CommentMarker::default()).unwrap_err();
        assert!(matches!(err, ManifestError::Directive { .. }));
        assert!(err.to_string().contains("p2c: --bogus"));

        let err = Directive::from_comment("p2c: -c", &CommentMarker::default()).unwrap_err();
        assert!(matches!(err, ManifestError::Directive { .. }));
    }

    #[test]
    fn split_args_quoting() {
        assert_eq!(split_args(r#"a "b c" 'd e' f\ g"#).unwrap(), vec!["a", "b c", "d e", "f g"]);
        assert!(split_args("'open").is_err());
        assert!(split_args("\"open").is_err());
        assert!(split_args("   ").unwrap().is_empty());
    }
}
