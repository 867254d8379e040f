mod commands;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::conda_requirements::Paths;
use commands::project::ProjectOptions;
use commands::{exit_code_for, RenderArgs, EXIT_CONFIG_ERROR, EXIT_SUCCESS};
use p2c_schema::Overwrite;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "p2c",
    version,
    about = "Render pyproject.toml dependencies as conda environments and pip requirements",
    infer_subcommands = true
)]
struct Cli {
    /// Path to the pyproject.toml file.
    #[arg(short = 'f', long = "file", default_value = "pyproject.toml", global = true)]
    file: PathBuf,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List available extras and configured envs.
    List {
        /// Output as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Create a conda environment file.
    Yaml {
        #[command(flatten)]
        args: RenderArgs,
        /// Output file (default: stdout).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Create a pip requirements file.
    #[command(visible_alias = "r")]
    Requirements {
        #[command(flatten)]
        args: RenderArgs,
        /// Output file (default: stdout).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Create plain conda and pip requirement lists.
    #[command(visible_alias = "c")]
    CondaRequirements {
        #[command(flatten)]
        args: RenderArgs,
        /// Write `<PREFIX>conda.txt` and `<PREFIX>pip.txt`.
        #[arg(long)]
        prefix: Option<String>,
        /// Prefix conda lines with the single configured channel.
        #[arg(long, default_value_t = false)]
        prepend_channel: bool,
        /// Conda list destination.
        path_conda: Option<PathBuf>,
        /// Pip list destination.
        path_pip: Option<PathBuf>,
    },
    /// Create a JSON representation (channels, dependencies, pip).
    Json {
        #[command(flatten)]
        args: RenderArgs,
        /// Output file (default: stdout).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Render in the format named by --format.
    Render {
        /// yaml, requirements, conda-requirements, or json.
        #[arg(long = "format", short = 't')]
        format: String,
        #[command(flatten)]
        args: RenderArgs,
        /// Output file (default: stdout).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Render every env in [tool.pyproject2conda.envs].
    Project {
        /// Only these envs (repeatable).
        #[arg(long = "envs", value_name = "ENV")]
        envs: Vec<String>,
        /// Print what would be written instead of writing.
        #[arg(long, default_value_t = false)]
        dry: bool,
        /// check, force, or skip; overrides each env's setting.
        #[arg(long)]
        overwrite: Option<Overwrite>,
        /// Delimiter between a requirement and its comment.
        #[arg(long, default_value = "#")]
        comment_marker: String,
    },
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
    /// Generate man pages in the specified directory.
    ManPages {
        /// Output directory for man pages.
        #[arg(default_value = "man")]
        dir: PathBuf,
    },
}

/// The invocation as typed, for the header of generated files.
fn header_command() -> String {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        "p2c".to_owned()
    } else {
        format!("p2c {}", args.join(" "))
    }
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    // usage errors are configuration errors; exit 2 means the manifest
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return ExitCode::from(if err.use_stderr() {
                EXIT_CONFIG_ERROR
            } else {
                EXIT_SUCCESS
            });
        }
    };

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("P2C_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let manifest = cli.file.as_path();
    let header_cmd = header_command();

    let result = match cli.command {
        Commands::List { json } => commands::list::run(manifest, json),
        Commands::Yaml { args, output } => {
            commands::yaml::run(manifest, &args, output.as_deref(), &header_cmd)
        }
        Commands::Requirements { args, output } => {
            commands::requirements::run(manifest, &args, output.as_deref(), &header_cmd)
        }
        Commands::CondaRequirements {
            args,
            prefix,
            prepend_channel,
            path_conda,
            path_pip,
        } => commands::conda_requirements::run(
            manifest,
            &args,
            &Paths {
                conda: path_conda,
                pip: path_pip,
                prefix,
            },
            prepend_channel,
            &header_cmd,
        ),
        Commands::Json { args, output } => {
            commands::json::run(manifest, &args, output.as_deref(), &header_cmd)
        }
        Commands::Render {
            format,
            args,
            output,
        } => commands::render::run(manifest, &format, &args, output.as_deref(), &header_cmd),
        Commands::Project {
            envs,
            dry,
            overwrite,
            comment_marker,
        } => commands::project::run(
            manifest,
            &ProjectOptions {
                envs: &envs,
                dry,
                overwrite,
                comment_marker: &comment_marker,
            },
        ),
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
        Commands::ManPages { dir } => commands::man_pages::run::<Cli>(&dir),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            ExitCode::from(exit_code_for(&msg))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn subcommands_match_by_prefix() {
        let cli = Cli::try_parse_from(["p2c", "y", "-e", "test"]).unwrap();
        assert!(matches!(cli.command, Commands::Yaml { .. }));
        let cli = Cli::try_parse_from(["p2c", "req"]).unwrap();
        assert!(matches!(cli.command, Commands::Requirements { .. }));
        let cli = Cli::try_parse_from(["p2c", "ren", "--format", "json"]).unwrap();
        assert!(matches!(cli.command, Commands::Render { .. }));
        // `co` is shared by completions and conda-requirements
        assert!(Cli::try_parse_from(["p2c", "co"]).is_err());
    }

    #[test]
    fn single_letter_aliases() {
        let cli = Cli::try_parse_from(["p2c", "r", "-e", "test"]).unwrap();
        assert!(matches!(cli.command, Commands::Requirements { .. }));
        let cli = Cli::try_parse_from(["p2c", "c", "--prefix", "out-"]).unwrap();
        assert!(matches!(cli.command, Commands::CondaRequirements { .. }));
        let cli = Cli::try_parse_from(["p2c", "l"]).unwrap();
        assert!(matches!(cli.command, Commands::List { .. }));
    }

    #[test]
    fn file_flag_is_global() {
        let cli = Cli::try_parse_from(["p2c", "list", "-f", "other.toml"]).unwrap();
        assert_eq!(cli.file, PathBuf::from("other.toml"));
    }
}
