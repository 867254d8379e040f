/// The "autogenerated" comment block placed on top of written files.
///
/// `command` is the invocation that produced the file; without one the
/// command lines are left out.
pub fn create_header(command: Option<&str>) -> String {
    let mut lines = vec![String::new()];
    match command.map(str::trim).filter(|c| !c.is_empty()) {
        Some(cmd) => lines.extend([
            "This file is autogenerated by p2c".to_owned(),
            "with the following command:".to_owned(),
            String::new(),
            format!("    $ {cmd}"),
            String::new(),
        ]),
        None => lines.push("This file is autogenerated by p2c.".to_owned()),
    }
    lines.extend([
        "You should not manually edit this file.".to_owned(),
        "Instead edit the corresponding pyproject.toml file.".to_owned(),
        String::new(),
    ]);
    lines
        .iter()
        .map(|line| {
            if line.is_empty() {
                "#".to_owned()
            } else {
                format!("# {line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prepend the header block to `text`.
pub fn add_header(text: &str, command: Option<&str>) -> String {
    format!("{}\n{text}", create_header(command))
}
