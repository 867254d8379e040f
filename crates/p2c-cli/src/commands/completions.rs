use super::EXIT_SUCCESS;
use clap::CommandFactory;
use clap_complete::Shell;
use std::io::Write;

/// Completion script for `shell`, named after the command's binary.
pub fn script<C: CommandFactory>(shell: Shell) -> Vec<u8> {
    let mut cmd = C::command();
    let bin = cmd.get_name().to_owned();
    let mut buf = Vec::new();
    clap_complete::generate(shell, &mut cmd, bin, &mut buf);
    buf
}

pub fn run<C: CommandFactory>(shell: Shell) -> Result<u8, String> {
    let mut out = std::io::stdout().lock();
    out.write_all(&script::<C>(shell))
        .and_then(|()| out.flush())
        .map_err(|e| format!("failed to write {shell} completions: {e}"))?;
    Ok(EXIT_SUCCESS)
}
