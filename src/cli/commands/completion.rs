//! completion command - Generate shell completion scripts

use crate::cli::args::{Cli, Shell};
use anyhow::Result;
use clap::CommandFactory;
use clap_complete::{generate, shells};
use std::io::Write;

/// Generate shell completion scripts on stdout.
pub fn completion(shell: Shell) -> Result<()> {
    let mut stdout = std::io::stdout();
    write_completion(shell, &mut stdout);
    stdout.flush()?;
    Ok(())
}

fn write_completion(shell: Shell, out: &mut dyn Write) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();

    match shell {
        Shell::Bash => generate(shells::Bash, &mut cmd, &name, out),
        Shell::Zsh => generate(shells::Zsh, &mut cmd, &name, out),
        Shell::Fish => generate(shells::Fish, &mut cmd, &name, out),
        Shell::PowerShell => generate(shells::PowerShell, &mut cmd, &name, out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripts_mention_subcommands() {
        for shell in [Shell::Bash, Shell::Zsh, Shell::Fish, Shell::PowerShell] {
            let mut buf = Vec::new();
            write_completion(shell, &mut buf);
            let script = String::from_utf8(buf).unwrap();
            assert!(script.contains("gitbatch"), "{:?}", shell);
            assert!(script.contains("pull"), "{:?}", shell);
        }
    }
}
