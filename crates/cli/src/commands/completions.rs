//! Shell completion generation
//!
//! Scripts for bash, zsh, fish and powershell.

use clap::CommandFactory;
use clap_complete::Shell;

use super::Cli;
use crate::exit_code::ExitCode;

/// Arguments for the completions command
#[derive(clap::Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Print the completion script for `args.shell` to stdout
pub fn execute(args: CompletionsArgs) -> ExitCode {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(args.shell, &mut cmd, name, &mut std::io::stdout());
    ExitCode::Success
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generate(shell: Shell) -> String {
        let mut cmd = Cli::command();
        let mut buf = Vec::new();
        clap_complete::generate(shell, &mut cmd, "selstore", &mut buf);
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_completions_cover_subcommands() {
        let zsh = generate(Shell::Zsh);
        assert!(zsh.contains("compdef"));
        for subcommand in ["account", "put", "rm", "ln", "share"] {
            assert!(zsh.contains(subcommand), "zsh completions miss {subcommand}");
        }
        assert!(zsh.contains("--best-effort"));

        let bash = generate(Shell::Bash);
        assert!(bash.contains("selstore") && bash.contains("share"));
    }
}
