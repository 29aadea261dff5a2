//! CLI commands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// quotawait - run a coding assistant and resume it after quota resets
#[derive(Parser, Debug)]
#[command(name = "quotawait")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (searched in the working directory and
    /// ~/.config/quotawait when omitted)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Debug-level diagnostics on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the assistant on a task, scheduling a resume if its quota runs out
    Run {
        /// Prompt to execute
        #[arg(trailing_var_arg = true)]
        prompt: Vec<String>,

        /// Read the prompt from a file
        #[arg(long, conflicts_with_all = ["prompt", "continue_with"])]
        prompt_file: Option<PathBuf>,

        /// Continuation context handed back by a resume task (may start
        /// with `-`, e.g. a markdown checklist)
        #[arg(
            long = "continue",
            value_name = "CONTEXT",
            allow_hyphen_values = true,
            conflicts_with = "prompt"
        )]
        continue_with: Option<String>,

        /// Report quota exhaustion without scheduling a resume
        #[arg(long)]
        no_schedule: bool,
    },

    /// Classify a captured output stream and flag quota notices
    Classify {
        /// Capture file (stdin when omitted)
        file: Option<PathBuf>,
    },

    /// Parse a quota notice and show when the quota resets
    When {
        /// The notice text
        notice: String,

        /// Reference time (RFC 3339 or unix seconds) instead of now
        #[arg(long)]
        now: Option<String>,
    },

    /// Check whether the assistant is available right now
    Probe,

    /// Scheduled resume tasks
    Resume {
        #[command(subcommand)]
        command: ResumeCommands,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum ResumeCommands {
    /// List all resume tasks
    List,
    /// Show a task and the tail of its log
    Show {
        /// Task ID
        task_id: String,
        /// Number of log lines to show
        #[arg(long, default_value_t = 20)]
        lines: usize,
    },
    /// Stop a task's waiter
    Cancel {
        /// Task ID to cancel
        task_id: String,
    },
    /// Run a task's waiter in the foreground (for orphaned tasks)
    Run {
        /// Task ID to run
        task_id: String,
    },
    /// Remove finished tasks
    Prune,
    /// Detached waiter entry point
    #[command(hide = true)]
    Wait {
        task_id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Show which configuration file is in use
    Path,
}

impl Commands {
    pub fn prompt_text(prompt: &[String]) -> Option<String> {
        if prompt.is_empty() {
            None
        } else {
            Some(prompt.join(" "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_with_prompt() {
        let cli = Cli::parse_from(["quotawait", "run", "fix", "the", "bug"]);
        match cli.command {
            Some(Commands::Run { prompt, no_schedule, .. }) => {
                assert_eq!(Commands::prompt_text(&prompt).as_deref(), Some("fix the bug"));
                assert!(!no_schedule);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_continue() {
        let cli = Cli::parse_from(["quotawait", "--config", "q.toml", "run", "--continue", "ctx"]);
        assert_eq!(cli.config, Some(PathBuf::from("q.toml")));
        assert!(matches!(
            cli.command,
            Some(Commands::Run { continue_with: Some(ref c), .. }) if c == "ctx"
        ));
    }

    #[test]
    fn test_continue_accepts_leading_hyphen() {
        let cli = Cli::try_parse_from(["quotawait", "run", "--continue", "- [ ] implement the parser"]).unwrap();
        match cli.command {
            Some(Commands::Run { continue_with, prompt, .. }) => {
                assert_eq!(continue_with.as_deref(), Some("- [ ] implement the parser"));
                assert!(prompt.is_empty());
            }
            other => panic!("unexpected command: {:?}", other),
        }

        let cli = Cli::try_parse_from(["quotawait", "run", "--continue", "--verbose flag in text"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Run { continue_with: Some(ref c), .. }) if c == "--verbose flag in text"
        ));
    }

    #[test]
    fn test_prompt_and_file_conflict() {
        let result = Cli::try_parse_from(["quotawait", "run", "--prompt-file", "a.md", "inline"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_resume_show() {
        let cli = Cli::parse_from(["quotawait", "resume", "show", "resume-20250101-120000-000", "--lines", "5"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Resume {
                command: ResumeCommands::Show { lines: 5, .. }
            })
        ));
    }

    #[test]
    fn test_hidden_wait_parses() {
        let cli = Cli::parse_from(["quotawait", "resume", "wait", "resume-20250101-120000-000"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Resume {
                command: ResumeCommands::Wait { .. }
            })
        ));
    }
}
