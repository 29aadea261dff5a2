//! How to start the assistant process

use quotawait_config::{AssistantSettings, ProbeSettings};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::process::Command;

const PROMPT_PLACEHOLDER: &str = "{prompt}";

/// Program, argument template and environment for one assistant invocation.
///
/// `{prompt}` in any argument is replaced by the prompt; when no argument
/// carries the placeholder the prompt is appended as the last argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantCommand {
    pub program: String,
    pub args: Vec<String>,
    pub working_directory: Option<PathBuf>,
    pub env: HashMap<String, String>,
}

impl AssistantCommand {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            working_directory: None,
            env: HashMap::new(),
        }
    }

    pub fn from_settings(settings: &AssistantSettings) -> Self {
        Self {
            program: settings.command.clone(),
            args: settings.args.clone(),
            working_directory: settings.working_directory.as_ref().map(PathBuf::from),
            env: settings.env.clone(),
        }
    }

    /// Same program and environment, probe arguments.
    pub fn for_probe(settings: &AssistantSettings, probe: &ProbeSettings) -> Self {
        Self {
            args: probe.args.clone(),
            ..Self::from_settings(settings)
        }
    }

    pub fn render_args(&self, prompt: &str) -> Vec<String> {
        let mut substituted = false;
        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|arg| {
                if arg.contains(PROMPT_PLACEHOLDER) {
                    substituted = true;
                    arg.replace(PROMPT_PLACEHOLDER, prompt)
                } else {
                    arg.clone()
                }
            })
            .collect();

        if !substituted {
            args.push(prompt.to_string());
        }
        args
    }

    pub fn build(&self, prompt: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.render_args(prompt));
        cmd.envs(&self.env);
        if let Some(dir) = &self.working_directory {
            cmd.current_dir(dir);
        }
        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_substitution() {
        let cmd = AssistantCommand::new(
            "claude",
            vec!["-p".to_string(), "{prompt}".to_string(), "--verbose".to_string()],
        );
        assert_eq!(
            cmd.render_args("fix the bug"),
            vec!["-p", "fix the bug", "--verbose"]
        );
    }

    #[test]
    fn test_prompt_appended_without_placeholder() {
        let cmd = AssistantCommand::new("claude", vec!["--print".to_string()]);
        assert_eq!(cmd.render_args("hi"), vec!["--print", "hi"]);
    }

    #[test]
    fn test_probe_uses_probe_args() {
        let settings = AssistantSettings::default();
        let probe = ProbeSettings::default();
        let cmd = AssistantCommand::for_probe(&settings, &probe);
        assert_eq!(cmd.program, "claude");
        assert_eq!(cmd.render_args("ok?"), vec!["-p", "ok?"]);
    }
}
