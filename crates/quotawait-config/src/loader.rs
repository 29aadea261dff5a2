use crate::schema::QuotawaitConfig;
use anyhow::{anyhow, Context, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Jsonc,
    Json,
    Yaml,
    Toml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;

        match ext {
            "jsonc" => Some(Self::Jsonc),
            "json" => Some(Self::Json),
            "yml" | "yaml" => Some(Self::Yaml),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: QuotawaitConfig,
    /// `None` when no file was found and defaults are in effect
    pub path: Option<PathBuf>,
    pub format: Option<ConfigFormat>,
}

/// Load configuration, falling back to defaults when no file exists.
///
/// An explicit `config_path` must exist and parse.
pub fn load_config(config_path: Option<&Path>) -> Result<QuotawaitConfig> {
    resolve_config(config_path).map(|r| r.config)
}

pub fn resolve_config(config_path: Option<&Path>) -> Result<ResolvedConfig> {
    if let Some(path) = config_path {
        return load_config_from_file(path);
    }

    match find_config_file() {
        Some(path) => load_config_from_file(&path),
        None => Ok(ResolvedConfig {
            config: QuotawaitConfig::default(),
            path: None,
            format: None,
        }),
    }
}

pub fn load_config_from_file(path: &Path) -> Result<ResolvedConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let format = ConfigFormat::from_path(path)
        .ok_or_else(|| anyhow!("Unknown config format for: {}", path.display()))?;

    let config = parse_config_content(&content, format)?;

    Ok(ResolvedConfig {
        config: expand_env_vars(config),
        path: Some(path.to_path_buf()),
        format: Some(format),
    })
}

fn parse_config_content(content: &str, format: ConfigFormat) -> Result<QuotawaitConfig> {
    match format {
        ConfigFormat::Jsonc => json5::from_str(content).context("Failed to parse JSONC"),
        ConfigFormat::Json => serde_json::from_str(content).context("Failed to parse JSON"),
        ConfigFormat::Yaml => {
            if content.trim().is_empty() {
                return Ok(QuotawaitConfig::default());
            }
            serde_yaml_ng::from_str(content).context("Failed to parse YAML")
        }
        ConfigFormat::Toml => toml::from_str(content).context("Failed to parse TOML"),
    }
}

const CONFIG_CANDIDATES: &[&str] = &[
    "quotawait.jsonc",
    "quotawait.json",
    "quotawait.yml",
    "quotawait.yaml",
    "quotawait.toml",
    ".quotawait.jsonc",
    ".quotawait.json",
    ".quotawait.yml",
    ".quotawait.yaml",
    ".quotawait.toml",
];

fn search_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![PathBuf::from(".")];
    if let Some(home) = dirs::home_dir() {
        dirs.push(home.join(".config").join("quotawait"));
    }
    dirs
}

fn find_config_file() -> Option<PathBuf> {
    find_config_file_in(&search_dirs())
}

/// First candidate that exists, searching `dirs` in order.
pub fn find_config_file_in(dirs: &[PathBuf]) -> Option<PathBuf> {
    dirs.iter()
        .flat_map(|dir| CONFIG_CANDIDATES.iter().map(move |c| dir.join(c)))
        .find(|path| path.exists())
}

fn expand_env_vars(mut config: QuotawaitConfig) -> QuotawaitConfig {
    let assistant = &mut config.assistant;
    assistant.command = expand_env_string(&assistant.command);
    assistant.args = assistant
        .args
        .iter()
        .map(|arg| expand_env_string(arg))
        .collect();
    if let Some(dir) = &assistant.working_directory {
        assistant.working_directory = Some(expand_env_string(dir));
    }
    for value in assistant.env.values_mut() {
        *value = expand_env_string(value);
    }

    config.probe.args = config
        .probe
        .args
        .iter()
        .map(|arg| expand_env_string(arg))
        .collect();

    if let Some(dir) = &config.state_dir {
        if let Some(s) = dir.to_str() {
            config.state_dir = Some(PathBuf::from(expand_env_string(s)));
        }
    }

    config
}

fn expand_env_string(s: &str) -> String {
    let mut result = String::new();
    let mut chars = s.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' {
            if chars.peek() == Some(&'{') {
                // ${VAR} syntax
                chars.next();
                let var_name: String = chars.by_ref().take_while(|&c| c != '}').collect();
                if let Ok(value) = env::var(&var_name) {
                    result.push_str(&value);
                } else {
                    result.push_str("${");
                    result.push_str(&var_name);
                    result.push('}');
                }
            } else {
                // $VAR syntax; peek so the delimiter survives
                let mut var_name = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' {
                        var_name.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if var_name.is_empty() {
                    result.push('$');
                } else if let Ok(value) = env::var(&var_name) {
                    result.push_str(&value);
                } else {
                    result.push('$');
                    result.push_str(&var_name);
                }
            }
        } else {
            result.push(ch);
        }
    }

    result
}
