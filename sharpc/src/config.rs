#![forbid(unsafe_code)]

use std::fs;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use serde::Deserialize;
use sharpc_parse::{ConvertConfig, LineEnding};
use thiserror::Error;

pub const CONFIG_FILE: &str = "sharpc.toml";

#[derive(Debug, Error, Diagnostic)]
#[error("config error: {message}")]
#[diagnostic(code(sharpc::config))]
pub struct ConfigError {
    pub message: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    format: Option<Format>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct Format {
    #[serde(default)]
    indent_width: Option<usize>,

    /// `crlf` or `lf`.
    #[serde(default)]
    line_ending: Option<String>,
}

/// Nearest `sharpc.toml` in `start` or one of its ancestors.
pub fn find_config(start: &Path) -> Option<PathBuf> {
    let mut cur = if start.is_file() {
        start.parent()?.to_path_buf()
    } else {
        start.to_path_buf()
    };

    loop {
        let candidate = cur.join(CONFIG_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }
        match cur.parent() {
            Some(p) => cur = p.to_path_buf(),
            None => return None,
        }
    }
}

pub fn parse_config(raw: &str, origin: &Path) -> Result<ConvertConfig, ConfigError> {
    let parsed: ConfigFile = toml::from_str(raw).map_err(|e| ConfigError {
        message: format!("failed to parse {}: {e}", origin.display()),
    })?;

    let mut config = ConvertConfig::default();
    let Some(format) = parsed.format else {
        return Ok(config);
    };

    if let Some(width) = format.indent_width {
        if width == 0 {
            return Err(ConfigError {
                message: format!("{}: indent-width must be at least 1", origin.display()),
            });
        }
        config.indent_width = width;
    }
    if let Some(name) = format.line_ending {
        config.line_ending = LineEnding::from_name(&name).ok_or_else(|| ConfigError {
            message: format!(
                "{}: unknown line-ending `{name}` (expected `crlf` or `lf`)",
                origin.display()
            ),
        })?;
    }
    Ok(config)
}

/// Loads the nearest config above `start`, or the defaults when there is none.
pub fn load_config(start: &Path) -> Result<(ConvertConfig, Option<PathBuf>), ConfigError> {
    let Some(path) = find_config(start) else {
        return Ok((ConvertConfig::default(), None));
    };
    let raw = fs::read_to_string(&path).map_err(|e| ConfigError {
        message: format!("failed to read {}: {e}", path.display()),
    })?;
    let config = parse_config(&raw, &path)?;
    Ok((config, Some(path)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(raw: &str) -> Result<ConvertConfig, ConfigError> {
        parse_config(raw, Path::new(CONFIG_FILE))
    }

    #[test]
    fn empty_file_keeps_defaults() {
        assert_eq!(parse("").unwrap(), ConvertConfig::default());
        assert_eq!(parse("[format]\n").unwrap(), ConvertConfig::default());
    }

    #[test]
    fn format_section_overrides() {
        let config = parse("[format]\nindent-width = 4\nline-ending = \"LF\"\n").unwrap();
        assert_eq!(
            config,
            ConvertConfig {
                indent_width: 4,
                line_ending: LineEnding::Lf,
            }
        );
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = parse("[format]\nline-ending = \"cr\"\n").unwrap_err();
        assert!(err.message.contains("unknown line-ending `cr`"), "{}", err.message);
        let err = parse("[format]\nindent-width = 0\n").unwrap_err();
        assert!(err.message.contains("indent-width"), "{}", err.message);
        let err = parse("[format]\ntabs = true\n").unwrap_err();
        assert!(err.message.starts_with("failed to parse"), "{}", err.message);
    }

    #[test]
    fn config_is_found_in_ancestors() {
        let root = std::env::temp_dir().join(format!("sharpc-config-{}", std::process::id()));
        let nested = root.join("src").join("app");
        fs::create_dir_all(&nested).unwrap();
        fs::write(root.join(CONFIG_FILE), "[format]\nindent-width = 3\n").unwrap();

        let (config, path) = load_config(&nested).unwrap();
        assert_eq!(config.indent_width, 3);
        assert_eq!(path, Some(root.join(CONFIG_FILE)));

        fs::remove_dir_all(&root).unwrap();
    }
}
