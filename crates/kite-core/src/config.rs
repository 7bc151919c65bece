use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_LOGIN_COMMAND: &str = "ocm backplane login {cluster_id}";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("config serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("no team selected, please run 'kite teams' to set a team")]
    MissingTeam,
    #[error("please enter a valid assigned-to option (got '{0}')")]
    InvalidAssignment(String),
    #[error("invalid column '{column}', valid columns are: {valid}")]
    InvalidColumn { column: String, valid: String },
    #[error("empty column specification")]
    EmptyColumns,
    #[error("invalid incident ID '{0}'")]
    InvalidIncidentId(String),
    #[error("no incident data source configured, pass --snapshot or set KITE_SNAPSHOT")]
    NoSnapshot,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct KiteConfig {
    #[serde(default)]
    pub team_id: String,
    #[serde(default)]
    pub team: String,
    /// Assignment aliases accepted by `--assigned-to`, name -> user id.
    #[serde(default)]
    pub named_users: BTreeMap<String, String>,
    #[serde(default)]
    pub login_command: Option<String>,
    #[serde(default)]
    pub shell: Option<String>,
    #[serde(default)]
    pub log_dir: Option<String>,
    #[serde(default)]
    pub snapshot: Option<PathBuf>,
}

impl KiteConfig {
    pub fn load() -> Result<Self, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = config_path().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "no config directory")
        })?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn login_command(&self) -> String {
        if let Ok(value) = std::env::var("KITE_LOGIN_COMMAND") {
            if !value.trim().is_empty() {
                return value;
            }
        }
        self.login_command
            .clone()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOGIN_COMMAND.to_string())
    }

    pub fn shell(&self) -> String {
        if let Some(shell) = self.shell.as_ref().filter(|value| !value.trim().is_empty()) {
            return shell.clone();
        }
        match std::env::var("SHELL") {
            Ok(value) if !value.trim().is_empty() => value,
            _ => "/bin/sh".to_string(),
        }
    }

    /// Snapshot path precedence: explicit flag, `KITE_SNAPSHOT`, config file.
    pub fn resolve_snapshot(&self, flag: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
        if let Some(path) = flag {
            return Ok(path);
        }
        if let Ok(value) = std::env::var("KITE_SNAPSHOT") {
            if !value.trim().is_empty() {
                return Ok(PathBuf::from(value.trim()));
            }
        }
        self.snapshot.clone().ok_or(ConfigError::NoSnapshot)
    }
}

pub fn config_path() -> Option<PathBuf> {
    if let Ok(value) = std::env::var("KITE_CONFIG") {
        if !value.trim().is_empty() {
            return Some(PathBuf::from(value.trim()));
        }
    }
    dirs::config_dir().map(|dir| dir.join("kite").join("config.toml"))
}

/// Expands `{cluster_id}` and `{cluster_name}` in a login command template.
/// Both values come from alert data and are shell-quoted, so each stays a
/// single word when the line is run through `$SHELL -c`.
pub fn render_login_command(template: &str, cluster_id: &str, cluster_name: &str) -> String {
    template
        .replace("{cluster_id}", &shell_words::quote(cluster_id))
        .replace("{cluster_name}", &shell_words::quote(cluster_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().expect("temp dir");
        let config = KiteConfig::load_from(&dir.path().join("absent.toml")).expect("load");
        assert_eq!(config, KiteConfig::default());
    }

    #[test]
    fn save_then_load_preserves_team_and_aliases() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("config.toml");
        let mut config = KiteConfig {
            team_id: "PTEAM01".to_string(),
            team: "SRE Platform".to_string(),
            ..KiteConfig::default()
        };
        config
            .named_users
            .insert("silentTest".to_string(), "PSILENT".to_string());
        config.save_to(&path).expect("save");

        let loaded = KiteConfig::load_from(&path).expect("load");
        assert_eq!(loaded.team_id, "PTEAM01");
        assert_eq!(
            loaded.named_users.get("silentTest").map(String::as_str),
            Some("PSILENT")
        );
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "team_id = [").expect("write");
        assert!(matches!(
            KiteConfig::load_from(&path),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn login_template_expands_placeholders() {
        let rendered = render_login_command(
            "ocm backplane login {cluster_id} # {cluster_name}",
            "c-42",
            "prod-east",
        );
        assert_eq!(rendered, "ocm backplane login c-42 # prod-east");
    }

    #[test]
    fn login_values_with_shell_syntax_stay_one_word() {
        let rendered = render_login_command(
            "ocm backplane login {cluster_id}",
            "abc; touch /tmp/kite_x",
            "",
        );
        assert_eq!(rendered, "ocm backplane login 'abc; touch /tmp/kite_x'");
        let words = shell_words::split(&rendered).expect("split");
        assert_eq!(words, vec!["ocm", "backplane", "login", "abc; touch /tmp/kite_x"]);

        let rendered = render_login_command("login {cluster_name}", "c-1", "it's $(id)");
        let words = shell_words::split(&rendered).expect("split");
        assert_eq!(words, vec!["login", "it's $(id)"]);
    }
}
