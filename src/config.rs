use crate::models::{Config, JiraCredentials, Webhooks};
use crate::state::STATE_DIR;
use anyhow::{Context, Result};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "config.toml";

/// Load configuration from file or use defaults, then apply the environment
///
/// Search order:
/// 1. Custom path if provided via --config (must exist)
/// 2. .debtbomb/config.toml under the scan root
/// 3. debtbomb/config.toml in the user config directory
/// 4. Built-in defaults
pub fn load_config(root: &Path, custom_path: Option<&Path>) -> Result<Config> {
    let mut config = find_config(root, custom_path)?;
    apply_env(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

fn find_config(root: &Path, custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()));
    }

    let repo_config = root.join(STATE_DIR).join(CONFIG_FILE);
    if repo_config.exists() {
        return load_config_from_file(&repo_config);
    }

    if let Some(user_config) = get_user_config_path() {
        if user_config.exists() {
            return load_config_from_file(&user_config);
        }
    }

    debug!("No config file found, using defaults");
    Ok(Config::default())
}

/// Load config from a specific file
fn load_config_from_file(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    debug!("Loaded config from {}", path.display());
    Ok(config)
}

fn get_user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("debtbomb").join(CONFIG_FILE))
}

/// Fill secrets from environment lookups; empty values count as unset
pub fn apply_env(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    config.jira.credentials = match (var("JIRA_BASE_URL"), var("JIRA_EMAIL"), var("JIRA_API_TOKEN")) {
        (Some(base_url), Some(email), Some(api_token)) => Some(JiraCredentials {
            base_url,
            email,
            api_token,
        }),
        _ => None,
    };

    config.webhooks = Webhooks {
        slack: var("SLACK_WEBHOOK_URL"),
        discord: var("DISCORD_WEBHOOK_URL"),
        teams: var("TEAMS_WEBHOOK_URL"),
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Channel, EventKind};
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_load_repo_config() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join(STATE_DIR);
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join(CONFIG_FILE),
            r#"
[jira]
default_project = "OPS"

[owners]
alice = "@alice"

[[notify]]
on = "expired"
via = "jira"

[[notify]]
on = "expiring_soon"
via = "slack"
days = 7
"#,
        )
        .unwrap();

        let config = find_config(temp_dir.path(), None).unwrap();
        assert_eq!(config.jira.default_project, "OPS");
        assert_eq!(config.jira.issue_type, "Task");
        assert_eq!(config.contact_for(Some("alice")), Some("@alice"));
        assert_eq!(config.notify.len(), 2);
        assert_eq!(config.notify[1].on, EventKind::ExpiringSoon);
        assert_eq!(config.notify[1].via, Channel::Slack);
        assert_eq!(config.notify[1].days, Some(7));
        assert!(config.wants_tickets_for_expired());
    }

    #[test]
    fn test_custom_config_must_exist() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope.toml");
        assert!(find_config(temp_dir.path(), Some(&missing)).is_err());
    }

    #[test]
    fn test_custom_config_overrides_repo() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[jira]\ndefault_project = \"CUSTOM\"\nissue_type = \"Bug\"\n")
            .unwrap();

        let config = find_config(Path::new("."), Some(temp_file.path())).unwrap();
        assert_eq!(config.jira.default_project, "CUSTOM");
        assert_eq!(config.jira.issue_type, "Bug");
    }

    #[test]
    fn test_invalid_channel_is_rejected() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[[notify]]\non = \"expired\"\nvia = \"carrier-pigeon\"\n")
            .unwrap();

        assert!(load_config_from_file(temp_file.path()).is_err());
    }

    #[test]
    fn test_apply_env() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("JIRA_BASE_URL", "https://example.atlassian.net"),
            ("JIRA_EMAIL", "bot@example.com"),
            ("JIRA_API_TOKEN", "secret"),
            ("SLACK_WEBHOOK_URL", "https://hooks.slack.test/x"),
            ("DISCORD_WEBHOOK_URL", ""),
        ]);

        let mut config = Config::default();
        apply_env(&mut config, |key| env.get(key).map(|v| v.to_string()));

        let credentials = config.jira.credentials.as_ref().unwrap();
        assert_eq!(credentials.email, "bot@example.com");
        assert_eq!(config.webhooks.url_for(Channel::Slack), Some("https://hooks.slack.test/x"));
        assert_eq!(config.webhooks.url_for(Channel::Discord), None);
        assert_eq!(config.webhooks.url_for(Channel::Teams), None);
    }

    #[test]
    fn test_partial_jira_env_disables_credentials() {
        let mut config = Config::default();
        apply_env(&mut config, |key| {
            (key == "JIRA_BASE_URL").then(|| "https://example.atlassian.net".to_string())
        });
        assert!(config.jira.credentials.is_none());
    }
}
