use std::path::{Path, PathBuf};

use serde::Deserialize;
use zeroize::Zeroizing;

use crate::error::{Result, SyncError};
use crate::notion::NOTION_API_BASE;

pub const DEFAULT_CONCURRENCY: usize = 4;
pub const DEFAULT_CATEGORY: &str = "定投";

/// Optional values from `settings.json`, the command line, or the
/// environment. Later layers win field by field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub notion_token: Option<String>,
    pub fund_database_id: Option<String>,
    pub fund_buy_database_id: Option<String>,
    pub file_path: Option<String>,
    pub concurrency: Option<usize>,
    pub category_label: Option<String>,
    pub api_base: Option<String>,
}

/// Fully resolved configuration for one run.
pub struct SyncConfig {
    pub token: Zeroizing<String>,
    pub fund_database_id: String,
    pub fund_buy_database_id: String,
    pub file_path: PathBuf,
    pub concurrency: usize,
    pub category_label: String,
    pub api_base: String,
}

impl std::fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncConfig")
            .field("token", &"<redacted>")
            .field("fund_database_id", &self.fund_database_id)
            .field("fund_buy_database_id", &self.fund_buy_database_id)
            .field("file_path", &self.file_path)
            .field("concurrency", &self.concurrency)
            .field("category_label", &self.category_label)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl Settings {
    pub fn overlay(self, top: Settings) -> Settings {
        Settings {
            notion_token: top.notion_token.or(self.notion_token),
            fund_database_id: top.fund_database_id.or(self.fund_database_id),
            fund_buy_database_id: top.fund_buy_database_id.or(self.fund_buy_database_id),
            file_path: top.file_path.or(self.file_path),
            concurrency: top.concurrency.or(self.concurrency),
            category_label: top.category_label.or(self.category_label),
            api_base: top.api_base.or(self.api_base),
        }
    }

    pub fn into_config(self) -> Result<SyncConfig> {
        let token = non_empty(self.notion_token).ok_or(SyncError::MissingSetting("notion_token"))?;
        let fund_database_id =
            non_empty(self.fund_database_id).ok_or(SyncError::MissingSetting("fund_database_id"))?;
        let fund_buy_database_id = non_empty(self.fund_buy_database_id)
            .ok_or(SyncError::MissingSetting("fund_buy_database_id"))?;
        let file_path = non_empty(self.file_path).ok_or(SyncError::MissingSetting("file_path"))?;

        let concurrency = self.concurrency.unwrap_or(DEFAULT_CONCURRENCY);
        if concurrency == 0 {
            return Err(SyncError::Settings("concurrency must be at least 1".to_string()));
        }

        Ok(SyncConfig {
            token: Zeroizing::new(token),
            fund_database_id,
            fund_buy_database_id,
            file_path: PathBuf::from(expand_home(&file_path)),
            concurrency,
            category_label: non_empty(self.category_label)
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            api_base: non_empty(self.api_base).unwrap_or_else(|| NOTION_API_BASE.to_string()),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("fundsync")
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

/// Load `settings.json`. A missing default file is not an error; a missing
/// explicitly requested one is.
pub fn load_settings(explicit: Option<&Path>) -> Result<Settings> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => {
            let p = settings_path();
            if !p.exists() {
                return Ok(Settings::default());
            }
            p
        }
    };
    let content = std::fs::read_to_string(&path)
        .map_err(|e| SyncError::Settings(format!("{}: {e}", path.display())))?;
    serde_json::from_str(&content)
        .map_err(|e| SyncError::Settings(format!("{}: {e}", path.display())))
}

pub fn expand_home(path: &str) -> String {
    if let Some(rest) = path.strip_prefix('~') {
        if let Some(home) = dirs::home_dir() {
            return format!("{}{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full() -> Settings {
        Settings {
            notion_token: Some("secret_abc".into()),
            fund_database_id: Some("fund-db".into()),
            fund_buy_database_id: Some("buy-db".into()),
            file_path: Some("/tmp/export.csv".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_applied() {
        let config = full().into_config().unwrap();
        assert_eq!(config.concurrency, DEFAULT_CONCURRENCY);
        assert_eq!(config.category_label, "定投");
        assert_eq!(config.api_base, NOTION_API_BASE);
        assert_eq!(config.file_path, PathBuf::from("/tmp/export.csv"));
        assert_eq!(config.token.as_str(), "secret_abc");
    }

    #[test]
    fn test_missing_required_setting() {
        let mut s = full();
        s.fund_buy_database_id = None;
        assert!(matches!(
            s.into_config(),
            Err(SyncError::MissingSetting("fund_buy_database_id"))
        ));

        let mut blank = full();
        blank.notion_token = Some("   ".into());
        assert!(matches!(blank.into_config(), Err(SyncError::MissingSetting("notion_token"))));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let mut s = full();
        s.concurrency = Some(0);
        assert!(matches!(s.into_config(), Err(SyncError::Settings(_))));
    }

    #[test]
    fn test_overlay_prefers_top_layer() {
        let file = Settings {
            concurrency: Some(2),
            file_path: Some("/from/file.csv".into()),
            ..full()
        };
        let cli = Settings {
            file_path: Some("/from/cli.csv".into()),
            ..Default::default()
        };
        let merged = file.overlay(cli);
        assert_eq!(merged.file_path.as_deref(), Some("/from/cli.csv"));
        assert_eq!(merged.concurrency, Some(2));
        assert_eq!(merged.fund_database_id.as_deref(), Some("fund-db"));
    }

    #[test]
    fn test_load_settings_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"fund_database_id": "fund-db", "concurrency": 8}"#).unwrap();
        let s = load_settings(Some(&path)).unwrap();
        assert_eq!(s.fund_database_id.as_deref(), Some("fund-db"));
        assert_eq!(s.concurrency, Some(8));
        assert!(s.notion_token.is_none());
    }

    #[test]
    fn test_load_settings_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(matches!(load_settings(Some(&missing)), Err(SyncError::Settings(_))));

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{ not json").unwrap();
        assert!(matches!(load_settings(Some(&bad)), Err(SyncError::Settings(_))));
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = full().into_config().unwrap();
        let dbg = format!("{config:?}");
        assert!(!dbg.contains("secret_abc"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/abs/path.csv"), "/abs/path.csv");
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/a.csv"), format!("{}/a.csv", home.to_string_lossy()));
        }
    }
}
