pub mod sync;

use std::path::PathBuf;

use clap::Parser;

use crate::settings::Settings;

/// Every option may also come from the environment or `settings.json`.
#[derive(Parser, Debug)]
#[command(
    name = "fundsync",
    version,
    about = "Create Notion purchase records for every fund buy in a payment export."
)]
pub struct Cli {
    /// Export CSV to read
    #[arg(long, env = "FILE_PATH")]
    pub file: Option<String>,
    /// Notion integration token
    #[arg(long, env = "NOTION_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
    /// Fund directory database id
    #[arg(long = "fund-db", env = "FUND_DB_ID")]
    pub fund_db: Option<String>,
    /// Purchase records database id
    #[arg(long = "fund-buy-db", env = "FUND_BUY_DB_ID")]
    pub fund_buy_db: Option<String>,
    /// Concurrent writes (default 4)
    #[arg(long, env = "FUNDSYNC_CONCURRENCY")]
    pub concurrency: Option<usize>,
    /// Settings file (default: ~/.config/fundsync/settings.json)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Cli {
    pub fn to_settings(&self) -> Settings {
        Settings {
            notion_token: self.token.clone(),
            fund_database_id: self.fund_db.clone(),
            fund_buy_database_id: self.fund_buy_db.clone(),
            file_path: self.file.clone(),
            concurrency: self.concurrency,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_map_onto_settings() {
        let cli = Cli::try_parse_from([
            "fundsync",
            "--file",
            "/tmp/a.csv",
            "--fund-db",
            "f",
            "--fund-buy-db",
            "b",
            "--concurrency",
            "3",
        ])
        .unwrap();
        let s = cli.to_settings();
        assert_eq!(s.file_path.as_deref(), Some("/tmp/a.csv"));
        assert_eq!(s.fund_database_id.as_deref(), Some("f"));
        assert_eq!(s.fund_buy_database_id.as_deref(), Some("b"));
        assert_eq!(s.concurrency, Some(3));
        assert!(s.category_label.is_none());
    }

    #[test]
    fn test_rejects_subcommands() {
        assert!(Cli::try_parse_from(["fundsync", "sync"]).is_err());
    }
}
