use serde::Deserialize;
use std::fs;

use crate::analyzer::AnalysisWindows;

fn default_active_window() -> i64 {
    60
}

fn default_new_member_window() -> i64 {
    30
}

fn default_trend_window() -> i64 {
    180
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Directory scanned for payment exports (newest file wins).
    pub export_dir: String,
    /// Explicit snapshot file; takes precedence over the export_dir scan.
    #[serde(default)]
    pub snapshot_file: Option<String>,
    /// Authoritative ledger file, fully rewritten on each successful merge.
    pub ledger_file: String,
    /// Where timestamped backups land; defaults to the ledger's directory.
    #[serde(default)]
    pub backup_dir: Option<String>,
    /// Dashboard JSON output path.
    pub output_file: String,
    #[serde(default = "default_active_window")]
    pub active_window_days: i64,
    #[serde(default = "default_new_member_window")]
    pub new_member_window_days: i64,
    #[serde(default = "default_trend_window")]
    pub trend_window_days: i64,
    /// Analysis-time override, mainly for testing; CLI flag wins over this.
    #[serde(default)]
    pub as_of: Option<String>,
}

impl AppConfig {
    pub fn windows(&self) -> AnalysisWindows {
        AnalysisWindows {
            active_days: self.active_window_days,
            new_member_days: self.new_member_window_days,
            trend_days: self.trend_window_days,
        }
    }
}

pub fn load_config(path: &str) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(path)?;
    let config: AppConfig = serde_json::from_str(&content)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn window_lengths_default_when_absent() {
        let raw = r#"{
            "export_dir": "exports",
            "ledger_file": "exports/payment_history_master.csv",
            "output_file": "dashboard_data.json"
        }"#;
        let config: AppConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.active_window_days, 60);
        assert_eq!(config.new_member_window_days, 30);
        assert_eq!(config.trend_window_days, 180);
        assert!(config.snapshot_file.is_none());
        assert!(config.backup_dir.is_none());
        assert!(config.as_of.is_none());
    }

    #[test]
    fn load_config_reads_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut file = fs::File::create(&path).unwrap();
        write!(
            file,
            r#"{{
                "export_dir": "exports",
                "ledger_file": "master.csv",
                "output_file": "out.json",
                "active_window_days": 90
            }}"#
        )
        .unwrap();

        let config = load_config(path.to_str().unwrap()).unwrap();
        assert_eq!(config.active_window_days, 90);
        assert_eq!(config.ledger_file, "master.csv");
    }
}
