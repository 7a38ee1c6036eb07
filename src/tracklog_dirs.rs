//! Default filesystem locations for tracklog.
//!
//! Uses the [`dirs`] crate for platform-appropriate directory resolution.
//! Hosts that embed tracklog normally pass explicit paths through
//! [`TracklogConfig`](crate::config::TracklogConfig); these helpers only
//! supply the defaults.
//!
//! | Purpose | macOS | Linux |
//! |---------|-------|-------|
//! | Data | `~/Library/Application Support/tracklog/` | `~/.local/share/tracklog/` |
//! | Config | `~/Library/Application Support/tracklog/` | `~/.config/tracklog/` |

use std::path::PathBuf;

/// Database filename within the data directory.
pub const DB_FILENAME: &str = "records.db";

/// Application data root directory.
#[must_use]
pub fn data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("tracklog"))
        .unwrap_or_else(|| PathBuf::from("/tmp/tracklog-data"))
}

/// Application config directory.
#[must_use]
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("tracklog"))
        .unwrap_or_else(|| PathBuf::from("/tmp/tracklog-config"))
}

/// Default record database path (`data_dir()/records.db`).
#[must_use]
pub fn db_file() -> PathBuf {
    data_dir().join(DB_FILENAME)
}

/// Default config file path (`config_dir()/config.toml`).
#[must_use]
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_dir_contains_tracklog() {
        assert!(data_dir().to_string_lossy().contains("tracklog"));
    }

    #[test]
    fn db_file_is_subpath_of_data_dir() {
        let db = db_file();
        assert!(
            db.starts_with(data_dir()),
            "db_file ({}) should start with data_dir",
            db.display()
        );
        assert!(db.ends_with(DB_FILENAME));
    }

    #[test]
    fn config_file_ends_with_config_toml() {
        assert!(config_file().ends_with("config.toml"));
    }
}
