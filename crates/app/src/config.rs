use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use qa_core::model::RatioConvention;
use services::{AccessPolicy, ServiceSettings};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid --db value: {raw}")]
    InvalidDbUrl { raw: String },
}

/// Command-line and environment configuration for the server binary.
#[derive(Debug, Clone, Parser)]
#[command(name = "asr-qa", version, about = "Crop pronunciation ASR QA server")]
pub struct Args {
    /// Port to listen on.
    #[arg(long, env = "QA_PORT", default_value_t = 5000)]
    pub port: u16,

    /// Address to bind.
    #[arg(long, env = "QA_BIND", default_value = "0.0.0.0")]
    pub bind: IpAddr,

    /// SQLite URL or path, `sqlite::memory:`, or `memory` for the in-memory store.
    #[arg(long, env = "QA_DB_URL", default_value = "sqlite://asr_testing.sqlite3")]
    pub db: String,

    /// `attempts-made` or `fixed-budget`.
    #[arg(long, env = "QA_RATIO_CONVENTION", default_value = "attempts-made")]
    pub ratio_convention: RatioConvention,

    #[arg(long, env = "QA_STT_TIMEOUT_SECS", default_value_t = 30)]
    pub transcription_timeout_secs: u64,

    /// Email domain allowed to run tests; repeat for several. Empty allows all.
    #[arg(
        long = "allowed-domain",
        env = "QA_ALLOWED_DOMAINS",
        value_delimiter = ','
    )]
    pub allowed_domains: Vec<String>,

    /// Shuffle items at session start.
    #[arg(long, env = "QA_SHUFFLE_ITEMS")]
    pub shuffle_items: bool,
}

/// Where sessions and attempts are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageTarget {
    InMemory,
    Sqlite(String),
}

impl Args {
    #[must_use]
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    /// # Errors
    ///
    /// Returns `ConfigError::InvalidDbUrl` for a blank `--db`.
    pub fn storage_target(&self) -> Result<StorageTarget, ConfigError> {
        let raw = self.db.trim();
        if raw.is_empty() {
            return Err(ConfigError::InvalidDbUrl {
                raw: self.db.clone(),
            });
        }
        // A pooled `sqlite::memory:` gives every connection its own empty database.
        if raw.eq_ignore_ascii_case("memory") || raw == "sqlite::memory:" {
            return Ok(StorageTarget::InMemory);
        }
        Ok(StorageTarget::Sqlite(normalize_sqlite_url(raw)))
    }

    #[must_use]
    pub fn service_settings(&self) -> ServiceSettings {
        let access = if self.allowed_domains.is_empty() {
            AccessPolicy::allow_all()
        } else {
            AccessPolicy::with_domains(&self.allowed_domains)
        };
        ServiceSettings {
            ratio_convention: self.ratio_convention,
            transcription_timeout: Duration::from_secs(self.transcription_timeout_secs.max(1)),
            access,
            shuffle_items: self.shuffle_items,
        }
    }
}

fn is_in_memory_url(url: &str) -> bool {
    url == "sqlite::memory:" || url.contains("mode=memory")
}

/// Turn a bare path or `sqlite:` URL into an absolute `sqlite://` URL.
#[must_use]
pub fn normalize_sqlite_url(raw: &str) -> String {
    if is_in_memory_url(raw) || raw.starts_with("sqlite://") {
        return raw.to_owned();
    }

    let path_str = raw.strip_prefix("sqlite:").unwrap_or(raw);
    let path = Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// Create the database file and its parent directories if missing.
///
/// # Errors
///
/// Returns `ConfigError` for malformed URLs or `std::io::Error` when the file
/// cannot be created.
pub fn prepare_sqlite_file(db_url: &str) -> anyhow::Result<()> {
    if is_in_memory_url(db_url) {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ConfigError::InvalidDbUrl {
            raw: db_url.to_owned(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ConfigError::InvalidDbUrl {
            raw: db_url.to_owned(),
        }
        .into());
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        let mut full = vec!["asr-qa"];
        full.extend_from_slice(argv);
        Args::try_parse_from(full).unwrap()
    }

    #[test]
    fn memory_selects_in_memory_adapter() {
        let args = parse(&["--db", "memory"]);
        assert_eq!(args.storage_target().unwrap(), StorageTarget::InMemory);

        let args = parse(&["--db", "sqlite::memory:"]);
        assert_eq!(args.storage_target().unwrap(), StorageTarget::InMemory);

        let args = parse(&["--db", "sqlite:file:qa?mode=memory&cache=shared"]);
        assert_eq!(
            args.storage_target().unwrap(),
            StorageTarget::Sqlite("sqlite:file:qa?mode=memory&cache=shared".into())
        );
    }

    #[test]
    fn relative_paths_become_absolute_urls() {
        let url = normalize_sqlite_url("data/qa.sqlite3");
        assert!(url.starts_with("sqlite:///"));
        assert!(url.ends_with("data/qa.sqlite3"));
        assert_eq!(
            normalize_sqlite_url("sqlite:///tmp/qa.db"),
            "sqlite:///tmp/qa.db"
        );
        assert_eq!(normalize_sqlite_url("sqlite:/tmp/qa.db"), "sqlite:///tmp/qa.db");
    }

    #[test]
    fn settings_follow_flags() {
        let args = parse(&[
            "--ratio-convention",
            "fixed-budget",
            "--transcription-timeout-secs",
            "5",
            "--allowed-domain",
            "farm.example,@Coop.example",
            "--shuffle-items",
        ]);
        let settings = args.service_settings();
        assert_eq!(settings.ratio_convention, RatioConvention::FixedBudget);
        assert_eq!(settings.transcription_timeout, Duration::from_secs(5));
        assert_eq!(
            settings.access.allowed_domains(),
            ["farm.example", "coop.example"]
        );
        assert!(settings.shuffle_items);
        assert_eq!(args.socket_addr().port(), 5000);
    }

    #[test]
    fn blank_db_is_rejected() {
        let args = parse(&["--db", "  "]);
        assert!(matches!(
            args.storage_target(),
            Err(ConfigError::InvalidDbUrl { .. })
        ));
    }
}
