//! Process configuration, loaded from the environment.

use crate::error::{Result, SyncError};

pub const DEFAULT_BATCH_SIZE: usize = 500;
pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_MONGODB_DB: &str = "miraimusic";

/// Connection and tuning settings for a migration or sync run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string (source of truth).
    pub database_url: String,
    /// MongoDB connection URI (document store).
    pub mongodb_uri: String,
    /// Target MongoDB database name.
    pub mongodb_db: String,
    /// Page size for reads and upserts.
    pub batch_size: usize,
    /// Retries per page fetch before the table is marked failed.
    pub max_retries: u32,
}

impl Config {
    /// Load the full configuration for `migrate`/`sync` from the environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load only the relational side, for backfill scripts that never touch
    /// the document store.
    pub fn database_url_from_env() -> Result<String> {
        require(|var| std::env::var(var).ok(), "DATABASE_URL")
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_url = require(&lookup, "DATABASE_URL")?;
        let mongodb_uri = require(&lookup, "MONGODB_URI")?;
        let mongodb_db = lookup("MONGODB_DB").unwrap_or_else(|| DEFAULT_MONGODB_DB.to_owned());
        Ok(Self {
            database_url,
            mongodb_uri,
            mongodb_db,
            batch_size: parse_with_default(&lookup, "SYNC_BATCH_SIZE", DEFAULT_BATCH_SIZE),
            max_retries: parse_with_default(&lookup, "SYNC_MAX_RETRIES", DEFAULT_MAX_RETRIES),
        })
    }
}

fn require(lookup: impl Fn(&str) -> Option<String>, var: &str) -> Result<String> {
    match lookup(var) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(SyncError::Config(format!("{var} environment variable must be set"))),
    }
}

/// Parse an optional variable with a default fallback.
///
/// - Not set: returns `default` silently (expected case).
/// - Set but unparseable: logs a warning and returns `default`, rather than
///   silently swallowing the bad value.
fn parse_with_default<T: std::str::FromStr + std::fmt::Display>(
    lookup: impl Fn(&str) -> Option<String>,
    var: &str,
    default: T,
) -> T {
    match lookup(var) {
        Some(v) => match v.parse() {
            Ok(n) => n,
            Err(_) => {
                tracing::warn!(
                    var,
                    value = %v,
                    default = %default,
                    "invalid env var value, using default"
                );
                default
            },
        },
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_from<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |var| pairs.iter().find(|(k, _)| *k == var).map(|(_, v)| (*v).to_owned())
    }

    const BASE: &[(&str, &str)] = &[
        ("DATABASE_URL", "postgres://localhost/miraimusic"),
        ("MONGODB_URI", "mongodb://localhost:27017"),
    ];

    #[test]
    fn missing_database_url_is_an_error() {
        let err = Config::from_lookup(lookup_from(&[("MONGODB_URI", "mongodb://localhost")]))
            .unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn missing_mongodb_uri_is_an_error() {
        let err = Config::from_lookup(lookup_from(&[(
            "DATABASE_URL",
            "postgres://localhost/miraimusic",
        )]))
        .unwrap_err();
        assert!(err.to_string().contains("MONGODB_URI"));
    }

    #[test]
    fn empty_value_counts_as_missing() {
        let err = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", ""),
            ("MONGODB_URI", "mongodb://localhost"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn defaults_apply_when_optionals_are_absent() {
        let cfg = Config::from_lookup(lookup_from(BASE)).unwrap();
        assert_eq!(cfg.mongodb_db, DEFAULT_MONGODB_DB);
        assert_eq!(cfg.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(cfg.max_retries, DEFAULT_MAX_RETRIES);
    }

    #[test]
    fn optional_overrides_are_honored() {
        let mut pairs = BASE.to_vec();
        pairs.push(("MONGODB_DB", "miraimusic_staging"));
        pairs.push(("SYNC_BATCH_SIZE", "250"));
        pairs.push(("SYNC_MAX_RETRIES", "5"));
        let cfg = Config::from_lookup(lookup_from(&pairs)).unwrap();
        assert_eq!(cfg.mongodb_db, "miraimusic_staging");
        assert_eq!(cfg.batch_size, 250);
        assert_eq!(cfg.max_retries, 5);
    }

    #[test]
    fn unparseable_batch_size_falls_back_to_default() {
        let mut pairs = BASE.to_vec();
        pairs.push(("SYNC_BATCH_SIZE", "many"));
        let cfg = Config::from_lookup(lookup_from(&pairs)).unwrap();
        assert_eq!(cfg.batch_size, DEFAULT_BATCH_SIZE);
    }
}
