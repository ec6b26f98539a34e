use std::time::Duration;

const DEFAULT_DATA_DIR: &str = "./data";
const DEFAULT_CONCURRENCY: usize = 4;
const DEFAULT_INTERVAL_SECS: u64 = 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Database file, `CMETRACK_DB_PATH`; falls back to `<CMETRACK_DATA_DIR>/cmetrack.db`
    pub db_path: String,
    /// Users processed concurrently in a batch
    pub concurrency: usize,
    pub log_format: LogFormat,
    /// Time between scheduled runs
    pub interval: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let db_path = lookup("CMETRACK_DB_PATH").unwrap_or_else(|| {
            let data_dir =
                lookup("CMETRACK_DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());
            format!("{}/cmetrack.db", data_dir.trim_end_matches('/'))
        });
        let concurrency = lookup("CMETRACK_CONCURRENCY")
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_CONCURRENCY);
        let log_format = match lookup("CMETRACK_LOG_FORMAT") {
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };
        let interval_secs = lookup("CMETRACK_INTERVAL_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_INTERVAL_SECS);

        Self {
            db_path,
            concurrency,
            log_format,
            interval: Duration::from_secs(interval_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let c = config(&[]);
        assert_eq!(c.db_path, "./data/cmetrack.db");
        assert_eq!(c.concurrency, DEFAULT_CONCURRENCY);
        assert_eq!(c.log_format, LogFormat::Text);
        assert_eq!(c.interval, Duration::from_secs(DEFAULT_INTERVAL_SECS));
    }

    #[test]
    fn test_overrides() {
        let c = config(&[
            ("CMETRACK_DATA_DIR", "/var/lib/cmetrack/"),
            ("CMETRACK_CONCURRENCY", "16"),
            ("CMETRACK_LOG_FORMAT", "JSON"),
            ("CMETRACK_INTERVAL_SECS", "300"),
        ]);
        assert_eq!(c.db_path, "/var/lib/cmetrack/cmetrack.db");
        assert_eq!(c.concurrency, 16);
        assert_eq!(c.log_format, LogFormat::Json);
        assert_eq!(c.interval, Duration::from_secs(300));

        let c = config(&[("CMETRACK_DB_PATH", "/tmp/x.db"), ("CMETRACK_DATA_DIR", "/ignored")]);
        assert_eq!(c.db_path, "/tmp/x.db");
    }

    #[test]
    fn test_invalid_numbers_fall_back() {
        let c = config(&[("CMETRACK_CONCURRENCY", "0"), ("CMETRACK_INTERVAL_SECS", "soon")]);
        assert_eq!(c.concurrency, DEFAULT_CONCURRENCY);
        assert_eq!(c.interval, Duration::from_secs(DEFAULT_INTERVAL_SECS));
    }
}
