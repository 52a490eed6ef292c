// config
// > process-level configuration: defaults < ./series-namer.{toml,yaml,json,ini}
//   < --config FILE < SNAMER_* environment
use crate::comm::{SnRst, SnTimeDuration};
use crate::comm_fs::RetryPolicy;
use crate::error::Error;
use duration_string::DurationString;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEF_CONFIG_NAME: &str = "series-namer";
pub const ENV_PREFIX: &str = "SNAMER";

pub const DEF_SETTINGS_PATH: &str = "series-settings.ini";
pub const DEF_LOG4RS_FILE: &str = "log4rs.yaml";
pub const DEF_RENAME_RETRY_MAX: i64 = 20;
pub const DEF_RENAME_RETRY_BACKOFF: &str = "250ms";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // session settings ini (is_series, series_path, ...)
    pub settings_path: String,

    pub log4rs_file: String,

    // media file rename, retried while the host still holds the file
    pub rename_retry_max: u32,
    pub rename_retry_backoff: String,
}

fn to_config_err(e: ::config::ConfigError) -> Error {
    Error::InvalidConfigParameter(e.to_string())
}

impl Config {
    pub fn load(file: Option<&Path>) -> SnRst<Self> {
        let mut c = ::config::Config::new();

        c.set_default("settings_path", DEF_SETTINGS_PATH)
            .map_err(to_config_err)?;
        c.set_default("log4rs_file", DEF_LOG4RS_FILE)
            .map_err(to_config_err)?;
        c.set_default("rename_retry_max", DEF_RENAME_RETRY_MAX)
            .map_err(to_config_err)?;
        c.set_default("rename_retry_backoff", DEF_RENAME_RETRY_BACKOFF)
            .map_err(to_config_err)?;

        c.merge(::config::File::with_name(DEF_CONFIG_NAME).required(false))
            .map_err(to_config_err)?;

        if let Some(path) = file {
            c.merge(::config::File::from(path).required(true))
                .map_err(to_config_err)?;
        }

        c.merge(::config::Environment::with_prefix(ENV_PREFIX))
            .map_err(to_config_err)?;

        let config: Config = c.try_into().map_err(to_config_err)?;

        // fail at startup, not at the first rename
        config.rename_retry()?;

        Ok(config)
    }

    pub fn settings_path(&self) -> PathBuf {
        PathBuf::from(&self.settings_path)
    }

    pub fn rename_retry(&self) -> SnRst<RetryPolicy> {
        if self.rename_retry_max == 0 {
            return Err(Error::InvalidConfigParameter(
                "rename_retry_max must be at least 1".to_string(),
            ));
        }

        let backoff: SnTimeDuration = DurationString::from_string(self.rename_retry_backoff.clone())
            .map_err(|e| {
                Error::InvalidConfigParameter(format!(
                    "rename_retry_backoff={}, e={}",
                    self.rename_retry_backoff, e
                ))
            })?
            .into();

        Ok(RetryPolicy {
            max_attempts: self.rename_retry_max,
            backoff,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn with_file(body: &str) -> SnRst<Config> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("namer.toml");
        fs::write(&path, body).unwrap();
        Config::load(Some(path.as_path()))
    }

    #[test]
    fn file_overrides_defaults() {
        let config = with_file(
            "settings_path = \"/tmp/namer/settings.ini\"\nrename_retry_backoff = \"1s\"\n",
        )
        .unwrap();

        assert_eq!(config.settings_path(), PathBuf::from("/tmp/namer/settings.ini"));
        assert_eq!(config.log4rs_file, DEF_LOG4RS_FILE);

        let retry = config.rename_retry().unwrap();
        assert_eq!(retry.max_attempts, 20);
        assert_eq!(retry.backoff, SnTimeDuration::from_secs(1));
    }

    #[test]
    fn rejects_bad_backoff() {
        let err = with_file("rename_retry_backoff = \"soon\"\n").unwrap_err();
        assert!(matches!(err, Error::InvalidConfigParameter(_)), "{err}");
    }

    #[test]
    fn rejects_zero_retries() {
        let err = with_file("rename_retry_max = 0\n").unwrap_err();
        assert!(matches!(err, Error::InvalidConfigParameter(_)), "{err}");
    }
}
