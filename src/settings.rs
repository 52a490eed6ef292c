// settings
// > user-tunable session settings, persisted as an INI file with one
//   [DEFAULT] section
use crate::comm::SnRst;
use crate::comm_fs;
use crate::error::Error;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEF_SERIES_PATH: &str = "series.json";
pub const DEF_DATETIME_FORMAT: &str = "%Y-%m-%d %H-%M-%S";

const INI_SECTION: &str = "DEFAULT";

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    // continue a numbered series, otherwise the table is not touched
    pub is_series: bool,
    pub series_path: String,
    pub datetime_format: String,
    pub datetime_first: bool,
    pub sort_latest: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        SessionSettings {
            is_series: true,
            series_path: DEF_SERIES_PATH.to_string(),
            datetime_format: DEF_DATETIME_FORMAT.to_string(),
            datetime_first: true,
            sort_latest: true,
        }
    }
}

// values are read as text and converted here, booleans must be the exact
// text written by `to_ini`
#[derive(Debug, Deserialize)]
struct RawSection {
    is_series: String,
    series_path: String,
    datetime_format: String,
    datetime_first: String,
    sort_latest: String,
}

#[derive(Debug, Deserialize)]
struct RawDoc {
    // the ini reader lower-cases section names
    #[serde(alias = "DEFAULT")]
    default: RawSection,
}

fn bool_to_text(b: bool) -> &'static str {
    if b {
        "true"
    } else {
        "false"
    }
}

fn parse_bool(key: &str, text: &str) -> SnRst<bool> {
    match text {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(Error::InvalidConfigParameter(format!(
            "{} must be 'true' or 'false', got '{}'",
            key, text
        ))),
    }
}

// the ini reader ends a value at `#` or `;`, unescapes `\`, trims it and
// unquotes it, so only values it hands back verbatim are written
fn check_ini_value(key: &str, value: &str) -> SnRst<()> {
    if let Some(c) = value.chars().find(|c| matches!(c, '#' | ';' | '\\' | '\n' | '\r')) {
        return Err(Error::InvalidConfigParameter(format!(
            "{} must not contain {:?}, got '{}'",
            key, c, value
        )));
    }

    if value.trim() != value {
        return Err(Error::InvalidConfigParameter(format!(
            "{} must not start or end with whitespace, got '{}'",
            key, value
        )));
    }

    if value.starts_with('"') || value.starts_with('\'') {
        return Err(Error::InvalidConfigParameter(format!(
            "{} must not start with a quote, got '{}'",
            key, value
        )));
    }

    Ok(())
}

impl SessionSettings {
    /// Rejects text values that would not load back unchanged.
    pub fn validate(&self) -> SnRst<()> {
        if self.series_path.is_empty() {
            return Err(Error::InvalidConfigParameter(
                "series_path must not be empty".to_string(),
            ));
        }

        check_ini_value("series_path", &self.series_path)?;
        check_ini_value("datetime_format", &self.datetime_format)
    }

    pub fn from_ini(text: &str) -> SnRst<Self> {
        let mut c = ::config::Config::new();

        c.merge(::config::File::from_str(text, ::config::FileFormat::Ini))
            .map_err(|e| Error::ParsingFailed(format!("settings ini, e={}", e)))?;

        let raw: RawDoc = c
            .try_into()
            .map_err(|e| Error::InvalidConfigParameter(format!("settings ini, e={}", e)))?;
        let raw = raw.default;

        Ok(SessionSettings {
            is_series: parse_bool("is_series", &raw.is_series)?,
            series_path: raw.series_path,
            datetime_format: raw.datetime_format,
            datetime_first: parse_bool("datetime_first", &raw.datetime_first)?,
            sort_latest: parse_bool("sort_latest", &raw.sort_latest)?,
        })
    }

    pub fn to_ini(&self) -> String {
        format!(
            "[{}]\n\
             is_series = {}\n\
             series_path = {}\n\
             datetime_format = {}\n\
             datetime_first = {}\n\
             sort_latest = {}\n",
            INI_SECTION,
            bool_to_text(self.is_series),
            self.series_path,
            self.datetime_format,
            bool_to_text(self.datetime_first),
            bool_to_text(self.sort_latest),
        )
    }

    pub fn load(path: &Path) -> SnRst<Self> {
        comm_fs::recover_replaced(path)?;

        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::StoreUnavailable(format!(
                "failed to read settings, path={}, e={}",
                path.display(),
                e
            ))
        })?;

        let settings = Self::from_ini(&text)?;

        log::debug!("[SessionSettings::load] path={}, {:?}", path.display(), settings);

        Ok(settings)
    }

    /// Persists through the replace protocol, or creates the file on first
    /// save. Nothing is written when [`SessionSettings::validate`] fails.
    pub fn save(&self, path: &Path) -> SnRst<()> {
        self.validate()?;

        let text = self.to_ini();

        comm_fs::recover_replaced(path)?;

        if path.exists() {
            comm_fs::safe_replace(path, text.as_bytes())?;
        } else {
            comm_fs::create_new_file(path, text.as_bytes())?;
        }

        log::debug!("[SessionSettings::save] path={}", path.display());

        Ok(())
    }

    /// `series_path`, with a relative path taken from the settings file's
    /// directory.
    pub fn resolve_series_path(&self, settings_path: &Path) -> PathBuf {
        let series_path = Path::new(&self.series_path);

        if series_path.is_absolute() {
            return series_path.to_path_buf();
        }

        match settings_path.parent() {
            Some(dir) => dir.join(series_path),
            None => series_path.to_path_buf(),
        }
    }
}
