// naming
// > file name templating for finished recordings
use crate::comm::SnRst;
use crate::error::Error;
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, TimeZone};
use std::fmt::{Display, Write};

pub const DEF_SERIES_KEY: &str = "untitled";

// "%03d"
pub const PART_NUMBER_MIN_WIDTH: usize = 3;

/// Lower-cases, trims and turns every whitespace char into `_`. Empty input
/// becomes [`DEF_SERIES_KEY`].
pub fn normalize_series_key(name: &str) -> String {
    let key: String = name
        .trim()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .flat_map(char::to_lowercase)
        .collect();

    if key.is_empty() {
        return DEF_SERIES_KEY.to_string();
    }

    key
}

pub fn pad_part_number(number: u64) -> String {
    format!("{:0width$}", number, width = PART_NUMBER_MIN_WIDTH)
}

pub fn format_datetime<Tz>(dt: &DateTime<Tz>, fmt: &str) -> SnRst<String>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let items: Vec<Item> = StrftimeItems::new(fmt).collect();

    if items.iter().any(|i| matches!(i, Item::Error)) {
        return Err(Error::FormatError(format!(
            "invalid datetime format, fmt={}",
            fmt
        )));
    }

    let mut out = String::new();
    write!(out, "{}", dt.format_with_items(items.into_iter())).map_err(|_| {
        Error::FormatError(format!("failed to format datetime, fmt={}", fmt))
    })?;

    Ok(out)
}

/// `{datetime}_{series}_{nnn}` or `{series}_{nnn}_{datetime}`.
pub fn render_file_name(
    series_name: &str,
    part_number: u64,
    datetime: &str,
    datetime_first: bool,
) -> String {
    let padded = pad_part_number(part_number);

    if datetime_first {
        format!("{}_{}_{}", datetime, series_name, padded)
    } else {
        format!("{}_{}_{}", series_name, padded, datetime)
    }
}

/// Name without a part number, for recordings outside a series.
pub fn render_plain_file_name(series_name: &str, datetime: &str, datetime_first: bool) -> String {
    if datetime_first {
        format!("{}_{}", datetime, series_name)
    } else {
        format!("{}_{}", series_name, datetime)
    }
}

fn check_file_name(name: String) -> SnRst<String> {
    if name.contains(std::path::is_separator) || name.contains('\0') {
        return Err(Error::FormatError(format!(
            "rendered name is not a plain file name, name={}",
            name
        )));
    }

    Ok(name)
}

/// Formats `dt` with `fmt` and renders the base file name. `part_number`
/// of `None` renders a plain (non-series) name.
pub fn gen_file_name<Tz>(
    series_name: &str,
    part_number: Option<u64>,
    dt: &DateTime<Tz>,
    fmt: &str,
    datetime_first: bool,
) -> SnRst<String>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let datetime = format_datetime(dt, fmt)?;

    let name = match part_number {
        Some(n) => render_file_name(series_name, n, &datetime, datetime_first),
        None => render_plain_file_name(series_name, &datetime, datetime_first),
    };

    check_file_name(name)
}
