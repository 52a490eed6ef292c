use crate::error::Error;
use chrono::{DateTime, TimeZone};
use std::result::Result;

//
// time
//

pub type SnTimeDuration = std::time::Duration;

#[macro_export]
macro_rules! SN_TIME_DURATION_MS {
    ($ms:expr) => {{
        std::time::Duration::from_millis($ms)
    }};
}

pub type SnDateTime = DateTime<chrono::Local>;

// seconds from 1970.1.1 with sub-second precision
pub type SnEpochF64 = f64;

pub fn get_sn_epoch_f64<Tz: TimeZone>(dt: &DateTime<Tz>) -> SnEpochF64 {
    dt.timestamp() as f64 + f64::from(dt.timestamp_subsec_nanos()) / 1_000_000_000.0
}

pub fn get_sn_now_epoch_f64() -> SnEpochF64 {
    get_sn_epoch_f64(&chrono::Utc::now())
}

//
// result
//

pub type SnRst<R> = Result<R, Error>;

//
// path
//

#[macro_export]
macro_rules! SnPathBufToString {
    ($x:expr) => {{
        $x.to_string_lossy().to_string()
    }};
}
