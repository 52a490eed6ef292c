use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // std::fs read/write/remove
    #[error("{0}")]
    IoError(String),

    #[error("{0}")]
    InvalidPath(String),

    // series table (or settings file) cannot be located, read, parsed,
    // or the replace sequence cannot begin
    #[error("store is unavailable: {0}")]
    StoreUnavailable(String),

    // backup of a replace is still present, another writer is mid-replace
    #[error("store is busy, backup already exists: {0}")]
    StoreBusy(String),

    // only raised inside comm_fs::rename_with_retry
    #[error("file is busy: {0}")]
    TransientFileBusy(String),

    #[error("rename is failed after {0} attempts, e={1}")]
    RenameRetryExhausted(u32, String),

    #[error("format error: {0}")]
    FormatError(String),

    #[error("parsing is failed, err={0}")]
    ParsingFailed(String),

    #[error("invalid calling parameter, {0}")]
    InvalidCallingParameter(String),

    #[error("invalid config parameter, {0}")]
    InvalidConfigParameter(String),
}
