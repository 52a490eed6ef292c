// host
// > inbound integration points of the recording host
use crate::comm::SnRst;
use crate::error::Error;
use crate::settings::SessionSettings;
use std::path::PathBuf;

#[derive(strum_macros::Display, Debug, Clone, PartialEq)]
pub enum HostEvent {
    // lifecycle start, registers for stop notifications
    Load,

    // settings edited by the user, re-read and persist
    SettingsChanged(SessionSettings),

    // recording output has ceased, carries no payload
    RecordingStopped,

    Unload,
}

/// Where the host wrote the recording that just finished.
pub trait RecordingSource {
    fn finished_recording_path(&self) -> SnRst<PathBuf>;
}

/// Source for a host that hands the path over directly (the CLI).
pub struct GivenRecording {
    path: PathBuf,
}

impl GivenRecording {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        GivenRecording { path: path.into() }
    }
}

impl RecordingSource for GivenRecording {
    fn finished_recording_path(&self) -> SnRst<PathBuf> {
        if !self.path.is_file() {
            return Err(Error::InvalidPath(format!(
                "finished recording is not a file,{}",
                self.path.display()
            )));
        }

        Ok(self.path.clone())
    }
}
