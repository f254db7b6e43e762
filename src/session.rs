//! One capture run: its identity, its paired output files, and the shared
//! active flag that every worker thread checks.
//!
//! A session's outputs all share a base path of
//! `<out_dir>/<unix_seconds>_<experiment_name>`, suffixed per stream:
//! `_samples.csv` for the cue-tagged sensor records, `_audio.wav` for the
//! audio stream, and `_meta.ron` for a small sidecar recording the
//! parameters that produced the run, so recordings stay interpretable
//! after the fact.

use crate::countdown::CueTiming;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Errors from session bookkeeping (metadata sidecar io/serialization).
#[derive(Debug)]
pub enum SessionError {
    /// Filesystem trouble with one of the session's files.
    Io(std::io::Error),
    /// Serializing the metadata sidecar failed.
    Ron(ron::Error),
    /// Reading a metadata sidecar back failed.
    RonSpanned(ron::de::SpannedError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Io(error) => write!(f, "io error: {}", error),
            SessionError::Ron(error) => write!(f, "ron error: {}", error),
            SessionError::RonSpanned(error) => write!(f, "ron error: {}", error),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<std::io::Error> for SessionError {
    fn from(value: std::io::Error) -> Self {
        SessionError::Io(value)
    }
}

impl From<ron::Error> for SessionError {
    fn from(value: ron::Error) -> Self {
        SessionError::Ron(value)
    }
}

impl From<ron::de::SpannedError> for SessionError {
    fn from(value: ron::de::SpannedError) -> Self {
        SessionError::RonSpanned(value)
    }
}

/// The sidecar describing how a recording was made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMeta {
    /// Experiment name as given on the command line.
    pub name: String,
    /// Wall-clock session start, unix seconds.
    pub started_unix: u64,
    /// Cue timing the countdown ran with.
    pub timing: CueTiming,
    /// RNG seed, when the schedule was reproducible.
    pub seed: Option<u64>,
}

impl SessionMeta {
    /// Read a sidecar back, e.g. when re-running analysis.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let text = fs::read_to_string(path)?;
        Ok(ron::de::from_str(&text)?)
    }
}

/// One capture run. Owned by the capture controller; everything else sees
/// it through the shared active flag or the derived file paths.
#[derive(Debug, Clone)]
pub struct Session {
    name: String,
    started_unix: u64,
    base: PathBuf,
    active: Arc<AtomicBool>,
}

impl Session {
    /// Open a new active session named `name`, rooted in `out_dir`.
    pub fn begin(out_dir: impl AsRef<Path>, name: &str) -> Self {
        let started_unix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or(0);
        let base = out_dir
            .as_ref()
            .join(format!("{}_{}", started_unix, name));

        Self {
            name: name.to_owned(),
            started_unix,
            base,
            active: Arc::new(AtomicBool::new(true)),
        }
    }

    /// The experiment name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wall-clock start in unix seconds; also the file-name prefix.
    pub fn started_unix(&self) -> u64 {
        self.started_unix
    }

    /// Path of the cue-tagged samples file.
    pub fn samples_path(&self) -> PathBuf {
        self.with_suffix("_samples.csv")
    }

    /// Path of the audio recording.
    pub fn audio_path(&self) -> PathBuf {
        self.with_suffix("_audio.wav")
    }

    /// Path of the metadata sidecar.
    pub fn meta_path(&self) -> PathBuf {
        self.with_suffix("_meta.ron")
    }

    /// Whether capture is still running. Checked by the ticker before every
    /// tick and by the pumps before every drain.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Mark the session finished. Idempotent; worker threads observe this
    /// on their next loop.
    pub fn end(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    /// Write the metadata sidecar next to the data files.
    pub fn write_meta(&self, timing: CueTiming, seed: Option<u64>) -> Result<(), SessionError> {
        let meta = SessionMeta {
            name: self.name.clone(),
            started_unix: self.started_unix,
            timing,
            seed,
        };
        let text = ron::ser::to_string(&meta)?;
        fs::write(self.meta_path(), text)?;
        Ok(())
    }

    fn with_suffix(&self, suffix: &str) -> PathBuf {
        let mut path = self.base.clone().into_os_string();
        path.push(suffix);
        PathBuf::from(path)
    }
}
