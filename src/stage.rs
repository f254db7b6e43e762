//! Defines the Stage trait used by the capture pipeline. Each stage
//! consumes data from its input channel, processes it, and passes results
//! to its output channel, so writers can run off the capture threads
//! without back-pressuring the sensor.

use log::{info, warn};
use std::fmt;
use std::sync::mpsc::{Receiver, Sender};
use std::thread::{self, JoinHandle};

/// Errors a stage can hit while processing or finishing.
#[derive(Debug)]
pub enum StageError {
    /// A filesystem write failed.
    Io(std::io::Error),
    /// The WAV writer failed.
    Hound(hound::Error),
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageError::Io(error) => write!(f, "io error: {}", error),
            StageError::Hound(error) => write!(f, "wav error: {}", error),
        }
    }
}

impl std::error::Error for StageError {}

impl From<std::io::Error> for StageError {
    fn from(value: std::io::Error) -> Self {
        StageError::Io(value)
    }
}

impl From<hound::Error> for StageError {
    fn from(value: hound::Error) -> Self {
        StageError::Hound(value)
    }
}

/// One step of the capture pipeline. Implementors turn each incoming item
/// into an outgoing one; `finish` runs once the input side hangs up, for
/// flushing and finalizing sinks.
pub trait Stage {
    /// What the stage consumes.
    type In;
    /// What the stage produces.
    type Out;

    /// Short name used in log lines.
    fn name(&self) -> &'static str;

    /// Process one item.
    fn process(&mut self, input: Self::In) -> Self::Out;

    /// Clean up once the input channel closes.
    fn finish(&mut self) -> Result<(), StageError>;
}

/// Run `stage` on its own thread, pumping `input` through it into `output`.
/// The thread exits when every input sender is dropped.
pub fn run_stage<S: Stage + Send + 'static>(
    mut stage: S,
    input: Receiver<S::In>,
    output: Sender<S::Out>,
) -> JoinHandle<()>
where
    S::In: Send + 'static,
    S::Out: Send + 'static,
{
    thread::spawn(move || {
        while let Ok(data) = input.recv() {
            let out = stage.process(data);
            if output.send(out).is_err() {
                warn!("{}: result receiver hung up", stage.name());
            }
        }

        if let Err(error) = stage.finish() {
            warn!("{}: error while finishing: {}", stage.name(), error);
        }
        info!("{}: done", stage.name());
    })
}
