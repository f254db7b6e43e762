//! The append-only sink for cue-tagged accelerometer records.
//!
//! Every record pairs a reading with its elapsed time since the first
//! sample of the session and the fire flag sampled at the same instant:
//!
//! ```text
//! <t_ms> <x> <y> <z> <firing>
//! ```
//!
//! one line per sample, space separated, booleans as `true`/`false`. The
//! analysis tooling reads this exact shape and nothing else. Records are
//! never rewritten once appended.

use crate::stage::{Stage, StageError};

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// One cue-tagged sample, immutable once created.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleRecord {
    /// Milliseconds since the session's first sample.
    pub elapsed_ms: u64,
    /// X acceleration in m/s².
    pub x: f32,
    /// Y acceleration in m/s².
    pub y: f32,
    /// Z acceleration in m/s².
    pub z: f32,
    /// Whether the cue cycle was in its fire window at the capture instant.
    pub firing: bool,
}

impl fmt::Display for SampleRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {}",
            self.elapsed_ms, self.x, self.y, self.z, self.firing
        )
    }
}

/// A buffered writer that appends [`SampleRecord`]s to the session's
/// samples file, running as a pipeline stage.
pub struct SampleWriter {
    out: BufWriter<File>,
}

impl SampleWriter {
    /// Create the samples file at `path` and wrap it for appending.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, StageError> {
        let file = File::create(path)?;
        Ok(Self {
            out: BufWriter::new(file),
        })
    }

    fn append(&mut self, record: &SampleRecord) -> Result<(), StageError> {
        writeln!(self.out, "{}", record)?;
        Ok(())
    }
}

impl Stage for SampleWriter {
    type In = SampleRecord;
    type Out = Result<(), StageError>;

    fn name(&self) -> &'static str {
        "sample writer"
    }

    fn process(&mut self, input: SampleRecord) -> Result<(), StageError> {
        self.append(&input)
    }

    fn finish(&mut self) -> Result<(), StageError> {
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::run_stage;
    use std::fs;
    use std::sync::mpsc::channel;

    #[test]
    fn record_line_shape() {
        let record = SampleRecord {
            elapsed_ms: 1234,
            x: 0.25,
            y: -1.5,
            z: 9.8,
            firing: true,
        };
        assert_eq!(record.to_string(), "1234 0.25 -1.5 9.8 true");
    }

    #[test]
    fn records_land_in_the_file_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session_samples.csv");

        let mut writer = SampleWriter::create(&path).unwrap();
        for (i, firing) in [false, false, true].iter().enumerate() {
            writer
                .append(&SampleRecord {
                    elapsed_ms: i as u64 * 5,
                    x: 0.0,
                    y: 1.0,
                    z: 2.0,
                    firing: *firing,
                })
                .unwrap();
        }
        writer.finish().unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines, vec!["0 0 1 2 false", "5 0 1 2 false", "10 0 1 2 true"]);
    }

    #[test]
    fn writer_runs_as_a_stage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("staged_samples.csv");

        let writer = SampleWriter::create(&path).unwrap();
        let (record_tx, record_rx) = channel::<SampleRecord>();
        let (result_tx, result_rx) = channel::<Result<(), StageError>>();

        let handle = run_stage(writer, record_rx, result_tx);

        record_tx
            .send(SampleRecord {
                elapsed_ms: 7,
                x: 0.5,
                y: 0.5,
                z: 0.5,
                firing: false,
            })
            .unwrap();
        assert!(result_rx.recv().unwrap().is_ok());

        // Dropping the sender lets the stage flush and exit.
        drop(record_tx);
        handle.join().unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "7 0.5 0.5 0.5 false\n");
    }
}
