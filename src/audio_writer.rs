//! The audio half of a capture session: a seam for whatever supplies audio
//! frames, a sine-tone reference source for the simulated rig, and a
//! wrapper for the hound library that writes the frames to the session's
//! WAV file.

use crate::stage::{Stage, StageError};
use hound::{SampleFormat, WavSpec, WavWriter};

use std::f32::consts::PI;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Whatever supplies the session's audio stream. The capture pipeline only
/// ever pulls; a source that has nothing to say returns an empty chunk.
pub trait AudioSource {
    /// Frames per second of the stream this source produces.
    fn sample_rate(&self) -> u32;

    /// Pull up to `frames` mono samples.
    fn next_chunk(&mut self, frames: usize) -> Vec<f32>;
}

/// A sine tone, standing in for a microphone on the simulated rig.
pub struct ToneSource {
    sample_rate: u32,
    freq: f32,
    t: u64,
}

impl ToneSource {
    /// A tone at `freq` Hz, sampled at `sample_rate`.
    pub fn new(sample_rate: u32, freq: f32) -> Self {
        Self {
            sample_rate,
            freq,
            t: 0,
        }
    }
}

impl AudioSource for ToneSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn next_chunk(&mut self, frames: usize) -> Vec<f32> {
        (0..frames)
            .map(|_| {
                let phase = self.t as f32 * self.freq / self.sample_rate as f32;
                self.t += 1;
                (phase * 2.0 * PI).sin() * 0.5
            })
            .collect()
    }
}

/// A pipeline stage that appends mono float frames to the session's WAV
/// file and finalizes the container when the session stops.
pub struct AudioWriter {
    // `Option` so `finish` can move the writer out for `finalize()`, which
    // consumes it.
    writer: Option<WavWriter<BufWriter<File>>>,
}

impl AudioWriter {
    /// Create the WAV file at `path`, mono 32-bit float at `sample_rate`.
    pub fn create(path: impl AsRef<Path>, sample_rate: u32) -> Result<Self, StageError> {
        let spec = WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let writer = WavWriter::create(path, spec)?;

        Ok(Self {
            writer: Some(writer),
        })
    }

    fn append(&mut self, frames: &[f32]) -> Result<(), StageError> {
        let writer = match self.writer.as_mut() {
            Some(writer) => writer,
            None => return Ok(()),
        };

        for &frame in frames {
            writer.write_sample(frame)?;
        }

        // Flush after each chunk so the WAV header stays consistent with
        // what is on disk if the process dies mid-session.
        writer.flush()?;
        Ok(())
    }
}

impl Stage for AudioWriter {
    type In = Vec<f32>;
    type Out = Result<(), StageError>;

    fn name(&self) -> &'static str {
        "audio writer"
    }

    fn process(&mut self, input: Vec<f32>) -> Result<(), StageError> {
        self.append(&input)
    }

    fn finish(&mut self) -> Result<(), StageError> {
        match self.writer.take() {
            Some(writer) => {
                writer.finalize()?;
                Ok(())
            }
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::WavReader;

    const SAMP_RATE: u32 = 44_100;

    #[test]
    fn tone_source_is_continuous_across_chunks() {
        let mut tone = ToneSource::new(SAMP_RATE, 440.0);
        let mut glued = tone.next_chunk(64);
        glued.extend(tone.next_chunk(64));

        let mut fresh = ToneSource::new(SAMP_RATE, 440.0);
        let whole = fresh.next_chunk(128);

        assert_eq!(glued, whole);
    }

    #[test]
    fn frames_round_trip_through_the_wav_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session_audio.wav");

        let mut tone = ToneSource::new(SAMP_RATE, 261.61);
        let frames = tone.next_chunk(1_000);

        let mut writer = AudioWriter::create(&path, SAMP_RATE).unwrap();
        writer.append(&frames).unwrap();
        writer.finish().unwrap();

        let mut reader = WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().channels, 1);
        assert_eq!(reader.spec().sample_rate, SAMP_RATE);

        let read_back = reader
            .samples::<f32>()
            .collect::<Result<Vec<f32>, hound::Error>>()
            .unwrap();
        assert_eq!(frames, read_back);
    }

    #[test]
    fn append_after_finish_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("closed.wav");

        let mut writer = AudioWriter::create(&path, SAMP_RATE).unwrap();
        writer.finish().unwrap();
        assert!(writer.append(&[0.0, 0.1]).is_ok());
        assert!(writer.finish().is_ok());
    }
}
