//! The capture controller: wires a sample source, the cue countdown, the
//! writer stages, and the status publisher into one running session.
//!
//! Thread layout per session:
//!
//! - a ticker that advances the countdown every 100 ms, checking the
//!   session's active flag *before* each tick so a stop is observed at the
//!   next tick at the latest,
//! - a sensor pump that drains the sample source, stamps each reading with
//!   elapsed time since the session's first sample, reads the fire flag at
//!   that same instant, and hands the record to the sample-writer stage,
//! - optionally an audio pump feeding the WAV-writer stage at real-time
//!   pace.
//!
//! Sink errors are logged, never propagated back into the countdown; the
//! cue cycle does not depend on any consumer's success.

use crate::audio_writer::{AudioSource, AudioWriter};
use crate::countdown::{Countdown, CountdownError, CueJitter, CueTiming, PromptLabel, TICK_INTERVAL};
use crate::sample_source::SampleSource;
use crate::sample_writer::{SampleRecord, SampleWriter};
use crate::session::{Session, SessionError};
use crate::stage::{run_stage, StageError};
use crate::status::{SessionStatus, StatusPublisher};

use log::{info, warn};
use spin_sleep::SpinSleeper;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{channel, Receiver};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// How long the sensor pump naps when the source has nothing buffered.
const DRAIN_INTERVAL: Duration = Duration::from_millis(5);

/// Everything needed to open a session.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Experiment name; becomes part of every output file name.
    pub name: String,
    /// Directory the output files land in.
    pub out_dir: PathBuf,
    /// Cue timing for the countdown.
    pub timing: CueTiming,
    /// Seed recorded in the metadata sidecar when the schedule is
    /// reproducible.
    pub seed: Option<u64>,
}

/// Errors from opening a session.
#[derive(Debug)]
pub enum CaptureError {
    /// The cue timing was rejected.
    Countdown(CountdownError),
    /// Session bookkeeping failed (metadata sidecar).
    Session(SessionError),
    /// A writer stage could not create its output file.
    Stage(StageError),
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::Countdown(error) => write!(f, "cue countdown: {}", error),
            CaptureError::Session(error) => write!(f, "session: {}", error),
            CaptureError::Stage(error) => write!(f, "writer stage: {}", error),
        }
    }
}

impl std::error::Error for CaptureError {}

impl From<CountdownError> for CaptureError {
    fn from(value: CountdownError) -> Self {
        CaptureError::Countdown(value)
    }
}

impl From<SessionError> for CaptureError {
    fn from(value: SessionError) -> Self {
        CaptureError::Session(value)
    }
}

impl From<StageError> for CaptureError {
    fn from(value: StageError) -> Self {
        CaptureError::Stage(value)
    }
}

/// A running capture session. Read the live cue state off it for display,
/// then [`CaptureHandle::stop`] it to finalize the output files.
pub struct CaptureHandle {
    session: Session,
    countdown: Arc<Mutex<Countdown>>,
    samples_written: Arc<AtomicU64>,
    publisher: Box<dyn StatusPublisher + Send>,
    workers: Vec<JoinHandle<()>>,
    stages: Vec<JoinHandle<()>>,
    stage_results: Vec<Receiver<Result<(), StageError>>>,
}

/// Open a session: create the output files, start the countdown, spawn the
/// worker threads, and announce the start.
///
/// The sample source is shared so the caller can keep controlling it (e.g.
/// stopping a simulated rig) while the pump drains it.
pub fn start_capture<S>(
    config: CaptureConfig,
    source: Arc<Mutex<S>>,
    audio: Option<Box<dyn AudioSource + Send>>,
    publisher: Box<dyn StatusPublisher + Send>,
    jitter: Box<dyn CueJitter + Send>,
) -> Result<CaptureHandle, CaptureError>
where
    S: SampleSource + Send + 'static,
{
    let mut countdown = Countdown::new(jitter);
    countdown.start(config.timing)?;
    let countdown = Arc::new(Mutex::new(countdown));

    fs::create_dir_all(&config.out_dir).map_err(SessionError::from)?;
    let session = Session::begin(&config.out_dir, &config.name);
    session.write_meta(config.timing, config.seed)?;
    info!("writing sensor data to: {}", session.samples_path().display());

    let samples_written = Arc::new(AtomicU64::new(0));
    let mut workers = Vec::new();
    let mut stages = Vec::new();
    let mut stage_results = Vec::new();

    // Sample sink.
    let sample_writer = SampleWriter::create(session.samples_path())?;
    let (record_tx, record_rx) = channel::<SampleRecord>();
    let (sample_result_tx, sample_result_rx) = channel();
    stages.push(run_stage(sample_writer, record_rx, sample_result_tx));
    stage_results.push(sample_result_rx);

    // Audio sink, when a source was supplied.
    if let Some(audio_source) = audio {
        info!("writing audio to: {}", session.audio_path().display());
        let audio_writer = AudioWriter::create(session.audio_path(), audio_source.sample_rate())?;
        let (frame_tx, frame_rx) = channel::<Vec<f32>>();
        let (audio_result_tx, audio_result_rx) = channel();
        stages.push(run_stage(audio_writer, frame_rx, audio_result_tx));
        stage_results.push(audio_result_rx);
        workers.push(spawn_audio_pump(session.clone(), audio_source, frame_tx));
    }

    workers.push(spawn_ticker(session.clone(), Arc::clone(&countdown)));
    workers.push(spawn_sensor_pump(
        session.clone(),
        Arc::clone(&countdown),
        source,
        record_tx,
        Arc::clone(&samples_written),
    ));

    publisher.publish(&SessionStatus::Started {
        name: session.name().to_owned(),
    });

    Ok(CaptureHandle {
        session,
        countdown,
        samples_written,
        publisher,
        workers,
        stages,
        stage_results,
    })
}

impl CaptureHandle {
    /// The session being recorded.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Current prompt text, for the display sink.
    pub fn label(&self) -> PromptLabel {
        self.countdown.lock().unwrap().label()
    }

    /// Current fire flag.
    pub fn is_firing(&self) -> bool {
        self.countdown.lock().unwrap().is_firing()
    }

    /// Records handed to the sample sink so far.
    pub fn sample_count(&self) -> u64 {
        self.samples_written.load(Ordering::Relaxed)
    }

    /// End the session: halt the countdown, wind down every worker, and
    /// finalize the output files. Returns the finished session so callers
    /// can report where the data went.
    pub fn stop(mut self) -> Session {
        self.session.end();
        self.countdown.lock().unwrap().stop();

        // Pumps exit on the flag and drop their stage senders, which in
        // turn lets the stages flush and finish.
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                warn!("a capture worker panicked");
            }
        }
        for stage in self.stages.drain(..) {
            if stage.join().is_err() {
                warn!("a writer stage panicked");
            }
        }
        for results in &self.stage_results {
            for result in results.try_iter() {
                if let Err(error) = result {
                    warn!("sink error during capture: {}", error);
                }
            }
        }

        self.publisher.publish(&SessionStatus::Stopped {
            name: self.session.name().to_owned(),
        });
        info!("experiment saved: {}", self.session.samples_path().display());
        self.session
    }
}

/// Advances the countdown at the tick cadence for as long as the session
/// is active. The active check happens before the tick, so no more than
/// one stale tick can ever follow a stop, and that one hits an idle
/// countdown where it is a no-op.
fn spawn_ticker(session: Session, countdown: Arc<Mutex<Countdown>>) -> JoinHandle<()> {
    thread::spawn(move || {
        let sleeper = SpinSleeper::default();
        let mut last = Instant::now();
        while session.is_active() {
            sleeper.sleep(TICK_INTERVAL);
            let now = Instant::now();
            if !session.is_active() {
                break;
            }
            countdown.lock().unwrap().tick(now - last);
            last = now;
        }
    })
}

/// Drains the sample source, tagging each reading with elapsed time since
/// the first one and the fire flag read at the drain instant.
fn spawn_sensor_pump<S>(
    session: Session,
    countdown: Arc<Mutex<Countdown>>,
    source: Arc<Mutex<S>>,
    record_tx: std::sync::mpsc::Sender<SampleRecord>,
    samples_written: Arc<AtomicU64>,
) -> JoinHandle<()>
where
    S: SampleSource + Send + 'static,
{
    thread::spawn(move || {
        let sleeper = SpinSleeper::default();
        let mut first_sample: Option<Instant> = None;
        while session.is_active() {
            while let Some(reading) = source.lock().unwrap().next() {
                let now = Instant::now();
                let start = *first_sample.get_or_insert(now);
                let firing = countdown.lock().unwrap().is_firing();
                let record = SampleRecord {
                    elapsed_ms: now.duration_since(start).as_millis() as u64,
                    x: reading.x,
                    y: reading.y,
                    z: reading.z,
                    firing,
                };
                if record_tx.send(record).is_err() {
                    return;
                }
                samples_written.fetch_add(1, Ordering::Relaxed);
            }
            sleeper.sleep(DRAIN_INTERVAL);
        }
    })
}

/// Pulls audio frames at roughly real-time pace and feeds the WAV stage.
fn spawn_audio_pump(
    session: Session,
    mut audio: Box<dyn AudioSource + Send>,
    frame_tx: std::sync::mpsc::Sender<Vec<f32>>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let sleeper = SpinSleeper::default();
        // 100 ms worth of frames per chunk.
        let chunk = (audio.sample_rate() as usize / 10).max(1);
        let pace = Duration::from_millis(100);
        while session.is_active() {
            let frames = audio.next_chunk(chunk);
            if !frames.is_empty() && frame_tx.send(frames).is_err() {
                return;
            }
            sleeper.sleep(pace);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_writer::ToneSource;
    use crate::countdown::FixedJitter;
    use crate::dummy_sensor::DummySensor;
    use crate::status::ChannelPublisher;
    use std::fs;

    fn parse_records(contents: &str) -> Vec<(u64, f32, f32, f32, bool)> {
        contents
            .lines()
            .map(|line| {
                let fields: Vec<&str> = line.split(' ').collect();
                assert_eq!(fields.len(), 5, "bad record: {:?}", line);
                (
                    fields[0].parse().unwrap(),
                    fields[1].parse().unwrap(),
                    fields[2].parse().unwrap(),
                    fields[3].parse().unwrap(),
                    fields[4].parse().unwrap(),
                )
            })
            .collect()
    }

    #[test]
    fn simulated_session_writes_the_paired_files() {
        let dir = tempfile::tempdir().unwrap();
        let (status_tx, status_rx) = std::sync::mpsc::channel();

        let sensor = Arc::new(Mutex::new(
            DummySensor::builder().rate_hz(500.0).noise(0.02).build(),
        ));

        let handle = start_capture(
            CaptureConfig {
                name: "simtest".to_owned(),
                out_dir: dir.path().to_path_buf(),
                timing: CueTiming {
                    rand_min: 2,
                    rand_max: 5,
                    fire_pause: 3,
                },
                seed: None,
            },
            Arc::clone(&sensor),
            Some(Box::new(ToneSource::new(8_000, 440.0))),
            Box::new(ChannelPublisher::new(status_tx)),
            Box::new(FixedJitter::new(&[3])),
        )
        .unwrap();

        thread::sleep(Duration::from_millis(300));
        let session = handle.stop();
        sensor.lock().unwrap().stop();

        // Both lifecycle announcements went out, in order.
        assert_eq!(
            status_rx.recv().unwrap(),
            SessionStatus::Started {
                name: "simtest".to_owned()
            }
        );
        assert_eq!(
            status_rx.recv().unwrap(),
            SessionStatus::Stopped {
                name: "simtest".to_owned()
            }
        );

        // Sample records: first at t=0, monotonic offsets, all inside the
        // initial 3 s wait so never firing.
        let contents = fs::read_to_string(session.samples_path()).unwrap();
        let records = parse_records(&contents);
        assert!(!records.is_empty());
        assert_eq!(records[0].0, 0);
        assert!(records.windows(2).all(|w| w[0].0 <= w[1].0));
        assert!(records.iter().all(|r| !r.4));

        // The sidecar and the WAV are in place.
        let meta = crate::session::SessionMeta::from_path(session.meta_path()).unwrap();
        assert_eq!(meta.name, "simtest");
        let reader = hound::WavReader::open(session.audio_path()).unwrap();
        assert_eq!(reader.spec().sample_rate, 8_000);
        assert_eq!(reader.spec().channels, 1);
    }

    #[test]
    fn records_pick_up_the_fire_flag() {
        let dir = tempfile::tempdir().unwrap();

        let sensor = Arc::new(Mutex::new(
            DummySensor::builder().rate_hz(500.0).noise(0.0).build(),
        ));

        // A zero-length wait tips the cycle into a long fire window on the
        // very first tick.
        let handle = start_capture(
            CaptureConfig {
                name: "firetest".to_owned(),
                out_dir: dir.path().to_path_buf(),
                timing: CueTiming {
                    rand_min: 0,
                    rand_max: 0,
                    fire_pause: 30,
                },
                seed: None,
            },
            Arc::clone(&sensor),
            None,
            Box::new(crate::status::LogPublisher),
            Box::new(FixedJitter::new(&[0])),
        )
        .unwrap();

        thread::sleep(Duration::from_millis(500));
        let session = handle.stop();
        sensor.lock().unwrap().stop();

        let contents = fs::read_to_string(session.samples_path()).unwrap();
        let records = parse_records(&contents);
        assert!(records.iter().any(|r| r.4), "no firing records tagged");
        // No audio source, no audio file.
        assert!(!session.audio_path().exists());
    }
}
