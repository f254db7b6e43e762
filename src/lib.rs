//! SensExp records cue-tagged accelerometer samples, and optionally an
//! audio track, during timed experiment sessions. A session is paced by a
//! randomized countdown that alternates between a waiting phase and a
//! "fire" phase; the subject acts on the fire cue, and every sensor sample
//! is stamped with whether it landed inside a fire window, so stimulus and
//! response line up in the recorded data.
//!
//! The crate is the host-side pipeline: sample sources (a serial IMU
//! dongle or a simulated rig), the cue countdown, the writer stages that
//! produce a session's paired output files, and the thin TUI sinks that
//! display the prompt. See the `sensexp` binary for capturing and the
//! `monitor` binary for dry-running cue schedules.

#![warn(missing_docs)]
pub mod args;
pub mod audio_writer;
pub mod capture;
pub mod countdown;
pub mod dummy_sensor;
pub mod gui;
pub mod sample_source;
pub mod sample_writer;
pub mod sensor_buffer;
pub mod sensor_message_decoder;
pub mod session;
pub mod stage;
pub mod status;
