// Commandline argument parser using clap for SensExp

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser, Clone)]
#[clap(version, about)]
pub struct SenseArgs {
    #[command(subcommand)]
    /// Which kind of rig to capture from
    pub command: CaptureTask,

    /// Name of the experiment, used in the output file names
    #[arg(short = 'n', long = "name")]
    pub name: String,

    /// Shortest randomized wait before a fire cue, in seconds
    #[arg(long = "rand-min", default_value_t = 2)]
    pub rand_min: u32,

    /// Longest randomized wait before a fire cue, in seconds
    #[arg(long = "rand-max", default_value_t = 5)]
    pub rand_max: u32,

    /// Length of the fire window between waits, in seconds
    #[arg(long = "fire-pause", default_value_t = 3)]
    pub fire_pause: u32,

    /// Directory the output files are written to
    #[arg(short = 'o', long = "out-dir", default_value = ".")]
    pub out_dir: PathBuf,

    /// Seed for the cue schedule, for reproducible experiments
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum CaptureTask {
    /// Record from a serial IMU dongle
    #[command(about)]
    Capture(CaptureCommand),

    /// Record from the built-in simulated rig
    #[command(about)]
    Simulate(SimulateCommand),
}

#[derive(Debug, Args, Clone)]
pub struct CaptureCommand {
    /// Serial device of the IMU; prompts with a selector when omitted
    #[arg(short = 'd', long = "device")]
    pub device: Option<PathBuf>,

    /// Baud rate of the serial link
    #[arg(short = 'b', long = "baud", default_value_t = 115_200)]
    pub baud: u32,
}

#[derive(Debug, Args, Clone)]
pub struct SimulateCommand {
    /// Simulated sensor rate, in samples per second
    #[arg(short = 'r', long = "rate", default_value_t = 200.0)]
    pub rate_hz: f32,

    /// Noise amplitude added to the simulated motion, in m/s^2
    #[arg(long = "noise", default_value_t = 0.01)]
    pub noise: f32,

    /// Sample rate of the simulated audio track, in Hz
    #[arg(short = 's', long = "samp", default_value_t = 44_100)]
    pub samp_rate: u32,

    /// Stop after this many seconds instead of on a key press
    #[arg(long = "for")]
    pub duration_secs: Option<u64>,
}
