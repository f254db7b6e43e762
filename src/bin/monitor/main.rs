//! Dry-run a cue schedule: drives a countdown with the given timing and
//! shows the live prompt without recording anything. Handy for tuning the
//! wait range and fire pause before a real experiment.

use clap::Parser;
use sensexp::countdown::{Countdown, CueJitter, CueTiming, RngJitter, TICK_INTERVAL};
use sensexp::gui::prompt_view;
use spin_sleep::SpinSleeper;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Instant;

#[derive(Debug, Parser)]
#[clap(version, about)]
struct MonitorArgs {
    /// Shortest randomized wait before a fire cue, in seconds
    #[arg(long = "rand-min", default_value_t = 2)]
    rand_min: u32,

    /// Longest randomized wait before a fire cue, in seconds
    #[arg(long = "rand-max", default_value_t = 5)]
    rand_max: u32,

    /// Length of the fire window between waits, in seconds
    #[arg(long = "fire-pause", default_value_t = 3)]
    fire_pause: u32,

    /// Seed for the cue schedule, to replay a specific run
    #[arg(long)]
    seed: Option<u64>,
}

fn main() {
    env_logger::init();
    let args = MonitorArgs::parse();

    let jitter: Box<dyn CueJitter + Send> = match args.seed {
        Some(seed) => Box::new(RngJitter::seeded(seed)),
        None => Box::new(RngJitter::from_entropy()),
    };

    let mut countdown = Countdown::new(jitter);
    countdown
        .start(CueTiming {
            rand_min: args.rand_min,
            rand_max: args.rand_max,
            fire_pause: args.fire_pause,
        })
        .expect("Invalid cue timing");
    let countdown = Arc::new(Mutex::new(countdown));

    let running = Arc::new(AtomicBool::new(true));
    let ticker_countdown = Arc::clone(&countdown);
    let ticker_running = Arc::clone(&running);
    let ticker = thread::spawn(move || {
        let sleeper = SpinSleeper::default();
        let mut last = Instant::now();
        while ticker_running.load(Ordering::SeqCst) {
            sleeper.sleep(TICK_INTERVAL);
            let now = Instant::now();
            ticker_countdown.lock().unwrap().tick(now - last);
            last = now;
        }
    });

    let label_countdown = Arc::clone(&countdown);
    let status_countdown = Arc::clone(&countdown);
    prompt_view(
        Box::new(move || label_countdown.lock().unwrap().label()),
        Box::new(move || {
            let cd = status_countdown.lock().unwrap();
            format!("{:?}, {:.1}s left", cd.phase(), cd.remaining().as_secs_f32())
        }),
    )
    .expect("Prompt display failed");

    running.store(false, Ordering::SeqCst);
    countdown.lock().unwrap().stop();
    ticker.join().expect("Ticker panicked");
}
