//! The randomized cue countdown that paces a capture session.
//!
//! A session alternates between two timed phases: a `Waiting` phase whose
//! duration is drawn uniformly from a configured range, and a fixed-length
//! `Firing` phase during which the subject is expected to act. The countdown
//! itself owns no timer; a driver calls [`Countdown::tick`] with the
//! wall-clock delta since the previous call (100 ms cadence in production,
//! arbitrary steps in tests) and reads back the current [`Phase`], the
//! [`PromptLabel`] for display, and the [`Countdown::is_firing`] flag that
//! gets stamped onto every sample record.
//!
//! Randomness comes in through the [`CueJitter`] seam so that experiments
//! can be replayed from a seed and tests can script exact schedules.

use log::debug;
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::error::Error;
use std::fmt;
use std::time::Duration;

/// Cadence at which a driver is expected to tick a running countdown.
pub const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// The prompt flips to "fire now" this long before the wait expires, so the
/// cue is visible slightly ahead of the actual fire instant.
const FIRE_LOOKAHEAD: Duration = Duration::from_secs(1);

/// Where a countdown currently is in its cue cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Not running; the state before `start()` and after `stop()`.
    Idle,
    /// Counting down a randomly drawn wait until the next fire cue.
    Waiting,
    /// Inside the fixed-length fire window.
    Firing,
}

/// Timing parameters for one capture session, in whole seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CueTiming {
    /// Shortest wait before a fire cue.
    pub rand_min: u32,
    /// Longest wait before a fire cue.
    pub rand_max: u32,
    /// Length of the fire window between waits.
    pub fire_pause: u32,
}

/// What the prompt display should show right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptLabel {
    /// Nothing; the prompt widget hides itself.
    Hidden,
    /// `fire in <N>s`, N whole seconds.
    FireIn(u64),
    /// `fire now`.
    FireNow,
}

impl fmt::Display for PromptLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptLabel::Hidden => Ok(()),
            PromptLabel::FireIn(secs) => write!(f, "fire in {}s", secs),
            PromptLabel::FireNow => write!(f, "fire now"),
        }
    }
}

/// Source of the randomized wait durations between fire cues.
///
/// Injected rather than reaching for a global generator so that a session
/// can be replayed from a seed and tests can supply exact sequences.
pub trait CueJitter {
    /// Draw the next wait, in whole seconds, uniformly from `[min, max]`
    /// inclusive.
    fn next_wait_secs(&mut self, min: u32, max: u32) -> u32;
}

/// The production jitter source, backed by a `rand` generator.
pub struct RngJitter<R: Rng> {
    rng: R,
}

impl RngJitter<StdRng> {
    /// A jitter source seeded from OS entropy; every session gets a fresh
    /// schedule.
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// A jitter source with a fixed seed, for reproducible cue schedules.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl<R: Rng> CueJitter for RngJitter<R> {
    fn next_wait_secs(&mut self, min: u32, max: u32) -> u32 {
        self.rng.gen_range(min..=max)
    }
}

/// Deterministic jitter that replays a fixed sequence of draws, cycling
/// when the sequence runs out. Draws outside the requested range are
/// clamped into it.
pub struct FixedJitter {
    draws: VecDeque<u32>,
}

impl FixedJitter {
    /// A jitter source that cycles through `draws` forever.
    pub fn new(draws: &[u32]) -> Self {
        Self {
            draws: draws.iter().copied().collect(),
        }
    }
}

impl CueJitter for FixedJitter {
    fn next_wait_secs(&mut self, min: u32, max: u32) -> u32 {
        match self.draws.pop_front() {
            Some(draw) => {
                self.draws.push_back(draw);
                draw.clamp(min, max)
            }
            None => min,
        }
    }
}

/// Errors from configuring a [`Countdown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownError {
    /// `rand_min` exceeds `rand_max`, so there is no range to draw from.
    InvalidRange {
        /// The offending lower bound.
        rand_min: u32,
        /// The offending upper bound.
        rand_max: u32,
    },
}

impl fmt::Display for CountdownError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CountdownError::InvalidRange { rand_min, rand_max } => write!(
                f,
                "invalid cue range: rand_min ({}) exceeds rand_max ({})",
                rand_min, rand_max
            ),
        }
    }
}

impl Error for CountdownError {}

/// The repeating wait/fire state machine for one capture session.
///
/// Exactly one of these is active per running session. It is shared between
/// the ticker thread and the sample pump behind a mutex; every method is
/// O(1) and none of them block.
pub struct Countdown {
    jitter: Box<dyn CueJitter + Send>,
    timing: CueTiming,
    phase: Phase,
    remaining: Duration,
}

impl Countdown {
    /// A countdown in the `Idle` phase, drawing waits from `jitter` once
    /// started.
    pub fn new(jitter: Box<dyn CueJitter + Send>) -> Self {
        Self {
            jitter,
            timing: CueTiming::default(),
            phase: Phase::Idle,
            remaining: Duration::ZERO,
        }
    }

    /// Begin (or restart) the cue cycle: draw an initial wait from
    /// `[rand_min, rand_max]` and enter `Waiting`.
    ///
    /// Rejects an inverted range synchronously; the caller must fix the
    /// configuration and call `start` again.
    pub fn start(&mut self, timing: CueTiming) -> Result<(), CountdownError> {
        if timing.rand_min > timing.rand_max {
            return Err(CountdownError::InvalidRange {
                rand_min: timing.rand_min,
                rand_max: timing.rand_max,
            });
        }

        let wait = self.jitter.next_wait_secs(timing.rand_min, timing.rand_max);
        debug!("cue: initial wait of {}s", wait);

        self.timing = timing;
        self.phase = Phase::Waiting;
        self.remaining = Duration::from_secs(u64::from(wait));
        Ok(())
    }

    /// Advance the countdown by `elapsed` of wall-clock time.
    ///
    /// Ticking an `Idle` countdown is a silent no-op: a lagging driver is
    /// allowed to deliver one stale tick after `stop()` without that being
    /// an error. Time left over past a phase boundary rolls into the next
    /// phase, so the cycle does not drift at the 100 ms tick resolution.
    pub fn tick(&mut self, elapsed: Duration) {
        if self.phase == Phase::Idle {
            return;
        }

        let mut left = elapsed;
        let mut zero_phases = 0u32;
        while left >= self.remaining {
            left -= self.remaining;
            // A zero-length wait draw plus a zero-length fire pause would
            // roll transitions forever without consuming time; drop the
            // leftover once a full cycle passes without progress.
            if self.remaining.is_zero() {
                zero_phases += 1;
                if zero_phases > 2 {
                    left = Duration::ZERO;
                    break;
                }
            } else {
                zero_phases = 0;
            }
            self.advance();
        }
        self.remaining -= left;
    }

    /// Halt the cycle and return to `Idle`. Idempotent; pending ticks from
    /// a lagging driver become no-ops.
    pub fn stop(&mut self) {
        self.phase = Phase::Idle;
        self.remaining = Duration::ZERO;
    }

    /// The current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Time left in the current phase.
    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    /// True iff the cue cycle is inside a fire window. This is the flag
    /// stamped onto every sample record.
    pub fn is_firing(&self) -> bool {
        self.phase == Phase::Firing
    }

    /// The prompt text for the display sink.
    ///
    /// Shows `fire now` through the final second of a wait, `fire in <N>s`
    /// before that (N truncated to whole seconds, matching the second-level
    /// granularity of the display), and nothing at all while firing or idle.
    pub fn label(&self) -> PromptLabel {
        match self.phase {
            Phase::Waiting if self.remaining <= FIRE_LOOKAHEAD => PromptLabel::FireNow,
            Phase::Waiting => PromptLabel::FireIn(self.remaining.as_secs()),
            Phase::Firing | Phase::Idle => PromptLabel::Hidden,
        }
    }

    /// Cross a phase boundary: `Waiting` enters the fire window, `Firing`
    /// draws a fresh wait and starts the next cycle.
    fn advance(&mut self) {
        match self.phase {
            Phase::Waiting => {
                self.phase = Phase::Firing;
                self.remaining = Duration::from_secs(u64::from(self.timing.fire_pause));
                debug!("cue: firing for {}s", self.timing.fire_pause);
            }
            Phase::Firing => {
                let wait = self
                    .jitter
                    .next_wait_secs(self.timing.rand_min, self.timing.rand_max);
                self.phase = Phase::Waiting;
                self.remaining = Duration::from_secs(u64::from(wait));
                debug!("cue: waiting {}s until the next fire", wait);
            }
            Phase::Idle => {}
        }
    }
}
