//! A simulated accelerometer rig for running experiments without hardware.
//!
//! Spawns a generator thread that synthesizes a gentle sway plus uniform
//! noise at a configurable sample rate, buffering readings until the
//! capture pipeline drains them. Used by the `simulate` subcommand and by
//! tests that need a live [`SampleSource`].

use crate::sample_source::{Reading, SampleSource};
use rand::prelude::*;
use spin_sleep::SpinSleeper;
use std::collections::VecDeque;
use std::f32::consts::PI;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

/// A thread-backed [`SampleSource`] that invents plausible motion.
pub struct DummySensor {
    handle: Option<thread::JoinHandle<()>>,
    tx: mpsc::Sender<Signal>,
    readings: Arc<Mutex<VecDeque<Reading>>>,
}

enum Signal {
    Noise(f32),
    Rate(f32),
    Stop,
}

/// Configuration for a [`DummySensor`], built up fluently.
#[derive(Debug, Clone, Copy)]
pub struct DummySensorBuilder {
    rate_hz: f32,
    noise: f32,
}

impl Default for DummySensorBuilder {
    fn default() -> Self {
        Self {
            rate_hz: 200.0,
            noise: 0.01,
        }
    }
}

impl DummySensorBuilder {
    /// Samples generated per second.
    pub fn rate_hz(mut self, rate_hz: f32) -> Self {
        self.rate_hz = rate_hz;
        self
    }

    /// Amplitude of the uniform noise added to every axis, in m/s².
    pub fn noise(mut self, noise: f32) -> Self {
        self.noise = noise;
        self
    }

    /// Spawn the generator thread and hand back the running sensor.
    pub fn build(self) -> DummySensor {
        let (tx, rx) = mpsc::channel::<Signal>();
        let readings = Arc::new(Mutex::new(VecDeque::new()));
        let th_readings = Arc::clone(&readings);

        let handle = thread::spawn(move || {
            let sleeper = SpinSleeper::default();
            let mut running = true;
            let mut rate_hz = self.rate_hz;
            let mut noise = self.noise;
            let mut t = 0.0f32;
            while running {
                if let Ok(received) = rx.try_recv() {
                    match received {
                        Signal::Noise(new_noise) => noise = new_noise,
                        Signal::Rate(new_rate) => rate_hz = new_rate.max(1.0),
                        Signal::Stop => running = false,
                    }
                }
                th_readings.lock().unwrap().push_back(sway(t, noise));
                let step = 1.0 / rate_hz;
                t += step;
                sleeper.sleep(Duration::from_secs_f32(step));
            }
        });

        DummySensor {
            handle: Some(handle),
            tx,
            readings,
        }
    }
}

impl DummySensor {
    /// Start configuring a simulated rig.
    pub fn builder() -> DummySensorBuilder {
        DummySensorBuilder::default()
    }

    /// Change the noise amplitude of the running generator.
    pub fn set_noise(&self, noise: f32) {
        // Calling `.unwrap()` because the generator outlives every control
        // call until `stop()`.
        self.tx.send(Signal::Noise(noise)).unwrap();
    }

    /// Change the sample rate of the running generator.
    pub fn set_rate_hz(&self, rate_hz: f32) {
        self.tx.send(Signal::Rate(rate_hz)).unwrap();
    }

    /// Stop the generator thread and wait for it to exit. Safe to call
    /// more than once.
    pub fn stop(&mut self) {
        let _ = self.tx.send(Signal::Stop);
        if let Some(thread) = self.handle.take() {
            thread.join().unwrap();
        }
    }
}

/// A slow whole-body sway on X/Y, a slight bob on Z, plus uniform noise.
/// Linear acceleration, so gravity is already subtracted out.
fn sway(t: f32, noise: f32) -> Reading {
    let mut rng = thread_rng();
    let jitter = |rng: &mut ThreadRng| {
        if noise > 0.0 {
            rng.gen_range(-noise..noise)
        } else {
            0.0
        }
    };
    Reading {
        x: (2.0 * PI * 0.25 * t).sin() * 0.5 + jitter(&mut rng),
        y: (2.0 * PI * 0.25 * t).cos() * 0.5 + jitter(&mut rng),
        z: (2.0 * PI * 0.5 * t).sin() * 0.1 + jitter(&mut rng),
    }
}

impl Iterator for DummySensor {
    type Item = Reading;
    fn next(&mut self) -> Option<Self::Item> {
        self.readings.lock().unwrap().pop_front()
    }
}

impl SampleSource for DummySensor {
    fn clear(&mut self) {
        self.readings.lock().unwrap().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn generator_produces_finite_readings() {
        let mut sensor = DummySensor::builder().rate_hz(500.0).noise(0.05).build();

        // Wait for the generator to buffer something, bounded so a broken
        // generator fails the test instead of hanging it.
        let deadline = Instant::now() + Duration::from_secs(2);
        let reading = loop {
            if let Some(reading) = sensor.next() {
                break reading;
            }
            assert!(Instant::now() < deadline, "generator produced nothing");
            thread::sleep(Duration::from_millis(5));
        };

        assert!(reading.x.is_finite());
        assert!(reading.y.is_finite());
        assert!(reading.z.is_finite());

        sensor.stop();
        sensor.stop();
    }

    #[test]
    fn clear_empties_the_buffer() {
        let mut sensor = DummySensor::builder().rate_hz(1000.0).build();
        thread::sleep(Duration::from_millis(20));
        sensor.stop();

        sensor.clear();
        assert!(sensor.next().is_none());
    }
}
