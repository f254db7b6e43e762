//! The thread-safe buffer where the serial reader thread parks
//! [`AccelEvent`]s until the capture pipeline drains them.

use crate::sample_source::{Reading, SampleSource};
use crate::sensor_message_decoder::AccelEvent;

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

/// One standard gravity in m/s², for converting the dongle's milli-g
/// payloads.
const STANDARD_GRAVITY: f32 = 9.80665;

/// A [`SampleSource`] fed from another thread, usually the serial-port
/// reader. Cloning shares the underlying buffer, so the reader can keep a
/// handle for [`SensorBuffer::add_event`] while the capture pipeline owns
/// the iterating end.
#[derive(Debug, Default, Clone)]
pub struct SensorBuffer {
    readings: Arc<Mutex<VecDeque<Reading>>>,
}

impl SensorBuffer {
    /// An empty buffer.
    pub fn new() -> Self {
        SensorBuffer {
            readings: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Convert a wire event to m/s² and queue it for the pipeline.
    pub fn add_event(&self, event: AccelEvent) {
        let reading = Reading {
            x: event.x_mg as f32 * STANDARD_GRAVITY / 1000.0,
            y: event.y_mg as f32 * STANDARD_GRAVITY / 1000.0,
            z: event.z_mg as f32 * STANDARD_GRAVITY / 1000.0,
        };

        self.readings.lock().unwrap().push_back(reading);
    }
}

impl Iterator for SensorBuffer {
    type Item = Reading;

    fn next(&mut self) -> Option<Self::Item> {
        self.readings.lock().unwrap().pop_front()
    }
}

impl SampleSource for SensorBuffer {
    fn clear(&mut self) {
        self.readings.lock().unwrap().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_come_back_in_arrival_order() {
        let mut buffer = SensorBuffer::new();
        let feeder = buffer.clone();

        feeder.add_event(AccelEvent {
            sequence: 0,
            x_mg: 1000,
            y_mg: 0,
            z_mg: 0,
            millis: 5,
        });
        feeder.add_event(AccelEvent {
            sequence: 1,
            x_mg: 0,
            y_mg: -500,
            z_mg: 0,
            millis: 10,
        });

        let first = buffer.next().unwrap();
        assert!((first.x - STANDARD_GRAVITY).abs() < 1e-4);
        assert_eq!(first.y, 0.0);

        let second = buffer.next().unwrap();
        assert!((second.y + STANDARD_GRAVITY / 2.0).abs() < 1e-4);

        assert_eq!(buffer.next(), None);
    }

    #[test]
    fn clear_discards_buffered_readings() {
        let mut buffer = SensorBuffer::new();
        buffer.add_event(AccelEvent {
            sequence: 0,
            x_mg: 1,
            y_mg: 2,
            z_mg: 3,
            millis: 0,
        });

        buffer.clear();
        assert_eq!(buffer.next(), None);
    }
}
