//! Capture an experiment session from a serial IMU dongle or the built-in
//! simulated rig.
//!
//! Examples:
//!
//! ```text
//! cargo run --bin sensexp -- --name squeeze simulate --rate 200 --for 30
//! cargo run --bin sensexp -- --name squeeze --seed 7 capture -d /dev/ttyACM0
//! ```

use clap::Parser;
use log::{debug, info, warn};
use sensexp::{
    args::{CaptureCommand, CaptureTask, SenseArgs, SimulateCommand},
    audio_writer::ToneSource,
    capture::{start_capture, CaptureConfig, CaptureHandle},
    countdown::{CueJitter, CueTiming, RngJitter},
    dummy_sensor::DummySensor,
    gui::{device_selector, prompt_view},
    sensor_buffer::SensorBuffer,
    sensor_message_decoder::SensorEvent,
    session::Session,
    status::LogPublisher,
};
use serial2::SerialPort;
use std::{
    str::{self, FromStr},
    sync::{Arc, Mutex},
    thread,
    time::Duration,
};

fn main() {
    env_logger::init();
    let args = SenseArgs::parse();

    let config = CaptureConfig {
        name: args.name.clone(),
        out_dir: args.out_dir.clone(),
        timing: CueTiming {
            rand_min: args.rand_min,
            rand_max: args.rand_max,
            fire_pause: args.fire_pause,
        },
        seed: args.seed,
    };
    let jitter: Box<dyn CueJitter + Send> = match args.seed {
        Some(seed) => Box::new(RngJitter::seeded(seed)),
        None => Box::new(RngJitter::from_entropy()),
    };

    match args.command {
        CaptureTask::Capture(cmd) => run_serial_capture(config, jitter, cmd),
        CaptureTask::Simulate(cmd) => run_simulated_capture(config, jitter, cmd),
    }
}

fn run_serial_capture(config: CaptureConfig, jitter: Box<dyn CueJitter + Send>, cmd: CaptureCommand) {
    let device = match cmd.device {
        Some(device) => device,
        None => {
            let ports = SerialPort::available_ports().expect("Failed to list serial ports");
            match device_selector(ports).expect("Device selector failed") {
                Some(port) => port,
                None => {
                    warn!("no serial device selected, nothing to capture");
                    return;
                }
            }
        }
    };

    let mut port = SerialPort::open(&device, cmd.baud).expect("Failed to open port");
    // Finite timeout so the reader loop can notice the session ending.
    port.set_read_timeout(Duration::from_millis(500))
        .expect("Failed to set read timeout");

    let buffer = SensorBuffer::new();
    let feeder = buffer.clone();
    let source = Arc::new(Mutex::new(buffer));

    let handle = start_capture(config, source, None, Box::new(LogPublisher), jitter)
        .expect("Failed to start capture");

    let reader_session = handle.session().clone();
    let reader = thread::spawn(move || {
        let mut buf = [0u8; 256];
        let mut line = Vec::new();

        while reader_session.is_active() {
            let read_len = match port.read(&mut buf) {
                Ok(len) => len,
                // Timeouts while the dongle is quiet are routine.
                Err(_) => continue,
            };

            for &c in buf.iter().take(read_len) {
                line.push(c);
                if c == b'\n' {
                    match str::from_utf8(&line) {
                        Ok(s) => match SensorEvent::from_str(s) {
                            Ok(SensorEvent::Accel(event)) => {
                                debug!("received {:?}, buffering", event);
                                feeder.add_event(event);
                            }
                            Ok(SensorEvent::Hello(hello)) => {
                                info!("IMU dongle {} at {} Hz", hello.device_id, hello.rate_hz);
                            }
                            Err(e) => {
                                warn!("was unable to parse sensor line: {}", e);
                            }
                        },
                        // Often happens at the beginning of transmission when
                        // there is still garbage in the hardware buffer
                        Err(e) => {
                            warn!("failed to decode utf-8: {:?}", e);
                        }
                    }
                    line.clear();
                }
            }
        }
    });

    let session = attend(handle, None);
    reader.join().expect("Serial reader panicked");
    report(&session);
}

fn run_simulated_capture(
    config: CaptureConfig,
    jitter: Box<dyn CueJitter + Send>,
    cmd: SimulateCommand,
) {
    let sensor = DummySensor::builder()
        .rate_hz(cmd.rate_hz)
        .noise(cmd.noise)
        .build();
    let source = Arc::new(Mutex::new(sensor));
    let tone = ToneSource::new(cmd.samp_rate, 440.0);

    let handle = start_capture(
        config,
        Arc::clone(&source),
        Some(Box::new(tone)),
        Box::new(LogPublisher),
        jitter,
    )
    .expect("Failed to start capture");

    let session = attend(handle, cmd.duration_secs);
    source.lock().unwrap().stop();
    report(&session);
}

/// Babysit a running session until it is time to stop: either sleep out a
/// fixed duration or put up the interactive prompt, then finalize.
fn attend(handle: CaptureHandle, duration_secs: Option<u64>) -> Session {
    let handle = Arc::new(handle);

    match duration_secs {
        Some(secs) => thread::sleep(Duration::from_secs(secs)),
        None => {
            let label_handle = Arc::clone(&handle);
            let status_handle = Arc::clone(&handle);
            if let Err(error) = prompt_view(
                Box::new(move || label_handle.label()),
                Box::new(move || format!("{} samples", status_handle.sample_count())),
            ) {
                warn!("prompt display failed: {}", error);
            }
        }
    }

    let handle = Arc::try_unwrap(handle)
        .ok()
        .expect("Capture handle still shared");
    handle.stop()
}

fn report(session: &Session) {
    println!("Experiment saved!");
    println!("  samples: {}", session.samples_path().display());
    if session.audio_path().exists() {
        println!("  audio:   {}", session.audio_path().display());
    }
    println!("  meta:    {}", session.meta_path().display());
}
