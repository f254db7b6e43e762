//! Parsers for the AT-style lines the serial IMU dongle emits.
//!
//! The dongle streams newline-terminated ASCII. Two message kinds matter to
//! us: `+UACC` sample reports carrying raw accelerations in milli-g, and a
//! `+UIMU` hello line identifying the device and its configured sample rate:
//!
//! ```text
//! +UACC:241,12,-3,1002,15869
//! +UIMU:"CCF9578E0D8A",200
//! ```
//!
//! Anything else (boot banners, half lines left in the hardware buffer) is
//! a parse error the caller is expected to log and skip.

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, i32, one_of, u32},
    combinator::map,
    error::Error,
    multi::count,
    sequence::{delimited, preceded, tuple},
    Finish, IResult,
};

use std::str::FromStr;

/// One `+UACC` sample report. Accelerations are raw milli-g as sent by the
/// hardware; unit conversion happens at ingest in the sensor buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccelEvent {
    /// Rolling message counter, wraps at the dongle's whim.
    pub sequence: u32,
    /// X acceleration in milli-g.
    pub x_mg: i32,
    /// Y acceleration in milli-g.
    pub y_mg: i32,
    /// Z acceleration in milli-g.
    pub z_mg: i32,
    /// Device uptime at sampling, in milliseconds.
    pub millis: u32,
}

/// The `+UIMU` hello line sent once after the dongle boots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelloEvent {
    /// The dongle's 12-hex-digit hardware id.
    pub device_id: String,
    /// Configured sample rate in Hz.
    pub rate_hz: u32,
}

/// Any line the dongle can send us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SensorEvent {
    /// A 3-axis sample report.
    Accel(AccelEvent),
    /// The boot-time identification line.
    Hello(HelloEvent),
}

fn parse_id(s: &str) -> IResult<&str, String> {
    map(
        count(one_of("0123456789ABCDEFabcdef"), 12),
        |cs: Vec<char>| cs.into_iter().map(|c| c.to_ascii_uppercase()).collect(),
    )(s)
}

fn parse_quoted_id(s: &str) -> IResult<&str, String> {
    delimited(char('\"'), parse_id, char('\"'))(s)
}

fn parse_accel_event(s: &str) -> IResult<&str, AccelEvent> {
    map(
        tuple((
            preceded(tag("+UACC:"), u32),
            preceded(tag(","), i32),
            preceded(tag(","), i32),
            preceded(tag(","), i32),
            preceded(tag(","), u32),
        )),
        |(sequence, x_mg, y_mg, z_mg, millis)| AccelEvent {
            sequence,
            x_mg,
            y_mg,
            z_mg,
            millis,
        },
    )(s)
}

fn parse_hello_event(s: &str) -> IResult<&str, HelloEvent> {
    map(
        tuple((preceded(tag("+UIMU:"), parse_quoted_id), preceded(tag(","), u32))),
        |(device_id, rate_hz)| HelloEvent { device_id, rate_hz },
    )(s)
}

fn parse_sensor_event(s: &str) -> IResult<&str, SensorEvent> {
    alt((
        map(parse_accel_event, SensorEvent::Accel),
        map(parse_hello_event, SensorEvent::Hello),
    ))(s)
}

impl FromStr for SensorEvent {
    type Err = Error<String>;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match parse_sensor_event(s.trim_end()).finish() {
            Ok((_remaining, event)) => Ok(event),
            Err(Error { input, code }) => Err(Error {
                input: input.to_string(),
                code,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accel_line() {
        let s = "+UACC:241,12,-3,1002,15869";

        let (leftover, res) = parse_accel_event(s).unwrap();

        assert_eq!(leftover, "");
        assert_eq!(
            res,
            AccelEvent {
                sequence: 241,
                x_mg: 12,
                y_mg: -3,
                z_mg: 1002,
                millis: 15869,
            }
        );
    }

    #[test]
    fn hello_line() {
        let s = "+UIMU:\"ccf9578e0d8a\",200";

        let event = SensorEvent::from_str(s).unwrap();

        assert_eq!(
            event,
            SensorEvent::Hello(HelloEvent {
                device_id: "CCF9578E0D8A".to_owned(),
                rate_hz: 200,
            })
        );
    }

    #[test]
    fn accel_line_with_trailing_newline() {
        let s = "+UACC:0,-15,998,-4,12\r\n";

        let event = SensorEvent::from_str(s).unwrap();

        assert_eq!(
            event,
            SensorEvent::Accel(AccelEvent {
                sequence: 0,
                x_mg: -15,
                y_mg: 998,
                z_mg: -4,
                millis: 12,
            })
        );
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(SensorEvent::from_str("boot v1.3.2").is_err());
        assert!(SensorEvent::from_str("+UACC:241,12,-3").is_err());
        assert!(SensorEvent::from_str("+UIMU:\"notahexid\",200").is_err());
    }
}
