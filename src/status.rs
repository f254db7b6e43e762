//! Best-effort session status broadcasting.
//!
//! The lab setup likes to mirror "capture started/stopped" onto a message
//! bus so other stations know an experiment is in progress. Delivery is
//! fire-and-forget: the capture pipeline never waits on, retries, or even
//! learns about a failed publish. The actual transport lives behind the
//! [`StatusPublisher`] seam and is out of scope here.

use log::info;
use std::fmt;
use std::sync::mpsc;

/// A session lifecycle announcement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    /// Capture began for the named experiment.
    Started {
        /// Experiment name.
        name: String,
    },
    /// Capture ended and the files are finalized.
    Stopped {
        /// Experiment name.
        name: String,
    },
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Started { name } => write!(f, "capture started: {}", name),
            SessionStatus::Stopped { name } => write!(f, "capture stopped: {}", name),
        }
    }
}

/// Something that fans session announcements out to the world. `publish`
/// returns nothing on purpose: there is no delivery guarantee to report.
pub trait StatusPublisher {
    /// Announce, best effort.
    fn publish(&self, status: &SessionStatus);
}

/// A publisher that just logs the announcement. The default for the CLI.
pub struct LogPublisher;

impl StatusPublisher for LogPublisher {
    fn publish(&self, status: &SessionStatus) {
        info!("{}", status);
    }
}

/// A publisher that forwards announcements over an mpsc channel, e.g. to a
/// bridge thread owning the real transport connection. A hung-up receiver
/// loses the announcement silently, matching the fire-and-forget contract.
pub struct ChannelPublisher {
    tx: mpsc::Sender<SessionStatus>,
}

impl ChannelPublisher {
    /// Wrap the sending end of a bridge channel.
    pub fn new(tx: mpsc::Sender<SessionStatus>) -> Self {
        Self { tx }
    }
}

impl StatusPublisher for ChannelPublisher {
    fn publish(&self, status: &SessionStatus) {
        let _ = self.tx.send(status.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_publisher_delivers() {
        let (tx, rx) = mpsc::channel();
        let publisher = ChannelPublisher::new(tx);

        publisher.publish(&SessionStatus::Started {
            name: "squeeze".to_owned(),
        });

        assert_eq!(
            rx.recv().unwrap(),
            SessionStatus::Started {
                name: "squeeze".to_owned()
            }
        );
    }

    #[test]
    fn hung_up_receiver_is_tolerated() {
        let (tx, rx) = mpsc::channel();
        drop(rx);
        let publisher = ChannelPublisher::new(tx);

        // Must not panic or error.
        publisher.publish(&SessionStatus::Stopped {
            name: "grip".to_owned(),
        });
    }

    #[test]
    fn announcements_render_for_human_readers() {
        let status = SessionStatus::Stopped {
            name: "pinch".to_owned(),
        };
        assert_eq!(status.to_string(), "capture stopped: pinch");
    }
}
