//! # Link Monitor
//!
//! Tracks host activity for one client. While nothing is heard the client
//! chirps once per chirp interval; after the link-down timeout the link is
//! declared down. The first frame afterwards brings it back up.

use std::time::Duration;

use tokio::time::Instant;

/// What the client should do after an idle check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkCheck {
    pub chirp: bool,
    /// The link just went down (reported once per outage).
    pub link_down: bool,
}

#[derive(Debug)]
pub struct LinkMonitor {
    chirp_interval: Duration,
    link_down_timeout: Duration,
    last_activity: Instant,
    last_chirp: Option<Instant>,
    up: bool,
}

impl LinkMonitor {
    pub fn new(chirp_interval: Duration, link_down_timeout: Duration) -> Self {
        LinkMonitor {
            chirp_interval,
            link_down_timeout,
            last_activity: Instant::now(),
            last_chirp: None,
            up: false,
        }
    }

    pub fn is_up(&self) -> bool {
        self.up
    }

    /// Records a received frame. Returns `true` when the link comes up.
    pub fn activity(&mut self) -> bool {
        self.last_activity = Instant::now();
        self.last_chirp = None;
        let came_up = !self.up;
        self.up = true;
        if came_up {
            log::info!(target: "sas::link", "link up");
        }
        came_up
    }

    /// Checks the idle timers after a cycle with no frame.
    pub fn check_idle(&mut self) -> LinkCheck {
        let now = Instant::now();
        let idle = now.duration_since(self.last_activity);
        let mut check = LinkCheck::default();

        if idle >= self.chirp_interval {
            let since_chirp = self.last_chirp.map(|t| now.duration_since(t));
            if since_chirp.map_or(true, |d| d >= self.chirp_interval) {
                check.chirp = true;
                self.last_chirp = Some(now);
            }
        }

        if self.up && idle >= self.link_down_timeout {
            self.up = false;
            check.link_down = true;
            log::warn!(target: "sas::link", "link down after {idle:?} without a poll");
        }
        check
    }

    /// Marks the link down without waiting for the idle timeout. Returns
    /// `true` if it was up.
    pub fn force_down(&mut self) -> bool {
        let was_up = std::mem::replace(&mut self.up, false);
        if was_up {
            log::warn!(target: "sas::link", "link down: response never acknowledged");
        }
        was_up
    }
}
