//! Alive → Dead → WaitingForResurrection → Alive state machine.

use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;
use std::time::{Duration, Instant};

use strum::Display;

use crate::config::LivenessConfig;

/// Liveness of the controlled agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LivenessState {
    Alive,
    /// Never reported by [`LivenessMonitor::state`]: the poll that observes
    /// the death already moves on to `WaitingForResurrection`. Hosts that
    /// track liveness themselves may use it.
    Dead,
    WaitingForResurrection,
}

/// Transition notifications; exactly one per transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LivenessEvent {
    Died,
    Resurrected,
    /// WaitingForResurrection outlived its timeout and was force-cleared.
    ResurrectionTimedOut,
}

type Subscriber = Box<dyn FnMut(LivenessEvent) + Send>;

/// Polled liveness tracker with an owned subscriber list.
///
/// Owned by the tick loop: `Send` so it can move into a worker task, but not
/// `Sync`.
pub struct LivenessMonitor {
    config: LivenessConfig,
    dead: bool,
    waiting_for_resurrection: bool,
    died_at: Option<Instant>,
    last_poll: Option<Instant>,
    awaiting_resume: bool,
    /// Set by a timeout reset while the agent still read as dead; cleared by
    /// the next alive observation.
    forced_reset: bool,
    subscribers: Vec<Subscriber>,
    _tick_loop_only: PhantomData<Cell<()>>,
}

impl LivenessMonitor {
    pub fn new(config: LivenessConfig) -> Self {
        Self {
            config,
            dead: false,
            waiting_for_resurrection: false,
            died_at: None,
            last_poll: None,
            awaiting_resume: false,
            forced_reset: false,
            subscribers: Vec::new(),
            _tick_loop_only: PhantomData,
        }
    }

    /// Registers a callback invoked for every transition, before `poll` returns.
    pub fn subscribe(&mut self, subscriber: impl FnMut(LivenessEvent) + Send + 'static) {
        self.subscribers.push(Box::new(subscriber));
    }

    /// Compares the agent's current liveness with the previous poll.
    ///
    /// Calls closer together than `poll_interval` are ignored and return `None`,
    /// except the one that observes a death: pickups stop on that very call.
    pub fn poll(&mut self, now: Instant, agent_alive: bool) -> Option<LivenessEvent> {
        let death_edge = !agent_alive && !self.dead && !self.forced_reset;
        if !death_edge
            && let Some(last) = self.last_poll
            && now.saturating_duration_since(last) < self.config.poll_interval
        {
            return None;
        }
        self.last_poll = Some(now);
        if agent_alive {
            self.forced_reset = false;
        }

        let event = if death_edge {
            self.dead = true;
            self.waiting_for_resurrection = true;
            self.died_at = Some(now);
            self.awaiting_resume = false;
            Some(LivenessEvent::Died)
        } else if self.dead && agent_alive {
            self.clear_death();
            self.awaiting_resume = !self.config.auto_resume;
            Some(LivenessEvent::Resurrected)
        } else if self.waiting_for_resurrection && self.waited(now) >= self.config.resurrection_timeout
        {
            self.clear_death();
            self.forced_reset = true;
            Some(LivenessEvent::ResurrectionTimedOut)
        } else {
            None
        };

        if let Some(event) = event {
            match event {
                LivenessEvent::ResurrectionTimedOut => tracing::warn!(
                    target: "pickup::liveness",
                    timeout = ?self.config.resurrection_timeout,
                    "still waiting for resurrection, forcing reset"
                ),
                _ => tracing::info!(target: "pickup::liveness", %event, "liveness changed"),
            }
            for subscriber in &mut self.subscribers {
                subscriber(event);
            }
        }

        event
    }

    pub fn state(&self) -> LivenessState {
        if self.waiting_for_resurrection {
            LivenessState::WaitingForResurrection
        } else {
            LivenessState::Alive
        }
    }

    /// False while dead, waiting, or awaiting an explicit resume.
    pub fn should_allow_pickup(&self) -> bool {
        if !self.config.enabled {
            return true;
        }
        !(self.dead || self.waiting_for_resurrection || self.awaiting_resume)
    }

    pub fn is_awaiting_resume(&self) -> bool {
        self.awaiting_resume
    }

    /// Lifts the post-resurrection pause when `auto_resume` is off.
    pub fn resume(&mut self) {
        if self.awaiting_resume {
            tracing::info!(target: "pickup::liveness", "pickups resumed");
        }
        self.awaiting_resume = false;
    }

    pub fn config(&self) -> &LivenessConfig {
        &self.config
    }

    /// Readiness string for status displays.
    pub fn status_line(&self, now: Instant) -> String {
        if !self.config.enabled {
            return "Ready (death awareness off)".to_string();
        }
        if self.waiting_for_resurrection {
            format!("Dead, waiting for resurrection ({}s)", self.waited(now).as_secs())
        } else if self.awaiting_resume {
            "Paused: awaiting resume".to_string()
        } else {
            "Ready".to_string()
        }
    }

    fn waited(&self, now: Instant) -> Duration {
        self.died_at
            .map(|at| now.saturating_duration_since(at))
            .unwrap_or_default()
    }

    fn clear_death(&mut self) {
        self.dead = false;
        self.waiting_for_resurrection = false;
        self.died_at = None;
    }
}

impl fmt::Debug for LivenessMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LivenessMonitor")
            .field("state", &self.state())
            .field("awaiting_resume", &self.awaiting_resume)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
