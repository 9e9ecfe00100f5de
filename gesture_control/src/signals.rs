//! Published control signals and the bus that carries them.
//!
//! The controller is the only writer, once per tick, after every detector
//! has run. Collaborators either read the latest value at their own cadence
//! or subscribe for a copy of every published tick. Each `Signals` value is
//! replaced as a whole; readers never see a half-written tick.

use std::sync::mpsc::{self, Receiver, Sender};

use crate::config::ControlConfig;

// ════════════════════════════════════════════════════════════════════════════
// SceneMode
// ════════════════════════════════════════════════════════════════════════════

/// Whether the particle formation is assembled or blown apart.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SceneMode {
    Formed,
    Scattered,
}

impl SceneMode {
    pub fn name(&self) -> &'static str {
        match self {
            SceneMode::Formed => "formed",
            SceneMode::Scattered => "scattered",
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Signals
// ════════════════════════════════════════════════════════════════════════════

/// The complete output of one controller tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Signals {
    pub mode: SceneMode,
    /// Orbit rate; sign follows visual right. Zero whenever not
    /// pinch-dragging.
    pub rotation_rate: f32,
    /// Camera distance target, always within the configured bounds.
    pub target_distance: f32,
    pub power: bool,
    /// Cursor position in screen pixels; `None` means hidden.
    pub cursor: Option<(f32, f32)>,
}

impl Signals {
    /// Start-of-session values: scattered, stationary, powered, no cursor.
    pub fn initial(cfg: &ControlConfig) -> Self {
        Signals {
            mode: SceneMode::Scattered,
            rotation_rate: 0.0,
            target_distance: cfg.default_distance,
            power: true,
            cursor: None,
        }
    }

    pub fn cursor_visible(&self) -> bool {
        self.cursor.is_some()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SignalBus
// ════════════════════════════════════════════════════════════════════════════

/// Owned output slot plus fan-out to subscribers.
///
/// Subscribers that hang up are dropped on the next publish; the bus never
/// blocks on a slow reader.
pub struct SignalBus {
    latest: Signals,
    subscribers: Vec<Sender<Signals>>,
}

impl SignalBus {
    pub fn new(initial: Signals) -> Self {
        SignalBus {
            latest: initial,
            subscribers: Vec::new(),
        }
    }

    pub fn latest(&self) -> Signals {
        self.latest
    }

    /// Register for a copy of every published tick.
    pub fn subscribe(&mut self) -> Receiver<Signals> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn publish(&mut self, signals: Signals) {
        self.latest = signals;
        self.subscribers.retain(|tx| tx.send(signals).is_ok());
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn bus() -> SignalBus {
        SignalBus::new(Signals::initial(&ControlConfig::default()))
    }

    #[test]
    fn initial_signals_match_config() {
        let s = Signals::initial(&ControlConfig::default());
        assert_eq!(s.mode, SceneMode::Scattered);
        assert_eq!(s.target_distance, 12.0);
        assert!(s.power);
        assert!(!s.cursor_visible());
    }

    #[test]
    fn publish_updates_latest() {
        let mut bus = bus();
        let mut s = bus.latest();
        s.rotation_rate = 0.7;
        bus.publish(s);
        assert_eq!(bus.latest().rotation_rate, 0.7);
    }

    #[test]
    fn subscribers_see_every_publish() {
        let mut bus = bus();
        let rx = bus.subscribe();
        let mut s = bus.latest();
        s.mode = SceneMode::Formed;
        bus.publish(s);
        s.rotation_rate = 1.0;
        bus.publish(s);

        assert_eq!(rx.try_iter().count(), 2);
    }

    #[test]
    fn dead_subscriber_pruned() {
        let mut bus = bus();
        let rx = bus.subscribe();
        drop(rx);
        bus.publish(Signals::initial(&ControlConfig::default()));
        bus.publish(Signals::initial(&ControlConfig::default()));
        assert!(bus.subscribers.is_empty());
    }
}
