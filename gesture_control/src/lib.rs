//! # gesture_control
//!
//! Converts a noisy, intermittent stream of hand frames into a small set of
//! stable control signals for the particle scene.
//!
//! ## Signal map
//!
//! | Input | Detector | Output |
//! |---|---|---|
//! | Thumb+index held together | pinch edge detector | drag engagement |
//! | Pinch-drag vertical | continuous mapper | camera distance, [5, 30] |
//! | Pinch-drag horizontal | continuous mapper | orbit rate (0.1 deadzone) |
//! | Full window of one label | debouncer | mode: formed / scattered |
//! | Fist slammed downward | power detector | power flip (2 s cooldown) |
//! | Index fingertip | cursor tracker | smoothed cursor, mirrored |
//! | Zero hands | degradation | everything continuous reset |
//!
//! The controller is a single-owner state machine: one `tick` per admitted
//! detection frame, one publish per tick, no shared mutable state. The
//! [`FrameLimiter`] caps how often detection is even attempted; the
//! [`SignalBus`] hands the results to whoever renders them.
//!
//! Pinch-drag and mode-switching are mutually exclusive by design: while a
//! drag is live the debounce window is cleared every tick, so the scene can
//! never zoom and flip state at the same time.

pub mod config;
pub mod controller;
pub mod history;
pub mod limiter;
pub mod signals;

pub use config::{ConfigError, ControlConfig};
pub use controller::{GestureController, Phase};
pub use history::GestureHistory;
pub use limiter::FrameLimiter;
pub use signals::{SceneMode, SignalBus, Signals};
