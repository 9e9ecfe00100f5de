//! # hand_stream
//!
//! Hand landmark frames and the sources that produce them.
//!
//! A [`HandFrame`] is one tick of detection: zero, one, or two hands of 21
//! normalized keypoints each, plus at most one coarse gesture label with a
//! confidence score for the primary hand. Frames come from a
//! [`HandPoseSource`], polled by the consumer at its own cadence.
//!
//! ## Sources
//!
//! | Source | Availability | Produces |
//! |---|---|---|
//! | [`SimHandSource`] | always | synthetic hands from keyboard/mouse input |
//! | [`ChannelSource`] | always | frames pushed by any producer thread |
//! | `LeapHandSource` | feature `leap` | real LeapMotion hands via LeapC |
//!
//! The simulator builds geometrically plausible hands (pinch actually closes
//! the thumb-to-index distance, a slam actually drops the wrist), so the
//! entire downstream pipeline runs unchanged against it.
//!
//! ## Landmark topology
//!
//! Fixed by the external model's convention: index 0 = wrist, 4 = thumb tip,
//! 8 = index fingertip. See [`landmark`] for the full constant set.
//!
//! Zero hands is a normal, frequent observation, not an error. The only
//! errors this crate produces are malformed hand records (wrong keypoint
//! count), rejected at construction, and device unavailability.

use thiserror::Error;

pub mod classify;
pub mod frame;
pub mod landmark;
pub mod source;

pub use classify::classify;
pub use frame::{Classification, GestureLabel, HandFrame, MAX_HANDS};
pub use landmark::{Hand, Landmark, INDEX_TIP, LANDMARKS_PER_HAND, THUMB_TIP, WRIST};
pub use source::{frame_channel, ChannelSource, HandPoseSource, SimHandSource, SimInput};

#[cfg(feature = "leap")]
pub use source::LeapHandSource;

// ════════════════════════════════════════════════════════════════════════════
// Errors
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Error)]
pub enum HandStreamError {
    /// The pose model emitted a hand record without the full keypoint set.
    #[error("malformed hand record: expected {} landmarks, got {got}", LANDMARKS_PER_HAND)]
    MalformedHand { got: usize },

    /// The tracking device could not be opened or went away.
    #[error("hand tracking device unavailable: {0}")]
    DeviceUnavailable(String),
}
