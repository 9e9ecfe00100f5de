//! Coarse gesture classification from raw landmarks.
//!
//! Sources that only produce keypoints (the simulator, the LeapMotion
//! backend) derive their per-frame label here. The measurement is the
//! tip-to-wrist distance of each finger relative to palm length, which is
//! invariant to hand size and camera distance.

use crate::frame::{Classification, GestureLabel};
use crate::landmark::{
    Hand, INDEX_TIP, MIDDLE_MCP, MIDDLE_TIP, PINKY_TIP, RING_TIP, THUMB_TIP,
};

// Extension ratio thresholds (empirically tuned).
// ratio = tip-to-wrist distance / palm length (wrist to middle knuckle).
const EXTENDED_RATIO: f32 = 1.45; // above this the finger counts as straight
const CURLED_RATIO: f32 = 1.10; // below this the finger counts as curled
const MARGIN_SPAN: f32 = 0.40; // ratio distance that saturates confidence

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FingerState {
    Extended,
    Curled,
    Indeterminate,
}

/// Tip-to-wrist distance relative to palm length.
fn extension_ratio(hand: &Hand, tip: usize) -> f32 {
    let palm = hand.wrist().planar_distance(hand.landmark(MIDDLE_MCP));
    hand.landmark(tip).planar_distance(hand.wrist()) / palm.max(1e-3)
}

fn finger_state(ratio: f32) -> FingerState {
    if ratio > EXTENDED_RATIO {
        FingerState::Extended
    } else if ratio < CURLED_RATIO {
        FingerState::Curled
    } else {
        FingerState::Indeterminate
    }
}

/// How decisively a ratio sits beyond its threshold, 0.0–1.0.
fn margin(ratio: f32, state: FingerState) -> f32 {
    let m = match state {
        FingerState::Extended => (ratio - EXTENDED_RATIO) / MARGIN_SPAN,
        FingerState::Curled => (CURLED_RATIO - ratio) / MARGIN_SPAN,
        FingerState::Indeterminate => 0.0,
    };
    m.clamp(0.0, 1.0)
}

/// Classify one hand into the coarse vocabulary.
///
/// Thumb state is ignored for `PointingUp` and `Victory`; people rarely
/// tuck the thumb cleanly for those.
pub fn classify(hand: &Hand) -> Classification {
    use FingerState::*;

    let tips = [THUMB_TIP, INDEX_TIP, MIDDLE_TIP, RING_TIP, PINKY_TIP];
    let ratios = tips.map(|t| extension_ratio(hand, t));
    let [thumb, index, middle, ring, pinky] = ratios.map(finger_state);

    let (label, fingers): (GestureLabel, &[usize]) =
        if index == Extended && middle == Extended && ring == Curled && pinky == Curled {
            (GestureLabel::Victory, &[1, 2, 3, 4])
        } else if index == Extended && middle == Curled && ring == Curled && pinky == Curled {
            (GestureLabel::PointingUp, &[1, 2, 3, 4])
        } else if [thumb, index, middle, ring, pinky].iter().all(|s| *s == Extended) {
            (GestureLabel::OpenPalm, &[0, 1, 2, 3, 4])
        } else if thumb == Extended && [index, middle, ring, pinky].iter().all(|s| *s == Curled) {
            (GestureLabel::ThumbUp, &[0, 1, 2, 3, 4])
        } else if [thumb, index, middle, ring, pinky].iter().all(|s| *s == Curled) {
            (GestureLabel::ClosedFist, &[0, 1, 2, 3, 4])
        } else {
            return Classification::new(GestureLabel::None, 0.0);
        };

    // Confidence: how decisively the participating fingers clear their
    // thresholds.
    let states = [thumb, index, middle, ring, pinky];
    let sum: f32 = fingers.iter().map(|&i| margin(ratios[i], states[i])).sum();
    let confidence = 0.5 + 0.5 * (sum / fingers.len() as f32);

    Classification::new(label, confidence)
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
