//! Per-tick detection output: zero, one, or two hands plus at most one
//! coarse gesture classification for the primary hand.

use crate::landmark::Hand;

/// Most hands a single frame may carry.
pub const MAX_HANDS: usize = 2;

// ════════════════════════════════════════════════════════════════════════════
// GestureLabel
// ════════════════════════════════════════════════════════════════════════════

/// Coarse gesture vocabulary of the pose model.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum GestureLabel {
    /// Nothing recognizable this frame.
    #[default]
    None,
    OpenPalm,
    ClosedFist,
    PointingUp,
    Victory,
    ThumbUp,
}

impl GestureLabel {
    pub fn name(&self) -> &'static str {
        match self {
            GestureLabel::None => "none",
            GestureLabel::OpenPalm => "open palm",
            GestureLabel::ClosedFist => "closed fist",
            GestureLabel::PointingUp => "pointing up",
            GestureLabel::Victory => "victory",
            GestureLabel::ThumbUp => "thumb up",
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Classification
// ════════════════════════════════════════════════════════════════════════════

/// A coarse label with the model's confidence in it (0.0–1.0).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Classification {
    pub label: GestureLabel,
    pub confidence: f32,
}

impl Classification {
    pub fn new(label: GestureLabel, confidence: f32) -> Self {
        Classification {
            label,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// HandFrame
// ════════════════════════════════════════════════════════════════════════════

/// One tick's worth of detection.
///
/// Zero hands is a normal, frequent value (tracking drops out constantly),
/// not an error. The classification, when present, belongs to the primary
/// (first-listed) hand.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HandFrame {
    hands: Vec<Hand>,
    classification: Option<Classification>,
}

impl HandFrame {
    /// A frame with no detected hands.
    pub fn empty() -> Self {
        HandFrame::default()
    }

    pub fn new(mut hands: Vec<Hand>, classification: Option<Classification>) -> Self {
        hands.truncate(MAX_HANDS);
        HandFrame {
            hands,
            classification,
        }
    }

    /// The hand the controller reads landmarks from.
    pub fn primary(&self) -> Option<&Hand> {
        self.hands.first()
    }

    pub fn hands(&self) -> &[Hand] {
        &self.hands
    }

    pub fn hand_count(&self) -> usize {
        self.hands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hands.is_empty()
    }

    pub fn classification(&self) -> Option<&Classification> {
        self.classification.as_ref()
    }

    /// The coarse label for this frame, `GestureLabel::None` when the model
    /// offered nothing.
    pub fn label(&self) -> GestureLabel {
        self.classification
            .map(|c| c.label)
            .unwrap_or(GestureLabel::None)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
