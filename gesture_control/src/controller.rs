//! The interaction controller.
//!
//! One deterministic step per detection tick: power-toggle detection first
//! (unconditional), then pinch edge handling, then EITHER the continuous
//! drag mapper (while pinching) OR the discrete gesture debouncer, then a
//! single publish. Pinch-drag and mode-switching are mutually exclusive
//! channels; the debounce window is starved while a drag is live.
//!
//! All transitions are pure in (state, frame, now), so the whole state
//! machine is unit-testable with synthetic frames and explicit timestamps.

use std::sync::mpsc::Receiver;
use std::time::Instant;

use hand_stream::{GestureLabel, Hand, HandFrame};
use tracing::{debug, info};

use crate::config::ControlConfig;
use crate::history::GestureHistory;
use crate::signals::{SceneMode, SignalBus, Signals};

// ════════════════════════════════════════════════════════════════════════════
// Phase
// ════════════════════════════════════════════════════════════════════════════

/// Which interaction channel currently owns the hand.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Phase {
    /// No engagement tracked.
    Idle,
    /// Thumb and index held together; the baselines anchor the drag.
    Pinching { start_y: f32, start_distance: f32 },
    /// Accumulating coarse labels toward a mode flip.
    Debouncing,
}

// ════════════════════════════════════════════════════════════════════════════
// InteractionState
// ════════════════════════════════════════════════════════════════════════════

/// The single mutable record behind the controller. Created when gesture
/// interaction starts, mutated only by [`GestureController::tick`],
/// discarded when gesture interaction ends. Nothing else may write it.
struct InteractionState {
    power: bool,
    phase: Phase,
    mode: SceneMode,
    current_distance: f32,
    rotation_rate: f32,
    history: GestureHistory,
    prev_wrist_y: Option<f32>,
    last_power_toggle: Option<Instant>,
    /// Smoothed cursor in screen pixels; `None` while tracking is lost.
    cursor: Option<(f32, f32)>,
}

// ════════════════════════════════════════════════════════════════════════════
// GestureController
// ════════════════════════════════════════════════════════════════════════════

pub struct GestureController {
    cfg: ControlConfig,
    viewport: (f32, f32),
    state: InteractionState,
    bus: SignalBus,
}

impl GestureController {
    /// `viewport` is the window size in pixels; the cursor signal is mapped
    /// into it.
    pub fn new(cfg: ControlConfig, viewport: (f32, f32)) -> Self {
        let initial = Signals::initial(&cfg);
        GestureController {
            state: InteractionState {
                power: initial.power,
                phase: Phase::Idle,
                mode: initial.mode,
                current_distance: cfg.default_distance,
                rotation_rate: 0.0,
                history: GestureHistory::new(cfg.history_capacity),
                prev_wrist_y: None,
                last_power_toggle: None,
                cursor: None,
            },
            bus: SignalBus::new(initial),
            cfg,
            viewport,
        }
    }

    pub fn set_viewport(&mut self, width: f32, height: f32) {
        self.viewport = (width, height);
    }

    pub fn config(&self) -> &ControlConfig {
        &self.cfg
    }

    /// Latest published signals.
    pub fn signals(&self) -> Signals {
        self.bus.latest()
    }

    /// Receive a copy of every future publish.
    pub fn subscribe(&mut self) -> Receiver<Signals> {
        self.bus.subscribe()
    }

    pub fn is_pinching(&self) -> bool {
        matches!(self.state.phase, Phase::Pinching { .. })
    }

    /// Current debounce-window fill, for status display.
    pub fn history_len(&self) -> usize {
        self.state.history.len()
    }

    // ── per-tick step ─────────────────────────────────────────────────────

    /// Process one detection frame. Runs every detector, then publishes the
    /// complete signal set exactly once.
    pub fn tick(&mut self, frame: &HandFrame, now: Instant) {
        match frame.primary() {
            None => self.degrade(),
            Some(hand) => {
                self.detect_power_toggle(hand, frame.label(), now);
                self.track_cursor(hand);
                self.step_phase(hand, frame.label());
            }
        }
        self.publish();
    }

    /// Tracking lost: no stale continuous signal may survive this tick.
    fn degrade(&mut self) {
        if self.state.cursor.is_some() {
            debug!("tracking lost; continuous signals reset");
        }
        self.state.phase = Phase::Idle;
        self.state.rotation_rate = 0.0;
        self.state.history.clear();
        self.state.cursor = None;
        // A wrist velocity across a tracking gap is meaningless.
        self.state.prev_wrist_y = None;
    }

    /// Fist slammed downward flips power, rate-limited by the cooldown.
    /// Runs before any gating so the toggle works while power is off.
    fn detect_power_toggle(&mut self, hand: &Hand, label: GestureLabel, now: Instant) {
        let wrist_y = hand.wrist().y;
        if let Some(prev) = self.state.prev_wrist_y {
            let vy = wrist_y - prev;
            let cooled = self
                .state
                .last_power_toggle
                .map_or(true, |t| now.saturating_duration_since(t) >= self.cfg.power_cooldown());
            if label == GestureLabel::ClosedFist && vy > self.cfg.slam_velocity && cooled {
                self.state.power = !self.state.power;
                self.state.last_power_toggle = Some(now);
                info!(power = self.state.power, "fist slam: power toggled");
            }
        }
        self.state.prev_wrist_y = Some(wrist_y);
    }

    /// Cursor bookkeeping runs even while power is off, so the user can see
    /// the sensor is tracking.
    fn track_cursor(&mut self, hand: &Hand) {
        let tip = hand.index_tip();
        // The camera image is a mirror; flip x so hand-right is screen-right.
        let target = ((1.0 - tip.x) * self.viewport.0, tip.y * self.viewport.1);
        self.state.cursor = Some(match self.state.cursor {
            None => target,
            Some((cx, cy)) => {
                let a = self.cfg.cursor_smoothing;
                (cx + (target.0 - cx) * a, cy + (target.1 - cy) * a)
            }
        });
    }

    fn step_phase(&mut self, hand: &Hand, label: GestureLabel) {
        let d = hand.thumb_tip().planar_distance(hand.index_tip());
        let pinching_now = d < self.cfg.pinch_threshold;

        match (self.state.phase, pinching_now) {
            (Phase::Pinching { .. }, false) => {
                // Falling edge: kill residual spin immediately.
                self.state.rotation_rate = 0.0;
                self.state.phase = Phase::Idle;
                debug!("pinch released");
            }
            (Phase::Idle | Phase::Debouncing, true) => {
                // Rising edge: anchor the drag to this fingertip position
                // and the distance the camera is at right now.
                self.state.phase = Phase::Pinching {
                    start_y: hand.index_tip().y,
                    start_distance: self.state.current_distance,
                };
                self.state.history.clear();
                debug!("pinch engaged");
            }
            _ => {}
        }

        if let Phase::Pinching {
            start_y,
            start_distance,
        } = self.state.phase
        {
            self.drag(hand, start_y, start_distance);
        } else {
            self.debounce(label);
        }
    }

    /// Continuous mapper: zoom from vertical travel, rotation from
    /// horizontal deviation. Only runs while pinching.
    fn drag(&mut self, hand: &Hand, start_y: f32, start_distance: f32) {
        // Mode-switching is starved while a drag is live.
        self.state.history.clear();

        if !self.state.power {
            self.state.rotation_rate = 0.0;
            return;
        }

        let tip = hand.index_tip();

        // Fingertip up (y shrinking) pulls the camera in.
        let dy = tip.y - start_y;
        self.state.current_distance = (start_distance + dy * self.cfg.zoom_sensitivity)
            .clamp(self.cfg.min_distance, self.cfg.max_distance);

        // Mirrored deviation from screen centre, deadzone, rescaled excess.
        let dx = (1.0 - tip.x) - 0.5;
        self.state.rotation_rate = if dx.abs() < self.cfg.deadzone {
            0.0
        } else {
            dx.signum() * (dx.abs() - self.cfg.deadzone) / self.cfg.deadzone_span
                * self.cfg.rotation_speed
        };
    }

    /// Discrete debouncer: a mode flips only when a full window of
    /// consecutive ticks agrees on one label.
    fn debounce(&mut self, label: GestureLabel) {
        self.state.phase = Phase::Debouncing;
        self.state.history.push(label);

        if !self.state.power {
            return;
        }

        if let Some(stable) = self.state.history.unanimous() {
            let mode = match stable {
                GestureLabel::ClosedFist => Some(SceneMode::Formed),
                GestureLabel::OpenPalm => Some(SceneMode::Scattered),
                _ => None,
            };
            if let Some(mode) = mode {
                self.state.mode = mode;
                // Cleared so the held gesture cannot re-trigger every tick.
                self.state.history.clear();
                self.state.phase = Phase::Idle;
                info!(mode = mode.name(), "stable gesture: mode flip");
            }
        }
    }

    fn publish(&mut self) {
        self.bus.publish(Signals {
            mode: self.state.mode,
            rotation_rate: self.state.rotation_rate,
            target_distance: self.state.current_distance,
            power: self.state.power,
            cursor: self.state.cursor,
        });
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use hand_stream::landmark::{INDEX_TIP, LANDMARKS_PER_HAND, THUMB_TIP, WRIST};
    use hand_stream::{Classification, Landmark};
    use proptest::prelude::*;
    use std::time::Duration;

    fn ctl() -> GestureController {
        GestureController::new(ControlConfig::default(), (800.0, 600.0))
    }

    fn hand(index: (f32, f32), thumb: (f32, f32), wrist_y: f32) -> Hand {
        let mut pts = vec![Landmark::new(0.5, 0.5, 0.0); LANDMARKS_PER_HAND];
        pts[INDEX_TIP] = Landmark::new(index.0, index.1, 0.0);
        pts[THUMB_TIP] = Landmark::new(thumb.0, thumb.1, 0.0);
        pts[WRIST] = Landmark::new(0.5, wrist_y, 0.0);
        Hand::from_landmarks(pts).unwrap()
    }

    /// Thumb 0.03 from the index tip: under the 0.05 threshold.
    fn pinch_at(x: f32, y: f32) -> HandFrame {
        HandFrame::new(vec![hand((x, y), (x + 0.03, y), 0.7)], None)
    }

    /// Thumb well clear of the index tip.
    fn hover_at(x: f32, y: f32) -> HandFrame {
        HandFrame::new(vec![hand((x, y), (x + 0.2, y), 0.7)], None)
    }

    fn labeled(label: GestureLabel) -> HandFrame {
        HandFrame::new(
            vec![hand((0.5, 0.4), (0.7, 0.4), 0.7)],
            Some(Classification::new(label, 0.9)),
        )
    }

    fn fist_at_wrist(wrist_y: f32) -> HandFrame {
        HandFrame::new(
            vec![hand((0.5, 0.4), (0.7, 0.4), wrist_y)],
            Some(Classification::new(GestureLabel::ClosedFist, 0.9)),
        )
    }

    fn at(t0: Instant, ms: u64) -> Instant {
        t0 + Duration::from_millis(ms)
    }

    // ── pinch edges ───────────────────────────────────────────────────────

    #[test]
    fn pinch_engages_on_that_tick() {
        let mut c = ctl();
        let t0 = Instant::now();
        c.tick(&hover_at(0.5, 0.4), t0);
        assert!(!c.is_pinching());
        c.tick(&pinch_at(0.5, 0.4), at(t0, 50));
        assert!(c.is_pinching());
    }

    #[test]
    fn release_zeroes_rotation_immediately() {
        let mut c = ctl();
        let t0 = Instant::now();
        c.tick(&pinch_at(0.2, 0.4), t0);
        assert!(c.signals().rotation_rate > 0.0);
        c.tick(&hover_at(0.2, 0.4), at(t0, 50));
        assert!(!c.is_pinching());
        assert_eq!(c.signals().rotation_rate, 0.0);
    }

    // ── zoom axis ─────────────────────────────────────────────────────────

    #[test]
    fn drag_down_zooms_out() {
        let mut c = ctl();
        let t0 = Instant::now();
        c.tick(&pinch_at(0.5, 0.4), t0);
        assert_eq!(c.signals().target_distance, 12.0);
        c.tick(&pinch_at(0.5, 0.5), at(t0, 50));
        assert!((c.signals().target_distance - 14.0).abs() < 1e-4);
    }

    #[test]
    fn drag_up_zooms_in() {
        let mut c = ctl();
        let t0 = Instant::now();
        c.tick(&pinch_at(0.5, 0.4), t0);
        c.tick(&pinch_at(0.5, 0.3), at(t0, 50));
        assert!((c.signals().target_distance - 10.0).abs() < 1e-4);
    }

    #[test]
    fn distance_clamped_at_both_ends() {
        let mut c = ctl();
        let t0 = Instant::now();
        c.tick(&pinch_at(0.5, 0.05), t0);
        c.tick(&pinch_at(0.5, 1.0), at(t0, 50));
        assert_eq!(c.signals().target_distance, 30.0);

        // Coming back down takes two drags; one full-screen drag moves at
        // most 20 distance units.
        c.tick(&hover_at(0.5, 1.0), at(t0, 100));
        c.tick(&pinch_at(0.5, 0.95), at(t0, 150));
        c.tick(&pinch_at(0.5, 0.0), at(t0, 200)); // 30 - 19 = 11
        c.tick(&hover_at(0.5, 0.0), at(t0, 250));
        c.tick(&pinch_at(0.5, 0.95), at(t0, 300));
        c.tick(&pinch_at(0.5, 0.0), at(t0, 350)); // 11 - 19, clamped
        assert_eq!(c.signals().target_distance, 5.0);
    }

    #[test]
    fn distance_persists_across_pinches() {
        let mut c = ctl();
        let t0 = Instant::now();
        c.tick(&pinch_at(0.5, 0.4), t0);
        c.tick(&pinch_at(0.5, 0.5), at(t0, 50));
        c.tick(&hover_at(0.5, 0.5), at(t0, 100));
        // New pinch anchors at the distance the last drag left behind.
        c.tick(&pinch_at(0.5, 0.2), at(t0, 150));
        assert!((c.signals().target_distance - 14.0).abs() < 1e-4);
    }

    proptest! {
        #[test]
        fn distance_always_within_bounds(
            drags in proptest::collection::vec((any::<bool>(), 0.0f32..1.0), 1..60)
        ) {
            let mut c = ctl();
            let t0 = Instant::now();
            for (i, (pinch, y)) in drags.into_iter().enumerate() {
                let frame = if pinch { pinch_at(0.5, y) } else { hover_at(0.5, y) };
                c.tick(&frame, at(t0, i as u64 * 50));
                let d = c.signals().target_distance;
                prop_assert!((5.0..=30.0).contains(&d), "distance {} escaped bounds", d);
            }
        }
    }

    // ── rotation axis ─────────────────────────────────────────────────────

    #[test]
    fn centered_tip_never_rotates() {
        let mut c = ctl();
        let t0 = Instant::now();
        for (i, y) in [0.2f32, 0.5, 0.8].into_iter().enumerate() {
            c.tick(&pinch_at(0.5, y), at(t0, i as u64 * 50));
            assert_eq!(c.signals().rotation_rate, 0.0);
        }
    }

    #[test]
    fn rotation_rescales_past_deadzone() {
        let mut c = ctl();
        let t0 = Instant::now();
        // x = 0.2 → mirrored deviation +0.3 → (0.3 - 0.1) / 0.4 * 1.5 = 0.75
        c.tick(&pinch_at(0.2, 0.4), t0);
        assert!((c.signals().rotation_rate - 0.75).abs() < 1e-4);
        // Other side mirrors the sign.
        c.tick(&pinch_at(0.8, 0.4), at(t0, 50));
        assert!((c.signals().rotation_rate + 0.75).abs() < 1e-4);
    }

    proptest! {
        #[test]
        fn deadzone_maps_to_exact_zero(dx in -0.0999f32..0.0999) {
            let mut c = ctl();
            // deviation = (1 - x) - 0.5, so x = 0.5 - dx.
            c.tick(&pinch_at(0.5 - dx, 0.4), Instant::now());
            prop_assert_eq!(c.signals().rotation_rate, 0.0);
        }
    }

    // ── debouncer ─────────────────────────────────────────────────────────

    fn drive_labels(c: &mut GestureController, t0: Instant, from_ms: u64, label: GestureLabel, n: usize) {
        for i in 0..n {
            c.tick(&labeled(label), at(t0, from_ms + i as u64 * 50));
        }
    }

    #[test]
    fn full_unanimous_window_flips_mode_once() {
        let mut c = ctl();
        let t0 = Instant::now();
        drive_labels(&mut c, t0, 0, GestureLabel::ClosedFist, 10);
        assert_eq!(c.signals().mode, SceneMode::Formed);
        assert_eq!(c.history_len(), 0);

        // Nine palms are not enough...
        drive_labels(&mut c, t0, 1000, GestureLabel::OpenPalm, 9);
        assert_eq!(c.signals().mode, SceneMode::Formed);
        // ...the tenth flips it, and the window clears at once.
        c.tick(&labeled(GestureLabel::OpenPalm), at(t0, 1450));
        assert_eq!(c.signals().mode, SceneMode::Scattered);
        assert_eq!(c.history_len(), 0);

        // Holding the palm does not re-trigger until a fresh window fills.
        drive_labels(&mut c, t0, 2000, GestureLabel::OpenPalm, 5);
        assert_eq!(c.signals().mode, SceneMode::Scattered);
        assert_eq!(c.history_len(), 5);
    }

    #[test]
    fn single_dissenting_frame_vetoes_flip() {
        let mut c = ctl();
        let t0 = Instant::now();
        drive_labels(&mut c, t0, 0, GestureLabel::ClosedFist, 9);
        c.tick(&labeled(GestureLabel::None), at(t0, 450));
        drive_labels(&mut c, t0, 500, GestureLabel::ClosedFist, 9);
        assert_eq!(c.signals().mode, SceneMode::Scattered);
    }

    #[test]
    fn unmapped_label_never_flips_mode() {
        let mut c = ctl();
        let t0 = Instant::now();
        drive_labels(&mut c, t0, 0, GestureLabel::Victory, 20);
        assert_eq!(c.signals().mode, SceneMode::Scattered);
    }

    #[test]
    fn pinching_starves_the_window() {
        let mut c = ctl();
        let t0 = Instant::now();
        drive_labels(&mut c, t0, 0, GestureLabel::ClosedFist, 6);
        assert_eq!(c.history_len(), 6);
        c.tick(&pinch_at(0.5, 0.4), at(t0, 300));
        assert_eq!(c.history_len(), 0);
    }

    proptest! {
        #[test]
        fn history_never_exceeds_capacity(
            labels in proptest::collection::vec(0u8..4, 1..80)
        ) {
            let mut c = ctl();
            let t0 = Instant::now();
            for (i, l) in labels.into_iter().enumerate() {
                let label = match l {
                    0 => GestureLabel::None,
                    1 => GestureLabel::OpenPalm,
                    2 => GestureLabel::ClosedFist,
                    _ => GestureLabel::Victory,
                };
                c.tick(&labeled(label), at(t0, i as u64 * 50));
                prop_assert!(c.history_len() <= 10);
            }
        }
    }

    // ── power toggle ──────────────────────────────────────────────────────

    #[test]
    fn slam_toggles_and_cooldown_gates() {
        let mut c = ctl();
        let t0 = Instant::now();
        assert!(c.signals().power);

        c.tick(&fist_at_wrist(0.5), t0);
        c.tick(&fist_at_wrist(0.62), at(t0, 50)); // vy = 0.12: slam
        assert!(!c.signals().power);

        // A second slam inside the cooldown does nothing.
        c.tick(&fist_at_wrist(0.5), at(t0, 100));
        c.tick(&fist_at_wrist(0.62), at(t0, 150));
        assert!(!c.signals().power);

        // After the cooldown it toggles back.
        c.tick(&fist_at_wrist(0.5), at(t0, 2100));
        c.tick(&fist_at_wrist(0.62), at(t0, 2150));
        assert!(c.signals().power);
    }

    #[test]
    fn slow_drift_does_not_toggle() {
        let mut c = ctl();
        let t0 = Instant::now();
        for i in 0..20 {
            c.tick(&fist_at_wrist(0.3 + i as f32 * 0.01), at(t0, i * 50));
        }
        assert!(c.signals().power);
    }

    #[test]
    fn slam_requires_the_fist_label() {
        let mut c = ctl();
        let t0 = Instant::now();
        c.tick(&labeled(GestureLabel::OpenPalm), t0);
        let fast = HandFrame::new(
            vec![hand((0.5, 0.4), (0.7, 0.4), 0.9)],
            Some(Classification::new(GestureLabel::OpenPalm, 0.9)),
        );
        c.tick(&fast, at(t0, 50));
        assert!(c.signals().power);
    }

    #[test]
    fn no_velocity_across_a_tracking_gap() {
        let mut c = ctl();
        let t0 = Instant::now();
        c.tick(&fist_at_wrist(0.2), t0);
        c.tick(&HandFrame::empty(), at(t0, 50));
        // First frame after reacquisition has no previous wrist sample.
        c.tick(&fist_at_wrist(0.9), at(t0, 100));
        assert!(c.signals().power);
    }

    // ── power gating ──────────────────────────────────────────────────────

    fn power_off(c: &mut GestureController, t0: Instant) {
        c.tick(&fist_at_wrist(0.5), t0);
        c.tick(&fist_at_wrist(0.62), at(t0, 50));
        assert!(!c.signals().power);
    }

    #[test]
    fn power_off_suppresses_zoom_and_rotation() {
        let mut c = ctl();
        let t0 = Instant::now();
        power_off(&mut c, t0);

        c.tick(&pinch_at(0.2, 0.3), at(t0, 200));
        c.tick(&pinch_at(0.2, 0.8), at(t0, 250));
        assert_eq!(c.signals().target_distance, 12.0);
        assert_eq!(c.signals().rotation_rate, 0.0);
    }

    #[test]
    fn power_off_suppresses_mode_flips() {
        let mut c = ctl();
        let t0 = Instant::now();
        drive_labels(&mut c, t0, 0, GestureLabel::ClosedFist, 10);
        assert_eq!(c.signals().mode, SceneMode::Formed);

        power_off(&mut c, t0 + Duration::from_millis(3000));
        drive_labels(&mut c, t0, 4000, GestureLabel::OpenPalm, 15);
        assert_eq!(c.signals().mode, SceneMode::Formed);
    }

    #[test]
    fn cursor_still_tracks_while_off() {
        let mut c = ctl();
        let t0 = Instant::now();
        power_off(&mut c, t0);
        c.tick(&hover_at(0.3, 0.6), at(t0, 200));
        assert!(c.signals().cursor_visible());
    }

    // ── degradation ───────────────────────────────────────────────────────

    #[test]
    fn zero_hands_resets_on_that_same_tick() {
        let mut c = ctl();
        let t0 = Instant::now();
        c.tick(&pinch_at(0.2, 0.4), t0);
        assert!(c.signals().rotation_rate > 0.0);
        assert!(c.signals().cursor_visible());

        c.tick(&HandFrame::empty(), at(t0, 50));
        let s = c.signals();
        assert_eq!(s.rotation_rate, 0.0);
        assert!(!s.cursor_visible());
        assert!(!c.is_pinching());
        assert_eq!(c.history_len(), 0);
    }

    // ── cursor ────────────────────────────────────────────────────────────

    #[test]
    fn cursor_mirrors_and_smooths() {
        let mut c = ctl();
        let t0 = Instant::now();
        // First sighting snaps straight to the target.
        c.tick(&hover_at(0.25, 0.5), t0);
        let (x, y) = c.signals().cursor.unwrap();
        assert!((x - 600.0).abs() < 1e-3);
        assert!((y - 300.0).abs() < 1e-3);

        // Second sample moves 40% of the way to the new target.
        c.tick(&hover_at(0.75, 0.5), at(t0, 50));
        let (x, _) = c.signals().cursor.unwrap();
        assert!((x - 440.0).abs() < 1e-3);
    }

    // ── bus ───────────────────────────────────────────────────────────────

    #[test]
    fn every_tick_publishes_exactly_once() {
        let mut c = ctl();
        let rx = c.subscribe();
        let t0 = Instant::now();
        c.tick(&hover_at(0.5, 0.5), t0);
        c.tick(&HandFrame::empty(), at(t0, 50));
        c.tick(&pinch_at(0.5, 0.5), at(t0, 100));
        assert_eq!(rx.try_iter().count(), 3);
    }
}
