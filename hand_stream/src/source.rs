//! Hand-pose sources — pollable producers of [`HandFrame`].
//!
//! The consumer polls [`HandPoseSource::detect`] at its own cadence; a
//! source never blocks. Frames may come from real hardware (the `leap`
//! feature) or from the keyboard/mouse simulator, and the consumer cannot
//! tell the difference.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::time::Instant;

use crate::classify::classify;
use crate::frame::HandFrame;
use crate::landmark::{
    Hand, Landmark, INDEX_MCP, INDEX_TIP, LANDMARKS_PER_HAND, MIDDLE_MCP, MIDDLE_TIP,
    PINKY_MCP, PINKY_TIP, RING_MCP, RING_TIP, THUMB_TIP, WRIST,
};

// ════════════════════════════════════════════════════════════════════════════
// HandPoseSource trait — unified interface for hw and sim
// ════════════════════════════════════════════════════════════════════════════

/// Anything that can be polled for hand frames.
///
/// `None` means no new frame was produced this tick; the caller keeps
/// whatever state it had. A frame with zero hands is a real observation
/// ("tracking lost") and must be delivered as `Some`.
pub trait HandPoseSource {
    fn detect(&mut self, now: Instant) -> Option<HandFrame>;
}

// ════════════════════════════════════════════════════════════════════════════
// ChannelSource — adapter over a frame-producing thread
// ════════════════════════════════════════════════════════════════════════════

/// Exposes an `mpsc::Receiver<HandFrame>` as a polled source.
///
/// The queue is drained on every poll and only the newest frame is kept;
/// a slow consumer must never act on stale landmarks. Once the producer
/// hangs up, every poll yields an empty frame so the consumer settles into
/// the permanent zero-hands condition.
pub struct ChannelSource {
    rx: Receiver<HandFrame>,
    disconnected: bool,
}

impl ChannelSource {
    pub fn new(rx: Receiver<HandFrame>) -> Self {
        ChannelSource {
            rx,
            disconnected: false,
        }
    }
}

/// Convenience constructor for a channel-backed source.
pub fn frame_channel() -> (Sender<HandFrame>, ChannelSource) {
    let (tx, rx) = mpsc::channel();
    (tx, ChannelSource::new(rx))
}

impl HandPoseSource for ChannelSource {
    fn detect(&mut self, _now: Instant) -> Option<HandFrame> {
        if self.disconnected {
            return Some(HandFrame::empty());
        }
        let mut latest = None;
        loop {
            match self.rx.try_recv() {
                Ok(frame) => latest = Some(frame),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.disconnected = true;
                    return Some(latest.unwrap_or_else(HandFrame::empty));
                }
            }
        }
        latest
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SimInput — raw events from the simulation window
// ════════════════════════════════════════════════════════════════════════════

/// Raw input event from the simulation window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SimInput {
    /// Pointer moved. Coordinates are normalized to the window and
    /// pre-mirrored, so the downstream webcam un-mirror puts the cursor
    /// back under the pointer.
    Move { x: f32, y: f32 },
    /// Pinch held / released (thumb tip folded onto the index tip).
    Pinch(bool),
    /// Closed-fist pose held / released.
    Fist(bool),
    /// Open-palm pose held / released.
    Palm(bool),
    /// One-frame downward wrist jump in a fist pose.
    Slam,
    /// Pointer left the window: tracking drops out.
    Lost,
}

// ════════════════════════════════════════════════════════════════════════════
// SimHandSource — synthetic hands from keyboard/mouse (always available)
// ════════════════════════════════════════════════════════════════════════════

/// Builds full 21-landmark frames from window input so the complete
/// pipeline (pinch distance, wrist velocity, classification) runs without
/// hardware.
///
/// The resting pose is "pointing" (index extended, rest curled) with the
/// index tip under the pointer. Held keys curl or stretch the fingers; the
/// frame label always comes from [`classify`] on the synthesized landmarks,
/// never from the input event directly.
pub struct SimHandSource {
    rx: Receiver<SimInput>,
    present: bool,
    pos: (f32, f32),
    pinch: bool,
    fist: bool,
    palm: bool,
    slam_pending: bool,
}

#[derive(Clone, Copy, PartialEq)]
enum SimPose {
    Pointing,
    Fist,
    Palm,
}

impl SimHandSource {
    pub fn new(rx: Receiver<SimInput>) -> Self {
        SimHandSource {
            rx,
            present: false,
            pos: (0.5, 0.5),
            pinch: false,
            fist: false,
            palm: false,
            slam_pending: false,
        }
    }

    fn apply(&mut self, input: SimInput) {
        match input {
            SimInput::Move { x, y } => {
                self.present = true;
                self.pos = (x.clamp(0.0, 1.0), y.clamp(0.0, 1.0));
            }
            SimInput::Pinch(down) => self.pinch = down,
            SimInput::Fist(down) => self.fist = down,
            SimInput::Palm(down) => self.palm = down,
            SimInput::Slam => self.slam_pending = true,
            SimInput::Lost => self.present = false,
        }
    }

    fn pose(&self) -> SimPose {
        if self.fist {
            SimPose::Fist
        } else if self.palm {
            SimPose::Palm
        } else {
            SimPose::Pointing
        }
    }
}

impl HandPoseSource for SimHandSource {
    fn detect(&mut self, _now: Instant) -> Option<HandFrame> {
        while let Ok(input) = self.rx.try_recv() {
            self.apply(input);
        }
        if !self.present {
            return Some(HandFrame::empty());
        }

        let (pose, drop) = if self.slam_pending {
            self.slam_pending = false;
            (SimPose::Fist, SLAM_DROP)
        } else {
            (self.pose(), 0.0)
        };

        let hand = synth_hand(self.pos.0, self.pos.1, pose, self.pinch, drop);
        let label = classify(&hand);
        Some(HandFrame::new(vec![hand], Some(label)))
    }
}

/// Vertical wrist jump used for the simulated slam, in normalized units
/// per frame. Well above any sane slam-velocity threshold.
const SLAM_DROP: f32 = 0.12;

/// Build a synthetic hand around `(cx, cy)` with the index tip exactly at
/// that point. `drop` shifts the whole hand downward (used for the slam).
fn synth_hand(cx: f32, cy: f32, pose: SimPose, pinch: bool, drop: f32) -> Hand {
    let cy = cy + drop;
    let extended = |p: &mut Vec<Landmark>, mcp: usize, tip: usize, tx: f32, ty: f32| {
        p[tip] = Landmark::new(cx + tx, cy + ty, 0.0);
        chain(p, mcp, tip);
    };
    let curled = |p: &mut Vec<Landmark>, mcp: usize, tip: usize| {
        p[tip] = Landmark::new(p[mcp].x, cy + 0.095, 0.0);
        chain(p, mcp, tip);
    };

    let mut pts = vec![Landmark::default(); LANDMARKS_PER_HAND];
    pts[WRIST] = Landmark::new(cx, cy + 0.16, 0.0);

    // Knuckle row (stays put regardless of curl, so the palm length the
    // classifier normalizes by is stable).
    let mcps = [INDEX_MCP, MIDDLE_MCP, RING_MCP, PINKY_MCP];
    for (i, &mcp) in mcps.iter().enumerate() {
        pts[mcp] = Landmark::new(cx - 0.015 + i as f32 * 0.02, cy + 0.06, 0.0);
    }

    let open = pose == SimPose::Palm;
    let fist = pose == SimPose::Fist;

    // Index: extended unless making a fist (the resting pose points).
    if fist {
        curled(&mut pts, INDEX_MCP, INDEX_TIP);
    } else {
        extended(&mut pts, INDEX_MCP, INDEX_TIP, 0.0, 0.0);
    }
    if open {
        extended(&mut pts, MIDDLE_MCP, MIDDLE_TIP, 0.02, -0.005);
        extended(&mut pts, RING_MCP, RING_TIP, 0.04, 0.0);
        extended(&mut pts, PINKY_MCP, PINKY_TIP, 0.06, 0.015);
    } else {
        curled(&mut pts, MIDDLE_MCP, MIDDLE_TIP);
        curled(&mut pts, RING_MCP, RING_TIP);
        curled(&mut pts, PINKY_MCP, PINKY_TIP);
    }

    // Thumb: pinching overrides everything and lands next to the index tip.
    if pinch {
        let it = pts[INDEX_TIP];
        pts[THUMB_TIP] = Landmark::new(it.x + 0.012, it.y + 0.012, 0.0);
    } else if open {
        pts[THUMB_TIP] = Landmark::new(cx - 0.09, cy + 0.03, 0.0);
    } else {
        pts[THUMB_TIP] = Landmark::new(cx - 0.02, cy + 0.09, 0.0);
    }
    // Thumb chain interpolates from the wrist.
    for (i, idx) in (1..THUMB_TIP).enumerate() {
        let t = (i + 1) as f32 / 4.0;
        pts[idx] = lerp_point(pts[WRIST], pts[THUMB_TIP], t);
    }

    Hand::from_landmarks(pts).expect("synthesized hand is always complete")
}

/// Fill the two joints between a knuckle and its tip by interpolation.
fn chain(pts: &mut [Landmark], mcp: usize, tip: usize) {
    pts[mcp + 1] = lerp_point(pts[mcp], pts[tip], 0.4);
    pts[mcp + 2] = lerp_point(pts[mcp], pts[tip], 0.75);
}

fn lerp_point(a: Landmark, b: Landmark, t: f32) -> Landmark {
    Landmark::new(
        a.x + (b.x - a.x) * t,
        a.y + (b.y - a.y) * t,
        a.z + (b.z - a.z) * t,
    )
}

// ════════════════════════════════════════════════════════════════════════════
// LeapHandSource — real hardware (feature = "leap")
// ════════════════════════════════════════════════════════════════════════════

/// Source backed by a real LeapMotion controller.
///
/// Requires the `leap` feature flag and the LeapC shared library installed.
/// A capture thread polls the device and pushes mapped frames into a
/// channel; dropping the source stops the thread and releases the device.
/// If the device cannot be opened the thread exits after a warning and the
/// source settles into the permanent zero-hands condition.
#[cfg(feature = "leap")]
pub struct LeapHandSource {
    inner: ChannelSource,
    stop: std::sync::Arc<std::sync::atomic::AtomicBool>,
    join: Option<std::thread::JoinHandle<()>>,
}

#[cfg(feature = "leap")]
impl LeapHandSource {
    pub fn open() -> Self {
        use std::sync::atomic::AtomicBool;
        use std::sync::Arc;

        let (tx, inner) = frame_channel();
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let join = std::thread::spawn(move || leap_capture_thread(tx, flag));

        LeapHandSource {
            inner,
            stop,
            join: Some(join),
        }
    }
}

#[cfg(feature = "leap")]
impl HandPoseSource for LeapHandSource {
    fn detect(&mut self, now: Instant) -> Option<HandFrame> {
        self.inner.detect(now)
    }
}

#[cfg(feature = "leap")]
impl Drop for LeapHandSource {
    fn drop(&mut self) {
        self.stop.store(true, std::sync::atomic::Ordering::Relaxed);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
        tracing::debug!("leap capture thread stopped, device released");
    }
}

#[cfg(feature = "leap")]
fn leap_capture_thread(
    tx: Sender<HandFrame>,
    stop: std::sync::Arc<std::sync::atomic::AtomicBool>,
) {
    use leaprs::{Connection, ConnectionConfig, Event};
    use std::sync::atomic::Ordering;

    let mut connection = match Connection::create(ConnectionConfig::default()) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("LeapC connection failed: {e:?}; hand tracking disabled");
            return;
        }
    };
    if let Err(e) = connection.open() {
        tracing::warn!("LeapMotion device open failed: {e:?}; hand tracking disabled");
        return;
    }
    tracing::info!("LeapMotion device opened");

    while !stop.load(Ordering::Relaxed) {
        let msg = match connection.poll(25) {
            Ok(m) => m,
            Err(_) => continue,
        };

        if let Event::Tracking(frame) = msg.event() {
            let hands: Vec<Hand> = frame
                .hands()
                .filter_map(|h| map_leap_hand(&h).ok())
                .collect();
            let classification = hands.first().map(|h| classify(h));
            if tx.send(HandFrame::new(hands, classification)).is_err() {
                break;
            }
        }
    }
}

/// Map a LeapC hand onto the 21-point topology.
///
/// The wrist is the middle digit's metacarpal base; each finger
/// contributes knuckle, two interpolated mid joints, and tip.
#[cfg(feature = "leap")]
fn map_leap_hand(hand: &leaprs::Hand) -> Result<Hand, crate::HandStreamError> {
    let digits: Vec<_> = hand.digits().collect();
    if digits.len() < 5 {
        return Err(crate::HandStreamError::MalformedHand { got: digits.len() });
    }

    let mut pts = vec![Landmark::default(); LANDMARKS_PER_HAND];
    let wrist = digits[2].metacarpal().prev_joint();
    pts[WRIST] = leap_point(wrist.x, wrist.y, wrist.z);

    for (d, digit) in digits.iter().enumerate() {
        let base = 1 + d * 4;
        let mcp = digit.metacarpal().next_joint();
        let dip = digit.distal().prev_joint();
        let tip = digit.distal().next_joint();
        pts[base] = leap_point(mcp.x, mcp.y, mcp.z);
        pts[base + 2] = leap_point(dip.x, dip.y, dip.z);
        pts[base + 3] = leap_point(tip.x, tip.y, tip.z);
        pts[base + 1] = lerp_point(pts[base], pts[base + 2], 0.5);
    }

    Hand::from_landmarks(pts)
}

/// Leap interaction-zone millimetres to normalized screen space.
///
/// Leap y grows upward and the device is not a mirror, so both axes flip:
/// moving the hand right must land right of screen centre after the
/// downstream webcam un-mirror.
#[cfg(feature = "leap")]
fn leap_point(x: f32, y: f32, z: f32) -> Landmark {
    Landmark::new(
        (1.0 - (x + 250.0) / 500.0).clamp(0.0, 1.0),
        (1.0 - (y - 80.0) / 400.0).clamp(0.0, 1.0),
        -z / 200.0,
    )
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::GestureLabel;

    fn now() -> Instant {
        Instant::now()
    }

    fn sim_pair() -> (Sender<SimInput>, SimHandSource) {
        let (tx, rx) = mpsc::channel();
        (tx, SimHandSource::new(rx))
    }

    #[test]
    fn sim_starts_with_no_hands() {
        let (_tx, mut sim) = sim_pair();
        let frame = sim.detect(now()).unwrap();
        assert!(frame.is_empty());
    }

    #[test]
    fn sim_resting_pose_points() {
        let (tx, mut sim) = sim_pair();
        tx.send(SimInput::Move { x: 0.5, y: 0.5 }).unwrap();
        let frame = sim.detect(now()).unwrap();
        assert_eq!(frame.hand_count(), 1);
        assert_eq!(frame.label(), GestureLabel::PointingUp);
        // Index tip lands on the pointer.
        let tip = frame.primary().unwrap().index_tip();
        assert!((tip.x - 0.5).abs() < 1e-6);
        assert!((tip.y - 0.5).abs() < 1e-6);
    }

    #[test]
    fn sim_pinch_closes_thumb_to_index() {
        let (tx, mut sim) = sim_pair();
        tx.send(SimInput::Move { x: 0.4, y: 0.6 }).unwrap();
        tx.send(SimInput::Pinch(true)).unwrap();
        let frame = sim.detect(now()).unwrap();
        let hand = frame.primary().unwrap();
        let d = hand.thumb_tip().planar_distance(hand.index_tip());
        assert!(d < 0.05, "pinch distance {d} not under threshold");
    }

    #[test]
    fn sim_unpinched_thumb_stays_clear() {
        let (tx, mut sim) = sim_pair();
        tx.send(SimInput::Move { x: 0.4, y: 0.6 }).unwrap();
        let frame = sim.detect(now()).unwrap();
        let hand = frame.primary().unwrap();
        assert!(hand.thumb_tip().planar_distance(hand.index_tip()) > 0.05);
    }

    #[test]
    fn sim_fist_and_palm_classify() {
        let (tx, mut sim) = sim_pair();
        tx.send(SimInput::Move { x: 0.5, y: 0.5 }).unwrap();
        tx.send(SimInput::Fist(true)).unwrap();
        assert_eq!(sim.detect(now()).unwrap().label(), GestureLabel::ClosedFist);

        tx.send(SimInput::Fist(false)).unwrap();
        tx.send(SimInput::Palm(true)).unwrap();
        assert_eq!(sim.detect(now()).unwrap().label(), GestureLabel::OpenPalm);
    }

    #[test]
    fn sim_slam_drops_wrist_for_one_frame() {
        let (tx, mut sim) = sim_pair();
        tx.send(SimInput::Move { x: 0.5, y: 0.5 }).unwrap();
        let rest_y = sim.detect(now()).unwrap().primary().unwrap().wrist().y;

        tx.send(SimInput::Slam).unwrap();
        let slam = sim.detect(now()).unwrap();
        assert_eq!(slam.label(), GestureLabel::ClosedFist);
        assert!(slam.primary().unwrap().wrist().y - rest_y >= SLAM_DROP - 1e-6);

        // Next frame reverts.
        let after = sim.detect(now()).unwrap();
        assert!((after.primary().unwrap().wrist().y - rest_y).abs() < 1e-6);
    }

    #[test]
    fn sim_lost_hides_hand() {
        let (tx, mut sim) = sim_pair();
        tx.send(SimInput::Move { x: 0.5, y: 0.5 }).unwrap();
        let _ = sim.detect(now());
        tx.send(SimInput::Lost).unwrap();
        assert!(sim.detect(now()).unwrap().is_empty());
    }

    #[test]
    fn channel_source_keeps_newest_frame() {
        let (tx, mut src) = frame_channel();
        tx.send(HandFrame::empty()).unwrap();
        let (stx, mut sim) = sim_pair();
        stx.send(SimInput::Move { x: 0.3, y: 0.3 }).unwrap();
        let newest = sim.detect(now()).unwrap();
        tx.send(newest.clone()).unwrap();

        assert_eq!(src.detect(now()), Some(newest));
        // Nothing new on the next poll.
        assert_eq!(src.detect(now()), None);
    }

    #[test]
    fn disconnected_channel_reports_zero_hands_forever() {
        let (tx, mut src) = frame_channel();
        drop(tx);
        assert_eq!(src.detect(now()), Some(HandFrame::empty()));
        assert_eq!(src.detect(now()), Some(HandFrame::empty()));
    }
}
