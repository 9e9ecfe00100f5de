//! Top-level application state and the main loop.
//!
//! Two interaction modes: `Mouse` (click toggles the formation, drag
//! rotates, wheel zooms) and `Gesture` (the full hand pipeline). Entering
//! gesture mode creates the controller and acquires a hand source; leaving
//! it drops both, which discards the interaction state and releases the
//! capture device. The per-frame order is fixed: input, detection (rate
//! limited), controller tick, signal read, scene step, render.

use std::sync::mpsc::{self, Sender};
use std::time::Instant;

use anyhow::Result;
use gesture_control::{
    ControlConfig, FrameLimiter, GestureController, SceneMode, Signals,
};
use hand_stream::{HandPoseSource, SimHandSource, SimInput};
use tracing::info;

use crate::player::ScenePlayer;
use crate::scene::SceneState;
use crate::visualizer::{Hud, Visualizer, WindowInput};

// ════════════════════════════════════════════════════════════════════════════
// AppConfig
// ════════════════════════════════════════════════════════════════════════════

pub struct AppConfig {
    pub control: ControlConfig,
    pub particle_count: usize,
    pub snow_count: usize,
    pub audio: bool,
    pub start_in_gesture: bool,
    pub title: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            control: ControlConfig::default(),
            particle_count: 2600,
            snow_count: 160,
            audio: true,
            start_in_gesture: true,
            title: "Starfir - gesture particle scene".to_string(),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Interaction modes
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InteractionMode {
    Mouse,
    Gesture,
}

/// Mouse-driven stand-ins for the gesture signals.
struct MouseRig {
    mode: SceneMode,
    rotation: f32,
    target_distance: f32,
}

impl MouseRig {
    fn new(cfg: &ControlConfig) -> Self {
        MouseRig {
            mode: SceneMode::Scattered,
            rotation: 0.0,
            target_distance: cfg.default_distance,
        }
    }

    fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            SceneMode::Formed => SceneMode::Scattered,
            SceneMode::Scattered => SceneMode::Formed,
        };
    }

    fn scroll(&mut self, dy: f32, cfg: &ControlConfig) {
        // Wheel up pulls the camera in.
        self.target_distance =
            (self.target_distance - dy * 0.8).clamp(cfg.min_distance, cfg.max_distance);
    }

    fn drag(&mut self, dx: f32) {
        if dx != 0.0 {
            self.rotation = dx * 0.01;
        }
    }

    fn decay(&mut self) {
        self.rotation *= 0.90;
        if self.rotation.abs() < 1e-3 {
            self.rotation = 0.0;
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// AppState
// ════════════════════════════════════════════════════════════════════════════

/// Builds a hand source; returns the sim input sender when the source is
/// the synthetic one (hardware sources have no sim channel).
pub type SourceFactory =
    Box<dyn FnMut() -> (Option<Sender<SimInput>>, Box<dyn HandPoseSource>)>;

pub struct AppState {
    pub cfg: AppConfig,
    interaction: InteractionMode,
    scene: SceneState,
    limiter: FrameLimiter,
    controller: Option<GestureController>,
    source: Option<Box<dyn HandPoseSource>>,
    source_factory: SourceFactory,
    mouse: MouseRig,
    player: Option<ScenePlayer>,
    player_active: bool,
    audio_on: bool,
    viewport: (f32, f32),
    prev_signals: Signals,
}

impl AppState {
    pub fn new(cfg: AppConfig, viewport: (f32, f32), source_factory: SourceFactory) -> Self {
        let scene = SceneState::new(cfg.particle_count, cfg.snow_count, cfg.control.default_distance);
        let audio_on = cfg.audio;
        let prev_signals = Signals::initial(&cfg.control);
        AppState {
            limiter: FrameLimiter::new(cfg.control.detect_interval()),
            mouse: MouseRig::new(&cfg.control),
            scene,
            interaction: InteractionMode::Mouse,
            controller: None,
            source: None,
            source_factory,
            player: None,
            player_active: false,
            audio_on,
            viewport,
            prev_signals,
            cfg,
        }
    }

    pub fn interaction(&self) -> InteractionMode {
        self.interaction
    }

    pub fn is_gesture(&self) -> bool {
        self.interaction == InteractionMode::Gesture
    }

    pub fn scene(&self) -> &SceneState {
        &self.scene
    }

    pub fn controller(&self) -> Option<&GestureController> {
        self.controller.as_ref()
    }

    pub fn set_player(&mut self, player: ScenePlayer) {
        self.player = Some(player);
    }

    // ── interaction lifecycle ─────────────────────────────────────────────

    /// Enter gesture mode: fresh controller state, fresh source.
    /// Returns the sim input sender to attach to the window, if any.
    pub fn enter_gesture(&mut self) -> Option<Sender<SimInput>> {
        let (sim_tx, source) = (self.source_factory)();
        self.controller = Some(GestureController::new(
            self.cfg.control.clone(),
            self.viewport,
        ));
        self.source = Some(source);
        self.limiter.reset();
        self.interaction = InteractionMode::Gesture;
        info!("gesture interaction started");
        sim_tx
    }

    /// Leave gesture mode: the interaction state is discarded and the
    /// source (and with it any capture device) is released.
    pub fn leave_gesture(&mut self) {
        self.controller = None;
        self.source = None;
        self.interaction = InteractionMode::Mouse;
        info!("gesture interaction stopped, source released");
    }

    /// Flip between mouse and gesture interaction.
    pub fn toggle_interaction(&mut self) -> Option<Sender<SimInput>> {
        match self.interaction {
            InteractionMode::Gesture => {
                self.leave_gesture();
                None
            }
            InteractionMode::Mouse => self.enter_gesture(),
        }
    }

    // ── per-frame step ────────────────────────────────────────────────────

    pub fn step(&mut self, input: &WindowInput, now: Instant, dt: f32) {
        if input.toggle_audio {
            self.audio_on = !self.audio_on;
        }

        if input.clicked {
            if !self.scene.is_awake() {
                self.scene.register_click();
            } else if self.interaction == InteractionMode::Mouse {
                self.mouse.toggle_mode();
            }
        }

        match self.interaction {
            InteractionMode::Mouse => {
                self.mouse.scroll(input.scroll, &self.cfg.control);
                self.mouse.drag(input.drag_dx);
                self.mouse.decay();
            }
            InteractionMode::Gesture => {
                if self.limiter.should_run(now) {
                    if let (Some(source), Some(controller)) =
                        (self.source.as_mut(), self.controller.as_mut())
                    {
                        if let Some(frame) = source.detect(now) {
                            controller.tick(&frame, now);
                        }
                    }
                }
            }
        }

        let signals = self.current_signals();
        self.sync_player(&signals);
        self.scene.tick(dt, &signals);
        self.prev_signals = signals;
    }

    /// The signal set the scene consumes this frame.
    pub fn current_signals(&self) -> Signals {
        match self.interaction {
            InteractionMode::Gesture => self
                .controller
                .as_ref()
                .map(|c| c.signals())
                .unwrap_or_else(|| Signals::initial(&self.cfg.control)),
            InteractionMode::Mouse => Signals {
                mode: self.mouse.mode,
                rotation_rate: self.mouse.rotation,
                target_distance: self.mouse.target_distance,
                power: true,
                cursor: None,
            },
        }
    }

    fn sync_player(&mut self, signals: &Signals) {
        let Some(player) = &self.player else {
            return;
        };
        let should_play = self.audio_on && signals.power && self.scene.is_awake();
        if should_play != self.player_active {
            if should_play {
                player.play();
            } else {
                player.stop();
            }
            self.player_active = should_play;
        }
        if signals.mode != self.prev_signals.mode {
            player.set_mode(signals.mode);
        }
    }

    pub fn hud(&self) -> Hud {
        let s = self.current_signals();
        let pinch = self
            .controller
            .as_ref()
            .map(|c| c.is_pinching())
            .unwrap_or(false);
        let window = self
            .controller
            .as_ref()
            .map(|c| (c.history_len(), c.config().history_capacity))
            .unwrap_or((0, 0));
        let status = format!(
            "{}  {}  dist={:4.1}  rot={:+.2}  power={}  window={}/{}{}",
            if self.is_gesture() { "gesture" } else { "mouse" },
            s.mode.name(),
            s.target_distance,
            s.rotation_rate,
            if s.power { "on" } else { "off" },
            window.0,
            window.1,
            if pinch { "  pinch" } else { "" },
        );
        Hud {
            gesture_mode: self.is_gesture(),
            audio_on: self.audio_on,
            status,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// run() — the main application loop
// ════════════════════════════════════════════════════════════════════════════

/// Default source factory: LeapMotion hardware when built with the `leap`
/// feature, the keyboard/mouse simulator otherwise.
pub fn default_source_factory() -> SourceFactory {
    #[cfg(feature = "leap")]
    {
        let factory: SourceFactory = Box::new(|| {
            (
                None,
                Box::new(hand_stream::LeapHandSource::open()) as Box<dyn HandPoseSource>,
            )
        });
        factory
    }
    #[cfg(not(feature = "leap"))]
    {
        let factory: SourceFactory = Box::new(|| {
            let (tx, rx) = mpsc::channel();
            (
                Some(tx),
                Box::new(SimHandSource::new(rx)) as Box<dyn HandPoseSource>,
            )
        });
        factory
    }
}

/// Run the full application. Entry point called from `main.rs`.
pub fn run(cfg: AppConfig) -> Result<()> {
    let mut vis = Visualizer::new(&cfg.title)?;
    let mut app = AppState::new(cfg, vis.viewport(), default_source_factory());

    app.set_player(ScenePlayer::spawn());
    if app.cfg.start_in_gesture {
        if let Some(tx) = app.enter_gesture() {
            vis.set_sim_tx(tx);
        }
    }

    let mut last = Instant::now();
    while vis.is_open() {
        let input = vis.poll_input(app.is_gesture());
        if input.quit {
            break;
        }

        let now = Instant::now();
        let dt = now.saturating_duration_since(last).as_secs_f32().min(0.1);
        last = now;

        if input.switch_interaction {
            match app.toggle_interaction() {
                Some(tx) => vis.set_sim_tx(tx),
                None => vis.clear_sim_tx(),
            }
        }

        app.step(&input, now, dt);
        vis.render(app.scene(), &app.current_signals(), &app.hud());
    }

    Ok(())
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
