//! Software-rendered visualizer using `minifb`.
//!
//! Layout:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                                                             │
//! │        particle field (tree / scatter, orbiting)            │
//! │                          ◦ cursor ring                      │
//! │                                                             │
//! │  status bar                                                 │
//! │  key legend                                                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The window is also the input device: pointer and keys become
//! [`SimInput`] events for the synthetic hand source (gesture mode) or
//! direct commands (mouse mode).

use std::sync::mpsc::Sender;

use anyhow::{anyhow, Result};
use gesture_control::Signals;
use hand_stream::SimInput;
use minifb::{Key, KeyRepeat, MouseButton, MouseMode, Window, WindowOptions};

use crate::scene::SceneState;

// ════════════════════════════════════════════════════════════════════════════
// Layout constants
// ════════════════════════════════════════════════════════════════════════════

pub const WIN_W: usize = 1024;
pub const WIN_H: usize = 640;
const STATUS_Y: usize = WIN_H - 40;
const BG_COLOR: u32 = 0xFF0A0A0A;
const TEXT_BG: u32 = 0xFF10142A;
const SNOW_COLOR: u32 = 0xFF9FA8B8;
const CURSOR_COLOR: u32 = 0xFFFF69B4;
const CURSOR_DIM: u32 = 0xFF5A3A48;
const FOCAL_LENGTH: f32 = 560.0;
const CAMERA_HEIGHT: f32 = 2.2;

// ════════════════════════════════════════════════════════════════════════════
// WindowInput — per-frame app-level input summary
// ════════════════════════════════════════════════════════════════════════════

/// What the window saw this frame, beyond the events already forwarded to
/// the synthetic hand source.
#[derive(Clone, Copy, Debug, Default)]
pub struct WindowInput {
    pub quit: bool,
    pub toggle_audio: bool,
    pub switch_interaction: bool,
    /// Pointer button went down this frame.
    pub clicked: bool,
    /// Scroll wheel vertical travel.
    pub scroll: f32,
    /// Horizontal pointer travel while the button is held (pixels).
    pub drag_dx: f32,
}

/// HUD state the app wants painted.
pub struct Hud {
    pub gesture_mode: bool,
    pub audio_on: bool,
    pub status: String,
}

// ════════════════════════════════════════════════════════════════════════════
// Visualizer
// ════════════════════════════════════════════════════════════════════════════

pub struct Visualizer {
    window: Window,
    buf: Vec<u32>,
    /// Sender for the synthetic hand source; replaced whenever gesture
    /// interaction restarts.
    sim_tx: Option<Sender<SimInput>>,

    mouse_was_down: bool,
    mouse_was_inside: bool,
    hand_hidden: bool,
    last_mouse: (f32, f32),

    // Held-pose key states (see forward_sim_events).
    fist_held: bool,
    palm_held: bool,
}

impl Visualizer {
    pub fn new(title: &str) -> Result<Self> {
        let mut window = Window::new(
            title,
            WIN_W,
            WIN_H,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        )
        .map_err(|e| anyhow!("window creation failed: {e}"))?;

        window.limit_update_rate(Some(std::time::Duration::from_millis(16))); // ~60fps

        Ok(Visualizer {
            window,
            buf: vec![BG_COLOR; WIN_W * WIN_H],
            sim_tx: None,
            mouse_was_down: false,
            mouse_was_inside: false,
            hand_hidden: false,
            last_mouse: (0.0, 0.0),
            fist_held: false,
            palm_held: false,
        })
    }

    pub fn viewport(&self) -> (f32, f32) {
        (WIN_W as f32, WIN_H as f32)
    }

    pub fn is_open(&self) -> bool {
        self.window.is_open()
    }

    /// Attach the channel feeding the synthetic hand source.
    pub fn set_sim_tx(&mut self, tx: Sender<SimInput>) {
        self.sim_tx = Some(tx);
    }

    pub fn clear_sim_tx(&mut self) {
        self.sim_tx = None;
    }

    fn sim_send(&self, input: SimInput) {
        if let Some(tx) = &self.sim_tx {
            let _ = tx.send(input);
        }
    }

    // ── input ─────────────────────────────────────────────────────────────

    /// Poll the window, forward gesture-simulation events, and summarize
    /// app-level input.
    pub fn poll_input(&mut self, gesture_mode: bool) -> WindowInput {
        let mut out = WindowInput::default();

        if !self.window.is_open() || self.window.is_key_pressed(Key::Q, KeyRepeat::No) {
            out.quit = true;
            return out;
        }
        if self.window.is_key_pressed(Key::M, KeyRepeat::No) {
            out.toggle_audio = true;
        }
        if self.window.is_key_pressed(Key::Tab, KeyRepeat::No) {
            out.switch_interaction = true;
        }

        let down = self.window.get_mouse_down(MouseButton::Left);
        if down && !self.mouse_was_down {
            out.clicked = true;
        }

        let mouse = self.window.get_mouse_pos(MouseMode::Discard);
        if let Some((mx, my)) = mouse {
            if down && self.mouse_was_down {
                out.drag_dx = mx - self.last_mouse.0;
            }
            self.last_mouse = (mx, my);
        }
        if let Some((_sx, sy)) = self.window.get_scroll_wheel() {
            out.scroll = sy;
        }

        if gesture_mode {
            self.forward_sim_events(mouse, down);
        }

        self.mouse_was_down = down;
        self.mouse_was_inside = mouse.is_some();
        out
    }

    /// Translate pointer/keys into synthetic-hand events.
    fn forward_sim_events(&mut self, mouse: Option<(f32, f32)>, button_down: bool) {
        // H toggles a simulated tracking dropout.
        if self.window.is_key_pressed(Key::H, KeyRepeat::No) {
            self.hand_hidden = !self.hand_hidden;
            if self.hand_hidden {
                self.sim_send(SimInput::Lost);
            }
        }

        match mouse {
            None => {
                if self.mouse_was_inside {
                    self.sim_send(SimInput::Lost);
                }
                return;
            }
            Some((mx, my)) => {
                if !self.hand_hidden {
                    // Pre-mirror x: the controller un-mirrors webcam space,
                    // which must land the cursor back under the pointer.
                    self.sim_send(SimInput::Move {
                        x: 1.0 - mx / WIN_W as f32,
                        y: my / WIN_H as f32,
                    });
                }
            }
        }

        if button_down != self.mouse_was_down {
            self.sim_send(SimInput::Pinch(button_down));
        }

        let edge = |w: &Window, k: Key, held: bool| -> Option<bool> {
            if w.is_key_pressed(k, KeyRepeat::No) {
                Some(true)
            } else if held && !w.is_key_down(k) {
                Some(false)
            } else {
                None
            }
        };
        // Held-pose keys: F fist, O open palm.
        if let Some(d) = edge(&self.window, Key::F, self.fist_held) {
            self.fist_held = d;
            self.sim_send(SimInput::Fist(d));
        }
        if let Some(d) = edge(&self.window, Key::O, self.palm_held) {
            self.palm_held = d;
            self.sim_send(SimInput::Palm(d));
        }
        if self.window.is_key_pressed(Key::G, KeyRepeat::No) {
            self.sim_send(SimInput::Slam);
        }
    }

    // ── render ────────────────────────────────────────────────────────────

    pub fn render(&mut self, scene: &SceneState, signals: &Signals, hud: &Hud) {
        self.buf.fill(BG_COLOR);

        let camera = Camera::new(scene.orbit_angle(), scene.camera_distance());
        let brightness = scene.brightness();

        // ── snow ──────────────────────────────────────────────────────────
        for flake in scene.snow() {
            if let Some((x, y, depth)) = camera.project(flake.pos) {
                let fade = (8.0 / depth).clamp(0.1, 0.8) * brightness;
                self.blend_pixel(x, y, scale_color(SNOW_COLOR, fade));
            }
        }

        // ── particles ─────────────────────────────────────────────────────
        let eased = scene.eased_formation();
        for particle in scene.particles() {
            let pos = particle.position(eased);
            if let Some((x, y, depth)) = camera.project(pos) {
                let fade = (10.0 / depth).clamp(0.15, 1.0) * brightness;
                let color = scale_color(particle.color, fade);
                self.blend_pixel(x, y, color);
                // Near particles get a 2x2 splat.
                if depth < 14.0 {
                    self.blend_pixel(x + 1, y, color);
                    self.blend_pixel(x, y + 1, color);
                    self.blend_pixel(x + 1, y + 1, color);
                }
            }
        }

        // ── cursor ring ───────────────────────────────────────────────────
        if hud.gesture_mode {
            if let Some((cx, cy)) = signals.cursor {
                let color = if signals.power { CURSOR_COLOR } else { CURSOR_DIM };
                self.draw_ring(cx as i32, cy as i32, 11, color);
                self.set_pixel(cx as usize, cy as usize, 0xFFFFFFFF);
            }
        }

        // ── dormant overlay ───────────────────────────────────────────────
        if !scene.is_awake() {
            let msg = format!(
                "a sleeping constellation. click {} more to wake it",
                scene.wake_clicks_remaining()
            );
            self.draw_label_scaled(&msg, WIN_W / 2 - msg.len() * 8 / 2, WIN_H / 2, 2, 0xFFC8CCE0);
        }

        // ── audio tag ─────────────────────────────────────────────────────
        let tag = if hud.audio_on { "audio on" } else { "audio off" };
        self.draw_label(tag, WIN_W - 50, 8, 0xFF667788);

        // ── status bar + legend ───────────────────────────────────────────
        self.fill_rect(0, STATUS_Y, WIN_W, WIN_H - STATUS_Y, TEXT_BG);
        self.draw_label(&hud.status, 10, STATUS_Y + 6, 0xFFEEEEEE);
        let legend = if hud.gesture_mode {
            "move=point  lmb=pinch drag  f=fist  o=palm  g=slam  h=hide  tab=mouse  m=audio  q=quit"
        } else {
            "click=toggle scene  drag=rotate  wheel=zoom  tab=gesture  m=audio  q=quit"
        };
        self.draw_label(legend, 10, WIN_H - 14, 0xFF888888);

        self.window.update_with_buffer(&self.buf, WIN_W, WIN_H).ok();
    }

    // ── primitive drawing helpers ─────────────────────────────────────────

    fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        for row in y..(y + h).min(WIN_H) {
            for col in x..(x + w).min(WIN_W) {
                self.buf[row * WIN_W + col] = color;
            }
        }
    }

    fn set_pixel(&mut self, x: usize, y: usize, color: u32) {
        if x < WIN_W && y < WIN_H {
            self.buf[y * WIN_W + x] = color;
        }
    }

    /// Additive blend with channel saturation, for glow-ish particles.
    fn blend_pixel(&mut self, x: usize, y: usize, color: u32) {
        if x >= WIN_W || y >= WIN_H {
            return;
        }
        let old = self.buf[y * WIN_W + x];
        let add = |a: u32, b: u32| ((a & 0xFF) + (b & 0xFF)).min(0xFF);
        let r = add(old >> 16, color >> 16);
        let g = add(old >> 8, color >> 8);
        let b = add(old, color);
        self.buf[y * WIN_W + x] = 0xFF00_0000 | (r << 16) | (g << 8) | b;
    }

    fn draw_ring(&mut self, cx: i32, cy: i32, radius: i32, color: u32) {
        let mut deg = 0;
        while deg < 360 {
            let rad = (deg as f32).to_radians();
            let x = cx + (rad.cos() * radius as f32) as i32;
            let y = cy + (rad.sin() * radius as f32) as i32;
            if x >= 0 && y >= 0 {
                self.set_pixel(x as usize, y as usize, color);
            }
            deg += 3;
        }
    }

    /// Minimal bitmap font, 3×5 per character.
    fn draw_label(&mut self, text: &str, x: usize, y: usize, color: u32) {
        self.draw_label_scaled(text, x, y, 1, color);
    }

    fn draw_label_scaled(&mut self, text: &str, x: usize, y: usize, scale: usize, color: u32) {
        let mut cx = x;
        for ch in text.chars() {
            let glyph = char_glyph(ch);
            for (row, &bits) in glyph.iter().enumerate() {
                for col in 0..3usize {
                    if bits & (1 << (2 - col)) != 0 {
                        self.fill_rect(cx + col * scale, y + row * scale, scale, scale, color);
                    }
                }
            }
            cx += 4 * scale; // 3 wide + 1 gap
            if cx + 4 * scale > WIN_W {
                break;
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Camera
// ════════════════════════════════════════════════════════════════════════════

/// Orbiting pinhole camera looking at the origin.
struct Camera {
    eye: [f32; 3],
    right: [f32; 3],
    up: [f32; 3],
    forward: [f32; 3],
}

impl Camera {
    fn new(angle: f32, distance: f32) -> Self {
        let eye = [angle.sin() * distance, CAMERA_HEIGHT, angle.cos() * distance];
        let forward = normalize([-eye[0], -eye[1], -eye[2]]);
        let right = normalize(cross(forward, [0.0, 1.0, 0.0]));
        let up = cross(right, forward);
        Camera {
            eye,
            right,
            up,
            forward,
        }
    }

    /// World point to (screen x, screen y, camera depth). `None` when the
    /// point is behind or off screen.
    fn project(&self, p: [f32; 3]) -> Option<(usize, usize, f32)> {
        let v = [p[0] - self.eye[0], p[1] - self.eye[1], p[2] - self.eye[2]];
        let z = dot(v, self.forward);
        if z < 0.5 {
            return None;
        }
        let x = WIN_W as f32 / 2.0 + FOCAL_LENGTH * dot(v, self.right) / z;
        let y = WIN_H as f32 / 2.0 - FOCAL_LENGTH * dot(v, self.up) / z;
        if x < 0.0 || y < 0.0 || x >= WIN_W as f32 || y >= WIN_H as f32 {
            return None;
        }
        Some((x as usize, y as usize, z))
    }
}

fn dot(a: [f32; 3], b: [f32; 3]) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn normalize(v: [f32; 3]) -> [f32; 3] {
    let len = dot(v, v).sqrt().max(1e-6);
    [v[0] / len, v[1] / len, v[2] / len]
}

/// Scale the RGB channels of a packed ARGB color.
fn scale_color(color: u32, factor: f32) -> u32 {
    let f = factor.clamp(0.0, 1.0);
    let scale = |c: u32| ((c & 0xFF) as f32 * f) as u32;
    0xFF00_0000 | (scale(color >> 16) << 16) | (scale(color >> 8) << 8) | scale(color)
}

// ────────────────────────────────────────────────────────────────────────────
// Minimal 3×5 bitmap font
// ────────────────────────────────────────────────────────────────────────────

fn char_glyph(c: char) -> [u8; 5] {
    match c.to_ascii_lowercase() {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b011, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b010, 0b010, 0b010],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'a' => [0b010, 0b101, 0b111, 0b101, 0b101],
        'b' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'c' => [0b011, 0b100, 0b100, 0b100, 0b011],
        'd' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'e' => [0b111, 0b100, 0b110, 0b100, 0b111],
        'f' => [0b111, 0b100, 0b110, 0b100, 0b100],
        'g' => [0b011, 0b100, 0b101, 0b101, 0b011],
        'h' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'i' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'j' => [0b001, 0b001, 0b001, 0b101, 0b010],
        'k' => [0b101, 0b110, 0b100, 0b110, 0b101],
        'l' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'm' => [0b101, 0b111, 0b111, 0b101, 0b101],
        'n' => [0b101, 0b111, 0b111, 0b111, 0b101],
        'o' => [0b010, 0b101, 0b101, 0b101, 0b010],
        'p' => [0b110, 0b101, 0b110, 0b100, 0b100],
        'q' => [0b010, 0b101, 0b101, 0b011, 0b001],
        'r' => [0b110, 0b101, 0b110, 0b110, 0b101],
        's' => [0b011, 0b100, 0b010, 0b001, 0b110],
        't' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'u' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'v' => [0b101, 0b101, 0b101, 0b101, 0b010],
        'w' => [0b101, 0b101, 0b111, 0b111, 0b101],
        'x' => [0b101, 0b010, 0b010, 0b010, 0b101],
        'y' => [0b101, 0b101, 0b010, 0b010, 0b010],
        'z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        '/' => [0b001, 0b001, 0b010, 0b100, 0b100],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '+' => [0b000, 0b010, 0b111, 0b010, 0b000],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        ',' => [0b000, 0b000, 0b000, 0b010, 0b100],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '=' => [0b000, 0b111, 0b000, 0b111, 0b000],
        ' ' => [0b000, 0b000, 0b000, 0b000, 0b000],
        _ => [0b000, 0b000, 0b010, 0b000, 0b000], // fallback dot
    }
}
