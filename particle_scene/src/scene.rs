//! Scene state: the particle formation, the camera rig, snow, and the
//! wake-up latch.
//!
//! Every particle owns two endpoints, a formed position on the fir tree and
//! a scattered position on a loose shell; the visible position is the
//! eased interpolation between them. The scene consumes the controller's
//! published [`Signals`] once per render frame and never writes them.

use gesture_control::{SceneMode, Signals};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// ════════════════════════════════════════════════════════════════════════════
// Tuning constants
// ════════════════════════════════════════════════════════════════════════════

const TREE_HEIGHT: f32 = 7.0;
const TREE_RADIUS: f32 = 2.6;
const TREE_TURNS: f32 = 9.0;
/// Fraction of particles forming the star cluster at the apex.
const STAR_FRACTION: f32 = 0.03;
const STAR_RADIUS: f32 = 0.35;
/// Scatter shell radii.
const SHELL_MIN: f32 = 5.0;
const SHELL_MAX: f32 = 13.0;

/// Per-frame easing rates (tuned for a ~60 fps loop).
const FORMATION_EASE: f32 = 0.05;
const DISTANCE_EASE: f32 = 0.05;
const BRIGHTNESS_EASE: f32 = 0.08;

/// Brightness floor while powered off: dim, not dark, so the user can still
/// see the scene acknowledging input.
const POWERED_OFF_BRIGHTNESS: f32 = 0.15;

/// Clicks on the dormant scene before it wakes.
const WAKE_CLICKS: u32 = 3;

const SNOW_FALL_SPEED: f32 = 0.9;
const SNOW_EXTENT: f32 = 12.0;

// ════════════════════════════════════════════════════════════════════════════
// Particle
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
pub struct Particle {
    pub formed: [f32; 3],
    pub scattered: [f32; 3],
    /// Packed ARGB.
    pub color: u32,
}

impl Particle {
    /// Visible position for a given eased formation value.
    pub fn position(&self, eased: f32) -> [f32; 3] {
        [
            self.scattered[0] + (self.formed[0] - self.scattered[0]) * eased,
            self.scattered[1] + (self.formed[1] - self.scattered[1]) * eased,
            self.scattered[2] + (self.formed[2] - self.scattered[2]) * eased,
        ]
    }
}

#[derive(Clone, Debug)]
pub struct Snowflake {
    pub pos: [f32; 3],
    pub speed: f32,
}

// ════════════════════════════════════════════════════════════════════════════
// SceneState
// ════════════════════════════════════════════════════════════════════════════

pub struct SceneState {
    particles: Vec<Particle>,
    snow: Vec<Snowflake>,

    /// 0.0 = fully scattered, 1.0 = fully formed.
    formation: f32,
    orbit_angle: f32,
    camera_distance: f32,
    brightness: f32,

    awake: bool,
    wake_clicks: u32,
}

impl SceneState {
    pub fn new(particle_count: usize, snow_count: usize, camera_distance: f32) -> Self {
        // Fixed seed: the tree looks the same every launch.
        let mut rng = StdRng::seed_from_u64(0x57A8);

        let star_from = ((1.0 - STAR_FRACTION) * particle_count as f32) as usize;
        let particles = (0..particle_count)
            .map(|i| {
                let formed = if i >= star_from {
                    star_position(&mut rng)
                } else {
                    tree_position(i as f32 / star_from.max(1) as f32, &mut rng)
                };
                Particle {
                    formed,
                    scattered: shell_position(&mut rng),
                    color: particle_color(i, star_from, &mut rng),
                }
            })
            .collect();

        let snow = (0..snow_count)
            .map(|_| Snowflake {
                pos: [
                    rng.random_range(-SNOW_EXTENT..SNOW_EXTENT),
                    rng.random_range(-SNOW_EXTENT..SNOW_EXTENT),
                    rng.random_range(-SNOW_EXTENT..SNOW_EXTENT),
                ],
                speed: rng.random_range(0.5..1.5) * SNOW_FALL_SPEED,
            })
            .collect();

        SceneState {
            particles,
            snow,
            formation: 0.0,
            orbit_angle: 0.0,
            camera_distance,
            brightness: 1.0,
            awake: false,
            wake_clicks: 0,
        }
    }

    // ── wake latch ────────────────────────────────────────────────────────

    /// Three clicks on the dormant scene wake it.
    pub fn register_click(&mut self) {
        if self.awake {
            return;
        }
        self.wake_clicks += 1;
        if self.wake_clicks >= WAKE_CLICKS {
            self.awake = true;
            tracing::info!("scene woken");
        }
    }

    pub fn is_awake(&self) -> bool {
        self.awake
    }

    pub fn wake_clicks_remaining(&self) -> u32 {
        WAKE_CLICKS.saturating_sub(self.wake_clicks)
    }

    // ── per-frame step ────────────────────────────────────────────────────

    /// Advance all eased values toward the published signals.
    /// `dt` is the frame delta in seconds.
    pub fn tick(&mut self, dt: f32, signals: &Signals) {
        let target = match (self.awake, signals.mode) {
            (false, _) => 0.0,
            (true, SceneMode::Formed) => 1.0,
            (true, SceneMode::Scattered) => 0.0,
        };
        self.formation += (target - self.formation) * FORMATION_EASE;

        self.orbit_angle += signals.rotation_rate * dt;

        self.camera_distance +=
            (signals.target_distance - self.camera_distance) * DISTANCE_EASE;

        let lum_target = if signals.power {
            1.0
        } else {
            POWERED_OFF_BRIGHTNESS
        };
        self.brightness += (lum_target - self.brightness) * BRIGHTNESS_EASE;

        for flake in &mut self.snow {
            flake.pos[1] -= flake.speed * dt;
            if flake.pos[1] < -SNOW_EXTENT {
                flake.pos[1] += 2.0 * SNOW_EXTENT;
            }
        }
    }

    // ── accessors for the renderer ────────────────────────────────────────

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn snow(&self) -> &[Snowflake] {
        &self.snow
    }

    pub fn formation(&self) -> f32 {
        self.formation
    }

    /// Smoothstep of the raw formation value; softens both ends of the
    /// assemble/scatter travel.
    pub fn eased_formation(&self) -> f32 {
        let t = self.formation.clamp(0.0, 1.0);
        t * t * (3.0 - 2.0 * t)
    }

    pub fn orbit_angle(&self) -> f32 {
        self.orbit_angle
    }

    pub fn camera_distance(&self) -> f32 {
        self.camera_distance
    }

    pub fn brightness(&self) -> f32 {
        self.brightness
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Formation geometry
// ════════════════════════════════════════════════════════════════════════════

/// A point on the spiral cone, trunk at the bottom, tip at the top.
/// `t` runs 0.0 (base) to 1.0 (tip).
fn tree_position(t: f32, rng: &mut StdRng) -> [f32; 3] {
    let angle = t * TREE_TURNS * std::f32::consts::TAU;
    let radius = TREE_RADIUS * (1.0 - t) * rng.random_range(0.75..1.0);
    let y = t * TREE_HEIGHT - TREE_HEIGHT * 0.5;
    [angle.cos() * radius, y, angle.sin() * radius]
}

/// A point in the small cluster above the tip.
fn star_position(rng: &mut StdRng) -> [f32; 3] {
    let [x, y, z] = unit_direction(rng);
    let r = STAR_RADIUS * rng.random_range(0.2f32..1.0).cbrt();
    [x * r, TREE_HEIGHT * 0.5 + 0.4 + y * r, z * r]
}

/// A point on the loose scatter shell around the origin.
fn shell_position(rng: &mut StdRng) -> [f32; 3] {
    let [x, y, z] = unit_direction(rng);
    let r = rng.random_range(SHELL_MIN..SHELL_MAX);
    [x * r, y * r, z * r]
}

fn unit_direction(rng: &mut StdRng) -> [f32; 3] {
    loop {
        let v = [
            rng.random_range(-1.0f32..1.0),
            rng.random_range(-1.0f32..1.0),
            rng.random_range(-1.0f32..1.0),
        ];
        let len2 = v[0] * v[0] + v[1] * v[1] + v[2] * v[2];
        if len2 > 1e-4 && len2 <= 1.0 {
            let len = len2.sqrt();
            return [v[0] / len, v[1] / len, v[2] / len];
        }
    }
}

/// Body particles get the green range with occasional warm lights; the star
/// cluster is near-white gold.
fn particle_color(i: usize, star_from: usize, rng: &mut StdRng) -> u32 {
    if i >= star_from {
        return hsv_to_argb(48.0, 0.25, 1.0);
    }
    if rng.random_range(0..12) == 0 {
        // A string light: warm amber or pale pink.
        let hue = rng.random_range(20.0..45.0);
        hsv_to_argb(hue, 0.65, 1.0)
    } else {
        let hue = rng.random_range(110.0..150.0);
        hsv_to_argb(hue, 0.75, rng.random_range(0.5..0.9))
    }
}

/// Convert HSV to packed ARGB (0xAARRGGBB, A=0xFF).
pub fn hsv_to_argb(h: f32, s: f32, v: f32) -> u32 {
    let h = h.rem_euclid(360.0);
    let hi = (h / 60.0) as u32;
    let f = h / 60.0 - hi as f32;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    let (r, g, b) = match hi {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };
    let ri = (r * 255.0) as u32;
    let gi = (g * 255.0) as u32;
    let bi = (b * 255.0) as u32;
    0xFF00_0000 | (ri << 16) | (gi << 8) | bi
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use gesture_control::ControlConfig;

    fn signals() -> Signals {
        Signals::initial(&ControlConfig::default())
    }

    fn awake_scene() -> SceneState {
        let mut scene = SceneState::new(500, 40, 12.0);
        for _ in 0..3 {
            scene.register_click();
        }
        scene
    }

    #[test]
    fn wakes_after_three_clicks() {
        let mut scene = SceneState::new(10, 0, 12.0);
        scene.register_click();
        scene.register_click();
        assert!(!scene.is_awake());
        assert_eq!(scene.wake_clicks_remaining(), 1);
        scene.register_click();
        assert!(scene.is_awake());
    }

    #[test]
    fn formation_converges_when_formed() {
        let mut scene = awake_scene();
        let mut s = signals();
        s.mode = SceneMode::Formed;
        for _ in 0..400 {
            scene.tick(1.0 / 60.0, &s);
        }
        assert!(scene.formation() > 0.95);

        s.mode = SceneMode::Scattered;
        for _ in 0..400 {
            scene.tick(1.0 / 60.0, &s);
        }
        assert!(scene.formation() < 0.05);
    }

    #[test]
    fn dormant_scene_never_forms() {
        let mut scene = SceneState::new(100, 0, 12.0);
        let mut s = signals();
        s.mode = SceneMode::Formed;
        for _ in 0..400 {
            scene.tick(1.0 / 60.0, &s);
        }
        assert!(scene.formation() < 0.01);
    }

    #[test]
    fn camera_eases_to_target_distance() {
        let mut scene = awake_scene();
        let mut s = signals();
        s.target_distance = 25.0;
        for _ in 0..400 {
            scene.tick(1.0 / 60.0, &s);
        }
        assert!((scene.camera_distance() - 25.0).abs() < 0.1);
    }

    #[test]
    fn rotation_rate_advances_orbit() {
        let mut scene = awake_scene();
        let mut s = signals();
        s.rotation_rate = 1.0;
        let before = scene.orbit_angle();
        scene.tick(0.5, &s);
        assert!((scene.orbit_angle() - before - 0.5).abs() < 1e-6);
    }

    #[test]
    fn power_off_dims_brightness() {
        let mut scene = awake_scene();
        let mut s = signals();
        s.power = false;
        for _ in 0..400 {
            scene.tick(1.0 / 60.0, &s);
        }
        assert!(scene.brightness() < POWERED_OFF_BRIGHTNESS + 0.05);
    }

    #[test]
    fn particle_positions_interpolate() {
        let p = Particle {
            formed: [1.0, 2.0, 3.0],
            scattered: [3.0, 2.0, 1.0],
            color: 0,
        };
        assert_eq!(p.position(0.0), [3.0, 2.0, 1.0]);
        assert_eq!(p.position(1.0), [1.0, 2.0, 3.0]);
        assert_eq!(p.position(0.5), [2.0, 2.0, 2.0]);
    }

    #[test]
    fn eased_formation_stays_in_unit_range() {
        let mut scene = awake_scene();
        let mut s = signals();
        s.mode = SceneMode::Formed;
        for _ in 0..1000 {
            scene.tick(1.0 / 60.0, &s);
            let e = scene.eased_formation();
            assert!((0.0..=1.0).contains(&e));
        }
    }

    #[test]
    fn snow_wraps_vertically() {
        let mut scene = awake_scene();
        let s = signals();
        for _ in 0..10_000 {
            scene.tick(1.0 / 30.0, &s);
        }
        for flake in scene.snow() {
            assert!(flake.pos[1] >= -SNOW_EXTENT - 0.001);
            assert!(flake.pos[1] <= SNOW_EXTENT + 0.001);
        }
    }
}
