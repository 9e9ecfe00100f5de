//! Ambient MIDI playback thread.
//!
//! A slow pentatonic twinkle plays while the scene is powered and audio is
//! enabled. Notes are generated from a fixed cycling pattern; the scene
//! mode shifts the register (formed = higher, scattered = lower). Playback
//! is started and stopped via channel commands and never blocks the render
//! loop.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use gesture_control::SceneMode;
use tracing::{info, warn};

// ════════════════════════════════════════════════════════════════════════════
// PlayerCommand — sent to the playback thread
// ════════════════════════════════════════════════════════════════════════════

pub enum PlayerCommand {
    /// Begin the ambient pattern.
    Play,
    /// Stop after the current note.
    Stop,
    /// Shift the register for the new scene mode.
    SetMode(SceneMode),
    /// Terminate the thread.
    Quit,
}

// ════════════════════════════════════════════════════════════════════════════
// MidiOut — abstraction over midir / null (for machines without a synth)
// ════════════════════════════════════════════════════════════════════════════

trait MidiOut: Send {
    fn program_change(&mut self, channel: u8, program: u8);
    fn note_on(&mut self, channel: u8, note: u8, velocity: u8);
    fn note_off(&mut self, channel: u8, note: u8);
}

// ── midir backend ─────────────────────────────────────────────────────────

struct MidirOut {
    conn: midir::MidiOutputConnection,
}

impl MidiOut for MidirOut {
    fn program_change(&mut self, channel: u8, program: u8) {
        let _ = self.conn.send(&[0xC0 | (channel & 0x0F), program]);
    }
    fn note_on(&mut self, channel: u8, note: u8, velocity: u8) {
        let _ = self.conn.send(&[0x90 | (channel & 0x0F), note, velocity]);
    }
    fn note_off(&mut self, channel: u8, note: u8) {
        let _ = self.conn.send(&[0x80 | (channel & 0x0F), note, 0]);
    }
}

// ── null backend ──────────────────────────────────────────────────────────

struct NullOut;
impl MidiOut for NullOut {
    fn program_change(&mut self, _ch: u8, _p: u8) {}
    fn note_on(&mut self, _ch: u8, _n: u8, _v: u8) {}
    fn note_off(&mut self, _ch: u8, _n: u8) {}
}

// ════════════════════════════════════════════════════════════════════════════
// open_midi_output — enumerate ports and pick the first usable one
// ════════════════════════════════════════════════════════════════════════════

/// Try to open the first available MIDI output port, preferring a softsynth.
/// Falls back to `NullOut` with a warning if none is found; silence is
/// never fatal.
fn open_midi_output() -> Box<dyn MidiOut> {
    let midi_out = match midir::MidiOutput::new("particle_scene_player") {
        Ok(m) => m,
        Err(e) => {
            warn!("MIDI init error: {e}; running silent");
            return Box::new(NullOut);
        }
    };

    let ports = midi_out.ports();
    if ports.is_empty() {
        warn!("no MIDI output ports found; running silent");
        return Box::new(NullOut);
    }

    let port_idx = ports
        .iter()
        .enumerate()
        .find(|(_, p)| {
            midi_out
                .port_name(p)
                .map(|n| {
                    let n = n.to_lowercase();
                    n.contains("fluid")
                        || n.contains("timidity")
                        || n.contains("microsoft")
                        || n.contains("synth")
                })
                .unwrap_or(false)
        })
        .map(|(i, _)| i)
        .unwrap_or(0);

    let port = &ports[port_idx];
    let name = midi_out
        .port_name(port)
        .unwrap_or_else(|_| "unknown".to_string());

    match midi_out.connect(port, "particle-scene") {
        Ok(conn) => {
            info!("opened MIDI port: {name}");
            Box::new(MidirOut { conn })
        }
        Err(e) => {
            warn!("failed to connect to {name}: {e}; running silent");
            Box::new(NullOut)
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// ScenePlayer — handle to the playback thread
// ════════════════════════════════════════════════════════════════════════════

pub struct ScenePlayer {
    cmd_tx: Sender<PlayerCommand>,
}

impl ScenePlayer {
    pub fn spawn() -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel::<PlayerCommand>();
        thread::spawn(move || player_thread(cmd_rx));
        ScenePlayer { cmd_tx }
    }

    pub fn play(&self) {
        let _ = self.cmd_tx.send(PlayerCommand::Play);
    }
    pub fn stop(&self) {
        let _ = self.cmd_tx.send(PlayerCommand::Stop);
    }
    pub fn set_mode(&self, mode: SceneMode) {
        let _ = self.cmd_tx.send(PlayerCommand::SetMode(mode));
    }
    pub fn quit(&self) {
        let _ = self.cmd_tx.send(PlayerCommand::Quit);
    }
}

impl Drop for ScenePlayer {
    fn drop(&mut self) {
        self.quit();
    }
}

// ════════════════════════════════════════════════════════════════════════════
// player_thread — the actual loop
// ════════════════════════════════════════════════════════════════════════════

/// A-minor pentatonic, one octave. The pattern walks this table with a
/// fixed stride so it never resolves into an obvious loop too quickly.
const SCALE: [u8; 5] = [57, 60, 62, 64, 67];
const PATTERN_STRIDE: usize = 3;
const CELESTA: u8 = 8;
const CHANNEL: u8 = 0;
const VELOCITY: u8 = 72;
const NOTE_MS: u64 = 420;
const GAP_MS: u64 = 180;

fn player_thread(cmd_rx: Receiver<PlayerCommand>) {
    let mut midi = open_midi_output();
    let mut playing = false;
    let mut register = 0i16; // semitone offset from the scene mode
    let mut step = 0usize;

    midi.program_change(CHANNEL, CELESTA);

    loop {
        // ── drain commands ────────────────────────────────────────────────
        loop {
            match cmd_rx.try_recv() {
                Ok(PlayerCommand::Play) => playing = true,
                Ok(PlayerCommand::Stop) => playing = false,
                Ok(PlayerCommand::SetMode(mode)) => {
                    register = match mode {
                        SceneMode::Formed => 12,
                        SceneMode::Scattered => 0,
                    };
                }
                Ok(PlayerCommand::Quit) => return,
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => return,
            }
        }

        if !playing {
            thread::sleep(Duration::from_millis(10));
            continue;
        }

        let note = pattern_note(step, register);
        step = step.wrapping_add(1);

        midi.note_on(CHANNEL, note, VELOCITY);
        thread::sleep(Duration::from_millis(NOTE_MS));
        midi.note_off(CHANNEL, note);
        thread::sleep(Duration::from_millis(GAP_MS));
    }
}

/// Note for pattern position `step`, shifted by `register` semitones.
fn pattern_note(step: usize, register: i16) -> u8 {
    let base = SCALE[(step * PATTERN_STRIDE) % SCALE.len()] as i16;
    (base + register).clamp(0, 127) as u8
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
