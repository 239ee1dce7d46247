//! Real-time MIDI note thread.
//!
//! The frame loop calls [`Instrument::trigger`] and returns immediately; the
//! player thread sends note-on at the requested start time and schedules
//! the matching note-off `duration` later.  Commands travel over a channel,
//! so the frame loop never blocks on the MIDI port.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use finger_notes::{InstrumentStyle, NoteName};
use log::{debug, info, warn};

// ════════════════════════════════════════════════════════════════════════════
// Instrument — what the app needs from a synth
// ════════════════════════════════════════════════════════════════════════════

/// A synth the app can play.  `start` is in seconds on the app clock.
pub trait Instrument: Send {
    fn trigger(&mut self, note: &NoteName, duration: Duration, start: f64);
    fn release(&mut self, note: &NoteName);
    fn set_style(&mut self, style: InstrumentStyle);
    /// Silence everything that is sounding or scheduled.
    fn release_all(&mut self);
}

// ════════════════════════════════════════════════════════════════════════════
// PlayerCommand — sent to the playback thread
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq)]
pub enum PlayerCommand {
    /// Sound `note` at `at`, release it at `off_at`.
    Note { note: u8, at: Instant, off_at: Instant },
    /// Release `note` now and drop its scheduled note-off.
    Release(u8),
    /// Change instrument (MIDI program 0–127).
    SetProgram(u8),
    AllOff,
    /// Terminate the thread.
    Quit,
}

// ════════════════════════════════════════════════════════════════════════════
// MidiOut — abstraction over midir / null (for testing)
// ════════════════════════════════════════════════════════════════════════════

trait MidiOut: Send {
    fn program_change(&mut self, channel: u8, program: u8);
    fn note_on(&mut self,  channel: u8, note: u8, velocity: u8);
    fn note_off(&mut self, channel: u8, note: u8);
}

// ── midir backend ─────────────────────────────────────────────────────────

struct MidirOut {
    conn: midir::MidiOutputConnection,
}

impl MidiOut for MidirOut {
    fn program_change(&mut self, channel: u8, program: u8) {
        let _ = self.conn.send(&[0xC0 | (channel & 0x0F), program & 0x7F]);
    }
    fn note_on(&mut self, channel: u8, note: u8, velocity: u8) {
        let _ = self.conn.send(&[0x90 | (channel & 0x0F), note & 0x7F, velocity & 0x7F]);
    }
    fn note_off(&mut self, channel: u8, note: u8) {
        let _ = self.conn.send(&[0x80 | (channel & 0x0F), note & 0x7F, 0]);
    }
}

// ── null backend (used when no MIDI port is available) ────────────────────

struct NullOut;
impl MidiOut for NullOut {
    fn program_change(&mut self, _ch: u8, _p: u8)   {}
    fn note_on(&mut self, _ch: u8, _n: u8, _v: u8)  {}
    fn note_off(&mut self, _ch: u8, _n: u8)          {}
}

// ════════════════════════════════════════════════════════════════════════════
// open_midi_output — enumerate ports and pick a synth
// ════════════════════════════════════════════════════════════════════════════

/// Port names that look like a software or GM synth.
fn is_synth_port(name: &str) -> bool {
    let n = name.to_lowercase();
    n.contains("fluid") || n.contains("timidity") || n.contains("microsoft")
        || n.contains("gm") || n.contains("synth")
}

/// Open the first synth-looking MIDI output, else the first port.
/// Falls back to `NullOut` with a warning if none is usable.
fn open_midi_output() -> Box<dyn MidiOut> {
    let midi_out = match midir::MidiOutput::new("hand_tiles_player") {
        Ok(m)  => m,
        Err(e) => {
            warn!("MIDI init error: {}; notes will be silent", e);
            return Box::new(NullOut);
        }
    };

    let ports = midi_out.ports();
    if ports.is_empty() {
        warn!("No MIDI output ports found; notes will be silent.");
        warn!("Start a synthesiser such as `fluidsynth` or `timidity -iA`.");
        return Box::new(NullOut);
    }

    let port_idx = ports.iter()
        .position(|p| midi_out.port_name(p).map(|n| is_synth_port(&n)).unwrap_or(false))
        .unwrap_or(0);

    let port = &ports[port_idx];
    let name = midi_out.port_name(port).unwrap_or_else(|_| "Unknown".to_string());
    info!("Opening MIDI port: {}", name);

    match midi_out.connect(port, "hand-tiles-play") {
        Ok(conn) => Box::new(MidirOut { conn }),
        Err(e) => {
            warn!("Failed to connect to {}: {}; notes will be silent", name, e);
            Box::new(NullOut)
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Schedule — pending note-ons / note-offs
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Edge { On, Off }

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Scheduled {
    at:   Instant,
    edge: Edge,
    note: u8,
}

#[derive(Debug, Default)]
struct Schedule {
    pending: Vec<Scheduled>,
}

impl Schedule {
    fn push(&mut self, at: Instant, edge: Edge, note: u8) {
        self.pending.push(Scheduled { at, edge, note });
    }

    /// Forget every scheduled event for `note`.
    fn cancel(&mut self, note: u8) {
        self.pending.retain(|s| s.note != note);
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.pending.iter().map(|s| s.at).min()
    }

    /// Remove and return events due at `now`, earliest first.  At equal
    /// times note-offs go before note-ons.
    fn take_due(&mut self, now: Instant) -> Vec<Scheduled> {
        let (mut due, rest): (Vec<Scheduled>, Vec<Scheduled>) =
            std::mem::take(&mut self.pending).into_iter().partition(|s| s.at <= now);
        self.pending = rest;
        due.sort_by_key(|s| (s.at, s.edge == Edge::On));
        due
    }

    /// Notes currently scheduled to be released.
    fn held(&self) -> Vec<u8> {
        self.pending.iter().filter(|s| s.edge == Edge::Off).map(|s| s.note).collect()
    }

    fn clear(&mut self) {
        self.pending.clear();
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Player — the playback thread
// ════════════════════════════════════════════════════════════════════════════

/// Handle to the MIDI playback thread.
pub struct Player {
    cmd_tx: Sender<PlayerCommand>,
    /// Zero of the app clock used for `start` times.
    epoch:  Instant,
}

impl Player {
    /// Open a MIDI port and spawn the playback thread.
    pub fn spawn(style: InstrumentStyle, velocity: u8, channel: u8, epoch: Instant) -> Self {
        Player::spawn_with(open_midi_output, style, velocity, channel, epoch)
    }

    fn spawn_with<F>(open: F, style: InstrumentStyle, velocity: u8, channel: u8, epoch: Instant) -> Self
    where
        F: FnOnce() -> Box<dyn MidiOut> + Send + 'static,
    {
        let (cmd_tx, cmd_rx) = mpsc::channel::<PlayerCommand>();
        thread::spawn(move || {
            player_thread(open(), style.program(), velocity, channel, cmd_rx);
        });
        Player { cmd_tx, epoch }
    }

    fn send(&self, cmd: PlayerCommand) {
        let _ = self.cmd_tx.send(cmd);
    }

    pub fn quit(&self) { self.send(PlayerCommand::Quit); }

    /// App-clock seconds → instant.
    fn instant_at(&self, t: f64) -> Instant {
        if t.is_finite() && t > 0.0 {
            self.epoch + Duration::from_secs_f64(t)
        } else {
            self.epoch
        }
    }
}

impl Instrument for Player {
    fn trigger(&mut self, note: &NoteName, duration: Duration, start: f64) {
        let at = self.instant_at(start);
        self.send(PlayerCommand::Note { note: note.midi(), at, off_at: at + duration });
    }

    fn release(&mut self, note: &NoteName) {
        self.send(PlayerCommand::Release(note.midi()));
    }

    fn set_style(&mut self, style: InstrumentStyle) {
        info!("Instrument style: {}", style.name());
        self.send(PlayerCommand::SetProgram(style.program()));
    }

    fn release_all(&mut self) {
        self.send(PlayerCommand::AllOff);
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.quit();
    }
}

// ════════════════════════════════════════════════════════════════════════════
// player_thread — the actual loop
// ════════════════════════════════════════════════════════════════════════════

fn player_thread(
    mut midi:     Box<dyn MidiOut>,
    program:      u8,
    velocity:     u8,
    channel:      u8,
    cmd_rx:       Receiver<PlayerCommand>,
) {
    let mut schedule = Schedule::default();
    midi.program_change(channel, program);

    loop {
        // ── wait for a command or the next scheduled edge ─────────────────
        let cmd = match schedule.next_deadline() {
            Some(deadline) => {
                let wait = deadline.saturating_duration_since(Instant::now());
                match cmd_rx.recv_timeout(wait) {
                    Ok(c)                                => Some(c),
                    Err(RecvTimeoutError::Timeout)       => None,
                    Err(RecvTimeoutError::Disconnected)  => Some(PlayerCommand::Quit),
                }
            }
            None => Some(cmd_rx.recv().unwrap_or(PlayerCommand::Quit)),
        };

        match cmd {
            Some(PlayerCommand::Note { note, at, off_at }) => {
                // retrigger: an older note-off must not cut the new note
                if schedule.held().contains(&note) {
                    midi.note_off(channel, note);
                }
                schedule.cancel(note);
                schedule.push(at, Edge::On, note);
                schedule.push(off_at.max(at), Edge::Off, note);
            }
            Some(PlayerCommand::Release(note)) => {
                schedule.cancel(note);
                midi.note_off(channel, note);
            }
            Some(PlayerCommand::SetProgram(p)) => midi.program_change(channel, p),
            Some(PlayerCommand::AllOff) => {
                for note in schedule.held() {
                    midi.note_off(channel, note);
                }
                schedule.clear();
            }
            Some(PlayerCommand::Quit) => {
                for note in schedule.held() {
                    midi.note_off(channel, note);
                }
                debug!("Player thread exiting");
                return;
            }
            None => {}
        }

        // ── fire everything that is due ──────────────────────────────────
        for ev in schedule.take_due(Instant::now()) {
            match ev.edge {
                Edge::On  => midi.note_on(channel, ev.note, velocity),
                Edge::Off => midi.note_off(channel, ev.note),
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
