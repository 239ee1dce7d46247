//! Top-level session state and the frame loop.
//!
//! `AppState` owns the note mapper, the dance-off game, the trails, the
//! velocity meter, the instrument and the background music.  It processes
//! [`UiInput`]s and landmark [`Frame`]s, and the visualizer draws it each
//! frame.  It never touches the window or the landmark thread directly, so
//! everything here runs in tests without hardware.

use std::path::Path;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::time::{Duration, Instant};

use dance_off::{Canvas, Difficulty, Game, GameEvent};
use finger_notes::{next_density, InstrumentStyle, NoteMapper, VelocityMeter};
use hand_landmarks::{Finger, Frame, Landmark};
use log::{debug, error, info, warn};

use crate::config::{AppConfig, Mode};
use crate::error::AppError;
use crate::music::{BackgroundMusic, WavMusic};
use crate::player::{Instrument, Player};
use crate::source::{spawn_landmark_source, DetectorHandle, ProcessLandmarkSource, SimInput, SimLandmarkSource};
use crate::trail::FingerTrails;
use crate::visualizer::Visualizer;

/// Most hands the session will track.
pub const MAX_HANDS: usize = 2;

// ════════════════════════════════════════════════════════════════════════════
// UiInput — user controls
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiInput {
    /// Start / stop landmark acquisition (the "webcam" button).
    ToggleEnable,
    ToggleMode,
    CycleStyle,
    SetStyle(InstrumentStyle),
    CycleDensity,
    SetDensity(usize),
    CycleDifficulty,
    SetDifficulty(Difficulty),
    /// One ↔ two hands.
    ToggleHands,
    /// Dance-off start / stop.
    StartStop,
    Quit,
}

/// Opens the synth on first enable.
pub type InstrumentFactory = Box<dyn FnMut(InstrumentStyle) -> Box<dyn Instrument>>;

// ════════════════════════════════════════════════════════════════════════════
// AppState
// ════════════════════════════════════════════════════════════════════════════

pub struct AppState {
    // ── controls ─────────────────────────────────────────────────────────
    mode:       Mode,
    enabled:    bool,
    mirror:     bool,
    max_hands:  usize,
    style:      InstrumentStyle,
    tempo_bpm:  u32,
    canvas:     Canvas,

    // ── piano ────────────────────────────────────────────────────────────
    mapper:     NoteMapper,

    // ── dance ────────────────────────────────────────────────────────────
    game:       Game,

    // ── feedback ─────────────────────────────────────────────────────────
    trails:     FingerTrails,
    meter:      VelocityMeter,
    /// Latest landmark frame, hands already limited to `max_hands`.
    frame:      Option<Frame>,

    // ── audio ────────────────────────────────────────────────────────────
    instrument:      Option<Box<dyn Instrument>>,
    open_instrument: InstrumentFactory,
    music:           Box<dyn BackgroundMusic>,

    // ── status message ───────────────────────────────────────────────────
    pub status: String,
}

impl AppState {
    pub fn new(cfg: &AppConfig, open_instrument: InstrumentFactory, music: Box<dyn BackgroundMusic>) -> Self {
        let mapper = NoteMapper::new(cfg.scale.clone(), cfg.density, cfg.min_note_interval)
            .with_value(cfg.note_value);

        let mut game = Game::new(cfg.difficulty);
        for (&d, s) in &cfg.difficulty_overrides {
            game.override_settings(d, s.clone());
        }

        AppState {
            mode:      cfg.mode,
            enabled:   false,
            mirror:    cfg.mirror,
            max_hands: cfg.max_hands.clamp(1, MAX_HANDS),
            style:     cfg.style,
            tempo_bpm: cfg.tempo_bpm,
            canvas:    Canvas::new(cfg.window_width as f32, cfg.window_height as f32),
            mapper,
            game,
            trails:    FingerTrails::new(MAX_HANDS, cfg.trail_length, cfg.trail_ttl),
            meter:     VelocityMeter::new(),
            frame:     None,
            instrument: None,
            open_instrument,
            music,
            status:    "Press E to start tracking".to_string(),
        }
    }

    // ── process one UiInput ──────────────────────────────────────────────

    pub fn handle_input(&mut self, input: UiInput, now: f64) {
        match input {
            UiInput::ToggleEnable => {
                if self.enabled { self.disable(); } else { self.enable(); }
            }

            UiInput::ToggleMode => {
                self.stop_game();
                self.mapper.reset();
                self.trails.clear();
                self.mode = self.mode.other();
                info!("Mode: {}", self.mode.name());
                self.status = format!("Mode: {}", self.mode.name());
            }

            UiInput::CycleStyle       => self.set_style(self.style.next()),
            UiInput::SetStyle(style)  => self.set_style(style),

            UiInput::CycleDensity     => self.set_density(next_density(self.mapper.density())),
            UiInput::SetDensity(d)    => self.set_density(d),

            UiInput::CycleDifficulty  => {
                let all = Difficulty::ALL;
                let i = all.iter().position(|&d| d == self.game.difficulty()).unwrap_or(0);
                self.set_difficulty(all[(i + 1) % all.len()]);
            }
            UiInput::SetDifficulty(d) => self.set_difficulty(d),

            UiInput::ToggleHands => {
                self.max_hands = if self.max_hands == 1 { 2 } else { 1 };
                if let Some(f) = &mut self.frame {
                    f.limit_hands(self.max_hands);
                }
                info!("Tracking {} hand(s)", self.max_hands);
                self.status = if self.max_hands == 2 { "Double hands" } else { "Single hand" }.to_string();
            }

            UiInput::StartStop => {
                if self.mode != Mode::Dance {
                    return;
                }
                if !self.enabled {
                    warn!("Hand tracking not running; ignoring game start");
                    self.status = "Start tracking first (E)".to_string();
                    return;
                }
                if self.game.is_idle() {
                    self.game.toggle(now);
                    self.status = format!("Get ready ({})", self.game.difficulty().name());
                } else {
                    self.stop_game();
                    self.status = format!("Game over. Score {}", self.game.score());
                }
            }

            UiInput::Quit => { /* handled in run loop */ }
        }
    }

    fn enable(&mut self) {
        if self.instrument.is_none() {
            let mut inst = (self.open_instrument)(self.style);
            inst.set_style(self.style);
            self.instrument = Some(inst);
            debug!("Instrument opened");
        }
        self.enabled = true;
        info!("Hand tracking on");
        self.status = match self.mode {
            Mode::Piano => "Tracking. Move your fingers".to_string(),
            Mode::Dance => "Tracking. Press SPACE to start".to_string(),
        };
    }

    fn disable(&mut self) {
        self.stop_game();
        self.enabled = false;
        self.frame = None;
        self.trails.clear();
        self.mapper.reset();
        if let Some(inst) = &mut self.instrument {
            inst.release_all();
        }
        info!("Hand tracking off");
        self.status = "Tracking stopped".to_string();
    }

    /// The landmark source could not start or died: back to disabled.
    pub fn source_failed(&mut self, err: &AppError) {
        error!("Failed to start hand tracking: {}", err);
        self.disable();
        self.status = format!("Tracking unavailable: {}", err);
    }

    fn stop_game(&mut self) {
        if !self.game.is_idle() {
            self.game.stop();
        }
        if self.music.is_playing() {
            self.music.pause();
        }
    }

    fn set_style(&mut self, style: InstrumentStyle) {
        self.style = style;
        if let Some(inst) = &mut self.instrument {
            inst.set_style(style);
        }
        self.status = format!("Style: {}", style.name());
    }

    fn set_density(&mut self, density: usize) {
        self.mapper.set_density(density);
        info!("Note density: {} per finger", density);
        self.status = format!("Density: {} notes per finger", self.mapper.density());
    }

    fn set_difficulty(&mut self, d: Difficulty) {
        self.game.set_difficulty(d);
        self.status = if self.game.is_idle() {
            format!("Difficulty: {}", d.name())
        } else {
            format!("Difficulty: {} (next round)", d.name())
        };
    }

    // ── per-frame step ───────────────────────────────────────────────────

    /// Advance one tick.  `frame` is the newest landmark frame since the
    /// last tick, if any arrived.
    pub fn on_frame(&mut self, now: f64, frame: Option<Frame>) {
        if !self.enabled {
            self.trails.prune(now);
            return;
        }

        let fresh = frame.is_some();
        if let Some(mut f) = frame {
            f.limit_hands(self.max_hands);
            self.frame = Some(f);
        }

        let fingers = self.tracked_fingers();
        let frame = match self.frame.take() {
            Some(f) => f,
            None => {
                self.trails.prune(now);
                if self.mode == Mode::Dance {
                    self.update_game(now, None, &fingers);
                }
                return;
            }
        };

        if fresh {
            self.trails.update(&frame, &fingers, now);
            match frame.hands.first().and_then(|h| h.tip(Finger::Index)) {
                Some(tip) => { self.meter.update(tip, now); }
                None      => { self.meter.decay(); }
            }
            if self.mode == Mode::Piano {
                self.play_notes(&frame, &fingers, now);
            }
        } else {
            self.trails.prune(now);
        }

        if self.mode == Mode::Dance {
            self.update_game(now, if fresh { Some(&frame) } else { None }, &fingers);
        }

        self.frame = Some(frame);
    }

    fn play_notes(&mut self, frame: &Frame, fingers: &[Finger], now: f64) {
        for tip in frame.fingertips(fingers) {
            let x = self.screen_point(tip.point).x;
            let Some(hit) = self.mapper.handle(tip.finger, x, now) else { continue };

            let millis = hit.value.millis(self.tempo_bpm);
            if let Some(inst) = &mut self.instrument {
                inst.trigger(&hit.note, Duration::from_millis(millis), now);
            }
            debug!("{} → {} ({})", tip.finger.name(), hit.note, hit.value);
            self.status = format!("Note {} ({})", hit.note, tip.finger.name());
        }
    }

    fn update_game(&mut self, now: f64, frame: Option<&Frame>, fingers: &[Finger]) {
        let events = match frame {
            Some(f) => self.game.update_frame(now, f, fingers, self.canvas, self.mirror),
            None    => self.game.update(now, &[], self.canvas),
        };

        for ev in events {
            match ev {
                GameEvent::RoundStarted => {
                    let track = self.game.settings().music.clone();
                    if let Err(e) = self.music.play(Path::new(&track)) {
                        warn!("Cannot auto-play background music: {}", e);
                    }
                    self.status = format!("Go! ({})", self.game.difficulty().name());
                }
                GameEvent::Touched { score, .. } => {
                    self.status = format!("Score {}", score);
                }
                GameEvent::Spawned { .. } | GameEvent::Expired { .. } => {}
            }
        }
    }

    /// Landmark → the position it is drawn at (normalized).
    pub fn screen_point(&self, p: Landmark) -> Landmark {
        if self.mirror { p.mirrored() } else { p }
    }

    /// Fingers that drive the current mode.
    pub fn tracked_fingers(&self) -> Vec<Finger> {
        match self.mode {
            Mode::Piano => self.mapper.playable_fingers(),
            Mode::Dance => Finger::ALL.to_vec(),
        }
    }

    pub fn set_canvas(&mut self, width: f32, height: f32) {
        if self.canvas.width != width || self.canvas.height != height {
            debug!("Canvas resized to {}x{}", width, height);
            self.canvas = Canvas::new(width, height);
        }
    }

    // ── Accessors for the render loop ────────────────────────────────────

    pub fn mode(&self)       -> Mode                   { self.mode }
    pub fn is_enabled(&self) -> bool                   { self.enabled }
    pub fn mirror(&self)     -> bool                   { self.mirror }
    pub fn max_hands(&self)  -> usize                  { self.max_hands }
    pub fn style(&self)      -> InstrumentStyle        { self.style }
    pub fn canvas(&self)     -> Canvas                 { self.canvas }
    pub fn mapper(&self)     -> &NoteMapper            { &self.mapper }
    pub fn game(&self)       -> &Game                  { &self.game }
    pub fn trails(&self)     -> &FingerTrails          { &self.trails }
    pub fn meter(&self)      -> &VelocityMeter         { &self.meter }
    pub fn frame(&self)      -> Option<&Frame>         { self.frame.as_ref() }
    pub fn music(&self)      -> &dyn BackgroundMusic   { self.music.as_ref() }
}

// ════════════════════════════════════════════════════════════════════════════
// run() — the main application loop
// ════════════════════════════════════════════════════════════════════════════

/// Run the full application.
///
/// This is the entry point called from `main.rs`.  It creates the window,
/// starts and stops the landmark source as tracking is toggled, and drives
/// the input/frame/render loop at ~60 fps.
pub fn run(cfg: AppConfig) -> Result<(), AppError> {
    let epoch = Instant::now();
    let mut vis = Visualizer::new("hand tiles", cfg.window_width, cfg.window_height)?;

    let (velocity, channel) = (cfg.velocity, cfg.channel);
    let open_instrument: InstrumentFactory = Box::new(move |style| {
        Box::new(Player::spawn(style, velocity, channel, epoch)) as Box<dyn Instrument>
    });
    let mut app = AppState::new(&cfg, open_instrument, Box::new(WavMusic::new(cfg.music_volume)));

    // dropped on every exit path, which stops any detector process
    let mut source: Option<ActiveSource> = None;

    while vis.is_open() {
        let now = epoch.elapsed().as_secs_f64();

        // 1. Window size → game canvas
        let canvas = vis.canvas();
        app.set_canvas(canvas.width, canvas.height);

        // 2. User controls
        for input in vis.poll_input() {
            if input == UiInput::Quit {
                return Ok(());
            }
            app.handle_input(input, now);
        }

        // 3. Landmark source follows the enable toggle
        match (app.is_enabled(), source.is_some()) {
            (true, false) => match start_source(&cfg, &mut vis) {
                Ok(s)   => source = Some(s),
                Err(e)  => app.source_failed(&e),
            },
            (false, true) => {
                if let Some(s) = source.take() {
                    s.stop();
                }
                vis.detach_sim();
            }
            _ => {}
        }

        // 4. Keep only the newest frame
        let mut latest = None;
        let mut lost = false;
        if let Some(s) = &source {
            loop {
                match s.frames.try_recv() {
                    Ok(f)                           => latest = Some(f),
                    Err(TryRecvError::Empty)        => break,
                    Err(TryRecvError::Disconnected) => { lost = true; break; }
                }
            }
        }
        if lost {
            if let Some(s) = source.take() {
                s.stop();
            }
            vis.detach_sim();
            app.source_failed(&AppError::Detector("landmark source stopped".to_string()));
        }

        // 5. Per-frame logic
        app.on_frame(now, latest);

        // 6. Render
        vis.render(&app, now);
    }

    Ok(())
}

/// A running landmark source: its frame stream and, for a detector, the
/// handle that stops the process.  Dropping it stops the detector.
struct ActiveSource {
    frames:   Receiver<Frame>,
    detector: Option<DetectorHandle>,
}

impl ActiveSource {
    fn detector(cmd: &str) -> Result<Self, AppError> {
        let src = ProcessLandmarkSource::start(cmd)?;
        let detector = Some(src.handle());
        Ok(ActiveSource { frames: spawn_landmark_source(src), detector })
    }

    fn simulated(sim_rx: Receiver<SimInput>, mirror: bool) -> Self {
        ActiveSource {
            frames:   spawn_landmark_source(SimLandmarkSource::new(sim_rx, mirror)),
            detector: None,
        }
    }

    fn stop(self) {
        debug!("Stopping landmark source");
        drop(self);
    }
}

impl Drop for ActiveSource {
    fn drop(&mut self) {
        if let Some(d) = &self.detector {
            d.stop();
        }
    }
}

fn start_source(cfg: &AppConfig, vis: &mut Visualizer) -> Result<ActiveSource, AppError> {
    match &cfg.detector {
        Some(cmd) => ActiveSource::detector(cmd),
        None => {
            let (sim_tx, sim_rx) = mpsc::channel();
            vis.attach_sim(sim_tx);
            info!("No detector configured; the mouse drives a simulated hand");
            Ok(ActiveSource::simulated(sim_rx, cfg.mirror))
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
