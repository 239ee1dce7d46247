//! Software-rendered view using `minifb`.
//!
//! Layout:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ SCORE 12                      COMBO X5!      ▂▄▆█▆▄▂ bars│
//! │                                                          │
//! │        trails ~~~~●  fingertips        ▢ squares         │
//! │                          3                 (dance)       │
//! │ ┌────┬────┬────┬────┬────┐                               │
//! │ │ C4 │ D4 │ E4 │ F4 │ G4 │  key rows, one per finger     │
//! │ └────┴────┴────┴────┴────┘  (piano)                      │
//! ├──────────────────────────────────────────────────────────┤
//! │ settings / status message / key legend                   │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything is drawn into a [`FrameBuffer`], which knows nothing about the
//! window, so the scene can be rendered in tests.

use std::sync::mpsc::Sender;
use std::time::Duration;

use dance_off::{Canvas, Difficulty, Rgba};
use log::warn;
use minifb::{Key, KeyRepeat, MouseMode, Window, WindowOptions};

use crate::app::{AppState, UiInput};
use crate::config::Mode;
use crate::error::AppError;
use crate::source::SimInput;
use crate::trail::{blend, head_color, hsv_to_argb, tail_color};

// ════════════════════════════════════════════════════════════════════════════
// Layout constants
// ════════════════════════════════════════════════════════════════════════════

pub const STATUS_H:    usize = 48;
const KEY_ROW_H:       usize = 22;
const TIP_RADIUS:      isize = 5;
const TRAIL_WIDTH:     isize = 3;
const SQUARE_STROKE:   usize = 2;
const BAR_COUNT:       usize = 16;
const BAR_W:           usize = 6;
const BAR_GAP:         usize = 2;
const BAR_MAX_H:       f32   = 60.0;
pub const BG_COLOR:    u32   = 0xFF101820;
const STATUS_BG:       u32   = 0xFF0F3460;
pub const TIP_COLOR:   u32   = 0xFFFF0000;
const KEY_COLOR:       u32   = 0xFF22304A;
const KEY_BORDER:      u32   = 0xFF000000;
const TEXT_COLOR:      u32   = 0xFFEEEEEE;
const DIM_TEXT:        u32   = 0xFF888888;
const GOLD:            u32   = 0xFFFFD700;

/// Height of the drawing area for a window of height `h`.
pub fn play_height(h: usize) -> usize {
    h.saturating_sub(STATUS_H).max(1)
}

/// Packed ARGB for a square colour (alpha applied separately).
pub fn rgba_to_argb(c: Rgba) -> u32 {
    0xFF000000 | ((c.r as u32) << 16) | ((c.g as u32) << 8) | c.b as u32
}

// ════════════════════════════════════════════════════════════════════════════
// FrameBuffer — pixels plus primitive drawing
// ════════════════════════════════════════════════════════════════════════════

pub struct FrameBuffer {
    pub buf:    Vec<u32>,
    pub width:  usize,
    pub height: usize,
}

impl FrameBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        FrameBuffer { buf: vec![BG_COLOR; width * height], width, height }
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.buf = vec![BG_COLOR; width * height];
    }

    pub fn clear(&mut self, color: u32) {
        self.buf.fill(color);
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<u32> {
        if x < self.width && y < self.height { Some(self.buf[y * self.width + x]) } else { None }
    }

    pub fn set_pixel(&mut self, x: isize, y: isize, color: u32) {
        if x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height {
            self.buf[y as usize * self.width + x as usize] = color;
        }
    }

    /// Mix `color` over the existing pixel with weight `alpha`.
    pub fn blend_pixel(&mut self, x: isize, y: isize, color: u32, alpha: f32) {
        if let Some(under) = self.pixel_at(x, y) {
            self.set_pixel(x, y, blend(under, color, alpha));
        }
    }

    fn pixel_at(&self, x: isize, y: isize) -> Option<u32> {
        if x < 0 || y < 0 { return None; }
        self.pixel(x as usize, y as usize)
    }

    pub fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        for row in y..(y + h).min(self.height) {
            for col in x..(x + w).min(self.width) {
                self.buf[row * self.width + col] = color;
            }
        }
    }

    pub fn fill_rect_alpha(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32, alpha: f32) {
        for row in y..(y + h).min(self.height) {
            for col in x..(x + w).min(self.width) {
                let i = row * self.width + col;
                self.buf[i] = blend(self.buf[i], color, alpha);
            }
        }
    }

    /// Rectangle outline `thickness` pixels wide, blended with `alpha`.
    pub fn draw_border(&mut self, x: usize, y: usize, w: usize, h: usize, thickness: usize, color: u32, alpha: f32) {
        if w == 0 || h == 0 { return; }
        let t = thickness.max(1).min(w).min(h);
        self.fill_rect_alpha(x, y, w, t, color, alpha);
        self.fill_rect_alpha(x, y + h - t, w, t, color, alpha);
        self.fill_rect_alpha(x, y + t, t, h.saturating_sub(2 * t), color, alpha);
        self.fill_rect_alpha(x + w - t, y + t, t, h.saturating_sub(2 * t), color, alpha);
    }

    pub fn fill_circle(&mut self, cx: isize, cy: isize, r: isize, color: u32) {
        for dy in -r..=r {
            for dx in -r..=r {
                if dx * dx + dy * dy <= r * r {
                    self.set_pixel(cx + dx, cy + dy, color);
                }
            }
        }
    }

    /// Straight line with square caps, `width` pixels thick.
    pub fn draw_line(&mut self, from: (f32, f32), to: (f32, f32), width: isize, color: u32, alpha: f32) {
        if alpha <= 0.0 { return; }
        let (dx, dy) = (to.0 - from.0, to.1 - from.1);
        let steps = dx.abs().max(dy.abs()).ceil().max(1.0) as usize;
        let half = width / 2;
        let mut last = None;
        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            let p = ((from.0 + dx * t).round() as isize, (from.1 + dy * t).round() as isize);
            if last == Some(p) { continue; }
            last = Some(p);
            for oy in -half..=half {
                for ox in -half..=half {
                    self.blend_pixel(p.0 + ox, p.1 + oy, color, alpha);
                }
            }
        }
    }

    /// Text in the 3×5 bitmap font, each font pixel `scale` screen pixels.
    pub fn draw_label(&mut self, text: &str, x: isize, y: isize, scale: usize, color: u32) {
        let s = scale.max(1) as isize;
        let mut cx = x;
        for ch in text.chars() {
            if cx >= self.width as isize { break; }
            for (row, &bits) in char_glyph(ch).iter().enumerate() {
                for col in 0..3isize {
                    if bits & (1 << (2 - col)) == 0 { continue; }
                    for py in 0..s {
                        for px in 0..s {
                            self.set_pixel(cx + col * s + px, y + row as isize * s + py, color);
                        }
                    }
                }
            }
            cx += 4 * s; // 3 wide + 1 gap
        }
    }
}

/// Pixel width of `text` at `scale`.
pub fn label_width(text: &str, scale: usize) -> usize {
    let n = text.chars().count();
    if n == 0 { 0 } else { (n * 4 - 1) * scale.max(1) }
}

// ════════════════════════════════════════════════════════════════════════════
// Scene
// ════════════════════════════════════════════════════════════════════════════

/// Draw one complete frame of `app` into `fb`.
pub fn draw_scene(fb: &mut FrameBuffer, app: &AppState, now: f64) {
    fb.clear(BG_COLOR);
    let play_h = play_height(fb.height);

    match app.mode() {
        Mode::Piano => draw_keys(fb, app, play_h),
        Mode::Dance => draw_squares(fb, app, now),
    }
    draw_trails(fb, app, now, play_h);
    draw_fingertips(fb, app, play_h);
    draw_bars(fb, app, now);
    if app.mode() == Mode::Dance {
        draw_game_hud(fb, app, now, play_h);
    }
    draw_status(fb, app, play_h);
}

fn to_screen(app: &AppState, p: hand_landmarks::Landmark, w: usize, h: usize) -> (f32, f32) {
    app.screen_point(p).to_pixels(w as f32, h as f32)
}

// ── Piano key rows ────────────────────────────────────────────────────────

fn draw_keys(fb: &mut FrameBuffer, app: &AppState, play_h: usize) {
    let mapper = app.mapper();
    let fingers = mapper.playable_fingers();
    let rows = fingers.len();
    let top = play_h.saturating_sub(rows * KEY_ROW_H);

    for (r, &finger) in fingers.iter().enumerate() {
        let y = top + r * KEY_ROW_H;
        let notes = mapper.sub_range(finger);
        if notes.is_empty() { continue; }
        let lit = mapper.state(finger).last_index;

        for (j, note) in notes.iter().enumerate() {
            let x0 = j * fb.width / notes.len();
            let x1 = (j + 1) * fb.width / notes.len();
            let color = if lit == Some(j) { blend(KEY_COLOR, head_color(finger), 0.7) } else { KEY_COLOR };
            fb.fill_rect(x0, y, x1 - x0, KEY_ROW_H, color);
            fb.draw_border(x0, y, x1 - x0, KEY_ROW_H, 1, KEY_BORDER, 1.0);

            let label = note.to_string();
            let lx = x0 + (x1 - x0).saturating_sub(label_width(&label, 2)) / 2;
            fb.draw_label(&label, lx as isize, (y + 6) as isize, 2, TEXT_COLOR);
        }
        fb.draw_label(finger.name(), 4, (y + 2) as isize, 1, head_color(finger));
    }
}

// ── Dance squares ─────────────────────────────────────────────────────────

fn draw_squares(fb: &mut FrameBuffer, app: &AppState, now: f64) {
    let game = app.game();
    let lifetime = game.settings().lifetime;
    for sq in game.squares() {
        let color = sq.color.faded(sq.opacity(now, lifetime));
        let (x, y) = (sq.x.max(0.0) as usize, sq.y.max(0.0) as usize);
        let size = sq.size.max(1.0) as usize;
        fb.fill_rect_alpha(x, y, size, size, rgba_to_argb(color.fill), color.fill.a);
        fb.draw_border(x, y, size, size, SQUARE_STROKE, rgba_to_argb(color.stroke), color.stroke.a);
    }
}

// ── Trails and fingertips ─────────────────────────────────────────────────

fn draw_trails(fb: &mut FrameBuffer, app: &AppState, now: f64, play_h: usize) {
    for (_hand, finger, trail) in app.trails().iter() {
        for seg in trail.segments(tail_color(finger), head_color(finger), now) {
            let from = to_screen(app, seg.from, fb.width, play_h);
            let to   = to_screen(app, seg.to,   fb.width, play_h);
            fb.draw_line(from, to, TRAIL_WIDTH, seg.color, seg.opacity);
        }
    }
}

fn draw_fingertips(fb: &mut FrameBuffer, app: &AppState, play_h: usize) {
    let Some(frame) = app.frame() else { return };
    let fingers = app.tracked_fingers();
    for tip in frame.fingertips(&fingers) {
        let (x, y) = to_screen(app, tip.point, fb.width, play_h);
        fb.fill_circle(x.round() as isize, y.round() as isize, TIP_RADIUS, TIP_COLOR);
    }
}

// ── Velocity bars (top right) ─────────────────────────────────────────────

fn draw_bars(fb: &mut FrameBuffer, app: &AppState, now: f64) {
    let total = BAR_COUNT * (BAR_W + BAR_GAP);
    let x0 = fb.width.saturating_sub(total + 10);
    let base = 10 + BAR_MAX_H as usize;
    for (i, h) in app.meter().bar_heights(BAR_COUNT, now, BAR_MAX_H).into_iter().enumerate() {
        let h = (h.round() as usize).max(1);
        let color = hsv_to_argb(200.0 - i as f32 * 10.0, 0.7, 0.9);
        fb.fill_rect(x0 + i * (BAR_W + BAR_GAP), base - h, BAR_W, h, color);
    }
}

// ── Dance HUD ─────────────────────────────────────────────────────────────

fn draw_game_hud(fb: &mut FrameBuffer, app: &AppState, now: f64, play_h: usize) {
    let game = app.game();
    fb.draw_label(&format!("SCORE {}", game.score()), 10, 10, 3, TEXT_COLOR);

    let diff = game.difficulty().name().to_uppercase();
    let dx = fb.width.saturating_sub(label_width(&diff, 2) + 10);
    fb.draw_label(&diff, dx as isize, (BAR_MAX_H as usize + 20) as isize, 2, difficulty_color(game.difficulty()));

    if let Some(n) = game.countdown_value(now) {
        let text = n.to_string();
        let x = fb.width.saturating_sub(label_width(&text, 16)) / 2;
        let y = play_h.saturating_sub(5 * 16) / 2;
        fb.draw_label(&text, x as isize, y as isize, 16, GOLD);
    }

    if let Some(msg) = game.combo().visible_message(now) {
        let msg = msg.to_uppercase();
        let x = fb.width.saturating_sub(label_width(&msg, 4)) / 2;
        fb.draw_label(&msg, x as isize, 50, 4, GOLD);
    }

    if game.is_idle() {
        let hint = if app.is_enabled() { "PRESS SPACE TO START" } else { "PRESS E TO START TRACKING" };
        let x = fb.width.saturating_sub(label_width(hint, 2)) / 2;
        fb.draw_label(hint, x as isize, (play_h / 2) as isize, 2, DIM_TEXT);
    }
}

fn difficulty_color(d: Difficulty) -> u32 {
    match d {
        Difficulty::Easy   => 0xFF66DD66,
        Difficulty::Medium => 0xFFFFCC33,
        Difficulty::Hard   => 0xFFFF5544,
    }
}

// ── Status bar ────────────────────────────────────────────────────────────

fn draw_status(fb: &mut FrameBuffer, app: &AppState, play_h: usize) {
    fb.fill_rect(0, play_h, fb.width, fb.height.saturating_sub(play_h), STATUS_BG);

    let tracking = if app.is_enabled() { "TRACKING" } else { "OFF" };
    let settings = match app.mode() {
        Mode::Piano => format!(
            "PIANO  STYLE {}  DENSITY {}  HANDS {}  {}",
            app.style().name(), app.mapper().density(), app.max_hands(), tracking,
        ),
        Mode::Dance => format!(
            "DANCE  {}  HANDS {}  {}",
            app.game().difficulty().name(), app.max_hands(), tracking,
        ),
    };
    let y = play_h as isize;
    fb.draw_label(&settings,   10, y + 4,  2, TEXT_COLOR);
    fb.draw_label(&app.status, 10, y + 18, 2, GOLD);
    fb.draw_label(
        "E=track  M=mode  S=style  N=density  D/1-3=difficulty  H=hands  Space=start  Q=quit",
        10, y + 36, 1, DIM_TEXT,
    );
}

// ════════════════════════════════════════════════════════════════════════════
// Visualizer — the window
// ════════════════════════════════════════════════════════════════════════════

pub struct Visualizer {
    window:  Window,
    fb:      FrameBuffer,
    /// Mouse → simulated hand, while the simulator runs.
    sim_tx:  Option<Sender<SimInput>>,
    pointer_inside: bool,
}

impl Visualizer {
    pub fn new(title: &str, width: usize, height: usize) -> Result<Self, AppError> {
        let mut window = Window::new(
            title,
            width,
            height,
            WindowOptions { resize: true, ..WindowOptions::default() },
        )?;

        window.limit_update_rate(Some(Duration::from_millis(16))); // ~60fps

        Ok(Visualizer {
            window,
            fb: FrameBuffer::new(width, height),
            sim_tx: None,
            pointer_inside: false,
        })
    }

    /// Returns false when the window should close.
    pub fn is_open(&self) -> bool { self.window.is_open() }

    pub fn attach_sim(&mut self, tx: Sender<SimInput>) {
        self.sim_tx = Some(tx);
        self.pointer_inside = false;
    }

    pub fn detach_sim(&mut self) {
        self.sim_tx = None;
    }

    /// Drawing area, following window resizes.
    pub fn canvas(&mut self) -> Canvas {
        let (w, h) = self.window.get_size();
        if w > 0 && h > 0 && (w, h) != (self.fb.width, self.fb.height) {
            self.fb.resize(w, h);
        }
        Canvas::new(self.fb.width as f32, play_height(self.fb.height) as f32)
    }

    /// Keyboard → [`UiInput`]s; mouse → simulated hand.
    pub fn poll_input(&mut self) -> Vec<UiInput> {
        let mut inputs = Vec::new();
        if !self.window.is_open() {
            inputs.push(UiInput::Quit);
            return inputs;
        }

        let one_shot = |k: Key| self.window.is_key_pressed(k, KeyRepeat::No);

        if one_shot(Key::Q) || one_shot(Key::Escape) {
            inputs.push(UiInput::Quit);
            return inputs;
        }
        if one_shot(Key::E)     { inputs.push(UiInput::ToggleEnable); }
        if one_shot(Key::M)     { inputs.push(UiInput::ToggleMode); }
        if one_shot(Key::S)     { inputs.push(UiInput::CycleStyle); }
        if one_shot(Key::N)     { inputs.push(UiInput::CycleDensity); }
        if one_shot(Key::D)     { inputs.push(UiInput::CycleDifficulty); }
        if one_shot(Key::Key1)  { inputs.push(UiInput::SetDifficulty(Difficulty::Easy)); }
        if one_shot(Key::Key2)  { inputs.push(UiInput::SetDifficulty(Difficulty::Medium)); }
        if one_shot(Key::Key3)  { inputs.push(UiInput::SetDifficulty(Difficulty::Hard)); }
        if one_shot(Key::H)     { inputs.push(UiInput::ToggleHands); }
        if one_shot(Key::Space) { inputs.push(UiInput::StartStop); }

        self.send_pointer();
        inputs
    }

    fn send_pointer(&mut self) {
        let Some(tx) = &self.sim_tx else { return };
        let play_h = play_height(self.fb.height) as f32;
        let event = match self.window.get_mouse_pos(MouseMode::Discard) {
            Some((mx, my)) => {
                self.pointer_inside = true;
                SimInput::Pointer {
                    x: (mx / self.fb.width.max(1) as f32).clamp(0.0, 1.0),
                    y: (my / play_h).clamp(0.0, 1.0),
                }
            }
            None if self.pointer_inside => {
                self.pointer_inside = false;
                SimInput::Leave
            }
            None => return,
        };
        if tx.send(event).is_err() {
            self.sim_tx = None;
        }
    }

    /// Render one frame.
    pub fn render(&mut self, app: &AppState, now: f64) {
        draw_scene(&mut self.fb, app, now);
        if let Err(e) = self.window.update_with_buffer(&self.fb.buf, self.fb.width, self.fb.height) {
            warn!("Window update failed: {}", e);
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Minimal 3×5 bitmap font
// ────────────────────────────────────────────────────────────────────────────

/// Five rows of a 3-pixel-wide glyph, top first; bit 2 is the left column.
/// Letters are case-insensitive; anything unknown draws as a centre dot.
fn char_glyph(c: char) -> [u8; 5] {
    match c {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'a' | 'A' => [0b111, 0b101, 0b111, 0b101, 0b101],
        'b' | 'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'c' | 'C' => [0b111, 0b100, 0b100, 0b100, 0b111],
        'd' | 'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'e' | 'E' => [0b111, 0b100, 0b111, 0b100, 0b111],
        'f' | 'F' => [0b111, 0b100, 0b111, 0b100, 0b100],
        'g' | 'G' => [0b111, 0b100, 0b101, 0b101, 0b111],
        'h' | 'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'i' | 'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'j' | 'J' => [0b001, 0b001, 0b001, 0b101, 0b111],
        'k' | 'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'l' | 'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'm' | 'M' => [0b101, 0b111, 0b101, 0b101, 0b101],
        'n' | 'N' => [0b111, 0b101, 0b101, 0b101, 0b101],
        'o' | 'O' => [0b111, 0b101, 0b101, 0b101, 0b111],
        'p' | 'P' => [0b111, 0b101, 0b111, 0b100, 0b100],
        'q' | 'Q' => [0b111, 0b101, 0b101, 0b111, 0b001],
        'r' | 'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        's' | 'S' => [0b111, 0b100, 0b111, 0b001, 0b111],
        't' | 'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'u' | 'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'v' | 'V' => [0b101, 0b101, 0b101, 0b010, 0b010],
        'w' | 'W' => [0b101, 0b101, 0b101, 0b111, 0b101],
        'x' | 'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'y' | 'Y' => [0b101, 0b101, 0b111, 0b010, 0b010],
        'z' | 'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        '#' => [0b101, 0b111, 0b101, 0b111, 0b101],
        '!' => [0b010, 0b010, 0b010, 0b000, 0b010],
        '(' => [0b001, 0b010, 0b010, 0b010, 0b001],
        ')' => [0b100, 0b010, 0b010, 0b010, 0b100],
        '/' => [0b001, 0b001, 0b010, 0b100, 0b100],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        ',' => [0b000, 0b000, 0b000, 0b010, 0b100],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '=' => [0b000, 0b111, 0b000, 0b111, 0b000],
        '+' => [0b000, 0b010, 0b111, 0b010, 0b000],
        ' ' => [0b000, 0b000, 0b000, 0b000, 0b000],
        _   => [0b000, 0b000, 0b010, 0b000, 0b000], // fallback dot
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::InstrumentFactory;
    use crate::config::AppConfig;
    use crate::music::SilentMusic;
    use crate::player::Instrument;
    use finger_notes::{InstrumentStyle, NoteName};
    use hand_landmarks::{Frame, Hand};

    struct Mute;

    impl Instrument for Mute {
        fn trigger(&mut self, _: &NoteName, _: Duration, _: f64) {}
        fn release(&mut self, _: &NoteName) {}
        fn set_style(&mut self, _: InstrumentStyle) {}
        fn release_all(&mut self) {}
    }

    fn app(mode: Mode) -> AppState {
        let cfg = AppConfig { mode, mirror: false, ..AppConfig::default() };
        let factory: InstrumentFactory = Box::new(|_| Box::new(Mute) as Box<dyn Instrument>);
        AppState::new(&cfg, factory, Box::new(SilentMusic::default()))
    }

    fn count(fb: &FrameBuffer, color: u32) -> usize {
        fb.buf.iter().filter(|&&p| p == color).count()
    }

    #[test]
    fn fill_rect_clips_to_buffer() {
        let mut fb = FrameBuffer::new(10, 10);
        fb.fill_rect(8, 8, 5, 5, 0xFFFFFFFF);
        assert_eq!(count(&fb, 0xFFFFFFFF), 4);
    }

    #[test]
    fn negative_coordinates_are_ignored() {
        let mut fb = FrameBuffer::new(4, 4);
        fb.set_pixel(-1, 0, 0xFFFFFFFF);
        fb.blend_pixel(0, -3, 0xFFFFFFFF, 1.0);
        fb.fill_circle(-10, -10, 3, 0xFFFFFFFF);
        assert_eq!(count(&fb, 0xFFFFFFFF), 0);
    }

    #[test]
    fn border_leaves_interior() {
        let mut fb = FrameBuffer::new(10, 10);
        fb.draw_border(0, 0, 10, 10, 2, 0xFFFFFFFF, 1.0);
        assert_eq!(fb.pixel(0, 0), Some(0xFFFFFFFF));
        assert_eq!(fb.pixel(9, 5), Some(0xFFFFFFFF));
        assert_eq!(fb.pixel(5, 5), Some(BG_COLOR));
        assert_eq!(count(&fb, 0xFFFFFFFF), 100 - 36);
    }

    #[test]
    fn alpha_fill_mixes() {
        let mut fb = FrameBuffer::new(2, 2);
        fb.clear(0xFF000000);
        fb.fill_rect_alpha(0, 0, 1, 1, 0xFFFFFFFF, 0.5);
        assert_eq!(fb.pixel(0, 0), Some(0xFF808080));
        assert_eq!(fb.pixel(1, 1), Some(0xFF000000));
    }

    #[test]
    fn circle_has_radius() {
        let mut fb = FrameBuffer::new(30, 30);
        fb.fill_circle(15, 15, 5, TIP_COLOR);
        assert_eq!(fb.pixel(15, 10), Some(TIP_COLOR));
        assert_eq!(fb.pixel(20, 15), Some(TIP_COLOR));
        assert_eq!(fb.pixel(19, 19), Some(BG_COLOR));
    }

    #[test]
    fn line_connects_endpoints() {
        let mut fb = FrameBuffer::new(20, 20);
        fb.clear(0xFF000000);
        fb.draw_line((2.0, 2.0), (17.0, 12.0), 1, 0xFFFFFFFF, 1.0);
        assert_eq!(fb.pixel(2, 2), Some(0xFFFFFFFF));
        assert_eq!(fb.pixel(17, 12), Some(0xFFFFFFFF));
        fb.draw_line((0.0, 19.0), (19.0, 19.0), 1, 0xFFFF0000, 0.0);
        assert_eq!(fb.pixel(10, 19), Some(0xFF000000));
    }

    #[test]
    fn label_scales() {
        assert_eq!(label_width("C#4", 1), 11);
        assert_eq!(label_width("C#4", 2), 22);
        assert_eq!(label_width("", 3), 0);

        let mut fb = FrameBuffer::new(20, 20);
        fb.draw_label("1", 0, 0, 2, 0xFFFFFFFF);
        // '1' top row is 0b010 → middle column, doubled
        assert_eq!(fb.pixel(2, 0), Some(0xFFFFFFFF));
        assert_eq!(fb.pixel(3, 1), Some(0xFFFFFFFF));
        assert_eq!(fb.pixel(0, 0), Some(BG_COLOR));
    }

    #[test]
    fn note_names_have_glyphs() {
        let fallback = char_glyph('~');
        for ch in "ABCDEFG#0123456789!".chars() {
            assert_ne!(char_glyph(ch), fallback, "{}", ch);
        }
    }

    #[test]
    fn status_bar_reserved() {
        assert_eq!(play_height(480 + STATUS_H), 480);
        assert_eq!(play_height(10), 1);
    }

    #[test]
    fn square_colour_packs() {
        assert_eq!(rgba_to_argb(Rgba::new(0x12, 0x34, 0x56, 0.3)), 0xFF123456);
    }

    #[test]
    fn scene_draws_fingertips_on_top() {
        let mut app = app(Mode::Piano);
        app.handle_input(UiInput::ToggleEnable, 0.0);
        app.on_frame(0.0, Some(Frame::new(0.0, vec![Hand::synthetic(0.5, 0.5, 0.05)])));

        let mut fb = FrameBuffer::new(200, 100 + STATUS_H);
        draw_scene(&mut fb, &app, 0.0);
        assert_eq!(fb.pixel(100, 50), Some(TIP_COLOR));
        // status bar background shows through at the far corner
        assert_eq!(fb.pixel(199, 100 + STATUS_H - 1), Some(STATUS_BG));
    }

    #[test]
    fn scene_draws_live_squares() {
        let mut app = app(Mode::Dance);
        let mut fb = FrameBuffer::new(320, 240 + STATUS_H);
        app.set_canvas(320.0, 240.0);
        app.handle_input(UiInput::ToggleEnable, 0.0);
        app.handle_input(UiInput::StartStop, 0.0);
        app.on_frame(3.0, None);
        app.on_frame(4.5, None);

        let sq = app.game().squares()[0].clone();
        draw_scene(&mut fb, &app, 4.5);
        let (cx, cy) = ((sq.x + sq.size / 2.0) as usize, (sq.y + sq.size / 2.0) as usize);
        assert_ne!(fb.pixel(cx, cy), Some(BG_COLOR));
    }

    #[test]
    fn resize_reallocates() {
        let mut fb = FrameBuffer::new(4, 4);
        fb.resize(8, 2);
        assert_eq!(fb.buf.len(), 16);
        assert_eq!(fb.pixel(7, 1), Some(BG_COLOR));
    }
}
