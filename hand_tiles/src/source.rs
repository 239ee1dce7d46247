//! Landmark acquisition, either from an external detector process or from
//! a mouse-driven simulated hand.
//!
//! The public interface is a stream of [`Frame`]s delivered over an `mpsc`
//! channel.  The frame loop doesn't need to know whether frames came from a
//! camera pipeline or the simulator.  Dropping the receiver stops the source:
//! its thread exits on the next failed send.  A detector process is stopped
//! through its [`DetectorHandle`], since its reader thread may sit blocked on
//! a quiet stdout indefinitely.

use std::io::{BufRead, BufReader};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Instant;

use hand_landmarks::{Frame, Hand, Landmark};
use log::{debug, info, warn};
use rand::Rng;

use crate::error::AppError;

// ════════════════════════════════════════════════════════════════════════════
// LandmarkSource trait — unified interface for detector and sim
// ════════════════════════════════════════════════════════════════════════════

/// Anything that can deliver [`Frame`]s over a channel.
pub trait LandmarkSource: Send + 'static {
    fn run(self: Box<Self>, tx: Sender<Frame>);
}

/// Spawn a landmark source on its own thread and return the receiving end.
pub fn spawn_landmark_source<S: LandmarkSource>(source: S) -> Receiver<Frame> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || Box::new(source).run(tx));
    rx
}

// ════════════════════════════════════════════════════════════════════════════
// ProcessLandmarkSource — external detector printing JSON lines
// ════════════════════════════════════════════════════════════════════════════

/// Frames read from a detector subprocess.
///
/// The command is split on whitespace (no shell).  The process must print
/// one JSON frame per line on stdout:
///
/// ```text
/// {"timestamp": 1.25, "hands": [{"handedness": "Right", "landmarks": [{"x": 0.5, "y": 0.4}, ...]}]}
/// ```
///
/// A bare `READY` line is accepted and skipped; malformed lines are logged
/// and skipped.  The child is killed when the source is dropped, or earlier
/// through a [`DetectorHandle`].
pub struct ProcessLandmarkSource {
    command: String,
    child:   DetectorHandle,
    stdout:  Option<BufReader<ChildStdout>>,
}

/// Shared ownership of a detector child process.
///
/// The reader thread and the frame loop each hold one; whichever calls
/// [`stop`](DetectorHandle::stop) first kills and reaps the child.  Killing
/// closes the child's stdout, which unblocks the reader.
#[derive(Clone, Debug)]
pub struct DetectorHandle {
    command: Arc<str>,
    child:   Arc<Mutex<Child>>,
}

impl DetectorHandle {
    fn new(command: &str, child: Child) -> Self {
        DetectorHandle { command: Arc::from(command), child: Arc::new(Mutex::new(child)) }
    }

    fn lock(&self) -> MutexGuard<'_, Child> {
        // a panicked holder can't leave a Child half-updated
        match self.child.lock() {
            Ok(g)  => g,
            Err(p) => p.into_inner(),
        }
    }

    pub fn id(&self) -> u32 {
        self.lock().id()
    }

    /// True once the process has exited and been reaped.
    pub fn has_exited(&self) -> bool {
        matches!(self.lock().try_wait(), Ok(Some(_)))
    }

    /// Kill the process (if still running) and wait for it.  Idempotent.
    pub fn stop(&self) {
        let mut child = self.lock();
        if let Ok(Some(_)) = child.try_wait() {
            return;
        }
        if let Err(e) = child.kill() {
            warn!("Cannot kill detector `{}`: {}", self.command, e);
        }
        match child.wait() {
            Ok(status) => info!("Stopped detector `{}` ({})", self.command, status),
            Err(e)     => warn!("Waiting for detector `{}` failed: {}", self.command, e),
        }
    }
}

impl ProcessLandmarkSource {
    /// Start the detector.  Fails if the program cannot be launched.
    pub fn start(command: &str) -> Result<Self, AppError> {
        let mut parts = command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| AppError::Detector("empty detector command".to_string()))?;

        let mut child = Command::new(program)
            .args(parts)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| AppError::Detector(format!("cannot start `{}`: {}", command, e)))?;

        let stdout = match child.stdout.take() {
            Some(s) => s,
            None => {
                let _ = child.kill();
                return Err(AppError::Detector(format!("`{}` has no stdout", command)));
            }
        };

        info!("Started detector `{}` (pid {})", command, child.id());
        Ok(ProcessLandmarkSource {
            command: command.to_string(),
            child:   DetectorHandle::new(command, child),
            stdout:  Some(BufReader::new(stdout)),
        })
    }

    /// Handle that can stop the process after the source has moved onto its
    /// reader thread.
    pub fn handle(&self) -> DetectorHandle {
        self.child.clone()
    }
}

impl LandmarkSource for ProcessLandmarkSource {
    fn run(mut self: Box<Self>, tx: Sender<Frame>) {
        if let Some(reader) = self.stdout.take() {
            let sent = pump_json_lines(reader, &tx);
            info!("Detector `{}` finished after {} frames", self.command, sent);
        }
    }
}

impl Drop for ProcessLandmarkSource {
    fn drop(&mut self) {
        self.child.stop();
    }
}

/// Forward every parseable frame line to `tx` until the reader ends or the
/// receiver hangs up.  Returns the number of frames sent.
pub fn pump_json_lines<R: BufRead>(reader: R, tx: &Sender<Frame>) -> usize {
    let mut sent = 0;
    for line in reader.lines() {
        let line = match line {
            Ok(l)  => l,
            Err(e) => {
                warn!("Detector read error: {}", e);
                break;
            }
        };
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed == "READY" {
            continue;
        }
        match Frame::from_json_line(trimmed) {
            Ok(frame) => {
                if tx.send(frame).is_err() {
                    debug!("Frame receiver dropped; detector reader exiting");
                    break;
                }
                sent += 1;
            }
            Err(e) => warn!("Skipping detector line: {}", e),
        }
    }
    sent
}

// ════════════════════════════════════════════════════════════════════════════
// SimLandmarkSource — mouse simulation (always available)
// ════════════════════════════════════════════════════════════════════════════

/// Raw pointer event from the visualizer window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SimInput {
    /// Cursor position, normalized to the window (as drawn on screen).
    Pointer { x: f32, y: f32 },
    /// Cursor left the window.
    Leave,
}

/// Landmark source driven by [`SimInput`] events from the window.
///
/// A synthetic open hand is fanned out around the cursor with the index
/// fingertip on it.  A second hand mirrors the first across the frame
/// centre, so the one/two hand toggle has something to drop.  Each point
/// gets a little random jitter, as a real detector would.
pub struct SimLandmarkSource {
    pub rx:     Receiver<SimInput>,
    /// Window shows a mirrored view; undo it so frames are in camera space.
    pub mirror: bool,
    /// Horizontal distance between neighbouring fingertips.
    pub spread: f32,
    /// Max random offset per landmark.
    pub jitter: f32,
    epoch:      Instant,
}

impl SimLandmarkSource {
    pub fn new(rx: Receiver<SimInput>, mirror: bool) -> Self {
        SimLandmarkSource { rx, mirror, spread: 0.05, jitter: 0.002, epoch: Instant::now() }
    }

    /// Frame for a cursor at screen position `(x, y)`.
    pub fn frame_at(&self, x: f32, y: f32, timestamp: f64) -> Frame {
        let cam_x = if self.mirror { 1.0 - x } else { x };

        let mut right = Hand::synthetic(cam_x, y, self.spread);
        right.handedness = Some("Right".to_string());

        let mut left = Hand::synthetic(1.0 - cam_x, y, self.spread);
        left.handedness = Some("Left".to_string());

        let mut frame = Frame::new(timestamp, vec![right, left]);
        if self.jitter > 0.0 {
            let mut rng = rand::thread_rng();
            for lm in frame.hands.iter_mut().flat_map(|h| h.landmarks.iter_mut()) {
                let dx = rng.gen_range(-self.jitter..=self.jitter);
                let dy = rng.gen_range(-self.jitter..=self.jitter);
                *lm = Landmark::new(lm.x + dx, lm.y + dy).clamped();
            }
        }
        frame
    }
}

impl LandmarkSource for SimLandmarkSource {
    fn run(self: Box<Self>, tx: Sender<Frame>) {
        for input in self.rx.iter() {
            let t = self.epoch.elapsed().as_secs_f64();
            let frame = match input {
                SimInput::Pointer { x, y } => self.frame_at(x, y, t),
                SimInput::Leave            => Frame::empty(t),
            };
            if tx.send(frame).is_err() { return; }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
