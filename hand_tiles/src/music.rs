//! Looping background music for dance rounds.
//!
//! WAV files are decoded up front with `hound` and played in a loop on a
//! `cpal` output stream.  The stream is opened on the first `play`, not at
//! start-up, and every failure is reported to the caller, which logs it and
//! carries on without music.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::Sample;
use hound::{SampleFormat, WavReader};
use log::{debug, info, warn};

use crate::error::AppError;

// ════════════════════════════════════════════════════════════════════════════
// BackgroundMusic trait
// ════════════════════════════════════════════════════════════════════════════

pub trait BackgroundMusic {
    /// Start `path` from the beginning, looping.  Replaces whatever was
    /// playing.
    fn play(&mut self, path: &Path) -> Result<(), AppError>;
    fn pause(&mut self);
    fn is_playing(&self) -> bool;
}

/// Keeps track of what *would* be playing.  Used when no audio device is
/// wanted, and in tests.
#[derive(Debug, Default)]
pub struct SilentMusic {
    pub current: Option<PathBuf>,
    playing:     bool,
}

impl BackgroundMusic for SilentMusic {
    fn play(&mut self, path: &Path) -> Result<(), AppError> {
        debug!("(silent) play {}", path.display());
        self.current = Some(path.to_path_buf());
        self.playing = true;
        Ok(())
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn is_playing(&self) -> bool {
        self.playing
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Track — decoded WAV
// ════════════════════════════════════════════════════════════════════════════

/// Interleaved samples in `[-1, 1]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Track {
    samples:     Vec<f32>,
    channels:    usize,
    sample_rate: u32,
}

impl Track {
    pub fn new(samples: Vec<f32>, channels: usize, sample_rate: u32) -> Self {
        Track { samples, channels: channels.max(1), sample_rate: sample_rate.max(1) }
    }

    /// Decode a WAV file (integer or float samples).
    pub fn load(path: &Path) -> Result<Track, AppError> {
        let wrap = |source| AppError::Music { path: path.to_path_buf(), source };

        let reader = WavReader::open(path).map_err(wrap)?;
        let spec = reader.spec();
        let samples = match spec.sample_format {
            SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<Result<Vec<f32>, hound::Error>>()
                .map_err(wrap)?,
            SampleFormat::Int => {
                let scale = 1.0 / (1u64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 * scale))
                    .collect::<Result<Vec<f32>, hound::Error>>()
                    .map_err(wrap)?
            }
        };
        Ok(Track::new(samples, spec.channels as usize, spec.sample_rate))
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    fn sample(&self, frame: usize, channel: usize) -> f32 {
        self.samples[frame * self.channels + channel % self.channels]
    }
}

// ════════════════════════════════════════════════════════════════════════════
// LoopState — shared with the audio callback
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Default)]
struct LoopState {
    track:   Option<Arc<Track>>,
    /// Read position in source frames.
    pos:     f64,
    playing: bool,
    volume:  f32,
}

impl LoopState {
    /// Fill an interleaved output buffer, wrapping at the end of the track.
    /// Rate conversion is nearest-sample.
    fn fill(&mut self, out: &mut [f32], channels: usize, rate: u32) {
        let track = match (&self.track, self.playing) {
            (Some(t), true) if t.frames() > 0 => Arc::clone(t),
            _ => {
                out.iter_mut().for_each(|s| *s = 0.0);
                return;
            }
        };

        let channels = channels.max(1);
        let frames = track.frames() as f64;
        let step = track.sample_rate as f64 / rate.max(1) as f64;

        for frame in out.chunks_mut(channels) {
            let src = (self.pos as usize).min(track.frames() - 1);
            for (c, s) in frame.iter_mut().enumerate() {
                *s = track.sample(src, c) * self.volume;
            }
            self.pos += step;
            while self.pos >= frames {
                self.pos -= frames;
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// WavMusic — hound + cpal backend
// ════════════════════════════════════════════════════════════════════════════

type StreamOpener = fn(Arc<Mutex<LoopState>>) -> Result<cpal::Stream, AppError>;

pub struct WavMusic {
    state:  Arc<Mutex<LoopState>>,
    stream: Option<cpal::Stream>,
    cache:  HashMap<PathBuf, Arc<Track>>,
    open:   StreamOpener,
}

impl WavMusic {
    pub fn new(volume: f32) -> Self {
        let state = LoopState { volume: volume.clamp(0.0, 1.0), ..LoopState::default() };
        WavMusic {
            state:  Arc::new(Mutex::new(state)),
            stream: None,
            cache:  HashMap::new(),
            open:   open_stream,
        }
    }

    #[cfg(test)]
    fn with_opener(volume: f32, open: StreamOpener) -> Self {
        WavMusic { open, ..WavMusic::new(volume) }
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, LoopState>, AppError> {
        self.state.lock().map_err(|_| AppError::Audio("state poisoned".to_string()))
    }

    fn track(&mut self, path: &Path) -> Result<Arc<Track>, AppError> {
        if let Some(t) = self.cache.get(path) {
            return Ok(Arc::clone(t));
        }
        let track = Arc::new(Track::load(path)?);
        info!("Loaded {} ({:.1}s)", path.display(), track.duration_secs());
        self.cache.insert(path.to_path_buf(), Arc::clone(&track));
        Ok(track)
    }

    fn ensure_stream(&mut self) -> Result<&cpal::Stream, AppError> {
        if self.stream.is_none() {
            self.stream = Some((self.open)(Arc::clone(&self.state))?);
        }
        self.stream.as_ref().ok_or_else(|| AppError::Audio("no stream".to_string()))
    }
}

impl BackgroundMusic for WavMusic {
    fn play(&mut self, path: &Path) -> Result<(), AppError> {
        let track = self.track(path)?;
        {
            let mut st = self.lock_state()?;
            st.track   = Some(track);
            st.pos     = 0.0;
            st.playing = false;
        }
        let started = self
            .ensure_stream()
            .and_then(|stream| stream.play().map_err(|e| AppError::Audio(e.to_string())));
        if started.is_ok() {
            self.lock_state()?.playing = true;
        }
        started
    }

    fn pause(&mut self) {
        if let Ok(mut st) = self.state.lock() {
            st.playing = false;
        }
        if let Some(stream) = &self.stream {
            if let Err(e) = stream.pause() {
                warn!("Cannot pause music: {}", e);
            }
        }
    }

    fn is_playing(&self) -> bool {
        self.state.lock().map(|st| st.playing).unwrap_or(false)
    }
}

fn open_stream(state: Arc<Mutex<LoopState>>) -> Result<cpal::Stream, AppError> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| AppError::Audio("no output device available".to_string()))?;
    let supported = device
        .default_output_config()
        .map_err(|e| AppError::Audio(e.to_string()))?;
    let format = supported.sample_format();
    let config: cpal::StreamConfig = supported.into();

    info!(
        "Music output: {} ch @ {} Hz ({:?})",
        config.channels, config.sample_rate.0, format
    );

    let stream = match format {
        cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config, state),
        cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config, state),
        cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config, state),
        other => return Err(AppError::Audio(format!("unsupported sample format {:?}", other))),
    };
    stream.map_err(|e| AppError::Audio(e.to_string()))
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    state:  Arc<Mutex<LoopState>>,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let channels = config.channels as usize;
    let rate = config.sample_rate.0;
    let mut scratch: Vec<f32> = Vec::new();

    device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            scratch.resize(data.len(), 0.0);
            match state.try_lock() {
                Ok(mut st) => st.fill(&mut scratch, channels, rate),
                Err(_)     => scratch.iter_mut().for_each(|s| *s = 0.0),
            }
            for (d, s) in data.iter_mut().zip(&scratch) {
                *d = T::from_sample(*s);
            }
        },
        |err| warn!("Music stream error: {}", err),
        None,
    )
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{WavSpec, WavWriter};

    fn playing(track: Track, volume: f32) -> LoopState {
        LoopState { track: Some(Arc::new(track)), pos: 0.0, playing: true, volume }
    }

    #[test]
    fn load_int_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let spec = WavSpec {
            channels: 2,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut w = WavWriter::create(&path, spec).unwrap();
        for v in [0i16, 16384, -16384, i16::MAX] {
            w.write_sample(v).unwrap();
        }
        w.finalize().unwrap();

        let t = Track::load(&path).unwrap();
        assert_eq!(t.frames(), 2);
        assert_eq!(t.channels, 2);
        assert!((t.sample(0, 1) - 0.5).abs() < 1e-6);
        assert!((t.sample(1, 0) + 0.5).abs() < 1e-6);
        assert!((t.duration_secs() - 2.0 / 8000.0).abs() < 1e-12);
    }

    #[test]
    fn load_missing_file_errors() {
        let err = Track::load(Path::new("music/does/not/exist.wav")).unwrap_err();
        assert!(matches!(err, AppError::Music { .. }));
    }

    #[test]
    fn paused_fills_silence() {
        let mut st = playing(Track::new(vec![1.0; 8], 1, 100), 1.0);
        st.playing = false;
        let mut out = vec![9.0; 4];
        st.fill(&mut out, 1, 100);
        assert_eq!(out, vec![0.0; 4]);
    }

    #[test]
    fn fill_loops_and_scales() {
        let mut st = playing(Track::new(vec![0.1, 0.2, 0.3], 1, 100), 0.5);
        let mut out = vec![0.0; 7];
        st.fill(&mut out, 1, 100);
        let expect = [0.05, 0.1, 0.15, 0.05, 0.1, 0.15, 0.05];
        for (o, e) in out.iter().zip(expect) {
            assert!((o - e).abs() < 1e-6);
        }
        assert!((st.pos - 1.0).abs() < 1e-9);
    }

    #[test]
    fn mono_track_feeds_every_output_channel() {
        let mut st = playing(Track::new(vec![0.4, -0.4], 1, 100), 1.0);
        let mut out = vec![0.0; 4];
        st.fill(&mut out, 2, 100);
        assert_eq!(out, vec![0.4, 0.4, -0.4, -0.4]);
    }

    #[test]
    fn rate_conversion_skips_samples() {
        // 200 Hz source on a 100 Hz device: every other sample
        let mut st = playing(Track::new(vec![0.0, 0.1, 0.2, 0.3], 1, 200), 1.0);
        let mut out = vec![0.0; 3];
        st.fill(&mut out, 1, 100);
        assert_eq!(out, vec![0.0, 0.2, 0.0]);
    }

    fn write_tone(path: &Path) {
        let spec = WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut w = WavWriter::create(path, spec).unwrap();
        for v in [0i16, 1000, -1000, 0] {
            w.write_sample(v).unwrap();
        }
        w.finalize().unwrap();
    }

    fn no_device(_: Arc<Mutex<LoopState>>) -> Result<cpal::Stream, AppError> {
        Err(AppError::Audio("no output device available".to_string()))
    }

    #[test]
    fn not_playing_without_an_output_device() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loop.wav");
        write_tone(&path);

        let mut m = WavMusic::with_opener(0.5, no_device);
        assert!(matches!(m.play(&path), Err(AppError::Audio(_))));
        assert!(!m.is_playing());
        // the track is still cached for a later attempt
        assert!(m.cache.contains_key(&path));
    }

    #[test]
    fn missing_track_leaves_music_stopped() {
        let mut m = WavMusic::with_opener(0.5, no_device);
        assert!(m.play(Path::new("music/does/not/exist.wav")).is_err());
        assert!(!m.is_playing());
    }

    #[test]
    fn silent_music_tracks_state() {
        let mut m = SilentMusic::default();
        assert!(!m.is_playing());
        m.play(Path::new("music/dance_off/Greedy.wav")).unwrap();
        assert!(m.is_playing());
        m.pause();
        assert!(!m.is_playing());
        assert_eq!(m.current.as_deref(), Some(Path::new("music/dance_off/Greedy.wav")));
    }
}
