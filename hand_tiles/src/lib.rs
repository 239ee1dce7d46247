//! # hand_tiles
//!
//! Fingertip-driven instrument and game.  Hand landmarks come from an
//! external detector process (or a mouse-driven simulated hand); the
//! fingertips either play notes or chase coloured squares.
//!
//! ## Modes
//!
//! | Mode | What the fingertips do |
//! |---|---|
//! | Piano tiles | Each finger owns a slice of the scale; horizontal position picks the note, debounced per finger |
//! | Dance-off | Touch squares before they fade; score, combos, three difficulties with their own music |
//!
//! ## Landmark sources
//!
//! * `--detector "<cmd>"` runs `<cmd>` and reads one JSON frame per line
//!   from its stdout.
//! * Otherwise the mouse drives a simulated pair of hands.
//!
//! ## Keyboard
//!
//! | Key | Action |
//! |---|---|
//! | `E` | Start / stop hand tracking |
//! | `M` | Piano tiles ↔ dance-off |
//! | `S` | Next instrument style |
//! | `N` | Next note density (3 / 5 / 7 per finger) |
//! | `D`, `1`–`3` | Difficulty (takes effect next round) |
//! | `H` | One ↔ two hands |
//! | `Space` | Start / stop a dance-off round |
//! | `Q`, `Escape` | Quit |

pub mod args;
pub mod config;
pub mod error;
pub mod source;
pub mod player;
pub mod music;
pub mod trail;
pub mod visualizer;
pub mod app;
