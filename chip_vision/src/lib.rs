// THEORY:
// This file is the entry point of the `chip_vision` library crate. It exposes
// the engine behind the chip authenticator: the chip record and its value rule,
// the color classifier, the lifecycle manager, the session accumulator and the
// frame plumbing that feeds camera mode.
//
// Front-ends (the `chip_station` binary) are expected to talk to `ChipPipeline`
// and only reach into `core_modules` for rendering details such as templates
// and display colors.

pub mod config;
pub mod core_modules;
pub mod error;
pub mod frame_feed;
pub mod frame_source;
pub mod pipeline;

pub use config::StationConfig;
pub use core_modules::chip::{Chip, ChipClass, ChipId, DigitSequence, Position};
pub use core_modules::session::{ClassTally, ScannedChip, SessionAccumulator, SessionStats};
pub use core_modules::tracker::{ChipCounted, ChipTracker, TickReport};
pub use error::{Error, FrameError, Result};
pub use pipeline::{ChipPipeline, Command, Flow, RunMode};
