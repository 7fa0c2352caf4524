// THEORY:
// The `pipeline` module is the top-level API of the engine. It joins the
// lifecycle manager, the classifier and the session accumulator behind one
// struct so the three front-ends stay thin:
//
// - **Conveyor**: every `tick` advances the belt and auto-spawns chips.
// - **Interactive**: every `tick` advances the belt; chips only appear when the
//   operator spawns them.
// - **Camera**: every `process_frame` detects chips in a real (or recorded)
//   frame and associates them with the tracked ones. A failed acquisition is
//   reported with `skip_frame` and leaves everything untouched.
//
// Operator input arrives as `Command`s, each mapping to exactly one core
// operation. Counting events from every report are fed to the session, which
// is the only place totals are kept.

use crate::config::StationConfig;
use crate::core_modules::chip::{Chip, ChipClass};
use crate::core_modules::classifier::{Classifier, Detection};
use crate::core_modules::session::{SessionAccumulator, SessionStats};
use crate::core_modules::tracker::{ChipTracker, TickReport};
use crate::error::{Error, FrameError, Result};
use image::RgbImage;
use log::{debug, info, warn};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Conveyor,
    Camera,
    Interactive,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RunMode::Conveyor => "conveyor",
            RunMode::Camera => "camera",
            RunMode::Interactive => "interactive",
        })
    }
}

impl FromStr for RunMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "conveyor" => Ok(RunMode::Conveyor),
            "camera" => Ok(RunMode::Camera),
            "interactive" => Ok(RunMode::Interactive),
            other => Err(Error::InvalidInput(format!("unknown run mode '{other}'"))),
        }
    }
}

/// Operator commands shared by every front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Spawn one chip; `None` draws the class at random.
    Spawn(Option<ChipClass>),
    Burst(usize),
    Clear,
    TogglePause,
    ResetStats,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

pub struct ChipPipeline {
    mode: RunMode,
    tracker: ChipTracker,
    classifier: Classifier,
    session: SessionAccumulator,
    paused: bool,
    last_detections: Vec<Detection>,
    frames_skipped: u64,
}

impl ChipPipeline {
    pub fn new(mode: RunMode, config: &StationConfig, seed: u64) -> Result<Self> {
        let mut tracker = ChipTracker::seeded(config, seed)?;
        tracker.set_auto_spawn(mode == RunMode::Conveyor);
        info!("Pipeline ready: {} mode, seed {}", mode, seed);
        Ok(Self {
            mode,
            tracker,
            classifier: Classifier::new(config.detector.clone()),
            session: SessionAccumulator::new(),
            paused: false,
            last_detections: Vec::new(),
            frames_skipped: 0,
        })
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn chips(&self) -> &[Chip] {
        self.tracker.chips()
    }

    pub fn tracker(&self) -> &ChipTracker {
        &self.tracker
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn classifier_mut(&mut self) -> &mut Classifier {
        &mut self.classifier
    }

    pub fn session(&self) -> &SessionAccumulator {
        &self.session
    }

    pub fn snapshot(&self) -> SessionStats {
        self.session.snapshot()
    }

    /// Detections of the most recent processed frame.
    pub fn last_detections(&self) -> &[Detection] {
        &self.last_detections
    }

    pub fn frames_skipped(&self) -> u64 {
        self.frames_skipped
    }

    /// Advances the simulated belt by one tick. A no-op while paused or in camera mode.
    pub fn tick(&mut self) -> TickReport {
        if self.paused || self.mode == RunMode::Camera {
            return TickReport::default();
        }
        let report = self.tracker.advance();
        self.record(&report);
        report
    }

    /// Detects chips in `frame` and updates the tracked set. A no-op while paused.
    pub fn process_frame(&mut self, frame: &RgbImage) -> TickReport {
        if self.paused {
            return TickReport::default();
        }
        self.last_detections = self.classifier.detect(frame);
        let report = self.tracker.observe(&self.last_detections);
        self.record(&report);
        report
    }

    /// Records a failed acquisition. Detection is skipped for this tick.
    pub fn skip_frame(&mut self, error: &FrameError) {
        self.frames_skipped += 1;
        self.last_detections.clear();
        // A detached camera fails every tick; warn once, then keep it quiet.
        if self.frames_skipped == 1 {
            warn!("Skipping frame: {}", error);
        } else {
            debug!("Skipping frame {}: {}", self.frames_skipped, error);
        }
    }

    pub fn apply(&mut self, command: Command) -> Flow {
        match command {
            Command::Spawn(class) => {
                self.tracker.spawn(class);
            }
            Command::Burst(count) => {
                self.tracker.spawn_burst(count);
            }
            Command::Clear => {
                let discarded = self.tracker.clear();
                info!("Cleared {} chips", discarded);
            }
            Command::TogglePause => {
                self.paused = !self.paused;
                info!("{}", if self.paused { "Paused" } else { "Resumed" });
            }
            Command::ResetStats => {
                self.session.reset();
                info!("Session statistics reset");
            }
            Command::Quit => return Flow::Stop,
        }
        Flow::Continue
    }

    fn record(&mut self, report: &TickReport) {
        for event in &report.counted {
            self.session
                .on_chip_counted(event.class, event.value, event.is_authentic);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame_source::{FrameSource, SyntheticSource};

    fn pipeline(mode: RunMode) -> ChipPipeline {
        ChipPipeline::new(mode, &StationConfig::default(), 17).unwrap()
    }

    #[test]
    fn run_mode_parses() {
        assert_eq!("Camera".parse::<RunMode>().unwrap(), RunMode::Camera);
        assert_eq!(RunMode::Interactive.to_string(), "interactive");
        assert!(matches!("belt".parse::<RunMode>(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn conveyor_session_matches_counted_events() {
        let mut p = pipeline(RunMode::Conveyor);
        let mut total = 0u64;
        let mut real = 0u64;
        let mut fake = 0u64;
        for _ in 0..3000 {
            for event in p.tick().counted {
                if event.is_authentic {
                    total += event.value as u64;
                    real += 1;
                } else {
                    assert_eq!(event.value, 0);
                    fake += 1;
                }
            }
        }
        assert!(real + fake > 0);
        assert_eq!(
            p.snapshot(),
            SessionStats { total_value: total, real_count: real, fake_count: fake }
        );
        assert_eq!(p.session().scanned().len() as u64, real + fake);
    }

    #[test]
    fn pause_freezes_state() {
        let mut p = pipeline(RunMode::Conveyor);
        p.apply(Command::Burst(3));
        p.tick();
        let before: Vec<_> = p.chips().iter().map(|c| c.position()).collect();
        assert_eq!(p.apply(Command::TogglePause), Flow::Continue);
        for _ in 0..100 {
            assert!(p.tick().is_empty());
        }
        let after: Vec<_> = p.chips().iter().map(|c| c.position()).collect();
        assert_eq!(before, after);
        p.apply(Command::TogglePause);
        assert!(!p.is_paused());
    }

    #[test]
    fn interactive_spawns_only_on_command() {
        let mut p = pipeline(RunMode::Interactive);
        for _ in 0..500 {
            assert!(p.tick().spawned.is_empty());
        }
        assert!(p.chips().is_empty());
        p.apply(Command::Spawn(Some(ChipClass::Bronze)));
        assert_eq!(p.chips()[0].class(), ChipClass::Bronze);

        let counted: Vec<_> = (0..300).flat_map(|_| p.tick().counted).collect();
        assert_eq!(counted.len(), 1);
        assert_eq!(p.snapshot().counted(), 1);
    }

    #[test]
    fn clear_and_reset_are_independent() {
        let mut p = pipeline(RunMode::Interactive);
        p.apply(Command::Spawn(Some(ChipClass::Gold)));
        for _ in 0..200 {
            p.tick();
        }
        assert_eq!(p.snapshot().counted(), 1);
        p.apply(Command::Burst(4));
        p.apply(Command::ResetStats);
        assert_eq!(p.snapshot(), SessionStats::default());
        assert_eq!(p.chips().len(), 4);

        p.apply(Command::Clear);
        assert!(p.chips().is_empty());
        for _ in 0..300 {
            p.tick();
        }
        assert_eq!(p.snapshot(), SessionStats::default());
        assert_eq!(p.apply(Command::Quit), Flow::Stop);
    }

    #[test]
    fn ambiguous_color_tracks_a_single_chip() {
        let mut p = pipeline(RunMode::Camera);
        let mut frame = RgbImage::from_pixel(320, 240, image::Rgb([50, 50, 50]));
        for y in 50..110 {
            for x in 50..130 {
                frame.put_pixel(x, y, image::Rgb([150, 127, 62]));
            }
        }
        p.process_frame(&frame);
        assert_eq!(p.last_detections().len(), 1);
        assert_eq!(p.chips().len(), 1);
        assert_eq!(p.chips()[0].class(), ChipClass::Gold);
    }

    #[test]
    fn camera_mode_counts_synthetic_chips() {
        let config = StationConfig::default();
        let mut source = SyntheticSource::new(&config, 23).unwrap();
        let mut p = ChipPipeline::new(RunMode::Camera, &config, 29).unwrap();
        assert!(p.tick().is_empty());

        let mut counted = 0;
        for _ in 0..1200 {
            let frame = source.read_frame().unwrap();
            counted += p.process_frame(&frame).counted.len();
        }
        assert!(counted > 0);
        assert_eq!(p.snapshot().counted(), counted as u64);

        p.skip_frame(&FrameError::Unavailable);
        assert_eq!(p.frames_skipped(), 1);
        assert!(p.last_detections().is_empty());
    }
}
