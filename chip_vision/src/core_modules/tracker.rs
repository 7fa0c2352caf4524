// THEORY:
// The `tracker` module owns every chip currently in the scene and drives its
// lifecycle:
//
//     SPAWNED -> ADVANCING -> (COUNTED) -> EXPIRED
//
// 1.  **Birth**: a chip is spawned off-scene above the belt with its class,
//     digits, authenticity and value decided once. Automatic spawns follow a
//     randomized countdown redrawn after each spawn; manual spawns (single or
//     burst) are honored immediately.
// 2.  **Motion**: in simulated modes every chip moves by the conveyor velocity
//     each tick. In camera mode there is no velocity; chips are matched to the
//     frame's detections by nearest centroid and moved to where they were seen.
// 3.  **Counting**: the first update at which a chip's transit coordinate
//     reaches the scan line emits exactly one `ChipCounted` event. The `crossed`
//     flag guards it, so polling faster never double counts.
// 4.  **Death**: a chip past the far bound (or, in camera mode, unseen for too
//     many frames) is removed. Counting is checked before removal, and the scan
//     line always lies before the far bound, so a chip that crosses the scene is
//     counted before it expires.
//
// Chips never interact; there is no collision handling. All randomness comes
// from the injected generator, so a seeded tracker replays identically.

use crate::config::{SceneConfig, SpawnConfig, StationConfig, TrackingConfig};
use crate::core_modules::blob_detector::BoundingBox;
use crate::core_modules::chip::{Chip, ChipClass, ChipId, DigitSequence, Position};
use crate::core_modules::classifier::Detection;
use crate::error::{Error, Result};
use log::{debug, info};
use rand::distributions::{Distribution, WeightedIndex};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;

/// Emitted once per chip, on the update where it first reaches the scan line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChipCounted {
    pub id: ChipId,
    pub class: ChipClass,
    pub value: u32,
    pub is_authentic: bool,
}

/// Everything that happened during one tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub spawned: Vec<ChipId>,
    pub counted: Vec<ChipCounted>,
    pub expired: Vec<ChipId>,
}

impl TickReport {
    pub fn is_empty(&self) -> bool {
        self.spawned.is_empty() && self.counted.is_empty() && self.expired.is_empty()
    }
}

pub struct ChipTracker<R = ChaCha8Rng> {
    chips: Vec<Chip>,
    next_id: u64,
    tick: u64,
    ticks_until_spawn: u32,
    auto_spawn: bool,
    scene: SceneConfig,
    spawning: SpawnConfig,
    tracking: TrackingConfig,
    class_distribution: WeightedIndex<f64>,
    rng: R,
}

impl ChipTracker<ChaCha8Rng> {
    /// A tracker driven by a ChaCha8 generator seeded with `seed`.
    pub fn seeded(config: &StationConfig, seed: u64) -> Result<Self> {
        Self::new(config, ChaCha8Rng::seed_from_u64(seed))
    }
}

impl<R: Rng> ChipTracker<R> {
    /// Fails with `Error::Config` when `config` does not validate.
    pub fn new(config: &StationConfig, mut rng: R) -> Result<Self> {
        config.validate()?;
        let class_distribution = WeightedIndex::new(config.spawning.class_weights.iter())
            .map_err(|e| Error::Config(format!("class_weights: {e}")))?;
        let ticks_until_spawn =
            rng.gen_range(config.spawning.interval_min..=config.spawning.interval_max);
        Ok(Self {
            chips: Vec::new(),
            next_id: 0,
            tick: 0,
            ticks_until_spawn,
            auto_spawn: true,
            scene: config.scene.clone(),
            spawning: config.spawning.clone(),
            tracking: config.tracking.clone(),
            class_distribution,
            rng,
        })
    }

    pub fn chips(&self) -> &[Chip] {
        &self.chips
    }

    pub fn chip(&self, id: ChipId) -> Option<&Chip> {
        self.chips.iter().find(|c| c.id() == id)
    }

    pub fn len(&self) -> usize {
        self.chips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chips.is_empty()
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn ticks_until_spawn(&self) -> u32 {
        self.ticks_until_spawn
    }

    pub fn auto_spawn(&self) -> bool {
        self.auto_spawn
    }

    pub fn set_auto_spawn(&mut self, enabled: bool) {
        self.auto_spawn = enabled;
    }

    pub fn scene(&self) -> &SceneConfig {
        &self.scene
    }

    /// Spawns one chip immediately. `None` draws the class from the weighted distribution.
    pub fn spawn(&mut self, class: Option<ChipClass>) -> ChipId {
        let class =
            class.unwrap_or_else(|| ChipClass::ALL[self.class_distribution.sample(&mut self.rng)]);
        let is_authentic = !self.rng.gen_bool(self.spawning.fake_probability);
        let digits = DigitSequence::random(class, &mut self.rng);
        self.spawn_with(class, digits, is_authentic)
    }

    pub fn spawn_burst(&mut self, count: usize) -> Vec<ChipId> {
        (0..count).map(|_| self.spawn(None)).collect()
    }

    /// Spawns a chip with fixed attributes at a random entry point above the belt.
    pub fn spawn_with(
        &mut self,
        class: ChipClass,
        digits: DigitSequence,
        is_authentic: bool,
    ) -> ChipId {
        let (width, height) = (self.scene.chip_width, self.scene.chip_height);
        let (belt_x, belt_width) = self.scene.belt();
        let min_x = belt_x + 10;
        let max_x = belt_x + belt_width as i32 - width as i32 - 10;
        let x = if max_x > min_x {
            self.rng.gen_range(min_x..=max_x)
        } else {
            min_x
        };
        let position = Position {
            x,
            y: -(height as i32) - 10,
        };
        self.insert(class, position, (width, height), digits, is_authentic)
    }

    fn insert(
        &mut self,
        class: ChipClass,
        position: Position,
        size: (u32, u32),
        digits: DigitSequence,
        is_authentic: bool,
    ) -> ChipId {
        let id = ChipId(self.next_id);
        self.next_id += 1;
        let chip = Chip::new(id, class, position, size, digits, is_authentic);
        info!(
            "Spawned {} {} - {} - {} CR",
            class,
            id,
            if is_authentic { "REAL" } else { "FAKE" },
            chip.value()
        );
        self.chips.push(chip);
        id
    }

    /// Discards every chip in flight without counting any of them.
    pub fn clear(&mut self) -> usize {
        let discarded = self.chips.len();
        self.chips.clear();
        discarded
    }

    /// One simulated tick: move, count, expire, then run the spawn countdown.
    pub fn advance(&mut self) -> TickReport {
        self.tick += 1;
        let mut report = TickReport::default();

        let velocity = self.scene.conveyor_speed;
        for chip in &mut self.chips {
            chip.advance(velocity);
        }
        self.settle(&mut report);

        if self.auto_spawn {
            self.ticks_until_spawn = self.ticks_until_spawn.saturating_sub(1);
            if self.ticks_until_spawn == 0 {
                report.spawned.push(self.spawn(None));
                self.ticks_until_spawn = self
                    .rng
                    .gen_range(self.spawning.interval_min..=self.spawning.interval_max);
            }
        }

        report
    }

    /// One camera tick: associate detections with tracked chips, then count and expire.
    pub fn observe(&mut self, detections: &[Detection]) -> TickReport {
        self.tick += 1;
        let mut report = TickReport::default();

        // --- 1. Matching ---
        let mut matches: Vec<(usize, usize)> = Vec::new();
        let mut matched_detections: HashSet<usize> = HashSet::new();
        for (i, chip) in self.chips.iter().enumerate() {
            let (cx, cy) = chip.centroid();
            let mut best_distance = self.tracking.max_match_distance;
            let mut best_index: Option<usize> = None;

            for (j, detection) in detections.iter().enumerate() {
                if detection.class != chip.class() || matched_detections.contains(&j) {
                    continue;
                }
                let distance =
                    ((cx - detection.centroid.0).powi(2) + (cy - detection.centroid.1).powi(2)).sqrt();
                if distance <= best_distance {
                    best_distance = distance;
                    best_index = Some(j);
                }
            }

            if let Some(j) = best_index {
                matches.push((i, j));
                matched_detections.insert(j);
            }
        }

        // --- 2. State Updating ---
        let mut matched_chips: HashSet<usize> = HashSet::new();
        for (i, j) in matches {
            let (position, size) = placement(&detections[j].bounding_box);
            self.chips[i].observe_at(position, size);
            matched_chips.insert(i);
        }

        let max_missed = self.tracking.max_missed_frames;
        let mut index = 0;
        self.chips.retain_mut(|chip| {
            let seen = matched_chips.contains(&index);
            index += 1;
            if seen || chip.miss() <= max_missed {
                return true;
            }
            debug!("{} {} lost after {} missed frames", chip.class(), chip.id(), max_missed);
            report.expired.push(chip.id());
            false
        });

        // --- 3. Births ---
        for (j, detection) in detections.iter().enumerate() {
            if matched_detections.contains(&j) {
                continue;
            }
            let is_authentic = !self.rng.gen_bool(self.spawning.fake_probability);
            let digits = DigitSequence::random(detection.class, &mut self.rng);
            let (position, size) = placement(&detection.bounding_box);
            report
                .spawned
                .push(self.insert(detection.class, position, size, digits, is_authentic));
        }

        self.settle(&mut report);
        report
    }

    // Counting is checked before removal so a chip is never expired uncounted
    // after reaching the line.
    fn settle(&mut self, report: &mut TickReport) {
        let scan_line = self.scene.scan_line();
        for chip in &mut self.chips {
            if chip.try_cross(scan_line) {
                debug!(
                    "Counted {} {} at y={} - {} CR",
                    chip.class(),
                    chip.id(),
                    chip.position().y,
                    chip.value()
                );
                report.counted.push(ChipCounted {
                    id: chip.id(),
                    class: chip.class(),
                    value: chip.value(),
                    is_authentic: chip.is_authentic(),
                });
            }
        }

        let far_bound = self.scene.far_bound();
        self.chips.retain(|chip| {
            if chip.position().y > far_bound {
                report.expired.push(chip.id());
                false
            } else {
                true
            }
        });
    }
}

impl<R: Rng + SeedableRng> ChipTracker<R> {
    /// Restarts the random sequence. Meant for tests and replays.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = R::seed_from_u64(seed);
    }
}

fn placement(bounding_box: &BoundingBox) -> (Position, (u32, u32)) {
    (
        Position {
            x: bounding_box.x as i32,
            y: bounding_box.y as i32,
        },
        (bounding_box.width, bounding_box.height),
    )
}
