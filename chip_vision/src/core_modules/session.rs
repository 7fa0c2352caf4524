// THEORY:
// The `SessionAccumulator` is the only place where a counted chip turns into
// money. It listens for counting events and keeps three running totals:
// the credit value of authentic chips, how many authentic chips were counted
// and how many fakes were caught. A fake contributes nothing to the total.
//
// The totals only grow, except on `reset`, which zeroes everything at once
// and does not touch the chips still on the belt. Per-class tallies back the
// end-of-session summary; the scanned log only keeps the most recent
// `SCANNED_LOG_CAPACITY` records, so a long camera session stays bounded.

use crate::core_modules::chip::ChipClass;
use serde::Serialize;
use std::collections::VecDeque;

pub const SCANNED_LOG_CAPACITY: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SessionStats {
    pub total_value: u64,
    pub real_count: u64,
    pub fake_count: u64,
}

impl SessionStats {
    pub fn counted(&self) -> u64 {
        self.real_count + self.fake_count
    }
}

/// Count and credit value of the authentic chips of one class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ClassTally {
    pub count: u64,
    pub value: u64,
}

/// One entry of the scanned log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScannedChip {
    pub class: ChipClass,
    pub value: u32,
    pub is_authentic: bool,
}

#[derive(Debug, Default)]
pub struct SessionAccumulator {
    stats: SessionStats,
    tallies: [ClassTally; 3],
    scanned: VecDeque<ScannedChip>,
}

impl SessionAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_chip_counted(&mut self, class: ChipClass, value: u32, is_authentic: bool) {
        debug_assert!(is_authentic || value == 0, "fake chip carried value {value}");
        if is_authentic {
            self.stats.total_value += value as u64;
            self.stats.real_count += 1;
            let tally = &mut self.tallies[class.index()];
            tally.count += 1;
            tally.value += value as u64;
        } else {
            self.stats.fake_count += 1;
        }
        if self.scanned.len() == SCANNED_LOG_CAPACITY {
            self.scanned.pop_front();
        }
        self.scanned.push_back(ScannedChip {
            class,
            value: if is_authentic { value } else { 0 },
            is_authentic,
        });
    }

    pub fn reset(&mut self) {
        self.stats = SessionStats::default();
        self.tallies = [ClassTally::default(); 3];
        self.scanned.clear();
    }

    pub fn snapshot(&self) -> SessionStats {
        self.stats
    }

    /// The most recent counted chips, oldest first.
    pub fn scanned(&self) -> &VecDeque<ScannedChip> {
        &self.scanned
    }

    pub fn class_tally(&self, class: ChipClass) -> ClassTally {
        self.tallies[class.index()]
    }

    /// Mean value of authentic chips, 0 when none were counted.
    pub fn average_value(&self) -> f64 {
        if self.stats.real_count == 0 {
            0.0
        } else {
            self.stats.total_value as f64 / self.stats.real_count as f64
        }
    }
}
