use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::entity::{Entity, EntityId, Position};

/// Source of the cosmetic randomness used by spawning and dealing.
///
/// Scoring never depends on which values come out; tests inject a
/// [`FixedSequence`] so outcomes stay reproducible.
pub trait RandomSource {
    /// Next value in `[0, 1)`
    fn next_f64(&mut self) -> f64;

    /// Uniform index in `0..len`; `len` must be non-zero
    fn pick(&mut self, len: usize) -> usize {
        let idx = (self.next_f64() * len as f64).floor() as usize;
        idx.min(len.saturating_sub(1))
    }

    /// Point inside the arena, keeping a 10% margin on every side
    fn point(&mut self) -> Position {
        let x = self.next_f64() * 80.0 + 10.0;
        let y = self.next_f64() * 80.0 + 10.0;
        Position::Point { x, y }
    }
}

/// Production randomness backed by `StdRng`
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl Default for SeededRandom {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl RandomSource for SeededRandom {
    fn next_f64(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

/// Cycles through a fixed list of values
#[derive(Debug, Clone)]
pub struct FixedSequence {
    values: Vec<f64>,
    cursor: usize,
}

impl FixedSequence {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values, cursor: 0 }
    }

    /// Always yields the same value
    pub fn constant(value: f64) -> Self {
        Self::new(vec![value])
    }
}

impl RandomSource for FixedSequence {
    fn next_f64(&mut self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let v = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        v.clamp(0.0, 0.999_999)
    }
}

/// How often a game spawns and how long spawned entities live
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpawnSchedule {
    pub interval: Duration,
    pub lifetime: Option<Duration>,
}

/// Builds entities with session-unique ids.
///
/// The id counter survives play-again so a click aimed at an entity from a
/// previous round can never hit a new one.
#[derive(Debug, Clone, Default)]
pub struct Spawner {
    schedule: Option<SpawnSchedule>,
    next_id: u64,
}

impl Spawner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_schedule(&mut self, schedule: Option<SpawnSchedule>) {
        self.schedule = schedule;
    }

    /// Entity stamped with the schedule's lifetime, if any
    pub fn spawn<K>(&mut self, kind: K, position: Position, now: Duration) -> Entity<K> {
        let lifetime = self.schedule.and_then(|s| s.lifetime);
        self.build(kind, position, now, lifetime)
    }

    /// Entity that never expires (cards, embedded bugs)
    pub fn place<K>(&mut self, kind: K, position: Position, now: Duration) -> Entity<K> {
        self.build(kind, position, now, None)
    }

    fn build<K>(
        &mut self,
        kind: K,
        position: Position,
        now: Duration,
        lifetime: Option<Duration>,
    ) -> Entity<K> {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        Entity {
            id,
            kind,
            position,
            spawned_at: now,
            expires_at: lifetime.map(|l| now + l),
        }
    }
}

/// Weighted draw for reaction games: true means a distractor.
pub fn roll_distractor(rng: &mut dyn RandomSource, distractor_ratio: f64) -> bool {
    rng.next_f64() <= distractor_ratio
}

/// In-place Fisher-Yates shuffle driven by a [`RandomSource`]
pub fn shuffle<T>(items: &mut [T], rng: &mut dyn RandomSource) {
    for i in (1..items.len()).rev() {
        let j = rng.pick(i + 1);
        items.swap(i, j);
    }
}
