use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::difficulty::Difficulty;
use crate::entity::EntitySet;
use crate::resolver::Resolution;
use crate::spawner::{RandomSource, SpawnSchedule, Spawner};
use crate::timers::{TimerKind, TimerSet};

/// Stable identifier of a mini-game
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum GameId {
    MemoryMatch,
    QuickReact,
    FocusFlow,
    CodeReviewRace,
}

/// Catalog entry shown on the games page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameDescriptor {
    pub id: GameId,
    pub title: &'static str,
    pub description: &'static str,
    /// Difficulty badge on the card, independent of the difficulty picked in play
    pub badge: Difficulty,
    /// Rough time commitment, as displayed
    pub duration: &'static str,
}

pub fn catalog() -> Vec<GameDescriptor> {
    vec![
        GameDescriptor {
            id: GameId::MemoryMatch,
            title: "Memory Match",
            description: "Test and improve your memory by matching pairs of cards",
            badge: Difficulty::Medium,
            duration: "5 min",
        },
        GameDescriptor {
            id: GameId::QuickReact,
            title: "Quick React",
            description: "Measure and enhance your reaction time",
            badge: Difficulty::Easy,
            duration: "2 min",
        },
        GameDescriptor {
            id: GameId::FocusFlow,
            title: "Focus Flow",
            description: "Stay focused and complete pattern sequences",
            badge: Difficulty::Hard,
            duration: "10 min",
        },
        GameDescriptor {
            id: GameId::CodeReviewRace,
            title: "Code Review Race",
            description: "Find and classify bugs in the code before time runs out",
            badge: Difficulty::Hard,
            duration: "2 min",
        },
    ]
}

/// Timing configuration a game hands the session at start
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameRules {
    pub duration: Duration,
    pub spawn: Option<SpawnSchedule>,
    pub sweep_interval: Option<Duration>,
    /// Extra repeating timers, as (tag, interval)
    pub repeating: Vec<(u32, Duration)>,
}

impl GameRules {
    pub fn timed(duration: Duration) -> Self {
        Self {
            duration,
            spawn: None,
            sweep_interval: None,
            repeating: Vec::new(),
        }
    }
}

/// Mutable view of session state lent to a game for one callback
pub struct RoundContext<'a, K> {
    pub entities: &'a mut EntitySet<K>,
    pub spawner: &'a mut Spawner,
    pub rng: &'a mut dyn RandomSource,
    pub timers: &'a mut TimerSet,
    /// Logical time since start
    pub now: Duration,
}

impl<K> RoundContext<'_, K> {
    /// Schedule a one-shot game timer relative to now
    pub fn schedule_once(&mut self, tag: u32, after: Duration) {
        self.timers.once(TimerKind::Game(tag), after, self.now);
    }
}

/// Rules of one mini-game.
///
/// The session controller owns the clock, score and timers; a game only
/// decides what spawns and what each action is worth.
pub trait Game {
    /// Entity tag for this game
    type Kind: Clone + fmt::Debug;
    /// Player input understood by this game
    type Action: fmt::Debug;

    fn id(&self) -> GameId;

    fn rules(&self, difficulty: Difficulty) -> GameRules;

    /// Reset internal state and place any entities that exist from the start
    fn setup(&mut self, difficulty: Difficulty, ctx: &mut RoundContext<'_, Self::Kind>);

    /// Spawn timer fired
    fn spawn(&mut self, _ctx: &mut RoundContext<'_, Self::Kind>) {}

    /// Runs on every clock tick, before the countdown is decremented
    fn on_second(&mut self, _ctx: &mut RoundContext<'_, Self::Kind>) -> Resolution {
        Resolution::neutral()
    }

    /// A game timer (one-shot or repeating) fired
    fn on_timer(&mut self, _tag: u32, _ctx: &mut RoundContext<'_, Self::Kind>) -> Resolution {
        Resolution::neutral()
    }

    fn resolve(
        &mut self,
        action: Self::Action,
        ctx: &mut RoundContext<'_, Self::Kind>,
    ) -> Resolution;
}
