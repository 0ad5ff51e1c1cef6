use std::time::Duration;

use crate::difficulty::Difficulty;
use crate::entity::EntityId;
use crate::game::{Game, GameId, GameRules, RoundContext};
use crate::notify::Notice;
use crate::resolver::{Points, Resolution, ScoringRule};
use crate::spawner::{roll_distractor, SpawnSchedule};

const ITEM_LIFETIME: Duration = Duration::from_millis(2000);
const SWEEP_INTERVAL: Duration = Duration::from_millis(100);
const NOTICE_DURATION: Duration = Duration::from_millis(500);

const TARGETS: [&str; 6] = [
    "Priority: Q2 Report",
    "Action: Sign Contract",
    "Alert: Server Down",
    "Urgent: Client Meeting",
    "Critical: System Update",
    "Priority: Budget Review",
];

const DISTRACTORS: [&str; 6] = [
    "Social: Cat Meme",
    "FYI: Newsletter",
    "Reminder: Birthday Lunch",
    "Social: Office Party",
    "FYI: Coffee Break",
    "Chat: Weekend Plans",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ItemKind {
    Target,
    Distractor,
}

impl ScoringRule for ItemKind {
    fn points(&self) -> Points {
        match self {
            ItemKind::Target => Points::new(5, 0),
            ItemKind::Distractor => Points::new(0, 3),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Item {
    pub kind: ItemKind,
    pub label: &'static str,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QuickReactSettings {
    pub spawn_interval: Duration,
    pub distractor_ratio: f64,
    pub duration: Duration,
}

impl QuickReactSettings {
    pub fn for_difficulty(difficulty: Difficulty) -> Self {
        let (interval_ms, distractor_ratio, secs) = difficulty.select(
            (1000, 0.3, 30),
            (500, 0.5, 45),
            (250, 0.7, 60),
        );
        Self {
            spawn_interval: Duration::from_millis(interval_ms),
            distractor_ratio,
            duration: Duration::from_secs(secs),
        }
    }
}

#[derive(Debug)]
pub enum QuickReactAction {
    Click(EntityId),
}

/// Office items pop up and vanish after two seconds; click the important
/// ones, leave the distractions.
#[derive(Debug, Clone)]
pub struct QuickReact {
    settings: QuickReactSettings,
}

impl Default for QuickReact {
    fn default() -> Self {
        Self {
            settings: QuickReactSettings::for_difficulty(Difficulty::Easy),
        }
    }
}

impl QuickReact {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn settings(&self) -> QuickReactSettings {
        self.settings
    }
}

impl Game for QuickReact {
    type Kind = Item;
    type Action = QuickReactAction;

    fn id(&self) -> GameId {
        GameId::QuickReact
    }

    fn rules(&self, difficulty: Difficulty) -> GameRules {
        let settings = QuickReactSettings::for_difficulty(difficulty);
        GameRules {
            duration: settings.duration,
            spawn: Some(SpawnSchedule {
                interval: settings.spawn_interval,
                lifetime: Some(ITEM_LIFETIME),
            }),
            sweep_interval: Some(SWEEP_INTERVAL),
            repeating: Vec::new(),
        }
    }

    fn setup(&mut self, difficulty: Difficulty, _ctx: &mut RoundContext<'_, Item>) {
        self.settings = QuickReactSettings::for_difficulty(difficulty);
    }

    fn spawn(&mut self, ctx: &mut RoundContext<'_, Item>) {
        let item = if roll_distractor(ctx.rng, self.settings.distractor_ratio) {
            Item {
                kind: ItemKind::Distractor,
                label: DISTRACTORS[ctx.rng.pick(DISTRACTORS.len())],
            }
        } else {
            Item {
                kind: ItemKind::Target,
                label: TARGETS[ctx.rng.pick(TARGETS.len())],
            }
        };
        let position = ctx.rng.point();
        let entity = ctx.spawner.spawn(item, position, ctx.now);
        ctx.entities.insert(entity);
    }

    fn resolve(&mut self, action: QuickReactAction, ctx: &mut RoundContext<'_, Item>) -> Resolution {
        let QuickReactAction::Click(id) = action;
        let Some(kind) = ctx.entities.active(id, ctx.now).map(|e| e.kind.kind) else {
            // already clicked or faded out; nothing on screen to hit
            return Resolution::neutral();
        };
        ctx.entities.remove(id);

        let points = kind.points();
        match kind {
            ItemKind::Target => Resolution::reward(points.reward).with_notice(Notice::success(
                format!("+{} XP", points.reward),
                NOTICE_DURATION,
            )),
            ItemKind::Distractor => Resolution::penalty(points.penalty).with_notice(
                Notice::error(format!("-{} XP", points.penalty), NOTICE_DURATION),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_follow_difficulty() {
        let easy = QuickReactSettings::for_difficulty(Difficulty::Easy);
        assert_eq!(easy.spawn_interval, Duration::from_millis(1000));
        assert_eq!(easy.distractor_ratio, 0.3);
        assert_eq!(easy.duration, Duration::from_secs(30));

        let hard = QuickReactSettings::for_difficulty(Difficulty::Hard);
        assert_eq!(hard.spawn_interval, Duration::from_millis(250));
        assert_eq!(hard.distractor_ratio, 0.7);
        assert_eq!(hard.duration, Duration::from_secs(60));
    }

    #[test]
    fn scoring_table() {
        assert_eq!(ItemKind::Target.points(), Points::new(5, 0));
        assert_eq!(ItemKind::Distractor.points(), Points::new(0, 3));
    }

    #[test]
    fn rules_include_sweep_and_lifetime() {
        let rules = QuickReact::new().rules(Difficulty::Medium);
        assert_eq!(rules.duration, Duration::from_secs(45));
        assert_eq!(rules.sweep_interval, Some(SWEEP_INTERVAL));
        assert_eq!(rules.spawn.and_then(|s| s.lifetime), Some(ITEM_LIFETIME));
    }
}
