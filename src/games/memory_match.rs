use std::time::Duration;

use crate::difficulty::Difficulty;
use crate::entity::{EntityId, Position};
use crate::game::{Game, GameId, GameRules, RoundContext};
use crate::notify::Notice;
use crate::resolver::{EndReason, Resolution};
use crate::spawner::shuffle;

pub const MATCH_POINTS: u32 = 10;
pub const SPEED_BONUS: u32 = 50;
pub const SPEED_BONUS_WINDOW: Duration = Duration::from_secs(90);
pub const REVEAL_DELAY: Duration = Duration::from_millis(500);
pub const FLIP_BACK_DELAY: Duration = Duration::from_millis(1000);

const SETTLE_MATCH: u32 = 1;
const SETTLE_MISMATCH: u32 = 2;

const CLIENTS: [&str; 4] = ["Acme Corp", "TechGiant", "GlobalFirm", "StartupsInc"];
const PROJECTS: [&str; 4] = ["Phoenix", "Odyssey", "Genesis", "Atlas"];
const TEAMS: [&str; 4] = ["HR", "Engineering", "Marketing", "Sales"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum CardCategory {
    Client,
    Project,
    Team,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Card {
    pub category: CardCategory,
    pub label: &'static str,
}

#[derive(Debug)]
pub enum MemoryMatchAction {
    /// Flip the card in a grid slot
    Flip(usize),
}

pub fn grid_size(difficulty: Difficulty) -> usize {
    difficulty.select(16, 24, 36)
}

/// Unshuffled deck: pair `i` is category `i % 3`, label `(i / 3) % 4`
pub fn deck(pairs: usize) -> Vec<Card> {
    (0..pairs)
        .flat_map(|i| {
            let (category, labels) = match i % 3 {
                0 => (CardCategory::Client, &CLIENTS),
                1 => (CardCategory::Project, &PROJECTS),
                _ => (CardCategory::Team, &TEAMS),
            };
            let card = Card {
                category,
                label: labels[(i / 3) % 4],
            };
            [card.clone(), card]
        })
        .collect()
}

/// Flip two cards at a time; matching labels stay up and score.
#[derive(Debug, Clone, Default)]
pub struct MemoryMatch {
    face_up: Vec<EntityId>,
    settling: bool,
}

impl MemoryMatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_face_up(&self, id: EntityId) -> bool {
        self.face_up.contains(&id)
    }

    /// Two cards are up and waiting for the reveal/flip-back delay
    pub fn is_settling(&self) -> bool {
        self.settling
    }
}

impl Game for MemoryMatch {
    type Kind = Card;
    type Action = MemoryMatchAction;

    fn id(&self) -> GameId {
        GameId::MemoryMatch
    }

    fn rules(&self, difficulty: Difficulty) -> GameRules {
        GameRules::timed(Duration::from_secs(difficulty.select(120, 180, 240)))
    }

    fn setup(&mut self, difficulty: Difficulty, ctx: &mut RoundContext<'_, Card>) {
        *self = Self::default();
        let mut cards = deck(grid_size(difficulty) / 2);
        shuffle(&mut cards, ctx.rng);
        for (slot, card) in cards.into_iter().enumerate() {
            let entity = ctx.spawner.place(card, Position::Slot(slot), ctx.now);
            ctx.entities.insert(entity);
        }
    }

    fn resolve(&mut self, action: MemoryMatchAction, ctx: &mut RoundContext<'_, Card>) -> Resolution {
        let MemoryMatchAction::Flip(slot) = action;
        let Some(id) = ctx.entities.find_at(Position::Slot(slot)).map(|e| e.id) else {
            return Resolution::neutral();
        };
        if ctx.entities.is_resolved(id) {
            return Resolution::already_resolved();
        }
        if self.settling || self.face_up.len() == 2 || self.face_up.contains(&id) {
            return Resolution::neutral();
        }

        self.face_up.push(id);
        if let &[first, second] = self.face_up.as_slice() {
            self.settling = true;
            let same = ctx.entities.get(first).map(|e| e.kind.label)
                == ctx.entities.get(second).map(|e| e.kind.label);
            if same {
                ctx.schedule_once(SETTLE_MATCH, REVEAL_DELAY);
            } else {
                ctx.schedule_once(SETTLE_MISMATCH, FLIP_BACK_DELAY);
            }
        }
        Resolution::neutral()
    }

    fn on_timer(&mut self, tag: u32, ctx: &mut RoundContext<'_, Card>) -> Resolution {
        let pair = std::mem::take(&mut self.face_up);
        self.settling = false;
        match tag {
            SETTLE_MATCH => {
                for id in &pair {
                    ctx.entities.resolve(*id);
                }
                let matched = Notice::success(format!("+{MATCH_POINTS} XP!"), Duration::from_secs(1));
                if !ctx.entities.all_resolved() {
                    return Resolution::reward(MATCH_POINTS).with_notice(matched);
                }
                if ctx.now <= SPEED_BONUS_WINDOW {
                    Resolution::reward(MATCH_POINTS + SPEED_BONUS)
                        .with_notice(matched)
                        .with_notice(Notice::success(
                            format!("Speed bonus: +{SPEED_BONUS} XP!"),
                            Duration::from_secs(2),
                        ))
                        .ending(EndReason::Complete)
                } else {
                    Resolution::reward(MATCH_POINTS)
                        .with_notice(matched)
                        .ending(EndReason::Complete)
                }
            }
            _ => Resolution::neutral(),
        }
    }
}
