use std::f64::consts::PI;
use std::time::Duration;

use crate::difficulty::Difficulty;
use crate::entity::{EntityId, Position};
use crate::game::{Game, GameId, GameRules, RoundContext};
use crate::notify::Notice;
use crate::resolver::{Points, Resolution, ScoringRule};
use crate::spawner::SpawnSchedule;

const DISTRACTION_LIFETIME: Duration = Duration::from_millis(3000);
const SWEEP_INTERVAL: Duration = Duration::from_millis(100);
const NOTICE_DURATION: Duration = Duration::from_millis(500);
const MOVE_TARGET: u32 = 1;
const ORBIT_RADIUS: f64 = 30.0;
const CENTER: f64 = 50.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Distraction {
    Email,
    Chat,
    Meeting,
}

impl Distraction {
    const ALL: [Distraction; 3] = [Distraction::Email, Distraction::Chat, Distraction::Meeting];
}

impl ScoringRule for Distraction {
    fn points(&self) -> Points {
        Points::new(0, 5)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FocusFlowSettings {
    /// Focus reward per second in hundredths of a point
    pub xp_per_second_pct: u32,
    pub distraction_interval: Duration,
    pub move_interval: Duration,
    pub duration: Duration,
}

impl FocusFlowSettings {
    pub fn for_difficulty(difficulty: Difficulty) -> Self {
        let (xp_pct, distraction_ms, move_ms, secs) = difficulty.select(
            (100, 7000, 2000, 30),
            (120, 5000, 1667, 45),
            (150, 3000, 1333, 60),
        );
        Self {
            xp_per_second_pct: xp_pct,
            distraction_interval: Duration::from_millis(distraction_ms),
            move_interval: Duration::from_millis(move_ms),
            duration: Duration::from_secs(secs),
        }
    }
}

#[derive(Debug)]
pub enum FocusFlowAction {
    /// Pointer entered the document
    Focus,
    /// Pointer left the document
    Blur,
    ClickDistraction(EntityId),
}

/// Keep the pointer on a wandering document while notifications pop up
/// around it. Every focused second earns the difficulty's multiplier;
/// clicking a notification costs points.
#[derive(Debug, Clone)]
pub struct FocusFlow {
    settings: FocusFlowSettings,
    focused: bool,
    target: Position,
    // fractional XP not yet paid out, in hundredths
    carry_pct: u32,
}

impl Default for FocusFlow {
    fn default() -> Self {
        Self {
            settings: FocusFlowSettings::for_difficulty(Difficulty::Easy),
            focused: false,
            target: Position::Point {
                x: CENTER,
                y: CENTER,
            },
            carry_pct: 0,
        }
    }
}

impl FocusFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn target(&self) -> Position {
        self.target
    }
}

impl Game for FocusFlow {
    type Kind = Distraction;
    type Action = FocusFlowAction;

    fn id(&self) -> GameId {
        GameId::FocusFlow
    }

    fn rules(&self, difficulty: Difficulty) -> GameRules {
        let settings = FocusFlowSettings::for_difficulty(difficulty);
        GameRules {
            duration: settings.duration,
            spawn: Some(SpawnSchedule {
                interval: settings.distraction_interval,
                lifetime: Some(DISTRACTION_LIFETIME),
            }),
            sweep_interval: Some(SWEEP_INTERVAL),
            repeating: vec![(MOVE_TARGET, settings.move_interval)],
        }
    }

    fn setup(&mut self, difficulty: Difficulty, _ctx: &mut RoundContext<'_, Distraction>) {
        *self = Self {
            settings: FocusFlowSettings::for_difficulty(difficulty),
            ..Self::default()
        };
    }

    fn spawn(&mut self, ctx: &mut RoundContext<'_, Distraction>) {
        let kind = Distraction::ALL[ctx.rng.pick(Distraction::ALL.len())];
        let position = ctx.rng.point();
        let entity = ctx.spawner.spawn(kind, position, ctx.now);
        ctx.entities.insert(entity);
    }

    fn on_second(&mut self, _ctx: &mut RoundContext<'_, Distraction>) -> Resolution {
        if !self.focused {
            return Resolution::neutral();
        }
        self.carry_pct += self.settings.xp_per_second_pct;
        let whole = self.carry_pct / 100;
        self.carry_pct %= 100;
        if whole == 0 {
            Resolution::neutral()
        } else {
            Resolution::reward(whole)
        }
    }

    fn on_timer(&mut self, tag: u32, ctx: &mut RoundContext<'_, Distraction>) -> Resolution {
        if tag == MOVE_TARGET {
            let angle = ctx.rng.next_f64() * PI * 2.0;
            self.target = Position::Point {
                x: CENTER + angle.cos() * ORBIT_RADIUS,
                y: CENTER + angle.sin() * ORBIT_RADIUS,
            };
        }
        Resolution::neutral()
    }

    fn resolve(
        &mut self,
        action: FocusFlowAction,
        ctx: &mut RoundContext<'_, Distraction>,
    ) -> Resolution {
        match action {
            FocusFlowAction::Focus => {
                self.focused = true;
                Resolution::neutral()
            }
            FocusFlowAction::Blur => {
                self.focused = false;
                Resolution::neutral()
            }
            FocusFlowAction::ClickDistraction(id) => {
                let Some(kind) = ctx.entities.active(id, ctx.now).map(|e| e.kind) else {
                    return Resolution::neutral();
                };
                ctx.entities.remove(id);
                let penalty = kind.points().penalty;
                Resolution::penalty(penalty)
                    .with_notice(Notice::error(format!("-{penalty} XP"), NOTICE_DURATION))
            }
        }
    }
}
