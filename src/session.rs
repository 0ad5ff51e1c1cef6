use std::time::Duration;

use chrono::Local;

use crate::config::Config;
use crate::difficulty::Difficulty;
use crate::entity::EntitySet;
use crate::game::{Game, RoundContext};
use crate::notify::{Notifier, TracingNotifier};
use crate::record::{GameResult, LogRecorder, ResultRecorder};
use crate::resolver::{EndReason, Outcome, Resolution, Score};
use crate::spawner::{RandomSource, SeededRandom, Spawner};
use crate::timers::{TimerKind, TimerSet};

const CLOCK_TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum SessionStatus {
    Idle,
    Running,
    Ended,
}

// Lend the session's entity set, spawner, rng and timers to a game callback
macro_rules! round_ctx {
    ($session:ident) => {
        RoundContext {
            entities: &mut $session.entities,
            spawner: &mut $session.spawner,
            rng: $session.rng.as_mut(),
            timers: &mut $session.timers,
            now: $session.now,
        }
    };
}

/// One timed play-through of a game.
///
/// ```text
/// idle --start--> running --{timeout | complete}--> ended --play_again--> running
/// ```
///
/// Time is logical: the owner calls [`Session::advance`] with however much
/// wall-clock time passed, and every timer due in that window fires in order.
pub struct Session<G: Game> {
    game: G,
    difficulty: Difficulty,
    status: SessionStatus,
    end_reason: Option<EndReason>,
    score: Score,
    time_remaining: Duration,
    now: Duration,
    entities: EntitySet<G::Kind>,
    timers: TimerSet,
    spawner: Spawner,
    rng: Box<dyn RandomSource>,
    notifier: Box<dyn Notifier>,
    recorder: Box<dyn ResultRecorder>,
    last_result: Option<GameResult>,
}

impl<G: Game> Session<G> {
    pub fn new(game: G) -> Self {
        Self {
            game,
            difficulty: Difficulty::default(),
            status: SessionStatus::Idle,
            end_reason: None,
            score: Score::default(),
            time_remaining: Duration::ZERO,
            now: Duration::ZERO,
            entities: EntitySet::new(),
            timers: TimerSet::new(),
            spawner: Spawner::new(),
            rng: Box::new(SeededRandom::from_entropy()),
            notifier: Box::new(TracingNotifier),
            recorder: Box::new(LogRecorder),
            last_result: None,
        }
    }

    /// Session seeded and pre-set from user configuration
    pub fn from_config(game: G, config: &Config) -> Self {
        let mut session = Self::new(game);
        session.difficulty = config.default_difficulty;
        if let Some(seed) = config.seed {
            session.rng = Box::new(SeededRandom::from_seed(seed));
        }
        session
    }

    pub fn with_rng(mut self, rng: impl RandomSource + 'static) -> Self {
        self.rng = Box::new(rng);
        self
    }

    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Box::new(notifier);
        self
    }

    pub fn with_recorder(mut self, recorder: impl ResultRecorder + 'static) -> Self {
        self.recorder = Box::new(recorder);
        self
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == SessionStatus::Running
    }

    pub fn score(&self) -> u32 {
        self.score.value()
    }

    pub fn time_remaining(&self) -> Duration {
        self.time_remaining
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    /// Logical time since the current play-through started
    pub fn elapsed(&self) -> Duration {
        self.now
    }

    pub fn end_reason(&self) -> Option<EndReason> {
        self.end_reason
    }

    pub fn last_result(&self) -> Option<&GameResult> {
        self.last_result.as_ref()
    }

    pub fn entities(&self) -> &EntitySet<G::Kind> {
        &self.entities
    }

    pub fn game(&self) -> &G {
        &self.game
    }

    /// Mutable access to the game, e.g. to swap in new round content
    /// between play-throughs
    pub fn game_mut(&mut self) -> &mut G {
        &mut self.game
    }

    pub fn active_timers(&self) -> usize {
        self.timers.len()
    }

    /// idle -> running. Ignored in any other state.
    pub fn start(&mut self, difficulty: Difficulty) -> bool {
        if self.status != SessionStatus::Idle {
            tracing::debug!(game = %self.game.id(), status = %self.status, "start ignored");
            return false;
        }
        self.begin(difficulty);
        true
    }

    /// ended -> running with a fresh round
    pub fn play_again(&mut self, difficulty: Difficulty) -> bool {
        if self.status != SessionStatus::Ended {
            tracing::debug!(game = %self.game.id(), status = %self.status, "play again ignored");
            return false;
        }
        self.begin(difficulty);
        true
    }

    /// ended -> idle
    pub fn reset(&mut self) -> bool {
        if self.status != SessionStatus::Ended {
            return false;
        }
        self.clear_round();
        self.status = SessionStatus::Idle;
        self.end_reason = None;
        true
    }

    fn clear_round(&mut self) {
        self.timers.cancel_all();
        self.entities.clear();
        self.score = Score::default();
        self.now = Duration::ZERO;
        self.time_remaining = Duration::ZERO;
    }

    fn begin(&mut self, difficulty: Difficulty) {
        self.clear_round();
        self.difficulty = difficulty;
        self.end_reason = None;

        let rules = self.game.rules(difficulty);
        self.time_remaining = rules.duration;
        self.spawner.set_schedule(rules.spawn);

        self.timers.repeat(TimerKind::Clock, CLOCK_TICK, self.now);
        if let Some(spawn) = rules.spawn {
            self.timers.repeat(TimerKind::Spawn, spawn.interval, self.now);
        }
        if let Some(every) = rules.sweep_interval {
            self.timers.repeat(TimerKind::Sweep, every, self.now);
        }
        for (tag, every) in rules.repeating {
            self.timers.repeat(TimerKind::Game(tag), every, self.now);
        }

        self.status = SessionStatus::Running;
        let mut ctx = round_ctx!(self);
        self.game.setup(difficulty, &mut ctx);

        tracing::debug!(
            game = %self.game.id(),
            %difficulty,
            duration_secs = self.time_remaining.as_secs(),
            "session started"
        );
    }

    /// Move logical time forward by `dt`, firing every timer that comes due.
    ///
    /// Once a timer ends the session, the rest of the window is discarded.
    pub fn advance(&mut self, dt: Duration) {
        if self.status != SessionStatus::Running {
            return;
        }
        let until = self.now + dt;
        while let Some(fired) = self.timers.pop_due(until) {
            self.now = fired.at;
            self.fire(fired.kind);
            if self.status != SessionStatus::Running {
                return;
            }
        }
        self.now = until;
    }

    fn fire(&mut self, kind: TimerKind) {
        match kind {
            TimerKind::Clock => {
                let mut ctx = round_ctx!(self);
                let resolution = self.game.on_second(&mut ctx);
                self.apply(resolution);
                if self.status != SessionStatus::Running {
                    return;
                }
                self.time_remaining = self.time_remaining.saturating_sub(CLOCK_TICK);
                if self.time_remaining.is_zero() {
                    self.finish(EndReason::Timeout);
                }
            }
            TimerKind::Spawn => {
                let mut ctx = round_ctx!(self);
                self.game.spawn(&mut ctx);
            }
            TimerKind::Sweep => {
                let swept = self.entities.sweep_expired(self.now);
                if swept > 0 {
                    tracing::trace!(swept, "expired entities removed");
                }
            }
            TimerKind::Game(tag) => {
                let mut ctx = round_ctx!(self);
                let resolution = self.game.on_timer(tag, &mut ctx);
                self.apply(resolution);
            }
        }
    }

    /// Apply a player action. Returns `None` when the session is not running.
    pub fn act(&mut self, action: G::Action) -> Option<Outcome> {
        if self.status != SessionStatus::Running {
            tracing::debug!(game = %self.game.id(), ?action, "action ignored while {}", self.status);
            return None;
        }
        let mut ctx = round_ctx!(self);
        let resolution = self.game.resolve(action, &mut ctx);
        let outcome = resolution.outcome;
        self.apply(resolution);
        Some(outcome)
    }

    fn apply(&mut self, resolution: Resolution) {
        self.score.apply(&resolution.outcome);
        for notice in resolution.notices {
            self.notifier.notify(notice);
        }
        if let Some(reason) = resolution.end {
            self.finish(reason);
        }
    }

    fn finish(&mut self, reason: EndReason) {
        if self.status != SessionStatus::Running {
            return;
        }
        self.status = SessionStatus::Ended;
        self.end_reason = Some(reason);
        self.timers.cancel_all();

        let result = GameResult {
            game: self.game.id(),
            score: self.score.value(),
            difficulty: self.difficulty,
            reason,
            elapsed: self.now,
            finished_at: Local::now(),
        };
        tracing::info!(
            game = %result.game,
            score = result.score,
            %reason,
            elapsed_ms = self.now.as_millis() as u64,
            "session ended"
        );
        self.recorder.record_game_result(&result);
        self.last_result = Some(result);
    }

    /// Forced teardown (screen left): cancel every timer without recording
    /// a result. Safe to call repeatedly.
    pub fn teardown(&mut self) {
        self.timers.cancel_all();
        if self.status == SessionStatus::Running {
            self.status = SessionStatus::Ended;
            self.end_reason = Some(EndReason::Abandoned);
            tracing::debug!(game = %self.game.id(), "session abandoned");
        }
    }
}

impl<G: Game> Drop for Session<G> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityId, Position};
    use crate::game::{GameId, GameRules};
    use crate::spawner::{FixedSequence, SpawnSchedule};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Stub {
        spawns: usize,
        seconds: usize,
    }

    #[derive(Debug)]
    enum StubAction {
        Hit(EntityId),
        Miss,
        Finish,
    }

    impl Game for Stub {
        type Kind = ();
        type Action = StubAction;

        fn id(&self) -> GameId {
            GameId::QuickReact
        }

        fn rules(&self, difficulty: Difficulty) -> GameRules {
            GameRules {
                duration: Duration::from_secs(difficulty.select(3, 4, 5)),
                spawn: Some(SpawnSchedule {
                    interval: Duration::from_millis(500),
                    lifetime: Some(Duration::from_millis(1000)),
                }),
                sweep_interval: Some(Duration::from_millis(100)),
                repeating: vec![],
            }
        }

        fn setup(&mut self, _difficulty: Difficulty, _ctx: &mut RoundContext<'_, ()>) {
            self.spawns = 0;
            self.seconds = 0;
        }

        fn spawn(&mut self, ctx: &mut RoundContext<'_, ()>) {
            self.spawns += 1;
            let entity = ctx.spawner.spawn((), Position::Slot(self.spawns), ctx.now);
            ctx.entities.insert(entity);
        }

        fn on_second(&mut self, _ctx: &mut RoundContext<'_, ()>) -> Resolution {
            self.seconds += 1;
            Resolution::neutral()
        }

        fn resolve(&mut self, action: StubAction, ctx: &mut RoundContext<'_, ()>) -> Resolution {
            match action {
                StubAction::Hit(id) => {
                    if ctx.entities.active(id, ctx.now).is_none() {
                        return Resolution::already_resolved();
                    }
                    ctx.entities.resolve(id);
                    Resolution::reward(5)
                }
                StubAction::Miss => Resolution::penalty(3),
                StubAction::Finish => Resolution::neutral().ending(EndReason::Complete),
            }
        }
    }

    fn session() -> (Session<Stub>, Rc<RefCell<Vec<GameResult>>>) {
        let results = Rc::new(RefCell::new(vec![]));
        let sink = results.clone();
        let session = Session::new(Stub::default())
            .with_rng(FixedSequence::constant(0.5))
            .with_recorder(move |r: &GameResult| sink.borrow_mut().push(r.clone()));
        (session, results)
    }

    #[test]
    fn start_resets_score_and_clock() {
        let (mut s, _) = session();
        assert_eq!(s.status(), SessionStatus::Idle);
        assert!(s.start(Difficulty::Medium));
        assert_eq!(s.status(), SessionStatus::Running);
        assert_eq!(s.score(), 0);
        assert_eq!(s.time_remaining(), Duration::from_secs(4));
        assert!(!s.start(Difficulty::Easy), "second start must be ignored");
    }

    #[test]
    fn timeout_ends_once_and_records_once() {
        let (mut s, results) = session();
        s.start(Difficulty::Easy);
        s.act(StubAction::Hit(EntityId(999)));
        s.advance(Duration::from_millis(600));
        let first = s.entities().iter().next().map(|e| e.id).unwrap();
        s.act(StubAction::Hit(first));
        assert_eq!(s.score(), 5);

        s.advance(Duration::from_secs(10));
        assert_eq!(s.status(), SessionStatus::Ended);
        assert_eq!(s.end_reason(), Some(EndReason::Timeout));
        assert_eq!(s.time_remaining(), Duration::ZERO);
        assert_eq!(s.elapsed(), Duration::from_secs(3));

        s.advance(Duration::from_secs(10));
        let results = results.borrow();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].score, 5);
        assert_eq!(results[0].reason, EndReason::Timeout);
    }

    #[test]
    fn tick_reaching_zero_suppresses_same_instant_spawn() {
        let (mut s, _) = session();
        s.start(Difficulty::Easy);
        s.advance(Duration::from_secs(3));
        // spawns at 500..=2500; the one due at 3000 comes after the final tick
        assert_eq!(s.game().spawns, 5);
        assert_eq!(s.game().seconds, 3);
        assert_eq!(s.active_timers(), 0);
    }

    #[test]
    fn actions_ignored_when_not_running() {
        let (mut s, results) = session();
        assert_eq!(s.act(StubAction::Miss), None);
        s.start(Difficulty::Easy);
        s.act(StubAction::Finish);
        assert_eq!(s.status(), SessionStatus::Ended);
        assert_eq!(s.act(StubAction::Finish), None);
        assert_eq!(results.borrow().len(), 1);
    }

    #[test]
    fn penalties_never_go_negative() {
        let (mut s, _) = session();
        s.start(Difficulty::Easy);
        for _ in 0..5 {
            assert_eq!(s.act(StubAction::Miss), Some(Outcome::Penalty(3)));
            assert_eq!(s.score(), 0);
        }
    }

    #[test]
    fn resolved_entity_is_not_scored_twice() {
        let (mut s, _) = session();
        s.start(Difficulty::Easy);
        s.advance(Duration::from_millis(500));
        let id = s.entities().iter().next().map(|e| e.id).unwrap();
        assert_eq!(s.act(StubAction::Hit(id)), Some(Outcome::Reward(5)));
        assert_eq!(s.act(StubAction::Hit(id)), Some(Outcome::AlreadyResolved));
        assert_eq!(s.score(), 5);
    }

    #[test]
    fn complete_ends_early() {
        let (mut s, results) = session();
        s.start(Difficulty::Hard);
        s.advance(Duration::from_secs(1));
        s.act(StubAction::Finish);
        assert_eq!(s.end_reason(), Some(EndReason::Complete));
        assert_eq!(s.time_remaining(), Duration::from_secs(4));
        assert_eq!(results.borrow()[0].reason, EndReason::Complete);
    }

    #[test]
    fn expired_entities_are_swept() {
        let (mut s, _) = session();
        s.start(Difficulty::Easy);
        s.advance(Duration::from_millis(500));
        assert_eq!(s.entities().len(), 1);
        s.advance(Duration::from_millis(1000));
        // spawned at 500 (gone at 1500), 1000 and 1500 remain
        assert_eq!(s.entities().len(), 2);
    }

    #[test]
    fn teardown_cancels_without_recording() {
        let (mut s, results) = session();
        s.start(Difficulty::Easy);
        s.teardown();
        s.teardown();
        assert_eq!(s.status(), SessionStatus::Ended);
        assert_eq!(s.end_reason(), Some(EndReason::Abandoned));
        assert_eq!(s.active_timers(), 0);
        s.advance(Duration::from_secs(10));
        assert!(results.borrow().is_empty());
    }

    #[test]
    fn play_again_and_reset() {
        let (mut s, results) = session();
        assert!(!s.play_again(Difficulty::Easy));
        s.start(Difficulty::Easy);
        s.advance(Duration::from_millis(500));
        let old_id = s.entities().iter().next().map(|e| e.id).unwrap();
        s.act(StubAction::Hit(old_id));
        s.advance(Duration::from_secs(3));
        assert_eq!(s.status(), SessionStatus::Ended);

        assert!(s.play_again(Difficulty::Hard));
        assert_eq!(s.score(), 0);
        assert_eq!(s.time_remaining(), Duration::from_secs(5));
        assert!(s.entities().is_empty());
        s.advance(Duration::from_millis(500));
        let new_id = s.entities().iter().next().map(|e| e.id).unwrap();
        assert_ne!(old_id, new_id);

        s.advance(Duration::from_secs(5));
        assert!(s.reset());
        assert_eq!(s.status(), SessionStatus::Idle);
        assert_eq!(results.borrow().len(), 2);
    }
}
