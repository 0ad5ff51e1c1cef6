use crate::notify::Notice;

/// Reward and penalty attached to one kind of entity
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Points {
    pub reward: u32,
    pub penalty: u32,
}

impl Points {
    pub const fn new(reward: u32, penalty: u32) -> Self {
        Self { reward, penalty }
    }
}

/// Static scoring table of a game: entity kind to points
pub trait ScoringRule {
    fn points(&self) -> Points;
}

/// Session score; never negative
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Score(u32);

impl Score {
    pub fn value(self) -> u32 {
        self.0
    }

    pub fn reward(&mut self, points: u32) {
        self.0 = self.0.saturating_add(points);
    }

    /// Subtract, clamping at zero
    pub fn penalize(&mut self, points: u32) {
        self.0 = self.0.saturating_sub(points);
    }

    pub fn apply(&mut self, outcome: &Outcome) {
        match *outcome {
            Outcome::Reward(p) => self.reward(p),
            Outcome::Penalty(p) | Outcome::Whiff(p) => self.penalize(p),
            Outcome::AlreadyResolved | Outcome::Neutral => {}
        }
    }
}

/// Why a session ended
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, strum_macros::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EndReason {
    /// The countdown reached zero
    Timeout,
    /// Every required entity was resolved in time
    Complete,
    /// Torn down before finishing; no result is recorded
    Abandoned,
}

/// Scoring effect of one player action or game event
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Reward(u32),
    /// Wrong category on a real entity
    Penalty(u32),
    /// Nothing under the pointer
    Whiff(u32),
    AlreadyResolved,
    Neutral,
}

/// Everything a resolver decided about one action
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub outcome: Outcome,
    pub notices: Vec<Notice>,
    pub end: Option<EndReason>,
}

impl Resolution {
    pub fn neutral() -> Self {
        Self::of(Outcome::Neutral)
    }

    pub fn reward(points: u32) -> Self {
        Self::of(Outcome::Reward(points))
    }

    pub fn penalty(points: u32) -> Self {
        Self::of(Outcome::Penalty(points))
    }

    pub fn whiff(points: u32) -> Self {
        Self::of(Outcome::Whiff(points))
    }

    pub fn already_resolved() -> Self {
        Self::of(Outcome::AlreadyResolved)
    }

    fn of(outcome: Outcome) -> Self {
        Self {
            outcome,
            notices: Vec::new(),
            end: None,
        }
    }

    pub fn with_notice(mut self, notice: Notice) -> Self {
        self.notices.push(notice);
        self
    }

    pub fn ending(mut self, reason: EndReason) -> Self {
        self.end = Some(reason);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn penalties_clamp_at_zero() {
        let mut score = Score::default();
        score.reward(4);
        score.penalize(3);
        assert_eq!(score.value(), 1);
        score.penalize(10);
        assert_eq!(score.value(), 0);
        score.penalize(u32::MAX);
        assert_eq!(score.value(), 0);
    }

    #[test]
    fn any_penalty_sequence_stays_non_negative() {
        let mut score = Score::default();
        for (i, p) in [3u32, 5, 2, 10, 7, 1].iter().enumerate() {
            if i % 2 == 0 {
                score.apply(&Outcome::Penalty(*p));
            } else {
                score.apply(&Outcome::Whiff(*p));
            }
            assert_eq!(score.value(), 0);
        }
    }

    #[test]
    fn apply_outcomes() {
        let mut score = Score::default();
        score.apply(&Outcome::Reward(10));
        score.apply(&Outcome::AlreadyResolved);
        score.apply(&Outcome::Neutral);
        assert_eq!(score.value(), 10);
        score.apply(&Outcome::Whiff(2));
        assert_eq!(score.value(), 8);
    }

    #[test]
    fn resolution_builder() {
        let r = Resolution::reward(5)
            .with_notice(Notice::success("+5 XP", Duration::from_millis(500)))
            .ending(EndReason::Complete);
        assert_eq!(r.outcome, Outcome::Reward(5));
        assert_eq!(r.notices.len(), 1);
        assert_eq!(r.end, Some(EndReason::Complete));
    }
}
