use std::time::Duration;

use crate::content::{languages_for, level_for, BugType, CodeSnippet, ContentError, SnippetSource};
use crate::difficulty::Difficulty;
use crate::entity::Position;
use crate::game::{Game, GameId, GameRules, RoundContext};
use crate::notify::{Notice, Notifier};
use crate::resolver::{EndReason, Resolution, ScoringRule};
use crate::session::Session;
use crate::spawner::RandomSource;

pub const WHIFF_PENALTY: u32 = 2;
pub const HINT_COST: u32 = 3;
pub const STRUGGLE_AFTER: Duration = Duration::from_secs(30);

const STRUGGLE_NUDGE: u32 = 1;
const NOTICE_DURATION: Duration = Duration::from_millis(2000);

#[derive(Debug)]
pub enum CodeReviewAction {
    /// Bug type the next line click will be classified as
    SelectBugType(BugType),
    ClickLine(u32),
    RequestHint,
}

/// Find and classify the bugs planted in a generated snippet.
#[derive(Debug, Clone)]
pub struct CodeReviewRace {
    snippet: CodeSnippet,
    selected: BugType,
    hint_used: bool,
}

impl CodeReviewRace {
    pub fn new(snippet: CodeSnippet) -> Self {
        Self {
            snippet,
            selected: BugType::Syntax,
            hint_used: false,
        }
    }

    pub fn snippet(&self) -> &CodeSnippet {
        &self.snippet
    }

    /// Swap in freshly loaded content; takes effect at the next start
    pub fn replace_snippet(&mut self, snippet: CodeSnippet) {
        self.snippet = snippet;
    }

    pub fn selected(&self) -> BugType {
        self.selected
    }

    pub fn hint_used(&self) -> bool {
        self.hint_used
    }

    fn click_line(&mut self, line: u32, ctx: &mut RoundContext<'_, BugType>) -> Resolution {
        let Some((id, actual)) = ctx
            .entities
            .find_at(Position::Line(line))
            .map(|e| (e.id, e.kind))
        else {
            return Resolution::whiff(WHIFF_PENALTY)
                .with_notice(Notice::error("No bug here!", NOTICE_DURATION));
        };

        if ctx.entities.is_resolved(id) {
            return Resolution::already_resolved()
                .with_notice(Notice::info("Bug already found!", NOTICE_DURATION));
        }

        let points = actual.points();
        if actual != self.selected {
            return Resolution::penalty(points.penalty).with_notice(Notice::error(
                format!("-{} XP - Wrong identification!", points.penalty),
                NOTICE_DURATION,
            ));
        }

        ctx.entities.resolve(id);
        let found = Resolution::reward(points.reward).with_notice(Notice::success(
            format!("+{} XP - {actual} bug found!", points.reward),
            NOTICE_DURATION,
        ));
        if ctx.entities.all_resolved() {
            found.ending(EndReason::Complete)
        } else {
            found
        }
    }

    fn hint(&mut self, ctx: &mut RoundContext<'_, BugType>) -> Resolution {
        // bugs are placed in snippet order
        let first_unfound = ctx.entities.unresolved().find_map(|e| match e.position {
            Position::Line(line) => Some(line),
            _ => None,
        });
        let Some(line) = first_unfound else {
            return Resolution::neutral();
        };
        self.hint_used = true;
        Resolution::penalty(HINT_COST).with_notice(Notice::info(
            format!("Hint: Check line {line}"),
            Duration::from_millis(3000),
        ))
    }
}

impl Game for CodeReviewRace {
    type Kind = BugType;
    type Action = CodeReviewAction;

    fn id(&self) -> GameId {
        GameId::CodeReviewRace
    }

    fn rules(&self, difficulty: Difficulty) -> GameRules {
        GameRules::timed(Duration::from_secs(difficulty.select(90, 60, 45)))
    }

    fn setup(&mut self, _difficulty: Difficulty, ctx: &mut RoundContext<'_, BugType>) {
        self.selected = BugType::Syntax;
        self.hint_used = false;
        for bug in &self.snippet.bug_locations {
            if ctx.entities.find_at(Position::Line(bug.line)).is_some() {
                continue;
            }
            let entity = ctx
                .spawner
                .place(bug.bug_type, Position::Line(bug.line), ctx.now);
            ctx.entities.insert(entity);
        }
        ctx.schedule_once(STRUGGLE_NUDGE, STRUGGLE_AFTER);
    }

    fn on_timer(&mut self, tag: u32, ctx: &mut RoundContext<'_, BugType>) -> Resolution {
        if tag == STRUGGLE_NUDGE && ctx.entities.resolved_count() == 0 && !self.hint_used {
            return Resolution::neutral().with_notice(Notice::info(
                "Struggling? Try using a hint!",
                Duration::from_millis(3000),
            ));
        }
        Resolution::neutral()
    }

    fn resolve(
        &mut self,
        action: CodeReviewAction,
        ctx: &mut RoundContext<'_, BugType>,
    ) -> Resolution {
        match action {
            CodeReviewAction::SelectBugType(bug_type) => {
                self.selected = bug_type;
                Resolution::neutral()
            }
            CodeReviewAction::ClickLine(line) => self.click_line(line, ctx),
            CodeReviewAction::RequestHint => self.hint(ctx),
        }
    }
}

impl Session<CodeReviewRace> {
    /// Install the snippet for the next play-through. Refused while a round
    /// is running.
    pub fn load_round(&mut self, snippet: CodeSnippet) -> bool {
        if self.is_running() {
            tracing::debug!(snippet = %snippet.id, "snippet swap ignored while running");
            return false;
        }
        self.game_mut().replace_snippet(snippet);
        true
    }
}

/// Ask `source` for a snippet matching `difficulty`.
///
/// Failures are logged and surfaced through `notifier`; the caller stays on
/// its loading state and nothing is retried.
pub async fn load_snippet<S: SnippetSource>(
    source: &S,
    difficulty: Difficulty,
    rng: &mut dyn RandomSource,
    notifier: &mut dyn Notifier,
) -> Result<CodeSnippet, ContentError> {
    let level = level_for(difficulty);
    let languages = languages_for(level);
    let language = languages[rng.pick(languages.len())];
    tracing::debug!(level, language, "requesting code snippet");

    source.generate(level, language).await.map_err(|err| {
        tracing::warn!(%err, level, language, "failed to load code snippet");
        notifier.notify(Notice::error(
            "Failed to load code snippet",
            Duration::from_millis(3000),
        ));
        err
    })
}
