use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use assert_matches::assert_matches;
use cognitrain::content::{BugType, ContentError, FixedSnippetSource};
use cognitrain::games::code_review::load_snippet;
use cognitrain::games::{CodeReviewAction, CodeReviewRace};
use cognitrain::notify::{Notice, NoticeLevel};
use cognitrain::spawner::FixedSequence;
use cognitrain::{Difficulty, EndReason, Outcome, Session, SessionStatus};

const REPLY: &str = r#"```json
{
  "original_code": "def total(xs):\n    s = 0\n    for x in xs:\n        s += x\n    return s\n",
  "flawed_code": "def total(xs):\n    s = 1\n    for x in xs:\n        eval(x)\n    return s\n",
  "bug_locations": [
    {"line": 2, "type": "logic"},
    {"line": 4, "type": "security"}
  ]
}
```"#;

async fn race() -> CodeReviewRace {
    let source = FixedSnippetSource::new(REPLY);
    let mut rng = FixedSequence::constant(0.0);
    let mut notices = vec![];
    let snippet = load_snippet(&source, Difficulty::Easy, &mut rng, &mut |n: Notice| {
        notices.push(n)
    })
    .await
    .unwrap();
    assert!(notices.is_empty());
    assert_eq!(snippet.language, "python");
    assert_eq!(snippet.level, 1);
    CodeReviewRace::new(snippet)
}

fn session(game: CodeReviewRace) -> (Session<CodeReviewRace>, Rc<RefCell<Vec<Notice>>>) {
    let notices = Rc::new(RefCell::new(vec![]));
    let sink = notices.clone();
    let s = Session::new(game).with_notifier(move |n: Notice| sink.borrow_mut().push(n));
    (s, notices)
}

#[tokio::test]
async fn classify_every_bug_completes_the_round() {
    let (mut s, notices) = session(race().await);
    s.start(Difficulty::Easy);
    assert_eq!(s.time_remaining(), Duration::from_secs(90));

    s.act(CodeReviewAction::SelectBugType(BugType::Logic));
    assert_eq!(s.act(CodeReviewAction::ClickLine(2)), Some(Outcome::Reward(10)));
    assert_eq!(
        s.act(CodeReviewAction::ClickLine(2)),
        Some(Outcome::AlreadyResolved)
    );
    assert_eq!(s.act(CodeReviewAction::ClickLine(3)), Some(Outcome::Whiff(2)));
    assert_eq!(s.score(), 8);

    s.act(CodeReviewAction::SelectBugType(BugType::Security));
    assert_eq!(s.act(CodeReviewAction::ClickLine(4)), Some(Outcome::Reward(20)));
    assert_eq!(s.status(), SessionStatus::Ended);
    assert_eq!(s.end_reason(), Some(EndReason::Complete));
    assert_eq!(s.score(), 28);

    let messages: Vec<_> = notices.borrow().iter().map(|n| n.message.clone()).collect();
    assert_eq!(
        messages,
        vec![
            "+10 XP - logic bug found!",
            "Bug already found!",
            "No bug here!",
            "+20 XP - security bug found!",
        ]
    );
}

#[tokio::test]
async fn misclassification_uses_actual_bug_penalty() {
    let (mut s, _) = session(race().await);
    s.start(Difficulty::Medium);
    s.act(CodeReviewAction::SelectBugType(BugType::Logic));
    s.act(CodeReviewAction::ClickLine(2));
    assert_eq!(s.act(CodeReviewAction::ClickLine(4)), Some(Outcome::Penalty(10)));
    assert_eq!(s.score(), 0);
    assert!(s.is_running());
}

#[tokio::test]
async fn hint_costs_three_and_names_a_line() {
    let (mut s, notices) = session(race().await);
    s.start(Difficulty::Hard);
    s.act(CodeReviewAction::SelectBugType(BugType::Logic));
    s.act(CodeReviewAction::ClickLine(2));
    assert_eq!(s.act(CodeReviewAction::RequestHint), Some(Outcome::Penalty(3)));
    assert_eq!(s.score(), 7);
    let last = notices.borrow().last().cloned().unwrap();
    assert_eq!(last.message, "Hint: Check line 4");
    assert_eq!(last.level, NoticeLevel::Info);
}

#[tokio::test]
async fn struggling_player_is_nudged_once() {
    let (mut s, notices) = session(race().await);
    s.start(Difficulty::Easy);
    s.advance(Duration::from_secs(29));
    assert!(notices.borrow().is_empty());
    s.advance(Duration::from_secs(30));
    let messages: Vec<_> = notices.borrow().iter().map(|n| n.message.clone()).collect();
    assert_eq!(messages, vec!["Struggling? Try using a hint!"]);
}

#[tokio::test]
async fn time_runs_out_on_hard() {
    let (mut s, _) = session(race().await);
    s.start(Difficulty::Hard);
    s.advance(Duration::from_secs(45));
    assert_eq!(s.end_reason(), Some(EndReason::Timeout));
}

#[tokio::test]
async fn invalid_reply_fails_the_load_with_a_notice() {
    let source = FixedSnippetSource::new("Sorry, I can't help with that.");
    let mut rng = FixedSequence::constant(0.0);
    let mut notices = vec![];
    let result = load_snippet(&source, Difficulty::Medium, &mut rng, &mut |n: Notice| {
        notices.push(n)
    })
    .await;
    assert_matches!(result, Err(ContentError::InvalidResponse(_)));
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].message, "Failed to load code snippet");
    assert_eq!(notices[0].level, NoticeLevel::Error);
}

#[tokio::test]
async fn shared_line_counts_once_and_round_still_completes() {
    let reply = r#"{
      "original_code": "x = 1\ny = 2\n",
      "flawed_code": "x = 1\ny = eval(input())\n",
      "bug_locations": [
        {"line": 2, "type": "security"},
        {"line": 2, "type": "logic"}
      ]
    }"#;
    let source = FixedSnippetSource::new(reply);
    let mut rng = FixedSequence::constant(0.0);
    let snippet = load_snippet(&source, Difficulty::Easy, &mut rng, &mut |_: Notice| {})
        .await
        .unwrap();
    assert_eq!(snippet.bug_locations.len(), 1);

    let (mut s, _) = session(CodeReviewRace::new(snippet));
    s.start(Difficulty::Easy);
    s.act(CodeReviewAction::SelectBugType(BugType::Security));
    assert_eq!(s.act(CodeReviewAction::ClickLine(2)), Some(Outcome::Reward(20)));
    assert_eq!(s.end_reason(), Some(EndReason::Complete));
}

#[tokio::test]
async fn next_round_uses_freshly_loaded_snippet() {
    let (mut s, _) = session(race().await);
    s.start(Difficulty::Easy);

    let next = cognitrain::content::parse_snippet(
        r#"{"original_code":"a","flawed_code":"a","bug_locations":[{"line":1,"type":"syntax"}]}"#,
        1,
        "javascript",
    )
    .unwrap();
    assert!(!s.load_round(next.clone()), "no swap mid-round");
    assert_eq!(s.game().snippet().language, "python");

    s.teardown();
    assert!(s.load_round(next));
    assert!(s.play_again(Difficulty::Easy));
    assert_eq!(s.entities().len(), 1);
    assert_eq!(s.act(CodeReviewAction::ClickLine(1)), Some(Outcome::Reward(5)));
    assert_eq!(s.end_reason(), Some(EndReason::Complete));
}
