//! The four mini-game rule sets.

pub mod code_review;
pub mod focus_flow;
pub mod memory_match;
pub mod quick_react;

pub use code_review::{CodeReviewAction, CodeReviewRace};
pub use focus_flow::{FocusFlow, FocusFlowAction};
pub use memory_match::{MemoryMatch, MemoryMatchAction};
pub use quick_react::{QuickReact, QuickReactAction};
