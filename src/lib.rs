// Timed mini-game session engine: games, scoring and the collaborators a
// front end plugs in (identity, result recording, generated content).
pub mod app_dirs;
pub mod auth;
pub mod config;
pub mod content;
pub mod difficulty;
pub mod entity;
pub mod game;
pub mod games;
pub mod notify;
pub mod record;
pub mod resolver;
pub mod runtime;
pub mod session;
pub mod spawner;
pub mod timers;

pub use difficulty::Difficulty;
pub use game::{catalog, Game, GameId};
pub use resolver::{EndReason, Outcome};
pub use session::{Session, SessionStatus};
