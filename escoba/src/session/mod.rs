//! Match session: lifecycle, polling and turn-gating for one local player.
//!
//! This module implements:
//! - MatchSession: pure state machine over `Idle -> Creating/Joining ->
//!   Polling -> Finished -> Left`
//! - SessionActor: async actor serialising player commands, poll ticks and
//!   fetch results onto one task
//! - PollScheduler: cancellable fixed-period timer
//! - Notifier: wording and severity of the notices shown to the player
//!
//! ## Architecture
//!
//! The actor owns the [`MatchSession`], the [`PollScheduler`] and an
//! `Arc<dyn MatchTransport>`. Create, join and play are awaited inline;
//! scheduled polls run as spawned fetches whose results come back through
//! the actor's own inbox, tagged with the epoch and sequence number they
//! were started under.
//!
//! ## Example
//!
//! ```ignore
//! use escoba::session::{SessionActor, SessionConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let transport = Arc::new(ApiClient::new(config)?);
//!     let (actor, handle, mut updates) =
//!         SessionActor::new("alice".into(), transport, SessionConfig::default());
//!     tokio::spawn(actor.run());
//!
//!     let match_id = handle.create("bob").await?;
//!     while let Some(update) = updates.recv().await {
//!         // render
//!     }
//! }
//! ```

pub mod actor;
pub mod config;
pub mod errors;
pub mod messages;
pub mod notifier;
pub mod scheduler;
pub mod state;

pub use actor::{SessionActor, SessionHandle};
pub use config::{BOT_OPPONENT, DEFAULT_POLL_INTERVAL, MIN_POLL_INTERVAL, SessionConfig};
pub use errors::{LocalRejection, SessionError, SessionResult};
pub use messages::{SessionMessage, SessionStatus, SessionUpdate};
pub use notifier::{Notice, NoticeKind, Severity, describe};
pub use scheduler::PollScheduler;
pub use state::{Applied, Epoch, FetchSeq, MatchSession, SessionPhase};
