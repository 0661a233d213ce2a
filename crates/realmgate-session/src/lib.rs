//! Per-connection session management for Realmgate.
//!
//! Every live connection has exactly one [`Session`]. The
//! [`SessionStateMachine`] owns all of them, decides which events are
//! legal in which state, and parks reconnecting sessions in a token
//! rendezvous until someone vouches for them.
//!
//! # How it fits in the stack
//!
//! ```text
//! Account handler (above)  ← decodes requests, talks to storage, replies
//!     ↕
//! Session layer (this crate)  ← who is logged in, who is waiting on a token
//!     ↕
//! Rendezvous (below)  ← matches tokens to payloads, evicts stale entries
//! ```

mod error;
mod events;
mod machine;
mod session;

pub use error::SessionError;
pub use events::HandoffEvents;
pub use machine::{LogoutOutcome, ReconnectOutcome, SessionStateMachine};
pub use session::{Session, SessionState, SessionStatus};
