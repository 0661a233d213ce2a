//! Token rendezvous for cross-server handoffs.
//!
//! Two parties learn about the same token at different times:
//!
//! - a **claimant**: a live connection that presented a token and is
//!   waiting to be told who it is;
//! - an **expected payload**: an announcement that "whoever shows up with
//!   this token is identity Y".
//!
//! Either may arrive first. [`TokenRendezvous`] stores whichever side came
//! first and, when the other side shows up, removes the entry and hands
//! both halves to a [`RendezvousHandler`] in the same call. A token matches
//! at most once. Entries nobody completes are evicted by
//! [`TokenRendezvous::sweep`] after the configured timeout.
//!
//! ```text
//!  register_claimant(t, c) ──┐                 ┌── register_payload(t, p)
//!                            ▼                 ▼
//!                     ┌──────────────────────────────┐
//!                     │  token → Claimant | Payload  │
//!                     └──────────────────────────────┘
//!                        │            │            │
//!                  matched(c,p)  cancel_claimant  sweep(now)
//!                                                  │
//!                          claimant_timed_out / payload_timed_out
//! ```

mod config;
mod table;
mod token;

pub use config::RendezvousConfig;
pub use table::{Registration, RendezvousHandler, Side, TokenRendezvous};
pub use token::{generate_token, redact, TOKEN_LENGTH};
