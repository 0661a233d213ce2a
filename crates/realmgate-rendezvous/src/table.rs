//! The rendezvous table.
//!
//! # Concurrency note
//!
//! Every operation takes `&mut self` and runs to completion, callbacks
//! included, before returning. A match is a read-remove-callback sequence;
//! as long as one owner holds the table (directly, or behind a single
//! mutex), no other registration can slip in between those steps.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::time::{Duration, Instant};

use crate::{redact, RendezvousConfig};

/// Receives the outcomes of a [`TokenRendezvous`].
///
/// Exactly one of these fires for every entry that leaves the table other
/// than through [`TokenRendezvous::cancel_claimant`] or a same-side
/// replacement.
pub trait RendezvousHandler<C, P> {
    /// Both halves of `token` arrived. The entry is already gone from the
    /// table when this runs.
    fn matched(&mut self, token: &str, claimant: C, payload: P);

    /// A claimant waited longer than the timeout.
    fn claimant_timed_out(&mut self, token: &str, claimant: C);

    /// An expected payload was never claimed.
    fn payload_timed_out(&mut self, token: &str, payload: P);
}

/// Which half of a rendezvous is waiting on a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Claimant,
    Payload,
}

/// What a registration did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// The other side was already waiting; the handler's `matched` ran.
    Matched,
    /// Nothing to match yet; the entry is now pending.
    Pending,
}

/// Registration time on the runtime clock, the clock sweeps are driven
/// by. Outside a runtime this is the system monotonic clock.
fn stamp() -> Instant {
    tokio::time::Instant::now().into_std()
}

#[derive(Debug)]
enum Pending<C, P> {
    Claimant(C),
    Payload(P),
}

#[derive(Debug)]
struct PendingEntry<C, P> {
    pending: Pending<C, P>,
    inserted_at: Instant,
}

/// Two-sided matching table keyed by opaque tokens.
///
/// `C` is the claimant handle (a connection id in practice) and `P` the
/// payload announced for a token.
///
/// ## Policies
///
/// - **One entry per token.** A second registration on the *same* side
///   replaces the first (last write wins). The replaced party is not
///   notified; a warning is logged instead.
/// - **One-shot.** After a match the token is forgotten. Presenting it
///   again is indistinguishable from presenting an unknown token.
/// - **One token per claimant.** A claimant that registers again under a
///   different token gives up its older entry.
#[derive(Debug)]
pub struct TokenRendezvous<C, P> {
    /// Pending entries, keyed by token.
    entries: HashMap<String, PendingEntry<C, P>>,

    /// Reverse index: which token each waiting claimant is parked on.
    /// Kept in sync with `entries` so cancellation doesn't scan.
    claimants: HashMap<C, String>,

    timeout: Duration,
}

impl<C, P> TokenRendezvous<C, P>
where
    C: Clone + Eq + Hash + fmt::Debug,
{
    pub fn new(config: RendezvousConfig) -> Self {
        Self {
            entries: HashMap::new(),
            claimants: HashMap::new(),
            timeout: config.timeout,
        }
    }

    /// Registers a claimant waiting on `token`.
    ///
    /// If a payload is already expected for `token`, the entry is removed
    /// and `handler.matched` runs before this returns.
    pub fn register_claimant<H>(
        &mut self,
        token: &str,
        claimant: C,
        handler: &mut H,
    ) -> Registration
    where
        H: RendezvousHandler<C, P>,
    {
        // A claimant only ever waits on one token.
        if let Some(previous) = self.claimants.get(&claimant) {
            if previous != token {
                let previous = previous.clone();
                tracing::debug!(
                    ?claimant,
                    token = redact(&previous),
                    "claimant moved to a new token, dropping its old entry"
                );
                self.entries.remove(&previous);
                self.claimants.remove(&claimant);
            }
        }

        match self.entries.remove(token) {
            Some(PendingEntry {
                pending: Pending::Payload(payload),
                ..
            }) => {
                tracing::debug!(?claimant, token = redact(token), "rendezvous matched");
                handler.matched(token, claimant, payload);
                return Registration::Matched;
            }
            Some(PendingEntry {
                pending: Pending::Claimant(replaced),
                ..
            }) => {
                if replaced != claimant {
                    tracing::warn!(
                        ?replaced,
                        ?claimant,
                        token = redact(token),
                        "second claimant for the same token replaces the first"
                    );
                }
                self.claimants.remove(&replaced);
            }
            None => {}
        }

        self.claimants.insert(claimant.clone(), token.to_owned());
        self.entries.insert(
            token.to_owned(),
            PendingEntry {
                pending: Pending::Claimant(claimant),
                inserted_at: stamp(),
            },
        );
        Registration::Pending
    }

    /// Announces that whoever claims `token` is `payload`.
    ///
    /// If a claimant is already waiting on `token`, the entry is removed
    /// and `handler.matched` runs before this returns.
    pub fn register_payload<H>(
        &mut self,
        token: &str,
        payload: P,
        handler: &mut H,
    ) -> Registration
    where
        H: RendezvousHandler<C, P>,
    {
        match self.entries.remove(token) {
            Some(PendingEntry {
                pending: Pending::Claimant(claimant),
                ..
            }) => {
                self.claimants.remove(&claimant);
                tracing::debug!(?claimant, token = redact(token), "rendezvous matched");
                handler.matched(token, claimant, payload);
                return Registration::Matched;
            }
            Some(PendingEntry {
                pending: Pending::Payload(_),
                ..
            }) => {
                tracing::warn!(
                    token = redact(token),
                    "second payload for the same token replaces the first"
                );
            }
            None => {}
        }

        self.entries.insert(
            token.to_owned(),
            PendingEntry {
                pending: Pending::Payload(payload),
                inserted_at: stamp(),
            },
        );
        Registration::Pending
    }

    /// Withdraws the waiting entry of `claimant`, if any. No callbacks run.
    ///
    /// Returns `true` if an entry was removed. Calling it for a claimant
    /// that isn't waiting is a no-op.
    pub fn cancel_claimant(&mut self, claimant: &C) -> bool {
        let Some(token) = self.claimants.remove(claimant) else {
            return false;
        };
        let owned = matches!(
            self.entries.get(&token),
            Some(PendingEntry { pending: Pending::Claimant(c), .. }) if c == claimant
        );
        if owned {
            self.entries.remove(&token);
            tracing::debug!(?claimant, token = redact(&token), "claimant cancelled");
        }
        owned
    }

    /// Evicts every entry older than the timeout, as of `now`.
    ///
    /// All evictions happen before any callback runs, and a sweep never
    /// produces a match. Returns the number of evicted entries.
    pub fn sweep<H>(&mut self, now: Instant, handler: &mut H) -> usize
    where
        H: RendezvousHandler<C, P>,
    {
        let timeout = self.timeout;
        let stale: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| {
                now.saturating_duration_since(entry.inserted_at) > timeout
            })
            .map(|(token, _)| token.clone())
            .collect();

        let mut evicted = Vec::with_capacity(stale.len());
        for token in stale {
            if let Some(entry) = self.entries.remove(&token) {
                if let Pending::Claimant(claimant) = &entry.pending {
                    self.claimants.remove(claimant);
                }
                evicted.push((token, entry.pending));
            }
        }

        let count = evicted.len();
        for (token, pending) in evicted {
            match pending {
                Pending::Claimant(claimant) => {
                    tracing::info!(?claimant, token = redact(&token), "claimant timed out");
                    handler.claimant_timed_out(&token, claimant);
                }
                Pending::Payload(payload) => {
                    tracing::debug!(token = redact(&token), "expected payload timed out");
                    handler.payload_timed_out(&token, payload);
                }
            }
        }
        count
    }

    /// Returns `true` if anything is pending on `token`.
    pub fn contains(&self, token: &str) -> bool {
        self.entries.contains_key(token)
    }

    /// Which side is waiting on `token`, if any.
    pub fn side(&self, token: &str) -> Option<Side> {
        self.entries.get(token).map(|entry| match entry.pending {
            Pending::Claimant(_) => Side::Claimant,
            Pending::Payload(_) => Side::Payload,
        })
    }

    /// The claimant waiting on `token`, if that side is pending.
    pub fn claimant(&self, token: &str) -> Option<&C> {
        match self.entries.get(token).map(|entry| &entry.pending) {
            Some(Pending::Claimant(claimant)) => Some(claimant),
            _ => None,
        }
    }

    /// The payload expected for `token`, if that side is pending.
    pub fn payload(&self, token: &str) -> Option<&P> {
        match self.entries.get(token).map(|entry| &entry.pending) {
            Some(Pending::Payload(payload)) => Some(payload),
            _ => None,
        }
    }

    /// The token `claimant` is waiting on, if any.
    pub fn claimant_token(&self, claimant: &C) -> Option<&str> {
        self.claimants.get(claimant).map(String::as_str)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Number of pending entries, both sides together.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<C, P> Default for TokenRendezvous<C, P>
where
    C: Clone + Eq + Hash + fmt::Debug,
{
    fn default() -> Self {
        Self::new(RendezvousConfig::default())
    }
}

// =========================================================================
// Tests
// =========================================================================
