use floor_challenges::floor_layout::Snapshot;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Condvar, Mutex, MutexGuard, PoisonError,
    },
    time::Duration,
};
use thiserror::Error;

/// Upper bound on how long a waiting worker goes without re-checking its
/// cancel token.
pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Cooperative stop signal shared by every worker of a run.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExchangeError {
    #[error("exchange cancelled before a partner arrived")]
    Cancelled,
    #[error("no other worker is left to exchange with")]
    NoPartner,
}

struct Offer {
    ticket: u64,
    snapshot: Snapshot,
}

#[derive(Default)]
struct Slot {
    members: usize,
    next_ticket: u64,
    waiting: Option<Offer>,
    // counter-offers addressed to the ticket of a waiter that has not woken yet
    replies: HashMap<u64, Snapshot>,
}

/// Two-party meeting point shared by every worker of a run.
///
/// A caller either finds an offer already waiting, in which case both offers
/// are swapped on the spot, or parks its own offer and sleeps until a partner
/// takes it. Both sides of a swap happen under one lock, so no third caller can
/// observe or disturb a pairing, and every offer ends up with exactly one
/// recipient or back with its owner.
#[derive(Default)]
pub struct Exchange {
    slot: Mutex<Slot>,
    partner: Condvar,
}

impl Exchange {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers a new participant. The returned member leaves on drop.
    pub fn join(self: &Arc<Self>) -> ExchangeMember {
        self.lock().members += 1;
        ExchangeMember {
            exchange: Arc::clone(self),
        }
    }

    /// Number of members currently joined. Embedders can poll it to see how
    /// many workers are still able to trade floors.
    pub fn members(&self) -> usize {
        self.lock().members
    }

    /// Wakes every waiter so it re-checks cancellation right away.
    pub fn wake_all(&self) {
        let _slot = self.lock();
        self.partner.notify_all();
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        // nothing in a critical section can panic and leave the slot half-updated
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn exchange(
        &self,
        offer: Snapshot,
        cancel: &CancelToken,
    ) -> Result<Snapshot, ExchangeError> {
        let mut slot = self.lock();
        if cancel.is_cancelled() {
            return Err(ExchangeError::Cancelled);
        }
        if let Some(waiting) = slot.waiting.take() {
            slot.replies.insert(waiting.ticket, offer);
            self.partner.notify_all();
            return Ok(waiting.snapshot);
        }
        if slot.members < 2 {
            return Err(ExchangeError::NoPartner);
        }

        let ticket = slot.next_ticket;
        slot.next_ticket += 1;
        slot.waiting = Some(Offer {
            ticket,
            snapshot: offer,
        });
        loop {
            if let Some(reply) = slot.replies.remove(&ticket) {
                return Ok(reply);
            }
            let withdrawn = if cancel.is_cancelled() {
                Some(ExchangeError::Cancelled)
            } else if slot.members < 2 {
                Some(ExchangeError::NoPartner)
            } else {
                None
            };
            if let Some(err) = withdrawn {
                // no reply yet, so the parked offer is still ours
                if slot.waiting.as_ref().map(|o| o.ticket) == Some(ticket) {
                    slot.waiting = None;
                }
                return Err(err);
            }
            slot = match self.partner.wait_timeout(slot, POLL_INTERVAL) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }
}

/// One participant's handle on an `Exchange`.
pub struct ExchangeMember {
    exchange: Arc<Exchange>,
}

impl ExchangeMember {
    /// Blocks until another member exchanges, then returns that member's offer.
    ///
    /// On `Err` the offer was never delivered: it is withdrawn before the call
    /// returns.
    pub fn exchange(
        &self,
        offer: Snapshot,
        cancel: &CancelToken,
    ) -> Result<Snapshot, ExchangeError> {
        self.exchange.exchange(offer, cancel)
    }

    /// The exchange this member joined, for embedders that need to wake its
    /// waiters or count its members without keeping a separate handle.
    pub fn exchange_point(&self) -> &Arc<Exchange> {
        &self.exchange
    }
}

impl Drop for ExchangeMember {
    fn drop(&mut self) {
        let mut slot = self.exchange.lock();
        slot.members = slot.members.saturating_sub(1);
        self.exchange.partner.notify_all();
    }
}
