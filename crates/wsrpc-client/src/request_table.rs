//! Correlation table for in-flight requests.
//!
//! Ids are slot indices into a growable vector. Allocation reuses the lowest
//! free slot, so ids stay small and dense. A slot is occupied from allocation
//! until its completion is taken, which happens exactly once: by a matching
//! response, by a send failure, or by a transport-wide [`RequestTable::fail_all`].
//!
//! Every allocation also gets a [`Lease`] carrying a table-unique ticket. Once
//! an id has been freed and handed out again, the old lease no longer matches.
//!
//! Completions always run with the table lock released.

use parking_lot::Mutex;
use tracing::warn;
use wsrpc_core::{ClientError, CorrelationId};

use crate::completion::{Completion, Outcome, deliver};

struct Pending {
    ticket: u64,
    completion: Box<dyn Completion>,
}

#[derive(Default)]
struct Slots {
    entries: Vec<Option<Pending>>,
    next_ticket: u64,
}

/// Proof of one allocation: its id and the ticket that owns the slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Lease {
    /// Correlation id written on the wire.
    pub id: CorrelationId,
    ticket: u64,
}

/// Slots of pending completions indexed by correlation id.
#[derive(Default)]
pub struct RequestTable {
    slots: Mutex<Slots>,
}

impl RequestTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a completion and return its id.
    pub fn allocate(&self, completion: Box<dyn Completion>) -> CorrelationId {
        self.lease(completion).id
    }

    /// Store a completion and return the lease that owns its slot.
    pub fn lease(&self, completion: Box<dyn Completion>) -> Lease {
        let mut slots = self.slots.lock();
        let ticket = slots.next_ticket;
        slots.next_ticket += 1;
        let pending = Some(Pending { ticket, completion });

        let index = match slots.entries.iter().position(Option::is_none) {
            Some(index) => {
                slots.entries[index] = pending;
                index
            }
            None => {
                slots.entries.push(pending);
                slots.entries.len() - 1
            }
        };
        Lease {
            id: CorrelationId::from_slot(index),
            ticket,
        }
    }

    /// Remove and return the completion for `id`, freeing its slot.
    pub fn take(&self, id: CorrelationId) -> Option<Box<dyn Completion>> {
        self.take_where(id, |_| true)
    }

    /// Like [`RequestTable::take`], but only while `lease` still owns the slot.
    pub fn reclaim(&self, lease: Lease) -> Option<Box<dyn Completion>> {
        self.take_where(lease.id, |pending| pending.ticket == lease.ticket)
    }

    fn take_where(
        &self,
        id: CorrelationId,
        owned: impl FnOnce(&Pending) -> bool,
    ) -> Option<Box<dyn Completion>> {
        let mut slots = self.slots.lock();
        let slot = id.slot().and_then(|index| slots.entries.get_mut(index))?;
        if !slot.as_ref().is_some_and(owned) {
            return None;
        }
        slot.take().map(|pending| pending.completion)
    }

    /// Resolve the request `id` with `outcome`.
    ///
    /// Returns `false` when no request is pending under `id`; the outcome is dropped.
    pub fn resolve(&self, id: CorrelationId, outcome: Outcome) -> bool {
        match self.take(id) {
            Some(completion) => {
                deliver(completion, outcome);
                true
            }
            None => {
                warn!(%id, "response for unknown correlation id, dropping");
                false
            }
        }
    }

    /// Fail every pending request with `error` and clear the table.
    ///
    /// Returns how many requests were failed.
    pub fn fail_all(&self, error: &ClientError) -> usize {
        let drained: Vec<Box<dyn Completion>> = {
            let mut slots = self.slots.lock();
            slots
                .entries
                .drain(..)
                .flatten()
                .map(|pending| pending.completion)
                .collect()
        };
        let count = drained.len();
        for completion in drained {
            deliver(completion, Err(error.clone()));
        }
        count
    }

    /// Number of requests currently awaiting a response.
    pub fn in_flight(&self) -> usize {
        self.slots
            .lock()
            .entries
            .iter()
            .filter(|slot| slot.is_some())
            .count()
    }

    /// Number of slots, occupied or free.
    pub fn capacity(&self) -> usize {
        self.slots.lock().entries.len()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use std::sync::Arc;

    type Log = Arc<parking_lot::Mutex<Vec<(usize, Outcome)>>>;

    fn tagged(tag: usize, log: &Log) -> Box<dyn Completion> {
        let log = Arc::clone(log);
        Box::new(move |outcome: Outcome| {
            log.lock().push((tag, outcome));
            Ok(())
        })
    }

    fn noop() -> Box<dyn Completion> {
        Box::new(|_: Outcome| Ok(()))
    }

    #[test]
    fn allocates_sequentially_from_zero() {
        let table = RequestTable::new();
        let ids: Vec<u64> = (0..3).map(|_| table.allocate(noop()).get()).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn reuses_lowest_free_slot() {
        let table = RequestTable::new();
        for _ in 0..4 {
            let _ = table.allocate(noop());
        }
        assert!(table.resolve(CorrelationId::new(2), Ok(Value::Null)));
        assert!(table.resolve(CorrelationId::new(0), Ok(Value::Null)));

        assert_eq!(table.allocate(noop()).get(), 0);
        assert_eq!(table.allocate(noop()).get(), 2);
        assert_eq!(table.allocate(noop()).get(), 4);
    }

    #[test]
    fn out_of_order_responses_reach_their_own_completion() {
        let log = Log::default();
        let table = RequestTable::new();
        let a = table.allocate(tagged(0, &log));
        let b = table.allocate(tagged(1, &log));
        let c = table.allocate(tagged(2, &log));

        assert!(table.resolve(b, Ok(json!("B"))));
        assert!(table.resolve(a, Ok(json!("A"))));
        assert!(table.resolve(c, Ok(json!("C"))));

        assert_eq!(
            *log.lock(),
            vec![(1, Ok(json!("B"))), (0, Ok(json!("A"))), (2, Ok(json!("C")))]
        );
    }

    #[test]
    fn second_response_for_same_id_is_ignored() {
        let log = Log::default();
        let table = RequestTable::new();
        let id = table.allocate(tagged(7, &log));
        assert!(table.resolve(id, Ok(json!(1))));
        assert!(!table.resolve(id, Ok(json!(2))));
        assert_eq!(log.lock().len(), 1);
    }

    #[test]
    fn unknown_id_is_dropped() {
        let table = RequestTable::new();
        assert!(!table.resolve(CorrelationId::new(99), Ok(Value::Null)));
        assert_eq!(table.in_flight(), 0);
    }

    #[test]
    fn fail_all_reaches_every_pending_request_once() {
        let log = Log::default();
        let table = RequestTable::new();
        for tag in 0..3 {
            let _ = table.allocate(tagged(tag, &log));
        }
        assert!(table.resolve(CorrelationId::new(1), Ok(Value::Null)));

        let failed = table.fail_all(&ClientError::transport("reset"));
        assert_eq!(failed, 2);
        assert_eq!(table.in_flight(), 0);
        assert_eq!(table.capacity(), 0);

        let log = log.lock();
        assert_eq!(log.len(), 3);
        assert!(
            log[1..]
                .iter()
                .all(|(_, o)| *o == Err(ClientError::transport("reset")))
        );
    }

    #[test]
    fn stale_lease_cannot_reclaim_a_reused_slot() {
        let log = Log::default();
        let table = RequestTable::new();
        let stale = table.lease(tagged(0, &log));
        assert_eq!(table.fail_all(&ClientError::transport("reset")), 1);

        let current = table.lease(tagged(1, &log));
        assert_eq!(current.id, stale.id);
        assert!(table.reclaim(stale).is_none());
        assert_eq!(table.in_flight(), 1);

        assert!(table.reclaim(current).is_some());
        assert_eq!(table.in_flight(), 0);
    }

    #[test]
    fn completion_may_reenter_the_table() {
        let table = Arc::new(RequestTable::new());
        let inner = Arc::clone(&table);
        let id = table.allocate(Box::new(move |_: Outcome| {
            let _ = inner.allocate(Box::new(|_: Outcome| Ok(())));
            Ok(())
        }));
        assert!(table.resolve(id, Ok(Value::Null)));
        assert_eq!(table.in_flight(), 1);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn occupied_ids_are_unique_and_reuse_is_dense(
                ops in proptest::collection::vec(any::<Option<u8>>(), 1..64)
            ) {
                let table = RequestTable::new();
                let mut live: Vec<CorrelationId> = Vec::new();

                for op in ops {
                    match op {
                        // Some(n): resolve the n-th live request, if any.
                        Some(n) if !live.is_empty() => {
                            let id = live.remove(usize::from(n) % live.len());
                            prop_assert!(table.resolve(id, Ok(Value::Null)));
                        }
                        _ => {
                            let id = table.allocate(noop());
                            prop_assert!(!live.contains(&id));
                            // The new id is the lowest one not currently live.
                            let lowest_free = (0..)
                                .find(|n| !live.iter().any(|l| l.get() == *n))
                                .unwrap();
                            prop_assert_eq!(id.get(), lowest_free);
                            live.push(id);
                        }
                    }
                    prop_assert_eq!(table.in_flight(), live.len());
                }
            }
        }
    }
}
