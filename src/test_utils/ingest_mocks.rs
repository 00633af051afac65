//! In-memory mock of the transactional ingest store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::{
    app_error::AppResult,
    application::use_cases::ingest::{IngestStore, IngestTx, InsertOutcome},
    domain::entities::{
        history::{NewHistoryEntry, SubscriptionHistoryEntry},
        raw_event::RawEvent,
        subscription::CurrentSubscription,
    },
};

#[derive(Default)]
struct StoreInner {
    raw_events: HashMap<String, RawEvent>,
    subscriptions: HashMap<String, CurrentSubscription>,
    history: Vec<SubscriptionHistoryEntry>,
}

/// In-memory stand-in for the Postgres store. Writes are staged per
/// transaction and applied under one lock on commit, so a dropped
/// transaction leaves no trace. Matching the advisory lock on the real
/// store, `find_subscription_for_update` takes a per-subscription lock
/// that is held until the transaction ends, even when no row exists yet.
#[derive(Default, Clone)]
pub struct InMemoryIngestStore {
    inner: Arc<Mutex<StoreInner>>,
    row_locks: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
}

impl InMemoryIngestStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw_event_count(&self) -> usize {
        self.inner.lock().unwrap().raw_events.len()
    }

    pub fn subscription(&self, subscription_id: &str) -> Option<CurrentSubscription> {
        self.inner
            .lock()
            .unwrap()
            .subscriptions
            .get(subscription_id)
            .cloned()
    }

    pub fn history(&self) -> Vec<SubscriptionHistoryEntry> {
        self.inner.lock().unwrap().history.clone()
    }

    pub fn history_for(&self, subscription_id: &str) -> Vec<SubscriptionHistoryEntry> {
        self.inner
            .lock()
            .unwrap()
            .history
            .iter()
            .filter(|entry| entry.subscription_id == subscription_id)
            .cloned()
            .collect()
    }
}

enum StagedWrite {
    RawEvent(RawEvent),
    Subscription(CurrentSubscription),
    Touch {
        subscription_id: String,
        event_id: String,
        updated_at: NaiveDateTime,
    },
    History(NewHistoryEntry),
}

pub struct InMemoryIngestTx {
    inner: Arc<Mutex<StoreInner>>,
    row_locks: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
    held_locks: HashMap<String, tokio::sync::OwnedMutexGuard<()>>,
    staged: Vec<StagedWrite>,
}

#[async_trait]
impl IngestStore for InMemoryIngestStore {
    async fn begin(&self) -> AppResult<Box<dyn IngestTx>> {
        Ok(Box::new(InMemoryIngestTx {
            inner: self.inner.clone(),
            row_locks: self.row_locks.clone(),
            held_locks: HashMap::new(),
            staged: Vec::new(),
        }))
    }
}

#[async_trait]
impl IngestTx for InMemoryIngestTx {
    async fn find_raw_event(&mut self, event_id: &str) -> AppResult<Option<RawEvent>> {
        Ok(self.inner.lock().unwrap().raw_events.get(event_id).cloned())
    }

    async fn insert_raw_event(&mut self, event: &RawEvent) -> AppResult<InsertOutcome> {
        if self
            .inner
            .lock()
            .unwrap()
            .raw_events
            .contains_key(&event.event_id)
        {
            return Ok(InsertOutcome::Duplicate);
        }
        self.staged.push(StagedWrite::RawEvent(event.clone()));
        Ok(InsertOutcome::Inserted)
    }

    async fn find_subscription_for_update(
        &mut self,
        subscription_id: &str,
    ) -> AppResult<Option<CurrentSubscription>> {
        if !self.held_locks.contains_key(subscription_id) {
            let lock = self
                .row_locks
                .lock()
                .unwrap()
                .entry(subscription_id.to_string())
                .or_default()
                .clone();
            let guard = lock.lock_owned().await;
            self.held_locks.insert(subscription_id.to_string(), guard);
        }

        Ok(self
            .inner
            .lock()
            .unwrap()
            .subscriptions
            .get(subscription_id)
            .cloned())
    }

    async fn upsert_subscription(&mut self, subscription: &CurrentSubscription) -> AppResult<()> {
        self.staged
            .push(StagedWrite::Subscription(subscription.clone()));
        Ok(())
    }

    async fn touch_subscription(
        &mut self,
        subscription_id: &str,
        event_id: &str,
        updated_at: NaiveDateTime,
    ) -> AppResult<()> {
        self.staged.push(StagedWrite::Touch {
            subscription_id: subscription_id.to_string(),
            event_id: event_id.to_string(),
            updated_at,
        });
        Ok(())
    }

    async fn append_history(&mut self, entry: &NewHistoryEntry) -> AppResult<()> {
        self.staged.push(StagedWrite::History(entry.clone()));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let InMemoryIngestTx {
            inner,
            staged,
            held_locks,
            ..
        } = *self;
        let mut store = inner.lock().unwrap();

        for write in staged {
            match write {
                StagedWrite::RawEvent(event) => {
                    store.raw_events.insert(event.event_id.clone(), event);
                }
                StagedWrite::Subscription(subscription) => {
                    store
                        .subscriptions
                        .insert(subscription.subscription_id.clone(), subscription);
                }
                StagedWrite::Touch {
                    subscription_id,
                    event_id,
                    updated_at,
                } => {
                    if let Some(subscription) = store.subscriptions.get_mut(&subscription_id) {
                        subscription.last_event_id = Some(event_id);
                        subscription.last_updated = updated_at;
                    }
                }
                StagedWrite::History(entry) => {
                    let id = store.history.len() as i64 + 1;
                    store.history.push(SubscriptionHistoryEntry {
                        id,
                        subscription_id: entry.subscription_id,
                        event_id: entry.event_id,
                        change_type: entry.change_type,
                        previous_mrr: entry.previous_mrr,
                        new_mrr: entry.new_mrr,
                        mrr_delta: entry.mrr_delta,
                        event_timestamp: entry.event_timestamp,
                        product: entry.product,
                        price: entry.price,
                        quantity: entry.quantity,
                        currency: entry.currency,
                    });
                }
            }
        }

        // Row locks release only once the staged writes are visible.
        drop(store);
        drop(held_locks);

        Ok(())
    }
}
