// src/activity/feed.rs
//! Bounded, ordered, de-duplicated list of activity events. Every mutation
//! leaves the buffer sorted newest first and within capacity.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::activity::types::ActivityEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    /// An event with the same id was swapped out.
    Replaced,
    /// Inserted, and the oldest entries beyond capacity were dropped.
    Evicted(usize),
    /// Older than everything in a full buffer; not kept.
    Rejected,
}

#[derive(Debug, Clone)]
pub struct FeedBuffer {
    events: Vec<ActivityEvent>,
    cap: usize,
}

impl FeedBuffer {
    pub fn with_capacity(cap: usize) -> Self {
        let cap = cap.max(1);
        Self {
            events: Vec::with_capacity(cap.min(1_000)),
            cap,
        }
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[ActivityEvent] {
        &self.events
    }

    pub fn contains(&self, id: &str) -> bool {
        self.events.iter().any(|e| e.id == id)
    }

    /// Replace the whole content. For duplicate ids the later entry wins.
    pub fn replace(&mut self, incoming: Vec<ActivityEvent>) {
        let mut seen = HashSet::with_capacity(incoming.len());
        let mut kept: Vec<ActivityEvent> = incoming
            .into_iter()
            .rev()
            .filter(|e| seen.insert(e.id.clone()))
            .collect();
        kept.reverse();
        self.events = kept;
        self.normalize();
    }

    /// Add events whose id is not already present. Existing entries win.
    pub fn fill_missing(&mut self, incoming: Vec<ActivityEvent>) -> usize {
        let mut added = 0;
        for ev in incoming {
            if !self.contains(&ev.id) {
                self.events.push(ev);
                added += 1;
            }
        }
        self.normalize();
        added
    }

    pub fn upsert(&mut self, event: ActivityEvent) -> Upsert {
        if let Some(slot) = self.events.iter_mut().find(|e| e.id == event.id) {
            *slot = event;
            self.normalize();
            return Upsert::Replaced;
        }
        let id = event.id.clone();
        self.events.push(event);
        let evicted = self.normalize();
        if evicted == 0 {
            Upsert::Inserted
        } else if self.contains(&id) {
            Upsert::Evicted(evicted)
        } else {
            Upsert::Rejected
        }
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Sort then truncate. Returns how many entries were dropped.
    fn normalize(&mut self) -> usize {
        self.events.sort_by(newest_first);
        let excess = self.events.len().saturating_sub(self.cap);
        self.events.truncate(self.cap);
        excess
    }
}

/// `occurred_at` descending; ties broken by id so the order is total.
fn newest_first(a: &ActivityEvent, b: &ActivityEvent) -> Ordering {
    b.occurred_at
        .cmp(&a.occurred_at)
        .then_with(|| a.id.cmp(&b.id))
}
