//! The resource registry (§4.2): tracks every known resource and is the
//! source of truth for population accounting.

use std::collections::VecDeque;
use std::time::Instant;

use crate::factory::Factory;
use crate::record::{LentRecord, ResourceRecord};

/// Free, lent, creating and destroying resources, plus the accounting
/// that backs §3 invariant 1 (`|free|+|lent|+creating+destroying <= max`).
pub struct Registry<V> {
    pub free: VecDeque<ResourceRecord<V>>,
    pub lent: Vec<LentRecord<V>>,
    pub creating: usize,
    pub destroying: usize,
}

impl<V> Default for Registry<V> {
    fn default() -> Self {
        Self {
            free: VecDeque::new(),
            lent: Vec::new(),
            creating: 0,
            destroying: 0,
        }
    }
}

impl<V: Clone> Registry<V> {
    pub fn total(&self) -> usize {
        self.free.len() + self.lent.len() + self.creating + self.destroying
    }

    /// Pop the head of the free list, validating as we go, until a usable
    /// record is found or the list empties (§4.4 "Next free resource
    /// policy"). Invalid records are returned for the caller to destroy;
    /// a usable one is moved into `lent` and its value cloned out to
    /// hand to the caller.
    pub fn take_free_for_serve<F: Factory<Value = V>>(
        &mut self,
        factory: &F,
        assigned_request: u64,
    ) -> (Option<V>, Vec<V>) {
        let mut invalid = Vec::new();
        while let Some(record) = self.free.pop_front() {
            if factory.validate(&record.value) {
                let value = record.value.clone();
                self.lent.push(LentRecord {
                    value: record.value,
                    created_at: record.created_at,
                    expires_at: record.expires_at,
                    assigned_request: Some(assigned_request),
                });
                return (Some(value), invalid);
            }
            invalid.push(record.value);
        }
        (None, invalid)
    }

    /// Locate and remove a lent record whose value compares equal to
    /// `value`, searching from the most recent insertion backwards so
    /// duplicates resolve to the most recently acquired match (§4.2).
    pub fn take_lent<F: Factory<Value = V>>(
        &mut self,
        factory: &F,
        value: &V,
    ) -> Option<LentRecord<V>> {
        let idx = self
            .lent
            .iter()
            .rposition(|record| factory.compare(&record.value, value))?;
        Some(self.lent.remove(idx))
    }

    /// Locate and remove a free record whose value compares equal to
    /// `value` (used by `destroy` when the value was never lent out, or
    /// was already returned). Same newest-first search order.
    pub fn take_free_matching<F: Factory<Value = V>>(
        &mut self,
        factory: &F,
        value: &V,
    ) -> Option<ResourceRecord<V>> {
        let idx = self
            .free
            .iter()
            .rposition(|record| factory.compare(&record.value, value))?;
        self.free.remove(idx)
    }

    /// Return a validated record to the free list, tail-pushed so serve
    /// order stays oldest-release-first (§3 "free_resources").
    pub fn store_free(&mut self, record: ResourceRecord<V>) {
        self.free.push_back(record);
    }

    /// Snapshot-collect every free record whose idle lifetime has
    /// elapsed, removing them from `free` (§4.4 "Idle sweep").
    pub fn sweep_idle(&mut self, idle_timeout: std::time::Duration, now: Instant) -> Vec<V> {
        let mut kept = VecDeque::with_capacity(self.free.len());
        let mut reaped = Vec::new();
        while let Some(record) = self.free.pop_front() {
            if record.is_idle_expired(idle_timeout, now) {
                reaped.push(record.value);
            } else {
                kept.push_back(record);
            }
        }
        self.free = kept;
        reaped
    }

    /// Snapshot-collect every free record whose absolute lifetime has
    /// elapsed (§4.4 "Expiry sweep").
    pub fn sweep_expired(&mut self, now: Instant) -> Vec<V> {
        let mut kept = VecDeque::with_capacity(self.free.len());
        let mut reaped = Vec::new();
        while let Some(record) = self.free.pop_front() {
            if record.is_lifetime_expired(now) {
                reaped.push(record.value);
            } else {
                kept.push_back(record);
            }
        }
        self.free = kept;
        reaped
    }

    /// Drain every free record (used by drain, §4.6).
    pub fn drain_free(&mut self) -> Vec<V> {
        self.free.drain(..).map(|record| record.value).collect()
    }
}
