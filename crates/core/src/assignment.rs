//! Assignment engine: the in-progress draft timetable of one notification.
//!
//! The engine owns two disjoint collections, placed entries and unassigned
//! subjects, and every operation moves subjects between them. A subject is
//! therefore never placed twice within one engine. Room and invigilator
//! clashes are allowed while editing and surface through
//! [`crate::conflict::detect`].

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::conflict::{self, ConflictRecord};
use crate::error::CoreError;
use crate::notification::Notification;
use crate::slot_grid::{Slot, SlotKey};
use crate::store::{ensure_editable, SubjectCatalog};
use crate::subject_pool::{SubjectDemandEntry, SubjectPoolResolver};
use crate::timetable::{EntryResources, TimetableEntry};
use crate::types::{DbId, SessionIndex};

/// Drop one subject onto one slot.
#[derive(Debug, Clone, Deserialize)]
pub struct AssignRequest {
    pub subject_id: DbId,
    pub date: NaiveDate,
    pub session_index: SessionIndex,
    #[serde(flatten)]
    pub resources: EntryResources,
}

/// Outcome of seeding an engine with previously saved entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RestoreReport {
    pub restored: usize,
    /// Entries whose subject left the pool or whose slot left the grid.
    pub dropped: usize,
}

/// Serializable view of the draft.
#[derive(Debug, Clone, Serialize)]
pub struct DraftSnapshot {
    pub notification_code: String,
    pub base_version: i32,
    pub slots: Vec<Slot>,
    pub entries: Vec<TimetableEntry>,
    pub unassigned: Vec<SubjectDemandEntry>,
}

/// In-memory draft for one notification.
#[derive(Debug, Clone)]
pub struct AssignmentEngine {
    notification_code: String,
    base_version: i32,
    slots: Vec<Slot>,
    slot_positions: HashMap<SlotKey, usize>,
    /// Resolver position of every subject in the pool.
    pool_order: HashMap<DbId, usize>,
    entries: Vec<TimetableEntry>,
    unassigned: Vec<SubjectDemandEntry>,
}

impl AssignmentEngine {
    /// Build an empty draft from a resolved pool and a slot grid.
    pub fn new(
        notification_code: impl Into<String>,
        base_version: i32,
        pool: Vec<SubjectDemandEntry>,
        slots: Vec<Slot>,
    ) -> Self {
        let slot_positions = slots
            .iter()
            .enumerate()
            .map(|(position, slot)| (slot.key(), position))
            .collect();

        let mut pool_order = HashMap::with_capacity(pool.len());
        let mut unassigned = Vec::with_capacity(pool.len());
        for subject in pool {
            if !pool_order.contains_key(&subject.subject_id) {
                pool_order.insert(subject.subject_id, pool_order.len());
                unassigned.push(subject);
            }
        }

        Self {
            notification_code: notification_code.into(),
            base_version,
            slots,
            slot_positions,
            pool_order,
            entries: Vec::new(),
            unassigned,
        }
    }

    /// Resolve the subject pool and slot grid for `notification` and return a
    /// fresh draft with nothing assigned. Only `Draft` notifications can be
    /// edited.
    pub async fn initialize<C: SubjectCatalog + ?Sized>(
        notification: &Notification,
        resolver: &SubjectPoolResolver<C>,
    ) -> Result<Self, CoreError> {
        ensure_editable(notification)?;
        let pool = resolver.resolve(&notification.scope).await?;
        Ok(Self::new(
            notification.code.clone(),
            notification.draft_version,
            pool,
            notification.slots(),
        ))
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn notification_code(&self) -> &str {
        &self.notification_code
    }

    /// Persisted version this draft was loaded from or last saved as.
    pub fn base_version(&self) -> i32 {
        self.base_version
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn entries(&self) -> &[TimetableEntry] {
        &self.entries
    }

    pub fn unassigned(&self) -> &[SubjectDemandEntry] {
        &self.unassigned
    }

    /// Record a successful save.
    pub fn mark_saved(&mut self, version: i32) {
        self.base_version = version;
    }

    /// Conflicts in the current draft.
    pub fn conflicts(&self) -> Vec<ConflictRecord> {
        conflict::detect(&self.entries)
    }

    /// Entries ordered by slot, then resolver order.
    pub fn snapshot(&self) -> DraftSnapshot {
        let mut entries = self.entries.clone();
        entries.sort_by_key(|e| (e.slot_key(), self.position_of(e.subject_id())));
        DraftSnapshot {
            notification_code: self.notification_code.clone(),
            base_version: self.base_version,
            slots: self.slots.clone(),
            entries,
            unassigned: self.unassigned.clone(),
        }
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Move an unassigned subject onto a slot.
    ///
    /// Fails with [`CoreError::UnknownSubject`] when the subject is not in the
    /// unassigned pool and [`CoreError::SlotNotInRange`] when the slot is not
    /// part of the grid.
    pub fn assign_one(&mut self, request: AssignRequest) -> Result<TimetableEntry, CoreError> {
        let index = self
            .unassigned_index(request.subject_id)
            .ok_or(CoreError::UnknownSubject(request.subject_id))?;
        let key = SlotKey {
            date: request.date,
            session_index: request.session_index,
        };
        let slot = self.slot(key).ok_or(CoreError::SlotNotInRange {
            date: request.date,
            session_index: request.session_index,
        })?;

        let mut entry = TimetableEntry::place(self.unassigned[index].clone(), slot);
        entry.apply_resources(request.resources)?;

        self.unassigned.remove(index);
        self.entries.push(entry.clone());
        Ok(entry)
    }

    /// Remove a subject's entry and return the subject to the unassigned pool
    /// at its resolver position.
    pub fn unassign(&mut self, subject_id: DbId) -> Result<SubjectDemandEntry, CoreError> {
        let index = self
            .entry_index(subject_id)
            .ok_or(CoreError::UnknownSubject(subject_id))?;
        let entry = self.entries.remove(index);
        self.return_to_pool(entry.subject.clone());
        Ok(entry.subject)
    }

    /// Edit the room, invigilators or time window of an assigned subject.
    pub fn attach_resources(
        &mut self,
        subject_id: DbId,
        resources: EntryResources,
    ) -> Result<TimetableEntry, CoreError> {
        let index = self
            .entry_index(subject_id)
            .ok_or(CoreError::UnknownSubject(subject_id))?;
        let entry = &mut self.entries[index];
        entry.apply_resources(resources)?;
        Ok(entry.clone())
    }

    /// Greedily pair unassigned subjects, in resolver order, with slots that
    /// hold no entry at all, in grid order. Rooms are not allocated.
    ///
    /// Returns the number of subjects placed.
    pub fn auto_assign(&mut self) -> usize {
        let occupied: BTreeSet<SlotKey> = self.entries.iter().map(TimetableEntry::slot_key).collect();
        let free: Vec<Slot> = self
            .slots
            .iter()
            .filter(|slot| !occupied.contains(&slot.key()))
            .cloned()
            .collect();

        let count = free.len().min(self.unassigned.len());
        let placed: Vec<SubjectDemandEntry> = self.unassigned.drain(..count).collect();
        self.entries.extend(
            placed
                .into_iter()
                .zip(&free)
                .map(|(subject, slot)| TimetableEntry::place(subject, slot)),
        );
        count
    }

    /// Return every subject to the unassigned pool.
    pub fn clear(&mut self) {
        let entries = std::mem::take(&mut self.entries);
        self.unassigned
            .extend(entries.into_iter().map(|entry| entry.subject));
        self.unassigned
            .sort_by_key(|subject| self.pool_order.get(&subject.subject_id).copied());
    }

    /// Seed the draft with saved entries, keeping their resources, times and
    /// head-count snapshots. Entries for subjects outside the pool, for slots
    /// outside the grid, or for subjects already placed are dropped.
    pub fn restore(&mut self, saved: Vec<TimetableEntry>) -> RestoreReport {
        let mut report = RestoreReport::default();
        for entry in saved {
            let placeable = self.slot_positions.contains_key(&entry.slot_key());
            match self.unassigned_index(entry.subject_id()) {
                Some(index) if placeable => {
                    self.unassigned.remove(index);
                    self.entries.push(entry);
                    report.restored += 1;
                }
                _ => report.dropped += 1,
            }
        }
        report
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn slot(&self, key: SlotKey) -> Option<&Slot> {
        self.slot_positions.get(&key).map(|&pos| &self.slots[pos])
    }

    fn unassigned_index(&self, subject_id: DbId) -> Option<usize> {
        self.unassigned
            .iter()
            .position(|s| s.subject_id == subject_id)
    }

    fn entry_index(&self, subject_id: DbId) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.subject_id() == subject_id)
    }

    fn position_of(&self, subject_id: DbId) -> usize {
        self.pool_order
            .get(&subject_id)
            .copied()
            .unwrap_or(usize::MAX)
    }

    fn return_to_pool(&mut self, subject: SubjectDemandEntry) {
        let position = self.position_of(subject.subject_id);
        let at = self
            .unassigned
            .partition_point(|s| self.position_of(s.subject_id) < position);
        self.unassigned.insert(at, subject);
    }
}
