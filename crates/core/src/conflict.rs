//! Timetable conflict detection.
//!
//! Conflicts are always recomputed from the entries at hand and never stored.
//! Entries are bucketed by (date, room), (date, chief invigilator) and subject
//! before the pairwise overlap test, so only plausible pairs are compared.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;

use crate::timetable::TimetableEntry;
use crate::types::{DbId, SessionIndex};

/// Category of a detected conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    RoomClash,
    InvigilatorClash,
    DuplicateSubject,
}

/// Reference to one side of a conflicting pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct EntryRef {
    pub subject_id: DbId,
    pub date: NaiveDate,
    pub session_index: SessionIndex,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub subject_code: String,
}

impl EntryRef {
    fn of(entry: &TimetableEntry) -> Self {
        Self {
            subject_id: entry.subject_id(),
            date: entry.date,
            session_index: entry.session_index,
            start_time: entry.start_time,
            end_time: entry.end_time,
            subject_code: entry.subject.subject_code.clone(),
        }
    }
}

/// A pairwise violation. `first` never sorts after `second`; they are equal
/// only when the same subject row was stored twice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictRecord {
    pub kind: ConflictKind,
    pub first: EntryRef,
    pub second: EntryRef,
    pub description: String,
}

/// Half-open window overlap: touching windows do not overlap.
pub fn windows_overlap(
    a: (NaiveTime, NaiveTime),
    b: (NaiveTime, NaiveTime),
) -> bool {
    a.0 < b.1 && b.0 < a.1
}

fn entry_window(entry: &TimetableEntry) -> (NaiveTime, NaiveTime) {
    (entry.start_time, entry.end_time)
}

/// Scan `entries` for room clashes, invigilator clashes and subjects placed
/// more than once. Each unordered pair is reported at most once per kind and
/// the output order does not depend on input order.
pub fn detect(entries: &[TimetableEntry]) -> Vec<ConflictRecord> {
    let mut found: BTreeMap<(ConflictKind, EntryRef, EntryRef), String> = BTreeMap::new();

    let mut by_room: BTreeMap<(NaiveDate, &str), Vec<&TimetableEntry>> = BTreeMap::new();
    let mut by_chief: BTreeMap<(NaiveDate, &str), Vec<&TimetableEntry>> = BTreeMap::new();
    let mut by_subject: BTreeMap<DbId, Vec<&TimetableEntry>> = BTreeMap::new();

    for entry in entries {
        if let Some(room) = entry.room.as_deref() {
            by_room.entry((entry.date, room)).or_default().push(entry);
        }
        if let Some(chief) = entry.chief_invigilator.as_deref() {
            by_chief.entry((entry.date, chief)).or_default().push(entry);
        }
        by_subject.entry(entry.subject_id()).or_default().push(entry);
    }

    for ((date, room), group) in &by_room {
        for_each_overlapping_pair(group, |a, b| {
            record(&mut found, ConflictKind::RoomClash, a, b, |first, second| {
                format!(
                    "Room {room} is double-booked on {date}: {} ({}-{}) overlaps {} ({}-{})",
                    first.subject_code,
                    first.start_time,
                    first.end_time,
                    second.subject_code,
                    second.start_time,
                    second.end_time
                )
            });
        });
    }

    for ((date, chief), group) in &by_chief {
        for_each_overlapping_pair(group, |a, b| {
            record(&mut found, ConflictKind::InvigilatorClash, a, b, |first, second| {
                format!(
                    "Invigilator {chief} is double-booked on {date}: {} ({}-{}) overlaps {} ({}-{})",
                    first.subject_code,
                    first.start_time,
                    first.end_time,
                    second.subject_code,
                    second.start_time,
                    second.end_time
                )
            });
        });
    }

    for group in by_subject.values().filter(|group| group.len() > 1) {
        for (i, a) in group.iter().enumerate() {
            for b in &group[i + 1..] {
                record(&mut found, ConflictKind::DuplicateSubject, a, b, |first, second| {
                    format!(
                        "Subject {} is scheduled more than once: {} session {} and {} session {}",
                        first.subject_code,
                        first.date,
                        first.session_index,
                        second.date,
                        second.session_index
                    )
                });
            }
        }
    }

    found
        .into_iter()
        .map(|((kind, first, second), description)| ConflictRecord {
            kind,
            first,
            second,
            description,
        })
        .collect()
}

fn for_each_overlapping_pair(
    group: &[&TimetableEntry],
    mut visit: impl FnMut(&TimetableEntry, &TimetableEntry),
) {
    for (i, a) in group.iter().enumerate() {
        for b in &group[i + 1..] {
            if windows_overlap(entry_window(a), entry_window(b)) {
                visit(a, b);
            }
        }
    }
}

fn record(
    found: &mut BTreeMap<(ConflictKind, EntryRef, EntryRef), String>,
    kind: ConflictKind,
    a: &TimetableEntry,
    b: &TimetableEntry,
    describe: impl FnOnce(&EntryRef, &EntryRef) -> String,
) {
    // A subject overlapping itself is a duplicate, not a resource clash.
    if kind != ConflictKind::DuplicateSubject && a.subject_id() == b.subject_id() {
        return;
    }
    let (first, second) = {
        let (x, y) = (EntryRef::of(a), EntryRef::of(b));
        if x <= y {
            (x, y)
        } else {
            (y, x)
        }
    };
    let description = describe(&first, &second);
    found.entry((kind, first, second)).or_insert(description);
}

/// Number of distinct entries involved in at least one conflict.
pub fn affected_entries(conflicts: &[ConflictRecord]) -> usize {
    conflicts
        .iter()
        .flat_map(|c| [&c.first, &c.second])
        .collect::<BTreeSet<_>>()
        .len()
}
