//! Summary statistics over a normalized alarm snapshot.

use std::collections::{BTreeSet, HashMap};

use alarm_core::error::{AlarmError, Result};
use alarm_core::models::{ActorCount, AlarmRecord, DateRange, HourHistogram};
use chrono::NaiveDateTime;
use serde::Serialize;

// ── AlarmSummary ──────────────────────────────────────────────────────────────

/// Everything the presentation layer needs about one load.
#[derive(Debug, Clone, Serialize)]
pub struct AlarmSummary {
    /// Records in the whole snapshot, regardless of the date range.
    pub total_count: usize,
    /// Distinct non-empty messages across the snapshot.
    pub unique_messages: BTreeSet<String>,
    /// Distinct actors across the snapshot.
    pub unique_actors: BTreeSet<String>,
    /// Per-actor counts over the whole snapshot, most frequent first.
    pub actor_frequency: Vec<ActorCount>,
    /// The effective date range after defaulting missing bounds.
    pub range: DateRange,
    /// Records inside `range`, in snapshot order.
    pub filtered_records: Vec<AlarmRecord>,
    /// Hour-of-day distribution of `filtered_records`.
    pub hour_histogram: HourHistogram,
}

impl AlarmSummary {
    /// The actor with the most alarms.
    pub fn top_actor(&self) -> Option<&ActorCount> {
        self.actor_frequency.first()
    }

    pub fn unique_message_count(&self) -> usize {
        self.unique_messages.len()
    }

    pub fn unique_actor_count(&self) -> usize {
        self.unique_actors.len()
    }

    pub fn filtered_count(&self) -> usize {
        self.filtered_records.len()
    }
}

// ── AlarmAggregator ───────────────────────────────────────────────────────────

/// Stateless helper computing aggregates over normalized records.
pub struct AlarmAggregator;

impl AlarmAggregator {
    /// Summarise `records`, restricting the filtered view and histogram to
    /// `[start, end]`. Missing bounds default to the earliest and latest
    /// timestamp in the snapshot.
    ///
    /// Fails with [`AlarmError::EmptyDataset`] when there are no records and
    /// with [`AlarmError::InvalidDateRange`] when `start` is after `end`.
    pub fn summarize(
        records: &[AlarmRecord],
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<AlarmSummary> {
        let range = Self::resolve_range(records, start, end)?;
        let filtered_records = Self::filter_by_range(records, &range);
        let hour_histogram = HourHistogram::from_records(&filtered_records);

        Ok(AlarmSummary {
            total_count: records.len(),
            unique_messages: Self::unique_messages(records),
            unique_actors: Self::unique_actors(records),
            actor_frequency: Self::actor_frequency(records),
            range,
            filtered_records,
            hour_histogram,
        })
    }

    /// Earliest and latest timestamp; `None` for an empty snapshot.
    pub fn time_span(records: &[AlarmRecord]) -> Option<DateRange> {
        let start = records.iter().map(|r| r.timestamp).min()?;
        let end = records.iter().map(|r| r.timestamp).max()?;
        Some(DateRange { start, end })
    }

    /// Fill in missing bounds from the snapshot's time span.
    pub fn resolve_range(
        records: &[AlarmRecord],
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<DateRange> {
        let span = Self::time_span(records).ok_or(AlarmError::EmptyDataset)?;
        let range = DateRange {
            start: start.unwrap_or(span.start),
            end: end.unwrap_or(span.end),
        };
        if range.start > range.end {
            return Err(AlarmError::InvalidDateRange {
                start: range.start,
                end: range.end,
            });
        }
        Ok(range)
    }

    /// Records whose timestamp lies in `range`, in input order.
    pub fn filter_by_range(records: &[AlarmRecord], range: &DateRange) -> Vec<AlarmRecord> {
        records
            .iter()
            .filter(|r| range.contains(r.timestamp))
            .cloned()
            .collect()
    }

    /// Count records per actor, ignoring records without one.
    ///
    /// Sorted by descending count; equal counts keep the order in which the
    /// actors first appear.
    pub fn actor_frequency(records: &[AlarmRecord]) -> Vec<ActorCount> {
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut counts: Vec<ActorCount> = Vec::new();

        for actor in records.iter().filter_map(|r| r.actor.as_deref()) {
            match index.get(actor) {
                Some(&i) => counts[i].count += 1,
                None => {
                    index.insert(actor, counts.len());
                    counts.push(ActorCount {
                        actor: actor.to_string(),
                        count: 1,
                    });
                }
            }
        }

        // sort_by is stable, so first-seen order survives among ties.
        counts.sort_by(|a, b| b.count.cmp(&a.count));
        counts
    }

    /// Distinct non-empty messages.
    pub fn unique_messages(records: &[AlarmRecord]) -> BTreeSet<String> {
        records
            .iter()
            .filter(|r| !r.message.is_empty())
            .map(|r| r.message.clone())
            .collect()
    }

    /// Distinct actors.
    pub fn unique_actors(records: &[AlarmRecord]) -> BTreeSet<String> {
        records.iter().filter_map(|r| r.actor.clone()).collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
