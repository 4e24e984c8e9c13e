//! Severity scales derived from a checkout record.
//!
//! Two independent scales coexist: the urgency tier (`Priority`) used for
//! ordering and grouping, and the status class used for colouring. They use
//! different thresholds on purpose and must not be merged.

use crate::checkout::record::CheckoutRecord;
use crate::config::PriorityThresholds;
use crate::random::round_one_decimal;
use serde::Serialize;
use std::fmt;

/// Waiting counts from which a checkout is coloured `high` / `medium`.
pub const HIGH_STATUS_WAITING: u32 = 10;
pub const MEDIUM_STATUS_WAITING: u32 = 5;

pub const SUCCESS_RATE: u32 = 95;
pub const EFFICIENCY_SCORE: u32 = 87;
pub const PEAK_HOURS: &str = "14h-16h";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Normal,
    Urgent,
    Critical,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Normal => write!(f, "normal"),
            Priority::Urgent => write!(f, "urgent"),
            Priority::Critical => write!(f, "critical"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusClass {
    Closed,
    High,
    Medium,
    Low,
}

impl StatusClass {
    pub fn as_str(self) -> &'static str {
        match self {
            StatusClass::Closed => "closed",
            StatusClass::High => "high",
            StatusClass::Medium => "medium",
            StatusClass::Low => "low",
        }
    }
}

pub fn classify(record: &CheckoutRecord, thresholds: &PriorityThresholds) -> Priority {
    if record.waiting_count < thresholds.high_waiting {
        Priority::Normal
    } else if record.stuck_time > thresholds.critical_stuck_time {
        Priority::Critical
    } else {
        Priority::Urgent
    }
}

pub fn status_class(record: &CheckoutRecord) -> StatusClass {
    if !record.is_open() {
        StatusClass::Closed
    } else if record.waiting_count >= HIGH_STATUS_WAITING {
        StatusClass::High
    } else if record.waiting_count >= MEDIUM_STATUS_WAITING {
        StatusClass::Medium
    } else {
        StatusClass::Low
    }
}

/// Open checkouts with someone waiting, most pressing first. Ties keep the
/// input order.
pub fn sort_by_priority<'a>(
    records: &'a [CheckoutRecord],
    thresholds: &PriorityThresholds,
) -> Vec<&'a CheckoutRecord> {
    let mut sorted: Vec<&CheckoutRecord> = records
        .iter()
        .filter(|record| record.is_open() && record.waiting_count > 0)
        .collect();

    // `sort_by_key` is stable
    sorted.sort_by_key(|record| {
        std::cmp::Reverse((classify(record, thresholds), record.waiting_count))
    });

    sorted
}

#[derive(Debug, Default, Serialize)]
pub struct PriorityGroups<'a> {
    pub critical: Vec<&'a CheckoutRecord>,
    pub urgent: Vec<&'a CheckoutRecord>,
    pub normal: Vec<&'a CheckoutRecord>,
}

pub fn group_by_priority<'a>(
    records: &'a [CheckoutRecord],
    thresholds: &PriorityThresholds,
) -> PriorityGroups<'a> {
    let mut groups = PriorityGroups::default();

    for record in sort_by_priority(records, thresholds) {
        match classify(record, thresholds) {
            Priority::Critical => groups.critical.push(record),
            Priority::Urgent => groups.urgent.push(record),
            Priority::Normal => groups.normal.push(record),
        }
    }

    groups
}

pub fn critical_count(records: &[CheckoutRecord], thresholds: &PriorityThresholds) -> usize {
    sort_by_priority(records, thresholds)
        .into_iter()
        .filter(|record| classify(record, thresholds) == Priority::Critical)
        .count()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStats {
    pub total_waiting: u32,
    pub open_checkouts: usize,
    pub closed_checkouts: usize,
    pub average_wait: f64,
    pub critical_checkouts: usize,
    pub success_rate: u32,
    pub efficiency_score: u32,
    pub peak_hours: &'static str,
}

pub fn queue_stats(records: &[CheckoutRecord], thresholds: &PriorityThresholds) -> QueueStats {
    let open_checkouts = records.iter().filter(|r| r.is_open()).count();
    let busy: Vec<&CheckoutRecord> = records
        .iter()
        .filter(|r| r.is_open() && r.waiting_count > 0)
        .collect();

    let average_wait = if busy.is_empty() {
        0.0
    } else {
        let total: u32 = busy.iter().map(|r| r.estimated_wait).sum();
        round_one_decimal(f64::from(total) / busy.len() as f64)
    };

    QueueStats {
        total_waiting: records.iter().map(|r| r.waiting_count).sum(),
        open_checkouts,
        closed_checkouts: records.len() - open_checkouts,
        average_wait,
        critical_checkouts: critical_count(records, thresholds),
        success_rate: SUCCESS_RATE,
        efficiency_score: EFFICIENCY_SCORE,
        peak_hours: PEAK_HOURS,
    }
}
