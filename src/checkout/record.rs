use crate::config::Id;
use crate::discrete_system::Time;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckoutStatus {
    Open,
    Closed,
}

impl fmt::Display for CheckoutStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckoutStatus::Open => write!(f, "open"),
            CheckoutStatus::Closed => write!(f, "closed"),
        }
    }
}

/// State of one monitored checkout as published by the queue store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRecord {
    pub id: Id,
    pub name: String,
    pub waiting_count: u32,
    pub status: CheckoutStatus,
    pub estimated_wait: u32, // minutes
    pub last_updated: Time,
    pub stuck_time: Time,
}

impl CheckoutRecord {
    pub fn new(id: Id, waiting_count: u32, status: CheckoutStatus, now: Time) -> CheckoutRecord {
        CheckoutRecord {
            id,
            name: format!("Checkout {}", id),
            waiting_count,
            status,
            estimated_wait: estimated_wait(waiting_count),
            last_updated: now,
            stuck_time: 0,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == CheckoutStatus::Open
    }
}

/// Minutes a newcomer is expected to wait: two and a half minutes per
/// person plus two minutes at the till, nothing when the queue is empty.
pub fn estimated_wait(waiting_count: u32) -> u32 {
    if waiting_count == 0 {
        0
    } else {
        waiting_count.saturating_mul(5) / 2 + 2
    }
}

pub fn waiting_text(count: u32) -> String {
    match count {
        0 => "No queue".to_string(),
        1 => "1 person".to_string(),
        n => format!("{} people", n),
    }
}
