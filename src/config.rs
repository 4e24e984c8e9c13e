use crate::discrete_system::Time;
use failure::Fail;
use serde::{Deserialize, Serialize};

pub type Id = u32;

/// Equipment targets accepted from the operator.
pub const MIN_EQUIPMENT_TARGET: u32 = 1;
pub const MAX_EQUIPMENT_TARGET: u32 = 50;

/// Largest queue a single checkout may be configured to hold.
pub const MAX_WAITING_CAP: u32 = 1000;

#[derive(Debug, Fail)]
#[fail(display = "validation failed because of \"{}\"", error)]
pub struct ValidationError {
    pub error: String,
}

impl ValidationError {
    fn new(error: impl Into<String>) -> ValidationError {
        ValidationError {
            error: error.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub checkouts: u32,        // Number of checkouts, fixed for the session
    pub waiting_cap: u32,      // Maximum number of people in one queue
    pub initial_max_waiting: u32,
    pub open_probability: f64, // Chance that a checkout starts open
    pub tick_interval: Time,
    pub stuck_threshold: u32, // Queue length from which stuck time accumulates
    pub increase_probability: f64,
    pub decrease_probability: f64,
    pub seed: Option<u64>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            checkouts: 12,
            waiting_cap: 8,
            initial_max_waiting: 7,
            open_probability: 0.85,
            tick_interval: 3000,
            stuck_threshold: 5,
            increase_probability: 0.35,
            decrease_probability: 0.35,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityThresholds {
    pub high_waiting: u32,
    pub critical_stuck_time: Time,
}

impl Default for PriorityThresholds {
    fn default() -> Self {
        PriorityThresholds {
            high_waiting: 5,
            critical_stuck_time: 9000,
        }
    }
}

/// Condition that raises the alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertPolicy {
    /// Some open checkout has at least `critical_waiting` people queued.
    CriticalQueue,
    /// Fewer checkouts are open than the equipment target.
    Understaffed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub policy: AlertPolicy,
    pub poll_interval: Time,
    pub acknowledge_cooldown: Time,
    pub critical_waiting: u32,
    pub equipment_target: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        MonitorConfig {
            policy: AlertPolicy::CriticalQueue,
            poll_interval: 2000,
            acknowledge_cooldown: 300_000,
            critical_waiting: 8,
            equipment_target: 15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub busiest_checkouts: usize,
    pub seed: Option<u64>,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        AnalyticsConfig {
            busiest_checkouts: 3,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub store: StoreConfig,
    pub priority: PriorityThresholds,
    pub monitor: MonitorConfig,
    pub analytics: AnalyticsConfig,
    pub console_duration: Time, // How long `-console` simulates
}

impl Default for DashboardConfig {
    fn default() -> Self {
        DashboardConfig {
            store: StoreConfig::default(),
            priority: PriorityThresholds::default(),
            monitor: MonitorConfig::default(),
            analytics: AnalyticsConfig::default(),
            console_duration: 30_000,
        }
    }
}

fn is_probability(p: f64) -> bool {
    (0.0..=1.0).contains(&p)
}

pub fn validate_equipment_target(target: u32) -> Result<(), ValidationError> {
    if target < MIN_EQUIPMENT_TARGET || target > MAX_EQUIPMENT_TARGET {
        return Err(ValidationError::new(format!(
            "equipment target must be between {} and {}, got {}",
            MIN_EQUIPMENT_TARGET, MAX_EQUIPMENT_TARGET, target
        )));
    }

    Ok(())
}

pub fn validate_monitor(monitor: &MonitorConfig) -> Result<(), ValidationError> {
    if monitor.poll_interval == 0 || monitor.acknowledge_cooldown == 0 {
        return Err(ValidationError::new("alert monitor has invalid times"));
    }

    if monitor.critical_waiting == 0 {
        return Err(ValidationError::new("critical waiting threshold must be positive"));
    }

    validate_equipment_target(monitor.equipment_target)
}

pub fn validate_config(config: &DashboardConfig) -> Result<(), ValidationError> {
    let store = &config.store;

    if store.checkouts == 0 || store.checkouts > MAX_EQUIPMENT_TARGET {
        return Err(ValidationError::new(format!(
            "there must be between 1 and {} checkouts, got {}",
            MAX_EQUIPMENT_TARGET, store.checkouts
        )));
    }

    if store.waiting_cap == 0 || store.waiting_cap > MAX_WAITING_CAP {
        return Err(ValidationError::new(format!(
            "waiting cap must be between 1 and {}, got {}",
            MAX_WAITING_CAP, store.waiting_cap
        )));
    }

    if store.initial_max_waiting > store.waiting_cap {
        return Err(ValidationError::new(format!(
            "initial waiting count {} exceeds the cap {}",
            store.initial_max_waiting, store.waiting_cap
        )));
    }

    if store.tick_interval == 0 {
        return Err(ValidationError::new("store tick interval must be positive"));
    }

    if !is_probability(store.open_probability)
        || !is_probability(store.increase_probability)
        || !is_probability(store.decrease_probability)
        || !is_probability(store.increase_probability + store.decrease_probability)
    {
        return Err(ValidationError::new("store probabilities must lie in [0, 1]"));
    }

    if config.priority.high_waiting == 0 {
        return Err(ValidationError::new("high waiting threshold must be positive"));
    }

    if config.analytics.busiest_checkouts == 0 {
        return Err(ValidationError::new("at least one busiest checkout must be reported"));
    }

    validate_monitor(&config.monitor)
}
