use crate::checkout;
use crate::checkout::record::CheckoutRecord;
use crate::checkout::CheckoutComponent;
use crate::config::{AlertPolicy, MonitorConfig};
use crate::discrete_system::address::Address;
use crate::discrete_system::component::{HandleInfo, StartInfo, StopInfo};
use crate::discrete_system::effector::Effector;
use crate::discrete_system::Time;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 1. `AlertMonitor` when
///     * Every state
///         * Should accept event `Snapshot` - keep it as the latest known state
///         * Should accept event `Poll` - re-evaluate the condition on the latest
///           snapshot, schedule `Poll` in `poll_interval`
///         * Should accept event `Dismiss` - transition to `Dismissed`, cancel cooldown
///         * Should accept event `Reset` - transition to `Idle`, cancel cooldown
///         * Should accept event `SetEquipmentTarget(n)` - takes effect on the next `Poll`
///     * `Idle`
///         * `Poll` with the condition holding - transition to `Alerting`
///     * `Alerting`
///         * `Poll` with the condition cleared - transition to `Idle`
///         * Should accept event `Acknowledge`
///             1) transition to `Acknowledged`
///             2) schedule `AcknowledgeExpired(cycle)` in `acknowledge_cooldown`
///     * `Acknowledged`
///         * `Poll` never changes the state and never touches the cooldown
///         * Should accept event `AcknowledgeExpired` with correct cycle
///             * If the condition holds - transition to `Alerting`
///             * Else - transition to `Idle`
///     * `Dismissed`
///         * Stays until `Reset`; polling keeps tracking the condition

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertState {
    Idle,
    Alerting,
    Acknowledged,
    Dismissed,
}

impl fmt::Display for AlertState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertState::Idle => write!(f, "idle"),
            AlertState::Alerting => write!(f, "alerting"),
            AlertState::Acknowledged => write!(f, "acknowledged"),
            AlertState::Dismissed => write!(f, "dismissed"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Event {
    Poll,
    Snapshot(Vec<CheckoutRecord>),
    Acknowledge,
    AcknowledgeExpired(u32),
    Dismiss,
    Reset,
    SetEquipmentTarget(u32),
}

impl From<Event> for checkout::Event {
    fn from(event: Event) -> checkout::Event {
        checkout::Event::MonitorEvent(event)
    }
}

/// What a view needs to know to draw the alert banner.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertStatus {
    pub state: AlertState,
    pub condition_active: bool,
    pub banner_visible: bool,
    pub policy: AlertPolicy,
    pub equipment_target: u32,
    pub open_checkouts: usize,
    pub critical_queues: Vec<u32>,
    pub acknowledged_until: Option<Time>,
}

#[derive(Debug, Serialize)]
pub struct AlertMonitor {
    pub config: MonitorConfig,
    store: Address,
    state: AlertState,
    condition: bool,
    latest: Vec<CheckoutRecord>,
    cycle: u32,
    acknowledged_until: Option<Time>,
}

/// Whether the alert condition of `policy` holds for `records`.
pub fn condition_holds(config: &MonitorConfig, records: &[CheckoutRecord]) -> bool {
    match config.policy {
        AlertPolicy::CriticalQueue => !critical_queues(config, records).is_empty(),
        AlertPolicy::Understaffed => open_count(records) < config.equipment_target as usize,
    }
}

fn critical_queues(config: &MonitorConfig, records: &[CheckoutRecord]) -> Vec<u32> {
    records
        .iter()
        .filter(|r| r.is_open() && r.waiting_count >= config.critical_waiting)
        .map(|r| r.id)
        .collect()
}

fn open_count(records: &[CheckoutRecord]) -> usize {
    records.iter().filter(|r| r.is_open()).count()
}

impl AlertMonitor {
    pub fn new(config: MonitorConfig, store: Address) -> AlertMonitor {
        AlertMonitor {
            config,
            store,
            state: AlertState::Idle,
            condition: false,
            latest: Vec::new(),
            cycle: 0,
            acknowledged_until: None,
        }
    }

    pub fn state(&self) -> AlertState {
        self.state
    }

    pub fn policy(&self) -> AlertPolicy {
        self.config.policy
    }

    pub fn condition_active(&self) -> bool {
        self.condition
    }

    pub fn status(&self) -> AlertStatus {
        AlertStatus {
            state: self.state,
            condition_active: self.condition,
            banner_visible: self.state == AlertState::Alerting,
            policy: self.config.policy,
            equipment_target: self.config.equipment_target,
            open_checkouts: open_count(&self.latest),
            critical_queues: critical_queues(&self.config, &self.latest),
            acknowledged_until: self.acknowledged_until,
        }
    }

    pub fn observe(&mut self, records: Vec<CheckoutRecord>) {
        self.latest = records;
    }

    fn transition(&mut self, next: AlertState, now: Time) {
        if self.state != next {
            info!("alert monitor {} -> {} at {}", self.state, next, now);
            self.state = next;
        }
    }

    // Invalidates any scheduled `AcknowledgeExpired`
    fn cancel_cooldown(&mut self) {
        self.cycle += 1;
        self.acknowledged_until = None;
    }

    pub fn poll(&mut self, now: Time) {
        self.condition = condition_holds(&self.config, &self.latest);

        match (self.state, self.condition) {
            (AlertState::Idle, true) => self.transition(AlertState::Alerting, now),
            (AlertState::Alerting, false) => self.transition(AlertState::Idle, now),
            _ => {}
        }
    }

    /// Returns `false` when there is no raised alert to acknowledge.
    pub fn acknowledge(&mut self, now: Time, effector: &mut Effector<checkout::Event>) -> bool {
        if self.state != AlertState::Alerting {
            debug!("ignoring acknowledge while {}", self.state);
            return false;
        }

        self.cancel_cooldown();
        self.acknowledged_until = Some(now + self.config.acknowledge_cooldown);
        self.transition(AlertState::Acknowledged, now);

        effector.schedule_in_to_self(
            self.config.acknowledge_cooldown,
            Event::AcknowledgeExpired(self.cycle).into(),
        );

        true
    }

    pub fn expire(&mut self, cycle: u32, now: Time) {
        if cycle != self.cycle || self.state != AlertState::Acknowledged {
            debug!("ignoring stale acknowledge cooldown {}", cycle);
            return;
        }

        self.acknowledged_until = None;

        if self.condition {
            self.transition(AlertState::Alerting, now);
        } else {
            self.transition(AlertState::Idle, now);
        }
    }

    pub fn dismiss(&mut self, now: Time) {
        self.cancel_cooldown();
        self.transition(AlertState::Dismissed, now);
    }

    pub fn reset(&mut self, now: Time) {
        self.cancel_cooldown();
        self.transition(AlertState::Idle, now);
    }

    pub fn set_equipment_target(&mut self, target: u32) {
        self.config.equipment_target = target;
    }
}

impl CheckoutComponent for AlertMonitor {
    fn start(&mut self, _info: StartInfo) -> Effector<checkout::Event> {
        let mut effector = Effector::new();

        effector.schedule_immediately(self.store, checkout::store::Event::Subscribe.into());
        effector.schedule_in_to_self(self.config.poll_interval, Event::Poll.into());

        effector
    }

    fn handle(&mut self, info: HandleInfo, message: checkout::Event) -> Effector<checkout::Event> {
        let mut effector = Effector::new();

        let message: Option<Event> = message.into();
        let now = info.current_time;

        match message {
            Some(Event::Snapshot(records)) => self.observe(records),
            Some(Event::Poll) => {
                self.poll(now);
                effector.schedule_in_to_self(self.config.poll_interval, Event::Poll.into());
            }
            Some(Event::Acknowledge) => {
                self.acknowledge(now, &mut effector);
            }
            Some(Event::AcknowledgeExpired(cycle)) => self.expire(cycle, now),
            Some(Event::Dismiss) => self.dismiss(now),
            Some(Event::Reset) => self.reset(now),
            Some(Event::SetEquipmentTarget(target)) => self.set_equipment_target(target),
            None => {}
        }

        effector
    }

    fn stop(&mut self, info: StopInfo) -> Effector<checkout::Event> {
        let mut effector = Effector::new();

        debug!("alert monitor {} torn down at {}", info.self_address, info.current_time);
        effector.schedule_immediately(self.store, checkout::store::Event::Unsubscribe.into());

        effector
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkout::record::CheckoutStatus;

    fn records(counts: &[u32]) -> Vec<CheckoutRecord> {
        counts
            .iter()
            .enumerate()
            .map(|(i, count)| CheckoutRecord::new(i as u32 + 1, *count, CheckoutStatus::Open, 0))
            .collect()
    }

    fn monitor(policy: AlertPolicy) -> AlertMonitor {
        let config = MonitorConfig {
            policy,
            ..MonitorConfig::default()
        };
        AlertMonitor::new(config, Address::EXTERNAL)
    }

    fn scheduled_cycles(effector: &Effector<checkout::Event>) -> Vec<(Time, u32)> {
        effector
            .events
            .iter()
            .filter_map(|event| match &event.message {
                checkout::Event::MonitorEvent(Event::AcknowledgeExpired(cycle)) => {
                    Some((event.in_time, *cycle))
                }
                _ => None,
            })
            .collect()
    }

    #[test]
    fn critical_queue_policy_ignores_closed_checkouts() {
        let config = MonitorConfig::default();
        let mut closed = records(&[8]);
        closed[0].status = CheckoutStatus::Closed;

        assert!(condition_holds(&config, &records(&[1, 8, 2])));
        assert!(!condition_holds(&config, &records(&[7, 7, 7])));
        assert!(!condition_holds(&config, &closed));
    }

    #[test]
    fn understaffed_policy_compares_open_count_with_target() {
        let config = MonitorConfig {
            policy: AlertPolicy::Understaffed,
            equipment_target: 3,
            ..MonitorConfig::default()
        };

        assert!(condition_holds(&config, &records(&[0, 0])));
        assert!(!condition_holds(&config, &records(&[0, 0, 0])));
    }

    #[test]
    fn poll_raises_and_clears_the_alert() {
        let mut monitor = monitor(AlertPolicy::CriticalQueue);

        monitor.observe(records(&[8, 1]));
        monitor.poll(2000);
        assert_eq!(monitor.state(), AlertState::Alerting);
        assert_eq!(monitor.status().critical_queues, vec![1]);
        assert!(monitor.status().banner_visible);

        monitor.observe(records(&[7, 1]));
        monitor.poll(4000);
        assert_eq!(monitor.state(), AlertState::Idle);
    }

    #[test]
    fn acknowledge_requires_a_raised_alert() {
        let mut monitor = monitor(AlertPolicy::CriticalQueue);
        let mut effector = Effector::new();

        assert!(!monitor.acknowledge(0, &mut effector));
        assert!(effector.is_empty());
        assert_eq!(monitor.state(), AlertState::Idle);
    }

    #[test]
    fn acknowledge_schedules_cooldown_and_reverts_while_condition_holds() {
        let mut monitor = monitor(AlertPolicy::CriticalQueue);
        monitor.observe(records(&[8]));
        monitor.poll(2000);

        let mut effector = Effector::new();
        assert!(monitor.acknowledge(2000, &mut effector));
        assert_eq!(monitor.state(), AlertState::Acknowledged);
        assert_eq!(monitor.status().acknowledged_until, Some(302_000));
        assert!(!monitor.status().banner_visible);

        let cycles = scheduled_cycles(&effector);
        assert_eq!(cycles.len(), 1);
        let (delay, cycle) = cycles[0];
        assert_eq!(delay, 300_000);

        // re-affirming the condition does not touch the cooldown
        monitor.poll(4000);
        assert_eq!(monitor.state(), AlertState::Acknowledged);
        assert_eq!(monitor.status().acknowledged_until, Some(302_000));

        monitor.expire(cycle, 302_000);
        assert_eq!(monitor.state(), AlertState::Alerting);
        assert_eq!(monitor.status().acknowledged_until, None);
    }

    #[test]
    fn cooldown_expiry_goes_idle_when_condition_cleared() {
        let mut monitor = monitor(AlertPolicy::CriticalQueue);
        monitor.observe(records(&[8]));
        monitor.poll(2000);
        let mut effector = Effector::new();
        monitor.acknowledge(2000, &mut effector);
        let (_, cycle) = scheduled_cycles(&effector)[0];

        monitor.observe(records(&[3]));
        monitor.poll(4000);
        assert_eq!(monitor.state(), AlertState::Acknowledged);

        monitor.expire(cycle, 302_000);
        assert_eq!(monitor.state(), AlertState::Idle);
    }

    #[test]
    fn dismissal_sticks_until_reset_and_cancels_cooldown() {
        let mut monitor = monitor(AlertPolicy::CriticalQueue);
        monitor.observe(records(&[8]));
        monitor.poll(2000);
        let mut effector = Effector::new();
        monitor.acknowledge(2000, &mut effector);
        let (_, cycle) = scheduled_cycles(&effector)[0];

        monitor.dismiss(3000);
        monitor.expire(cycle, 302_000);
        assert_eq!(monitor.state(), AlertState::Dismissed);

        monitor.observe(records(&[2]));
        monitor.poll(304_000);
        assert_eq!(monitor.state(), AlertState::Dismissed);
        assert!(!monitor.condition_active());

        monitor.observe(records(&[8]));
        monitor.poll(306_000);
        assert_eq!(monitor.state(), AlertState::Dismissed);
        assert!(monitor.condition_active());

        monitor.reset(307_000);
        assert_eq!(monitor.state(), AlertState::Idle);
        monitor.poll(308_000);
        assert_eq!(monitor.state(), AlertState::Alerting);
    }

    #[test]
    fn equipment_target_change_applies_on_next_poll() {
        let mut monitor = monitor(AlertPolicy::Understaffed);
        monitor.set_equipment_target(2);
        monitor.observe(records(&[0, 0, 0]));
        monitor.poll(2000);
        assert_eq!(monitor.state(), AlertState::Idle);

        monitor.set_equipment_target(4);
        assert_eq!(monitor.state(), AlertState::Idle);

        monitor.poll(4000);
        assert_eq!(monitor.state(), AlertState::Alerting);
        assert_eq!(monitor.status().open_checkouts, 3);
    }
}
