use crate::checkout;
use crate::checkout::monitor::{self, AlertMonitor, AlertState, AlertStatus};
use crate::checkout::record::CheckoutRecord;
use crate::checkout::store::QueueStateStore;
use crate::config::{validate_config, AlertPolicy, validate_equipment_target, validate_monitor, DashboardConfig, MonitorConfig};
use crate::discrete_system::address::Address;
use crate::discrete_system::{DiscreteSystem, Event, Time};
use crate::metrics::{AnalyticsReport, MetricsReporter, Period};
use crate::view::{self, ViewKind, ViewModel};
use failure::{Error, Fail};
use log::{info, warn};

pub type CheckoutSystem = DiscreteSystem<checkout::Event, checkout::Component>;
pub type CheckoutEvent = Event<checkout::Event>;

#[derive(Debug, Fail)]
pub enum DashboardError {
    #[fail(display = "there is no alert to acknowledge, the monitor is {}", _0)]
    NotAlerting(AlertState),
    #[fail(display = "{}", _0)]
    InvalidEquipmentTarget(String),
    #[fail(display = "the {:?} alert policy does not use an equipment target", _0)]
    TargetUnused(AlertPolicy),
    #[fail(display = "no alert monitor is attached")]
    NoMonitor,
    #[fail(display = "component {} is not an alert monitor", _0)]
    NotAMonitor(Address),
}

/// One monitoring session: the queue store, the alert monitors reading it
/// and the analytics generator. Nothing here is global; every consumer gets
/// the dashboard passed in.
pub struct Dashboard {
    pub config: DashboardConfig,
    system: CheckoutSystem,
    store: Address,
    monitor: Option<Address>,
    reporter: MetricsReporter,
}

impl Dashboard {
    pub fn bootstrap(config: DashboardConfig) -> Result<Dashboard, Error> {
        validate_config(&config)?;

        let mut system = CheckoutSystem::new();

        let store = system.register_component(QueueStateStore::new(config.store.clone(), 0).into());
        let primary =
            system.register_component(AlertMonitor::new(config.monitor.clone(), store).into());

        system.start();

        info!(
            "dashboard started with {} checkouts, alert policy {:?}",
            config.store.checkouts, config.monitor.policy
        );

        Ok(Dashboard {
            reporter: MetricsReporter::new(&config.analytics),
            config,
            system,
            store,
            monitor: Some(primary),
        })
    }

    pub fn now(&self) -> Time {
        self.system.current_time
    }

    pub fn system(&self) -> &CheckoutSystem {
        &self.system
    }

    /// Runs every store tick and monitor poll due up to `time` and returns
    /// how many messages that took.
    pub fn advance_to(&mut self, time: Time) -> usize {
        self.system.run_until(time)
    }

    /// Handles the next batch of simultaneous events.
    pub fn step(&mut self) -> Vec<CheckoutEvent> {
        self.system.tick()
    }

    pub fn next_event_time(&self) -> Option<Time> {
        self.system.next_event_time()
    }

    pub fn snapshot(&self) -> Vec<CheckoutRecord> {
        match self.system.component(self.store).and_then(|c| c.as_store()) {
            Some(store) => store.snapshot(),
            None => {
                warn!("queue store {} is missing", self.store);
                Vec::new()
            }
        }
    }

    pub fn store_address(&self) -> Address {
        self.store
    }

    pub fn monitor_address(&self) -> Option<Address> {
        self.monitor
    }

    fn monitor_at(&self, address: Address) -> Result<&AlertMonitor, DashboardError> {
        self.system
            .component(address)
            .and_then(|c| c.as_monitor())
            .ok_or(DashboardError::NotAMonitor(address))
    }

    fn primary_monitor(&self) -> Result<(Address, &AlertMonitor), DashboardError> {
        let address = self.monitor.ok_or(DashboardError::NoMonitor)?;

        Ok((address, self.monitor_at(address)?))
    }

    pub fn alert_status(&self) -> Option<AlertStatus> {
        self.primary_monitor().ok().map(|(_, monitor)| monitor.status())
    }

    pub fn alert_status_of(&self, address: Address) -> Result<AlertStatus, DashboardError> {
        Ok(self.monitor_at(address)?.status())
    }

    /// Starts an additional monitor on the shared store. The first attached
    /// monitor becomes the one user actions go to.
    pub fn attach_monitor(&mut self, config: MonitorConfig) -> Result<Address, Error> {
        validate_monitor(&config)?;

        let address = self
            .system
            .spawn_component(AlertMonitor::new(config, self.store).into());
        let now = self.now();
        self.system.run_until(now);

        if self.monitor.is_none() {
            self.monitor = Some(address);
        }

        Ok(address)
    }

    /// Tears a monitor down: it leaves the store's subscribers and its poll
    /// and cooldown timers are cancelled.
    pub fn detach_monitor(&mut self, address: Address) -> Result<(), DashboardError> {
        self.monitor_at(address)?;

        self.system.remove_component(address);
        let now = self.now();
        self.system.run_until(now);

        if self.monitor == Some(address) {
            self.monitor = None;
        }

        Ok(())
    }

    fn send_to_monitor(&mut self, message: monitor::Event) -> Result<AlertStatus, DashboardError> {
        let (address, _) = self.primary_monitor()?;

        self.system.inject(address, message.into());
        let now = self.now();
        self.system.run_until(now);

        self.alert_status_of(address)
    }

    pub fn acknowledge_alert(&mut self) -> Result<AlertStatus, DashboardError> {
        let state = self.primary_monitor()?.1.state();

        if state != AlertState::Alerting {
            return Err(DashboardError::NotAlerting(state));
        }

        self.send_to_monitor(monitor::Event::Acknowledge)
    }

    pub fn dismiss_alert(&mut self) -> Result<AlertStatus, DashboardError> {
        self.send_to_monitor(monitor::Event::Dismiss)
    }

    pub fn reset_alert(&mut self) -> Result<AlertStatus, DashboardError> {
        self.send_to_monitor(monitor::Event::Reset)
    }

    pub fn set_equipment_target(&mut self, target: u32) -> Result<AlertStatus, DashboardError> {
        if let Err(error) = validate_equipment_target(target) {
            warn!("rejected equipment target {}: {}", target, error);
            return Err(DashboardError::InvalidEquipmentTarget(error.to_string()));
        }

        let policy = self.primary_monitor()?.1.policy();
        if policy != AlertPolicy::Understaffed {
            warn!("ignored equipment target {} under the {:?} policy", target, policy);
            return Err(DashboardError::TargetUnused(policy));
        }

        self.send_to_monitor(monitor::Event::SetEquipmentTarget(target))
    }

    pub fn view(&self, kind: ViewKind) -> ViewModel {
        view::build(
            kind,
            &self.snapshot(),
            &self.config.priority,
            self.alert_status(),
            self.now(),
        )
    }

    pub fn analytics(&mut self, period: Period) -> AnalyticsReport {
        self.reporter.report(period)
    }

    /// Human readable name of a component, for the event log.
    pub fn describe(&self, address: Address) -> String {
        if address.is_external() {
            return "User".to_string();
        }

        match self.system.component(address) {
            Some(checkout::Component::Store(_)) => format!("Store({})", address),
            Some(checkout::Component::Monitor(_)) => format!("Monitor({})", address),
            None => format!("Gone({})", address),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(seed: u64) -> DashboardConfig {
        let mut config = DashboardConfig::default();
        config.store.seed = Some(seed);
        config.analytics.seed = Some(seed);
        config
    }

    fn understaffed(seed: u64, target: u32) -> DashboardConfig {
        let mut config = config(seed);
        config.store.open_probability = 1.0;
        config.monitor.policy = AlertPolicy::Understaffed;
        config.monitor.equipment_target = target;
        config
    }

    #[test]
    fn bootstrap_rejects_invalid_config() {
        let mut bad = config(1);
        bad.store.checkouts = 0;

        assert!(Dashboard::bootstrap(bad).is_err());
    }

    #[test]
    fn store_ticks_and_monitor_polls_on_their_own_intervals() {
        let mut dashboard = Dashboard::bootstrap(config(2)).unwrap();

        let handled = dashboard.advance_to(12_000);

        let ticks = dashboard
            .system()
            .component(dashboard.store_address())
            .and_then(|c| c.as_store())
            .map(|s| s.ticks());
        assert_eq!(ticks, Some(4));
        // 4 ticks, each publishing one snapshot, and 6 polls
        assert_eq!(handled, 4 + 4 + 6);

        let records = dashboard.snapshot();
        assert_eq!(records.len(), 12);
        assert!(records.iter().all(|r| r.waiting_count <= 8));
        assert!(records.iter().filter(|r| r.is_open()).all(|r| r.last_updated == 12_000));
    }

    #[test]
    fn monitor_receives_a_snapshot_on_subscribe() {
        let dashboard = Dashboard::bootstrap(understaffed(3, 15)).unwrap();

        let status = dashboard.alert_status().unwrap();

        assert_eq!(status.open_checkouts, 12);
        assert_eq!(status.state, AlertState::Idle);
    }

    #[test]
    fn raising_equipment_target_alerts_on_next_poll() {
        let mut dashboard = Dashboard::bootstrap(understaffed(4, 12)).unwrap();
        dashboard.advance_to(2000);
        assert_eq!(dashboard.alert_status().unwrap().state, AlertState::Idle);

        let status = dashboard.set_equipment_target(13).unwrap();
        assert_eq!(status.state, AlertState::Idle);
        assert_eq!(status.equipment_target, 13);

        dashboard.advance_to(4000);
        assert_eq!(dashboard.alert_status().unwrap().state, AlertState::Alerting);
    }

    #[test]
    fn invalid_equipment_target_changes_nothing() {
        let mut dashboard = Dashboard::bootstrap(understaffed(5, 12)).unwrap();

        assert!(matches!(
            dashboard.set_equipment_target(0),
            Err(DashboardError::InvalidEquipmentTarget(_))
        ));
        assert!(dashboard.set_equipment_target(51).is_err());
        assert_eq!(dashboard.alert_status().unwrap().equipment_target, 12);
    }

    #[test]
    fn equipment_target_is_refused_when_queues_raise_the_alert() {
        let mut dashboard = Dashboard::bootstrap(config(12)).unwrap();
        let before = dashboard.alert_status().unwrap();

        assert!(matches!(
            dashboard.set_equipment_target(50),
            Err(DashboardError::TargetUnused(AlertPolicy::CriticalQueue))
        ));

        let after = dashboard.alert_status().unwrap();
        assert_eq!(after.equipment_target, before.equipment_target);
        assert_eq!(after.state, before.state);
    }

    #[test]
    fn acknowledged_alert_comes_back_after_cooldown() {
        let mut dashboard = Dashboard::bootstrap(understaffed(6, 50)).unwrap();

        assert!(matches!(
            dashboard.acknowledge_alert(),
            Err(DashboardError::NotAlerting(AlertState::Idle))
        ));

        dashboard.advance_to(2000);
        assert_eq!(dashboard.alert_status().unwrap().state, AlertState::Alerting);

        let status = dashboard.acknowledge_alert().unwrap();
        assert_eq!(status.state, AlertState::Acknowledged);
        assert_eq!(status.acknowledged_until, Some(302_000));

        dashboard.advance_to(301_999);
        assert_eq!(dashboard.alert_status().unwrap().state, AlertState::Acknowledged);

        dashboard.advance_to(302_000);
        assert_eq!(dashboard.alert_status().unwrap().state, AlertState::Alerting);
    }

    #[test]
    fn dismissal_survives_cooldown_until_reset() {
        let mut dashboard = Dashboard::bootstrap(understaffed(7, 50)).unwrap();
        dashboard.advance_to(2000);
        dashboard.acknowledge_alert().unwrap();

        let status = dashboard.dismiss_alert().unwrap();
        assert_eq!(status.state, AlertState::Dismissed);
        assert!(!status.banner_visible);

        dashboard.advance_to(400_000);
        let status = dashboard.alert_status().unwrap();
        assert_eq!(status.state, AlertState::Dismissed);
        assert!(status.condition_active);

        dashboard.reset_alert().unwrap();
        dashboard.advance_to(402_000);
        assert_eq!(dashboard.alert_status().unwrap().state, AlertState::Alerting);
    }

    #[test]
    fn detaching_a_monitor_cancels_its_timers() {
        let mut dashboard = Dashboard::bootstrap(understaffed(8, 50)).unwrap();
        let second = dashboard.attach_monitor(dashboard.config.monitor.clone()).unwrap();
        let primary = dashboard.monitor_address().unwrap();
        dashboard.advance_to(2000);
        dashboard.acknowledge_alert().unwrap();

        let subscribers = |d: &Dashboard| {
            d.system()
                .component(d.store_address())
                .and_then(|c| c.as_store())
                .map(|s| s.subscribers().len())
                .unwrap_or(0)
        };
        assert_eq!(subscribers(&dashboard), 2);
        assert!(dashboard.system().pending_for(primary) >= 2);

        dashboard.detach_monitor(primary).unwrap();

        assert_eq!(dashboard.system().pending_for(primary), 0);
        assert_eq!(subscribers(&dashboard), 1);
        assert!(dashboard.alert_status().is_none());
        assert!(matches!(dashboard.acknowledge_alert(), Err(DashboardError::NoMonitor)));

        dashboard.advance_to(20_000);
        assert!(dashboard.alert_status_of(second).unwrap().state == AlertState::Alerting);
        assert!(matches!(
            dashboard.detach_monitor(dashboard.store_address()),
            Err(DashboardError::NotAMonitor(_))
        ));
    }

    #[test]
    fn views_share_the_same_derived_data() {
        let mut dashboard = Dashboard::bootstrap(config(9)).unwrap();
        dashboard.advance_to(30_000);

        let dashboard_view = dashboard.view(ViewKind::Dashboard);
        let compact_view = dashboard.view(ViewKind::Compact);

        let ids = |m: &ViewModel| m.entries.iter().map(|e| e.record.id).collect::<Vec<_>>();
        assert_eq!(ids(&dashboard_view), ids(&compact_view));
        assert_eq!(dashboard_view.time, 30_000);
        assert!(dashboard_view.alert.is_some());
    }

    #[test]
    fn analytics_are_regenerated_per_request() {
        let mut dashboard = Dashboard::bootstrap(config(10)).unwrap();

        let first = dashboard.analytics(Period::Week);
        let second = dashboard.analytics(Period::Week);

        assert_eq!(first.series.len(), 7);
        assert_ne!(first, second);
    }

    #[test]
    fn describe_names_components() {
        let dashboard = Dashboard::bootstrap(config(11)).unwrap();

        assert_eq!(dashboard.describe(Address::EXTERNAL), "User");
        assert!(dashboard.describe(dashboard.store_address()).starts_with("Store("));
        assert!(dashboard
            .describe(dashboard.monitor_address().unwrap())
            .starts_with("Monitor("));
    }
}
