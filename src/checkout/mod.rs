use crate::discrete_system::component::{Component as SystemComponent, HandleInfo, StartInfo, StopInfo};
use crate::discrete_system::effector::Effector;
use serde::{Deserialize, Serialize};

pub mod monitor;
pub mod priority;
pub mod record;
pub mod store;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Event {
    StoreEvent(store::Event),
    MonitorEvent(monitor::Event),
}

impl From<Event> for Option<store::Event> {
    fn from(event: Event) -> Option<store::Event> {
        match event {
            Event::StoreEvent(event) => Some(event),
            _ => None,
        }
    }
}

impl From<Event> for Option<monitor::Event> {
    fn from(event: Event) -> Option<monitor::Event> {
        match event {
            Event::MonitorEvent(event) => Some(event),
            _ => None,
        }
    }
}

impl Event {
    pub fn label(&self) -> &'static str {
        match self {
            Event::StoreEvent(store::Event::Tick) => "Tick",
            Event::StoreEvent(store::Event::Subscribe) => "Subscribe",
            Event::StoreEvent(store::Event::Unsubscribe) => "Unsubscribe",
            Event::MonitorEvent(monitor::Event::Poll) => "Poll",
            Event::MonitorEvent(monitor::Event::Snapshot(_)) => "Snapshot",
            Event::MonitorEvent(monitor::Event::Acknowledge) => "Acknowledge",
            Event::MonitorEvent(monitor::Event::AcknowledgeExpired(_)) => "Acknowledge expired",
            Event::MonitorEvent(monitor::Event::Dismiss) => "Dismiss",
            Event::MonitorEvent(monitor::Event::Reset) => "Reset",
            Event::MonitorEvent(monitor::Event::SetEquipmentTarget(_)) => "Set equipment target",
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum Component {
    Store(store::QueueStateStore),
    Monitor(monitor::AlertMonitor),
}

impl From<store::QueueStateStore> for Component {
    fn from(store: store::QueueStateStore) -> Component {
        Component::Store(store)
    }
}

impl From<monitor::AlertMonitor> for Component {
    fn from(monitor: monitor::AlertMonitor) -> Component {
        Component::Monitor(monitor)
    }
}

impl Component {
    pub fn as_store(&self) -> Option<&store::QueueStateStore> {
        match self {
            Component::Store(store) => Some(store),
            _ => None,
        }
    }

    pub fn as_monitor(&self) -> Option<&monitor::AlertMonitor> {
        match self {
            Component::Monitor(monitor) => Some(monitor),
            _ => None,
        }
    }
}

trait CheckoutComponent {
    fn start(&mut self, info: StartInfo) -> Effector<Event>;
    fn handle(&mut self, info: HandleInfo, message: Event) -> Effector<Event>;

    fn stop(&mut self, _info: StopInfo) -> Effector<Event> {
        Effector::new()
    }
}

impl SystemComponent<Event> for Component {
    fn start(&mut self, info: StartInfo) -> Effector<Event> {
        match self {
            Component::Store(store) => store.start(info),
            Component::Monitor(monitor) => monitor.start(info),
        }
    }

    fn handle(&mut self, info: HandleInfo, message: Event) -> Effector<Event> {
        match self {
            Component::Store(store) => store.handle(info, message),
            Component::Monitor(monitor) => monitor.handle(info, message),
        }
    }

    fn stop(&mut self, info: StopInfo) -> Effector<Event> {
        match self {
            Component::Store(store) => store.stop(info),
            Component::Monitor(monitor) => monitor.stop(info),
        }
    }
}
