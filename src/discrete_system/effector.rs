use crate::discrete_system::address::Address;
use crate::discrete_system::{DiscreteSystemMessage, Time};

pub enum ScheduledEventAddress {
    SelfAddress,
    RemoteAddress(Address),
}

pub struct ScheduledEvent<M> {
    pub message: M,
    pub in_time: Time,
    pub address: ScheduledEventAddress,
}

/// Collects the side effects of a component reacting to a message.
pub struct Effector<M: DiscreteSystemMessage> {
    pub events: Vec<ScheduledEvent<M>>,
}

impl<M: DiscreteSystemMessage> Effector<M> {
    pub fn new() -> Effector<M> {
        Effector { events: Vec::new() }
    }

    pub fn schedule_immediately(&mut self, address: Address, message: M) {
        self.events.push(ScheduledEvent {
            in_time: 0,
            message,
            address: ScheduledEventAddress::RemoteAddress(address),
        })
    }

    pub fn schedule_in_to_self(&mut self, in_time: Time, message: M) {
        self.events.push(ScheduledEvent {
            in_time,
            message,
            address: ScheduledEventAddress::SelfAddress,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl<M: DiscreteSystemMessage> Default for Effector<M> {
    fn default() -> Self {
        Effector::new()
    }
}
