use crate::discrete_system::address::{Address, AddressGenerator};
use crate::discrete_system::component::{Component, HandleInfo, StartInfo, StopInfo};
use crate::discrete_system::effector::{Effector, ScheduledEventAddress};
use log::{debug, warn};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

pub mod address;
pub mod component;
pub mod effector;

/// Logical time in milliseconds since the system was created.
pub type Time = u64;

pub trait DiscreteSystemMessage: Clone {}
impl<T: Clone> DiscreteSystemMessage for T {}

#[derive(Debug, Clone, Serialize)]
pub struct Event<M: DiscreteSystemMessage> {
    pub time: Time,
    sequence: u64,
    pub to_address: Address,
    pub from_address: Address,
    pub message: M,
}

impl<M: DiscreteSystemMessage> PartialEq for Event<M> {
    fn eq(&self, other: &Event<M>) -> bool {
        self.time == other.time && self.sequence == other.sequence
    }
}

impl<M: DiscreteSystemMessage> Eq for Event<M> {}

impl<M: DiscreteSystemMessage> PartialOrd for Event<M> {
    fn partial_cmp(&self, other: &Event<M>) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// `BinaryHeap` is a max-heap: the earliest event (and, at equal times, the
// first scheduled one) must compare greatest.
impl<M: DiscreteSystemMessage> Ord for Event<M> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .cmp(&self.time)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

/// `DiscreteSystem` owns a set of components and the timeline of messages
/// they send to each other. Periodic work is expressed by a component
/// re-scheduling a message to itself; cancelling it means removing the
/// component (or ignoring a stale message on arrival).
#[derive(Serialize)]
pub struct DiscreteSystem<M: DiscreteSystemMessage, C: Component<M>> {
    pub current_time: Time,
    pub components: HashMap<Address, C>,
    events: BinaryHeap<Event<M>>,
    #[serde(skip)]
    address_generator: AddressGenerator,
    #[serde(skip)]
    next_sequence: u64,
}

impl<M: DiscreteSystemMessage, C: Component<M>> DiscreteSystem<M, C> {
    pub fn new() -> DiscreteSystem<M, C> {
        DiscreteSystem {
            current_time: 0,
            components: HashMap::new(),
            events: BinaryHeap::new(),
            address_generator: AddressGenerator::new(),
            next_sequence: 0,
        }
    }

    pub fn register_component(&mut self, c: C) -> Address {
        let addr = self.address_generator.next();

        self.components.insert(addr, c);

        addr
    }

    /// Registers a component on an already running system and starts it.
    pub fn spawn_component(&mut self, c: C) -> Address {
        let addr = self.register_component(c);

        self.start_component(addr);

        addr
    }

    /// Removes a component and cancels every pending message addressed to it.
    pub fn remove_component(&mut self, address: Address) -> Option<C> {
        let mut component = self.components.remove(&address)?;

        let effector = component.stop(StopInfo {
            self_address: address,
            current_time: self.current_time,
        });

        self.apply_effector(address, effector);

        let before = self.events.len();
        self.events.retain(|event| event.to_address != address);
        debug!(
            "removed component {} and cancelled {} pending event(s)",
            address,
            before - self.events.len()
        );

        Some(component)
    }

    pub fn component(&self, address: Address) -> Option<&C> {
        self.components.get(&address)
    }

    fn start_component(&mut self, address: Address) {
        let current_time = self.current_time;

        let effector = match self.components.get_mut(&address) {
            Some(component) => component.start(StartInfo {
                self_address: address,
                current_time,
            }),
            None => {
                warn!("cannot start unknown component {}", address);
                return;
            }
        };

        self.apply_effector(address, effector);
    }

    fn push_event(&mut self, from_address: Address, to_address: Address, in_time: Time, message: M) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        self.events.push(Event {
            time: self.current_time + in_time,
            sequence,
            to_address,
            from_address,
            message,
        });
    }

    fn apply_effector(&mut self, from_address: Address, effector: Effector<M>) {
        for event in effector.events.into_iter() {
            let to_address = match event.address {
                ScheduledEventAddress::SelfAddress => from_address,
                ScheduledEventAddress::RemoteAddress(remote) => remote,
            };

            self.push_event(from_address, to_address, event.in_time, event.message);
        }
    }

    /// Delivers a message from outside the system at the current time. It is
    /// handled by the next `tick`/`run_until`.
    pub fn inject(&mut self, to_address: Address, message: M) {
        self.push_event(Address::EXTERNAL, to_address, 0, message);
    }

    /// Advances to the next point in time that has pending messages and
    /// handles all of them, including the ones scheduled immediately while
    /// handling.
    pub fn tick(&mut self) -> Vec<Event<M>> {
        let mut events = Vec::new();

        let next_time = match self.events.peek() {
            Some(event) => event.time,
            None => return events,
        };

        self.current_time = next_time;

        while self
            .events
            .peek()
            .map_or(false, |event| event.time == self.current_time)
        {
            let event = match self.events.pop() {
                Some(event) => event,
                None => break,
            };

            let current_time = self.current_time;
            let effector = match self.components.get_mut(&event.to_address) {
                Some(component) => component.handle(
                    HandleInfo {
                        self_address: event.to_address,
                        sender_address: event.from_address,
                        current_time,
                    },
                    event.message.clone(),
                ),
                None => {
                    debug!(
                        "dropping message from {} to missing component {}",
                        event.from_address, event.to_address
                    );
                    continue;
                }
            };

            self.apply_effector(event.to_address, effector);

            events.push(event);
        }

        events
    }

    /// Handles every message due at or before `time`, then moves the clock
    /// to `time`. Never moves the clock backwards. Returns the number of
    /// messages handled; the messages themselves are not kept.
    pub fn run_until(&mut self, time: Time) -> usize {
        let mut handled = 0;

        while self.next_event_time().map_or(false, |next| next <= time) {
            handled += self.tick().len();
        }

        if time > self.current_time {
            self.current_time = time;
        }

        handled
    }

    pub fn start(&mut self) {
        let mut addresses: Vec<_> = self.components.keys().cloned().collect();
        addresses.sort();

        addresses
            .into_iter()
            .for_each(|address| self.start_component(address));

        if self.next_event_time() == Some(self.current_time) {
            self.tick();
        }
    }

    pub fn has_events(&self) -> bool {
        !self.events.is_empty()
    }

    pub fn next_event_time(&self) -> Option<Time> {
        self.events.peek().map(|event| event.time)
    }

    pub fn pending_for(&self, address: Address) -> usize {
        self.events
            .iter()
            .filter(|event| event.to_address == address)
            .count()
    }
}

impl<M: DiscreteSystemMessage, C: Component<M>> Default for DiscreteSystem<M, C> {
    fn default() -> Self {
        DiscreteSystem::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Ping {
        Beat,
        Hello(u32),
    }

    /// Beats every `period` and remembers everything it received.
    struct Metronome {
        period: Time,
        received: Vec<(Time, Ping)>,
        farewell_to: Option<Address>,
    }

    impl Metronome {
        fn new(period: Time) -> Metronome {
            Metronome {
                period,
                received: Vec::new(),
                farewell_to: None,
            }
        }
    }

    impl Component<Ping> for Metronome {
        fn start(&mut self, _info: StartInfo) -> Effector<Ping> {
            let mut effector = Effector::new();
            effector.schedule_in_to_self(self.period, Ping::Beat);
            effector
        }

        fn handle(&mut self, info: HandleInfo, message: Ping) -> Effector<Ping> {
            let mut effector = Effector::new();
            if message == Ping::Beat {
                effector.schedule_in_to_self(self.period, Ping::Beat);
            }
            self.received.push((info.current_time, message));
            effector
        }

        fn stop(&mut self, _info: StopInfo) -> Effector<Ping> {
            let mut effector = Effector::new();
            if let Some(to) = self.farewell_to {
                effector.schedule_immediately(to, Ping::Hello(0));
            }
            effector
        }
    }

    #[test]
    fn run_until_handles_every_due_beat() {
        let mut system: DiscreteSystem<Ping, Metronome> = DiscreteSystem::new();
        let fast = system.register_component(Metronome::new(2000));
        let slow = system.register_component(Metronome::new(3000));
        system.start();

        system.run_until(6000);

        assert_eq!(system.current_time, 6000);
        assert_eq!(system.component(fast).map(|c| c.received.len()), Some(3));
        assert_eq!(system.component(slow).map(|c| c.received.len()), Some(2));
    }

    #[test]
    fn run_until_moves_clock_without_events() {
        let mut system: DiscreteSystem<Ping, Metronome> = DiscreteSystem::new();
        system.register_component(Metronome::new(10_000));
        system.start();

        assert_eq!(system.run_until(500), 0);
        assert_eq!(system.current_time, 500);

        system.run_until(100);
        assert_eq!(system.current_time, 500);
    }

    #[test]
    fn same_time_messages_are_handled_in_scheduling_order() {
        let mut system: DiscreteSystem<Ping, Metronome> = DiscreteSystem::new();
        let target = system.register_component(Metronome::new(1_000_000));
        system.start();

        for n in 0..5 {
            system.inject(target, Ping::Hello(n));
        }
        let events = system.tick();

        let order: Vec<_> = events.iter().map(|e| e.message.clone()).collect();
        assert_eq!(
            order,
            (0..5).map(Ping::Hello).collect::<Vec<_>>()
        );
        assert!(events.iter().all(|e| e.from_address == Address::EXTERNAL));
    }

    #[test]
    fn removing_a_component_cancels_its_timers() {
        let mut system: DiscreteSystem<Ping, Metronome> = DiscreteSystem::new();
        let keep = system.register_component(Metronome::new(1000));
        let gone = system.register_component(Metronome::new(1000));
        system.start();
        system.run_until(1500);

        assert_eq!(system.pending_for(gone), 1);
        let removed = system.remove_component(gone);

        assert!(removed.is_some());
        assert_eq!(system.pending_for(gone), 0);
        assert_eq!(system.pending_for(keep), 1);

        system.run_until(5000);
        assert_eq!(system.component(keep).map(|c| c.received.len()), Some(5));
        assert!(system.component(gone).is_none());
    }

    #[test]
    fn stop_hook_messages_reach_other_components() {
        let mut system: DiscreteSystem<Ping, Metronome> = DiscreteSystem::new();
        let listener = system.register_component(Metronome::new(1_000_000));
        let mut leaving = Metronome::new(1_000_000);
        leaving.farewell_to = Some(listener);
        let leaving = system.register_component(leaving);
        system.start();

        system.remove_component(leaving);
        system.run_until(system.current_time);

        let received = system
            .component(listener)
            .map(|c| c.received.clone())
            .unwrap_or_default();
        assert_eq!(received, vec![(0, Ping::Hello(0))]);
    }

    #[test]
    fn messages_to_missing_components_are_skipped() {
        let mut system: DiscreteSystem<Ping, Metronome> = DiscreteSystem::new();
        let only = system.register_component(Metronome::new(1_000_000));
        system.start();

        system.inject(only, Ping::Hello(1));
        system.remove_component(only);
        system.inject(only, Ping::Hello(2));

        assert!(system.tick().is_empty());
        assert!(!system.has_events());
    }
}
