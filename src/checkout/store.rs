use crate::checkout;
use crate::checkout::record::{estimated_wait, CheckoutRecord, CheckoutStatus};
use crate::checkout::CheckoutComponent;
use crate::config::StoreConfig;
use crate::discrete_system::address::Address;
use crate::discrete_system::component::{HandleInfo, StartInfo};
use crate::discrete_system::effector::Effector;
use crate::discrete_system::Time;
use crate::random::seeded_rng;
use log::{debug, trace};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::cmp::min;

/// 1. `QueueStateStore`
///     * On start schedules `Tick` in `tick_interval`
///     * Should accept event `Tick`
///         1) Random walk every open checkout (closed ones never change)
///         2) Send `Snapshot` to every subscriber
///         3) Schedule `Tick` in `tick_interval`
///     * Should accept event `Subscribe`
///         1) Remember the sender
///         2) Send it the current `Snapshot` immediately
///     * Should accept event `Unsubscribe`
///         1) Forget the sender

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Event {
    Tick,
    Subscribe,
    Unsubscribe,
}

impl From<Event> for checkout::Event {
    fn from(event: Event) -> checkout::Event {
        checkout::Event::StoreEvent(event)
    }
}

#[derive(Debug, Serialize)]
pub struct QueueStateStore {
    pub config: StoreConfig,
    checkouts: Vec<CheckoutRecord>,
    subscribers: Vec<Address>,
    ticks: u64,
    #[serde(skip)]
    rng: StdRng,
}

impl QueueStateStore {
    pub fn new(config: StoreConfig, now: Time) -> QueueStateStore {
        let mut rng = seeded_rng(config.seed);
        let checkouts = initialize(&config, &mut rng, now);

        QueueStateStore {
            config,
            checkouts,
            subscribers: Vec::new(),
            ticks: 0,
            rng,
        }
    }

    #[cfg(test)]
    pub fn with_records(config: StoreConfig, checkouts: Vec<CheckoutRecord>) -> QueueStateStore {
        let rng = seeded_rng(config.seed);

        QueueStateStore {
            config,
            checkouts,
            subscribers: Vec::new(),
            ticks: 0,
            rng,
        }
    }

    /// Copy of the current records; changing it never affects the store.
    pub fn snapshot(&self) -> Vec<CheckoutRecord> {
        self.checkouts.clone()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn subscribers(&self) -> &[Address] {
        &self.subscribers
    }

    fn next_waiting_count(&mut self, previous: u32) -> u32 {
        let draw: f64 = self.rng.gen();

        if draw < self.config.increase_probability {
            min(previous.saturating_add(1), self.config.waiting_cap)
        } else if draw < self.config.increase_probability + self.config.decrease_probability {
            previous.saturating_sub(1)
        } else {
            previous
        }
    }

    /// One step of the random walk.
    pub fn tick(&mut self, now: Time) {
        let interval = self.config.tick_interval;
        let stuck_threshold = self.config.stuck_threshold;

        let mut updated = self.checkouts.clone();

        // Closed checkouts keep their state
        for checkout in updated.iter_mut().filter(|c| c.is_open()) {
            let previous = checkout.waiting_count;
            let next = self.next_waiting_count(previous);

            if next >= stuck_threshold && next >= previous {
                checkout.stuck_time += interval;
            } else if next < previous {
                checkout.stuck_time = 0;
            }

            checkout.waiting_count = next;
            checkout.estimated_wait = estimated_wait(next);
            checkout.last_updated = now;
        }

        self.checkouts = updated;
        self.ticks += 1;

        trace!("store tick {} at {}", self.ticks, now);
    }

    fn publish(&self, effector: &mut Effector<checkout::Event>) {
        for subscriber in self.subscribers.iter() {
            effector.schedule_immediately(
                *subscriber,
                checkout::monitor::Event::Snapshot(self.snapshot()).into(),
            );
        }
    }
}

/// Builds the initial records: uniform queue lengths, mostly open checkouts.
pub fn initialize(config: &StoreConfig, rng: &mut impl Rng, now: Time) -> Vec<CheckoutRecord> {
    (1..=config.checkouts)
        .map(|id| {
            let waiting_count = rng.gen_range(0..=config.initial_max_waiting);
            let status = if rng.gen_bool(config.open_probability) {
                CheckoutStatus::Open
            } else {
                CheckoutStatus::Closed
            };

            CheckoutRecord::new(id, waiting_count, status, now)
        })
        .collect()
}

impl CheckoutComponent for QueueStateStore {
    fn start(&mut self, _info: StartInfo) -> Effector<checkout::Event> {
        let mut effector = Effector::new();

        effector.schedule_in_to_self(self.config.tick_interval, Event::Tick.into());

        effector
    }

    fn handle(&mut self, info: HandleInfo, message: checkout::Event) -> Effector<checkout::Event> {
        let mut effector = Effector::new();

        let message: Option<Event> = message.into();

        match message {
            Some(Event::Tick) => {
                self.tick(info.current_time);
                self.publish(&mut effector);

                effector.schedule_in_to_self(self.config.tick_interval, Event::Tick.into());
            }
            Some(Event::Subscribe) => {
                if !self.subscribers.contains(&info.sender_address) {
                    self.subscribers.push(info.sender_address);
                }

                debug!("{} subscribed to the queue store", info.sender_address);

                effector.schedule_immediately(
                    info.sender_address,
                    checkout::monitor::Event::Snapshot(self.snapshot()).into(),
                );
            }
            Some(Event::Unsubscribe) => {
                self.subscribers.retain(|s| *s != info.sender_address);

                debug!("{} unsubscribed from the queue store", info.sender_address);
            }
            None => {}
        }

        effector
    }
}
