use crate::discrete_system::address::Address;
use crate::discrete_system::effector::Effector;
use crate::discrete_system::{DiscreteSystemMessage, Time};

pub struct StartInfo {
    pub self_address: Address,
    pub current_time: Time,
}

pub struct HandleInfo {
    pub self_address: Address,
    pub sender_address: Address,
    pub current_time: Time,
}

pub struct StopInfo {
    pub self_address: Address,
    pub current_time: Time,
}

/// A participant of the simulation. Components never touch each other
/// directly, every interaction is a message scheduled through an `Effector`.
pub trait Component<M: DiscreteSystemMessage>: Sized {
    fn start(&mut self, info: StartInfo) -> Effector<M>;
    fn handle(&mut self, info: HandleInfo, message: M) -> Effector<M>;

    /// Called once when the component is removed from the system. Messages
    /// scheduled here are still delivered to other components, anything
    /// addressed back to the stopped component is dropped.
    fn stop(&mut self, _info: StopInfo) -> Effector<M> {
        Effector::new()
    }
}
