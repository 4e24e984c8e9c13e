use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a component registered in a `DiscreteSystem`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub struct Address(u32);

impl Address {
    /// Sender address used for messages injected from outside the system
    /// (user actions), never handed out to a component.
    pub const EXTERNAL: Address = Address(0);

    pub fn is_external(self) -> bool {
        self == Address::EXTERNAL
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_external() {
            write!(f, "external")
        } else {
            write!(f, "#{}", self.0)
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AddressGenerator {
    curr: u32,
}

impl AddressGenerator {
    pub fn new() -> AddressGenerator {
        AddressGenerator { curr: 1 }
    }

    pub fn next(&mut self) -> Address {
        let addr = Address(self.curr);

        self.curr += 1;

        addr
    }
}

impl Default for AddressGenerator {
    fn default() -> Self {
        AddressGenerator::new()
    }
}
