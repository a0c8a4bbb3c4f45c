// 10.0: reentrancy guard. held for the whole of every mutating market entry point, which
// includes the window where the collateral ledger is called. a nested entry while it is held
// is rejected instead of observing half-applied state.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("reentrant call rejected")]
pub struct Reentered;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReentrancyGuard {
    locked: bool,
}

impl ReentrancyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn acquire(&mut self) -> Result<(), Reentered> {
        if self.locked {
            return Err(Reentered);
        }
        self.locked = true;
        Ok(())
    }

    pub fn release(&mut self) {
        self.locked = false;
    }
}
