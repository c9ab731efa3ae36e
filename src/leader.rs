//! Leadership seam for the idle cleaner
//!
//! The election protocol itself runs outside this crate; only the boolean
//! capability is consumed. The cleaner loop keeps ticking regardless and
//! skips the sweep body while not leader, so a replica that wins an election
//! starts sweeping on its next tick without restart.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub trait LeaderGate: Send + Sync {
    fn is_leader(&self) -> bool;
}

/// Flag-backed gate for tests and single-replica deployments.
pub struct StaticGate {
    leader: AtomicBool,
}

impl StaticGate {
    pub fn new(leader: bool) -> Arc<Self> {
        Arc::new(Self {
            leader: AtomicBool::new(leader),
        })
    }

    pub fn set_leader(&self, leader: bool) {
        self.leader.store(leader, Ordering::SeqCst);
    }
}

impl LeaderGate for StaticGate {
    fn is_leader(&self) -> bool {
        self.leader.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_gate_toggles() {
        let gate = StaticGate::new(false);
        assert!(!gate.is_leader());
        gate.set_leader(true);
        assert!(gate.is_leader());
    }
}
