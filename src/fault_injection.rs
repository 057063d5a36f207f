use std::{collections::HashMap, time::Duration};

use parking_lot::Mutex;

use crate::errors::FollowPathError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FaultPoint {
    Ping,
    LookupId,
    LookupUsername,
    FetchFollowing,
}

struct FaultEntry {
    remaining: usize,
}

#[derive(Default)]
struct FaultState {
    entries: HashMap<FaultPoint, FaultEntry>,
    unreachable: bool,
    latency: Option<Duration>,
}

/// Store faults scoped to one store instance (and the connections cloned
/// from it). Nothing here is process-wide.
#[derive(Default)]
pub struct FaultPlan {
    state: Mutex<FaultState>,
}

impl FaultPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&self) {
        let mut guard = self.state.lock();
        guard.entries.clear();
        guard.unreachable = false;
        guard.latency = None;
    }

    /// Fails the next `failures` calls at `point`.
    pub fn configure(&self, point: FaultPoint, failures: usize) {
        let mut guard = self.state.lock();
        if failures == 0 {
            guard.entries.remove(&point);
        } else {
            guard.entries.insert(
                point,
                FaultEntry {
                    remaining: failures,
                },
            );
        }
    }

    /// Every call fails while set.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.state.lock().unreachable = unreachable;
    }

    /// Delay applied before every store call.
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.state.lock().latency = latency;
    }

    pub fn latency(&self) -> Option<Duration> {
        self.state.lock().latency
    }

    pub fn check(&self, point: FaultPoint) -> Result<(), FollowPathError> {
        let mut guard = self.state.lock();
        if guard.unreachable {
            return Err(FollowPathError::connection(format!(
                "store unreachable at {point:?}"
            )));
        }
        if let Some(entry) = guard.entries.get_mut(&point)
            && entry.remaining > 0
        {
            entry.remaining -= 1;
            if entry.remaining == 0 {
                guard.entries.remove(&point);
            }
            return Err(FollowPathError::fault_injection(format!("{point:?}")));
        }
        Ok(())
    }
}
