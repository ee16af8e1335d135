// Copyright SymDIVINE Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracking and termination of spawned children.
//!
//! Children are registered by pid when spawned and removed once reaped.
//! Termination escalates SIGINT, SIGTERM, SIGKILL, and targets both the
//! pid and its process group: the compile/transform/verify pipeline may
//! have spawned grandchildren.

use std::sync::Mutex;
use std::thread;
use std::time::Duration;

/// Grace period between escalation rounds.
const ESCALATION_GRACE: Duration = Duration::from_millis(100);

#[derive(Debug, Default)]
pub struct ChildRegistry {
    pids: Mutex<Vec<u32>>,
}

impl ChildRegistry {
    pub fn new() -> Self {
        ChildRegistry::default()
    }

    pub fn track(&self, pid: u32) {
        self.pids.lock().unwrap().push(pid);
    }

    pub fn untrack(&self, pid: u32) {
        self.pids.lock().unwrap().retain(|p| *p != pid);
    }

    /// Terminate every tracked child. Used at the end of a run and when
    /// the consumer of our output goes away.
    pub fn terminate_all(&self) {
        let pids: Vec<u32> = self.pids.lock().unwrap().drain(..).collect();
        if !pids.is_empty() {
            escalate(&pids);
        }
    }

    /// Terminate a single child, leaving it registered until it is reaped.
    pub fn terminate_one(&self, pid: u32) {
        escalate(&[pid]);
    }

    #[cfg(test)]
    fn tracked(&self) -> Vec<u32> {
        self.pids.lock().unwrap().clone()
    }
}

#[cfg(unix)]
fn escalate(pids: &[u32]) {
    for (round, signal) in [libc::SIGINT, libc::SIGTERM, libc::SIGKILL].into_iter().enumerate() {
        if round > 0 {
            thread::sleep(ESCALATION_GRACE);
        }
        for &pid in pids {
            send(pid, signal);
        }
    }
}

#[cfg(unix)]
fn send(pid: u32, signal: libc::c_int) {
    let Ok(pid) = i32::try_from(pid) else {
        return;
    };
    unsafe {
        // Group first, then the child itself; either may already be gone.
        let _ = libc::kill(-pid, signal);
        let _ = libc::kill(pid, signal);
    }
}

#[cfg(not(unix))]
fn escalate(_pids: &[u32]) {}
