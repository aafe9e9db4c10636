//! Deferred work on the simulation tick queue
//!
//! Delayed spawns and particle cleanup are queued against a tick number
//! instead of wall-clock timers. A restart cancels everything pending so
//! nothing from a finished round leaks into the next one.

use serde::{Deserialize, Serialize};

use super::world::BodyHandle;

/// Something to do later
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Task {
    /// Offer the next held fruit
    SpawnNext,
    /// Remove cosmetic particles
    RemoveBodies(Vec<BodyHandle>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Scheduled {
    due_tick: u64,
    seq: u64,
    task: Task,
}

/// Tick-ordered task queue
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scheduler {
    pending: Vec<Scheduled>,
    next_seq: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `task` to run once the tick counter reaches `due_tick`
    pub fn schedule(&mut self, due_tick: u64, task: Task) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.push(Scheduled {
            due_tick,
            seq,
            task,
        });
    }

    /// Remove and return every task due at or before `now`, in due order
    /// (ties keep scheduling order).
    pub fn take_due(&mut self, now: u64) -> Vec<Task> {
        let (mut due, rest): (Vec<_>, Vec<_>) =
            self.pending.drain(..).partition(|s| s.due_tick <= now);
        self.pending = rest;
        due.sort_by_key(|s| (s.due_tick, s.seq));
        due.into_iter().map(|s| s.task).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drop every pending task
    pub fn cancel_all(&mut self) {
        if !self.pending.is_empty() {
            log::debug!("Cancelled {} pending tasks", self.pending.len());
        }
        self.pending.clear();
    }
}
