//! Event loop
//!
//! Two job queues and a timer registry on a virtual clock. The microtask queue
//! always drains before the callback queue. Host timers (program timers and
//! the auto-step delay) are ordered by `(due, sequence)` so timers due at the
//! same instant fire in registration order.

use std::collections::{BTreeMap, VecDeque};

use rustc_hash::FxHashMap;
use tracing::trace;

use crate::interpreter::eval_stack::SuspensionId;
use crate::value::{JsObjectRef, JsValue, PromiseStatus};

use super::promise::PromiseReaction;

/// Program timer handle, as returned by `setTimeout`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u32);

/// A queued unit of work
pub enum Job {
    /// Promise settled: run one of its reactions
    Reaction {
        reaction: PromiseReaction,
        status: PromiseStatus,
        value: JsValue,
    },
    /// Adopt the state of a foreign thenable
    Thenable {
        promise: JsObjectRef,
        thenable: JsValue,
        then: JsValue,
    },
    /// Program timer fired
    Timer(TimerId),
    /// Continue a suspended async activation
    Resume {
        id: SuspensionId,
        status: PromiseStatus,
        value: JsValue,
    },
}

/// Entry of the host timer schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostTimer {
    Program(TimerId),
    /// Auto-step delay of the stepping engine
    StepDelay,
}

/// A timer registered by the interpreted program
pub struct ProgramTimer {
    pub callback: JsValue,
    pub args: Vec<JsValue>,
    /// Re-arm period for `setInterval`
    pub interval: Option<u64>,
    key: Option<(u64, u64)>,
}

#[derive(Default)]
pub struct EventLoop {
    microtasks: VecDeque<Job>,
    callbacks: VecDeque<Job>,
    timers: FxHashMap<TimerId, ProgramTimer>,
    schedule: BTreeMap<(u64, u64), HostTimer>,
    now: u64,
    next_timer: u32,
    next_seq: u64,
}

impl EventLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time in milliseconds
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Move the clock forward; never backwards
    pub fn set_now(&mut self, now: u64) {
        self.now = self.now.max(now);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Queues
    // ═══════════════════════════════════════════════════════════════════════

    pub fn enqueue_microtask(&mut self, job: Job) {
        self.microtasks.push_back(job);
    }

    pub fn enqueue_callback(&mut self, job: Job) {
        self.callbacks.push_back(job);
    }

    /// Next job to run, microtasks first
    pub fn next_job(&mut self) -> Option<Job> {
        self.microtasks
            .pop_front()
            .or_else(|| self.callbacks.pop_front())
    }

    pub fn has_pending_jobs(&self) -> bool {
        !self.microtasks.is_empty() || !self.callbacks.is_empty()
    }

    /// Queued jobs or live program timers
    pub fn has_outstanding_work(&self) -> bool {
        self.has_pending_jobs() || !self.timers.is_empty()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Program timers
    // ═══════════════════════════════════════════════════════════════════════

    /// Register a `setTimeout`/`setInterval` timer. Interval periods are at
    /// least 1ms so a repeating timer always lets the clock move.
    pub fn add_timer(
        &mut self,
        callback: JsValue,
        args: Vec<JsValue>,
        delay: u64,
        repeat: bool,
    ) -> TimerId {
        self.next_timer += 1;
        let id = TimerId(self.next_timer);
        let key = self.schedule_at(self.now + delay, HostTimer::Program(id));
        self.timers.insert(
            id,
            ProgramTimer {
                callback,
                args,
                interval: repeat.then_some(delay.max(1)),
                key: Some(key),
            },
        );
        trace!(timer = id.0, delay, repeat, "timer registered");
        id
    }

    /// Cancel a program timer wherever it is: scheduled or already queued
    pub fn clear_timer(&mut self, id: TimerId) -> bool {
        let Some(timer) = self.timers.remove(&id) else {
            return false;
        };
        if let Some(key) = timer.key {
            self.schedule.remove(&key);
        }
        self.callbacks
            .retain(|job| !matches!(job, Job::Timer(queued) if *queued == id));
        trace!(timer = id.0, "timer cleared");
        true
    }

    pub fn outstanding_timers(&self) -> usize {
        self.timers.len()
    }

    /// Callback and arguments for a fired timer. Intervals are re-armed,
    /// one-shot timers leave the registry.
    pub fn take_timer_callback(&mut self, id: TimerId) -> Option<(JsValue, Vec<JsValue>)> {
        let interval = self.timers.get(&id)?.interval;
        match interval {
            Some(period) => {
                let key = self.schedule_at(self.now + period, HostTimer::Program(id));
                let timer = self.timers.get_mut(&id)?;
                timer.key = Some(key);
                Some((timer.callback.clone(), timer.args.clone()))
            }
            None => {
                let timer = self.timers.remove(&id)?;
                Some((timer.callback, timer.args))
            }
        }
    }

    /// Queue every program timer that is due by now, in schedule order
    pub fn release_due_timers(&mut self) {
        let due: Vec<((u64, u64), TimerId)> = self
            .schedule
            .range(..(self.now + 1, 0))
            .filter_map(|(key, timer)| match timer {
                HostTimer::Program(id) => Some((*key, *id)),
                HostTimer::StepDelay => None,
            })
            .collect();
        for (key, id) in due {
            self.schedule.remove(&key);
            if let Some(timer) = self.timers.get_mut(&id) {
                timer.key = None;
            }
            self.callbacks.push_back(Job::Timer(id));
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Step delay timer
    // ═══════════════════════════════════════════════════════════════════════

    pub fn arm_step_delay(&mut self, delay: u64) {
        self.cancel_step_delay();
        self.schedule_at(self.now + delay, HostTimer::StepDelay);
    }

    pub fn cancel_step_delay(&mut self) {
        self.schedule
            .retain(|_, timer| !matches!(timer, HostTimer::StepDelay));
    }

    pub fn step_delay_armed(&self) -> bool {
        self.schedule
            .values()
            .any(|timer| matches!(timer, HostTimer::StepDelay))
    }

    /// Consume the step delay timer if it is due
    pub fn take_step_delay_due(&mut self) -> bool {
        let key = self
            .schedule
            .range(..(self.now + 1, 0))
            .find(|(_, timer)| matches!(timer, HostTimer::StepDelay))
            .map(|(key, _)| *key);
        match key {
            Some(key) => self.schedule.remove(&key).is_some(),
            None => false,
        }
    }

    /// Due time of the earliest host timer
    pub fn next_deadline(&self) -> Option<u64> {
        self.schedule.keys().next().map(|(due, _)| *due)
    }

    /// Drop every queued job and timer
    pub fn clear(&mut self) {
        self.microtasks.clear();
        self.callbacks.clear();
        self.timers.clear();
        self.schedule.clear();
    }

    fn schedule_at(&mut self, due: u64, timer: HostTimer) -> (u64, u64) {
        self.next_seq += 1;
        let key = (due, self.next_seq);
        self.schedule.insert(key, timer);
        key
    }
}
