/*!
 * Scheduler Workers
 * Worker loop, receive timeouts and the manual driver
 */

use super::queues::Source;
use super::types::QuantumOutcome;
use super::Scheduler;
use crate::core::types::WorkerId;
use crate::process::types::ProcessState;
use log::{debug, trace};
use std::time::Instant;

impl Scheduler {
    /// Wake every process whose receive timeout has expired
    ///
    /// Returns the number of processes woken. Timers armed for an earlier
    /// block are recognized by their token and dropped.
    pub fn fire_timers(&self) -> usize {
        let due = self.timers.pop_expired(Instant::now());
        let mut woken = 0;

        for (pid, token) in due {
            let Some(slot) = self.registry.get(pid) else {
                continue;
            };
            {
                let mut control = slot.control.lock();
                if control.state != ProcessState::Blocked || control.wait_token != token {
                    continue;
                }
                control.state = ProcessState::Ready;
                control.waiting = None;
                control.timed_out = true;
            }
            trace!("Receive timeout fired for {}", pid);
            self.stats.inc_timeouts();
            self.queues.push(pid);
            woken += 1;
        }
        woken
    }

    /// Body of worker thread `worker`; returns once `stop` is called
    pub fn worker_loop(&self, worker: WorkerId) {
        self.queues.enter_worker(worker);
        debug!("Worker {} started", worker);

        let mut tick: u64 = 0;
        while self.is_running() {
            self.fire_timers();
            tick = tick.wrapping_add(1);

            match self.queues.pop(worker, tick) {
                Some((pid, source)) => {
                    if source == Source::Stolen {
                        self.stats.inc_steals();
                    }
                    self.run_quantum(pid);
                }
                None => {
                    let mut park = self.config.idle_park();
                    if let Some(deadline) = self.timers.next_deadline() {
                        park = park.min(deadline.saturating_duration_since(Instant::now()));
                    }
                    if !park.is_zero() {
                        self.queues.park(park);
                    }
                }
            }
        }

        self.queues.leave_worker();
        debug!("Worker {} stopped", worker);
    }

    /// Drive the scheduler from the calling thread
    ///
    /// Runs quanta until no process is ready or `max_quanta` have run, and
    /// returns how many ran. Used in manual mode (no worker threads) for
    /// deterministic tests. Pending timeouts fire only once due, so a process
    /// blocked with a timeout is not ready until then.
    pub fn run_until_idle(&self, max_quanta: usize) -> usize {
        let mut ran = 0;
        while ran < max_quanta {
            self.fire_timers();
            let Some(pid) = self.queues.pop_any() else {
                break;
            };
            if self.run_quantum(pid) != QuantumOutcome::NotRunnable {
                ran += 1;
            }
        }
        ran
    }
}
