/*!
 * Runtime
 * Worker pool lifecycle and the host-facing interface
 */

mod builder;
mod handle;
mod port;

pub use builder::RuntimeBuilder;
pub use handle::RuntimeHandle;
pub use port::Port;

use crate::core::config::RuntimeConfig;
use crate::core::errors::KernelError;
use crate::core::types::KernelResult;
use crate::scheduler::Scheduler;
use log::{info, warn};
use parking_lot::Mutex;
use std::ops::Deref;
use std::thread::JoinHandle;

/// A running scheduler and its worker threads
///
/// Dereferences to [`RuntimeHandle`]. Dropping the runtime stops the workers;
/// processes still alive at that point are left in place and never resumed.
pub struct Runtime {
    handle: RuntimeHandle,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Runtime {
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Start a runtime with `config`
    pub fn new(config: RuntimeConfig) -> KernelResult<Self> {
        Self::start(config)
    }

    /// Start a runtime configured from `LWP_*` environment variables
    pub fn from_env() -> KernelResult<Self> {
        Self::start(RuntimeConfig::from_env()?)
    }

    pub(crate) fn start(config: RuntimeConfig) -> KernelResult<Self> {
        config.validate()?;
        let workers = config.workers;
        let scheduler = Scheduler::new(config);
        let runtime = Self {
            handle: RuntimeHandle::new(scheduler.clone()),
            workers: Mutex::new(Vec::with_capacity(workers)),
        };

        for index in 0..workers {
            let worker = scheduler.clone();
            let spawned = std::thread::Builder::new()
                .name(format!("lwp-worker-{index}"))
                .spawn(move || {
                    let span = tracing::info_span!("worker", id = index);
                    let _enter = span.enter();
                    worker.worker_loop(index);
                });

            match spawned {
                Ok(thread) => runtime.workers.lock().push(thread),
                Err(e) => {
                    // Dropping `runtime` joins the workers already started
                    return Err(KernelError::Internal(format!(
                        "failed to start worker {index}: {e}"
                    )));
                }
            }
        }

        if workers == 0 {
            info!("Runtime started in manual mode");
        } else {
            info!("Runtime started with {} workers", workers);
        }
        Ok(runtime)
    }

    #[inline]
    pub fn handle(&self) -> RuntimeHandle {
        self.handle.clone()
    }

    pub fn worker_count(&self) -> usize {
        self.workers.lock().len()
    }

    /// Stop the workers and wait for them to finish their current quantum
    pub fn shutdown(&self) {
        self.handle.scheduler().stop();
        let threads: Vec<_> = self.workers.lock().drain(..).collect();
        if threads.is_empty() {
            return;
        }

        for thread in threads {
            if thread.join().is_err() {
                warn!("A worker thread panicked outside a process");
            }
        }
        info!(
            "Runtime stopped with {} processes alive",
            self.handle.process_count()
        );
    }
}

impl Deref for Runtime {
    type Target = RuntimeHandle;

    fn deref(&self) -> &Self::Target {
        &self.handle
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        self.shutdown();
    }
}
