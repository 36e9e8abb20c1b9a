use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::error;

use crate::error::PipelineError;

/// Worker capacity shared by every stage of a process: the probe fan-outs of
/// concurrent invocations all draw permits from the same pool.
#[derive(Clone)]
pub struct SchedulerPool {
    capacity: usize,
    semaphore: Arc<Semaphore>,
}

impl SchedulerPool {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, sgdns_config::env::THREAD_POOL_HARD_LIMIT);
        SchedulerPool { capacity, semaphore: Arc::new(Semaphore::new(capacity)) }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn scheduler<T: Send + 'static>(&self) -> TaskScheduler<T> {
        TaskScheduler { semaphore: self.semaphore.clone(), tasks: JoinSet::new() }
    }
}

/// Bounded fan-out with completion-order retrieval.
///
/// `place` blocks while the pool is saturated, providing backpressure;
/// `retrieve_next` yields each submitted task's outcome exactly once, in
/// completion order, not submission order.
pub struct TaskScheduler<T> {
    semaphore: Arc<Semaphore>,
    tasks: JoinSet<T>,
}

impl<T: Send + 'static> TaskScheduler<T> {
    pub async fn place<F>(&mut self, task: F) -> Result<(), PipelineError>
    where
        F: Future<Output = T> + Send + 'static,
    {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| PipelineError::Internal("scheduler pool is closed".to_string()))?;
        self.tasks.spawn(async move {
            let _permit = permit;
            task.await
        });
        Ok(())
    }

    /// Next completed outcome, or `None` once every placed task has been
    /// retrieved. A panicked task is logged and skipped.
    pub async fn retrieve_next(&mut self) -> Option<T> {
        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok(value) => return Some(value),
                Err(e) => error!(error = %e, "scheduled task failed"),
            }
        }
        None
    }

    pub fn outstanding(&self) -> usize {
        self.tasks.len()
    }

    /// Abort everything still running.
    pub fn shutdown(&mut self) {
        self.tasks.abort_all();
    }
}
