use std::{borrow::Cow, time::Duration};

use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Named handle to a long-running background task.
#[derive(Debug)]
pub struct TaskHandle {
    name: Cow<'static, str>,
    handle: JoinHandle<()>,
    /// Loops that never return on their own; shutdown stops them without waiting.
    abort_on_shutdown: bool,
}

impl TaskHandle {
    pub fn new(name: impl Into<Cow<'static, str>>, handle: JoinHandle<()>) -> Self {
        Self {
            name: name.into(),
            handle,
            abort_on_shutdown: false,
        }
    }

    /// Handle for a periodic loop that only ends when stopped.
    pub fn interval(name: impl Into<Cow<'static, str>>, handle: JoinHandle<()>) -> Self {
        Self {
            abort_on_shutdown: true,
            ..Self::new(name, handle)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Abort the task and wait for it to unwind.
    pub async fn stop(self) {
        self.handle.abort();
        if let Err(err) = self.handle.await {
            if !err.is_cancelled() {
                debug!(task = %self.name, ?err, "task join after abort failed");
            }
        }
    }
}

#[derive(Default)]
pub struct TaskManager {
    tasks: Vec<TaskHandle>,
}

impl TaskManager {
    pub fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    pub fn push(&mut self, task: TaskHandle) {
        trace!(task = task.name(), "task registered");
        self.tasks.push(task);
    }

    pub fn extend<I>(&mut self, tasks: I)
    where
        I: IntoIterator<Item = TaskHandle>,
    {
        for task in tasks {
            self.push(task);
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Give each task up to `grace` to finish on its own, then stop it.
    /// Interval tasks are stopped right away.
    pub async fn shutdown_with_grace(self, grace: Duration) {
        for mut task in self.tasks {
            if grace.is_zero() || task.abort_on_shutdown || task.is_finished() {
                debug!(task = %task.name, "task stopped");
                task.stop().await;
                continue;
            }

            let sleeper = tokio::time::sleep(grace);
            tokio::pin!(sleeper);
            let timed_out = tokio::select! {
                res = &mut task.handle => {
                    if let Err(err) = res {
                        debug!(task = %task.name, ?err, "task exited with error");
                    } else {
                        debug!(task = %task.name, "task completed");
                    }
                    false
                }
                _ = &mut sleeper => true,
            };
            if timed_out {
                debug!(task = %task.name, "stopping task after grace period");
                task.stop().await;
            }
        }
    }
}
