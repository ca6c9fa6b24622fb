//! Progress reporting for fetch and checkout.
//!
//! The backend emits three kinds of events: object-transfer counters,
//! free-text side-band lines from the server, and checkout steps.
//! [`ProgressTracker`] turns them into named `(completed, total)` tasks and
//! forwards them to a [`ProgressSink`]. Progress never affects control flow.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

/// Task label for object transfer.
pub const TRANSFER_TASK: &str = "Receiving objects";
/// Task label for delta resolution after transfer.
pub const DELTAS_TASK: &str = "Resolving deltas";
/// Task label for working tree checkout.
pub const CHECKOUT_TASK: &str = "Checking out files";

/// Matches server lines such as `Counting objects: 45% (9/20)`.
static SIDEBAND_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\w+(?:\s+\w+)*?):\s+(\d+)%\s+\((\d+)/(\d+)\)").expect("valid sideband pattern")
});

/// Receives progress updates for named tasks.
pub trait ProgressSink {
    /// Report that `task` has reached `completed` of `total`.
    fn update(&mut self, task: &str, completed: u64, total: u64);

    /// Called once when the session ends, whether it succeeded or not.
    fn finish(&mut self) {}
}

/// Discards all progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn update(&mut self, _task: &str, _completed: u64, _total: u64) {}
}

/// Reports progress through the `log` facade.
#[derive(Debug, Default)]
pub struct LogProgress {
    tasks: HashMap<String, (u64, u64)>,
}

impl ProgressSink for LogProgress {
    fn update(&mut self, task: &str, completed: u64, total: u64) {
        if self
            .tasks
            .insert(task.to_string(), (completed, total))
            .is_none()
        {
            log::info!("{}: started ({} total)", task, total);
        } else {
            log::debug!("{}: {}/{}", task, completed, total);
        }

        if completed >= total {
            log::info!("{}: done ({}/{})", task, completed, total);
        }
    }

    fn finish(&mut self) {
        for (task, (completed, total)) in self.tasks.drain() {
            if completed < total {
                log::debug!("{}: stopped at {}/{}", task, completed, total);
            }
        }
    }
}

/// Session-scoped progress state.
///
/// Tasks are created lazily on their first reportable event, and each task's
/// completed count never goes backwards. Dropping the tracker ends the
/// session and calls [`ProgressSink::finish`].
pub struct ProgressTracker<'a> {
    sink: &'a mut dyn ProgressSink,
    completed: HashMap<String, u64>,
    checkout_done: bool,
}

impl<'a> ProgressTracker<'a> {
    /// Start a reporting session on `sink`.
    pub fn new(sink: &'a mut dyn ProgressSink) -> Self {
        Self {
            sink,
            completed: HashMap::new(),
            checkout_done: false,
        }
    }

    /// Object-transfer counters. Zero totals are ignored.
    pub fn transfer(&mut self, received: u64, total: u64) {
        if total == 0 {
            return;
        }
        self.report(TRANSFER_TASK, received, total);
    }

    /// Delta-resolution counters. Zero totals are ignored.
    pub fn deltas(&mut self, indexed: u64, total: u64) {
        if total == 0 {
            return;
        }
        self.report(DELTAS_TASK, indexed, total);
    }

    /// Free-text side-band output from the server.
    ///
    /// A chunk may contain several `\r`-separated updates; every match
    /// becomes an update of the task named by its phase.
    pub fn sideband(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }

        for caps in SIDEBAND_PATTERN.captures_iter(text) {
            let phase = &caps[1];
            let (Ok(current), Ok(total)) = (caps[3].parse::<u64>(), caps[4].parse::<u64>())
            else {
                continue;
            };
            self.report(phase, current, total);
        }
    }

    /// Checkout step counters.
    ///
    /// Once `completed >= total` has been reported, later calls are ignored.
    pub fn checkout(&mut self, completed: u64, total: u64) {
        if self.checkout_done || total == 0 {
            return;
        }

        self.report(CHECKOUT_TASK, completed, total);

        if completed >= total {
            self.checkout_done = true;
        }
    }

    fn report(&mut self, task: &str, completed: u64, total: u64) {
        let completed = completed.min(total);
        match self.completed.get_mut(task) {
            Some(last) if completed <= *last => return,
            Some(last) => *last = completed,
            None => {
                self.completed.insert(task.to_string(), completed);
            }
        }
        self.sink.update(task, completed, total);
    }
}

impl Drop for ProgressTracker<'_> {
    fn drop(&mut self) {
        self.sink.finish();
    }
}

/// Records every update, for tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingProgress {
    pub updates: Vec<(String, u64, u64)>,
    pub finished: usize,
}

#[cfg(test)]
impl RecordingProgress {
    pub fn tasks(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for (task, _, _) in &self.updates {
            if !seen.contains(&task.as_str()) {
                seen.push(task);
            }
        }
        seen
    }

    pub fn for_task(&self, task: &str) -> Vec<(u64, u64)> {
        self.updates
            .iter()
            .filter(|(t, _, _)| t == task)
            .map(|(_, c, t)| (*c, *t))
            .collect()
    }
}

#[cfg(test)]
impl ProgressSink for RecordingProgress {
    fn update(&mut self, task: &str, completed: u64, total: u64) {
        self.updates.push((task.to_string(), completed, total));
    }

    fn finish(&mut self) {
        self.finished += 1;
    }
}
