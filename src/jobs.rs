use std::io;
use std::process::{Child, ExitStatus};

use log::{error, info};

/// Children of background pipelines, kept only so they can be reaped.
#[derive(Default)]
pub struct BackgroundJobs {
    children: Vec<Child>,
}

impl BackgroundJobs {
    pub fn new() -> Self {
        return Self::default();
    }

    pub fn adopt(&mut self, child: Child) {
        info!("[{}] running in background", child.id());
        self.children.push(child);
    }

    pub fn len(&self) -> usize {
        return self.children.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.children.is_empty();
    }

    /// Collects every child that has exited since the last call.
    pub fn reap(&mut self) -> Vec<(u32, ExitStatus)> {
        let mut finished = Vec::new();

        self.children.retain_mut(|child| match child.try_wait() {
            Ok(Some(status)) => {
                info!("[{}] finished: {}", child.id(), status);
                finished.push((child.id(), status));
                false
            }
            Ok(None) => true,
            Err(e) => {
                error!("[{}] could not be polled: {}", child.id(), e);
                false
            }
        });

        return finished;
    }

    /// Waits for `pid` if it is one of ours; `None` when it is not.
    pub fn wait_for(&mut self, pid: u32) -> io::Result<Option<ExitStatus>> {
        let Some(index) = self.children.iter().position(|child| child.id() == pid) else {
            return Ok(None);
        };

        let mut child = self.children.swap_remove(index);
        return child.wait().map(Some);
    }
}
