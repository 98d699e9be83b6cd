// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Cooperative progress reporting and cancellation

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Receives work reports and answers cancellation checks
///
/// Evaluation polls [`ProgressMonitor::is_cancelled`] while pulling elements;
/// implementations must be cheap to call.
pub trait ProgressMonitor: Send + Sync {
    /// Whether the caller wants evaluation to stop
    fn is_cancelled(&self) -> bool;

    /// Report `units` of completed work
    fn worked(&self, _units: u64) {}
}

/// Monitor that never cancels and ignores work reports
#[derive(Debug, Clone, Copy, Default)]
pub struct NullMonitor;

impl ProgressMonitor for NullMonitor {
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// A handle for cancelling query evaluation
///
/// Clones share state, so one clone can be handed to the query while another
/// is kept to cancel it from outside.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    work: Arc<AtomicU64>,
}

impl CancellationToken {
    /// Creates a new cancellation token
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Total work units reported so far
    pub fn work_done(&self) -> u64 {
        self.work.load(Ordering::Relaxed)
    }
}

impl ProgressMonitor for CancellationToken {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn worked(&self, units: u64) {
        self.work.fetch_add(units, Ordering::Relaxed);
    }
}

/// Resolve an optional monitor, treating `None` as never cancelled
pub fn monitor_or_null(monitor: Option<Arc<dyn ProgressMonitor>>) -> Arc<dyn ProgressMonitor> {
    monitor.unwrap_or_else(|| Arc::new(NullMonitor))
}
