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

//! Cooperative cancellation

mod common;

use common::generated;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use unit_query::{
    CancellationToken, CompoundQuery, EngineConfig, Parameters, ProgressMonitor, Query, QueryEngine, QueryError,
    Queryable,
};

/// Cancels itself once `limit` units of work have been reported
struct CancelAfter {
    limit: u64,
    worked: AtomicU64,
    checked_after_cancel: AtomicBool,
}

impl CancelAfter {
    fn new(limit: u64) -> Arc<Self> {
        Arc::new(Self {
            limit,
            worked: AtomicU64::new(0),
            checked_after_cancel: AtomicBool::new(false),
        })
    }
}

impl ProgressMonitor for CancelAfter {
    fn is_cancelled(&self) -> bool {
        let cancelled = self.worked.load(Ordering::SeqCst) >= self.limit;
        if cancelled {
            self.checked_after_cancel.store(true, Ordering::SeqCst);
        }
        cancelled
    }

    fn worked(&self, units: u64) {
        self.worked.fetch_add(units, Ordering::SeqCst);
    }
}

const TRAVERSAL: &str = "everything.select(x | x.id == 'bundle.0').traverse(u | everything.select(r | r.requirements.exists(q | u ~= q)))";

#[test]
fn test_traversal_stops_within_one_work_unit() {
    let units = generated(3_000);
    let monitor = CancelAfter::new(250);
    let query = QueryEngine::new().context_query(TRAVERSAL, Parameters::new()).unwrap();

    let error = units
        .query(&query, Some(monitor.clone() as Arc<dyn ProgressMonitor>))
        .and_then(|result| result.to_vec())
        .unwrap_err();
    assert_eq!(error, QueryError::Cancelled);
    assert!(error.is_cancelled());
    assert!(monitor.checked_after_cancel.load(Ordering::SeqCst));
    assert_eq!(monitor.worked.load(Ordering::SeqCst), 250);
}

#[test]
fn test_check_interval_bounds_overrun() {
    let units = generated(3_000);
    let monitor = CancelAfter::new(100);
    let engine = QueryEngine::with_config(EngineConfig::new(16, 32, true));
    let query = engine.context_query(TRAVERSAL, Parameters::new()).unwrap();

    let error = units
        .query(&query, Some(monitor.clone() as Arc<dyn ProgressMonitor>))
        .and_then(|result| result.to_vec())
        .unwrap_err();
    assert!(error.is_cancelled());
    let worked = monitor.worked.load(Ordering::SeqCst);
    assert!((100..100 + 32).contains(&worked), "worked {worked}");
}

#[test]
fn test_uncancelled_traversal_completes() {
    let units = generated(200);
    let token = CancellationToken::new();
    let query = QueryEngine::new().context_query(TRAVERSAL, Parameters::new()).unwrap();
    let result = units.query(&query, Some(Arc::new(token.clone()) as Arc<dyn ProgressMonitor>)).unwrap();
    assert_eq!(result.len().unwrap(), 200);
    assert!(token.work_done() > 0);
}

#[test]
fn test_cancelled_token_aborts_compound_queries() {
    let units = generated(100);
    let token = CancellationToken::new();
    token.cancel();
    let engine = QueryEngine::new();
    let query = CompoundQuery::create(
        vec![
            Arc::new(engine.context_query("everything.latest()", Parameters::new()).unwrap()) as Arc<dyn Query>,
            Arc::new(engine.match_query("id == 'bundle.1'", Parameters::new()).unwrap()),
        ],
        true,
    );
    let error = units.query(query.as_ref(), Some(Arc::new(token) as Arc<dyn ProgressMonitor>)).unwrap_err();
    assert_eq!(error, QueryError::Cancelled);
}
