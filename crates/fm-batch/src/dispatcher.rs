//! Bounded-concurrency batch scheduling.
//!
//! The dispatcher admits deduplicated inputs through a sliding window
//! of at most `max_parallel` in-flight conversions: whenever a slot is
//! free and inputs remain, the next one is admitted; whenever a task
//! completes, the observer is notified and the freed slot is refilled.
//! The terminal notification fires exactly once, after the last
//! outcome.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::task::{self, JoinSet};

use fm_core::{Error, Result, TaskOutcome};

use crate::aggregate::ResultAggregator;
use crate::convert::Converter;
use crate::observer::BatchObserver;
use crate::request::BatchRequest;

/// Terminal result of one batch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    /// Number of distinct inputs that were converted.
    pub total: usize,
    /// Inputs that failed, in completion order.
    pub failed: Vec<PathBuf>,
}

impl BatchSummary {
    /// Whether every input converted successfully.
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Schedules conversions through a bounded sliding window.
pub struct BatchDispatcher<C> {
    converter: Arc<C>,
}

impl<C: Converter> BatchDispatcher<C> {
    /// Create a dispatcher running conversions through `converter`.
    pub fn new(converter: Arc<C>) -> Self {
        Self { converter }
    }

    /// Run one batch to completion.
    ///
    /// Inputs are deduplicated to first-occurrence order and admitted
    /// in that order whenever a concurrency slot is free. A task
    /// failure never aborts the batch: it becomes a
    /// [`TaskOutcome::Failure`] and scheduling continues until every
    /// input is accounted for.
    ///
    /// # Errors
    ///
    /// Only pre-flight validation failures reject the call (see
    /// [`BatchRequest::validate`]); no task has been admitted when
    /// that happens.
    pub async fn run(
        &self,
        request: &BatchRequest,
        observer: &dyn BatchObserver,
    ) -> Result<BatchSummary> {
        request.validate()?;

        let queue = request.unique_inputs();
        let total = queue.len();
        tracing::info!(total, max_parallel = request.max_parallel, "starting batch");

        let mut cursor = 0;
        let mut in_flight: JoinSet<TaskOutcome> = JoinSet::new();
        // JoinSet loses the per-task payload when a task aborts; this
        // map recovers which input an aborted task belonged to.
        let mut admitted: HashMap<task::Id, PathBuf> = HashMap::new();
        let mut aggregator = ResultAggregator::new();

        while cursor < total || !in_flight.is_empty() {
            // Admission: fill the window in first-occurrence order.
            while in_flight.len() < request.max_parallel && cursor < total {
                let input = queue[cursor].clone();
                let output = request.naming.output_path(&input, &request.output_dir);
                let converter = Arc::clone(&self.converter);
                tracing::debug!(input = %input.display(), "admitting conversion");
                let handle = in_flight.spawn(run_one(converter, input.clone(), output));
                admitted.insert(handle.id(), input);
                cursor += 1;
            }

            // The set is non-empty here whenever the loop condition
            // holds, so join_next_with_id cannot yield None.
            let outcome = match in_flight.join_next_with_id().await {
                Some(Ok((id, outcome))) => {
                    admitted.remove(&id);
                    outcome
                }
                Some(Err(join_err)) => {
                    let input = admitted.remove(&join_err.id()).ok_or_else(|| {
                        Error::Internal("finished task missing from admission map".into())
                    })?;
                    tracing::error!(input = %input.display(), "conversion task aborted: {join_err}");
                    TaskOutcome::failure(input, format!("conversion task aborted: {join_err}"))
                }
                None => return Err(Error::Internal("worker set drained unexpectedly".into())),
            };

            // Notify before the freed slot is reused so consumers see
            // a task's completion before its successor is admitted.
            observer.on_task_done(&outcome).await;
            aggregator.record(&outcome);
        }

        let summary = BatchSummary {
            total,
            failed: aggregator.into_failures(),
        };
        tracing::info!(total, failed = summary.failed.len(), "batch finished");
        observer.on_batch_done(&summary.failed).await;

        Ok(summary)
    }
}

/// Execute one conversion, capturing every failure as data.
async fn run_one<C: Converter>(converter: Arc<C>, input: PathBuf, output: PathBuf) -> TaskOutcome {
    match converter.convert(&input, &output).await {
        Ok(()) => TaskOutcome::success(input, output),
        Err(e) => TaskOutcome::failure(input, e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::NoopObserver;

    use std::collections::HashSet;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use fm_core::OutputNaming;

    // -- Fakes ---------------------------------------------------------------

    /// Converter that records scheduling behavior instead of running
    /// ffmpeg.
    #[derive(Default)]
    struct FakeConverter {
        delay: Duration,
        fail: HashSet<PathBuf>,
        fail_message: String,
        running: AtomicUsize,
        peak: AtomicUsize,
        trace: Arc<Mutex<Vec<String>>>,
    }

    impl FakeConverter {
        fn ok(delay: Duration) -> Self {
            Self {
                delay,
                ..Self::default()
            }
        }

        fn failing(fail: &[&str], message: &str) -> Self {
            Self {
                fail: fail.iter().map(PathBuf::from).collect(),
                fail_message: message.to_string(),
                ..Self::default()
            }
        }

        fn started(&self) -> Vec<String> {
            self.trace
                .lock()
                .unwrap()
                .iter()
                .filter(|line| line.starts_with("start"))
                .cloned()
                .collect()
        }
    }

    #[async_trait]
    impl Converter for FakeConverter {
        async fn convert(&self, input: &Path, _output: &Path) -> fm_core::Result<()> {
            self.trace
                .lock()
                .unwrap()
                .push(format!("start {}", input.display()));
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.running.fetch_sub(1, Ordering::SeqCst);
            if self.fail.contains(input) {
                return Err(fm_core::Error::tool("ffmpeg", self.fail_message.clone()));
            }
            Ok(())
        }
    }

    /// Converter that panics for selected inputs.
    struct PanickingConverter {
        panic_on: PathBuf,
    }

    #[async_trait]
    impl Converter for PanickingConverter {
        async fn convert(&self, input: &Path, _output: &Path) -> fm_core::Result<()> {
            assert_ne!(input, self.panic_on, "intentional panic");
            Ok(())
        }
    }

    /// Observer that records every notification.
    #[derive(Default)]
    struct RecordingObserver {
        tasks: Mutex<Vec<TaskOutcome>>,
        batches: Mutex<Vec<Vec<PathBuf>>>,
        trace: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingObserver {
        fn sharing_trace(trace: Arc<Mutex<Vec<String>>>) -> Self {
            Self {
                trace,
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl BatchObserver for RecordingObserver {
        async fn on_task_done(&self, outcome: &TaskOutcome) {
            self.trace
                .lock()
                .unwrap()
                .push(format!("done {}", outcome.input().display()));
            self.tasks.lock().unwrap().push(outcome.clone());
        }

        async fn on_batch_done(&self, failed: &[PathBuf]) {
            self.trace.lock().unwrap().push("batch done".to_string());
            self.batches.lock().unwrap().push(failed.to_vec());
        }
    }

    fn request(dir: &Path, inputs: &[&str], max_parallel: usize) -> BatchRequest {
        BatchRequest {
            inputs: inputs.iter().map(PathBuf::from).collect(),
            output_dir: dir.to_path_buf(),
            naming: OutputNaming::default(),
            max_parallel,
        }
    }

    // -- Tests ---------------------------------------------------------------

    #[tokio::test]
    async fn duplicates_collapse_to_first_occurrence() {
        let dir = tempfile::tempdir().unwrap();
        let converter = Arc::new(FakeConverter::ok(Duration::ZERO));
        let observer = RecordingObserver::default();

        let summary = BatchDispatcher::new(Arc::clone(&converter))
            .run(&request(dir.path(), &["/a.mov", "/a.mov", "/b.mov"], 1), &observer)
            .await
            .unwrap();

        assert_eq!(summary.total, 2);
        let tasks = observer.tasks.lock().unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].input(), Path::new("/a.mov"));
        assert_eq!(tasks[1].input(), Path::new("/b.mov"));
    }

    #[tokio::test]
    async fn window_never_exceeds_limit() {
        let dir = tempfile::tempdir().unwrap();
        let converter = Arc::new(FakeConverter::ok(Duration::from_millis(50)));
        let inputs: Vec<String> = (0..9).map(|i| format!("/clip{i}.mov")).collect();
        let input_refs: Vec<&str> = inputs.iter().map(String::as_str).collect();

        let summary = BatchDispatcher::new(Arc::clone(&converter))
            .run(&request(dir.path(), &input_refs, 3), &NoopObserver)
            .await
            .unwrap();

        assert_eq!(summary.total, 9);
        assert_eq!(converter.peak.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn single_slot_runs_strictly_sequentially() {
        let dir = tempfile::tempdir().unwrap();
        let trace = Arc::new(Mutex::new(Vec::new()));
        let converter = Arc::new(FakeConverter {
            delay: Duration::from_millis(5),
            trace: Arc::clone(&trace),
            ..FakeConverter::default()
        });
        let observer = RecordingObserver::sharing_trace(Arc::clone(&trace));

        BatchDispatcher::new(Arc::clone(&converter))
            .run(&request(dir.path(), &["/a.mov", "/b.mov", "/c.mov"], 1), &observer)
            .await
            .unwrap();

        let trace = trace.lock().unwrap();
        assert_eq!(
            *trace,
            vec![
                "start /a.mov",
                "done /a.mov",
                "start /b.mov",
                "done /b.mov",
                "start /c.mov",
                "done /c.mov",
                "batch done",
            ]
        );
    }

    #[tokio::test]
    async fn failure_is_isolated_and_batch_continues() {
        let dir = tempfile::tempdir().unwrap();
        let converter = Arc::new(FakeConverter::failing(
            &["/bad.mov"],
            "moov atom not found",
        ));
        let observer = RecordingObserver::default();

        let inputs = ["/a.mov", "/b.mov", "/bad.mov", "/c.mov", "/d.mov"];
        let summary = BatchDispatcher::new(Arc::clone(&converter))
            .run(&request(dir.path(), &inputs, 2), &observer)
            .await
            .unwrap();

        assert_eq!(summary.total, 5);
        assert_eq!(summary.failed, vec![PathBuf::from("/bad.mov")]);

        let tasks = observer.tasks.lock().unwrap();
        assert_eq!(tasks.len(), 5);
        assert_eq!(tasks.iter().filter(|t| t.is_failure()).count(), 1);
        let failure = tasks.iter().find(|t| t.is_failure()).unwrap();
        assert_eq!(failure.input(), Path::new("/bad.mov"));
        assert!(
            failure.error().unwrap().contains("moov atom not found"),
            "got: {:?}",
            failure.error()
        );
    }

    #[tokio::test]
    async fn batch_done_fires_exactly_once_after_all_tasks() {
        let dir = tempfile::tempdir().unwrap();
        let trace = Arc::new(Mutex::new(Vec::new()));
        let converter = Arc::new(FakeConverter {
            delay: Duration::from_millis(2),
            trace: Arc::clone(&trace),
            ..FakeConverter::default()
        });
        let observer = RecordingObserver::sharing_trace(Arc::clone(&trace));

        let inputs = ["/a.mov", "/b.mov", "/c.mov", "/d.mov"];
        BatchDispatcher::new(Arc::clone(&converter))
            .run(&request(dir.path(), &inputs, 2), &observer)
            .await
            .unwrap();

        assert_eq!(observer.batches.lock().unwrap().len(), 1);
        let trace = trace.lock().unwrap();
        assert_eq!(trace.last().map(String::as_str), Some("batch done"));
        assert_eq!(trace.iter().filter(|l| l.starts_with("done")).count(), 4);
    }

    #[tokio::test]
    async fn success_outcome_carries_derived_output_path() {
        let dir = tempfile::tempdir().unwrap();
        let converter = Arc::new(FakeConverter::ok(Duration::ZERO));
        let observer = RecordingObserver::default();

        BatchDispatcher::new(Arc::clone(&converter))
            .run(&request(dir.path(), &["/media/clip.mov"], 1), &observer)
            .await
            .unwrap();

        let tasks = observer.tasks.lock().unwrap();
        match &tasks[0] {
            TaskOutcome::Success { output, .. } => {
                assert_eq!(*output, dir.path().join("clip_converted.mp4"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn validation_failure_admits_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let converter = Arc::new(FakeConverter::ok(Duration::ZERO));
        let dispatcher = BatchDispatcher::new(Arc::clone(&converter));

        let err = dispatcher
            .run(&request(dir.path(), &[], 2), &NoopObserver)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = dispatcher
            .run(&request(dir.path(), &["/a.mov"], 0), &NoopObserver)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        assert!(converter.started().is_empty());
    }

    #[tokio::test]
    async fn aborted_task_still_yields_an_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let converter = Arc::new(PanickingConverter {
            panic_on: PathBuf::from("/bad.mov"),
        });
        let observer = RecordingObserver::default();

        let summary = BatchDispatcher::new(converter)
            .run(&request(dir.path(), &["/a.mov", "/bad.mov", "/c.mov"], 1), &observer)
            .await
            .unwrap();

        assert_eq!(summary.total, 3);
        assert_eq!(summary.failed, vec![PathBuf::from("/bad.mov")]);
        assert_eq!(observer.tasks.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn admission_order_is_deterministic_under_concurrency() {
        let dir = tempfile::tempdir().unwrap();
        let trace = Arc::new(Mutex::new(Vec::new()));
        let converter = Arc::new(FakeConverter {
            delay: Duration::from_millis(5),
            trace: Arc::clone(&trace),
            ..FakeConverter::default()
        });

        let inputs = ["/a.mov", "/b.mov", "/c.mov", "/d.mov", "/e.mov"];
        BatchDispatcher::new(Arc::clone(&converter))
            .run(&request(dir.path(), &inputs, 2), &NoopObserver)
            .await
            .unwrap();

        let started = converter.started();
        let expected: Vec<String> = inputs.iter().map(|i| format!("start {i}")).collect();
        assert_eq!(started, expected);
    }
}
