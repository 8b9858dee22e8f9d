//! Export run orchestration.

use super::{
    ExportEvent, ExportOutcome, ExportRequest, ExportSettings, ExportState, ProgressAggregator,
    cut_points, output_path, select_strategy,
};
use crate::engine::{CutJob, RunningCut, TranscodeEngine};
use crate::error::{Error, Result};
use crate::segments::Segment;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

type SharedTask = Arc<Mutex<ExportTask>>;

/// State of the export in flight.
///
/// Cancellation, the kill switch and the produced file list are only touched
/// under this lock.
#[derive(Debug)]
struct ExportTask {
    segments: Vec<Segment>,
    produced_files: Vec<PathBuf>,
    partial_output: Option<PathBuf>,
    kill_switch: Option<oneshot::Sender<()>>,
    cancelled: bool,
    state: ExportState,
}

impl ExportTask {
    fn new(segments: Vec<Segment>) -> Self {
        Self {
            segments,
            produced_files: Vec::new(),
            partial_output: None,
            kill_switch: None,
            cancelled: false,
            state: ExportState::Idle,
        }
    }

    fn request_cancel(&mut self) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.cancelled = true;
        if let Some(kill) = self.kill_switch.take() {
            // Process may have exited already.
            let _ = kill.send(());
        }
        true
    }

    fn kill_active(&mut self) {
        if let Some(kill) = self.kill_switch.take() {
            let _ = kill.send(());
        }
    }
}

fn lock(task: &Mutex<ExportTask>) -> MutexGuard<'_, ExportTask> {
    task.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Runs exports against a [`TranscodeEngine`], one at a time.
#[derive(Clone)]
pub struct ExportPipeline {
    engine: Arc<dyn TranscodeEngine>,
    settings: ExportSettings,
    active: Arc<Mutex<Option<SharedTask>>>,
}

impl std::fmt::Debug for ExportPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportPipeline")
            .field("engine", &self.engine.tool_name())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl ExportPipeline {
    /// Pipeline driving `engine`.
    pub fn new(engine: Arc<dyn TranscodeEngine>, settings: ExportSettings) -> Self {
        Self {
            engine,
            settings,
            active: Arc::new(Mutex::new(None)),
        }
    }

    /// Start an export on the current tokio runtime.
    ///
    /// Fails without spawning anything when another export is running, the
    /// source is missing or unreadable, or there are no segments.
    pub fn start(&self, request: ExportRequest) -> Result<ExportHandle> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if active
            .as_ref()
            .is_some_and(|task| !lock(task).state.is_terminal())
        {
            return Err(Error::ExportInProgress);
        }

        check_source(&request.source)?;
        if request.segments.is_empty() {
            return Err(Error::NoValidSegments);
        }

        let task = Arc::new(Mutex::new(ExportTask::new(request.segments.clone())));
        *active = Some(Arc::clone(&task));
        drop(active);

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let run = ExportRun {
            engine: Arc::clone(&self.engine),
            settings: self.settings.clone(),
            task: Arc::clone(&task),
            events: events_tx,
        };
        let slot = Arc::clone(&self.active);
        let worker_task = Arc::clone(&task);

        let join = tokio::spawn(async move {
            let outcome = run.execute(request).await;
            lock(&worker_task).state = outcome.state();

            let mut active = slot.lock().unwrap_or_else(PoisonError::into_inner);
            if active
                .as_ref()
                .is_some_and(|current| Arc::ptr_eq(current, &worker_task))
            {
                *active = None;
            }
            outcome
        });

        Ok(ExportHandle {
            events: events_rx,
            task,
            join,
        })
    }

    /// Cancel the export in flight, if any.
    pub fn cancel_active(&self) -> bool {
        let task = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        task.is_some_and(|task| {
            let mut guard = lock(&task);
            guard.request_cancel()
        })
    }

    /// Whether an export is running.
    pub fn is_busy(&self) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|task| !lock(task).state.is_terminal())
    }
}

/// Caller's side of a running export.
#[derive(Debug)]
pub struct ExportHandle {
    events: mpsc::UnboundedReceiver<ExportEvent>,
    task: SharedTask,
    join: JoinHandle<ExportOutcome>,
}

impl ExportHandle {
    /// Next event, or `None` once the run has ended.
    pub async fn next_event(&mut self) -> Option<ExportEvent> {
        self.events.recv().await
    }

    /// Request cancellation. Returns `false` if the run already ended.
    pub fn cancel(&self) -> bool {
        lock(&self.task).request_cancel()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ExportState {
        lock(&self.task).state
    }

    /// Number of segments in this run.
    pub fn total_segments(&self) -> usize {
        lock(&self.task).segments.len()
    }

    /// Wait for the run to finish.
    pub async fn wait(self) -> ExportOutcome {
        match self.join.await {
            Ok(outcome) => outcome,
            Err(e) => ExportOutcome::Failed {
                error: Error::Internal {
                    message: format!("export task aborted: {e}"),
                },
            },
        }
    }
}

/// Fail with `InputNotFound` or `InputUnreadable` unless `path` is a readable file.
pub fn check_source(path: &Path) -> Result<()> {
    let metadata = std::fs::metadata(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::InputNotFound {
                path: path.to_path_buf(),
            }
        } else {
            Error::InputUnreadable {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;

    if !metadata.is_file() {
        return Err(Error::InputUnreadable {
            path: path.to_path_buf(),
            source: std::io::Error::other("not a regular file"),
        });
    }

    std::fs::File::open(path).map_err(|e| Error::InputUnreadable {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(())
}

/// Why a segment loop stopped early.
enum Interrupt {
    Cancelled,
    Failed(Error),
}

impl From<Error> for Interrupt {
    fn from(e: Error) -> Self {
        Self::Failed(e)
    }
}

struct ExportRun {
    engine: Arc<dyn TranscodeEngine>,
    settings: ExportSettings,
    task: SharedTask,
    events: mpsc::UnboundedSender<ExportEvent>,
}

impl ExportRun {
    async fn execute(self, request: ExportRequest) -> ExportOutcome {
        let source = request.source.clone();
        let result = self.cut_all(request).await;

        match result {
            Ok(files) => {
                info!("Exported {} segment(s) from {}", files.len(), source.display());
                ExportOutcome::Completed { files }
            }
            Err(Interrupt::Cancelled) => {
                info!("Export of {} cancelled", source.display());
                self.rollback().await;
                ExportOutcome::Cancelled
            }
            Err(Interrupt::Failed(error)) => {
                error!("Export of {} failed: {error}", source.display());
                self.rollback().await;
                ExportOutcome::Failed { error }
            }
        }
    }

    async fn cut_all(
        &self,
        request: ExportRequest,
    ) -> std::result::Result<Vec<PathBuf>, Interrupt> {
        self.set_state(ExportState::Probing);
        let info = match request.probed.clone() {
            Some(info) => info,
            None => self.engine.probe(&request.source).await?,
        };
        self.ensure_not_cancelled()?;

        let source_format = info.classify(&request.source)?;
        let target = request.target.unwrap_or(source_format);
        let strategy = select_strategy(&info, target, &self.settings);
        info!(
            "Source is {source_format} ({} / {}, {} Hz), writing {target} via {}",
            info.container_name,
            info.codec_name,
            info.sample_rate,
            if strategy.is_copy() { "stream copy" } else { "re-encode" }
        );

        if let Some(dir) = &request.output_dir {
            tokio::fs::create_dir_all(dir).await.map_err(Error::Io)?;
        }

        let total = request.segments.len();
        self.emit(ExportEvent::Started {
            total_segments: total,
            source_format,
            target_format: target,
            stream_copy: strategy.is_copy(),
        });

        let mut aggregator = ProgressAggregator::new(total);
        let mut files = Vec::with_capacity(total);

        for (i, segment) in request.segments.iter().enumerate() {
            let (start, duration) = cut_points(segment, &strategy, info.sample_rate);
            let output = output_path(
                &request.source,
                request.output_dir.as_deref(),
                segment.index,
                target,
            );
            debug!(
                "Segment {}/{}: {start:.3}s +{duration:.3}s -> {}",
                i + 1,
                total,
                output.display()
            );

            let job = CutJob {
                input: request.source.clone(),
                output: output.clone(),
                start,
                duration,
                strategy: strategy.clone(),
            };

            self.cut_segment(i, segment.index, &job, &mut aggregator)
                .await?;
            files.push(output);
        }

        // A cancel either lands before this point and rolls back, or sees a
        // terminal state and is refused.
        let mut task = lock(&self.task);
        if task.cancelled {
            return Err(Interrupt::Cancelled);
        }
        task.state = ExportState::Completed;
        drop(task);
        Ok(files)
    }

    /// Cut one segment. `index` is the 0-based position in this run,
    /// `segment_index` the segment's own 1-based index.
    async fn cut_segment(
        &self,
        index: usize,
        segment_index: usize,
        job: &CutJob,
        aggregator: &mut ProgressAggregator,
    ) -> std::result::Result<(), Interrupt> {
        let (mut progress, mut done) = {
            let mut task = lock(&self.task);
            if task.cancelled {
                return Err(Interrupt::Cancelled);
            }
            task.state = ExportState::ExportingSegment(index + 1);
            task.partial_output = Some(job.output.clone());
            let RunningCut {
                progress,
                done,
                kill,
            } = self.engine.spawn_cut(job)?;
            task.kill_switch = Some(kill);
            self.emit_progress(&task, aggregator, index, 0.0);
            (progress, done)
        };

        let timeout = self.settings.segment_timeout;
        let sleep = tokio::time::sleep(timeout.unwrap_or_default());
        tokio::pin!(sleep);
        let mut timed_out = false;

        let result = loop {
            tokio::select! {
                finished = &mut done => {
                    break finished.unwrap_or_else(|_| Err(Error::Internal {
                        message: "engine dropped the cut without reporting".to_string(),
                    }));
                }
                Some(percent) = progress.recv() => {
                    let task = lock(&self.task);
                    self.emit_progress(&task, aggregator, index, percent);
                }
                () = &mut sleep, if timeout.is_some() && !timed_out => {
                    warn!(
                        "Segment {} exceeded its time limit, killing {}",
                        index + 1,
                        self.engine.tool_name()
                    );
                    timed_out = true;
                    lock(&self.task).kill_active();
                }
            }
        };

        let mut task = lock(&self.task);
        task.kill_switch = None;

        if task.cancelled {
            return Err(Interrupt::Cancelled);
        }
        if timed_out {
            return Err(Interrupt::Failed(Error::Subprocess {
                tool: self.engine.tool_name().to_string(),
                message: format!("timed out after {:?}", timeout.unwrap_or_default()),
            }));
        }
        result?;

        task.partial_output = None;
        task.produced_files.push(job.output.clone());
        self.emit_progress(&task, aggregator, index, 100.0);
        self.emit(ExportEvent::SegmentCompleted {
            index: segment_index,
            total_segments: task.segments.len(),
            path: job.output.clone(),
        });
        Ok(())
    }

    /// Send a progress event unless the run was cancelled. Called with the
    /// task lock held so no event can slip out after cancellation.
    fn emit_progress(
        &self,
        task: &ExportTask,
        aggregator: &mut ProgressAggregator,
        index: usize,
        percent: f64,
    ) {
        if task.cancelled {
            return;
        }
        let event = aggregator.update(index, percent);
        self.emit(ExportEvent::Progress(event));
    }

    fn emit(&self, event: ExportEvent) {
        // Receiver gone means the caller stopped listening; the run goes on.
        let _ = self.events.send(event);
    }

    fn set_state(&self, state: ExportState) {
        lock(&self.task).state = state;
    }

    fn ensure_not_cancelled(&self) -> std::result::Result<(), Interrupt> {
        if lock(&self.task).cancelled {
            Err(Interrupt::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Delete everything this run wrote, including a partial output.
    async fn rollback(&self) {
        let paths: Vec<PathBuf> = {
            let mut task = lock(&self.task);
            task.kill_active();
            let mut paths = std::mem::take(&mut task.produced_files);
            paths.extend(task.partial_output.take());
            paths
        };

        for path in paths {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => debug!("Removed {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove {}: {e}", path.display()),
            }
        }
    }
}
