//! Batch orchestration: one task per file, gated by the limiter

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::{RunConfig, TransformRequest};
use crate::error::{ResizeError, Result};
use crate::processing::{discover, transform, ImageFile, TransformOutcome};

pub mod limiter;
pub mod progress;
pub mod stats;

pub use limiter::*;
pub use progress::*;
pub use stats::*;

/// Stages of a run, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchPhase {
    Configuring,
    Discovering,
    Dispatching,
    Draining,
    Reporting,
    Done,
}

/// Runs the transform over a set of files with bounded concurrency
pub struct BatchRunner {
    request: Arc<TransformRequest>,
    limiter: Arc<Limiter>,
    cancelled: Arc<AtomicBool>,
    progress: BatchProgress,
}

impl BatchRunner {
    /// Create a runner allowing `threads` concurrent transforms
    pub fn new(request: TransformRequest, threads: usize) -> Self {
        info!("Initializing batch runner with {} concurrent workers", threads.max(1));

        Self {
            request: Arc::new(request),
            limiter: Arc::new(Limiter::new(threads)),
            cancelled: Arc::new(AtomicBool::new(false)),
            progress: BatchProgress::hidden(),
        }
    }

    pub fn with_progress(mut self, progress: BatchProgress) -> Self {
        self.progress = progress;
        self
    }

    /// Share an externally controlled cancellation flag
    pub fn with_cancel_flag(mut self, cancelled: Arc<AtomicBool>) -> Self {
        self.cancelled = cancelled;
        self
    }

    pub fn limiter(&self) -> &Limiter {
        &self.limiter
    }

    /// Transform every file and return the aggregate statistics
    ///
    /// All tasks are spawned at once; at most `threads` of them hold a
    /// limiter token and do work at any moment. Returns once every task has
    /// finished, successfully or not.
    pub async fn process(&self, files: &[ImageFile]) -> Statistics {
        let start_time = Instant::now();
        let stats = Arc::new(StatsAggregator::new(files.len()));

        debug!("Phase {:?}: spawning {} tasks", BatchPhase::Dispatching, files.len());
        let mut tasks = Vec::with_capacity(files.len());
        for file in files {
            let path = file.path.clone();
            tasks.push(tokio::spawn(process_one(
                path,
                Arc::clone(&self.request),
                Arc::clone(&self.limiter),
                Arc::clone(&self.cancelled),
                Arc::clone(&stats),
                self.progress.clone(),
            )));
        }

        debug!("Phase {:?}: waiting for {} tasks", BatchPhase::Draining, tasks.len());
        let results = futures::future::join_all(tasks).await;
        for (file, result) in files.iter().zip(results) {
            if let Err(e) = result {
                let error = ResizeError::task(&file.path, e.to_string());
                warn!("{}", error);
                stats.record_failed();
                self.progress.file_done(&file.path.to_string_lossy());
            }
        }
        self.progress.finish();

        let mut statistics = stats.snapshot();
        statistics.elapsed = start_time.elapsed();
        statistics
    }
}

/// Body of one task: wait for a token, transform, fold the outcome in
async fn process_one(
    path: PathBuf,
    request: Arc<TransformRequest>,
    limiter: Arc<Limiter>,
    cancelled: Arc<AtomicBool>,
    stats: Arc<StatsAggregator>,
    progress: BatchProgress,
) {
    let _permit = limiter.acquire().await;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    if cancelled.load(Ordering::SeqCst) {
        debug!("Cancelled before start: {:?}", path);
        stats.record_cancelled();
        progress.file_done(&name);
        return;
    }

    // Decode/resize/encode and file I/O all block
    let result = {
        let path = path.clone();
        tokio::task::spawn_blocking(move || transform(&path, &request)).await
    };
    let result = result.unwrap_or_else(|e| Err(ResizeError::task(&path, e.to_string())));

    match result {
        Ok(TransformOutcome::Resized(report)) => {
            progress.suspend(|| {
                info!(
                    "Processed: {}, input: {} bytes, output: {} bytes, {}x{} -> {}x{}",
                    report.input_path.display(),
                    report.input_bytes,
                    report.output_bytes,
                    report.original_dimensions.0,
                    report.original_dimensions.1,
                    report.new_dimensions.0,
                    report.new_dimensions.1,
                );
            });
            stats.record(report.input_bytes, report.output_bytes);
        }
        Ok(TransformOutcome::Skipped { width }) => {
            debug!("Skipped {:?} (width {})", path, width);
            stats.record_skipped();
        }
        Err(e) => {
            progress.suspend(|| warn!("{}", e.user_message()));
            stats.record_failed();
        }
    }

    progress.file_done(&name);
}

/// Everything a finished run produced
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub statistics: Statistics,
    /// Files found by discovery, in processing order
    pub files: Vec<ImageFile>,
    /// Directories and files that could not be read, including a bad root
    pub unreadable_paths: usize,
}

/// Run a complete batch for `config`
pub async fn run(config: &RunConfig) -> Result<BatchReport> {
    run_with_cancel(config, Arc::new(AtomicBool::new(false))).await
}

/// Run a complete batch; once `cancelled` is set, files not yet started are
/// left alone
pub async fn run_with_cancel(config: &RunConfig, cancelled: Arc<AtomicBool>) -> Result<BatchReport> {
    debug!("Phase {:?}", BatchPhase::Configuring);
    config.validate()?;

    debug!("Phase {:?}: {:?}", BatchPhase::Discovering, config.input_dir);
    let discovery = {
        let root = config.input_dir.clone();
        let recursive = config.recursive;
        tokio::task::spawn_blocking(move || discover(&root, recursive))
            .await
            .map_err(|e| ResizeError::task(&config.input_dir, e.to_string()))?
    };
    info!(
        "Found {} JPEG files ({:.2} MB) in {:?}",
        discovery.count(),
        discovery.total_bytes as f64 / 1024.0 / 1024.0,
        config.input_dir
    );

    let statistics = if config.dry_run || discovery.is_empty() {
        Statistics {
            discovered: discovery.count(),
            ..Statistics::default()
        }
    } else {
        let progress = BatchProgress::new(discovery.count() as u64, config.show_progress);
        BatchRunner::new(config.transform_request(), config.threads)
            .with_progress(progress)
            .with_cancel_flag(cancelled)
            .process(&discovery.files)
            .await
    };

    debug!("Phase {:?}", BatchPhase::Reporting);
    let report = BatchReport {
        statistics,
        unreadable_paths: discovery.errors.len(),
        files: discovery.files,
    };
    debug!("Phase {:?}", BatchPhase::Done);

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::test_images::{dimensions, write_jpeg};
    use tempfile::TempDir;

    fn config_for(dir: &TempDir, width: u32) -> RunConfig {
        RunConfig {
            input_dir: dir.path().to_path_buf(),
            width,
            quality: 85,
            threads: 2,
            show_progress: false,
            ..RunConfig::default()
        }
    }

    #[tokio::test]
    async fn test_three_file_batch() {
        let dir = TempDir::new().unwrap();
        write_jpeg(&dir.path().join("a.jpg"), 800, 600);
        write_jpeg(&dir.path().join("b.jpg"), 400, 300);
        write_jpeg(&dir.path().join("c.jpg"), 2000, 1500);
        let a_size = std::fs::metadata(dir.path().join("a.jpg")).unwrap().len();
        let c_size = std::fs::metadata(dir.path().join("c.jpg")).unwrap().len();

        let report = run(&config_for(&dir, 640)).await.unwrap();
        let stats = report.statistics;

        assert_eq!(stats.discovered, 3);
        assert_eq!(stats.processed, 2);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.failed, 0);
        assert_eq!(stats.input_bytes, a_size + c_size);

        let a_out = dir.path().join("a_r.jpg");
        let c_out = dir.path().join("c_r.jpg");
        assert_eq!(dimensions(&a_out), (640, 480));
        assert_eq!(dimensions(&c_out), (640, 480));
        assert!(!dir.path().join("b_r.jpg").exists());
        assert_eq!(
            stats.output_bytes,
            std::fs::metadata(a_out).unwrap().len() + std::fs::metadata(c_out).unwrap().len()
        );
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let dir = TempDir::new().unwrap();
        write_jpeg(&dir.path().join("good.jpg"), 300, 200);
        std::fs::write(dir.path().join("bad.jpg"), b"garbage").unwrap();

        let report = run(&config_for(&dir, 100)).await.unwrap();

        assert_eq!(report.statistics.processed, 1);
        assert_eq!(report.statistics.failed, 1);
        assert_eq!(dimensions(&dir.path().join("good_r.jpg")), (100, 67));
    }

    #[tokio::test]
    async fn test_overwrite_leaves_one_file() {
        let dir = TempDir::new().unwrap();
        write_jpeg(&dir.path().join("a.jpg"), 300, 200);

        let config = RunConfig {
            overwrite: true,
            ..config_for(&dir, 150)
        };
        let report = run(&config).await.unwrap();

        assert_eq!(report.statistics.processed, 1);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
        assert_eq!(dimensions(&dir.path().join("a.jpg")), (150, 100));
    }

    #[tokio::test]
    async fn test_recursive_batch() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        write_jpeg(&dir.path().join("top.jpg"), 300, 200);
        write_jpeg(&dir.path().join("sub").join("deep.JPG"), 300, 200);

        let flat = run(&config_for(&dir, 150)).await.unwrap();
        assert_eq!(flat.statistics.processed, 1);

        // top_r.jpg is 150 wide now, so only the nested file is resized
        let config = RunConfig {
            recursive: true,
            ..config_for(&dir, 150)
        };
        let nested = run(&config).await.unwrap();
        assert_eq!(nested.statistics.discovered, 3);
        assert_eq!(nested.statistics.processed, 2);
        assert_eq!(nested.statistics.skipped, 1);
        assert!(dir.path().join("sub").join("deep_r.JPG").exists());
    }

    #[tokio::test]
    async fn test_empty_directory_reports_zero() {
        let dir = TempDir::new().unwrap();
        let report = run(&config_for(&dir, 640)).await.unwrap();

        assert!(report.files.is_empty());
        assert_eq!(report.statistics.processed, 0);
        assert_eq!(report.statistics.reduction_percent(), 0.0);
    }

    #[tokio::test]
    async fn test_file_as_input_counts_unreadable_path() {
        let dir = TempDir::new().unwrap();
        write_jpeg(&dir.path().join("a.jpg"), 300, 200);

        let config = RunConfig {
            input_dir: dir.path().join("a.jpg"),
            ..config_for(&dir, 100)
        };
        let report = run(&config).await.unwrap();

        assert!(report.files.is_empty());
        assert_eq!(report.unreadable_paths, 1);
        assert_eq!(report.statistics.processed, 0);
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let dir = TempDir::new().unwrap();
        write_jpeg(&dir.path().join("a.jpg"), 300, 200);

        let config = RunConfig {
            dry_run: true,
            ..config_for(&dir, 100)
        };
        let report = run(&config).await.unwrap();

        assert_eq!(report.files.len(), 1);
        assert_eq!(report.statistics.processed, 0);
        assert!(!dir.path().join("a_r.jpg").exists());
    }

    #[tokio::test]
    async fn test_invalid_config_is_fatal() {
        let dir = TempDir::new().unwrap();
        let err = run(&config_for(&dir, 0)).await.unwrap_err();
        assert!(matches!(err, ResizeError::Config { .. }));
    }

    #[tokio::test]
    async fn test_cancelled_batch_touches_nothing() {
        let dir = TempDir::new().unwrap();
        write_jpeg(&dir.path().join("a.jpg"), 300, 200);
        write_jpeg(&dir.path().join("b.jpg"), 300, 200);

        let cancelled = Arc::new(AtomicBool::new(true));
        let report = run_with_cancel(&config_for(&dir, 100), cancelled).await.unwrap();

        assert_eq!(report.statistics.cancelled, 2);
        assert_eq!(report.statistics.processed, 0);
        assert!(!dir.path().join("a_r.jpg").exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_runner_respects_thread_limit() {
        let dir = TempDir::new().unwrap();
        let mut files = Vec::new();
        for i in 0..8 {
            let path = dir.path().join(format!("img{}.jpg", i));
            write_jpeg(&path, 256, 192);
            files.push(ImageFile {
                size: std::fs::metadata(&path).unwrap().len(),
                path,
            });
        }

        let runner = BatchRunner::new(TransformRequest::new(64), 2);
        let stats = runner.process(&files).await;

        assert_eq!(stats.processed, 8);
        assert!(runner.limiter().peak() <= 2);
        assert_eq!(runner.limiter().active(), 0);
    }
}
