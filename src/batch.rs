// Submission batch runner
//
// A submission is every file one applicant uploaded. Files are processed
// one after another by default; parallel mode uses a bounded rayon pool and
// still returns results in upload order.

use crate::watermark::{ProcessedFile, UploadedFile, WatermarkProcessor};
use rayon::prelude::*;
use std::time::Instant;

/// How the files of one submission are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingMode {
    /// Each file completes before the next starts
    #[default]
    Sequential,
    /// At most `workers` files in flight at once
    Parallel { workers: usize },
}

impl ProcessingMode {
    /// Parallel mode when `parallel` is set, otherwise sequential.
    pub fn from_flags(parallel: bool, workers: usize) -> Self {
        if parallel && workers > 1 {
            ProcessingMode::Parallel { workers }
        } else {
            ProcessingMode::Sequential
        }
    }
}

/// Watermark every file in a submission.
///
/// The result has one entry per input, in input order, whatever the mode.
pub fn process_submission(
    processor: &WatermarkProcessor,
    files: &[UploadedFile],
    mode: ProcessingMode,
) -> Vec<ProcessedFile> {
    let start = Instant::now();

    let results = match mode {
        ProcessingMode::Sequential => process_sequential(processor, files),
        ProcessingMode::Parallel { workers } => {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(workers.max(1))
                .build()
            {
                Ok(pool) => pool.install(|| {
                    files
                        .par_iter()
                        .map(|f| processor.process(f))
                        .collect::<Vec<_>>()
                }),
                Err(e) => {
                    tracing::warn!(
                        workers,
                        error = %e,
                        "Failed to build worker pool, processing sequentially"
                    );
                    process_sequential(processor, files)
                }
            }
        }
    };

    let watermarked = results.iter().filter(|r| r.watermarked).count();
    tracing::info!(
        files = files.len(),
        watermarked,
        mode = ?mode,
        duration_ms = start.elapsed().as_millis() as u64,
        "Submission processed"
    );

    results
}

fn process_sequential(processor: &WatermarkProcessor, files: &[UploadedFile]) -> Vec<ProcessedFile> {
    files.iter().map(|f| processor.process(f)).collect()
}

/// Async variant for callers running on a tokio runtime.
///
/// Each file is handed to the blocking pool and awaited before the next one
/// starts. A file whose task panics comes back unchanged.
pub async fn process_submission_async(
    processor: WatermarkProcessor,
    files: Vec<UploadedFile>,
) -> Vec<ProcessedFile> {
    let mut results = Vec::with_capacity(files.len());

    for file in files {
        let worker = processor.clone();
        let fallback = file.clone();
        let kind = processor.classify(&file.filename);

        let processed = match tokio::task::spawn_blocking(move || worker.process(&file)).await {
            Ok(processed) => processed,
            Err(e) => {
                tracing::warn!(
                    filename = %fallback.filename,
                    error = %e,
                    "Watermark task failed, keeping original"
                );
                ProcessedFile {
                    data: fallback.data,
                    filename: fallback.filename,
                    watermarked: false,
                    kind,
                }
            }
        };
        results.push(processed);
    }

    results
}
