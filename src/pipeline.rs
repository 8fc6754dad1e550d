//! Sequential per-index extraction with one write in flight at a time.
//!
//! For each index the pages are fetched in order. The write for page `n` is
//! started in the background and runs while page `n + 1` is fetched; it is
//! then awaited before the write for page `n + 1` starts. All writes for an
//! index have landed before the index is reported finished and before the
//! next index begins, so nothing is left unflushed when a run returns.

use futures::TryStreamExt;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget};
use log::{error, info};
use std::time::{Duration, Instant};

use crate::error::Result;
use crate::indices::{DateRange, IndexId, resolve};
use crate::output::{CsvSink, PendingWrite, WriteReceipt};
use crate::progress::index_bar;
use crate::retrieval::{PageFetcher, extract_all};

/// Per-index outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSummary {
    pub index: IndexId,
    /// Snapshot taken from the first page
    pub total_count: u64,
    pub pages: u64,
    pub rows: u64,
    pub bytes: u64,
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub indices: Vec<IndexSummary>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn rows(&self) -> u64 {
        self.indices.iter().map(|s| s.rows).sum()
    }

    pub fn bytes(&self) -> u64 {
        self.indices.iter().map(|s| s.bytes).sum()
    }
}

pub struct Pipeline<F> {
    fetcher: F,
    sink: CsvSink,
    progress: Option<MultiProgress>,
}

impl<F: PageFetcher> Pipeline<F> {
    pub fn new(fetcher: F, sink: CsvSink) -> Self {
        Self {
            fetcher,
            sink,
            progress: None,
        }
    }

    /// Draw one progress bar per index on stderr
    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.progress =
            enabled.then(|| MultiProgress::with_draw_target(ProgressDrawTarget::stderr()));
        self
    }

    /// Resolve `range` into daily indices and export each of them
    pub async fn run_range(&self, range: &DateRange, namespace: &str) -> Result<RunSummary> {
        let indices = resolve(range, namespace);
        self.run(&indices).await
    }

    /// Export `indices` strictly in order. The first failure aborts the run;
    /// files of earlier indices stay as written.
    pub async fn run(&self, indices: &[IndexId]) -> Result<RunSummary> {
        let start_time = Instant::now();
        info!(
            "indexes: [{}]",
            indices
                .iter()
                .map(IndexId::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        );

        self.sink.prepare().await?;

        let mut summary = RunSummary::default();
        for index in indices {
            summary.indices.push(self.export_index(index).await?);
        }
        summary.elapsed = start_time.elapsed();
        Ok(summary)
    }

    /// Export one index, returning once every write for it has completed
    pub async fn export_index(&self, index: &IndexId) -> Result<IndexSummary> {
        let mut summary = IndexSummary {
            index: index.clone(),
            total_count: 0,
            pages: 0,
            rows: 0,
            bytes: 0,
        };
        let mut bar: Option<ProgressBar> = None;
        let mut pending: Option<PendingWrite> = None;
        let mut pages = std::pin::pin!(extract_all(&self.fetcher, index.as_str()));

        loop {
            let next = pages.try_next().await;

            // Barrier on the previous write, whether or not the fetch succeeded
            if let Some(write) = pending.take() {
                match await_write(index, write).await {
                    Ok(receipt) => {
                        summary.absorb(receipt);
                        if let Some(pb) = &bar {
                            pb.inc(receipt.rows);
                        }
                    }
                    // The fetch failure is what stopped the index; the write
                    // failure has already been logged
                    Err(write_err) => {
                        return Err(match next {
                            Err(fetch_err) => {
                                error!("index: {}, fetch failed: {}", index, fetch_err);
                                fetch_err
                            }
                            Ok(_) => write_err,
                        });
                    }
                }
            }

            let Some(page) = next? else { break };

            let append = summary.pages > 0;
            if !append {
                summary.total_count = page.total_count;
                info!(
                    "index: {}, totalCount: {}, process start",
                    index, summary.total_count
                );
                bar = self
                    .progress
                    .as_ref()
                    .map(|mp| index_bar(mp, index.as_str(), summary.total_count));
            }
            summary.pages += 1;
            pending = Some(self.sink.write(index.as_str(), page.records, append));
        }

        if let Some(pb) = bar {
            pb.finish_with_message(format!("{} rows", summary.rows));
        }
        info!(
            "index: {}, totalCount: {}, process finish",
            index, summary.total_count
        );
        Ok(summary)
    }
}

impl IndexSummary {
    fn absorb(&mut self, receipt: WriteReceipt) {
        self.rows += receipt.rows;
        self.bytes += receipt.bytes;
    }
}

async fn await_write(index: &IndexId, write: PendingWrite) -> Result<WriteReceipt> {
    let path = write.path().to_path_buf();
    write.wait().await.inspect_err(|e| {
        error!(
            "index: {}, failed writing {}: {}",
            index,
            path.display(),
            e
        );
    })
}
