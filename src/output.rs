use csv::{Terminator, WriterBuilder};
use std::path::{Path, PathBuf};
use tokio::{
    fs as tokio_fs,
    io::{AsyncWriteExt, BufWriter as TokioBufWriter},
    task::JoinHandle,
};

use crate::error::{ExportError, Result};
use crate::retrieval::Record;

pub const CSV_HEADER: &str = "Log";

/// Outcome of one completed page write
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteReceipt {
    pub rows: u64,
    pub bytes: u64,
}

/// Completion signal for a write running in the background
pub struct PendingWrite {
    path: PathBuf,
    handle: JoinHandle<Result<WriteReceipt>>,
}

impl PendingWrite {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wait for the write to land on disk
    pub async fn wait(self) -> Result<WriteReceipt> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) => Err(ExportError::io(
                self.path,
                std::io::Error::other(format!("write task failed: {}", e)),
            )),
        }
    }
}

/// Writes pages of records to one `{index}.csv` per index
#[derive(Debug, Clone)]
pub struct CsvSink {
    output_dir: PathBuf,
}

impl CsvSink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn path_for(&self, index: &str) -> PathBuf {
        self.output_dir.join(format!("{}.csv", index))
    }

    /// Create the output directory if it does not exist yet
    pub async fn prepare(&self) -> Result<()> {
        log::debug!("Ensuring output directory {}", self.output_dir.display());
        tokio_fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| ExportError::io(&self.output_dir, e))
    }

    /// Start writing `records` in the background.
    ///
    /// `append = false` truncates the file and writes the header first;
    /// `append = true` adds rows to the existing file. Callers must wait on
    /// the previous write for an index before starting the next one.
    pub fn write(&self, index: &str, records: Vec<Record>, append: bool) -> PendingWrite {
        let path = self.path_for(index);
        let task_path = path.clone();
        let handle = tokio::spawn(async move { write_records(&task_path, &records, append).await });
        PendingWrite { path, handle }
    }
}

/// Write `records` to `path` and flush
pub async fn write_records(path: &Path, records: &[Record], append: bool) -> Result<WriteReceipt> {
    let mut open_options = tokio_fs::OpenOptions::new();
    open_options.create(true);
    if append {
        open_options.append(true);
    } else {
        open_options.write(true).truncate(true);
    }

    let file = open_options
        .open(path)
        .await
        .map_err(|e| ExportError::io(path, e))?;

    let buffer = encode_rows(records, !append).map_err(|e| ExportError::io(path, e))?;
    let mut writer = TokioBufWriter::new(file);
    writer
        .write_all(&buffer)
        .await
        .map_err(|e| ExportError::io(path, e))?;
    writer.flush().await.map_err(|e| ExportError::io(path, e))?;

    log::debug!(
        "Wrote {} rows ({} bytes) to {}",
        records.len(),
        buffer.len(),
        path.display()
    );
    Ok(WriteReceipt {
        rows: records.len() as u64,
        bytes: buffer.len() as u64,
    })
}

/// Serialise records as single-column CSV rows, optionally preceded by the header
pub fn encode_rows(records: &[Record], with_header: bool) -> std::io::Result<Vec<u8>> {
    let estimated_size = records.iter().map(|r| r.log.len() + 3).sum::<usize>() + 4;
    let mut writer = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::with_capacity(estimated_size));

    if with_header {
        writer.write_record([CSV_HEADER])?;
    }
    for record in records {
        writer.write_record([record.log.as_str()])?;
    }
    writer.into_inner().map_err(|e| e.into_error())
}
