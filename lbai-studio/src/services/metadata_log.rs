//! Append-only generation log
//!
//! One plain-text block per finished job. Each block is written with a single
//! append so concurrent jobs never interleave within a block.

use crate::error::PipelineResult;
use lbai_common::JobId;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

const BLOCK_TERMINATOR: &str = "---------------------------";

/// One log entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationLogRecord {
    pub job_id: JobId,
    pub title: String,
    pub file_format: String,
    pub file_path: PathBuf,
    /// Image URL or `none`
    pub pic: String,
    /// Video URL or `none`
    pub video: String,
    /// Lyrics length in characters
    pub lyrics_len: usize,
}

impl GenerationLogRecord {
    /// Text block appended to the log, including leading newline
    pub fn to_block(&self) -> String {
        format!(
            "\nJOB: {}\nTITLE: {}\nFORMAT: {}\nFILE: {}\nPIC: {}\nVIDEO: {}\nLYRICS_LEN: {}\n{}\n",
            self.job_id,
            self.title,
            self.file_format,
            self.file_path.display(),
            self.pic,
            self.video,
            self.lyrics_len,
            BLOCK_TERMINATOR
        )
    }
}

/// Writer for the generation log file
#[derive(Debug, Clone)]
pub struct MetadataLogger {
    path: PathBuf,
}

impl MetadataLogger {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record
    pub async fn append(&self, record: &GenerationLogRecord) -> PipelineResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(record.to_block().as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
