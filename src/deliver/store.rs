// src/deliver/store.rs
//! Durable report storage at a deterministic date-keyed path. Re-running the
//! same date overwrites the same file (idempotent); a different date can
//! never touch another date's report because the date is the whole key.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct ReportStore {
    dir: PathBuf,
}

impl ReportStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, date_key: &str) -> PathBuf {
        self.dir.join(format!("{date_key}.md"))
    }

    /// Write via tmp-then-rename so a crash never leaves a half-written
    /// report at the published path.
    pub fn persist(&self, date_key: &str, content: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating report dir {}", self.dir.display()))?;
        let path = self.path_for(date_key);
        let tmp = path.with_extension("md.tmp");
        {
            let mut f = fs::File::create(&tmp)
                .with_context(|| format!("creating {}", tmp.display()))?;
            f.write_all(content.as_bytes()).context("writing report")?;
        }
        fs::rename(&tmp, &path).context("publishing report file")?;
        tracing::info!(path = %path.display(), "report persisted");
        Ok(path)
    }
}
