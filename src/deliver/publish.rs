// src/deliver/publish.rs
//! Remote sync of the persisted report: stage everything, commit only when
//! the working tree actually changed, push when credentials exist. A failed
//! push never rolls back the local commit; the local artifact stays the
//! source of truth.

use std::path::PathBuf;
use std::process::Output;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio::process::Command;

use crate::config::RemoteRepo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Commit created and pushed.
    Pushed,
    /// Commit created; no remote configured.
    CommittedLocally,
    /// Working tree identical to the last commit; commit skipped.
    NoChanges,
    /// Commit (if any) retained locally, push failed.
    PushFailed,
}

#[async_trait]
pub trait RemoteSync: Send + Sync {
    async fn sync(&self, date_key: &str) -> Result<SyncOutcome>;
}

pub struct GitSync {
    workdir: PathBuf,
    remote: Option<RemoteRepo>,
}

impl GitSync {
    pub fn new(workdir: impl Into<PathBuf>, remote: Option<RemoteRepo>) -> Self {
        Self {
            workdir: workdir.into(),
            remote,
        }
    }

    async fn git(&self, args: &[&str]) -> Result<Output> {
        let out = Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .output()
            .await
            .with_context(|| format!("running git {}", args.join(" ")))?;
        if !out.status.success() {
            bail!(
                "git {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&out.stderr).trim()
            );
        }
        Ok(out)
    }

    async fn ensure_repo(&self) -> Result<()> {
        if self.workdir.join(".git").exists() {
            return Ok(());
        }
        tracing::info!(dir = %self.workdir.display(), "initializing git repository");
        self.git(&["init"]).await?;
        self.git(&["branch", "-M", "main"]).await?;
        Ok(())
    }

    async fn configure_remote(&self, remote: &RemoteRepo) -> Result<()> {
        let listed = self.git(&["remote"]).await?;
        let url = remote.push_url();
        if String::from_utf8_lossy(&listed.stdout)
            .lines()
            .any(|l| l.trim() == "origin")
        {
            self.git(&["remote", "set-url", "origin", &url]).await?;
        } else {
            self.git(&["remote", "add", "origin", &url]).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteSync for GitSync {
    async fn sync(&self, date_key: &str) -> Result<SyncOutcome> {
        self.ensure_repo().await?;
        self.git(&["add", "-A"]).await?;

        let status = self.git(&["status", "--porcelain"]).await?;
        let dirty = !String::from_utf8_lossy(&status.stdout).trim().is_empty();
        if dirty {
            let msg = format!("Report {date_key}");
            self.git(&[
                "-c",
                "user.name=finance-ai-scout",
                "-c",
                "user.email=scout@localhost",
                "commit",
                "-m",
                msg.as_str(),
            ])
            .await?;
        } else {
            tracing::info!("no report changes to commit");
        }

        let Some(remote) = &self.remote else {
            return Ok(if dirty {
                tracing::warn!("remote credentials absent; report committed locally only");
                SyncOutcome::CommittedLocally
            } else {
                SyncOutcome::NoChanges
            });
        };

        self.configure_remote(remote).await?;
        // Push even without a fresh commit so earlier failed pushes catch up.
        match self.git(&["push", "-u", "origin", "main"]).await {
            Ok(_) => Ok(if dirty {
                SyncOutcome::Pushed
            } else {
                SyncOutcome::NoChanges
            }),
            Err(e) => {
                tracing::warn!(error = ?e, "push failed; local commit retained");
                Ok(SyncOutcome::PushFailed)
            }
        }
    }
}
