//! Dashboard publishing and the remote scheduler trigger

use std::path::PathBuf;
use std::process::Output;
use std::time::Duration;

use chrono::Local;
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::Serialize;
use tokio::process::Command;
use tracing::{debug, info, warn};

use consoleqa_common::config::{PathsConfig, PublishConfig};

use crate::error::{E2eError, E2eResult};

/// What a publish attempt did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    NothingToCommit,
    Committed { pushed: bool },
}

/// Commits regenerated dashboard artifacts and pushes them
pub struct DashboardPublisher {
    root: PathBuf,
    dirs: Vec<PathBuf>,
}

impl DashboardPublisher {
    pub fn new(paths: &PathsConfig) -> Self {
        Self {
            root: paths.root.clone(),
            dirs: paths.artifact_dirs(),
        }
    }

    /// Stage the artifact directories, commit when anything changed, then
    /// push. A failed push is logged and reported, not returned as an error.
    pub async fn publish(&self) -> E2eResult<PublishOutcome> {
        let dirs: Vec<String> = self
            .dirs
            .iter()
            .filter(|d| self.root.join(d).exists())
            .map(|d| d.to_string_lossy().into_owned())
            .collect();
        if dirs.is_empty() {
            info!("No dashboard changes to commit");
            return Ok(PublishOutcome::NothingToCommit);
        }

        let mut add = vec!["add".to_string()];
        add.extend(dirs);
        self.git_checked(&add[..]).await?;

        let staged = self.git_checked(&["diff", "--cached", "--stat"]).await?;
        if String::from_utf8_lossy(&staged.stdout).trim().is_empty() {
            info!("No dashboard changes to commit");
            return Ok(PublishOutcome::NothingToCommit);
        }

        let message = commit_message(&Local::now().format("%b %-d, %Y, %-I:%M %p").to_string());
        self.git_checked(&["commit", "-m", &message]).await?;
        info!("Committed: {}", message);

        let push = self.git(&["push"]).await?;
        if push.status.success() {
            info!("✓ Dashboard pushed");
            Ok(PublishOutcome::Committed { pushed: true })
        } else {
            warn!(
                "git push failed: {}",
                String::from_utf8_lossy(&push.stderr).trim()
            );
            Ok(PublishOutcome::Committed { pushed: false })
        }
    }

    async fn git<S: AsRef<str>>(&self, args: &[S]) -> E2eResult<Output> {
        let args: Vec<&str> = args.iter().map(AsRef::as_ref).collect();
        debug!("git {}", args.join(" "));
        Command::new("git")
            .args(&args)
            .current_dir(&self.root)
            .output()
            .await
            .map_err(|e| E2eError::Git(format!("failed to run git: {}", e)))
    }

    async fn git_checked<S: AsRef<str>>(&self, args: &[S]) -> E2eResult<Output> {
        let output = self.git(args).await?;
        if !output.status.success() {
            let cmd: Vec<&str> = args.iter().map(AsRef::as_ref).collect();
            return Err(E2eError::Git(format!(
                "git {} failed: {}",
                cmd.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(output)
    }
}

pub fn commit_message(timestamp: &str) -> String {
    format!("Update dashboard data — {}", timestamp)
}

#[derive(Serialize)]
struct DispatchBody<'a> {
    event_type: &'a str,
}

/// Fires a `repository_dispatch` event so the scheduled workflow runs now
#[derive(Debug, Clone)]
pub struct SchedulerTrigger {
    client: reqwest::Client,
    endpoint: String,
    token: String,
    event_type: String,
}

impl SchedulerTrigger {
    /// Requires owner, repository and token
    pub fn from_config(config: &PublishConfig) -> E2eResult<Self> {
        let owner = config
            .owner
            .as_deref()
            .ok_or(E2eError::MissingConfig("GITHUB_OWNER"))?;
        let repo = config
            .repo
            .as_deref()
            .ok_or(E2eError::MissingConfig("GITHUB_REPO"))?;
        let token = config
            .token
            .clone()
            .ok_or(E2eError::MissingConfig("GITHUB_PAT"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/repos/{}/{}/dispatches",
                config.api_base.trim_end_matches('/'),
                owner,
                repo
            ),
            token,
            event_type: config.event_type.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn dispatch(&self) -> E2eResult<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(AUTHORIZATION, format!("token {}", self.token))
            .header(ACCEPT, "application/vnd.github+json")
            .header(USER_AGENT, format!("consoleqa/{}", consoleqa_common::VERSION))
            .json(&DispatchBody {
                event_type: &self.event_type,
            })
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() >= 300 {
            let body = response.text().await.unwrap_or_default();
            return Err(E2eError::Dispatch {
                status: status.as_u16(),
                body,
            });
        }

        info!("✓ Dispatched '{}' to {}", self.event_type, self.endpoint);
        Ok(())
    }
}
