use super::errors::Result;
use super::git_ops::Vcs;
use super::notify::Notifier;
use super::propagate::propagate_all;
use super::reload::{ReloadClient, ReloadOutcome};
use super::repo_config::{BotCfg, RepoCfg};
use super::sync::{synchronize, SyncOutcome};
use log::{error, warn};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task;

/// Outcome of one bot update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadStatus {
    /// Propagation failed, so the bot was left alone.
    Skipped,
    Done(ReloadOutcome),
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct BotReport {
    pub name: String,
    pub files_copied: usize,
    pub propagation_error: Option<String>,
    pub reload: ReloadStatus,
}

#[derive(Debug, Clone)]
pub struct RepoReport {
    pub directory: PathBuf,
    pub outcome: SyncOutcome,
    /// Empty unless the repository changed.
    pub bots: Vec<BotReport>,
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub repositories: Vec<RepoReport>,
}

impl RunSummary {
    pub fn changed(&self) -> usize {
        self.repositories.iter().filter(|r| r.outcome.changed()).count()
    }

    pub fn files_copied(&self) -> usize {
        self.bots().map(|b| b.files_copied).sum()
    }

    pub fn reloads(&self) -> usize {
        self.bots()
            .filter(|b| matches!(b.reload, ReloadStatus::Done(ReloadOutcome::Reloaded(_))))
            .count()
    }

    pub fn failures(&self) -> usize {
        self.bots()
            .filter(|b| b.propagation_error.is_some() || matches!(b.reload, ReloadStatus::Failed(_)))
            .count()
    }

    fn bots(&self) -> impl Iterator<Item = &BotReport> {
        self.repositories.iter().flat_map(|r| r.bots.iter())
    }
}

async fn blocking<T, F>(work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    Ok(task::spawn_blocking(work).await?)
}

/// Drives one pass over every configured repository.
pub struct Updater<V: Vcs> {
    vcs: Arc<V>,
    notifier: Arc<Notifier>,
    reloader: Arc<ReloadClient>,
}

impl<V: Vcs> Clone for Updater<V> {
    fn clone(&self) -> Self {
        Self {
            vcs: Arc::clone(&self.vcs),
            notifier: Arc::clone(&self.notifier),
            reloader: Arc::clone(&self.reloader),
        }
    }
}

impl<V: Vcs> Updater<V> {
    pub fn new(vcs: V, notifier: Notifier, reloader: ReloadClient) -> Self {
        Self {
            vcs: Arc::new(vcs),
            notifier: Arc::new(notifier),
            reloader: Arc::new(reloader),
        }
    }

    /// Repositories strictly one after another, in declared order.
    pub async fn run(&self, repos: &[RepoCfg]) -> RunSummary {
        let mut summary = RunSummary::default();
        for repo in repos {
            summary.repositories.push(self.update_repository(repo).await);
        }
        summary
    }

    /// One task per repository; bots of a repository stay sequential.
    pub async fn run_concurrent(&self, repos: &[RepoCfg]) -> RunSummary {
        let mut tasks = Vec::new();

        for repo in repos {
            let updater = self.clone();
            let repo = repo.clone();
            tasks.push(task::spawn(async move { updater.update_repository(&repo).await }));
        }

        let mut summary = RunSummary::default();
        for (repo, task) in repos.iter().zip(tasks) {
            match task.await {
                Ok(report) => summary.repositories.push(report),
                Err(join_error) => {
                    error!("update task for {} died: {join_error}", repo.directory.display());
                    summary.repositories.push(RepoReport {
                        directory: repo.directory.clone(),
                        outcome: SyncOutcome::Failed {
                            directory: repo.directory.clone(),
                            error: join_error.to_string(),
                        },
                        bots: Vec::new(),
                    });
                }
            }
        }
        summary
    }

    pub async fn update_repository(&self, repo: &RepoCfg) -> RepoReport {
        let vcs = Arc::clone(&self.vcs);
        let cfg = repo.clone();
        let outcome = blocking(move || synchronize(vcs.as_ref(), &cfg))
            .await
            .unwrap_or_else(|error| SyncOutcome::Failed {
                directory: repo.directory.clone(),
                error: error.to_string(),
            });

        if let Some(text) = outcome.notification() {
            self.notifier.notify(&text).await;
        }

        let mut bots = Vec::new();
        if outcome.changed() {
            for bot in &repo.bots {
                bots.push(self.update_bot(repo, bot).await);
            }
        }

        RepoReport {
            directory: repo.directory.clone(),
            outcome,
            bots,
        }
    }

    async fn update_bot(&self, repo: &RepoCfg, bot: &BotCfg) -> BotReport {
        self.notifier
            .notify(&format!("Updating bot: {} in {}", bot.name, bot.directory.display()))
            .await;

        let (repo_cfg, bot_cfg) = (repo.clone(), bot.clone());
        let copied = blocking(move || propagate_all(&repo_cfg, &bot_cfg))
            .await
            .and_then(|copied| copied);

        let files_copied = match copied {
            Ok(count) => count,
            Err(error) => {
                self.notifier
                    .notify(&format!("Updating bot {} failed: {error}", bot.name))
                    .await;
                return BotReport {
                    name: bot.name.clone(),
                    files_copied: 0,
                    propagation_error: Some(error.to_string()),
                    reload: ReloadStatus::Skipped,
                };
            }
        };

        let reload = match self.reloader.reload(bot).await {
            Ok(outcome) => ReloadStatus::Done(outcome),
            Err(error) => {
                warn!("config reload for {} failed: {error}", bot.name);
                ReloadStatus::Failed(error.to_string())
            }
        };

        BotReport {
            name: bot.name.clone(),
            files_copied,
            propagation_error: None,
            reload,
        }
    }
}
