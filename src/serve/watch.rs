//! Source watching and incremental rebuilds

use super::reload::ReloadHub;
use crate::{
    core::{config::WatchRuleConfig, FileSet, Pipeline, ReloadKind, SelectionError},
    execution::{ExecutionEngine, ExecutionError},
    tasks::TaskContext,
};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Source globs mapped to the tasks they trigger
#[derive(Debug, Clone)]
pub struct WatchRule {
    pub paths: FileSet,
    pub tasks: Vec<String>,
    pub reload: ReloadKind,
}

impl WatchRule {
    pub fn from_config(source_root: &Path, config: &WatchRuleConfig) -> Result<Self, SelectionError> {
        Ok(Self {
            paths: FileSet::new(source_root, &config.paths)?,
            tasks: config.tasks.clone(),
            reload: config.reload,
        })
    }

    pub fn matches(&self, path: &Path) -> bool {
        self.paths.matches(path)
    }
}

/// Tasks to rerun for a batch of changes, and the reload that follows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangePlan {
    pub tasks: Vec<String>,
    pub reload: ReloadKind,
}

/// Rebuilds outputs when sources change and tells browsers to reload
pub struct DevSession {
    ctx: TaskContext,
    engine: ExecutionEngine,
    rules: Vec<WatchRule>,
    hub: ReloadHub,
}

impl DevSession {
    pub fn new(ctx: TaskContext, engine: ExecutionEngine, hub: ReloadHub) -> Result<Self, SelectionError> {
        let rules = ctx
            .config
            .watch
            .iter()
            .map(|rule| WatchRule::from_config(&ctx.source_root, rule))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            ctx,
            engine,
            rules,
            hub,
        })
    }

    pub fn rules(&self) -> &[WatchRule] {
        &self.rules
    }

    pub fn hub(&self) -> &ReloadHub {
        &self.hub
    }

    /// Work out what a batch of changed paths requires; `None` when no rule matches
    pub fn plan(&self, paths: &[PathBuf]) -> Option<ChangePlan> {
        let mut tasks: Vec<String> = Vec::new();
        let mut reload = ReloadKind::None;
        let mut matched = false;

        for rule in &self.rules {
            if !paths.iter().any(|path| rule.matches(path)) {
                continue;
            }
            matched = true;
            reload = reload.max(rule.reload);
            for task in &rule.tasks {
                if !tasks.contains(task) {
                    tasks.push(task.clone());
                }
            }
        }

        matched.then_some(ChangePlan { tasks, reload })
    }

    /// Rerun the tasks matching `paths`, then signal the strongest reload.
    ///
    /// Returns the reload that was sent, or `None` when no rule matched.
    /// A failed rerun sends nothing.
    pub async fn handle_changes(&self, paths: &[PathBuf]) -> Result<Option<ReloadKind>, ExecutionError> {
        let Some(plan) = self.plan(paths) else {
            debug!("No watch rule matches {:?}", paths);
            return Ok(None);
        };

        info!("Change detected, running {}", plan.tasks.join(", "));
        let mut pipeline = Pipeline::from_tasks("watch", &plan.tasks);
        self.engine.execute(&mut pipeline, &self.ctx).await?;

        self.hub.notify(plan.reload);
        Ok(Some(plan.reload))
    }
}

/// Debounced filesystem watcher over the source root
pub struct SourceWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::UnboundedReceiver<PathBuf>,
    debounce: Duration,
}

impl SourceWatcher {
    pub fn start(root: &Path, debounce: Duration) -> notify::Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    // Only creations, modifications and removals trigger rebuilds
                    match event.kind {
                        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) => {}
                        _ => return,
                    }
                    for path in event.paths {
                        let _ = tx.send(path);
                    }
                }
                Err(err) => warn!("Watch error: {}", err),
            },
            Config::default(),
        )?;
        watcher.watch(root, RecursiveMode::Recursive)?;
        info!("Watching {}", root.display());

        Ok(Self {
            _watcher: watcher,
            rx,
            debounce,
        })
    }

    /// Wait for a change, then gather everything that follows until the
    /// debounce window passes quietly. Returns `None` once the watcher is gone.
    pub async fn next_batch(&mut self) -> Option<Vec<PathBuf>> {
        let first = self.rx.recv().await?;
        let mut batch = vec![first];

        loop {
            match tokio::time::timeout(self.debounce, self.rx.recv()).await {
                Ok(Some(path)) => {
                    if !batch.contains(&path) {
                        batch.push(path);
                    }
                }
                Ok(None) | Err(_) => break,
            }
        }

        debug!("Change batch: {:?}", batch);
        Some(batch)
    }
}
