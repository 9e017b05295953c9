//! Series/parallel task composition
//!
//! A graph is written in YAML as nested `series` and `parallel` groups of
//! task names:
//!
//! ```yaml
//! graphs:
//!   build:
//!     series:
//!       - clean
//!       - copy
//!       - parallel: [styles, html]
//! ```
//!
//! and lowered into a dependency graph of steps.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A composition of tasks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Composition {
    /// A single task, by name
    Task(String),
    /// Run each element after the previous one finished
    Series { series: Vec<Composition> },
    /// Run the elements independently of each other
    Parallel { parallel: Vec<Composition> },
}

/// A step produced by lowering a composition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoweredStep {
    pub id: String,
    pub task: String,
    pub dependencies: Vec<String>,
}

impl Composition {
    pub fn task(name: impl Into<String>) -> Self {
        Composition::Task(name.into())
    }

    pub fn series(items: impl IntoIterator<Item = Composition>) -> Self {
        Composition::Series {
            series: items.into_iter().collect(),
        }
    }

    pub fn parallel(items: impl IntoIterator<Item = Composition>) -> Self {
        Composition::Parallel {
            parallel: items.into_iter().collect(),
        }
    }

    /// Run the given task names one after another
    pub fn series_of<S: AsRef<str>>(names: &[S]) -> Self {
        Self::series(names.iter().map(|n| Self::task(n.as_ref())))
    }

    /// The graphs every configuration starts with
    pub fn default_graphs() -> BTreeMap<String, Composition> {
        let assets = || {
            Self::parallel(
                ["styles", "html", "scripts", "svg", "sprite", "webp"]
                    .into_iter()
                    .map(Self::task),
            )
        };

        let build = Self::series(
            ["clean", "copy", "copy-images", "optimize-images"]
                .into_iter()
                .map(Self::task)
                .chain(std::iter::once(assets())),
        );

        let mut graphs = BTreeMap::new();
        graphs.insert("build".to_string(), build);
        graphs.insert("assets".to_string(), assets());
        graphs
    }

    /// Every task name referenced, in declaration order (duplicates kept)
    pub fn task_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Composition::Task(name) => names.push(name),
            Composition::Series { series: items } | Composition::Parallel { parallel: items } => {
                for item in items {
                    item.collect_names(names);
                }
            }
        }
    }

    /// Lower into steps with explicit dependencies.
    ///
    /// A step in a series depends on every terminal step of the element
    /// before it; elements of a parallel group share the incoming
    /// dependencies.
    pub fn lower(&self) -> Vec<LoweredStep> {
        let mut steps = Vec::new();
        let mut seen = HashMap::new();
        self.lower_into(Vec::new(), &mut steps, &mut seen);
        steps
    }

    fn lower_into(
        &self,
        incoming: Vec<String>,
        steps: &mut Vec<LoweredStep>,
        seen: &mut HashMap<String, usize>,
    ) -> Vec<String> {
        match self {
            Composition::Task(name) => {
                let count = seen.entry(name.clone()).or_insert(0);
                *count += 1;
                let id = if *count == 1 {
                    name.clone()
                } else {
                    format!("{}#{}", name, count)
                };
                steps.push(LoweredStep {
                    id: id.clone(),
                    task: name.clone(),
                    dependencies: incoming,
                });
                vec![id]
            }
            Composition::Series { series } => series
                .iter()
                .fold(incoming, |current, item| item.lower_into(current, steps, seen)),
            Composition::Parallel { parallel } => {
                if parallel.is_empty() {
                    return incoming;
                }
                parallel
                    .iter()
                    .flat_map(|item| item.lower_into(incoming.clone(), steps, seen))
                    .collect()
            }
        }
    }
}
