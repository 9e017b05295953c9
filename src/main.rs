use anyhow::{Context, Result};
use sitepipe::cli::commands::{BuildCommand, CheckCommand, DevCommand, RunCommand, TasksCommand};
use sitepipe::cli::output::*;
use sitepipe::cli::{Cli, Command};
use sitepipe::core::{BuildConfig, Composition, Pipeline, Project};
use sitepipe::execution::{ExecutionEngine, ExecutionEvent, ExecutionSummary, SchedulingStrategy};
use sitepipe::serve::{DevServer, DevSession, ReloadHub, SourceWatcher};
use sitepipe::tasks::{TaskContext, TaskRegistry, BUILTIN_TASKS};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("sitepipe={}", log_level)));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    let result = match cli.command() {
        Command::Build(cmd) => build(&cli, &cmd).await,
        Command::Dev(cmd) => dev(&cli, &cmd).await,
        Command::Run(cmd) => run_tasks(&cli, &cmd).await,
        Command::Clean => clean(&cli).await,
        Command::Check(cmd) => check(&cli, &cmd),
        Command::Tasks(cmd) => list_tasks(&cli, &cmd),
    };

    if let Err(err) = result {
        println!("{} {}", CROSS, style(format!("{:#}", err)).red());
        std::process::exit(1);
    }

    Ok(())
}

fn load_project(cli: &Cli) -> Result<Project> {
    Project::load(cli.config.as_deref()).context("Failed to load configuration")
}

fn create_engine(config: &BuildConfig, strategy: SchedulingStrategy) -> ExecutionEngine {
    ExecutionEngine::new(Arc::new(TaskRegistry::builtin()), strategy)
        .with_timeout(Duration::from_secs(config.task_timeout_secs))
}

/// Run a pipeline with a progress bar and per-step console lines
async fn execute_with_progress(
    project: &Project,
    mut pipeline: Pipeline,
    strategy: SchedulingStrategy,
) -> Result<ExecutionSummary> {
    let ctx = TaskContext::new(project);
    let mut engine = create_engine(&project.config, strategy);

    let progress = create_progress_bar(pipeline.steps.len());
    let bar = progress.clone();
    engine.add_event_handler(move |event| {
        match &event {
            ExecutionEvent::StepStarted { step_id, .. } => bar.set_message(step_id.clone()),
            ExecutionEvent::StepCompleted { .. }
            | ExecutionEvent::StepFailed { .. }
            | ExecutionEvent::StepSkipped { .. } => bar.inc(1),
            _ => {}
        }
        bar.println(format_execution_event(&event));
    });

    let result = engine.execute(&mut pipeline, &ctx).await;
    progress.finish_and_clear();

    let summary = result?;
    println!(
        "{} {} completed {}: {}",
        CHECK,
        style(&pipeline.name).bold(),
        style("successfully").green(),
        format_summary(&summary)
    );
    Ok(summary)
}

async fn build(cli: &Cli, cmd: &BuildCommand) -> Result<()> {
    let project = load_project(cli)?;
    let graph = project.config.graph(&cmd.graph).with_context(|| {
        let names: Vec<&str> = project.config.graphs.keys().map(String::as_str).collect();
        format!("Unknown graph '{}' (available: {})", cmd.graph, names.join(", "))
    })?;

    let pipeline = Pipeline::from_composition(&cmd.graph, graph);
    execute_with_progress(&project, pipeline, cmd.strategy.into()).await?;
    Ok(())
}

async fn run_tasks(cli: &Cli, cmd: &RunCommand) -> Result<()> {
    let project = load_project(cli)?;
    let pipeline = Pipeline::from_tasks("run", &cmd.tasks);
    execute_with_progress(&project, pipeline, SchedulingStrategy::Sequential).await?;
    Ok(())
}

async fn clean(cli: &Cli) -> Result<()> {
    let project = load_project(cli)?;
    let pipeline = Pipeline::from_tasks("clean", &["clean"]);
    execute_with_progress(&project, pipeline, SchedulingStrategy::Sequential).await?;
    Ok(())
}

async fn dev(cli: &Cli, cmd: &DevCommand) -> Result<()> {
    let mut project = load_project(cli)?;
    project.root = project
        .root
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", project.root.display()))?;
    if let Some(host) = &cmd.host {
        project.config.server.host = host.clone();
    }
    if let Some(port) = cmd.port {
        project.config.server.port = port;
    }

    if !cmd.no_build {
        let graph = project
            .config
            .graph("build")
            .context("No 'build' graph configured")?;
        let pipeline = Pipeline::from_composition("build", graph);
        execute_with_progress(&project, pipeline, SchedulingStrategy::Parallel).await?;
    }

    let hub = ReloadHub::default();
    let server = DevServer::start(&project.config.server, project.build_root(), hub.clone()).await?;
    println!("{} Serving {} at {}", ROCKET, style(project.build_root().display()).dim(), style(server.url()).cyan().bold());

    let source_root = project.source_root();
    let debounce = Duration::from_millis(project.config.server.watch_debounce_ms);
    let mut watcher = SourceWatcher::start(&source_root, debounce)
        .with_context(|| format!("Failed to watch {}", source_root.display()))?;

    let mut engine = create_engine(&project.config, SchedulingStrategy::Sequential);
    engine.add_event_handler(|event| match &event {
        ExecutionEvent::StepCompleted { .. } | ExecutionEvent::StepFailed { .. } => {
            println!("{}", format_execution_event(&event))
        }
        _ => {}
    });
    let session = DevSession::new(TaskContext::new(&project), engine, hub)?;

    println!("{} Watching {} (Ctrl-C to stop)", INFO, style(source_root.display()).dim());
    tokio::select! {
        _ = run_session(&session, &mut watcher) => {}
        signal = tokio::signal::ctrl_c() => {
            if let Err(err) = signal {
                error!("Failed to listen for Ctrl-C: {}", err);
            }
            info!("Shutting down");
        }
    }

    server.shutdown();
    Ok(())
}

async fn run_session(session: &DevSession, watcher: &mut SourceWatcher) {
    while let Some(paths) = watcher.next_batch().await {
        match session.handle_changes(&paths).await {
            Ok(Some(kind)) => println!("{}", format_reload(kind)),
            Ok(None) => {}
            Err(err) => println!("{} {}", CROSS, style(err).red()),
        }
    }
}

fn check(cli: &Cli, cmd: &CheckCommand) -> Result<()> {
    println!("{} Validating configuration...", INFO);
    let project = load_project(cli)?;
    let config = &project.config;

    println!("{} Configuration is valid!", CHECK);
    println!("  Source: {}", style(project.source_root().display()).bold());
    println!("  Output: {}", style(project.build_root().display()).bold());
    println!("  Graphs: {}", style(config.graphs.len()).cyan());
    println!("  Watch rules: {}", style(config.watch.len()).cyan());
    println!(
        "  Server: {}",
        style(format!("http://{}:{}", config.server.host, config.server.port)).cyan()
    );

    if cmd.json {
        let json = serde_json::to_string_pretty(config)?;
        println!("\n{}", json);
    }
    Ok(())
}

fn list_tasks(cli: &Cli, cmd: &TasksCommand) -> Result<()> {
    let project = load_project(cli)?;

    if cmd.json {
        let data = serde_json::json!({
            "tasks": BUILTIN_TASKS,
            "graphs": project.config.graphs,
        });
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    println!("{} Tasks:", INFO);
    for task in BUILTIN_TASKS {
        println!("  {}", style(task).bold());
    }

    println!("{} Graphs:", INFO);
    for (name, graph) in &project.config.graphs {
        println!("  {} = {}", style(name).bold(), describe(graph));
    }
    Ok(())
}

/// `series(clean, parallel(styles, html))`
fn describe(composition: &Composition) -> String {
    match composition {
        Composition::Task(name) => name.clone(),
        Composition::Series { series } => {
            format!("series({})", series.iter().map(describe).collect::<Vec<_>>().join(", "))
        }
        Composition::Parallel { parallel } => {
            format!("parallel({})", parallel.iter().map(describe).collect::<Vec<_>>().join(", "))
        }
    }
}
