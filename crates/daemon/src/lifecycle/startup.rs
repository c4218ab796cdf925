// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup and initialization logic.

use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

use crate::config::DaemonConfig;
use crate::event_bus::EventBus;
use crate::workflows;
use dg_core::{Clock, Layout, SystemClock};
use dg_engine::{
    CommandSessionFactory, EngineCtx, Executor, MergeWorker, Scheduler, SchedulerConfig,
    SessionManager, WorkflowEngine, WorkflowRegistry,
};
use dg_sandbox::NetworkAllowlist;
use dg_storage::Store;
use fs2::FileExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::LifecycleError;

/// Everything the HTTP surface and the shutdown path need to reach.
pub struct DaemonHandle {
    pub layout: Layout,
    pub config: DaemonConfig,
    pub store: Arc<Store>,
    pub bus: EventBus,
    pub engine: Arc<WorkflowEngine<SystemClock>>,
    pub sessions: Arc<SessionManager<SystemClock>>,
    pub scheduler: Arc<Scheduler<SystemClock>>,
    pub registry: Arc<WorkflowRegistry>,
    pub ctx: EngineCtx<SystemClock>,
    pub cancel: CancellationToken,
    pub start_time: Instant,
    /// Held for the process lifetime; the OS releases it on exit, which is
    /// what makes stale locks impossible.
    _lock_file: std::fs::File,
}

/// Start the daemon: acquire the singleton lock, migrate the store, wire
/// the engine, and spawn the background workers. The HTTP listener is
/// bound by the caller (it owns the port error handling).
pub async fn startup(layout: Layout) -> Result<Arc<DaemonHandle>, LifecycleError> {
    std::fs::create_dir_all(layout.protected_dir())?;

    // 1. Acquire the lock FIRST. OpenOptions without truncate so a failed
    // acquisition never wipes the running daemon's PID.
    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(layout.lock_path())?;
    lock_file.try_lock_exclusive().map_err(|_| {
        let holder = std::fs::read_to_string(layout.pid_path())
            .map(|pid| format!(" (pid {})", pid.trim()))
            .unwrap_or_default();
        LifecycleError::LockHeld(holder)
    })?;

    // Record our PID now that the lock is ours.
    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    std::fs::write(layout.pid_path(), format!("{}\n", std::process::id()))?;

    // 2. Config + credential.
    let config = DaemonConfig::load_or_init(&layout)?;
    DaemonConfig::require_api_key()?;

    // 3. Open and migrate the store; a failed migration aborts startup.
    let clock = SystemClock;
    let store = Arc::new(Store::open(
        &layout.db_path(),
        &layout.backups_dir(),
        clock.epoch_ms(),
    )?);

    // 4. Network allowlist (created with defaults on first run).
    NetworkAllowlist::load_or_init(&layout.network_path())
        .map_err(|e| LifecycleError::Network(e.to_string()))?;

    // 5. Workflow registry: the built-in default plus every registered
    // definition file.
    let registry = Arc::new(WorkflowRegistry::new());
    registry.register(dg_engine::stages::default_workflow());
    let teams = store.read(dg_storage::teams::list_teams)?;
    for team in &teams {
        match workflows::load_dir(&registry, &layout.workflows_dir(team.id)) {
            Ok(0) => {}
            Ok(n) => info!(team = %team.name, n, "loaded workflow definitions"),
            Err(e) => tracing::warn!(team = %team.name, error = %e, "workflow dir load failed"),
        }
    }

    // 6. Engine wiring: store -> ctx -> executor -> engine -> sessions,
    // with the live-event channel feeding the bus.
    let (event_tx, event_rx) = mpsc::channel(1024);
    let ctx = EngineCtx::new(Arc::clone(&store), layout.clone(), clock, event_tx);

    let (merge_tx, merge_rx) = mpsc::channel(64);
    let (raise_tx, mut raise_rx) = mpsc::channel(64);
    let executor = Executor::new(ctx.clone(), merge_tx, raise_tx);
    let engine = Arc::new(WorkflowEngine::new(ctx.clone(), Arc::clone(&registry), executor));

    let factory = Arc::new(CommandSessionFactory::new(config.session_command.clone()));
    let sessions = SessionManager::new(
        ctx.clone(),
        factory,
        Arc::clone(&engine),
        dg_core::ModelRates::default(),
    );

    let bus = EventBus::new(Arc::clone(&store));
    bus.spawn_forwarder(event_rx);

    let cancel = CancellationToken::new();

    // Raise pump: deferred follow-up events loop back into the engine.
    {
        let engine = Arc::clone(&engine);
        let cancel = cancel.clone();
        tokio::spawn(async move {
            loop {
                let next = tokio::select! {
                    next = raise_rx.recv() => next,
                    _ = cancel.cancelled() => return,
                };
                let Some((task, kind)) = next else { return };
                if let Err(e) = engine.apply_event(task, kind).await {
                    tracing::error!(%task, ?kind, error = %e, "raised event failed");
                }
            }
        });
    }

    // Merge worker: the single serialized queue.
    let worker = MergeWorker::new(
        ctx.clone(),
        Arc::clone(&engine),
        merge_rx,
        config.premerge_timeout(),
        cancel.clone(),
    );
    tokio::spawn(worker.run());

    // Scheduler: the central loop.
    let scheduler_config = SchedulerConfig {
        max_concurrent_turns: config.max_concurrent_turns,
        ..SchedulerConfig::default()
    };
    let scheduler = Scheduler::new(
        ctx.clone(),
        Arc::clone(&sessions),
        Arc::clone(&engine),
        scheduler_config,
        cancel.clone(),
    );
    tokio::spawn(Arc::clone(&scheduler).run());

    // Record the start in every team's event log.
    let version = env!("CARGO_PKG_VERSION").to_string();
    for team in &teams {
        let team_id = team.id;
        let v = version.clone();
        let _ = ctx.commit(move |tx| {
            tx.emit(team_id, dg_core::Event::DaemonStarted { version: v })?;
            Ok(())
        });
    }

    info!(teams = teams.len(), "daemon started");

    Ok(Arc::new(DaemonHandle {
        layout,
        config,
        store,
        bus,
        engine,
        sessions,
        scheduler,
        registry,
        ctx,
        cancel,
        start_time: Instant::now(),
        _lock_file: lock_file,
    }))
}
