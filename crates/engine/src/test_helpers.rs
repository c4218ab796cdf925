// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for engine tests.

use crate::context::EngineCtx;
use crate::executor::Executor;
use crate::stages::default_workflow;
use crate::workflow::{WorkflowEngine, WorkflowRegistry};
use dg_core::{
    AgentName, Clock, EventEnvelope, FakeClock, Layout, RepoConfig, Role, TaskEventKind, TaskId,
    Team, WorkflowRef,
};
use dg_storage::{tasks, teams, NewTask, Store};
use std::sync::Arc;
use tokio::sync::mpsc;

pub(crate) struct Harness {
    pub ctx: EngineCtx<FakeClock>,
    pub engine: Arc<WorkflowEngine<FakeClock>>,
    pub clock: FakeClock,
    pub team: Team,
    pub merge_rx: mpsc::Receiver<TaskId>,
    pub raise_rx: mpsc::Receiver<(TaskId, TaskEventKind)>,
    pub event_rx: mpsc::Receiver<EventEnvelope>,
    pub home: tempfile::TempDir,
}

impl Harness {
    /// Drain and apply every pending `Raise` effect (auto-approval chains).
    pub async fn pump_raises(&mut self) {
        while let Ok((task, kind)) = self.raise_rx.try_recv() {
            self.engine.apply_event(task, kind).await.expect("raise apply");
        }
    }

    pub fn task(&self, id: TaskId) -> dg_core::Task {
        self.ctx.store.read(|conn| tasks::require(conn, id)).expect("task")
    }

    pub fn create_task(&self, title: &str, assignee: Option<&str>) -> dg_core::Task {
        let mut new = NewTask::new(title, WorkflowRef::new("default", 1));
        new.assignee = assignee.map(str::to_string);
        new.dri = Some("pat".to_string());
        let team = &self.team;
        self.ctx
            .store
            .with_tx(self.clock.epoch_ms(), |tx| {
                // Default the repo set to every registered repo, the way
                // task_create does.
                new.repos =
                    teams::list_repos(tx.conn(), team.id)?.into_iter().map(|r| r.name).collect();
                tasks::insert(tx.conn(), team.id, &team.name, &new, tx.now_ms())
            })
            .expect("create task")
            .0
    }

    pub fn add_repo(&self, repo: &RepoConfig) {
        let team = self.team.id;
        self.ctx
            .store
            .with_tx(self.clock.epoch_ms(), |tx| teams::insert_repo(tx.conn(), team, repo))
            .expect("add repo");
    }

    pub fn drain_events(&mut self) -> Vec<EventEnvelope> {
        let mut events = Vec::new();
        while let Ok(envelope) = self.event_rx.try_recv() {
            events.push(envelope);
        }
        events
    }
}

pub(crate) fn harness() -> Harness {
    let home = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(Store::open_in_memory().expect("store"));
    let clock = FakeClock::new();
    let (event_tx, event_rx) = mpsc::channel(256);
    let ctx = EngineCtx::new(Arc::clone(&store), Layout::new(home.path()), clock.clone(), event_tx);

    let team = Team::new("acme", clock.epoch_ms());
    store
        .with_tx(clock.epoch_ms(), |tx| {
            teams::insert_team(tx.conn(), &team)?;
            for (name, role) in
                [("boss", Role::Manager), ("alice", Role::Engineer), ("rex", Role::Reviewer)]
            {
                let agent = dg_core::Agent::new(
                    team.id,
                    AgentName::parse(name).expect("name"),
                    role,
                    tx.now_ms(),
                );
                teams::insert_agent(tx.conn(), &agent)?;
            }
            Ok(())
        })
        .expect("seed team");

    let registry = Arc::new(WorkflowRegistry::new());
    registry.register(default_workflow());

    let (merge_tx, merge_rx) = mpsc::channel(16);
    let (raise_tx, raise_rx) = mpsc::channel(16);
    let executor = Executor::new(ctx.clone(), merge_tx, raise_tx);
    let engine = Arc::new(WorkflowEngine::new(ctx.clone(), registry, executor));

    Harness { ctx, engine, clock, team, merge_rx, raise_rx, event_rx, home }
}

/// Initialize a real git repo with one commit on `main`.
pub(crate) fn init_repo(dir: &std::path::Path) -> std::path::PathBuf {
    let repo = dir.to_path_buf();
    std::fs::create_dir_all(&repo).expect("mkdir");
    git(&repo, &["init", "-b", "main"]);
    git(&repo, &["config", "user.email", "daemon@example.com"]);
    git(&repo, &["config", "user.name", "Daemon"]);
    std::fs::write(repo.join("README.md"), "hello\n").expect("seed file");
    git(&repo, &["add", "-A"]);
    git(&repo, &["commit", "-m", "init"]);
    repo
}

pub(crate) fn git(repo: &std::path::Path, args: &[&str]) -> String {
    let output = std::process::Command::new("git")
        .arg("-C")
        .arg(repo)
        .args(args)
        .env_remove("GIT_DIR")
        .env_remove("GIT_WORK_TREE")
        .output()
        .expect("git spawn");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

pub(crate) fn commit_file(repo: &std::path::Path, name: &str, contents: &str, message: &str) {
    std::fs::write(repo.join(name), contents).expect("write file");
    git(repo, &["add", "-A"]);
    git(repo, &["commit", "-m", message]);
}
