// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The in-process tool server.
//!
//! Protected-data operations (DB, mailboxes, task ops) run inside the
//! daemon, outside the sandbox. Agents reach them as tool calls through an
//! [`AgentTools`] handle whose identity is baked in at session creation;
//! the model supplies arguments, never who it is. Administrative
//! operations (team create/delete, network edits, workflow registration)
//! are deliberately absent: those are CLI-only.

use crate::context::EngineCtx;
use crate::error::EngineError;
use crate::workflow::WorkflowEngine;
use async_trait::async_trait;
use dg_core::{
    AgentName, Clock, Event, MessageKind, Priority, RepoName, Sender, TaskEventKind, TaskId,
    TeamId, WorkflowRef,
};
use dg_sandbox::{sandbox_runner_available, Denial, OsSandboxProfile, WriteGuard};
use dg_storage::{messages, reviews, tasks, teams, NewTask};
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Timeout for agent-issued bash commands.
const BASH_TIMEOUT: Duration = Duration::from_secs(600);

/// Object-safe backend the per-agent handles dispatch into.
#[async_trait]
pub trait ToolApi: Send + Sync {
    async fn dispatch(
        &self,
        team: TeamId,
        agent: &AgentName,
        tool: &str,
        args: Value,
    ) -> Result<Value, EngineError>;

    /// Record a sandbox denial for auditability.
    async fn record_denial(&self, team: TeamId, agent: &AgentName, denial: &Denial);

    /// Persist the result of a side-effectful tool call as a `tool_result`
    /// message in the calling agent's outbox.
    async fn record_tool_result(&self, team: TeamId, agent: &AgentName, tool: &str, result: &Value);
}

/// The daemon-side tool implementation.
pub struct ToolServer<C: Clock> {
    ctx: EngineCtx<C>,
    engine: Arc<WorkflowEngine<C>>,
}

impl<C: Clock + 'static> ToolServer<C> {
    pub fn new(ctx: EngineCtx<C>, engine: Arc<WorkflowEngine<C>>) -> Arc<Self> {
        Arc::new(Self { ctx, engine })
    }

    /// Bind the vocabulary to one agent's identity.
    pub fn bind(
        self: &Arc<Self>,
        team: TeamId,
        agent: AgentName,
        guard: WriteGuard,
    ) -> Arc<AgentTools> {
        let profile = OsSandboxProfile::for_config(&self.ctx.layout, guard.config());
        Arc::new(AgentTools {
            api: Arc::clone(self) as Arc<dyn ToolApi>,
            team,
            agent,
            guard,
            profile,
            side_effects: AtomicU32::new(0),
        })
    }
}

/// Tool names with observable side effects; their results are persisted as
/// `tool_result` messages for auditability.
const SIDE_EFFECT_TOOLS: &[&str] = &[
    "bash",
    "write_file",
    "mailbox_send",
    "task_create",
    "task_assign",
    "task_status",
    "task_review",
    "task_comment",
    "task_cancel",
    "task_attach",
    "task_detach",
];

/// Identity-bound handle handed to a model session.
pub struct AgentTools {
    api: Arc<dyn ToolApi>,
    pub team: TeamId,
    pub agent: AgentName,
    guard: WriteGuard,
    profile: OsSandboxProfile,
    side_effects: AtomicU32,
}

impl AgentTools {
    /// Dispatch a tool call. Denials and user errors come back as error
    /// payloads in the tool-result channel so the model can adjust; they
    /// never tear the turn down.
    ///
    /// `bash` and `write_file` are host-executed: they pass the write-path
    /// guard and bash deny-list first, and bash runs inside the OS sandbox
    /// wrapper. Everything else is a protected-data operation dispatched
    /// into the daemon.
    pub async fn call(&self, tool: &str, args: Value) -> Value {
        if let Err(denial) = self.guard.check_tool(tool) {
            self.api.record_denial(self.team, &self.agent, &denial).await;
            return json!({"error": denial.to_string(), "layer": denial.layer.to_string()});
        }
        let result = match tool {
            "bash" => match self.run_bash(&args).await {
                Ok(result) => result,
                Err(denial) => {
                    return json!({"error": denial.to_string(), "layer": denial.layer.to_string()})
                }
            },
            "write_file" => match self.write_file(&args).await {
                Ok(result) => result,
                Err(denial) => {
                    return json!({"error": denial.to_string(), "layer": denial.layer.to_string()})
                }
            },
            _ => match self.api.dispatch(self.team, &self.agent, tool, args).await {
                Ok(result) => result,
                Err(e) => return json!({"error": e.to_string(), "kind": e.kind().to_string()}),
            },
        };
        if SIDE_EFFECT_TOOLS.contains(&tool) {
            self.side_effects.fetch_add(1, Ordering::SeqCst);
            self.api.record_tool_result(self.team, &self.agent, tool, &result).await;
        }
        result
    }

    /// Run an agent bash command: deny-list scan, then the OS sandbox
    /// wrapper around the subprocess (plain bash only when no wrapper
    /// binary exists on this host).
    async fn run_bash(&self, args: &Value) -> Result<Value, Denial> {
        let Some(command) = args.get("command").and_then(Value::as_str) else {
            return Ok(json!({"error": "missing string argument \"command\""}));
        };
        self.check_bash(command).await?;

        let cwd: Option<PathBuf> = args
            .get("cwd")
            .and_then(Value::as_str)
            .map(PathBuf::from)
            .or_else(|| self.guard.config().write_allow.first().cloned());

        let (program, argv) = if sandbox_runner_available() {
            self.profile.wrap_bash(command)
        } else {
            tracing::warn!(
                agent = %self.agent,
                "no OS sandbox runner on this host; bash runs unwrapped"
            );
            ("bash".to_string(), vec!["-c".to_string(), command.to_string()])
        };
        let mut cmd = tokio::process::Command::new(&program);
        cmd.args(&argv);
        if let Some(cwd) = cwd {
            cmd.current_dir(cwd);
        }
        match crate::subprocess::run_with_timeout(cmd, BASH_TIMEOUT, "agent bash").await {
            Ok(output) => Ok(json!({
                "exit_code": output.status.code().unwrap_or(-1),
                "output": crate::subprocess::tail(&output, 100),
            })),
            Err(e) => Ok(json!({"error": e.to_string()})),
        }
    }

    /// Write a file on the agent's behalf, gated by the write-path guard.
    async fn write_file(&self, args: &Value) -> Result<Value, Denial> {
        let (Some(path), Some(content)) = (
            args.get("path").and_then(Value::as_str),
            args.get("content").and_then(Value::as_str),
        ) else {
            return Ok(json!({"error": "write_file needs string arguments \"path\" and \"content\""}));
        };
        let resolved = self.check_write(Path::new(path)).await?;
        if let Some(parent) = resolved.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                return Ok(json!({"error": format!("create {}: {e}", parent.display())}));
            }
        }
        match tokio::fs::write(&resolved, content).await {
            Ok(()) => Ok(json!({"written": resolved.display().to_string()})),
            Err(e) => Ok(json!({"error": format!("write {}: {e}", resolved.display())})),
        }
    }

    /// Layer-1 check for the session transport's file tools.
    pub async fn check_write(&self, path: &std::path::Path) -> Result<std::path::PathBuf, Denial> {
        match self.guard.check_write(path) {
            Ok(resolved) => Ok(resolved),
            Err(denial) => {
                self.api.record_denial(self.team, &self.agent, &denial).await;
                Err(denial)
            }
        }
    }

    /// Layer-2 check for the session transport's bash tool.
    pub async fn check_bash(&self, command: &str) -> Result<(), Denial> {
        match self.guard.check_bash(command) {
            Ok(()) => Ok(()),
            Err(denial) => {
                self.api.record_denial(self.team, &self.agent, &denial).await;
                Err(denial)
            }
        }
    }

    /// Side-effectful tool calls since the last take. The scheduler reads
    /// this per turn for the nudge decision.
    pub fn take_side_effects(&self) -> u32 {
        self.side_effects.swap(0, Ordering::SeqCst)
    }

    pub fn guard(&self) -> &WriteGuard {
        &self.guard
    }
}

#[async_trait]
impl<C: Clock + 'static> ToolApi for ToolServer<C> {
    async fn dispatch(
        &self,
        team: TeamId,
        agent: &AgentName,
        tool: &str,
        args: Value,
    ) -> Result<Value, EngineError> {
        tracing::debug!(%team, agent = %agent, tool, "tool call");
        match tool {
            "mailbox_send" => self.mailbox_send(team, agent, &args),
            "mailbox_inbox" => self.mailbox_inbox(team, agent),
            "task_create" => self.task_create(team, agent, &args),
            "task_list" => self.task_list(team),
            "task_show" => self.task_show(&args),
            "task_assign" => self.task_assign(&args),
            "task_status" => self.task_status(agent, &args).await,
            "task_review" => self.task_review(team, agent, &args).await,
            "task_comment" => self.task_comment(team, agent, &args),
            "task_cancel" => self.task_cancel(&args).await,
            "task_attach" => self.task_attach(&args, true),
            "task_detach" => self.task_attach(&args, false),
            "repo_list" => self.repo_list(team),
            other => Ok(json!({"error": format!("unknown tool {other:?}")})),
        }
    }

    async fn record_denial(&self, team: TeamId, agent: &AgentName, denial: &Denial) {
        let result = self.ctx.commit(|tx| {
            tx.emit(
                team,
                Event::SandboxDenial {
                    agent: agent.to_string(),
                    layer: denial.layer.to_string(),
                    operation: denial.operation.clone(),
                },
            )?;
            Ok(())
        });
        if let Err(e) = result {
            tracing::error!(error = %e, "failed to record sandbox denial");
        }
    }

    async fn record_tool_result(
        &self,
        team: TeamId,
        agent: &AgentName,
        tool: &str,
        result: &Value,
    ) {
        let body = format!("{tool}: {result}");
        let sender = Sender::Daemon;
        let outcome = self.ctx.commit(|tx| {
            let message = messages::insert(
                tx.conn(),
                team,
                &sender,
                agent.as_str(),
                MessageKind::ToolResult,
                &body,
                None,
                tx.now_ms(),
            )?;
            // Tool results are audit records, not new work for the agent.
            messages::mark_read(tx.conn(), &[message.id])?;
            tx.emit(
                team,
                Event::MessageSent {
                    message: message.id,
                    sender: Sender::Daemon,
                    recipient: agent.to_string(),
                    kind: MessageKind::ToolResult,
                    task: None,
                },
            )?;
            Ok(())
        });
        if let Err(e) = outcome {
            tracing::error!(error = %e, "failed to persist tool result");
        }
    }
}

impl<C: Clock + 'static> ToolServer<C> {
    fn mailbox_send(
        &self,
        team: TeamId,
        agent: &AgentName,
        args: &Value,
    ) -> Result<Value, EngineError> {
        let to = str_arg(args, "to")?;
        let body = str_arg(args, "body")?;
        let task = args.get("task").and_then(Value::as_i64).map(TaskId);
        let sender = Sender::Agent(agent.to_string());
        let message = self.ctx.commit(|tx| {
            let message = messages::insert(
                tx.conn(),
                team,
                &sender,
                to,
                MessageKind::Chat,
                body,
                task,
                tx.now_ms(),
            )?;
            tx.emit(
                team,
                Event::MessageSent {
                    message: message.id,
                    sender: sender.clone(),
                    recipient: to.to_string(),
                    kind: MessageKind::Chat,
                    task,
                },
            )?;
            Ok(message)
        })?;
        Ok(json!({"message_id": message.id.0, "delivered_to": to}))
    }

    fn mailbox_inbox(&self, team: TeamId, agent: &AgentName) -> Result<Value, EngineError> {
        let inbox = self
            .ctx
            .store
            .read(|conn| messages::unread_for(conn, team, agent.as_str()))?;
        Ok(serde_json::to_value(&inbox).unwrap_or_else(|_| json!([])))
    }

    fn task_create(
        &self,
        team: TeamId,
        agent: &AgentName,
        args: &Value,
    ) -> Result<Value, EngineError> {
        let title = str_arg(args, "title")?;
        let registry = self.engine.registry();
        let workflow = registry
            .latest("default")
            .map(|w| w.reference())
            .unwrap_or_else(|| WorkflowRef::new("default", 1));

        let mut new = NewTask::new(title, workflow);
        if let Some(description) = args.get("description").and_then(Value::as_str) {
            new = new.description(description);
        }
        if let Some(priority) = args.get("priority").and_then(Value::as_str) {
            new.priority = Priority::parse(priority).unwrap_or_default();
        }
        new.dri = args
            .get("dri")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| Some(agent.to_string()));
        new.assignee = args.get("assignee").and_then(Value::as_str).map(str::to_string);
        new.reviewer = args.get("reviewer").and_then(Value::as_str).map(str::to_string);
        if let Some(repos) = args.get("repos").and_then(Value::as_array) {
            new.repos = repos
                .iter()
                .filter_map(Value::as_str)
                .map(RepoName::from)
                .collect::<BTreeSet<_>>();
        }
        if let Some(deps) = args.get("depends_on").and_then(Value::as_array) {
            new.depends_on = deps.iter().filter_map(Value::as_i64).map(TaskId).collect();
        }

        let task = self.ctx.commit(|tx| {
            let team_row = teams::get_team(tx.conn(), team)?.ok_or_else(|| {
                dg_core::UserError::new(dg_core::ErrorCode::UnknownTeam, "team vanished")
            })?;
            // Default the repo set to every registered repo.
            if new.repos.is_empty() {
                new.repos =
                    teams::list_repos(tx.conn(), team)?.into_iter().map(|r| r.name).collect();
            }
            let task = tasks::insert(tx.conn(), team, &team_row.name, &new, tx.now_ms())?;
            tx.emit(
                team,
                Event::TaskCreated {
                    task: task.id,
                    title: task.title.clone(),
                    dri: task.dri.clone(),
                },
            )?;
            if let Some(assignee) = &task.assignee {
                tx.emit(
                    team,
                    Event::TaskAssigned { task: task.id, assignee: Some(assignee.clone()) },
                )?;
            }
            Ok(task)
        })?;
        Ok(json!({"task": task.id.0, "label": task.id.to_string(), "branch": task.branch}))
    }

    fn task_list(&self, team: TeamId) -> Result<Value, EngineError> {
        let filter = dg_storage::TaskFilter { team: Some(team), ..Default::default() };
        let list = self.ctx.store.read(|conn| tasks::list(conn, &filter))?;
        Ok(serde_json::to_value(&list).unwrap_or_else(|_| json!([])))
    }

    fn task_show(&self, args: &Value) -> Result<Value, EngineError> {
        let id = task_arg(args)?;
        let (task, review_list) = self.ctx.store.read(|conn| {
            let task = tasks::require(conn, id)?;
            let review_list = reviews::for_task(conn, id)?;
            Ok((task, review_list))
        })?;
        Ok(json!({
            "task": serde_json::to_value(&task).unwrap_or_default(),
            "reviews": serde_json::to_value(&review_list).unwrap_or_default(),
        }))
    }

    fn task_assign(&self, args: &Value) -> Result<Value, EngineError> {
        let id = task_arg(args)?;
        let assignee = str_arg(args, "assignee")?;
        self.ctx.commit(|tx| {
            let task = tasks::require(tx.conn(), id)?;
            tasks::set_assignee(tx.conn(), id, Some(assignee), tx.now_ms())?;
            tx.emit(
                task.team,
                Event::TaskAssigned { task: id, assignee: Some(assignee.to_string()) },
            )?;
            Ok(())
        })?;
        Ok(json!({"task": id.0, "assignee": assignee}))
    }

    async fn task_status(&self, agent: &AgentName, args: &Value) -> Result<Value, EngineError> {
        let id = task_arg(args)?;
        let event = str_arg(args, "event")?;
        let kind = TaskEventKind::parse(event).ok_or_else(|| {
            dg_core::UserError::new(
                dg_core::ErrorCode::BadArgument,
                format!("unknown task event {event:?}"),
            )
        })?;
        tracing::info!(task = %id, agent = %agent, event, "agent raised task event");
        self.engine.apply_event(id, kind).await?;
        let task = self.ctx.store.read(|conn| tasks::require(conn, id))?;
        Ok(json!({"task": id.0, "status": task.status.to_string()}))
    }

    /// Submit a review attempt: immutable record plus the matching task
    /// event (`review_approved` / `changes_requested`).
    async fn task_review(
        &self,
        team: TeamId,
        agent: &AgentName,
        args: &Value,
    ) -> Result<Value, EngineError> {
        let id = task_arg(args)?;
        let decision = match str_arg(args, "decision")? {
            "approved" => dg_core::ReviewDecision::Approved,
            "changes_requested" => dg_core::ReviewDecision::ChangesRequested,
            other => {
                return Err(dg_core::UserError::new(
                    dg_core::ErrorCode::BadArgument,
                    format!("unknown decision {other:?}"),
                )
                .into())
            }
        };
        let summary = args.get("summary").and_then(Value::as_str).unwrap_or("");
        let comments: Vec<dg_core::ReviewComment> = args
            .get("comments")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();

        let review = self.ctx.commit(|tx| {
            tasks::require(tx.conn(), id)?;
            let review = reviews::insert(
                tx.conn(),
                id,
                agent.as_str(),
                summary,
                &comments,
                decision,
                tx.now_ms(),
            )?;
            tx.emit(
                team,
                Event::ReviewCreated {
                    review: review.id,
                    task: id,
                    attempt: review.attempt,
                    reviewer: agent.to_string(),
                },
            )?;
            tx.emit(team, Event::ReviewDecided { review: review.id, task: id, decision })?;
            Ok(review)
        })?;

        let kind = match decision {
            dg_core::ReviewDecision::Approved => TaskEventKind::ReviewApproved,
            dg_core::ReviewDecision::ChangesRequested => TaskEventKind::ChangesRequested,
        };
        self.engine.apply_event(id, kind).await?;
        Ok(json!({"review": review.id.0, "attempt": review.attempt, "decision": decision.to_string()}))
    }

    fn task_comment(
        &self,
        team: TeamId,
        agent: &AgentName,
        args: &Value,
    ) -> Result<Value, EngineError> {
        let id = task_arg(args)?;
        let body = str_arg(args, "body")?;
        let sender = Sender::Agent(agent.to_string());
        self.ctx.commit(|tx| {
            let task = tasks::require(tx.conn(), id)?;
            // Route to whichever of DRI/assignee is not the commenter.
            let recipient = [task.dri.as_deref(), task.assignee.as_deref()]
                .into_iter()
                .flatten()
                .find(|name| *name != agent.as_str())
                .unwrap_or("manager")
                .to_string();
            let message = messages::insert(
                tx.conn(),
                team,
                &sender,
                &recipient,
                MessageKind::Chat,
                body,
                Some(id),
                tx.now_ms(),
            )?;
            tx.emit(
                team,
                Event::MessageSent {
                    message: message.id,
                    sender: sender.clone(),
                    recipient,
                    kind: MessageKind::Chat,
                    task: Some(id),
                },
            )?;
            Ok(())
        })?;
        Ok(json!({"task": id.0, "commented": true}))
    }

    async fn task_cancel(&self, args: &Value) -> Result<Value, EngineError> {
        let id = task_arg(args)?;
        let task = self.ctx.store.read(|conn| tasks::require(conn, id))?;
        if task.is_terminal() {
            // Idempotent: cancelling a settled task reports its status.
            return Ok(json!({"task": id.0, "status": task.status.to_string()}));
        }
        self.engine.apply_event(id, TaskEventKind::Cancelled).await?;
        let task = self.ctx.store.read(|conn| tasks::require(conn, id))?;
        self.ctx.commit(|tx| {
            tx.emit(task.team, Event::TaskCancelled { task: id })?;
            Ok(())
        })?;
        Ok(json!({"task": id.0, "status": task.status.to_string()}))
    }

    fn task_attach(&self, args: &Value, attach: bool) -> Result<Value, EngineError> {
        let id = task_arg(args)?;
        let path = str_arg(args, "path")?;
        self.ctx.commit(|tx| {
            let task = tasks::require(tx.conn(), id)?;
            if attach {
                tasks::add_attachment(tx.conn(), id, path, tx.now_ms())?;
            } else {
                tasks::remove_attachment(tx.conn(), id, path, tx.now_ms())?;
            }
            tx.emit(task.team, Event::TaskUpdated { task: id })?;
            Ok(())
        })?;
        Ok(json!({"task": id.0, "attached": attach}))
    }

    fn repo_list(&self, team: TeamId) -> Result<Value, EngineError> {
        let repos = self.ctx.store.read(|conn| teams::list_repos(conn, team))?;
        Ok(serde_json::to_value(&repos).unwrap_or_else(|_| json!([])))
    }
}

fn str_arg<'a>(args: &'a Value, key: &str) -> Result<&'a str, EngineError> {
    args.get(key).and_then(Value::as_str).ok_or_else(|| {
        dg_core::UserError::new(
            dg_core::ErrorCode::BadArgument,
            format!("missing string argument {key:?}"),
        )
        .into()
    })
}

fn task_arg(args: &Value) -> Result<TaskId, EngineError> {
    args.get("task").and_then(Value::as_i64).map(TaskId).ok_or_else(|| {
        dg_core::UserError::new(dg_core::ErrorCode::BadArgument, "missing integer argument \"task\"")
            .into()
    })
}

#[cfg(test)]
#[path = "tools_tests.rs"]
mod tests;
