// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The cooperative daemon loop: scan mailboxes, admit turns, retry gated
//! worktrees. At most one turn per agent is ever in flight; a bounded pool
//! caps concurrency across agents.

use crate::context::EngineCtx;
use crate::error::EngineError;
use crate::executor::Effect;
use crate::session_manager::SessionManager;
use crate::workflow::WorkflowEngine;
use dg_core::{AgentName, Clock, Event, Message, MessageId, TaskId, Team, TeamId};
use dg_storage::{messages, tasks};
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub tick_interval: Duration,
    pub max_concurrent_turns: usize,
    /// Consecutive synthetic "continue" prompts before giving up on an
    /// idle-stalled agent.
    pub max_nudges: u32,
    pub backoff_base: Duration,
    pub backoff_cap: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(250),
            max_concurrent_turns: 4,
            max_nudges: 3,
            backoff_base: Duration::from_secs(2),
            backoff_cap: Duration::from_secs(60),
        }
    }
}

type AgentKey = (TeamId, AgentName);

pub struct Scheduler<C: Clock> {
    ctx: EngineCtx<C>,
    sessions: Arc<SessionManager<C>>,
    engine: Arc<WorkflowEngine<C>>,
    config: SchedulerConfig,
    pool: Arc<Semaphore>,
    in_flight: Arc<Mutex<HashSet<AgentKey>>>,
    nudges: Arc<Mutex<HashMap<AgentKey, u32>>>,
    /// Agents cooling down after a rate limit: (attempt, earliest retry).
    backoff: Arc<Mutex<HashMap<AgentKey, (u32, Instant)>>>,
    cancel: CancellationToken,
    /// Child tokens per team so team deletion cancels that team's turns.
    team_tokens: Mutex<HashMap<TeamId, CancellationToken>>,
}

impl<C: Clock + 'static> Scheduler<C> {
    pub fn new(
        ctx: EngineCtx<C>,
        sessions: Arc<SessionManager<C>>,
        engine: Arc<WorkflowEngine<C>>,
        config: SchedulerConfig,
        cancel: CancellationToken,
    ) -> Arc<Self> {
        let pool = Arc::new(Semaphore::new(config.max_concurrent_turns));
        Arc::new(Self {
            ctx,
            sessions,
            engine,
            config,
            pool,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            nudges: Arc::new(Mutex::new(HashMap::new())),
            backoff: Arc::new(Mutex::new(HashMap::new())),
            cancel,
            team_tokens: Mutex::new(HashMap::new()),
        })
    }

    /// Run ticks until shutdown.
    pub async fn run(self: Arc<Self>) {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return,
                _ = tokio::time::sleep(self.config.tick_interval) => {}
            }
            if let Err(e) = self.tick().await {
                tracing::error!(error = %e, "scheduler tick failed");
            }
        }
    }

    /// True when no turn is in flight.
    pub fn idle(&self) -> bool {
        self.in_flight.lock().is_empty()
    }

    /// Cancel every in-flight turn for a team (team deletion).
    pub fn cancel_team(&self, team: TeamId) {
        if let Some(token) = self.team_tokens.lock().remove(&team) {
            token.cancel();
        }
    }

    fn team_token(&self, team: TeamId) -> CancellationToken {
        self.team_tokens.lock().entry(team).or_insert_with(|| self.cancel.child_token()).clone()
    }

    /// One pass: retry gated worktrees, then batch and dispatch unread
    /// mailboxes.
    pub async fn tick(self: &Arc<Self>) -> Result<(), EngineError> {
        let teams = self.ctx.store.read(dg_storage::teams::list_teams)?;
        for team in &teams {
            self.retry_gated(team).await?;
            self.dispatch_team(team).await?;
        }
        Ok(())
    }

    /// Worktree setup refused by the dependency gate is retried every tick.
    async fn retry_gated(&self, team: &Team) -> Result<(), EngineError> {
        let gated = self.ctx.store.read(|conn| {
            let filter = dg_storage::TaskFilter { team: Some(team.id), ..Default::default() };
            let open = tasks::list(conn, &filter)?;
            let mut ready = Vec::new();
            for task in open {
                if task.status == dg_core::StageKey::IN_PROGRESS
                    && !task.has_worktree()
                    && !task.repos.is_empty()
                    && tasks::deps_terminal(conn, task.id)?
                {
                    ready.push(task.id);
                }
            }
            Ok(ready)
        })?;
        if !gated.is_empty() {
            let effects = gated.into_iter().map(|task| Effect::SetupWorktree { task }).collect();
            self.engine.executor().execute_all(effects).await;
        }
        Ok(())
    }

    async fn dispatch_team(self: &Arc<Self>, team: &Team) -> Result<(), EngineError> {
        let unread = self.ctx.store.read(|conn| messages::unread(conn, team.id))?;
        if unread.is_empty() {
            return Ok(());
        }
        let roster: HashSet<String> = self
            .ctx
            .store
            .read(|conn| dg_storage::teams::list_agents(conn, team.id))?
            .into_iter()
            .map(|a| a.name.as_str().to_string())
            .collect();

        // Group per recipient, preserving message-id order.
        let mut grouped: IndexMap<String, Vec<Message>> = IndexMap::new();
        for message in unread {
            grouped.entry(message.recipient.clone()).or_default().push(message);
        }

        for (recipient, inbox) in grouped {
            // Mailboxes of humans are drained by the UI, not by turns.
            if !roster.contains(&recipient) {
                continue;
            }
            let Ok(agent) = AgentName::parse(&recipient) else { continue };
            let key = (team.id, agent.clone());

            if self.in_flight.lock().contains(&key) {
                continue;
            }
            if let Some((_, not_before)) = self.backoff.lock().get(&key) {
                if *not_before > Instant::now() {
                    continue;
                }
            }

            let batch = make_batch(&inbox);
            if batch.is_empty() {
                continue;
            }

            let permit = match Arc::clone(&self.pool).try_acquire_owned() {
                Ok(permit) => permit,
                // Pool saturated: everyone else waits for a later tick.
                Err(_) => break,
            };
            self.in_flight.lock().insert(key.clone());
            let scheduler = Arc::clone(self);
            let team = team.clone();
            let token = self.team_token(team.id);
            tokio::spawn(async move {
                scheduler.run_one_turn(&team, &agent, batch, token).await;
                scheduler.in_flight.lock().remove(&key);
                drop(permit);
            });
        }
        Ok(())
    }

    async fn run_one_turn(
        self: &Arc<Self>,
        team: &Team,
        agent: &AgentName,
        batch: Vec<Message>,
        token: CancellationToken,
    ) {
        let batch_ids: Vec<MessageId> = batch.iter().map(|m| m.id).collect();
        let task: Option<TaskId> = batch.iter().rev().find_map(|m| m.task);
        let prompt = render_batch(&batch);

        if let Err(e) = self.ctx.commit(|tx| messages::mark_read(tx.conn(), &batch_ids)) {
            tracing::error!(error = %e, "failed to mark batch read");
            return;
        }

        // Stream deltas into the event log with a per-turn monotonic index.
        let (delta_tx, delta_rx) = mpsc::channel::<String>(64);
        let pump = spawn_delta_pump(self.ctx.clone(), team.id, agent.clone(), delta_rx);

        let outcome = tokio::select! {
            outcome = self.sessions.run_turn(
                team.id,
                agent,
                task,
                batch_ids.clone(),
                crate::session::TurnRequest { prompt },
                delta_tx,
            ) => Some(outcome),
            _ = token.cancelled() => None,
        };
        let _ = pump.await;

        let key = (team.id, agent.clone());
        match outcome {
            None => {
                // Cancelled cooperatively; committed side effects stay.
                tracing::info!(team = %team.name, %agent, "turn cancelled");
                self.emit_turn_failed(team.id, agent, "cancelled");
            }
            Some(Ok((_reply, _usage, side_effects))) => {
                self.backoff.lock().remove(&key);
                if side_effects == 0 {
                    self.nudge(team, agent).await;
                } else {
                    self.nudges.lock().remove(&key);
                }
            }
            Some(Err(EngineError::Session(crate::session::SessionError::RateLimited {
                retry_in_ms,
            }))) => {
                self.on_rate_limit(team.id, agent, &batch_ids, retry_in_ms);
            }
            Some(Err(e)) => {
                tracing::error!(team = %team.name, %agent, error = %e, "turn failed");
                self.emit_turn_failed(team.id, agent, &e.to_string());
            }
        }
    }

    /// An agent that produced nothing gets a synthetic "continue" prompt on
    /// the next tick; a bounded counter prevents infinite idle loops.
    async fn nudge(&self, team: &Team, agent: &AgentName) {
        let key = (team.id, agent.clone());
        let count = {
            let mut nudges = self.nudges.lock();
            let count = nudges.entry(key).or_insert(0);
            *count += 1;
            *count
        };
        if count > self.config.max_nudges {
            tracing::warn!(team = %team.name, %agent, count, "agent idle; nudge budget spent");
            return;
        }
        let result = self.ctx.commit(|tx| {
            let message = messages::insert(
                tx.conn(),
                team.id,
                &dg_core::Sender::Daemon,
                agent.as_str(),
                dg_core::MessageKind::Event,
                "continue",
                None,
                tx.now_ms(),
            )?;
            tx.emit(
                team.id,
                Event::MessageSent {
                    message: message.id,
                    sender: dg_core::Sender::Daemon,
                    recipient: agent.to_string(),
                    kind: dg_core::MessageKind::Event,
                    task: None,
                },
            )?;
            Ok(())
        });
        if let Err(e) = result {
            tracing::error!(error = %e, "failed to enqueue nudge");
        }
    }

    /// Rate limit: user-visible warning event, batch re-queued unread,
    /// exponential backoff capped at the configured ceiling.
    fn on_rate_limit(
        &self,
        team: TeamId,
        agent: &AgentName,
        batch: &[MessageId],
        retry_in_ms: u64,
    ) {
        let key = (team, agent.clone());
        let attempt = {
            let mut backoff = self.backoff.lock();
            let entry = backoff.entry(key).or_insert((0, Instant::now()));
            entry.0 += 1;
            let exp = self
                .config
                .backoff_base
                .saturating_mul(2u32.saturating_pow(entry.0.saturating_sub(1)))
                .min(self.config.backoff_cap)
                .max(Duration::from_millis(retry_in_ms));
            entry.1 = Instant::now() + exp;
            entry.0
        };
        tracing::warn!(%team, %agent, attempt, "rate limited; batch re-queued");
        let result = self.ctx.commit(|tx| {
            messages::mark_unread(tx.conn(), batch)?;
            tx.emit(
                team,
                Event::RateLimited { agent: agent.to_string(), retry_in_ms },
            )?;
            Ok(())
        });
        if let Err(e) = result {
            tracing::error!(error = %e, "failed to re-queue rate-limited batch");
        }
    }

    fn emit_turn_failed(&self, team: TeamId, agent: &AgentName, error: &str) {
        let result = self.ctx.commit(|tx| {
            tx.emit(
                team,
                Event::TurnFailed { agent: agent.to_string(), error: error.to_string() },
            )?;
            Ok(())
        });
        if let Err(e) = result {
            tracing::error!(error = %e, "failed to emit turn failure");
        }
    }
}

/// Coalesce an inbox into one turn batch, ordered by message id.
///
/// A human-sent message is exclusive: it is never mixed with machine
/// messages, so attribution stays unambiguous. Machine messages coalesce
/// until the next human message.
fn make_batch(inbox: &[Message]) -> Vec<Message> {
    let Some(first) = inbox.first() else { return Vec::new() };
    if first.sender.is_human() {
        return vec![first.clone()];
    }
    inbox.iter().take_while(|m| !m.sender.is_human()).cloned().collect()
}

fn render_batch(batch: &[Message]) -> String {
    let mut prompt = String::new();
    for message in batch {
        let task = message.task.map(|t| format!(" re {t}")).unwrap_or_default();
        prompt.push_str(&format!("[{}{}] {}\n", message.sender.name(), task, message.body));
    }
    prompt
}

fn spawn_delta_pump<C: Clock + 'static>(
    ctx: EngineCtx<C>,
    team: TeamId,
    agent: AgentName,
    mut rx: mpsc::Receiver<String>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut index: u32 = 0;
        while let Some(text) = rx.recv().await {
            let result = ctx.commit(|tx| {
                tx.emit(team, Event::TurnDelta { agent: agent.to_string(), index, text })?;
                Ok(())
            });
            if let Err(e) = result {
                tracing::warn!(error = %e, "failed to persist turn delta");
            }
            index += 1;
        }
    })
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
