// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-agent persistent model sessions.
//!
//! Each agent owns at most one live session, reused across turns. Rotation
//! retires the session and starts a fresh one carrying forward the agent's
//! memory summary; it triggers on context pressure, sandbox-config change,
//! or an irrecoverable session error.

use crate::context::EngineCtx;
use crate::error::EngineError;
use crate::session::{ModelSession, SessionConfig, SessionFactory, TurnReply, TurnRequest};
use crate::tools::{AgentTools, ToolServer};
use crate::workflow::WorkflowEngine;
use dg_core::{
    AgentName, Clock, Event, ModelRates, RotationReason, SessionId, TaskId, TeamId, TurnUsage,
    UsageTotals,
};
use dg_sandbox::{NetworkAllowlist, SandboxConfig, WriteGuard};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Context-window utilization that triggers a rotation.
pub const ROTATION_WATERMARK: f32 = 0.8;

/// File in the agent's memory dir carried into a fresh session.
const MEMORY_SUMMARY: &str = "summary.md";

struct ActiveSession {
    session: Arc<dyn ModelSession>,
    tools: Arc<AgentTools>,
    fingerprint: String,
    usage: UsageTotals,
}

pub struct SessionManager<C: Clock> {
    ctx: EngineCtx<C>,
    factory: Arc<dyn SessionFactory>,
    tools: Arc<ToolServer<C>>,
    rates: ModelRates,
    active: Mutex<HashMap<(TeamId, AgentName), Arc<tokio::sync::Mutex<Option<ActiveSession>>>>>,
}

impl<C: Clock + 'static> SessionManager<C> {
    pub fn new(
        ctx: EngineCtx<C>,
        factory: Arc<dyn SessionFactory>,
        engine: Arc<WorkflowEngine<C>>,
        rates: ModelRates,
    ) -> Arc<Self> {
        let tools = ToolServer::new(ctx.clone(), engine);
        Arc::new(Self { ctx, factory, tools, rates, active: Mutex::new(HashMap::new()) })
    }

    fn slot(
        &self,
        team: TeamId,
        agent: &AgentName,
    ) -> Arc<tokio::sync::Mutex<Option<ActiveSession>>> {
        Arc::clone(self.active.lock().entry((team, agent.clone())).or_default())
    }

    /// Run one turn for an agent, lazily creating (or rotating) its session
    /// first. The per-agent slot mutex is the serialization guarantee: at
    /// most one turn per agent touches session state at a time.
    pub async fn run_turn(
        &self,
        team: TeamId,
        agent: &AgentName,
        task: Option<TaskId>,
        batch: Vec<dg_core::MessageId>,
        request: TurnRequest,
        deltas: mpsc::Sender<String>,
    ) -> Result<(TurnReply, TurnUsage, u32), EngineError> {
        let slot = self.slot(team, agent);
        let mut guard = slot.lock().await;

        let desired = self.current_config(team, agent)?;
        let needs_new = match guard.as_ref() {
            None => true,
            Some(active) => active.fingerprint != desired.sandbox.fingerprint(),
        };
        if needs_new {
            if let Some(old) = guard.take() {
                self.retire(team, agent, &old, RotationReason::SandboxConfigChanged).await;
            }
            *guard = Some(self.create(team, agent, desired).await?);
        }

        let (session, tools) = match guard.as_ref() {
            Some(active) => (Arc::clone(&active.session), Arc::clone(&active.tools)),
            None => return Err(EngineError::Git("session slot empty after create".into())),
        };
        let session_id = session.id();

        let started = self.ctx.commit(|tx| {
            tx.emit(
                team,
                Event::TurnStarted { agent: agent.to_string(), session: session_id, batch },
            )?;
            Ok(())
        });
        if let Err(e) = started {
            tracing::warn!(error = %e, "failed to emit turn start");
        }

        let reply = match session.run_turn(request, deltas).await {
            Ok(reply) => reply,
            Err(crate::session::SessionError::Irrecoverable(detail)) => {
                // Retire and surface; next turn starts a fresh session.
                if let Some(old) = guard.take() {
                    self.retire(team, agent, &old, RotationReason::SessionError).await;
                }
                return Err(crate::session::SessionError::Irrecoverable(detail).into());
            }
            Err(e) => return Err(e.into()),
        };

        let usage = match guard.as_mut() {
            Some(active) => {
                active.usage.record(reply.input_tokens, reply.output_tokens, self.rates)
            }
            None => return Err(EngineError::Git("session slot emptied mid-turn".into())),
        };
        let side_effects = tools.take_side_effects();
        self.record_usage(team, agent, task, session_id, &usage)?;

        // Context pressure past the watermark: rotate after the turn so the
        // next one starts fresh with the carried summary.
        if session.utilization() >= ROTATION_WATERMARK {
            if let Some(old) = guard.take() {
                self.retire(team, agent, &old, RotationReason::ContextPressure).await;
            }
        }

        Ok((reply, usage, side_effects))
    }

    /// Force-rotate an agent's session (network allowlist edits rotate all).
    pub async fn rotate(&self, team: TeamId, agent: &AgentName, reason: RotationReason) {
        let slot = self.slot(team, agent);
        let mut guard = slot.lock().await;
        if let Some(old) = guard.take() {
            self.retire(team, agent, &old, reason).await;
        }
    }

    /// Rotate every active session (sandbox-wide config change).
    pub async fn rotate_all(&self, reason: RotationReason) {
        let keys: Vec<(TeamId, AgentName)> = self.active.lock().keys().cloned().collect();
        for (team, agent) in keys {
            self.rotate(team, &agent, reason).await;
        }
    }

    /// Cumulative usage for an agent, from the store.
    pub fn usage(&self, team: TeamId, agent: &AgentName) -> Result<UsageTotals, EngineError> {
        Ok(self
            .ctx
            .store
            .read(|conn| dg_storage::usage::agent_totals(conn, team, agent.as_str()))?)
    }

    /// Close every session (shutdown).
    pub async fn close_all(&self) {
        let slots: Vec<_> = self.active.lock().values().cloned().collect();
        for slot in slots {
            let mut guard = slot.lock().await;
            if let Some(active) = guard.take() {
                active.session.close().await;
            }
        }
    }

    fn current_config(&self, team: TeamId, agent: &AgentName) -> Result<SessionConfig, EngineError> {
        let (team_row, agent_row, repos, open_tasks) = self.ctx.store.read(|conn| {
            let team_row = dg_storage::teams::get_team(conn, team)?.ok_or_else(|| {
                dg_core::UserError::new(dg_core::ErrorCode::UnknownTeam, "unknown team")
            })?;
            let agent_row =
                dg_storage::teams::get_agent(conn, team, agent.as_str())?.ok_or_else(|| {
                    dg_core::UserError::new(dg_core::ErrorCode::UnknownAgent, "unknown agent")
                })?;
            let repos = dg_storage::teams::list_repos(conn, team)?;
            let filter = dg_storage::TaskFilter {
                team: Some(team),
                assignee: Some(agent.as_str().to_string()),
                ..Default::default()
            };
            let open_tasks: Vec<TaskId> =
                dg_storage::tasks::list(conn, &filter)?.iter().map(|t| t.id).collect();
            Ok((team_row, agent_row, repos, open_tasks))
        })?;

        let network = NetworkAllowlist::load_or_init(&self.ctx.layout.network_path())
            .map(|n| n.allow)
            .unwrap_or_default();
        let sandbox = SandboxConfig::for_agent(
            &self.ctx.layout,
            team,
            agent,
            agent_row.role,
            &repos,
            network,
            &open_tasks,
        );

        let model = if agent_row.model.is_empty() {
            team_row.model_for(agent_row.role).to_string()
        } else {
            agent_row.model.clone()
        };

        let mut system_prompt = format!(
            "You are {agent}, the {role} of team {team_name}.\n\n{charter}",
            agent = agent,
            role = agent_row.role,
            team_name = team_row.name,
            charter = team_row.charter,
        );
        let summary_path = self.ctx.layout.agent_memory_dir(team, agent).join(MEMORY_SUMMARY);
        if let Ok(summary) = std::fs::read_to_string(&summary_path) {
            system_prompt.push_str("\n\n## Carried memory\n");
            system_prompt.push_str(&summary);
        }

        let guard = WriteGuard::new(sandbox.clone());
        let tools = self.tools.bind(team, agent.clone(), guard);
        let env = read_settings_env(&self.ctx.layout.settings_env_path(team));
        Ok(SessionConfig { model, system_prompt, sandbox, tools, env })
    }

    async fn create(
        &self,
        team: TeamId,
        agent: &AgentName,
        config: SessionConfig,
    ) -> Result<ActiveSession, EngineError> {
        let fingerprint = config.sandbox.fingerprint();
        let tools = Arc::clone(&config.tools);
        let session = self.factory.create(config).await?;
        tracing::info!(%team, %agent, session = %session.id(), "session created");
        Ok(ActiveSession { session, tools, fingerprint, usage: UsageTotals::default() })
    }

    async fn retire(
        &self,
        team: TeamId,
        agent: &AgentName,
        old: &ActiveSession,
        reason: RotationReason,
    ) {
        old.session.close().await;
        let result = self.ctx.commit(|tx| {
            tx.emit(
                team,
                Event::SessionRotated {
                    agent: agent.to_string(),
                    old: old.session.id(),
                    reason,
                },
            )?;
            Ok(())
        });
        if let Err(e) = result {
            tracing::error!(error = %e, "failed to record session rotation");
        }
        tracing::info!(%team, %agent, %reason, "session rotated");
    }

    fn record_usage(
        &self,
        team: TeamId,
        agent: &AgentName,
        task: Option<TaskId>,
        session: SessionId,
        usage: &TurnUsage,
    ) -> Result<(), EngineError> {
        self.ctx.commit(|tx| {
            dg_storage::usage::record_turn(tx.conn(), team, agent.as_str(), task, usage)?;
            tx.emit(
                team,
                Event::TurnCompleted { agent: agent.to_string(), session, usage: *usage },
            )?;
            Ok(())
        })?;
        Ok(())
    }
}

/// Parse `KEY=value` lines from a team's `settings.env`. Comments and
/// blank lines are skipped; malformed lines are ignored.
fn read_settings_env(path: &std::path::Path) -> Vec<(String, String)> {
    let Ok(text) = std::fs::read_to_string(path) else { return Vec::new() };
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            line.split_once('=').map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        })
        .collect()
}

#[cfg(test)]
#[path = "session_manager_tests.rs"]
mod tests;
