// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The opaque model-session seam.
//!
//! A [`ModelSession`] is a persistent stateful connection to the underlying
//! LLM, reused across turns to amortize prompt warm-up. The transport is
//! not this crate's business: the daemon supplies a [`SessionFactory`] and
//! the engine only ever talks through the trait. [`CommandSessionFactory`]
//! speaks newline-delimited JSON to a configured subprocess;
//! [`ScriptedSession`] drives tests.

use crate::tools::AgentTools;
use async_trait::async_trait;
use dg_core::{ErrorKind, SessionId};
use dg_sandbox::SandboxConfig;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Upstream rate limit. The scheduler re-queues the batch with backoff.
    #[error("rate limited; retry in {retry_in_ms}ms")]
    RateLimited { retry_in_ms: u64 },

    /// The session cannot continue; the manager rotates it.
    #[error("session irrecoverable: {0}")]
    Irrecoverable(String),

    #[error("transport error: {0}")]
    Transport(String),
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::RateLimited { .. } | SessionError::Transport(_) => ErrorKind::Transient,
            SessionError::Irrecoverable(_) => ErrorKind::Invariant,
        }
    }
}

/// Everything baked into a session at creation. Changing any of it
/// requires a rotation.
#[derive(Clone)]
pub struct SessionConfig {
    pub model: String,
    /// Charter + role instructions + carried-forward memory summary.
    pub system_prompt: String,
    pub sandbox: SandboxConfig,
    /// The in-process tool server handle, identity pre-bound.
    pub tools: Arc<AgentTools>,
    /// Team `settings.env` entries, sourced into the session subprocess
    /// (package-manager cache paths and the like).
    pub env: Vec<(String, String)>,
}

/// One coalesced inbox batch rendered for the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnRequest {
    pub prompt: String,
}

/// What came back from one turn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnReply {
    pub text: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    /// Context-window utilization after this turn, in percent (0-100).
    pub context_pct: u8,
}

#[async_trait]
pub trait ModelSession: Send + Sync {
    fn id(&self) -> SessionId;

    /// Issue one turn. Partial text is streamed on `deltas` as it arrives;
    /// the full reply is returned at the end.
    async fn run_turn(
        &self,
        request: TurnRequest,
        deltas: mpsc::Sender<String>,
    ) -> Result<TurnReply, SessionError>;

    /// Context-window utilization, 0.0-1.0, from the last reply.
    fn utilization(&self) -> f32;

    async fn close(&self);
}

#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn create(&self, config: SessionConfig) -> Result<Arc<dyn ModelSession>, SessionError>;
}

// ---------------------------------------------------------------------------
// Subprocess-backed session
// ---------------------------------------------------------------------------

/// Wire format to the session subprocess: one JSON object per line each
/// way. The child may interleave `{"tool": ..., "args": ...}` calls (we
/// answer with the tool result on the next line) and `{"delta": ...}`
/// streaming text before the final `{"text": ...}` reply.
#[derive(Serialize)]
struct WireRequest<'a> {
    prompt: &'a str,
}

#[derive(Deserialize)]
struct WireLine {
    #[serde(default)]
    tool: Option<String>,
    #[serde(default)]
    args: Option<serde_json::Value>,
    #[serde(default)]
    delta: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
    #[serde(default)]
    context_pct: u8,
    #[serde(default)]
    rate_limited_ms: Option<u64>,
}

/// Spawns one subprocess per session and keeps it alive across turns.
///
/// The command receives the model name and system prompt as arguments and
/// the sandbox fingerprint in the environment; everything else travels over
/// stdin/stdout.
pub struct CommandSessionFactory {
    pub command: String,
}

impl CommandSessionFactory {
    pub fn new(command: impl Into<String>) -> Self {
        Self { command: command.into() }
    }
}

#[async_trait]
impl SessionFactory for CommandSessionFactory {
    async fn create(&self, config: SessionConfig) -> Result<Arc<dyn ModelSession>, SessionError> {
        let session = CommandSession::spawn(&self.command, &config).await?;
        Ok(Arc::new(session))
    }
}

struct CommandSession {
    id: SessionId,
    child: tokio::sync::Mutex<ChildIo>,
    utilization: std::sync::atomic::AtomicU32,
    tools: Arc<AgentTools>,
}

struct ChildIo {
    child: tokio::process::Child,
    stdin: tokio::process::ChildStdin,
    stdout: tokio::io::BufReader<tokio::process::ChildStdout>,
}

impl CommandSession {
    async fn spawn(command: &str, config: &SessionConfig) -> Result<Self, SessionError> {
        use std::process::Stdio;
        let mut child = tokio::process::Command::new(command)
            .arg("--model")
            .arg(&config.model)
            .arg("--system-prompt")
            .arg(&config.system_prompt)
            .env("DG_SANDBOX_FINGERPRINT", config.sandbox.fingerprint())
            .envs(config.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SessionError::Transport(format!("spawn {command:?}: {e}")))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| SessionError::Transport("no stdin handle".into()))?;
        let stdout = child
            .stdout
            .take()
            .map(tokio::io::BufReader::new)
            .ok_or_else(|| SessionError::Transport("no stdout handle".into()))?;
        Ok(Self {
            id: SessionId::new(),
            child: tokio::sync::Mutex::new(ChildIo { child, stdin, stdout }),
            utilization: std::sync::atomic::AtomicU32::new(0),
            tools: Arc::clone(&config.tools),
        })
    }
}

#[async_trait]
impl ModelSession for CommandSession {
    fn id(&self) -> SessionId {
        self.id
    }

    async fn run_turn(
        &self,
        request: TurnRequest,
        deltas: mpsc::Sender<String>,
    ) -> Result<TurnReply, SessionError> {
        use tokio::io::{AsyncBufReadExt, AsyncWriteExt};

        let mut io = self.child.lock().await;
        let line = serde_json::to_string(&WireRequest { prompt: &request.prompt })
            .map_err(|e| SessionError::Transport(e.to_string()))?;
        io.stdin
            .write_all(format!("{line}\n").as_bytes())
            .await
            .map_err(|e| SessionError::Transport(format!("write: {e}")))?;

        // Serve tool calls and stream deltas until the final reply line.
        loop {
            let mut reply_line = String::new();
            let n = io
                .stdout
                .read_line(&mut reply_line)
                .await
                .map_err(|e| SessionError::Transport(format!("read: {e}")))?;
            if n == 0 {
                let status = io.child.try_wait().ok().flatten();
                return Err(SessionError::Irrecoverable(format!(
                    "session process exited ({status:?})"
                )));
            }
            let wire: WireLine = serde_json::from_str(&reply_line)
                .map_err(|e| SessionError::Transport(format!("malformed line: {e}")))?;

            if let Some(retry_in_ms) = wire.rate_limited_ms {
                return Err(SessionError::RateLimited { retry_in_ms });
            }
            if let Some(tool) = wire.tool {
                let args = wire.args.unwrap_or_else(|| serde_json::json!({}));
                let result = self.tools.call(&tool, args).await;
                io.stdin
                    .write_all(format!("{result}\n").as_bytes())
                    .await
                    .map_err(|e| SessionError::Transport(format!("write tool result: {e}")))?;
                continue;
            }
            if let Some(delta) = wire.delta {
                let _ = deltas.send(delta).await;
                continue;
            }
            let Some(text) = wire.text else {
                return Err(SessionError::Transport("line is neither tool, delta, nor reply".into()));
            };

            self.utilization
                .store(wire.context_pct as u32, std::sync::atomic::Ordering::Relaxed);
            if !text.is_empty() {
                let _ = deltas.send(text.clone()).await;
            }
            return Ok(TurnReply {
                text,
                input_tokens: wire.input_tokens,
                output_tokens: wire.output_tokens,
                context_pct: wire.context_pct,
            });
        }
    }

    fn utilization(&self) -> f32 {
        self.utilization.load(std::sync::atomic::Ordering::Relaxed) as f32 / 100.0
    }

    async fn close(&self) {
        let mut io = self.child.lock().await;
        let _ = io.child.start_kill();
    }
}

// ---------------------------------------------------------------------------
// Scripted session for tests
// ---------------------------------------------------------------------------

/// Test double: replies are scripted in order; records every prompt.
#[cfg(any(test, feature = "test-support"))]
pub struct ScriptedSession {
    id: SessionId,
    replies: parking_lot::Mutex<std::collections::VecDeque<Result<TurnReply, SessionError>>>,
    pub prompts: parking_lot::Mutex<Vec<String>>,
    utilization: parking_lot::Mutex<f32>,
    pub closed: std::sync::atomic::AtomicBool,
}

#[cfg(any(test, feature = "test-support"))]
impl ScriptedSession {
    pub fn new(replies: Vec<Result<TurnReply, SessionError>>) -> Arc<Self> {
        Arc::new(Self {
            id: SessionId::new(),
            replies: parking_lot::Mutex::new(replies.into()),
            prompts: parking_lot::Mutex::new(Vec::new()),
            utilization: parking_lot::Mutex::new(0.0),
            closed: std::sync::atomic::AtomicBool::new(false),
        })
    }

    pub fn reply(text: &str) -> TurnReply {
        TurnReply { text: text.to_string(), input_tokens: 100, output_tokens: 50, context_pct: 10 }
    }

    pub fn set_utilization(&self, v: f32) {
        *self.utilization.lock() = v;
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl ModelSession for ScriptedSession {
    fn id(&self) -> SessionId {
        self.id
    }

    async fn run_turn(
        &self,
        request: TurnRequest,
        deltas: mpsc::Sender<String>,
    ) -> Result<TurnReply, SessionError> {
        self.prompts.lock().push(request.prompt);
        let reply = self
            .replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(TurnReply { text: "ok".into(), ..TurnReply::default() }));
        if let Ok(ref r) = reply {
            let _ = deltas.send(r.text.clone()).await;
            *self.utilization.lock() = r.context_pct as f32 / 100.0;
        }
        reply
    }

    fn utilization(&self) -> f32 {
        *self.utilization.lock()
    }

    async fn close(&self) {
        self.closed.store(true, std::sync::atomic::Ordering::SeqCst);
    }
}

/// Factory that hands out pre-built [`ScriptedSession`]s in order.
#[cfg(any(test, feature = "test-support"))]
pub struct ScriptedFactory {
    sessions: parking_lot::Mutex<std::collections::VecDeque<Arc<ScriptedSession>>>,
    pub created: std::sync::atomic::AtomicU32,
}

#[cfg(any(test, feature = "test-support"))]
impl ScriptedFactory {
    pub fn new(sessions: Vec<Arc<ScriptedSession>>) -> Arc<Self> {
        Arc::new(Self {
            sessions: parking_lot::Mutex::new(sessions.into()),
            created: std::sync::atomic::AtomicU32::new(0),
        })
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl SessionFactory for ScriptedFactory {
    async fn create(&self, _config: SessionConfig) -> Result<Arc<dyn ModelSession>, SessionError> {
        self.created.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let next = self.sessions.lock().pop_front();
        match next {
            Some(session) => Ok(session),
            None => Ok(ScriptedSession::new(Vec::new())),
        }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
