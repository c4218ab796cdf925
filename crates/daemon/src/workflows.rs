// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Declarative workflow definitions.
//!
//! Stage behavior lives in code (`dg_engine::stages`); a definition file
//! under `teams/<uuid>/workflows/` names the stages it uses and rewires
//! the transition graph. Loaded at startup and on explicit `workflow add`.

use dg_core::TaskEventKind;
use dg_engine::stages::workflow_from_spec;
use dg_engine::{Workflow, WorkflowRegistry};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSpec {
    pub name: String,
    pub version: u32,
    pub stages: Vec<String>,
    #[serde(default, rename = "transition")]
    pub transitions: Vec<TransitionSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionSpec {
    pub from: String,
    pub on: String,
    pub to: String,
}

#[derive(Debug, thiserror::Error)]
pub enum WorkflowSpecError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed workflow file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid workflow: {0}")]
    Invalid(String),
}

impl WorkflowSpec {
    pub fn parse(text: &str) -> Result<Self, WorkflowSpecError> {
        Ok(toml::from_str(text)?)
    }

    pub fn build(&self) -> Result<Workflow, WorkflowSpecError> {
        let transitions: Result<Vec<_>, _> = self
            .transitions
            .iter()
            .map(|t| {
                TaskEventKind::parse(&t.on)
                    .map(|kind| (t.from.clone(), kind, t.to.clone()))
                    .ok_or_else(|| {
                        WorkflowSpecError::Invalid(format!("unknown event kind {:?}", t.on))
                    })
            })
            .collect();
        workflow_from_spec(&self.name, self.version, &self.stages, &transitions?)
            .map_err(WorkflowSpecError::Invalid)
    }
}

/// Template written by `workflow init`: the default workflow spelled out,
/// ready to copy and edit.
pub fn template() -> String {
    let spec = WorkflowSpec {
        name: "custom".to_string(),
        version: 1,
        stages: dg_engine::stages::default_workflow()
            .stage_keys()
            .iter()
            .map(|k| k.as_str().to_string())
            .collect(),
        transitions: vec![
            TransitionSpec { from: "todo".into(), on: "work_started".into(), to: "in_progress".into() },
            TransitionSpec {
                from: "in_progress".into(),
                on: "work_completed".into(),
                to: "in_review".into(),
            },
        ],
    };
    toml::to_string_pretty(&spec).unwrap_or_default()
}

/// Register every definition file under a workflows directory.
pub fn load_dir(registry: &WorkflowRegistry, dir: &Path) -> Result<usize, WorkflowSpecError> {
    if !dir.exists() {
        return Ok(0);
    }
    let mut loaded = 0;
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().is_none_or(|e| e != "toml") {
            continue;
        }
        let text = std::fs::read_to_string(&path)?;
        match WorkflowSpec::parse(&text).and_then(|spec| spec.build()) {
            Ok(workflow) => {
                registry.register(workflow);
                loaded += 1;
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping workflow file");
            }
        }
    }
    Ok(loaded)
}

#[cfg(test)]
#[path = "workflows_tests.rs"]
mod tests;
