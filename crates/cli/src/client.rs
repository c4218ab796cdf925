// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP client for the local daemon.

use crate::exit_error::ExitError;
use dg_core::Layout;
use serde_json::Value;

pub struct DaemonClient {
    base: String,
    http: reqwest::Client,
}

impl DaemonClient {
    /// Connect to the running daemon via `protected/daemon.port`.
    pub fn connect(layout: &Layout) -> Result<Self, ExitError> {
        let port = std::fs::read_to_string(layout.port_path())
            .ok()
            .and_then(|text| text.trim().parse::<u16>().ok())
            .ok_or_else(|| ExitError::user("daemon is not running (no port file); run `dg start`"))?;
        Ok(Self { base: format!("http://127.0.0.1:{port}"), http: reqwest::Client::new() })
    }

    pub async fn get(&self, path: &str) -> Result<Value, ExitError> {
        let response = self
            .http
            .get(format!("{}{path}", self.base))
            .send()
            .await
            .map_err(connection_error)?;
        decode(response).await
    }

    pub async fn post(&self, path: &str, body: Value) -> Result<Value, ExitError> {
        let response = self
            .http
            .post(format!("{}{path}", self.base))
            .json(&body)
            .send()
            .await
            .map_err(connection_error)?;
        decode(response).await
    }

    pub async fn post_text(&self, path: &str, body: String) -> Result<Value, ExitError> {
        let response = self
            .http
            .post(format!("{}{path}", self.base))
            .body(body)
            .send()
            .await
            .map_err(connection_error)?;
        decode(response).await
    }

    pub async fn delete(&self, path: &str) -> Result<Value, ExitError> {
        let response = self
            .http
            .delete(format!("{}{path}", self.base))
            .send()
            .await
            .map_err(connection_error)?;
        decode(response).await
    }
}

fn connection_error(e: reqwest::Error) -> ExitError {
    if e.is_connect() {
        ExitError::user("daemon is not responding; is it running? (`dg status`)")
    } else {
        ExitError::internal(e.to_string())
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;

async fn decode(response: reqwest::Response) -> Result<Value, ExitError> {
    let status = response.status();
    let body: Value = response.json().await.unwrap_or(Value::Null);
    if status.is_success() {
        return Ok(body);
    }
    let message = body
        .get("error")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("daemon returned {status}"));
    if status.is_client_error() {
        Err(ExitError::user(message))
    } else {
        Err(ExitError::internal(message))
    }
}
