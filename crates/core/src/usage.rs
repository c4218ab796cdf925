// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Usage accounting.
//!
//! [`UsageTotals`] is the single place token and cost arithmetic happens;
//! callers hand it raw per-turn token counts and read back totals.

use serde::{Deserialize, Serialize};

/// Per-million-token pricing for a model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelRates {
    pub input_per_mtok_usd: f64,
    pub output_per_mtok_usd: f64,
}

impl Default for ModelRates {
    fn default() -> Self {
        Self { input_per_mtok_usd: 3.0, output_per_mtok_usd: 15.0 }
    }
}

/// Tokens and cost for a single turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TurnUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_usd: f64,
}

impl Eq for TurnUsage {}

/// Cumulative usage for an agent (or a task rollup).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageTotals {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_usd: f64,
    pub turns: u64,
}

impl UsageTotals {
    /// Record one turn's token counts, pricing them with `rates`.
    /// Returns the priced [`TurnUsage`] for event emission.
    pub fn record(&mut self, input_tokens: u64, output_tokens: u64, rates: ModelRates) -> TurnUsage {
        let cost_usd = (input_tokens as f64 / 1_000_000.0) * rates.input_per_mtok_usd
            + (output_tokens as f64 / 1_000_000.0) * rates.output_per_mtok_usd;
        self.input_tokens += input_tokens;
        self.output_tokens += output_tokens;
        self.cost_usd += cost_usd;
        self.turns += 1;
        TurnUsage { input_tokens, output_tokens, cost_usd }
    }

    /// Fold another rollup into this one (task stats across agents).
    pub fn merge(&mut self, other: &UsageTotals) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.cost_usd += other.cost_usd;
        self.turns += other.turns;
    }
}

#[cfg(test)]
#[path = "usage_tests.rs"]
mod tests;
