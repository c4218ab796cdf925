// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn record_accumulates_tokens_and_turns() {
    let mut totals = UsageTotals::default();
    let rates = ModelRates { input_per_mtok_usd: 3.0, output_per_mtok_usd: 15.0 };

    totals.record(1_000_000, 0, rates);
    totals.record(0, 1_000_000, rates);

    assert_eq!(totals.input_tokens, 1_000_000);
    assert_eq!(totals.output_tokens, 1_000_000);
    assert_eq!(totals.turns, 2);
    assert!((totals.cost_usd - 18.0).abs() < 1e-9);
}

#[test]
fn record_returns_priced_turn() {
    let mut totals = UsageTotals::default();
    let usage = totals.record(500_000, 100_000, ModelRates::default());
    assert_eq!(usage.input_tokens, 500_000);
    assert!((usage.cost_usd - (1.5 + 1.5)).abs() < 1e-9);
}

#[test]
fn merge_folds_rollups() {
    let mut a = UsageTotals { input_tokens: 10, output_tokens: 20, cost_usd: 0.5, turns: 1 };
    let b = UsageTotals { input_tokens: 5, output_tokens: 5, cost_usd: 0.25, turns: 2 };
    a.merge(&b);
    assert_eq!(a.input_tokens, 15);
    assert_eq!(a.turns, 3);
    assert!((a.cost_usd - 0.75).abs() < 1e-9);
}
