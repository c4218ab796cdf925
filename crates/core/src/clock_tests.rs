// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn system_clock_returns_increasing_time() {
    let clock = SystemClock;
    let t1 = clock.now();
    std::thread::sleep(Duration::from_millis(1));
    let t2 = clock.now();
    assert!(t2 > t1);
}

#[test]
fn fake_clock_advances_both_views_in_step() {
    let clock = FakeClock::new();
    let t1 = clock.now();
    let ms1 = clock.epoch_ms();

    clock.advance(Duration::from_secs(60));

    assert_eq!(clock.now().duration_since(t1), Duration::from_secs(60));
    assert_eq!(clock.epoch_ms(), ms1 + 60_000);
}

#[test]
fn fake_clock_is_cloneable_and_shared() {
    let clock1 = FakeClock::new();
    let clock2 = clock1.clone();
    let ms1 = clock1.epoch_ms();
    clock2.advance(Duration::from_secs(30));
    assert_eq!(clock1.epoch_ms(), ms1 + 30_000);
    assert_eq!(clock1.now(), clock2.now());
}

#[test]
fn fake_clock_does_not_tick_on_its_own() {
    let clock = FakeClock::new();
    let t1 = clock.now();
    std::thread::sleep(Duration::from_millis(2));
    assert_eq!(clock.now(), t1, "fake time only moves through advance()");
}

#[test]
fn set_epoch_ms_pins_epoch_without_touching_monotonic_time() {
    let clock = FakeClock::new();
    let t1 = clock.now();
    clock.set_epoch_ms(42_000);
    assert_eq!(clock.epoch_ms(), 42_000);
    assert_eq!(clock.now(), t1);
}
