use super::*;
use std::time::Duration;

#[test]
fn fake_clock_advances() {
    let clock = FakeClock::new();
    let t0 = clock.now();
    clock.advance(Duration::from_secs(30));
    assert_eq!(clock.now(), t0 + chrono::Duration::seconds(30));
}

#[test]
fn fake_clock_can_be_set() {
    let clock = FakeClock::new();
    let target = Utc::now() + chrono::Duration::days(1);
    clock.set(target);
    assert_eq!(clock.now(), target);
}
