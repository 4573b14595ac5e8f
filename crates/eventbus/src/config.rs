// SPDX-License-Identifier: MIT

//! Event bus configuration (spec.md §9): reconnect backoff parameters and
//! the topic exchange all routing keys are published through.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct EventBusConfig {
    pub amqp_url: String,
    /// Topic exchange every routing key in spec.md §4.5 is published on.
    pub exchange: String,
    pub reconnect_initial: Duration,
    pub reconnect_max: Duration,
    pub reconnect_multiplier: f64,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            amqp_url: "amqp://127.0.0.1:5672/%2f".to_string(),
            exchange: "stratforge.events".to_string(),
            reconnect_initial: Duration::from_secs(1),
            reconnect_max: Duration::from_secs(30),
            reconnect_multiplier: 1.5,
        }
    }
}

/// Exponential backoff sequence generator (spec.md §4.5: "initial 1 s,
/// multiplier 1.5, capped at 30 s").
#[derive(Debug, Clone)]
pub struct Backoff {
    current: Duration,
    max: Duration,
    multiplier: f64,
}

impl Backoff {
    pub fn new(config: &EventBusConfig) -> Self {
        Self { current: config.reconnect_initial, max: config.reconnect_max, multiplier: config.reconnect_multiplier }
    }

    /// The delay to wait before the next reconnect attempt, advancing the
    /// internal state geometrically up to `max`.
    pub fn next(&mut self) -> Duration {
        let delay = self.current;
        let scaled = self.current.as_secs_f64() * self.multiplier;
        self.current = Duration::from_secs_f64(scaled).min(self.max);
        delay
    }

    pub fn reset(&mut self, config: &EventBusConfig) {
        self.current = config.reconnect_initial;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_geometrically_and_caps() {
        let config = EventBusConfig::default();
        let mut backoff = Backoff::new(&config);
        let d1 = backoff.next();
        let d2 = backoff.next();
        let d3 = backoff.next();
        assert_eq!(d1, Duration::from_secs(1));
        assert_eq!(d2, Duration::from_millis(1500));
        assert_eq!(d3, Duration::from_millis(2250));
        for _ in 0..20 {
            backoff.next();
        }
        assert!(backoff.next() <= config.reconnect_max);
    }

    #[test]
    fn reset_returns_to_initial_delay() {
        let config = EventBusConfig::default();
        let mut backoff = Backoff::new(&config);
        backoff.next();
        backoff.next();
        backoff.reset(&config);
        assert_eq!(backoff.next(), config.reconnect_initial);
    }
}
