//! Quest Timers
//!
//! Named, repeating timers owned by content scripts. The zone instance turns
//! state changes and expiries into timer events; scripts never sleep.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimerError {
    #[error("timer '{name}' needs a positive interval, got {millis}ms")]
    NonPositiveInterval { name: String, millis: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerKey {
    pub script: String,
    pub name: String,
}

impl TimerKey {
    pub fn new(script: &str, name: &str) -> Self {
        Self {
            script: script.to_string(),
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct QuestTimer {
    interval: Duration,
    next_fire: DateTime<Utc>,
    /// Time left on the clock when paused
    paused_remaining: Option<Duration>,
}

#[derive(Default)]
pub struct QuestTimers {
    timers: Mutex<HashMap<TimerKey, QuestTimer>>,
}

impl QuestTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or restart) a timer. Returns true if one was replaced.
    pub fn start(
        &self,
        key: TimerKey,
        interval: Duration,
        now: DateTime<Utc>,
    ) -> Result<bool, TimerError> {
        if interval <= Duration::zero() {
            return Err(TimerError::NonPositiveInterval {
                name: key.name,
                millis: interval.num_milliseconds(),
            });
        }
        let timer = QuestTimer {
            interval,
            next_fire: now + interval,
            paused_remaining: None,
        };
        Ok(self.timers.lock().insert(key, timer).is_some())
    }

    pub fn stop(&self, key: &TimerKey) -> bool {
        self.timers.lock().remove(key).is_some()
    }

    /// Returns false if the timer is missing or already paused
    pub fn pause(&self, key: &TimerKey, now: DateTime<Utc>) -> bool {
        let mut timers = self.timers.lock();
        let Some(timer) = timers.get_mut(key) else {
            return false;
        };
        if timer.paused_remaining.is_some() {
            return false;
        }
        let remaining = (timer.next_fire - now).max(Duration::zero());
        timer.paused_remaining = Some(remaining);
        true
    }

    /// Returns false if the timer is missing or not paused
    pub fn resume(&self, key: &TimerKey, now: DateTime<Utc>) -> bool {
        let mut timers = self.timers.lock();
        let Some(timer) = timers.get_mut(key) else {
            return false;
        };
        let Some(remaining) = timer.paused_remaining.take() else {
            return false;
        };
        timer.next_fire = now + remaining;
        true
    }

    /// Timers that expired by `now`, rescheduled for their next interval
    pub fn take_due(&self, now: DateTime<Utc>) -> Vec<TimerKey> {
        let mut timers = self.timers.lock();
        let mut due = Vec::new();
        for (key, timer) in timers.iter_mut() {
            if timer.paused_remaining.is_none() && timer.next_fire <= now {
                timer.next_fire = now + timer.interval;
                due.push(key.clone());
            }
        }
        due.sort();
        due
    }

    pub fn is_running(&self, key: &TimerKey) -> bool {
        self.timers
            .lock()
            .get(key)
            .is_some_and(|t| t.paused_remaining.is_none())
    }

    /// Drop every timer a script owns (used when a script is unloaded)
    pub fn clear_script(&self, script: &str) -> usize {
        let mut timers = self.timers.lock();
        let before = timers.len();
        timers.retain(|key, _| key.script != script);
        before - timers.len()
    }

    pub fn len(&self) -> usize {
        self.timers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_fires_and_repeats() {
        let timers = QuestTimers::new();
        let now = Utc::now();
        let key = TimerKey::new("guard", "patrol");
        assert!(!timers.start(key.clone(), Duration::seconds(10), now).unwrap());

        assert!(timers.take_due(now + Duration::seconds(9)).is_empty());
        assert_eq!(timers.take_due(now + Duration::seconds(10)), vec![key.clone()]);
        // Rescheduled from the fire time
        assert!(timers.take_due(now + Duration::seconds(15)).is_empty());
        assert_eq!(timers.take_due(now + Duration::seconds(20)), vec![key]);
    }

    #[test]
    fn test_pause_keeps_remaining_time() {
        let timers = QuestTimers::new();
        let now = Utc::now();
        let key = TimerKey::new("guard", "patrol");
        timers.start(key.clone(), Duration::seconds(10), now).unwrap();

        assert!(timers.pause(&key, now + Duration::seconds(4)));
        assert!(!timers.pause(&key, now + Duration::seconds(4)));
        assert!(!timers.is_running(&key));
        assert!(timers.take_due(now + Duration::seconds(60)).is_empty());

        // 6 seconds were left when paused
        assert!(timers.resume(&key, now + Duration::seconds(100)));
        assert!(!timers.resume(&key, now + Duration::seconds(100)));
        assert!(timers.take_due(now + Duration::seconds(105)).is_empty());
        assert_eq!(timers.take_due(now + Duration::seconds(106)), vec![key]);
    }

    #[test]
    fn test_non_positive_interval_is_rejected() {
        let timers = QuestTimers::new();
        let now = Utc::now();
        let key = TimerKey::new("guard", "spin");

        assert_eq!(
            timers.start(key.clone(), Duration::zero(), now),
            Err(TimerError::NonPositiveInterval {
                name: "spin".to_string(),
                millis: 0
            })
        );
        assert!(timers.start(key.clone(), Duration::seconds(-5), now).is_err());
        assert!(timers.is_empty());
        assert!(timers.take_due(now + Duration::hours(1)).is_empty());
    }

    #[test]
    fn test_stop_and_clear() {
        let timers = QuestTimers::new();
        let now = Utc::now();
        timers.start(TimerKey::new("a", "one"), Duration::seconds(1), now).unwrap();
        timers.start(TimerKey::new("a", "two"), Duration::seconds(1), now).unwrap();
        timers.start(TimerKey::new("b", "one"), Duration::seconds(1), now).unwrap();

        assert!(timers.stop(&TimerKey::new("b", "one")));
        assert!(!timers.stop(&TimerKey::new("b", "one")));
        assert_eq!(timers.clear_script("a"), 2);
        assert!(timers.is_empty());
    }
}
