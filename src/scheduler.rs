//! Staggered tick scheduler. Triggers are a pure function of UTC epoch
//! seconds, so a restarted process realigns at the next boundary without any
//! recovery logic. The hourly subsystems sit at distinct minute offsets so at
//! most one heavy subsystem fires at a time.

use serde::Serialize;

const HOUR: i64 = 3600;
const QUARTER_HOUR: i64 = 900;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    Resource,
    Population,
    Repair,
    Disaster,
}

impl Trigger {
    pub const ALL: [Trigger; 4] = [
        Trigger::Resource,
        Trigger::Population,
        Trigger::Repair,
        Trigger::Disaster,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Trigger::Resource => "resource",
            Trigger::Population => "population",
            Trigger::Repair => "repair",
            Trigger::Disaster => "disaster",
        }
    }

    fn period(self) -> i64 {
        match self {
            Trigger::Disaster => QUARTER_HOUR,
            _ => HOUR,
        }
    }

    fn offset(self) -> i64 {
        match self {
            Trigger::Resource => 0,
            Trigger::Population => 1800,
            Trigger::Repair => 2700,
            Trigger::Disaster => 0,
        }
    }

    /// Whether this trigger's boundary falls on the given absolute second.
    pub fn matches(self, epoch_seconds: i64) -> bool {
        epoch_seconds.rem_euclid(self.period()) == self.offset()
    }

    /// The first matching second at or after `epoch_seconds`.
    pub fn next_fire(self, epoch_seconds: i64) -> i64 {
        let period = self.period();
        let rem = (epoch_seconds - self.offset()).rem_euclid(period);
        if rem == 0 {
            epoch_seconds
        } else {
            epoch_seconds + period - rem
        }
    }

    fn index(self) -> usize {
        match self {
            Trigger::Resource => 0,
            Trigger::Population => 1,
            Trigger::Repair => 2,
            Trigger::Disaster => 3,
        }
    }
}

/// Evaluated many times per second; each trigger fires at most once per
/// matching absolute second via a last-fired guard (no accumulation counters,
/// which could double-fire under jitter).
#[derive(Debug, Default)]
pub struct TickScheduler {
    last_fired: [Option<i64>; 4],
}

impl TickScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Triggers due at this second that have not already fired for it, in a
    /// fixed order. Records them as fired.
    pub fn due(&mut self, epoch_seconds: i64) -> Vec<Trigger> {
        let mut due = Vec::new();
        for trigger in Trigger::ALL {
            if !trigger.matches(epoch_seconds) {
                continue;
            }
            let slot = &mut self.last_fired[trigger.index()];
            if *slot == Some(epoch_seconds) {
                continue;
            }
            *slot = Some(epoch_seconds);
            due.push(trigger);
        }
        due
    }

    pub fn last_fired(&self, trigger: Trigger) -> Option<i64> {
        self.last_fired[trigger.index()]
    }
}
