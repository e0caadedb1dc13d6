use std::time::Duration;

use crate::record::SensorRecord;

/// How the poll loop spaces its cycles.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollTiming {
    /// Wait before the very first cycle.
    pub startup: Duration,
    /// Longest wait derived from the records, also used when there are none.
    pub ceiling: Duration,
    /// Added to every wait so the bridge has collected the new measurement.
    pub buffer: Duration,
}

impl PollTiming {
    pub const STARTUP: Duration = Duration::from_secs(5);
    pub const CEILING: Duration = Duration::from_secs(300);
    pub const BUFFER: Duration = Duration::from_secs(10);

    /// The wait after a cycle that rendered nothing or failed.
    pub fn default_delay(&self) -> Duration {
        self.ceiling + self.buffer
    }
}

impl Default for PollTiming {
    fn default() -> Self {
        Self {
            startup: Self::STARTUP,
            ceiling: Self::CEILING,
            buffer: Self::BUFFER,
        }
    }
}

/// Tracks which device will have a new measurement first.
#[derive(Clone, Copy, Debug)]
pub struct NextPoll {
    timing: PollTiming,
    soonest_secs: f64,
    observed: usize,
}

impl NextPoll {
    pub fn new(timing: PollTiming) -> Self {
        Self {
            timing,
            soonest_secs: timing.ceiling.as_secs_f64(),
            observed: 0,
        }
    }

    pub fn observe(&mut self, record: &SensorRecord<'_>) {
        self.observed += 1;
        if let Some(until) = record.seconds_until_next_measurement() {
            self.soonest_secs = self.soonest_secs.min(until);
        }
    }

    /// Number of records seen so far.
    pub fn observed(&self) -> usize {
        self.observed
    }

    pub fn delay(&self) -> Duration {
        let secs = self.soonest_secs + self.timing.buffer.as_secs_f64();
        Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(self.timing.default_delay())
    }
}

/// Source of waiting, so the poll loop can run without real time passing.
pub trait Clock {
    fn sleep(&self, duration: Duration);
}

/// Blocks the current thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(line: &str) -> SensorRecord<'_> {
        SensorRecord::parse(line).unwrap()
    }

    #[test]
    fn no_records_means_default_delay() {
        let next = NextPoll::new(PollTiming::default());

        assert_eq!(next.observed(), 0);
        assert_eq!(next.delay(), Duration::from_secs(310));
    }

    #[test]
    fn soonest_device_decides() {
        let mut next = NextPoll::new(PollTiming::default());

        next.observe(&record("a;x;x;500;21.0;1013;55.0;80;100;10;5"));
        next.observe(&record("b;x;x;500;21.0;1013;55.0;80;60;30;5"));
        next.observe(&record("c;x;x;500;21.0;1013;55.0;80;300;0;5"));

        assert_eq!(next.observed(), 3);
        assert_eq!(next.delay(), Duration::from_secs(40));
    }

    #[test]
    fn long_intervals_are_capped() {
        let mut next = NextPoll::new(PollTiming::default());
        next.observe(&record("a;x;x;500;21.0;1013;55.0;80;600;0;5"));

        assert_eq!(next.delay(), Duration::from_secs(310));
    }

    #[test]
    fn overdue_devices_poll_immediately() {
        let mut next = NextPoll::new(PollTiming::default());
        next.observe(&record("a;x;x;500;21.0;1013;55.0;80;60;100;5"));

        assert_eq!(next.delay(), Duration::ZERO);
    }

    #[test]
    fn unparsable_records_count_but_do_not_shorten() {
        let mut next = NextPoll::new(PollTiming::default());
        next.observe(&record("a;x;x;500;21.0;1013;55.0;80;later;10;5"));

        assert_eq!(next.observed(), 1);
        assert_eq!(next.delay(), Duration::from_secs(310));
    }

    #[test]
    fn custom_timing() {
        let timing = PollTiming {
            startup: Duration::ZERO,
            ceiling: Duration::from_secs(60),
            buffer: Duration::from_secs(2),
        };
        let mut next = NextPoll::new(timing);
        next.observe(&record("a;x;x;500;21.0;1013;55.0;80;30;0.5;5"));

        assert_eq!(timing.default_delay(), Duration::from_secs(62));
        assert_eq!(next.delay(), Duration::from_secs_f64(31.5));
    }
}
