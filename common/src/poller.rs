//! The poll loop: fetch, render, wait, repeat.

use std::time::Duration;

use crate::card::{CardBoard, CardSet, CardUpdate};
use crate::record;
use crate::schedule::{Clock, NextPoll, PollTiming};
use crate::source::DataSource;

/// What happened during one poll cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CycleReport {
    /// Records written into a card.
    pub rendered: usize,
    /// Valid records without a card.
    pub unmatched: usize,
    /// Non-empty lines that were not records.
    pub skipped: usize,
    /// Wait until the next cycle.
    pub next_delay: Duration,
    /// The payload could not be fetched.
    pub failed: bool,
}

impl CycleReport {
    fn failed(timing: &PollTiming) -> Self {
        Self {
            rendered: 0,
            unmatched: 0,
            skipped: 0,
            next_delay: timing.default_delay(),
            failed: true,
        }
    }
}

pub struct Poller<S, C> {
    source: S,
    clock: C,
    timing: PollTiming,
}

impl<S: DataSource, C: Clock> Poller<S, C> {
    pub fn new(source: S, clock: C, timing: PollTiming) -> Self {
        Self {
            source,
            clock,
            timing,
        }
    }

    pub fn timing(&self) -> &PollTiming {
        &self.timing
    }

    /// Renders every record of `body` into `board` and works out when to poll next.
    pub fn render(&self, body: &str, board: &mut impl CardBoard) -> CycleReport {
        let mut next = NextPoll::new(self.timing);
        let mut unmatched = 0;
        let mut skipped = 0;

        for (line, record) in record::lines(body) {
            let Some(record) = record else {
                if !line.trim().is_empty() {
                    log::debug!("Skipping malformed line {line:?}");
                    skipped += 1;
                }
                continue;
            };

            if !board.render(&CardUpdate::from(&record)) {
                log::debug!("No card for device {:?}", record.id);
                unmatched += 1;
                continue;
            }

            next.observe(&record);
        }

        CycleReport {
            rendered: next.observed(),
            unmatched,
            skipped,
            next_delay: next.delay(),
            failed: false,
        }
    }

    /// Fetches the payload and renders it. A failed fetch renders nothing
    /// and waits the default delay.
    pub fn cycle(&self, board: &mut impl CardBoard) -> CycleReport {
        match self.source.fetch() {
            Ok(body) => self.render(&body, board),
            Err(e) => {
                log::warn!("Fetching sensor data failed: {e}");
                CycleReport::failed(&self.timing)
            }
        }
    }

    /// Runs a cycle and waits until the next one is due.
    pub fn step(&self, board: &mut impl CardBoard) -> CycleReport {
        let report = self.cycle(board);
        self.finish(board, &report);
        report
    }

    /// Waits the startup delay, then runs the first cycle.
    pub fn start(&self, board: &mut impl CardBoard) -> CycleReport {
        self.clock.sleep(self.timing.startup);
        self.step(board)
    }

    /// Polls forever, starting after the startup delay.
    pub fn run(&self, board: &mut impl CardBoard) -> ! {
        self.start(board);
        loop {
            self.step(board);
        }
    }

    /// Polls forever on cards built by [`Poller::seed`], whose payload
    /// counts as the first cycle.
    pub fn run_seeded(&self, board: &mut impl CardBoard, seeded: &CycleReport) -> ! {
        self.finish(board, seeded);
        loop {
            self.step(board);
        }
    }

    /// Builds the cards from the first payload that has any records.
    ///
    /// Waits the startup delay first and then retries after the default
    /// delay until the bridge reports a device. The returned report belongs
    /// to that payload.
    pub fn seed(&self) -> (CardSet, CycleReport) {
        self.clock.sleep(self.timing.startup);
        loop {
            match self.source.fetch() {
                Ok(body) => {
                    let mut cards = CardSet::seed(&body);
                    if !cards.is_empty() {
                        log::info!("Seeded {} cards from the bridge", cards.len());
                        let report = self.render(&body, &mut cards);
                        return (cards, report);
                    }
                    log::info!("Bridge reports no devices yet");
                }
                Err(e) => log::warn!("Fetching sensor data failed: {e}"),
            }

            self.clock.sleep(self.timing.default_delay());
        }
    }

    fn finish(&self, board: &mut impl CardBoard, report: &CycleReport) {
        log::debug!(
            "Rendered {} cards ({} unmatched, {} skipped lines), next poll in {:?}",
            report.rendered,
            report.unmatched,
            report.skipped,
            report.next_delay
        );

        board.cycle_finished(report);
        self.clock.sleep(report.next_delay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::Card;
    use crate::classify::Co2Level;
    use crate::source::{DummyDataSource, FetchError};
    use std::cell::{Cell, RefCell};

    #[derive(Default)]
    struct RecordingClock {
        sleeps: RefCell<Vec<Duration>>,
    }

    impl Clock for &RecordingClock {
        fn sleep(&self, duration: Duration) {
            self.sleeps.borrow_mut().push(duration);
        }
    }

    /// Fails until the given number of fetches have been made.
    struct FlakySource {
        failures: Cell<usize>,
        body: &'static str,
    }

    impl DataSource for FlakySource {
        fn fetch(&self) -> Result<String, FetchError> {
            if self.failures.get() > 0 {
                self.failures.set(self.failures.get() - 1);
                return Err(FetchError::Status(503));
            }
            Ok(self.body.to_owned())
        }
    }

    const BODY: &str = "dev1;x;x;500;21.0;1013;55.0;80;100;10;5\n";

    fn board() -> CardSet {
        CardSet::new(vec![Card::new("dev1", "Kitchen")])
    }

    #[test]
    fn renders_the_matching_card() {
        let clock = RecordingClock::default();
        let poller = Poller::new(DummyDataSource::with_body(BODY), &clock, PollTiming::default());
        let mut cards = board();

        let report = poller.cycle(&mut cards);

        let card = &cards.cards()[0];
        assert_eq!(card.co2_text, "500");
        assert_eq!(card.class_name(), "card co2-ok");
        assert_eq!(card.temperature_text, "21.0");
        assert_eq!(card.humidity_text, "55.0");
        assert_eq!(card.pressure_text, "1013");
        assert_eq!(card.battery_icon, "/img/battery_80.png");
        assert_eq!(card.link_icon, "/img/bluetooth.png");
        assert_eq!(report.rendered, 1);
        assert_eq!(report.next_delay, Duration::from_secs(100));
    }

    #[test]
    fn short_lines_touch_nothing() {
        let clock = RecordingClock::default();
        let poller = Poller::new(DummyDataSource::unavailable(), &clock, PollTiming::default());
        let mut cards = board();
        let before = cards.clone();

        let report = poller.render("dev1;x;x;1500;21.0\ndev1\n;;;;\n\n", &mut cards);

        assert_eq!(cards, before);
        assert_eq!(report.rendered, 0);
        assert_eq!(report.skipped, 3);
        assert_eq!(report.next_delay, Duration::from_secs(310));
    }

    #[test]
    fn unmatched_records_do_not_shorten_the_wait() {
        let clock = RecordingClock::default();
        let poller = Poller::new(DummyDataSource::unavailable(), &clock, PollTiming::default());
        let mut cards = board();

        let report = poller.render("other;x;x;500;21.0;1013;55.0;80;30;25;5\n", &mut cards);

        assert_eq!(report.unmatched, 1);
        assert_eq!(report.rendered, 0);
        assert_eq!(report.next_delay, Duration::from_secs(310));
    }

    #[test]
    fn stale_device_is_rendered_silent() {
        let clock = RecordingClock::default();
        let poller = Poller::new(DummyDataSource::unavailable(), &clock, PollTiming::default());
        let mut cards = board();

        poller.render("dev1;x;x;1500;21.0;1013;55.0;80;100;10;106\n", &mut cards);

        let card = &cards.cards()[0];
        assert_eq!(card.level, Co2Level::Unknown);
        assert_eq!(card.co2_text, "1500");
        assert_eq!(card.link_icon, "/img/bluetoothred.png");
    }

    #[test]
    fn failed_fetch_waits_the_default_delay() {
        let clock = RecordingClock::default();
        let source = FlakySource {
            failures: Cell::new(1),
            body: BODY,
        };
        let poller = Poller::new(source, &clock, PollTiming::default());
        let mut cards = board();

        let failed = poller.step(&mut cards);
        let recovered = poller.step(&mut cards);

        assert_eq!(failed.rendered, 0);
        assert_eq!(recovered.rendered, 1);
        assert_eq!(
            *clock.sleeps.borrow(),
            vec![Duration::from_secs(310), Duration::from_secs(100)]
        );
    }

    #[test]
    fn step_reports_to_the_board() {
        struct CountingBoard {
            cards: CardSet,
            reports: Vec<CycleReport>,
        }

        impl CardBoard for CountingBoard {
            fn render(&mut self, update: &CardUpdate) -> bool {
                self.cards.render(update)
            }

            fn cycle_finished(&mut self, report: &CycleReport) {
                self.reports.push(*report);
            }
        }

        let clock = RecordingClock::default();
        let poller = Poller::new(DummyDataSource::with_body(BODY), &clock, PollTiming::default());
        let mut board = CountingBoard {
            cards: board(),
            reports: Vec::new(),
        };

        let report = poller.step(&mut board);

        assert_eq!(board.reports, vec![report]);
    }

    #[test]
    fn first_cycle_waits_for_startup() {
        let clock = RecordingClock::default();
        let poller = Poller::new(DummyDataSource::with_body(BODY), &clock, PollTiming::default());
        let mut cards = board();

        let first = poller.start(&mut cards);
        poller.step(&mut cards);

        assert_eq!(first.next_delay, Duration::from_secs(100));
        assert_eq!(
            *clock.sleeps.borrow(),
            vec![Duration::from_secs(5), Duration::from_secs(100), Duration::from_secs(100)]
        );
    }

    #[test]
    fn failed_fetch_is_reported() {
        let clock = RecordingClock::default();
        let poller = Poller::new(DummyDataSource::unavailable(), &clock, PollTiming::default());
        let mut cards = board();

        assert!(poller.cycle(&mut cards).failed);
        assert!(!poller.render("", &mut cards).failed);
    }

    #[test]
    fn seed_retries_until_the_bridge_answers() {
        let clock = RecordingClock::default();
        let source = FlakySource {
            failures: Cell::new(2),
            body: BODY,
        };
        let poller = Poller::new(source, &clock, PollTiming::default());

        let (cards, report) = poller.seed();

        assert_eq!(cards.len(), 1);
        assert_eq!(report.rendered, 1);
        assert_eq!(report.next_delay, Duration::from_secs(100));
        assert_eq!(
            *clock.sleeps.borrow(),
            vec![Duration::from_secs(5), Duration::from_secs(310), Duration::from_secs(310)]
        );
    }
}
