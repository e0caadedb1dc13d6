//! Parsing of the bridge's `/data` payload.
//!
//! The payload is plain text with one device per line and `;` separated
//! fields:
//!
//! ```text
//! id;name;address;co2;temperature;pressure;humidity;battery;interval;age;last_seen_ago
//! ```

/// The field separator of a line.
pub const SEPARATOR: char = ';';

/// Lines with fewer fields are not records.
pub const MIN_FIELDS: usize = 11;

const ID: usize = 0;
const NAME: usize = 1;
const ADDRESS: usize = 2;
const CO2: usize = 3;
const TEMPERATURE: usize = 4;
const PRESSURE: usize = 5;
const HUMIDITY: usize = 6;
const BATTERY: usize = 7;
const INTERVAL: usize = 8;
const MEASUREMENT_AGE: usize = 9;
const LAST_SEEN_AGO: usize = 10;

/// A single field of a record, kept as the text the bridge sent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Reading<'a> {
    raw: &'a str,
}

impl<'a> Reading<'a> {
    pub fn new(raw: &'a str) -> Self {
        Self { raw }
    }

    /// The field exactly as received. This is what gets displayed.
    pub fn text(&self) -> &'a str {
        self.raw
    }

    /// The whole field as a number.
    ///
    /// Surrounding whitespace is ignored and an empty field counts as zero.
    /// Anything else that is not a finite number has no value.
    pub fn value(&self) -> Option<f64> {
        let trimmed = self.raw.trim();
        if trimmed.is_empty() {
            return Some(0.0);
        }
        trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
    }

    /// The leading integer of the field, ignoring whatever follows it.
    ///
    /// `"100"`, `"100.7"` and `"100s"` all give `100`.
    pub fn whole(&self) -> Option<i64> {
        let trimmed = self.raw.trim_start();
        let digits_start = usize::from(trimmed.starts_with(['+', '-']));
        let digits_end = trimmed[digits_start..]
            .find(|c: char| !c.is_ascii_digit())
            .map_or(trimmed.len(), |end| end + digits_start);

        if digits_end == digits_start {
            return None;
        }
        trimmed[..digits_end].parse().ok()
    }
}

/// One device line of the `/data` payload.
#[derive(Clone, Debug, PartialEq)]
pub struct SensorRecord<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub address: &'a str,
    pub co2: Reading<'a>,
    pub temperature: Reading<'a>,
    pub pressure: Reading<'a>,
    pub humidity: Reading<'a>,
    pub battery: Reading<'a>,
    /// Measurement interval of the device in seconds.
    pub interval: Reading<'a>,
    /// Seconds since the device took its last measurement.
    pub measurement_age: Reading<'a>,
    /// Seconds since the bridge last heard from the device.
    pub last_seen_ago: Reading<'a>,
}

impl<'a> SensorRecord<'a> {
    /// Parses a single line. Returns `None` for lines with too few fields.
    pub fn parse(line: &'a str) -> Option<Self> {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let fields: Vec<&str> = line.split(SEPARATOR).collect();
        if fields.len() < MIN_FIELDS {
            return None;
        }

        let reading = |index: usize| Reading::new(fields[index]);

        Some(Self {
            id: fields[ID],
            name: fields[NAME],
            address: fields[ADDRESS],
            co2: reading(CO2),
            temperature: reading(TEMPERATURE),
            pressure: reading(PRESSURE),
            humidity: reading(HUMIDITY),
            battery: reading(BATTERY),
            interval: reading(INTERVAL),
            measurement_age: reading(MEASUREMENT_AGE),
            last_seen_ago: reading(LAST_SEEN_AGO),
        })
    }

    /// Seconds until the device is expected to take its next measurement.
    pub fn seconds_until_next_measurement(&self) -> Option<f64> {
        let until = self.interval.value()? - self.measurement_age.value()?;
        until.is_finite().then_some(until)
    }
}

/// Splits a payload into its lines, each paired with the parsed record if it is one.
pub fn lines(body: &str) -> impl Iterator<Item = (&str, Option<SensorRecord<'_>>)> {
    body.split('\n').map(|line| (line, SensorRecord::parse(line)))
}

/// All valid records of a payload, silently dropping everything else.
pub fn records(body: &str) -> impl Iterator<Item = SensorRecord<'_>> {
    lines(body).filter_map(|(_, record)| record)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE: &str = "dev1;Kitchen;AA:BB:CC:DD:EE:FF;500;21.0;1013;55.0;80;100;10;5";

    #[test]
    fn parses_all_fields() {
        let record = SensorRecord::parse(LINE).unwrap();

        assert_eq!(record.id, "dev1");
        assert_eq!(record.name, "Kitchen");
        assert_eq!(record.address, "AA:BB:CC:DD:EE:FF");
        assert_eq!(record.co2.value(), Some(500.0));
        assert_eq!(record.temperature.text(), "21.0");
        assert_eq!(record.pressure.text(), "1013");
        assert_eq!(record.humidity.text(), "55.0");
        assert_eq!(record.battery.value(), Some(80.0));
        assert_eq!(record.interval.whole(), Some(100));
        assert_eq!(record.measurement_age.value(), Some(10.0));
        assert_eq!(record.last_seen_ago.value(), Some(5.0));
        assert_eq!(record.seconds_until_next_measurement(), Some(90.0));
    }

    #[test]
    fn short_lines_are_not_records() {
        assert_eq!(SensorRecord::parse(""), None);
        assert_eq!(SensorRecord::parse("dev1;x;x;500;21.0;1013;55.0;80;100;10"), None);
        assert_eq!(SensorRecord::parse("garbage"), None);
    }

    #[test]
    fn extra_fields_are_ignored() {
        let record = SensorRecord::parse("dev1;x;x;500;21.0;1013;55.0;80;100;10;5;extra").unwrap();
        assert_eq!(record.last_seen_ago.text(), "5");
    }

    #[test]
    fn carriage_return_is_dropped() {
        let record = SensorRecord::parse("dev1;x;x;500;21.0;1013;55.0;80;100;10;5\r").unwrap();
        assert_eq!(record.last_seen_ago.text(), "5");
    }

    #[test]
    fn numeric_views() {
        assert_eq!(Reading::new(" 42 ").value(), Some(42.0));
        assert_eq!(Reading::new("").value(), Some(0.0));
        assert_eq!(Reading::new("abc").value(), None);
        assert_eq!(Reading::new("NaN").value(), None);
        assert_eq!(Reading::new("inf").value(), None);

        assert_eq!(Reading::new("100.7").whole(), Some(100));
        assert_eq!(Reading::new(" -3s").whole(), Some(-3));
        assert_eq!(Reading::new("+7").whole(), Some(7));
        assert_eq!(Reading::new("").whole(), None);
        assert_eq!(Reading::new("-").whole(), None);
        assert_eq!(Reading::new("x1").whole(), None);
    }

    #[test]
    fn records_skip_invalid_lines() {
        let body = format!("{LINE}\nbroken;line\n\n{LINE}\n");
        assert_eq!(records(&body).count(), 2);
        assert_eq!(lines(&body).count(), 5);
    }

    #[test]
    fn unparsable_interval_has_no_next_measurement() {
        let record = SensorRecord::parse("dev1;x;x;500;21.0;1013;55.0;80;soon;10;5").unwrap();
        assert_eq!(record.seconds_until_next_measurement(), None);
    }
}
