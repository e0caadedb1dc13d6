use std::fmt;

use crate::record::SensorRecord;

/// CO2 ppm below which the air is considered fine.
pub const CO2_OK_BELOW: f64 = 1000.0;

/// CO2 ppm below which the air is considered worth a warning.
pub const CO2_WARN_BELOW: f64 = 1400.0;

/// A device not heard of for longer than its interval plus this many seconds is stale.
pub const STALE_GRACE_SECS: i64 = 5;

/// The CO2 level of a card.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Co2Level {
    /// No reading, or one from a device that went silent.
    #[default]
    Unknown,
    Ok,
    Warn,
    Alert,
}

impl Co2Level {
    /// Level of a CO2 reading. A reading that is not a number is none of
    /// the lower levels, so it ends up as [`Co2Level::Alert`].
    pub fn from_ppm(ppm: Option<f64>) -> Self {
        match ppm {
            Some(ppm) if ppm == 0.0 => Co2Level::Unknown,
            Some(ppm) if ppm < CO2_OK_BELOW => Co2Level::Ok,
            Some(ppm) if ppm < CO2_WARN_BELOW => Co2Level::Warn,
            Some(_) | None => Co2Level::Alert,
        }
    }

    /// The class name used to style a card with this level.
    pub fn class_name(self) -> &'static str {
        match self {
            Co2Level::Unknown => "co2-none",
            Co2Level::Ok => "co2-ok",
            Co2Level::Warn => "co2-warn",
            Co2Level::Alert => "co2-alert",
        }
    }
}

/// Battery tier used to pick an icon: 10, 20, ... 100.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatteryBucket(u8);

impl BatteryBucket {
    pub const EMPTY: BatteryBucket = BatteryBucket(10);
    pub const FULL: BatteryBucket = BatteryBucket(100);

    /// The highest bucket whose lower neighbour the percentage exceeds.
    ///
    /// `95` gives 100, `85` gives 90, `15` gives 20 and everything up to 10
    /// (or no value at all) gives 10.
    pub fn from_percent(percent: Option<f64>) -> Self {
        let Some(percent) = percent else {
            return Self::EMPTY;
        };

        (2..=10u8)
            .rev()
            .map(|tier| tier * 10)
            .find(|&bucket| percent > f64::from(bucket - 10))
            .map_or(Self::EMPTY, BatteryBucket)
    }

    pub fn percent(self) -> u8 {
        self.0
    }
}

impl Default for BatteryBucket {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Whether the bridge still hears from a device.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Link {
    #[default]
    Connected,
    Lost,
}

/// The icons a card can show.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Icon {
    Bluetooth,
    BluetoothLost,
    Battery(BatteryBucket),
}

impl Icon {
    /// Where the bridge serves the icon.
    pub fn asset_path(self) -> String {
        format!("/img/{self}.png")
    }
}

impl fmt::Display for Icon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Icon::Bluetooth => f.write_str("bluetooth"),
            Icon::BluetoothLost => f.write_str("bluetoothred"),
            Icon::Battery(bucket) => write!(f, "battery_{}", bucket.percent()),
        }
    }
}

impl From<Link> for Icon {
    fn from(link: Link) -> Self {
        match link {
            Link::Connected => Icon::Bluetooth,
            Link::Lost => Icon::BluetoothLost,
        }
    }
}

impl From<BatteryBucket> for Icon {
    fn from(bucket: BatteryBucket) -> Self {
        Icon::Battery(bucket)
    }
}

/// Everything derived from a record that decides how its card looks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Classification {
    pub level: Co2Level,
    pub battery: BatteryBucket,
    pub link: Link,
}

impl Classification {
    pub fn of(record: &SensorRecord<'_>) -> Self {
        let link = if is_stale(record) { Link::Lost } else { Link::Connected };

        // A silent device keeps reporting its last CO2 value, don't alarm on it.
        let level = match link {
            Link::Lost => Co2Level::Unknown,
            Link::Connected => Co2Level::from_ppm(record.co2.value()),
        };

        Self {
            level,
            battery: BatteryBucket::from_percent(record.battery.value()),
            link,
        }
    }
}

/// True when the bridge lost contact with the device.
pub fn is_stale(record: &SensorRecord<'_>) -> bool {
    match (record.last_seen_ago.value(), record.interval.whole()) {
        (Some(ago), Some(interval)) => ago > interval.saturating_add(STALE_GRACE_SECS) as f64,
        _ => false,
    }
}
