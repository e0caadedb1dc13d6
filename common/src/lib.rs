//! Polling an Aranet4 bridge and turning its readings into dashboard cards.

pub mod card;
pub mod classify;
pub mod poller;
pub mod record;
pub mod schedule;
pub mod settings;
pub mod source;

pub use card::{Card, CardBoard, CardSet, CardUpdate, DeviceCard};
pub use classify::{BatteryBucket, Classification, Co2Level, Icon, Link};
pub use poller::{CycleReport, Poller};
pub use record::SensorRecord;
pub use schedule::{Clock, PollTiming, SystemClock};
pub use settings::Settings;
pub use source::{DataSource, DataSourcePointer, DummyDataSource, FetchError};

#[cfg(feature = "http")]
pub use source::HttpDataSource;
