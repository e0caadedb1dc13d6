//! Cards are the per-device tiles of the dashboard.
//!
//! The poller only ever writes into cards that already exist. Which cards
//! exist is decided up front, either from the configured devices or from a
//! first payload (see [`CardSet::seed`]).

use serde::{Deserialize, Serialize};

use crate::classify::{Classification, Co2Level, Icon};
use crate::poller::CycleReport;
use crate::record::{self, SensorRecord};

/// Class every card carries in addition to its CO2 class.
pub const BASE_CLASS: &str = "card";

/// What a record writes into its card.
#[derive(Clone, Debug, PartialEq)]
pub struct CardUpdate {
    pub id: String,
    pub name: String,
    pub address: String,
    pub classification: Classification,
    pub battery_text: String,
    pub co2_text: String,
    pub temperature_text: String,
    pub humidity_text: String,
    pub pressure_text: String,
}

impl CardUpdate {
    pub fn new(record: &SensorRecord<'_>, classification: Classification) -> Self {
        Self {
            id: record.id.to_owned(),
            name: record.name.to_owned(),
            address: record.address.to_owned(),
            classification,
            battery_text: record.battery.text().to_owned(),
            co2_text: record.co2.text().to_owned(),
            temperature_text: record.temperature.text().to_owned(),
            humidity_text: record.humidity.text().to_owned(),
            pressure_text: record.pressure.text().to_owned(),
        }
    }
}

impl From<&SensorRecord<'_>> for CardUpdate {
    fn from(record: &SensorRecord<'_>) -> Self {
        Self::new(record, Classification::of(record))
    }
}

/// Anything the poller can render into.
pub trait CardBoard {
    /// Writes `update` into the card matching `update.id`.
    ///
    /// Returns `false`, and changes nothing, when there is no such card.
    fn render(&mut self, update: &CardUpdate) -> bool;

    /// Called once at the end of every poll cycle.
    fn cycle_finished(&mut self, _report: &CycleReport) {}
}

/// A device the user wants a card for.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct DeviceCard {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// The state of a single card.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Card {
    pub data_id: String,
    pub title: String,
    pub address: String,
    pub level: Co2Level,
    pub link_icon: String,
    pub battery_icon: String,
    pub battery_title: String,
    pub co2_text: String,
    pub temperature_text: String,
    pub humidity_text: String,
    pub pressure_text: String,
}

impl Card {
    pub fn new(data_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            data_id: data_id.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    /// Whether a record with identifier `id` belongs to this card.
    ///
    /// Like an attribute substring selector: the card's identifier has to
    /// contain `id`, and an empty `id` matches nothing.
    pub fn matches(&self, id: &str) -> bool {
        !id.is_empty() && self.data_id.contains(id)
    }

    /// Class list of the card, e.g. `card co2-ok`.
    pub fn class_name(&self) -> String {
        format!("{BASE_CLASS} {}", self.level.class_name())
    }

    /// Writes the readings of `update` into the card. Title and address are
    /// only filled in while the card has none.
    pub fn apply(&mut self, update: &CardUpdate) {
        let classification = update.classification;

        if self.title.is_empty() {
            self.title.clone_from(&update.name);
        }
        if self.address.is_empty() {
            self.address.clone_from(&update.address);
        }

        self.link_icon = Icon::from(classification.link).asset_path();
        self.battery_icon = Icon::from(classification.battery).asset_path();
        self.battery_title = format!("{}%", update.battery_text);
        self.co2_text.clone_from(&update.co2_text);
        self.temperature_text.clone_from(&update.temperature_text);
        self.humidity_text.clone_from(&update.humidity_text);
        self.pressure_text.clone_from(&update.pressure_text);
        self.level = classification.level;
    }
}

/// An in-memory collection of cards with a fixed membership.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CardSet {
    cards: Vec<Card>,
}

impl CardSet {
    pub fn new(cards: Vec<Card>) -> Self {
        Self { cards }
    }

    pub fn from_devices(devices: &[DeviceCard]) -> Self {
        Self::new(
            devices
                .iter()
                .map(|device| Card::new(device.id.clone(), device.name.clone()))
                .collect(),
        )
    }

    /// One card per valid record of `body`, filled with that record.
    pub fn seed(body: &str) -> Self {
        let cards = record::records(body)
            .map(|record| {
                let mut card = Card::new(record.id, "");
                card.apply(&CardUpdate::from(&record));
                card
            })
            .collect();

        Self::new(cards)
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Index of the first card matching `id`.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.cards.iter().position(|card| card.matches(id))
    }

    /// Applies `update` to its card and returns the card's index.
    pub fn apply(&mut self, update: &CardUpdate) -> Option<usize> {
        let index = self.position(&update.id)?;
        self.cards[index].apply(update);
        Some(index)
    }
}

impl CardBoard for CardSet {
    fn render(&mut self, update: &CardUpdate) -> bool {
        self.apply(update).is_some()
    }
}
