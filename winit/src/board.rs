use std::path::{Path, PathBuf};

use bridge_dashboard_common::{Card, CardBoard, CardSet, CardUpdate, CycleReport};
use slint::{ComponentHandle, Image, Model, ModelRc, SharedString, VecModel};

use crate::{AppWindow, CardData, ViewModel};

/// A card board living in the window.
///
/// The cards themselves are kept in a [`CardSet`] on the polling thread.
/// Every change is copied into the window's model on the UI thread.
pub struct SlintBoard {
    cards: CardSet,
    ui: slint::Weak<AppWindow>,
    assets_dir: PathBuf,
}

impl SlintBoard {
    pub fn new(cards: CardSet, ui: slint::Weak<AppWindow>, assets_dir: PathBuf) -> Self {
        Self {
            cards,
            ui,
            assets_dir,
        }
    }

    /// Replaces the window's cards with the whole card set.
    pub fn show_all(&self) {
        let cards = self.cards.cards().to_vec();
        let assets_dir = self.assets_dir.clone();

        self.in_event_loop(move |ui| {
            let rows: Vec<CardData> = cards.iter().map(|card| card_data(card, &assets_dir)).collect();
            ui.global::<ViewModel>()
                .set_cards(ModelRc::new(VecModel::from(rows)));
        });
    }

    fn in_event_loop(&self, func: impl FnOnce(AppWindow) + Send + 'static) {
        if let Err(e) = self.ui.upgrade_in_event_loop(func) {
            log::warn!("Dropping UI update, the event loop is gone: {e}");
        }
    }
}

impl CardBoard for SlintBoard {
    fn render(&mut self, update: &CardUpdate) -> bool {
        let Some(index) = self.cards.apply(update) else {
            return false;
        };

        let card = self.cards.cards()[index].clone();
        let assets_dir = self.assets_dir.clone();

        self.in_event_loop(move |ui| {
            let rows = ui.global::<ViewModel>().get_cards();
            if index < rows.row_count() {
                rows.set_row_data(index, card_data(&card, &assets_dir));
            }
        });

        true
    }

    fn cycle_finished(&mut self, report: &CycleReport) {
        let status = status_text(&chrono::Local::now().format("%H:%M:%S").to_string(), report);
        self.in_event_loop(move |ui| ui.global::<ViewModel>().set_status(status.into()));
    }
}

/// The status line shown in the header.
fn status_text(time: &str, report: &CycleReport) -> String {
    if report.failed {
        return format!(
            "Bridge unreachable at {time}, retrying in {}s",
            report.next_delay.as_secs()
        );
    }

    format!(
        "Updated {time}, {} cards, next in {}s",
        report.rendered,
        report.next_delay.as_secs()
    )
}

/// Converts a card into the row the window displays.
fn card_data(card: &Card, assets_dir: &Path) -> CardData {
    CardData {
        id: SharedString::from(card.data_id.as_str()),
        title: SharedString::from(card.title.as_str()),
        address: SharedString::from(card.address.as_str()),
        level: SharedString::from(card.level.class_name()),
        link_icon: icon(&card.link_icon, assets_dir),
        battery_icon: icon(&card.battery_icon, assets_dir),
        battery_title: SharedString::from(card.battery_title.as_str()),
        co2: SharedString::from(card.co2_text.as_str()),
        temperature: SharedString::from(card.temperature_text.as_str()),
        humidity: SharedString::from(card.humidity_text.as_str()),
        pressure: SharedString::from(card.pressure_text.as_str()),
    }
}

/// Loads an icon given by its path on the bridge, e.g. `/img/bluetooth.png`, from the assets directory.
fn icon(asset_path: &str, assets_dir: &Path) -> Image {
    if asset_path.is_empty() {
        return Image::default();
    }

    let file = assets_dir.join(asset_path.trim_start_matches('/'));
    Image::load_from_path(&file).unwrap_or_else(|_| {
        log::debug!("Missing icon {}", file.display());
        Image::default()
    })
}
