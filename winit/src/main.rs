// Prevent console window in addition to Slint window in Windows release builds when, e.g., starting the app via file manager. Ignored on other platforms.
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

slint::include_modules!();

mod board;

use bridge_dashboard_common::{
    CardSet, DataSourcePointer, DummyDataSource, HttpDataSource, Poller, Settings, SystemClock,
};
use slint::ComponentHandle;

use board::SlintBoard;

/// Our App struct that holds the UI and the settings.
///
/// The cards are polled on a separate thread. That thread owns the card
/// state and hands every change over to the UI thread.
struct App {
    ui: AppWindow,
    settings: Settings,
}

impl App {
    /// Create a new App struct.
    fn new(settings: Settings) -> anyhow::Result<Self> {
        // Make a new AppWindow
        let ui = AppWindow::new()?;
        ui.global::<ViewModel>().set_status("Waiting for the bridge".into());

        Ok(Self { ui, settings })
    }

    /// The bridge if one is configured, sample data otherwise.
    fn data_source(&self) -> anyhow::Result<DataSourcePointer> {
        let source: DataSourcePointer = match &self.settings.bridge_url {
            Some(url) => {
                log::info!("Polling the bridge at {url}");
                Box::new(HttpDataSource::new(
                    url,
                    self.settings.username.clone(),
                    self.settings.password.clone(),
                    self.settings.request_timeout(),
                )?)
            }
            None => {
                log::info!("No bridge configured, showing sample data");
                Box::new(DummyDataSource::new())
            }
        };

        Ok(source)
    }

    /// Start polling and run the UI until the window is closed.
    fn run(&mut self) -> anyhow::Result<()> {
        let source = self.data_source()?;
        let settings = self.settings.clone();

        // Get the handle to the UI as a weak reference, the poller hands its updates through it.
        let ui_handle = self.ui.as_weak();

        std::thread::Builder::new()
            .name("poller".into())
            .spawn(move || {
                let poller = Poller::new(source, SystemClock, settings.timing());

                if settings.devices.is_empty() {
                    // The seeding payload already carries the readings, so it counts as the first cycle.
                    let (cards, report) = poller.seed();
                    let mut board = SlintBoard::new(cards, ui_handle, settings.assets_dir);
                    board.show_all();
                    poller.run_seeded(&mut board, &report);
                } else {
                    let cards = CardSet::from_devices(&settings.devices);
                    let mut board = SlintBoard::new(cards, ui_handle, settings.assets_dir);
                    board.show_all();

                    poller.run(&mut board);
                }
            })?;

        // Run the UI (and map an error to an anyhow::Error).
        self.ui.run().map_err(|e| e.into())
    }
}

/// A minimal main function that loads the settings and runs the App.
fn main() -> anyhow::Result<()> {
    env_logger::init();

    let settings = Settings::load()?;
    let mut app = App::new(settings)?;

    app.run()
}
