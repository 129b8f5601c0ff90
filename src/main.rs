use egui::ViewportBuilder;
use log::warn;
use syswidget::app::SysWidgetApp;
use syswidget::monitor::{spawn_backend_summary, SmiSource};
use syswidget::Settings;

fn main() -> eframe::Result {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = Settings::load();
    let native_options = eframe::NativeOptions {
        viewport: ViewportBuilder::default()
            .with_title("System Monitor")
            .with_inner_size([settings.width as f32, settings.height as f32])
            .with_min_inner_size([160.0, 120.0])
            .with_minimized(settings.start_minimized),
        ..Default::default()
    };

    // the summary prints whenever the provider answers; the window does not wait
    if let Err(e) = spawn_backend_summary(SmiSource::new()) {
        warn!("skipping GPU summary: {e}");
    }

    eframe::run_native(
        "syswidget",
        native_options,
        Box::new(move |cc| Ok(Box::new(SysWidgetApp::new(cc, settings)?))),
    )
}
