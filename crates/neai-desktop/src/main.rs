//! NanoEdge AI desktop display

mod app;
mod cli;
mod session;
mod ui;

use clap::Parser;
use app::NeaiApp;
use cli::Args;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config = args.to_config()?;

    tracing::info!(
        "Starting NanoEdge AI display on {} in {} mode",
        config.link.port, config.mode
    );

    let app = NeaiApp::new(config, args.simulate)?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_title("Cartesiam"),
        ..Default::default()
    };

    eframe::run_native(
        "Cartesiam",
        options,
        Box::new(move |_cc| Ok(Box::new(app))),
    )
    .map_err(|e| anyhow::anyhow!("Failed to run native app: {}", e))?;

    Ok(())
}
