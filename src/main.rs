use ink_layers::logging;
use ink_layers::platform;
use ink_layers::settings::{Settings, SETTINGS_FILE};
use std::path::PathBuf;

fn main() -> anyhow::Result<()> {
    let settings = Settings::load(SETTINGS_FILE)?;
    logging::init(settings.debug_logging, settings.log_file.as_ref().map(PathBuf::from));
    tracing::info!(title = %settings.title, "starting");
    for warning in settings.warnings() {
        tracing::warn!("{warning}");
    }

    if let Err(e) = platform::run(settings) {
        tracing::error!(error = ?e, "ink layers exited with an error");
        return Err(e);
    }
    Ok(())
}
