//! Native windowing. Everything above this module is platform neutral.

use crate::settings::Settings;

#[cfg(target_os = "windows")]
mod webview;
#[cfg(target_os = "windows")]
mod win32;

/// Creates the host and overlay windows and runs the message loop until the
/// host window closes.
#[cfg(target_os = "windows")]
pub fn run(settings: Settings) -> anyhow::Result<()> {
    win32::run(settings)
}

#[cfg(not(target_os = "windows"))]
pub fn run(settings: Settings) -> anyhow::Result<()> {
    anyhow::bail!("{} needs Windows with the WebView2 runtime", settings.title)
}
