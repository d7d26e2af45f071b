pub mod browser;
pub mod ink;
pub mod logging;
pub mod platform;
pub mod settings;
pub mod surface;
pub mod win_util;
