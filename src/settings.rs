use crate::browser::ContentSource;
use crate::ink::capture::{CaptureConfig, CommitMode};
use crate::ink::geometry::OverlayPlacement;
use crate::ink::model::{Color, PointerFilter, StrokeStyle};
use crate::ink::transparency::TransparencyConfig;
use crate::surface::{SurfaceRole, UnmatchedInput};
use serde::{Deserialize, Serialize};

pub const SETTINGS_FILE: &str = "ink_layers.json";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Settings {
    /// Title of the host window.
    #[serde(default = "default_title")]
    pub title: String,
    /// Initial client size in logical pixels.
    #[serde(default = "default_width")]
    pub width: i32,
    #[serde(default = "default_height")]
    pub height: i32,
    /// Page shown in the browser control. Defaults to a small inline page.
    #[serde(default)]
    pub content: ContentSource,
    /// Pointer kinds that draw ink.
    #[serde(default)]
    pub pointer_filter: PointerFilter,
    /// What happens to pointer input that does not draw ink.
    #[serde(default)]
    pub unmatched_input: UnmatchedInput,
    #[serde(default)]
    pub commit_mode: CommitMode,
    #[serde(default)]
    pub overlay_placement: OverlayPlacement,
    #[serde(default = "TransparencyConfig::transient_default")]
    pub transient_transparency: TransparencyConfig,
    #[serde(default = "TransparencyConfig::committed_default")]
    pub committed_transparency: TransparencyConfig,
    /// Pen used while a stroke is being drawn.
    #[serde(default)]
    pub transient_ink: StrokeStyle,
    /// Pen used for strokes once committed.
    #[serde(default = "default_committed_ink")]
    pub committed_ink: StrokeStyle,
    /// Draw a small dot under a hovering or touching pen.
    #[serde(default)]
    pub show_hover_cursor: bool,
    /// Pointer updates closer than this many pixels to the previous point are
    /// dropped. `0` only drops exact repeats.
    #[serde(default)]
    pub min_point_distance: u32,
    /// Show a message box when the browser control cannot be created.
    #[serde(default = "default_show_init_errors")]
    pub show_init_errors: bool,
    /// When enabled the application initialises the logger at debug level.
    #[serde(default)]
    pub debug_logging: bool,
    /// Optional file that receives a copy of the log output.
    #[serde(default)]
    pub log_file: Option<String>,
    /// Log one line per pointer sample the overlays receive.
    #[serde(default)]
    pub log_pointer_events: bool,
}

fn default_title() -> String {
    "Three-Layer Note-Taking Demo".into()
}

fn default_width() -> i32 {
    1024
}

fn default_height() -> i32 {
    768
}

fn default_committed_ink() -> StrokeStyle {
    StrokeStyle {
        width: 3,
        color: Color::rgb(0, 0, 0),
    }
}

fn default_show_init_errors() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            title: default_title(),
            width: default_width(),
            height: default_height(),
            content: ContentSource::default(),
            pointer_filter: PointerFilter::PenOnly,
            unmatched_input: UnmatchedInput::ForwardToBrowser,
            commit_mode: CommitMode::Commit,
            overlay_placement: OverlayPlacement::FullClient,
            transient_transparency: TransparencyConfig::transient_default(),
            committed_transparency: TransparencyConfig::committed_default(),
            transient_ink: StrokeStyle::default(),
            committed_ink: default_committed_ink(),
            show_hover_cursor: false,
            min_point_distance: 0,
            show_init_errors: default_show_init_errors(),
            debug_logging: false,
            log_file: None,
            log_pointer_events: false,
        }
    }
}

impl Settings {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &str) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn capture_config(&self) -> CaptureConfig {
        let mut committed_ink = self.committed_ink;
        if let Some(key) = self.committed_transparency.visual.colorkey() {
            committed_ink.color = committed_ink.color.avoid_colorkey(key);
        }
        CaptureConfig {
            filter: self.pointer_filter,
            style: self.transient_ink,
            commit_style: committed_ink,
            commit_mode: self.commit_mode,
            min_point_distance: self.min_point_distance,
        }
    }

    /// Problems with this configuration that still let the application run.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.width <= 0 || self.height <= 0 {
            warnings.push(format!(
                "window size {}x{} is not positive; using {}x{}",
                self.width,
                self.height,
                default_width(),
                default_height()
            ));
        }
        for (name, role, config) in [
            (
                "transient overlay",
                SurfaceRole::TransientOverlay,
                self.transient_transparency,
            ),
            (
                "committed overlay",
                SurfaceRole::CommittedOverlay,
                self.committed_transparency,
            ),
        ] {
            for warning in config.validate(role) {
                warnings.push(format!("{name}: {warning}"));
            }
        }
        if self.transient_ink.width == 0 || self.committed_ink.width == 0 {
            warnings.push("ink width 0 is drawn as 1 pixel".into());
        }
        warnings
    }

    /// Initial client size, falling back to the defaults for invalid values.
    pub fn window_size(&self) -> (i32, i32) {
        if self.width <= 0 || self.height <= 0 {
            (default_width(), default_height())
        } else {
            (self.width, self.height)
        }
    }
}
