//! Visual transparency and input transparency of overlay windows.
//!
//! The two are configured separately: a colour-keyed or alpha-blended window
//! still swallows clicks unless its hit-test says otherwise.

use crate::ink::model::{Color, Point, DEFAULT_TRANSPARENCY_COLORKEY};
use crate::surface::SurfaceRole;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VisualTransparency {
    ColorKey { key: Color },
    Alpha { opacity: u8 },
    Opaque,
}

impl VisualTransparency {
    pub fn colorkey(self) -> Option<Color> {
        match self {
            Self::ColorKey { key } => Some(key),
            Self::Alpha { .. } | Self::Opaque => None,
        }
    }
}

impl Default for VisualTransparency {
    fn default() -> Self {
        Self::ColorKey {
            key: DEFAULT_TRANSPARENCY_COLORKEY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputTransparency {
    /// The overlay receives every pointer message over its bounds.
    #[default]
    Never,
    /// Hit-testing always reports transparent.
    Always,
    /// Transparent wherever the overlay pixel equals the key colour.
    ColorKeyed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTest {
    Client,
    Transparent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransparencyConfig {
    #[serde(default)]
    pub visual: VisualTransparency,
    #[serde(default)]
    pub input: InputTransparency,
}

impl TransparencyConfig {
    pub const fn new(visual: VisualTransparency, input: InputTransparency) -> Self {
        Self { visual, input }
    }

    pub fn transient_default() -> Self {
        Self::new(VisualTransparency::default(), InputTransparency::Never)
    }

    pub fn committed_default() -> Self {
        Self::new(VisualTransparency::default(), InputTransparency::Always)
    }

    /// Colour unpainted pixels are cleared to.
    pub fn clear_color(self) -> Color {
        match self.visual {
            VisualTransparency::ColorKey { key } => key,
            VisualTransparency::Alpha { .. } | VisualTransparency::Opaque => {
                Color::rgba(0, 0, 0, 0)
            }
        }
    }

    pub fn hit_test<F>(self, point: Point, sample: F) -> HitTest
    where
        F: FnOnce(Point) -> Option<Color>,
    {
        hit_test(self.input, self.visual.colorkey(), point, sample)
    }

    pub fn validate(self, role: SurfaceRole) -> Vec<TransparencyWarning> {
        let mut warnings = Vec::new();
        if self.input == InputTransparency::ColorKeyed && self.visual.colorkey().is_none() {
            warnings.push(TransparencyWarning::ColorKeyedInputWithoutKey);
        }
        if self.visual == VisualTransparency::Opaque && role != SurfaceRole::Host {
            warnings.push(TransparencyWarning::OpaqueOverlayHidesContent);
        }
        if role == SurfaceRole::CommittedOverlay && self.input != InputTransparency::Always {
            warnings.push(TransparencyWarning::CommittedOverlayBlocksInput);
        }
        // An idle transient overlay is all key colour, so colour-keyed
        // hit-testing never lets a pen-down reach it.
        let keyed_away = self.input == InputTransparency::ColorKeyed && self.visual.colorkey().is_some();
        if role == SurfaceRole::TransientOverlay
            && (self.input == InputTransparency::Always || keyed_away)
        {
            warnings.push(TransparencyWarning::TransientOverlayNeverReceivesInput);
        }
        warnings
    }
}

pub fn hit_test<F>(
    input: InputTransparency,
    key: Option<Color>,
    point: Point,
    sample: F,
) -> HitTest
where
    F: FnOnce(Point) -> Option<Color>,
{
    match input {
        InputTransparency::Never => HitTest::Client,
        InputTransparency::Always => HitTest::Transparent,
        InputTransparency::ColorKeyed => {
            let Some(key) = key else {
                return HitTest::Client;
            };
            match sample(point) {
                Some(pixel) if pixel.same_rgb(key) => HitTest::Transparent,
                Some(_) => HitTest::Client,
                None => HitTest::Transparent,
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransparencyWarning {
    ColorKeyedInputWithoutKey,
    OpaqueOverlayHidesContent,
    CommittedOverlayBlocksInput,
    TransientOverlayNeverReceivesInput,
}

impl fmt::Display for TransparencyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::ColorKeyedInputWithoutKey => {
                "colour-keyed hit-testing needs a colour-key visual; input will never pass through"
            }
            Self::OpaqueOverlayHidesContent => "opaque overlay hides the web content beneath it",
            Self::CommittedOverlayBlocksInput => {
                "committed overlay is not input-transparent and will swallow pointer input"
            }
            Self::TransientOverlayNeverReceivesInput => {
                "transient overlay is click-through while idle and can never start a stroke"
            }
        };
        f.write_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colorkeyed_hit_test_passes_through_key_pixels_only() {
        let config = TransparencyConfig::new(
            VisualTransparency::default(),
            InputTransparency::ColorKeyed,
        );
        let key = DEFAULT_TRANSPARENCY_COLORKEY;

        assert_eq!(
            config.hit_test(Point::new(1, 1), |_| Some(key)),
            HitTest::Transparent
        );
        assert_eq!(
            config.hit_test(Point::new(1, 1), |_| Some(Color::rgb(255, 0, 0))),
            HitTest::Client
        );
        assert_eq!(config.hit_test(Point::new(1, 1), |_| None), HitTest::Transparent);
    }

    #[test]
    fn unconditional_modes_ignore_pixels() {
        let never = TransparencyConfig::transient_default();
        let always = TransparencyConfig::committed_default();
        assert_eq!(never.hit_test(Point::default(), |_| None), HitTest::Client);
        assert_eq!(
            always.hit_test(Point::default(), |_| Some(Color::rgb(9, 9, 9))),
            HitTest::Transparent
        );
    }

    #[test]
    fn colorkeyed_input_on_alpha_visual_is_flagged() {
        let config = TransparencyConfig::new(
            VisualTransparency::Alpha { opacity: 192 },
            InputTransparency::ColorKeyed,
        );
        assert_eq!(
            config.validate(SurfaceRole::TransientOverlay),
            vec![TransparencyWarning::ColorKeyedInputWithoutKey]
        );
        assert_eq!(
            config.hit_test(Point::default(), |_| Some(DEFAULT_TRANSPARENCY_COLORKEY)),
            HitTest::Client
        );
    }

    #[test]
    fn colorkeyed_transient_overlay_is_flagged() {
        let config = TransparencyConfig::new(
            VisualTransparency::default(),
            InputTransparency::ColorKeyed,
        );
        assert_eq!(
            config.validate(SurfaceRole::TransientOverlay),
            vec![TransparencyWarning::TransientOverlayNeverReceivesInput]
        );
        assert_eq!(
            config.hit_test(Point::new(100, 100), |_| Some(DEFAULT_TRANSPARENCY_COLORKEY)),
            HitTest::Transparent
        );
    }

    #[test]
    fn default_layer_configs_are_consistent() {
        assert!(TransparencyConfig::transient_default()
            .validate(SurfaceRole::TransientOverlay)
            .is_empty());
        assert!(TransparencyConfig::committed_default()
            .validate(SurfaceRole::CommittedOverlay)
            .is_empty());
        assert_eq!(
            TransparencyConfig::transient_default().validate(SurfaceRole::CommittedOverlay),
            vec![TransparencyWarning::CommittedOverlayBlocksInput]
        );
    }

    #[test]
    fn clear_color_follows_visual_mode() {
        assert_eq!(
            TransparencyConfig::transient_default().clear_color(),
            DEFAULT_TRANSPARENCY_COLORKEY
        );
        assert_eq!(
            TransparencyConfig::new(VisualTransparency::Alpha { opacity: 128 }, InputTransparency::Never)
                .clear_color()
                .a,
            0
        );
    }
}
