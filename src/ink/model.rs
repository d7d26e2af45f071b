use serde::{Deserialize, Serialize};

/// Colour used to clear overlay pixels that should be keyed out by the
/// layered window.
pub const DEFAULT_TRANSPARENCY_COLORKEY: Color = Color::rgba(1, 0, 0, 255);
const COLORKEY_SAFE_FALLBACK: Color = Color::rgba(2, 0, 0, 255);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn distance_sq(self, other: Point) -> i64 {
        let dx = other.x as i64 - self.x as i64;
        let dy = other.y as i64 - self.y as i64;
        dx * dx + dy * dy
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerKind {
    Pen,
    Touch,
    Mouse,
    Touchpad,
    Unknown,
}

impl PointerKind {
    /// Maps the platform `POINTER_INPUT_TYPE` value.
    pub fn from_input_type(code: u32) -> Self {
        match code {
            2 => Self::Touch,
            3 => Self::Pen,
            4 => Self::Mouse,
            5 => Self::Touchpad,
            _ => Self::Unknown,
        }
    }

    pub fn input_type(self) -> u32 {
        match self {
            Self::Touch => 2,
            Self::Pen => 3,
            Self::Mouse => 4,
            Self::Touchpad => 5,
            Self::Unknown => 1,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Pen => "Stylus",
            Self::Touch => "Touch",
            Self::Mouse => "Mouse",
            Self::Touchpad => "Touchpad",
            Self::Unknown => "Pointer",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerFilter {
    #[default]
    PenOnly,
    PenAndTouch,
    PenAndMouse,
    Any,
}

impl PointerFilter {
    pub fn accepts(self, kind: PointerKind) -> bool {
        match self {
            Self::PenOnly => kind == PointerKind::Pen,
            Self::PenAndTouch => matches!(kind, PointerKind::Pen | PointerKind::Touch),
            Self::PenAndMouse => matches!(kind, PointerKind::Pen | PointerKind::Mouse),
            Self::Any => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    /// Packs into the `0x00BBGGRR` layout GDI expects.
    pub fn to_colorref(self) -> u32 {
        (self.r as u32) | ((self.g as u32) << 8) | ((self.b as u32) << 16)
    }

    pub fn same_rgb(self, other: Color) -> bool {
        self.r == other.r && self.g == other.g && self.b == other.b
    }

    /// Ink that matches the key colour would be keyed out, so it is nudged to
    /// a nearby colour instead.
    pub fn avoid_colorkey(self, key: Color) -> Self {
        if !self.same_rgb(key) {
            return self;
        }
        if COLORKEY_SAFE_FALLBACK.same_rgb(key) {
            Color::rgba(key.r ^ 0x04, key.g, key.b, self.a)
        } else {
            Color::rgba(
                COLORKEY_SAFE_FALLBACK.r,
                COLORKEY_SAFE_FALLBACK.g,
                COLORKEY_SAFE_FALLBACK.b,
                self.a,
            )
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrokeStyle {
    pub width: u32,
    pub color: Color,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            width: 3,
            color: Color::rgb(255, 0, 0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stroke {
    pub pointer_id: u32,
    pub style: StrokeStyle,
    points: Vec<Point>,
}

impl Stroke {
    pub fn begin(pointer_id: u32, style: StrokeStyle, start: Point) -> Self {
        Self {
            pointer_id,
            style,
            points: vec![start],
        }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn start(&self) -> Point {
        self.points[0]
    }

    pub fn last(&self) -> Point {
        self.points[self.points.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub(crate) fn push(&mut self, point: Point) {
        self.points.push(point);
    }

    pub fn with_style(mut self, style: StrokeStyle) -> Self {
        self.style = style;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransientLayer {
    stroke: Option<Stroke>,
}

impl TransientLayer {
    pub fn stroke(&self) -> Option<&Stroke> {
        self.stroke.as_ref()
    }

    pub fn stroke_mut(&mut self) -> Option<&mut Stroke> {
        self.stroke.as_mut()
    }

    pub fn set(&mut self, stroke: Stroke) {
        self.stroke = Some(stroke);
    }

    pub fn take(&mut self) -> Option<Stroke> {
        self.stroke.take()
    }

    pub fn clear(&mut self) {
        self.stroke = None;
    }

    pub fn is_empty(&self) -> bool {
        self.stroke.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommittedLayer {
    strokes: Vec<Stroke>,
    revision: u64,
}

impl CommittedLayer {
    pub fn commit(&mut self, stroke: Stroke) {
        self.strokes.push(stroke);
        self.revision += 1;
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.strokes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pen_only_filter_rejects_mouse_and_touch() {
        let filter = PointerFilter::PenOnly;
        assert!(filter.accepts(PointerKind::Pen));
        assert!(!filter.accepts(PointerKind::Mouse));
        assert!(!filter.accepts(PointerKind::Touch));
        assert!(PointerFilter::Any.accepts(PointerKind::Unknown));
    }

    #[test]
    fn pointer_kind_maps_platform_codes() {
        assert_eq!(PointerKind::from_input_type(3), PointerKind::Pen);
        assert_eq!(PointerKind::from_input_type(4), PointerKind::Mouse);
        assert_eq!(PointerKind::from_input_type(99), PointerKind::Unknown);
        assert_eq!(PointerKind::Touch.input_type(), 2);
    }

    #[test]
    fn colorref_packs_bgr() {
        assert_eq!(Color::rgb(1, 2, 3).to_colorref(), 0x0003_0201);
        assert_eq!(DEFAULT_TRANSPARENCY_COLORKEY.to_colorref(), 0x0000_0001);
    }

    #[test]
    fn ink_matching_colorkey_is_nudged() {
        let key = DEFAULT_TRANSPARENCY_COLORKEY;
        let ink = Color::rgb(1, 0, 0).avoid_colorkey(key);
        assert!(!ink.same_rgb(key));
        assert_eq!(Color::rgb(0, 0, 0).avoid_colorkey(key), Color::rgb(0, 0, 0));

        let odd_key = COLORKEY_SAFE_FALLBACK;
        assert!(!Color::rgb(2, 0, 0).avoid_colorkey(odd_key).same_rgb(odd_key));
    }

    #[test]
    fn committed_layer_bumps_revision_per_stroke() {
        let mut layer = CommittedLayer::default();
        layer.commit(Stroke::begin(1, StrokeStyle::default(), Point::new(0, 0)));
        layer.commit(Stroke::begin(2, StrokeStyle::default(), Point::new(5, 5)));
        assert_eq!(layer.len(), 2);
        assert_eq!(layer.revision(), 2);
    }
}
