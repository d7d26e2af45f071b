use crate::ink::model::Point;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClientRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl ClientRect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle anchored at the client origin.
    pub const fn from_size(width: i32, height: i32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Builds from `left/top/right/bottom` edges as reported by the platform.
    pub fn from_edges(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self::new(left, top, (right - left).max(0), (bottom - top).max(0))
    }

    pub fn origin(self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn size(self) -> (u32, u32) {
        (self.width.max(0) as u32, self.height.max(0) as u32)
    }

    pub fn right(self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(self) -> i32 {
        self.y + self.height
    }

    pub fn is_empty(self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn contains(self, point: Point) -> bool {
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.bottom()
    }

    /// Converts a point in the parent space into this rectangle's local space.
    pub fn to_local(self, point: Point) -> Point {
        point.offset(-self.x, -self.y)
    }

    pub fn to_parent(self, point: Point) -> Point {
        point.offset(self.x, self.y)
    }
}

pub fn screen_to_client(screen: Point, client_origin_on_screen: Point) -> Point {
    screen.offset(-client_origin_on_screen.x, -client_origin_on_screen.y)
}

pub fn client_to_screen(client: Point, client_origin_on_screen: Point) -> Point {
    client.offset(client_origin_on_screen.x, client_origin_on_screen.y)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayPlacement {
    #[default]
    FullClient,
    CenteredHalf,
}

/// Bounds of an overlay in host client coordinates.
pub fn overlay_bounds(placement: OverlayPlacement, host_client: ClientRect) -> ClientRect {
    let host = ClientRect::from_size(host_client.width, host_client.height);
    match placement {
        OverlayPlacement::FullClient => host,
        OverlayPlacement::CenteredHalf => ClientRect::new(
            host.width / 4,
            host.height / 4,
            host.width / 2,
            host.height / 2,
        ),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl DirtyRect {
    pub fn from_points(a: Point, b: Point, pad: i32) -> Self {
        let min_x = a.x.min(b.x) - pad;
        let max_x = a.x.max(b.x) + pad;
        let min_y = a.y.min(b.y) - pad;
        let max_y = a.y.max(b.y) + pad;
        Self {
            x: min_x,
            y: min_y,
            width: (max_x - min_x + 1).max(1),
            height: (max_y - min_y + 1).max(1),
        }
    }

    /// Padded bounds of one stroke segment.
    pub fn for_segment(start: Point, end: Point, stroke_width: u32) -> Self {
        let radius = stroke_width.max(1) as i32;
        Self::from_points(start, end, radius + 2)
    }

    pub fn union(self, other: DirtyRect) -> DirtyRect {
        let min_x = self.x.min(other.x);
        let min_y = self.y.min(other.y);
        let max_x = (self.x + self.width).max(other.x + other.width);
        let max_y = (self.y + self.height).max(other.y + other.height);
        DirtyRect {
            x: min_x,
            y: min_y,
            width: (max_x - min_x).max(1),
            height: (max_y - min_y).max(1),
        }
    }

    pub fn offset(self, dx: i32, dy: i32) -> DirtyRect {
        DirtyRect {
            x: self.x + dx,
            y: self.y + dy,
            ..self
        }
    }

    pub fn clamp(self, width: u32, height: u32) -> Option<DirtyRect> {
        let max_w = width as i32;
        let max_h = height as i32;
        let x0 = self.x.clamp(0, max_w);
        let y0 = self.y.clamp(0, max_h);
        let x1 = (self.x + self.width).clamp(0, max_w);
        let y1 = (self.y + self.height).clamp(0, max_h);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(DirtyRect {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        })
    }

    pub fn intersect(self, other: DirtyRect) -> Option<DirtyRect> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = (self.x + self.width).min(other.x + other.width);
        let y1 = (self.y + self.height).min(other.y + other.height);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(DirtyRect {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        })
    }
}

pub const BASELINE_DPI: u32 = 96;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DpiScale(f32);

impl DpiScale {
    pub fn from_dpi(dpi: u32) -> Self {
        if dpi == 0 {
            return Self(1.0);
        }
        Self(dpi as f32 / BASELINE_DPI as f32)
    }

    pub fn factor(self) -> f32 {
        self.0
    }

    pub fn to_physical(self, logical: i32) -> i32 {
        (logical as f32 * self.0).round() as i32
    }

    pub fn to_logical(self, physical: i32) -> i32 {
        (physical as f32 / self.0).round() as i32
    }
}

impl Default for DpiScale {
    fn default() -> Self {
        Self(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_client_overlay_matches_host_size_at_origin() {
        let host = ClientRect::from_edges(0, 0, 640, 480);
        assert_eq!(
            overlay_bounds(OverlayPlacement::FullClient, host),
            ClientRect::new(0, 0, 640, 480)
        );
    }

    #[test]
    fn centered_half_overlay_sits_in_the_middle() {
        let host = ClientRect::from_size(800, 600);
        assert_eq!(
            overlay_bounds(OverlayPlacement::CenteredHalf, host),
            ClientRect::new(200, 150, 400, 300)
        );
    }

    #[test]
    fn screen_and_client_conversions_are_inverse() {
        let origin = Point::new(1920, 200);
        let client = screen_to_client(Point::new(2050, 310), origin);
        assert_eq!(client, Point::new(130, 110));
        assert_eq!(client_to_screen(client, origin), Point::new(2050, 310));
    }

    #[test]
    fn rect_local_and_parent_round_trip_through_offset() {
        let rect = ClientRect::new(200, 150, 400, 300);
        assert_eq!(rect.to_local(Point::new(250, 160)), Point::new(50, 10));
        assert!(rect.contains(Point::new(200, 150)));
        assert!(!rect.contains(Point::new(600, 150)));
    }

    #[test]
    fn dirty_rect_clamps_to_surface() {
        let rect = DirtyRect::for_segment(Point::new(-5, -5), Point::new(4, 4), 3);
        let clamped = rect.clamp(10, 10).expect("overlaps surface");
        assert_eq!((clamped.x, clamped.y), (0, 0));
        assert!(DirtyRect::from_points(Point::new(50, 50), Point::new(60, 60), 0)
            .clamp(10, 10)
            .is_none());
    }

    #[test]
    fn dpi_scale_converts_between_spaces() {
        let scale = DpiScale::from_dpi(144);
        assert_eq!(scale.factor(), 1.5);
        assert_eq!(scale.to_physical(1024), 1536);
        assert_eq!(scale.to_logical(1536), 1024);
        assert_eq!(DpiScale::from_dpi(0).factor(), 1.0);
    }
}
