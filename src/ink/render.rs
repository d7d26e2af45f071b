use crate::ink::geometry::DirtyRect;
use crate::ink::model::{Color, Point, Stroke};
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

const WIDE_STROKE_THRESHOLD: u32 = 10;

/// Surface the platform hands to a surface for painting: a 32-bit BGRA DIB.
pub trait PaintTarget {
    fn size(&self) -> (u32, u32);
    fn bgra_mut(&mut self) -> &mut [u8];
}

/// RGBA pixels of one overlay, cleared to the overlay's clear colour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerBuffer {
    rgba: Vec<u8>,
    size: (u32, u32),
    clear: Color,
}

impl LayerBuffer {
    pub fn new(size: (u32, u32), clear: Color) -> Self {
        let mut buffer = Self {
            rgba: Vec::new(),
            size: (0, 0),
            clear,
        };
        buffer.resize(size);
        buffer
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn clear_color(&self) -> Color {
        self.clear
    }

    pub fn pixels(&self) -> &[u8] {
        &self.rgba
    }

    /// Reallocates and clears when the size changed. Returns whether it did.
    pub fn resize(&mut self, size: (u32, u32)) -> bool {
        let target_len = (size.0 as usize)
            .saturating_mul(size.1 as usize)
            .saturating_mul(4);
        if self.size == size && self.rgba.len() == target_len {
            return false;
        }
        self.rgba = vec![0; target_len];
        self.size = size;
        self.clear_all();
        true
    }

    pub fn clear_all(&mut self) {
        let clear = self.clear;
        for px in self.rgba.chunks_exact_mut(4) {
            px.copy_from_slice(&[clear.r, clear.g, clear.b, clear.a]);
        }
    }

    pub fn clear_rect(&mut self, rect: DirtyRect) {
        let (width, height) = self.size;
        let Some(rect) = rect.clamp(width, height) else {
            return;
        };
        let clear = self.clear;
        for y in rect.y..(rect.y + rect.height) {
            for x in rect.x..(rect.x + rect.width) {
                let idx = ((y as u32 * width + x as u32) * 4) as usize;
                self.rgba[idx..idx + 4].copy_from_slice(&[clear.r, clear.g, clear.b, clear.a]);
            }
        }
    }

    pub fn pixel(&self, point: Point) -> Option<Color> {
        let (width, height) = self.size;
        if point.x < 0 || point.y < 0 || point.x >= width as i32 || point.y >= height as i32 {
            return None;
        }
        let idx = ((point.y as u32 * width + point.x as u32) * 4) as usize;
        Some(Color::rgba(
            self.rgba[idx],
            self.rgba[idx + 1],
            self.rgba[idx + 2],
            self.rgba[idx + 3],
        ))
    }

    /// Draws a stroke whose points live in a space offset by `origin` from
    /// this buffer.
    pub fn draw_stroke(&mut self, stroke: &Stroke, origin: Point, clip: Option<DirtyRect>) {
        let local: Vec<Point> = stroke
            .points()
            .iter()
            .map(|p| p.offset(-origin.x, -origin.y))
            .collect();
        self.draw_polyline(&local, stroke.style.color, stroke.style.width, clip);
    }

    pub fn draw_polyline(
        &mut self,
        points: &[Point],
        color: Color,
        stroke_width: u32,
        clip: Option<DirtyRect>,
    ) {
        let Some(&first) = points.first() else {
            return;
        };
        if points.len() == 1 {
            self.draw_brush(first, color, stroke_width, clip);
            return;
        }
        for segment in points.windows(2) {
            self.draw_segment(segment[0], segment[1], color, stroke_width, clip);
        }
    }

    pub fn draw_segment(
        &mut self,
        start: Point,
        end: Point,
        color: Color,
        stroke_width: u32,
        clip: Option<DirtyRect>,
    ) {
        let stroke_width = stroke_width.max(1);
        if stroke_width >= WIDE_STROKE_THRESHOLD && start.distance_sq(end) > 2 {
            self.draw_segment_capsule(start, end, color, stroke_width, clip);
        } else {
            self.draw_segment_stamped(start, end, color, stroke_width, clip);
        }
    }

    pub fn fill_dot(&mut self, center: Point, radius: i32, color: Color, clip: Option<DirtyRect>) {
        for y in (center.y - radius)..=(center.y + radius) {
            for x in (center.x - radius)..=(center.x + radius) {
                let dx = x - center.x;
                let dy = y - center.y;
                if dx * dx + dy * dy <= radius * radius {
                    self.set_pixel(x, y, color, clip);
                }
            }
        }
    }

    fn draw_segment_stamped(
        &mut self,
        start: Point,
        end: Point,
        color: Color,
        stroke_width: u32,
        clip: Option<DirtyRect>,
    ) {
        let (mut x0, mut y0) = (start.x, start.y);
        let (x1, y1) = (end.x, end.y);

        let dx = (x1 - x0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let dy = -(y1 - y0).abs();
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;

        loop {
            self.draw_brush(Point::new(x0, y0), color, stroke_width, clip);
            if x0 == x1 && y0 == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x0 += sx;
            }
            if e2 <= dx {
                err += dx;
                y0 += sy;
            }
        }
    }

    fn draw_segment_capsule(
        &mut self,
        start: Point,
        end: Point,
        color: Color,
        stroke_width: u32,
        clip: Option<DirtyRect>,
    ) {
        let radius = (stroke_width.saturating_sub(1) / 2) as f32;
        let pad = radius.ceil() as i32 + 1;
        let bounds = DirtyRect::from_points(start, end, pad);
        let area = clip
            .and_then(|clip| bounds.intersect(clip))
            .unwrap_or(bounds)
            .clamp(self.size.0, self.size.1);
        let Some(area) = area else {
            return;
        };

        let radius_sq = radius * radius;
        for y in area.y..(area.y + area.height) {
            for x in area.x..(area.x + area.width) {
                if point_segment_distance_sq(Point::new(x, y), start, end) <= radius_sq {
                    self.set_pixel(x, y, color, clip);
                }
            }
        }
    }

    fn draw_brush(&mut self, center: Point, color: Color, stroke_width: u32, clip: Option<DirtyRect>) {
        let (width, height) = self.size;
        let full = DirtyRect {
            x: 0,
            y: 0,
            width: width as i32,
            height: height as i32,
        };
        let Some(area) = clip.unwrap_or(full).clamp(width, height) else {
            return;
        };

        let mask = brush_mask(stroke_width);
        for row in &mask.rows {
            let y = center.y + row.dy;
            if y < area.y || y >= area.y + area.height {
                continue;
            }
            let x0 = (center.x + row.min_dx).max(area.x);
            let x1 = (center.x + row.max_dx).min(area.x + area.width - 1);
            if x0 > x1 {
                continue;
            }
            let row_base = (y as u32 * width * 4) as usize;
            for x in x0..=x1 {
                let idx = row_base + x as usize * 4;
                self.rgba[idx..idx + 4].copy_from_slice(&[color.r, color.g, color.b, color.a]);
            }
        }
    }

    fn set_pixel(&mut self, x: i32, y: i32, color: Color, clip: Option<DirtyRect>) {
        let (width, height) = self.size;
        if x < 0 || y < 0 || x >= width as i32 || y >= height as i32 {
            return;
        }
        if let Some(clip) = clip {
            if x < clip.x || y < clip.y || x >= clip.x + clip.width || y >= clip.y + clip.height {
                return;
            }
        }
        let idx = ((y as u32 * width + x as u32) * 4) as usize;
        self.rgba[idx..idx + 4].copy_from_slice(&[color.r, color.g, color.b, color.a]);
    }

    /// Copies into a BGRA buffer of the same size, optionally only `rect`.
    pub fn copy_to_bgra(&self, bgra: &mut [u8], rect: Option<DirtyRect>) {
        if bgra.len() != self.rgba.len() {
            tracing::debug!(
                expected = self.rgba.len(),
                actual = bgra.len(),
                "paint target size mismatch, skipping copy"
            );
            return;
        }
        let (width, height) = self.size;
        match rect.and_then(|r| r.clamp(width, height)) {
            Some(rect) => {
                for y in rect.y..(rect.y + rect.height) {
                    for x in rect.x..(rect.x + rect.width) {
                        let idx = ((y as u32 * width + x as u32) * 4) as usize;
                        convert_pixel(&self.rgba[idx..idx + 4], &mut bgra[idx..idx + 4]);
                    }
                }
            }
            None => {
                for (src, dst) in self.rgba.chunks_exact(4).zip(bgra.chunks_exact_mut(4)) {
                    convert_pixel(src, dst);
                }
            }
        }
    }

    pub fn present(&self, target: &mut dyn PaintTarget, rect: Option<DirtyRect>) {
        if target.size() != self.size {
            return;
        }
        self.copy_to_bgra(target.bgra_mut(), rect);
    }
}

fn convert_pixel(src: &[u8], dst: &mut [u8]) {
    dst[0] = src[2];
    dst[1] = src[1];
    dst[2] = src[0];
    dst[3] = src[3];
}

fn point_segment_distance_sq(point: Point, start: Point, end: Point) -> f32 {
    let (px, py) = (point.x as f32, point.y as f32);
    let (x0, y0) = (start.x as f32, start.y as f32);
    let (vx, vy) = ((end.x - start.x) as f32, (end.y - start.y) as f32);
    let len_sq = vx * vx + vy * vy;
    let t = if len_sq <= f32::EPSILON {
        0.0
    } else {
        (((px - x0) * vx + (py - y0) * vy) / len_sq).clamp(0.0, 1.0)
    };
    let dx = px - (x0 + vx * t);
    let dy = py - (y0 + vy * t);
    dx * dx + dy * dy
}

#[derive(Clone)]
struct BrushMask {
    rows: Vec<BrushMaskRow>,
}

#[derive(Clone, Copy)]
struct BrushMaskRow {
    dy: i32,
    min_dx: i32,
    max_dx: i32,
}

fn brush_mask(stroke_width: u32) -> BrushMask {
    static CACHE: OnceLock<Mutex<HashMap<u32, BrushMask>>> = OnceLock::new();
    let cache = CACHE.get_or_init(|| Mutex::new(HashMap::new()));
    if let Ok(guard) = cache.lock() {
        if let Some(mask) = guard.get(&stroke_width) {
            return mask.clone();
        }
    }

    let radius = (stroke_width.saturating_sub(1) / 2) as i32;
    let mut rows = Vec::with_capacity((radius * 2 + 1) as usize);
    for dy in -radius..=radius {
        let mut max_dx = radius;
        while max_dx >= 0 && max_dx * max_dx + dy * dy > radius * radius {
            max_dx -= 1;
        }
        if max_dx >= 0 {
            rows.push(BrushMaskRow {
                dy,
                min_dx: -max_dx,
                max_dx,
            });
        }
    }
    let mask = BrushMask { rows };
    if let Ok(mut guard) = cache.lock() {
        guard.insert(stroke_width, mask.clone());
    }
    mask
}

/// Keeps a rendered copy of a set of strokes and rebuilds it only when the
/// source revision or the size changes.
#[derive(Debug, Clone)]
pub struct CachedLayer {
    buffer: LayerBuffer,
    revision: Option<u64>,
    #[cfg(test)]
    rebuild_count: usize,
}

impl CachedLayer {
    pub fn new(clear: Color) -> Self {
        Self {
            buffer: LayerBuffer::new((0, 0), clear),
            revision: None,
            #[cfg(test)]
            rebuild_count: 0,
        }
    }

    pub fn buffer(&self) -> &LayerBuffer {
        &self.buffer
    }

    /// Returns `true` when the buffer was rebuilt.
    pub fn refresh(&mut self, strokes: &[Stroke], revision: u64, size: (u32, u32), origin: Point) -> bool {
        let resized = self.buffer.resize(size);
        if !resized && self.revision == Some(revision) {
            return false;
        }
        self.buffer.clear_all();
        for stroke in strokes {
            self.buffer.draw_stroke(stroke, origin, None);
        }
        self.revision = Some(revision);
        #[cfg(test)]
        {
            self.rebuild_count += 1;
        }
        true
    }

    pub fn invalidate(&mut self) {
        self.revision = None;
    }

    #[cfg(test)]
    pub fn rebuild_count(&self) -> usize {
        self.rebuild_count
    }
}
