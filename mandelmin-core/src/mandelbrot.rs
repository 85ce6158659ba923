use crate::{pack_rgb, PixelGrid, RenderParameters};

/// Escape radius squared (|z| > 2).
const ESCAPE_RADIUS_SQ: f32 = 4.0;

/// Host-side escape-time evaluator matching the bundled compute kernel.
///
/// Uses the kernel's argument types (f32 view, f32 iteration budget, i32
/// extent) and the same arithmetic, so device output can be checked pixel
/// by pixel. Not a render path; it exists to verify one.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MandelbrotReference {
    center_x: f32,
    center_y: f32,
    magnification: f32,
    iterations: f32,
    width: i32,
    height: i32,
}

impl MandelbrotReference {
    pub fn new(
        center_x: f32,
        center_y: f32,
        magnification: f32,
        iterations: f32,
        width: i32,
        height: i32,
    ) -> Self {
        Self {
            center_x,
            center_y,
            magnification,
            iterations,
            width,
            height,
        }
    }

    pub fn from_params(params: &RenderParameters) -> Self {
        Self::new(
            params.center.0 as f32,
            params.center.1 as f32,
            params.magnification as f32,
            params.iterations as f32,
            params.width as i32,
            params.height as i32,
        )
    }

    /// Complex-plane coordinate of pixel `(x, y)`; row 0 is the top edge.
    pub fn pixel_to_complex(&self, x: i32, y: i32) -> (f32, f32) {
        let scale = self.magnification / self.width as f32;
        let cx = self.center_x + (x as f32 - self.width as f32 * 0.5) * scale;
        let cy = self.center_y - (y as f32 - self.height as f32 * 0.5) * scale;
        (cx, cy)
    }

    /// Iterations before escape, or the full budget for interior points.
    pub fn escape_time(&self, cx: f32, cy: f32) -> u32 {
        let max_iterations = self.iterations as u32;
        let mut zx = 0.0_f32;
        let mut zy = 0.0_f32;
        let mut i = 0;

        while i < max_iterations {
            let zx_sq = zx * zx;
            let zy_sq = zy * zy;
            if zx_sq + zy_sq > ESCAPE_RADIUS_SQ {
                break;
            }
            // z = z^2 + c
            zy = 2.0 * zx * zy + cy;
            zx = zx_sq - zy_sq + cx;
            i += 1;
        }
        i
    }

    /// Packed color for an escape count. Interior points are black.
    pub fn color(&self, iterations: u32) -> u32 {
        let max_iterations = self.iterations as u32;
        if iterations >= max_iterations {
            return 0;
        }
        let t = iterations as f32 / self.iterations;
        let u = 1.0 - t;
        let r = channel(9.0 * u * t * t * t);
        let g = channel(15.0 * u * u * t * t);
        let b = channel(8.5 * u * u * u * t);
        pack_rgb(r, g, b)
    }

    /// Packed color of pixel `(x, y)`, or `None` outside the grid.
    ///
    /// Work-items beyond the extent write nothing, which is the kernel's
    /// bounds contract for padded dispatches.
    pub fn pixel(&self, x: i32, y: i32) -> Option<u32> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return None;
        }
        let (cx, cy) = self.pixel_to_complex(x, y);
        Some(self.color(self.escape_time(cx, cy)))
    }

    /// Evaluate every pixel into a grid.
    pub fn render(&self) -> PixelGrid {
        let width = self.width.max(0) as usize;
        let height = self.height.max(0) as usize;
        let mut grid = PixelGrid::new(width, height);
        for y in 0..self.height.max(0) {
            for x in 0..self.width.max(0) {
                if let Some(p) = self.pixel(x, y) {
                    grid.set(y as usize, x as usize, p);
                }
            }
        }
        grid
    }
}

fn channel(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unpack_rgb;

    fn default_reference() -> MandelbrotReference {
        MandelbrotReference::from_params(&RenderParameters::default())
    }

    #[test]
    fn test_origin_is_interior() {
        let r = default_reference();
        assert_eq!(r.escape_time(0.0, 0.0), 50);
        assert_eq!(r.color(50), 0);
    }

    #[test]
    fn test_far_point_escapes_immediately() {
        let r = default_reference();
        // |c| > 2: escapes after the first step
        assert_eq!(r.escape_time(3.0, 0.0), 1);
    }

    #[test]
    fn test_center_pixel_maps_to_center() {
        let r = default_reference();
        let (cx, cy) = r.pixel_to_complex(600, 320);
        assert!((cx - -0.5).abs() < 1e-6);
        assert!(cy.abs() < 1e-6);
    }

    #[test]
    fn test_view_width_is_magnification() {
        let r = default_reference();
        let (left, _) = r.pixel_to_complex(0, 0);
        let (right, _) = r.pixel_to_complex(1200, 0);
        assert!((right - left - 4.5).abs() < 1e-4);
    }

    #[test]
    fn test_outside_pixels_write_nothing() {
        let r = default_reference();
        assert!(r.pixel(1200, 0).is_none());
        assert!(r.pixel(0, 640).is_none());
        assert!(r.pixel(-1, 0).is_none());
        assert!(r.pixel(1199, 639).is_some());
    }

    #[test]
    fn test_escaped_colors_use_only_low_bytes() {
        let r = default_reference();
        for i in 0..50 {
            assert_eq!(r.color(i) >> 24, 0);
        }
        // Mid-range escape counts are not black
        assert_ne!(unpack_rgb(r.color(25)), [0, 0, 0]);
    }

    #[test]
    fn test_render_fills_grid() {
        let params = RenderParameters {
            width: 48,
            height: 32,
            ..Default::default()
        };
        let grid = MandelbrotReference::from_params(&params).render();
        assert_eq!(grid.len(), 48 * 32);
        // Center of the default view is inside the set, corners are not
        assert_eq!(grid[(16, 24)], 0);
        assert_ne!(grid[(0, 0)], 0);
    }
}
