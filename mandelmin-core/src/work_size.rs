/// Round `n` up to the nearest multiple of the tile size `t`.
///
/// The result `r` satisfies `r >= n`, `r % t == 0` and `r < n + t`.
///
/// # Panics
/// Panics if `t` is zero.
pub fn align(n: usize, t: usize) -> usize {
    assert!(t > 0, "tile size must be non-zero");
    n.div_ceil(t) * t
}

/// 2-D dispatch geometry: global extent padded to whole work-groups.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkGeometry {
    /// Requested extent (width, height).
    pub extent: [usize; 2],
    /// Global work size, each dimension aligned to `local`.
    pub global: [usize; 2],
    /// Work-group tile size.
    pub local: [usize; 2],
}

impl WorkGeometry {
    /// Pad `extent` up to a multiple of `local` in each dimension.
    pub fn aligned(extent: [usize; 2], local: [usize; 2]) -> Self {
        Self {
            extent,
            global: [align(extent[0], local[0]), align(extent[1], local[1])],
            local,
        }
    }

    /// Number of work-groups per dimension.
    pub fn work_groups(&self) -> [usize; 2] {
        [self.global[0] / self.local[0], self.global[1] / self.local[1]]
    }

    /// Work-items launched beyond the requested extent, per dimension.
    pub fn padding(&self) -> [usize; 2] {
        [
            self.global[0] - self.extent[0],
            self.global[1] - self.extent[1],
        ]
    }

    /// Total work-items launched.
    pub fn global_items(&self) -> usize {
        self.global[0] * self.global[1]
    }
}
