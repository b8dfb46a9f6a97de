//! Uniform-grid spatial hashing for neighbor queries.
//!
//! Points are bucketed by `floor(x / cell_size), floor(y / cell_size)`. A
//! radius query scans every bucket overlapping the query disc and filters by
//! exact squared distance. There is no removal: the organism rebuilds the
//! index from scratch every tick (`clear` + reinsert), since every particle
//! moves every tick anyway.
//!
//! ```ignore
//! let mut index = SpatialIndex::new(SpatialConfig::default());
//! index.insert(Vec2::new(10.0, 10.0), 7u32);
//! assert_eq!(index.query(Vec2::ZERO, 20.0), vec![7]);
//! ```

use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default cell size in world units.
///
/// Separation queries use a radius below this, so a query touches at most a
/// 2x2 or 3x3 block of buckets.
pub const DEFAULT_CELL_SIZE: f32 = 40.0;

/// Upper bound on retained empty buckets before `clear` drops them all.
const MAX_RETAINED_BUCKETS: usize = 4096;

/// Configuration for the spatial grid.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpatialConfig {
    /// Size of each cell in world units.
    pub cell_size: f32,
}

impl Default for SpatialConfig {
    fn default() -> Self {
        Self {
            cell_size: DEFAULT_CELL_SIZE,
        }
    }
}

/// Bucketed 2D point index carrying a small `Copy` payload per point.
#[derive(Debug, Clone)]
pub struct SpatialIndex<T> {
    cell_size: f32,
    inv_cell_size: f32,
    buckets: HashMap<(i32, i32), Vec<(Vec2, T)>>,
    len: usize,
}

impl<T: Copy> SpatialIndex<T> {
    /// Create an empty index. Non-positive cell sizes fall back to the default.
    pub fn new(config: SpatialConfig) -> Self {
        let cell_size = if config.cell_size.is_finite() && config.cell_size > 0.0 {
            config.cell_size
        } else {
            DEFAULT_CELL_SIZE
        };
        Self {
            cell_size,
            inv_cell_size: 1.0 / cell_size,
            buckets: HashMap::new(),
            len: 0,
        }
    }

    /// Cell size in world units.
    #[inline]
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Number of inserted points.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no points are inserted.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of non-empty buckets.
    pub fn bucket_count(&self) -> usize {
        self.buckets.values().filter(|b| !b.is_empty()).count()
    }

    /// Bucket coordinates containing `pos`.
    #[inline]
    pub fn cell_of(&self, pos: Vec2) -> (i32, i32) {
        (
            (pos.x * self.inv_cell_size).floor() as i32,
            (pos.y * self.inv_cell_size).floor() as i32,
        )
    }

    /// Remove every point, keeping bucket allocations for the next rebuild.
    pub fn clear(&mut self) {
        if self.buckets.len() > MAX_RETAINED_BUCKETS {
            self.buckets.clear();
        } else {
            for bucket in self.buckets.values_mut() {
                bucket.clear();
            }
        }
        self.len = 0;
    }

    /// Insert a point with its payload.
    pub fn insert(&mut self, pos: Vec2, item: T) {
        let cell = self.cell_of(pos);
        self.buckets.entry(cell).or_default().push((pos, item));
        self.len += 1;
    }

    /// All payloads whose point lies within `radius` of `center` (inclusive).
    pub fn query(&self, center: Vec2, radius: f32) -> Vec<T> {
        let mut out = Vec::new();
        self.query_into(center, radius, &mut out);
        out
    }

    /// Like [`query`](Self::query), but appends into a reusable buffer.
    ///
    /// The buffer is cleared first.
    pub fn query_into(&self, center: Vec2, radius: f32, out: &mut Vec<T>) {
        out.clear();
        if self.len == 0 || !(radius >= 0.0) || !center.is_finite() {
            return;
        }
        let r2 = radius * radius;
        let (min_x, min_y) = self.cell_of(center - Vec2::splat(radius));
        let (max_x, max_y) = self.cell_of(center + Vec2::splat(radius));

        for cx in min_x..=max_x {
            for cy in min_y..=max_y {
                let Some(bucket) = self.buckets.get(&(cx, cy)) else {
                    continue;
                };
                for &(pos, item) in bucket {
                    if pos.distance_squared(center) <= r2 {
                        out.push(item);
                    }
                }
            }
        }
    }
}

impl<T: Copy> Default for SpatialIndex<T> {
    fn default() -> Self {
        Self::new(SpatialConfig::default())
    }
}
