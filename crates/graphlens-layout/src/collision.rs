//! Spatial hash grid for minimum-separation collisions.
//!
//! Bodies are bucketed into square cells whose side equals the separation
//! distance, so every colliding pair lives in the same or an adjacent cell.

use std::collections::HashMap;

use graphlens_core::Point;
use rand::Rng;

use crate::quadtree::jitter;

/// Packed 2D cell coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellKey(u64);

impl CellKey {
    pub fn new(cx: i32, cy: i32) -> Self {
        Self(((cx as u32 as u64) << 32) | cy as u32 as u64)
    }

    /// Cell containing `point` for cells of side `cell_size`.
    ///
    /// Float-to-int casts saturate, so extreme coordinates clamp to the edge
    /// cells instead of wrapping around.
    pub fn for_point(point: Point, cell_size: f32) -> Self {
        Self::new(cell_coord(point.x, cell_size), cell_coord(point.y, cell_size))
    }

    pub fn coords(self) -> (i32, i32) {
        ((self.0 >> 32) as u32 as i32, self.0 as u32 as i32)
    }
}

fn cell_coord(value: f32, cell_size: f32) -> i32 {
    let cell = (value / cell_size).floor();
    if cell.is_nan() {
        0
    } else {
        cell as i32
    }
}

/// Distinct neighbor coordinates along one axis. Saturation at the i32 limits
/// can make `c - 1`, `c` and `c + 1` collapse; duplicates are dropped.
fn axis_neighbors(c: i32) -> impl Iterator<Item = i32> {
    let lo = c.saturating_sub(1);
    let hi = c.saturating_add(1);
    [lo, c, hi]
        .into_iter()
        .enumerate()
        .filter(move |&(i, v)| match i {
            0 => true,
            1 => v != lo,
            _ => v != c,
        })
        .map(|(_, v)| v)
}

/// Bucketed collision resolver. Bucket storage is kept between ticks.
#[derive(Debug, Default)]
pub struct CollisionGrid {
    cells: HashMap<CellKey, Vec<usize>>,
}

impl CollisionGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of non-empty cells from the last resolve.
    pub fn occupied_cells(&self) -> usize {
        self.cells.values().filter(|bucket| !bucket.is_empty()).count()
    }

    /// Push apart every unordered pair closer than `min_distance`.
    ///
    /// Each pair receives `(min_distance - distance) * strength`, split equally
    /// and oppositely between the two bodies. Pairs at or beyond the distance
    /// are untouched.
    pub fn resolve<R: Rng + ?Sized>(
        &mut self,
        positions: &[Point],
        forces: &mut [Point],
        min_distance: f32,
        strength: f32,
        rng: &mut R,
    ) {
        if min_distance.is_nan() || min_distance <= 0.0 {
            return;
        }
        if strength == 0.0 || positions.len() < 2 {
            return;
        }

        for bucket in self.cells.values_mut() {
            bucket.clear();
        }
        for (i, &p) in positions.iter().enumerate() {
            if p.is_finite() {
                self.cells
                    .entry(CellKey::for_point(p, min_distance))
                    .or_default()
                    .push(i);
            }
        }

        let min_distance_sq = min_distance * min_distance;
        for (i, &p) in positions.iter().enumerate() {
            if !p.is_finite() {
                continue;
            }
            let (cx, cy) = CellKey::for_point(p, min_distance).coords();
            for nx in axis_neighbors(cx) {
                for ny in axis_neighbors(cy) {
                    let Some(bucket) = self.cells.get(&CellKey::new(nx, ny)) else {
                        continue;
                    };
                    for &j in bucket {
                        if j <= i {
                            continue;
                        }
                        let mut delta = p - positions[j];
                        let dist_sq = delta.length_squared();
                        if dist_sq >= min_distance_sq {
                            continue;
                        }
                        let mut distance = dist_sq.sqrt();
                        if distance < 1e-3 {
                            delta = jitter(rng);
                            distance = delta.length().max(1e-3);
                        }
                        let push = (min_distance - distance) * strength * 0.5;
                        let impulse = delta * (push / distance);
                        forces[i] += impulse;
                        forces[j] -= impulse;
                    }
                }
            }
        }

        self.cells.retain(|_, bucket| !bucket.is_empty());
    }
}
