//! A fleet of UAVs cooperatively exploring a bounded 2D signal field,
//! driven by a Bayesian surrogate model and exposed to an external
//! multi-agent controller through a reset/step contract.

use nalgebra as na;

/// A location on the map.
pub type Point = na::Point2<f64>;
/// A displacement on the map.
pub type Vector = na::Vector2<f64>;

/// Clips a point into the map rectangle `[0, W] x [0, H]`, one axis at a
/// time. Out-of-range positions are never an error anywhere in the crate;
/// they are always clipped.
pub fn clip_to_map(p: Point, size: (f64, f64)) -> Point {
    Point::new(na::clamp(p.x, 0.0, size.0), na::clamp(p.y, 0.0, size.1))
}

pub mod acquisition;
pub mod env;
pub mod error;
pub mod field;
pub mod fleet;
pub mod optimizer;
pub mod render;
