//! Episode-end artifacts: the estimated-field heatmap and the trajectory
//! plot. Derived data only; nothing here feeds back into the simulation.

use std::path::Path;

use image::{ImageError, Rgb, RgbImage};

use crate::field::{SignalSource, Surrogate};
use crate::fleet::Drone;
use crate::Point;

/// Pixels per map unit in both artifacts.
const SCALE: u32 = 4;

/// Trajectory colors, cycled per drone.
const PALETTE: [[u8; 3]; 8] = [
    [230, 60, 60],
    [60, 120, 230],
    [50, 170, 80],
    [240, 160, 30],
    [150, 80, 200],
    [40, 180, 190],
    [210, 90, 160],
    [110, 110, 110],
];

fn dims(size: (f64, f64)) -> (u32, u32) {
    (
        (size.0.ceil() as u32).max(1) * SCALE,
        (size.1.ceil() as u32).max(1) * SCALE,
    )
}

/// Map coordinates to pixel coordinates; map y grows upward, image y down.
fn to_pixel(p: &Point, height: u32) -> (i64, i64) {
    let x = (p.x * SCALE as f64) as i64;
    let y = height as i64 - 1 - (p.y * SCALE as f64) as i64;
    (x, y)
}

fn put(img: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
        img.put_pixel(x as u32, y as u32, color);
    }
}

fn draw_line(img: &mut RgbImage, a: (i64, i64), b: (i64, i64), color: Rgb<u8>) {
    let steps = (b.0 - a.0).abs().max((b.1 - a.1).abs()).max(1);
    for s in 0..=steps {
        let t = s as f64 / steps as f64;
        let x = a.0 as f64 + t * (b.0 - a.0) as f64;
        let y = a.1 as f64 + t * (b.1 - a.1) as f64;
        put(img, x.round() as i64, y.round() as i64, color);
    }
}

fn draw_disc(img: &mut RgbImage, center: (i64, i64), radius: i64, color: Rgb<u8>) {
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                put(img, center.0 + dx, center.1 + dy, color);
            }
        }
    }
}

/// Blue through green to red.
fn ramp(t: f64) -> Rgb<u8> {
    let t = t.max(0.0).min(1.0);
    let (r, g, b) = if t < 0.5 {
        let u = t * 2.0;
        (0.0, u, 1.0 - u)
    } else {
        let u = (t - 0.5) * 2.0;
        (u, 1.0 - u, 0.0)
    };
    Rgb([(r * 255.0) as u8, (g * 255.0) as u8, (b * 255.0) as u8])
}

/// Renders the surrogate's mean estimate over the map as a PNG heatmap.
///
/// The mean is sampled once per map unit, normalized over the sampled
/// range, and drawn as `SCALE`-sized blocks.
pub fn save_heatmap(
    model: &dyn Surrogate,
    size: (f64, f64),
    path: &Path,
) -> Result<(), ImageError> {
    let cols = (size.0.ceil() as u32).max(1);
    let rows = (size.1.ceil() as u32).max(1);
    let mut values = Vec::with_capacity((cols * rows) as usize);
    for row in 0..rows {
        for col in 0..cols {
            let at = Point::new(col as f64 + 0.5, row as f64 + 0.5);
            values.push(model.predict_mean(&at));
        }
    }
    let lo = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let hi = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let span = if hi > lo { hi - lo } else { 1.0 };

    let (width, height) = dims(size);
    let mut img = RgbImage::new(width, height);
    for row in 0..rows {
        for col in 0..cols {
            let t = (values[(row * cols + col) as usize] - lo) / span;
            let color = ramp(t);
            for dy in 0..SCALE {
                for dx in 0..SCALE {
                    let x = col * SCALE + dx;
                    let y = height - 1 - (row * SCALE + dy);
                    img.put_pixel(x, y, color);
                }
            }
        }
    }
    img.save(path)
}

/// Renders drone trajectories and the episode's sources as a PNG.
///
/// Sources are strength-colored discs; each drone's trajectory is a
/// polyline in a per-drone color with its final position emphasized.
pub fn save_trajectories(
    drones: &[Drone],
    sources: &[SignalSource],
    size: (f64, f64),
    path: &Path,
) -> Result<(), ImageError> {
    let (width, height) = dims(size);
    let mut img = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));

    let lo = sources
        .iter()
        .map(|s| s.strength)
        .fold(f64::INFINITY, f64::min);
    let hi = sources
        .iter()
        .map(|s| s.strength)
        .fold(f64::NEG_INFINITY, f64::max);
    let span = if hi > lo { hi - lo } else { 1.0 };
    for source in sources {
        let t = (source.strength - lo) / span;
        draw_disc(&mut img, to_pixel(&source.position, height), 3, ramp(t));
    }

    for (i, drone) in drones.iter().enumerate() {
        let color = Rgb(PALETTE[i % PALETTE.len()]);
        for pair in drone.trajectory().windows(2) {
            draw_line(
                &mut img,
                to_pixel(&pair[0], height),
                to_pixel(&pair[1], height),
                color,
            );
        }
        draw_disc(&mut img, to_pixel(&drone.position(), height), 2, color);
    }

    img.save(path)
}
