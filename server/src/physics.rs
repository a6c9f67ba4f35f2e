//! Collision predicates and spawn placement for the world engine.

use log::warn;
use rand::Rng;
use shared::{Vector2D, Wall};

/// Spawn sampling gives up after this many rejected points.
pub const MAX_SPAWN_ATTEMPTS: usize = 10_000;

///Returns true if a ray starting at `origin` heading along `dir` crosses the
///circle of radius `r` around `center`, with the centre ahead of the origin.
///
///Solves `|O + tV - C|^2 = r^2` for t. A negative discriminant misses. Only
///the signs of the roots matter, so the division by 2a is skipped.
pub fn intersects(origin: Vector2D, dir: Vector2D, center: Vector2D, r: f64) -> bool {
    let offset = origin - center;
    let a = dir.dot(&dir);
    let b = (offset * 2.0).dot(&dir);
    let c = offset.dot(&offset) - r * r;

    if a == 0.0 {
        return false;
    }

    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return false;
    }

    // -b > 0 puts the centre ahead of the origin; when the origin lies
    // outside the circle this is the same as both roots being positive.
    -b > 0.0
}

///Returns true if `point` lies inside any wall's tank-buffered hitbox.
pub fn collides_with_any_wall(point: Vector2D, walls: &[Wall]) -> bool {
    walls.iter().any(|w| w.buffered_area().contains(point))
}

///Picks one of the four world quadrants uniformly, then a uniform point
///inside it.
pub fn random_location<R: Rng>(rng: &mut R, world_size: f64) -> Vector2D {
    let half = world_size / 2.0;
    let (sx, sy) = match rng.gen_range(0..4) {
        0 => (-1.0, -1.0),
        1 => (1.0, -1.0),
        2 => (-1.0, 1.0),
        _ => (1.0, 1.0),
    };
    Vector2D::new(
        sx * rng.gen::<f64>() * half,
        sy * rng.gen::<f64>() * half,
    )
}

///Rejection-samples a point clear of every wall's buffered hitbox.
///
///Falls back to the world centre after [`MAX_SPAWN_ATTEMPTS`] rejections.
pub fn find_spawn_location<R: Rng>(
    rng: &mut R,
    world_size: f64,
    walls: &[Wall],
) -> Vector2D {
    for _ in 0..MAX_SPAWN_ATTEMPTS {
        let candidate = random_location(rng, world_size);
        if !collides_with_any_wall(candidate, walls) {
            return candidate;
        }
    }

    warn!(
        "No wall-free spawn point after {} attempts, using world centre",
        MAX_SPAWN_ATTEMPTS
    );
    Vector2D::ZERO
}
