//! Transform domains — per-dimension envelopes and longitude wrap-around.

use std::f64::consts::PI;

/// An axis-aligned envelope: `min[i] <= x[i] <= max[i]` per dimension.
#[derive(Clone, Debug, PartialEq)]
pub struct Envelope {
    min: Vec<f64>,
    max: Vec<f64>,
}

impl Envelope {
    /// Panics if the bounds disagree in length or are inverted.
    pub fn new(min: Vec<f64>, max: Vec<f64>) -> Self {
        assert_eq!(min.len(), max.len(), "envelope bounds length");
        for (lo, hi) in min.iter().zip(&max) {
            assert!(lo <= hi, "inverted envelope bounds: {lo} > {hi}");
        }
        Self { min, max }
    }

    /// 2D convenience constructor.
    pub fn new_2d(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self::new(vec![min_x, min_y], vec![max_x, max_y])
    }

    pub fn dimension(&self) -> usize {
        self.min.len()
    }

    pub fn min(&self, dim: usize) -> f64 {
        self.min[dim]
    }

    pub fn max(&self, dim: usize) -> f64 {
        self.max[dim]
    }

    /// True if the point lies inside the envelope (inclusive bounds).
    /// Points of a lower dimension are tested on the leading ordinates.
    pub fn contains(&self, point: &[f64]) -> bool {
        if point.len() < self.min.len() {
            return false;
        }
        self.min
            .iter()
            .zip(&self.max)
            .zip(point)
            .all(|((lo, hi), v)| *v >= *lo && *v <= *hi)
    }

    /// Intersection with another envelope of the same dimension, `None`
    /// when disjoint.
    pub fn intersect(&self, other: &Envelope) -> Option<Envelope> {
        if self.dimension() != other.dimension() {
            return None;
        }
        let mut min = Vec::with_capacity(self.dimension());
        let mut max = Vec::with_capacity(self.dimension());
        for i in 0..self.dimension() {
            let lo = self.min[i].max(other.min[i]);
            let hi = self.max[i].min(other.max[i]);
            if lo > hi {
                return None;
            }
            min.push(lo);
            max.push(hi);
        }
        Some(Envelope { min, max })
    }

    /// True if the longitude range (dimension 0) crosses the ±π seam.
    pub fn crosses_antimeridian(&self) -> bool {
        self.min[0] < -PI || self.max[0] > PI
    }
}

/// Normalize a longitude in radians into (−π, π].
pub fn wrap_longitude(lon: f64) -> f64 {
    if lon > -PI && lon <= PI {
        return lon;
    }
    let wrapped = (lon + PI).rem_euclid(2.0 * PI) - PI;
    // rem_euclid maps exact multiples of 2π to −π; keep the +π side.
    if wrapped == -PI {
        PI
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_contains() {
        let env = Envelope::new_2d(-PI, -1.5, PI, 1.5);
        assert!(env.contains(&[0.0, 0.0]));
        assert!(env.contains(&[PI, 1.5]));
        assert!(!env.contains(&[0.0, 1.6]));
        // Extra trailing ordinates are ignored.
        assert!(env.contains(&[0.0, 0.0, 100.0]));
        assert!(!env.contains(&[0.0]));
    }

    #[test]
    fn test_intersect() {
        let a = Envelope::new_2d(0.0, 0.0, 2.0, 2.0);
        let b = Envelope::new_2d(1.0, 1.0, 3.0, 3.0);
        let c = a.intersect(&b).unwrap();
        assert_eq!(c, Envelope::new_2d(1.0, 1.0, 2.0, 2.0));

        let d = Envelope::new_2d(5.0, 5.0, 6.0, 6.0);
        assert!(a.intersect(&d).is_none());
    }

    #[test]
    fn test_wrap_longitude() {
        assert_relative_eq!(wrap_longitude(0.0), 0.0);
        assert_relative_eq!(wrap_longitude(PI), PI);
        assert_relative_eq!(wrap_longitude(-PI), PI);
        assert_relative_eq!(wrap_longitude(3.0 * PI), PI);
        assert_relative_eq!(wrap_longitude(PI + 0.25), -PI + 0.25, epsilon = 1e-12);
        assert_relative_eq!(wrap_longitude(-PI - 0.25), PI - 0.25, epsilon = 1e-12);
    }
}
