use crate::error::FactoryError;

/// Reference ellipsoid parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ellipsoid {
    /// Semi-major axis (metres)
    pub a: f64,
    /// Flattening (dimensionless)
    pub f: f64,
    /// Semi-minor axis: a * (1 - f)
    pub b: f64,
    /// First eccentricity squared
    pub e2: f64,
    /// Second eccentricity squared: e^2 / (1 - e^2)
    pub ep2: f64,
    /// Third flattening: f / (2 - f)
    pub n: f64,
}

impl Ellipsoid {
    /// Const constructor for well-known ellipsoids; parameters are
    /// trusted. Use [`Ellipsoid::try_new`] for externally supplied
    /// values.
    pub const fn new(a: f64, f: f64) -> Self {
        let b = a * (1.0 - f);
        let e2 = 2.0 * f - f * f;
        let ep2 = e2 / (1.0 - e2);
        let n = f / (2.0 - f);
        Self {
            a,
            f,
            b,
            e2,
            ep2,
            n,
        }
    }

    /// Validating constructor: fails fast on physically impossible
    /// parameters so a malformed pipeline never reaches the per-point
    /// path.
    pub fn try_new(a: f64, f: f64) -> Result<Self, FactoryError> {
        if !a.is_finite() || a <= 0.0 {
            return Err(FactoryError::invalid_parameter(
                "semi_major",
                format!("must be finite and positive, got {a}"),
            ));
        }
        if !f.is_finite() || f < 0.0 || f >= 1.0 {
            return Err(FactoryError::invalid_parameter(
                "flattening",
                format!("must be in [0, 1), got {f}"),
            ));
        }
        let e = Self::new(a, f);
        if e.e2 >= 1.0 {
            return Err(FactoryError::invalid_parameter(
                "flattening",
                format!("eccentricity squared {} >= 1", e.e2),
            ));
        }
        Ok(e)
    }

    /// First eccentricity (computed at runtime; sqrt is not const).
    pub fn eccentricity(&self) -> f64 {
        self.e2.sqrt()
    }

    pub fn is_sphere(&self) -> bool {
        self.e2 == 0.0
    }
}

pub const WGS84: Ellipsoid = Ellipsoid::new(6_378_137.0, 1.0 / 298.257_223_563);
pub const GRS80: Ellipsoid = Ellipsoid::new(6_378_137.0, 1.0 / 298.257_222_101);
/// Authalic-radius sphere used by spherical formulas and tests.
pub const SPHERE: Ellipsoid = Ellipsoid::new(6_371_007.180_918_474, 0.0);
