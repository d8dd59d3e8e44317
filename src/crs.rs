//! Coordinate reference system descriptors.
//!
//! Plain parameter structs consumed by the
//! [`OperationFactory`](crate::factory::OperationFactory). They carry
//! no behaviour of their own; the factory turns a pair of them into a
//! transform chain. Authority-code resolution (EPSG lookups and the
//! like) happens in an outer metadata layer and hands descriptors in.

use crate::proj::Ellipsoid;

/// Order of the horizontal ordinates as the caller supplies them.
/// Kernels always work in lon-lat; `LatLon` sources get an axis swap in
/// the normalize affine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisOrder {
    LonLat,
    LatLon,
}

/// Geographic (ellipsoidal) CRS.
#[derive(Debug, Clone)]
pub struct GeographicCrs {
    /// Datum identifier; two geographic CRS share a datum iff the
    /// names match.
    pub datum: String,
    pub ellipsoid: Ellipsoid,
    pub axis_order: AxisOrder,
    /// Scale from the CRS angular unit to radians (π/180 for degrees).
    pub unit_to_radians: f64,
    /// 2 for horizontal, 3 when ellipsoidal height is carried.
    pub dimension: usize,
}

impl GeographicCrs {
    /// Degree-valued lon-lat CRS on the given datum, the common case.
    pub fn degrees(datum: impl Into<String>, ellipsoid: Ellipsoid) -> Self {
        Self {
            datum: datum.into(),
            ellipsoid,
            axis_order: AxisOrder::LonLat,
            unit_to_radians: std::f64::consts::PI / 180.0,
            dimension: 2,
        }
    }

    pub fn with_axis_order(mut self, axis_order: AxisOrder) -> Self {
        self.axis_order = axis_order;
        self
    }

    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }
}

/// Named projection method understood by the factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionMethod {
    /// Spherical Mercator on the authalic sphere radius (web-map use).
    SphericalMercator,
    /// Conformal ellipsoidal Mercator.
    Mercator,
    /// Equal-area Mercator on the authalic latitude.
    AuthalicMercator,
    TransverseMercator,
    LambertConformalConic,
    LambertAzimuthalEqualArea,
    PolarStereographicNorth,
    PolarStereographicSouth,
}

/// Projection parameter list in the units authorities quote them in:
/// angles in degrees, lengths in the projected unit.
#[derive(Debug, Clone)]
pub struct ProjectionParameters {
    pub central_meridian: f64,
    pub latitude_of_origin: f64,
    pub standard_parallel_1: Option<f64>,
    pub standard_parallel_2: Option<f64>,
    pub scale_factor: f64,
    pub false_easting: f64,
    pub false_northing: f64,
}

impl Default for ProjectionParameters {
    fn default() -> Self {
        Self {
            central_meridian: 0.0,
            latitude_of_origin: 0.0,
            standard_parallel_1: None,
            standard_parallel_2: None,
            scale_factor: 1.0,
            false_easting: 0.0,
            false_northing: 0.0,
        }
    }
}

/// Projected CRS: a geographic base plus a projection method and its
/// parameters.
#[derive(Debug, Clone)]
pub struct ProjectedCrs {
    pub base: GeographicCrs,
    pub method: ProjectionMethod,
    pub parameters: ProjectionParameters,
    /// Scale from the CRS linear unit to metres.
    pub unit_to_metres: f64,
}

/// Vertical CRS for the height component of a compound CRS.
#[derive(Debug, Clone)]
pub struct VerticalCrs {
    pub datum: String,
    pub unit_to_metres: f64,
}

#[derive(Debug, Clone)]
pub enum Crs {
    Geographic(GeographicCrs),
    Projected(ProjectedCrs),
    /// Horizontal CRS with a separate height axis carried through.
    Compound {
        horizontal: Box<Crs>,
        vertical: VerticalCrs,
    },
}

impl Crs {
    pub fn dimension(&self) -> usize {
        match self {
            Crs::Geographic(g) => g.dimension,
            Crs::Projected(_) => 2,
            Crs::Compound { horizontal, .. } => horizontal.dimension() + 1,
        }
    }

    /// The geodetic datum the horizontal component sits on.
    pub fn datum(&self) -> &str {
        &self.base_geographic().datum
    }

    /// The geographic CRS this CRS projects from (itself if already
    /// geographic).
    pub fn base_geographic(&self) -> &GeographicCrs {
        match self {
            Crs::Geographic(g) => g,
            Crs::Projected(p) => &p.base,
            Crs::Compound { horizontal, .. } => horizontal.base_geographic(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proj::ellipsoid::WGS84;

    #[test]
    fn test_dimensions() {
        let geo = Crs::Geographic(GeographicCrs::degrees("WGS 84", WGS84));
        assert_eq!(geo.dimension(), 2);
        let compound = Crs::Compound {
            horizontal: Box::new(geo),
            vertical: VerticalCrs { datum: "WGS 84".into(), unit_to_metres: 1.0 },
        };
        assert_eq!(compound.dimension(), 3);
        assert_eq!(compound.datum(), "WGS 84");
        assert_eq!(compound.base_geographic().dimension, 2);
    }

    #[test]
    fn test_default_parameters() {
        let p = ProjectionParameters::default();
        assert_eq!(p.scale_factor, 1.0);
        assert!(p.standard_parallel_1.is_none());
    }
}
