//! Coordinate operation core: math transforms, projection kernels and
//! the operation factory that assembles them.
//!
//! The central abstraction is the [`MathTransform`] trait: an immutable,
//! thread-safe mapping between coordinate tuples with an analytic
//! derivative and a lazily built inverse. Projection kernels work in a
//! normalized space (radians, unit semi-major axis, central meridian at
//! zero); the [`factory::OperationFactory`] wraps them in
//! extended-precision affine stages for axis order, angular/linear
//! units, scale factors and false offsets, and bridges datums with
//! registered shift transforms such as the grid-backed
//! [`grid::GridShiftTransform`].
//!
//! ```
//! use projkit::crs::{Crs, GeographicCrs, ProjectedCrs, ProjectionMethod,
//!     ProjectionParameters};
//! use projkit::factory::OperationFactory;
//! use projkit::proj::ellipsoid::WGS84;
//! use projkit::MathTransform;
//!
//! let factory = OperationFactory::new();
//! let geographic = Crs::Geographic(GeographicCrs::degrees("WGS 84", WGS84));
//! let mercator = Crs::Projected(ProjectedCrs {
//!     base: GeographicCrs::degrees("WGS 84", WGS84),
//!     method: ProjectionMethod::Mercator,
//!     parameters: ProjectionParameters::default(),
//!     unit_to_metres: 1.0,
//! });
//! let op = factory.create_operation(&geographic, &mercator).unwrap();
//! let mut projected = [0.0_f64; 2];
//! op.transform_point(&[12.0, 55.0], &mut projected).unwrap();
//! ```

pub mod coord;
pub mod crs;
pub mod domain;
pub mod error;
pub mod factory;
pub mod grid;
pub mod matrix;
pub mod proj;
pub mod transform;

pub use coord::Position;
pub use domain::Envelope;
pub use error::{FactoryError, GridError, TransformError};
pub use factory::OperationFactory;
pub use matrix::Matrix;
pub use transform::MathTransform;
