use thiserror::Error;

/// Runtime failure while evaluating a transform at a point.
///
/// `Clone` so a lazily built inverse can cache a failed construction
/// and hand the same error to every caller.
#[derive(Error, Debug, Clone)]
pub enum TransformError {
    #[error("Mismatched dimension: expected {expected}, got {actual}")]
    MismatchedDimension { expected: usize, actual: usize },

    #[error("Pole singularity at (lon={lon}, lat={lat}) rad")]
    PoleSingularity { lon: f64, lat: f64 },

    #[error("Coordinate ({x}, {y}) outside the transform domain")]
    DomainExceeded { x: f64, y: f64 },

    #[error("Iteration did not converge after {iterations} steps (last delta {delta:e})")]
    NonConvergence { iterations: usize, delta: f64 },

    #[error("Coordinate ({x}, {y}) outside the grid lattice")]
    OutsideDomain { x: f64, y: f64 },

    #[error("Singular {rows}x{cols} matrix (pivot {pivot:e})")]
    SingularMatrix { rows: usize, cols: usize, pivot: f64 },

    #[error("Transform has no inverse: {0}")]
    NoInverse(String),

    #[error("At point index {index}: {source}")]
    AtPoint {
        index: usize,
        #[source]
        source: Box<TransformError>,
    },
}

impl TransformError {
    /// Wrap a per-point failure with the index of the offending point
    /// in a bulk array operation.
    pub fn at_point(self, index: usize) -> Self {
        TransformError::AtPoint {
            index,
            source: Box::new(self),
        }
    }
}

/// Construction-time failure while assembling a coordinate operation.
#[derive(Error, Debug)]
pub enum FactoryError {
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("No operation found from {source_crs} to {target_crs}")]
    OperationNotFound {
        source_crs: String,
        target_crs: String,
    },

    #[error(
        "Ambiguous operation from {source_crs} to {target_crs}: {candidates} equally ranked candidates"
    )]
    AmbiguousOperation {
        source_crs: String,
        target_crs: String,
        candidates: usize,
    },

    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),
}

impl FactoryError {
    pub fn invalid_parameter(name: &'static str, reason: impl Into<String>) -> Self {
        FactoryError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Failure while reading or validating a datum shift grid.
#[derive(Error, Debug)]
pub enum GridError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed grid file at line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    #[error("Inconsistent grid: {0}")]
    Inconsistent(String),
}
