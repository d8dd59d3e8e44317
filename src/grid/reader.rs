//! Whitespace ASCII lattice reader.
//!
//! A deliberately small interchange format for shift grids:
//!
//! ```text
//! 3 3 2              # nx ny dim
//! 0.0 0.0 1.0 1.0    # origin_x origin_y cell_x cell_y
//! nodata -9999.0     # optional
//! <nx·ny·dim values, row-major from the origin row>
//! ```
//!
//! Tokens are whitespace separated and may break across lines freely.
//! Binary grid formats (NTv2 and friends) are decoded by external
//! collaborators and handed over as [`DatumShiftGrid`] values directly.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::GridError;
use crate::grid::{DatumShiftGrid, NodataPolicy};

pub fn read_grid(path: &Path, policy: NodataPolicy) -> Result<DatumShiftGrid, GridError> {
    let file = File::open(path)?;
    read_grid_from(BufReader::new(file), policy)
}

pub fn read_grid_from(
    reader: impl BufRead,
    policy: NodataPolicy,
) -> Result<DatumShiftGrid, GridError> {
    let mut parser = Parser::new(reader);

    let nx = parser.usize_token("nx")?;
    let ny = parser.usize_token("ny")?;
    let dim = parser.usize_token("dim")?;
    let origin = [parser.f64_token("origin_x")?, parser.f64_token("origin_y")?];
    let cell = [parser.f64_token("cell_x")?, parser.f64_token("cell_y")?];

    let mut nodata = None;
    let mut first = parser.token("shift value")?;
    if first == "nodata" {
        nodata = Some(parser.f64_token("nodata value")?);
        first = parser.token("shift value")?;
    }

    let count = nx
        .checked_mul(ny)
        .and_then(|n| n.checked_mul(dim))
        .ok_or_else(|| GridError::Inconsistent("lattice size overflows".into()))?;
    let mut values = Vec::with_capacity(count);
    values.push(parse_f64(&first, parser.line, "shift value")?);
    while values.len() < count {
        values.push(parser.f64_token("shift value")?);
    }
    parser.expect_end()?;

    DatumShiftGrid::new(origin, cell, nx, ny, dim, values, nodata, policy)
}

/// Token stream over a buffered reader, tracking the current line for
/// error reporting. `#` starts a comment running to end of line.
struct Parser<R> {
    reader: R,
    line: usize,
    pending: Vec<String>,
}

impl<R: BufRead> Parser<R> {
    fn new(reader: R) -> Self {
        Self { reader, line: 0, pending: Vec::new() }
    }

    fn token(&mut self, what: &str) -> Result<String, GridError> {
        loop {
            if let Some(tok) = self.pending.pop() {
                return Ok(tok);
            }
            let mut buf = String::new();
            if self.reader.read_line(&mut buf)? == 0 {
                return Err(GridError::Malformed {
                    line: self.line,
                    reason: format!("unexpected end of input, wanted {what}"),
                });
            }
            self.line += 1;
            let content = buf.split('#').next().unwrap_or("");
            self.pending = content.split_whitespace().rev().map(str::to_owned).collect();
        }
    }

    fn f64_token(&mut self, what: &str) -> Result<f64, GridError> {
        let tok = self.token(what)?;
        parse_f64(&tok, self.line, what)
    }

    fn usize_token(&mut self, what: &str) -> Result<usize, GridError> {
        let tok = self.token(what)?;
        tok.parse().map_err(|_| GridError::Malformed {
            line: self.line,
            reason: format!("invalid {what}: {tok:?}"),
        })
    }

    fn expect_end(&mut self) -> Result<(), GridError> {
        loop {
            if let Some(tok) = self.pending.pop() {
                return Err(GridError::Malformed {
                    line: self.line,
                    reason: format!("trailing content: {tok:?}"),
                });
            }
            let mut buf = String::new();
            if self.reader.read_line(&mut buf)? == 0 {
                return Ok(());
            }
            self.line += 1;
            let content = buf.split('#').next().unwrap_or("");
            self.pending = content.split_whitespace().rev().map(str::to_owned).collect();
        }
    }
}

fn parse_f64(tok: &str, line: usize, what: &str) -> Result<f64, GridError> {
    tok.parse().map_err(|_| GridError::Malformed {
        line,
        reason: format!("invalid {what}: {tok:?}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const SAMPLE: &str = "\
2 2 2            # nx ny dim
10.0 45.0        # origin
0.5 0.5          # cell size
0.001 0.002  0.003 0.004
0.005 0.006  0.007 0.008
";

    #[test]
    fn test_reads_well_formed_grid() {
        let grid = read_grid_from(SAMPLE.as_bytes(), NodataPolicy::Fail).unwrap();
        assert_eq!(grid.dim(), 2);
        let mut out = [0.0; 2];
        grid.interpolate_at(10.0, 45.0, &mut out).unwrap();
        assert_eq!(out, [0.001, 0.002]);
        grid.interpolate_at(10.25, 45.25, &mut out).unwrap();
        assert_relative_eq!(out[0], 0.004, epsilon = 1e-15);
    }

    #[test]
    fn test_nodata_header() {
        let text = "2 2 1\n0 0\n1 1\nnodata -9999\n1 2 -9999 4\n";
        let grid = read_grid_from(text.as_bytes(), NodataPolicy::Zero).unwrap();
        let mut out = [0.0];
        grid.interpolate_at(0.0, 1.0, &mut out).unwrap();
        assert_eq!(out, [0.0]);
    }

    #[test]
    fn test_truncated_values() {
        let text = "2 2 1\n0 0\n1 1\n1 2 3\n";
        let err = read_grid_from(text.as_bytes(), NodataPolicy::Fail).unwrap_err();
        assert!(matches!(err, GridError::Malformed { .. }));
    }

    #[test]
    fn test_trailing_garbage() {
        let text = "2 2 1\n0 0\n1 1\n1 2 3 4 5\n";
        let err = read_grid_from(text.as_bytes(), NodataPolicy::Fail).unwrap_err();
        assert!(matches!(err, GridError::Malformed { reason, .. } if reason.contains("trailing")));
    }

    #[test]
    fn test_bad_token_reports_line() {
        let text = "2 2 1\n0 0\n1 1\n1 2 three 4\n";
        let err = read_grid_from(text.as_bytes(), NodataPolicy::Fail).unwrap_err();
        assert!(matches!(err, GridError::Malformed { line: 4, .. }));
    }

    #[test]
    fn test_inconsistent_header() {
        let text = "1 2 1\n0 0\n1 1\n1 2\n";
        let err = read_grid_from(text.as_bytes(), NodataPolicy::Fail).unwrap_err();
        assert!(matches!(err, GridError::Inconsistent(_)));
    }
}
