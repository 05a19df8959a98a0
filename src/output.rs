//! Report and field output formatting.

use std::io::Write;

use crate::config::SolverConfig;
use crate::error::{JacobiError, Result};
use crate::solver::jacobi::SolveOutcome;
use crate::solver::slab::SlabShape;

/// Write the rank-0 text report.
///
/// Format:
/// ```text
/// Time taken: 1.234567 s
/// Iterations: 42
/// Delta: 0.000000
/// ```
pub fn write_report<W: Write>(outcome: &SolveOutcome, writer: &mut W) -> Result<()> {
    let max_error = outcome.max_error.ok_or_else(|| {
        JacobiError::Config(format!("rank {} holds no assembled field", outcome.rank))
    })?;
    writeln!(writer, "Time taken: {:.6} s", outcome.elapsed.as_secs_f64())?;
    writeln!(writer, "Iterations: {}", outcome.iterations)?;
    writeln!(writer, "Delta: {:.6e}", max_error)?;
    Ok(())
}

/// Write the assembled field as CSV, one grid point per row.
///
/// Format:
/// ```csv
/// z,x,y,value
/// -1,-1,-1,3
/// ```
pub fn write_field_csv<W: Write>(config: &SolverConfig, field: &[f64], writer: &mut W) -> Result<()> {
    let n = config.n;
    let shape = SlabShape::new(n, n);
    if field.len() != shape.len() {
        return Err(JacobiError::Config(format!(
            "field has {} values, expected {}",
            field.len(),
            shape.len()
        )));
    }

    writeln!(writer, "z,x,y,value")?;
    for k in 0..n {
        let z = config.z(k as isize);
        for i in 0..n {
            let x = config.x(i);
            for j in 0..n {
                writeln!(writer, "{},{},{},{}", z, x, config.y(j), field[shape.index(k, i, j)])?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn outcome(max_error: Option<f64>) -> SolveOutcome {
        SolveOutcome {
            rank: 0,
            iterations: 7,
            global_delta: 1e-8,
            delta_history: vec![1.0, 1e-8],
            elapsed: Duration::from_millis(1500),
            field: None,
            max_error,
        }
    }

    #[test]
    fn report_lists_time_iterations_and_error() {
        let mut buf = Vec::new();
        write_report(&outcome(Some(2.5e-4)), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "Time taken: 1.500000 s\nIterations: 7\nDelta: 2.500000e-4\n"
        );
    }

    #[test]
    fn report_requires_root_outcome() {
        let mut buf = Vec::new();
        assert!(write_report(&outcome(None), &mut buf).is_err());
    }

    #[test]
    fn field_csv_has_header_and_one_row_per_point() {
        let config = SolverConfig::with_grid_size(3);
        let field = vec![1.0; 27];
        let mut buf = Vec::new();
        write_field_csv(&config, &field, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 28);
        assert_eq!(lines[0], "z,x,y,value");
        assert_eq!(lines[1], "-1,-1,-1,1");
        assert_eq!(lines[27], "1,1,1,1");
    }
}
