//! Gauss–Jordan elimination for the 4×4 normal equations.

use hordeform_core::Real;
use nalgebra::{Matrix4, SMatrix, Vector4};

/// Pivot magnitude below which the system is declared singular.
pub const PIVOT_EPSILON: Real = 1e-9;

/// Elimination factors below this are skipped.
const FACTOR_EPSILON: Real = 1e-12;

/// Solve `A x = b` by Gauss–Jordan elimination with partial pivoting.
///
/// For each column the row with the largest magnitude at or below the
/// diagonal is swapped up, normalised, and eliminated from every other row.
/// Returns `None` when the chosen pivot falls below [`PIVOT_EPSILON`].
pub fn solve_gauss_jordan(a: &Matrix4<Real>, b: &Vector4<Real>) -> Option<Vector4<Real>> {
    const N: usize = 4;
    let mut m = SMatrix::<Real, 4, 5>::zeros();
    m.fixed_view_mut::<4, 4>(0, 0).copy_from(a);
    m.set_column(N, b);

    for col in 0..N {
        let mut pivot = col;
        let mut best = m[(col, col)].abs();
        for r in (col + 1)..N {
            let v = m[(r, col)].abs();
            if v > best {
                best = v;
                pivot = r;
            }
        }
        if best < PIVOT_EPSILON {
            return None;
        }
        if pivot != col {
            m.swap_rows(col, pivot);
        }

        let div = m[(col, col)];
        for c in col..=N {
            m[(col, c)] /= div;
        }

        for r in 0..N {
            if r == col {
                continue;
            }
            let factor = m[(r, col)];
            if factor.abs() < FACTOR_EPSILON {
                continue;
            }
            for c in col..=N {
                m[(r, c)] -= factor * m[(col, c)];
            }
        }
    }

    Some(m.column(N).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solves_diagonal_system() {
        let a = Matrix4::from_diagonal(&Vector4::new(2.0, 4.0, 5.0, 10.0));
        let b = Vector4::new(2.0, 8.0, 15.0, 5.0);
        let x = solve_gauss_jordan(&a, &b).unwrap();
        assert_eq!(x, Vector4::new(1.0, 2.0, 3.0, 0.5));
    }

    #[test]
    fn requires_row_swap() {
        // Zero on the first diagonal entry forces a pivot swap.
        #[rustfmt::skip]
        let a = Matrix4::new(
            0.0, 1.0, 0.0, 0.0,
            1.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 3.0, 1.0,
            0.0, 0.0, 1.0, 2.0,
        );
        let expected = Vector4::new(1.5, -2.0, 0.25, 4.0);
        let b = a * expected;
        let x = solve_gauss_jordan(&a, &b).unwrap();
        assert!((x - expected).norm() < 1e-12, "{x}");
    }

    #[test]
    fn matches_general_solution() {
        #[rustfmt::skip]
        let a = Matrix4::new(
            4.0, -2.0, 1.0, 0.5,
            -2.0, 5.0, 0.0, 1.0,
            1.0, 0.0, 3.0, -1.0,
            0.5, 1.0, -1.0, 6.0,
        );
        let expected = Vector4::new(-3.0, 0.7, 12.0, 2.5);
        let x = solve_gauss_jordan(&a, &(a * expected)).unwrap();
        assert!((x - expected).norm() < 1e-10, "{x}");
    }

    #[test]
    fn singular_matrix_is_rejected() {
        #[rustfmt::skip]
        let a = Matrix4::new(
            1.0, 2.0, 3.0, 4.0,
            2.0, 4.0, 6.0, 8.0,
            0.0, 1.0, 0.0, 1.0,
            1.0, 0.0, 1.0, 0.0,
        );
        assert!(solve_gauss_jordan(&a, &Vector4::new(1.0, 2.0, 3.0, 4.0)).is_none());
    }
}
