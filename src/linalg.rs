use dyn_stack::{MemBuffer, MemStack};
use faer::diag::{Diag, DiagRef};
use faer::linalg::svd::{self, ComputeSvdVectors};
use faer::{get_global_parallelism, Mat, MatRef};
use ndarray::{s, Array1, Array2};

use crate::error::{Result, TrackerError};

/// Singular values below `RCOND * max(singular value)` are treated as zero.
const RCOND: f64 = 1e-10;

fn array_to_mat(array: &Array2<f64>) -> Mat<f64> {
    let (rows, cols) = array.dim();
    Mat::from_fn(rows, cols, |i, j| array[(i, j)])
}

fn mat_to_array(mat: MatRef<'_, f64>) -> Array2<f64> {
    Array2::from_shape_fn((mat.nrows(), mat.ncols()), |(i, j)| mat[(i, j)])
}

fn diag_to_array(diag: DiagRef<'_, f64>) -> Array1<f64> {
    let mat = diag.column_vector().as_mat();
    Array1::from_shape_fn(mat.nrows(), |i| mat[(i, 0)])
}

/// Full SVD `a = U · diag(s) · Vᵀ`, returning `(U, s, V)`.
pub fn svd(a: &Array2<f64>) -> Result<(Array2<f64>, Array1<f64>, Array2<f64>)> {
    let mat = array_to_mat(a);
    let (rows, cols) = mat.shape();

    let mut singular = Diag::<f64>::zeros(rows.min(cols));
    let mut u = Mat::<f64>::zeros(rows, rows);
    let mut v = Mat::<f64>::zeros(cols, cols);

    let par = get_global_parallelism();
    let mut mem = MemBuffer::new(svd::svd_scratch::<f64>(
        rows,
        cols,
        ComputeSvdVectors::Full,
        ComputeSvdVectors::Full,
        par,
        Default::default(),
    ));
    let mut stack = MemStack::new(&mut mem);

    svd::svd(
        mat.as_ref(),
        singular.as_mut(),
        Some(u.as_mut()),
        Some(v.as_mut()),
        par,
        &mut stack,
        Default::default(),
    )
    .map_err(|_| TrackerError::SvdNoConvergence)?;

    Ok((
        mat_to_array(u.as_ref()),
        diag_to_array(singular.as_ref()),
        mat_to_array(v.as_ref()),
    ))
}

/// Minimum-norm least squares solution of `a · x = b` for every column of `b`.
pub fn least_squares(a: &Array2<f64>, b: &Array2<f64>) -> Result<Array2<f64>> {
    if a.nrows() != b.nrows() {
        return Err(TrackerError::invalid(format!(
            "{} design rows but {} target rows",
            a.nrows(),
            b.nrows()
        )));
    }

    let (u, singular, v) = svd(a)?;
    let rank_len = singular.len();
    let cutoff = singular.iter().copied().fold(0.0, f64::max) * RCOND;

    let mut projected = u.slice(s![.., ..rank_len]).t().dot(b);
    for (i, mut row) in projected.rows_mut().into_iter().enumerate() {
        if singular[i] > cutoff {
            row /= singular[i];
        } else {
            row.fill(0.0);
        }
    }

    Ok(v.slice(s![.., ..rank_len]).dot(&projected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn svd_reconstructs_the_input() {
        let a = array![[3.0, 1.0], [1.0, 3.0], [0.0, 2.0]];
        let (u, singular, v) = svd(&a).unwrap();

        let mut sigma = Array2::<f64>::zeros((3, 2));
        for (i, value) in singular.iter().enumerate() {
            sigma[(i, i)] = *value;
        }
        let rebuilt = u.dot(&sigma).dot(&v.t());
        for (got, want) in rebuilt.iter().zip(a.iter()) {
            assert_abs_diff_eq!(got, want, epsilon = 1e-10);
        }
    }

    #[test]
    fn solves_a_full_rank_system() {
        let a = array![[1.0, 0.0], [0.0, 2.0], [1.0, 1.0]];
        let x = array![[2.0], [-1.0]];
        let b = a.dot(&x);

        let solved = least_squares(&a, &b).unwrap();
        assert_abs_diff_eq!(solved[(0, 0)], 2.0, epsilon = 1e-10);
        assert_abs_diff_eq!(solved[(1, 0)], -1.0, epsilon = 1e-10);
    }

    #[test]
    fn duplicated_columns_share_the_weight() {
        let a = array![[1.0, 1.0], [2.0, 2.0], [-3.0, -3.0]];
        let b = array![[2.0], [4.0], [-6.0]];

        let solved = least_squares(&a, &b).unwrap();
        assert_abs_diff_eq!(solved[(0, 0)], 1.0, epsilon = 1e-10);
        assert_abs_diff_eq!(solved[(1, 0)], 1.0, epsilon = 1e-10);
    }

    #[test]
    fn zero_design_gives_zero_solution() {
        let a = Array2::<f64>::zeros((3, 2));
        let b = array![[1.0], [2.0], [3.0]];
        let solved = least_squares(&a, &b).unwrap();
        assert!(solved.iter().all(|value| *value == 0.0));
    }
}
