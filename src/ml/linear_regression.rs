use super::{validate_training_data, ModelError, Regressor};

/// Relative pivot size below which a column is treated as degenerate.
const PIVOT_TOLERANCE: f64 = 1e-10;

/// Ordinary least squares with an intercept.
///
/// Columns that are constant, or exact linear combinations of earlier
/// columns, get a zero coefficient instead of failing the fit.
#[derive(Debug, Clone, Default)]
pub struct LinearRegression {
    coefficients: Vec<f64>,
    intercept: f64,
    fitted: bool,
}

impl LinearRegression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }
}

impl Regressor for LinearRegression {
    fn fit(&mut self, features: &[Vec<f64>], targets: &[f64]) -> Result<(), ModelError> {
        let width = validate_training_data(features, targets)?;
        let n = targets.len() as f64;

        let x_mean: Vec<f64> = (0..width)
            .map(|j| features.iter().map(|row| row[j]).sum::<f64>() / n)
            .collect();
        let y_mean = targets.iter().sum::<f64>() / n;

        // Centered normal equations: (Xc' Xc) w = Xc' yc
        let mut gram = vec![vec![0.0; width]; width];
        let mut moment = vec![0.0; width];
        for (row, y) in features.iter().zip(targets) {
            let yc = y - y_mean;
            for i in 0..width {
                let xi = row[i] - x_mean[i];
                moment[i] += xi * yc;
                for j in 0..width {
                    gram[i][j] += xi * (row[j] - x_mean[j]);
                }
            }
        }

        let coefficients = solve_normal_equations(gram, moment);
        let intercept = y_mean
            - coefficients
                .iter()
                .zip(&x_mean)
                .map(|(w, m)| w * m)
                .sum::<f64>();

        if !intercept.is_finite() || coefficients.iter().any(|w| !w.is_finite()) {
            return Err(ModelError::NonFinite);
        }

        self.coefficients = coefficients;
        self.intercept = intercept;
        self.fitted = true;
        Ok(())
    }

    fn predict(&self, row: &[f64]) -> Result<f64, ModelError> {
        if !self.fitted {
            return Err(ModelError::NotFitted);
        }
        if row.len() != self.coefficients.len() {
            return Err(ModelError::DimensionMismatch {
                expected: self.coefficients.len(),
                found: row.len(),
            });
        }
        Ok(self.intercept
            + self
                .coefficients
                .iter()
                .zip(row)
                .map(|(w, x)| w * x)
                .sum::<f64>())
    }
}

/// Gauss-Jordan elimination with partial pivoting on a symmetric positive
/// semi-definite system. Free columns (no usable pivot) are set to zero,
/// which still yields a least-squares solution because the right-hand side
/// lies in the column space of the Gram matrix.
fn solve_normal_equations(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Vec<f64> {
    let size = b.len();
    let scale = (0..size).map(|i| a[i][i].abs()).fold(0.0_f64, f64::max);
    let tolerance = scale.max(1.0) * PIVOT_TOLERANCE;

    let mut pivots: Vec<(usize, usize)> = Vec::with_capacity(size);
    let mut row = 0;
    for col in 0..size {
        if row == size {
            break;
        }
        let (best, best_abs) = (row..size)
            .map(|r| (r, a[r][col].abs()))
            .fold((row, -1.0), |acc, cur| if cur.1 > acc.1 { cur } else { acc });
        if best_abs <= tolerance {
            continue;
        }
        a.swap(row, best);
        b.swap(row, best);

        let pivot = a[row][col];
        for k in col..size {
            a[row][k] /= pivot;
        }
        b[row] /= pivot;

        for r in 0..size {
            if r == row {
                continue;
            }
            let factor = a[r][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..size {
                a[r][k] -= factor * a[row][k];
            }
            b[r] -= factor * b[row];
        }
        pivots.push((row, col));
        row += 1;
    }

    let mut solution = vec![0.0; size];
    for (r, c) in pivots {
        solution[c] = b[r];
    }
    solution
}
