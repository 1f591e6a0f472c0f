//! Explicit Runge-Kutta tableaux for marker advection.
//!
//! Orders 1 through 4: forward Euler, the midpoint rule, Kutta's
//! third-order scheme, and classic RK4. All are consistent (weights sum
//! to one), so a spatially and temporally constant velocity is
//! integrated exactly regardless of order.

use crate::error::MarkerError;

/// A fixed explicit Butcher tableau. `a` is the strictly lower
/// triangular stage-coupling block, `b` the final combination weights,
/// `c` the stage fractions within a sub-interval.
#[derive(Debug, Clone)]
pub struct ButcherTableau {
    order: usize,
    a: [[f64; 4]; 4],
    b: [f64; 4],
    c: [f64; 4],
}

impl ButcherTableau {
    pub fn new(order: usize) -> Result<Self, MarkerError> {
        let (a, b, c) = match order {
            1 => (
                [[0.0; 4]; 4],
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 0.0, 0.0, 0.0],
            ),
            2 => {
                let mut a = [[0.0; 4]; 4];
                a[1][0] = 0.5;
                (a, [0.0, 1.0, 0.0, 0.0], [0.0, 0.5, 0.0, 0.0])
            }
            3 => {
                let mut a = [[0.0; 4]; 4];
                a[1][0] = 0.5;
                a[2][0] = -1.0;
                a[2][1] = 2.0;
                (
                    a,
                    [1.0 / 6.0, 2.0 / 3.0, 1.0 / 6.0, 0.0],
                    [0.0, 0.5, 1.0, 0.0],
                )
            }
            4 => {
                let mut a = [[0.0; 4]; 4];
                a[1][0] = 0.5;
                a[2][1] = 0.5;
                a[3][2] = 1.0;
                (
                    a,
                    [1.0 / 6.0, 1.0 / 3.0, 1.0 / 3.0, 1.0 / 6.0],
                    [0.0, 0.5, 0.5, 1.0],
                )
            }
            other => return Err(MarkerError::UnsupportedOrder(other)),
        };
        Ok(Self { order, a, b, c })
    }

    /// Number of stages.
    pub fn order(&self) -> usize {
        self.order
    }

    /// Stage-coupling coefficient `a[j][k]`, `k < j`.
    pub fn a(&self, j: usize, k: usize) -> f64 {
        debug_assert!(k < j && j < self.order);
        self.a[j][k]
    }

    /// Final combination weight of stage `j`.
    pub fn b(&self, j: usize) -> f64 {
        debug_assert!(j < self.order);
        self.b[j]
    }

    /// Fraction of the sub-interval at which stage `j` is evaluated.
    pub fn c(&self, j: usize) -> f64 {
        debug_assert!(j < self.order);
        self.c[j]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn weights_are_consistent() {
        for order in 1..=4 {
            let t = ButcherTableau::new(order).unwrap();
            let sum: f64 = (0..order).map(|j| t.b(j)).sum();
            assert_relative_eq!(sum, 1.0, epsilon = 1e-15);
            assert_eq!(t.c(0), 0.0);
        }
    }

    #[test]
    fn stage_rows_sum_to_c() {
        // Row-sum condition: sum_k a[j][k] == c[j].
        for order in 2..=4 {
            let t = ButcherTableau::new(order).unwrap();
            for j in 1..order {
                let row: f64 = (0..j).map(|k| t.a(j, k)).sum();
                assert_relative_eq!(row, t.c(j), epsilon = 1e-15);
            }
        }
    }

    #[test]
    fn unsupported_order_is_rejected() {
        assert!(ButcherTableau::new(0).is_err());
        assert!(ButcherTableau::new(5).is_err());
    }
}
