//! Shamir secret sharing over the Ristretto scalar field.
//!
//! The content-key secret is the constant term of a random polynomial of
//! degree `threshold - 1`; each key server holds the polynomial's value
//! at its own nonzero x-coordinate. Any `threshold` distinct points
//! recover the secret by Lagrange interpolation at zero; fewer reveal
//! nothing.

use curve25519_dalek::scalar::Scalar;
use rand::Rng;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Result, ThresholdError};

/// A polynomial whose constant term is the shared secret.
///
/// Coefficients are wiped when the polynomial is dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretPolynomial {
    /// `[a_0, a_1, ..., a_{t-1}]` with `a_0` the secret.
    coefficients: Vec<Scalar>,
}

impl SecretPolynomial {
    /// Build a random polynomial of degree `threshold - 1` around the
    /// secret.
    ///
    /// Panics if `threshold` is zero; callers validate the quorum shape
    /// before splitting.
    pub fn from_secret<R: Rng>(secret: Scalar, threshold: u8, rng: &mut R) -> Self {
        assert!(threshold > 0, "threshold must be positive");

        let mut coefficients = vec![secret];
        for _ in 1..threshold {
            let mut bytes = [0u8; 32];
            rng.fill_bytes(&mut bytes);
            coefficients.push(Scalar::from_bytes_mod_order(bytes));
        }
        Self { coefficients }
    }

    /// Evaluate the polynomial at `x` (Horner's method).
    pub fn evaluate(&self, x: Scalar) -> Scalar {
        let mut result = Scalar::ZERO;
        for coeff in self.coefficients.iter().rev() {
            result = result * x + coeff;
        }
        result
    }

    /// The secret (constant term).
    pub fn secret(&self) -> Scalar {
        self.coefficients[0]
    }

    /// The threshold this polynomial encodes.
    pub fn threshold(&self) -> u8 {
        self.coefficients.len() as u8
    }
}

/// One evaluated point `(x, f(x))` of the secret polynomial.
#[derive(Clone, Copy)]
pub struct SharePoint {
    /// The server's x-coordinate. Never zero: `f(0)` is the secret.
    pub x: Scalar,
    /// The share value `f(x)`.
    pub y: Scalar,
}

/// Map a server id to its x-coordinate in the scalar field.
pub fn server_id_to_scalar(server_id: u8) -> Scalar {
    Scalar::from(server_id as u64)
}

/// Recover `f(0)` from `points` by Lagrange interpolation.
///
/// The points must have distinct x-coordinates. With fewer points than
/// the polynomial's threshold this interpolates the wrong polynomial
/// and returns an unrelated scalar, not an error; quorum counting
/// happens before this is called.
pub fn interpolate_at_zero(points: &[SharePoint]) -> Result<Scalar> {
    if points.is_empty() {
        return Err(ThresholdError::Unauthorized {
            approvals: 0,
            threshold: 1,
        });
    }

    let mut result = Scalar::ZERO;
    for (i, point_i) in points.iter().enumerate() {
        // L_i(0) = prod_{j != i} -x_j / (x_i - x_j)
        let mut basis = Scalar::ONE;
        for (j, point_j) in points.iter().enumerate() {
            if i != j {
                let numerator = -point_j.x;
                let denominator = point_i.x - point_j.x;
                basis *= numerator * denominator.invert();
            }
        }
        result += point_i.y * basis;
    }
    Ok(result)
}
