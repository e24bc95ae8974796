//! Precomputed tables of Wigner small-d rotation-matrix elements for integer
//! angular momenta.

use std::error::Error;
use std::f64::consts;
use std::fmt;

use approx;
use factorial::Factorial;
use itertools::Itertools;
use ndarray::Array2;
use num::BigUint;
use num_traits::{cast::ToPrimitive, Zero};

#[cfg(test)]
#[path = "wigner_small_d_tests.rs"]
mod wigner_small_d_tests;

/// Absolute tolerance on the reduced rotation angle below which $`\beta`$ is
/// treated as an exact multiple of $`\pi`$ or $`2\pi`$.
const SINGULAR_ANGLE_THRESH: f64 = 1e-12;

/// Errors that can arise when building or querying a [`WignerSmallDTable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WignerSmallDError {
    /// The requested maximum angular momentum is negative.
    InvalidDomain {
        /// The offending maximum angular momentum.
        l_max: i64,
    },

    /// A queried index lies outside the bounds fixed at construction.
    IndexOutOfRange {
        /// Name of the offending index.
        index: &'static str,

        /// The offending value.
        value: i64,

        /// Lower bound (inclusive) of the valid range.
        lo: i64,

        /// Upper bound (inclusive) of the valid range.
        hi: i64,
    },
}

impl fmt::Display for WignerSmallDError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::InvalidDomain { l_max } => {
                write!(f, "Invalid domain: `l_max` = {l_max} must be non-negative.")
            }
            Self::IndexOutOfRange {
                index,
                value,
                lo,
                hi,
            } => {
                write!(f, "Index `{index}` = {value} lies outside [{lo}, {hi}].")
            }
        }
    }
}

impl Error for WignerSmallDError {}

/// Returns the sign factor $`(-1)^k`$.
fn parity(k: i64) -> f64 {
    if k.rem_euclid(2) == 0 {
        1.0
    } else {
        -1.0
    }
}

/// Calculates the binomial coefficient $`\binom{n}{r}`$ exactly.
///
/// If $`r > n`$, `0` is returned.
///
/// # Arguments
///
/// * `n` - Number of things.
/// * `r` - Number of elements taken.
///
/// # Returns
///
/// The binomial coefficient.
fn binomial(n: u32, r: u32) -> BigUint {
    if r > n {
        BigUint::zero()
    } else {
        (n - r + 1..=n).product::<BigUint>()
            / BigUint::from(r)
                .checked_factorial()
                .unwrap_or_else(|| panic!("Unable to compute the factorial of {r}."))
    }
}

/// Classification of a rotation angle after reduction modulo $`2\pi`$.
///
/// The closed-form expressions for $`d^{j}_{mn}(\beta)`$ develop removable
/// indeterminacies when $`\beta`$ is a multiple of $`\pi`$, so these cases are
/// dispatched to their known limiting values instead of being evaluated
/// generically.
#[derive(Debug, Clone, Copy, PartialEq)]
enum ReducedAngleClass {
    /// $`\beta \equiv 0 \pmod{2\pi}`$.
    Zero,

    /// $`\beta \equiv \pi \pmod{2\pi}`$.
    Pi,

    /// A generic angle, carrying $`\cos(\beta/2)`$ and $`\sin(\beta/2)`$ of
    /// the reduced angle.
    Generic { cos_hb: f64, sin_hb: f64 },
}

/// Reduces `beta` into $`[0, 2\pi)`$ and classifies it.
///
/// The singular classes are detected with an absolute tolerance of
/// [`SINGULAR_ANGLE_THRESH`] on the reduced angle, so that angles merely close
/// to a multiple of $`\pi`$ still take the generic branch.
fn classify_angle(beta: f64) -> ReducedAngleClass {
    let reduced = beta.rem_euclid(consts::TAU);
    // rem_euclid maps tiny negative angles to values just below 2π, so both
    // ends of the interval belong to the `Zero` class.
    if approx::abs_diff_eq!(reduced, 0.0, epsilon = SINGULAR_ANGLE_THRESH)
        || approx::abs_diff_eq!(reduced, consts::TAU, epsilon = SINGULAR_ANGLE_THRESH)
    {
        ReducedAngleClass::Zero
    } else if approx::abs_diff_eq!(reduced, consts::PI, epsilon = SINGULAR_ANGLE_THRESH) {
        ReducedAngleClass::Pi
    } else {
        ReducedAngleClass::Generic {
            cos_hb: (reduced / 2.0).cos(),
            sin_hb: (reduced / 2.0).sin(),
        }
    }
}

/// Returns the edge element $`d^{j}_{jn}(\beta)`$ from its closed form
///
/// ```math
/// d^{j}_{jn}(\beta) = (-1)^{j-n} \sqrt{\binom{2j}{j-n}}
///     \cos^{j+n}\left(\frac{\beta}{2}\right)
///     \sin^{j-n}\left(\frac{\beta}{2}\right),
/// ```
///
/// with the binomial coefficient evaluated exactly before conversion to
/// floating point.
fn edge_element(j: i64, n: i64, cos_hb: f64, sin_hb: f64) -> f64 {
    let ju = u32::try_from(j).expect("Unable to convert `j` to `u32`.");
    let jmnu = u32::try_from(j - n).expect("Unable to convert `j - n` to `u32`.");
    let binom = binomial(2 * ju, jmnu).to_f64().unwrap_or_else(|| {
        panic!(
            "Unable to convert the binomial coefficient C({}, {jmnu}) to `f64`.",
            2 * ju
        )
    });
    let cos_pow = i32::try_from(j + n).expect("Unable to convert `j + n` to `i32`.");
    let sin_pow = i32::try_from(j - n).expect("Unable to convert `j - n` to `i32`.");
    parity(j - n) * binom.sqrt() * cos_hb.powi(cos_pow) * sin_hb.powi(sin_pow)
}

/// Computes the full $`(2j+1) \times (2j+1)`$ block of $`d^{j}_{mn}(\beta)`$
/// at a generic angle, given the blocks for all lower angular momenta.
///
/// Representative elements with $`m \ge |n|`$ are computed directly: those on
/// the $`m = j`$ edge from the closed form in [`edge_element`], the rest from
/// the three-term recursion in $`j`$
///
/// ```math
/// d^{j}_{mn} = \frac{j(2j-1)}{\sqrt{(j^2-m^2)(j^2-n^2)}}
///     \left[ \left(\cos\beta - \frac{mn}{j(j-1)}\right) d^{j-1}_{mn}
///     - \frac{\sqrt{((j-1)^2-m^2)((j-1)^2-n^2)}}{(j-1)(2j-1)}
///       d^{j-2}_{mn} \right],
/// ```
///
/// seeded entirely by edge closed forms. The remaining elements follow from
/// the reflection identities
///
/// ```math
/// d^{j}_{nm} = (-1)^{m-n} d^{j}_{mn}, \qquad
/// d^{j}_{-m,-n} = (-1)^{m-n} d^{j}_{mn}, \qquad
/// d^{j}_{-n,-m} = d^{j}_{mn},
/// ```
///
/// applied as exact sign flips of the representatives.
fn generic_block(j: i64, cos_hb: f64, sin_hb: f64, lower: &[Array2<f64>]) -> Array2<f64> {
    let dim = usize::try_from(2 * j + 1).expect("Unable to convert `2j + 1` to `usize`.");
    let mut d = Array2::<f64>::zeros((dim, dim));
    let cos_b = cos_hb * cos_hb - sin_hb * sin_hb;

    let idx = |m: i64, n: i64| {
        (
            usize::try_from(m + j).expect("Unable to convert `m + j` to `usize`."),
            usize::try_from(n + j).expect("Unable to convert `n + j` to `usize`."),
        )
    };

    // All three reflections of a non-representative (m, n) land on rows with
    // larger m, so a descending-m sweep has already filled them in.
    for (m, n) in (-j..=j).rev().cartesian_product(-j..=j) {
        let value = if m >= n.abs() {
            if m == j {
                edge_element(j, n, cos_hb, sin_hb)
            } else {
                let jm1 = j - 1;
                let prev = &lower[usize::try_from(jm1)
                    .expect("Unable to convert `j - 1` to `usize`.")];
                let d1 = prev[(
                    usize::try_from(m + jm1).expect("Unable to convert `m + j - 1` to `usize`."),
                    usize::try_from(n + jm1).expect("Unable to convert `n + j - 1` to `usize`."),
                )];
                let c_num = (j * (2 * j - 1))
                    .to_f64()
                    .unwrap_or_else(|| panic!("Unable to convert `{}` to `f64`.", j * (2 * j - 1)));
                let c_den = ((j * j - m * m) * (j * j - n * n))
                    .to_f64()
                    .unwrap_or_else(|| {
                        panic!(
                            "Unable to convert `{}` to `f64`.",
                            (j * j - m * m) * (j * j - n * n)
                        )
                    })
                    .sqrt();
                // m = n = 0 is the only representative reachable at j = 1, so
                // the mn/(j(j-1)) shift vanishes there.
                let shift = if j > 1 {
                    (m * n)
                        .to_f64()
                        .unwrap_or_else(|| panic!("Unable to convert `{}` to `f64`.", m * n))
                        / (j * jm1)
                            .to_f64()
                            .unwrap_or_else(|| panic!("Unable to convert `{}` to `f64`.", j * jm1))
                } else {
                    0.0
                };
                // Elements absent from the (j - 2) block enter the recursion
                // with weight zero.
                let sub = if m.abs() <= j - 2 && n.abs() <= j - 2 {
                    let prev2 = &lower[usize::try_from(j - 2)
                        .expect("Unable to convert `j - 2` to `usize`.")];
                    let d2 = prev2[(
                        usize::try_from(m + j - 2)
                            .expect("Unable to convert `m + j - 2` to `usize`."),
                        usize::try_from(n + j - 2)
                            .expect("Unable to convert `n + j - 2` to `usize`."),
                    )];
                    let s_num = ((jm1 * jm1 - m * m) * (jm1 * jm1 - n * n))
                        .to_f64()
                        .unwrap_or_else(|| {
                            panic!(
                                "Unable to convert `{}` to `f64`.",
                                (jm1 * jm1 - m * m) * (jm1 * jm1 - n * n)
                            )
                        })
                        .sqrt();
                    let s_den = (jm1 * (2 * j - 1)).to_f64().unwrap_or_else(|| {
                        panic!("Unable to convert `{}` to `f64`.", jm1 * (2 * j - 1))
                    });
                    s_num / s_den * d2
                } else {
                    0.0
                };
                c_num / c_den * ((cos_b - shift) * d1 - sub)
            }
        } else if n > m.abs() {
            parity(m - n) * d[idx(n, m)]
        } else if -n > m.abs() {
            d[idx(-n, -m)]
        } else {
            parity(m - n) * d[idx(-m, -n)]
        };
        d[idx(m, n)] = value;
    }
    d
}

/// Returns the limiting block at $`\beta \equiv \pi \pmod{2\pi}`$,
/// $`d^{j}_{mn}(\pi) = (-1)^{j-m} \delta_{m,-n}`$.
fn pi_block(j: i64) -> Array2<f64> {
    let dim = usize::try_from(2 * j + 1).expect("Unable to convert `2j + 1` to `usize`.");
    Array2::from_shape_fn((dim, dim), |(mi, ni)| {
        let m = i64::try_from(mi).expect("Unable to convert `mi` to `i64`.") - j;
        let n = i64::try_from(ni).expect("Unable to convert `ni` to `i64`.") - j;
        if n == -m {
            parity(j - m)
        } else {
            0.0
        }
    })
}

/// A precomputed table of Wigner small-d rotation-matrix elements
/// $`d^{j}_{mn}(\beta)`$ defined by
///
/// ```math
/// \hat{R}(\beta) \ket{jm}
/// = \sum_{m'} \ket{jm'} d^{(j)}_{m'm}(\beta)
/// ```
///
/// for a rotation by $`\beta`$ about the space-fixed $`y`$-axis, covering all
/// integer angular momenta $`0 \le j \le l_{\mathrm{max}}`$ and all
/// projections $`|m|, |n| \le j`$.
///
/// The table is built eagerly at construction and is immutable afterwards, so
/// a completed table can be shared freely between readers. Within each block,
/// rows and columns are arranged in increasing order of $`m`$ and $`n`$.
#[derive(Debug, Clone, PartialEq)]
pub struct WignerSmallDTable {
    /// The maximum angular momentum covered by the table.
    l_max: i64,

    /// The rotation angle in radians, as supplied by the caller.
    beta: f64,

    /// One $`(2j+1) \times (2j+1)`$ block per angular momentum $`j`$.
    blocks: Vec<Array2<f64>>,
}

impl WignerSmallDTable {
    /// Builds the table of $`d^{j}_{mn}(\beta)`$ for all
    /// $`0 \le j \le l_{\mathrm{max}}`$.
    ///
    /// The angle is reduced modulo $`2\pi`$ and the singular classes
    /// $`\beta \equiv 0`$ and $`\beta \equiv \pi \pmod{2\pi}`$ are dispatched
    /// to their limiting values, $`\delta_{mn}`$ and
    /// $`(-1)^{j-m}\delta_{m,-n}`$ respectively. Generic angles are handled by
    /// [`generic_block`].
    ///
    /// # Arguments
    ///
    /// * `l_max` - The maximum angular momentum to cover.
    /// * `beta` - The rotation angle in radians. Any finite value is
    ///   accepted.
    ///
    /// # Returns
    ///
    /// The completed table.
    ///
    /// # Errors
    ///
    /// [`WignerSmallDError::InvalidDomain`] if `l_max` is negative.
    pub fn build(l_max: i64, beta: f64) -> Result<Self, WignerSmallDError> {
        if l_max < 0 {
            return Err(WignerSmallDError::InvalidDomain { l_max });
        }
        let class = classify_angle(beta);
        log::debug!(
            "Building Wigner small-d table up to l_max = {l_max} at β = {beta} ({class:?})."
        );
        let n_blocks =
            usize::try_from(l_max + 1).expect("Unable to convert `l_max + 1` to `usize`.");
        let mut blocks = Vec::with_capacity(n_blocks);
        for j in 0..=l_max {
            let dim = usize::try_from(2 * j + 1).expect("Unable to convert `2j + 1` to `usize`.");
            let block = match class {
                ReducedAngleClass::Zero => Array2::<f64>::eye(dim),
                ReducedAngleClass::Pi => pi_block(j),
                ReducedAngleClass::Generic { cos_hb, sin_hb } => {
                    generic_block(j, cos_hb, sin_hb, &blocks)
                }
            };
            blocks.push(block);
        }
        Ok(Self {
            l_max,
            beta,
            blocks,
        })
    }

    /// Returns the element $`d^{j}_{mn}(\beta)`$ stored in the table.
    ///
    /// # Arguments
    ///
    /// * `j` - The angular momentum, $`0 \le j \le l_{\mathrm{max}}`$.
    /// * `m` - The row projection, $`|m| \le j`$.
    /// * `n` - The column projection, $`|n| \le j`$.
    ///
    /// # Returns
    ///
    /// The precomputed element. No recomputation is performed.
    ///
    /// # Errors
    ///
    /// [`WignerSmallDError::IndexOutOfRange`] identifying the offending index
    /// if any of the preconditions above is violated.
    pub fn djmn(&self, j: i64, m: i64, n: i64) -> Result<f64, WignerSmallDError> {
        if j < 0 || j > self.l_max {
            return Err(WignerSmallDError::IndexOutOfRange {
                index: "j",
                value: j,
                lo: 0,
                hi: self.l_max,
            });
        }
        if m.abs() > j {
            return Err(WignerSmallDError::IndexOutOfRange {
                index: "m",
                value: m,
                lo: -j,
                hi: j,
            });
        }
        if n.abs() > j {
            return Err(WignerSmallDError::IndexOutOfRange {
                index: "n",
                value: n,
                lo: -j,
                hi: j,
            });
        }
        let ju = usize::try_from(j).expect("Unable to convert `j` to `usize`.");
        let mi = usize::try_from(m + j).expect("Unable to convert `m + j` to `usize`.");
        let ni = usize::try_from(n + j).expect("Unable to convert `n + j` to `usize`.");
        Ok(self.blocks[ju][(mi, ni)])
    }

    /// Returns a reference to the whole $`(2j+1) \times (2j+1)`$ block for
    /// angular momentum `j`, with rows and columns ordered by increasing
    /// $`m`$ and $`n`$.
    ///
    /// # Errors
    ///
    /// [`WignerSmallDError::IndexOutOfRange`] if `j` lies outside
    /// $`[0, l_{\mathrm{max}}]`$.
    pub fn block(&self, j: i64) -> Result<&Array2<f64>, WignerSmallDError> {
        if j < 0 || j > self.l_max {
            return Err(WignerSmallDError::IndexOutOfRange {
                index: "j",
                value: j,
                lo: 0,
                hi: self.l_max,
            });
        }
        let ju = usize::try_from(j).expect("Unable to convert `j` to `usize`.");
        Ok(&self.blocks[ju])
    }

    /// The maximum angular momentum covered by the table.
    pub fn l_max(&self) -> i64 {
        self.l_max
    }

    /// The rotation angle in radians, as supplied at construction.
    pub fn beta(&self) -> f64 {
        self.beta
    }
}
