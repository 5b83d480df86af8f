//! Describe a truncated tensor algebra over which computations may be done
//!
//! An [`Algebra`] tells how many generators the underlying vector space has,
//! and at which level the tensor algebra is truncated. From these two numbers
//! follow the length of each level, of a flat signature, and of a
//! log-signature.

use crate::error::{Result, SigError};
use num_integer::Integer;

// # TYPES & TRAITS //

/// Levels are just regular positive integers, level `m` holding the
/// degree-`m` homogeneous part. Alias introduced for clarity
pub type Level = usize;

/// The description of a tensor algebra over some vector space (over the field
/// of reals, [`f64`] here), truncated above some level
pub trait Algebra {
    /// The dimensionality `d` of the underlying vector space
    fn vec_space_dim(&self) -> usize;

    /// The truncation level `L`
    fn level(&self) -> Level;

    /// The number of components of level `m`, ie. `d^m`. Saturates at
    /// `usize::MAX`
    fn level_dim(&self, m: Level) -> usize {
        self.vec_space_dim().saturating_pow(m as u32)
    }

    /// Where level `m` starts in a flat concatenated tensor. Saturates at
    /// `usize::MAX`
    fn level_offset(&self, m: Level) -> usize {
        (1..m)
            .map(|k| self.level_dim(k))
            .fold(0, usize::saturating_add)
    }

    /// Length of a flat signature: `d + d^2 + ... + d^L`. Saturates at
    /// `usize::MAX`, see [`Shape::try_new`] to detect it
    fn sig_len(&self) -> usize {
        self.level_offset(self.level() + 1)
    }

    /// Length of a log-signature, ie. the dimension of the free Lie algebra
    /// truncated at level `L`. Witt's formula, summed over the levels.
    /// Saturates at `usize::MAX`
    fn log_sig_len(&self) -> usize {
        (1..=self.level())
            .try_fold(0usize, |acc, m| {
                acc.checked_add(witt_dim(self.vec_space_dim(), m)?)
            })
            .unwrap_or(usize::MAX)
    }
}

/// The pair `(d, L)` identifying a truncated tensor algebra. Every series
/// carries one, and binary operations refuse operands of different shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shape {
    pub dim: usize,
    pub level: Level,
}

impl Shape {
    /// No check is done: lengths of a shape too large to index saturate at
    /// `usize::MAX`
    pub const fn new(dim: usize, level: Level) -> Self {
        Shape { dim, level }
    }

    /// Like [`Shape::new`], but fails if a flat tensor of that shape could
    /// not be indexed
    pub fn try_new(dim: usize, level: Level) -> Result<Self> {
        (1..=level)
            .try_fold((0usize, 1usize), |(total, cur), _| {
                let cur = cur.checked_mul(dim)?;
                Some((total.checked_add(cur)?, cur))
            })
            .map(|_| Shape { dim, level })
            .ok_or(SigError::Overflow { dim, level })
    }

    /// Fails unless `self` and `other` are the same algebra
    pub fn ensure_eq(self, other: Shape) -> Result<()> {
        if self == other {
            Ok(())
        } else {
            Err(SigError::ShapeMismatch {
                left: self,
                right: other,
            })
        }
    }
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(d={}, L={})", self.dim, self.level)
    }
}

impl Algebra for Shape {
    fn vec_space_dim(&self) -> usize {
        self.dim
    }
    fn level(&self) -> Level {
        self.level
    }
}

/// Representation of an [`Algebra`] as a plain `(dim, level)` tuple
impl Algebra for (usize, Level) {
    fn vec_space_dim(&self) -> usize {
        self.0
    }
    fn level(&self) -> Level {
        self.1
    }
}

// # UTILITY FUNCTIONS //

/// Closed-form length of a flat signature for `(d, L)`
pub fn siglength(dim: usize, level: Level) -> usize {
    (dim, level).sig_len()
}

/// Closed-form length of a log-signature for `(d, L)`
pub fn logsiglength(dim: usize, level: Level) -> usize {
    (dim, level).log_sig_len()
}

/// Möbius function
fn mobius(n: usize) -> i64 {
    let mut n = n;
    let mut res = 1;
    let mut p = 2;
    while p * p <= n {
        if Integer::is_multiple_of(&n, &p) {
            n /= p;
            if Integer::is_multiple_of(&n, &p) {
                return 0;
            }
            res = -res;
        }
        p += 1;
    }
    if n > 1 {
        res = -res;
    }
    res
}

/// Number of Lyndon words of length `m` over `d` letters:
/// `(1/m) sum_{k | m} mu(k) d^(m/k)`. None if it does not fit a `usize`
fn witt_dim(d: usize, m: Level) -> Option<usize> {
    let d = d as i128;
    let sum = (1..=m)
        .filter(|k| Integer::is_multiple_of(&m, k))
        .try_fold(0i128, |acc, k| {
            let term = d.checked_pow(u32::try_from(m / k).ok()?)?;
            acc.checked_add(i128::from(mobius(k)) * term)
        })?;
    usize::try_from(sum / m as i128).ok()
}

/// Position of a word (letters in `1..=d`) in its level, most significant
/// letter first. This is the row-major convention of the outer products
pub fn word_to_index(word: &[usize], dim: usize) -> usize {
    word.iter().fold(0, |acc, &l| acc * dim + (l - 1))
}
