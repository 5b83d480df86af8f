//! The signature engine the arithmetic is checked against
//!
//! [`SignatureOracle`] is the contract of an external library computing
//! signatures, log-signatures and their derivatives from a path. Paths are
//! matrices with one row per point and one column per coordinate. Signatures
//! travel in the flat concatenated layout.
//!
//! [`ChenOracle`] is a reference implementation built on the arithmetic of
//! this crate: the signature of a piecewise linear path is the product of the
//! exponentials of its increments (Chen's identity).

mod backprop;
mod chen;

pub use chen::{ChenOracle, Prepared};

use crate::{
    algebra::{self, Level},
    error::{Result, SigError},
};
use nalgebra::DMatrix;

/// How a log-signature is computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogSigMethod {
    /// `'c'`: applies a basis pseudo-inverse precomputed at preparation
    Compiled,
    /// `'o'`: accumulates the log-signature segment by segment, then solves
    /// by least squares
    Bracket,
    /// `'s'`: logarithm of the signature, then triangular solve on the
    /// Lyndon words
    Simplified,
    /// `'x'`: logarithm of the signature in full tensor coordinates (so of
    /// length `siglength`, not `logsiglength`)
    Expanded,
}

impl LogSigMethod {
    const ALL: [LogSigMethod; 4] = [
        LogSigMethod::Compiled,
        LogSigMethod::Bracket,
        LogSigMethod::Simplified,
        LogSigMethod::Expanded,
    ];

    pub fn letter(self) -> char {
        match self {
            LogSigMethod::Compiled => 'c',
            LogSigMethod::Bracket => 'o',
            LogSigMethod::Simplified => 's',
            LogSigMethod::Expanded => 'x',
        }
    }

    pub fn from_letter(c: char) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.letter() == c.to_ascii_lowercase())
            .ok_or(SigError::UnknownMethod(c))
    }
}

/// The set of methods a [`Prepared`] handle supports, parsed from letters
/// such as `"cosx"`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MethodSet([bool; 4]);

impl MethodSet {
    pub fn parse(letters: &str) -> Result<Self> {
        let mut set = MethodSet::default();
        for c in letters.chars() {
            set.0[LogSigMethod::from_letter(c)? as usize] = true;
        }
        Ok(set)
    }

    pub fn contains(&self, m: LogSigMethod) -> bool {
        self.0[m as usize]
    }

    /// The method used when none is asked for: the first prepared of
    /// `c`, `o`, `s`
    pub fn default_method(&self) -> Option<LogSigMethod> {
        LogSigMethod::ALL[..3]
            .iter()
            .copied()
            .find(|m| self.contains(*m))
    }

    pub fn iter(&self) -> impl Iterator<Item = LogSigMethod> + '_ {
        LogSigMethod::ALL
            .into_iter()
            .filter(move |m| self.contains(*m))
    }
}

/// Derivative of a flat signature with respect to every coordinate of the
/// path: entry `(i * dim + j, k)` is `d sig[k] / d path[i, j]`
#[derive(Debug, Clone, PartialEq)]
pub struct Jacobian {
    pub points: usize,
    pub dim: usize,
    pub level: Level,
    pub matrix: DMatrix<f64>,
}

impl Jacobian {
    pub fn get(&self, point: usize, coord: usize, component: usize) -> f64 {
        self.matrix[(point * self.dim + coord, component)]
    }

    /// Gradient with respect to the path of `sum_k grad[k] * sig[k]`, as a
    /// `points x dim` matrix
    pub fn contract(&self, grad: &[f64]) -> Result<DMatrix<f64>> {
        if grad.len() != self.matrix.ncols() {
            return Err(SigError::FlatLengthMismatch {
                shape: algebra::Shape::new(self.dim, self.level),
                expected: self.matrix.ncols(),
                found: grad.len(),
            });
        }
        let flat = &self.matrix * nalgebra::DVector::from_column_slice(grad);
        Ok(DMatrix::from_fn(self.points, self.dim, |i, j| {
            flat[i * self.dim + j]
        }))
    }

    /// First-order change of the signature when the path moves by `bump`
    pub fn directional(&self, bump: &DMatrix<f64>) -> Result<Vec<f64>> {
        if bump.shape() != (self.points, self.dim) {
            return Err(SigError::PathDimension {
                expected: self.dim,
                found: bump.ncols(),
            });
        }
        let flat = nalgebra::DVector::from_fn(self.points * self.dim, |r, _| {
            bump[(r / self.dim, r % self.dim)]
        });
        Ok((self.matrix.transpose() * flat).iter().copied().collect())
    }
}

/// An engine computing signatures, log-signatures and their derivatives
pub trait SignatureOracle {
    /// Whatever is precomputed for a given dimension, level and method set
    type Handle;

    /// Precompute what log-signatures need for `(dim, level)` and the given
    /// method letters
    fn prepare(&self, dim: usize, level: Level, methods: &str) -> Result<Self::Handle>;

    fn siglength(&self, dim: usize, level: Level) -> usize {
        algebra::siglength(dim, level)
    }

    fn logsiglength(&self, dim: usize, level: Level) -> usize {
        algebra::logsiglength(dim, level)
    }

    /// The Hall basis as bracket strings, in log-signature order
    fn basis(&self, handle: &Self::Handle) -> Vec<String>;

    /// Flat signature of a path, of length `siglength(dim, level)`
    fn signature(&self, path: &DMatrix<f64>, level: Level) -> Result<Vec<f64>>;

    /// Log-signature of a path in the basis of `handle`. `None` picks the
    /// handle's default method
    fn log_signature(
        &self,
        path: &DMatrix<f64>,
        handle: &Self::Handle,
        method: Option<LogSigMethod>,
    ) -> Result<Vec<f64>>;

    /// Extend a signature by one straight increment. When `fixed_last` is
    /// given, the increment lacks the last coordinate, which takes that value
    fn sig_join(
        &self,
        prev: &[f64],
        increment: &[f64],
        level: Level,
        fixed_last: Option<f64>,
    ) -> Result<Vec<f64>>;

    /// Gradients of `sum_k grad[k] * sig_join(prev, increment)[k]` with
    /// respect to `prev` and to `increment`
    fn sig_join_backprop(
        &self,
        grad: &[f64],
        prev: &[f64],
        increment: &[f64],
        level: Level,
        fixed_last: Option<f64>,
    ) -> Result<(Vec<f64>, Vec<f64>)>;

    fn sig_jacobian(&self, path: &DMatrix<f64>, level: Level) -> Result<Jacobian>;

    /// Gradient with respect to the path of `sum_k grad[k] * sig[k]`
    fn sig_backprop(
        &self,
        grad: &[f64],
        path: &DMatrix<f64>,
        level: Level,
    ) -> Result<DMatrix<f64>>;
}
