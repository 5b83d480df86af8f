//! Reference signatures by Chen's identity

use super::{
    backprop::{exp_backprop, exp_tangent, mul_backprop},
    Jacobian, LogSigMethod, MethodSet, SignatureOracle,
};
use crate::{
    algebra::{Algebra, Level, Shape},
    arith::{accumulate_product, segment_exp},
    error::{Result, SigError},
    hall::lyndon_basis,
    lie::Basis,
    series::{GroupSeries, LieSeries, TensorSeries},
};
use nalgebra::DMatrix;

/// Computes signatures as `exp(Δ_1) · exp(Δ_2) · ... · exp(Δ_n)` over the
/// increments `Δ_i` of a piecewise linear path, log-signatures in the Lyndon
/// basis, and exact derivatives of both
#[derive(Debug, Default, Clone, Copy)]
pub struct ChenOracle;

/// What [`ChenOracle::prepare`] precomputes for one `(dim, level)`
#[derive(Debug, Clone)]
pub struct Prepared {
    shape: Shape,
    methods: MethodSet,
    basis: Basis,
    /// Only when [`LogSigMethod::Compiled`] was prepared
    pseudo_inverse: Option<DMatrix<f64>>,
}

impl Prepared {
    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn methods(&self) -> MethodSet {
        self.methods
    }

    pub fn lie_basis(&self) -> &Basis {
        &self.basis
    }
}

/// The increments between consecutive rows of a path
fn increments(path: &DMatrix<f64>) -> Result<Vec<Vec<f64>>> {
    if path.nrows() == 0 {
        return Err(SigError::EmptyPath);
    }
    Ok((1..path.nrows())
        .map(|i| (path.row(i) - path.row(i - 1)).iter().copied().collect())
        .collect())
}

/// The increment with the fixed last coordinate appended, if any
fn full_increment(increment: &[f64], fixed_last: Option<f64>) -> Vec<f64> {
    let mut full = increment.to_vec();
    full.extend(fixed_last);
    full
}

/// Signatures of the path prefixes: entry `i` is the signature of the first
/// `i` segments, so the last entry is the signature of the whole path
fn prefix_signatures(incs: &[Vec<f64>], shape: Shape) -> Result<Vec<GroupSeries>> {
    let mut prefixes = Vec::with_capacity(incs.len() + 1);
    prefixes.push(GroupSeries::identity(shape));
    for (i, inc) in incs.iter().enumerate() {
        let next = prefixes[i].mul(&segment_exp(inc, shape.level))?;
        prefixes.push(next);
    }
    Ok(prefixes)
}

fn path_signature(path: &DMatrix<f64>, level: Level) -> Result<GroupSeries> {
    let shape = Shape::try_new(path.ncols(), level)?;
    let incs = increments(path)?;
    incs.iter().try_fold(GroupSeries::identity(shape), |sig, inc| {
        sig.mul(&segment_exp(inc, level))
    })
}

impl SignatureOracle for ChenOracle {
    type Handle = Prepared;

    fn prepare(&self, dim: usize, level: Level, methods: &str) -> Result<Prepared> {
        let shape = Shape::try_new(dim, level)?;
        let methods = MethodSet::parse(methods)?;
        let basis = lyndon_basis(shape)?;
        let pseudo_inverse = if methods.contains(LogSigMethod::Compiled) {
            Some(basis.pseudo_inverse()?)
        } else {
            None
        };
        Ok(Prepared {
            shape,
            methods,
            basis,
            pseudo_inverse,
        })
    }

    fn basis(&self, handle: &Prepared) -> Vec<String> {
        handle.basis.strings()
    }

    fn signature(&self, path: &DMatrix<f64>, level: Level) -> Result<Vec<f64>> {
        Ok(path_signature(path, level)?.to_flat())
    }

    fn log_signature(
        &self,
        path: &DMatrix<f64>,
        handle: &Prepared,
        method: Option<LogSigMethod>,
    ) -> Result<Vec<f64>> {
        if path.ncols() != handle.shape.dim {
            return Err(SigError::PathDimension {
                expected: handle.shape.dim,
                found: path.ncols(),
            });
        }
        let method = match method.or_else(|| handle.methods.default_method()) {
            Some(m) if handle.methods.contains(m) => m,
            Some(m) => return Err(SigError::MethodNotPrepared(m.letter())),
            None => return Err(SigError::MethodNotPrepared('c')),
        };
        let level = handle.shape.level;
        match method {
            LogSigMethod::Compiled => {
                let pinv = handle
                    .pseudo_inverse
                    .as_ref()
                    .ok_or(SigError::MethodNotPrepared('c'))?;
                let full = path_signature(path, level)?.log();
                handle.basis.project_with(pinv, &full)
            }
            LogSigMethod::Bracket => {
                let mut z = LieSeries::zeros(handle.shape);
                for inc in increments(path)? {
                    z = z.exp().mul(&segment_exp(&inc, level))?.log();
                }
                handle.basis.project_least_squares(&z)
            }
            LogSigMethod::Simplified => {
                let full = path_signature(path, level)?.log();
                handle.basis.project_lyndon(&full)
            }
            LogSigMethod::Expanded => Ok(path_signature(path, level)?.log().to_flat()),
        }
    }

    fn sig_join(
        &self,
        prev: &[f64],
        increment: &[f64],
        level: Level,
        fixed_last: Option<f64>,
    ) -> Result<Vec<f64>> {
        let full = full_increment(increment, fixed_last);
        let shape = Shape::try_new(full.len(), level)?;
        let prev = GroupSeries::from_flat(prev, shape)?;
        Ok(prev.mul(&segment_exp(&full, level))?.to_flat())
    }

    fn sig_join_backprop(
        &self,
        grad: &[f64],
        prev: &[f64],
        increment: &[f64],
        level: Level,
        fixed_last: Option<f64>,
    ) -> Result<(Vec<f64>, Vec<f64>)> {
        let full = full_increment(increment, fixed_last);
        let shape = Shape::try_new(full.len(), level)?;
        let grad = TensorSeries::split(grad, shape)?;
        let prev = GroupSeries::from_flat(prev, shape)?;
        let (grad_prev, grad_exp) = mul_backprop(&grad, &prev, &segment_exp(&full, level));
        let mut grad_inc = exp_backprop(&grad_exp, &full);
        grad_inc.truncate(increment.len());
        Ok((grad_prev.join(), grad_inc))
    }

    fn sig_jacobian(&self, path: &DMatrix<f64>, level: Level) -> Result<Jacobian> {
        let shape = Shape::try_new(path.ncols(), level)?;
        let dim = shape.dim;
        let incs = increments(path)?;
        let prefixes = prefix_signatures(&incs, shape)?;
        // suffixes[i]: signature of the segments after segment i
        let mut suffixes = vec![GroupSeries::identity(shape); incs.len()];
        for i in (0..incs.len().saturating_sub(1)).rev() {
            suffixes[i] = segment_exp(&incs[i + 1], level).mul(&suffixes[i + 1])?;
        }
        let mut matrix = DMatrix::zeros(path.nrows() * dim, shape.sig_len());
        for (i, inc) in incs.iter().enumerate() {
            for k in 0..dim {
                // (1 + s) t (1 + r) = u + u r, where u = t + s t
                let tangent = exp_tangent(inc, k, level);
                let mut u = tangent.clone();
                accumulate_product(&mut u, &prefixes[i], &tangent, 1.0);
                let mut full = u.clone();
                accumulate_product(&mut full, &u, &suffixes[i], 1.0);
                for (c, x) in full.join().into_iter().enumerate() {
                    matrix[((i + 1) * dim + k, c)] += x;
                    matrix[(i * dim + k, c)] -= x;
                }
            }
        }
        Ok(Jacobian {
            points: path.nrows(),
            dim,
            level,
            matrix,
        })
    }

    fn sig_backprop(
        &self,
        grad: &[f64],
        path: &DMatrix<f64>,
        level: Level,
    ) -> Result<DMatrix<f64>> {
        let shape = Shape::try_new(path.ncols(), level)?;
        let incs = increments(path)?;
        let prefixes = prefix_signatures(&incs, shape)?;
        let mut grad = TensorSeries::split(grad, shape)?;
        let mut res = DMatrix::zeros(path.nrows(), shape.dim);
        for (i, inc) in incs.iter().enumerate().rev() {
            let (grad_prev, grad_exp) =
                mul_backprop(&grad, &prefixes[i], &segment_exp(inc, level));
            for (j, g) in exp_backprop(&grad_exp, inc).into_iter().enumerate() {
                res[(i + 1, j)] += g;
                res[(i, j)] -= g;
            }
            grad = grad_prev;
        }
        Ok(res)
    }
}
