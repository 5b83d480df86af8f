//! Cross-checks of a [`SignatureOracle`] against the tensor arithmetic of
//! this crate
//!
//! Each check returns the discrepancies it measured, leaving the tolerances
//! to the caller.

use crate::{
    algebra::{Algebra, Level, Shape},
    error::{Result, SigError},
    lie::Basis,
    oracle::{LogSigMethod, MethodSet, SignatureOracle},
    series::{max_abs_diff, nan_max, GroupSeries},
};
use nalgebra::DMatrix;

/// Discrepancies between the oracle's signature, log-signature and basis
#[derive(Debug, Clone, PartialEq)]
pub struct LogSigReport {
    /// Whether the basis, log-signature and signature have the closed-form
    /// lengths
    pub lengths_consistent: bool,
    /// `exp` of the expanded log-signature vs the signature
    pub sig_from_logsig: f64,
    /// `log` of the signature vs the oracle's expanded log-signature
    pub logsig_from_sig: f64,
    /// Least-squares basis coordinates of `log(sig)` vs the log-signature
    pub projection: f64,
    /// For each other prepared method, its log-signature vs the least-squares
    /// coordinates
    pub methods: Vec<(LogSigMethod, f64)>,
}

impl LogSigReport {
    /// The largest discrepancy of the report, NaN if any of them is
    pub fn worst(&self) -> f64 {
        [self.sig_from_logsig, self.logsig_from_sig, self.projection]
            .into_iter()
            .chain(self.methods.iter().map(|(_, d)| *d))
            .fold(0.0, nan_max)
    }
}

fn ensure_len(v: &[f64], shape: Shape, expected: usize) -> Result<()> {
    if v.len() == expected {
        Ok(())
    } else {
        Err(SigError::FlatLengthMismatch {
            shape,
            expected,
            found: v.len(),
        })
    }
}

/// Check that the oracle's basis, log-signature and signature of `path` are
/// compatible with each other. `methods` are the method letters to prepare,
/// in either case; `'x'` must be one of them
pub fn logsig_consistency<O: SignatureOracle>(
    oracle: &O,
    path: &DMatrix<f64>,
    level: Level,
    methods: &str,
) -> Result<LogSigReport> {
    let dim = path.ncols();
    let shape = Shape::try_new(dim, level)?;
    let prepared = MethodSet::parse(methods)?;
    let handle = oracle.prepare(dim, level, methods)?;
    let basis = Basis::from_strings(shape, &oracle.basis(&handle))?;
    let logsig = oracle.log_signature(path, &handle, None)?;
    let sig = oracle.signature(path, level)?;

    let lengths_consistent = basis.len() == oracle.logsiglength(dim, level)
        && logsig.len() == basis.len()
        && sig.len() == oracle.siglength(dim, level);

    let calculated_sig = basis.expand(&logsig)?.exp();
    ensure_len(&sig, shape, calculated_sig.to_flat().len())?;
    let sig_from_logsig = max_abs_diff(&sig, &calculated_sig.to_flat())?;

    let full_log = GroupSeries::from_flat(&sig, shape)?.log();
    let lib_full = oracle.log_signature(path, &handle, Some(LogSigMethod::Expanded))?;
    ensure_len(&lib_full, shape, full_log.to_flat().len())?;
    let logsig_from_sig = max_abs_diff(&lib_full, &full_log.to_flat())?;

    let calculated = basis.project_least_squares(&full_log)?;
    let projection = max_abs_diff(&logsig, &calculated)?;

    let mut per_method = Vec::new();
    for method in [
        LogSigMethod::Compiled,
        LogSigMethod::Bracket,
        LogSigMethod::Simplified,
    ] {
        if !prepared.contains(method) {
            continue;
        }
        let other = oracle.log_signature(path, &handle, Some(method))?;
        per_method.push((method, max_abs_diff(&other, &calculated)?));
    }

    Ok(LogSigReport {
        lengths_consistent,
        sig_from_logsig,
        logsig_from_sig,
        projection,
        methods: per_method,
    })
}

/// The increments of `path`, without the last column when it is a fixed
/// channel
fn join_increments(path: &DMatrix<f64>, fixed_last: Option<f64>) -> Result<Vec<Vec<f64>>> {
    let cols = path
        .ncols()
        .checked_sub(usize::from(fixed_last.is_some()))
        .ok_or(SigError::PathDimension {
            expected: 1,
            found: path.ncols(),
        })?;
    Ok((1..path.nrows())
        .map(|i| {
            (0..cols)
                .map(|j| path[(i, j)] - path[(i - 1, j)])
                .collect()
        })
        .collect())
}

/// Signature of `path` built by joining its increments one by one onto the
/// identity. With `fixed_last`, the last column of the path must advance by
/// exactly that value at each step
pub fn stepwise_signature<O: SignatureOracle>(
    oracle: &O,
    path: &DMatrix<f64>,
    level: Level,
    fixed_last: Option<f64>,
) -> Result<Vec<f64>> {
    let mut joinee = vec![0.0; oracle.siglength(path.ncols(), level)];
    for inc in join_increments(path, fixed_last)? {
        joinee = oracle.sig_join(&joinee, &inc, level, fixed_last)?;
    }
    Ok(joinee)
}

/// Largest difference between the stepwise and the batch signature of
/// `path`
pub fn join_consistency<O: SignatureOracle>(
    oracle: &O,
    path: &DMatrix<f64>,
    level: Level,
    fixed_last: Option<f64>,
) -> Result<f64> {
    let shape = Shape::try_new(path.ncols(), level)?;
    let sig = oracle.signature(path, level)?;
    ensure_len(&sig, shape, shape.sig_len())?;
    let joined = stepwise_signature(oracle, path, level, fixed_last)?;
    ensure_len(&joined, shape, shape.sig_len())?;
    max_abs_diff(&sig, &joined)
}

/// Finite-difference residuals of [`SignatureOracle::sig_join_backprop`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BumpReport {
    /// Observed minus predicted change when bumping the running signature
    pub signature: f64,
    /// Observed minus predicted change when bumping the increment
    pub increment: f64,
}

/// Bump the running signature, then the increment, by the relative amount
/// `rel`, and compare the change of the sum of the joined signature with
/// what the reported gradients predict
pub fn join_bump<O: SignatureOracle>(
    oracle: &O,
    joinee: &[f64],
    increment: &[f64],
    level: Level,
    fixed_last: Option<f64>,
    rel: f64,
) -> Result<BumpReport> {
    let sum_join = |prev: &[f64], inc: &[f64]| -> Result<f64> {
        Ok(oracle.sig_join(prev, inc, level, fixed_last)?.iter().sum())
    };
    let bumped_joinee: Vec<f64> = joinee.iter().map(|x| x * (1.0 + rel)).collect();
    let bumped_inc: Vec<f64> = increment.iter().map(|x| x * (1.0 + rel)).collect();
    let base = sum_join(joinee, increment)?;
    let bump1 = sum_join(&bumped_joinee, increment)?;
    let bump2 = sum_join(joinee, &bumped_inc)?;

    let ones = vec![1.0; joinee.len()];
    let (grad_sig, grad_inc) =
        oracle.sig_join_backprop(&ones, joinee, increment, level, fixed_last)?;
    let dot = |g: &[f64], new: &[f64], old: &[f64]| -> f64 {
        g.iter()
            .zip(new.iter().zip(old))
            .map(|(g, (n, o))| g * (n - o))
            .sum()
    };
    Ok(BumpReport {
        signature: (bump1 - base) - dot(&grad_sig, &bumped_joinee, joinee),
        increment: (bump2 - base) - dot(&grad_inc, &bumped_inc, increment),
    })
}

/// Largest difference between `sig_backprop(grad)` and the contraction of
/// `sig_jacobian` with `grad`
pub fn backprop_consistency<O: SignatureOracle>(
    oracle: &O,
    path: &DMatrix<f64>,
    level: Level,
    grad: &[f64],
) -> Result<f64> {
    let back = oracle.sig_backprop(grad, path, level)?;
    if back.shape() != path.shape() {
        return Err(SigError::PathDimension {
            expected: path.ncols(),
            found: back.ncols(),
        });
    }
    let manual = oracle.sig_jacobian(path, level)?.contract(grad)?;
    max_abs_diff(back.as_slice(), manual.as_slice())
}

/// Largest difference between the first-order change predicted by the
/// jacobian along `direction` and the central finite difference of the
/// signature with step `h`
pub fn jacobian_finite_difference<O: SignatureOracle>(
    oracle: &O,
    path: &DMatrix<f64>,
    level: Level,
    direction: &DMatrix<f64>,
    h: f64,
) -> Result<f64> {
    let shape = Shape::try_new(path.ncols(), level)?;
    let up = oracle.signature(&(path + direction * h), level)?;
    let down = oracle.signature(&(path - direction * h), level)?;
    ensure_len(&up, shape, shape.sig_len())?;
    ensure_len(&down, shape, shape.sig_len())?;
    let fd: Vec<f64> = up
        .iter()
        .zip(&down)
        .map(|(u, d)| (u - d) / (2.0 * h))
        .collect();
    let predicted = oracle.sig_jacobian(path, level)?.directional(direction)?;
    max_abs_diff(&fd, &predicted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{ChenOracle, Jacobian, Prepared};

    /// Delegates to [`ChenOracle`], then rewrites the flat vectors returned
    /// by `sig_join`, `log_signature` and `sig_backprop`. The rewrite of a
    /// backprop must keep its length
    struct Faulty(fn(Vec<f64>) -> Vec<f64>);

    fn all_nan(v: Vec<f64>) -> Vec<f64> {
        vec![f64::NAN; v.len()]
    }

    fn first_two(mut v: Vec<f64>) -> Vec<f64> {
        v.truncate(2);
        v
    }

    impl SignatureOracle for Faulty {
        type Handle = Prepared;

        fn prepare(&self, dim: usize, level: Level, methods: &str) -> Result<Prepared> {
            ChenOracle.prepare(dim, level, methods)
        }

        fn basis(&self, handle: &Prepared) -> Vec<String> {
            ChenOracle.basis(handle)
        }

        fn signature(&self, path: &DMatrix<f64>, level: Level) -> Result<Vec<f64>> {
            ChenOracle.signature(path, level)
        }

        fn log_signature(
            &self,
            path: &DMatrix<f64>,
            handle: &Prepared,
            method: Option<LogSigMethod>,
        ) -> Result<Vec<f64>> {
            ChenOracle.log_signature(path, handle, method).map(self.0)
        }

        fn sig_join(
            &self,
            prev: &[f64],
            increment: &[f64],
            level: Level,
            fixed_last: Option<f64>,
        ) -> Result<Vec<f64>> {
            ChenOracle
                .sig_join(prev, increment, level, fixed_last)
                .map(self.0)
        }

        fn sig_join_backprop(
            &self,
            grad: &[f64],
            prev: &[f64],
            increment: &[f64],
            level: Level,
            fixed_last: Option<f64>,
        ) -> Result<(Vec<f64>, Vec<f64>)> {
            ChenOracle.sig_join_backprop(grad, prev, increment, level, fixed_last)
        }

        fn sig_jacobian(&self, path: &DMatrix<f64>, level: Level) -> Result<Jacobian> {
            ChenOracle.sig_jacobian(path, level)
        }

        fn sig_backprop(
            &self,
            grad: &[f64],
            path: &DMatrix<f64>,
            level: Level,
        ) -> Result<DMatrix<f64>> {
            let back = ChenOracle.sig_backprop(grad, path, level)?;
            let flat = (self.0)(back.as_slice().to_vec());
            Ok(DMatrix::from_vec(back.nrows(), back.ncols(), flat))
        }
    }

    fn path() -> DMatrix<f64> {
        DMatrix::from_row_slice(3, 2, &[0.0, 0.0, 0.4, 0.1, 0.3, 0.8])
    }

    #[test]
    fn worst_of_report() {
        let r = LogSigReport {
            lengths_consistent: true,
            sig_from_logsig: 1e-9,
            logsig_from_sig: 3e-9,
            projection: 2e-9,
            methods: vec![(LogSigMethod::Bracket, 5e-9)],
        };
        assert_eq!(r.worst(), 5e-9);
        let r = LogSigReport {
            methods: vec![(LogSigMethod::Bracket, f64::NAN)],
            ..r
        };
        assert!(r.worst().is_nan());
    }

    #[test]
    fn fixed_channel_is_dropped_from_increments() {
        let p = DMatrix::from_row_slice(3, 2, &[0.0, 0.0, 0.5, 0.1, 0.2, 0.2]);
        let incs = join_increments(&p, Some(0.1)).unwrap();
        assert_eq!(incs.len(), 2);
        assert_eq!(incs[0], vec![0.5]);
        assert!((incs[1][0] + 0.3).abs() < 1e-15);
    }

    #[test]
    fn fixed_channel_needs_a_column() {
        let p = DMatrix::<f64>::zeros(3, 0);
        assert_eq!(
            join_increments(&p, Some(0.1)),
            Err(SigError::PathDimension {
                expected: 1,
                found: 0
            })
        );
        assert!(join_increments(&p, None).is_ok());
    }

    #[test]
    fn expanded_method_is_required() {
        let p = DMatrix::from_row_slice(2, 2, &[0.0, 0.0, 1.0, 1.0]);
        assert_eq!(
            logsig_consistency(&ChenOracle, &p, 2, "s"),
            Err(SigError::MethodNotPrepared('x'))
        );
    }

    #[test]
    fn uppercase_methods_are_compared() {
        let report = logsig_consistency(&ChenOracle, &path(), 3, "COSX").unwrap();
        let compared: Vec<_> = report.methods.iter().map(|(m, _)| *m).collect();
        assert_eq!(
            compared,
            vec![
                LogSigMethod::Compiled,
                LogSigMethod::Bracket,
                LogSigMethod::Simplified
            ]
        );
        assert!(report.worst() < 1e-10);
    }

    #[test]
    fn nan_join_is_not_a_match() {
        let diff = join_consistency(&Faulty(all_nan), &path(), 2, None).unwrap();
        assert!(diff.is_nan());
        assert!(!(diff < 1e-4));
    }

    #[test]
    fn short_join_is_refused() {
        let p = DMatrix::from_row_slice(2, 2, &[0.0, 0.0, 0.4, 0.1]);
        assert_eq!(
            join_consistency(&Faulty(first_two), &p, 2, None),
            Err(SigError::FlatLengthMismatch {
                shape: Shape::new(2, 2),
                expected: 6,
                found: 2
            })
        );
    }

    #[test]
    fn nan_logsig_spoils_the_report() {
        let report = logsig_consistency(&Faulty(all_nan), &path(), 2, "cosx").unwrap();
        assert!(report.sig_from_logsig.is_nan());
        assert!(report.worst().is_nan());
    }

    #[test]
    fn short_logsig_is_refused() {
        assert_eq!(
            logsig_consistency(&Faulty(first_two), &path(), 2, "cosx"),
            Err(SigError::CoefficientCount {
                expected: 3,
                found: 2
            })
        );
    }

    #[test]
    fn nan_backprop_is_not_a_match() {
        let grad = vec![1.0; Shape::new(2, 2).sig_len()];
        let diff = backprop_consistency(&Faulty(all_nan), &path(), 2, &grad).unwrap();
        assert!(diff.is_nan());
        let diff = backprop_consistency(&ChenOracle, &path(), 2, &grad).unwrap();
        assert!(diff < 1e-12);
    }
}
