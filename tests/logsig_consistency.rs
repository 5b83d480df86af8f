#![cfg(feature = "oracle")]

use nalgebra::DMatrix;
use rand::{rngs::StdRng, Rng, SeedableRng};
use rstest::rstest;
use sigtensor::{
    crosscheck::logsig_consistency,
    lie::{value_of_bracket, Basis},
    oracle::{ChenOracle, LogSigMethod, SignatureOracle},
    series::max_abs_diff,
    GroupSeries, Shape,
};

fn uniform_path(seed: u64, points: usize, dim: usize) -> DMatrix<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    DMatrix::from_fn(points, dim, |_, _| rng.gen::<f64>())
}

#[test]
fn sig_logsig_and_basis_agree() {
    let path = uniform_path(21, 10, 3);
    let report = logsig_consistency(&ChenOracle, &path, 4, "cosx").unwrap();
    assert!(report.lengths_consistent);
    assert!(report.sig_from_logsig < 1e-5, "{report:?}");
    assert!(report.logsig_from_sig < 1e-5, "{report:?}");
    assert!(report.projection < 1e-5, "{report:?}");
    assert_eq!(report.methods.len(), 3);
    for (method, diff) in &report.methods {
        assert!(*diff < 1e-5, "method {method:?} is off by {diff}");
    }
}

#[rstest]
#[case(1, 3)]
#[case(2, 1)]
#[case(2, 5)]
#[case(4, 3)]
fn other_shapes_agree(#[case] dim: usize, #[case] level: usize) {
    let path = uniform_path(7 + dim as u64, 6, dim);
    let report = logsig_consistency(&ChenOracle, &path, level, "cosx").unwrap();
    assert!(report.lengths_consistent);
    assert!(report.worst() < 1e-8, "{report:?}");
}

/// The same check spelled out step by step, without the crosscheck module
#[test]
fn expanding_the_logsig_reproduces_the_sig() {
    let (dim, level) = (3, 4);
    let shape = Shape::new(dim, level);
    let path = uniform_path(5, 10, dim);
    let oracle = ChenOracle;
    let handle = oracle.prepare(dim, level, "cosx").unwrap();
    let basis = oracle.basis(&handle);
    let logsig = oracle.log_signature(&path, &handle, None).unwrap();
    let sig = oracle.signature(&path, level).unwrap();

    let mut expanded: Vec<Vec<f64>> = (1..=level).map(|m| vec![0.0; dim.pow(m as u32)]).collect();
    for (coeff, expression) in logsig.iter().zip(&basis) {
        let (values, depth) = value_of_bracket(expression, dim).unwrap();
        for (e, v) in expanded[depth - 1].iter_mut().zip(values) {
            *e += v * coeff;
        }
    }
    let expanded = sigtensor::series::TensorSeries::from_levels(shape, expanded).unwrap();
    let calculated = sigtensor::LieSeries::from_tensor(expanded).exp();
    assert!(max_abs_diff(&sig, &calculated.to_flat()).unwrap() < 1e-5);

    let full_log = GroupSeries::from_flat(&sig, shape).unwrap().log();
    let lib_full = oracle
        .log_signature(&path, &handle, Some(LogSigMethod::Expanded))
        .unwrap();
    assert!(max_abs_diff(&lib_full, &full_log.to_flat()).unwrap() < 1e-5);

    let lie_basis = Basis::from_strings(shape, &basis).unwrap();
    let recovered = lie_basis.project_least_squares(&full_log).unwrap();
    assert!(max_abs_diff(&logsig, &recovered).unwrap() < 1e-5);
}

#[test]
fn log_signature_of_a_segment_is_its_increment() {
    let path = DMatrix::from_row_slice(2, 3, &[0.1, 0.2, 0.3, 0.6, -0.2, 1.3]);
    let oracle = ChenOracle;
    let handle = oracle.prepare(3, 3, "cos").unwrap();
    for method in [
        LogSigMethod::Compiled,
        LogSigMethod::Bracket,
        LogSigMethod::Simplified,
    ] {
        let logsig = oracle.log_signature(&path, &handle, Some(method)).unwrap();
        let expected = [0.5, -0.4, 1.0];
        for (i, x) in logsig.iter().enumerate() {
            let e = expected.get(i).copied().unwrap_or(0.0);
            assert!((x - e).abs() < 1e-12, "{method:?} coordinate {i}: {x}");
        }
    }
}
