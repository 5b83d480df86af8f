//! Gradient of a mean-square cost on the signature, computed once through
//! `sig_backprop` on the whole path and once by backpropagating through the
//! chain of `sig_join` calls that builds the same signature step by step.
//!
//! Run with `cargo run --example stepwise`.

use nalgebra::DMatrix;
use rand::{rngs::StdRng, Rng, SeedableRng};
use sigtensor::{
    oracle::{ChenOracle, SignatureOracle},
    series::max_abs_diff,
    Result,
};

const DIM: usize = 3;
const LEVEL: usize = 4;
const POINTS: usize = 4;
/// Step of the last channel, which plays the role of time
const FIXED: f64 = 0.1;

fn main() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(51);
    let mut path = DMatrix::from_fn(POINTS, DIM, |_, _| rng.gen::<f64>());
    for i in 0..POINTS {
        path[(i, DIM - 1)] = FIXED * i as f64;
    }
    let oracle = ChenOracle;

    let sig = oracle.signature(&path, LEVEL)?;
    let n = sig.len() as f64;
    let cost = sig.iter().map(|x| x * x).sum::<f64>() / n;
    let grad: Vec<f64> = sig.iter().map(|x| 2.0 * x / n).collect();
    println!("cost: {cost}");

    let direct = oracle.sig_backprop(&grad, &path, LEVEL)?;

    let free = DIM - 1;
    let increments: Vec<Vec<f64>> = (1..POINTS)
        .map(|i| (0..free).map(|j| path[(i, j)] - path[(i - 1, j)]).collect())
        .collect();
    // joinees[i] is the signature of the first i segments
    let mut joinees = vec![vec![0.0; sig.len()]];
    for inc in &increments {
        let next = oracle.sig_join(&joinees[joinees.len() - 1], inc, LEVEL, Some(FIXED))?;
        joinees.push(next);
    }
    let mut stepwise = DMatrix::zeros(POINTS, free);
    let mut running = grad;
    for (i, inc) in increments.iter().enumerate().rev() {
        let (grad_prev, grad_inc) =
            oracle.sig_join_backprop(&running, &joinees[i], inc, LEVEL, Some(FIXED))?;
        for (j, g) in grad_inc.into_iter().enumerate() {
            stepwise[(i + 1, j)] += g;
            stepwise[(i, j)] -= g;
        }
        running = grad_prev;
    }

    let direct = direct.columns(0, free).into_owned();
    println!("through sig_backprop:{direct}");
    println!("through sig_join_backprop:{stepwise}");
    let diff = max_abs_diff(direct.as_slice(), stepwise.as_slice())?;
    println!("largest difference: {diff:e}");
    Ok(())
}
