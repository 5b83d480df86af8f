//! Derivatives of segment exponentials and of the group product, in forward
//! (tangent) and reverse (adjoint) mode

use crate::{
    algebra::{Algebra, Level, Shape},
    graded::{Graded, GradedMut},
    series::{GroupSeries, TensorSeries},
};

/// `x^{⊗r}` for `r = 0..=level`, each flattened row-major (`x^0 = [1]`)
fn tensor_powers(x: &[f64], level: Level) -> Vec<Vec<f64>> {
    let mut powers = Vec::with_capacity(level + 1);
    powers.push(vec![1.0]);
    for r in 1..=level {
        let next = powers[r - 1]
            .iter()
            .flat_map(|a| x.iter().map(move |b| a * b))
            .collect();
        powers.push(next);
    }
    powers
}

/// Visit every slot where the derivative of `x^{⊗m} / m!` along `e_k` is
/// non-zero: for each position `pos` of `e_k` in the word, the flat index
/// `(a * d + k) * d^(m-1-pos) + b` with weight `x^pos[a] * x^(m-1-pos)[b] / m!`
fn for_each_tangent_slot(
    x: &[f64],
    level: Level,
    mut visit: impl FnMut(Level, usize, usize, f64),
) {
    let d = x.len();
    let powers = tensor_powers(x, level);
    let mut factorial = 1.0;
    for m in 1..=level {
        factorial *= m as f64;
        for pos in 0..m {
            let left = &powers[pos];
            let right = &powers[m - 1 - pos];
            for (a, xa) in left.iter().enumerate() {
                for k in 0..d {
                    let base = (a * d + k) * right.len();
                    for (b, xb) in right.iter().enumerate() {
                        visit(m, k, base + b, xa * xb / factorial);
                    }
                }
            }
        }
    }
}

/// `d exp(x) / d x_k`, a series with zero scalar part
pub(super) fn exp_tangent(x: &[f64], k: usize, level: Level) -> TensorSeries {
    let mut res = TensorSeries::zeros(Shape::new(x.len(), level));
    for_each_tangent_slot(x, level, |m, kk, idx, w| {
        if kk == k {
            res.level_slice_mut(m)[idx] += w;
        }
    });
    res
}

/// Pull back a gradient on `exp(x)` to a gradient on `x`
pub(super) fn exp_backprop(grad: &TensorSeries, x: &[f64]) -> Vec<f64> {
    let mut res = vec![0.0; x.len()];
    for_each_tangent_slot(x, grad.shape().level, |m, k, idx, w| {
        res[k] += grad.level_slice(m)[idx] * w;
    });
    res
}

/// Pull back a gradient on `p · e` (group product) to gradients on `p` and
/// on `e`. With `p = 1 + p'` and `e = 1 + e'`, the product is
/// `1 + p' + e' + p' ⊗ e'`
pub(super) fn mul_backprop(
    grad: &TensorSeries,
    p: &GroupSeries,
    e: &GroupSeries,
) -> (TensorSeries, TensorSeries) {
    let shape = grad.shape();
    let mut grad_p = grad.clone();
    let mut grad_e = grad.clone();
    for i in 1..shape.level {
        for j in 1..=shape.level - i {
            let g = grad.level_slice(i + j);
            let (pi, ej) = (p.level_slice(i), e.level_slice(j));
            let n = shape.level_dim(j);
            let gp = grad_p.level_slice_mut(i);
            for (a, gpa) in gp.iter_mut().enumerate() {
                let row = &g[a * n..(a + 1) * n];
                *gpa += row.iter().zip(ej).map(|(x, y)| x * y).sum::<f64>();
            }
            let ge = grad_e.level_slice_mut(j);
            for (a, pa) in pi.iter().enumerate() {
                let row = &g[a * n..(a + 1) * n];
                for (geb, x) in ge.iter_mut().zip(row) {
                    *geb += pa * x;
                }
            }
        }
    }
    (grad_p, grad_e)
}
