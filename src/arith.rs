//! Arithmetic of the truncated tensor algebra: concatenation product,
//! exponential and logarithm

use crate::{
    algebra::Shape,
    error::Result,
    graded::{Graded, GradedMut},
    level_set::LevelSet,
    series::{GroupSeries, LieSeries, TensorSeries},
};

/// Concatenation product of the stored levels of `a` and `b`, truncated at
/// level `L`. Level `i` of `a` times level `j` of `b` lands on level `i + j`
/// as a row-major outer product: component `(p, q)` goes to `p * d^j + q`.
///
/// The scalar parts are ignored (treated as 0), so this is the full product
/// only for series whose scalar part is zero. See [`GroupSeries::mul`] for
/// the product of group-like series
pub fn concat_product<A, B>(a: &A, b: &B) -> Result<TensorSeries>
where
    A: Graded + ?Sized,
    B: Graded + ?Sized,
{
    a.shape().ensure_eq(b.shape())?;
    let mut res = TensorSeries::zeros(a.shape());
    accumulate_product(&mut res, a, b, 1.0);
    Ok(res)
}

/// `res += c * (a ⊗ b)`, shapes already checked
pub(crate) fn accumulate_product<R, A, B>(res: &mut R, a: &A, b: &B, c: f64)
where
    R: GradedMut,
    A: Graded + ?Sized,
    B: Graded + ?Sized,
{
    let l = res.shape().level;
    if l < 2 {
        return;
    }
    let wanted = LevelSet::range(2, l);
    let (a_levels, b_levels) = (a.level_set(), b.level_set());
    for (i, j) in wanted.iter_contributions_to_mul(&a_levels, &b_levels) {
        let left = a.level_slice(i);
        let right = b.level_slice(j);
        let n = right.len();
        let out = res.level_slice_mut(i + j);
        for (p, x) in left.iter().enumerate() {
            if *x == 0.0 {
                continue;
            }
            let row = &mut out[p * n..(p + 1) * n];
            for (r, y) in row.iter_mut().zip(right) {
                *r += c * x * y;
            }
        }
    }
}

/// The levels the successive powers `x^m` of a series may occupy
struct PowerLevels {
    base: LevelSet,
    current: LevelSet,
    level: usize,
}

impl PowerLevels {
    fn new(x: &TensorSeries) -> Self {
        let base = x.level_set();
        PowerLevels {
            current: base.clone(),
            base,
            level: x.shape().level,
        }
    }

    /// Move on to the next power. False once it is known to be zero, as are
    /// all the following ones
    fn advance(&mut self) -> bool {
        let next = (self.current.clone() * self.base.clone()).truncate(self.level);
        self.current = next;
        !self.current.is_empty()
    }
}

/// Sum of the truncated power series `sum_{m=1..L} coef(m) x^m`, where the
/// powers are built as `p_1 = x`, `p_m = x ⊗ p_{m-1}`
fn power_series(x: &TensorSeries, coef: impl Fn(usize) -> f64) -> TensorSeries {
    let l = x.shape().level;
    let mut power = x.clone();
    let mut sum = x.scale(coef(1));
    let mut powers = PowerLevels::new(x);
    for m in 2..=l {
        if !powers.advance() {
            break;
        }
        let mut next = TensorSeries::zeros(x.shape());
        accumulate_product(&mut next, x, &power, 1.0);
        power = next;
        sum.add_scaled_from(&power, coef(m));
    }
    sum
}

impl LieSeries {
    /// Exponential: `exp(a) = 1 + a + a^2/2! + ... + a^L/L!`
    pub fn exp(&self) -> GroupSeries {
        // Running product p_m = a ⊗ p_{m-1} / m, which is a^m / m!
        let a = self.as_tensor();
        let l = a.shape().level;
        let mut power = a.clone();
        let mut sum = a.clone();
        let mut powers = PowerLevels::new(a);
        for m in 2..=l {
            if !powers.advance() {
                break;
            }
            let mut next = TensorSeries::zeros(a.shape());
            accumulate_product(&mut next, a, &power, 1.0 / m as f64);
            power = next;
            sum.add_scaled_from(&power, 1.0);
        }
        GroupSeries::from_tensor(sum)
    }
}

impl GroupSeries {
    /// Logarithm: writing `self = 1 + x`,
    /// `log(1 + x) = x - x^2/2 + x^3/3 - ...` up to `x^L`
    pub fn log(&self) -> LieSeries {
        let sum = power_series(self.as_tensor(), |m| {
            let sign = if m % 2 == 1 { 1.0 } else { -1.0 };
            sign / m as f64
        });
        LieSeries::from_tensor(sum)
    }

    /// Product in the tensor algebra: `(1 + a)(1 + b) = 1 + a + b + a ⊗ b`
    pub fn mul(&self, other: &GroupSeries) -> Result<GroupSeries> {
        let (a, b) = (self.as_tensor(), other.as_tensor());
        let mut res = a.add(b)?;
        accumulate_product(&mut res, a, b, 1.0);
        Ok(GroupSeries::from_tensor(res))
    }

    /// The inverse of a group-like element, `exp(-log(self))`
    pub fn inverse(&self) -> GroupSeries {
        self.log().scale(-1.0).exp()
    }
}

/// Exponential of a single vector (a level-1 Lie element): the signature of
/// a straight segment with that displacement
pub fn segment_exp(increment: &[f64], level: usize) -> GroupSeries {
    let shape = Shape::new(increment.len(), level);
    let mut x = LieSeries::zeros(shape);
    if level >= 1 {
        x.tensor_mut().level_slice_mut(1).copy_from_slice(increment);
    }
    x.exp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SigError;
    use rstest::*;

    fn lie(shape: Shape, levels: Vec<Vec<f64>>) -> LieSeries {
        LieSeries::from_tensor(TensorSeries::from_levels(shape, levels).unwrap())
    }

    #[fixture]
    fn a() -> LieSeries {
        lie(
            Shape::new(2, 3),
            vec![
                vec![0.3, -0.2],
                vec![0.1, 0.05, -0.4, 0.2],
                vec![0.01, 0.0, 0.02, -0.03, 0.0, 0.1, 0.0, 0.05],
            ],
        )
    }

    #[test]
    fn product_of_vectors_is_outer_product() {
        let shape = Shape::new(2, 2);
        let u = lie(shape, vec![vec![1.0, 2.0], vec![0.0; 4]]);
        let v = lie(shape, vec![vec![3.0, 5.0], vec![0.0; 4]]);
        let p = concat_product(&u, &v).unwrap();
        assert_eq!(p.levels()[0], vec![0.0, 0.0]);
        assert_eq!(p.levels()[1], vec![3.0, 5.0, 6.0, 10.0]);
    }

    #[test]
    fn product_truncates() {
        let shape = Shape::new(2, 2);
        let u = lie(shape, vec![vec![0.0; 2], vec![1.0; 4]]);
        let p = concat_product(&u, &u).unwrap();
        assert_eq!(p, TensorSeries::zeros(shape));
    }

    #[test]
    fn product_refuses_mismatched_shapes() {
        let u = LieSeries::zeros(Shape::new(2, 2));
        let v = LieSeries::zeros(Shape::new(3, 2));
        assert!(matches!(
            concat_product(&u, &v),
            Err(SigError::ShapeMismatch { .. })
        ));
    }

    #[rstest]
    fn log_exp_roundtrip(a: LieSeries) {
        let back = a.exp().log();
        assert!(back.max_abs_diff(&a).unwrap() < 1e-12);
    }

    #[rstest]
    fn exp_log_roundtrip(a: LieSeries) {
        let g = a.exp();
        let back = g.log().exp();
        assert!(back.max_abs_diff(&g).unwrap() < 1e-12);
    }

    #[test]
    fn exp_of_vector_is_divided_powers() {
        let g = segment_exp(&[2.0], 4);
        let expected = [2.0, 2.0, 8.0 / 6.0, 16.0 / 24.0];
        for (x, y) in g.to_flat().iter().zip(expected) {
            assert!((x - y).abs() < 1e-15);
        }
    }

    #[rstest]
    fn inverse_cancels(a: LieSeries) {
        let g = a.exp();
        let id = g.mul(&g.inverse()).unwrap();
        let zero = GroupSeries::identity(a.shape());
        assert!(id.max_abs_diff(&zero).unwrap() < 1e-12);
    }

    #[test]
    fn powers_of_high_levels_vanish_early() {
        let shape = Shape::new(2, 3);
        let x = TensorSeries::from_levels(shape, vec![vec![0.0; 2], vec![1.0; 4], vec![0.0; 8]])
            .unwrap();
        // Only level 2 is present and its square lands on level 4
        let mut powers = PowerLevels::new(&x);
        assert!(!powers.advance());
        let g = LieSeries::from_tensor(x.clone()).exp();
        assert_eq!(g.as_tensor(), &x);
        assert_eq!(g.log().as_tensor(), &x);
    }

    #[test]
    fn chen_for_collinear_segments() {
        // Two collinear segments compose like one segment of the summed
        // displacement
        let g1 = segment_exp(&[0.5, 1.0], 3);
        let g2 = segment_exp(&[1.0, 2.0], 3);
        let g = segment_exp(&[1.5, 3.0], 3);
        assert!(g1.mul(&g2).unwrap().max_abs_diff(&g).unwrap() < 1e-12);
    }
}
