//! Truncated tensor series, in their per-level and flat layouts
//!
//! A [`TensorSeries`] stores the levels `1..=L` of an element of the tensor
//! algebra, level `m` as a dense row-major vector of `d^m` components. The
//! scalar (level 0) part is never stored. Which value it implicitly takes is
//! carried by the type:
//!
//! - [`LieSeries`]: level 0 is `0`. This is what logarithms return and what
//!   exponentials take, and these form a vector space.
//! - [`GroupSeries`]: level 0 is `1`. This is what signatures are. They
//!   multiply (see [`GroupSeries::mul`]) but do not add.
//!
//! The flat layout is the concatenation of all levels in increasing order,
//! which is how signatures travel in and out of the crate.

use crate::{
    algebra::{Algebra, Level, Shape},
    error::{Result, SigError},
    graded::{Graded, GradedMut},
};

/// Raw per-level storage, with no convention on the scalar part
#[derive(Debug, Clone, PartialEq)]
pub struct TensorSeries {
    shape: Shape,
    /// Invariant: exactly `shape.level` entries, entry `m-1` of length `d^m`
    levels: Vec<Vec<f64>>,
}

impl TensorSeries {
    /// Build from already separated levels, checking their lengths
    pub fn from_levels(shape: Shape, levels: Vec<Vec<f64>>) -> Result<Self> {
        let lengths_ok = levels.len() == shape.level
            && levels
                .iter()
                .enumerate()
                .all(|(i, l)| l.len() == shape.level_dim(i + 1));
        if !lengths_ok {
            return Err(SigError::FlatLengthMismatch {
                shape,
                expected: shape.sig_len(),
                found: levels.iter().map(Vec::len).sum(),
            });
        }
        Ok(TensorSeries { shape, levels })
    }

    /// Slice a flat concatenated tensor into its levels. The flat vector must
    /// have exactly `siglength(d, L)` components
    pub fn split(flat: &[f64], shape: Shape) -> Result<Self> {
        let expected = shape.sig_len();
        if flat.len() != expected {
            return Err(SigError::FlatLengthMismatch {
                shape,
                expected,
                found: flat.len(),
            });
        }
        let mut start = 0;
        let mut levels = Vec::with_capacity(shape.level);
        for m in 1..=shape.level {
            let end = start + shape.level_dim(m);
            levels.push(flat[start..end].to_vec());
            start = end;
        }
        Ok(TensorSeries { shape, levels })
    }

    /// Concatenate the levels back into a flat tensor
    pub fn join(&self) -> Vec<f64> {
        self.levels.concat()
    }

    pub fn levels(&self) -> &[Vec<f64>] {
        &self.levels
    }

    /// Level-wise `self + other`
    pub fn add(&self, other: &TensorSeries) -> Result<TensorSeries> {
        self.shape.ensure_eq(other.shape)?;
        let mut res = self.clone();
        res.add_scaled_from(other, 1.0);
        Ok(res)
    }

    /// Level-wise `self - other`
    pub fn sub(&self, other: &TensorSeries) -> Result<TensorSeries> {
        self.shape.ensure_eq(other.shape)?;
        let mut res = self.clone();
        res.add_scaled_from(other, -1.0);
        Ok(res)
    }

    /// `c * self`
    pub fn scale(&self, c: f64) -> TensorSeries {
        let mut res = self.clone();
        res.scale_in_place(c);
        res
    }

    /// Largest absolute difference between two series of the same shape
    pub fn max_abs_diff(&self, other: &TensorSeries) -> Result<f64> {
        self.shape.ensure_eq(other.shape)?;
        max_abs_diff(&self.join(), &other.join())
    }
}

impl Graded for TensorSeries {
    fn shape(&self) -> Shape {
        self.shape
    }
    fn level_slice(&self, m: Level) -> &[f64] {
        &self.levels[m - 1]
    }
}

impl GradedMut for TensorSeries {
    fn zeros(shape: Shape) -> Self {
        let levels = (1..=shape.level)
            .map(|m| vec![0.0; shape.level_dim(m)])
            .collect();
        TensorSeries { shape, levels }
    }
    fn level_slice_mut(&mut self, m: Level) -> &mut [f64] {
        &mut self.levels[m - 1]
    }
}

/// Largest absolute componentwise difference between two flat vectors of
/// the same length. A NaN on either side makes the result NaN
pub fn max_abs_diff(a: &[f64], b: &[f64]) -> Result<f64> {
    if a.len() != b.len() {
        return Err(SigError::LengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    Ok(a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, nan_max))
}

/// Like [`f64::max`], but NaN wins
pub(crate) fn nan_max(acc: f64, x: f64) -> f64 {
    if x.is_nan() || x > acc {
        x
    } else {
        acc
    }
}

/// Element of the free Lie algebra (or any series whose scalar part is 0)
#[derive(Debug, Clone, PartialEq)]
pub struct LieSeries(TensorSeries);

/// Element of the group-like part of the tensor algebra (scalar part 1)
#[derive(Debug, Clone, PartialEq)]
pub struct GroupSeries(TensorSeries);

macro_rules! typed_series {
    ($($name:ident),*) => {
        $(
        impl $name {
            /// Wrap raw levels, declaring their implicit scalar part
            pub fn from_tensor(t: TensorSeries) -> Self {
                $name(t)
            }
            /// Split a flat concatenated tensor into this kind of series
            pub fn from_flat(flat: &[f64], shape: Shape) -> Result<Self> {
                TensorSeries::split(flat, shape).map($name)
            }
            pub fn to_flat(&self) -> Vec<f64> {
                self.0.join()
            }
            pub fn as_tensor(&self) -> &TensorSeries {
                &self.0
            }
            pub fn into_tensor(self) -> TensorSeries {
                self.0
            }
            /// Largest absolute difference with another series of the same kind
            pub fn max_abs_diff(&self, other: &Self) -> Result<f64> {
                self.0.max_abs_diff(&other.0)
            }
        }

        impl Graded for $name {
            fn shape(&self) -> Shape {
                self.0.shape()
            }
            fn level_slice(&self, m: Level) -> &[f64] {
                self.0.level_slice(m)
            }
        }
        )*
    };
}
typed_series!(LieSeries, GroupSeries);

impl LieSeries {
    pub fn zeros(shape: Shape) -> Self {
        LieSeries(TensorSeries::zeros(shape))
    }
    pub fn add(&self, other: &LieSeries) -> Result<LieSeries> {
        self.0.add(&other.0).map(LieSeries)
    }
    pub fn sub(&self, other: &LieSeries) -> Result<LieSeries> {
        self.0.sub(&other.0).map(LieSeries)
    }
    pub fn scale(&self, c: f64) -> LieSeries {
        LieSeries(self.0.scale(c))
    }
    pub(crate) fn tensor_mut(&mut self) -> &mut TensorSeries {
        &mut self.0
    }
}

impl GroupSeries {
    /// The unit of the tensor algebra: `1`, every stored level zero. This is
    /// the signature of a path that does not move
    pub fn identity(shape: Shape) -> Self {
        GroupSeries(TensorSeries::zeros(shape))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[fixture]
    fn flat_d2_l3() -> Vec<f64> {
        (0..14).map(|i| i as f64).collect()
    }

    #[rstest]
    fn split_levels(flat_d2_l3: Vec<f64>) {
        let s = TensorSeries::split(&flat_d2_l3, Shape::new(2, 3)).unwrap();
        assert_eq!(s.levels()[0], vec![0.0, 1.0]);
        assert_eq!(s.levels()[1], vec![2.0, 3.0, 4.0, 5.0]);
        assert_eq!(s.levels()[2].len(), 8);
        assert_eq!(s.join(), flat_d2_l3);
    }

    #[rstest]
    fn split_refuses_wrong_length(flat_d2_l3: Vec<f64>) {
        let err = TensorSeries::split(&flat_d2_l3[..13], Shape::new(2, 3)).unwrap_err();
        assert_eq!(
            err,
            SigError::FlatLengthMismatch {
                shape: Shape::new(2, 3),
                expected: 14,
                found: 13
            }
        );
        assert!(TensorSeries::split(&flat_d2_l3, Shape::new(2, 2)).is_err());
    }

    #[test]
    fn from_levels_checks_lengths() {
        let shape = Shape::new(2, 2);
        assert!(TensorSeries::from_levels(shape, vec![vec![0.0; 2], vec![0.0; 4]]).is_ok());
        assert!(TensorSeries::from_levels(shape, vec![vec![0.0; 2], vec![0.0; 3]]).is_err());
        assert!(TensorSeries::from_levels(shape, vec![vec![0.0; 2]]).is_err());
    }

    #[test]
    fn mismatched_shapes_do_not_add() {
        let a = LieSeries::zeros(Shape::new(2, 2));
        let b = LieSeries::zeros(Shape::new(2, 3));
        assert_eq!(
            a.add(&b),
            Err(SigError::ShapeMismatch {
                left: Shape::new(2, 2),
                right: Shape::new(2, 3)
            })
        );
    }

    #[test]
    fn max_abs_diff_keeps_nan() {
        let d = max_abs_diff(&[f64::NAN, 1.0], &[0.0, 1.0]).unwrap();
        assert!(d.is_nan());
        let d = max_abs_diff(&[0.5, 1.0, f64::NAN], &[0.0, 3.0, 1.0]).unwrap();
        assert!(d.is_nan());
        assert_eq!(max_abs_diff(&[0.5, 1.0], &[0.0, 3.0]), Ok(2.0));
    }

    #[test]
    fn max_abs_diff_refuses_different_lengths() {
        assert_eq!(
            max_abs_diff(&[0.0; 6], &[0.0; 2]),
            Err(SigError::LengthMismatch { left: 6, right: 2 })
        );
    }

    #[test]
    fn identity_is_all_zero_flat() {
        let id = GroupSeries::identity(Shape::new(3, 2));
        assert_eq!(id.to_flat(), vec![0.0; 12]);
    }
}
