//! The [`Graded`] trait, for types that hold one dense vector per level of a
//! truncated tensor algebra, and its subtrait to write level components

use crate::{
    algebra::{Level, Shape},
    level_set::LevelSet,
};
use std::{rc::Rc, sync::Arc};

/// The trait for all objects that are graded and contain readable data
/// (components) associated to each level `1..=L`
pub trait Graded {
    /// The truncated algebra this data lives in
    fn shape(&self) -> Shape;

    /// Get a slice to the components of level `m`, given `1 <= m <= L`. The
    /// length of the slice must be exactly `d^m`
    fn level_slice(&self, m: Level) -> &[f64];

    /// The levels that contain at least one non-zero component
    fn level_set(&self) -> LevelSet {
        (1..=self.shape().level)
            .filter(|&m| self.level_slice(m).iter().any(|x| *x != 0.0))
            .collect()
    }
}

/// The trait for all objects that are graded and contain writeable data
pub trait GradedMut: Graded {
    /// Create an object that holds zero at every level of the given shape
    fn zeros(shape: Shape) -> Self;

    /// Get a mutable slice to the components of level `m`
    fn level_slice_mut(&mut self, m: Level) -> &mut [f64];

    /// Multiply all the components of every level by `c`
    fn scale_in_place(&mut self, c: f64) {
        for m in 1..=self.shape().level {
            for x in self.level_slice_mut(m) {
                *x *= c;
            }
        }
    }

    /// Add `c` times the levels of `input` to `self`. Shapes are checked by
    /// the callers
    fn add_scaled_from<T: Graded + ?Sized>(&mut self, input: &T, c: f64) {
        debug_assert_eq!(self.shape(), input.shape());
        for m in 1..=self.shape().level {
            let input_slice = input.level_slice(m);
            for (r, i) in self.level_slice_mut(m).iter_mut().zip(input_slice) {
                *r += c * i;
            }
        }
    }
}

impl<T: Graded + ?Sized> Graded for &T {
    fn shape(&self) -> Shape {
        (**self).shape()
    }
    fn level_slice(&self, m: Level) -> &[f64] {
        (**self).level_slice(m)
    }
}

macro_rules! graded_blanket_impls {
    ($($ref:tt),*) => {
        $(
            impl<T: Graded + ?Sized> Graded for $ref<T> {
                fn shape(&self) -> Shape {
                    (**self).shape()
                }
                fn level_slice(&self, m: Level) -> &[f64] {
                    (**self).level_slice(m)
                }
            }
        )*
    };
}
graded_blanket_impls!(Box, Rc, Arc);
