/*!
# Truncated tensor algebra arithmetic for path signatures

The signature of a path is an element of the tensor algebra over the space
the path lives in, and its log-signature is the logarithm of that element,
which lives in the free Lie algebra. In practice both are truncated above some
level `L`. This crate implements the arithmetic needed to move between these
representations, independently of whatever engine computes signatures, so
that such an engine can be checked against it:

- **Series**. A truncated series ([`series::TensorSeries`]) is one dense
  vector per level `1..=L`, level `m` holding `d^m` components. The scalar
  part is implicit: 0 for a [`LieSeries`], 1 for a [`GroupSeries`]. Series
  convert losslessly to and from the flat layout where all levels are
  concatenated, which is how signatures are usually exchanged.
- **Arithmetic**. Concatenation product ([`arith::concat_product`]),
  [`LieSeries::exp`], [`GroupSeries::log`] and the group product
  [`GroupSeries::mul`]. Products skip pairs of levels that are known to be
  zero, using the [`LevelSet`] of each operand.
- **Lie brackets**. Hall basis elements written as nested brackets such as
  `[1,[2,3]]` are parsed into a [`Bracket`] tree, and evaluated into the tensor
  algebra via `[a, b] = a ⊗ b - b ⊗ a`. A [`lie::Basis`] expands log-signature
  coordinates into full tensor coordinates, and projects them back, either by
  least squares or, for the Lyndon basis ([`hall`]), by a triangular solve.
- **Oracle**. [`oracle::SignatureOracle`] is the contract of a signature
  engine, and [`oracle::ChenOracle`] a reference implementation of it built
  on the above. The [`crosscheck`] module measures how well an oracle agrees
  with the arithmetic of this crate.

The oracle and the cross-checks are behind the `oracle` feature, enabled by
default.
*/

pub mod algebra;
pub mod arith;
pub mod bracket;
pub mod error;
pub mod graded;
pub mod hall;
pub mod level_set;
pub mod lie;
pub mod series;

#[cfg(feature = "oracle")]
pub mod crosscheck;
#[cfg(feature = "oracle")]
pub mod oracle;

pub use algebra::{logsiglength, siglength, Algebra, Level, Shape};
pub use bracket::Bracket;
pub use error::{Result, SigError};
pub use graded::Graded;
pub use level_set::LevelSet;
pub use series::{GroupSeries, LieSeries};

#[cfg(test)]
pub(crate) mod test_macros {
    macro_rules! test_eqs {
        {$($test_name:ident : $a:expr => $b:expr),+ $(,)?} => {
          mod test_eqs {
            use super::*;
            $(
                #[test]
                fn $test_name() {
                    assert_eq!($a, $b);
                }
            )+
          }
        }
    }
    pub(crate) use test_eqs;
}
