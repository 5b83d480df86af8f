//! Represent the effect of tensor algebra primitives over the levels of the
//! truncated series

use crate::algebra::Level;
use bitvec::prelude::*;

/// Represents the set of levels that can be non-zero in some truncated series.
/// You can think of it as the "type" of a series, which supports the same
/// operations actual series do, by mirroring the effects those operations have
/// on their levels. Therefore, LevelSets can be multiplied together, and this
/// will yield the LevelSet of the concatenation product of two series. This
/// allows to skip, when multiplying, all the pairs of levels that can only
/// contribute zero, and to stop a power series once its powers vanish.
///
/// Level 0 is never part of a LevelSet: the scalar part of a series is
/// implicit (see [`crate::series`]).
#[derive(Debug, Eq, Clone)]
pub struct LevelSet(BitVec);

impl PartialEq for LevelSet {
    /// Allows equality between bitvecs of different lengths: tests if they are
    /// equal up to some trailing zeroes
    fn eq(&self, other: &Self) -> bool {
        let (small, big) = sort_by_len(&self.0, &other.0);
        big[0..small.len()] == small[..] && big[small.len()..].not_any()
    }
}

impl LevelSet {
    /// The `LevelSet` of a series that can only be zero
    pub fn empty() -> Self {
        LevelSet(BitVec::new())
    }

    /// The level of a homogeneous series
    pub fn single(m: Level) -> Self {
        let mut v = bitvec![0; m + 1];
        v.set(m, true);
        LevelSet(v)
    }

    /// Levels ranging from x to y (incl)
    pub fn range(x: Level, y: Level) -> Self {
        let mut v = bitvec![0; y + 1];
        v[x..=y].fill(true);
        LevelSet(v)
    }

    /// Iterate over each level present in the LevelSet, in increasing order
    pub fn iter(&self) -> impl Iterator<Item = Level> + '_ {
        self.0.iter_ones()
    }

    /// Whether the LevelSet contains no levels. If so, the series it is
    /// attached to can only be zero
    pub fn is_empty(&self) -> bool {
        self.0.not_any()
    }

    /// Whether the LevelSet contains the level m
    pub fn contains(&self, m: Level) -> bool {
        match self.0.get(m) {
            None => false,
            Some(x) => *x,
        }
    }

    /// Add a level to the set
    pub fn add_level(mut self, m: Level) -> Self {
        if m >= self.0.len() {
            self.0.resize(m + 1, false);
        }
        self.0.set(m, true);
        self
    }

    /// Drop every level above `max`
    pub fn truncate(mut self, max: Level) -> Self {
        if self.0.len() > max + 1 {
            self.0.truncate(max + 1);
        }
        self
    }

    /// Iterate over the pairs `(i, j)`, `i` from `left` and `j` from `right`,
    /// whose concatenation product lands on a level contained in `self`
    pub fn iter_contributions_to_mul<'a>(
        &'a self,
        left: &'a LevelSet,
        right: &'a LevelSet,
    ) -> impl Iterator<Item = (Level, Level)> + 'a {
        left.iter().flat_map(move |i| {
            right
                .iter()
                .filter(move |&j| self.contains(i + j))
                .map(move |j| (i, j))
        })
    }
}

fn sort_by_len<T>(v1: T, v2: T) -> (T, T)
where
    T: std::borrow::Borrow<BitVec>,
{
    if v1.borrow().len() <= v2.borrow().len() {
        (v1, v2)
    } else {
        (v2, v1)
    }
}

impl FromIterator<Level> for LevelSet {
    fn from_iter<I: IntoIterator<Item = Level>>(iter: I) -> Self {
        iter.into_iter().fold(LevelSet::empty(), LevelSet::add_level)
    }
}

/// The levels of a concatenation product (untruncated): every `i + j`
impl std::ops::Mul for LevelSet {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self::Output {
        self.iter()
            .flat_map(|i| rhs.iter().map(move |j| i + j))
            .collect()
    }
}
