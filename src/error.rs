//! The error type shared by every fallible operation of the crate

use crate::algebra::Shape;
use thiserror::Error;

/// Everything that can go wrong when parsing basis expressions, reshaping
/// tensors or combining series. All of these are caller errors: nothing in
/// the crate retries or recovers
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SigError {
    /// A basis string is not a well-formed nested bracket expression
    #[error("invalid basis expression {text:?} at position {position}: {reason}")]
    InvalidBasisExpression {
        text: String,
        position: usize,
        reason: &'static str,
    },
    /// A letter of a bracket expression does not name a generator in `1..=dim`
    #[error("letter {letter} is out of range for dimension {dim}")]
    LetterOutOfRange { letter: usize, dim: usize },
    /// A basis element lives above the truncation level
    #[error("basis element of depth {depth} exceeds truncation level {level}")]
    DepthExceedsLevel { depth: usize, level: usize },
    /// A log-signature does not have one coefficient per basis element
    #[error("got {found} coefficients for a basis of {expected} elements")]
    CoefficientCount { expected: usize, found: usize },
    /// A flat tensor does not have `siglength(d, L)` components
    #[error("flat tensor of length {found} does not match {shape} (expected {expected})")]
    FlatLengthMismatch {
        shape: Shape,
        expected: usize,
        found: usize,
    },
    /// Two flat vectors that should be compared componentwise differ in
    /// length
    #[error("cannot compare vectors of lengths {left} and {right}")]
    LengthMismatch { left: usize, right: usize },
    /// Two operands live in different truncated algebras
    #[error("operands have mismatched shapes {left} and {right}")]
    ShapeMismatch { left: Shape, right: Shape },
    /// A path with no point at all has no signature
    #[error("path has no points")]
    EmptyPath,
    /// A path's number of columns does not match the prepared dimension
    #[error("path has dimension {found}, expected {expected}")]
    PathDimension { expected: usize, found: usize },
    /// A log-signature method letter that is not one of `c`, `o`, `s`, `x`
    #[error("unknown log-signature method {0:?}")]
    UnknownMethod(char),
    /// A log-signature method was requested but not passed to `prepare`
    #[error("log-signature method {0:?} was not prepared")]
    MethodNotPrepared(char),
    /// `d^L` does not fit in a `usize`
    #[error("dimension {dim} at level {level} overflows")]
    Overflow { dim: usize, level: usize },
    /// The linear solver failed
    #[error("linear solve failed: {0}")]
    Solve(&'static str),
}

pub type Result<T, E = SigError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_mentions_shapes() {
        let e = SigError::ShapeMismatch {
            left: Shape::new(2, 3),
            right: Shape::new(3, 3),
        };
        assert_eq!(
            e.to_string(),
            "operands have mismatched shapes (d=2, L=3) and (d=3, L=3)"
        );
    }
}
