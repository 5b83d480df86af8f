//! Parse Hall basis elements written as nested brackets, eg. `[1,[2,3]]`

use crate::error::{Result, SigError};
use std::fmt;

/// Deepest nesting of brackets the parser accepts. Over two or more letters,
/// an element nested deeper lives above any level a flat tensor can index
pub const MAX_NESTING: usize = 128;

/// A bracket expression: a binary tree whose leaves are letters `1..=d`
/// (generators of the free Lie algebra) and whose nodes stand for the Lie
/// bracket `[left, right]`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Bracket {
    Letter(usize),
    Node(Box<Bracket>, Box<Bracket>),
}

impl Bracket {
    /// `[left, right]`
    pub fn node(left: Bracket, right: Bracket) -> Self {
        Bracket::Node(Box::new(left), Box::new(right))
    }

    /// Parse a whole string. Trailing characters are refused
    pub fn parse(text: &str) -> Result<Self> {
        let (expr, end) = Self::parse_at(text, 0)?;
        if end != text.len() {
            return Err(invalid(text, end, "trailing characters"));
        }
        Ok(expr)
    }

    /// Parse the expression starting at byte `index` of `text`, returning it
    /// with the index just past its end
    pub fn parse_at(text: &str, index: usize) -> Result<(Self, usize)> {
        Self::parse_nested(text, index, 0)
    }

    /// `depth` is the number of brackets enclosing `index`
    fn parse_nested(text: &str, index: usize, depth: usize) -> Result<(Self, usize)> {
        let bytes = text.as_bytes();
        match bytes.get(index) {
            Some(b'[') if depth >= MAX_NESTING => {
                Err(invalid(text, index, "brackets nested too deep"))
            }
            Some(b'[') => {
                let (left, m) = Self::parse_nested(text, index + 1, depth + 1)?;
                expect(text, m, b',')?;
                let (right, n) = Self::parse_nested(text, m + 1, depth + 1)?;
                expect(text, n, b']')?;
                Ok((Bracket::node(left, right), n + 1))
            }
            _ => {
                let run = bytes[index.min(bytes.len())..]
                    .iter()
                    .take_while(|b| b.is_ascii_digit())
                    .count();
                if run == 0 {
                    return Err(invalid(text, index, "expected a letter or '['"));
                }
                let letter = text[index..index + run]
                    .parse()
                    .map_err(|_| invalid(text, index, "letter too large"))?;
                Ok((Bracket::Letter(letter), index + run))
            }
        }
    }

    /// Number of letters, ie. the level at which this element lives
    pub fn degree(&self) -> usize {
        match self {
            Bracket::Letter(_) => 1,
            Bracket::Node(l, r) => l.degree() + r.degree(),
        }
    }

    /// The letters read from left to right
    pub fn letters(&self) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.degree());
        self.push_letters(&mut out);
        out
    }

    fn push_letters(&self, out: &mut Vec<usize>) {
        match self {
            Bracket::Letter(k) => out.push(*k),
            Bracket::Node(l, r) => {
                l.push_letters(out);
                r.push_letters(out);
            }
        }
    }
}

fn invalid(text: &str, position: usize, reason: &'static str) -> SigError {
    SigError::InvalidBasisExpression {
        text: text.to_owned(),
        position,
        reason,
    }
}

fn expect(text: &str, index: usize, c: u8) -> Result<()> {
    match text.as_bytes().get(index) {
        Some(&b) if b == c => Ok(()),
        _ if c == b',' => Err(invalid(text, index, "expected ','")),
        _ => Err(invalid(text, index, "expected ']'")),
    }
}

impl fmt::Display for Bracket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bracket::Letter(k) => write!(f, "{k}"),
            Bracket::Node(l, r) => write!(f, "[{l},{r}]"),
        }
    }
}

impl std::str::FromStr for Bracket {
    type Err = SigError;
    fn from_str(s: &str) -> Result<Self> {
        Bracket::parse(s)
    }
}
