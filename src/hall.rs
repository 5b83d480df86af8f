//! The Lyndon basis, a Hall basis of the free Lie algebra
//!
//! Its elements are the Lyndon words over the letters `1..=d` of length at
//! most `L`, ordered by length and then lexicographically, each bracketed by
//! its standard factorisation `w = uv` where `v` is the longest proper suffix
//! of `w` that is itself a Lyndon word.

use crate::{
    algebra::{Level, Shape},
    bracket::Bracket,
    error::Result,
    lie::{Basis, BasisElement},
};

/// Whether `word` is strictly smaller than all its proper suffixes
pub fn is_lyndon(word: &[usize]) -> bool {
    !word.is_empty() && (1..word.len()).all(|i| word < &word[i..])
}

/// All Lyndon words of length `1..=max_len` over `1..=dim`, in lexicographic
/// order (Duval's algorithm)
fn lyndon_words_lex(dim: usize, max_len: Level) -> Vec<Vec<usize>> {
    let mut res = Vec::new();
    if dim == 0 || max_len == 0 {
        return res;
    }
    let mut w = vec![1];
    loop {
        res.push(w.clone());
        let m = w.len();
        while w.len() < max_len {
            w.push(w[w.len() - m]);
        }
        while w.last() == Some(&dim) {
            w.pop();
        }
        match w.last_mut() {
            Some(last) => *last += 1,
            None => break,
        }
    }
    res
}

/// All Lyndon words up to length `max_len`, by length then lexicographically
pub fn lyndon_words(dim: usize, max_len: Level) -> Vec<Vec<usize>> {
    let mut words = lyndon_words_lex(dim, max_len);
    words.sort_by_key(Vec::len);
    words
}

/// Bracketing of a word by repeated standard factorisation
pub fn standard_bracketing(word: &[usize]) -> Bracket {
    if word.len() <= 1 {
        return Bracket::Letter(word.first().copied().unwrap_or(0));
    }
    let split = (1..word.len())
        .find(|&i| is_lyndon(&word[i..]))
        .unwrap_or(word.len() - 1);
    Bracket::node(
        standard_bracketing(&word[..split]),
        standard_bracketing(&word[split..]),
    )
}

/// The Lyndon basis as bracket strings, in log-signature order
pub fn basis_strings(dim: usize, level: Level) -> Vec<String> {
    lyndon_words(dim, level)
        .iter()
        .map(|w| standard_bracketing(w).to_string())
        .collect()
}

/// The Lyndon basis of the free Lie algebra truncated at `shape.level`
pub fn lyndon_basis(shape: Shape) -> Result<Basis> {
    let elements = lyndon_words(shape.dim, shape.level)
        .iter()
        .map(|w| BasisElement::from_bracket(standard_bracketing(w)))
        .collect();
    Basis::new(shape, elements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::logsiglength;
    use crate::test_macros::*;

    test_eqs! {
        lyndon_12: is_lyndon(&[1, 2]) => true,
        lyndon_112: is_lyndon(&[1, 1, 2]) => true,
        not_lyndon_22: is_lyndon(&[2, 2]) => false,
        not_lyndon_121: is_lyndon(&[1, 2, 1]) => false,
        not_lyndon_empty: is_lyndon(&[]) => false,
        words_d2_l3: lyndon_words(2, 3)
            => vec![vec![1], vec![2], vec![1, 2], vec![1, 1, 2], vec![1, 2, 2]],
        brackets_d2_l4: basis_strings(2, 4) => vec![
            "1", "2", "[1,2]", "[1,[1,2]]", "[[1,2],2]",
            "[1,[1,[1,2]]]", "[1,[[1,2],2]]", "[[[1,2],2],2]",
        ],
        brackets_d3_l2: basis_strings(3, 2)
            => vec!["1", "2", "3", "[1,2]", "[1,3]", "[2,3]"],
        one_letter: basis_strings(1, 4) => vec!["1"],
        split_1213: standard_bracketing(&[1, 2, 1, 3]).to_string() => "[[1,2],[1,3]]".to_string()
    }

    #[test]
    fn sizes_match_witt_formula() {
        for dim in 1..=4 {
            for level in 1..=5 {
                assert_eq!(lyndon_words(dim, level).len(), logsiglength(dim, level));
            }
        }
    }

    #[test]
    fn basis_strings_roundtrip_through_parser() {
        for text in basis_strings(3, 4) {
            assert_eq!(Bracket::parse(&text).unwrap().to_string(), text);
        }
    }

    #[test]
    fn lyndon_basis_is_flagged() {
        let b = lyndon_basis(Shape::new(3, 4)).unwrap();
        assert_eq!(b.len(), 32);
        assert!(b.is_lyndon());
    }
}
