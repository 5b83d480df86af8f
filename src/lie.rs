//! Evaluate Lie brackets in the tensor algebra, and move log-signatures
//! between Hall basis coordinates and full tensor coordinates

use crate::{
    algebra::{word_to_index, Algebra, Level, Shape},
    bracket::Bracket,
    error::{Result, SigError},
    graded::{Graded, GradedMut},
    hall,
    series::{LieSeries, TensorSeries},
};
use nalgebra::{DMatrix, DVector};

/// Singular values below this are treated as zero by the least-squares solves
const SVD_EPS: f64 = 1e-12;

/// Value of a bracket expression in the tensor algebra over `dim` generators,
/// with its level. A letter `k` is the basis vector `e_k`, and a node is the
/// commutator `[a, b] = a ⊗ b - b ⊗ a`
pub fn evaluate(expr: &Bracket, dim: usize) -> Result<(Vec<f64>, Level)> {
    match expr {
        Bracket::Letter(k) => {
            if *k == 0 || *k > dim {
                return Err(SigError::LetterOutOfRange { letter: *k, dim });
            }
            let mut v = vec![0.0; dim];
            v[k - 1] = 1.0;
            Ok((v, 1))
        }
        Bracket::Node(left, right) => {
            let (vl, depth_l) = evaluate(left, dim)?;
            let (vr, depth_r) = evaluate(right, dim)?;
            let mut res = outer(&vl, &vr);
            for (r, x) in res.iter_mut().zip(outer(&vr, &vl)) {
                *r -= x;
            }
            Ok((res, depth_l + depth_r))
        }
    }
}

/// Parse and evaluate in one go, eg. `value_of_bracket("[1,2]", 2)` is
/// `([0, 1, -1, 0], 2)`
pub fn value_of_bracket(text: &str, dim: usize) -> Result<(Vec<f64>, Level)> {
    evaluate(&Bracket::parse(text)?, dim)
}

/// Flattened row-major outer product
fn outer(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter()
        .flat_map(|x| b.iter().map(move |y| x * y))
        .collect()
}

/// One element of a Hall basis: its text, parsed form and level
#[derive(Debug, Clone, PartialEq)]
pub struct BasisElement {
    pub text: String,
    pub expr: Bracket,
    pub depth: Level,
}

impl BasisElement {
    pub fn parse(text: &str) -> Result<Self> {
        let expr = Bracket::parse(text)?;
        Ok(BasisElement {
            text: text.to_owned(),
            depth: expr.degree(),
            expr,
        })
    }

    pub fn from_bracket(expr: Bracket) -> Self {
        BasisElement {
            text: expr.to_string(),
            depth: expr.degree(),
            expr,
        }
    }
}

/// An ordered basis of the free Lie algebra truncated at some level, each
/// element already evaluated in the tensor algebra
#[derive(Debug, Clone)]
pub struct Basis {
    shape: Shape,
    elements: Vec<BasisElement>,
    /// The tensor value of each element, at its own level
    values: Vec<Vec<f64>>,
    /// Whether every element is a Lyndon word with its standard bracketing
    lyndon: bool,
}

impl Basis {
    pub fn new(shape: Shape, elements: Vec<BasisElement>) -> Result<Self> {
        let mut values = Vec::with_capacity(elements.len());
        for e in &elements {
            if e.depth > shape.level {
                return Err(SigError::DepthExceedsLevel {
                    depth: e.depth,
                    level: shape.level,
                });
            }
            values.push(evaluate(&e.expr, shape.dim)?.0);
        }
        let lyndon = elements.iter().all(|e| {
            let word = e.expr.letters();
            hall::is_lyndon(&word) && hall::standard_bracketing(&word) == e.expr
        });
        Ok(Basis {
            shape,
            elements,
            values,
            lyndon,
        })
    }

    /// Parse a basis given as bracket strings, in log-signature order
    pub fn from_strings<S: AsRef<str>>(shape: Shape, texts: &[S]) -> Result<Self> {
        let elements = texts
            .iter()
            .map(|t| BasisElement::parse(t.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Self::new(shape, elements)
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn elements(&self) -> &[BasisElement] {
        &self.elements
    }

    pub fn strings(&self) -> Vec<String> {
        self.elements.iter().map(|e| e.text.clone()).collect()
    }

    pub fn is_lyndon(&self) -> bool {
        self.lyndon
    }

    /// Expand Hall basis coordinates into full tensor coordinates:
    /// `sum_i coeffs[i] * value(basis[i])`
    pub fn expand(&self, coeffs: &[f64]) -> Result<LieSeries> {
        if coeffs.len() != self.len() {
            return Err(SigError::CoefficientCount {
                expected: self.len(),
                found: coeffs.len(),
            });
        }
        let mut res = TensorSeries::zeros(self.shape);
        for ((e, v), c) in self.elements.iter().zip(&self.values).zip(coeffs) {
            for (r, x) in res.level_slice_mut(e.depth).iter_mut().zip(v) {
                *r += c * x;
            }
        }
        Ok(LieSeries::from_tensor(res))
    }

    /// The `siglength x len` matrix whose columns are the basis elements in
    /// full flat tensor coordinates
    pub fn matrix(&self) -> DMatrix<f64> {
        let mut m = DMatrix::zeros(self.shape.sig_len(), self.len());
        for (col, (e, v)) in self.elements.iter().zip(&self.values).enumerate() {
            let offset = self.shape.level_offset(e.depth);
            for (i, x) in v.iter().enumerate() {
                m[(offset + i, col)] = *x;
            }
        }
        m
    }

    /// Moore-Penrose pseudo-inverse of [`Basis::matrix`]. Multiplying a
    /// flattened Lie element by it gives its basis coordinates
    pub fn pseudo_inverse(&self) -> Result<DMatrix<f64>> {
        self.matrix()
            .pseudo_inverse(SVD_EPS)
            .map_err(SigError::Solve)
    }

    /// Basis coordinates of a Lie element, by least squares on the full
    /// tensor coordinates
    pub fn project_least_squares(&self, full: &LieSeries) -> Result<Vec<f64>> {
        self.shape.ensure_eq(full.shape())?;
        let b = DVector::from_vec(full.to_flat());
        let svd = self.matrix().svd(true, true);
        let x = svd.solve(&b, SVD_EPS).map_err(SigError::Solve)?;
        Ok(x.iter().copied().collect())
    }

    /// Basis coordinates of a Lie element, using a precomputed
    /// [`Basis::pseudo_inverse`]
    pub fn project_with(&self, pinv: &DMatrix<f64>, full: &LieSeries) -> Result<Vec<f64>> {
        self.shape.ensure_eq(full.shape())?;
        let b = DVector::from_vec(full.to_flat());
        Ok((pinv * b).iter().copied().collect())
    }

    /// Basis coordinates of a Lie element by forward substitution. Only for
    /// Lyndon bases: the standard bracketing of a Lyndon word `w` expands to
    /// `w` plus words of the same length that are lexicographically greater,
    /// so reading the coordinates at the Lyndon words in increasing order
    /// gives a triangular system
    pub fn project_lyndon(&self, full: &LieSeries) -> Result<Vec<f64>> {
        self.shape.ensure_eq(full.shape())?;
        if !self.lyndon {
            return Err(SigError::Solve("basis is not Lyndon-bracketed"));
        }
        let dim = self.shape.dim;
        let mut coeffs = vec![0.0; self.len()];
        for m in 1..=self.shape.level {
            let mut order: Vec<(usize, usize)> = self
                .elements
                .iter()
                .enumerate()
                .filter(|(_, e)| e.depth == m)
                .map(|(i, e)| (word_to_index(&e.expr.letters(), dim), i))
                .collect();
            order.sort_unstable();
            let target = full.level_slice(m);
            for (k, &(w, i)) in order.iter().enumerate() {
                let below: f64 = order[..k]
                    .iter()
                    .map(|&(_, u)| coeffs[u] * self.values[u][w])
                    .sum();
                coeffs[i] = (target[w] - below) / self.values[i][w];
            }
        }
        Ok(coeffs)
    }
}
