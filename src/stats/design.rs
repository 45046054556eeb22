//! Factor coding and least squares for the two-way layout
//!
//! Model matrices are never materialized as a whole: term columns are pushed
//! one at a time into an orthonormal basis (modified Gram-Schmidt with one
//! re-orthogonalization pass). A column that is numerically inside the span of
//! the basis is aliased and contributes no degree of freedom, which is how
//! empty interaction cells and single-level factors are absorbed.

use crate::error::AnalysisError;

/// Squared-norm ratio below which a pushed column counts as aliased
const ALIAS_TOLERANCE: f64 = 1e-10;

/// Categorical factor with observed levels in declared order
#[derive(Debug, Clone, PartialEq)]
pub struct Factor {
    name: String,
    levels: Vec<String>,
    codes: Vec<usize>,
}

impl Factor {
    /// Levels are the distinct observed values sorted by `Ord`, so data order
    /// never changes the coding.
    pub fn new<T: Ord + Copy>(name: &str, values: &[T], label: impl Fn(T) -> String) -> Self {
        let mut observed = values.to_vec();
        observed.sort();
        observed.dedup();

        let codes = values
            .iter()
            .map(|v| observed.binary_search(v).unwrap_or_else(|slot| slot))
            .collect();

        Self {
            name: name.to_string(),
            levels: observed.into_iter().map(label).collect(),
            codes,
        }
    }

    /// Cross of two factors over their observed cells
    pub fn interaction(a: &Factor, b: &Factor) -> Self {
        let pairs: Vec<(usize, usize)> = a.codes.iter().copied().zip(b.codes.iter().copied()).collect();
        Factor::new(&format!("{}:{}", a.name, b.name), &pairs, |(i, j)| {
            format!("{}:{}", a.levels[i], b.levels[j])
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn levels(&self) -> &[String] {
        &self.levels
    }

    pub fn n_levels(&self) -> usize {
        self.levels.len()
    }

    pub fn codes(&self) -> &[usize] {
        &self.codes
    }

    /// Response values split by level
    pub fn groups(&self, response: &[f64]) -> Vec<Vec<f64>> {
        let mut groups = vec![Vec::new(); self.levels.len()];
        for (code, value) in self.codes.iter().zip(response) {
            groups[*code].push(*value);
        }
        groups
    }

    /// Fails when fewer than two levels were observed
    pub fn require_levels(&self) -> Result<(), AnalysisError> {
        if self.n_levels() < 2 {
            return Err(AnalysisError::precondition(format!(
                "factor '{}' has {} observed level(s)",
                self.name,
                self.n_levels()
            )));
        }
        Ok(())
    }
}

/// Response with two crossed factors
#[derive(Debug, Clone, PartialEq)]
pub struct TwoWayLayout {
    pub response: Vec<f64>,
    pub a: Factor,
    pub b: Factor,
}

impl TwoWayLayout {
    pub fn n(&self) -> usize {
        self.response.len()
    }

    pub fn cells(&self) -> Factor {
        Factor::interaction(&self.a, &self.b)
    }
}

/// Contrast coding of factor columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coding {
    /// Indicators of levels 2..k against the first level
    Treatment,
    /// Sum-to-zero: level j → 1, last level → -1
    Sum,
}

/// Model term of the two-way layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Term {
    Intercept,
    A,
    B,
    Interaction,
}

impl Term {
    pub fn label(self, layout: &TwoWayLayout) -> String {
        match self {
            Term::Intercept => "(Intercept)".to_string(),
            Term::A => layout.a.name().to_string(),
            Term::B => layout.b.name().to_string(),
            Term::Interaction => format!("{}:{}", layout.a.name(), layout.b.name()),
        }
    }

    /// Design columns of this term
    pub fn columns(self, layout: &TwoWayLayout, coding: Coding) -> Vec<Vec<f64>> {
        match self {
            Term::Intercept => vec![vec![1.0; layout.n()]],
            Term::A => factor_columns(&layout.a, coding),
            Term::B => factor_columns(&layout.b, coding),
            Term::Interaction => {
                let a_cols = factor_columns(&layout.a, coding);
                let b_cols = factor_columns(&layout.b, coding);
                a_cols
                    .iter()
                    .flat_map(|ac| {
                        b_cols
                            .iter()
                            .map(move |bc| ac.iter().zip(bc).map(|(x, y)| x * y).collect())
                    })
                    .collect()
            }
        }
    }
}

fn factor_columns(factor: &Factor, coding: Coding) -> Vec<Vec<f64>> {
    let k = factor.n_levels();
    if k < 2 {
        return Vec::new();
    }
    let last = k - 1;

    match coding {
        Coding::Treatment => (1..k)
            .map(|level| {
                factor
                    .codes()
                    .iter()
                    .map(|&c| if c == level { 1.0 } else { 0.0 })
                    .collect()
            })
            .collect(),
        Coding::Sum => (0..last)
            .map(|level| {
                factor
                    .codes()
                    .iter()
                    .map(|&c| {
                        if c == level {
                            1.0
                        } else if c == last {
                            -1.0
                        } else {
                            0.0
                        }
                    })
                    .collect()
            })
            .collect(),
    }
}

/// Orthonormal basis of the column space pushed so far
#[derive(Debug, Clone)]
pub struct OrthoBasis {
    vectors: Vec<Vec<f64>>,
}

impl OrthoBasis {
    pub fn new() -> Self {
        Self { vectors: Vec::new() }
    }

    pub fn rank(&self) -> usize {
        self.vectors.len()
    }

    /// Add a column; returns false when it is aliased with the current span
    pub fn push(&mut self, column: &[f64]) -> bool {
        let original = dot(column, column);
        if original == 0.0 {
            return false;
        }

        let mut v = column.to_vec();
        for _ in 0..2 {
            for q in &self.vectors {
                let proj = dot(q, &v);
                v.iter_mut().zip(q).for_each(|(vi, qi)| *vi -= proj * qi);
            }
        }

        let remaining = dot(&v, &v);
        if remaining <= ALIAS_TOLERANCE * original {
            return false;
        }

        let norm = remaining.sqrt();
        v.iter_mut().for_each(|vi| *vi /= norm);
        self.vectors.push(v);
        true
    }

    /// Push every column of a term, returning how many were not aliased
    pub fn push_term(&mut self, columns: &[Vec<f64>]) -> usize {
        columns.iter().filter(|col| self.push(col)).count()
    }

    /// y minus its projection onto the basis
    pub fn residuals(&self, y: &[f64]) -> Vec<f64> {
        let mut r = y.to_vec();
        for q in &self.vectors {
            let proj = dot(q, &r);
            r.iter_mut().zip(q).for_each(|(ri, qi)| *ri -= proj * qi);
        }
        r
    }

    pub fn rss(&self, y: &[f64]) -> f64 {
        let r = self.residuals(y);
        dot(&r, &r)
    }
}

impl Default for OrthoBasis {
    fn default() -> Self {
        Self::new()
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn layout() -> TwoWayLayout {
        let a_values = [2u8, 1, 1, 2, 2, 1];
        let b_values = ["x", "y", "x", "y", "x", "x"];
        TwoWayLayout {
            response: vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            a: Factor::new("a", &a_values, |v| v.to_string()),
            b: Factor::new("b", &b_values, |v| v.to_string()),
        }
    }

    #[test]
    fn test_levels_follow_declared_order() {
        let l = layout();
        assert_eq!(l.a.levels(), &["1".to_string(), "2".to_string()]);
        assert_eq!(l.a.codes(), &[1, 0, 0, 1, 1, 0]);

        let cells = l.cells();
        assert_eq!(cells.n_levels(), 4);
        assert_eq!(cells.levels()[0], "1:x");
        assert_eq!(cells.name(), "a:b");
    }

    #[test]
    fn test_sum_coding() {
        let l = layout();
        let cols = Term::A.columns(&l, Coding::Sum);
        assert_eq!(cols, vec![vec![-1.0, 1.0, 1.0, -1.0, -1.0, 1.0]]);

        let treatment = Term::A.columns(&l, Coding::Treatment);
        assert_eq!(treatment, vec![vec![1.0, 0.0, 0.0, 1.0, 1.0, 0.0]]);
    }

    #[test]
    fn test_aliased_columns_add_no_rank() {
        let mut basis = OrthoBasis::new();
        assert!(basis.push(&[1.0, 1.0, 1.0, 1.0]));
        assert!(basis.push(&[1.0, 0.0, 1.0, 0.0]));
        // Complement indicator lies in the span of the first two
        assert!(!basis.push(&[0.0, 1.0, 0.0, 1.0]));
        assert!(!basis.push(&[0.0; 4]));
        assert_eq!(basis.rank(), 2);
    }

    #[test]
    fn test_rss_of_group_means() {
        let l = layout();
        let mut basis = OrthoBasis::new();
        basis.push_term(&Term::Intercept.columns(&l, Coding::Treatment));
        basis.push_term(&Term::A.columns(&l, Coding::Treatment));

        // Level 1: {2, 3, 6}, level 2: {1, 4, 5}
        let expected: f64 = [2.0f64, 3.0, 6.0]
            .iter()
            .map(|v| (v - 11.0 / 3.0).powi(2))
            .chain([1.0f64, 4.0, 5.0].iter().map(|v| (v - 10.0 / 3.0).powi(2)))
            .sum();
        assert_relative_eq!(basis.rss(&l.response), expected, epsilon = 1e-10);
    }

    #[test]
    fn test_single_level_factor_has_no_columns() {
        let f = Factor::new("only", &[1, 1, 1], |v| v.to_string());
        assert!(factor_columns(&f, Coding::Sum).is_empty());
        assert!(f.require_levels().unwrap_err().is_not_applicable());
    }
}
