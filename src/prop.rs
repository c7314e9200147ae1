//! Atomic propositions over the continuous state.
//!
//! Every partition carries its own [`Propositions`]; there is no global registry, so two
//! partitions built for different goals never share proposition meanings by accident.

use nalgebra::DVector;

use crate::error::{ConfigError, Result};
use crate::polytope::Polytope;
use crate::region::Valuation;

/// Ordered mapping from proposition name to its true-set (a union of polytopes).
///
/// Insertion order is significant: partition construction splits on propositions in this order.
#[derive(Debug, Clone, PartialEq)]
pub struct Propositions {
    dim: usize,
    entries: Vec<(String, Vec<Polytope>)>,
}

impl Propositions {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            entries: Vec::new(),
        }
    }

    /// Add a proposition true exactly on the union of `polytopes`.
    ///
    /// Fails if the name is taken, empty, or if any polytope lives in a different space.
    pub fn insert(&mut self, name: impl Into<String>, polytopes: Vec<Polytope>) -> Result<()> {
        let name = name.into();
        if name.is_empty() {
            return Err(ConfigError::MalformedProposition {
                name,
                reason: "empty name".to_string(),
            }
            .into());
        }
        if self.get(&name).is_some() {
            return Err(ConfigError::MalformedProposition {
                name,
                reason: "declared twice".to_string(),
            }
            .into());
        }
        if let Some(p) = polytopes.iter().find(|p| p.dim() != self.dim) {
            return Err(ConfigError::MalformedProposition {
                reason: format!("polytope of dimension {} in a {}-dimensional space", p.dim(), self.dim),
                name,
            }
            .into());
        }
        self.entries.push((name, polytopes));
        Ok(())
    }

    /// Builder-style [`Propositions::insert`].
    pub fn with(mut self, name: impl Into<String>, polytopes: Vec<Polytope>) -> Result<Self> {
        self.insert(name, polytopes)?;
        Ok(self)
    }

    pub fn dim(&self) -> usize {
        self.dim
    }
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&[Polytope]> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, p)| p.as_slice())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Polytope])> {
        self.entries.iter().map(|(n, p)| (n.as_str(), p.as_slice()))
    }

    /// Valuation of a single continuous state.
    pub fn evaluate(&self, x: &DVector<f64>) -> Valuation {
        self.entries
            .iter()
            .map(|(n, ps)| (n.clone(), ps.iter().any(|p| p.contains(x))))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_insert_and_evaluate() {
        let props = Propositions::new(1)
            .with("left", vec![Polytope::from_box(&[0.0], &[3.0])])
            .unwrap()
            .with("far", vec![Polytope::from_box(&[5.0], &[6.0])])
            .unwrap();
        assert_eq!(props.names().collect::<Vec<_>>(), vec!["left", "far"]);
        let v = props.evaluate(&DVector::from_vec(vec![1.0]));
        assert_eq!(v["left"], true);
        assert_eq!(v["far"], false);
    }

    #[test]
    fn test_rejects_wrong_dimension() {
        let mut props = Propositions::new(2);
        let err = props
            .insert("p", vec![Polytope::from_box(&[0.0], &[1.0])])
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(props.is_empty());
    }

    #[test]
    fn test_rejects_duplicates() {
        let mut props = Propositions::new(1);
        props.insert("p", vec![]).unwrap();
        assert!(props.insert("p", vec![]).is_err());
    }
}
