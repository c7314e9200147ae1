//! Propositional and LTL formulas used for specification fragments.

use std::collections::BTreeSet;
use std::fmt;

use crate::region::Valuation;

/// LTL formula abstract syntax tree.
///
/// Atoms are boolean propositions; `Eq` compares an integer-valued variable (such as the
/// discrete location) against a constant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Formula {
    True,
    False,
    /// Atomic proposition
    Atom(String),
    /// Integer variable equals a value
    Eq(String, i64),
    Not(Box<Formula>),
    And(Box<Formula>, Box<Formula>),
    Or(Box<Formula>, Box<Formula>),
    Implies(Box<Formula>, Box<Formula>),
    Iff(Box<Formula>, Box<Formula>),
    /// Next: X φ
    Next(Box<Formula>),
    /// Globally: [] φ
    Always(Box<Formula>),
    /// Finally: <> φ
    Eventually(Box<Formula>),
}

impl Formula {
    pub fn atom(s: impl Into<String>) -> Self {
        Formula::Atom(s.into())
    }

    pub fn var_eq(var: impl Into<String>, value: i64) -> Self {
        Formula::Eq(var.into(), value)
    }

    pub fn not(self) -> Self {
        Formula::Not(Box::new(self))
    }

    pub fn and(self, other: Self) -> Self {
        Formula::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Self) -> Self {
        Formula::Or(Box::new(self), Box::new(other))
    }

    pub fn implies(self, other: Self) -> Self {
        Formula::Implies(Box::new(self), Box::new(other))
    }

    pub fn iff(self, other: Self) -> Self {
        Formula::Iff(Box::new(self), Box::new(other))
    }

    pub fn next(self) -> Self {
        Formula::Next(Box::new(self))
    }

    pub fn always(self) -> Self {
        Formula::Always(Box::new(self))
    }

    pub fn eventually(self) -> Self {
        Formula::Eventually(Box::new(self))
    }

    /// Conjunction of all formulas; `True` when empty.
    pub fn all(formulas: impl IntoIterator<Item = Formula>) -> Self {
        formulas
            .into_iter()
            .reduce(|acc, f| acc.and(f))
            .unwrap_or(Formula::True)
    }

    /// Disjunction of all formulas; `False` when empty.
    pub fn any(formulas: impl IntoIterator<Item = Formula>) -> Self {
        formulas
            .into_iter()
            .reduce(|acc, f| acc.or(f))
            .unwrap_or(Formula::False)
    }

    /// `var ∈ values`, as a disjunction of equalities.
    pub fn var_in(var: &str, values: impl IntoIterator<Item = i64>) -> Self {
        Self::any(values.into_iter().map(|v| Formula::var_eq(var, v)))
    }

    /// Check whether the formula contains no temporal operators.
    pub fn is_propositional(&self) -> bool {
        match self {
            Formula::True | Formula::False | Formula::Atom(_) | Formula::Eq(..) => true,
            Formula::Not(f) => f.is_propositional(),
            Formula::And(f, g) | Formula::Or(f, g) | Formula::Implies(f, g) | Formula::Iff(f, g) => {
                f.is_propositional() && g.is_propositional()
            }
            Formula::Next(_) | Formula::Always(_) | Formula::Eventually(_) => false,
        }
    }

    /// Names of all atomic propositions.
    pub fn atoms(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_atoms(&mut out);
        out
    }

    fn collect_atoms(&self, out: &mut BTreeSet<String>) {
        match self {
            Formula::Atom(p) => {
                out.insert(p.clone());
            }
            Formula::True | Formula::False | Formula::Eq(..) => {}
            Formula::Not(f) | Formula::Next(f) | Formula::Always(f) | Formula::Eventually(f) => {
                f.collect_atoms(out)
            }
            Formula::And(f, g) | Formula::Or(f, g) | Formula::Implies(f, g) | Formula::Iff(f, g) => {
                f.collect_atoms(out);
                g.collect_atoms(out);
            }
        }
    }

    /// Replace every occurrence of atom `name` by `by`.
    pub fn substitute(&self, name: &str, by: &Formula) -> Formula {
        let sub = |f: &Formula| Box::new(f.substitute(name, by));
        match self {
            Formula::Atom(p) if p == name => by.clone(),
            Formula::True | Formula::False | Formula::Atom(_) | Formula::Eq(..) => self.clone(),
            Formula::Not(f) => Formula::Not(sub(f)),
            Formula::And(f, g) => Formula::And(sub(f), sub(g)),
            Formula::Or(f, g) => Formula::Or(sub(f), sub(g)),
            Formula::Implies(f, g) => Formula::Implies(sub(f), sub(g)),
            Formula::Iff(f, g) => Formula::Iff(sub(f), sub(g)),
            Formula::Next(f) => Formula::Next(sub(f)),
            Formula::Always(f) => Formula::Always(sub(f)),
            Formula::Eventually(f) => Formula::Eventually(sub(f)),
        }
    }

    /// Evaluate a propositional formula.
    ///
    /// Returns `None` if the formula is temporal or mentions a variable the lookups do not know.
    pub fn eval_with<A, E>(&self, atom: &A, eq: &E) -> Option<bool>
    where
        A: Fn(&str) -> Option<bool>,
        E: Fn(&str, i64) -> Option<bool>,
    {
        match self {
            Formula::True => Some(true),
            Formula::False => Some(false),
            Formula::Atom(p) => atom(p),
            Formula::Eq(v, k) => eq(v, *k),
            Formula::Not(f) => f.eval_with(atom, eq).map(|b| !b),
            Formula::And(f, g) => Some(f.eval_with(atom, eq)? && g.eval_with(atom, eq)?),
            Formula::Or(f, g) => Some(f.eval_with(atom, eq)? || g.eval_with(atom, eq)?),
            Formula::Implies(f, g) => Some(!f.eval_with(atom, eq)? || g.eval_with(atom, eq)?),
            Formula::Iff(f, g) => Some(f.eval_with(atom, eq)? == g.eval_with(atom, eq)?),
            Formula::Next(_) | Formula::Always(_) | Formula::Eventually(_) => None,
        }
    }

    /// Evaluate over a proposition valuation. Integer comparisons are unknown.
    pub fn eval(&self, valuation: &Valuation) -> Option<bool> {
        self.eval_with(&|p| valuation.get(p).copied(), &|_, _| None)
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Formula::True => write!(f, "True"),
            Formula::False => write!(f, "False"),
            Formula::Atom(p) => write!(f, "{}", p),
            Formula::Eq(v, k) => write!(f, "({} = {})", v, k),
            Formula::Not(phi) => write!(f, "!{}", phi),
            Formula::And(phi, psi) => write!(f, "({} & {})", phi, psi),
            Formula::Or(phi, psi) => write!(f, "({} | {})", phi, psi),
            Formula::Implies(phi, psi) => write!(f, "({} -> {})", phi, psi),
            Formula::Iff(phi, psi) => write!(f, "({} <-> {})", phi, psi),
            Formula::Next(phi) => write!(f, "X {}", phi),
            Formula::Always(phi) => write!(f, "[]{}", phi),
            Formula::Eventually(phi) => write!(f, "<>{}", phi),
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_display() {
        let f = Formula::atom("a").and(Formula::atom("b").not()).always();
        assert_eq!(f.to_string(), "[](a & !b)");
        let g = Formula::var_in("loc", [1, 2]).next();
        assert_eq!(g.to_string(), "X ((loc = 1) | (loc = 2))");
        assert_eq!(Formula::all(Vec::new()).to_string(), "True");
        assert_eq!(Formula::any(Vec::new()).to_string(), "False");
    }

    #[test]
    fn test_eval() {
        let v: Valuation = [("a".to_string(), true), ("b".to_string(), false)].into_iter().collect();
        assert_eq!(Formula::atom("a").implies(Formula::atom("b")).eval(&v), Some(false));
        assert_eq!(Formula::atom("a").iff(Formula::atom("b").not()).eval(&v), Some(true));
        assert_eq!(Formula::atom("c").eval(&v), None);
        assert_eq!(Formula::atom("a").eventually().eval(&v), None);
    }

    #[test]
    fn test_eval_with_location() {
        let f = Formula::var_in("loc", [0, 3]);
        let at = |loc: i64| f.eval_with(&|_| None, &|var, k| (var == "loc").then_some(k == loc));
        assert_eq!(at(3), Some(true));
        assert_eq!(at(1), Some(false));
    }

    #[test]
    fn test_substitute_and_atoms() {
        let f = Formula::atom("goal").always().eventually();
        let g = f.substitute("goal", &Formula::atom("a").or(Formula::atom("b")));
        assert_eq!(g.atoms().into_iter().collect::<Vec<_>>(), vec!["a", "b"]);
        assert!(!g.is_propositional());
        assert!(Formula::atom("a").and(Formula::var_eq("loc", 1)).is_propositional());
    }
}
