//! GR(1) specifications handed to the game solver.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::BitOr;

use crate::formula::Formula;

/// Domain of a specification variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarDomain {
    Bool,
    /// Integer range, both ends inclusive.
    Int { min: i64, max: i64 },
}

impl fmt::Display for VarDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarDomain::Bool => write!(f, "boolean"),
            VarDomain::Int { min, max } => write!(f, "{{{}..{}}}", min, max),
        }
    }
}

/// GR(1) specification
///
/// ```text
/// (env_init & []env_safety & []<>env_prog) -> (sys_init & []sys_safety & []<>sys_prog)
/// ```
///
/// Each list is read as a conjunction. Safety formulas may use `X` to talk about the next step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GrSpec {
    pub env_vars: BTreeMap<String, VarDomain>,
    pub sys_vars: BTreeMap<String, VarDomain>,
    pub env_init: Vec<Formula>,
    pub sys_init: Vec<Formula>,
    pub env_safety: Vec<Formula>,
    pub sys_safety: Vec<Formula>,
    pub env_prog: Vec<Formula>,
    pub sys_prog: Vec<Formula>,
}

impl GrSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Formula lists, in a fixed order.
    fn lists_mut(&mut self) -> [&mut Vec<Formula>; 6] {
        [
            &mut self.env_init,
            &mut self.sys_init,
            &mut self.env_safety,
            &mut self.sys_safety,
            &mut self.env_prog,
            &mut self.sys_prog,
        ]
    }

    /// Replace atoms by formulas in every part of the specification.
    ///
    /// Variable declarations are left untouched.
    pub fn sym_to_prop(&mut self, defs: &BTreeMap<String, Formula>) {
        for list in self.lists_mut() {
            for f in list.iter_mut() {
                for (name, by) in defs {
                    *f = f.substitute(name, by);
                }
            }
        }
    }

    /// Conjoin another specification into this one.
    ///
    /// Variables declared in both keep the domain from `self`.
    pub fn merge(&mut self, other: GrSpec) {
        for (name, dom) in other.env_vars {
            self.env_vars.entry(name).or_insert(dom);
        }
        for (name, dom) in other.sys_vars {
            self.sys_vars.entry(name).or_insert(dom);
        }
        self.env_init.extend(other.env_init);
        self.sys_init.extend(other.sys_init);
        self.env_safety.extend(other.env_safety);
        self.sys_safety.extend(other.sys_safety);
        self.env_prog.extend(other.env_prog);
        self.sys_prog.extend(other.sys_prog);
    }

    /// The specification as a single LTL implication.
    pub fn to_formula(&self) -> Formula {
        fn side(init: &[Formula], safety: &[Formula], prog: &[Formula]) -> Formula {
            let init = Formula::all(init.iter().cloned());
            let safety = Formula::all(safety.iter().cloned()).always();
            let prog = Formula::all(prog.iter().map(|p| p.clone().eventually().always()));
            init.and(safety).and(prog)
        }
        let assumption = side(&self.env_init, &self.env_safety, &self.env_prog);
        let guarantee = side(&self.sys_init, &self.sys_safety, &self.sys_prog);
        assumption.implies(guarantee)
    }
}

impl BitOr for GrSpec {
    type Output = GrSpec;

    fn bitor(mut self, rhs: GrSpec) -> GrSpec {
        self.merge(rhs);
        self
    }
}

impl fmt::Display for GrSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn vars(f: &mut fmt::Formatter<'_>, title: &str, vars: &BTreeMap<String, VarDomain>) -> fmt::Result {
            let parts: Vec<String> = vars.iter().map(|(n, d)| format!("{}: {}", n, d)).collect();
            writeln!(f, "{}: {}", title, parts.join(", "))
        }
        fn list(f: &mut fmt::Formatter<'_>, title: &str, fs: &[Formula]) -> fmt::Result {
            writeln!(f, "{}:", title)?;
            for phi in fs {
                writeln!(f, "  {}", phi)?;
            }
            Ok(())
        }
        vars(f, "ENV VARS", &self.env_vars)?;
        vars(f, "SYS VARS", &self.sys_vars)?;
        list(f, "ENV INIT", &self.env_init)?;
        list(f, "SYS INIT", &self.sys_init)?;
        list(f, "ENV SAFETY", &self.env_safety)?;
        list(f, "SYS SAFETY", &self.sys_safety)?;
        list(f, "ENV PROGRESS", &self.env_prog)?;
        list(f, "SYS PROGRESS", &self.sys_prog)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn sample() -> GrSpec {
        let mut spec = GrSpec::new();
        spec.env_vars.insert("x".to_string(), VarDomain::Bool);
        spec.sys_vars.insert("y".to_string(), VarDomain::Bool);
        spec.env_prog = vec![Formula::atom("x").not(), Formula::atom("x")];
        spec.sys_prog = vec![Formula::atom("y").and(Formula::atom("x").not())];
        spec
    }

    #[test]
    fn test_sym_to_prop() {
        let mut spec = sample();
        let defs: BTreeMap<String, Formula> = [
            ("x".to_string(), Formula::atom("bar")),
            ("y".to_string(), Formula::atom("uber").or(Formula::atom("cat"))),
        ]
        .into_iter()
        .collect();
        spec.sym_to_prop(&defs);
        assert_eq!(spec.env_vars.len(), 1);
        assert_eq!(spec.sys_vars.len(), 1);
        assert_eq!(spec.env_prog[0].to_string(), "!bar");
        assert_eq!(spec.env_prog[1].to_string(), "bar");
        assert_eq!(spec.sys_prog[0].to_string(), "((uber | cat) & !bar)");
    }

    #[test]
    fn test_merge() {
        let mut other = GrSpec::new();
        other.sys_vars.insert("y".to_string(), VarDomain::Int { min: 0, max: 3 });
        other.sys_vars.insert("z".to_string(), VarDomain::Bool);
        other.sys_safety.push(Formula::atom("z"));
        let merged = sample() | other;
        assert_eq!(merged.sys_vars["y"], VarDomain::Bool);
        assert_eq!(merged.sys_vars.len(), 2);
        assert_eq!(merged.sys_safety, vec![Formula::atom("z")]);
        assert_eq!(merged.env_prog.len(), 2);
    }

    #[test]
    fn test_to_formula() {
        let mut spec = GrSpec::new();
        spec.sys_prog.push(Formula::atom("goal"));
        assert_eq!(
            spec.to_formula().to_string(),
            "(((True & []True) & True) -> ((True & []True) & []<>goal))"
        );
    }
}
