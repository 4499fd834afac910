//! Solver-agnostic 0/1 linear model and the boundary to the external solver.
//!
//! The batch formulator only ever talks to [`LpModel`] and [`LpBackend`]; the
//! concrete solver library lives behind the backend implementation.

pub mod microlp;

use std::fmt::{Display, Formatter};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConstraintType {
    Min,
    Max,
    Eq,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Variable(u32);

impl Variable {
    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
struct VariableDef {
    weight: f64,
    #[cfg(debug_assertions)]
    name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Constraint {
    pub constraint_type: ConstraintType,
    pub value: f64,
    pub terms: Vec<(Variable, f64)>,
    #[cfg(debug_assertions)]
    name: Option<String>,
}

/// Minimization problem over binary variables.
#[derive(Debug, Clone, Default)]
pub struct LpModel {
    variables: Vec<VariableDef>,
    constraints: Vec<Constraint>,
    #[cfg(debug_assertions)]
    name_config: Option<String>,
}

#[cfg(debug_assertions)]
impl LpModel {
    /// Names the next created variable or constraint. Names only exist in
    /// debug builds and are used when the model is dumped.
    #[inline]
    pub fn set_name<F>(&mut self, create_name: F)
    where
        F: FnOnce() -> String,
    {
        self.name_config = Some(create_name());
    }

    #[inline]
    fn take_name(&mut self) -> Option<String> {
        self.name_config.take()
    }
}

#[cfg(not(debug_assertions))]
impl LpModel {
    #[inline]
    pub fn set_name<F>(&mut self, _create_name: F)
    where
        F: FnOnce() -> String,
    {
        // Do nothing
    }
}

impl LpModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a binary variable with the given objective coefficient.
    pub fn add_bool_variable(&mut self, weight: f64) -> Variable {
        let var = Variable(self.variables.len() as u32);
        #[cfg(debug_assertions)]
        let name = self.take_name();
        self.variables.push(VariableDef {
            weight,
            #[cfg(debug_assertions)]
            name,
        });
        var
    }

    pub fn add_constraint(
        &mut self,
        constraint_type: ConstraintType,
        value: f64,
        variables: impl Iterator<Item = (Variable, f64)>,
    ) {
        #[cfg(debug_assertions)]
        let name = self.take_name();
        self.constraints.push(Constraint {
            constraint_type,
            value,
            terms: variables.collect(),
            #[cfg(debug_assertions)]
            name,
        });
    }

    #[inline]
    pub fn add_max_constraint(
        &mut self,
        max: f64,
        variables: impl Iterator<Item = (Variable, f64)>,
    ) {
        self.add_constraint(ConstraintType::Max, max, variables)
    }

    #[inline]
    pub fn add_min_constraint(
        &mut self,
        min: f64,
        variables: impl Iterator<Item = (Variable, f64)>,
    ) {
        self.add_constraint(ConstraintType::Min, min, variables)
    }

    #[inline]
    pub fn n_variables(&self) -> usize {
        self.variables.len()
    }

    #[inline]
    pub fn n_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Objective coefficients, indexed by [`Variable::index`].
    pub fn weights(&self) -> impl Iterator<Item = f64> + '_ {
        self.variables.iter().map(|v| v.weight)
    }

    #[inline]
    pub fn weight(&self, var: Variable) -> f64 {
        self.variables[var.index()].weight
    }

    #[inline]
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }
}

impl Display for LpModel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let var_name = |var: &Variable| -> String {
            #[cfg(debug_assertions)]
            if let Some(name) = &self.variables[var.index()].name {
                return name.clone();
            }
            format!("v{}", var.0)
        };
        write!(f, "minimize")?;
        for (i, def) in self.variables.iter().enumerate() {
            if def.weight != 0.0 {
                write!(f, " + {}*{}", def.weight, var_name(&Variable(i as u32)))?;
            }
        }
        writeln!(f)?;
        for c in &self.constraints {
            #[cfg(debug_assertions)]
            if let Some(name) = &c.name {
                write!(f, "{name}: ")?;
            }
            for (i, (var, weight)) in c.terms.iter().enumerate() {
                if i > 0 {
                    write!(f, " + ")?;
                }
                write!(f, "{}*{}", weight, var_name(var))?;
            }
            writeln!(
                f,
                " {} {}",
                match c.constraint_type {
                    ConstraintType::Min => ">=",
                    ConstraintType::Max => "<=",
                    ConstraintType::Eq => "==",
                },
                c.value
            )?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LpStatus {
    Optimal,
    Infeasible,
    /// Anything else the solver reports (unbounded model, internal failure).
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct LpOutcome {
    pub status: LpStatus,
    values: Vec<f64>,
    pub objective: f64,
}

impl LpOutcome {
    pub fn optimal(values: Vec<f64>, objective: f64) -> Self {
        LpOutcome {
            status: LpStatus::Optimal,
            values,
            objective,
        }
    }

    pub fn infeasible() -> Self {
        LpOutcome {
            status: LpStatus::Infeasible,
            values: Vec::new(),
            objective: 0.0,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        LpOutcome {
            status: LpStatus::Failed(message.into()),
            values: Vec::new(),
            objective: 0.0,
        }
    }

    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Binary value of a variable; `None` when the outcome carries no value for it.
    #[inline]
    pub fn is_set(&self, var: Variable) -> Option<bool> {
        self.values.get(var.index()).map(|v| *v > 0.5)
    }
}

/// External mixed-integer solver.
pub trait LpBackend: Send + Sync {
    fn solve(&self, model: &LpModel) -> LpOutcome;
}

impl<T: LpBackend + ?Sized> LpBackend for std::sync::Arc<T> {
    #[inline]
    fn solve(&self, model: &LpModel) -> LpOutcome {
        (**self).solve(model)
    }
}

impl<T: LpBackend + ?Sized> LpBackend for &T {
    #[inline]
    fn solve(&self, model: &LpModel) -> LpOutcome {
        (**self).solve(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_bookkeeping() {
        let mut model = LpModel::new();
        model.set_name(|| "x".to_string());
        let x = model.add_bool_variable(1.5);
        let y = model.add_bool_variable(0.0);
        model.set_name(|| "pick one".to_string());
        model.add_constraint(ConstraintType::Eq, 1.0, [(x, 1.0), (y, 1.0)].into_iter());
        assert_eq!(model.n_variables(), 2);
        assert_eq!(model.n_constraints(), 1);
        assert_eq!(model.weight(x), 1.5);
        let dump = model.to_string();
        assert!(dump.contains("=="));
    }

    #[test]
    fn test_outcome_values() {
        let outcome = LpOutcome::optimal(vec![1.0, 0.0, 0.9999], 2.0);
        assert_eq!(outcome.is_set(Variable(0)), Some(true));
        assert_eq!(outcome.is_set(Variable(1)), Some(false));
        assert_eq!(outcome.is_set(Variable(2)), Some(true));
        assert_eq!(outcome.is_set(Variable(3)), None);
        assert_eq!(LpOutcome::infeasible().status, LpStatus::Infeasible);
    }
}
