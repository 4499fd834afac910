use crate::internal::solver::{ConstraintType, LpBackend, LpModel, LpOutcome};
use microlp::{ComparisonOp, LinearExpr, OptimizationDirection, Problem};

/// Backend solving the model with the pure Rust `microlp` branch and bound solver.
#[derive(Debug, Default, Clone, Copy)]
pub struct MicrolpBackend;

impl LpBackend for MicrolpBackend {
    fn solve(&self, model: &LpModel) -> LpOutcome {
        let mut problem = Problem::new(OptimizationDirection::Minimize);
        let vars: Vec<microlp::Variable> = model
            .weights()
            .map(|weight| problem.add_binary_var(weight))
            .collect();
        for constraint in model.constraints() {
            let mut expr = LinearExpr::empty();
            for (var, coef) in &constraint.terms {
                expr.add(vars[var.index()], *coef);
            }
            problem.add_constraint(
                expr,
                match constraint.constraint_type {
                    ConstraintType::Min => ComparisonOp::Ge,
                    ConstraintType::Max => ComparisonOp::Le,
                    ConstraintType::Eq => ComparisonOp::Eq,
                },
                constraint.value,
            );
        }
        match problem.solve() {
            Ok(solution) => LpOutcome::optimal(
                vars.iter().map(|v| solution[*v]).collect(),
                solution.objective(),
            ),
            Err(microlp::Error::Infeasible) => LpOutcome::infeasible(),
            Err(error) => LpOutcome::failed(error.to_string()),
        }
    }
}
