//! 以 good_lp（microlp 後端）求解背包子問題

use good_lp::{
    constraint, default_solver, variable, Expression, ProblemVariables, Solution, SolverModel,
    Variable,
};
use stn_core::{Result, StnError};

use crate::{IntegerProgramSolver, KnapsackProgram, KnapsackSolution};

/// 整數解容許誤差
const INTEGRALITY_TOLERANCE: f64 = 1e-6;

/// 通用整數規劃求解器（分支定界）
#[derive(Debug, Clone, Copy, Default)]
pub struct LpSolver;

impl LpSolver {
    pub fn new() -> Self {
        Self
    }

    fn solver_error(program: &KnapsackProgram, message: impl Into<String>) -> StnError {
        StnError::Solver {
            program: program.name.clone(),
            message: message.into(),
        }
    }
}

impl IntegerProgramSolver for LpSolver {
    fn name(&self) -> &str {
        "good_lp"
    }

    fn maximize(&self, program: &KnapsackProgram) -> Result<KnapsackSolution> {
        program.check_bounded()?;

        if program.items.is_empty() {
            return Ok(KnapsackSolution {
                counts: Vec::new(),
                objective: 0,
            });
        }

        let mut vars = ProblemVariables::new();
        let xs: Vec<Variable> = program
            .items
            .iter()
            .map(|item| {
                let definition = variable().integer().min(0);
                match item.upper {
                    Some(upper) => vars.add(definition.max(upper)),
                    None => vars.add(definition),
                }
            })
            .collect();

        let objective: Expression = xs
            .iter()
            .zip(&program.items)
            .map(|(&x, item)| f64::from(item.value) * x)
            .sum();
        let weight: Expression = xs
            .iter()
            .zip(&program.items)
            .map(|(&x, item)| f64::from(item.weight) * x)
            .sum();

        let capacity = f64::from(program.capacity);
        let solution = vars
            .maximise(objective)
            .using(default_solver)
            .with(constraint!(weight <= capacity))
            .solve()
            .map_err(|e| Self::solver_error(program, e.to_string()))?;

        let mut counts = Vec::with_capacity(xs.len());
        for x in &xs {
            let raw = solution.value(*x);
            let rounded = raw.round();
            if (raw - rounded).abs() > INTEGRALITY_TOLERANCE || rounded < 0.0 {
                return Err(Self::solver_error(program, format!("非整數解 {raw}")));
            }
            counts.push(rounded as u32);
        }

        if !program.is_feasible(&counts) {
            return Err(Self::solver_error(program, "求解器回傳不可行解"));
        }

        let objective = u32::try_from(program.value_of(&counts))
            .map_err(|_| Self::solver_error(program, "目標值超出範圍"))?;

        tracing::trace!(program = %program.name, objective, "整數規劃求解完成");

        Ok(KnapsackSolution { counts, objective })
    }
}
