//! 背包子問題範例：解析上界與兩種求解器比較

use stn::calc::{RunObjective, RunProfile};
use stn::{DynamicProgrammingSolver, IntegerProgramSolver, LpSolver};

fn main() -> anyhow::Result<()> {
    stn::logging::init();

    let horizon = 25u32;
    let profiles = [
        ("short-runs", RunProfile::new(0, 2, 3, 0)),
        ("scenario", RunProfile::new(0, 5, 6, 1)),
        ("late-start", RunProfile::new(9, 5, 6, 1)),
        ("long-idle", RunProfile::new(0, 3, 8, 4)),
    ];

    let solvers: [&dyn IntegerProgramSolver; 2] = [&DynamicProgrammingSolver, &LpSolver];

    println!("{:<12} {:>3} {:>10} {:>24}", "profile", "N", "analytic", "solver (X / YS)");
    for (name, profile) in profiles {
        let available = u32::try_from(i64::from(horizon) + 1 - i64::from(profile.est))?;
        let (x, ys) = profile.analytic_bounds(available);

        let mut solved = Vec::new();
        for solver in solvers {
            let x_solved = solver
                .maximize(&profile.program(format!("X[{name}]"), available, RunObjective::ActivePeriods))?
                .objective;
            let ys_solved = solver
                .maximize(&profile.program(format!("YS[{name}]"), available, RunObjective::RunStarts))?
                .objective;
            solved.push(format!("{} {x_solved}/{ys_solved}", solver.name()));
        }

        println!("{name:<12} {available:>3} {:>10} {:>24}", format!("{x}/{ys}"), solved.join(", "));
    }

    Ok(())
}
