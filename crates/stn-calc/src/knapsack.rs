//! 運轉期數與啟動次數上界（有界背包子問題）

use std::collections::BTreeMap;

use rayon::prelude::*;
use stn_core::{BoundConfig, BoundTables, KnapsackStrategy, Result, StnError, StnNetwork};
use stn_optimizer::{IntegerProgramSolver, KnapsackItem, KnapsackProgram};

/// 背包目標
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunObjective {
    /// 最大化總運轉期數（UPPER_BOUND_X）
    ActivePeriods,
    /// 最大化運轉次數（UPPER_BOUND_YS）
    RunStarts,
}

/// 一組運轉參數：最早開始期、運轉長度範圍、每次運轉後的閒置期數
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunProfile {
    pub est: u32,
    pub tau_min: u32,
    pub tau_max: u32,
    pub tau_end: u32,
}

impl RunProfile {
    pub fn new(est: u32, tau_min: u32, tau_max: u32, tau_end: u32) -> Self {
        Self {
            est,
            tau_min,
            tau_max,
            tau_end,
        }
    }

    /// 解析上界 (UPPER_BOUND_X, UPPER_BOUND_YS)
    ///
    /// k 次運轉可行若且唯若 k * (tau_min + tau_end) <= N，
    /// 此時最多運轉 min(k * tau_max, N - k * tau_end) 期。
    pub fn analytic_bounds(&self, available: u32) -> (u32, u32) {
        let stride = self.tau_min + self.tau_end;
        let max_starts = if stride == 0 { 0 } else { available / stride };

        let max_active = (0..=max_starts)
            .map(|k| {
                let by_length = u64::from(k) * u64::from(self.tau_max);
                let by_idle = u64::from(available) - u64::from(k) * u64::from(self.tau_end);
                by_length.min(by_idle)
            })
            .max()
            .unwrap_or(0);

        // max_active <= available
        (u32::try_from(max_active).unwrap_or(available), max_starts)
    }

    /// 背包子問題：每種運轉長度 L 為一個物品，重量 L + tau_end
    pub fn program(&self, name: impl Into<String>, available: u32, objective: RunObjective) -> KnapsackProgram {
        (self.tau_min..=self.tau_max).fold(KnapsackProgram::new(name, available), |program, length| {
            let value = match objective {
                RunObjective::ActivePeriods => length,
                RunObjective::RunStarts => 1,
            };
            program.with_item(KnapsackItem::new(format!("L{length}"), length + self.tau_end, value))
        })
    }
}

/// 一個背包子問題：任務-設備或設備彙總
#[derive(Debug, Clone)]
struct Job {
    task: Option<String>,
    unit: String,
    profile: RunProfile,
    available: u32,
}

impl Job {
    fn label(&self) -> String {
        match &self.task {
            Some(task) => format!("{task}@{}", self.unit),
            None => format!("*@{}", self.unit),
        }
    }
}

/// 運轉期數與啟動次數上界
pub struct KnapsackBounds;

impl KnapsackBounds {
    /// 計算四張上界表
    ///
    /// 需先完成 EST 傳播。策略為 `Solver` 或 `CrossChecked` 時必須提供求解器。
    pub fn compute(
        network: &StnNetwork,
        tables: &mut BoundTables,
        config: &BoundConfig,
        solver: Option<&dyn IntegerProgramSolver>,
    ) -> Result<()> {
        if config.knapsack_strategy != KnapsackStrategy::Analytic && solver.is_none() {
            return Err(StnError::Solver {
                program: "knapsack".to_string(),
                message: format!("策略 {:?} 需要整數規劃求解器", config.knapsack_strategy),
            });
        }

        let jobs = Self::jobs(network, tables)?;
        tracing::debug!("背包子問題 {} 個", jobs.len());

        let solve = |job: &Job| Self::solve(job, config.knapsack_strategy, solver);
        let results: Vec<(u32, u32)> = if config.parallel {
            jobs.par_iter().map(solve).collect::<Result<_>>()?
        } else {
            jobs.iter().map(solve).collect::<Result<_>>()?
        };

        for (job, (x, ys)) in jobs.iter().zip(results) {
            tracing::debug!("{}: N={} X<={} YS<={}", job.label(), job.available, x, ys);
            match &job.task {
                Some(task) => {
                    tables.upper_bound_x.insert(task, &job.unit, x);
                    tables.upper_bound_ys_task.insert(task, &job.unit, ys);
                }
                None => {
                    tables.upper_bound_x_unit.insert(job.unit.clone(), x);
                    tables.upper_bound_ys_unit.insert(job.unit.clone(), ys);
                }
            }
        }

        Ok(())
    }

    /// 建立所有子問題：每個生產任務-設備一個，每台設備的彙總一個
    fn jobs(network: &StnNetwork, tables: &BoundTables) -> Result<Vec<Job>> {
        let mut jobs = Vec::new();
        let mut unit_profiles: BTreeMap<&str, RunProfile> = BTreeMap::new();

        for task in network.production_tasks() {
            for unit in network.units_of(&task.id) {
                let params = network.require_params(&task.id, unit)?;
                let profile = RunProfile::new(
                    tables.est(&task.id, unit),
                    params.tau_min,
                    params.tau_max,
                    task.tau_end,
                );
                let available = Self::available_periods(network, &task.id, unit, profile.est)?;
                jobs.push(Job {
                    task: Some(task.id.clone()),
                    unit: unit.clone(),
                    profile,
                    available,
                });

                // 彙總：最早 EST、最短 tau_min、最長 tau_max、最短 tau_end
                unit_profiles
                    .entry(unit.as_str())
                    .and_modify(|p| {
                        p.est = p.est.min(profile.est);
                        p.tau_min = p.tau_min.min(profile.tau_min);
                        p.tau_max = p.tau_max.max(profile.tau_max);
                        p.tau_end = p.tau_end.min(profile.tau_end);
                    })
                    .or_insert(profile);
            }
        }

        for unit in network.units() {
            let Some(profile) = unit_profiles.get(unit.id.as_str()) else {
                tracing::debug!("設備 {} 沒有生產任務，不計算彙總上界", unit.id);
                continue;
            };
            let available = Self::available_periods(network, "*", &unit.id, profile.est)?;
            jobs.push(Job {
                task: None,
                unit: unit.id.clone(),
                profile: *profile,
                available,
            });
        }

        Ok(jobs)
    }

    /// N = H + 1 - est；為負代表 EST 或網路配置錯誤
    fn available_periods(network: &StnNetwork, task: &str, unit: &str, est: u32) -> Result<u32> {
        let available = network.time_grid().available_from(est);
        u32::try_from(available).map_err(|_| StnError::NegativeAvailablePeriods {
            task: task.to_string(),
            unit: unit.to_string(),
            horizon: network.horizon(),
            est,
        })
    }

    fn solve(job: &Job, strategy: KnapsackStrategy, solver: Option<&dyn IntegerProgramSolver>) -> Result<(u32, u32)> {
        let analytic = job.profile.analytic_bounds(job.available);
        let Some(solver) = solver.filter(|_| strategy != KnapsackStrategy::Analytic) else {
            return Ok(analytic);
        };

        let label = job.label();
        let x_program = job
            .profile
            .program(format!("X[{label}]"), job.available, RunObjective::ActivePeriods);
        let ys_program = job
            .profile
            .program(format!("YS[{label}]"), job.available, RunObjective::RunStarts);

        let x = solver.maximize(&x_program)?.objective;
        let ys = solver.maximize(&ys_program)?.objective;

        if strategy == KnapsackStrategy::CrossChecked {
            for (program, solved, expected) in [(&x_program, x, analytic.0), (&ys_program, ys, analytic.1)] {
                if solved != expected {
                    tracing::warn!(
                        "{} 求解器 {} 結果 {} 與解析上界 {} 不一致",
                        program.name,
                        solver.name(),
                        solved,
                        expected
                    );
                    return Err(StnError::SolverMismatch {
                        program: program.name.clone(),
                        solver: solved,
                        analytic: expected,
                    });
                }
            }
        }

        Ok((x, ys))
    }
}
