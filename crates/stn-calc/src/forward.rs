//! 前向傳播：任務最大累計產量 MU_ADJUSTED 與物料最大累計庫存 OMEGA

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use stn_core::{BoundConfig, BoundTables, Result, StnError, StnNetwork, TaskUnitParams};

use crate::est::ceil_ratio;
use crate::BoundWarning;

/// 累計產量傳播器
///
/// 從有初始庫存的物料出發做廣度優先的定點迭代：
/// 任務在所有輸入物料都有 OMEGA 後處理，物料在所有生產任務都處理後取得 OMEGA。
pub struct ForwardPropagator;

/// 單一設備的批次範圍
struct UnitRuns<'a> {
    params: &'a TaskUnitParams,
    max_runs: u64,
}

impl ForwardPropagator {
    /// 計算 MU_ADJUSTED 與 OMEGA 並寫入界限表
    pub fn propagate(
        network: &StnNetwork,
        tables: &mut BoundTables,
        config: &BoundConfig,
    ) -> Result<Vec<BoundWarning>> {
        let mut warnings = Vec::new();
        let horizon = network.horizon();

        let mut pending_tasks: BTreeSet<&str> =
            network.production_tasks().map(|t| t.id.as_str()).collect();
        let mut pending_materials: BTreeSet<&str> =
            network.materials().map(|m| m.id.as_str()).collect();

        let mut round = 0usize;
        while !pending_tasks.is_empty() || !pending_materials.is_empty() {
            round += 1;
            let mut progressed = false;

            // 物料：所有生產任務都已處理
            let ready: Vec<&str> = pending_materials
                .iter()
                .copied()
                .filter(|id| {
                    network
                        .producers_of(id)
                        .all(|arc| tables.mu_adjusted.contains_key(&arc.task_id))
                })
                .collect();
            for material_id in ready {
                let material = network.material(material_id)?;
                let mut omega = material.initial_inventory;
                let mut has_producer = false;
                for arc in network.producers_of(material_id) {
                    has_producer = true;
                    if let Some(mu) = tables.mu_adjusted.get(&arc.task_id) {
                        omega += arc.rho * *mu;
                    }
                }

                // 無生產者也無初始庫存：永遠無法取得
                if !has_producer && omega <= Decimal::ZERO {
                    continue;
                }

                tracing::debug!("OMEGA[{}] = {}", material_id, omega);
                tables.omega.insert(material_id.to_string(), omega);
                pending_materials.remove(material_id);
                progressed = true;
            }

            // 任務：所有輸入物料都已有 OMEGA
            let ready: Vec<&str> = pending_tasks
                .iter()
                .copied()
                .filter(|id| {
                    network
                        .inputs_of(id)
                        .all(|arc| tables.omega.contains_key(&arc.material_id))
                })
                .collect();
            for task_id in ready {
                let mu = Self::adjusted_output(network, tables, config, task_id, horizon)?;
                if network.inputs_of(task_id).next().is_none() {
                    warnings.push(BoundWarning::info(
                        task_id,
                        "任務沒有輸入物料，累計產量僅受作業視窗限制",
                    ));
                }
                tracing::debug!("MU_ADJUSTED[{}] = {}", task_id, mu);
                tables.mu_adjusted.insert(task_id.to_string(), mu);
                pending_tasks.remove(task_id);
                progressed = true;
            }

            if !progressed {
                let unreachable: Vec<String> =
                    pending_materials.iter().map(|id| id.to_string()).collect();
                tracing::warn!("前向傳播在第 {} 輪停止，無法到達: {:?}", round, unreachable);
                return Err(StnError::UnreachableMaterials(unreachable));
            }
        }

        tracing::debug!("前向傳播完成，共 {} 輪", round);
        Ok(warnings)
    }

    /// 任務的調整後最大累計產量
    fn adjusted_output(
        network: &StnNetwork,
        tables: &BoundTables,
        config: &BoundConfig,
        task_id: &str,
        horizon: u32,
    ) -> Result<Decimal> {
        // 作業視窗限制：每台設備在視窗內最多 floor(theta / (1 + tau * tau_max)) 次完整運轉
        let mut window_cap = Decimal::ZERO;
        for unit in network.units_of(task_id) {
            let params = network.require_params(task_id, unit)?;
            let stride = 1 + u64::from(params.tau) * u64::from(params.tau_max);
            let runs = u64::from(params.operating_window(horizon)) / stride;
            window_cap += params.max_run_output() * Decimal::from(runs);
        }

        // 物料限制：每個輸入可支撐的批量
        let mut mu = window_cap;
        for arc in network.inputs_of(task_id) {
            let omega = tables.omega.get(&arc.material_id).copied().unwrap_or_default();
            let supported = omega
                .checked_div(arc.ratio())
                .ok_or_else(|| StnError::invalid(task_id, "物料可支撐批量計算溢位"))?;
            mu = mu.min(supported);
        }
        mu = mu.max(Decimal::ZERO);

        let units = network
            .units_of(task_id)
            .iter()
            .map(|unit| {
                let params = network.require_params(task_id, unit)?;
                let max_runs = ceil_ratio(mu, params.max_run_output())
                    .and_then(|runs| u64::try_from(runs).ok())
                    .ok_or_else(|| StnError::invalid(task_id, "最大批次數計算溢位"))?;
                Ok(UnitRuns { params, max_runs })
            })
            .collect::<Result<Vec<_>>>()?;

        Self::closest_feasible(task_id, mu, &units, config.max_run_combinations)
    }

    /// 列舉各設備批次數組合，找出可達成的產量上界
    ///
    /// `mu` 落在某組合的 [最小產能, 最大產能] 內時直接採用，
    /// 否則取不超過 `mu` 的最大產能。
    fn closest_feasible(task_id: &str, mu: Decimal, units: &[UnitRuns<'_>], limit: u64) -> Result<Decimal> {
        let mut combinations: u64 = 1;
        for unit in units {
            combinations = unit
                .max_runs
                .checked_add(1)
                .and_then(|n| combinations.checked_mul(n))
                .unwrap_or(u64::MAX);
        }
        if combinations > limit {
            return Err(StnError::CombinationLimitExceeded {
                task: task_id.to_string(),
                combinations,
                limit,
            });
        }

        // 里程表式列舉
        let mut counts = vec![0u64; units.len()];
        let mut best_below: Option<Decimal> = None;
        loop {
            let mut lower = Decimal::ZERO;
            let mut upper = Decimal::ZERO;
            for (unit, &n) in units.iter().zip(&counts) {
                let n = Decimal::from(n);
                lower += unit.params.min_run_output() * n;
                upper += unit.params.max_run_output() * n;
            }

            if lower <= mu && mu <= upper {
                return Ok(mu);
            }
            if upper <= mu && best_below.map_or(true, |best| upper > best) {
                best_below = Some(upper);
            }

            let mut position = 0;
            loop {
                if position == counts.len() {
                    return best_below.ok_or_else(|| StnError::NoFeasibleProduction {
                        task: task_id.to_string(),
                        cap: mu.to_string(),
                    });
                }
                if counts[position] < units[position].max_runs {
                    counts[position] += 1;
                    break;
                }
                counts[position] = 0;
                position += 1;
            }
        }
    }

    /// 各物料 OMEGA 依拓撲順序排列（報表用）
    pub fn omega_in_order<'a>(network: &'a StnNetwork, tables: &BoundTables) -> BTreeMap<usize, (&'a str, Decimal)> {
        network
            .material_order()
            .iter()
            .enumerate()
            .filter_map(|(position, id)| {
                tables
                    .omega
                    .get(id)
                    .map(|omega| (position, (id.as_str(), *omega)))
            })
            .collect()
    }
}
