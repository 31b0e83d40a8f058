//! 最早開始時間（EST）傳播

use std::collections::BTreeMap;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use stn_core::{
    BoundTables, MaterialArc, Result, StnError, StnNetwork, TaskKind, TaskUnitParams,
    TransitionDirection,
};

use crate::BoundWarning;

/// 消耗者一次最短運轉對某物料的需求
#[derive(Debug, Clone, Copy)]
pub(crate) struct Demand {
    /// 扣除初始庫存後仍需生產的數量
    pub required: Decimal,
    /// 第一期的消耗已超過初始庫存（消耗者必須晚於生產者開始）
    pub opening_shortfall: bool,
}

impl Demand {
    /// `per_period` 為每期消耗量，`per_run` 為一次最短運轉的消耗量
    pub fn new(per_period: Decimal, per_run: Decimal, stock: Decimal) -> Self {
        Self {
            required: per_run - stock,
            opening_shortfall: per_period > stock,
        }
    }
}

/// 生產者的一次供料情境
pub(crate) struct Supply<'a> {
    /// 生產者在此設備的 EST
    pub est: u32,
    pub params: &'a TaskUnitParams,
    /// 產出比例
    pub rho: Decimal,
    /// 生產任務的運轉後閒置期數
    pub tau_end: u32,
}

impl Supply<'_> {
    /// 單一生產情境下，消耗者最早可開始的期別
    ///
    /// relationship = required / (rho * tau_max * beta_max)
    /// periods = ceil(relationship * tau_max) + ceil(relationship * tau_end) - tau_end
    /// EST = max(est + 1, est + periods + 1 - tau_min_consumer)
    ///
    /// 初始庫存足以支應第一期消耗時，下限 `est + 1` 改為 0。
    pub fn consumer_start(&self, demand: &Demand, consumer_tau_min: u32) -> Result<u32> {
        let capacity = self.rho * self.params.max_run_output();
        let subject = || format!("{}@{}", self.params.task_id, self.params.unit_id);

        let run_periods = ceil_ratio(demand.required * Decimal::from(self.params.tau_max), capacity)
            .ok_or_else(|| StnError::invalid(subject(), "運轉期數計算溢位"))?;
        let idle_periods = ceil_ratio(demand.required * Decimal::from(self.tau_end), capacity)
            .ok_or_else(|| StnError::invalid(subject(), "閒置期數計算溢位"))?;
        let periods = run_periods + idle_periods - i64::from(self.tau_end);

        start_after(self.est, periods, demand, consumer_tau_min)
            .ok_or_else(|| StnError::invalid(subject(), "EST 超出範圍"))
    }

    /// 每期最大產出 `rho * beta_max`
    fn rate(&self) -> Decimal {
        self.rho * self.params.beta_max
    }
}

/// 生產 `periods` 期後，消耗者最後一期剛好可取得所需數量的開始期別
fn start_after(est: u32, periods: i64, demand: &Demand, consumer_tau_min: u32) -> Option<u32> {
    let est = i64::from(est);
    let floor = if demand.opening_shortfall { est + 1 } else { 0 };
    let start = floor.max(est + periods + 1 - i64::from(consumer_tau_min));
    u32::try_from(start).ok()
}

/// 所有供料情境合計下，消耗者最早可開始的期別
///
/// 只有一個（任務, 設備）供料時使用單一情境公式；多個情境可同時運轉，
/// 以最早的生產者 EST 與每期產出總和估計所需期數。
pub(crate) fn earliest_start(
    material_id: &str,
    supplies: &[Supply<'_>],
    demand: &Demand,
    consumer_tau_min: u32,
) -> Result<Option<u32>> {
    match supplies {
        [] => Ok(None),
        [supply] => supply.consumer_start(demand, consumer_tau_min).map(Some),
        _ => {
            let est = supplies.iter().map(|s| s.est).min().unwrap_or(0);
            let rate: Decimal = supplies.iter().map(Supply::rate).sum();
            let periods = ceil_ratio(demand.required, rate)
                .ok_or_else(|| StnError::invalid(material_id, "合計產能計算溢位"))?;

            start_after(est, periods, demand, consumer_tau_min)
                .map(Some)
                .ok_or_else(|| StnError::invalid(material_id, "EST 超出範圍"))
        }
    }
}

/// `ceil(numerator / denominator)`，先乘後除以保持精確
pub(crate) fn ceil_ratio(numerator: Decimal, denominator: Decimal) -> Option<i64> {
    numerator.checked_div(denominator)?.ceil().to_i64()
}

/// 生產某物料的所有（任務, 設備）供料情境
pub(crate) fn supplies_of<'a>(
    network: &'a StnNetwork,
    tables: &BoundTables,
    producer: &'a MaterialArc,
) -> Result<Vec<Supply<'a>>> {
    let task = network.task(&producer.task_id)?;
    network
        .units_of(&producer.task_id)
        .iter()
        .map(|unit| {
            Ok(Supply {
                est: tables.est(&producer.task_id, unit),
                params: network.require_params(&producer.task_id, unit)?,
                rho: producer.rho,
                tau_end: task.tau_end,
            })
        })
        .collect()
}

/// EST 傳播器
///
/// 依拓撲順序處理中間品。對每個消耗該物料的（任務, 設備），
/// 以全部生產情境的合計產能估計最早可開始期，
/// 多個輸入中間品之間取最大值（所有輸入都必須到位）。
pub struct EstPropagator;

impl EstPropagator {
    /// 計算 EST 並寫入界限表
    pub fn propagate(network: &StnNetwork, tables: &mut BoundTables) -> Result<Vec<BoundWarning>> {
        let mut warnings = Vec::new();

        // 所有任務-設備組合預設為 0
        for params in network.assignments() {
            tables.est.insert(&params.task_id, &params.unit_id, 0);
        }

        for material_id in network.intermediates_in_order() {
            let material = network.material(material_id)?;
            let producers: Vec<&MaterialArc> = network.producers_of(material_id).collect();

            if producers.is_empty() {
                tracing::debug!("中間品 {} 沒有生產任務，不收緊 EST", material_id);
                warnings.push(BoundWarning::warning(
                    material_id,
                    "中間品沒有生產任務，EST 僅依初始庫存",
                ));
                continue;
            }

            let mut supplies = Vec::new();
            for producer in &producers {
                supplies.extend(supplies_of(network, tables, producer)?);
            }

            let mut updates: BTreeMap<(String, String), u32> = BTreeMap::new();
            for consumer in network.consumers_of(material_id) {
                for unit in network.units_of(&consumer.task_id) {
                    let params = network.require_params(&consumer.task_id, unit)?;
                    let demand = Demand::new(
                        consumer.ratio() * params.beta_min,
                        consumer.ratio() * params.min_run_output(),
                        material.initial_inventory,
                    );

                    // 初始庫存足以支撐一次最短運轉
                    if demand.required <= Decimal::ZERO {
                        continue;
                    }

                    if let Some(start) = earliest_start(material_id, &supplies, &demand, params.tau_min)? {
                        tracing::debug!(
                            "EST: {} → {}@{} 最早第 {} 期",
                            material_id,
                            consumer.task_id,
                            unit,
                            start
                        );
                        updates.insert((consumer.task_id.clone(), unit.clone()), start);
                    }
                }
            }

            for ((task, unit), start) in updates {
                if start > tables.est(&task, &unit) {
                    tables.est.insert(&task, &unit, start);
                }
            }
        }

        Self::propagate_transitions(network, tables)?;

        let horizon = network.horizon();
        for (task, unit, est) in tables.est.iter() {
            if est > horizon {
                warnings.push(BoundWarning::warning(
                    format!("{task}@{unit}"),
                    format!("EST {est} 超過計劃時界 {horizon}，該組合無法在時界內運轉"),
                ));
            }
        }

        Ok(warnings)
    }

    /// 停機/換線必須在某次生產運轉之後；啟動沒有上游限制
    fn propagate_transitions(network: &StnNetwork, tables: &mut BoundTables) -> Result<()> {
        let mut earliest: BTreeMap<(String, String), u32> = BTreeMap::new();

        for transition in network.transitions() {
            let kind = network.task(&transition.transition_task)?.kind;
            let follows_run = match kind {
                TaskKind::Shutdown | TaskKind::DirectChangeover => {
                    transition.direction == TransitionDirection::ConsumesFrom
                }
                TaskKind::Startup | TaskKind::Production => false,
            };
            if !follows_run {
                continue;
            }

            for unit in network.units_of(&transition.transition_task) {
                let Some(params) = network.params(&transition.production_task, unit) else {
                    continue;
                };
                let start = tables.est(&transition.production_task, unit) + params.tau_min;
                earliest
                    .entry((transition.transition_task.clone(), unit.clone()))
                    .and_modify(|e| *e = (*e).min(start))
                    .or_insert(start);
            }
        }

        for ((task, unit), start) in earliest {
            tables.est.insert(&task, &unit, start);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use stn_core::{Material, Task, TaskUnitParams, TimeGrid, Transition, Unit};

    /// FEED → MIX@U1 → INT → PACK@U2 → PROD
    fn chain(
        producer: TaskUnitParams,
        consumer: TaskUnitParams,
        tau_end: u32,
        int_stock: Decimal,
    ) -> StnNetwork {
        StnNetwork::builder(TimeGrid::new(25))
            .material(Material::raw("FEED").with_initial_inventory(Decimal::from(1000)))
            .material(Material::intermediate("INT").with_initial_inventory(int_stock).with_order(1))
            .material(Material::product("PROD"))
            .task(Task::production("MIX").with_tau_end(tau_end))
            .task(Task::production("PACK"))
            .unit(Unit::new("U1"))
            .unit(Unit::new("U2"))
            .assign(producer)
            .assign(consumer)
            .arc(MaterialArc::consumes("FEED", "MIX", Decimal::ONE))
            .arc(MaterialArc::produces("MIX", "INT", Decimal::ONE))
            .arc(MaterialArc::consumes("INT", "PACK", Decimal::ONE))
            .arc(MaterialArc::produces("PACK", "PROD", Decimal::ONE))
            .build()
            .unwrap()
    }

    fn params(task: &str, unit: &str, tau_min: u32, tau_max: u32, beta_min: i64, beta_max: i64) -> TaskUnitParams {
        TaskUnitParams::new(task, unit, tau_min, tau_max, Decimal::from(beta_min), Decimal::from(beta_max))
    }

    #[test]
    fn test_scenario_producer_consumer() {
        // relationship = 15/18, periods = 5 + 1 - 1 = 5, EST = max(1, 0 + 5 + 1 - 5) = 1
        let network = chain(
            params("MIX", "U1", 5, 6, 3, 3),
            params("PACK", "U2", 5, 6, 3, 3),
            1,
            Decimal::ZERO,
        );
        let mut tables = BoundTables::new();
        EstPropagator::propagate(&network, &mut tables).unwrap();

        assert_eq!(tables.est.get("MIX", "U1"), Some(0));
        assert_eq!(tables.est.get("PACK", "U2"), Some(1));
    }

    #[rstest]
    // 消耗者需要兩次完整運轉：periods = 12 + 2 - 1 = 13 → 13 + 1 - 2 = 12
    #[case(2, 18, 6, 3, 1, 12)]
    // 消耗者短而少量：relationship 很小，只能晚生產者一期
    #[case(1, 1, 6, 3, 1, 1)]
    // 無閒置期：periods = ceil(5/6 * 6) = 5 → 5 + 1 - 5 = 1
    #[case(5, 3, 6, 3, 0, 1)]
    // 消耗者 tau_min = 1、beta_min = 9：periods = 3 + 1 - 1 = 3 → 3 + 1 - 1 = 3
    #[case(1, 9, 6, 3, 1, 3)]
    fn test_consumer_est_rounding(
        #[case] consumer_tau_min: u32,
        #[case] consumer_beta_min: i64,
        #[case] producer_tau_max: u32,
        #[case] producer_beta_max: i64,
        #[case] tau_end: u32,
        #[case] expected: u32,
    ) {
        let network = chain(
            params("MIX", "U1", 1, producer_tau_max, 1, producer_beta_max),
            params("PACK", "U2", consumer_tau_min, consumer_tau_min.max(6), consumer_beta_min, 20),
            tau_end,
            Decimal::ZERO,
        );
        let mut tables = BoundTables::new();
        EstPropagator::propagate(&network, &mut tables).unwrap();

        assert_eq!(tables.est("PACK", "U2"), expected);
    }

    #[test]
    fn test_initial_stock_removes_delay() {
        let network = chain(
            params("MIX", "U1", 5, 6, 3, 3),
            params("PACK", "U2", 5, 6, 3, 3),
            1,
            Decimal::from(15),
        );
        let mut tables = BoundTables::new();
        EstPropagator::propagate(&network, &mut tables).unwrap();

        assert_eq!(tables.est("PACK", "U2"), 0);
    }

    #[rstest]
    // 單一設備：relationship = 72/36 = 2，periods = 12 → 12 + 1 - 2 = 11
    #[case(false, 11)]
    // 兩台設備同時運轉：每期 12，periods = 6 → 6 + 1 - 2 = 5
    #[case(true, 5)]
    fn test_parallel_producer_units_pool_capacity(#[case] second_unit: bool, #[case] expected: u32) {
        let mut builder = chain(
            params("MIX", "U1", 6, 6, 6, 6),
            params("PACK", "U2", 2, 6, 36, 36),
            0,
            Decimal::ZERO,
        )
        .to_builder();
        if second_unit {
            builder = builder.unit(Unit::new("U3")).assign(params("MIX", "U3", 6, 6, 6, 6));
        }

        let mut tables = BoundTables::new();
        EstPropagator::propagate(&builder.build().unwrap(), &mut tables).unwrap();

        assert_eq!(tables.est("PACK", "U2"), expected);
    }

    #[test]
    fn test_pooled_units_never_exceed_fastest_unit() {
        let network = chain(
            params("MIX", "U1", 1, 2, 1, 1),
            params("PACK", "U2", 2, 2, 6, 6),
            0,
            Decimal::ZERO,
        )
        .to_builder()
        .unit(Unit::new("U3"))
        .assign(params("MIX", "U3", 1, 6, 1, 2))
        .build()
        .unwrap();

        let mut tables = BoundTables::new();
        EstPropagator::propagate(&network, &mut tables).unwrap();

        // 只用 U3 時為 5；合計每期 3，periods = 4 → 4 + 1 - 2 = 3
        assert_eq!(tables.est("PACK", "U2"), 3);
    }

    #[test]
    fn test_stock_covering_first_period_allows_same_start() {
        // 需求 15 - 庫存 10 = 5，第一期消耗 3 不超過庫存
        // periods = ceil(5/3) + ceil(5/18) - 1 = 2 → max(0, 2 + 1 - 5) = 0
        let network = chain(
            params("MIX", "U1", 5, 6, 3, 3),
            params("PACK", "U2", 5, 6, 3, 3),
            1,
            Decimal::from(10),
        );
        let mut tables = BoundTables::new();
        EstPropagator::propagate(&network, &mut tables).unwrap();

        assert_eq!(tables.est("PACK", "U2"), 0);
    }

    #[test]
    fn test_shutdown_follows_minimum_run() {
        let network = chain(
            params("MIX", "U1", 5, 6, 3, 3),
            params("PACK", "U2", 5, 6, 3, 3),
            1,
            Decimal::ZERO,
        )
        .to_builder()
        .task(Task::new("PACK-OFF", TaskKind::Shutdown))
        .task(Task::new("PACK-ON", TaskKind::Startup))
        .assign(params("PACK-OFF", "U2", 1, 1, 0, 0))
        .assign(params("PACK-ON", "U2", 2, 2, 0, 0))
        .transition(Transition::new("PACK", "PACK-OFF", TransitionDirection::ConsumesFrom))
        .transition(Transition::new("PACK", "PACK-ON", TransitionDirection::FeedsInto))
        .build()
        .unwrap();

        let mut tables = BoundTables::new();
        EstPropagator::propagate(&network, &mut tables).unwrap();

        assert_eq!(tables.est("PACK-OFF", "U2"), 1 + 5);
        assert_eq!(tables.est.get("PACK-ON", "U2"), Some(0));
    }

    #[test]
    fn test_ceil_ratio_is_exact() {
        // 15/18 * 6 以浮點數會得到 5.000000000000001
        assert_eq!(ceil_ratio(Decimal::from(15 * 6), Decimal::from(18)), Some(5));
        assert_eq!(ceil_ratio(Decimal::from(15), Decimal::from(18)), Some(1));
        assert_eq!(ceil_ratio(Decimal::ONE, Decimal::ZERO), None);
    }
}
