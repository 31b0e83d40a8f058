//! 群組 EST：單一生產者供應多個（不同設備上的）消耗者

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use stn_core::{BoundTables, MaterialArc, Result, StnNetwork};

use crate::est::{earliest_start, supplies_of, Demand};
use crate::BoundWarning;

/// 群組 EST 傳播器
///
/// 僅處理「一個生產任務、N > 1 個消耗任務且各在不同設備」的物料。
/// 生產者的產能與所有消耗者最短運轉需求的總和比較，
/// 物料的 EST_GROUP 為各消耗者群組 EST 的最大值。
/// 生產任務在多台設備時，各設備的產能合併計算。
pub struct EstGroupPropagator;

/// 符合群組形狀的消耗者（任務, 設備, 消耗弧）
struct GroupMember<'a> {
    task: &'a str,
    unit: &'a str,
    arc: &'a MaterialArc,
}

impl EstGroupPropagator {
    /// 計算群組 EST 並寫入界限表（需先執行 EST 傳播）
    pub fn propagate(network: &StnNetwork, tables: &mut BoundTables) -> Result<Vec<BoundWarning>> {
        let mut warnings = Vec::new();

        for material_id in network.intermediates_in_order() {
            let Some((producer, members)) = Self::qualifying_group(network, material_id) else {
                continue;
            };
            let material = network.material(material_id)?;

            let mut per_period = Decimal::ZERO;
            let mut per_run = Decimal::ZERO;
            for member in &members {
                let params = network.require_params(member.task, member.unit)?;
                per_period += member.arc.ratio() * params.beta_min;
                per_run += member.arc.ratio() * params.min_run_output();
            }
            let demand = Demand::new(per_period, per_run, material.initial_inventory);

            if demand.required <= Decimal::ZERO {
                warnings.push(BoundWarning::info(
                    material_id,
                    "初始庫存足以支撐所有消耗者的最短運轉，群組 EST 不收緊",
                ));
                continue;
            }

            let supplies = supplies_of(network, tables, producer)?;
            let mut group_est: Option<u32> = None;
            for member in &members {
                let params = network.require_params(member.task, member.unit)?;
                if let Some(start) = earliest_start(material_id, &supplies, &demand, params.tau_min)? {
                    group_est = Some(group_est.map_or(start, |e| e.max(start)));
                }
            }

            if let Some(value) = group_est {
                tracing::debug!(
                    "群組 EST: {} ({} 個消耗者) 第 {} 期",
                    material_id,
                    members.len(),
                    value
                );
                tables.est_group.insert(material_id.to_string(), value);
            }
        }

        Ok(warnings)
    }

    /// 檢查物料是否為「單一生產者、多個不同設備消耗者」
    fn qualifying_group<'a>(
        network: &'a StnNetwork,
        material_id: &str,
    ) -> Option<(&'a MaterialArc, Vec<GroupMember<'a>>)> {
        let mut producers = network.producers_of(material_id);
        let producer = producers.next()?;
        if producers.next().is_some() {
            return None;
        }

        let mut members = Vec::new();
        for arc in network.consumers_of(material_id) {
            match network.units_of(&arc.task_id) {
                [unit] => members.push(GroupMember {
                    task: &arc.task_id,
                    unit,
                    arc,
                }),
                _ => return None,
            }
        }

        if members.len() < 2 {
            return None;
        }

        let distinct_units: BTreeSet<&str> = members.iter().map(|m| m.unit).collect();
        if distinct_units.len() != members.len() {
            return None;
        }

        Some((producer, members))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EstPropagator;
    use stn_core::{Material, Task, TaskUnitParams, TimeGrid, Unit};

    fn params(task: &str, unit: &str, tau_min: u32, tau_max: u32, beta_min: i64, beta_max: i64) -> TaskUnitParams {
        TaskUnitParams::new(task, unit, tau_min, tau_max, Decimal::from(beta_min), Decimal::from(beta_max))
    }

    /// MIX@U1 → INT → {PACK-A@U2, PACK-B@U3}
    fn fan_out() -> stn_core::StnNetworkBuilder {
        StnNetwork::builder(TimeGrid::new(30))
            .material(Material::raw("FEED").with_initial_inventory(Decimal::from(1000)))
            .material(Material::intermediate("INT").with_order(1))
            .material(Material::product("A"))
            .material(Material::product("B"))
            .task(Task::production("MIX").with_tau_end(1))
            .task(Task::production("PACK-A"))
            .task(Task::production("PACK-B"))
            .unit(Unit::new("U1"))
            .unit(Unit::new("U2"))
            .unit(Unit::new("U3"))
            .assign(params("MIX", "U1", 5, 6, 3, 3))
            .assign(params("PACK-A", "U2", 5, 6, 3, 3))
            .assign(params("PACK-B", "U3", 5, 6, 3, 3))
            .arc(MaterialArc::consumes("FEED", "MIX", Decimal::ONE))
            .arc(MaterialArc::produces("MIX", "INT", Decimal::ONE))
            .arc(MaterialArc::consumes("INT", "PACK-A", Decimal::ONE))
            .arc(MaterialArc::consumes("INT", "PACK-B", Decimal::ONE))
            .arc(MaterialArc::produces("PACK-A", "A", Decimal::ONE))
            .arc(MaterialArc::produces("PACK-B", "B", Decimal::ONE))
    }

    fn run(network: &StnNetwork) -> BoundTables {
        let mut tables = BoundTables::new();
        EstPropagator::propagate(network, &mut tables).unwrap();
        EstGroupPropagator::propagate(network, &mut tables).unwrap();
        tables
    }

    #[test]
    fn test_group_est_aggregates_demand() {
        // relationship = 30/18，periods = ceil(10) + ceil(5/3) - 1 = 11，EST = 11 + 1 - 5 = 7
        let tables = run(&fan_out().build().unwrap());

        assert_eq!(tables.est("PACK-A", "U2"), 1);
        assert_eq!(tables.est("PACK-B", "U3"), 1);
        assert_eq!(tables.est_group("INT"), 7);
    }

    #[test]
    fn test_group_est_pools_producer_units() {
        // MIX 另在 U4：每期合計 6，需求 30 → periods 5，EST = max(1, 5 + 1 - 5) = 1
        let network = fan_out()
            .unit(Unit::new("U4"))
            .assign(params("MIX", "U4", 5, 6, 3, 3))
            .build()
            .unwrap();

        let tables = run(&network);
        assert_eq!(tables.est_group("INT"), 1);
    }

    #[test]
    fn test_two_producers_leave_group_untouched() {
        let network = fan_out()
            .task(Task::production("MIX-2"))
            .assign(params("MIX-2", "U1", 5, 6, 3, 3))
            .arc(MaterialArc::consumes("FEED", "MIX-2", Decimal::ONE))
            .arc(MaterialArc::produces("MIX-2", "INT", Decimal::ONE))
            .build()
            .unwrap();

        let tables = run(&network);
        assert_eq!(tables.est_group("INT"), 0);
        assert!(!tables.est_group.contains_key("INT"));
    }

    #[test]
    fn test_shared_consumer_unit_leaves_group_untouched() {
        let mut builder = fan_out();
        builder.assignments.retain(|p| p.task_id != "PACK-B");
        let network = builder
            .assign(params("PACK-B", "U2", 5, 6, 3, 3))
            .build()
            .unwrap();

        let tables = run(&network);
        assert!(!tables.est_group.contains_key("INT"));
    }

    #[test]
    fn test_single_consumer_is_not_a_group() {
        let mut builder = fan_out();
        builder.arcs.retain(|a| a.task_id != "PACK-B");
        let tables = run(&builder.build().unwrap());

        assert_eq!(tables.est_group("INT"), 0);
    }
}
