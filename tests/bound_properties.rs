//! 界限的性質測試：窮舉小時界排程驗證 EST 與上界、tau_min 單調性

use std::collections::BTreeSet;

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use stn::calc::{EstPropagator, RunProfile};
use stn::model::{
    BoundTables, Material, MaterialArc, Task, TaskKind, TaskUnitParams, TimeGrid, Transition,
    TransitionDirection, Unit,
};
use stn::{BoundCalculator, BoundConfig, StnError, StnNetwork};

/// 窮舉單一設備上從 `start` 到 `end`（不含）的所有排程
///
/// 每一期可閒置，或開始一次長度 L 的運轉，運轉與其後的閒置期都必須落在時界內。
/// 回傳 (最大運轉期數, 最大運轉次數)。
fn exhaustive(start: u32, end: u32, profile: &RunProfile) -> (u32, u32) {
    if start >= end {
        return (0, 0);
    }

    let mut best = exhaustive(start + 1, end, profile);
    for length in profile.tau_min..=profile.tau_max {
        let next = start + length + profile.tau_end;
        if next > end {
            break;
        }
        let (active, runs) = exhaustive(next, end, profile);
        best.0 = best.0.max(active + length);
        best.1 = best.1.max(runs + 1);
    }
    best
}

/// 一台生產設備：運轉長度範圍與每期產出
#[derive(Debug, Clone, Copy)]
struct Lane {
    tau_min: u32,
    tau_max: u32,
    output: u32,
}

/// 窮舉一台設備在 `0..end` 的逐期產出，每次運轉後閒置 `tau_end` 期
///
/// 運轉後的閒置期可超出時界，排程集合只會更大。
fn production_profiles(lane: Lane, tau_end: u32, end: u32) -> Vec<Vec<u32>> {
    fn walk(period: u32, lane: Lane, tau_end: u32, current: &mut Vec<u32>, out: &mut Vec<Vec<u32>>) {
        let end = current.len() as u32;
        if period >= end {
            out.push(current.clone());
            return;
        }

        walk(period + 1, lane, tau_end, current, out);
        for length in lane.tau_min..=lane.tau_max {
            if period + length > end {
                break;
            }
            for p in period..period + length {
                current[p as usize] = lane.output;
            }
            walk(period + length + tau_end, lane, tau_end, current, out);
            for p in period..period + length {
                current[p as usize] = 0;
            }
        }
    }

    let mut out = Vec::new();
    walk(0, lane, tau_end, &mut vec![0; end as usize], &mut out);
    out
}

/// 累計產量曲線中，不被其他曲線逐期支配者
fn supply_frontier(profiles: Vec<Vec<u32>>) -> Vec<Vec<u32>> {
    let curves: BTreeSet<Vec<u32>> = profiles
        .iter()
        .map(|profile| {
            profile
                .iter()
                .scan(0, |total, &output| {
                    *total += output;
                    Some(*total)
                })
                .collect()
        })
        .collect();

    curves
        .iter()
        .filter(|curve| {
            !curves
                .iter()
                .any(|other| other != *curve && other.iter().zip(curve.iter()).all(|(a, b)| a >= b))
        })
        .cloned()
        .collect()
}

/// 給定累計產量，消耗者最短運轉最早可開始的期別
///
/// 第 p 期的產出從第 p+1 期起可用；消耗者每期取用 `draw`。
fn earliest_consumer_start(supply: &[u32], stock: u32, tau_min: u32, draw: u32) -> Option<u32> {
    let end = supply.len() as u32;
    (0..end).filter(|t| t + tau_min <= end).find(|&t| {
        (0..tau_min).all(|j| {
            let usable = if t + j == 0 { 0 } else { supply[(t + j - 1) as usize] };
            (j + 1) * draw <= stock + usable
        })
    })
}

/// FEED → MIX@{P0, P1, ..} → INT → PACK@UC
fn fan_in_chain(
    horizon: u32,
    lanes: &[Lane],
    tau_end: u32,
    consumer_tau_min: u32,
    draw: u32,
    stock: u32,
) -> StnNetwork {
    let mut builder = StnNetwork::builder(TimeGrid::new(horizon))
        .material(Material::raw("FEED").with_initial_inventory(Decimal::from(1000)))
        .material(Material::intermediate("INT").with_initial_inventory(Decimal::from(stock)))
        .material(Material::product("PROD"))
        .task(Task::production("MIX").with_tau_end(tau_end))
        .task(Task::production("PACK"))
        .unit(Unit::new("UC"))
        .assign(TaskUnitParams::new(
            "PACK",
            "UC",
            consumer_tau_min,
            consumer_tau_min,
            Decimal::from(draw),
            Decimal::from(draw),
        ))
        .arc(MaterialArc::consumes("FEED", "MIX", Decimal::ONE))
        .arc(MaterialArc::produces("MIX", "INT", Decimal::ONE))
        .arc(MaterialArc::consumes("INT", "PACK", Decimal::ONE))
        .arc(MaterialArc::produces("PACK", "PROD", Decimal::ONE));

    for (index, lane) in lanes.iter().enumerate() {
        let unit = format!("P{index}");
        builder = builder.unit(Unit::new(&unit)).assign(TaskUnitParams::new(
            "MIX",
            &unit,
            lane.tau_min,
            lane.tau_max,
            Decimal::ONE,
            Decimal::from(lane.output),
        ));
    }

    builder.build().unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(96))]

    #[test]
    fn prop_no_feasible_schedule_starts_before_est(
        horizon in 3u32..8,
        lanes in proptest::collection::vec((1u32..3, 0u32..2, 1u32..5), 1..=2),
        tau_end in 0u32..2,
        consumer_tau_min in 1u32..4,
        draw in 1u32..6,
        stock in 0u32..5,
    ) {
        let lanes: Vec<Lane> = lanes
            .into_iter()
            .map(|(tau_min, spread, output)| Lane { tau_min, tau_max: tau_min + spread, output })
            .collect();
        let network = fan_in_chain(horizon, &lanes, tau_end, consumer_tau_min, draw, stock);

        let mut tables = BoundTables::new();
        EstPropagator::propagate(&network, &mut tables).unwrap();
        let est = tables.est("PACK", "UC");

        let end = horizon + 1;
        let mut supplies = vec![vec![0u32; end as usize]];
        for lane in &lanes {
            let frontier = supply_frontier(production_profiles(*lane, tau_end, end));
            supplies = supplies
                .iter()
                .flat_map(|base| {
                    frontier
                        .iter()
                        .map(move |curve| base.iter().zip(curve).map(|(a, b)| a + b).collect::<Vec<u32>>())
                })
                .collect();
        }

        let earliest = supplies
            .iter()
            .filter_map(|supply| earliest_consumer_start(supply, stock, consumer_tau_min, draw))
            .min();
        if let Some(start) = earliest {
            prop_assert!(est <= start, "EST {} > feasible start {}", est, start);
        }
    }

    #[test]
    fn prop_knapsack_bounds_match_enumeration(
        horizon in 0u32..12,
        est in 0u32..6,
        tau_min in 1u32..5,
        spread in 0u32..3,
        tau_end in 0u32..3,
    ) {
        let est = est.min(horizon + 1);
        let profile = RunProfile::new(est, tau_min, tau_min + spread, tau_end);

        let bounds = profile.analytic_bounds(horizon + 1 - est);
        prop_assert_eq!(bounds, exhaustive(est, horizon + 1, &profile));
    }

    #[test]
    fn prop_longer_minimum_run_never_loosens(
        tau_min in 1u32..5,
        spread in 0u32..3,
        tau_end in 0u32..3,
        producer_beta in 1i64..6,
        consumer_beta in 1i64..6,
    ) {
        let base = chain_with_shutdown(tau_min, tau_min + spread + 1, tau_end, producer_beta, consumer_beta);
        let longer = chain_with_shutdown(tau_min + 1, tau_min + spread + 1, tau_end, producer_beta, consumer_beta);

        let calculator = BoundCalculator::new(BoundConfig::default().with_forward(false));
        let base = calculator.calculate(&base).unwrap().tables;
        let longer = calculator.calculate(&longer).unwrap().tables;

        for (task, unit, est) in base.est.iter() {
            prop_assert!(longer.est(task, unit) >= est, "{}@{}", task, unit);
        }
        for (task, unit, ys) in base.upper_bound_ys_task.iter() {
            let tightened = longer.upper_bound_ys_task.get(task, unit).unwrap_or(0);
            prop_assert!(tightened <= ys, "{}@{}", task, unit);
        }
    }
}

/// MIX@U1 (tau_min 可變) → INT → PACK@U2，MIX 有停機任務
fn chain_with_shutdown(tau_min: u32, tau_max: u32, tau_end: u32, producer_beta: i64, consumer_beta: i64) -> StnNetwork {
    StnNetwork::builder(TimeGrid::new(40))
        .material(Material::raw("FEED").with_initial_inventory(Decimal::from(500)))
        .material(Material::intermediate("INT"))
        .material(Material::product("PROD"))
        .task(Task::production("MIX").with_tau_end(tau_end))
        .task(Task::production("PACK"))
        .task(Task::new("MIX-OFF", TaskKind::Shutdown))
        .unit(Unit::new("U1"))
        .unit(Unit::new("U2"))
        .assign(TaskUnitParams::new(
            "MIX",
            "U1",
            tau_min,
            tau_max,
            Decimal::ONE,
            Decimal::from(producer_beta),
        ))
        .assign(TaskUnitParams::new(
            "PACK",
            "U2",
            2,
            4,
            Decimal::from(consumer_beta),
            Decimal::from(consumer_beta),
        ))
        .assign(TaskUnitParams::new("MIX-OFF", "U1", 1, 1, Decimal::ZERO, Decimal::ZERO))
        .arc(MaterialArc::consumes("FEED", "MIX", Decimal::ONE))
        .arc(MaterialArc::produces("MIX", "INT", Decimal::ONE))
        .arc(MaterialArc::consumes("INT", "PACK", Decimal::ONE))
        .arc(MaterialArc::produces("PACK", "PROD", Decimal::ONE))
        .transition(Transition::new("MIX", "MIX-OFF", TransitionDirection::ConsumesFrom))
        .build()
        .unwrap()
}

/// 隨機串聯網路：每段 1~2 台設備
fn random_chain(rng: &mut StdRng) -> StnNetwork {
    let horizon = rng.gen_range(6..=12);
    let stages = rng.gen_range(1..=3);
    let mut builder = StnNetwork::builder(TimeGrid::new(horizon))
        .material(Material::raw("M0").with_initial_inventory(Decimal::from(rng.gen_range(1..=60i64))));

    for stage in 1..=stages {
        let input = format!("M{}", stage - 1);
        let output = format!("M{stage}");
        let task = format!("T{stage}");

        builder = if stage == stages {
            builder.material(Material::product(&output))
        } else {
            builder.material(Material::intermediate(&output))
        };
        builder = builder
            .task(Task::production(&task).with_tau_end(rng.gen_range(0..=2)))
            .arc(MaterialArc::consumes(&input, &task, Decimal::ONE))
            .arc(MaterialArc::produces(&task, &output, Decimal::ONE));

        for lane in 0..rng.gen_range(1..=2) {
            let unit = format!("U{stage}-{lane}");
            let tau_min = rng.gen_range(1..=3);
            let beta_min: i64 = rng.gen_range(0..=3);
            builder = builder.unit(Unit::new(&unit)).assign(TaskUnitParams::new(
                &task,
                &unit,
                tau_min,
                tau_min + rng.gen_range(0..=2),
                Decimal::from(beta_min),
                Decimal::from(beta_min + rng.gen_range(1..=3)),
            ));
        }
    }

    builder.build().unwrap()
}

#[test]
fn test_random_networks_bounds_are_exact_for_every_unit() {
    let mut rng = StdRng::seed_from_u64(0x5714);

    for _ in 0..200 {
        let network = random_chain(&mut rng);
        let result = match BoundCalculator::default().calculate(&network) {
            Ok(result) => result,
            // 下游 EST 超出時界：屬於配置錯誤，不可被夾成 0
            Err(StnError::NegativeAvailablePeriods { est, horizon, .. }) => {
                assert!(est > horizon + 1);
                continue;
            }
            Err(other) => panic!("unexpected error: {other}"),
        };
        let tables = &result.tables;
        let end = network.horizon() + 1;

        for params in network.assignments() {
            let task = network.task(&params.task_id).unwrap();
            let est = tables.est(&params.task_id, &params.unit_id);
            let profile = RunProfile::new(est, params.tau_min, params.tau_max, task.tau_end);
            let (active, runs) = exhaustive(est, end, &profile);

            assert_eq!(tables.upper_bound_x.get(&params.task_id, &params.unit_id), Some(active));
            assert_eq!(tables.upper_bound_ys_task.get(&params.task_id, &params.unit_id), Some(runs));

            // 單台設備的彙總上界不小於其上任一任務
            let unit_x = tables.upper_bound_x_unit[&params.unit_id];
            let unit_ys = tables.upper_bound_ys_unit[&params.unit_id];
            assert!(unit_x >= active && unit_ys >= runs);
        }

        // 累計庫存不小於初始庫存
        for material in network.materials() {
            assert!(tables.omega[&material.id] >= material.initial_inventory);
        }
    }
}
