//! # 兩段式 STN 界限計算範例
//!
//! - 原料 FEED → 混合 MIX (U1) → 中間品 INT → 包裝 PACK-A (U2) / PACK-B (U3)
//! - U2 另有停機任務 PACK-A-OFF
//! - 計算 EST、群組 EST、累計產量/庫存上界與運轉上界

use anyhow::Context;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use stn::calc::ForwardPropagator;
use stn::model::{
    Material, MaterialArc, Task, TaskKind, TaskUnitParams, TimeGrid, Transition,
    TransitionDirection, Unit,
};
use stn::{BoundConfig, StnNetwork};

fn main() -> anyhow::Result<()> {
    stn::logging::init();

    println!("===== 兩段式 STN 界限計算 =====\n");

    // ========== 1. 時間網格 ==========
    let anchor = NaiveDate::from_ymd_opt(2025, 1, 6)
        .and_then(|d| d.and_hms_opt(6, 0, 0))
        .context("無效的錨點日期")?;
    let grid = TimeGrid::new(25).with_anchor(anchor, 60);
    println!("[1] 時間網格: 0..={}，每期 {} 分鐘", grid.horizon, grid.period_minutes);

    // ========== 2. 網路 ==========
    let network = StnNetwork::builder(grid)
        .material(Material::raw("FEED").with_initial_inventory(Decimal::from(400)))
        .material(Material::intermediate("INT").with_order(1).with_capacity(Decimal::from(200)))
        .material(Material::product("A").with_price(Decimal::from(12)))
        .material(Material::product("B").with_price(Decimal::from(9)))
        .task(Task::production("MIX").with_tau_end(1))
        .task(Task::production("PACK-A").with_tau_end(1))
        .task(Task::production("PACK-B"))
        .task(Task::new("PACK-A-OFF", TaskKind::Shutdown))
        .unit(Unit::new("U1").with_name("混合槽"))
        .unit(Unit::new("U2").with_name("包裝線 A"))
        .unit(Unit::new("U3").with_name("包裝線 B"))
        .assign(TaskUnitParams::new("MIX", "U1", 5, 6, Decimal::from(3), Decimal::from(3)).with_tau(1))
        .assign(TaskUnitParams::new("PACK-A", "U2", 5, 6, Decimal::from(3), Decimal::from(3)))
        .assign(TaskUnitParams::new("PACK-B", "U3", 2, 4, Decimal::from(2), Decimal::from(5)))
        .assign(TaskUnitParams::new("PACK-A-OFF", "U2", 1, 1, Decimal::ZERO, Decimal::ZERO))
        .arc(MaterialArc::consumes("FEED", "MIX", Decimal::ONE))
        .arc(MaterialArc::produces("MIX", "INT", Decimal::ONE))
        .arc(MaterialArc::consumes("INT", "PACK-A", Decimal::ONE))
        .arc(MaterialArc::consumes("INT", "PACK-B", Decimal::ONE))
        .arc(MaterialArc::produces("PACK-A", "A", Decimal::ONE))
        .arc(MaterialArc::produces("PACK-B", "B", Decimal::ONE))
        .transition(Transition::new("PACK-A", "PACK-A-OFF", TransitionDirection::ConsumesFrom))
        .build()?;
    println!(
        "[2] 網路: 物料 {} 個，任務 {} 個，設備 {} 個",
        network.materials().count(),
        network.tasks().count(),
        network.units().count()
    );
    println!("    拓撲順序: {:?}\n", network.material_order());

    // ========== 3. 計算 ==========
    let config = BoundConfig::default().with_parallel(true);
    let result = stn::calculator_for(config).calculate(&network)?;
    println!("[3] 計算完成 (run {})，耗時 {:?} ms\n", result.run_id, result.calculation_time_ms);

    // ========== 4. 結果 ==========
    let tables = &result.tables;
    println!("[4] EST");
    for (task, unit, est) in tables.est.iter() {
        let start = network
            .time_grid()
            .period_start(est)
            .map(|t| t.format("%m-%d %H:%M").to_string())
            .unwrap_or_default();
        println!("    {task:<12} @ {unit:<3} 第 {est:>2} 期 ({start})");
    }

    println!("    群組 EST: {:?}", tables.est_group);

    println!("\n    運轉上界 (X / YS)");
    for (task, unit, x) in tables.upper_bound_x.iter() {
        let ys = tables.upper_bound_ys_task.get(task, unit).unwrap_or_default();
        println!("    {task:<12} @ {unit:<3} {x:>3} / {ys}");
    }
    for (unit, x) in &tables.upper_bound_x_unit {
        let ys = tables.upper_bound_ys_unit.get(unit).copied().unwrap_or_default();
        println!("    {:<12} @ {unit:<3} {x:>3} / {ys}", "(設備)");
    }

    println!("\n    累計產量上界");
    for (task, mu) in &tables.mu_adjusted {
        println!("    {task:<12} {mu}");
    }
    println!("\n    最大累計庫存（拓撲順序）");
    for (id, omega) in ForwardPropagator::omega_in_order(&network, tables).values() {
        println!("    {id:<12} {omega}");
    }

    for warning in &result.warnings {
        println!("    [{:?}] {}: {}", warning.severity, warning.subject, warning.message);
    }

    // ========== 5. 匯出 ==========
    let json = serde_json::to_string_pretty(&result)?;
    println!("\n[5] JSON 匯出 {} bytes", json.len());
    tracing::info!(run_id = %result.run_id, "範例完成");

    Ok(())
}
