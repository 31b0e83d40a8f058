//! STN 網路模型與建構/驗證

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    Material, MaterialArc, Result, StnError, Task, TaskKind, TaskUnitParams, TimeGrid, Transition,
    TransitionDirection, Unit,
};

/// 網路建構器（同時也是 JSON 載入格式）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StnNetworkBuilder {
    pub time_grid: TimeGrid,
    #[serde(default)]
    pub materials: Vec<Material>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub units: Vec<Unit>,
    #[serde(default)]
    pub assignments: Vec<TaskUnitParams>,
    #[serde(default)]
    pub arcs: Vec<MaterialArc>,
    #[serde(default)]
    pub transitions: Vec<Transition>,
}

impl StnNetworkBuilder {
    /// 創建空的建構器
    pub fn new(time_grid: TimeGrid) -> Self {
        Self {
            time_grid,
            materials: Vec::new(),
            tasks: Vec::new(),
            units: Vec::new(),
            assignments: Vec::new(),
            arcs: Vec::new(),
            transitions: Vec::new(),
        }
    }

    pub fn material(mut self, material: Material) -> Self {
        self.materials.push(material);
        self
    }

    pub fn task(mut self, task: Task) -> Self {
        self.tasks.push(task);
        self
    }

    pub fn unit(mut self, unit: Unit) -> Self {
        self.units.push(unit);
        self
    }

    /// 指派任務到設備
    pub fn assign(mut self, params: TaskUnitParams) -> Self {
        self.assignments.push(params);
        self
    }

    pub fn arc(mut self, arc: MaterialArc) -> Self {
        self.arcs.push(arc);
        self
    }

    pub fn transition(mut self, transition: Transition) -> Self {
        self.transitions.push(transition);
        self
    }

    /// 驗證並建立網路
    pub fn build(self) -> Result<StnNetwork> {
        // 時界為 0 時，未設視窗的任務作業視窗長度為 0
        if self.time_grid.horizon == 0 {
            return Err(StnError::invalid("time_grid", "計劃時界必須至少為 1"));
        }

        let mut network = StnNetwork {
            time_grid: self.time_grid,
            materials: BTreeMap::new(),
            tasks: BTreeMap::new(),
            units: BTreeMap::new(),
            params: BTreeMap::new(),
            arcs: Vec::new(),
            transitions: Vec::new(),
            task_units: BTreeMap::new(),
            unit_tasks: BTreeMap::new(),
            producers: BTreeMap::new(),
            consumers: BTreeMap::new(),
            task_inputs: BTreeMap::new(),
            task_outputs: BTreeMap::new(),
            material_order: Vec::new(),
        };

        for material in self.materials {
            if network.materials.contains_key(&material.id) {
                return Err(StnError::DuplicateId(material.id));
            }
            network.materials.insert(material.id.clone(), material);
        }

        for task in self.tasks {
            if network.tasks.contains_key(&task.id) {
                return Err(StnError::DuplicateId(task.id));
            }
            network.tasks.insert(task.id.clone(), task);
        }

        for unit in self.units {
            if network.units.contains_key(&unit.id) {
                return Err(StnError::DuplicateId(unit.id));
            }
            network.units.insert(unit.id.clone(), unit);
        }

        for params in self.assignments {
            network.add_assignment(params)?;
        }

        for arc in self.arcs {
            network.add_arc(arc)?;
        }

        for transition in self.transitions {
            network.add_transition(transition)?;
        }

        network.material_order = network.topological_sort()?;
        network.check_order_ranks()?;

        Ok(network)
    }
}

/// 已驗證的 STN 網路（載入後唯讀）
#[derive(Debug, Clone)]
pub struct StnNetwork {
    time_grid: TimeGrid,
    materials: BTreeMap<String, Material>,
    tasks: BTreeMap<String, Task>,
    units: BTreeMap<String, Unit>,
    params: BTreeMap<(String, String), TaskUnitParams>,
    arcs: Vec<MaterialArc>,
    transitions: Vec<Transition>,

    /// 任務 → 設備（依指派順序）
    task_units: BTreeMap<String, Vec<String>>,
    /// 設備 → 任務（依指派順序）
    unit_tasks: BTreeMap<String, Vec<String>>,

    /// 物料 → 產出弧索引
    producers: BTreeMap<String, Vec<usize>>,
    /// 物料 → 消耗弧索引
    consumers: BTreeMap<String, Vec<usize>>,
    task_inputs: BTreeMap<String, Vec<usize>>,
    task_outputs: BTreeMap<String, Vec<usize>>,

    /// 全部物料的拓撲順序
    material_order: Vec<String>,
}

impl StnNetwork {
    /// 建立建構器
    pub fn builder(time_grid: TimeGrid) -> StnNetworkBuilder {
        StnNetworkBuilder::new(time_grid)
    }

    /// 從 JSON 載入網路
    pub fn from_json(json: &str) -> Result<Self> {
        let builder: StnNetworkBuilder = serde_json::from_str(json)?;
        builder.build()
    }

    /// 匯出為 JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_builder())?)
    }

    /// 還原為建構器
    pub fn to_builder(&self) -> StnNetworkBuilder {
        StnNetworkBuilder {
            time_grid: self.time_grid.clone(),
            materials: self.materials.values().cloned().collect(),
            tasks: self.tasks.values().cloned().collect(),
            units: self.units.values().cloned().collect(),
            assignments: self
                .task_units
                .iter()
                .flat_map(|(task, units)| {
                    units
                        .iter()
                        .filter_map(move |unit| self.params.get(&(task.clone(), unit.clone())))
                })
                .cloned()
                .collect(),
            arcs: self.arcs.clone(),
            transitions: self.transitions.clone(),
        }
    }

    fn add_assignment(&mut self, params: TaskUnitParams) -> Result<()> {
        let task = self
            .tasks
            .get(&params.task_id)
            .ok_or_else(|| StnError::UnknownTask(params.task_id.clone()))?;
        if !self.units.contains_key(&params.unit_id) {
            return Err(StnError::UnknownUnit(params.unit_id.clone()));
        }

        let subject = format!("{}@{}", params.task_id, params.unit_id);
        if params.tau_min == 0 {
            return Err(StnError::invalid(subject, "tau_min 必須至少為 1"));
        }
        if params.tau_max < params.tau_min {
            return Err(StnError::invalid(
                subject,
                format!("tau_max ({}) 小於 tau_min ({})", params.tau_max, params.tau_min),
            ));
        }
        if task.kind.is_production() {
            if params.beta_max <= Decimal::ZERO {
                return Err(StnError::invalid(subject, "beta_max 必須為正"));
            }
            if params.beta_min < Decimal::ZERO || params.beta_min > params.beta_max {
                return Err(StnError::invalid(
                    subject,
                    format!("beta_min ({}) 不在 [0, beta_max]", params.beta_min),
                ));
            }
        }
        if params.theta == Some(0) {
            return Err(StnError::invalid(subject, "作業視窗長度為 0"));
        }

        let key = (params.task_id.clone(), params.unit_id.clone());
        if self.params.contains_key(&key) {
            return Err(StnError::DuplicateId(subject));
        }

        self.task_units
            .entry(params.task_id.clone())
            .or_default()
            .push(params.unit_id.clone());
        self.unit_tasks
            .entry(params.unit_id.clone())
            .or_default()
            .push(params.task_id.clone());
        self.params.insert(key, params);
        Ok(())
    }

    fn add_arc(&mut self, arc: MaterialArc) -> Result<()> {
        if !self.materials.contains_key(&arc.material_id) {
            return Err(StnError::UnknownMaterial(arc.material_id));
        }
        let task = self
            .tasks
            .get(&arc.task_id)
            .ok_or_else(|| StnError::UnknownTask(arc.task_id.clone()))?;

        match task.kind {
            TaskKind::Production => {}
            TaskKind::Startup | TaskKind::Shutdown | TaskKind::DirectChangeover => {
                return Err(StnError::TransitionArc {
                    task: arc.task_id,
                    material: arc.material_id,
                });
            }
        }

        if arc.rho.is_zero() {
            return Err(StnError::invalid(
                format!("{}-{}", arc.material_id, arc.task_id),
                "轉換比例 rho 不可為 0",
            ));
        }
        if self
            .arcs
            .iter()
            .any(|a| a.material_id == arc.material_id && a.task_id == arc.task_id)
        {
            return Err(StnError::DuplicateId(format!(
                "{}-{}",
                arc.material_id, arc.task_id
            )));
        }

        let index = self.arcs.len();
        if arc.rho.is_sign_negative() {
            self.consumers.entry(arc.material_id.clone()).or_default().push(index);
            self.task_inputs.entry(arc.task_id.clone()).or_default().push(index);
        } else {
            self.producers.entry(arc.material_id.clone()).or_default().push(index);
            self.task_outputs.entry(arc.task_id.clone()).or_default().push(index);
        }
        self.arcs.push(arc);
        Ok(())
    }

    fn add_transition(&mut self, transition: Transition) -> Result<()> {
        let production = self
            .tasks
            .get(&transition.production_task)
            .ok_or_else(|| StnError::UnknownTask(transition.production_task.clone()))?;
        let changeover = self
            .tasks
            .get(&transition.transition_task)
            .ok_or_else(|| StnError::UnknownTask(transition.transition_task.clone()))?;

        if !production.kind.is_production() {
            return Err(StnError::invalid(
                &transition.production_task,
                "轉換關係的來源必須是生產任務",
            ));
        }

        let consistent = match changeover.kind {
            TaskKind::Production => false,
            TaskKind::Startup => transition.direction == TransitionDirection::FeedsInto,
            TaskKind::Shutdown => transition.direction == TransitionDirection::ConsumesFrom,
            TaskKind::DirectChangeover => true,
        };
        if !consistent {
            return Err(StnError::invalid(
                &transition.transition_task,
                format!(
                    "{:?} 任務不可以 {:?} 方向連接 {}",
                    changeover.kind, transition.direction, transition.production_task
                ),
            ));
        }

        self.transitions.push(transition);
        Ok(())
    }

    /// 物料間的上下游邊（輸入物料 → 產出物料）
    fn material_edges(&self) -> BTreeSet<(String, String)> {
        let mut edges = BTreeSet::new();
        for task_id in self.task_inputs.keys() {
            for input in self.inputs_of(task_id) {
                for output in self.outputs_of(task_id) {
                    edges.insert((input.material_id.clone(), output.material_id.clone()));
                }
            }
        }
        edges
    }

    /// 拓撲排序（Kahn），同層依 order 等級、再依 ID 決定順序
    fn topological_sort(&self) -> Result<Vec<String>> {
        let edges = self.material_edges();

        let mut in_degree: BTreeMap<&str, usize> =
            self.materials.keys().map(|id| (id.as_str(), 0)).collect();
        let mut successors: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (from, to) in &edges {
            *in_degree.entry(to.as_str()).or_default() += 1;
            successors.entry(from.as_str()).or_default().push(to.as_str());
        }

        let rank = |id: &str| {
            self.materials
                .get(id)
                .and_then(|m| m.order)
                .unwrap_or(u32::MAX)
        };

        let mut ready: BTreeSet<(u32, &str)> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(&id, _)| (rank(id), id))
            .collect();

        let mut sorted = Vec::with_capacity(self.materials.len());
        while let Some(next) = ready.pop_first() {
            let id = next.1;
            sorted.push(id.to_string());
            for &succ in successors.get(id).map(Vec::as_slice).unwrap_or(&[]) {
                if let Some(degree) = in_degree.get_mut(succ) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert((rank(succ), succ));
                    }
                }
            }
        }

        if sorted.len() < self.materials.len() {
            let remaining = in_degree
                .into_iter()
                .filter(|(_, degree)| *degree > 0)
                .map(|(id, _)| id.to_string())
                .collect();
            return Err(StnError::CyclicNetwork(remaining));
        }

        Ok(sorted)
    }

    /// 檢查手動設定的 order 等級與實際上下游關係一致
    fn check_order_ranks(&self) -> Result<()> {
        for (from, to) in self.material_edges() {
            let (Some(upstream), Some(material)) = (self.materials.get(&from), self.materials.get(&to))
            else {
                continue;
            };
            if !upstream.is_intermediate() || !material.is_intermediate() {
                continue;
            }
            if let (Some(upstream_rank), Some(rank)) = (upstream.order, material.order) {
                if upstream_rank >= rank {
                    return Err(StnError::OrderInconsistent {
                        material: to,
                        rank,
                        upstream: from,
                        upstream_rank,
                    });
                }
            }
        }
        Ok(())
    }

    pub fn time_grid(&self) -> &TimeGrid {
        &self.time_grid
    }

    pub fn horizon(&self) -> u32 {
        self.time_grid.horizon
    }

    pub fn material(&self, id: &str) -> Result<&Material> {
        self.materials
            .get(id)
            .ok_or_else(|| StnError::UnknownMaterial(id.to_string()))
    }

    pub fn task(&self, id: &str) -> Result<&Task> {
        self.tasks
            .get(id)
            .ok_or_else(|| StnError::UnknownTask(id.to_string()))
    }

    pub fn unit(&self, id: &str) -> Result<&Unit> {
        self.units
            .get(id)
            .ok_or_else(|| StnError::UnknownUnit(id.to_string()))
    }

    pub fn materials(&self) -> impl Iterator<Item = &Material> {
        self.materials.values()
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }

    /// 所有生產任務
    pub fn production_tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values().filter(|t| t.kind.is_production())
    }

    /// 任務-設備參數（未指派時為 None）
    pub fn params(&self, task: &str, unit: &str) -> Option<&TaskUnitParams> {
        self.params.get(&(task.to_string(), unit.to_string()))
    }

    /// 任務-設備參數（未指派時回傳錯誤）
    pub fn require_params(&self, task: &str, unit: &str) -> Result<&TaskUnitParams> {
        self.params(task, unit).ok_or_else(|| StnError::MissingTaskUnit {
            task: task.to_string(),
            unit: unit.to_string(),
        })
    }

    /// 所有任務-設備參數
    pub fn assignments(&self) -> impl Iterator<Item = &TaskUnitParams> {
        self.params.values()
    }

    /// 可執行該任務的設備（依指派順序）
    pub fn units_of(&self, task: &str) -> &[String] {
        self.task_units.get(task).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 該設備可執行的任務（依指派順序）
    pub fn tasks_of(&self, unit: &str) -> &[String] {
        self.unit_tasks.get(unit).map(Vec::as_slice).unwrap_or(&[])
    }

    fn arcs_at<'a>(
        &'a self,
        index: &'a BTreeMap<String, Vec<usize>>,
        key: &str,
    ) -> impl Iterator<Item = &'a MaterialArc> + 'a {
        index
            .get(key)
            .into_iter()
            .flatten()
            .map(move |&i| &self.arcs[i])
    }

    /// 產出該物料的弧
    pub fn producers_of(&self, material: &str) -> impl Iterator<Item = &MaterialArc> {
        self.arcs_at(&self.producers, material)
    }

    /// 消耗該物料的弧
    pub fn consumers_of(&self, material: &str) -> impl Iterator<Item = &MaterialArc> {
        self.arcs_at(&self.consumers, material)
    }

    /// 任務的輸入弧
    pub fn inputs_of(&self, task: &str) -> impl Iterator<Item = &MaterialArc> {
        self.arcs_at(&self.task_inputs, task)
    }

    /// 任務的產出弧
    pub fn outputs_of(&self, task: &str) -> impl Iterator<Item = &MaterialArc> {
        self.arcs_at(&self.task_outputs, task)
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// 全部物料的拓撲順序
    pub fn material_order(&self) -> &[String] {
        &self.material_order
    }

    /// 依拓撲順序排列的中間品
    pub fn intermediates_in_order(&self) -> Vec<&str> {
        self.material_order
            .iter()
            .filter(|id| self.materials.get(*id).is_some_and(Material::is_intermediate))
            .map(String::as_str)
            .collect()
    }
}
