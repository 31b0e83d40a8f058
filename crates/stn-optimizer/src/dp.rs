//! 動態規劃求解（精確、不依賴 LP）

use stn_core::{Result, StnError};

use crate::{IntegerProgramSolver, KnapsackProgram, KnapsackSolution};

/// 有界背包的動態規劃求解器
///
/// 每個物品依二進位拆分為 0/1 物品後做容量 DP，容量即可用期數，
/// 規模很小。
#[derive(Debug, Clone, Copy, Default)]
pub struct DynamicProgrammingSolver;

/// 拆分後的 0/1 物品
struct Piece {
    item: usize,
    multiplicity: u32,
    weight: usize,
    value: u64,
}

impl DynamicProgrammingSolver {
    pub fn new() -> Self {
        Self
    }

    fn split(program: &KnapsackProgram) -> Vec<Piece> {
        let capacity = program.capacity;
        let mut pieces = Vec::new();

        for (index, item) in program.items.iter().enumerate() {
            if item.value == 0 {
                continue;
            }
            let by_capacity = if item.weight == 0 {
                u32::MAX
            } else {
                capacity / item.weight
            };
            let mut remaining = item.upper.unwrap_or(by_capacity).min(by_capacity);

            let mut chunk = 1u32;
            while remaining > 0 {
                let take = chunk.min(remaining);
                pieces.push(Piece {
                    item: index,
                    multiplicity: take,
                    weight: item.weight as usize * take as usize,
                    value: u64::from(item.value) * u64::from(take),
                });
                remaining -= take;
                chunk = chunk.saturating_mul(2);
            }
        }

        pieces
    }
}

impl IntegerProgramSolver for DynamicProgrammingSolver {
    fn name(&self) -> &str {
        "dynamic-programming"
    }

    fn maximize(&self, program: &KnapsackProgram) -> Result<KnapsackSolution> {
        program.check_bounded()?;

        let capacity = program.capacity as usize;
        let pieces = Self::split(program);

        let mut best = vec![0u64; capacity + 1];
        let mut taken = vec![vec![false; capacity + 1]; pieces.len()];

        for (p, piece) in pieces.iter().enumerate() {
            if piece.weight > capacity {
                continue;
            }
            for c in (piece.weight..=capacity).rev() {
                let candidate = best[c - piece.weight] + piece.value;
                if candidate > best[c] {
                    best[c] = candidate;
                    taken[p][c] = true;
                }
            }
        }

        let mut counts = vec![0u32; program.items.len()];
        let mut c = capacity;
        for (p, piece) in pieces.iter().enumerate().rev() {
            if taken[p][c] {
                counts[piece.item] += piece.multiplicity;
                c -= piece.weight;
            }
        }

        let objective = u32::try_from(best[capacity]).map_err(|_| StnError::Solver {
            program: program.name.clone(),
            message: format!("目標值 {} 超出範圍", best[capacity]),
        })?;

        tracing::trace!(program = %program.name, objective, "DP 背包求解完成");

        Ok(KnapsackSolution { counts, objective })
    }
}
