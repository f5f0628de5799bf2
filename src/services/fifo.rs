// src/services/fifo.rs

use rust_decimal::Decimal;

use crate::{
    common::error::AppError,
    models::inventory::{BatchStock, DeductionResult, DeductionSlice},
};

/// Como uma quantidade sai do estoque, calculado antes de qualquer escrita.
#[derive(Debug, Clone, PartialEq)]
pub struct FifoPlan {
    pub slices: Vec<DeductionSlice>,
    pub total_cost: Decimal,
}

impl FifoPlan {
    /// Percorre `batches` (já em ordem FIFO) até cobrir `quantity`.
    /// Falha sem plano quando os lotes somam menos que `quantity`.
    pub fn build(batches: &[BatchStock], quantity: i32) -> Result<Self, AppError> {
        let available: i64 = batches
            .iter()
            .map(|b| i64::from(b.quantity_remaining.max(0)))
            .sum();
        if available < i64::from(quantity) {
            return Err(AppError::InsufficientStock {
                available,
                required: i64::from(quantity),
            });
        }
        Ok(Self::walk(batches, quantity))
    }

    /// Mesmo percurso de [`FifoPlan::build`], mas leva o que os lotes tiverem,
    /// até `quantity`.
    pub fn drain(batches: &[BatchStock], quantity: i32) -> Self {
        Self::walk(batches, quantity)
    }

    /// Itens sem lote aberto: a quantidade inteira sai do contador agregado.
    pub fn legacy(stock: i32, default_cost_price: Option<Decimal>, quantity: i32) -> Result<Self, AppError> {
        if stock < quantity {
            return Err(AppError::InsufficientStock {
                available: i64::from(stock),
                required: i64::from(quantity),
            });
        }
        let cost_price = default_cost_price.unwrap_or(Decimal::ZERO);
        Ok(Self {
            slices: vec![DeductionSlice {
                batch_id: None,
                quantity,
                cost_price,
                legacy: true,
            }],
            total_cost: Decimal::from(quantity) * cost_price,
        })
    }

    fn walk(batches: &[BatchStock], quantity: i32) -> Self {
        let mut slices = Vec::new();
        let mut total_cost = Decimal::ZERO;
        let mut still_needed = quantity;

        for batch in batches {
            if still_needed <= 0 {
                break;
            }
            if batch.quantity_remaining <= 0 {
                continue;
            }

            let take = batch.quantity_remaining.min(still_needed);
            slices.push(DeductionSlice {
                batch_id: Some(batch.id),
                quantity: take,
                cost_price: batch.cost_price,
                legacy: false,
            });
            total_cost += Decimal::from(take) * batch.cost_price;
            still_needed -= take;
        }

        Self { slices, total_cost }
    }

    pub fn quantity(&self) -> i32 {
        self.slices.iter().map(|s| s.quantity).sum()
    }

    pub fn into_result(self) -> DeductionResult {
        let quantity = self.quantity();
        let avg_cost_per_unit = if quantity > 0 {
            self.total_cost / Decimal::from(quantity)
        } else {
            Decimal::ZERO
        };
        DeductionResult {
            success: true,
            total_cost: self.total_cost,
            avg_cost_per_unit,
            deductions: self.slices,
        }
    }
}
