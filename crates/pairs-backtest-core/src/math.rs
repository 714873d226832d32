use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;

use crate::{PairsError, PairsResult};

// ---------------------------------------------------------------------------
// Decimal math helpers
// ---------------------------------------------------------------------------

/// Sum that reports overflow instead of panicking.
pub(crate) fn checked_sum<I>(values: I, context: &str) -> PairsResult<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v))
        .ok_or_else(|| PairsError::NumericOverflow {
            context: context.to_string(),
        })
}

/// Arithmetic mean. Zero for an empty slice.
pub(crate) fn mean(values: &[Decimal]) -> PairsResult<Decimal> {
    if values.is_empty() {
        return Ok(Decimal::ZERO);
    }
    let total = checked_sum(values.iter().copied(), "mean")?;
    Ok(total / Decimal::from(values.len() as i64))
}

/// Sample variance (n - 1 denominator) around a precomputed mean.
pub(crate) fn sample_variance(values: &[Decimal], mean: Decimal) -> PairsResult<Decimal> {
    let n = values.len();
    if n < 2 {
        return Ok(Decimal::ZERO);
    }
    let overflow = || PairsError::NumericOverflow {
        context: "sample variance".into(),
    };
    let squares = values
        .iter()
        .map(|v| {
            let d = v.checked_sub(mean)?;
            d.checked_mul(d)
        })
        .collect::<Option<Vec<Decimal>>>()
        .ok_or_else(overflow)?;
    let sum_sq = checked_sum(squares, "sample variance")?;
    Ok(sum_sq / Decimal::from((n - 1) as i64))
}

/// Square root via MathematicalOps; zero for non-positive input.
pub(crate) fn sqrt_decimal(val: Decimal) -> Decimal {
    if val <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    val.sqrt().unwrap_or(Decimal::ZERO)
}

/// Natural log via MathematicalOps; None outside the domain.
pub(crate) fn ln_decimal(val: Decimal) -> Option<Decimal> {
    if val <= Decimal::ZERO {
        return None;
    }
    val.checked_ln()
}
