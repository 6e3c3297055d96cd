// src/services/projection.rs
//! Compound-growth math behind the forecast: risk adjustment, future value,
//! scenario bands and the year-by-year series. Everything here is pure.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::{AssetClass, AssetRates, RiskProfile};

/// Worst-case rates never drop below -5% a year, whatever the volatility.
pub const WORST_CASE_RATE_FLOOR: f64 = -0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScenarioBand {
    pub best: i64,
    pub worst: i64,
    pub expected: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearlyPoint {
    pub year: i32,
    #[serde(flatten)]
    pub values: BTreeMap<AssetClass, i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetProjection {
    pub name: &'static str,
    pub color: &'static str,
    pub expected_return_rate: f64,
    pub projected_value: i64,
    pub annualized_growth_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BestPerformer {
    pub asset: AssetClass,
    pub name: &'static str,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionSummary {
    pub total_invested: i64,
    pub best_performer: BestPerformer,
}

pub fn adjust_return_for_risk(base_rate: f64, risk_profile: RiskProfile) -> f64 {
    base_rate * risk_profile.multiplier()
}

/// Value after `years` of a lump sum compounded annually plus monthly
/// contributions compounded monthly (ordinary annuity at `annual_rate / 12`).
///
/// A zero principal or contribution contributes exactly zero, even when its
/// growth factor overflows; the result saturates at infinity and is never NaN.
pub fn future_value(principal: f64, monthly_contribution: f64, annual_rate: f64, years: u32) -> f64 {
    let monthly_rate = annual_rate / 12.0;
    let total_months = years as f64 * 12.0;

    let principal_fv = if principal == 0.0 {
        0.0
    } else {
        principal * (1.0 + annual_rate).powf(years as f64)
    };

    let annuity_fv = if monthly_contribution == 0.0 {
        0.0
    } else if monthly_rate == 0.0 {
        monthly_contribution * total_months
    } else {
        monthly_contribution * (((1.0 + monthly_rate).powf(total_months) - 1.0) / monthly_rate)
    };

    principal_fv + annuity_fv
}

/// Rounds to whole currency units, saturating at the `i64` range.
pub fn to_currency(value: f64) -> i64 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(i64::MIN as f64, i64::MAX as f64) as i64
}

/// Expected, best (+1 volatility) and worst (-1 volatility, floored) outcomes.
pub fn scenario_band(
    principal: f64,
    monthly_contribution: f64,
    years: u32,
    asset: AssetClass,
    base_rate: f64,
    risk_profile: RiskProfile,
) -> ScenarioBand {
    let adjusted = adjust_return_for_risk(base_rate, risk_profile);
    let best_rate = adjusted + asset.volatility();
    // The floor must not lift the worst case above the expected rate.
    let worst_rate = (adjusted - asset.volatility())
        .max(WORST_CASE_RATE_FLOOR)
        .min(adjusted);

    ScenarioBand {
        best: to_currency(future_value(principal, monthly_contribution, best_rate, years)),
        worst: to_currency(future_value(principal, monthly_contribution, worst_rate, years)),
        expected: to_currency(future_value(principal, monthly_contribution, adjusted, years)),
    }
}

/// One point per year from `start_year` through `start_year + years`, each
/// computed from t = 0 rather than accumulated from the previous point.
pub fn yearly_series(
    principal: f64,
    monthly_contribution: f64,
    years: u32,
    risk_profile: RiskProfile,
    rates: &AssetRates,
    start_year: i32,
) -> Vec<YearlyPoint> {
    (0..=years)
        .map(|elapsed| {
            let values = rates
                .iter()
                .map(|(asset, base_rate)| {
                    let adjusted = adjust_return_for_risk(base_rate, risk_profile);
                    let value = future_value(principal, monthly_contribution, adjusted, elapsed);
                    (asset, to_currency(value))
                })
                .collect();
            YearlyPoint {
                year: start_year + elapsed as i32,
                values,
            }
        })
        .collect()
}

pub fn total_invested(principal: f64, monthly_contribution: f64, years: u32) -> f64 {
    principal + monthly_contribution * 12.0 * years as f64
}

/// Compound annual growth of `value` over `base`; zero when there is nothing to grow from.
pub fn annualized_growth(value: f64, base: f64, years: u32) -> f64 {
    if base <= 0.0 || years == 0 {
        return 0.0;
    }
    (value / base).powf(1.0 / years as f64) - 1.0
}

/// Totals the contributions and picks the strictly highest projection.
/// Ties keep the asset that comes first in enumeration order.
pub fn summarize(
    projections: &BTreeMap<AssetClass, AssetProjection>,
    principal: f64,
    monthly_contribution: f64,
    years: u32,
) -> ProjectionSummary {
    let mut best: Option<BestPerformer> = None;
    for (&asset, projection) in projections {
        let beats = best
            .as_ref()
            .map_or(true, |current| projection.projected_value > current.value);
        if beats {
            best = Some(BestPerformer {
                asset,
                name: asset.display_name(),
                value: projection.projected_value,
            });
        }
    }

    ProjectionSummary {
        total_invested: to_currency(total_invested(principal, monthly_contribution, years)),
        best_performer: best.unwrap_or(BestPerformer {
            asset: AssetClass::Bank,
            name: AssetClass::Bank.display_name(),
            value: 0,
        }),
    }
}
