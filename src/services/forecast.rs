// src/services/forecast.rs
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::models::{AssetClass, AssetRates, Money, ParseRiskProfileError, RiskProfile};
use crate::services::projection::{
    adjust_return_for_risk, annualized_growth, future_value, scenario_band, summarize,
    to_currency, total_invested, AssetProjection, ProjectionSummary, ScenarioBand, YearlyPoint,
    yearly_series,
};

/// Longest projection accepted, in years past the current year.
pub const MAX_HORIZON_YEARS: i32 = 100;

#[derive(Debug, Error, PartialEq)]
pub enum ForecastError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Forecast request as posted by the calculator form.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastRequest {
    #[serde(alias = "principal")]
    pub amount: Money,
    #[serde(default)]
    pub monthly_contribution: Option<Money>,
    #[serde(deserialize_with = "deserialize_year")]
    pub target_year: i32,
    pub risk_profile: String,
}

fn deserialize_year<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i32, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum YearInput {
        Number(i32),
        Text(String),
    }

    match YearInput::deserialize(deserializer)? {
        YearInput::Number(year) => Ok(year),
        YearInput::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid target year '{}'", text))),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastInput {
    pub principal: Money,
    pub monthly_contribution: Money,
    pub years: u32,
    pub target_year: i32,
    pub risk_profile: RiskProfile,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastResult {
    pub input: ForecastInput,
    pub projections: BTreeMap<AssetClass, AssetProjection>,
    pub scenarios: BTreeMap<AssetClass, ScenarioBand>,
    pub yearly_projections: Vec<YearlyPoint>,
    pub summary: ProjectionSummary,
}

impl ForecastRequest {
    pub fn validate(&self, current_year: i32) -> Result<ForecastInput, ForecastError> {
        let monthly_contribution = self.monthly_contribution.unwrap_or(Money::ZERO);

        if self.amount.is_negative() {
            return Err(ForecastError::InvalidInput(
                "principal must not be negative".to_string(),
            ));
        }
        if monthly_contribution.is_negative() {
            return Err(ForecastError::InvalidInput(
                "monthly contribution must not be negative".to_string(),
            ));
        }
        let risk_profile: RiskProfile = self
            .risk_profile
            .parse()
            .map_err(|e: ParseRiskProfileError| ForecastError::InvalidInput(e.to_string()))?;
        if self.target_year <= current_year {
            return Err(ForecastError::InvalidInput(format!(
                "target year {} must be after {}",
                self.target_year, current_year
            )));
        }
        if self.target_year - current_year > MAX_HORIZON_YEARS {
            return Err(ForecastError::InvalidInput(format!(
                "target year {} is more than {} years away",
                self.target_year, MAX_HORIZON_YEARS
            )));
        }

        Ok(ForecastInput {
            principal: self.amount,
            monthly_contribution,
            years: (self.target_year - current_year) as u32,
            target_year: self.target_year,
            risk_profile,
        })
    }
}

/// Validates the request and projects every asset class out to the target year.
pub fn forecast(
    request: &ForecastRequest,
    current_year: i32,
    rates: &AssetRates,
) -> Result<ForecastResult, ForecastError> {
    let input = request.validate(current_year)?;
    Ok(project(input, rates))
}

/// Projects an already validated input; the series starts at `target_year - years`.
pub fn project(input: ForecastInput, rates: &AssetRates) -> ForecastResult {
    let current_year = input.target_year - input.years as i32;
    let principal = input.principal.to_f64();
    let monthly = input.monthly_contribution.to_f64();
    let years = input.years;
    let risk = input.risk_profile;

    let growth_base = if principal > 0.0 {
        principal
    } else {
        total_invested(principal, monthly, years)
    };

    let mut projections = BTreeMap::new();
    let mut scenarios = BTreeMap::new();
    for (asset, base_rate) in rates.iter() {
        let adjusted = adjust_return_for_risk(base_rate, risk);
        let value = future_value(principal, monthly, adjusted, years);

        projections.insert(
            asset,
            AssetProjection {
                name: asset.display_name(),
                color: asset.color(),
                expected_return_rate: adjusted,
                projected_value: to_currency(value),
                annualized_growth_rate: annualized_growth(value, growth_base, years),
            },
        );
        scenarios.insert(
            asset,
            scenario_band(principal, monthly, years, asset, base_rate, risk),
        );
    }

    let yearly_projections = yearly_series(principal, monthly, years, risk, rates, current_year);
    let summary = summarize(&projections, principal, monthly, years);

    ForecastResult {
        input,
        projections,
        scenarios,
        yearly_projections,
        summary,
    }
}
