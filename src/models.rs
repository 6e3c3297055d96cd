// src/models.rs
use serde::de::{self, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Investment categories offered by the calculator, in their fixed enumeration order.
///
/// The derived `Ord` follows declaration order, so `BTreeMap<AssetClass, _>` iterates
/// (and serializes) bank, bonds, stocks, gold, crypto, diversified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetClass {
    Bank,
    Bonds,
    Stocks,
    Gold,
    Crypto,
    Diversified,
}

impl AssetClass {
    pub const ALL: [AssetClass; 6] = [
        AssetClass::Bank,
        AssetClass::Bonds,
        AssetClass::Stocks,
        AssetClass::Gold,
        AssetClass::Crypto,
        AssetClass::Diversified,
    ];

    pub fn key(self) -> &'static str {
        match self {
            AssetClass::Bank => "bank",
            AssetClass::Bonds => "bonds",
            AssetClass::Stocks => "stocks",
            AssetClass::Gold => "gold",
            AssetClass::Crypto => "crypto",
            AssetClass::Diversified => "diversified",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            AssetClass::Bank => "Bank Savings",
            AssetClass::Bonds => "Treasury Bonds",
            AssetClass::Stocks => "Stocks (S&P 500)",
            AssetClass::Gold => "Gold",
            AssetClass::Crypto => "Crypto (Bitcoin)",
            AssetClass::Diversified => "Diversified Portfolio",
        }
    }

    /// Canonical annual return as a decimal fraction.
    pub fn historical_return(self) -> f64 {
        match self {
            AssetClass::Bank => 0.048,
            AssetClass::Bonds => 0.042,
            AssetClass::Stocks => 0.10,
            AssetClass::Gold => 0.03,
            AssetClass::Crypto => 0.15,
            AssetClass::Diversified => 0.07,
        }
    }

    /// One standard deviation of annual return, used for best/worst banding.
    pub fn volatility(self) -> f64 {
        match self {
            AssetClass::Bank => 0.001,
            AssetClass::Bonds => 0.05,
            AssetClass::Stocks => 0.15,
            AssetClass::Gold => 0.12,
            AssetClass::Crypto => 0.40,
            AssetClass::Diversified => 0.08,
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            AssetClass::Bank => "#8884d8",
            AssetClass::Bonds => "#82ca9d",
            AssetClass::Stocks => "#ffc658",
            AssetClass::Gold => "#ff7300",
            AssetClass::Crypto => "#8dd1e1",
            AssetClass::Diversified => "#d084d0",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// One annual rate per asset class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssetRates {
    rates: [f64; 6],
}

impl AssetRates {
    /// The built-in table the engine falls back to when no live snapshot is available.
    pub fn historical() -> Self {
        let mut rates = [0.0; 6];
        for asset in AssetClass::ALL {
            rates[asset.index()] = asset.historical_return();
        }
        AssetRates { rates }
    }

    pub fn get(&self, asset: AssetClass) -> f64 {
        self.rates[asset.index()]
    }

    pub fn set(&mut self, asset: AssetClass, rate: f64) {
        self.rates[asset.index()] = rate;
    }

    pub fn with(mut self, asset: AssetClass, rate: f64) -> Self {
        self.set(asset, rate);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (AssetClass, f64)> + '_ {
        AssetClass::ALL.iter().map(move |&asset| (asset, self.get(asset)))
    }
}

impl Default for AssetRates {
    fn default() -> Self {
        AssetRates::historical()
    }
}

impl Serialize for AssetRates {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(AssetClass::ALL.len()))?;
        for (asset, rate) in self.iter() {
            map.serialize_entry(asset.key(), &rate)?;
        }
        map.end()
    }
}

#[derive(Debug, Error, PartialEq)]
#[error("unrecognized risk profile '{0}' (expected conservative, moderate or aggressive)")]
pub struct ParseRiskProfileError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskProfile {
    Conservative,
    Moderate,
    Aggressive,
}

impl RiskProfile {
    pub fn multiplier(self) -> f64 {
        match self {
            RiskProfile::Conservative => 0.7,
            RiskProfile::Moderate => 1.0,
            RiskProfile::Aggressive => 1.3,
        }
    }
}

impl FromStr for RiskProfile {
    type Err = ParseRiskProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "conservative" => Ok(RiskProfile::Conservative),
            "moderate" => Ok(RiskProfile::Moderate),
            "aggressive" => Ok(RiskProfile::Aggressive),
            _ => Err(ParseRiskProfileError(s.to_string())),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ParseMoneyError {
    #[error("empty amount")]
    Empty,
    #[error("malformed amount '{0}'")]
    Malformed(String),
    #[error("amount out of range")]
    OutOfRange,
}

/// A currency amount held as integer cents.
///
/// Deserializes from a JSON number or a plain decimal string ("1500", "1500.25").
/// Digits past the cent are rounded half-up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(i64);

const MAX_CENTS: i64 = 9_000_000_000_000_000;

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    pub fn cents(self) -> i64 {
        self.0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn to_f64(self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn from_f64(value: f64) -> Result<Self, ParseMoneyError> {
        if !value.is_finite() {
            return Err(ParseMoneyError::Malformed(value.to_string()));
        }
        let cents = (value * 100.0).round();
        if cents.abs() > MAX_CENTS as f64 {
            return Err(ParseMoneyError::OutOfRange);
        }
        Ok(Money(cents as i64))
    }
}

impl FromStr for Money {
    type Err = ParseMoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ParseMoneyError::Empty);
        }
        let malformed = || ParseMoneyError::Malformed(s.to_string());

        let (negative, digits) = match trimmed.as_bytes()[0] {
            b'-' => (true, &trimmed[1..]),
            b'+' => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };
        let (whole, fraction) = match digits.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (digits, ""),
        };
        if whole.is_empty() && fraction.is_empty() {
            return Err(malformed());
        }
        if !whole.bytes().all(|b| b.is_ascii_digit()) || !fraction.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }

        let whole_units: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| ParseMoneyError::OutOfRange)?
        };
        let frac = fraction.as_bytes();
        let digit = |i: usize| frac.get(i).map(|b| (b - b'0') as i64).unwrap_or(0);
        let mut cents = whole_units
            .checked_mul(100)
            .and_then(|c| c.checked_add(digit(0) * 10 + digit(1)))
            .ok_or(ParseMoneyError::OutOfRange)?;
        if digit(2) >= 5 {
            cents = cents.checked_add(1).ok_or(ParseMoneyError::OutOfRange)?;
        }
        if cents > MAX_CENTS {
            return Err(ParseMoneyError::OutOfRange);
        }
        Ok(Money(if negative { -cents } else { cents }))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_f64())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MoneyVisitor;

        impl<'de> Visitor<'de> for MoneyVisitor {
            type Value = Money;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a number or decimal string")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Money, E> {
                v.checked_mul(100)
                    .filter(|c| c.abs() <= MAX_CENTS)
                    .map(Money)
                    .ok_or_else(|| E::custom(ParseMoneyError::OutOfRange))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Money, E> {
                i64::try_from(v)
                    .map_err(|_| E::custom(ParseMoneyError::OutOfRange))
                    .and_then(|v| self.visit_i64(v))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Money, E> {
                Money::from_f64(v).map_err(E::custom)
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Money, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(MoneyVisitor)
    }
}

/// Standard success envelope for API responses.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T, M> {
    pub success: bool,
    pub message: String,
    pub data: T,
    pub meta: M,
}

impl<T, M> ApiResponse<T, M> {
    pub fn ok(message: impl Into<String>, data: T, meta: M) -> Self {
        ApiResponse {
            success: true,
            message: message.into(),
            data,
            meta,
        }
    }
}
