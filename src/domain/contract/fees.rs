//! Commercial terms: itemized fees, who pays them, and amount parsing.
//!
//! Staff type amounts the way people write them ("500,000", "1.200.000"),
//! so parsing strips grouping separators before reading the integer.

use crate::domain::foundation::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The five itemized fees a contract can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeKind {
    BrokerageFee,
    TitleTransferFee,
    LegalCheckFee,
    AdminProcessingFee,
    ReinspectionFee,
}

impl FeeKind {
    pub const ALL: [FeeKind; 5] = [
        FeeKind::BrokerageFee,
        FeeKind::TitleTransferFee,
        FeeKind::LegalCheckFee,
        FeeKind::AdminProcessingFee,
        FeeKind::ReinspectionFee,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeeKind::BrokerageFee => "brokerage_fee",
            FeeKind::TitleTransferFee => "title_transfer_fee",
            FeeKind::LegalCheckFee => "legal_check_fee",
            FeeKind::AdminProcessingFee => "admin_processing_fee",
            FeeKind::ReinspectionFee => "reinspection_fee",
        }
    }

    /// Human label used in contract emails.
    pub fn label(&self) -> &'static str {
        match self {
            FeeKind::BrokerageFee => "Brokerage fee",
            FeeKind::TitleTransferFee => "Title transfer fee",
            FeeKind::LegalCheckFee => "Legal and condition check fee",
            FeeKind::AdminProcessingFee => "Administrative processing fee",
            FeeKind::ReinspectionFee => "Reinspection fee",
        }
    }
}

impl fmt::Display for FeeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeeKind {
    type Err = ValidationError;

    /// Accepts snake_case keys and the camelCase keys older clients send.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "brokerage_fee" | "brokerageFee" => Ok(FeeKind::BrokerageFee),
            "title_transfer_fee" | "titleTransferFee" => Ok(FeeKind::TitleTransferFee),
            "legal_check_fee" | "legalAndConditionCheckFee" | "legalCheckFee" => {
                Ok(FeeKind::LegalCheckFee)
            }
            "admin_processing_fee" | "adminProcessingFee" => Ok(FeeKind::AdminProcessingFee),
            "reinspection_fee" | "reinspectionFee" => Ok(FeeKind::ReinspectionFee),
            other => Err(ValidationError::invalid_format(
                "fee_responsibility",
                format!("unknown fee kind '{}'", other),
            )),
        }
    }
}

/// A contract party.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Party {
    Buyer,
    Seller,
}

impl Party {
    pub fn as_str(&self) -> &'static str {
        match self {
            Party::Buyer => "buyer",
            Party::Seller => "seller",
        }
    }

    pub fn other(&self) -> Party {
        match self {
            Party::Buyer => Party::Seller,
            Party::Seller => Party::Buyer,
        }
    }
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Party {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "buyer" => Ok(Party::Buyer),
            "seller" => Ok(Party::Seller),
            other => Err(ValidationError::invalid_format(
                "fee_responsibility",
                format!("'{}' is not one of buyer, seller", other),
            )),
        }
    }
}

/// An amount as submitted by a client: either a JSON number or a string
/// that may contain grouping separators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Number(i64),
    Text(String),
}

impl AmountInput {
    pub fn parse(&self, field: &str) -> Result<i64, ValidationError> {
        match self {
            AmountInput::Number(value) if *value < 0 => {
                Err(ValidationError::out_of_range(field, 0, i64::MAX, *value))
            }
            AmountInput::Number(value) => Ok(*value),
            AmountInput::Text(raw) => parse_amount(field, raw),
        }
    }
}

impl From<i64> for AmountInput {
    fn from(value: i64) -> Self {
        AmountInput::Number(value)
    }
}

impl From<&str> for AmountInput {
    fn from(value: &str) -> Self {
        AmountInput::Text(value.to_string())
    }
}

/// Parses a non-negative integer amount, tolerating grouping separators.
///
/// Commas, underscores and whitespace are always dropped. Dots are accepted
/// only as thousands separators (every group after the first has exactly
/// three digits); anything else with a dot is a fractional amount and is
/// rejected.
pub fn parse_amount(field: &str, raw: &str) -> Result<i64, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::empty_field(field));
    }

    let (negative, unsigned) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };

    let compact: String = unsigned
        .chars()
        .filter(|c| *c != ',' && *c != '_' && !c.is_whitespace())
        .collect();

    let digits = if compact.contains('.') {
        let mut groups = compact.split('.');
        let head = groups.next().unwrap_or_default();
        let tail: Vec<&str> = groups.collect();
        let grouped = !head.is_empty() && head.len() <= 3 && tail.iter().all(|g| g.len() == 3);
        if !grouped {
            return Err(ValidationError::invalid_format(
                field,
                format!("'{}' is not a whole amount", raw.trim()),
            ));
        }
        let mut joined = head.to_string();
        for group in tail {
            joined.push_str(group);
        }
        joined
    } else {
        compact
    };

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::invalid_format(
            field,
            format!("'{}' is not a number", raw.trim()),
        ));
    }

    let value: i64 = digits.parse().map_err(|_| {
        ValidationError::invalid_format(field, format!("'{}' is too large", raw.trim()))
    })?;

    if negative && value != 0 {
        return Err(ValidationError::out_of_range(field, 0, i64::MAX, -value));
    }

    Ok(value)
}

/// Itemized fee amounts in the smallest currency unit. Missing kinds are zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeeSchedule(BTreeMap<FeeKind, i64>);

impl FeeSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a fee amount.
    ///
    /// # Errors
    ///
    /// - `OutOfRange` if the amount is negative
    pub fn set(&mut self, kind: FeeKind, amount: i64) -> Result<(), ValidationError> {
        if amount < 0 {
            return Err(ValidationError::out_of_range(kind.as_str(), 0, i64::MAX, amount));
        }
        self.0.insert(kind, amount);
        Ok(())
    }

    /// Builder form of `set`.
    pub fn with(mut self, kind: FeeKind, amount: i64) -> Result<Self, ValidationError> {
        self.set(kind, amount)?;
        Ok(self)
    }

    pub fn amount(&self, kind: FeeKind) -> i64 {
        self.0.get(&kind).copied().unwrap_or(0)
    }

    pub fn total(&self) -> i64 {
        self.0.values().fold(0i64, |acc, v| acc.saturating_add(*v))
    }

    pub fn iter(&self) -> impl Iterator<Item = (FeeKind, i64)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }
}

/// Which party pays each fee. Kinds without an entry are unassigned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeeResponsibility(BTreeMap<FeeKind, Party>);

impl FeeResponsibility {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign(&mut self, kind: FeeKind, party: Party) {
        self.0.insert(kind, party);
    }

    pub fn with(mut self, kind: FeeKind, party: Party) -> Self {
        self.assign(kind, party);
        self
    }

    pub fn party_for(&self, kind: FeeKind) -> Option<Party> {
        self.0.get(&kind).copied()
    }

    /// Parses a client-supplied map of fee keys to "buyer"/"seller".
    pub fn from_raw<'a>(
        entries: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, ValidationError> {
        let mut map = Self::new();
        for (key, value) in entries {
            map.assign(key.parse()?, value.parse()?);
        }
        Ok(map)
    }

    /// Sum of the fees a given party is responsible for.
    pub fn total_for(&self, party: Party, fees: &FeeSchedule) -> i64 {
        fees.iter()
            .filter(|(kind, _)| self.party_for(*kind) == Some(party))
            .fold(0i64, |acc, (_, amount)| acc.saturating_add(amount))
    }

    pub fn iter(&self) -> impl Iterator<Item = (FeeKind, Party)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }
}
