use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::constants::placeholders::UNKNOWN_DATE;
use crate::error::ParseError;

use super::category::{categorize, ActionCategory};

/// Share ratio expressed as old shares -> new shares (`"10->1"` is a 1-for-10 reverse split).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SplitRatio {
    pub old_shares: u32,
    pub new_shares: u32,
}

impl SplitRatio {
    pub fn new(old_shares: u32, new_shares: u32) -> Self {
        Self {
            old_shares,
            new_shares,
        }
    }

    /// Shares decrease.
    pub fn is_reverse(&self) -> bool {
        self.old_shares > self.new_shares
    }
}

impl fmt::Display for SplitRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.old_shares, self.new_shares)
    }
}

impl FromStr for SplitRatio {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        super::ratio::parse_ratio(s)
    }
}

impl TryFrom<String> for SplitRatio {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SplitRatio> for String {
    fn from(ratio: SplitRatio) -> Self {
        ratio.to_string()
    }
}

/// Effective date of a split; `Unknown` sorts after every known date.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EffectiveDate {
    Known(NaiveDate),
    Unknown,
}

impl EffectiveDate {
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            EffectiveDate::Known(d) => Some(*d),
            EffectiveDate::Unknown => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, EffectiveDate::Known(_))
    }
}

impl fmt::Display for EffectiveDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EffectiveDate::Known(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            EffectiveDate::Unknown => f.write_str(UNKNOWN_DATE),
        }
    }
}

impl FromStr for EffectiveDate {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case(UNKNOWN_DATE) {
            return Ok(EffectiveDate::Unknown);
        }
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(EffectiveDate::Known)
            .map_err(|_| ParseError::Date(s.to_string()))
    }
}

impl TryFrom<String> for EffectiveDate {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EffectiveDate> for String {
    fn from(date: EffectiveDate) -> Self {
        date.to_string()
    }
}

/// Issuer policy for shares left over after the split is applied.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FractionalHandling {
    RoundUp,
    CashInLieu,
    RoundDown,
    ThresholdRoundUp,
    #[default]
    Unknown,
}

impl FractionalHandling {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, FractionalHandling::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FractionalHandling::RoundUp => "ROUND_UP",
            FractionalHandling::CashInLieu => "CASH_IN_LIEU",
            FractionalHandling::RoundDown => "ROUND_DOWN",
            FractionalHandling::ThresholdRoundUp => "THRESHOLD_ROUND_UP",
            FractionalHandling::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for FractionalHandling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FractionalHandling {
    type Err = ParseError;

    /// Accepts the canonical token with either spaces or underscores.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim().trim_matches('"').to_uppercase().replace([' ', '-'], "_");
        match token.as_str() {
            "ROUND_UP" => Ok(FractionalHandling::RoundUp),
            "CASH_IN_LIEU" => Ok(FractionalHandling::CashInLieu),
            "ROUND_DOWN" => Ok(FractionalHandling::RoundDown),
            "THRESHOLD_ROUND_UP" => Ok(FractionalHandling::ThresholdRoundUp),
            "UNKNOWN" | "NO_INFO" => Ok(FractionalHandling::Unknown),
            _ => Err(ParseError::Fractional(s.to_string())),
        }
    }
}

/// Canonical identity of a split event: `SYMBOL|EFFECTIVE_DATE`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DedupKey {
    pub symbol: String,
    pub effective_date: EffectiveDate,
}

impl DedupKey {
    pub fn new(symbol: &str, effective_date: EffectiveDate) -> Self {
        Self {
            symbol: symbol.trim().to_uppercase(),
            effective_date,
        }
    }

    /// The same symbol with an unresolved date.
    pub fn with_unknown_date(&self) -> Self {
        Self {
            symbol: self.symbol.clone(),
            effective_date: EffectiveDate::Unknown,
        }
    }
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.symbol, self.effective_date)
    }
}

impl FromStr for DedupKey {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (symbol, date) = s.split_once('|').ok_or(ParseError::MissingSymbol)?;
        if symbol.trim().is_empty() {
            return Err(ParseError::MissingSymbol);
        }
        Ok(DedupKey::new(symbol, date.parse()?))
    }
}

/// Candidate record as produced by a source adapter. Field names vary
/// between sources, so common aliases are accepted.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSplitRecord {
    #[serde(alias = "ticker")]
    pub symbol: String,
    #[serde(default, alias = "company_name", alias = "name")]
    pub company: Option<String>,
    #[serde(default, alias = "split_ratio")]
    pub ratio: String,
    #[serde(default, alias = "date", alias = "ex_date", alias = "split_date")]
    pub effective_date: Option<String>,
    #[serde(default, alias = "fractional_shares")]
    pub fractional: Option<String>,
    #[serde(default)]
    pub is_reverse: Option<bool>,
    #[serde(default)]
    pub source: String,
    #[serde(
        default,
        alias = "url",
        alias = "link",
        deserialize_with = "first_link"
    )]
    pub article_link: Option<String>,
}

/// Some scrapers emit a list of article links; keep the first usable one.
fn first_link<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    let links = Option::<OneOrMany>::deserialize(deserializer)?;
    Ok(match links {
        Some(OneOrMany::One(link)) => Some(link),
        Some(OneOrMany::Many(links)) => links.into_iter().find(|l| !l.trim().is_empty()),
        None => None,
    }
    .map(|l| l.trim().to_string())
    .filter(|l| !l.is_empty()))
}

/// Canonical split record. Only reverse splits survive normalization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitRecord {
    pub symbol: String,
    #[serde(default)]
    pub company: String,
    pub ratio: SplitRatio,
    pub effective_date: EffectiveDate,
    pub is_reverse: bool,
    #[serde(default)]
    pub fractional_handling: FractionalHandling,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_minimum_shares: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_explanation: Option<String>,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub article_link: Option<String>,
}

impl SplitRecord {
    pub fn key(&self) -> DedupKey {
        DedupKey::new(&self.symbol, self.effective_date)
    }

    pub fn category(&self) -> ActionCategory {
        categorize(self.fractional_handling, self.threshold_minimum_shares)
    }

    /// Sets the handling and clears threshold details unless it is a threshold round-up.
    pub fn set_fractional_handling(&mut self, handling: FractionalHandling) {
        self.fractional_handling = handling;
        if handling != FractionalHandling::ThresholdRoundUp {
            self.threshold_minimum_shares = None;
            self.threshold_explanation = None;
        }
    }

    /// Records the minimum holding for a threshold round-up. Ignored for other handlings.
    pub fn set_threshold(&mut self, minimum_shares: Option<u32>, explanation: Option<String>) {
        if self.fractional_handling != FractionalHandling::ThresholdRoundUp {
            return;
        }
        self.threshold_minimum_shares = minimum_shares.filter(|n| *n > 0);
        self.threshold_explanation = explanation;
    }
}
