use std::fmt;

use serde::Serialize;

use super::types::FractionalHandling;

/// What a subscriber should do about a split. Derived, never stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionCategory {
    BuyOneShare,
    BuyThresholdShares,
    CheckRounding,
}

impl ActionCategory {
    pub const ALL: [ActionCategory; 3] = [
        ActionCategory::BuyOneShare,
        ActionCategory::BuyThresholdShares,
        ActionCategory::CheckRounding,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            ActionCategory::BuyOneShare => "Buy 1 Share",
            ActionCategory::BuyThresholdShares => "Buy ? Shares",
            ActionCategory::CheckRounding => "Check Rounding Policy",
        }
    }

    /// Categories that imply placing an order.
    pub fn is_buy(&self) -> bool {
        !matches!(self, ActionCategory::CheckRounding)
    }
}

impl fmt::Display for ActionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// A threshold round-up is only actionable once the minimum holding is known.
pub fn categorize(handling: FractionalHandling, threshold_minimum_shares: Option<u32>) -> ActionCategory {
    match handling {
        FractionalHandling::RoundUp => ActionCategory::BuyOneShare,
        FractionalHandling::ThresholdRoundUp if threshold_minimum_shares.is_some() => {
            ActionCategory::BuyThresholdShares
        }
        FractionalHandling::ThresholdRoundUp
        | FractionalHandling::CashInLieu
        | FractionalHandling::RoundDown
        | FractionalHandling::Unknown => ActionCategory::CheckRounding,
    }
}
