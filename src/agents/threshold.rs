use crate::agents::{extract_json, Agent};
use crate::error::ParseError;
use crate::split::SplitRecord;

/// Finds the minimum holding that qualifies for a threshold round-up.
pub struct ThresholdAgent;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ThresholdFinding {
    pub minimum_shares: Option<u32>,
    pub explanation: Option<String>,
}

impl ThresholdFinding {
    pub fn is_complete(&self) -> bool {
        self.minimum_shares.is_some()
    }
}

impl Agent for ThresholdAgent {
    fn name(&self) -> &str {
        "Threshold-Agent"
    }

    fn system_prompt(&self) -> &str {
        r#"You are a corporate actions research assistant. A company's reverse stock split rounds fractional shares up only when a holder meets a threshold (for example a minimum number of pre-split shares, or a fractional remainder above a minimum).

Using the company's SEC filings and press releases, find the smallest number of PRE-SPLIT shares a holder must own to receive the round-up.

Output MUST be a valid JSON object with the following structure:
{
    "threshold_minimum_shares": 100,
    "explanation": "One sentence describing the rule and its source."
}
If the number cannot be determined, set "threshold_minimum_shares" to null and explain why.
"#
    }
}

impl ThresholdAgent {
    pub fn query(&self, record: &SplitRecord) -> String {
        let mut query = format!(
            "Symbol: {}\nRatio (old->new shares): {}\nPre-split shares per new share: {}\nEffective date: {}\n",
            record.symbol,
            record.ratio,
            record.ratio.old_shares.max(record.ratio.new_shares),
            record.effective_date,
        );
        if let Some(link) = &record.article_link {
            query.push_str(&format!("Announcement: {}\n", link));
        }
        query.push_str("What is the minimum number of shares needed to be rounded up?");
        query
    }

    /// An object with only an explanation parses as a partial finding.
    pub fn parse(&self, response: &str) -> Result<ThresholdFinding, ParseError> {
        let json = extract_json(response)?;

        let minimum_shares = json.get("threshold_minimum_shares").and_then(|v| {
            v.as_u64()
                .or_else(|| v.as_str().and_then(|s| s.trim().replace(',', "").parse().ok()))
                .and_then(|n| u32::try_from(n).ok())
                .filter(|n| *n > 0)
        });
        let explanation = json
            .get("explanation")
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        if minimum_shares.is_none() && explanation.is_none() {
            return Err(ParseError::Response("no threshold or explanation".to_string()));
        }
        Ok(ThresholdFinding {
            minimum_shares,
            explanation,
        })
    }
}
