use crate::agents::{extract_json, Agent};
use crate::error::ParseError;
use crate::split::normalize::normalize_date;
use crate::split::ratio::parse_ratio;
use crate::split::{EffectiveDate, FractionalHandling, SplitRatio, SplitRecord};

/// Researches how an issuer treats fractional shares in a reverse split.
pub struct FractionalAgent;

/// Structured answer from one research attempt.
#[derive(Clone, Debug, PartialEq)]
pub struct FractionalFinding {
    pub fractional_handling: FractionalHandling,
    pub ratio: Option<SplitRatio>,
    pub effective_date: Option<EffectiveDate>,
    pub is_reverse: Option<bool>,
}

impl Agent for FractionalAgent {
    fn name(&self) -> &str {
        "Fractional-Agent"
    }

    fn system_prompt(&self) -> &str {
        r#"You are a corporate actions research assistant. Using the company's latest SEC filings, press releases and investor relations material, determine how an upcoming reverse stock split treats fractional shares.

Classify the fractional share treatment as exactly one of:
"ROUND_UP"            - fractional shares are rounded up to the nearest whole share
"CASH_IN_LIEU"        - holders receive cash instead of fractional shares
"ROUND_DOWN"          - fractional shares are rounded down / cancelled
"THRESHOLD_ROUND_UP"  - fractional shares are rounded up only above a minimum holding or threshold
"UNKNOWN"             - no reliable information is available

Base the answer on factual sources only. Do not guess.

Output MUST be a valid JSON object with the following structure:
{
    "fractional_handling": "ROUND_UP" | "CASH_IN_LIEU" | "ROUND_DOWN" | "THRESHOLD_ROUND_UP" | "UNKNOWN",
    "ratio": "1-for-20",
    "effective_date": "YYYY-MM-DD" | "unknown",
    "is_reverse": true | false
}
"#
    }
}

impl FractionalAgent {
    pub fn query(&self, record: &SplitRecord) -> String {
        let mut query = format!(
            "Symbol: {}\nCompany: {}\nRatio (old->new shares): {}\nEffective date: {}\n",
            record.symbol,
            if record.company.is_empty() { "unknown" } else { record.company.as_str() },
            record.ratio,
            record.effective_date,
        );
        if let Some(link) = &record.article_link {
            query.push_str(&format!("Announcement: {}\n", link));
        }
        query.push_str("How will fractional shares be handled in this reverse split?");
        query
    }

    /// Fails only when the handling itself cannot be read; the supporting
    /// fields are best-effort.
    pub fn parse(&self, response: &str) -> Result<FractionalFinding, ParseError> {
        let json = match extract_json(response) {
            Ok(json) => json,
            // A bare token such as `ROUND_UP` is still a usable answer
            Err(e) => {
                let handling = response.trim().parse::<FractionalHandling>().map_err(|_| e)?;
                return Ok(FractionalFinding {
                    fractional_handling: handling,
                    ratio: None,
                    effective_date: None,
                    is_reverse: None,
                });
            }
        };

        let handling = json
            .get("fractional_handling")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ParseError::Response("missing fractional_handling".to_string()))?
            .parse::<FractionalHandling>()?;

        Ok(FractionalFinding {
            fractional_handling: handling,
            ratio: json
                .get("ratio")
                .and_then(|v| v.as_str())
                .and_then(|s| parse_ratio(s).ok()),
            effective_date: json
                .get("effective_date")
                .and_then(|v| v.as_str())
                .and_then(|s| normalize_date(Some(s)).ok()),
            is_reverse: json.get("is_reverse").and_then(|v| v.as_bool()),
        })
    }
}
