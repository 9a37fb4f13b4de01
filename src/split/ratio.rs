//! Split ratio text parsing.
//!
//! Accepted forms (case-insensitive, surrounding text tolerated):
//! - `10->1`          old -> new
//! - `1-for-10`, `1 for 10`, `1 to 10`   new for old
//! - `1:10`           new : old
//! - `10.00 - 1.00`   old - new (decimal quotes)

use crate::error::ParseError;

use super::types::SplitRatio;

pub fn parse_ratio(text: &str) -> Result<SplitRatio, ParseError> {
    let malformed = || ParseError::Ratio(text.to_string());
    let t = text.trim().to_lowercase().replace('–', "-").replace(',', "");
    if t.is_empty() {
        return Err(malformed());
    }

    let (old, new) = if let Some((l, r)) = t.split_once("->") {
        (last_count(l), first_count(r))
    } else if let Some((l, r)) = split_keyword(&t, "for").or_else(|| split_keyword(&t, "to")) {
        (first_count(r), last_count(l))
    } else if let Some((l, r)) = t.split_once(':') {
        (first_count(r), last_count(l))
    } else if let Some((l, r)) = t.split_once('-') {
        (last_count(l), first_count(r))
    } else {
        (None, None)
    };

    match (old, new) {
        (Some(old), Some(new)) => Ok(SplitRatio::new(old, new)),
        _ => Err(malformed()),
    }
}

/// Splits around a standalone keyword, e.g. `1-for-10` or `1 for 10`.
fn split_keyword<'a>(t: &'a str, keyword: &str) -> Option<(&'a str, &'a str)> {
    let is_sep = |c: char| c == '-' || c.is_whitespace();
    let mut search_from = 0;
    while let Some(pos) = t[search_from..].find(keyword) {
        let idx = search_from + pos;
        let end = idx + keyword.len();
        let before_ok = t[..idx].chars().last().map_or(false, is_sep);
        let after_ok = t[end..].chars().next().map_or(false, is_sep);
        if before_ok && after_ok {
            return Some((t[..idx].trim_end_matches(is_sep), t[end..].trim_start_matches(is_sep)));
        }
        search_from = end;
    }
    None
}

fn first_count(s: &str) -> Option<u32> {
    s.split_whitespace().next().and_then(parse_count)
}

fn last_count(s: &str) -> Option<u32> {
    s.split_whitespace().last().and_then(parse_count)
}

/// A positive whole share count; `"10.00"` is accepted, `"1.5"` is not.
fn parse_count(token: &str) -> Option<u32> {
    let token = token.trim_matches(|c: char| !c.is_ascii_digit() && c != '.');
    let (whole, frac) = token.split_once('.').unwrap_or((token, ""));
    if !frac.chars().all(|c| c == '0') {
        return None;
    }
    whole.parse::<u32>().ok().filter(|n| *n > 0)
}
