//! Market-day arithmetic on the NYSE calendar.
//!
//! Market days are weekdays that are not full-day NYSE holidays. Unscheduled
//! closures and early closes are not modelled.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

pub fn is_market_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !is_holiday(date)
}

/// Whether the exchange is closed for a full-day holiday on `date`.
pub fn is_holiday(date: NaiveDate) -> bool {
    nyse_holidays(date.year()).contains(&date)
}

/// Observed full-day NYSE holidays falling in `year`.
pub fn nyse_holidays(year: i32) -> Vec<NaiveDate> {
    let mut holidays = Vec::with_capacity(10);

    // A Saturday New Year's Day is not observed on the prior Friday
    if let Some(new_year) = NaiveDate::from_ymd_opt(year, 1, 1) {
        match new_year.weekday() {
            Weekday::Sat => {}
            Weekday::Sun => holidays.push(new_year + Duration::days(1)),
            _ => holidays.push(new_year),
        }
    }

    holidays.extend(NaiveDate::from_weekday_of_month_opt(year, 1, Weekday::Mon, 3));
    holidays.extend(NaiveDate::from_weekday_of_month_opt(year, 2, Weekday::Mon, 3));
    holidays.extend(easter_sunday(year).map(|easter| easter - Duration::days(2)));
    holidays.extend(last_monday_of_may(year));
    if year >= 2022 {
        holidays.extend(observed(year, 6, 19));
    }
    holidays.extend(observed(year, 7, 4));
    holidays.extend(NaiveDate::from_weekday_of_month_opt(year, 9, Weekday::Mon, 1));
    holidays.extend(NaiveDate::from_weekday_of_month_opt(year, 11, Weekday::Thu, 4));
    holidays.extend(observed(year, 12, 25));

    holidays
}

/// Saturday holidays move to Friday, Sunday holidays to Monday.
fn observed(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    Some(match date.weekday() {
        Weekday::Sat => date - Duration::days(1),
        Weekday::Sun => date + Duration::days(1),
        _ => date,
    })
}

fn last_monday_of_may(year: i32) -> Option<NaiveDate> {
    let last = NaiveDate::from_ymd_opt(year, 5, 31)?;
    Some(last - Duration::days(i64::from(last.weekday().num_days_from_monday())))
}

/// Gregorian Easter (anonymous computus).
fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    NaiveDate::from_ymd_opt(year, u32::try_from(month).ok()?, u32::try_from(day).ok()?)
}

/// The first market day strictly after `date`.
pub fn next_market_day(date: NaiveDate) -> NaiveDate {
    step_market_days(date, 1)
}

/// The last market day strictly before `date`.
pub fn previous_market_day(date: NaiveDate) -> NaiveDate {
    step_market_days(date, -1)
}

fn step_market_days(date: NaiveDate, direction: i64) -> NaiveDate {
    let mut current = date + Duration::days(direction);
    while !is_market_day(current) {
        current += Duration::days(direction);
    }
    current
}
