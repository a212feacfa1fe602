//! Date answers at mixed granularity: "December 2, 2021" vs "December 2021" vs "2021".

use chrono::{DateTime, Datelike, Month, NaiveDate, NaiveDateTime};
use regex::Regex;
use std::sync::LazyLock;

static FILLER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:a|an|the|in|on)\b").expect("Invalid regex pattern"));

/// Date answers are expected to end in a four-digit year.
static POTENTIAL_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{4}$").expect("Invalid regex pattern"));

static DAY_MONTH_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<day>\d{1,2})\s+(?P<month>[A-Za-z]+)\s+(?P<year>\d{4})$")
        .expect("Invalid regex pattern")
});

static MONTH_DAY_COMMA_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<month>[A-Za-z]+)\s+(?P<day>\d{1,2}),\s*(?P<year>\d{4})$")
        .expect("Invalid regex pattern")
});

static MONTH_DAY_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<month>[A-Za-z]+)\s+(?P<day>\d{1,2})\s+(?P<year>\d{4})$")
        .expect("Invalid regex pattern")
});

static MONTH_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<month>[A-Za-z]+)\s+(?P<year>\d{4})$").expect("Invalid regex pattern")
});

static YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<year>\d{4})$").expect("Invalid regex pattern"));

/// Written date layouts understood by the date matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFormat {
    /// `2 December 2021`
    DayMonthYear,
    /// `December 2, 2021`
    MonthDayCommaYear,
    /// `December 2 2021`
    MonthDayYear,
    /// `December 2021`
    MonthYear,
    /// `2021`
    Year,
}

impl DateFormat {
    /// Formats tried on a prediction, most specific first.
    pub const PREDICTION_ORDER: [DateFormat; 5] = [
        DateFormat::DayMonthYear,
        DateFormat::MonthDayCommaYear,
        DateFormat::MonthDayYear,
        DateFormat::MonthYear,
        DateFormat::Year,
    ];

    /// Formats that pin down a calendar day.
    pub const FULL_DATE: [DateFormat; 3] = [
        DateFormat::DayMonthYear,
        DateFormat::MonthDayCommaYear,
        DateFormat::MonthDayYear,
    ];

    fn pattern(self) -> &'static Regex {
        match self {
            DateFormat::DayMonthYear => &DAY_MONTH_YEAR,
            DateFormat::MonthDayCommaYear => &MONTH_DAY_COMMA_YEAR,
            DateFormat::MonthDayYear => &MONTH_DAY_YEAR,
            DateFormat::MonthYear => &MONTH_YEAR,
            DateFormat::Year => &YEAR,
        }
    }

    /// Parse `text` as exactly this layout. Missing fields default to the
    /// first month / first day. Month names are matched case-insensitively and
    /// may be abbreviated to three letters.
    pub fn parse(self, text: &str) -> Option<NaiveDate> {
        let caps = self.pattern().captures(text)?;
        let year = caps.name("year")?.as_str().parse().ok()?;
        let month = match caps.name("month") {
            Some(name) => name.as_str().parse::<Month>().ok()?.number_from_month(),
            None => 1,
        };
        let day = match caps.name("day") {
            Some(day) => day.as_str().parse().ok()?,
            None => 1,
        };
        NaiveDate::from_ymd_opt(year, month, day)
    }
}

/// First successful parse of `text` across `formats`, in order.
pub fn parse_first(text: &str, formats: &[DateFormat]) -> Option<NaiveDate> {
    formats.iter().find_map(|format| format.parse(text))
}

fn strip_fillers(text: &str) -> String {
    FILLER.replace_all(text, " ").trim().to_string()
}

/// True if both answers name the same date at the granularity the ground truth
/// is written in.
///
/// The prediction is parsed once at its most specific layout. The ground truth
/// is then tried as a full date (calendar days must agree), then as
/// month + year, then as a bare year, comparing only the fields it carries.
/// Both strings must end in a four-digit year or no parse is attempted.
pub fn date_equivalent(prediction: &str, ground_truth: &str) -> bool {
    let pred = strip_fillers(prediction);
    let gt = strip_fillers(ground_truth);
    if pred == gt {
        return true;
    }

    if !(POTENTIAL_YEAR.is_match(&pred) && POTENTIAL_YEAR.is_match(&gt)) {
        return false;
    }

    let Some(pred_date) = parse_first(&pred, &DateFormat::PREDICTION_ORDER) else {
        return false;
    };

    if let Some(gt_date) = parse_first(&gt, &DateFormat::FULL_DATE) {
        return gt_date == pred_date;
    }
    if let Some(gt_date) = DateFormat::MonthYear.parse(&gt) {
        return gt_date.month() == pred_date.month() && gt_date.year() == pred_date.year();
    }
    if let Some(gt_date) = DateFormat::Year.parse(&gt) {
        return gt_date.year() == pred_date.year();
    }
    false
}

/// Render an ISO-8601 date or datetime ("2021-12-02", "2021-12-02T00:00:00Z")
/// as "December 2, 2021". Any other text is returned unchanged.
pub fn render_iso_date(text: &str) -> String {
    let trimmed = text.trim().trim_start_matches('+');
    let date = DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| dt.date_naive())
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S").map(|dt| dt.date()))
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%Y-%m-%d"));

    match date {
        Ok(date) => date.format("%B %-d, %Y").to_string(),
        Err(_) => text.to_string(),
    }
}
