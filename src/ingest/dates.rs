use chrono::NaiveDate;
use regex::Regex;

const MONTH_NAMES: &str = concat!(
    "jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|jun(?:e)?|",
    "jul(?:y)?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?"
);

/// First calendar date mentioned in the text, by position of the match.
/// Recognizes month-name forms ("February 2, 2023", "2 February 2023"),
/// ISO ("2023-02-02"), and slash dates ("2/2/2023", month-first with a
/// day-first fallback). Best effort only; anything unrecognized is skipped.
pub fn first_date(text: &str) -> Option<NaiveDate> {
    let mut candidates = Vec::new();

    scan_month_day_year(text, &mut candidates);
    scan_day_month_year(text, &mut candidates);
    scan_iso(text, &mut candidates);
    scan_slash(text, &mut candidates);

    candidates
        .into_iter()
        .min_by_key(|(start, _)| *start)
        .map(|(_, date)| date)
}

fn scan_month_day_year(text: &str, out: &mut Vec<(usize, NaiveDate)>) {
    let pattern = Regex::new(&format!(
        r"(?i)\b({MONTH_NAMES})\.?\s+(\d{{1,2}})(?:st|nd|rd|th)?,?\s+(\d{{4}})\b"
    ))
    .expect("compile month-day-year regex");

    for capture in pattern.captures_iter(text) {
        let Some(month) = month_number(&capture[1]) else {
            continue;
        };
        let (Ok(day), Ok(year)) = (capture[2].parse::<u32>(), capture[3].parse::<i32>()) else {
            continue;
        };
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            out.push((capture.get(0).map(|m| m.start()).unwrap_or(0), date));
        }
    }
}

fn scan_day_month_year(text: &str, out: &mut Vec<(usize, NaiveDate)>) {
    let pattern = Regex::new(&format!(
        r"(?i)\b(\d{{1,2}})(?:st|nd|rd|th)?\s+({MONTH_NAMES})\.?,?\s+(\d{{4}})\b"
    ))
    .expect("compile day-month-year regex");

    for capture in pattern.captures_iter(text) {
        let Some(month) = month_number(&capture[2]) else {
            continue;
        };
        let (Ok(day), Ok(year)) = (capture[1].parse::<u32>(), capture[3].parse::<i32>()) else {
            continue;
        };
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            out.push((capture.get(0).map(|m| m.start()).unwrap_or(0), date));
        }
    }
}

fn scan_iso(text: &str, out: &mut Vec<(usize, NaiveDate)>) {
    let pattern =
        Regex::new(r"\b(\d{4})-(\d{1,2})-(\d{1,2})\b").expect("compile iso date regex");

    for capture in pattern.captures_iter(text) {
        let (Ok(year), Ok(month), Ok(day)) = (
            capture[1].parse::<i32>(),
            capture[2].parse::<u32>(),
            capture[3].parse::<u32>(),
        ) else {
            continue;
        };
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            out.push((capture.get(0).map(|m| m.start()).unwrap_or(0), date));
        }
    }
}

fn scan_slash(text: &str, out: &mut Vec<(usize, NaiveDate)>) {
    let pattern =
        Regex::new(r"\b(\d{1,2})/(\d{1,2})/(\d{4})\b").expect("compile slash date regex");

    for capture in pattern.captures_iter(text) {
        let (Ok(first), Ok(second), Ok(year)) = (
            capture[1].parse::<u32>(),
            capture[2].parse::<u32>(),
            capture[3].parse::<i32>(),
        ) else {
            continue;
        };

        // Month-first, falling back to day-first when that can't be a month.
        let date = NaiveDate::from_ymd_opt(year, first, second)
            .or_else(|| NaiveDate::from_ymd_opt(year, second, first));
        if let Some(date) = date {
            out.push((capture.get(0).map(|m| m.start()).unwrap_or(0), date));
        }
    }
}

fn month_number(name: &str) -> Option<u32> {
    let lower = name.to_ascii_lowercase();
    let prefix = lower.get(..3)?;
    match prefix {
        "jan" => Some(1),
        "feb" => Some(2),
        "mar" => Some(3),
        "apr" => Some(4),
        "may" => Some(5),
        "jun" => Some(6),
        "jul" => Some(7),
        "aug" => Some(8),
        "sep" => Some(9),
        "oct" => Some(10),
        "nov" => Some(11),
        "dec" => Some(12),
        _ => None,
    }
}
