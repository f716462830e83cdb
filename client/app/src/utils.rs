use std::path::{Path, PathBuf};

use catalog::remote::default_report_name;
use chrono::{Duration, Local, NaiveDate};
use regex::Regex;

use crate::error::AppError;

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Accepts `today`, `yesterday` or `YYYY-MM-DD`.
pub fn parse_day(raw: &str) -> Result<NaiveDate, AppError> {
    match raw.trim().to_lowercase().as_str() {
        "today" => Ok(today()),
        "yesterday" => Ok(today() - Duration::days(1)),
        other => NaiveDate::parse_from_str(other, "%Y-%m-%d")
            .map_err(|_| AppError::usage(format!("Invalid date {raw}, expected YYYY-MM-DD"))),
    }
}

pub fn parse_pairs(args: &[&str]) -> Result<Vec<(String, String)>, AppError> {
    args.iter()
        .map(|arg| match arg.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() && !value.trim().is_empty() => Ok((
                key.trim().to_lowercase().replace('-', "_"),
                value.trim().to_string(),
            )),
            _ => Err(AppError::usage(format!("Expected key=value, got {arg}"))),
        })
        .collect()
}

pub fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, AppError> {
    raw.parse()
        .map_err(|_| AppError::usage(format!("{key} must be a number, got {raw}")))
}

/// Like [`parse_number`] for quantities sent to the backend, which cannot carry `nan` or `inf`.
pub fn parse_amount(key: &str, raw: &str) -> Result<f64, AppError> {
    let value: f64 = parse_number(key, raw)?;
    if !value.is_finite() {
        return Err(AppError::usage(format!("{key} must be a number, got {raw}")));
    }

    Ok(value)
}

pub fn sanitize_filename(input: &str) -> String {
    let Ok(unsafe_chars) = Regex::new(r"[^A-Za-z0-9._-]+") else {
        return default_report_name();
    };

    let name = unsafe_chars.replace_all(input.trim(), "_").into_owned();
    let name = name.trim_start_matches(['.', '_']).to_string();

    if name.is_empty() {
        default_report_name()
    } else {
        name
    }
}

pub fn report_path(dir: &Path, filename: &str) -> PathBuf {
    dir.join(sanitize_filename(filename))
}
