//! Currency codes and locale-aware rendering of monetary amounts.

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::errors::BudgetError;

/// ISO 4217 currency representation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn kes() -> Self {
        Self::new("KES")
    }
}

impl Default for CurrencyCode {
    fn default() -> Self {
        Self::new("USD")
    }
}

impl From<String> for CurrencyCode {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<CurrencyCode> for String {
    fn from(value: CurrencyCode) -> Self {
        value.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Locale-aware formatting preferences.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocaleConfig {
    pub language_tag: String,
    pub decimal_separator: char,
    pub grouping_separator: char,
    pub date_format: DateFormatStyle,
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self {
            language_tag: "en-US".into(),
            decimal_separator: '.',
            grouping_separator: ',',
            date_format: DateFormatStyle::Medium,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FormatOptions {
    pub currency_display: CurrencyDisplay,
    pub negative_style: NegativeStyle,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            currency_display: CurrencyDisplay::Symbol,
            negative_style: NegativeStyle::Sign,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NegativeStyle {
    Sign,
    Parentheses,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CurrencyDisplay {
    Symbol,
    Code,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DateFormatStyle {
    Short,
    Medium,
    Long,
}

pub fn symbol_for(code: &str) -> String {
    match code {
        "USD" => "$".into(),
        "EUR" => "€".into(),
        "GBP" => "£".into(),
        "JPY" => "¥".into(),
        "KES" => "KSh".into(),
        "AUD" => "A$".into(),
        _ => code.into(),
    }
}

pub fn minor_units_for(code: &str) -> u8 {
    match code {
        "JPY" => 0,
        "KWD" | "BHD" => 3,
        _ => 2,
    }
}

pub fn format_number(locale: &LocaleConfig, value: f64, precision: u8) -> String {
    let body = format!("{:.*}", precision as usize, value);
    let (int_part, frac_part) = match body.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (body.as_str(), None),
    };
    let grouped = match int_part.strip_prefix('-') {
        Some(digits) => format!("-{}", group_digits(digits, locale.grouping_separator)),
        None => group_digits(int_part, locale.grouping_separator),
    };
    match frac_part {
        Some(frac) => format!("{}{}{}", grouped, locale.decimal_separator, frac),
        None => grouped,
    }
}

fn group_digits(digits: &str, separator: char) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (count, ch) in digits.chars().rev().enumerate() {
        if count != 0 && count % 3 == 0 {
            grouped.insert(0, separator);
        }
        grouped.insert(0, ch);
    }
    grouped
}

/// Renders `amount` in `code` using the locale's separators and the requested display.
///
/// Alphabetic symbols (`KSh`, `CHF`) are separated from the digits by a space.
pub fn format_currency_value(
    amount: f64,
    code: &CurrencyCode,
    locale: &LocaleConfig,
    options: &FormatOptions,
) -> String {
    let precision = minor_units_for(code.as_str());
    let body = format_number(locale, amount.abs(), precision);
    let prefix = match options.currency_display {
        CurrencyDisplay::Symbol => {
            let symbol = symbol_for(code.as_str());
            if symbol.chars().all(char::is_alphabetic) {
                format!("{} ", symbol)
            } else {
                symbol
            }
        }
        CurrencyDisplay::Code => format!("{} ", code.as_str()),
    };
    // Rounding can turn a tiny negative into zero; don't render "-0.00".
    let negative = amount < 0.0 && body.chars().any(|ch| ch.is_ascii_digit() && ch != '0');
    if !negative {
        return format!("{}{}", prefix, body);
    }
    match options.negative_style {
        NegativeStyle::Sign => format!("-{}{}", prefix, body),
        NegativeStyle::Parentheses => format!("({}{})", prefix, body),
    }
}

/// Formats with en-US conventions, falling back to the default currency.
pub fn format_currency(amount: f64, code: Option<&CurrencyCode>) -> String {
    let fallback = CurrencyCode::default();
    format_currency_value(
        amount,
        code.unwrap_or(&fallback),
        &LocaleConfig::default(),
        &FormatOptions::default(),
    )
}

/// Parses text produced by [`format_currency_value`] back into a number.
pub fn parse_currency_value(text: &str, locale: &LocaleConfig) -> Result<f64, BudgetError> {
    let trimmed = text.trim();
    let negative = trimmed.starts_with('-')
        || (trimmed.starts_with('(') && trimmed.ends_with(')'));
    let mut normalized = String::with_capacity(trimmed.len());
    for ch in trimmed.chars() {
        if ch.is_ascii_digit() {
            normalized.push(ch);
        } else if ch == locale.decimal_separator {
            normalized.push('.');
        }
    }
    if !normalized.chars().any(|ch| ch.is_ascii_digit()) {
        return Err(BudgetError::InvalidInput(format!(
            "`{}` does not contain an amount",
            text
        )));
    }
    let value: f64 = normalized
        .parse()
        .map_err(|_| BudgetError::InvalidInput(format!("`{}` is not a valid amount", text)))?;
    Ok(if negative { -value } else { value })
}

pub fn format_date(locale: &LocaleConfig, date: NaiveDate) -> String {
    match locale.date_format {
        DateFormatStyle::Short => date.format("%Y-%m-%d").to_string(),
        DateFormatStyle::Medium => format!(
            "{} {}, {}",
            month_label(date.month()),
            date.day(),
            date.year()
        ),
        DateFormatStyle::Long => date.format("%A, %B %-d, %Y").to_string(),
    }
}

pub(crate) fn month_label(month: u32) -> &'static str {
    match month {
        1 => "Jan",
        2 => "Feb",
        3 => "Mar",
        4 => "Apr",
        5 => "May",
        6 => "Jun",
        7 => "Jul",
        8 => "Aug",
        9 => "Sep",
        10 => "Oct",
        11 => "Nov",
        12 => "Dec",
        _ => "",
    }
}
