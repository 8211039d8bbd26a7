//! Field cleaning: text normalization, numeric coercion and the derived
//! columns (`clean_review`, `word_count`, `main_category`, `rating_tone`).
//!
//! Every coercion here is lossy but total. A cell that holds no usable
//! number becomes zero (or the column mean for ratings) and a missing review
//! becomes an empty string; nothing in this module fails on cell content.

use color_eyre::Result;
use polars::prelude::*;
use regex::Regex;
use scraper::Html;
use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;
use tracing::{debug, info};

use crate::schema::{
    ACTUAL_PRICE, CATEGORY, CLEAN_REVIEW, DISCOUNTED_PRICE, DISCOUNT_PERCENTAGE, MAIN_CATEGORY,
    PRODUCT_NAME, RATING, RATING_COUNT, RATING_TONE, REVIEW_CONTENT, WORD_COUNT,
};
use crate::table::{ReviewTable, Stage};

/// Brand overrides for shortened product names, checked in order on the
/// lowercased raw name. First match wins.
pub const BRAND_OVERRIDES: &[(&str, &str)] = &[
    ("wayona", "Wayona Cable"),
    ("ambrane", "Ambrane Cable"),
    ("boat", "boAt Cable"),
    ("sounce", "Sounce Cable"),
];

pub const PRICE_COLUMNS: &[&str] = &[DISCOUNTED_PRICE, ACTUAL_PRICE, DISCOUNT_PERCENTAGE];

/// Label for rows whose category cell is empty.
pub const UNCATEGORIZED: &str = "Uncategorized";

static URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"http\S+").expect("URL pattern is valid"));

/// A complete tag or a character reference.
static MARKUP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<[a-zA-Z/!][^<>]*>|&#?[a-zA-Z0-9]+;").expect("markup pattern is valid")
});

/// Coarse sentiment bucket derived from the numeric rating alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RatingTone {
    Positive,
    Neutral,
    Negative,
}

impl RatingTone {
    pub const ALL: [RatingTone; 3] = [Self::Positive, Self::Neutral, Self::Negative];

    /// `>= 4` positive, `[3, 4)` neutral, everything else negative.
    pub fn classify(rating: f64) -> Self {
        if rating >= 4.0 {
            Self::Positive
        } else if rating >= 3.0 {
            Self::Neutral
        } else {
            Self::Negative
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tone| tone.as_str() == label)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "Positive",
            Self::Neutral => "Neutral",
            Self::Negative => "Negative",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Self::Positive => 0,
            Self::Neutral => 1,
            Self::Negative => 2,
        }
    }
}

impl fmt::Display for RatingTone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lowercase, drop URLs and markup, keep `[a-z0-9 ]`, collapse whitespace.
///
/// Text only goes through the HTML parser when it holds a complete tag or a
/// character reference, so an unterminated `<` (`a<b c`) stays text.
pub fn clean_text(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let without_urls = URL.replace_all(&lowered, "");
    let text = if MARKUP.is_match(&without_urls) {
        Html::parse_fragment(&without_urls)
            .root_element()
            .text()
            .collect::<String>()
    } else {
        without_urls.into_owned()
    };

    let kept: String = text
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ')
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Display name for a product: a brand label when one matches, otherwise
/// the first two words of the raw name.
pub fn shorten_name(name: &str) -> String {
    let lowered = name.to_lowercase();
    if let Some((_, label)) = BRAND_OVERRIDES
        .iter()
        .find(|(needle, _)| lowered.contains(needle))
    {
        return label.to_string();
    }
    name.split_whitespace().take(2).collect::<Vec<_>>().join(" ")
}

fn keep_chars(raw: &str, allow_dot: bool) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_digit() || (allow_dot && *c == '.'))
        .collect()
}

/// Digits and dots only; None when nothing numeric survives.
pub fn clean_rating(raw: &str) -> Option<f64> {
    let kept = keep_chars(raw, true);
    if kept.is_empty() {
        return None;
    }
    kept.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Digits only; missing or empty counts are zero.
///
/// A digit run too large for `i64` saturates at `i64::MAX`.
pub fn clean_count(raw: Option<&str>) -> i64 {
    let kept = keep_chars(raw.unwrap_or("0"), false);
    if kept.is_empty() {
        return 0;
    }
    kept.parse::<i64>().unwrap_or_else(|_| {
        debug!(digits = kept.len(), "rating count overflows i64, saturating");
        i64::MAX
    })
}

/// Digits and dots only; missing, empty or unparseable amounts are zero.
pub fn clean_amount(raw: Option<&str>) -> f64 {
    let kept = keep_chars(raw.unwrap_or("0"), true);
    kept.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// The part of a `A|B|C` category path before the first pipe.
pub fn main_category(raw: Option<&str>) -> String {
    match raw {
        Some(category) => category.split('|').next().unwrap_or(category).to_string(),
        None => UNCATEGORIZED.to_string(),
    }
}

/// Replace unparseable ratings with the mean of the parseable ones.
///
/// The mean is taken before any filling. A column with no parseable rating
/// at all fills with zero. Returns the filled values, the fill value and how
/// many cells were filled.
pub fn fill_ratings(parsed: &[Option<f64>]) -> (Vec<f64>, f64, usize) {
    let (sum, n) = parsed
        .iter()
        .flatten()
        .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    let mean = if n == 0 { 0.0 } else { sum / n as f64 };
    let values = parsed.iter().map(|v| v.unwrap_or(mean)).collect();
    (values, mean, parsed.len() - n)
}

/// Read any column as optional strings, casting non-text columns first.
fn string_values(df: &DataFrame, name: &str) -> Result<Option<Vec<Option<String>>>> {
    let Ok(column) = df.column(name) else {
        return Ok(None);
    };
    let series = column.as_materialized_series().cast(&DataType::String)?;
    let values = series
        .str()?
        .iter()
        .map(|value| value.map(str::to_string))
        .collect();
    Ok(Some(values))
}

/// Run every cleaning step and attach the derived columns.
///
/// Cleaning an already cleaned table produces the same table.
pub fn clean(table: ReviewTable) -> Result<ReviewTable> {
    let mut df = table.into_frame();
    let height = df.height();

    if let Some(reviews) = string_values(&df, REVIEW_CONTENT)? {
        let cleaned: Vec<String> = reviews
            .iter()
            .map(|review| review.as_deref().map(clean_text).unwrap_or_default())
            .collect();
        let counts: Vec<i64> = cleaned.iter().map(|c| word_count(c) as i64).collect();
        df.with_column(Series::new(CLEAN_REVIEW.into(), cleaned))?;
        df.with_column(Series::new(WORD_COUNT.into(), counts))?;
    }

    if let Some(products) = string_values(&df, PRODUCT_NAME)? {
        let short: Vec<String> = products
            .iter()
            .map(|name| shorten_name(name.as_deref().unwrap_or_default()))
            .collect();
        df.with_column(Series::new(PRODUCT_NAME.into(), short))?;
    }

    let ratings = match string_values(&df, RATING)? {
        Some(raw) => {
            let parsed: Vec<Option<f64>> = raw
                .iter()
                .map(|value| value.as_deref().and_then(clean_rating))
                .collect();
            let (values, mean, filled) = fill_ratings(&parsed);
            if filled > 0 {
                info!(filled, mean, "filled missing ratings with column mean");
            }
            values
        }
        None => vec![0.0; height],
    };
    let tones: Vec<&str> = ratings
        .iter()
        .map(|r| RatingTone::classify(*r).as_str())
        .collect();
    df.with_column(Series::new(RATING.into(), ratings))?;
    df.with_column(Series::new(RATING_TONE.into(), tones))?;

    if let Some(raw) = string_values(&df, RATING_COUNT)? {
        let counts: Vec<i64> = raw.iter().map(|v| clean_count(v.as_deref())).collect();
        df.with_column(Series::new(RATING_COUNT.into(), counts))?;
    }

    for &name in PRICE_COLUMNS {
        if let Some(raw) = string_values(&df, name)? {
            let amounts: Vec<f64> = raw.iter().map(|v| clean_amount(v.as_deref())).collect();
            df.with_column(Series::new(name.into(), amounts))?;
        }
    }

    if let Some(raw) = string_values(&df, CATEGORY)? {
        let main: Vec<String> = raw.iter().map(|v| main_category(v.as_deref())).collect();
        df.with_column(Series::new(MAIN_CATEGORY.into(), main))?;
    }

    debug!(rows = height, columns = df.width(), "cleaned table");
    Ok(ReviewTable::new(df, Stage::Cleaned))
}
