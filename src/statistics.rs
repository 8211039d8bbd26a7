//! Read-only aggregations over a cleaned [`ReviewTable`].
//!
//! Each function returns an [`Insight`]: either the computed value or an
//! explicit `NoData` when a required column is absent or nothing was counted,
//! so a presentation layer can show a placeholder instead of an empty chart.

use color_eyre::Result;
use polars::prelude::ChunkAgg;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::hash::Hash;
use tracing::debug;

use crate::cleaning::{RatingTone, UNCATEGORIZED};
use crate::emoji;
use crate::schema::{
    ACTUAL_PRICE, CLEAN_REVIEW, DISCOUNTED_PRICE, DISCOUNT_PERCENTAGE, MAIN_CATEGORY,
    PRODUCT_NAME, RATING, RATING_COUNT, RATING_TONE, REVIEW_CONTENT, USER_NAME,
};
use crate::table::{ReviewTable, Selection};

/// Products shown in the busiest-products ranking.
pub const TOP_PRODUCTS: usize = 5;

/// Products kept in the tone matrix when there are more distinct products.
pub const TONE_PRODUCT_CAP: usize = 40;

/// An aggregation result, or the explicit absence of one.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum Insight<T> {
    Available(T),
    NoData,
}

impl<T> Insight<T> {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Available(data) => Some(data),
            Self::NoData => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Insight<U> {
        match self {
            Self::Available(data) => Insight::Available(f(data)),
            Self::NoData => Insight::NoData,
        }
    }
}

impl<T: Default> Insight<T> {
    /// The value, with `NoData` collapsed to the empty value.
    pub fn into_data(self) -> T {
        match self {
            Self::Available(data) => data,
            Self::NoData => T::default(),
        }
    }
}

impl<T> Insight<Vec<T>> {
    fn from_vec(values: Vec<T>) -> Self {
        if values.is_empty() {
            Self::NoData
        } else {
            Self::Available(values)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SummaryStats {
    pub review_count: usize,
    pub total_word_count: usize,
    pub mean_rating: f64,
    pub distinct_product_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductCount {
    pub product_name: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductShare {
    pub product_name: String,
    pub percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TopProducts {
    pub top_counts: Vec<ProductCount>,
    /// Every product's share of all rows, whole percent, busiest first
    pub percentages: Vec<ProductShare>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmojiCount {
    pub emoji: String,
    pub count: usize,
}

/// Row counts per product and rating tone.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ToneMatrix {
    pub products: Vec<String>,
    /// One row per product, columns in [`RatingTone::ALL`] order
    pub counts: Vec<[usize; 3]>,
}

impl ToneMatrix {
    pub fn get(&self, product: &str, tone: RatingTone) -> Option<usize> {
        let row = self.products.iter().position(|p| p == product)?;
        Some(self.counts[row][tone.index()])
    }

    pub fn row_total(&self, product: &str) -> Option<usize> {
        let row = self.products.iter().position(|p| p == product)?;
        Some(self.counts[row].iter().sum())
    }
}

/// One bar of the rating/rating-count pseudo-timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelinePoint {
    pub label: String,
    pub rating: f64,
    pub rating_count: i64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WordCount {
    pub word: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricePoint {
    pub discounted_price: f64,
    pub actual_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscountSlice {
    pub category: String,
    pub discount_percentage: f64,
}

/// Count occurrences, busiest first; ties keep first-seen order.
fn ranked_counts<K, I>(items: I) -> Vec<(K, usize)>
where
    K: Eq + Hash + Clone,
    I: IntoIterator<Item = K>,
{
    let mut positions: HashMap<K, usize> = HashMap::new();
    let mut counts: Vec<(K, usize)> = Vec::new();
    for item in items {
        match positions.get(&item) {
            Some(&pos) => counts[pos].1 += 1,
            None => {
                positions.insert(item.clone(), counts.len());
                counts.push((item, 1));
            }
        }
    }
    // sort_by is stable, so equal counts stay in first-seen order
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Render a rating with at least one decimal: `4.0`, `4.5`.
pub fn format_rating(rating: f64) -> String {
    if rating.fract() == 0.0 && rating.abs() < 1e16 {
        format!("{:.1}", rating)
    } else {
        format!("{}", rating)
    }
}

/// Review count, word total, mean rating and distinct products for a selection.
///
/// Words are counted on the raw review text; a table without review text
/// contributes zero words.
pub fn summary_stats(table: &ReviewTable, selection: &Selection) -> Result<Insight<SummaryStats>> {
    let subset = table.subset(selection)?;
    if subset.height() == 0 {
        debug!("summary: empty table");
        return Ok(Insight::NoData);
    }

    let total_word_count: usize = subset
        .text(REVIEW_CONTENT)
        .map(|reviews| reviews.iter().flatten().map(|r| r.split_whitespace().count()).sum())
        .unwrap_or(0);

    let mean_rating = subset
        .floats(RATING)
        .and_then(|ratings| ratings.mean())
        .map(round2)
        .unwrap_or(0.0);

    let distinct_product_count = subset
        .text(PRODUCT_NAME)
        .map(|products| products.iter().flatten().collect::<HashSet<_>>().len())
        .unwrap_or(0);

    Ok(Insight::Available(SummaryStats {
        review_count: subset.height(),
        total_word_count,
        mean_rating,
        distinct_product_count,
    }))
}

/// The `limit` most reviewed products plus every product's share of rows.
pub fn top_products(table: &ReviewTable, limit: usize) -> Insight<TopProducts> {
    let Some(products) = table.text(PRODUCT_NAME) else {
        debug!("top products: no product_name column");
        return Insight::NoData;
    };
    let total = table.height();
    let ranked = ranked_counts(products.iter().flatten());
    if ranked.is_empty() {
        return Insight::NoData;
    }

    let percentages = ranked
        .iter()
        .map(|(name, count)| ProductShare {
            product_name: name.to_string(),
            percentage: (100.0 * *count as f64 / total as f64).round_ties_even(),
        })
        .collect();
    let top_counts = ranked
        .into_iter()
        .take(limit)
        .map(|(name, count)| ProductCount {
            product_name: name.to_string(),
            count,
        })
        .collect();

    Insight::Available(TopProducts {
        top_counts,
        percentages,
    })
}

/// Mean rating per main category (two decimals), ordered by category name.
///
/// Pass a [`ReviewTable::subset`] to scope it to one user.
pub fn category_rating(table: &ReviewTable) -> Insight<BTreeMap<String, f64>> {
    let (Some(categories), Some(ratings)) = (table.text(MAIN_CATEGORY), table.floats(RATING))
    else {
        debug!("category rating: no main_category column");
        return Insight::NoData;
    };

    let mut sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for (category, rating) in categories.iter().zip(ratings.iter()) {
        let Some(rating) = rating else { continue };
        let entry = sums
            .entry(category.unwrap_or(UNCATEGORIZED).to_string())
            .or_insert((0.0, 0));
        entry.0 += rating;
        entry.1 += 1;
    }

    if sums.is_empty() {
        return Insight::NoData;
    }
    Insight::Available(
        sums.into_iter()
            .map(|(category, (sum, n))| (category, round2(sum / n as f64)))
            .collect(),
    )
}

/// Emoji found in the raw review text, most frequent first.
pub fn emoji_frequency(table: &ReviewTable, selection: &Selection) -> Result<Insight<Vec<EmojiCount>>> {
    let subset = table.subset(selection)?;
    let Some(reviews) = subset.text(REVIEW_CONTENT) else {
        debug!("emoji frequency: no review_content column");
        return Ok(Insight::NoData);
    };

    let ranked = ranked_counts(reviews.iter().flatten().flat_map(emoji::emojis));
    Ok(Insight::from_vec(
        ranked
            .into_iter()
            .map(|(c, count)| EmojiCount {
                emoji: c.to_string(),
                count,
            })
            .collect(),
    ))
}

fn tone_column(table: &ReviewTable) -> Option<Vec<Option<RatingTone>>> {
    if let Some(labels) = table.text(RATING_TONE) {
        return Some(
            labels
                .iter()
                .map(|label| label.and_then(RatingTone::from_label))
                .collect(),
        );
    }
    table
        .floats(RATING)
        .map(|ratings| ratings.iter().map(|r| r.map(RatingTone::classify)).collect())
}

/// Rows per (product, tone).
///
/// With more than `cap` distinct products only the `cap` most reviewed are
/// kept, busiest first; otherwise products are listed by name.
pub fn rating_tone_matrix(
    table: &ReviewTable,
    selection: &Selection,
    cap: usize,
) -> Result<Insight<ToneMatrix>> {
    let subset = table.subset(selection)?;
    let (Some(products), Some(tones)) = (subset.text(PRODUCT_NAME), tone_column(&subset)) else {
        debug!("tone matrix: missing product_name or rating");
        return Ok(Insight::NoData);
    };

    let ranked = ranked_counts(products.iter().flatten());
    let rows: Vec<&str> = if ranked.len() > cap {
        ranked.iter().take(cap).map(|(name, _)| *name).collect()
    } else {
        let mut names: Vec<&str> = ranked.iter().map(|(name, _)| *name).collect();
        names.sort_unstable();
        names
    };
    if rows.is_empty() {
        return Ok(Insight::NoData);
    }

    let index: HashMap<&str, usize> = rows.iter().enumerate().map(|(i, p)| (*p, i)).collect();
    let mut counts = vec![[0usize; 3]; rows.len()];
    for (product, tone) in products.iter().zip(tones) {
        if let (Some(row), Some(tone)) = (product.and_then(|p| index.get(p)), tone) {
            counts[*row][tone.index()] += 1;
        }
    }

    Ok(Insight::Available(ToneMatrix {
        products: rows.into_iter().map(str::to_string).collect(),
        counts,
    }))
}

/// Rows grouped by `(rating, rating_count)`, labelled `"{rating}-{rating_count}"`,
/// largest group first. Not a time series: the data carries no timestamps.
pub fn pseudo_timeline(table: &ReviewTable, selection: &Selection) -> Result<Insight<Vec<TimelinePoint>>> {
    let subset = table.subset(selection)?;
    let (Some(ratings), Some(rating_counts)) = (subset.floats(RATING), subset.integers(RATING_COUNT))
    else {
        debug!("timeline: missing rating or rating_count");
        return Ok(Insight::NoData);
    };

    let pairs = ratings
        .iter()
        .zip(rating_counts.iter())
        .filter_map(|(r, n)| Some((r?.to_bits(), n?)));
    let points = ranked_counts(pairs)
        .into_iter()
        .map(|((bits, rating_count), count)| {
            let rating = f64::from_bits(bits);
            TimelinePoint {
                label: format!("{}-{}", format_rating(rating), rating_count),
                rating,
                rating_count,
                count,
            }
        })
        .collect();
    Ok(Insight::from_vec(points))
}

/// Reviewer names for a selection list: overall label first, then the
/// distinct names sorted, without blank or "nan"/"none" placeholders.
pub fn user_options(table: &ReviewTable, overall_label: &str) -> Vec<String> {
    let mut users: Vec<String> = table
        .text(USER_NAME)
        .map(|names| {
            names
                .iter()
                .flatten()
                .filter(|name| {
                    !name.is_empty()
                        && !name.eq_ignore_ascii_case("nan")
                        && !name.eq_ignore_ascii_case("none")
                })
                .collect::<HashSet<_>>()
                .into_iter()
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    users.sort();
    users.insert(0, overall_label.to_string());
    users
}

/// Most frequent words of the cleaned review text.
pub fn word_frequency(
    table: &ReviewTable,
    selection: &Selection,
    limit: usize,
) -> Result<Insight<Vec<WordCount>>> {
    let subset = table.subset(selection)?;
    let Some(reviews) = subset.text(CLEAN_REVIEW) else {
        debug!("word frequency: no clean_review column");
        return Ok(Insight::NoData);
    };

    let ranked = ranked_counts(reviews.iter().flatten().flat_map(str::split_whitespace));
    Ok(Insight::from_vec(
        ranked
            .into_iter()
            .take(limit)
            .map(|(word, count)| WordCount {
                word: word.to_string(),
                count,
            })
            .collect(),
    ))
}

/// `(discounted_price, actual_price)` per row, for a scatter plot.
pub fn price_comparison(table: &ReviewTable) -> Insight<Vec<PricePoint>> {
    let (Some(discounted), Some(actual)) = (table.floats(DISCOUNTED_PRICE), table.floats(ACTUAL_PRICE))
    else {
        return Insight::NoData;
    };
    Insight::from_vec(
        discounted
            .iter()
            .zip(actual.iter())
            .filter_map(|(d, a)| {
                Some(PricePoint {
                    discounted_price: d?,
                    actual_price: a?,
                })
            })
            .collect(),
    )
}

/// The first `slices` discount percentages, labelled with the sorted
/// distinct main categories (as many as both lists allow).
pub fn discount_share(table: &ReviewTable, slices: usize) -> Insight<Vec<DiscountSlice>> {
    let Some(discounts) = table.floats(DISCOUNT_PERCENTAGE) else {
        return Insight::NoData;
    };
    let mut labels: Vec<&str> = match table.text(MAIN_CATEGORY) {
        Some(categories) => categories
            .iter()
            .flatten()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect(),
        None => vec![UNCATEGORIZED],
    };
    labels.sort_unstable();

    Insight::from_vec(
        discounts
            .iter()
            .take(slices)
            .zip(labels)
            .map(|(discount, category)| DiscountSlice {
                category: category.to_string(),
                discount_percentage: discount.unwrap_or(0.0),
            })
            .collect(),
    )
}
