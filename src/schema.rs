//! Schema normalization: map whatever column names an export uses onto the
//! canonical review schema, and fill the gaps the aggregations cannot live without.

use color_eyre::Result;
use polars::prelude::*;
use tracing::{debug, info};

use crate::table::{ReviewTable, Stage};

pub const USER_NAME: &str = "user_name";
pub const PRODUCT_NAME: &str = "product_name";
pub const REVIEW_CONTENT: &str = "review_content";
pub const RATING: &str = "rating";
pub const RATING_COUNT: &str = "rating_count";
pub const CATEGORY: &str = "category";
pub const DISCOUNTED_PRICE: &str = "discounted_price";
pub const ACTUAL_PRICE: &str = "actual_price";
pub const DISCOUNT_PERCENTAGE: &str = "discount_percentage";

// Derived by the cleaner
pub const CLEAN_REVIEW: &str = "clean_review";
pub const WORD_COUNT: &str = "word_count";
pub const MAIN_CATEGORY: &str = "main_category";
pub const RATING_TONE: &str = "rating_tone";

pub const DEFAULT_USER_NAME: &str = "Anonymous";
pub const DEFAULT_PRODUCT_NAME: &str = "Unknown Product";

/// Source names accepted for `user_name`, highest priority first.
pub const USER_CANDIDATES: &[&str] = &[
    "reviewer",
    "reviewer_name",
    "profile",
    "user",
    "customer_name",
    "name",
    "user_name",
];

/// Source names accepted for `review_content`, highest priority first.
pub const REVIEW_CANDIDATES: &[&str] = &[
    "review",
    "review_text",
    "content",
    "feedback",
    "comment",
    "review_content",
];

/// Source names accepted for `product_name`, highest priority first.
pub const PRODUCT_CANDIDATES: &[&str] = &[
    "title",
    "item",
    "product_title",
    "product",
    "product_name",
];

/// What happens to a canonical field no candidate column matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// Inject the column with every row set to this value
    Fill(&'static str),
    /// Leave the column out; consumers treat absence as "no text signal"
    Absent,
}

#[derive(Debug, Clone, Copy)]
pub struct CanonicalField {
    pub name: &'static str,
    pub candidates: &'static [&'static str],
    pub fallback: Fallback,
}

pub const CANONICAL_FIELDS: &[CanonicalField] = &[
    CanonicalField {
        name: USER_NAME,
        candidates: USER_CANDIDATES,
        fallback: Fallback::Fill(DEFAULT_USER_NAME),
    },
    CanonicalField {
        name: REVIEW_CONTENT,
        candidates: REVIEW_CANDIDATES,
        fallback: Fallback::Absent,
    },
    CanonicalField {
        name: PRODUCT_NAME,
        candidates: PRODUCT_CANDIDATES,
        fallback: Fallback::Fill(DEFAULT_PRODUCT_NAME),
    },
];

/// A planned rename of one source column onto a canonical name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rename {
    pub from: String,
    pub to: &'static str,
}

/// Decide which source column each canonical field comes from.
///
/// A field whose canonical name is already present is left alone, which makes
/// normalizing an already-normalized table a no-op. Otherwise the first
/// candidate present wins; a source column is never claimed twice.
pub fn plan_renames<S: AsRef<str>>(available: &[S]) -> Vec<Rename> {
    let has = |name: &str| available.iter().any(|c| c.as_ref() == name);
    let mut claimed: Vec<&str> = Vec::new();
    let mut renames = Vec::new();

    for field in CANONICAL_FIELDS {
        if has(field.name) {
            claimed.push(field.name);
            continue;
        }
        let found = field
            .candidates
            .iter()
            .copied()
            .find(|&candidate| has(candidate) && !claimed.contains(&candidate));
        if let Some(candidate) = found {
            claimed.push(candidate);
            renames.push(Rename {
                from: candidate.to_string(),
                to: field.name,
            });
        }
    }

    renames
}

/// Map a raw frame onto the canonical schema.
///
/// Never fails because a column is missing: user and product names get their
/// default values, `rating` becomes a column of zeros and `review_content` is
/// left out. Null user and product cells take the same defaults so every row
/// carries both names.
pub fn normalize(mut df: DataFrame) -> Result<ReviewTable> {
    let columns: Vec<String> = df
        .get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect();

    for rename in plan_renames(&columns) {
        debug!(from = %rename.from, to = rename.to, "renaming column");
        df.rename(&rename.from, rename.to.into())?;
    }

    let height = df.height();
    for field in CANONICAL_FIELDS {
        let Fallback::Fill(default) = field.fallback else {
            continue;
        };
        if df.column(field.name).is_err() {
            info!(column = field.name, default, "column not found, filling default");
            df.with_column(Series::new(field.name.into(), vec![default; height]))?;
        } else if df.column(field.name)?.null_count() > 0 {
            let filled = fill_null_text(&df, field.name, default)?;
            df.with_column(filled)?;
        }
    }

    if df.column(RATING).is_err() {
        info!("rating column not found, filling zeros");
        df.with_column(Series::new(RATING.into(), vec![0.0f64; height]))?;
    }

    Ok(ReviewTable::new(df, Stage::Normalized))
}

fn fill_null_text(df: &DataFrame, name: &str, default: &str) -> Result<Series> {
    let series = df
        .column(name)?
        .as_materialized_series()
        .cast(&DataType::String)?;
    let values: Vec<&str> = series
        .str()?
        .iter()
        .map(|value| value.unwrap_or(default))
        .collect();
    debug!(column = name, nulls = series.null_count(), "filled null cells");
    Ok(Series::new(name.into(), values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::ChunkAgg;

    #[test]
    fn first_candidate_wins() {
        let renames = plan_renames(&["name", "reviewer_name", "body"]);
        assert_eq!(
            renames,
            vec![Rename {
                from: "reviewer_name".to_string(),
                to: USER_NAME
            }]
        );
    }

    #[test]
    fn canonical_name_already_present_is_kept() {
        let renames = plan_renames(&["user_name", "reviewer", "review_content", "title"]);
        assert_eq!(
            renames,
            vec![Rename {
                from: "title".to_string(),
                to: PRODUCT_NAME
            }]
        );
    }

    #[test]
    fn candidate_match_is_case_sensitive() {
        assert!(plan_renames(&["Reviewer", "Review", "Title"]).is_empty());
    }

    #[test]
    fn normalize_fills_defaults() {
        let df = df!("stars" => ["5", "4"]).unwrap();
        let table = normalize(df).unwrap();
        let users = table.text(USER_NAME).unwrap();
        let products = table.text(PRODUCT_NAME).unwrap();
        assert!(users.iter().all(|u| u == Some(DEFAULT_USER_NAME)));
        assert!(products.iter().all(|p| p == Some(DEFAULT_PRODUCT_NAME)));
        assert!(!table.has_column(REVIEW_CONTENT));
        assert_eq!(table.floats(RATING).unwrap().sum(), Some(0.0));
    }

    #[test]
    fn normalize_renames_instead_of_copying() {
        let df = df!(
            "reviewer" => ["a", "b"],
            "comment" => ["good", "bad"],
            "product" => ["x", "y"],
            "rating" => ["5", "1"]
        )
        .unwrap();
        let table = normalize(df).unwrap();
        let mut names = table.column_names();
        names.sort();
        assert_eq!(
            names,
            vec![PRODUCT_NAME, RATING, REVIEW_CONTENT, USER_NAME]
        );
    }

    #[test]
    fn null_names_take_defaults() {
        let df = df!(
            "user_name" => [Some("a"), None],
            "product_name" => [None, Some("Widget")]
        )
        .unwrap();
        let table = normalize(df).unwrap();
        let users: Vec<_> = table.text(USER_NAME).unwrap().iter().collect();
        let products: Vec<_> = table.text(PRODUCT_NAME).unwrap().iter().collect();
        assert_eq!(users, vec![Some("a"), Some(DEFAULT_USER_NAME)]);
        assert_eq!(products, vec![Some(DEFAULT_PRODUCT_NAME), Some("Widget")]);
    }
}
