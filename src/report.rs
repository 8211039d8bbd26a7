//! One analysis run: every insight for a selection, rendered as text or JSON.

use color_eyre::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write;
use tracing::info;

use crate::cleaning::RatingTone;
use crate::cli::OutputFormat;
use crate::config::AnalysisConfig;
use crate::statistics::{
    self, DiscountSlice, EmojiCount, Insight, PricePoint, SummaryStats, TimelinePoint,
    ToneMatrix, TopProducts, WordCount,
};
use crate::table::{ReviewTable, Selection};

/// Price points listed in the text rendering; JSON carries all of them.
const PRICE_PREVIEW: usize = 10;

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// Label of the selection the per-user sections were computed for.
    pub selection: String,
    pub summary: Insight<SummaryStats>,
    pub emoji_frequency: Insight<Vec<EmojiCount>>,
    pub rating_tone: Insight<ToneMatrix>,
    pub timeline: Insight<Vec<TimelinePoint>>,
    pub word_frequency: Insight<Vec<WordCount>>,
    /// Product-level sections; only present for the overall selection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub products: Option<ProductSections>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductSections {
    pub top_products: Insight<TopProducts>,
    pub category_rating: Insight<BTreeMap<String, f64>>,
    pub price_comparison: Insight<Vec<PricePoint>>,
    pub discount_share: Insight<Vec<DiscountSlice>>,
}

impl Report {
    pub fn build(table: &ReviewTable, selection: &Selection, config: &AnalysisConfig) -> Result<Self> {
        let label = match selection {
            Selection::Overall => config.overall_label.clone(),
            Selection::User(user) => user.clone(),
        };
        info!(selection = %label, rows = table.height(), "building report");

        let products = selection.is_overall().then(|| ProductSections {
            top_products: statistics::top_products(table, config.top_products),
            category_rating: statistics::category_rating(table),
            price_comparison: statistics::price_comparison(table),
            discount_share: statistics::discount_share(table, config.discount_slices),
        });

        Ok(Self {
            selection: label,
            summary: statistics::summary_stats(table, selection)?,
            emoji_frequency: statistics::emoji_frequency(table, selection)?,
            rating_tone: statistics::rating_tone_matrix(table, selection, config.tone_product_cap)?,
            timeline: statistics::pseudo_timeline(table, selection)?,
            word_frequency: statistics::word_frequency(table, selection, config.top_words)?,
            products,
        })
    }

    pub fn render(&self, format: OutputFormat, pretty_json: bool) -> Result<String> {
        match format {
            OutputFormat::Text => Ok(self.to_text()),
            OutputFormat::Json if pretty_json => Ok(serde_json::to_string_pretty(self)?),
            OutputFormat::Json => Ok(serde_json::to_string(self)?),
        }
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        // fmt::Write into a String cannot fail
        let _ = self.write_text(&mut out);
        out
    }

    fn write_text(&self, out: &mut String) -> std::fmt::Result {
        writeln!(out, "Review analysis: {}", self.selection)?;

        section(out, "Summary", &self.summary, |out, s| {
            writeln!(out, "  Reviews:          {}", s.review_count)?;
            writeln!(out, "  Words:            {}", s.total_word_count)?;
            writeln!(out, "  Mean rating:      {:.2}", s.mean_rating)?;
            writeln!(out, "  Distinct products: {}", s.distinct_product_count)
        })?;

        if let Some(products) = &self.products {
            section(out, "Top products", &products.top_products, |out, top| {
                for (count, share) in top.top_counts.iter().zip(&top.percentages) {
                    writeln!(
                        out,
                        "  {:<32} {:>6} {:>7.2}%",
                        count.product_name, count.count, share.percentage
                    )?;
                }
                Ok(())
            })?;
            section(out, "Mean rating by category", &products.category_rating, |out, categories| {
                for (category, rating) in categories {
                    writeln!(out, "  {:<32} {:>6.2}", category, rating)?;
                }
                Ok(())
            })?;
        }

        section(out, "Emoji", &self.emoji_frequency, |out, emojis| {
            for e in emojis {
                writeln!(out, "  {}  {}", e.emoji, e.count)?;
            }
            Ok(())
        })?;

        section(out, "Rating tone by product", &self.rating_tone, |out, matrix| {
            write!(out, "  {:<32}", "")?;
            for tone in RatingTone::ALL {
                write!(out, " {:>8}", tone.as_str())?;
            }
            writeln!(out)?;
            for (product, row) in matrix.products.iter().zip(&matrix.counts) {
                write!(out, "  {:<32}", product)?;
                for count in row {
                    write!(out, " {:>8}", count)?;
                }
                writeln!(out)?;
            }
            Ok(())
        })?;

        section(out, "Rating / rating count groups", &self.timeline, |out, points| {
            for p in points {
                writeln!(out, "  {:<20} {:>6}", p.label, p.count)?;
            }
            Ok(())
        })?;

        section(out, "Frequent words", &self.word_frequency, |out, words| {
            for w in words {
                writeln!(out, "  {:<20} {:>6}", w.word, w.count)?;
            }
            Ok(())
        })?;

        if let Some(products) = &self.products {
            section(out, "Discounted vs actual price", &products.price_comparison, |out, points| {
                for p in points.iter().take(PRICE_PREVIEW) {
                    writeln!(out, "  {:>10.2} {:>10.2}", p.discounted_price, p.actual_price)?;
                }
                if points.len() > PRICE_PREVIEW {
                    writeln!(out, "  ... {} more", points.len() - PRICE_PREVIEW)?;
                }
                Ok(())
            })?;
            section(out, "Discount by category", &products.discount_share, |out, slices| {
                for s in slices {
                    writeln!(out, "  {:<32} {:>6.1}%", s.category, s.discount_percentage)?;
                }
                Ok(())
            })?;
        }

        Ok(())
    }
}

fn section<T>(
    out: &mut String,
    title: &str,
    insight: &Insight<T>,
    body: impl FnOnce(&mut String, &T) -> std::fmt::Result,
) -> std::fmt::Result {
    writeln!(out)?;
    writeln!(out, "{}", title)?;
    match insight {
        Insight::Available(data) => body(out, data),
        Insight::NoData => writeln!(out, "  (not enough data)"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Stage;
    use polars::prelude::*;

    fn table() -> ReviewTable {
        let df = df!(
            "user_name" => ["ann", "bob", "ann"],
            "product_name" => ["Wayona Cable", "boAt Cable", "Wayona Cable"],
            "review_content" => ["great 👍", "bad", "fine"],
            "clean_review" => ["great", "bad", "fine"],
            "rating" => [5.0, 2.0, 4.0],
            "rating_count" => [10i64, 3, 10],
            "rating_tone" => ["Positive", "Negative", "Positive"],
            "main_category" => ["Computers", "Electronics", "Computers"],
            "discounted_price" => [100.0, 50.0, 100.0],
            "actual_price" => [200.0, 80.0, 200.0],
            "discount_percentage" => [50.0, 38.0, 50.0]
        )
        .unwrap();
        ReviewTable::new(df, Stage::Cleaned)
    }

    #[test]
    fn overall_report_has_product_sections() {
        let report = Report::build(&table(), &Selection::Overall, &AnalysisConfig::default()).unwrap();
        assert_eq!(report.selection, "Overall");
        assert!(report.products.is_some());
        assert!(report.summary.is_available());
    }

    #[test]
    fn user_report_skips_product_sections() {
        let selection = Selection::User("ann".to_string());
        let report = Report::build(&table(), &selection, &AnalysisConfig::default()).unwrap();
        assert_eq!(report.selection, "ann");
        assert!(report.products.is_none());
        assert_eq!(report.summary.data().unwrap().review_count, 2);

        let json: serde_json::Value =
            serde_json::from_str(&report.render(OutputFormat::Json, false).unwrap()).unwrap();
        assert!(json.get("products").is_none());
        assert_eq!(json["summary"]["status"], "available");
    }

    #[test]
    fn text_marks_missing_sections() {
        let df = df!("user_name" => ["ann"], "rating" => [4.0]).unwrap();
        let table = ReviewTable::new(df, Stage::Cleaned);
        let report = Report::build(&table, &Selection::Overall, &AnalysisConfig::default()).unwrap();
        let text = report.to_text();
        assert!(text.contains("Emoji\n  (not enough data)"));
        assert!(text.contains("Reviews:          1"));
    }
}
