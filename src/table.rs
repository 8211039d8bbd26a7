//! The review table every pipeline stage passes along.

use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use tracing::{debug, warn};

use crate::schema::USER_NAME;

/// How far a table has travelled through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Normalized,
    Cleaned,
}

/// Which reviewer an aggregation is scoped to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selection {
    #[default]
    Overall,
    User(String),
}

impl Selection {
    /// Interpret a selection label; the overall label means no filter.
    pub fn from_label(label: &str, overall_label: &str) -> Self {
        if label == overall_label {
            Self::Overall
        } else {
            Self::User(label.to_string())
        }
    }

    pub fn is_overall(&self) -> bool {
        matches!(self, Self::Overall)
    }
}

/// One dataset's reviews, owned by a single analysis session.
///
/// Built by [`crate::schema::normalize`], completed by [`crate::cleaning::clean`]
/// and read-only afterwards.
#[derive(Debug, Clone)]
pub struct ReviewTable {
    df: DataFrame,
    stage: Stage,
}

impl ReviewTable {
    pub(crate) fn new(df: DataFrame, stage: Stage) -> Self {
        Self { df, stage }
    }

    pub fn frame(&self) -> &DataFrame {
        &self.df
    }

    pub fn into_frame(self) -> DataFrame {
        self.df
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.df.column(name).is_ok()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.df
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect()
    }

    /// A string column, or None when absent or not textual.
    pub fn text(&self, name: &str) -> Option<&StringChunked> {
        self.df.column(name).ok()?.as_materialized_series().str().ok()
    }

    /// A float column, or None when absent or not `Float64`.
    pub fn floats(&self, name: &str) -> Option<&Float64Chunked> {
        self.df.column(name).ok()?.as_materialized_series().f64().ok()
    }

    /// An integer column, or None when absent or not `Int64`.
    pub fn integers(&self, name: &str) -> Option<&Int64Chunked> {
        self.df.column(name).ok()?.as_materialized_series().i64().ok()
    }

    /// Rows belonging to the selected user.
    ///
    /// The overall selection returns the table unchanged. A user with no
    /// matching rows (or a table without user names) falls back to the
    /// whole table instead of producing an empty subset.
    pub fn subset(&self, selection: &Selection) -> Result<ReviewTable> {
        let Selection::User(user) = selection else {
            return Ok(self.clone());
        };
        let Some(users) = self.text(USER_NAME) else {
            warn!(user = %user, "no user_name column, using all rows");
            return Ok(self.clone());
        };

        let indices: Vec<IdxSize> = users
            .iter()
            .enumerate()
            .filter(|(_, name)| *name == Some(user.as_str()))
            .map(|(i, _)| i as IdxSize)
            .collect();

        if indices.is_empty() {
            warn!(user = %user, "no rows for user, using all rows");
            return Ok(self.clone());
        }

        debug!(user = %user, rows = indices.len(), "selected user rows");
        let idx = IdxCa::new("indices".into(), indices);
        Ok(Self::new(self.df.take(&idx)?, self.stage))
    }

    /// Write the table as CSV, header included.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut file = File::create(path)
            .wrap_err_with(|| format!("Failed to create {}", path.display()))?;
        let mut df = self.df.clone();
        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(&mut df)
            .wrap_err_with(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}
