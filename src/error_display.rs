//! User-facing error message formatting.
//!
//! Uses typed error matching (PolarsError variants, io::ErrorKind) rather than
//! string parsing to produce short, actionable load-error messages.

use polars::prelude::PolarsError;
use std::io;
use std::path::Path;

/// Format a PolarsError as a user-facing message by matching on its variant.
pub fn user_message_from_polars(err: &PolarsError) -> String {
    use polars::prelude::PolarsError as PE;

    match err {
        PE::ColumnNotFound(msg) => format!("Column not found: {}", msg),
        PE::Duplicate(msg) => format!(
            "Duplicate column name: {}. Each header must be unique.",
            msg
        ),
        PE::IO { error, msg } => {
            user_message_from_io(error.as_ref(), msg.as_ref().map(|m| m.as_ref()))
        }
        PE::NoData(msg) => format!("No data: {}", msg),
        PE::SchemaMismatch(msg) => format!("Schema mismatch: {}", msg),
        PE::ShapeMismatch(msg) => format!("Row shape mismatch: {}", msg),
        PE::ComputeError(msg) => format!("Not a readable delimited file: {}", msg),
        PE::OutOfBounds(msg) => format!("Index or row out of bounds: {}", msg),
        PE::Context { error, msg } => {
            let inner = user_message_from_polars(error);
            format!("{}: {}", msg, inner)
        }
        #[allow(unreachable_patterns)]
        _ => err.to_string(),
    }
}

/// Format an io::Error as a user-facing message by matching on ErrorKind.
pub fn user_message_from_io(err: &io::Error, context: Option<&str>) -> String {
    use std::io::ErrorKind;

    let base: String = match err.kind() {
        ErrorKind::NotFound => "File or directory not found.".to_string(),
        ErrorKind::PermissionDenied => "Permission denied. Check read access.".to_string(),
        ErrorKind::InvalidData | ErrorKind::InvalidInput => {
            "Invalid or corrupted data (is the compression format right?).".to_string()
        }
        ErrorKind::UnexpectedEof => "Unexpected end of file.".to_string(),
        ErrorKind::OutOfMemory => "Out of memory.".to_string(),
        ErrorKind::Other => {
            let msg = err.to_string();
            if msg.contains("Is a directory") {
                return "Path is a directory, not a file.".to_string();
            }
            return if context.is_some() {
                format!("I/O error: {}", msg)
            } else {
                msg
            };
        }
        _ => err.to_string(),
    };

    match context {
        Some(ctx) if !ctx.is_empty() => format!("{} {}", base, ctx),
        _ => base,
    }
}

/// Format a color_eyre Report by downcasting to known error types.
/// Walks the cause chain to find PolarsError or io::Error.
pub fn user_message_from_report(report: &color_eyre::eyre::Report, path: Option<&Path>) -> String {
    let with_path = |msg: String| match path {
        Some(p) => format!("Failed to load {}: {}", p.display(), msg),
        None => msg,
    };

    for cause in report.chain() {
        if let Some(pe) = cause.downcast_ref::<PolarsError>() {
            return with_path(user_message_from_polars(pe));
        }
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            return with_path(user_message_from_io(io_err, None));
        }
    }

    // Fallback: use the innermost cause, first line only
    let root = report.root_cause().to_string();
    let first_line = root.lines().next().unwrap_or("An error occurred");
    with_path(first_line.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use color_eyre::eyre::{eyre, WrapErr};

    #[test]
    fn test_user_message_from_io_not_found() {
        let err = io::Error::new(io::ErrorKind::NotFound, "No such file");
        let msg = user_message_from_io(&err, None);
        assert!(
            msg.contains("not found"),
            "expected 'not found', got: {}",
            msg
        );
    }

    #[test]
    fn test_user_message_from_io_permission_denied() {
        let err = io::Error::new(io::ErrorKind::PermissionDenied, "Permission denied");
        let msg = user_message_from_io(&err, None);
        assert!(
            msg.to_lowercase().contains("permission"),
            "expected 'permission', got: {}",
            msg
        );
    }

    #[test]
    fn test_user_message_from_polars_duplicate() {
        let err = PolarsError::Duplicate("rating".into());
        let msg = user_message_from_polars(&err);
        assert!(msg.contains("rating"), "expected column name, got: {}", msg);
        assert!(msg.contains("unique"), "expected hint, got: {}", msg);
    }

    #[test]
    fn test_report_walks_context_to_io_error() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "No such file");
        let report = Err::<(), _>(io_err)
            .wrap_err("Failed to read reviews.csv")
            .unwrap_err();
        let msg = user_message_from_report(&report, Some(Path::new("reviews.csv")));
        assert_eq!(msg, "Failed to load reviews.csv: File or directory not found.");
    }

    #[test]
    fn test_report_fallback_uses_root_cause() {
        let report = eyre!("File is empty").wrap_err("Failed to parse reviews.csv");
        let msg = user_message_from_report(&report, None);
        assert_eq!(msg, "File is empty");
    }
}
