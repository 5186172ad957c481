//! One-line, user-facing messages for the errors the binary can surface.

use std::io;

use color_eyre::eyre::Report;
use polars::prelude::PolarsError;

#[cfg(feature = "http")]
use crate::muse::MuseError;

pub fn user_message_from_polars(err: &PolarsError) -> String {
    use polars::prelude::PolarsError as PE;

    match err {
        PE::ColumnNotFound(msg) => format!("Column not found: {}", msg),
        PE::IO { error, msg } => {
            user_message_from_io(error.as_ref(), msg.as_ref().map(|m| m.as_ref()))
        }
        PE::NoData(msg) => format!("The source has no data: {}", msg),
        PE::ComputeError(msg) => first_line(msg).to_string(),
        PE::SchemaMismatch(msg) | PE::ShapeMismatch(msg) => {
            format!("The source is not a consistent table: {}", msg)
        }
        PE::Context { error, msg } => format!("{}: {}", msg, user_message_from_polars(error)),
        _ => first_line(&err.to_string()).to_string(),
    }
}

pub fn user_message_from_io(err: &io::Error, context: Option<&str>) -> String {
    use std::io::ErrorKind;

    let base = match err.kind() {
        ErrorKind::NotFound => "File not found.".to_string(),
        ErrorKind::PermissionDenied => "Permission denied. Check read access.".to_string(),
        ErrorKind::InvalidData | ErrorKind::InvalidInput => {
            "The data is invalid or corrupted. Check the delimiter and compression.".to_string()
        }
        ErrorKind::UnexpectedEof => "Unexpected end of file.".to_string(),
        ErrorKind::TimedOut => "The operation timed out.".to_string(),
        ErrorKind::ConnectionRefused | ErrorKind::ConnectionReset => {
            "The connection failed.".to_string()
        }
        _ => err.to_string(),
    };
    match context.filter(|c| !c.is_empty()) {
        Some(ctx) => format!("{} {}", base, ctx),
        None => base,
    }
}

#[cfg(feature = "http")]
pub fn user_message_from_muse(err: &MuseError) -> String {
    match err {
        MuseError::MissingApiKey(var) => format!(
            "No API key found. Set the {} environment variable and try again.",
            var
        ),
        MuseError::Status { code: 401 | 403, .. } => {
            "The content service rejected the API key.".to_string()
        }
        MuseError::Status { code: 429, .. } => {
            "The content service is rate limiting requests. Try again later.".to_string()
        }
        other => other.to_string(),
    }
}

/// Walk the report chain for a known error type; fall back to the top message.
pub fn user_message_from_report(report: &Report) -> String {
    let top = first_line(&report.to_string()).to_string();
    for (depth, cause) in report.chain().enumerate() {
        let detail = if let Some(pe) = cause.downcast_ref::<PolarsError>() {
            user_message_from_polars(pe)
        } else if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            user_message_from_io(io_err, None)
        } else if let Some(msg) = muse_message(cause) {
            msg
        } else {
            continue;
        };
        return if depth == 0 {
            detail
        } else {
            format!("{}: {}", top, detail)
        };
    }
    top
}

#[cfg(feature = "http")]
fn muse_message(cause: &(dyn std::error::Error + 'static)) -> Option<String> {
    cause.downcast_ref::<MuseError>().map(user_message_from_muse)
}

#[cfg(not(feature = "http"))]
fn muse_message(_cause: &(dyn std::error::Error + 'static)) -> Option<String> {
    None
}

fn first_line(msg: &str) -> &str {
    msg.lines().next().map(str::trim).unwrap_or("An error occurred")
}
