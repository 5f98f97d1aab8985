use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use time::UtcDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

/// `yyyy-MM-ddTHH:mm:ssZ`, the format JW Library writes to `LastModified`.
const FORMAT: &[BorrowedFormatItem<'_>] = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]Z");

/// Format a modification timestamp.
pub fn format_timestamp(at: UtcDateTime) -> Result<String> {
    at.format(FORMAT).or_raise(|| ErrorKind::Timestamp)
}

/// The current time, formatted for `LastModified`.
pub(crate) fn now() -> Result<String> {
    format_timestamp(UtcDateTime::now())
}
