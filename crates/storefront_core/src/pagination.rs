//! Offset pagination shared by every catalog listing.
//!
//! # Responsibility
//! - Normalize requested page/page size against configured defaults.
//! - Turn a page request into one `(offset, limit)` fetch and a result envelope.
//!
//! # Invariants
//! - After normalization `page >= 1` and `page_size >= 1`.
//! - `total_pages == ceil(total_count / page_size)`, computed with integer ops.
//! - The fetch closure runs exactly once and its error is returned unchanged.

use log::debug;
use serde::{Deserialize, Serialize};

/// Fallback values substituted for non-positive page inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageDefaults {
    pub page: i32,
    pub page_size: i32,
}

impl Default for PageDefaults {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 100,
        }
    }
}

/// Page envelope returned by list operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationResult<T> {
    pub total_count: i64,
    pub total_pages: i32,
    pub page: i32,
    pub page_size: i32,
    pub data: T,
}

impl<T> PaginationResult<T> {
    /// Maps the page payload while keeping the envelope numbers.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> PaginationResult<U> {
        PaginationResult {
            total_count: self.total_count,
            total_pages: self.total_pages,
            page: self.page,
            page_size: self.page_size,
            data: f(self.data),
        }
    }
}

/// Runs one paginated fetch.
///
/// `page`/`page_size` below 1 are replaced by `defaults`; defaults below 1
/// are clamped to 1. `fetch` receives `(offset, limit)`.
pub fn paginate<T, E>(
    total_count: i64,
    page: i32,
    page_size: i32,
    defaults: PageDefaults,
    fetch: impl FnOnce(i32, i32) -> Result<T, E>,
) -> Result<PaginationResult<T>, E> {
    let page = if page < 1 { defaults.page.max(1) } else { page };
    let page_size = if page_size < 1 {
        defaults.page_size.max(1)
    } else {
        page_size
    };
    let offset = (page - 1).saturating_mul(page_size);

    let data = fetch(offset, page_size)?;

    let total_count = total_count.max(0);
    let total_pages = total_pages(total_count, page_size);
    debug!(
        "event=paginate module=pagination status=ok page={page} page_size={page_size} offset={offset} total_count={total_count} total_pages={total_pages}"
    );

    Ok(PaginationResult {
        total_count,
        total_pages,
        page,
        page_size,
        data,
    })
}

/// Parses raw page query values; anything unparsable or non-positive becomes 0
/// so that `paginate` substitutes the defaults.
pub fn parse_page_params(page: &str, page_size: &str) -> (i32, i32) {
    (parse_positive(page), parse_positive(page_size))
}

fn parse_positive(value: &str) -> i32 {
    match value.trim().parse::<i32>() {
        Ok(parsed) if parsed > 0 => parsed,
        _ => 0,
    }
}

fn total_pages(total_count: i64, page_size: i32) -> i32 {
    let size = i64::from(page_size);
    let mut pages = total_count / size;
    if total_count % size > 0 {
        pages += 1;
    }
    i32::try_from(pages).unwrap_or(i32::MAX)
}
