//! Page slicing for list views.
//!
//! Lists are cut into pages of [`PAGE_SIZE`]. The `page` query parameter is
//! 1-based and also accepts `last`. An empty list still has one (empty)
//! page; any other page that does not exist is a 404.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;

/// Records per page.
pub const PAGE_SIZE: usize = 5;

/// The `page` query parameter.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: Option<String>,
}

/// Where a page sits in the full list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PageInfo {
    /// Current page, 1-based.
    pub page: usize,
    pub num_pages: usize,
    /// Whether the list spans more than one page.
    pub is_paginated: bool,
    /// Total records across all pages.
    pub count: usize,
}

/// Slice `items` to the requested page.
///
/// # Errors
///
/// [`AppError::NotFound`] when `page` is not an integer, is below 1, or is
/// past the last page.
pub fn paginate<T>(items: Vec<T>, page: Option<&str>) -> Result<(Vec<T>, PageInfo), AppError> {
    let count = items.len();
    let num_pages = count.div_ceil(PAGE_SIZE).max(1);

    let page = match page.map(str::trim).filter(|p| !p.is_empty()) {
        None => 1,
        Some("last") => num_pages,
        Some(raw) => raw
            .parse::<usize>()
            .map_err(|_| AppError::NotFound("that page number is not an integer".to_string()))?,
    };
    if page < 1 {
        return Err(AppError::NotFound(
            "that page number is less than 1".to_string(),
        ));
    }
    if page > num_pages {
        return Err(AppError::NotFound("that page contains no results".to_string()));
    }

    let results = items
        .into_iter()
        .skip((page - 1) * PAGE_SIZE)
        .take(PAGE_SIZE)
        .collect();
    Ok((
        results,
        PageInfo {
            page,
            num_pages,
            is_paginated: num_pages > 1,
            count,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_page_by_default() {
        let (items, info) = paginate((1..=12).collect(), None).unwrap();
        assert_eq!(items, vec![1, 2, 3, 4, 5]);
        assert_eq!(
            info,
            PageInfo {
                page: 1,
                num_pages: 3,
                is_paginated: true,
                count: 12
            }
        );
    }

    #[test]
    fn last_page_is_partial() {
        let (items, info) = paginate((1..=12).collect(), Some("3")).unwrap();
        assert_eq!(items, vec![11, 12]);
        assert_eq!(info.page, 3);

        let (items, _) = paginate((1..=12).collect::<Vec<_>>(), Some("last")).unwrap();
        assert_eq!(items, vec![11, 12]);
    }

    #[test]
    fn empty_list_has_one_page() {
        let (items, info) = paginate(Vec::<i32>::new(), Some("1")).unwrap();
        assert!(items.is_empty());
        assert_eq!(info.num_pages, 1);
        assert!(!info.is_paginated);
    }

    #[test]
    fn out_of_range_and_garbage_pages_are_not_found() {
        for page in ["0", "4", "-1", "two", "1.5"] {
            let result = paginate((1..=12).collect::<Vec<_>>(), Some(page));
            assert!(matches!(result, Err(AppError::NotFound(_))), "page {page}");
        }
    }

    #[test]
    fn blank_page_means_first() {
        let (_, info) = paginate((1..=7).collect::<Vec<_>>(), Some("")).unwrap();
        assert_eq!(info.page, 1);
    }
}
