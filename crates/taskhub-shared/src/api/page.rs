use serde::{Deserialize, Serialize};

/// Page descriptor returned by every paginated listing.
#[derive(Debug, Serialize, Deserialize)]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

impl<T> PageResponse<T> {
    pub fn new(items: Vec<T>, total: i64, page: u32, limit: u32) -> Self {
        let total_pages = if total == 0 {
            0
        } else {
            ((total as u64).div_ceil(limit as u64)) as u32
        };
        Self {
            items,
            total,
            page,
            limit,
            total_pages,
        }
    }
}

/// Common pagination/ordering query parameters.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PageParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,
}

impl PageParams {
    /// Clamped 1-based page number and per-page limit (1..=100).
    pub fn bounds(&self) -> (u32, u32) {
        let page = self.page.unwrap_or(1).max(1);
        let limit = self.limit.unwrap_or(20).clamp(1, 100);
        (page, limit)
    }
}

/// Row offset for a LIMIT/OFFSET query. Widened to i64 so an out-of-range
/// page number cannot overflow the multiplication.
pub fn page_offset(page: u32, limit: u32) -> i64 {
    (i64::from(page) - 1) * i64::from(limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_rounds_up() {
        let page = PageResponse::new(vec![1, 2, 3], 101, 1, 50);
        assert_eq!(page.total_pages, 3);

        let page = PageResponse::new(vec![1], 100, 1, 50);
        assert_eq!(page.total_pages, 2);
    }

    #[test]
    fn empty_result_has_zero_pages() {
        let page: PageResponse<i32> = PageResponse::new(vec![], 0, 1, 50);
        assert_eq!(page.total_pages, 0);
        assert_eq!(page.total, 0);
    }

    #[test]
    fn bounds_clamp_page_and_limit() {
        let (page, limit) = PageParams::default().bounds();
        assert_eq!((page, limit), (1, 20));

        let params = PageParams {
            page: Some(0),
            limit: Some(1000),
            ..Default::default()
        };
        assert_eq!(params.bounds(), (1, 100));
    }

    #[test]
    fn offset_survives_extreme_page_numbers() {
        assert_eq!(page_offset(1, 20), 0);
        assert_eq!(page_offset(3, 20), 40);

        // u32::MAX * 100 would overflow in u32; the widened math must not.
        let offset = page_offset(u32::MAX, 100);
        assert_eq!(offset, (i64::from(u32::MAX) - 1) * 100);
    }
}
