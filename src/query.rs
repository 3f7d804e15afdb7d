use serde::Deserialize;

use crate::error::ApiError;

const DEFAULT_PAGE: u32 = 1;
const DEFAULT_LIMIT: u32 = 10;
const MAX_LIMIT: u32 = 100;

/// Pagination parameters extracted from the query string
/// Both fields are optional; page is 1-indexed
#[derive(Debug, Default, Clone, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Validated pagination window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Pagination {
    /// Validate raw parameters, applying defaults (page 1, limit 10)
    pub fn from_params(page: Option<u32>, limit: Option<u32>) -> Result<Self, ApiError> {
        let page = page.unwrap_or(DEFAULT_PAGE);
        let limit = limit.unwrap_or(DEFAULT_LIMIT);

        if page == 0 {
            return Err(ApiError::InvalidArgument(
                "page must be a positive integer".to_string(),
            ));
        }
        if limit == 0 || limit > MAX_LIMIT {
            return Err(ApiError::InvalidArgument(format!(
                "limit must be between 1 and {}",
                MAX_LIMIT
            )));
        }

        Ok(Self { page, limit })
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.limit)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.limit)
    }
}

impl TryFrom<PageParams> for Pagination {
    type Error = ApiError;

    fn try_from(params: PageParams) -> Result<Self, Self::Error> {
        Pagination::from_params(params.page, params.limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let p = Pagination::try_from(PageParams::default()).unwrap();
        assert_eq!(p, Pagination { page: 1, limit: 10 });
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn test_offset_for_later_pages() {
        let p = Pagination::from_params(Some(3), Some(25)).unwrap();
        assert_eq!(p.offset(), 50);
        assert_eq!(p.limit(), 25);
    }

    #[test]
    fn test_zero_page_rejected() {
        assert!(matches!(
            Pagination::from_params(Some(0), None),
            Err(ApiError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_limit_bounds() {
        assert!(Pagination::from_params(None, Some(0)).is_err());
        assert!(Pagination::from_params(None, Some(101)).is_err());
        assert!(Pagination::from_params(None, Some(100)).is_ok());
    }
}
