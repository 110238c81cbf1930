use serde::{Deserialize, Serialize};

/// Limit/offset paging with clamped bounds.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            offset: 0,
        }
    }
}

impl PageQuery {
    pub fn limit(&self) -> i64 {
        self.limit.clamp(1, 200)
    }

    pub fn offset(&self) -> i64 {
        self.offset.max(0)
    }
}

/// Paginated listing payload.
#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_query_clamps_out_of_range_values() {
        let page = PageQuery {
            limit: 10_000,
            offset: -5,
        };
        assert_eq!(page.limit(), 200);
        assert_eq!(page.offset(), 0);

        let page = PageQuery { limit: 0, offset: 3 };
        assert_eq!(page.limit(), 1);
        assert_eq!(page.offset(), 3);
    }
}
