use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

use crate::{catalog::repo_types::Product, error::AppError};

/// `GET /products` query string.
#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub category: Option<String>,
    pub search: Option<String>,
}

/// Normalized catalog filter. `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub search: Option<String>,
}

impl From<ProductQuery> for ProductFilter {
    fn from(q: ProductQuery) -> Self {
        Self {
            // "all" is the sentinel for no category filter
            category: q.category.filter(|c| !c.is_empty() && c != "all"),
            search: q.search.filter(|s| !s.is_empty()),
        }
    }
}

impl ProductFilter {
    /// Exact category match; case-insensitive substring search on name or description.
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(category) = &self.category {
            if &product.category != category {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            return product.name.to_lowercase().contains(&needle)
                || product.description.to_lowercase().contains(&needle);
        }
        true
    }
}

/// Admin create/update payload.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub category: String,
    pub image_url: String,
    #[serde(default = "default_stock")]
    pub stock: i32,
}
fn default_stock() -> i32 {
    100
}

/// Largest price the `NUMERIC(12,2)` column accepts.
pub const MAX_PRICE: Decimal = dec!(9999999999.99);

impl ProductInput {
    /// Rejects negative or oversized prices and normalizes the price to cents.
    pub fn validated(mut self) -> Result<Self, AppError> {
        if self.price < Decimal::ZERO {
            return Err(AppError::BadRequest("Price must not be negative".into()));
        }
        if self.name.trim().is_empty() {
            return Err(AppError::BadRequest("Name is required".into()));
        }
        self.price = self.price.round_dp(2);
        if self.price > MAX_PRICE {
            return Err(AppError::BadRequest(format!("Price must not exceed {MAX_PRICE}")));
        }
        Ok(self)
    }
}
