use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::catalog::{repo::ProductStore, repo_types::Product};

const SAMPLES: [(&str, &str, Decimal, &str, &str); 6] = [
    (
        "Fresh Bananas",
        "Organic bananas perfect for smoothies and snacks",
        dec!(2.99),
        "fruits",
        "https://images.unsplash.com/photo-1488459716781-31db52582fe9",
    ),
    (
        "Mixed Vegetables",
        "Fresh mixed vegetables for healthy cooking",
        dec!(4.99),
        "vegetables",
        "https://images.unsplash.com/photo-1579113800032-c38bd7635818",
    ),
    (
        "Chocolate Bars",
        "Assorted chocolate bars for sweet cravings",
        dec!(3.49),
        "snacks",
        "https://images.unsplash.com/photo-1621939514649-280e2ee25f60",
    ),
    (
        "Mixed Snacks",
        "Variety pack of student-friendly snacks",
        dec!(5.99),
        "snacks",
        "https://images.unsplash.com/photo-1614735241165-6756e1df61ab",
    ),
    (
        "Fresh Bread",
        "Freshly baked bread for daily meals",
        dec!(2.49),
        "bakery",
        "https://images.unsplash.com/photo-1601599964542-bbdfd6008d34",
    ),
    (
        "Apple Display",
        "Fresh crisp apples from local farms",
        dec!(3.99),
        "fruits",
        "https://images.unsplash.com/photo-1653222439694-f7f84f69edf6",
    ),
];

pub fn sample_products() -> Vec<Product> {
    let now = OffsetDateTime::now_utc();
    SAMPLES
        .iter()
        .map(|(name, description, price, category, image_url)| Product {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: description.to_string(),
            price: *price,
            category: category.to_string(),
            image_url: image_url.to_string(),
            stock: 100,
            created_at: now,
        })
        .collect()
}

/// Inserts the sample catalog when the product collection is empty.
/// Returns the number of products inserted.
pub async fn seed_if_empty(products: &dyn ProductStore) -> anyhow::Result<usize> {
    if products.count().await? > 0 {
        return Ok(0);
    }
    let samples = sample_products();
    for p in &samples {
        products.insert(p).await?;
    }
    info!(count = samples.len(), "seeded sample catalog");
    Ok(samples.len())
}
