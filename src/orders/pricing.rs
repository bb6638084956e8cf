//! Order pricing. Each stored amount is rounded to cents on its own before
//! the total is summed, so the total can differ by a cent from rounding the
//! unrounded grand total once.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use crate::{
    catalog::repo_types::Product,
    error::{AppError, AppResult},
    orders::repo_types::OrderLineItem,
};

/// 5% of the subtotal.
pub const SERVICE_FEE_RATE: Decimal = dec!(0.05);
/// Flat delivery surcharge, independent of order size and distance.
pub const TRANSPORTATION_FEE: Decimal = dec!(2.99);
/// Largest amount a stored order field can hold (NUMERIC(12,2)).
pub const MAX_ORDER_AMOUNT: Decimal = dec!(9999999999.99);

#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub items: Vec<OrderLineItem>,
    pub subtotal: Decimal,
    pub service_fee: Decimal,
    pub transportation_fee: Decimal,
    pub total: Decimal,
}

pub fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
}

fn too_large() -> AppError {
    AppError::BadRequest("Order total too large".into())
}

/// Captures the product's current name and price.
pub fn line_item(product: &Product, quantity: u32) -> AppResult<OrderLineItem> {
    let total = product
        .price
        .checked_mul(Decimal::from(quantity))
        .ok_or_else(too_large)?;
    Ok(OrderLineItem {
        product_id: product.id,
        name: product.name.clone(),
        price: product.price,
        quantity,
        total,
    })
}

/// Fails with BadRequest if any amount overflows or exceeds [`MAX_ORDER_AMOUNT`].
pub fn quote(items: Vec<OrderLineItem>) -> AppResult<Quote> {
    let raw_subtotal = items
        .iter()
        .try_fold(Decimal::ZERO, |acc, i| acc.checked_add(i.total))
        .ok_or_else(too_large)?;
    let subtotal = round_cents(raw_subtotal);
    let service_fee = round_cents(
        raw_subtotal
            .checked_mul(SERVICE_FEE_RATE)
            .ok_or_else(too_large)?,
    );
    let transportation_fee = TRANSPORTATION_FEE;
    let total = subtotal
        .checked_add(service_fee)
        .and_then(|t| t.checked_add(transportation_fee))
        .filter(|t| *t <= MAX_ORDER_AMOUNT)
        .ok_or_else(too_large)?;
    Ok(Quote {
        items,
        subtotal,
        service_fee,
        transportation_fee,
        total,
    })
}
