use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One cart entry as submitted by the client. Never persisted.
#[derive(Debug, Clone, Deserialize)]
pub struct CartItem {
    pub product_id: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderRequest {
    pub items: Vec<CartItem>,
    pub delivery_address: String,
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub message: &'static str,
    pub order_id: Uuid,
}

/// Admin status override; the value may come from the query string or the body.
#[derive(Debug, Default, Deserialize)]
pub struct StatusUpdate {
    pub status: Option<String>,
}
