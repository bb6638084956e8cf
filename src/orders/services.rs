use time::OffsetDateTime;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    auth::extractors::{Admin, Principal},
    error::{AppError, AppResult},
    orders::{
        dto::CreateOrderRequest,
        pricing::{line_item, quote},
        repo_types::{Order, OrderStatus},
    },
    state::AppState,
};

fn order_not_found() -> AppError {
    AppError::NotFound("Order not found".into())
}

/// Prices the cart against the current catalog and stores a pending order.
/// Any unknown product fails the whole request before anything is written.
pub async fn place_order(
    st: &AppState,
    principal: &Principal,
    req: CreateOrderRequest,
) -> AppResult<Order> {
    let mut items = Vec::with_capacity(req.items.len());
    for item in &req.items {
        if item.quantity == 0 {
            return Err(AppError::BadRequest(format!(
                "Quantity for product {} must be at least 1",
                item.product_id
            )));
        }
        let missing = || AppError::NotFound(format!("Product {} not found", item.product_id));
        let id = Uuid::parse_str(&item.product_id).map_err(|_| missing())?;
        let product = st.products.find_by_id(id).await?.ok_or_else(|| {
            warn!(product_id = %item.product_id, "cart references unknown product");
            missing()
        })?;
        items.push(line_item(&product, item.quantity)?);
    }

    let q = quote(items)?;
    let order = Order {
        id: Uuid::new_v4(),
        user_id: principal.user_id(),
        items: q.items,
        subtotal: q.subtotal,
        service_fee: q.service_fee,
        transportation_fee: q.transportation_fee,
        total: q.total,
        status: OrderStatus::Pending,
        created_at: OffsetDateTime::now_utc(),
        delivery_address: req.delivery_address,
        paid_at: None,
        updated_at: None,
    };
    st.orders.insert(&order).await?;

    info!(order_id = %order.id, user_id = %order.user_id, total = %order.total, "order placed");
    Ok(order)
}

/// Other users' orders are reported as missing, not forbidden.
pub async fn get_order(st: &AppState, principal: &Principal, id: &str) -> AppResult<Order> {
    let id = Uuid::parse_str(id).map_err(|_| order_not_found())?;
    st.orders
        .find_for_owner(id, principal.user_id())
        .await?
        .ok_or_else(order_not_found)
}

pub async fn list_orders(st: &AppState, principal: &Principal) -> AppResult<Vec<Order>> {
    Ok(st.orders.list_for_owner(principal.user_id()).await?)
}

/// Mock payment: one-shot `pending -> paid`, no gateway involved.
pub async fn pay_order(st: &AppState, principal: &Principal, id: &str) -> AppResult<Uuid> {
    let order = get_order(st, principal, id).await?;
    if order.status != OrderStatus::Pending {
        warn!(order_id = %order.id, status = %order.status, "payment on processed order");
        return Err(AppError::Conflict("Order already processed".into()));
    }

    // Conditional write; a concurrent payment may have won since the read.
    let paid = st
        .orders
        .mark_paid(order.id, principal.user_id(), OffsetDateTime::now_utc())
        .await?;
    if !paid {
        warn!(order_id = %order.id, "payment lost race");
        return Err(AppError::Conflict("Order already processed".into()));
    }

    info!(order_id = %order.id, user_id = %order.user_id, "order paid");
    Ok(order.id)
}

pub async fn list_all_orders(st: &AppState, _admin: &Admin) -> AppResult<Vec<Order>> {
    Ok(st.orders.list_all().await?)
}

/// Admin override: any status, from any state, no existence check.
pub async fn override_status(st: &AppState, admin: &Admin, id: &str, status: String) -> AppResult<()> {
    let Ok(id) = Uuid::parse_str(id) else {
        debug!(order_id = %id, "status override for unparseable id ignored");
        return Ok(());
    };
    let status = OrderStatus::from(status);
    let matched = st
        .orders
        .set_status(id, &status, OffsetDateTime::now_utc())
        .await?;
    if matched {
        info!(order_id = %id, %status, admin_id = %admin.user().id, "order status overridden");
    } else {
        debug!(order_id = %id, %status, "status override matched no order");
    }
    Ok(())
}
