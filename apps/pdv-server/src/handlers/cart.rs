//! # Cart Handlers
//!
//! The register screen: building the cart and finalizing the sale.
//!
//! ## Cart Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Lifecycle                                       │
//! │                                                                         │
//! │  ┌──────────┐     ┌──────────┐     ┌──────────┐     ┌──────────┐       │
//! │  │  Empty   │────►│ In Cart  │────►│ Payment  │────►│   Sale   │       │
//! │  │  Cart    │     │          │     │ chosen   │     │ written  │       │
//! │  └──────────┘     └──────────┘     └──────────┘     └──────────┘       │
//! │                        │                 │                │             │
//! │                   add_to_cart       set_payment       checkout          │
//! │                   update_item       set_discount          │             │
//! │                   remove_item                             ▼             │
//! │                        │                       cart cleared after      │
//! │                        ▼                       the transaction commits │
//! │                   clear_cart ──────────────────────► (back to empty)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Products are read from the database before the cart lock is taken; the
//! lock is never held across an `.await`.

use axum::extract::{Path, State};
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::state::{CartState, DbState};
use crate::today;
use pdv_core::cart::{Cart, CartCustomer, CartTotals, Discount};
use pdv_core::{PaymentMethod, SaleWithItems};

/// Cart contents with computed totals.
#[derive(Debug, Clone, Serialize)]
pub struct CartResponse {
    #[serde(flatten)]
    pub cart: Cart,
    pub totals: CartTotals,
}

impl From<&Cart> for CartResponse {
    fn from(cart: &Cart) -> Self {
        CartResponse {
            cart: cart.clone(),
            totals: CartTotals::from(cart),
        }
    }
}

/// `GET /api/cart`
pub async fn get_cart(State(cart): State<CartState>) -> Json<CartResponse> {
    debug!("get_cart");
    Json(cart.with_cart(|c| CartResponse::from(c)))
}

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: String,
    #[serde(default = "one")]
    pub quantity: i64,
}

fn one() -> i64 {
    1
}

/// `POST /api/cart/items`
///
/// Adds a catalog product, merging with its existing line.
pub async fn add_to_cart(
    State(db): State<DbState>,
    State(cart): State<CartState>,
    Json(request): Json<AddItemRequest>,
) -> ApiResult<Json<CartResponse>> {
    let product = db.inner().products().get(&request.product_id).await?;
    if !product.is_active {
        return Err(ApiError::not_found("Product", &request.product_id));
    }

    let response = cart.with_cart_mut(|c| {
        c.add_product(&product, request.quantity)?;
        Ok::<_, ApiError>(CartResponse::from(&*c))
    })?;

    debug!(product_id = %product.id, quantity = request.quantity, "Added to cart");
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
pub struct ManualItemRequest {
    pub name: String,
    pub unit_price_cents: i64,
    #[serde(default = "one")]
    pub quantity: i64,
}

/// `POST /api/cart/manual-items`
///
/// Adds an item that is not in the catalog (avulso).
pub async fn add_manual_item(
    State(cart): State<CartState>,
    Json(request): Json<ManualItemRequest>,
) -> ApiResult<Json<CartResponse>> {
    let response = cart.with_cart_mut(|c| {
        c.add_manual_item(&request.name, request.unit_price_cents, request.quantity)?;
        Ok::<_, ApiError>(CartResponse::from(&*c))
    })?;
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: i64,
}

/// `PUT /api/cart/items/:line_id`
///
/// Zero or less removes the line. The product's current stock is re-read so
/// the limit reflects sales made since the line was added.
pub async fn update_cart_item(
    State(db): State<DbState>,
    State(cart): State<CartState>,
    Path(line_id): Path<String>,
    Json(request): Json<UpdateItemRequest>,
) -> ApiResult<Json<CartResponse>> {
    let product_id = cart.with_cart(|c| {
        c.lines
            .iter()
            .find(|l| l.line_id == line_id)
            .map(|l| l.product_id.clone())
    });
    let product_id = match product_id {
        Some(id) => id,
        None => return Err(pdv_core::CoreError::LineNotFound(line_id).into()),
    };

    let available_stock = match product_id {
        Some(id) if request.quantity > 0 => Some(db.inner().products().get(&id).await?.stock),
        _ => None,
    };

    let response = cart.with_cart_mut(|c| {
        c.update_quantity(&line_id, request.quantity, available_stock)?;
        Ok::<_, ApiError>(CartResponse::from(&*c))
    })?;
    Ok(Json(response))
}

/// `DELETE /api/cart/items/:line_id`
pub async fn remove_from_cart(
    State(cart): State<CartState>,
    Path(line_id): Path<String>,
) -> ApiResult<Json<CartResponse>> {
    let response = cart.with_cart_mut(|c| {
        c.remove_line(&line_id)?;
        Ok::<_, ApiError>(CartResponse::from(&*c))
    })?;
    Ok(Json(response))
}

/// `DELETE /api/cart`
///
/// Keeps the sale date when the operator pinned it.
pub async fn clear_cart(State(cart): State<CartState>) -> Json<CartResponse> {
    Json(cart.with_cart_mut(|c| {
        c.clear();
        CartResponse::from(&*c)
    }))
}

/// `PUT /api/cart/discount`
///
/// Body: `{"type":"amount","value":500}`, `{"type":"percent","value":1000}`
/// or `{"type":"none"}`.
pub async fn set_discount(
    State(cart): State<CartState>,
    Json(discount): Json<Discount>,
) -> ApiResult<Json<CartResponse>> {
    let response = cart.with_cart_mut(|c| {
        c.set_discount(discount)?;
        Ok::<_, ApiError>(CartResponse::from(&*c))
    })?;
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    pub method: PaymentMethod,
    /// Cash tendered; only meaningful for dinheiro.
    pub amount_paid_cents: Option<i64>,
}

/// `PUT /api/cart/payment`
pub async fn set_payment(
    State(cart): State<CartState>,
    Json(request): Json<PaymentRequest>,
) -> ApiResult<Json<CartResponse>> {
    let response = cart.with_cart_mut(|c| {
        c.set_payment_method(request.method);
        if let Some(cents) = request.amount_paid_cents {
            c.set_amount_paid(cents)?;
        }
        Ok::<_, ApiError>(CartResponse::from(&*c))
    })?;
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
pub struct CustomerRequest {
    /// Registered customer; wins over `name`.
    pub customer_id: Option<String>,
    /// Free-typed name for an unregistered customer.
    pub name: Option<String>,
}

/// `PUT /api/cart/customer`
///
/// An empty body sets the sale back to the walk-in customer.
pub async fn set_customer(
    State(db): State<DbState>,
    State(cart): State<CartState>,
    Json(request): Json<CustomerRequest>,
) -> ApiResult<Json<CartResponse>> {
    let customer = match (request.customer_id, request.name) {
        (Some(id), _) => {
            let customer = db.inner().customers().get(&id).await?;
            Some(CartCustomer {
                id: Some(customer.id),
                name: customer.name,
            })
        }
        (None, Some(name)) if !name.trim().is_empty() => Some(CartCustomer {
            id: None,
            name: name.trim().to_string(),
        }),
        _ => None,
    };

    let response = cart.with_cart_mut(|c| {
        c.set_customer(customer)?;
        Ok::<_, ApiError>(CartResponse::from(&*c))
    })?;
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
pub struct SaleDateRequest {
    /// `None` means today.
    pub date: Option<NaiveDate>,
    /// Keep the date for the following sales too.
    #[serde(default)]
    pub keep: bool,
}

/// `PUT /api/cart/sale-date`
pub async fn set_sale_date(
    State(cart): State<CartState>,
    Json(request): Json<SaleDateRequest>,
) -> Json<CartResponse> {
    Json(cart.with_cart_mut(|c| {
        c.set_sale_date(request.date, request.keep);
        CartResponse::from(&*c)
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct CheckoutBody {
    /// Generated by the browser per "Finalizar" click. Resending the same
    /// token returns the sale already written.
    pub checkout_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub sale: SaleWithItems,
    /// True when the token had already been used.
    pub replayed: bool,
    pub cart: CartResponse,
}

/// `POST /api/cart/checkout`
///
/// ## Flow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  0. Token already used ──► return that sale, cart untouched            │
/// │  1. Snapshot the cart into a CheckoutRequest (lock held briefly)       │
/// │  2. SaleRepository::checkout: ONE transaction                          │
/// │       stock re-check + guarded decrement, sale, items, movements,      │
/// │       cash-flow income for paid sales                                  │
/// │  3. Commit ok ──► take the snapshot's lines out of the cart            │
/// │     (edits made during step 2 stay)                                    │
/// │     Any error ──► nothing written, cart untouched                      │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub async fn checkout(
    State(db): State<DbState>,
    State(cart): State<CartState>,
    body: Option<Json<CheckoutBody>>,
) -> ApiResult<Json<CheckoutResponse>> {
    let token = body
        .and_then(|Json(b)| b.checkout_token)
        .filter(|t| !t.trim().is_empty());

    // A resent click arrives after the cart was cleared by the first one.
    if let Some(token) = &token {
        if let Some(sale) = db.inner().sales().get_by_token(token).await? {
            info!(sale_id = %sale.sale.id, checkout_token = %token, "Checkout replayed");
            return Ok(Json(CheckoutResponse {
                sale,
                replayed: true,
                cart: cart.with_cart(|c| CartResponse::from(c)),
            }));
        }
    }
    let token = token.unwrap_or_else(|| Uuid::new_v4().to_string());

    let (snapshot, request) = cart.with_cart(|c| c.checkout(&token, today()).map(|r| (c.clone(), r)))?;

    let outcome = match db.inner().sales().checkout(&request).await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(checkout_token = %token, error = %e, "Checkout failed");
            return Err(e.into());
        }
    };

    let (cleared, cart_after) = cart.with_cart_mut(|c| {
        let cleared = c.settle(&snapshot);
        (cleared, CartResponse::from(&*c))
    });
    if !cleared {
        warn!(
            checkout_token = %token,
            remaining_lines = cart_after.cart.lines.len(),
            "Cart changed during checkout; unsold lines kept"
        );
    }

    info!(
        sale_id = %outcome.sale.sale.id,
        sale_number = outcome.sale.sale.sale_number,
        total_cents = outcome.sale.sale.total_cents,
        replayed = outcome.replayed,
        "Checkout complete"
    );

    Ok(Json(CheckoutResponse {
        sale: outcome.sale,
        replayed: outcome.replayed,
        cart: cart_after,
    }))
}
