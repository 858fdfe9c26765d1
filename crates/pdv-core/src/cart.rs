//! # Cart
//!
//! The register's shopping cart and the checkout request it produces.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Operations                                      │
//! │                                                                         │
//! │  Click product ──────► add_product()      merge by product, ≤ stock    │
//! │  Avulso item ────────► add_manual_item()  never touches stock          │
//! │  Change quantity ────► update_quantity()  ≤ 0 removes the line         │
//! │  Discount ───────────► set_discount()     R$ or %, total never < 0     │
//! │  Cash tendered ──────► set_amount_paid()  change only for dinheiro     │
//! │                                                                         │
//! │  Finalizar ──────────► checkout(token) ──► CheckoutRequest             │
//! │                                              │                          │
//! │                            pdv-db runs it in ONE transaction            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The stock numbers held here are what the register saw when the product
//! was added. The authoritative check happens again inside the checkout
//! transaction.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{PaymentMethod, Product, SaleStatus};
use crate::validation::{validate_percentage_bps, validate_positive_cents, validate_quantity, validate_required_text};
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY, WALK_IN_CUSTOMER};

// =============================================================================
// Cart Line
// =============================================================================

/// A line in the cart.
///
/// Name, price and cost are frozen when the line is added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartLine {
    pub line_id: String,
    /// `None` for manual items typed at the register.
    pub product_id: Option<String>,
    pub name: String,
    pub unit_price_cents: i64,
    pub unit_cost_cents: i64,
    pub quantity: i64,
    /// Stock seen when the line was last touched.
    pub available_stock: Option<i64>,
}

impl CartLine {
    pub fn from_product(product: &Product, quantity: i64) -> Self {
        CartLine {
            line_id: Uuid::new_v4().to_string(),
            product_id: Some(product.id.clone()),
            name: product.name.clone(),
            unit_price_cents: product.price_cents,
            unit_cost_cents: product.cost_cents,
            quantity,
            available_stock: Some(product.stock),
        }
    }

    pub fn line_total(&self) -> Money {
        Money::from_cents(self.unit_price_cents).multiply_quantity(self.quantity)
    }

    pub fn line_profit(&self) -> Money {
        Money::from_cents(self.unit_price_cents - self.unit_cost_cents).multiply_quantity(self.quantity)
    }

    pub fn is_manual(&self) -> bool {
        self.product_id.is_none()
    }
}

// =============================================================================
// Discount
// =============================================================================

/// Discount applied to the whole cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Discount {
    None,
    /// Fixed amount in centavos.
    Amount(i64),
    /// Percentage in basis points (1000 = 10%).
    Percent(u32),
}

impl Default for Discount {
    fn default() -> Self {
        Discount::None
    }
}

impl Discount {
    /// Discount value for a given subtotal, never more than the subtotal.
    pub fn amount_for(&self, subtotal: Money) -> Money {
        let raw = match *self {
            Discount::None => Money::zero(),
            Discount::Amount(cents) => Money::from_cents(cents),
            Discount::Percent(bps) => subtotal.percentage_of(bps),
        };
        raw.clamp_non_negative().min(subtotal.clamp_non_negative())
    }

    pub fn validate(&self) -> CoreResult<()> {
        match *self {
            Discount::None => Ok(()),
            Discount::Amount(cents) if cents < 0 => {
                Err(ValidationError::must_be_positive("discount").into())
            }
            Discount::Amount(_) => Ok(()),
            Discount::Percent(bps) => Ok(validate_percentage_bps("discount", bps)?),
        }
    }
}

// =============================================================================
// Totals
// =============================================================================

/// Money summary shared by carts, budgets and the checkout transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleTotals {
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    /// Σ qty × (price − cost) − discount.
    pub profit_cents: i64,
}

impl SaleTotals {
    /// `lines` yields (quantity, unit price, unit cost).
    pub fn compute(lines: impl IntoIterator<Item = (i64, i64, i64)>, discount: Discount) -> Self {
        let mut subtotal = Money::zero();
        let mut gross_profit = Money::zero();
        for (qty, price, cost) in lines {
            subtotal += Money::from_cents(price).multiply_quantity(qty);
            gross_profit += Money::from_cents(price - cost).multiply_quantity(qty);
        }
        let discount = discount.amount_for(subtotal);
        SaleTotals {
            subtotal_cents: subtotal.cents(),
            discount_cents: discount.cents(),
            total_cents: (subtotal - discount).clamp_non_negative().cents(),
            profit_cents: (gross_profit - discount).cents(),
        }
    }
}

/// Totals plus register-specific numbers, as returned to the browser.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartTotals {
    pub line_count: usize,
    pub total_quantity: i64,
    #[serde(flatten)]
    pub totals: SaleTotals,
    pub amount_paid_cents: i64,
    pub change_cents: i64,
    pub can_finalize: bool,
}

impl From<&Cart> for CartTotals {
    fn from(cart: &Cart) -> Self {
        CartTotals {
            line_count: cart.lines.len(),
            total_quantity: cart.total_quantity(),
            totals: cart.totals(),
            amount_paid_cents: cart.amount_paid_cents,
            change_cents: cart.change().cents(),
            can_finalize: cart.can_finalize(),
        }
    }
}

// =============================================================================
// Checkout Request
// =============================================================================

/// One line handed to the checkout transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CheckoutLine {
    pub product_id: Option<String>,
    pub name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub unit_cost_cents: i64,
}

impl CheckoutLine {
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.unit_price_cents).multiply_quantity(self.quantity)
    }
}

/// Everything the checkout transaction needs to write a sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CheckoutRequest {
    /// Idempotency key generated by the browser per "Finalizar" click.
    pub checkout_token: String,
    #[ts(as = "String")]
    pub sale_date: NaiveDate,
    pub customer_id: Option<String>,
    pub customer_name: String,
    pub payment_method: PaymentMethod,
    pub status: SaleStatus,
    pub lines: Vec<CheckoutLine>,
    pub discount: Discount,
    pub amount_paid_cents: i64,
    pub budget_id: Option<String>,
}

impl CheckoutRequest {
    pub fn totals(&self) -> SaleTotals {
        SaleTotals::compute(
            self.lines
                .iter()
                .map(|l| (l.quantity, l.unit_price_cents, l.unit_cost_cents)),
            self.discount,
        )
    }

    /// Change owed back: only cash gives change.
    pub fn change_cents(&self) -> i64 {
        if self.payment_method.gives_change() {
            (self.amount_paid_cents - self.totals().total_cents).max(0)
        } else {
            0
        }
    }

    /// Checks the request on its own, before any stock is consulted.
    pub fn validate(&self) -> CoreResult<()> {
        validate_required_text("checkout_token", &self.checkout_token, 64)?;
        if self.lines.is_empty() {
            return Err(CoreError::CartEmpty);
        }
        if self.lines.len() > MAX_CART_ITEMS {
            return Err(CoreError::CartTooLarge { max: MAX_CART_ITEMS });
        }
        for line in &self.lines {
            validate_required_text("name", &line.name, 200)?;
            validate_quantity(line.quantity)?;
            validate_positive_cents("unit_price_cents", line.unit_price_cents)?;
        }
        self.discount.validate()?;

        let total = self.totals().total_cents;
        if self.payment_method.gives_change()
            && self.status == SaleStatus::Pago
            && self.amount_paid_cents < total
        {
            return Err(CoreError::InsufficientPayment {
                total_cents: total,
                paid_cents: self.amount_paid_cents,
            });
        }
        Ok(())
    }
}

/// Status a fresh sale starts in: boleto is collected later.
pub fn initial_sale_status(method: PaymentMethod) -> SaleStatus {
    match method {
        PaymentMethod::Boleto => SaleStatus::Pendente,
        _ => SaleStatus::Pago,
    }
}

// =============================================================================
// Cart
// =============================================================================

/// Customer attached to the current sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartCustomer {
    pub id: Option<String>,
    pub name: String,
}

/// The register's cart.
///
/// ## Invariants
/// - Catalog lines are unique by `product_id`
/// - Quantities are in `1..=MAX_ITEM_QUANTITY`
/// - At most `MAX_CART_ITEMS` lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Cart {
    pub lines: Vec<CartLine>,
    pub discount: Discount,
    pub customer: Option<CartCustomer>,
    pub payment_method: PaymentMethod,
    pub amount_paid_cents: i64,
    /// Explicit sale date; `None` means "today" at checkout.
    #[ts(as = "Option<String>")]
    pub sale_date: Option<NaiveDate>,
    /// Keep `sale_date` across sales (typing in a batch of old sales).
    pub keep_sale_date: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Default for Cart {
    fn default() -> Self {
        Cart::new()
    }
}

impl Cart {
    pub fn new() -> Self {
        Cart {
            lines: Vec::new(),
            discount: Discount::None,
            customer: None,
            payment_method: PaymentMethod::default(),
            amount_paid_cents: 0,
            sale_date: None,
            keep_sale_date: false,
            created_at: Utc::now(),
        }
    }

    /// Adds `quantity` of a catalog product, merging with an existing line.
    ///
    /// ## Errors
    /// - `InsufficientStock` when the product has no stock or the merged
    ///   quantity exceeds it
    /// - `CartTooLarge` / `QuantityTooLarge` on the register limits
    pub fn add_product(&mut self, product: &Product, quantity: i64) -> CoreResult<&CartLine> {
        validate_quantity(quantity)?;

        if product.is_out_of_stock() {
            return Err(CoreError::InsufficientStock {
                product: product.name.clone(),
                available: 0,
                requested: quantity,
            });
        }

        let existing = self
            .lines
            .iter()
            .position(|l| l.product_id.as_deref() == Some(product.id.as_str()));

        let requested = existing.map_or(0, |i| self.lines[i].quantity) + quantity;
        if requested > MAX_ITEM_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                max: MAX_ITEM_QUANTITY,
                requested,
            });
        }
        if requested > product.stock {
            return Err(CoreError::InsufficientStock {
                product: product.name.clone(),
                available: product.stock,
                requested,
            });
        }

        let index = match existing {
            Some(i) => {
                let line = &mut self.lines[i];
                line.quantity = requested;
                line.available_stock = Some(product.stock);
                i
            }
            None => {
                self.ensure_room()?;
                self.lines.push(CartLine::from_product(product, quantity));
                self.lines.len() - 1
            }
        };
        Ok(&self.lines[index])
    }

    /// Adds an item that is not in the catalog.
    pub fn add_manual_item(
        &mut self,
        name: &str,
        unit_price_cents: i64,
        quantity: i64,
    ) -> CoreResult<&CartLine> {
        validate_required_text("name", name, 200)?;
        validate_positive_cents("unit_price_cents", unit_price_cents)?;
        validate_quantity(quantity)?;
        self.ensure_room()?;

        self.lines.push(CartLine {
            line_id: Uuid::new_v4().to_string(),
            product_id: None,
            name: name.trim().to_string(),
            unit_price_cents,
            unit_cost_cents: 0,
            quantity,
            available_stock: None,
        });
        Ok(&self.lines[self.lines.len() - 1])
    }

    /// Sets a line's quantity. Zero or less removes the line.
    ///
    /// `available_stock` is the product's current stock when the caller has
    /// re-read it; otherwise the stock seen at add time is used.
    pub fn update_quantity(
        &mut self,
        line_id: &str,
        quantity: i64,
        available_stock: Option<i64>,
    ) -> CoreResult<()> {
        if quantity <= 0 {
            return self.remove_line(line_id);
        }
        if quantity > MAX_ITEM_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                max: MAX_ITEM_QUANTITY,
                requested: quantity,
            });
        }

        let line = self
            .lines
            .iter_mut()
            .find(|l| l.line_id == line_id)
            .ok_or_else(|| CoreError::LineNotFound(line_id.to_string()))?;

        if let Some(stock) = available_stock {
            line.available_stock = Some(stock);
        }
        if let Some(stock) = line.available_stock.filter(|_| !line.is_manual()) {
            if quantity > stock {
                return Err(CoreError::InsufficientStock {
                    product: line.name.clone(),
                    available: stock,
                    requested: quantity,
                });
            }
        }

        line.quantity = quantity;
        Ok(())
    }

    pub fn remove_line(&mut self, line_id: &str) -> CoreResult<()> {
        let before = self.lines.len();
        self.lines.retain(|l| l.line_id != line_id);
        if self.lines.len() == before {
            return Err(CoreError::LineNotFound(line_id.to_string()));
        }
        Ok(())
    }

    pub fn set_discount(&mut self, discount: Discount) -> CoreResult<()> {
        discount.validate()?;
        self.discount = discount;
        Ok(())
    }

    pub fn set_amount_paid(&mut self, cents: i64) -> CoreResult<()> {
        if cents < 0 {
            return Err(ValidationError::must_be_positive("amount_paid").into());
        }
        self.amount_paid_cents = cents;
        Ok(())
    }

    /// Attaches a customer; `None` sells to [`WALK_IN_CUSTOMER`].
    pub fn set_customer(&mut self, customer: Option<CartCustomer>) -> CoreResult<()> {
        if let Some(c) = &customer {
            validate_required_text("customer.name", &c.name, 200)?;
        }
        self.customer = customer;
        Ok(())
    }

    pub fn set_payment_method(&mut self, method: PaymentMethod) {
        self.payment_method = method;
    }

    pub fn set_sale_date(&mut self, date: Option<NaiveDate>, keep: bool) {
        self.sale_date = date;
        self.keep_sale_date = keep && date.is_some();
    }

    /// Resets the cart after a sale. The sale date survives only when
    /// `keep_sale_date` is set.
    pub fn clear(&mut self) {
        let sale_date = if self.keep_sale_date { self.sale_date } else { None };
        let keep = self.keep_sale_date;
        *self = Cart::new();
        self.sale_date = sale_date;
        self.keep_sale_date = keep;
    }

    /// Takes a committed sale out of the cart. `sold` is the cart as it was
    /// when the checkout request was built.
    ///
    /// An untouched cart is cleared. Otherwise only the sold quantities
    /// leave: lines added or grown in the meantime stay, and so do a
    /// discount or tendered amount set after the snapshot. Returns whether
    /// the cart ended up cleared.
    pub fn settle(&mut self, sold: &Cart) -> bool {
        if self == sold {
            self.clear();
            return true;
        }

        for sold_line in &sold.lines {
            let Some(i) = self.lines.iter().position(|l| l.line_id == sold_line.line_id) else {
                continue;
            };
            if self.lines[i].quantity > sold_line.quantity {
                self.lines[i].quantity -= sold_line.quantity;
            } else {
                self.lines.remove(i);
            }
        }
        if self.lines.is_empty() {
            self.clear();
            return true;
        }

        if self.discount == sold.discount {
            self.discount = Discount::None;
        }
        if self.amount_paid_cents == sold.amount_paid_cents {
            self.amount_paid_cents = 0;
        }
        false
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    pub fn totals(&self) -> SaleTotals {
        SaleTotals::compute(
            self.lines
                .iter()
                .map(|l| (l.quantity, l.unit_price_cents, l.unit_cost_cents)),
            self.discount,
        )
    }

    /// Change owed: only for cash, never negative.
    pub fn change(&self) -> Money {
        if !self.payment_method.gives_change() {
            return Money::zero();
        }
        (Money::from_cents(self.amount_paid_cents) - Money::from_cents(self.totals().total_cents))
            .clamp_non_negative()
    }

    /// Non-empty, and for cash the tendered amount covers the total.
    pub fn can_finalize(&self) -> bool {
        if self.is_empty() {
            return false;
        }
        if self.payment_method.gives_change() {
            return self.amount_paid_cents >= self.totals().total_cents;
        }
        true
    }

    /// Builds the checkout request for this cart.
    ///
    /// Card, PIX and boleto sales record the total as the amount paid.
    pub fn checkout(&self, checkout_token: &str, today: NaiveDate) -> CoreResult<CheckoutRequest> {
        if self.is_empty() {
            return Err(CoreError::CartEmpty);
        }
        let total = self.totals().total_cents;
        if !self.can_finalize() {
            return Err(CoreError::InsufficientPayment {
                total_cents: total,
                paid_cents: self.amount_paid_cents,
            });
        }

        let (customer_id, customer_name) = match &self.customer {
            Some(c) => (c.id.clone(), c.name.clone()),
            None => (None, WALK_IN_CUSTOMER.to_string()),
        };

        let request = CheckoutRequest {
            checkout_token: checkout_token.to_string(),
            sale_date: self.sale_date.unwrap_or(today),
            customer_id,
            customer_name,
            payment_method: self.payment_method,
            status: initial_sale_status(self.payment_method),
            lines: self
                .lines
                .iter()
                .map(|l| CheckoutLine {
                    product_id: l.product_id.clone(),
                    name: l.name.clone(),
                    quantity: l.quantity,
                    unit_price_cents: l.unit_price_cents,
                    unit_cost_cents: l.unit_cost_cents,
                })
                .collect(),
            discount: self.discount,
            amount_paid_cents: if self.payment_method.gives_change() {
                self.amount_paid_cents
            } else {
                total
            },
            budget_id: None,
        };
        request.validate()?;
        Ok(request)
    }

    fn ensure_room(&self) -> CoreResult<()> {
        if self.lines.len() >= MAX_CART_ITEMS {
            return Err(CoreError::CartTooLarge { max: MAX_CART_ITEMS });
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn test_product(id: &str, price_cents: i64, cost_cents: i64, stock: i64) -> Product {
        Product {
            id: id.to_string(),
            name: format!("Produto {}", id),
            category: "Gesso".to_string(),
            description: None,
            barcode: None,
            price_cents,
            cost_cents,
            stock,
            min_stock: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 20).unwrap()
    }

    #[test]
    fn test_add_product_merges_lines() {
        let mut cart = Cart::new();
        let product = test_product("1", 1000, 400, 10);

        cart.add_product(&product, 2).unwrap();
        cart.add_product(&product, 3).unwrap();

        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.total_quantity(), 5);
        assert_eq!(cart.totals().subtotal_cents, 5000);
    }

    #[test]
    fn test_add_out_of_stock_product_fails() {
        let mut cart = Cart::new();
        let product = test_product("1", 1000, 400, 0);

        let err = cart.add_product(&product, 1).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientStock { available: 0, requested: 1, .. }
        ));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_merge_cannot_exceed_stock() {
        let mut cart = Cart::new();
        let product = test_product("1", 1000, 400, 3);

        cart.add_product(&product, 3).unwrap();
        let err = cart.add_product(&product, 1).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientStock { available: 3, requested: 4, .. }
        ));
        assert_eq!(cart.total_quantity(), 3);
    }

    #[test]
    fn test_manual_item_rules() {
        let mut cart = Cart::new();
        assert!(cart.add_manual_item("", 1000, 1).is_err());
        assert!(cart.add_manual_item("Frete", 0, 1).is_err());

        cart.add_manual_item("Frete", 1500, 1).unwrap();
        cart.add_manual_item("Frete", 1500, 1).unwrap();
        // manual items never merge
        assert_eq!(cart.lines.len(), 2);
        assert!(cart.lines.iter().all(|l| l.is_manual()));
    }

    #[test]
    fn test_manual_item_price_is_bounded() {
        let mut cart = Cart::new();
        let err = cart.add_manual_item("X", i64::MAX / 2, 3).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::OutOfRange { .. })
        ));
        assert!(cart.is_empty());

        // the largest accepted line still totals without overflow
        cart.add_manual_item("Obra completa", crate::MAX_PRICE_CENTS, MAX_ITEM_QUANTITY)
            .unwrap();
        let totals = cart.totals();
        assert_eq!(totals.subtotal_cents, crate::MAX_PRICE_CENTS * MAX_ITEM_QUANTITY);
        assert_eq!(totals.total_cents, totals.subtotal_cents);
    }

    #[test]
    fn test_update_quantity_zero_removes() {
        let mut cart = Cart::new();
        let line_id = cart
            .add_product(&test_product("1", 1000, 400, 10), 2)
            .unwrap()
            .line_id
            .clone();

        cart.update_quantity(&line_id, 0, None).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_quantity_checks_stock() {
        let mut cart = Cart::new();
        let line_id = cart
            .add_product(&test_product("1", 1000, 400, 5), 1)
            .unwrap()
            .line_id
            .clone();

        assert!(cart.update_quantity(&line_id, 6, None).is_err());
        cart.update_quantity(&line_id, 5, None).unwrap();
        // fresher stock from the caller wins
        assert!(cart.update_quantity(&line_id, 5, Some(4)).is_err());
        assert!(cart.update_quantity("missing", 1, None).is_err());
    }

    #[test]
    fn test_discount_amount_and_percent() {
        let mut cart = Cart::new();
        cart.add_product(&test_product("1", 1000, 400, 10), 2).unwrap();

        cart.set_discount(Discount::Amount(500)).unwrap();
        assert_eq!(cart.totals().total_cents, 1500);

        cart.set_discount(Discount::Percent(1000)).unwrap();
        assert_eq!(cart.totals().discount_cents, 200);
        assert_eq!(cart.totals().total_cents, 1800);

        assert!(cart.set_discount(Discount::Percent(10_001)).is_err());
        assert!(cart.set_discount(Discount::Amount(-1)).is_err());
    }

    #[test]
    fn test_total_never_negative() {
        let mut cart = Cart::new();
        cart.add_product(&test_product("1", 1000, 400, 10), 1).unwrap();
        cart.set_discount(Discount::Amount(5000)).unwrap();

        let totals = cart.totals();
        assert_eq!(totals.discount_cents, 1000);
        assert_eq!(totals.total_cents, 0);
    }

    #[test]
    fn test_profit_subtracts_discount() {
        let mut cart = Cart::new();
        cart.add_product(&test_product("1", 1000, 400, 10), 2).unwrap();
        cart.add_manual_item("Instalação", 3000, 1).unwrap();
        cart.set_discount(Discount::Amount(200)).unwrap();

        // (1000-400)*2 + 3000 - 200
        assert_eq!(cart.totals().profit_cents, 4000);
    }

    #[test]
    fn test_change_only_for_cash() {
        let mut cart = Cart::new();
        cart.add_product(&test_product("1", 1050, 400, 10), 1).unwrap();
        cart.set_amount_paid(2000).unwrap();
        assert_eq!(cart.change().cents(), 950);

        cart.payment_method = PaymentMethod::Pix;
        assert_eq!(cart.change().cents(), 0);
    }

    #[test]
    fn test_can_finalize() {
        let mut cart = Cart::new();
        assert!(!cart.can_finalize());

        cart.add_product(&test_product("1", 1000, 400, 10), 1).unwrap();
        assert!(!cart.can_finalize());

        cart.set_amount_paid(1000).unwrap();
        assert!(cart.can_finalize());

        cart.set_amount_paid(0).unwrap();
        cart.payment_method = PaymentMethod::Debito;
        assert!(cart.can_finalize());
    }

    #[test]
    fn test_checkout_request() {
        let mut cart = Cart::new();
        cart.add_product(&test_product("1", 1000, 400, 10), 2).unwrap();
        cart.payment_method = PaymentMethod::Credito;

        let request = cart.checkout("tok-1", today()).unwrap();
        assert_eq!(request.customer_name, WALK_IN_CUSTOMER);
        assert_eq!(request.sale_date, today());
        assert_eq!(request.amount_paid_cents, 2000);
        assert_eq!(request.status, SaleStatus::Pago);
        assert_eq!(request.change_cents(), 0);
    }

    #[test]
    fn test_checkout_insufficient_cash() {
        let mut cart = Cart::new();
        cart.add_product(&test_product("1", 1000, 400, 10), 1).unwrap();
        cart.set_amount_paid(500).unwrap();

        let err = cart.checkout("tok", today()).unwrap_err();
        assert!(matches!(err, CoreError::InsufficientPayment { .. }));
        assert!(matches!(Cart::new().checkout("tok", today()), Err(CoreError::CartEmpty)));
    }

    #[test]
    fn test_boleto_sales_start_pending() {
        let mut cart = Cart::new();
        cart.add_product(&test_product("1", 1000, 400, 10), 1).unwrap();
        cart.payment_method = PaymentMethod::Boleto;

        let request = cart.checkout("tok", today()).unwrap();
        assert_eq!(request.status, SaleStatus::Pendente);
    }

    #[test]
    fn test_settle_untouched_cart_clears_it() {
        let mut cart = Cart::new();
        cart.add_manual_item("Frete", 1000, 1).unwrap();
        let snapshot = cart.clone();

        assert!(cart.settle(&snapshot));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_settle_keeps_changes_made_during_checkout() {
        let mut cart = Cart::new();
        let placa = test_product("1", 1000, 400, 50);
        cart.add_product(&placa, 3).unwrap();
        cart.set_discount(Discount::Amount(100)).unwrap();
        let snapshot = cart.clone();

        // another tab edits the cart while the sale is being written
        let sanca = test_product("2", 2000, 900, 50);
        cart.add_product(&sanca, 1).unwrap();
        cart.add_product(&placa, 2).unwrap();

        assert!(!cart.settle(&snapshot));
        assert_eq!(cart.lines.len(), 2);
        assert_eq!(cart.lines[0].product_id.as_deref(), Some("1"));
        assert_eq!(cart.lines[0].quantity, 2);
        assert_eq!(cart.lines[1].product_id.as_deref(), Some("2"));
        assert_eq!(cart.discount, Discount::None);
    }

    #[test]
    fn test_settle_keeps_discount_set_after_snapshot() {
        let mut cart = Cart::new();
        cart.add_manual_item("Frete", 1000, 1).unwrap();
        let snapshot = cart.clone();

        cart.add_manual_item("Instalação", 5000, 1).unwrap();
        cart.set_discount(Discount::Percent(1000)).unwrap();

        assert!(!cart.settle(&snapshot));
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.lines[0].name, "Instalação");
        assert_eq!(cart.discount, Discount::Percent(1000));
    }

    #[test]
    fn test_clear_keeps_sale_date_when_asked() {
        let mut cart = Cart::new();
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        cart.sale_date = Some(date);
        cart.add_manual_item("Frete", 1000, 1).unwrap();

        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.sale_date, None);

        cart.set_sale_date(Some(date), true);
        cart.clear();
        assert_eq!(cart.sale_date, Some(date));
        assert!(cart.keep_sale_date);
    }

    #[test]
    fn test_cart_too_large() {
        let mut cart = Cart::new();
        for _ in 0..MAX_CART_ITEMS {
            cart.add_manual_item("Item", 100, 1).unwrap();
        }
        assert!(matches!(
            cart.add_manual_item("Item", 100, 1),
            Err(CoreError::CartTooLarge { .. })
        ));
    }

    #[test]
    fn test_customer_and_sale_date_setters() {
        let mut cart = Cart::new();
        assert!(cart
            .set_customer(Some(CartCustomer { id: None, name: "  ".to_string() }))
            .is_err());
        cart.set_customer(Some(CartCustomer { id: None, name: "Ana".to_string() }))
            .unwrap();
        cart.set_payment_method(PaymentMethod::Pix);
        cart.add_manual_item("Frete", 1500, 1).unwrap();

        let request = cart.checkout("tok", NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()).unwrap();
        assert_eq!(request.customer_name, "Ana");
        assert_eq!(request.amount_paid_cents, 1500);

        cart.set_sale_date(None, true);
        assert!(!cart.keep_sale_date);
    }
}
