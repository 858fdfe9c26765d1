//! # Domain Types
//!
//! Records stored in the relational tables: products, customers,
//! suppliers and their purchases, sales, stock movements, accounts and the
//! cash flow.
//!
//! ## Wire Values
//! Enum values keep the Portuguese strings the business already uses
//! (`dinheiro`, `pago`, `entrada`...) so exports and old backups stay
//! readable.
//!
//! ## Snapshot Pattern
//! ```text
//! Product (mutable)              SaleItem (immutable snapshot)
//! ┌─────────────────────┐        ┌─────────────────────────────┐
//! │ name: "Vaso Grego"  │──copy─►│ name_snapshot: "Vaso Grego" │
//! │ price_cents: 4500   │──copy─►│ unit_price_cents: 4500      │
//! │ cost_cents: 1800    │──copy─►│ unit_cost_cents: 1800       │
//! └─────────────────────┘        └─────────────────────────────┘
//! Later price or cost changes never rewrite an old sale or its profit.
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;
use crate::DEFAULT_MIN_STOCK;

// =============================================================================
// Product
// =============================================================================

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub barcode: Option<String>,
    /// Sale price in centavos.
    pub price_cents: i64,
    /// Unit cost in centavos (used for profit and stock value).
    pub cost_cents: i64,
    /// Units on hand. Never negative.
    pub stock: i64,
    /// Low-stock threshold. `None` falls back to [`DEFAULT_MIN_STOCK`].
    pub min_stock: Option<i64>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    pub fn cost(&self) -> Money {
        Money::from_cents(self.cost_cents)
    }

    pub fn min_stock_or_default(&self) -> i64 {
        self.min_stock.unwrap_or(DEFAULT_MIN_STOCK)
    }

    pub fn is_out_of_stock(&self) -> bool {
        self.stock <= 0
    }

    /// In stock but at or below the minimum.
    pub fn is_low_stock(&self) -> bool {
        self.stock > 0 && self.stock <= self.min_stock_or_default()
    }

    /// Stock valued at cost.
    pub fn stock_value(&self) -> Money {
        self.cost().multiply_quantity(self.stock)
    }
}

/// Fields accepted when creating or editing a product.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductInput {
    pub name: String,
    #[serde(default)]
    pub category: String,
    pub description: Option<String>,
    pub barcode: Option<String>,
    pub price_cents: i64,
    #[serde(default)]
    pub cost_cents: i64,
    #[serde(default)]
    pub stock: i64,
    pub min_stock: Option<i64>,
}

// =============================================================================
// Customer
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    /// CPF or CNPJ.
    pub document: Option<String>,
    pub address: Option<String>,
    pub neighborhood: Option<String>,
    pub complement: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CustomerInput {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub document: Option<String>,
    pub address: Option<String>,
    pub neighborhood: Option<String>,
    pub complement: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
}

// =============================================================================
// Supplier & Purchases
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Supplier {
    pub id: String,
    pub name: String,
    pub company_name: Option<String>,
    pub cnpj: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub contact_person: Option<String>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SupplierInput {
    pub name: String,
    pub company_name: Option<String>,
    pub cnpj: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub contact_person: Option<String>,
    pub notes: Option<String>,
}

/// Payment state of a supplier purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseStatus {
    Pending,
    Partial,
    Paid,
    Overdue,
}

impl PurchaseStatus {
    /// Status implied by how much of `total` has been paid.
    pub fn from_amounts(total_cents: i64, paid_cents: i64) -> Self {
        if paid_cents >= total_cents {
            PurchaseStatus::Paid
        } else if paid_cents > 0 {
            PurchaseStatus::Partial
        } else {
            PurchaseStatus::Pending
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SupplierPurchase {
    pub id: String,
    pub supplier_id: String,
    #[ts(as = "String")]
    pub purchase_date: NaiveDate,
    #[ts(as = "Option<String>")]
    pub due_date: Option<NaiveDate>,
    pub total_cents: i64,
    pub paid_cents: i64,
    pub status: PurchaseStatus,
    pub description: Option<String>,
    pub invoice_number: Option<String>,
    /// Items already added to stock.
    pub received: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl SupplierPurchase {
    pub fn remaining(&self) -> Money {
        Money::from_cents(self.total_cents - self.paid_cents).clamp_non_negative()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PurchaseItem {
    pub id: String,
    pub purchase_id: String,
    /// Catalog product this line restocks, if any.
    pub product_id: Option<String>,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub total_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PurchaseItemInput {
    pub product_id: Option<String>,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PurchaseInput {
    pub supplier_id: String,
    #[ts(as = "String")]
    pub purchase_date: NaiveDate,
    #[ts(as = "Option<String>")]
    pub due_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub invoice_number: Option<String>,
    pub items: Vec<PurchaseItemInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PurchaseWithItems {
    #[serde(flatten)]
    pub purchase: SupplierPurchase,
    pub items: Vec<PurchaseItem>,
}

// =============================================================================
// Sale
// =============================================================================

/// Sale lifecycle.
///
/// ```text
///   pendente ──► pago ──► cancelado
///      │                      ▲
///      └──────────────────────┘
/// ```
/// `cancelado` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum SaleStatus {
    Pago,
    Pendente,
    Cancelado,
}

impl SaleStatus {
    pub fn can_transition_to(self, next: SaleStatus) -> bool {
        use SaleStatus::*;
        matches!(
            (self, next),
            (Pendente, Pago) | (Pendente, Cancelado) | (Pago, Cancelado)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SaleStatus::Pago => "pago",
            SaleStatus::Pendente => "pendente",
            SaleStatus::Cancelado => "cancelado",
        }
    }
}

impl Default for SaleStatus {
    fn default() -> Self {
        SaleStatus::Pago
    }
}

impl fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the customer paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Dinheiro,
    Pix,
    Credito,
    Debito,
    Boleto,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 5] = [
        PaymentMethod::Dinheiro,
        PaymentMethod::Pix,
        PaymentMethod::Credito,
        PaymentMethod::Debito,
        PaymentMethod::Boleto,
    ];

    /// Only cash gives change.
    pub fn gives_change(self) -> bool {
        self == PaymentMethod::Dinheiro
    }

    /// Label shown on receipts and spreadsheets.
    pub fn label(self) -> &'static str {
        match self {
            PaymentMethod::Dinheiro => "Dinheiro",
            PaymentMethod::Pix => "PIX",
            PaymentMethod::Credito => "Cartão de Crédito",
            PaymentMethod::Debito => "Cartão de Débito",
            PaymentMethod::Boleto => "Boleto",
        }
    }
}

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Dinheiro
    }
}

/// A completed checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    /// Sequential, human-facing number ("Venda #42").
    pub sale_number: i64,
    /// Client-generated token; the same token never creates two sales.
    pub checkout_token: String,
    #[ts(as = "String")]
    pub sale_date: NaiveDate,
    pub customer_id: Option<String>,
    pub customer_name: String,
    pub payment_method: PaymentMethod,
    pub status: SaleStatus,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub profit_cents: i64,
    pub amount_paid_cents: i64,
    pub change_cents: i64,
    /// Budget this sale was converted from.
    pub budget_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Line item in a sale (immutable snapshot).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    /// `None` for manual (non-catalog) items.
    pub product_id: Option<String>,
    pub name_snapshot: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub unit_cost_cents: i64,
    pub line_total_cents: i64,
}

impl SaleItem {
    pub fn profit(&self) -> Money {
        Money::from_cents(self.unit_price_cents - self.unit_cost_cents).multiply_quantity(self.quantity)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleWithItems {
    #[serde(flatten)]
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}

// =============================================================================
// Stock Movement
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    Entrada,
    Saida,
}

impl MovementKind {
    pub fn label(self) -> &'static str {
        match self {
            MovementKind::Entrada => "Entrada",
            MovementKind::Saida => "Saída",
        }
    }
}

/// One change to a product's stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockMovement {
    pub id: String,
    pub product_id: String,
    pub product_name: String,
    pub kind: MovementKind,
    pub quantity: i64,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub reason: String,
    pub unit_cost_cents: Option<i64>,
    /// Sale that caused this movement, if any.
    pub sale_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Accounts & Cash Flow
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    Receivable,
    Payable,
}

/// Account lifecycle.
///
/// `pending → paid | overdue | cancelled`, `overdue → paid | cancelled`.
/// `paid` and `cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Pending,
    Paid,
    Overdue,
    Cancelled,
}

impl AccountStatus {
    pub fn can_transition_to(self, next: AccountStatus) -> bool {
        use AccountStatus::*;
        matches!(
            (self, next),
            (Pending, Paid)
                | (Pending, Overdue)
                | (Pending, Cancelled)
                | (Overdue, Paid)
                | (Overdue, Cancelled)
        )
    }

    pub fn is_open(self) -> bool {
        matches!(self, AccountStatus::Pending | AccountStatus::Overdue)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AccountStatus::Pending => "pending",
            AccountStatus::Paid => "paid",
            AccountStatus::Overdue => "overdue",
            AccountStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A receivable or payable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Account {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub kind: AccountKind,
    pub amount_cents: i64,
    #[ts(as = "String")]
    pub due_date: NaiveDate,
    #[ts(as = "Option<String>")]
    pub paid_date: Option<NaiveDate>,
    pub status: AccountStatus,
    pub category: String,
    pub customer_id: Option<String>,
    pub supplier_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AccountInput {
    pub title: String,
    pub description: Option<String>,
    pub kind: AccountKind,
    pub amount_cents: i64,
    #[ts(as = "String")]
    pub due_date: NaiveDate,
    #[serde(default)]
    pub category: String,
    pub customer_id: Option<String>,
    pub supplier_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum CashFlowKind {
    Income,
    Expense,
}

/// Money in or out of the business.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CashFlowEntry {
    pub id: String,
    pub description: String,
    pub kind: CashFlowKind,
    pub amount_cents: i64,
    pub category: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    /// Sale or account that produced this entry.
    pub reference_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CashFlowInput {
    pub description: String,
    pub kind: CashFlowKind,
    pub amount_cents: i64,
    #[serde(default)]
    pub category: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product(stock: i64, min_stock: Option<i64>) -> Product {
        Product {
            id: "p1".to_string(),
            name: "Moldura".to_string(),
            category: "Gesso".to_string(),
            description: None,
            barcode: None,
            price_cents: 2500,
            cost_cents: 1000,
            stock,
            min_stock,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_stock_flags() {
        assert!(product(0, None).is_out_of_stock());
        assert!(!product(0, None).is_low_stock());
        assert!(product(10, None).is_low_stock());
        assert!(!product(11, None).is_low_stock());
        assert!(product(3, Some(5)).is_low_stock());
        assert!(!product(6, Some(5)).is_low_stock());
    }

    #[test]
    fn test_stock_value() {
        assert_eq!(product(4, None).stock_value().cents(), 4000);
    }

    #[test]
    fn test_sale_status_transitions() {
        assert!(SaleStatus::Pendente.can_transition_to(SaleStatus::Pago));
        assert!(SaleStatus::Pago.can_transition_to(SaleStatus::Cancelado));
        assert!(!SaleStatus::Cancelado.can_transition_to(SaleStatus::Pago));
        assert!(!SaleStatus::Pago.can_transition_to(SaleStatus::Pendente));
        assert!(!SaleStatus::Pago.can_transition_to(SaleStatus::Pago));
    }

    #[test]
    fn test_account_status_transitions() {
        assert!(AccountStatus::Pending.can_transition_to(AccountStatus::Paid));
        assert!(AccountStatus::Overdue.can_transition_to(AccountStatus::Paid));
        assert!(!AccountStatus::Paid.can_transition_to(AccountStatus::Pending));
        assert!(!AccountStatus::Cancelled.can_transition_to(AccountStatus::Paid));
    }

    #[test]
    fn test_purchase_status_from_amounts() {
        assert_eq!(PurchaseStatus::from_amounts(1000, 0), PurchaseStatus::Pending);
        assert_eq!(PurchaseStatus::from_amounts(1000, 400), PurchaseStatus::Partial);
        assert_eq!(PurchaseStatus::from_amounts(1000, 1000), PurchaseStatus::Paid);
    }

    #[test]
    fn test_payment_method_serde() {
        let json = serde_json::to_string(&PaymentMethod::Credito).unwrap();
        assert_eq!(json, "\"credito\"");
        let parsed: SaleStatus = serde_json::from_str("\"cancelado\"").unwrap();
        assert_eq!(parsed, SaleStatus::Cancelado);
    }

    #[test]
    fn test_sale_item_profit() {
        let item = SaleItem {
            id: "i1".to_string(),
            sale_id: "s1".to_string(),
            product_id: None,
            name_snapshot: "Sanca".to_string(),
            quantity: 3,
            unit_price_cents: 1500,
            unit_cost_cents: 900,
            line_total_cents: 4500,
        };
        assert_eq!(item.profit().cents(), 1800);
    }
}
