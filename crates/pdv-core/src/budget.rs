//! # Budgets (Orçamentos)
//!
//! Quotes handed to a customer, which may later become an order and
//! finally a sale.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   orcamento ──► pedido ──► aprovado ──► vendido                        │
//! │       │           │  ▲        │  │          ▲                           │
//! │       │           │  └────────┘  │          │                           │
//! │       │           ▼              ▼          │                           │
//! │       └──────► rejeitado ◄───────┘          │                           │
//! │       └─────────────────────────────────────┘  (direct sale)           │
//! │                                                                         │
//! │   rejeitado and vendido are terminal                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Converting to a sale goes through the normal checkout transaction, so a
//! budget can never be sold twice or sold without stock.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;
use uuid::Uuid;

use crate::cart::{initial_sale_status, CheckoutLine, CheckoutRequest, Discount, SaleTotals};
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::{calculate_percentage, Money};
use crate::types::PaymentMethod;
use crate::validation::{
    validate_cents, validate_optional_text, validate_positive_cents, validate_quantity,
    validate_required_text,
};
use crate::{DEFAULT_BUDGET_VALIDITY_DAYS, MAX_CART_ITEMS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum BudgetStatus {
    Orcamento,
    Pedido,
    Aprovado,
    Rejeitado,
    Vendido,
}

impl BudgetStatus {
    pub fn can_transition_to(self, next: BudgetStatus) -> bool {
        use BudgetStatus::*;
        match self {
            Orcamento => matches!(next, Pedido | Aprovado | Rejeitado | Vendido),
            Pedido => matches!(next, Aprovado | Rejeitado | Vendido),
            Aprovado => matches!(next, Pedido | Rejeitado | Vendido),
            Rejeitado | Vendido => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BudgetStatus::Orcamento => "orcamento",
            BudgetStatus::Pedido => "pedido",
            BudgetStatus::Aprovado => "aprovado",
            BudgetStatus::Rejeitado => "rejeitado",
            BudgetStatus::Vendido => "vendido",
        }
    }
}

impl fmt::Display for BudgetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CustomerKind {
    PessoaFisica,
    PessoaJuridica,
}

impl Default for CustomerKind {
    fn default() -> Self {
        CustomerKind::PessoaFisica
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BudgetCustomer {
    pub name: String,
    /// CPF for pessoa física, CNPJ for pessoa jurídica.
    pub document: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub kind: CustomerKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BudgetItem {
    pub product_id: Option<String>,
    pub name: String,
    pub quantity: i64,
    /// Unit of measure printed on the quote ("un", "m²", "saco").
    pub unit: String,
    pub unit_price_cents: i64,
    pub unit_cost_cents: i64,
    pub subtotal_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Budget {
    pub id: String,
    /// Four-digit sequential number ("0042").
    pub budget_number: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    #[ts(as = "String")]
    pub valid_until: NaiveDate,
    #[ts(as = "Option<String>")]
    pub delivery_date: Option<NaiveDate>,
    pub customer: BudgetCustomer,
    pub items: Vec<BudgetItem>,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub profit_cents: i64,
    pub payment_terms: Option<String>,
    pub observations: Option<String>,
    pub status: BudgetStatus,
    /// Sale created when the budget was sold.
    pub sale_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BudgetItemInput {
    pub product_id: Option<String>,
    pub name: String,
    pub quantity: i64,
    #[serde(default = "default_unit")]
    pub unit: String,
    pub unit_price_cents: i64,
    #[serde(default)]
    pub unit_cost_cents: i64,
}

fn default_unit() -> String {
    "un".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BudgetInput {
    #[ts(as = "Option<String>")]
    pub date: Option<NaiveDate>,
    #[ts(as = "Option<String>")]
    pub valid_until: Option<NaiveDate>,
    #[ts(as = "Option<String>")]
    pub delivery_date: Option<NaiveDate>,
    pub customer: BudgetCustomer,
    pub items: Vec<BudgetItemInput>,
    #[serde(default)]
    pub discount: Discount,
    pub payment_terms: Option<String>,
    pub observations: Option<String>,
}

/// Next four-digit budget number after the highest one in `existing`.
///
/// ```rust
/// use pdv_core::budget::next_budget_number;
///
/// assert_eq!(next_budget_number(&[]), "0001");
/// ```
pub fn next_budget_number(existing: &[Budget]) -> String {
    let highest = existing
        .iter()
        .filter_map(|b| b.budget_number.parse::<u32>().ok())
        .max()
        .unwrap_or(0);
    format!("{:04}", highest + 1)
}

impl Budget {
    /// Builds a new budget in `orcamento` status.
    ///
    /// `validity_days` applies when the input has no `valid_until`.
    pub fn build(
        input: BudgetInput,
        budget_number: String,
        today: NaiveDate,
        validity_days: i64,
    ) -> CoreResult<Budget> {
        validate_required_text("customer.name", &input.customer.name, 200)?;
        validate_required_text("customer.document", &input.customer.document, 30)?;
        validate_optional_text("observations", input.observations.as_deref(), 2000)?;
        if input.items.is_empty() {
            return Err(ValidationError::required("items").into());
        }
        if input.items.len() > MAX_CART_ITEMS {
            return Err(CoreError::CartTooLarge { max: MAX_CART_ITEMS });
        }
        for item in &input.items {
            validate_required_text("name", &item.name, 200)?;
            validate_quantity(item.quantity)?;
            validate_positive_cents("unit_price_cents", item.unit_price_cents)?;
            validate_cents("unit_cost_cents", item.unit_cost_cents)?;
        }
        input.discount.validate()?;

        let date = input.date.unwrap_or(today);
        let valid_until = input.valid_until.unwrap_or_else(|| {
            let days = if validity_days > 0 { validity_days } else { DEFAULT_BUDGET_VALIDITY_DAYS };
            date + Duration::days(days)
        });
        if valid_until < date {
            return Err(ValidationError::InvalidFormat {
                field: "valid_until".to_string(),
                reason: "must not be before the budget date".to_string(),
            }
            .into());
        }

        let totals = SaleTotals::compute(
            input
                .items
                .iter()
                .map(|i| (i.quantity, i.unit_price_cents, i.unit_cost_cents)),
            input.discount,
        );

        let items = input
            .items
            .into_iter()
            .map(|i| BudgetItem {
                subtotal_cents: Money::from_cents(i.unit_price_cents).multiply_quantity(i.quantity).cents(),
                product_id: i.product_id,
                name: i.name.trim().to_string(),
                quantity: i.quantity,
                unit: i.unit,
                unit_price_cents: i.unit_price_cents,
                unit_cost_cents: i.unit_cost_cents,
            })
            .collect();

        Ok(Budget {
            id: Uuid::new_v4().to_string(),
            budget_number,
            date,
            valid_until,
            delivery_date: input.delivery_date,
            customer: input.customer,
            items,
            subtotal_cents: totals.subtotal_cents,
            discount_cents: totals.discount_cents,
            total_cents: totals.total_cents,
            profit_cents: totals.profit_cents,
            payment_terms: input.payment_terms,
            observations: input.observations,
            status: BudgetStatus::Orcamento,
            sale_id: None,
            created_at: Utc::now(),
        })
    }

    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.valid_until < today
    }

    /// Profit margin as a whole percentage of the total.
    pub fn margin_percent(&self) -> i64 {
        calculate_percentage(self.profit_cents, self.total_cents)
    }

    /// Moves to `next` if the lifecycle allows it.
    pub fn transition(&mut self, next: BudgetStatus) -> CoreResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(CoreError::transition("budget", self.status, next));
        }
        self.status = next;
        Ok(())
    }

    /// Builds the checkout for selling this budget.
    ///
    /// ## Errors
    /// - `InvalidStatusTransition` when the budget cannot become `vendido`
    /// - `BudgetExpired` once `valid_until` has passed
    pub fn to_checkout(
        &self,
        checkout_token: &str,
        payment_method: PaymentMethod,
        amount_paid_cents: Option<i64>,
        today: NaiveDate,
    ) -> CoreResult<CheckoutRequest> {
        if !self.status.can_transition_to(BudgetStatus::Vendido) {
            return Err(CoreError::transition("budget", self.status, BudgetStatus::Vendido));
        }
        if self.is_expired(today) {
            return Err(CoreError::BudgetExpired {
                number: self.budget_number.clone(),
                valid_until: self.valid_until.to_string(),
            });
        }

        let request = CheckoutRequest {
            checkout_token: checkout_token.to_string(),
            sale_date: today,
            customer_id: None,
            customer_name: self.customer.name.clone(),
            payment_method,
            status: initial_sale_status(payment_method),
            lines: self
                .items
                .iter()
                .map(|i| CheckoutLine {
                    product_id: i.product_id.clone(),
                    name: i.name.clone(),
                    quantity: i.quantity,
                    unit_price_cents: i.unit_price_cents,
                    unit_cost_cents: i.unit_cost_cents,
                })
                .collect(),
            discount: Discount::Amount(self.discount_cents),
            amount_paid_cents: amount_paid_cents.unwrap_or(self.total_cents),
            budget_id: Some(self.id.clone()),
        };
        request.validate()?;
        Ok(request)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn input() -> BudgetInput {
        BudgetInput {
            date: None,
            valid_until: None,
            delivery_date: None,
            customer: BudgetCustomer {
                name: "Construtora Alfa".to_string(),
                document: "11.222.333/0001-81".to_string(),
                address: None,
                city: Some("Goiânia".to_string()),
                phone: None,
                kind: CustomerKind::PessoaJuridica,
            },
            items: vec![
                BudgetItemInput {
                    product_id: Some("p1".to_string()),
                    name: "Placa 60x60".to_string(),
                    quantity: 10,
                    unit: "un".to_string(),
                    unit_price_cents: 1200,
                    unit_cost_cents: 700,
                },
                BudgetItemInput {
                    product_id: None,
                    name: "Mão de obra".to_string(),
                    quantity: 1,
                    unit: "serv".to_string(),
                    unit_price_cents: 20000,
                    unit_cost_cents: 0,
                },
            ],
            discount: Discount::Amount(2000),
            payment_terms: Some("50% entrada".to_string()),
            observations: None,
        }
    }

    #[test]
    fn test_build_totals_and_default_validity() {
        let budget = Budget::build(input(), "0001".to_string(), today(), 15).unwrap();
        assert_eq!(budget.subtotal_cents, 32000);
        assert_eq!(budget.discount_cents, 2000);
        assert_eq!(budget.total_cents, 30000);
        // 10 × 500 + 20000 − 2000
        assert_eq!(budget.profit_cents, 23000);
        assert_eq!(budget.valid_until, NaiveDate::from_ymd_opt(2024, 6, 16).unwrap());
        assert_eq!(budget.status, BudgetStatus::Orcamento);
        assert_eq!(budget.items[0].subtotal_cents, 12000);
    }

    #[test]
    fn test_build_requires_customer_and_items() {
        let mut bad = input();
        bad.customer.document = String::new();
        assert!(Budget::build(bad, "0001".to_string(), today(), 15).is_err());

        let mut bad = input();
        bad.items.clear();
        assert!(Budget::build(bad, "0001".to_string(), today(), 15).is_err());
    }

    #[test]
    fn test_next_budget_number() {
        let mut a = Budget::build(input(), "0009".to_string(), today(), 15).unwrap();
        assert_eq!(next_budget_number(std::slice::from_ref(&a)), "0010");
        a.budget_number = "legacy".to_string();
        assert_eq!(next_budget_number(&[a]), "0001");
    }

    #[test]
    fn test_transitions() {
        let mut budget = Budget::build(input(), "0001".to_string(), today(), 15).unwrap();
        budget.transition(BudgetStatus::Pedido).unwrap();
        budget.transition(BudgetStatus::Aprovado).unwrap();
        budget.transition(BudgetStatus::Vendido).unwrap();

        let err = budget.transition(BudgetStatus::Orcamento).unwrap_err();
        assert!(matches!(err, CoreError::InvalidStatusTransition { .. }));
        assert!(!BudgetStatus::Rejeitado.can_transition_to(BudgetStatus::Pedido));
        assert!(!BudgetStatus::Pedido.can_transition_to(BudgetStatus::Orcamento));
    }

    #[test]
    fn test_to_checkout() {
        let budget = Budget::build(input(), "0001".to_string(), today(), 15).unwrap();
        let request = budget
            .to_checkout("tok", PaymentMethod::Pix, None, today())
            .unwrap();
        assert_eq!(request.budget_id.as_deref(), Some(budget.id.as_str()));
        assert_eq!(request.totals().total_cents, budget.total_cents);
        assert_eq!(request.totals().profit_cents, budget.profit_cents);
        assert_eq!(request.customer_name, "Construtora Alfa");
    }

    #[test]
    fn test_expired_or_sold_budget_cannot_be_converted() {
        let mut budget = Budget::build(input(), "0001".to_string(), today(), 15).unwrap();
        let later = today() + Duration::days(30);
        assert!(matches!(
            budget.to_checkout("tok", PaymentMethod::Pix, None, later),
            Err(CoreError::BudgetExpired { .. })
        ));

        budget.status = BudgetStatus::Vendido;
        assert!(matches!(
            budget.to_checkout("tok", PaymentMethod::Pix, None, today()),
            Err(CoreError::InvalidStatusTransition { .. })
        ));
    }

    #[test]
    fn test_margin() {
        let budget = Budget::build(input(), "0001".to_string(), today(), 15).unwrap();
        // 23000 / 30000 = 76.67%
        assert_eq!(budget.margin_percent(), 77);
    }
}
