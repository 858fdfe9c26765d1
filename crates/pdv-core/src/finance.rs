//! # Finance
//!
//! Expenses, cash withdrawals and the rules shared by accounts
//! (receivables/payables) and the cash flow.
//!
//! Expenses and withdrawals are whole-collection documents in the local
//! store; accounts and cash-flow entries are rows. Both kinds of record
//! meet here so the financial summary can be computed in one place.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Account, AccountKind, AccountStatus, CashFlowEntry, CashFlowKind, PaymentMethod};
use crate::validation::{validate_optional_text, validate_positive_cents, validate_required_text};

// =============================================================================
// Expenses
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseCategory {
    Aluguel,
    Agua,
    Luz,
    Internet,
    Telefone,
    Funcionarios,
    Material,
    Combustivel,
    Manutencao,
    Marketing,
    Contabilidade,
    Impostos,
    Outros,
}

impl ExpenseCategory {
    pub fn label(self) -> &'static str {
        match self {
            ExpenseCategory::Aluguel => "Aluguel",
            ExpenseCategory::Agua => "Água",
            ExpenseCategory::Luz => "Energia Elétrica",
            ExpenseCategory::Internet => "Internet",
            ExpenseCategory::Telefone => "Telefone",
            ExpenseCategory::Funcionarios => "Funcionários",
            ExpenseCategory::Material => "Material",
            ExpenseCategory::Combustivel => "Combustível",
            ExpenseCategory::Manutencao => "Manutenção",
            ExpenseCategory::Marketing => "Marketing",
            ExpenseCategory::Contabilidade => "Contabilidade",
            ExpenseCategory::Impostos => "Impostos",
            ExpenseCategory::Outros => "Outros",
        }
    }
}

/// Expense lifecycle: `pendente → pago | vencido`, `vencido → pago`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseStatus {
    Pago,
    Pendente,
    Vencido,
}

impl ExpenseStatus {
    pub fn can_transition_to(self, next: ExpenseStatus) -> bool {
        use ExpenseStatus::*;
        matches!((self, next), (Pendente, Pago) | (Pendente, Vencido) | (Vencido, Pago))
    }

    pub fn label(self) -> &'static str {
        match self {
            ExpenseStatus::Pago => "Pago",
            ExpenseStatus::Pendente => "Pendente",
            ExpenseStatus::Vencido => "Vencido",
        }
    }
}

impl fmt::Display for ExpenseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExpenseStatus::Pago => "pago",
            ExpenseStatus::Pendente => "pendente",
            ExpenseStatus::Vencido => "vencido",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Expense {
    pub id: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub category: ExpenseCategory,
    pub description: String,
    pub amount_cents: i64,
    pub payment_method: PaymentMethod,
    pub supplier: Option<String>,
    #[ts(as = "Option<String>")]
    pub due_date: Option<NaiveDate>,
    pub status: ExpenseStatus,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ExpenseInput {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub category: ExpenseCategory,
    pub description: String,
    pub amount_cents: i64,
    pub payment_method: PaymentMethod,
    pub supplier: Option<String>,
    #[ts(as = "Option<String>")]
    pub due_date: Option<NaiveDate>,
    pub status: ExpenseStatus,
    pub notes: Option<String>,
}

fn validate_expense(input: &ExpenseInput) -> CoreResult<()> {
    validate_required_text("description", &input.description, 300)?;
    validate_positive_cents("amount_cents", input.amount_cents)?;
    validate_optional_text("notes", input.notes.as_deref(), 1000)?;
    Ok(())
}

impl Expense {
    pub fn create(input: ExpenseInput) -> CoreResult<Expense> {
        validate_expense(&input)?;
        Ok(Expense {
            id: Uuid::new_v4().to_string(),
            date: input.date,
            category: input.category,
            description: input.description.trim().to_string(),
            amount_cents: input.amount_cents,
            payment_method: input.payment_method,
            supplier: input.supplier,
            due_date: input.due_date,
            status: input.status,
            notes: input.notes,
        })
    }

    /// Replaces the editable fields. A status change must follow the
    /// lifecycle; keeping the same status is always allowed.
    pub fn apply_update(&mut self, input: ExpenseInput) -> CoreResult<()> {
        validate_expense(&input)?;
        if input.status != self.status && !self.status.can_transition_to(input.status) {
            return Err(CoreError::transition("expense", self.status, input.status));
        }
        self.date = input.date;
        self.category = input.category;
        self.description = input.description.trim().to_string();
        self.amount_cents = input.amount_cents;
        self.payment_method = input.payment_method;
        self.supplier = input.supplier;
        self.due_date = input.due_date;
        self.status = input.status;
        self.notes = input.notes;
        Ok(())
    }
}

/// Marks pending expenses whose due date has passed as `vencido`.
///
/// Returns how many changed.
pub fn refresh_overdue_expenses(expenses: &mut [Expense], today: NaiveDate) -> usize {
    let mut changed = 0;
    for e in expenses.iter_mut() {
        if e.status == ExpenseStatus::Pendente && e.due_date.is_some_and(|d| d < today) {
            e.status = ExpenseStatus::Vencido;
            changed += 1;
        }
    }
    changed
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ExpenseSummary {
    pub total_cents: i64,
    pub paid_cents: i64,
    pub pending_cents: i64,
    pub pending_count: usize,
    pub overdue_count: usize,
    pub by_category: BTreeMap<ExpenseCategory, i64>,
}

pub fn expense_summary(expenses: &[Expense]) -> ExpenseSummary {
    let mut summary = ExpenseSummary {
        total_cents: 0,
        paid_cents: 0,
        pending_cents: 0,
        pending_count: 0,
        overdue_count: 0,
        by_category: BTreeMap::new(),
    };
    for e in expenses {
        summary.total_cents += e.amount_cents;
        *summary.by_category.entry(e.category).or_insert(0) += e.amount_cents;
        match e.status {
            ExpenseStatus::Pago => summary.paid_cents += e.amount_cents,
            ExpenseStatus::Pendente => {
                summary.pending_cents += e.amount_cents;
                summary.pending_count += 1;
            }
            ExpenseStatus::Vencido => {
                summary.pending_cents += e.amount_cents;
                summary.overdue_count += 1;
            }
        }
    }
    summary
}

// =============================================================================
// Withdrawals (sangria)
// =============================================================================

/// Cash taken out of the register.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Withdrawal {
    pub id: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub amount_cents: i64,
    pub note: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct WithdrawalInput {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub amount_cents: i64,
    pub note: Option<String>,
}

impl Withdrawal {
    pub fn create(input: WithdrawalInput) -> CoreResult<Withdrawal> {
        validate_positive_cents("amount_cents", input.amount_cents)?;
        validate_optional_text("note", input.note.as_deref(), 300)?;
        Ok(Withdrawal {
            id: Uuid::new_v4().to_string(),
            date: input.date,
            amount_cents: input.amount_cents,
            note: input.note,
            created_at: Utc::now(),
        })
    }
}

pub fn withdrawals_total(withdrawals: &[Withdrawal]) -> Money {
    withdrawals.iter().map(|w| Money::from_cents(w.amount_cents)).sum()
}

// =============================================================================
// Accounts
// =============================================================================

/// Checks that `account` may be paid and returns the cash-flow kind that
/// settling it produces.
pub fn settlement_kind(account: &Account) -> CoreResult<CashFlowKind> {
    if !account.status.can_transition_to(AccountStatus::Paid) {
        return Err(CoreError::transition("account", account.status, AccountStatus::Paid));
    }
    Ok(match account.kind {
        AccountKind::Receivable => CashFlowKind::Income,
        AccountKind::Payable => CashFlowKind::Expense,
    })
}

/// Accounts still open whose due date has passed.
pub fn overdue_account_ids(accounts: &[Account], today: NaiveDate) -> Vec<String> {
    accounts
        .iter()
        .filter(|a| a.status == AccountStatus::Pending && a.due_date < today)
        .map(|a| a.id.clone())
        .collect()
}

// =============================================================================
// Financial Summary
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FinancialSummary {
    /// Open receivables (pending + overdue).
    pub receivable_cents: i64,
    /// Open payables (pending + overdue).
    pub payable_cents: i64,
    pub overdue_count: usize,
    pub month_income_cents: i64,
    pub month_expense_cents: i64,
    /// Month income − month expense.
    pub month_balance_cents: i64,
}

/// Summarises accounts and the cash flow for the month containing `today`.
pub fn financial_summary(
    accounts: &[Account],
    cash_flow: &[CashFlowEntry],
    today: NaiveDate,
) -> FinancialSummary {
    let mut summary = FinancialSummary {
        receivable_cents: 0,
        payable_cents: 0,
        overdue_count: 0,
        month_income_cents: 0,
        month_expense_cents: 0,
        month_balance_cents: 0,
    };

    for a in accounts.iter().filter(|a| a.status.is_open()) {
        match a.kind {
            AccountKind::Receivable => summary.receivable_cents += a.amount_cents,
            AccountKind::Payable => summary.payable_cents += a.amount_cents,
        }
        if a.status == AccountStatus::Overdue || a.due_date < today {
            summary.overdue_count += 1;
        }
    }

    for entry in cash_flow
        .iter()
        .filter(|e| e.date.year() == today.year() && e.date.month() == today.month())
    {
        match entry.kind {
            CashFlowKind::Income => summary.month_income_cents += entry.amount_cents,
            CashFlowKind::Expense => summary.month_expense_cents += entry.amount_cents,
        }
    }
    summary.month_balance_cents = summary.month_income_cents - summary.month_expense_cents;
    summary
}

// =============================================================================
// Unit Tests
// =============================================================================
