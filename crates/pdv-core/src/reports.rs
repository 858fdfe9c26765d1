//! # Reports
//!
//! Aggregations over already-loaded sales. Cancelled sales never count.
//!
//! ## Report Inputs
//! ```text
//! pdv-db loads ──► &[Sale] / &[SaleWithItems] / &[Product]
//!                          │
//!                          ▼
//!          dashboard · sales_by_payment · monthly_summary
//!          top_products · yearly_stats          (this module)
//!                          │
//!                          ▼
//!                  JSON for the browser charts
//! ```

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;

use crate::finance::FinancialSummary;
use crate::money::{calculate_percentage, Money};
use crate::stock::stock_summary;
use crate::types::{PaymentMethod, Product, Sale, SaleStatus, SaleWithItems};

fn counted(sales: &[Sale]) -> impl Iterator<Item = &Sale> {
    sales.iter().filter(|s| s.status != SaleStatus::Cancelado)
}

fn same_month(date: NaiveDate, other: NaiveDate) -> bool {
    date.year() == other.year() && date.month() == other.month()
}

fn average_ticket(revenue_cents: i64, count: usize) -> i64 {
    if count == 0 {
        return 0;
    }
    Money::from_cents(revenue_cents).divide_rounded(count as i64).cents()
}

// =============================================================================
// Dashboard
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Dashboard {
    pub today_sales_count: usize,
    pub today_revenue_cents: i64,
    pub month_sales_count: usize,
    pub month_revenue_cents: i64,
    pub month_profit_cents: i64,
    pub month_average_ticket_cents: i64,
    pub year_revenue_cents: i64,
    pub out_of_stock_count: usize,
    pub low_stock_count: usize,
    pub receivable_cents: i64,
    pub payable_cents: i64,
}

pub fn dashboard(
    sales: &[Sale],
    products: &[Product],
    financial: &FinancialSummary,
    today: NaiveDate,
) -> Dashboard {
    let mut d = Dashboard {
        today_sales_count: 0,
        today_revenue_cents: 0,
        month_sales_count: 0,
        month_revenue_cents: 0,
        month_profit_cents: 0,
        month_average_ticket_cents: 0,
        year_revenue_cents: 0,
        out_of_stock_count: 0,
        low_stock_count: 0,
        receivable_cents: financial.receivable_cents,
        payable_cents: financial.payable_cents,
    };

    for sale in counted(sales) {
        if sale.sale_date == today {
            d.today_sales_count += 1;
            d.today_revenue_cents += sale.total_cents;
        }
        if same_month(sale.sale_date, today) {
            d.month_sales_count += 1;
            d.month_revenue_cents += sale.total_cents;
            d.month_profit_cents += sale.profit_cents;
        }
        if sale.sale_date.year() == today.year() {
            d.year_revenue_cents += sale.total_cents;
        }
    }
    d.month_average_ticket_cents = average_ticket(d.month_revenue_cents, d.month_sales_count);

    let stock = stock_summary(products);
    d.out_of_stock_count = stock.out_of_stock;
    d.low_stock_count = stock.low_stock;
    d
}

// =============================================================================
// Payment Methods
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentMethodShare {
    pub method: PaymentMethod,
    pub label: String,
    pub count: usize,
    pub total_cents: i64,
    /// Share of revenue, whole percent.
    pub percent: i64,
}

/// Revenue per payment method, every method listed even when zero.
pub fn sales_by_payment(sales: &[Sale]) -> Vec<PaymentMethodShare> {
    let mut per_method: BTreeMap<PaymentMethod, (usize, i64)> =
        PaymentMethod::ALL.iter().map(|m| (*m, (0, 0))).collect();
    let mut grand_total = 0;

    for sale in counted(sales) {
        let entry = per_method.entry(sale.payment_method).or_insert((0, 0));
        entry.0 += 1;
        entry.1 += sale.total_cents;
        grand_total += sale.total_cents;
    }

    PaymentMethod::ALL
        .iter()
        .map(|m| {
            let (count, total) = per_method.get(m).copied().unwrap_or((0, 0));
            PaymentMethodShare {
                method: *m,
                label: m.label().to_string(),
                count,
                total_cents: total,
                percent: calculate_percentage(total, grand_total),
            }
        })
        .collect()
}

// =============================================================================
// Monthly & Yearly
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MonthlySummary {
    /// `YYYY-MM`.
    pub month: String,
    pub sale_count: usize,
    pub revenue_cents: i64,
    pub profit_cents: i64,
    pub by_method: BTreeMap<PaymentMethod, i64>,
}

/// The last `months` months that have sales, oldest first.
pub fn monthly_summary(sales: &[Sale], months: usize) -> Vec<MonthlySummary> {
    let mut map: BTreeMap<String, MonthlySummary> = BTreeMap::new();
    for sale in counted(sales) {
        let key = sale.sale_date.format("%Y-%m").to_string();
        let entry = map.entry(key.clone()).or_insert_with(|| MonthlySummary {
            month: key,
            sale_count: 0,
            revenue_cents: 0,
            profit_cents: 0,
            by_method: BTreeMap::new(),
        });
        entry.sale_count += 1;
        entry.revenue_cents += sale.total_cents;
        entry.profit_cents += sale.profit_cents;
        *entry.by_method.entry(sale.payment_method).or_insert(0) += sale.total_cents;
    }

    let all: Vec<MonthlySummary> = map.into_values().collect();
    let skip = all.len().saturating_sub(months);
    all.into_iter().skip(skip).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct YearlyStats {
    pub year: i32,
    pub sale_count: usize,
    pub revenue_cents: i64,
    pub profit_cents: i64,
    /// Average ticket of the current month.
    pub month_average_ticket_cents: i64,
}

pub fn yearly_stats(sales: &[Sale], today: NaiveDate) -> YearlyStats {
    let mut stats = YearlyStats {
        year: today.year(),
        sale_count: 0,
        revenue_cents: 0,
        profit_cents: 0,
        month_average_ticket_cents: 0,
    };
    let (mut month_revenue, mut month_count) = (0, 0);
    for sale in counted(sales).filter(|s| s.sale_date.year() == today.year()) {
        stats.sale_count += 1;
        stats.revenue_cents += sale.total_cents;
        stats.profit_cents += sale.profit_cents;
        if sale.sale_date.month() == today.month() {
            month_revenue += sale.total_cents;
            month_count += 1;
        }
    }
    stats.month_average_ticket_cents = average_ticket(month_revenue, month_count);
    stats
}

// =============================================================================
// Products
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductPerformance {
    pub name: String,
    pub quantity: i64,
    pub revenue_cents: i64,
    pub profit_cents: i64,
    /// Share of item revenue, whole percent.
    pub percent: i64,
}

/// Best sellers by revenue. Items are grouped by their snapshot name.
pub fn top_products(sales: &[SaleWithItems], limit: usize) -> Vec<ProductPerformance> {
    let mut map: BTreeMap<String, ProductPerformance> = BTreeMap::new();
    let mut grand_total = 0;

    for entry in sales.iter().filter(|s| s.sale.status != SaleStatus::Cancelado) {
        for item in &entry.items {
            let perf = map
                .entry(item.name_snapshot.clone())
                .or_insert_with(|| ProductPerformance {
                    name: item.name_snapshot.clone(),
                    quantity: 0,
                    revenue_cents: 0,
                    profit_cents: 0,
                    percent: 0,
                });
            perf.quantity += item.quantity;
            perf.revenue_cents += item.line_total_cents;
            perf.profit_cents += item.profit().cents();
            grand_total += item.line_total_cents;
        }
    }

    let mut ranked: Vec<ProductPerformance> = map.into_values().collect();
    ranked.sort_by(|a, b| {
        b.revenue_cents
            .cmp(&a.revenue_cents)
            .then_with(|| a.name.cmp(&b.name))
    });
    ranked.truncate(limit);
    for p in &mut ranked {
        p.percent = calculate_percentage(p.revenue_cents, grand_total);
    }
    ranked
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SaleItem;
    use chrono::Utc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sale(n: i64, d: NaiveDate, method: PaymentMethod, total: i64, profit: i64) -> Sale {
        Sale {
            id: format!("s{}", n),
            sale_number: n,
            checkout_token: format!("t{}", n),
            sale_date: d,
            customer_id: None,
            customer_name: "Cliente Avulso".to_string(),
            payment_method: method,
            status: SaleStatus::Pago,
            subtotal_cents: total,
            discount_cents: 0,
            total_cents: total,
            profit_cents: profit,
            amount_paid_cents: total,
            change_cents: 0,
            budget_id: None,
            created_at: Utc::now(),
        }
    }

    fn item(sale_id: &str, name: &str, qty: i64, price: i64, cost: i64) -> SaleItem {
        SaleItem {
            id: format!("{}-{}", sale_id, name),
            sale_id: sale_id.to_string(),
            product_id: None,
            name_snapshot: name.to_string(),
            quantity: qty,
            unit_price_cents: price,
            unit_cost_cents: cost,
            line_total_cents: qty * price,
        }
    }

    #[test]
    fn test_dashboard_excludes_cancelled() {
        let today = date(2024, 5, 10);
        let mut cancelled = sale(3, today, PaymentMethod::Pix, 9_999, 100);
        cancelled.status = SaleStatus::Cancelado;
        let sales = vec![
            sale(1, today, PaymentMethod::Dinheiro, 1000, 400),
            sale(2, date(2024, 5, 2), PaymentMethod::Pix, 2000, 800),
            cancelled,
            sale(4, date(2024, 1, 2), PaymentMethod::Pix, 5000, 800),
        ];
        let financial = FinancialSummary {
            receivable_cents: 300,
            payable_cents: 200,
            overdue_count: 0,
            month_income_cents: 0,
            month_expense_cents: 0,
            month_balance_cents: 0,
        };
        let d = dashboard(&sales, &[], &financial, today);
        assert_eq!(d.today_sales_count, 1);
        assert_eq!(d.today_revenue_cents, 1000);
        assert_eq!(d.month_revenue_cents, 3000);
        assert_eq!(d.month_profit_cents, 1200);
        assert_eq!(d.month_average_ticket_cents, 1500);
        assert_eq!(d.year_revenue_cents, 8000);
        assert_eq!(d.receivable_cents, 300);
    }

    #[test]
    fn test_sales_by_payment_percentages() {
        let d = date(2024, 5, 10);
        let sales = vec![
            sale(1, d, PaymentMethod::Dinheiro, 1000, 0),
            sale(2, d, PaymentMethod::Pix, 2000, 0),
        ];
        let shares = sales_by_payment(&sales);
        assert_eq!(shares.len(), PaymentMethod::ALL.len());
        let pix = shares.iter().find(|s| s.method == PaymentMethod::Pix).unwrap();
        assert_eq!(pix.percent, 67);
        let cash = shares.iter().find(|s| s.method == PaymentMethod::Dinheiro).unwrap();
        assert_eq!(cash.percent, 33);
        let boleto = shares.iter().find(|s| s.method == PaymentMethod::Boleto).unwrap();
        assert_eq!(boleto.count, 0);
        assert_eq!(boleto.percent, 0);
    }

    #[test]
    fn test_monthly_summary_keeps_last_months() {
        let sales: Vec<Sale> = (1..=8)
            .map(|m| sale(m as i64, date(2024, m, 1), PaymentMethod::Pix, 100 * m as i64, 10))
            .collect();
        let months = monthly_summary(&sales, 6);
        assert_eq!(months.len(), 6);
        assert_eq!(months[0].month, "2024-03");
        assert_eq!(months[5].month, "2024-08");
        assert_eq!(months[5].by_method[&PaymentMethod::Pix], 800);
    }

    #[test]
    fn test_yearly_stats() {
        let today = date(2024, 5, 10);
        let sales = vec![
            sale(1, date(2024, 5, 1), PaymentMethod::Pix, 1000, 100),
            sale(2, date(2024, 5, 2), PaymentMethod::Pix, 2001, 100),
            sale(3, date(2024, 2, 2), PaymentMethod::Pix, 3000, 100),
            sale(4, date(2023, 5, 2), PaymentMethod::Pix, 9000, 100),
        ];
        let stats = yearly_stats(&sales, today);
        assert_eq!(stats.sale_count, 3);
        assert_eq!(stats.revenue_cents, 6001);
        // (1000 + 2001) / 2 = 1500.5 → 1501
        assert_eq!(stats.month_average_ticket_cents, 1501);
    }

    #[test]
    fn test_top_products() {
        let d = date(2024, 5, 10);
        let sales = vec![
            SaleWithItems {
                sale: sale(1, d, PaymentMethod::Pix, 0, 0),
                items: vec![item("s1", "Sanca", 2, 5000, 2000), item("s1", "Roseta", 10, 300, 100)],
            },
            SaleWithItems {
                sale: sale(2, d, PaymentMethod::Pix, 0, 0),
                items: vec![item("s2", "Roseta", 5, 300, 100)],
            },
        ];
        let top = top_products(&sales, 5);
        assert_eq!(top[0].name, "Sanca");
        assert_eq!(top[0].revenue_cents, 10_000);
        assert_eq!(top[1].name, "Roseta");
        assert_eq!(top[1].quantity, 15);
        assert_eq!(top[1].profit_cents, 3000);
        assert_eq!(top[0].percent, 69);

        assert_eq!(top_products(&sales, 1).len(), 1);
    }
}
