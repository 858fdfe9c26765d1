//! # Spreadsheet Export
//!
//! CSV files that open cleanly in Excel with a pt-BR locale:
//! UTF-8 BOM, `;` separator, `1.234,56` amounts and `dd/mm/yyyy` dates.

use crate::budget::{Budget, BudgetStatus};
use crate::finance::Expense;
use crate::money::{calculate_percentage, format_date_br, format_decimal_br, Money};
use crate::types::{Product, Sale, StockMovement};

/// UTF-8 BOM so Excel detects the encoding (accents in names).
const BOM: &[u8] = b"\xEF\xBB\xBF";
/// Column separator (Excel pt-BR expects `;`).
const SEP: &str = ";";

fn escape_csv(value: &str) -> String {
    if value.contains(';') || value.contains('"') || value.contains('\n') || value.contains('\r') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn money_cell(cents: i64) -> String {
    format_decimal_br(Money::from_cents(cents))
}

fn or_na(value: Option<&str>) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or("N/A")
        .to_string()
}

/// Header plus rows, rendered with [`CsvTable::to_bytes`].
#[derive(Debug, Clone, Default)]
pub struct CsvTable {
    headers: Vec<&'static str>,
    rows: Vec<Vec<String>>,
}

impl CsvTable {
    pub fn new(headers: &[&'static str]) -> Self {
        CsvTable {
            headers: headers.to_vec(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(BOM.len() + 64 * (self.rows.len() + 1));
        out.extend_from_slice(BOM);
        out.extend_from_slice(self.headers.join(SEP).as_bytes());
        out.extend_from_slice(b"\r\n");
        for row in &self.rows {
            let line: Vec<String> = row.iter().map(|v| escape_csv(v)).collect();
            out.extend_from_slice(line.join(SEP).as_bytes());
            out.extend_from_slice(b"\r\n");
        }
        out
    }
}

pub fn sales_csv(sales: &[Sale]) -> CsvTable {
    let mut table = CsvTable::new(&[
        "Número",
        "Data",
        "Cliente",
        "Forma de Pagamento",
        "Status",
        "Subtotal",
        "Desconto",
        "Total",
        "Lucro",
        "Valor Pago",
        "Troco",
    ]);
    for s in sales {
        table.push(vec![
            s.sale_number.to_string(),
            format_date_br(s.sale_date),
            s.customer_name.clone(),
            s.payment_method.label().to_string(),
            s.status.as_str().to_uppercase(),
            money_cell(s.subtotal_cents),
            money_cell(s.discount_cents),
            money_cell(s.total_cents),
            money_cell(s.profit_cents),
            money_cell(s.amount_paid_cents),
            money_cell(s.change_cents),
        ]);
    }
    table
}

pub fn products_csv(products: &[Product]) -> CsvTable {
    let mut table = CsvTable::new(&[
        "Nome",
        "Categoria",
        "Código de Barras",
        "Preço",
        "Custo",
        "Estoque",
        "Estoque Mínimo",
        "Valor em Estoque",
    ]);
    for p in products {
        table.push(vec![
            p.name.clone(),
            p.category.clone(),
            or_na(p.barcode.as_deref()),
            money_cell(p.price_cents),
            money_cell(p.cost_cents),
            p.stock.to_string(),
            p.min_stock_or_default().to_string(),
            money_cell(p.stock_value().cents()),
        ]);
    }
    table
}

pub fn expenses_csv(expenses: &[Expense]) -> CsvTable {
    let mut table = CsvTable::new(&[
        "Data",
        "Categoria",
        "Descrição",
        "Valor",
        "Forma de Pagamento",
        "Fornecedor",
        "Data Vencimento",
        "Status",
        "Observações",
    ]);
    for e in expenses {
        table.push(vec![
            format_date_br(e.date),
            e.category.label().to_string(),
            e.description.clone(),
            money_cell(e.amount_cents),
            e.payment_method.label().to_string(),
            or_na(e.supplier.as_deref()),
            e.due_date.map(format_date_br).unwrap_or_else(|| "N/A".to_string()),
            e.status.label().to_string(),
            e.notes.clone().unwrap_or_default(),
        ]);
    }
    table
}

/// Only budgets that became sales.
pub fn sold_budgets_csv(budgets: &[Budget]) -> CsvTable {
    let mut table = CsvTable::new(&[
        "Orçamento",
        "Data",
        "Cliente",
        "Telefone",
        "CPF/CNPJ",
        "Endereço",
        "Valor Total",
        "Lucro",
        "Margem (%)",
        "Status",
    ]);
    for b in budgets.iter().filter(|b| b.status == BudgetStatus::Vendido) {
        table.push(vec![
            b.budget_number.clone(),
            format_date_br(b.date),
            b.customer.name.clone(),
            or_na(b.customer.phone.as_deref()),
            or_na(Some(b.customer.document.as_str())),
            or_na(b.customer.address.as_deref()),
            money_cell(b.total_cents),
            money_cell(b.profit_cents),
            format!("{}%", calculate_percentage(b.profit_cents, b.total_cents)),
            b.status.as_str().to_uppercase(),
        ]);
    }
    table
}

pub fn stock_movements_csv(movements: &[StockMovement]) -> CsvTable {
    let mut table = CsvTable::new(&["Data", "Produto", "Tipo", "Quantidade", "Custo Unitário", "Motivo"]);
    for m in movements {
        table.push(vec![
            format_date_br(m.date),
            m.product_name.clone(),
            m.kind.label().to_string(),
            m.quantity.to_string(),
            m.unit_cost_cents.map(money_cell).unwrap_or_default(),
            m.reason.clone(),
        ]);
    }
    table
}

/// `Relatorio_<name>_dd-mm-yyyy.csv`
pub fn export_file_name(name: &str, today: chrono::NaiveDate) -> String {
    format!("Relatorio_{}_{}.csv", name, today.format("%d-%m-%Y"))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PaymentMethod, SaleStatus};
    use chrono::{NaiveDate, Utc};

    fn text(table: &CsvTable) -> String {
        let bytes = table.to_bytes();
        assert!(bytes.starts_with(BOM));
        String::from_utf8(bytes[BOM.len()..].to_vec()).unwrap()
    }

    #[test]
    fn test_escape_csv() {
        assert_eq!(escape_csv("simples"), "simples");
        assert_eq!(escape_csv("a;b"), "\"a;b\"");
        assert_eq!(escape_csv("diz \"oi\""), "\"diz \"\"oi\"\"\"");
        assert_eq!(escape_csv("linha\nnova"), "\"linha\nnova\"");
    }

    #[test]
    fn test_sales_csv() {
        let sale = Sale {
            id: "s1".to_string(),
            sale_number: 7,
            checkout_token: "t".to_string(),
            sale_date: NaiveDate::from_ymd_opt(2024, 2, 3).unwrap(),
            customer_id: None,
            customer_name: "Silva; Irmãos".to_string(),
            payment_method: PaymentMethod::Credito,
            status: SaleStatus::Pago,
            subtotal_cents: 123_456,
            discount_cents: 0,
            total_cents: 123_456,
            profit_cents: 50_000,
            amount_paid_cents: 123_456,
            change_cents: 0,
            budget_id: None,
            created_at: Utc::now(),
        };
        let table = sales_csv(&[sale]);
        assert_eq!(table.row_count(), 1);

        let csv = text(&table);
        let mut lines = csv.lines();
        assert!(lines.next().unwrap().starts_with("Número;Data;Cliente"));
        assert_eq!(
            lines.next().unwrap(),
            "7;03/02/2024;\"Silva; Irmãos\";Cartão de Crédito;PAGO;1.234,56;0,00;1.234,56;500,00;1.234,56;0,00"
        );
    }

    #[test]
    fn test_empty_table_has_header_only() {
        let csv = text(&products_csv(&[]));
        assert_eq!(csv.lines().count(), 1);
    }

    #[test]
    fn test_export_file_name() {
        let today = NaiveDate::from_ymd_opt(2024, 7, 9).unwrap();
        assert_eq!(export_file_name("Vendas", today), "Relatorio_Vendas_09-07-2024.csv");
    }
}
