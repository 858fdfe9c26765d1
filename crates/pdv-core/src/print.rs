//! # Print Documents
//!
//! Self-contained HTML pages for the browser's print dialog: the sale
//! receipt and the budget (orçamento). Every piece of user-supplied text is
//! HTML-escaped before it is interpolated.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use ts_rs::TS;

use crate::budget::{Budget, CustomerKind};
use crate::money::{format_date_br, Money};
use crate::types::SaleWithItems;

/// Header printed on receipts and budgets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CompanyInfo {
    pub name: String,
    /// CNPJ.
    pub document: String,
    pub address: String,
    pub phone: String,
    pub email: String,
}

impl Default for CompanyInfo {
    fn default() -> Self {
        CompanyInfo {
            name: "Minha Empresa".to_string(),
            document: String::new(),
            address: String::new(),
            phone: String::new(),
            email: String::new(),
        }
    }
}

/// Escapes `& < > " '`.
pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

const STYLE: &str = "\
* { margin: 0; padding: 0; box-sizing: border-box; }
body { font-family: Arial, sans-serif; font-size: 11px; line-height: 1.3; color: #000; padding: 20px; }
.header { border: 2px solid #000; padding: 15px; }
.company-name { font-size: 18px; font-weight: bold; margin-bottom: 8px; }
.company-details { font-size: 10px; color: #333; }
.section { border: 1px solid #000; border-top: none; padding: 10px 15px; }
.section-title { font-weight: bold; margin-bottom: 4px; }
table { width: 100%; border-collapse: collapse; }
th, td { border: 1px solid #000; padding: 4px 6px; text-align: left; }
td.num, th.num { text-align: right; }
.totals td { font-weight: bold; }
@media print { body { padding: 0; } }
";

fn open_document(out: &mut String, title: &str, company: &CompanyInfo) {
    let _ = write!(
        out,
        "<!DOCTYPE html><html lang=\"pt-BR\"><head><meta charset=\"UTF-8\"><title>{}</title><style>{}</style></head><body>",
        escape_html(title),
        STYLE
    );
    let _ = write!(
        out,
        "<div class=\"header\"><div class=\"company-name\">{}</div><div class=\"company-details\">",
        escape_html(&company.name)
    );
    for (label, value) in [
        ("CNPJ", &company.document),
        ("Endereço", &company.address),
        ("Telefone", &company.phone),
        ("E-mail", &company.email),
    ] {
        if !value.trim().is_empty() {
            let _ = write!(out, "<div>{}: {}</div>", label, escape_html(value));
        }
    }
    out.push_str("</div></div>");
}

fn close_document(out: &mut String) {
    out.push_str("</body></html>");
}

fn total_row(out: &mut String, label: &str, cents: i64) {
    let _ = write!(
        out,
        "<tr class=\"totals\"><td colspan=\"4\" class=\"num\">{}</td><td class=\"num\">{}</td></tr>",
        label,
        Money::from_cents(cents)
    );
}

/// Receipt for a finished sale.
pub fn sale_receipt_html(sale: &SaleWithItems, company: &CompanyInfo) -> String {
    let s = &sale.sale;
    let mut out = String::with_capacity(4096);
    open_document(&mut out, &format!("Venda #{} - {}", s.sale_number, company.name), company);

    let _ = write!(
        out,
        "<div class=\"section\"><div class=\"section-title\">VENDA #{}</div>\
         <div>Data: {}</div><div>Cliente: {}</div><div>Pagamento: {}</div><div>Status: {}</div></div>",
        s.sale_number,
        format_date_br(s.sale_date),
        escape_html(&s.customer_name),
        s.payment_method.label(),
        s.status.as_str().to_uppercase()
    );

    out.push_str(
        "<div class=\"section\"><table><thead><tr><th>Item</th><th class=\"num\">Qtd</th>\
         <th class=\"num\">Preço Unit.</th><th></th><th class=\"num\">Total</th></tr></thead><tbody>",
    );
    for item in &sale.items {
        let _ = write!(
            out,
            "<tr><td>{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td><td></td><td class=\"num\">{}</td></tr>",
            escape_html(&item.name_snapshot),
            item.quantity,
            Money::from_cents(item.unit_price_cents),
            Money::from_cents(item.line_total_cents)
        );
    }
    total_row(&mut out, "Subtotal", s.subtotal_cents);
    if s.discount_cents > 0 {
        total_row(&mut out, "Desconto", -s.discount_cents);
    }
    total_row(&mut out, "Total", s.total_cents);
    if s.payment_method.gives_change() {
        total_row(&mut out, "Valor Pago", s.amount_paid_cents);
        total_row(&mut out, "Troco", s.change_cents);
    }
    out.push_str("</tbody></table></div>");
    out.push_str("<div class=\"section\">Obrigado pela preferência!</div>");
    close_document(&mut out);
    out
}

/// Printable budget (orçamento).
pub fn budget_html(budget: &Budget, company: &CompanyInfo, today: NaiveDate) -> String {
    let mut out = String::with_capacity(6144);
    open_document(
        &mut out,
        &format!("Orçamento {} - {}", budget.budget_number, company.name),
        company,
    );

    let document_label = match budget.customer.kind {
        CustomerKind::PessoaFisica => "CPF",
        CustomerKind::PessoaJuridica => "CNPJ",
    };
    let c = &budget.customer;
    let _ = write!(
        out,
        "<div class=\"section\"><div class=\"section-title\">ORÇAMENTO Nº {}</div>\
         <div>Data: {}</div><div>Válido até: {}</div></div>\
         <div class=\"section\"><div class=\"section-title\">CLIENTE</div>\
         <div>Nome: {}</div><div>{}: {}</div>",
        escape_html(&budget.budget_number),
        format_date_br(budget.date),
        format_date_br(budget.valid_until),
        escape_html(&c.name),
        document_label,
        escape_html(&c.document)
    );
    for (label, value) in [("Endereço", &c.address), ("Cidade", &c.city), ("Telefone", &c.phone)] {
        if let Some(v) = value.as_deref().filter(|v| !v.trim().is_empty()) {
            let _ = write!(out, "<div>{}: {}</div>", label, escape_html(v));
        }
    }
    out.push_str("</div>");

    let delivery = budget
        .delivery_date
        .map(format_date_br)
        .unwrap_or_else(|| "A definir".to_string());
    let _ = write!(
        out,
        "<div class=\"section\"><div class=\"section-title\">PREVISÃO DE ENTREGA: {}</div></div>",
        delivery
    );

    out.push_str(
        "<div class=\"section\"><table><thead><tr><th>Descrição</th><th class=\"num\">Qtd</th>\
         <th>Un.</th><th class=\"num\">Preço Unit.</th><th class=\"num\">Subtotal</th></tr></thead><tbody>",
    );
    for item in &budget.items {
        let _ = write!(
            out,
            "<tr><td>{}</td><td class=\"num\">{}</td><td>{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td></tr>",
            escape_html(&item.name),
            item.quantity,
            escape_html(&item.unit),
            Money::from_cents(item.unit_price_cents),
            Money::from_cents(item.subtotal_cents)
        );
    }
    total_row(&mut out, "Subtotal", budget.subtotal_cents);
    if budget.discount_cents > 0 {
        total_row(&mut out, "Desconto", -budget.discount_cents);
    }
    total_row(&mut out, "Total", budget.total_cents);
    out.push_str("</tbody></table></div>");

    if let Some(terms) = budget.payment_terms.as_deref().filter(|t| !t.trim().is_empty()) {
        let _ = write!(
            out,
            "<div class=\"section\"><div class=\"section-title\">CONDIÇÕES DE PAGAMENTO</div>{}</div>",
            escape_html(terms)
        );
    }
    if let Some(obs) = budget.observations.as_deref().filter(|o| !o.trim().is_empty()) {
        let _ = write!(
            out,
            "<div class=\"section\"><div class=\"section-title\">OBSERVAÇÕES</div>{}</div>",
            escape_html(obs)
        );
    }
    let _ = write!(
        out,
        "<div class=\"section\">Impresso em {}</div>",
        format_date_br(today)
    );
    close_document(&mut out);
    out
}

// =============================================================================
// Unit Tests
// =============================================================================
