//! # Validation Module
//!
//! Input validation for everything the browser submits.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Browser form                                                 │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: HTTP handler (Rust)                                          │
//! │  ├── Type validation (serde deserialization)                           │
//! │  └── THIS MODULE: Business rule validation                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                       │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::types::{
    AccountInput, CashFlowInput, CustomerInput, ProductInput, PurchaseInput, SupplierInput,
};
use crate::{MAX_ITEM_QUANTITY, MAX_PRICE_CENTS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a required free-text field: non-blank and at most `max`
/// characters.
///
/// ```rust
/// use pdv_core::validation::validate_required_text;
///
/// assert!(validate_required_text("name", "Sanca Aberta", 200).is_ok());
/// assert!(validate_required_text("name", "   ", 200).is_err());
/// ```
pub fn validate_required_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates an optional free-text field (only the length is checked).
pub fn validate_optional_text(field: &str, value: Option<&str>, max: usize) -> ValidationResult<()> {
    match value {
        Some(v) if v.chars().count() > max => Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        }),
        _ => Ok(()),
    }
}

/// Validates a search query and returns it trimmed.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.chars().count() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

/// Loose e-mail check: something before and after a single `@`, and a dot
/// in the domain.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let invalid = || ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: "must look like name@domain.com".to_string(),
    };

    let (local, domain) = email.trim().split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') || !domain.contains('.') || domain.ends_with('.') {
        return Err(invalid());
    }
    Ok(())
}

/// Strips everything but digits (`12.345.678/0001-95` → `12345678000195`).
pub fn digits_only(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Validates a CNPJ including both check digits.
///
/// ```rust
/// use pdv_core::validation::validate_cnpj;
///
/// assert!(validate_cnpj("11.222.333/0001-81").is_ok());
/// assert!(validate_cnpj("11.222.333/0001-82").is_err());
/// ```
pub fn validate_cnpj(cnpj: &str) -> ValidationResult<()> {
    let digits: Vec<u32> = digits_only(cnpj)
        .chars()
        .filter_map(|c| c.to_digit(10))
        .collect();

    let invalid = |reason: &str| ValidationError::InvalidFormat {
        field: "cnpj".to_string(),
        reason: reason.to_string(),
    };

    if digits.len() != 14 {
        return Err(invalid("must have 14 digits"));
    }
    if digits.iter().all(|d| *d == digits[0]) {
        return Err(invalid("repeated digits"));
    }

    const W1: [u32; 12] = [5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
    const W2: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

    let check = |weights: &[u32]| {
        let sum: u32 = weights.iter().zip(&digits).map(|(w, d)| w * d).sum();
        let rem = sum % 11;
        if rem < 2 {
            0
        } else {
            11 - rem
        }
    };

    if check(&W1) != digits[12] || check(&W2) != digits[13] {
        return Err(invalid("check digits do not match"));
    }
    Ok(())
}

/// Validates a CPF including both check digits.
pub fn validate_cpf(cpf: &str) -> ValidationResult<()> {
    let digits: Vec<u32> = digits_only(cpf)
        .chars()
        .filter_map(|c| c.to_digit(10))
        .collect();

    let invalid = |reason: &str| ValidationError::InvalidFormat {
        field: "cpf".to_string(),
        reason: reason.to_string(),
    };

    if digits.len() != 11 {
        return Err(invalid("must have 11 digits"));
    }
    if digits.iter().all(|d| *d == digits[0]) {
        return Err(invalid("repeated digits"));
    }

    let check = |len: usize| {
        let sum: u32 = digits[..len]
            .iter()
            .enumerate()
            .map(|(i, d)| d * (len as u32 + 1 - i as u32))
            .sum();
        let rem = (sum * 10) % 11;
        if rem == 10 {
            0
        } else {
            rem
        }
    };

    if check(9) != digits[9] || check(10) != digits[10] {
        return Err(invalid("check digits do not match"));
    }
    Ok(())
}

/// Accepts either a CPF (11 digits) or a CNPJ (14 digits).
pub fn validate_document(document: &str) -> ValidationResult<()> {
    match digits_only(document).len() {
        11 => validate_cpf(document),
        14 => validate_cnpj(document),
        _ => Err(ValidationError::InvalidFormat {
            field: "document".to_string(),
            reason: "must be a CPF (11 digits) or CNPJ (14 digits)".to_string(),
        }),
    }
}

/// Validates a UUID string.
pub fn validate_uuid(field: &str, id: &str) -> ValidationResult<()> {
    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;
    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity (1..=MAX_ITEM_QUANTITY).
pub fn validate_quantity(quantity: i64) -> ValidationResult<()> {
    if quantity < 1 || quantity > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }
    Ok(())
}

/// Validates an amount that must be strictly positive.
pub fn validate_positive_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::must_be_positive(field));
    }
    if cents > MAX_PRICE_CENTS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 1,
            max: MAX_PRICE_CENTS,
        });
    }
    Ok(())
}

/// Validates a unit amount that may be zero, such as a cost.
pub fn validate_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if !(0..=MAX_PRICE_CENTS).contains(&cents) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_PRICE_CENTS,
        });
    }
    Ok(())
}

/// Validates an amount that may be zero but not negative.
pub fn validate_non_negative(field: &str, value: i64) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

/// Validates a percentage expressed in basis points (0..=10000).
pub fn validate_percentage_bps(field: &str, bps: u32) -> ValidationResult<()> {
    if bps > 10_000 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: 10_000,
        });
    }
    Ok(())
}

// =============================================================================
// Record Validators
// =============================================================================

pub fn validate_product(input: &ProductInput) -> ValidationResult<()> {
    validate_required_text("name", &input.name, 200)?;
    validate_optional_text("category", Some(&input.category), 100)?;
    validate_optional_text("description", input.description.as_deref(), 1000)?;
    validate_optional_text("barcode", input.barcode.as_deref(), 50)?;
    validate_positive_cents("price_cents", input.price_cents)?;
    validate_cents("cost_cents", input.cost_cents)?;
    validate_non_negative("stock", input.stock)?;
    if let Some(min) = input.min_stock {
        validate_non_negative("min_stock", min)?;
    }
    Ok(())
}

pub fn validate_customer(input: &CustomerInput) -> ValidationResult<()> {
    validate_required_text("name", &input.name, 200)?;
    if let Some(email) = input.email.as_deref().filter(|e| !e.trim().is_empty()) {
        validate_email(email)?;
    }
    if let Some(doc) = input.document.as_deref().filter(|d| !d.trim().is_empty()) {
        validate_document(doc)?;
    }
    validate_optional_text("phone", input.phone.as_deref(), 30)?;
    validate_optional_text("address", input.address.as_deref(), 300)?;
    Ok(())
}

pub fn validate_supplier(input: &SupplierInput) -> ValidationResult<()> {
    validate_required_text("name", &input.name, 200)?;
    if let Some(cnpj) = input.cnpj.as_deref().filter(|c| !c.trim().is_empty()) {
        validate_cnpj(cnpj)?;
    }
    if let Some(email) = input.email.as_deref().filter(|e| !e.trim().is_empty()) {
        validate_email(email)?;
    }
    validate_optional_text("notes", input.notes.as_deref(), 1000)?;
    Ok(())
}

pub fn validate_purchase(input: &PurchaseInput) -> ValidationResult<()> {
    validate_required_text("supplier_id", &input.supplier_id, 64)?;
    if input.items.is_empty() {
        return Err(ValidationError::required("items"));
    }
    for item in &input.items {
        validate_required_text("product_name", &item.product_name, 200)?;
        validate_quantity(item.quantity)?;
        validate_cents("unit_price_cents", item.unit_price_cents)?;
    }
    if let Some(due) = input.due_date {
        if due < input.purchase_date {
            return Err(ValidationError::InvalidFormat {
                field: "due_date".to_string(),
                reason: "must not be before the purchase date".to_string(),
            });
        }
    }
    Ok(())
}

pub fn validate_account(input: &AccountInput) -> ValidationResult<()> {
    validate_required_text("title", &input.title, 200)?;
    validate_positive_cents("amount_cents", input.amount_cents)?;
    Ok(())
}

pub fn validate_cash_flow(input: &CashFlowInput) -> ValidationResult<()> {
    validate_required_text("description", &input.description, 300)?;
    validate_positive_cents("amount_cents", input.amount_cents)?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_required_text() {
        assert!(validate_required_text("name", "Placa de Gesso", 200).is_ok());
        assert_eq!(
            validate_required_text("name", "", 200),
            Err(ValidationError::required("name"))
        );
        assert!(validate_required_text("name", &"a".repeat(201), 200).is_err());
        // counts characters, not bytes
        assert!(validate_required_text("name", &"ç".repeat(200), 200).is_ok());
    }

    #[test]
    fn test_search_query_trimmed() {
        assert_eq!(validate_search_query("  sanca ").unwrap(), "sanca");
        assert!(validate_search_query(&"x".repeat(101)).is_err());
    }

    #[test]
    fn test_email() {
        assert!(validate_email("loja@gesso.com.br").is_ok());
        assert!(validate_email("loja.gesso.com").is_err());
        assert!(validate_email("@gesso.com").is_err());
        assert!(validate_email("loja@gesso").is_err());
    }

    #[test]
    fn test_cnpj() {
        assert!(validate_cnpj("11.222.333/0001-81").is_ok());
        assert!(validate_cnpj("11222333000181").is_ok());
        assert!(validate_cnpj("11.222.333/0001-80").is_err());
        assert!(validate_cnpj("11111111111111").is_err());
        assert!(validate_cnpj("123").is_err());
    }

    #[test]
    fn test_cpf() {
        assert!(validate_cpf("529.982.247-25").is_ok());
        assert!(validate_cpf("529.982.247-24").is_err());
        assert!(validate_cpf("000.000.000-00").is_err());
    }

    #[test]
    fn test_document_dispatch() {
        assert!(validate_document("529.982.247-25").is_ok());
        assert!(validate_document("11.222.333/0001-81").is_ok());
        assert!(validate_document("1234").is_err());
    }

    #[test]
    fn test_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_ITEM_QUANTITY).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(MAX_ITEM_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_product() {
        let mut input = ProductInput {
            name: "Moldura".to_string(),
            price_cents: 1500,
            ..Default::default()
        };
        assert!(validate_product(&input).is_ok());

        input.price_cents = 0;
        assert!(validate_product(&input).is_err());

        input.price_cents = 1500;
        input.stock = -1;
        assert!(validate_product(&input).is_err());

        input.stock = 0;
        input.cost_cents = MAX_PRICE_CENTS + 1;
        assert!(validate_product(&input).is_err());
    }

    #[test]
    fn test_cents_upper_bound() {
        assert!(validate_positive_cents("price_cents", MAX_PRICE_CENTS).is_ok());
        assert_eq!(
            validate_positive_cents("price_cents", MAX_PRICE_CENTS + 1),
            Err(ValidationError::OutOfRange {
                field: "price_cents".to_string(),
                min: 1,
                max: MAX_PRICE_CENTS,
            })
        );
        assert!(validate_positive_cents("price_cents", i64::MAX / 2).is_err());

        assert!(validate_cents("cost_cents", 0).is_ok());
        assert!(validate_cents("cost_cents", MAX_PRICE_CENTS).is_ok());
        assert!(validate_cents("cost_cents", MAX_PRICE_CENTS + 1).is_err());
        assert!(validate_cents("cost_cents", -1).is_err());
    }

    #[test]
    fn test_customer_blank_optional_fields_are_ignored() {
        let input = CustomerInput {
            name: "Maria".to_string(),
            email: Some("".to_string()),
            document: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(validate_customer(&input).is_ok());
    }

    #[test]
    fn test_purchase_due_date_before_purchase() {
        let input = PurchaseInput {
            supplier_id: "s1".to_string(),
            purchase_date: NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
            due_date: NaiveDate::from_ymd_opt(2024, 3, 1),
            description: None,
            invoice_number: None,
            items: vec![crate::types::PurchaseItemInput {
                product_id: None,
                product_name: "Gesso 40kg".to_string(),
                quantity: 10,
                unit_price_cents: 3500,
            }],
        };
        assert!(validate_purchase(&input).is_err());
    }
}
