//! # Customer Repository
//!
//! Customer records (cadastro de clientes). Sales keep a name snapshot, so
//! deleting a customer never touches sale history.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use super::clean;
use crate::error::{DbError, DbResult};
use pdv_core::validation::{validate_customer, validate_search_query};
use pdv_core::{Customer, CustomerInput};

const CUSTOMER_COLUMNS: &str = "id, name, phone, email, document, address, neighborhood, complement, \
     city, state, zip_code, created_at";

#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Customers ordered by name, optionally filtered by name, phone,
    /// e-mail or document.
    pub async fn list(&self, query: Option<&str>) -> DbResult<Vec<Customer>> {
        let query = validate_search_query(query.unwrap_or_default())?;
        let pattern = format!("%{}%", query);
        let sql = format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers
             WHERE ?1 = '%%'
                OR name LIKE ?1 OR COALESCE(phone, '') LIKE ?1
                OR COALESCE(email, '') LIKE ?1 OR COALESCE(document, '') LIKE ?1
             ORDER BY name COLLATE NOCASE"
        );
        let customers = sqlx::query_as::<_, Customer>(&sql)
            .bind(pattern)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = customers.len(), "Listed customers");
        Ok(customers)
    }

    pub async fn get(&self, id: &str) -> DbResult<Customer> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1");
        sqlx::query_as::<_, Customer>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Customer", id))
    }

    pub async fn insert(&self, input: CustomerInput) -> DbResult<Customer> {
        validate_customer(&input)?;

        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            name: input.name.trim().to_string(),
            phone: clean(input.phone),
            email: clean(input.email),
            document: clean(input.document),
            address: clean(input.address),
            neighborhood: clean(input.neighborhood),
            complement: clean(input.complement),
            city: clean(input.city),
            state: clean(input.state),
            zip_code: clean(input.zip_code),
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO customers (
                id, name, phone, email, document, address, neighborhood,
                complement, city, state, zip_code, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(&customer.email)
        .bind(&customer.document)
        .bind(&customer.address)
        .bind(&customer.neighborhood)
        .bind(&customer.complement)
        .bind(&customer.city)
        .bind(&customer.state)
        .bind(&customer.zip_code)
        .bind(customer.created_at)
        .execute(&self.pool)
        .await?;

        info!(id = %customer.id, name = %customer.name, "Customer created");
        Ok(customer)
    }

    pub async fn update(&self, id: &str, input: CustomerInput) -> DbResult<Customer> {
        validate_customer(&input)?;

        let result = sqlx::query(
            r#"
            UPDATE customers SET
                name = ?2, phone = ?3, email = ?4, document = ?5, address = ?6,
                neighborhood = ?7, complement = ?8, city = ?9, state = ?10, zip_code = ?11
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(input.name.trim())
        .bind(clean(input.phone))
        .bind(clean(input.email))
        .bind(clean(input.document))
        .bind(clean(input.address))
        .bind(clean(input.neighborhood))
        .bind(clean(input.complement))
        .bind(clean(input.city))
        .bind(clean(input.state))
        .bind(clean(input.zip_code))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }
        self.get(id).await
    }

    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM customers WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }
        info!(id = %id, "Customer deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::test_db;
    use pdv_core::CoreError;

    fn input(name: &str) -> CustomerInput {
        CustomerInput {
            name: name.to_string(),
            phone: Some("(62) 99999-1111".to_string()),
            email: Some("  ".to_string()),
            document: Some("529.982.247-25".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_crud() {
        let db = test_db().await;
        let repo = db.customers();

        let created = repo.insert(input("Maria Souza")).await.unwrap();
        assert_eq!(created.email, None);

        let mut changed = input("Maria S. Souza");
        changed.city = Some("Goiânia".to_string());
        let updated = repo.update(&created.id, changed).await.unwrap();
        assert_eq!(updated.name, "Maria S. Souza");
        assert_eq!(updated.city.as_deref(), Some("Goiânia"));

        repo.delete(&created.id).await.unwrap();
        assert!(matches!(repo.get(&created.id).await, Err(DbError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_invalid_document_rejected() {
        let db = test_db().await;
        let mut bad = input("João");
        bad.document = Some("111.111.111-11".to_string());
        assert!(matches!(
            db.customers().insert(bad).await,
            Err(DbError::Core(CoreError::Validation(_)))
        ));
    }

    #[tokio::test]
    async fn test_list_filters() {
        let db = test_db().await;
        db.customers().insert(input("Ana Lima")).await.unwrap();
        db.customers().insert(input("Bruno Reis")).await.unwrap();

        assert_eq!(db.customers().list(None).await.unwrap().len(), 2);
        let found = db.customers().list(Some("bruno")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Bruno Reis");
    }
}
