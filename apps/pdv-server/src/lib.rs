//! # PDV Server Library
//!
//! HTTP/JSON API for the point of sale, consumed by the browser UI.
//!
//! ## Module Organization
//! ```text
//! pdv_server/
//! ├── lib.rs          ◄─── You are here (AppState & router)
//! ├── main.rs         ◄─── Startup: tracing, config, pool, serve
//! ├── config.rs       ◄─── ServerConfig from PDV_* variables
//! ├── state/
//! │   ├── db.rs       ◄─── Database state wrapper
//! │   ├── cart.rs     ◄─── The register's cart
//! │   └── config.rs   ◄─── Business settings
//! ├── handlers/       ◄─── One module per area of the UI
//! └── error.rs        ◄─── ApiError → JSON { code, message }
//! ```
//!
//! ## Request Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  request ─► TraceLayer ─► TimeoutLayer ─► CorsLayer ─► Router          │
//! │                                                          │              │
//! │                                        handler(State<DbState>, ...)     │
//! │                                                          │              │
//! │                                       Result<Json<T>, ApiError>         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod state;

use std::time::Duration;

use axum::extract::{DefaultBodyLimit, FromRef};
use axum::routing::{delete, get, post, put};
use axum::Router;
use chrono::NaiveDate;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use pdv_db::Database;
use state::{CartState, ConfigState, DbState};

/// Everything the router shares with handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: DbState,
    pub cart: CartState,
    pub config: ConfigState,
}

impl AppState {
    pub fn new(db: Database, config: ConfigState) -> Self {
        AppState {
            db: DbState::new(db),
            cart: CartState::new(),
            config,
        }
    }
}

impl FromRef<AppState> for DbState {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}

impl FromRef<AppState> for CartState {
    fn from_ref(state: &AppState) -> Self {
        state.cart.clone()
    }
}

impl FromRef<AppState> for ConfigState {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

/// Builds the `/api` router with its middleware.
pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    use handlers::{
        backup, budget, cart, customer, export, finance, product, production, report, sale, stock,
        supplier, system,
    };

    let api = Router::new()
        // System
        .route("/health", get(system::health))
        .route("/config", get(system::get_config))
        .route("/config/company", get(system::get_company).put(system::update_company))
        // Products
        .route("/products", get(product::list_products).post(product::create_product))
        .route("/products/search", get(product::search_products))
        .route("/products/barcode/:barcode", get(product::get_product_by_barcode))
        .route(
            "/products/:id",
            get(product::get_product)
                .put(product::update_product)
                .delete(product::delete_product),
        )
        // Stock
        .route("/stock/entry", post(stock::stock_entry))
        .route("/stock/exit", post(stock::stock_exit))
        .route("/stock/movements", get(stock::list_movements))
        .route("/stock/alerts", get(stock::stock_alerts))
        .route("/stock/summary", get(stock::stock_summary))
        // Customers
        .route("/customers", get(customer::list_customers).post(customer::create_customer))
        .route(
            "/customers/:id",
            get(customer::get_customer)
                .put(customer::update_customer)
                .delete(customer::delete_customer),
        )
        // Suppliers & purchases
        .route("/suppliers", get(supplier::list_suppliers).post(supplier::create_supplier))
        .route(
            "/suppliers/:id",
            get(supplier::get_supplier)
                .put(supplier::update_supplier)
                .delete(supplier::delete_supplier),
        )
        .route("/purchases", get(supplier::list_purchases).post(supplier::create_purchase))
        .route("/purchases/:id", get(supplier::get_purchase))
        .route("/purchases/:id/payments", post(supplier::register_payment))
        .route("/purchases/:id/receive", post(supplier::receive_purchase))
        // Cart
        .route("/cart", get(cart::get_cart).delete(cart::clear_cart))
        .route("/cart/items", post(cart::add_to_cart))
        .route("/cart/manual-items", post(cart::add_manual_item))
        .route(
            "/cart/items/:line_id",
            put(cart::update_cart_item).delete(cart::remove_from_cart),
        )
        .route("/cart/discount", put(cart::set_discount))
        .route("/cart/payment", put(cart::set_payment))
        .route("/cart/customer", put(cart::set_customer))
        .route("/cart/sale-date", put(cart::set_sale_date))
        .route("/cart/checkout", post(cart::checkout))
        // Sales
        .route("/sales", get(sale::list_sales))
        .route("/sales/:id", get(sale::get_sale))
        .route("/sales/:id/cancel", post(sale::cancel_sale))
        .route("/sales/:id/pay", post(sale::mark_sale_paid))
        .route("/sales/:id/receipt", get(sale::sale_receipt))
        // Budgets
        .route("/budgets", get(budget::list_budgets).post(budget::create_budget))
        .route(
            "/budgets/:id",
            get(budget::get_budget)
                .put(budget::update_budget)
                .delete(budget::delete_budget),
        )
        .route("/budgets/:id/status", put(budget::update_budget_status))
        .route("/budgets/:id/convert", post(budget::convert_budget))
        .route("/budgets/:id/print", get(budget::print_budget))
        // Expenses
        .route("/expenses", get(finance::list_expenses).post(finance::create_expense))
        .route("/expenses/summary", get(finance::expense_summary))
        .route(
            "/expenses/:id",
            put(finance::update_expense).delete(finance::delete_expense),
        )
        // Accounts payable / receivable
        .route("/accounts", get(finance::list_accounts).post(finance::create_account))
        .route("/accounts/:id", delete(finance::delete_account))
        .route("/accounts/:id/pay", post(finance::pay_account))
        .route("/accounts/:id/cancel", post(finance::cancel_account))
        // Cash flow
        .route("/cash-flow", get(finance::list_cash_flow).post(finance::create_cash_flow))
        .route("/cash-flow/:id", delete(finance::delete_cash_flow))
        // Withdrawals
        .route(
            "/withdrawals",
            get(finance::list_withdrawals).post(finance::create_withdrawal),
        )
        .route("/withdrawals/:id", delete(finance::delete_withdrawal))
        // Production
        .route(
            "/productions",
            get(production::list_productions).post(production::create_production),
        )
        .route("/productions/summary", get(production::production_summary))
        .route("/productions/:id", delete(production::delete_production))
        .route("/productions/:id/send", post(production::send_to_stock))
        // Reports
        .route("/reports/dashboard", get(report::dashboard))
        .route("/reports/sales-by-payment", get(report::sales_by_payment))
        .route("/reports/monthly", get(report::monthly_summary))
        .route("/reports/yearly", get(report::yearly_stats))
        .route("/reports/top-products", get(report::top_products))
        .route("/reports/financial", get(report::financial_summary))
        // Exports
        .route("/exports/sales.csv", get(export::export_sales))
        .route("/exports/products.csv", get(export::export_products))
        .route("/exports/expenses.csv", get(export::export_expenses))
        .route("/exports/sold-budgets.csv", get(export::export_sold_budgets))
        .route("/exports/stock-movements.csv", get(export::export_stock_movements))
        // Backup
        .route("/backup", get(backup::export_backup))
        .route(
            "/backup/restore",
            post(backup::restore_backup).layer(DefaultBodyLimit::max(backup::MAX_BACKUP_BYTES)),
        );

    Router::new()
        .nest("/api", api)
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// The register's local date.
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}
