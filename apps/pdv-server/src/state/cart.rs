//! # Cart State
//!
//! The register's cart, shared by every cart handler.
//!
//! ## Thread Safety
//! The cart sits behind `Arc<Mutex<Cart>>`. The lock is a std mutex and is
//! only held inside the closures passed to [`CartState::with_cart`] and
//! [`CartState::with_cart_mut`], never across an `.await`.
//!
//! ## Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. with_cart(|c| c.checkout(token, today))   snapshot, lock released  │
//! │  2. db.sales().checkout(&request).await       one SQLite transaction   │
//! │  3. with_cart_mut(|c| c.clear())              only after commit        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::{Arc, Mutex, MutexGuard};

use pdv_core::cart::Cart;

#[derive(Debug, Clone)]
pub struct CartState {
    cart: Arc<Mutex<Cart>>,
}

impl CartState {
    pub fn new() -> Self {
        CartState {
            cart: Arc::new(Mutex::new(Cart::new())),
        }
    }

    /// Runs `f` with read access to the cart.
    pub fn with_cart<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Cart) -> R,
    {
        let cart = self.lock();
        f(&cart)
    }

    /// Runs `f` with write access to the cart.
    pub fn with_cart_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Cart) -> R,
    {
        let mut cart = self.lock();
        f(&mut cart)
    }

    // A panic inside a closure poisons the mutex; the cart itself is still
    // consistent because every Cart method validates before mutating.
    fn lock(&self) -> MutexGuard<'_, Cart> {
        self.cart.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for CartState {
    fn default() -> Self {
        Self::new()
    }
}
