//! Seed data.

use averzo_livedata::memory::MemoryBackend;
use serde_json::json;

/// Physical path of the shared products collection for tenant `proj1`.
pub const PRODUCTS: &str = "artifacts/proj1/public/data/products";

/// Physical path of user `u123`'s payment methods for tenant `proj1`.
pub const PAYMENT_METHODS: &str = "artifacts/proj1/users/u123/paymentMethods";

/// Seeds three products with prices 25, 10 and 40.
pub fn seed_products(backend: &MemoryBackend) {
    backend.put(PRODUCTS, "p1", json!({"name": "Lamp", "price": 25, "category": "lighting"}));
    backend.put(PRODUCTS, "p2", json!({"name": "Mug", "price": 10, "category": "kitchen"}));
    backend.put(PRODUCTS, "p3", json!({"name": "Rug", "price": 40, "category": "living"}));
}

/// Seeds two saved cards for user `u123`.
pub fn seed_payment_methods(backend: &MemoryBackend) {
    backend.put(PAYMENT_METHODS, "card1", json!({"brand": "visa", "last4": "4242"}));
    backend.put(PAYMENT_METHODS, "card2", json!({"brand": "amex", "last4": "0005"}));
}
