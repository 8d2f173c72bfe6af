//! Aggregates module
pub mod product;
pub mod order;
pub mod cart;

pub use product::{Product, ProductError, DEFAULT_CATEGORY};
pub use order::{Order, OrderError, OrderStatus, Address};
pub use cart::{Cart, CartError, CartLine, PricedCart, PricedLine};
