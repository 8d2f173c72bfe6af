//! Storefront domain model
pub mod aggregates;
pub mod events;
pub mod value_objects;

pub use aggregates::{Address, Cart, CartLine, Order, OrderStatus, PricedCart, Product};
pub use value_objects::{Money, Sku};
