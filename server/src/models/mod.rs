// shop_server/src/models/mod.rs

pub mod cart;
pub mod order;
pub mod order_item;
pub mod product;
pub mod user;
