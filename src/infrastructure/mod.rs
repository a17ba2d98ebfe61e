pub mod blockchain;
pub mod notify;
pub mod price;
pub mod store;
