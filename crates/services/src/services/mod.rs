pub mod access;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod database_validator;
pub mod inventory;
pub mod orders;
pub mod seed;
pub mod session_sweeper;

#[cfg(test)]
pub(crate) mod test_support;
