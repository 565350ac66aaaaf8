pub mod charges;
mod config;
mod db;
pub mod gateways;
pub mod mikrotik;
pub mod payments;
mod phone;
mod schema;
pub mod vouchers;

pub use config::*;
pub use db::*;
pub use phone::*;
pub use schema::*;
