pub mod database;
pub mod entity;
pub mod table;

pub use database::Database;
pub use entity::{Entity, Existence};
pub use table::Table;
