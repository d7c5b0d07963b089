pub mod manager;
pub mod models;
pub mod record;
pub mod repository;

pub use manager::{Database, DatabaseError};
pub use record::Record;
pub use repository::Repository;
