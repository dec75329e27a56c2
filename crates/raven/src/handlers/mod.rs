pub mod categories;
mod error;
pub mod health;
pub mod orders;
pub mod products;
pub mod stream;

pub use error::AppError;
