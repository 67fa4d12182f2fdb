mod error;
pub mod models;
mod pool;
pub mod repositories;

pub use error::*;
pub use models::SessionRow;
pub use pool::*;
pub use repositories::*;
