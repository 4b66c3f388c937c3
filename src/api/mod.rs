pub mod error;
pub mod handlers;
pub mod router;
pub mod types;
pub mod validation;

pub use error::ApiError;
pub use handlers::AppState;
pub use router::create_router;
pub use types::*;
