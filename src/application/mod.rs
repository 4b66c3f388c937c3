pub mod book;
pub mod dependencies;
pub mod errors;
pub mod interceptors;
pub mod loan;
pub mod unit_of_work;
pub mod user;

pub use dependencies::ServiceDependencies;
pub use errors::{ApplicationError, ErrorKind, FieldErrors, Result};
pub use interceptors::{CommitInterceptor, InterceptorChain, SoftDeleteInterceptor};
pub use unit_of_work::UnitOfWork;
