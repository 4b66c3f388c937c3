pub mod book;
pub mod commands;
pub mod errors;
pub mod loan;
pub mod user;
pub mod value_objects;

pub use book::{Book, BookChanges, SoftDelete};
pub use errors::*;
pub use loan::{Loan, LoanState};
pub use user::User;
pub use value_objects::*;
