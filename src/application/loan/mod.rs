mod loan_service;
mod reminder;

pub use loan_service::{LoanReturnDetail, create_loan, list_loans, return_loan};
pub use reminder::{
    DEFAULT_REMINDER_INTERVAL, REMINDER_SUBJECT, ReminderReport, compose_reminder,
    run_reminder_scheduler, send_expiration_reminders,
};
