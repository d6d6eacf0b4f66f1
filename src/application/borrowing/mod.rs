mod borrower_service;
mod dependencies;
mod eligibility;
mod errors;
mod inventory_service;
mod journal;
mod ledger;
mod loan_service;
mod reservation_expiry;
mod reservation_service;

pub use borrower_service::{clear_sanction, list_sanctioned_borrowers, register_borrower};
pub use dependencies::ServiceDependencies;
pub use errors::{BorrowingError, ErrorKind, Result};
pub use inventory_service::{
    add_copies, decommission_copy, items_for_attention, override_copy_state,
};
pub use loan_service::{
    LoanReturnOutcome, create_loan, get_loan, get_loan_history, list_loans_for_borrower,
    list_overdue_loans, renew_loan, return_loan,
};
pub use reservation_expiry::expire_reservations;
pub use reservation_service::{
    cancel_my_reservation, cancel_reservation, confirm_reservation, create_reservation,
    get_reservation_history, list_pending_reservations, list_reservations_for_borrower,
};
