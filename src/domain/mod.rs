pub mod borrower;
pub mod calendar;
pub mod commands;
pub mod copy;
pub mod errors;
pub mod events;
pub mod loan;
pub mod policy;
pub mod reservation;
pub mod sanction;
pub mod value_objects;

pub use borrower::*;
pub use copy::*;
pub use errors::*;
pub use events::*;
pub use loan::*;
pub use reservation::*;
pub use value_objects::*;
