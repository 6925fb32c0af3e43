//! SQL templates, grouped by the table family they read.

pub mod accounting;
pub mod loan;
pub mod transaction;
