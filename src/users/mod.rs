// User directory and address book
//
// Only the lookups and balance mutation the checkout and settlement flows need.

pub mod models;
pub mod repository;

pub use models::*;
pub use repository::*;
