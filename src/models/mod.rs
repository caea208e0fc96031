//! Data models for documents, pages, identifiers and ledger transactions.

mod address;
mod identifier;
mod metadata;
mod page;
mod transaction;

pub use address::*;
pub use identifier::*;
pub use metadata::*;
pub use page::*;
pub use transaction::*;
