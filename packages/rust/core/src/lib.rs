//! Ledger workflows: catalog import, session import, reports, and
//! character maintenance.
//!
//! Every operation takes a [`pfsledger_storage::Storage`] handle and runs its
//! statements one at a time; nothing here prompts or prints.

pub mod characters;
pub mod reports;
pub mod scenarios;
pub mod session_import;

#[cfg(test)]
pub(crate) mod test_support;
