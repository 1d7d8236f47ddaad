pub mod draft;
pub mod ledger;
pub mod occurrence;
