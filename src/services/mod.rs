pub mod idempotency;
pub mod inventory;
pub mod ledger;
pub mod procurement;
pub mod read_model;
pub mod reconciler;
pub mod reference_data;
