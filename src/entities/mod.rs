pub mod idempotency_record;
pub mod ledger_entry;
pub mod product;
pub mod purchase_order;
pub mod purchase_order_line;
pub mod receipt;
pub mod receipt_line;
pub mod size;
pub mod supplier;
pub mod variant_cost_basis;
