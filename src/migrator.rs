use anyhow::Result;
use sea_orm::{ConnectOptions, Database};
use sea_orm_migration::prelude::*;
use std::time::Duration;
use tracing::{error, info};

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260101_000001_create_reference_tables::Migration),
            Box::new(m20260101_000002_create_purchase_order_tables::Migration),
            Box::new(m20260101_000003_create_receipt_tables::Migration),
            Box::new(m20260101_000004_create_ledger_entries_table::Migration),
            Box::new(m20260101_000005_create_idempotency_records_table::Migration),
        ]
    }
}

// Suppliers, products, sizes and the cost-basis store are owned by other
// systems; the tables here mirror the columns this crate reads.
mod m20260101_000001_create_reference_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000001_create_reference_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Suppliers::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Suppliers::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Suppliers::Name).string().not_null())
                        .col(
                            ColumnDef::new(Suppliers::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Products::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(
                            ColumnDef::new(Products::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Products::IsUniversal)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Products::ScopingUnitId).uuid().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Sizes::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Sizes::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Sizes::Label).string().not_null())
                        .col(
                            ColumnDef::new(Sizes::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(VariantCostBasis::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(VariantCostBasis::ProductId).uuid().not_null())
                        .col(ColumnDef::new(VariantCostBasis::SizeId).uuid().not_null())
                        .col(
                            ColumnDef::new(VariantCostBasis::UnitCost)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(VariantCostBasis::SourceReceiptId)
                                .uuid()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(VariantCostBasis::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .primary_key(
                            Index::create()
                                .name("pk_variant_cost_basis")
                                .col(VariantCostBasis::ProductId)
                                .col(VariantCostBasis::SizeId),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(VariantCostBasis::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Sizes::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Suppliers::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Suppliers {
        Table,
        Id,
        Name,
        IsActive,
    }

    #[derive(DeriveIden)]
    enum Products {
        Table,
        Id,
        Name,
        IsActive,
        IsUniversal,
        ScopingUnitId,
    }

    #[derive(DeriveIden)]
    enum Sizes {
        Table,
        Id,
        Label,
        IsActive,
    }

    #[derive(DeriveIden)]
    enum VariantCostBasis {
        Table,
        ProductId,
        SizeId,
        UnitCost,
        SourceReceiptId,
        UpdatedAt,
    }
}

mod m20260101_000002_create_purchase_order_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000002_create_purchase_order_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(PurchaseOrders::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PurchaseOrders::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PurchaseOrders::SupplierId).uuid().not_null())
                        .col(ColumnDef::new(PurchaseOrders::OrderDate).date().not_null())
                        .col(
                            ColumnDef::new(PurchaseOrders::ExternalReference)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrders::Status)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrders::IsVoided)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(PurchaseOrders::VoidReason).text().null())
                        .col(
                            ColumnDef::new(PurchaseOrders::VoidedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(PurchaseOrders::VoidedBy).uuid().null())
                        .col(ColumnDef::new(PurchaseOrders::CreatedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(PurchaseOrders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_purchase_orders_status")
                        .table(PurchaseOrders::Table)
                        .col(PurchaseOrders::Status)
                        .col(PurchaseOrders::IsVoided)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_purchase_orders_supplier_id")
                        .table(PurchaseOrders::Table)
                        .col(PurchaseOrders::SupplierId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PurchaseOrderLines::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PurchaseOrderLines::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PurchaseOrderLines::OrderId).uuid().not_null())
                        .col(
                            ColumnDef::new(PurchaseOrderLines::LineNumber)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrderLines::ProductId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PurchaseOrderLines::SizeId).uuid().not_null())
                        .col(
                            ColumnDef::new(PurchaseOrderLines::ScopingUnitId)
                                .uuid()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrderLines::OrderedQuantity)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrderLines::UnitCost)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_purchase_order_lines_order_id")
                                .from(PurchaseOrderLines::Table, PurchaseOrderLines::OrderId)
                                .to(PurchaseOrders::Table, PurchaseOrders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_purchase_order_lines_order_id")
                        .table(PurchaseOrderLines::Table)
                        .col(PurchaseOrderLines::OrderId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(PurchaseOrderLines::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(PurchaseOrders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum PurchaseOrders {
        Table,
        Id,
        SupplierId,
        OrderDate,
        ExternalReference,
        Status,
        IsVoided,
        VoidReason,
        VoidedAt,
        VoidedBy,
        CreatedBy,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum PurchaseOrderLines {
        Table,
        Id,
        OrderId,
        LineNumber,
        ProductId,
        SizeId,
        ScopingUnitId,
        OrderedQuantity,
        UnitCost,
    }
}

mod m20260101_000003_create_receipt_tables {
    use super::m20260101_000002_create_purchase_order_tables::{
        PurchaseOrderLines, PurchaseOrders,
    };
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000003_create_receipt_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Receipts::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Receipts::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Receipts::OrderId).uuid().not_null())
                        .col(ColumnDef::new(Receipts::ReceiptDate).date().not_null())
                        .col(ColumnDef::new(Receipts::Note).text().null())
                        .col(ColumnDef::new(Receipts::ReceivedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(Receipts::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_receipts_order_id")
                                .from(Receipts::Table, Receipts::OrderId)
                                .to(PurchaseOrders::Table, PurchaseOrders::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_receipts_order_id")
                        .table(Receipts::Table)
                        .col(Receipts::OrderId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ReceiptLines::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ReceiptLines::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ReceiptLines::ReceiptId).uuid().not_null())
                        .col(ColumnDef::new(ReceiptLines::OrderLineId).uuid().not_null())
                        .col(ColumnDef::new(ReceiptLines::ProductId).uuid().not_null())
                        .col(ColumnDef::new(ReceiptLines::SizeId).uuid().not_null())
                        .col(
                            ColumnDef::new(ReceiptLines::QuantityReceived)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ReceiptLines::UnitCost)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ReceiptLines::UpdateCostBasis)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_receipt_lines_receipt_id")
                                .from(ReceiptLines::Table, ReceiptLines::ReceiptId)
                                .to(Receipts::Table, Receipts::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_receipt_lines_order_line_id")
                                .from(ReceiptLines::Table, ReceiptLines::OrderLineId)
                                .to(PurchaseOrderLines::Table, PurchaseOrderLines::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_receipt_lines_receipt_id")
                        .table(ReceiptLines::Table)
                        .col(ReceiptLines::ReceiptId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_receipt_lines_order_line_id")
                        .table(ReceiptLines::Table)
                        .col(ReceiptLines::OrderLineId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ReceiptLines::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Receipts::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Receipts {
        Table,
        Id,
        OrderId,
        ReceiptDate,
        Note,
        ReceivedBy,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum ReceiptLines {
        Table,
        Id,
        ReceiptId,
        OrderLineId,
        ProductId,
        SizeId,
        QuantityReceived,
        UnitCost,
        UpdateCostBasis,
    }
}

mod m20260101_000004_create_ledger_entries_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000004_create_ledger_entries_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(LedgerEntries::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(LedgerEntries::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(LedgerEntries::ProductId).uuid().not_null())
                        .col(ColumnDef::new(LedgerEntries::SizeId).uuid().not_null())
                        .col(
                            ColumnDef::new(LedgerEntries::QuantityDelta)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(LedgerEntries::MovementType)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(LedgerEntries::OriginKind)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(ColumnDef::new(LedgerEntries::OriginId).uuid().not_null())
                        .col(ColumnDef::new(LedgerEntries::SupplierId).uuid().null())
                        .col(ColumnDef::new(LedgerEntries::Note).text().null())
                        .col(ColumnDef::new(LedgerEntries::RecordedBy).uuid().null())
                        .col(
                            ColumnDef::new(LedgerEntries::RecordedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_ledger_entries_variant")
                        .table(LedgerEntries::Table)
                        .col(LedgerEntries::ProductId)
                        .col(LedgerEntries::SizeId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_ledger_entries_origin")
                        .table(LedgerEntries::Table)
                        .col(LedgerEntries::OriginKind)
                        .col(LedgerEntries::OriginId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(LedgerEntries::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum LedgerEntries {
        Table,
        Id,
        ProductId,
        SizeId,
        QuantityDelta,
        MovementType,
        OriginKind,
        OriginId,
        SupplierId,
        Note,
        RecordedBy,
        RecordedAt,
    }
}

mod m20260101_000005_create_idempotency_records_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000005_create_idempotency_records_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(IdempotencyRecords::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(IdempotencyRecords::Key)
                                .string_len(255)
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(IdempotencyRecords::Operation)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(ColumnDef::new(IdempotencyRecords::OrderId).uuid().not_null())
                        .col(ColumnDef::new(IdempotencyRecords::ReceiptId).uuid().null())
                        .col(
                            ColumnDef::new(IdempotencyRecords::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(IdempotencyRecords::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum IdempotencyRecords {
        Table,
        Key,
        Operation,
        OrderId,
        ReceiptId,
        CreatedAt,
    }
}

/// Connects to `db_url` and applies every pending migration.
pub async fn run_migration(db_url: &str) -> Result<()> {
    info!("Setting up database connection for migrations");

    let mut opt = ConnectOptions::new(db_url);
    opt.max_connections(2)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(30))
        .acquire_timeout(Duration::from_secs(30))
        .sqlx_logging(true);

    let db = Database::connect(opt).await?;

    info!("Running database migrations");

    match Migrator::up(&db, None).await {
        Ok(_) => {
            info!("Migrations completed successfully");
            Ok(())
        }
        Err(e) => {
            error!("Migration failed: {}", e);
            Err(e.into())
        }
    }
}
