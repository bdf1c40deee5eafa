use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_products_table::Migration),
            Box::new(m20240101_000002_create_stock_events_table::Migration),
            Box::new(m20240101_000003_create_bookings_table::Migration),
        ]
    }
}

// Migration implementations

mod m20240101_000001_create_products_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_products_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Create products table aligned with entities::product::Model
            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Products::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Products::Sku)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(
                            ColumnDef::new(Products::CurrentStock)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Products::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Products::UpdatedAt).timestamp().null())
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Products {
        Table,
        Id,
        Sku,
        Name,
        CurrentStock,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000002_create_stock_events_table {
    use super::m20240101_000001_create_products_table::Products;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_stock_events_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Create stock_events table aligned with entities::stock_event::Model
            manager
                .create_table(
                    Table::create()
                        .table(StockEvents::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockEvents::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockEvents::ProductId).uuid().not_null())
                        .col(
                            ColumnDef::new(StockEvents::Quantity)
                                .big_integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockEvents::EventType).string().not_null())
                        .col(
                            ColumnDef::new(StockEvents::EffectiveDate)
                                .date()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockEvents::ReferenceType).string().null())
                        .col(ColumnDef::new(StockEvents::ReferenceId).uuid().null())
                        .col(ColumnDef::new(StockEvents::Notes).string().null())
                        .col(
                            ColumnDef::new(StockEvents::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_stock_events_product_id")
                                .from(StockEvents::Table, StockEvents::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            // The stock_as_of aggregate filters on (product_id, effective_date)
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_events_product_id_effective_date")
                        .table(StockEvents::Table)
                        .col(StockEvents::ProductId)
                        .col(StockEvents::EffectiveDate)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_events_reference_id")
                        .table(StockEvents::Table)
                        .col(StockEvents::ReferenceId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockEvents::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum StockEvents {
        Table,
        Id,
        ProductId,
        Quantity,
        EventType,
        EffectiveDate,
        ReferenceType,
        ReferenceId,
        Notes,
        CreatedAt,
    }
}

mod m20240101_000003_create_bookings_table {
    use super::m20240101_000001_create_products_table::Products;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_bookings_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Create bookings table aligned with entities::booking::Model.
            // The auto-increment id doubles as the allocation tiebreaker for
            // bookings sharing the same (dispatch_date, booked_on).
            manager
                .create_table(
                    Table::create()
                        .table(Bookings::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Bookings::Id)
                                .big_integer()
                                .primary_key()
                                .auto_increment()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Bookings::ProductId).uuid().not_null())
                        .col(
                            ColumnDef::new(Bookings::RequiredQuantity)
                                .big_integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Bookings::DispatchDate).date().not_null())
                        .col(ColumnDef::new(Bookings::BookedOn).timestamp().not_null())
                        .col(ColumnDef::new(Bookings::ReferenceType).string().not_null())
                        .col(ColumnDef::new(Bookings::ReferenceId).uuid().not_null())
                        .col(ColumnDef::new(Bookings::CustomerName).string().not_null())
                        .col(ColumnDef::new(Bookings::GymName).string().null())
                        .col(ColumnDef::new(Bookings::City).string().null())
                        .col(ColumnDef::new(Bookings::Status).string().not_null())
                        .col(
                            ColumnDef::new(Bookings::WaitingQuantity)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Bookings::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Bookings::UpdatedAt).timestamp().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_bookings_product_id")
                                .from(Bookings::Table, Bookings::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            // The allocation scan orders by (dispatch_date, booked_on, id)
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_bookings_product_dispatch_booked")
                        .table(Bookings::Table)
                        .col(Bookings::ProductId)
                        .col(Bookings::DispatchDate)
                        .col(Bookings::BookedOn)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_bookings_reference_id")
                        .table(Bookings::Table)
                        .col(Bookings::ReferenceId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Bookings::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Bookings {
        Table,
        Id,
        ProductId,
        RequiredQuantity,
        DispatchDate,
        BookedOn,
        ReferenceType,
        ReferenceId,
        CustomerName,
        GymName,
        City,
        Status,
        WaitingQuantity,
        CreatedAt,
        UpdatedAt,
    }
}
