use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_countries_table::Migration),
            Box::new(m20240101_000002_create_regions_table::Migration),
            Box::new(m20240101_000003_create_localities_table::Migration),
            Box::new(m20240101_000004_create_addresses_table::Migration),
        ]
    }
}

mod m20240101_000001_create_countries_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_countries_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Countries::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Countries::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Countries::Name).string().not_null())
                        .col(ColumnDef::new(Countries::Iso31662).string_len(2).null())
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Countries::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(crate) enum Countries {
        Table,
        Id,
        Name,
        #[sea_orm(iden = "iso_3166_2")]
        Iso31662,
    }
}

mod m20240101_000002_create_regions_table {
    use super::m20240101_000001_create_countries_table::Countries;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_regions_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Regions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Regions::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Regions::CountryId).big_integer().not_null())
                        .col(ColumnDef::new(Regions::Name).string().not_null())
                        .col(
                            ColumnDef::new(Regions::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Regions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Regions::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_regions_country_id")
                                .from(Regions::Table, Regions::CountryId)
                                .to(Countries::Table, Countries::Id)
                                .on_delete(ForeignKeyAction::Restrict)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_regions_country_id")
                        .table(Regions::Table)
                        .col(Regions::CountryId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Regions::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(crate) enum Regions {
        Table,
        Id,
        CountryId,
        Name,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000003_create_localities_table {
    use super::m20240101_000002_create_regions_table::Regions;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_localities_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Localities::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Localities::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Localities::RegionId).big_integer().not_null())
                        .col(ColumnDef::new(Localities::Name).string().not_null())
                        .col(
                            ColumnDef::new(Localities::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Localities::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Localities::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_localities_region_id")
                                .from(Localities::Table, Localities::RegionId)
                                .to(Regions::Table, Regions::Id)
                                .on_delete(ForeignKeyAction::Restrict)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_localities_region_id")
                        .table(Localities::Table)
                        .col(Localities::RegionId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Localities::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Localities {
        Table,
        Id,
        RegionId,
        Name,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000004_create_addresses_table {
    use super::m20240101_000001_create_countries_table::Countries;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_addresses_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Owner columns are polymorphic, so there is no foreign key on them
            manager
                .create_table(
                    Table::create()
                        .table(Addresses::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Addresses::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(Addresses::AddressableId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Addresses::AddressableType).string().not_null())
                        .col(ColumnDef::new(Addresses::CountryId).big_integer().null())
                        .col(
                            ColumnDef::new(Addresses::IsDefault)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Addresses::Apartment).string().null())
                        .col(ColumnDef::new(Addresses::Floor).string().null())
                        .col(ColumnDef::new(Addresses::Entry).string().null())
                        .col(ColumnDef::new(Addresses::Building).string().null())
                        .col(ColumnDef::new(Addresses::BuildingType).string().null())
                        .col(ColumnDef::new(Addresses::Number).string().null())
                        .col(ColumnDef::new(Addresses::Street).string().null())
                        .col(ColumnDef::new(Addresses::StreetType).string().null())
                        .col(
                            ColumnDef::new(Addresses::SubAdministrativeArea)
                                .string()
                                .null(),
                        )
                        .col(ColumnDef::new(Addresses::City).string().null())
                        .col(ColumnDef::new(Addresses::AdministrativeArea).string().null())
                        .col(ColumnDef::new(Addresses::PostalArea).string().null())
                        .col(ColumnDef::new(Addresses::Obs).text().null())
                        .col(ColumnDef::new(Addresses::Lat).double().null())
                        .col(ColumnDef::new(Addresses::Long).double().null())
                        .col(
                            ColumnDef::new(Addresses::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Addresses::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_addresses_country_id")
                                .from(Addresses::Table, Addresses::CountryId)
                                .to(Countries::Table, Countries::Id)
                                .on_delete(ForeignKeyAction::Restrict)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_addresses_addressable")
                        .table(Addresses::Table)
                        .col(Addresses::AddressableType)
                        .col(Addresses::AddressableId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_addresses_country_id")
                        .table(Addresses::Table)
                        .col(Addresses::CountryId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Addresses::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Addresses {
        Table,
        Id,
        AddressableId,
        AddressableType,
        CountryId,
        IsDefault,
        Apartment,
        Floor,
        Entry,
        Building,
        BuildingType,
        Number,
        Street,
        StreetType,
        SubAdministrativeArea,
        City,
        AdministrativeArea,
        PostalArea,
        Obs,
        Lat,
        Long,
        CreatedAt,
        UpdatedAt,
    }
}
