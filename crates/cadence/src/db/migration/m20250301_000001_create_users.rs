// Cadence
// Copyright (C) 2025 Throneless Tech

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::ChatId).big_integer().not_null())
                    .col(ColumnDef::new(Users::Username).string())
                    .col(
                        ColumnDef::new(Users::Subscription)
                            .string()
                            .not_null()
                            .default("none"),
                    )
                    .col(ColumnDef::new(Users::StartedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Users::PaidAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Users::MorningTime).time())
                    .col(ColumnDef::new(Users::DayTime).time())
                    .col(ColumnDef::new(Users::EveningTime).time())
                    .col(ColumnDef::new(Users::MorningSentAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Users::DaySentAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Users::EveningSentAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Users::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_users_subscription")
                    .table(Users::Table)
                    .col(Users::Subscription)
                    .col(Users::IsActive)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    ChatId,
    Username,
    Subscription,
    StartedAt,
    PaidAt,
    MorningTime,
    DayTime,
    EveningTime,
    MorningSentAt,
    DaySentAt,
    EveningSentAt,
    IsActive,
    CreatedAt,
}
