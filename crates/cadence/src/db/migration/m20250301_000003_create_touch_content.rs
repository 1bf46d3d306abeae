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
                    .table(TouchContent::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TouchContent::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TouchContent::TouchType).string().not_null())
                    .col(ColumnDef::new(TouchContent::CourseDay).integer())
                    .col(ColumnDef::new(TouchContent::Title).string().not_null())
                    .col(ColumnDef::new(TouchContent::VideoFile).string())
                    .col(ColumnDef::new(TouchContent::VideoUrl).string())
                    .col(ColumnDef::new(TouchContent::Transcript).text())
                    .col(ColumnDef::new(TouchContent::Summary).text())
                    .col(ColumnDef::new(TouchContent::Questions).text())
                    .col(
                        ColumnDef::new(TouchContent::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(TouchContent::Position)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(TouchContent::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_touch_content_lookup")
                    .table(TouchContent::Table)
                    .col(TouchContent::TouchType)
                    .col(TouchContent::CourseDay)
                    .col(TouchContent::IsActive)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TouchContent::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum TouchContent {
    Table,
    Id,
    TouchType,
    CourseDay,
    Title,
    VideoFile,
    VideoUrl,
    Transcript,
    Summary,
    Questions,
    IsActive,
    Position,
    UpdatedAt,
}
