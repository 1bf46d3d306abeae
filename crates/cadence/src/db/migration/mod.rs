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

use sea_orm::DatabaseConnection;
pub use sea_orm_migration::prelude::*;

use cadence_common::error::Result;

mod m20250301_000001_create_users;
mod m20250301_000002_create_course_day;
mod m20250301_000003_create_touch_content;
mod m20250301_000004_create_answer;
mod m20250301_000005_create_rating;
mod m20250301_000006_create_conversation_state;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_users::Migration),
            Box::new(m20250301_000002_create_course_day::Migration),
            Box::new(m20250301_000003_create_touch_content::Migration),
            Box::new(m20250301_000004_create_answer::Migration),
            Box::new(m20250301_000005_create_rating::Migration),
            Box::new(m20250301_000006_create_conversation_state::Migration),
        ]
    }
}

pub async fn migrate(db: &DatabaseConnection) -> Result<()> {
    Migrator::up(db, None).await?;
    Ok(())
}
