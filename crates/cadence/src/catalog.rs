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

//! Loads course days and touch contents from a JSON catalog. Re-importing
//! the same catalog updates rows in place.

use cadence_common::{
    error::{CadenceErrorKind, Result},
    touch::TouchType,
};
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

use crate::db::{self, content::NewContent};

fn default_active() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub days: Vec<CatalogDay>,
    #[serde(default)]
    pub contents: Vec<CatalogContent>,
}

#[derive(Debug, Deserialize)]
pub struct CatalogDay {
    pub ordinal: i32,
    pub title: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

#[derive(Debug, Deserialize)]
pub struct CatalogContent {
    pub touch: TouchType,
    pub title: String,
    /// Absent for the default content of a touch type.
    pub course_day: Option<i32>,
    pub video_file: Option<String>,
    pub video_url: Option<String>,
    pub transcript: Option<String>,
    pub summary: Option<String>,
    #[serde(default)]
    pub questions: Vec<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub position: i32,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub days: usize,
    pub contents: usize,
}

impl Catalog {
    pub fn from_path(path: &Path) -> Result<Catalog> {
        let raw = std::fs::read_to_string(path)?;
        let catalog: Catalog = serde_json::from_str(&raw)?;
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<()> {
        if let Some(day) = self.days.iter().find(|day| day.ordinal < 1) {
            return Err(CadenceErrorKind::Config(format!(
                "course day ordinals start at 1, got {}",
                day.ordinal
            ))
            .into());
        }
        if let Some(content) = self.contents.iter().find(|c| c.title.trim().is_empty()) {
            return Err(CadenceErrorKind::Config(format!(
                "{} content without a title",
                content.touch
            ))
            .into());
        }
        Ok(())
    }
}

pub async fn import(
    catalog: Catalog,
    now: DateTime<Utc>,
    db: &DatabaseConnection,
) -> Result<ImportSummary> {
    let mut summary = ImportSummary::default();
    for day in catalog.days {
        db::course_day::upsert(day.ordinal, &day.title, day.is_active, db).await?;
        summary.days += 1;
    }

    for content in catalog.contents {
        let questions = content
            .questions
            .iter()
            .map(|q| q.trim())
            .filter(|q| !q.is_empty())
            .collect::<Vec<_>>();
        let stored = db::content::upsert(
            content.touch,
            NewContent {
                title: content.title,
                course_day: content.course_day,
                video_file: content.video_file,
                video_url: content.video_url,
                transcript: content.transcript,
                summary: content.summary,
                questions: (!questions.is_empty()).then(|| questions.join("\n")),
                is_active: content.is_active,
                position: content.position,
            },
            now,
            db,
        )
        .await?;
        debug!(content_id = stored.id, touch = %stored.touch_type, "Imported content");
        summary.contents += 1;
    }

    info!(days = summary.days, contents = summary.contents, "Catalog imported");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content;
    use crate::utils::{at, test_db};
    use std::io::Write;

    const CATALOG: &str = r#"{
        "days": [
            { "ordinal": 1, "title": "Arrival" },
            { "ordinal": 2, "title": "Rest", "is_active": false }
        ],
        "contents": [
            {
                "touch": "morning",
                "title": "Breathing",
                "course_day": 1,
                "video_url": "https://videos.example/breathing",
                "questions": ["How did it feel?", " ", "What changed?"]
            },
            { "touch": "morning", "title": "Default morning", "summary": "Keep going" }
        ]
    }"#;

    fn write_catalog(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn imports_days_and_contents() {
        let db = test_db().await;
        let file = write_catalog(CATALOG);
        let catalog = Catalog::from_path(file.path()).unwrap();

        let summary = import(catalog, at("2025-03-01T00:00:00Z"), &db).await.unwrap();
        assert_eq!(summary, ImportSummary { days: 2, contents: 2 });

        let day_one = content::resolve(TouchType::Morning, Some(1), &db).await.unwrap().unwrap();
        assert_eq!(day_one.title, "Breathing");
        assert_eq!(day_one.questions.as_deref(), Some("How did it feel?\nWhat changed?"));

        // day 2 is disabled, so the default applies
        let day_two = content::resolve(TouchType::Morning, Some(2), &db).await.unwrap().unwrap();
        assert_eq!(day_two.title, "Default morning");
    }

    #[tokio::test]
    async fn reimport_updates_in_place() {
        let db = test_db().await;
        let catalog = Catalog::from_path(write_catalog(CATALOG).path()).unwrap();
        import(catalog, at("2025-03-01T00:00:00Z"), &db).await.unwrap();
        let before = db::content::default_for(TouchType::Morning, &db).await.unwrap().unwrap();

        let edited = CATALOG.replace("Keep going", "Keep it up");
        let catalog = Catalog::from_path(write_catalog(&edited).path()).unwrap();
        import(catalog, at("2025-03-02T00:00:00Z"), &db).await.unwrap();

        let default = db::content::default_for(TouchType::Morning, &db).await.unwrap().unwrap();
        assert_eq!(default.id, before.id);
        assert_eq!(default.summary.as_deref(), Some("Keep it up"));
    }

    #[test]
    fn rejects_untitled_content() {
        let file = write_catalog(r#"{ "contents": [{ "touch": "day", "title": "  " }] }"#);
        let err = Catalog::from_path(file.path()).unwrap_err();
        assert!(matches!(err.inner(), CadenceErrorKind::Config(_)));
    }
}
