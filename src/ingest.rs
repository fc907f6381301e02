use std::io::Read;
use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Utc};

use crate::models::{Category, WorkItem};

#[derive(Debug, Clone)]
pub struct ImportedItem {
    pub item: WorkItem,
    pub source_key: Option<String>,
}

#[derive(serde::Deserialize)]
struct CsvRow {
    title: String,
    group_id: String,
    category: String,
    due_at: DateTime<Utc>,
    grade_weight: Option<f64>,
    points_possible: Option<f64>,
    current_score: Option<f64>,
    completed: Option<bool>,
    source_key: Option<String>,
}

impl From<CsvRow> for ImportedItem {
    fn from(row: CsvRow) -> Self {
        ImportedItem {
            item: WorkItem {
                title: row.title,
                due_at: row.due_at,
                group_id: row.group_id,
                grade_weight: row.grade_weight,
                points_possible: row.points_possible,
                current_score: row.current_score,
                completed: row.completed.unwrap_or(false),
                category: Category::from(row.category.as_str()),
            },
            source_key: row.source_key.filter(|key| !key.trim().is_empty()),
        }
    }
}

pub fn read_work_items(csv_path: &Path) -> anyhow::Result<Vec<ImportedItem>> {
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    read_work_items_from(file).with_context(|| format!("failed to parse {}", csv_path.display()))
}

pub fn read_work_items_from<R: Read>(reader: R) -> anyhow::Result<Vec<ImportedItem>> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut items = Vec::new();

    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result.with_context(|| format!("invalid work item on row {}", index + 1))?;
        items.push(ImportedItem::from(row));
    }

    tracing::debug!(count = items.len(), "parsed work items");
    Ok(items)
}
