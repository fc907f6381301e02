use chrono::{Duration, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::ingest::{self, ImportedItem};
use crate::models::{Category, WorkItem};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<usize> {
    let now = Utc::now();
    let items = vec![
        (
            "seed-bio-midterm",
            "Midterm quiz",
            "BIO-101",
            Category::Quiz,
            Duration::hours(20),
            Some(25.0),
            Some(100.0),
            Some(64.0),
        ),
        (
            "seed-bio-forum",
            "Week 6 forum post",
            "BIO-101",
            Category::Discussion,
            Duration::days(3),
            Some(5.0),
            Some(10.0),
            Some(9.5),
        ),
        (
            "seed-chem-lab",
            "Titration lab report",
            "CHEM-110",
            Category::Assignment,
            Duration::days(2),
            Some(15.0),
            Some(50.0),
            Some(36.0),
        ),
        (
            "seed-chem-notice",
            "Lab safety reminder",
            "CHEM-110",
            Category::Announcement,
            Duration::days(5),
            None,
            None,
            None,
        ),
        (
            "seed-hist-essay",
            "Reconstruction essay",
            "HIST-200",
            Category::Assignment,
            Duration::days(12),
            Some(30.0),
            None,
            None,
        ),
    ];

    let mut inserted = 0usize;
    for (source_key, title, group_id, category, due_in, grade_weight, possible, score) in items {
        let result = sqlx::query(
            r#"
            INSERT INTO canvaspal.work_items
            (id, source_key, title, group_id, category, due_at,
             grade_weight, points_possible, current_score, completed)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, FALSE)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(source_key)
        .bind(title)
        .bind(group_id)
        .bind(category.as_str())
        .bind(now + due_in)
        .bind(grade_weight)
        .bind(possible)
        .bind(score)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            inserted += 1;
        }
    }

    Ok(inserted)
}

pub async fn fetch_items(pool: &PgPool, group_id: Option<&str>) -> anyhow::Result<Vec<WorkItem>> {
    let mut query = String::from(
        "SELECT title, group_id, category, due_at, grade_weight, points_possible, \
         current_score, completed \
         FROM canvaspal.work_items",
    );

    if group_id.is_some() {
        query.push_str(" WHERE group_id = $1");
    }
    query.push_str(" ORDER BY due_at");

    let mut rows = sqlx::query(&query);
    if let Some(value) = group_id {
        rows = rows.bind(value);
    }

    let records = rows.fetch_all(pool).await?;
    let mut items = Vec::with_capacity(records.len());

    for row in records {
        let category: String = row.get("category");
        items.push(WorkItem {
            title: row.get("title"),
            due_at: row.get("due_at"),
            group_id: row.get("group_id"),
            grade_weight: row.get("grade_weight"),
            points_possible: row.get("points_possible"),
            current_score: row.get("current_score"),
            completed: row.get("completed"),
            category: Category::from(category.as_str()),
        });
    }

    tracing::debug!(count = items.len(), group = group_id.unwrap_or("all"), "fetched work items");
    Ok(items)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportCounts {
    pub inserted: usize,
    pub updated: usize,
}

impl ImportCounts {
    fn record(&mut self, inserted: bool) {
        if inserted {
            self.inserted += 1;
        } else {
            self.updated += 1;
        }
    }
}

/// Returns true for a new row, false when an existing source key was updated.
async fn upsert_item(pool: &PgPool, imported: &ImportedItem) -> anyhow::Result<bool> {
    let item = &imported.item;
    let source_key = imported
        .source_key
        .clone()
        .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

    let row = sqlx::query(
        r#"
        INSERT INTO canvaspal.work_items
        (id, source_key, title, group_id, category, due_at,
         grade_weight, points_possible, current_score, completed)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ON CONFLICT (source_key) DO UPDATE
        SET title = EXCLUDED.title,
            group_id = EXCLUDED.group_id,
            category = EXCLUDED.category,
            due_at = EXCLUDED.due_at,
            grade_weight = EXCLUDED.grade_weight,
            points_possible = EXCLUDED.points_possible,
            current_score = EXCLUDED.current_score,
            completed = EXCLUDED.completed,
            updated_at = NOW()
        RETURNING (xmax = 0) AS inserted
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&source_key)
    .bind(&item.title)
    .bind(&item.group_id)
    .bind(item.category.as_str())
    .bind(item.due_at)
    .bind(item.grade_weight)
    .bind(item.points_possible)
    .bind(item.current_score)
    .bind(item.completed)
    .fetch_one(pool)
    .await?;

    Ok(row.get("inserted"))
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<ImportCounts> {
    let rows = ingest::read_work_items(csv_path)?;
    let mut counts = ImportCounts::default();

    for row in &rows {
        let inserted = upsert_item(pool, row).await?;
        if !inserted {
            tracing::debug!(title = %row.item.title, "updated existing work item");
        }
        counts.record(inserted);
    }

    Ok(counts)
}

/// Returns false when no item carries the given source key.
pub async fn set_completed(pool: &PgPool, source_key: &str, completed: bool) -> anyhow::Result<bool> {
    let result = sqlx::query(
        "UPDATE canvaspal.work_items SET completed = $1, updated_at = NOW() WHERE source_key = $2",
    )
    .bind(completed)
    .bind(source_key)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
