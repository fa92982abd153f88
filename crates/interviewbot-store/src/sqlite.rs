//! SQLite-backed store. The default for local use.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tracing::info;

use interviewbot_core::error::StoreError;
use interviewbot_core::model::{QaPair, Question, Report, Response, StoredReport};
use interviewbot_core::traits::QuestionStore;

use crate::{classify, redact, DEDUPE_QUESTIONS, DEDUPE_RESPONSES};

const SCHEMA: &[&str] = &[
    r#"
CREATE TABLE IF NOT EXISTS questions (
    id       INTEGER PRIMARY KEY AUTOINCREMENT,
    question TEXT NOT NULL,
    answer   TEXT NOT NULL
)"#,
    r#"
CREATE TABLE IF NOT EXISTS responses (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    candidate   TEXT NOT NULL,
    question_id INTEGER REFERENCES questions(id),
    response    TEXT
)"#,
    r#"
CREATE TABLE IF NOT EXISTS reports (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    candidate  TEXT NOT NULL,
    score      INTEGER,
    total      INTEGER,
    report     TEXT,
    eligible   INTEGER,
    created_at TEXT
)"#,
];

/// Columns added to `reports` after the first schema. SQLite has no
/// `ADD COLUMN IF NOT EXISTS`, so these are checked against `pragma_table_info`.
const REPORT_COLUMNS: &[(&str, &str)] = &[
    ("report", "report TEXT"),
    ("eligible", "eligible INTEGER"),
    ("created_at", "created_at TEXT"),
];

/// Run after the column migration. Older databases may hold duplicate
/// pairs, which would stop the unique index from being built.
const INDEXES: &[&str] = &[
    DEDUPE_RESPONSES,
    DEDUPE_QUESTIONS,
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_questions_pair ON questions(question, answer)",
    "CREATE INDEX IF NOT EXISTS idx_reports_candidate ON reports(candidate)",
];

/// Store backed by a SQLite file (or an in-memory database).
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `url` and apply the schema.
    pub async fn open(url: &str, connect_timeout: Duration) -> Result<Self, StoreError> {
        let in_memory = url.contains(":memory:");
        let mut opts = SqliteConnectOptions::from_str(url)
            .map_err(|e| StoreError::UnsupportedUrl(format!("{}: {e}", redact(url))))?
            .create_if_missing(true);
        if !in_memory {
            opts = opts.journal_mode(SqliteJournalMode::Wal);
        }

        // Every connection to `:memory:` is its own database, so keep one
        // connection alive for the lifetime of the pool.
        let pool_opts = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(4)
        };

        let pool = pool_opts
            .acquire_timeout(connect_timeout)
            .connect_with(opts)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .map_err(classify)?;
        }
        add_missing_report_columns(&pool).await?;
        for statement in INDEXES {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .map_err(classify)?;
        }

        info!(url = %redact(url), "sqlite store opened");
        Ok(Self { pool })
    }

    /// A fresh private in-memory database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        Self::open("sqlite::memory:", Duration::from_secs(5)).await
    }
}

async fn add_missing_report_columns(pool: &SqlitePool) -> Result<(), StoreError> {
    let existing: Vec<String> = sqlx::query("SELECT name FROM pragma_table_info('reports')")
        .fetch_all(pool)
        .await
        .map_err(classify)?
        .iter()
        .map(|row| row.get("name"))
        .collect();

    for (name, definition) in REPORT_COLUMNS {
        if existing.iter().any(|c| c == name) {
            continue;
        }
        let ddl = format!("ALTER TABLE reports ADD COLUMN {definition}");
        sqlx::query(&ddl).execute(pool).await.map_err(classify)?;
        info!(column = name, "added column to reports");
    }
    Ok(())
}

fn question_from_row(row: &SqliteRow) -> Question {
    Question {
        id: row.get("id"),
        question: row.get("question"),
        answer: row.get("answer"),
    }
}

fn report_from_row(row: &SqliteRow) -> StoredReport {
    StoredReport {
        id: row.get("id"),
        candidate: row.get("candidate"),
        score: row.get::<Option<i64>, _>("score").unwrap_or_default(),
        total: row.get::<Option<i64>, _>("total").unwrap_or_default(),
        feedback: row.get("report"),
        eligible: row.get("eligible"),
        created_at: row
            .try_get::<Option<DateTime<Utc>>, _>("created_at")
            .unwrap_or(None),
    }
}

#[async_trait]
impl QuestionStore for SqliteStore {
    fn kind(&self) -> &str {
        "sqlite"
    }

    async fn count_questions(&self) -> Result<u64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM questions")
            .fetch_one(&self.pool)
            .await
            .map_err(classify)?;
        Ok(row.get::<i64, _>("n") as u64)
    }

    async fn insert_questions(&self, pairs: &[QaPair]) -> Result<usize, StoreError> {
        let mut tx = self.pool.begin().await.map_err(classify)?;
        let mut inserted = 0usize;
        for pair in pairs {
            let result = sqlx::query(
                "INSERT INTO questions (question, answer) VALUES (?1, ?2) ON CONFLICT DO NOTHING",
            )
            .bind(&pair.question)
            .bind(&pair.answer)
            .execute(&mut *tx)
            .await
            .map_err(classify)?;
            inserted += result.rows_affected() as usize;
        }
        tx.commit().await.map_err(classify)?;
        Ok(inserted)
    }

    async fn all_questions(&self) -> Result<Vec<Question>, StoreError> {
        let rows = sqlx::query("SELECT id, question, answer FROM questions ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(classify)?;
        Ok(rows.iter().map(question_from_row).collect())
    }

    async fn record_responses(&self, responses: &[Response]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(classify)?;
        for r in responses {
            sqlx::query(
                "INSERT INTO responses (candidate, question_id, response) VALUES (?1, ?2, ?3)",
            )
            .bind(&r.candidate)
            .bind(r.question_id)
            .bind(&r.response)
            .execute(&mut *tx)
            .await
            .map_err(classify)?;
        }
        tx.commit().await.map_err(classify)
    }

    async fn record_report(&self, report: &Report) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO reports (candidate, score, total, report, eligible, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, datetime('now'))",
        )
        .bind(&report.candidate)
        .bind(i64::from(report.score))
        .bind(i64::from(report.total))
        .bind(report.feedback.message())
        .bind(report.eligible)
        .execute(&self.pool)
        .await
        .map_err(classify)?;
        Ok(())
    }

    async fn list_reports(&self, candidate: Option<&str>) -> Result<Vec<StoredReport>, StoreError> {
        let rows = match candidate {
            Some(name) => {
                sqlx::query(
                    "SELECT id, candidate, score, total, report, eligible, created_at \
                     FROM reports WHERE candidate = ?1 ORDER BY id DESC",
                )
                .bind(name)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(
                    "SELECT id, candidate, score, total, report, eligible, created_at \
                     FROM reports ORDER BY id DESC",
                )
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(classify)?;
        Ok(rows.iter().map(report_from_row).collect())
    }

    async fn responses_for(&self, candidate: &str) -> Result<Vec<Response>, StoreError> {
        let rows = sqlx::query(
            "SELECT candidate, question_id, response FROM responses WHERE candidate = ?1 ORDER BY id",
        )
        .bind(candidate)
        .fetch_all(&self.pool)
        .await
        .map_err(classify)?;
        Ok(rows
            .iter()
            .map(|row| Response {
                candidate: row.get("candidate"),
                question_id: row.get::<Option<i64>, _>("question_id").unwrap_or_default(),
                response: row.get::<Option<String>, _>("response").unwrap_or_default(),
            })
            .collect())
    }
}
