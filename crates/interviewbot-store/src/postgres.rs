//! PostgreSQL-backed store for shared deployments.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::info;

use interviewbot_core::error::StoreError;
use interviewbot_core::model::{QaPair, Question, Report, Response, StoredReport};
use interviewbot_core::traits::QuestionStore;

use crate::{classify, redact, DEDUPE_QUESTIONS, DEDUPE_RESPONSES};

// Tables created by older deployments use SERIAL ids, so reads cast to BIGINT.
const SCHEMA: &[&str] = &[
    r#"
CREATE TABLE IF NOT EXISTS questions (
    id       BIGSERIAL PRIMARY KEY,
    question TEXT NOT NULL,
    answer   TEXT NOT NULL
)"#,
    r#"
CREATE TABLE IF NOT EXISTS responses (
    id          BIGSERIAL PRIMARY KEY,
    candidate   TEXT NOT NULL,
    question_id BIGINT REFERENCES questions(id),
    response    TEXT
)"#,
    r#"
CREATE TABLE IF NOT EXISTS reports (
    id         BIGSERIAL PRIMARY KEY,
    candidate  TEXT NOT NULL,
    score      INTEGER,
    total      INTEGER,
    report     TEXT,
    eligible   BOOLEAN,
    created_at TIMESTAMPTZ DEFAULT NOW()
)"#,
    "ALTER TABLE reports ADD COLUMN IF NOT EXISTS report TEXT",
    "ALTER TABLE reports ADD COLUMN IF NOT EXISTS eligible BOOLEAN",
    "ALTER TABLE reports ADD COLUMN IF NOT EXISTS created_at TIMESTAMPTZ DEFAULT NOW()",
    DEDUPE_RESPONSES,
    DEDUPE_QUESTIONS,
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_questions_pair ON questions(question, answer)",
    "CREATE INDEX IF NOT EXISTS idx_reports_candidate ON reports(candidate)",
];

/// Store backed by a PostgreSQL database.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect and apply the schema. Fails with [`StoreError::Unavailable`]
    /// when the server cannot be reached within `connect_timeout`.
    pub async fn connect(url: &str, connect_timeout: Duration) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(connect_timeout)
            .connect(url)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .map_err(classify)?;
        }

        info!(url = %redact(url), "postgres store connected");
        Ok(Self { pool })
    }
}

fn report_from_row(row: &PgRow) -> StoredReport {
    StoredReport {
        id: row.get("id"),
        candidate: row.get("candidate"),
        score: row.get::<Option<i64>, _>("score").unwrap_or_default(),
        total: row.get::<Option<i64>, _>("total").unwrap_or_default(),
        feedback: row.get("report"),
        eligible: row.get("eligible"),
        created_at: row.get::<Option<DateTime<Utc>>, _>("created_at"),
    }
}

#[async_trait]
impl QuestionStore for PgStore {
    fn kind(&self) -> &str {
        "postgres"
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
                "INSERT INTO questions (question, answer) VALUES ($1, $2) ON CONFLICT DO NOTHING",
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
        let rows = sqlx::query(
            "SELECT CAST(id AS BIGINT) AS id, question, answer FROM questions ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(classify)?;
        Ok(rows
            .iter()
            .map(|row| Question {
                id: row.get("id"),
                question: row.get("question"),
                answer: row.get("answer"),
            })
            .collect())
    }

    async fn record_responses(&self, responses: &[Response]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(classify)?;
        for r in responses {
            sqlx::query(
                "INSERT INTO responses (candidate, question_id, response) VALUES ($1, $2, $3)",
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
            "INSERT INTO reports (candidate, score, total, report, eligible) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&report.candidate)
        .bind(report.score as i32)
        .bind(report.total as i32)
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
                    "SELECT CAST(id AS BIGINT) AS id, candidate, \
                     CAST(score AS BIGINT) AS score, CAST(total AS BIGINT) AS total, \
                     report, eligible, created_at \
                     FROM reports WHERE candidate = $1 ORDER BY id DESC",
                )
                .bind(name)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(
                    "SELECT CAST(id AS BIGINT) AS id, candidate, \
                     CAST(score AS BIGINT) AS score, CAST(total AS BIGINT) AS total, \
                     report, eligible, created_at \
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
            "SELECT candidate, CAST(question_id AS BIGINT) AS question_id, response \
             FROM responses WHERE candidate = $1 ORDER BY id",
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
