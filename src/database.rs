use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use thiserror::Error;

use crate::ledger::LogState;
use crate::models::{Activity, ActivityCategory, Narrative, Submission, SubmissionStatus};

/// Schema version stored in `PRAGMA user_version`
pub const SCHEMA_VERSION: i64 = 2;

/// Full precision; `%.f` also reads rows written without a fraction
const SUBMITTED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),
    #[error("Failed to create database directory: {0}")]
    DirectoryError(String),
    #[error("Corrupt row in {table}: {message}")]
    CorruptRow { table: &'static str, message: String },
    #[error("Failed to encode submission snapshot: {0}")]
    SnapshotError(#[from] serde_json::Error),
}

pub struct Database {
    conn: Connection,
}

impl Database {
    /// Create a new database connection and initialize the schema
    pub fn new(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DatabaseError::DirectoryError(e.to_string()))?;
            }
        }

        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.initialize_schema()?;
        Ok(db)
    }

    /// In-memory database, mostly for tests
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        let db = Database {
            conn: Connection::open_in_memory()?,
        };
        db.initialize_schema()?;
        Ok(db)
    }

    /// Initialize the database schema (tables and indexes)
    fn initialize_schema(&self) -> Result<(), DatabaseError> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS activities (
                id                      TEXT PRIMARY KEY,
                date                    TEXT NOT NULL,
                category                TEXT NOT NULL,
                task                    TEXT NOT NULL,
                accomplishments         TEXT,
                positive_impact         TEXT,
                challenges              TEXT,
                overcoming_challenges   TEXT,
                future_plans            TEXT,
                achievement_strategy    TEXT,
                achievement_timeframe   TEXT,
                company_benefit         TEXT,
                duration_hours          REAL NOT NULL,
                submitted               INTEGER DEFAULT 0,
                submission_id           TEXT,
                created_at              TEXT NOT NULL,
                position                INTEGER DEFAULT 0
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS submissions (
                id              TEXT PRIMARY KEY,
                period_start    TEXT NOT NULL,
                period_end      TEXT NOT NULL,
                period_label    TEXT NOT NULL,
                submitted_at    TEXT NOT NULL,
                total_hours     REAL NOT NULL,
                activity_count  INTEGER NOT NULL,
                activities      TEXT NOT NULL,
                status          TEXT NOT NULL DEFAULT 'Pending',
                position        INTEGER DEFAULT 0
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_activities_date ON activities(date)",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_activities_submission ON activities(submission_id)",
            [],
        )?;

        self.migrate()?;
        Ok(())
    }

    fn schema_version(&self) -> Result<i64, DatabaseError> {
        Ok(self.conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
    }

    /// Bring older databases up to `SCHEMA_VERSION`
    fn migrate(&self) -> Result<(), DatabaseError> {
        fn column_exists(conn: &Connection, table: &str, column: &str) -> Result<bool, DatabaseError> {
            let mut stmt = conn.prepare("SELECT COUNT(*) FROM pragma_table_info(?1) WHERE name = ?2")?;
            let count: i64 = stmt.query_row(params![table, column], |row| row.get(0))?;
            Ok(count > 0)
        }

        let version = self.schema_version()?;

        // v2: receipt id returned by the payroll backend
        if version < 2 && !column_exists(&self.conn, "submissions", "remote_id")? {
            self.conn.execute("ALTER TABLE submissions ADD COLUMN remote_id TEXT", [])?;
        }

        if version < SCHEMA_VERSION {
            self.conn
                .execute_batch(&format!("PRAGMA user_version = {}", SCHEMA_VERSION))?;
        }
        Ok(())
    }

    /// Helper function to map a row to an Activity
    fn row_to_activity(row: &rusqlite::Row) -> Result<Activity, rusqlite::Error> {
        let date: String = row.get(1)?;
        let category: String = row.get(2)?;
        Ok(Activity {
            id: row.get(0)?,
            date: chrono::NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
            })?,
            category: category.parse::<ActivityCategory>().map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
            })?,
            task: row.get(3)?,
            narrative: Narrative {
                accomplishments: row.get(4)?,
                positive_impact: row.get(5)?,
                challenges: row.get(6)?,
                overcoming_challenges: row.get(7)?,
                future_plans: row.get(8)?,
                achievement_strategy: row.get(9)?,
                achievement_timeframe: row.get(10)?,
                company_benefit: row.get(11)?,
            },
            duration_hours: row.get(12)?,
            submitted: row.get::<_, i64>(13)? != 0,
            submission_id: row.get(14)?,
            created_at: row.get(15)?,
        })
    }

    /// All activities, newest first
    pub fn get_all_activities(&self) -> Result<Vec<Activity>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, date, category, task, accomplishments, positive_impact, challenges,
                    overcoming_challenges, future_plans, achievement_strategy,
                    achievement_timeframe, company_benefit, duration_hours, submitted,
                    submission_id, created_at
             FROM activities ORDER BY position ASC",
        )?;
        let rows = stmt.query_map([], Self::row_to_activity)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn get_activity(&self, id: &str) -> Result<Option<Activity>, DatabaseError> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, date, category, task, accomplishments, positive_impact, challenges,
                        overcoming_challenges, future_plans, achievement_strategy,
                        achievement_timeframe, company_benefit, duration_hours, submitted,
                        submission_id, created_at
                 FROM activities WHERE id = ?1",
                params![id],
                Self::row_to_activity,
            )
            .optional()?)
    }

    /// All submissions, newest first
    pub fn get_all_submissions(&self) -> Result<Vec<Submission>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, period_start, period_end, period_label, submitted_at, total_hours,
                    activity_count, activities, status, remote_id
             FROM submissions ORDER BY position ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, f64>(5)?,
                row.get::<_, i64>(6)?,
                row.get::<_, String>(7)?,
                row.get::<_, String>(8)?,
                row.get::<_, Option<String>>(9)?,
            ))
        })?;

        let mut submissions = Vec::new();
        for row in rows {
            let (id, start, end, label, submitted_at, total_hours, count, activities, status, remote_id) = row?;
            let corrupt = |message: String| DatabaseError::CorruptRow {
                table: "submissions",
                message,
            };
            submissions.push(Submission {
                period_start: chrono::NaiveDate::parse_from_str(&start, "%Y-%m-%d")
                    .map_err(|e| corrupt(format!("{}: period_start: {}", id, e)))?,
                period_end: chrono::NaiveDate::parse_from_str(&end, "%Y-%m-%d")
                    .map_err(|e| corrupt(format!("{}: period_end: {}", id, e)))?,
                submitted_at: chrono::NaiveDateTime::parse_from_str(&submitted_at, SUBMITTED_AT_FORMAT)
                    .map_err(|e| corrupt(format!("{}: submitted_at: {}", id, e)))?,
                status: status
                    .parse::<SubmissionStatus>()
                    .map_err(|e| corrupt(format!("{}: {}", id, e)))?,
                activities: serde_json::from_str(&activities)?,
                period_label: label,
                total_hours,
                activity_count: usize::try_from(count).unwrap_or(0),
                remote_id,
                id,
            });
        }
        Ok(submissions)
    }

    /// Replace the stored state with `state` in one transaction
    pub fn replace_state(&mut self, state: &LogState) -> Result<(), DatabaseError> {
        let tx = self.conn.transaction()?;

        {
            let mut upsert = tx.prepare(
                "INSERT OR REPLACE INTO activities
                    (id, date, category, task, accomplishments, positive_impact, challenges,
                     overcoming_challenges, future_plans, achievement_strategy,
                     achievement_timeframe, company_benefit, duration_hours, submitted,
                     submission_id, created_at, position)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
            )?;
            for (position, a) in state.activities.iter().enumerate() {
                let n = &a.narrative;
                upsert.execute(params![
                    a.id,
                    a.date.format("%Y-%m-%d").to_string(),
                    a.category.as_str(),
                    a.task,
                    n.accomplishments,
                    n.positive_impact,
                    n.challenges,
                    n.overcoming_challenges,
                    n.future_plans,
                    n.achievement_strategy,
                    n.achievement_timeframe,
                    n.company_benefit,
                    a.duration_hours,
                    if a.submitted { 1 } else { 0 },
                    a.submission_id,
                    a.created_at,
                    position as i64,
                ])?;
            }

            let mut upsert = tx.prepare(
                "INSERT OR REPLACE INTO submissions
                    (id, period_start, period_end, period_label, submitted_at, total_hours,
                     activity_count, activities, status, remote_id, position)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )?;
            for (position, s) in state.submissions.iter().enumerate() {
                upsert.execute(params![
                    s.id,
                    s.period_start.format("%Y-%m-%d").to_string(),
                    s.period_end.format("%Y-%m-%d").to_string(),
                    s.period_label,
                    s.submitted_at.format(SUBMITTED_AT_FORMAT).to_string(),
                    s.total_hours,
                    s.activity_count as i64,
                    serde_json::to_string(&s.activities)?,
                    s.status.as_str(),
                    s.remote_id,
                    position as i64,
                ])?;
            }
        }

        // Drop rows that are no longer part of the state
        let keep_activities: Vec<&str> = state.activities.iter().map(|a| a.id.as_str()).collect();
        delete_missing(&tx, "activities", &keep_activities)?;
        let keep_submissions: Vec<&str> = state.submissions.iter().map(|s| s.id.as_str()).collect();
        delete_missing(&tx, "submissions", &keep_submissions)?;

        tx.commit()?;
        Ok(())
    }
}

fn delete_missing(tx: &rusqlite::Transaction, table: &str, keep: &[&str]) -> Result<(), DatabaseError> {
    let existing: Vec<String> = {
        let mut stmt = tx.prepare(&format!("SELECT id FROM {}", table))?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        rows.collect::<Result<_, _>>()?
    };
    let mut delete = tx.prepare(&format!("DELETE FROM {} WHERE id = ?1", table))?;
    for id in existing.iter().filter(|id| !keep.contains(&id.as_str())) {
        delete.execute(params![id])?;
    }
    Ok(())
}
