use async_trait::async_trait;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Params};
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};
use uuid::Uuid;

use super::{DocumentStore, StoreError, StoreResult};
use crate::learn::types::{Course, Learner, ProgressRecord, Quiz, StudyMaterial, Topic};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS learners (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        doc TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS courses (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        doc TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS topics (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        course_id TEXT NOT NULL,
        doc TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS materials (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        topic_id TEXT NOT NULL,
        doc TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS quizzes (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        doc TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS progress (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        learner_id TEXT NOT NULL,
        topic_id TEXT NOT NULL,
        doc TEXT NOT NULL,
        UNIQUE(learner_id, topic_id)
    );

    CREATE INDEX IF NOT EXISTS idx_topics_course ON topics(course_id);
    CREATE INDEX IF NOT EXISTS idx_materials_topic ON materials(topic_id);
    CREATE INDEX IF NOT EXISTS idx_progress_learner ON progress(learner_id);
";

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        match e {
            rusqlite::Error::SqliteFailure(ref err, _)
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StoreError::Duplicate(e.to_string())
            }
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}

fn encode<T: Serialize>(value: &T) -> StoreResult<String> {
    serde_json::to_string(value).map_err(|e| StoreError::Invalid(format!("encode failed: {e}")))
}

fn decode<T: DeserializeOwned>(doc: &str) -> StoreResult<T> {
    serde_json::from_str(doc).map_err(|e| StoreError::Invalid(format!("decode failed: {e}")))
}

fn query_doc<T: DeserializeOwned>(conn: &Connection, sql: &str, key: &str) -> StoreResult<Option<T>> {
    let doc: Option<String> = conn.query_row(sql, [key], |row| row.get(0)).optional()?;
    doc.as_deref().map(decode).transpose()
}

fn query_docs<T: DeserializeOwned, P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> StoreResult<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let docs = stmt
        .query_map(params, |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    docs.iter().map(|doc| decode(doc)).collect()
}

/// `password_hash` never goes into the JSON document, so it is read back from
/// its own column.
fn query_learner(conn: &Connection, sql: &str, key: &str) -> StoreResult<Option<Learner>> {
    let row: Option<(String, String)> = conn
        .query_row(sql, [key], |row| Ok((row.get(0)?, row.get(1)?)))
        .optional()?;
    row.map(|(password_hash, doc)| {
        let mut learner: Learner = decode(&doc)?;
        learner.password_hash = password_hash;
        Ok(learner)
    })
    .transpose()
}

fn write_learner(conn: &Connection, learner: &Learner) -> StoreResult<()> {
    let changed = conn.execute(
        "UPDATE learners SET email = ?2, password_hash = ?3, doc = ?4 WHERE id = ?1",
        params![
            learner.id.to_string(),
            learner.email,
            learner.password_hash,
            encode(learner)?
        ],
    )?;
    if changed == 0 {
        return Err(StoreError::Missing(format!("learner {}", learner.id)));
    }
    Ok(())
}

fn upsert_progress(conn: &Connection, record: &ProgressRecord) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO progress (learner_id, topic_id, doc) VALUES (?1, ?2, ?3)
         ON CONFLICT(learner_id, topic_id) DO UPDATE SET doc = excluded.doc",
        params![
            record.learner_id.to_string(),
            record.topic_id.to_string(),
            encode(record)?
        ],
    )?;
    Ok(())
}

/// Single-file SQLite store. Each record is a JSON document next to the
/// columns it is looked up by; `seq` keeps scans in insertion order.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Unavailable(format!("cannot create {}: {e}", parent.display()))
            })?;
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
        ",
        )?;

        info!("Opened SQLite store at {}", path.display());
        Self::with_schema(conn)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::with_schema(Connection::open_in_memory()?)
    }

    fn with_schema(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs `f` on the blocking pool with the connection held.
    async fn with_conn<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> StoreResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().unwrap_or_else(PoisonError::into_inner);
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("store task failed: {e}")))?
    }
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn ping(&self) -> StoreResult<()> {
        self.with_conn(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        })
        .await
    }

    async fn insert_learner(&self, learner: Learner) -> StoreResult<Learner> {
        self.with_conn(move |conn| {
            let result = conn.execute(
                "INSERT INTO learners (id, email, password_hash, doc) VALUES (?1, ?2, ?3, ?4)",
                params![
                    learner.id.to_string(),
                    learner.email,
                    learner.password_hash,
                    encode(&learner)?
                ],
            );
            match result.map_err(StoreError::from) {
                Err(StoreError::Duplicate(_)) => Err(StoreError::Duplicate(format!(
                    "learner email {}",
                    learner.email
                ))),
                Err(e) => Err(e),
                Ok(_) => {
                    debug!("Stored learner {}", learner.id);
                    Ok(learner)
                }
            }
        })
        .await
    }

    async fn get_learner(&self, id: Uuid) -> StoreResult<Option<Learner>> {
        self.with_conn(move |conn| {
            query_learner(
                conn,
                "SELECT password_hash, doc FROM learners WHERE id = ?1",
                &id.to_string(),
            )
        })
        .await
    }

    async fn find_learner_by_email(&self, email: &str) -> StoreResult<Option<Learner>> {
        let email = email.to_string();
        self.with_conn(move |conn| {
            query_learner(
                conn,
                "SELECT password_hash, doc FROM learners WHERE email = ?1",
                &email,
            )
        })
        .await
    }

    async fn update_learner(&self, learner: Learner) -> StoreResult<()> {
        self.with_conn(move |conn| write_learner(conn, &learner)).await
    }

    async fn insert_course(&self, course: Course) -> StoreResult<Course> {
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO courses (id, doc) VALUES (?1, ?2)",
                params![course.id.to_string(), encode(&course)?],
            )?;
            Ok(course)
        })
        .await
    }

    async fn get_course(&self, id: Uuid) -> StoreResult<Option<Course>> {
        self.with_conn(move |conn| {
            query_doc(conn, "SELECT doc FROM courses WHERE id = ?1", &id.to_string())
        })
        .await
    }

    async fn list_courses(&self) -> StoreResult<Vec<Course>> {
        self.with_conn(|conn| query_docs(conn, "SELECT doc FROM courses ORDER BY seq", []))
            .await
    }

    async fn insert_topic(&self, topic: Topic) -> StoreResult<Topic> {
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO topics (id, course_id, doc) VALUES (?1, ?2, ?3)",
                params![
                    topic.id.to_string(),
                    topic.course_id.to_string(),
                    encode(&topic)?
                ],
            )?;
            Ok(topic)
        })
        .await
    }

    async fn get_topic(&self, id: Uuid) -> StoreResult<Option<Topic>> {
        self.with_conn(move |conn| {
            query_doc(conn, "SELECT doc FROM topics WHERE id = ?1", &id.to_string())
        })
        .await
    }

    async fn list_topics(&self) -> StoreResult<Vec<Topic>> {
        self.with_conn(|conn| query_docs(conn, "SELECT doc FROM topics ORDER BY seq", []))
            .await
    }

    async fn topics_for_course(&self, course_id: Uuid) -> StoreResult<Vec<Topic>> {
        self.with_conn(move |conn| {
            query_docs(
                conn,
                "SELECT doc FROM topics WHERE course_id = ?1 ORDER BY seq",
                [course_id.to_string()],
            )
        })
        .await
    }

    async fn insert_material(&self, material: StudyMaterial) -> StoreResult<StudyMaterial> {
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO materials (id, topic_id, doc) VALUES (?1, ?2, ?3)",
                params![
                    material.id.to_string(),
                    material.topic_id.to_string(),
                    encode(&material)?
                ],
            )?;
            Ok(material)
        })
        .await
    }

    async fn get_material(&self, id: Uuid) -> StoreResult<Option<StudyMaterial>> {
        self.with_conn(move |conn| {
            query_doc(conn, "SELECT doc FROM materials WHERE id = ?1", &id.to_string())
        })
        .await
    }

    async fn list_materials(&self) -> StoreResult<Vec<StudyMaterial>> {
        self.with_conn(|conn| query_docs(conn, "SELECT doc FROM materials ORDER BY seq", []))
            .await
    }

    async fn materials_for_topic(&self, topic_id: Uuid) -> StoreResult<Vec<StudyMaterial>> {
        self.with_conn(move |conn| {
            query_docs(
                conn,
                "SELECT doc FROM materials WHERE topic_id = ?1 ORDER BY seq",
                [topic_id.to_string()],
            )
        })
        .await
    }

    async fn insert_quiz(&self, quiz: Quiz) -> StoreResult<Quiz> {
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO quizzes (id, doc) VALUES (?1, ?2)",
                params![quiz.id.to_string(), encode(&quiz)?],
            )?;
            Ok(quiz)
        })
        .await
    }

    async fn get_quiz(&self, id: Uuid) -> StoreResult<Option<Quiz>> {
        self.with_conn(move |conn| {
            query_doc(conn, "SELECT doc FROM quizzes WHERE id = ?1", &id.to_string())
        })
        .await
    }

    async fn get_progress(
        &self,
        learner_id: Uuid,
        topic_id: Uuid,
    ) -> StoreResult<Option<ProgressRecord>> {
        self.with_conn(move |conn| {
            let doc: Option<String> = conn
                .query_row(
                    "SELECT doc FROM progress WHERE learner_id = ?1 AND topic_id = ?2",
                    [learner_id.to_string(), topic_id.to_string()],
                    |row| row.get(0),
                )
                .optional()?;
            doc.as_deref().map(decode).transpose()
        })
        .await
    }

    async fn progress_for_learner(&self, learner_id: Uuid) -> StoreResult<Vec<ProgressRecord>> {
        self.with_conn(move |conn| {
            query_docs(
                conn,
                "SELECT doc FROM progress WHERE learner_id = ?1 ORDER BY seq",
                [learner_id.to_string()],
            )
        })
        .await
    }

    async fn put_progress(&self, record: ProgressRecord) -> StoreResult<()> {
        self.with_conn(move |conn| upsert_progress(conn, &record)).await
    }

    async fn commit_submission(
        &self,
        progress: ProgressRecord,
        learner: Learner,
    ) -> StoreResult<()> {
        self.with_conn(move |conn| {
            // Dropping the transaction on an early return rolls it back.
            let tx = conn.transaction()?;
            write_learner(&tx, &learner)?;
            upsert_progress(&tx, &progress)?;
            tx.commit()?;
            Ok(())
        })
        .await
    }
}
