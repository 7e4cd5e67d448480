//! Database operations for the store module

use crate::config::DatabaseConfig;
use crate::extractor::ExtractedRecord;
use crate::retry::{RetryPolicy, retry};
use crate::store::error::DbError;
use crate::store::schema;
use crate::store::{LastExtractedUserStatus, SearchResult, User};
use chrono::{DateTime, Utc};
use libsql::{Connection, Row, Rows, Value, params};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Database manager for searches and extracted records
#[derive(Clone)]
pub struct Database {
    conn: Connection,
    retry: RetryPolicy,
}

impl Database {
    /// Create a new database manager on an open connection
    #[instrument(skip(conn))]
    pub async fn new(conn: Connection) -> Result<Self, DbError> {
        schema::initialize_schema(&conn).await?;

        Ok(Self {
            conn,
            retry: RetryPolicy::default(),
        })
    }

    /// Open (or create) a local database file
    pub async fn new_from_path(path: &str) -> Result<Self, DbError> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DbError::Connection(format!("Failed to open database: {}", e)))?;

        let conn = db
            .connect()
            .map_err(|e| DbError::Connection(format!("Failed to connect to database: {}", e)))?;

        Self::new(conn).await
    }

    /// Connect to a remote libsql server
    pub async fn new_remote(url: &str, auth_token: &str) -> Result<Self, DbError> {
        let db = libsql::Builder::new_remote(url.to_string(), auth_token.to_string())
            .build()
            .await
            .map_err(|e| DbError::Connection(format!("Failed to open remote database: {}", e)))?;

        let conn = db
            .connect()
            .map_err(|e| DbError::Connection(format!("Failed to connect to {}: {}", url, e)))?;

        Self::new(conn).await
    }

    /// Open the database described by `config`, preferring the remote url
    pub async fn from_config(config: &DatabaseConfig) -> Result<Self, DbError> {
        match &config.url {
            Some(url) => {
                Self::new_remote(url, config.auth_token.as_deref().unwrap_or_default()).await
            }
            None => Self::new_from_path(&config.path.to_string_lossy()).await,
        }
    }

    /// Replace the retry policy used by every operation
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Execute a custom query with parameters
    pub async fn execute_query<P>(&self, sql: &str, params: P) -> Result<Rows, DbError>
    where
        P: libsql::params::IntoParams,
    {
        self.conn
            .query(sql, params)
            .await
            .map_err(|e| DbError::Query(format!("Failed to execute query: {}", e)))
    }

    /// Add a user
    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn insert_user(&self, user: &User) -> Result<(), DbError> {
        retry(&self.retry, "insert_user", move || async move {
            self.conn
                .execute(
                    "INSERT INTO users (user_id, created_at) VALUES (?, ?)",
                    params![user.user_id.clone(), user.created_at.timestamp_millis()],
                )
                .await
                .map_err(|e| DbError::Query(format!("Failed to add user: {}", e)))?;
            Ok::<_, DbError>(())
        })
        .await
    }

    /// Get all users
    #[instrument(skip(self))]
    pub async fn fetch_all_users(&self) -> Result<Vec<User>, DbError> {
        retry(&self.retry, "fetch_all_users", move || async move {
            let mut rows = self
                .conn
                .query(
                    "SELECT user_id, created_at FROM users ORDER BY created_at",
                    params![],
                )
                .await
                .map_err(|e| DbError::Query(format!("Failed to get users: {}", e)))?;

            let mut users = Vec::new();
            while let Some(row) = next_row(&mut rows).await? {
                users.push(row_to_user(&row)?);
            }
            Ok::<_, DbError>(users)
        })
        .await
    }

    /// Store a raw search
    #[instrument(skip(self, search), fields(search_id = %search.search_id))]
    pub async fn insert_search(&self, search: &SearchResult) -> Result<(), DbError> {
        retry(&self.retry, "insert_search", move || async move {
            self.conn
                .execute(
                    "INSERT INTO search_results (search_id, user_id, search_term, result, created_at)
                     VALUES (?, ?, ?, ?, ?)",
                    params![
                        search.search_id.clone(),
                        search.user_id.clone(),
                        search.search_term.clone(),
                        search.result.clone(),
                        search.created_at.timestamp_millis(),
                    ],
                )
                .await
                .map_err(|e| DbError::Query(format!("Failed to add search: {}", e)))?;
            Ok::<_, DbError>(())
        })
        .await
    }

    /// Get all raw searches
    #[instrument(skip(self))]
    pub async fn fetch_all_searches(&self) -> Result<Vec<SearchResult>, DbError> {
        retry(&self.retry, "fetch_all_searches", move || async move {
            let mut rows = self
                .conn
                .query(
                    "SELECT search_id, user_id, search_term, result, created_at
                     FROM search_results
                     ORDER BY created_at",
                    params![],
                )
                .await
                .map_err(|e| DbError::Query(format!("Failed to get searches: {}", e)))?;

            collect_searches(&mut rows).await
        })
        .await
    }

    /// Get a user's raw searches created strictly after `since`
    #[instrument(skip(self))]
    pub async fn fetch_searches_for_user(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<SearchResult>, DbError> {
        retry(&self.retry, "fetch_searches_for_user", move || async move {
            let mut rows = self
                .conn
                .query(
                    "SELECT search_id, user_id, search_term, result, created_at
                     FROM search_results
                     WHERE user_id = ? AND created_at > ?
                     ORDER BY created_at",
                    params![user_id.to_string(), since.timestamp_millis()],
                )
                .await
                .map_err(|e| DbError::Query(format!("Failed to get searches for user: {}", e)))?;

            collect_searches(&mut rows).await
        })
        .await
    }

    /// Store one extracted record
    #[instrument(skip(self, record), fields(id = %record.id))]
    pub async fn insert_extracted(&self, record: &ExtractedRecord) -> Result<(), DbError> {
        retry(&self.retry, "insert_extracted", move || async move {
            self.conn
                .execute(INSERT_EXTRACTED, extracted_params(record))
                .await
                .map_err(|e| DbError::Query(format!("Failed to add extracted record: {}", e)))?;
            Ok::<_, DbError>(())
        })
        .await
    }

    /// Store many extracted records in a single transaction
    pub async fn bulk_insert_extracted(&self, records: &[ExtractedRecord]) -> Result<(), DbError> {
        self.store_run(records, &[]).await
    }

    /// Get all extracted records
    #[instrument(skip(self))]
    pub async fn fetch_all_extracted(&self) -> Result<Vec<ExtractedRecord>, DbError> {
        retry(&self.retry, "fetch_all_extracted", move || async move {
            let mut rows = self
                .conn
                .query(
                    "SELECT id, user_id, url, date, body, created_at
                     FROM extracted_search_results
                     ORDER BY created_at",
                    params![],
                )
                .await
                .map_err(|e| DbError::Query(format!("Failed to get extracted records: {}", e)))?;

            collect_extracted(&mut rows).await
        })
        .await
    }

    /// Get the extracted records of one user
    #[instrument(skip(self))]
    pub async fn fetch_extracted_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<ExtractedRecord>, DbError> {
        retry(&self.retry, "fetch_extracted_for_user", move || async move {
            let mut rows = self
                .conn
                .query(
                    "SELECT id, user_id, url, date, body, created_at
                     FROM extracted_search_results
                     WHERE user_id = ?
                     ORDER BY created_at",
                    params![user_id.to_string()],
                )
                .await
                .map_err(|e| DbError::Query(format!("Failed to get extracted records: {}", e)))?;

            collect_extracted(&mut rows).await
        })
        .await
    }

    /// Record a pipeline run for a user
    #[instrument(skip(self, status), fields(user_id = %status.user_id))]
    pub async fn insert_status(&self, status: &LastExtractedUserStatus) -> Result<(), DbError> {
        retry(&self.retry, "insert_status", move || async move {
            self.conn
                .execute(INSERT_STATUS, status_params(status))
                .await
                .map_err(|e| DbError::Query(format!("Failed to add status: {}", e)))?;
            Ok::<_, DbError>(())
        })
        .await
    }

    /// Store the outcome of a pipeline run: the extracted records and the
    /// status rows of the users it covered, committed in one transaction.
    ///
    /// Nothing is written when any insert fails.
    #[instrument(
        skip(self, records, statuses),
        fields(records = records.len(), statuses = statuses.len())
    )]
    pub async fn store_run(
        &self,
        records: &[ExtractedRecord],
        statuses: &[LastExtractedUserStatus],
    ) -> Result<(), DbError> {
        if records.is_empty() && statuses.is_empty() {
            return Ok(());
        }

        retry(&self.retry, "store_run", move || async move {
            let tx = self
                .conn
                .transaction()
                .await
                .map_err(|e| DbError::Transaction(format!("Failed to start transaction: {}", e)))?;

            let inserted = async {
                for record in records {
                    tx.execute(INSERT_EXTRACTED, extracted_params(record))
                        .await
                        .map_err(|e| {
                            DbError::Query(format!("Failed to add extracted record: {}", e))
                        })?;
                }
                for status in statuses {
                    tx.execute(INSERT_STATUS, status_params(status))
                        .await
                        .map_err(|e| DbError::Query(format!("Failed to add status: {}", e)))?;
                }
                Ok::<_, DbError>(())
            }
            .await;

            if let Err(err) = inserted {
                if let Err(e) = tx.rollback().await {
                    warn!("Failed to roll back run: {}", e);
                }
                return Err(err);
            }

            tx.commit()
                .await
                .map_err(|e| DbError::Transaction(format!("Failed to commit transaction: {}", e)))?;

            debug!(
                "Stored {} extracted records and {} statuses",
                records.len(),
                statuses.len()
            );
            Ok::<_, DbError>(())
        })
        .await
    }

    /// Most recent run recorded for a user
    #[instrument(skip(self))]
    pub async fn fetch_latest_status(
        &self,
        user_id: &str,
    ) -> Result<Option<LastExtractedUserStatus>, DbError> {
        retry(&self.retry, "fetch_latest_status", move || async move {
            let mut rows = self
                .conn
                .query(
                    "SELECT id, user_id, last_run
                     FROM last_extracted_user_status
                     WHERE user_id = ?
                     ORDER BY last_run DESC
                     LIMIT 1",
                    params![user_id.to_string()],
                )
                .await
                .map_err(|e| DbError::Query(format!("Failed to get latest status: {}", e)))?;

            let status = match next_row(&mut rows).await? {
                Some(row) => Some(row_to_status(&row)?),
                None => None,
            };
            Ok::<_, DbError>(status)
        })
        .await
    }

    /// All recorded runs
    #[instrument(skip(self))]
    pub async fn fetch_all_status(&self) -> Result<Vec<LastExtractedUserStatus>, DbError> {
        retry(&self.retry, "fetch_all_status", move || async move {
            let mut rows = self
                .conn
                .query(
                    "SELECT id, user_id, last_run FROM last_extracted_user_status ORDER BY last_run",
                    params![],
                )
                .await
                .map_err(|e| DbError::Query(format!("Failed to get statuses: {}", e)))?;

            let mut statuses = Vec::new();
            while let Some(row) = next_row(&mut rows).await? {
                statuses.push(row_to_status(&row)?);
            }
            Ok::<_, DbError>(statuses)
        })
        .await
    }
}

const INSERT_EXTRACTED: &str =
    "INSERT INTO extracted_search_results (id, user_id, url, date, body, created_at)
     VALUES (?, ?, ?, ?, ?, ?)";

const INSERT_STATUS: &str =
    "INSERT INTO last_extracted_user_status (id, user_id, last_run) VALUES (?, ?, ?)";

fn extracted_params(record: &ExtractedRecord) -> Vec<Value> {
    vec![
        record.id.to_string().into(),
        record.owner_id.clone().into(),
        record.url.clone().into(),
        record.date.clone().into(),
        record.body.clone().into(),
        record.created_at.timestamp_millis().into(),
    ]
}

fn status_params(status: &LastExtractedUserStatus) -> Vec<Value> {
    vec![
        status.id.clone().into(),
        status.user_id.clone().into(),
        status.last_run.timestamp_millis().into(),
    ]
}

async fn next_row(rows: &mut Rows) -> Result<Option<Row>, DbError> {
    rows.next()
        .await
        .map_err(|e| DbError::Query(format!("Failed to read row: {}", e)))
}

async fn collect_searches(rows: &mut Rows) -> Result<Vec<SearchResult>, DbError> {
    let mut searches = Vec::new();
    while let Some(row) = next_row(rows).await? {
        searches.push(row_to_search(&row)?);
    }
    Ok(searches)
}

async fn collect_extracted(rows: &mut Rows) -> Result<Vec<ExtractedRecord>, DbError> {
    let mut records = Vec::new();
    while let Some(row) = next_row(rows).await? {
        records.push(row_to_extracted(&row)?);
    }
    Ok(records)
}

fn text_column(row: &Row, idx: i32, name: &str) -> Result<String, DbError> {
    row.get::<String>(idx)
        .map_err(|e| DbError::Data(format!("Failed to get {}: {}", name, e)))
}

fn timestamp_column(row: &Row, idx: i32, name: &str) -> Result<DateTime<Utc>, DbError> {
    let millis: i64 = row
        .get(idx)
        .map_err(|e| DbError::Data(format!("Failed to get {}: {}", name, e)))?;
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| DbError::Data(format!("{} out of range: {}", name, millis)))
}

fn row_to_user(row: &Row) -> Result<User, DbError> {
    Ok(User {
        user_id: text_column(row, 0, "user_id")?,
        created_at: timestamp_column(row, 1, "created_at")?,
    })
}

fn row_to_search(row: &Row) -> Result<SearchResult, DbError> {
    let result = match row
        .get_value(3)
        .map_err(|e| DbError::Data(format!("Failed to get result: {}", e)))?
    {
        Value::Null => None,
        Value::Text(text) => Some(text),
        other => {
            return Err(DbError::Data(format!(
                "Unexpected result column type: {:?}",
                other
            )));
        }
    };

    Ok(SearchResult {
        search_id: text_column(row, 0, "search_id")?,
        user_id: text_column(row, 1, "user_id")?,
        search_term: text_column(row, 2, "search_term")?,
        result,
        created_at: timestamp_column(row, 4, "created_at")?,
    })
}

fn row_to_extracted(row: &Row) -> Result<ExtractedRecord, DbError> {
    let id = text_column(row, 0, "id")?;
    Ok(ExtractedRecord {
        id: Uuid::parse_str(&id)
            .map_err(|e| DbError::Data(format!("Invalid record id '{}': {}", id, e)))?,
        owner_id: text_column(row, 1, "user_id")?,
        url: text_column(row, 2, "url")?,
        date: text_column(row, 3, "date")?,
        body: text_column(row, 4, "body")?,
        created_at: timestamp_column(row, 5, "created_at")?,
    })
}

fn row_to_status(row: &Row) -> Result<LastExtractedUserStatus, DbError> {
    Ok(LastExtractedUserStatus {
        id: text_column(row, 0, "id")?,
        user_id: text_column(row, 1, "user_id")?,
        last_run: timestamp_column(row, 2, "last_run")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::tempdir;

    async fn setup_test_db() -> Result<(Database, tempfile::TempDir), DbError> {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();

        let db = Database::new_from_path(&db_path)
            .await?
            .with_retry_policy(RetryPolicy::none());

        Ok((db, temp_dir))
    }

    fn at(millis: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(millis).unwrap()
    }

    #[tokio::test]
    async fn test_database_initialization() {
        let (db, _temp_dir) = setup_test_db().await.unwrap();

        let mut result = db
            .execute_query(
                "SELECT name FROM sqlite_master WHERE type='table' ORDER BY name",
                params![],
            )
            .await
            .unwrap();

        let mut tables = Vec::new();
        while let Ok(Some(row)) = result.next().await {
            let table_name: String = row.get(0).unwrap();
            tables.push(table_name);
        }

        for expected in schema::table_names() {
            assert!(tables.contains(&expected.to_string()), "missing {}", expected);
        }
    }

    #[tokio::test]
    async fn test_insert_and_fetch_users() {
        let (db, _temp_dir) = setup_test_db().await.unwrap();

        let mut first = User::with_id("user-a");
        first.created_at = at(1_000);
        let mut second = User::with_id("user-b");
        second.created_at = at(2_000);

        db.insert_user(&second).await.unwrap();
        db.insert_user(&first).await.unwrap();

        let users = db.fetch_all_users().await.unwrap();
        assert_eq!(users, vec![first, second]);
    }

    #[tokio::test]
    async fn test_duplicate_user_fails() {
        let (db, _temp_dir) = setup_test_db().await.unwrap();
        let user = User::with_id("user-a");

        db.insert_user(&user).await.unwrap();
        assert!(db.insert_user(&user).await.is_err());
    }

    #[tokio::test]
    async fn test_searches_since() {
        let (db, _temp_dir) = setup_test_db().await.unwrap();

        let mut old = SearchResult::new("user-a", "old", Some("<ul></ul>".to_string()));
        old.created_at = at(1_000);
        let mut boundary = SearchResult::new("user-a", "boundary", None);
        boundary.created_at = at(2_000);
        let mut fresh = SearchResult::new("user-a", "fresh", Some("<ol></ol>".to_string()));
        fresh.created_at = at(3_000);
        let mut other_user = SearchResult::new("user-b", "other", None);
        other_user.created_at = at(4_000);

        for search in [&old, &boundary, &fresh, &other_user] {
            db.insert_search(search).await.unwrap();
        }

        let since = db.fetch_searches_for_user("user-a", at(2_000)).await.unwrap();
        assert_eq!(since, vec![fresh.clone()]);

        let all_of_a = db
            .fetch_searches_for_user("user-a", at(0))
            .await
            .unwrap();
        assert_eq!(all_of_a, vec![old, boundary.clone(), fresh]);
        assert_eq!(all_of_a[1].result, None);

        assert_eq!(db.fetch_all_searches().await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_extracted_records() {
        let (db, _temp_dir) = setup_test_db().await.unwrap();

        let mut single = ExtractedRecord::new("user-a", "example.com", "May 14, 2024", "body");
        single.created_at = at(1_000);
        db.insert_extracted(&single).await.unwrap();

        let mut batch = vec![
            ExtractedRecord::new("user-b", "docs.rs", "", "crate docs"),
            ExtractedRecord::new("user-a", "", "Jan 1, 2020", "news"),
        ];
        batch[0].created_at = at(2_000);
        batch[1].created_at = at(3_000);
        db.bulk_insert_extracted(&batch).await.unwrap();
        db.bulk_insert_extracted(&[]).await.unwrap();

        let all = db.fetch_all_extracted().await.unwrap();
        assert_eq!(all, vec![single.clone(), batch[0].clone(), batch[1].clone()]);

        let for_a = db.fetch_extracted_for_user("user-a").await.unwrap();
        assert_eq!(for_a, vec![single, batch[1].clone()]);
    }

    #[tokio::test]
    async fn test_failed_bulk_insert_rolls_back() {
        let (db, _temp_dir) = setup_test_db().await.unwrap();

        let record = ExtractedRecord::new("user-a", "example.com", "", "body");
        let duplicate = vec![
            ExtractedRecord::new("user-a", "other.org", "", "first"),
            record.clone(),
            record,
        ];

        assert!(db.bulk_insert_extracted(&duplicate).await.is_err());
        assert!(db.fetch_all_extracted().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_run_commits_records_and_statuses() {
        let (db, _temp_dir) = setup_test_db().await.unwrap();

        let records = vec![
            ExtractedRecord::new("user-a", "docs.rs", "", "crate docs"),
            ExtractedRecord::new("user-a", "example.com", "May 14, 2024", "body"),
        ];
        let status = LastExtractedUserStatus::at("user-a", at(5_000));

        db.store_run(&records, std::slice::from_ref(&status))
            .await
            .unwrap();

        assert_eq!(db.fetch_extracted_for_user("user-a").await.unwrap().len(), 2);
        assert_eq!(db.fetch_latest_status("user-a").await.unwrap(), Some(status));
    }

    #[tokio::test]
    async fn test_store_run_failed_status_keeps_no_records() {
        let (db, _temp_dir) = setup_test_db().await.unwrap();

        let taken = LastExtractedUserStatus::at("user-a", at(1_000));
        db.insert_status(&taken).await.unwrap();

        let records = vec![ExtractedRecord::new("user-a", "docs.rs", "", "crate docs")];
        let mut clashing = LastExtractedUserStatus::at("user-a", at(9_000));
        clashing.id = taken.id.clone();

        assert!(db.store_run(&records, &[clashing]).await.is_err());
        assert!(db.fetch_all_extracted().await.unwrap().is_empty());
        assert_eq!(db.fetch_latest_status("user-a").await.unwrap(), Some(taken));
    }

    #[tokio::test]
    async fn test_latest_status() {
        let (db, _temp_dir) = setup_test_db().await.unwrap();

        assert_eq!(db.fetch_latest_status("user-a").await.unwrap(), None);

        let now = Utc::now();
        let earlier = LastExtractedUserStatus::at("user-a", now - Duration::hours(2));
        let latest = LastExtractedUserStatus::at("user-a", at(now.timestamp_millis()));
        let other = LastExtractedUserStatus::at("user-b", now + Duration::hours(1));

        db.insert_status(&latest).await.unwrap();
        db.insert_status(&earlier).await.unwrap();
        db.insert_status(&other).await.unwrap();

        let fetched = db.fetch_latest_status("user-a").await.unwrap().unwrap();
        assert_eq!(fetched, latest);
        assert_eq!(db.fetch_all_status().await.unwrap().len(), 3);
    }
}
