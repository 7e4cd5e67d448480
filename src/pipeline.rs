//! # ETL Pipeline
//!
//! Batch job moving raw search pages through the extractor into storage.
//!
//! 1. **Fetch**: every user, the time of their last extraction run (the Unix
//!    epoch if none), and the raw searches created after it.
//! 2. **Extract**: searches without a result page are skipped; every other
//!    page goes through the extractor with the search's user as owner.
//! 3. **Store**: all records and a status row for every user are written in
//!    one transaction, so the next run starts where this one began and a
//!    failed store can be rerun without duplicating records.

use crate::error::Result;
use crate::extractor::{ExtractedRecord, SearchResultExtractor};
use crate::store::{Database, LastExtractedUserStatus, SearchResult, User};
use chrono::{DateTime, Utc};
use futures::future;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument};

/// Progress notifications emitted while the pipeline runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineProgress {
    /// Stage one finished
    Fetched { users: usize, searches: usize },

    /// Stage two finished
    Extracted { records: usize, skipped: usize },

    /// Stage three finished
    Stored { records: usize },
}

/// Summary of a pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    /// Users whose searches were considered
    pub users: usize,

    /// Raw searches fetched since the previous run
    pub searches: usize,

    /// Searches without a result page
    pub skipped: usize,

    /// Records extracted and stored
    pub records: usize,
}

/// Output of stage one
#[derive(Debug, Clone, Default)]
pub struct StagedSearches {
    pub users: Vec<User>,
    pub searches: Vec<SearchResult>,
}

/// Moves raw searches through an extractor into storage
pub struct EtlPipeline<X> {
    db: Database,
    extractor: X,
}

impl<X: SearchResultExtractor> EtlPipeline<X> {
    /// Create a pipeline over `db` using `extractor`
    pub fn new(db: Database, extractor: X) -> Self {
        Self { db, extractor }
    }

    /// Stage one: raw searches created since each user's last run
    #[instrument(skip(self))]
    pub async fn stage_one(&self) -> Result<StagedSearches> {
        let users = self.db.fetch_all_users().await?;

        let per_user = future::try_join_all(
            users
                .iter()
                .map(|user| self.searches_since_last_run(&user.user_id)),
        )
        .await?;

        let searches: Vec<SearchResult> = per_user.into_iter().flatten().collect();
        info!(
            "Fetched {} searches for {} users",
            searches.len(),
            users.len()
        );

        Ok(StagedSearches { users, searches })
    }

    async fn searches_since_last_run(&self, user_id: &str) -> Result<Vec<SearchResult>> {
        let last_run = self
            .db
            .fetch_latest_status(user_id)
            .await?
            .map(|status| status.last_run)
            .unwrap_or(DateTime::UNIX_EPOCH);

        debug!("Fetching searches of {} since {}", user_id, last_run);
        Ok(self.db.fetch_searches_for_user(user_id, last_run).await?)
    }

    /// Stage two: extract records from every search that has a result page.
    ///
    /// Returns the records and the number of searches skipped.
    pub fn stage_two(&self, searches: &[SearchResult]) -> (Vec<ExtractedRecord>, usize) {
        let mut records = Vec::new();
        let mut skipped = 0;

        for search in searches {
            match &search.result {
                Some(html) => {
                    let extracted = self.extractor.extract(html, &search.user_id);
                    debug!(
                        "Extracted {} records from search {}",
                        extracted.len(),
                        search.search_id
                    );
                    records.extend(extracted);
                }
                None => {
                    debug!("Skipping search {} without result", search.search_id);
                    skipped += 1;
                }
            }
        }

        (records, skipped)
    }

    /// Stage three: store the records and mark every user as extracted up to
    /// `run_started`. Records and statuses are committed together, so a failed
    /// store leaves every user's last run where it was.
    #[instrument(skip(self, users, records), fields(records = records.len()))]
    pub async fn stage_three(
        &self,
        users: &[User],
        records: &[ExtractedRecord],
        run_started: DateTime<Utc>,
    ) -> Result<()> {
        let statuses: Vec<_> = users
            .iter()
            .map(|user| LastExtractedUserStatus::at(&user.user_id, run_started))
            .collect();

        self.db.store_run(records, &statuses).await?;
        Ok(())
    }

    /// Run all three stages
    pub async fn run(&self) -> Result<PipelineReport> {
        self.run_with_progress(None).await
    }

    /// Run all three stages, reporting progress on `progress` when given
    #[instrument(skip(self, progress))]
    pub async fn run_with_progress(
        &self,
        progress: Option<mpsc::Sender<PipelineProgress>>,
    ) -> Result<PipelineReport> {
        let run_started = Utc::now();

        let StagedSearches { users, searches } = self.stage_one().await?;
        notify(
            &progress,
            PipelineProgress::Fetched {
                users: users.len(),
                searches: searches.len(),
            },
        )
        .await;

        let (records, skipped) = self.stage_two(&searches);
        notify(
            &progress,
            PipelineProgress::Extracted {
                records: records.len(),
                skipped,
            },
        )
        .await;

        self.stage_three(&users, &records, run_started).await?;
        notify(
            &progress,
            PipelineProgress::Stored {
                records: records.len(),
            },
        )
        .await;

        let report = PipelineReport {
            users: users.len(),
            searches: searches.len(),
            skipped,
            records: records.len(),
        };
        info!(?report, "Pipeline run complete");
        Ok(report)
    }
}

async fn notify(progress: &Option<mpsc::Sender<PipelineProgress>>, event: PipelineProgress) {
    if let Some(sender) = progress {
        // Receiver may be gone; progress is best effort
        let _ = sender.send(event).await;
    }
}
