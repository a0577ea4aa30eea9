//! Concurrent paginated fetch with fan-in aggregation.
//!
//! Every query is walked by its own task. Tasks share nothing except the
//! sending half of a bounded channel; the calling task is the only consumer
//! and owns all de-duplication state.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::config::DEFAULT_PAGE_SIZE;
use super::errors::{AggregateError, FetchError};
use super::exclude::ExclusionFilter;
use super::pager::{PageCursor, ProviderRepo, RepoPager};
use super::progress::{FetchProgress, ProgressCallback, emit};

/// Buffer size of the channel between query workers and the aggregator.
pub const FETCH_CHANNEL_BUFFER_SIZE: usize = 64;

/// The only version control system repositories are kept for.
pub const SUPPORTED_SCM: &str = "git";

/// Options for a single fetch.
#[derive(Debug, Clone, Copy)]
pub struct FetchOptions {
    /// Repositories requested per page. Fixed for the whole fetch.
    pub page_size: u32,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// What a query worker hands to the aggregator.
#[derive(Debug)]
enum FetchBatch<R> {
    Page {
        query: String,
        page: u32,
        repos: Vec<R>,
    },
    Failed(FetchError),
}

/// Result of listing repositories: everything that was fetched, plus the
/// failures that kept it from being complete.
///
/// Both halves are meaningful at once. A listing with repositories and an
/// error is a partial success; one with neither is an empty account.
#[derive(Debug)]
pub struct Listing<T> {
    pub repos: Vec<T>,
    pub error: Option<AggregateError>,
}

impl<T> Listing<T> {
    /// Whether at least one query stream failed.
    pub fn is_partial(&self) -> bool {
        self.error.is_some()
    }

    /// Discard partial results when anything failed.
    pub fn into_result(self) -> Result<Vec<T>, AggregateError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.repos),
        }
    }

    /// Convert every repository, keeping the error as is.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Listing<U> {
        Listing {
            repos: self.repos.into_iter().map(f).collect(),
            error: self.error,
        }
    }
}

/// Walk every query concurrently and collect unique, non-excluded git
/// repositories.
///
/// Repositories of one query keep the provider's page order; the relative
/// order of different queries depends on which responses arrive first.
/// Failures never stop sibling queries and are returned alongside whatever
/// was fetched.
pub async fn fetch_all<P: RepoPager>(
    pager: Arc<P>,
    queries: &[String],
    options: &FetchOptions,
    filter: &ExclusionFilter,
    cancel: &CancellationToken,
    on_progress: Option<&ProgressCallback>,
) -> Listing<P::Repo> {
    let page_size = options.page_size.max(1);
    let (tx, mut rx) = mpsc::channel(FETCH_CHANNEL_BUFFER_SIZE);

    emit(
        on_progress,
        FetchProgress::FetchingQueries {
            count: queries.len(),
        },
    );

    let mut workers = JoinSet::new();
    for query in queries {
        workers.spawn(walk_query(
            Arc::clone(&pager),
            query.clone(),
            page_size,
            tx.clone(),
            cancel.clone(),
        ));
    }
    // The channel closes once every worker has dropped its sender.
    drop(tx);

    let mut seen: HashSet<String> = HashSet::new();
    let mut repos = Vec::new();
    let mut errors = Vec::new();

    while let Some(batch) = rx.recv().await {
        match batch {
            FetchBatch::Page {
                query,
                page,
                repos: page_repos,
            } => {
                let count = page_repos.len();
                for repo in page_repos {
                    if repo.scm() != SUPPORTED_SCM {
                        debug!(
                            repo = repo.full_name(),
                            scm = repo.scm(),
                            "Skipping non-git repository"
                        );
                        continue;
                    }
                    if !seen.insert(repo.external_id().to_string()) {
                        continue;
                    }
                    if filter.should_exclude(&repo) {
                        debug!(repo = repo.full_name(), "Excluded repository");
                        emit(
                            on_progress,
                            FetchProgress::Excluded {
                                full_name: repo.full_name().to_string(),
                            },
                        );
                        continue;
                    }
                    repos.push(repo);
                }

                debug!(query = %query, page, count, total = repos.len(), "Fetched page");
                emit(
                    on_progress,
                    FetchProgress::FetchedPage {
                        query,
                        page,
                        count,
                        total_so_far: repos.len(),
                    },
                );
            }
            FetchBatch::Failed(err) => {
                warn!(error = %err, "Repository query failed");
                emit(
                    on_progress,
                    FetchProgress::QueryFailed {
                        query: err.query().map(str::to_string),
                        error: err.to_string(),
                    },
                );
                errors.push(err);
            }
        }
    }

    while let Some(joined) = workers.join_next().await {
        if let Err(e) = joined {
            warn!(error = %e, "Fetch worker did not finish");
            errors.push(FetchError::WorkerPanicked(e.to_string()));
        }
    }

    emit(
        on_progress,
        FetchProgress::FetchComplete {
            total: repos.len(),
            errors: errors.len(),
        },
    );

    Listing {
        repos,
        error: AggregateError::from_errors(errors),
    }
}

/// Walk one query until its pages run out, a request fails, or the fetch is
/// cancelled.
async fn walk_query<P: RepoPager>(
    pager: Arc<P>,
    query: String,
    page_size: u32,
    tx: mpsc::Sender<FetchBatch<P::Repo>>,
    cancel: CancellationToken,
) {
    let provider = pager.provider();
    let mut cursor = P::Cursor::first(page_size);
    let mut page: u32 = 0;

    loop {
        let request = if page == 0 {
            pager.first_page(&query, &cursor)
        } else {
            pager.next_page(&cursor)
        };

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                let _ = tx
                    .send(FetchBatch::Failed(FetchError::Cancelled {
                        provider,
                        query: query.clone(),
                        cursor: format!("{:?}", cursor),
                    }))
                    .await;
                return;
            }
            result = request => result,
        };

        match result {
            Ok(next) => {
                page += 1;
                cursor = next.cursor;
                if !next.repos.is_empty() {
                    let batch = FetchBatch::Page {
                        query: query.clone(),
                        page,
                        repos: next.repos,
                    };
                    if tx.send(batch).await.is_err() {
                        return;
                    }
                }
                if !cursor.has_more() {
                    return;
                }
            }
            Err(e) => {
                let _ = tx
                    .send(FetchBatch::Failed(FetchError::Page {
                        provider,
                        query,
                        cursor: format!("{:?}", cursor),
                        source: Box::new(e),
                    }))
                    .await;
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::config::ExcludeRule;
    use crate::source::pager::Page;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Debug, Clone)]
    struct TestRepo {
        id: String,
        full_name: String,
        scm: &'static str,
    }

    impl ProviderRepo for TestRepo {
        fn external_id(&self) -> &str {
            &self.id
        }

        fn full_name(&self) -> &str {
            &self.full_name
        }

        fn scm(&self) -> &str {
            self.scm
        }
    }

    fn git(id: &str, full_name: &str) -> TestRepo {
        TestRepo {
            id: id.to_string(),
            full_name: full_name.to_string(),
            scm: "git",
        }
    }

    #[derive(Debug, Clone)]
    struct TestCursor {
        page_size: u32,
        query: String,
        next: Option<usize>,
    }

    impl PageCursor for TestCursor {
        fn first(page_size: u32) -> Self {
            Self {
                page_size,
                query: String::new(),
                next: None,
            }
        }

        fn has_more(&self) -> bool {
            self.next.is_some()
        }
    }

    type Script = Vec<Result<Vec<TestRepo>, &'static str>>;

    #[derive(Default)]
    struct ScriptedPager {
        scripts: HashMap<String, Script>,
        page_sizes: Mutex<Vec<u32>>,
    }

    impl ScriptedPager {
        fn with(mut self, query: &str, script: Script) -> Self {
            self.scripts.insert(query.to_string(), script);
            self
        }

        fn serve(
            &self,
            query: &str,
            index: usize,
            page_size: u32,
        ) -> Result<Page<TestRepo, TestCursor>, std::io::Error> {
            self.page_sizes.lock().unwrap().push(page_size);
            let script = self.scripts.get(query).cloned().unwrap_or_default();
            match script.get(index) {
                Some(Ok(repos)) => Ok(Page {
                    repos: repos.clone(),
                    cursor: TestCursor {
                        page_size,
                        query: query.to_string(),
                        next: (index + 1 < script.len()).then_some(index + 1),
                    },
                }),
                Some(Err(msg)) => Err(std::io::Error::other(*msg)),
                None => Ok(Page {
                    repos: Vec::new(),
                    cursor: TestCursor {
                        page_size,
                        query: query.to_string(),
                        next: None,
                    },
                }),
            }
        }
    }

    #[async_trait]
    impl RepoPager for ScriptedPager {
        type Repo = TestRepo;
        type Cursor = TestCursor;
        type Error = std::io::Error;

        fn provider(&self) -> &'static str {
            "scripted"
        }

        async fn first_page(
            &self,
            query: &str,
            cursor: &TestCursor,
        ) -> Result<Page<TestRepo, TestCursor>, std::io::Error> {
            self.serve(query, 0, cursor.page_size)
        }

        async fn next_page(
            &self,
            cursor: &TestCursor,
        ) -> Result<Page<TestRepo, TestCursor>, std::io::Error> {
            self.serve(&cursor.query, cursor.next.unwrap_or_default(), cursor.page_size)
        }
    }

    fn queries(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    async fn run(
        pager: ScriptedPager,
        names: &[&str],
        filter: &ExclusionFilter,
    ) -> Listing<TestRepo> {
        fetch_all(
            Arc::new(pager),
            &queries(names),
            &FetchOptions::default(),
            filter,
            &CancellationToken::new(),
            None,
        )
        .await
    }

    fn names(listing: &Listing<TestRepo>) -> Vec<&str> {
        listing.repos.iter().map(|r| r.full_name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_two_pages_keep_page_order() {
        let pager = ScriptedPager::default().with(
            "",
            vec![
                Ok(vec![git("1", "t/a"), git("2", "t/b")]),
                Ok(vec![git("3", "t/c"), git("4", "t/d")]),
            ],
        );

        let listing = run(pager, &[""], &ExclusionFilter::default()).await;

        assert!(listing.error.is_none());
        assert_eq!(names(&listing), vec!["t/a", "t/b", "t/c", "t/d"]);
    }

    #[tokio::test]
    async fn test_duplicates_across_queries_are_kept_once() {
        let pager = ScriptedPager::default()
            .with("", vec![Ok(vec![git("1", "t/a"), git("2", "t/b")])])
            .with("t", vec![Ok(vec![git("2", "t/b"), git("3", "t/c")])]);

        let listing = run(pager, &["", "t"], &ExclusionFilter::default()).await;

        assert!(listing.error.is_none());
        let mut got = names(&listing);
        got.sort_unstable();
        assert_eq!(got, vec!["t/a", "t/b", "t/c"]);
    }

    #[tokio::test]
    async fn test_non_git_and_excluded_repos_are_dropped() {
        let pager = ScriptedPager::default().with(
            "",
            vec![Ok(vec![
                git("1", "t/a"),
                TestRepo {
                    id: "2".into(),
                    full_name: "t/hg".into(),
                    scm: "hg",
                },
                git("3", "t/tmp-1"),
            ])],
        );
        let filter = ExclusionFilter::new(&[ExcludeRule {
            pattern: Some("^t/tmp-".into()),
            ..Default::default()
        }])
        .unwrap();

        let listing = run(pager, &[""], &filter).await;

        assert!(listing.error.is_none());
        assert_eq!(names(&listing), vec!["t/a"]);
    }

    #[tokio::test]
    async fn test_failure_after_first_page_keeps_fetched_repos() {
        let pager = ScriptedPager::default()
            .with(
                "broken",
                vec![Ok(vec![git("1", "broken/a")]), Err("boom")],
            )
            .with("ok", vec![Ok(vec![git("2", "ok/b")])]);

        let listing = run(pager, &["broken", "ok"], &ExclusionFilter::default()).await;

        let mut got = names(&listing);
        got.sort_unstable();
        assert_eq!(got, vec!["broken/a", "ok/b"]);

        let err = listing.error.expect("partial failure");
        assert_eq!(err.len(), 1);
        assert_eq!(err.errors()[0].query(), Some("broken"));
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn test_page_size_is_fixed_for_every_request() {
        let pager = Arc::new(ScriptedPager::default().with(
            "",
            vec![Ok(vec![git("1", "t/a")]), Ok(vec![git("2", "t/b")])],
        ));

        let listing = fetch_all(
            Arc::clone(&pager),
            &queries(&[""]),
            &FetchOptions { page_size: 7 },
            &ExclusionFilter::default(),
            &CancellationToken::new(),
            None,
        )
        .await;

        assert_eq!(listing.repos.len(), 2);
        assert_eq!(*pager.page_sizes.lock().unwrap(), vec![7, 7]);
    }

    #[tokio::test]
    async fn test_empty_query_list_yields_empty_listing() {
        let listing = run(ScriptedPager::default(), &[], &ExclusionFilter::default()).await;
        assert!(listing.repos.is_empty());
        assert!(listing.error.is_none());
    }

    #[tokio::test]
    async fn test_cancelled_before_start_reports_each_query() {
        let pager = ScriptedPager::default().with("", vec![Ok(vec![git("1", "t/a")])]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let listing = fetch_all(
            Arc::new(pager),
            &queries(&["", "t"]),
            &FetchOptions::default(),
            &ExclusionFilter::default(),
            &cancel,
            None,
        )
        .await;

        assert!(listing.repos.is_empty());
        let err = listing.error.expect("cancelled");
        assert_eq!(err.len(), 2);
        assert!(err.errors().iter().all(FetchError::is_cancelled));
    }

    struct PendingPager;

    #[async_trait]
    impl RepoPager for PendingPager {
        type Repo = TestRepo;
        type Cursor = TestCursor;
        type Error = std::io::Error;

        fn provider(&self) -> &'static str {
            "pending"
        }

        async fn first_page(
            &self,
            _query: &str,
            _cursor: &TestCursor,
        ) -> Result<Page<TestRepo, TestCursor>, std::io::Error> {
            std::future::pending().await
        }

        async fn next_page(
            &self,
            _cursor: &TestCursor,
        ) -> Result<Page<TestRepo, TestCursor>, std::io::Error> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_cancel_aborts_in_flight_requests() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let listing = tokio::time::timeout(
            Duration::from_secs(5),
            fetch_all(
                Arc::new(PendingPager),
                &queries(&[""]),
                &FetchOptions::default(),
                &ExclusionFilter::default(),
                &cancel,
                None,
            ),
        )
        .await
        .expect("fetch should return after cancellation");

        let err = listing.error.expect("cancelled");
        assert_eq!(err.len(), 1);
        assert!(err.errors()[0].is_cancelled());
    }

    #[tokio::test]
    async fn test_progress_events_are_emitted_in_order() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let events_clone = Arc::clone(&events);
        let callback: ProgressCallback = Box::new(move |event| {
            let label = match event {
                FetchProgress::FetchingQueries { .. } => "start",
                FetchProgress::FetchedPage { .. } => "page",
                FetchProgress::QueryFailed { .. } => "failed",
                FetchProgress::Excluded { .. } => "excluded",
                FetchProgress::FetchComplete { .. } => "complete",
            };
            events_clone.lock().unwrap().push(label);
        });

        let pager = ScriptedPager::default().with("", vec![Ok(vec![git("1", "t/a")])]);
        fetch_all(
            Arc::new(pager),
            &queries(&[""]),
            &FetchOptions::default(),
            &ExclusionFilter::default(),
            &CancellationToken::new(),
            Some(&callback),
        )
        .await;

        assert_eq!(*events.lock().unwrap(), vec!["start", "page", "complete"]);
    }

    #[test]
    fn test_listing_helpers() {
        let ok: Listing<u32> = Listing {
            repos: vec![1, 2],
            error: None,
        };
        assert!(!ok.is_partial());
        assert_eq!(ok.map(|n| n * 10).into_result().unwrap(), vec![10, 20]);

        let partial: Listing<u32> = Listing {
            repos: vec![1],
            error: AggregateError::from_errors(vec![FetchError::WorkerPanicked("x".into())]),
        };
        assert!(partial.is_partial());
        assert!(partial.into_result().is_err());
    }
}
