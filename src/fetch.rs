//! Backward-paginating fetch loop.
//!
//! Walks the search endpoint from today towards the past. Each page is
//! requested with `until = cursor.until_day` and `max_id = cursor.maximum_id`;
//! after the page the cursor moves to the id of the oldest post seen, so the
//! next request only returns older posts. With a per-day quota, reaching the
//! quota checkpoints the result set and steps `until_day` back one day.
//!
//! The loop ends only when the endpoint returns an empty page (or the
//! optional page limit is hit). The result set is saved once more at the end.

use chrono::{Local, NaiveDate};
use tracing::{debug, info, info_span};

use crate::client::{SearchClient, SearchRequest};
use crate::config::Config;
use crate::error::Result;
use crate::model::{CursorState, FetchSummary, PostRecord, Quota, SearchPost};
use crate::sentiment::SentimentScorer;

/// Destination for checkpoint and final saves of the result set.
pub trait Checkpoint {
    /// Persist the full result set, replacing any earlier save.
    ///
    /// # Errors
    ///
    /// Returns an error if the records cannot be written.
    fn save(&mut self, records: &[PostRecord]) -> Result<()>;
}

impl<C: Checkpoint + ?Sized> Checkpoint for &mut C {
    fn save(&mut self, records: &[PostRecord]) -> Result<()> {
        (**self).save(records)
    }
}

/// Fixed parts of every page request.
#[derive(Debug, Clone)]
pub struct FetchPlan {
    pub query: String,
    pub lang: Option<String>,
    pub geocode: Option<String>,
    pub result_type: Option<String>,
    pub quota: Quota,
    pub max_pages: Option<usize>,
}

impl FetchPlan {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            query: config.query_string(),
            lang: config.query.lang.clone(),
            geocode: config.query.geocode.clone(),
            result_type: config.query.result_type.clone(),
            quota: config.fetch.tweets_per_day,
            max_pages: config.fetch.max_pages,
        }
    }

    fn request(&self, cursor: &CursorState) -> SearchRequest {
        SearchRequest {
            query: self.query.clone(),
            until: cursor.until_day,
            max_id: cursor.maximum_id,
            lang: self.lang.clone(),
            geocode: self.geocode.clone(),
            result_type: self.result_type.clone(),
        }
    }
}

/// What happened on one page; handed to the progress callback.
#[derive(Debug, Clone, Copy)]
pub struct PageEvent {
    pub page: usize,
    pub stored: usize,
    pub reshares: usize,
    pub total_records: usize,
    pub rolled_over: bool,
    pub cursor: CursorState,
}

/// The fetch loop and its collaborators.
pub struct FetchLoop<C, P, S, K> {
    client: C,
    primary: P,
    secondary: S,
    checkpoint: K,
    plan: FetchPlan,
    start_day: NaiveDate,
}

impl<C, P, S, K> FetchLoop<C, P, S, K>
where
    C: SearchClient,
    P: SentimentScorer,
    S: SentimentScorer,
    K: Checkpoint,
{
    /// Create a loop that starts from today's local date.
    pub fn new(client: C, primary: P, secondary: S, checkpoint: K, plan: FetchPlan) -> Self {
        Self {
            client,
            primary,
            secondary,
            checkpoint,
            plan,
            start_day: Local::now().date_naive(),
        }
    }

    /// Start the walk from `day` instead of today.
    #[must_use]
    pub const fn with_start_day(mut self, day: NaiveDate) -> Self {
        self.start_day = day;
        self
    }

    /// Run to completion, returning the result set and a summary.
    ///
    /// # Errors
    ///
    /// Any endpoint or checkpoint error aborts the run; whatever was last
    /// checkpointed stays on disk.
    pub fn run(self) -> Result<(Vec<PostRecord>, FetchSummary)> {
        self.run_with_progress(|_| {})
    }

    /// Like [`run`](Self::run), calling `on_page` after every non-empty page.
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    pub fn run_with_progress(
        mut self,
        mut on_page: impl FnMut(&PageEvent),
    ) -> Result<(Vec<PostRecord>, FetchSummary)> {
        let span = info_span!("fetch", query = %self.plan.query, quota = %self.plan.quota);
        let _enter = span.enter();

        let mut cursor = CursorState::new(self.start_day);
        let mut records: Vec<PostRecord> = Vec::new();
        let mut pages = 0;
        let mut reshares_skipped = 0;
        let mut checkpoints = 0;

        info!(until = %cursor.until_day, "Starting fetch");

        loop {
            if self.plan.max_pages.is_some_and(|max| pages >= max) {
                info!(pages, "Page limit reached, stopping");
                break;
            }

            let request = self.plan.request(&cursor);
            debug!(until = %request.until, max_id = ?request.max_id, "Requesting page");
            let page = self.client.search(&request)?;
            if page.is_empty() {
                info!(until = %cursor.until_day, "Empty page, no more matching posts");
                break;
            }
            pages += 1;

            let before = records.len();
            let reshares = self.process_page(&page, &mut records, &mut cursor);
            reshares_skipped += reshares;

            advance_cursor(&mut cursor, &page);

            let rolled_over = self.plan.quota.is_reached(cursor.daily_count);
            if rolled_over {
                self.checkpoint.save(&records)?;
                checkpoints += 1;
                info!(
                    day = %cursor.until_day,
                    stored = cursor.daily_count,
                    total = records.len(),
                    "Daily quota reached, checkpoint saved"
                );
                cursor.roll_back_day();
            }

            on_page(&PageEvent {
                page: pages,
                stored: records.len() - before,
                reshares,
                total_records: records.len(),
                rolled_over,
                cursor,
            });
        }

        self.checkpoint.save(&records)?;
        info!(records = records.len(), pages, checkpoints, "Fetch finished, results saved");

        let summary = FetchSummary {
            records: records.len(),
            reshares_skipped,
            pages,
            checkpoints,
            final_cursor: cursor,
        };
        Ok((records, summary))
    }

    /// Score and append the page's non-reshare posts; returns reshares skipped.
    fn process_page(
        &self,
        page: &[SearchPost],
        records: &mut Vec<PostRecord>,
        cursor: &mut CursorState,
    ) -> usize {
        let mut reshares = 0;
        for post in page {
            if post.is_reshare() {
                reshares += 1;
                continue;
            }
            let compound = self.primary.score(&post.full_text);
            let secondary = self.secondary.score(&post.full_text);
            debug!(
                id = post.id,
                created_at = %post.created_at,
                text = %post.full_text,
                primary = self.primary.name(),
                primary_score = compound,
                secondary = self.secondary.name(),
                secondary_score = secondary,
                "Scored post"
            );
            records.push(PostRecord::from_post(post, compound));
            cursor.daily_count += 1;
        }
        reshares
    }
}

/// Move the id cursor to the oldest post of `page`.
///
/// Uses the last post of the page whether or not it was stored, so a page
/// made entirely of reshares still moves the cursor forward.
fn advance_cursor(cursor: &mut CursorState, page: &[SearchPost]) {
    if let Some(last) = page.last() {
        cursor.maximum_id = Some(last.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::XsError;
    use chrono::{TimeZone, Utc};
    use std::collections::VecDeque;

    struct FixedScorer(f64);

    impl SentimentScorer for FixedScorer {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn score(&self, _text: &str) -> f64 {
            self.0
        }
    }

    /// Replays canned pages and records every request it sees.
    #[derive(Default)]
    struct ScriptedClient {
        pages: VecDeque<Result<Vec<SearchPost>>>,
        requests: Vec<SearchRequest>,
    }

    impl ScriptedClient {
        fn new(pages: Vec<Vec<SearchPost>>) -> Self {
            Self {
                pages: pages.into_iter().map(Ok).collect(),
                requests: Vec::new(),
            }
        }
    }

    impl SearchClient for ScriptedClient {
        fn search(&mut self, request: &SearchRequest) -> Result<Vec<SearchPost>> {
            self.requests.push(request.clone());
            self.pages.pop_front().unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    #[derive(Default)]
    struct RecordingCheckpoint {
        saves: Vec<usize>,
    }

    impl Checkpoint for RecordingCheckpoint {
        fn save(&mut self, records: &[PostRecord]) -> Result<()> {
            self.saves.push(records.len());
            Ok(())
        }
    }

    fn post(id: u64, text: &str) -> SearchPost {
        SearchPost {
            id,
            created_at: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).single().unwrap(),
            full_text: text.to_string(),
            favorite_count: 0,
            retweet_count: 0,
        }
    }

    fn plan(quota: Quota) -> FetchPlan {
        FetchPlan {
            query: "rust".to_string(),
            lang: None,
            geocode: None,
            result_type: None,
            quota,
            max_pages: None,
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    fn run(
        client: &mut ScriptedClient,
        checkpoint: &mut RecordingCheckpoint,
        quota: Quota,
    ) -> (Vec<PostRecord>, FetchSummary) {
        FetchLoop::new(client, FixedScorer(0.5), FixedScorer(-0.5), checkpoint, plan(quota))
            .with_start_day(day(10))
            .run()
            .unwrap()
    }

    #[test]
    fn single_page_then_empty_sets_cursor_to_oldest_id() {
        let mut client = ScriptedClient::new(vec![vec![
            post(12, "newest"),
            post(11, "middle"),
            post(10, "oldest"),
        ]]);
        let mut checkpoint = RecordingCheckpoint::default();
        let (records, summary) = run(&mut client, &mut checkpoint, Quota::PerDay(3));

        assert_eq!(records.len(), 3);
        assert_eq!(records.iter().map(|r| r.id).collect::<Vec<_>>(), vec![12, 11, 10]);
        assert!(records.iter().all(|r| (r.sentiment_compound - 0.5).abs() < f64::EPSILON));

        assert_eq!(client.requests.len(), 2);
        assert_eq!(client.requests[0].until, day(10));
        assert_eq!(client.requests[0].max_id, None);
        // quota 3 is reached by this page, so the next request steps back a day
        assert_eq!(client.requests[1].until, day(9));
        assert_eq!(client.requests[1].max_id, Some(10));
        assert_eq!(summary.final_cursor.maximum_id, Some(10));
    }

    #[test]
    fn cursor_advances_without_rollover_below_quota() {
        let mut client = ScriptedClient::new(vec![vec![
            post(12, "a"),
            post(11, "b"),
            post(10, "c"),
        ]]);
        let mut checkpoint = RecordingCheckpoint::default();
        let (records, summary) = run(&mut client, &mut checkpoint, Quota::PerDay(4));

        assert_eq!(records.len(), 3);
        assert_eq!(client.requests[1].until, day(10));
        assert_eq!(client.requests[1].max_id, Some(10));
        assert_eq!(summary.final_cursor.daily_count, 3);
        assert_eq!(summary.checkpoints, 0);
        // only the final save
        assert_eq!(checkpoint.saves, vec![3]);
    }

    #[test]
    fn overshooting_quota_mid_page_rolls_back_exactly_once() {
        let mut client = ScriptedClient::new(vec![vec![post(3, "a"), post(2, "b"), post(1, "c")]]);
        let mut checkpoint = RecordingCheckpoint::default();
        let (records, summary) = run(&mut client, &mut checkpoint, Quota::PerDay(2));

        assert_eq!(records.len(), 3);
        assert_eq!(summary.checkpoints, 1);
        // one checkpoint of all 3 records, then the final save
        assert_eq!(checkpoint.saves, vec![3, 3]);
        assert_eq!(client.requests[1].until, day(9));
        assert_eq!(summary.final_cursor.daily_count, 0);
        assert_eq!(summary.final_cursor.until_day, day(9));
    }

    #[test]
    fn reshares_are_neither_stored_nor_counted() {
        let mut client = ScriptedClient::new(vec![vec![
            post(5, "RT @other: copied"),
            post(4, "original"),
            post(3, "RT @other: again"),
        ]]);
        let mut checkpoint = RecordingCheckpoint::default();
        let (records, summary) = run(&mut client, &mut checkpoint, Quota::PerDay(2));

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, 4);
        assert_eq!(summary.reshares_skipped, 2);
        assert_eq!(summary.final_cursor.daily_count, 1);
        assert_eq!(summary.checkpoints, 0);
        assert_eq!(client.requests[1].until, day(10));
    }

    #[test]
    fn all_reshare_page_still_moves_cursor() {
        let mut client = ScriptedClient::new(vec![
            vec![post(20, "keep"), post(19, "keep too")],
            vec![post(18, "RT a"), post(17, "RT b")],
            vec![post(16, "later")],
        ]);
        let mut checkpoint = RecordingCheckpoint::default();
        let (records, _) = run(&mut client, &mut checkpoint, Quota::Unlimited);

        assert_eq!(records.len(), 3);
        let max_ids: Vec<_> = client.requests.iter().map(|r| r.max_id).collect();
        assert_eq!(max_ids, vec![None, Some(19), Some(17), Some(16)]);
    }

    #[test]
    fn unlimited_quota_never_changes_day() {
        let mut client = ScriptedClient::new(vec![
            (1..=100).rev().map(|i| post(i + 100, "x")).collect(),
            (1..=100).rev().map(|i| post(i, "y")).collect(),
        ]);
        let mut checkpoint = RecordingCheckpoint::default();
        let (records, summary) = run(&mut client, &mut checkpoint, Quota::Unlimited);

        assert_eq!(records.len(), 200);
        assert!(client.requests.iter().all(|r| r.until == day(10)));
        assert_eq!(summary.checkpoints, 0);
        assert_eq!(summary.final_cursor.daily_count, 200);
        assert_eq!(checkpoint.saves, vec![200]);
    }

    #[test]
    fn daily_count_tracks_stored_posts_per_page() {
        let mut client = ScriptedClient::new(vec![
            vec![post(9, "a"), post(8, "b")],
            vec![post(7, "c"), post(6, "d"), post(5, "e")],
        ]);
        let mut checkpoint = RecordingCheckpoint::default();
        let mut events = Vec::new();
        let (_, _) = FetchLoop::new(
            &mut client,
            FixedScorer(0.0),
            FixedScorer(0.0),
            &mut checkpoint,
            plan(Quota::PerDay(10)),
        )
        .with_start_day(day(10))
        .run_with_progress(|e| events.push(*e))
        .unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].stored, 2);
        assert_eq!(events[0].cursor.daily_count, 2);
        assert_eq!(events[1].stored, 3);
        assert_eq!(events[1].cursor.daily_count, 5);
        assert!(!events[1].rolled_over);
    }

    #[test]
    fn rollover_resets_count_before_next_request() {
        let mut client = ScriptedClient::new(vec![
            vec![post(9, "a"), post(8, "b")],
            vec![post(7, "c")],
            vec![post(6, "d"), post(5, "e")],
        ]);
        let mut checkpoint = RecordingCheckpoint::default();
        let (_, summary) = run(&mut client, &mut checkpoint, Quota::PerDay(2));

        let untils: Vec<_> = client.requests.iter().map(|r| r.until).collect();
        assert_eq!(untils, vec![day(10), day(9), day(9), day(8)]);
        assert_eq!(summary.checkpoints, 2);
        assert_eq!(checkpoint.saves, vec![2, 5, 5]);
    }

    #[test]
    fn page_limit_stops_early_and_still_saves() {
        let mut client = ScriptedClient::new(vec![vec![post(2, "a")], vec![post(1, "b")]]);
        let mut checkpoint = RecordingCheckpoint::default();
        let mut p = plan(Quota::Unlimited);
        p.max_pages = Some(1);
        let (records, summary) =
            FetchLoop::new(&mut client, FixedScorer(0.1), FixedScorer(0.1), &mut checkpoint, p)
                .with_start_day(day(10))
                .run()
                .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(summary.pages, 1);
        assert_eq!(client.requests.len(), 1);
        assert_eq!(checkpoint.saves, vec![1]);
    }

    #[test]
    fn endpoint_error_aborts_after_last_checkpoint() {
        let mut client = ScriptedClient::new(vec![vec![post(9, "a"), post(8, "b")]]);
        client.pages.push_back(Err(XsError::api(500, "boom")));
        let mut checkpoint = RecordingCheckpoint::default();
        let result = FetchLoop::new(
            &mut client,
            FixedScorer(0.1),
            FixedScorer(0.1),
            &mut checkpoint,
            plan(Quota::PerDay(2)),
        )
        .with_start_day(day(10))
        .run();

        assert!(matches!(result, Err(XsError::Api { status: 500, .. })));
        // checkpoint from the first page survives, no final save happened
        assert_eq!(checkpoint.saves, vec![2]);
    }

    #[test]
    fn requests_carry_query_and_filters() {
        let mut client = ScriptedClient::new(vec![]);
        let mut checkpoint = RecordingCheckpoint::default();
        let (records, summary) = run(&mut client, &mut checkpoint, Quota::PerDay(5));

        assert!(records.is_empty());
        assert_eq!(summary.pages, 0);
        assert_eq!(client.requests.len(), 1);
        assert_eq!(client.requests[0].query, "rust");
        assert_eq!(client.requests[0].max_id, None);
        assert_eq!(checkpoint.saves, vec![0]);
    }

    #[test]
    fn plan_from_config_joins_terms_and_copies_filters() {
        let mut config = Config::default();
        config.query.terms = vec!["@brand".to_string(), "brand".to_string()];
        config.query.lang = Some("en".to_string());
        config.fetch.tweets_per_day = Quota::Unlimited;
        config.fetch.max_pages = Some(3);

        let plan = FetchPlan::from_config(&config);
        assert_eq!(plan.query, "@brand OR brand");
        assert_eq!(plan.quota, Quota::Unlimited);
        assert_eq!(plan.max_pages, Some(3));

        let request = plan.request(&CursorState::new(day(4)));
        assert_eq!(request.lang.as_deref(), Some("en"));
        assert_eq!(request.until, day(4));
        let params = crate::client::search_params(&request);
        assert!(params.contains(&("count", crate::model::PAGE_SIZE.to_string())));
    }
}
