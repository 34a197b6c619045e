mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_test::{assert_err, assert_ok};

use common::{fast_retry, ingest_date, table, FakeResearch, KeywordEchoWriter, PanickyProcessor};
use seo_article_batch::error::ValidationError;
use seo_article_batch::workflow::NO_RESEARCH_DATA;
use seo_article_batch::{
    AppError, ArticleBatchProcessor, ArticleProcessor, DataValidator, JobStatus, ProcessorState,
    RateLimiter, ResearchOrchestrator, ResultStatus,
};

fn batch_processor(
    processor: Arc<dyn ArticleProcessor>,
    batch_size: usize,
) -> ArticleBatchProcessor {
    ArticleBatchProcessor::new(processor, batch_size, Duration::ZERO)
        .unwrap()
        .with_ingest_date(ingest_date())
}

fn orchestrator(research: FakeResearch) -> Arc<ResearchOrchestrator> {
    Arc::new(
        ResearchOrchestrator::new(Arc::new(research), Arc::new(KeywordEchoWriter), fast_retry())
            .with_tone("casual"),
    )
}

#[tokio::test]
async fn two_rows_produce_two_results_keyed_by_derived_id() {
    let mut batch = batch_processor(orchestrator(FakeResearch::default()), 10);
    let input = table(&[&["1", "A", "k1", "s1,s2"], &["2", "B", "k2", "s3"]]);

    assert_ok!(batch.load(&input));
    assert_eq!(batch.stats().total, 2);

    batch.process_batch().await.unwrap();

    let results = batch.results();
    assert_eq!(results.len(), 2);
    assert!(results.contains_key("20240309_1"));
    assert!(results.contains_key("20240309_2"));
    assert_eq!(batch.stats().total, 2);
    assert_eq!(batch.stats().completed, 2);
    assert_eq!(batch.state(), ProcessorState::Completed);
}

#[tokio::test]
async fn one_failing_research_does_not_affect_siblings() {
    let mut batch = batch_processor(orchestrator(FakeResearch::failing_on(&["k2"])), 10);
    batch
        .load(&table(&[
            &["1", "A", "k1", "s1"],
            &["2", "B", "k2", "s2"],
            &["3", "C", "k3", "s3"],
        ]))
        .unwrap();

    batch.process_batch().await.unwrap();

    let results = batch.results();
    let failed = &results["20240309_2"];
    assert_eq!(failed.status, ResultStatus::Failed);
    assert_eq!(failed.error.as_deref(), Some(NO_RESEARCH_DATA));
    assert!(failed.content.is_none());

    for (id, keyword) in [("20240309_1", "k1"), ("20240309_3", "k3")] {
        let result = &results[id];
        assert_eq!(result.status, ResultStatus::Completed);
        assert_eq!(
            result.content.as_deref(),
            Some(format!("2. Palabra clave principal: {}", keyword).as_str())
        );
        assert!(result
            .research_data
            .as_deref()
            .unwrap()
            .contains(keyword));
    }

    let stats = batch.stats();
    assert_eq!((stats.completed, stats.failed), (2, 1));

    let failed_items = batch.failed_items();
    assert_eq!(failed_items.len(), 1);
    assert_eq!(failed_items[0].id(), "20240309_2");
    assert_eq!(failed_items[0].status(), JobStatus::Failed);
    assert_eq!(failed_items[0].retry_count(), 2);
}

#[tokio::test]
async fn every_job_is_counted_exactly_once() {
    for (rows, batch_size) in [(1usize, 1usize), (5, 2), (7, 3), (10, 10), (12, 5)] {
        let ids: Vec<String> = (1..=rows).map(|i| i.to_string()).collect();
        let titles: Vec<String> = (1..=rows).map(|i| format!("Título {}", i)).collect();
        let keywords: Vec<String> = (1..=rows)
            .map(|i| if i % 3 == 0 { "fail".to_string() } else { format!("k{}", i) })
            .collect();
        let row_refs: Vec<[&str; 4]> = (0..rows)
            .map(|i| [ids[i].as_str(), titles[i].as_str(), keywords[i].as_str(), ""])
            .collect();
        let slices: Vec<&[&str]> = row_refs.iter().map(|r| r.as_slice()).collect();

        let mut batch = batch_processor(orchestrator(FakeResearch::failing_on(&["fail"])), batch_size);
        batch.load(&table(&slices)).unwrap();
        batch.process_batch().await.unwrap();

        let stats = batch.stats();
        assert_eq!(stats.total, rows);
        assert_eq!(stats.completed + stats.failed, rows);
        assert_eq!(stats.failed, rows / 3);
        assert_eq!(batch.failed_items().len(), stats.failed);
        assert!(batch
            .results()
            .values()
            .all(|r| r.status != ResultStatus::Queued));
    }
}

#[test]
fn missing_keyword_column_rejects_the_whole_input() {
    let input = seo_article_batch::ArticleTable::from_rows(
        &["id", "title", "secondary_keywords"],
        &[&["1", "A", "s1"], &["2", "B", "s2"]],
    );
    assert!(!DataValidator::new().validate_csv_structure(&input));

    let mut batch = batch_processor(orchestrator(FakeResearch::default()), 10);
    let err = assert_err!(batch.load(&input));
    match err {
        AppError::Validation(ValidationError::MissingColumns(columns)) => {
            assert_eq!(columns, vec!["keyword".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(batch.pending(), 0);
    assert_eq!(batch.stats().total, 0);
    assert!(batch.results().is_empty());
}

#[test]
fn validating_a_valid_table_twice_is_stable() {
    let input = table(&[&["1", "A", "k1", "s1,s2"], &["2", "B", "k2", "s3"]]);
    let validator = DataValidator::new();
    let first = validator.validate(&input);
    let second = validator.validate(&input);
    assert!(first.is_valid() && second.is_valid());
    assert_eq!(first.valid, 2);
}

#[tokio::test]
async fn panicking_job_is_recorded_as_failed() {
    let mut batch = batch_processor(Arc::new(PanickyProcessor), 3);
    batch
        .load(&table(&[
            &["1", "A", "k1", ""],
            &["2", "B", "boom", ""],
            &["3", "C", "k3", ""],
        ]))
        .unwrap();

    batch.process_batch().await.unwrap();

    let results = batch.results();
    assert_eq!(results["20240309_2"].status, ResultStatus::Failed);
    assert_eq!(results["20240309_1"].status, ResultStatus::Completed);
    assert_eq!(results["20240309_3"].status, ResultStatus::Completed);
    assert_eq!(batch.failed_items()[0].id(), "20240309_2");
    assert_eq!(batch.failed_items()[0].status(), JobStatus::Failed);
}

#[tokio::test(start_paused = true)]
async fn shared_rate_limiter_throttles_across_batches() {
    let limiter = Arc::new(RateLimiter::new("research", 2).unwrap());
    let research = FakeResearch::default().with_limiter(limiter);
    let mut batch = batch_processor(orchestrator(research), 2);
    batch
        .load(&table(&[
            &["1", "A", "k1", ""],
            &["2", "B", "k2", ""],
            &["3", "C", "k3", ""],
        ]))
        .unwrap();

    let start = Instant::now();
    batch.process_batch().await.unwrap();

    assert!(start.elapsed() >= Duration::from_secs(60));
    assert_eq!(batch.stats().completed, 3);
}

#[tokio::test(start_paused = true)]
async fn batch_delay_is_applied_between_batches() {
    let mut batch = ArticleBatchProcessor::new(
        orchestrator(FakeResearch::default()),
        1,
        Duration::from_secs(5),
    )
    .unwrap()
    .with_ingest_date(ingest_date());
    batch
        .load(&table(&[&["1", "A", "k1", ""], &["2", "B", "k2", ""]]))
        .unwrap();

    let start = Instant::now();
    batch.process_batch().await.unwrap();
    assert!(start.elapsed() >= Duration::from_secs(5));
}
