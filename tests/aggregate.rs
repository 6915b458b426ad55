mod support;

use std::sync::Arc;
use std::time::Duration;

use support::{fast_settings, page, pairs, snippet, FakeFetcher, FakeSearch};
use variant_tally::aggregate::{Aggregator, AggregatorSettings, RateLimit};
use variant_tally::fetch::FetchError;
use variant_tally::models::{Boundary, ExecutionMode, KeywordTarget};
use variant_tally::orchestrator::run_targets;
use variant_tally::processed::{ProcessedSources, SharedProcessed};
use variant_tally::retry::RetryPolicy;

fn aggregator(
    search: FakeSearch,
    fetcher: Arc<FakeFetcher>,
    processed: SharedProcessed,
    settings: AggregatorSettings,
) -> Aggregator {
    Aggregator::new(Arc::new(search), fetcher, processed, settings)
}

fn owned(v: &[(&str, u64)]) -> Vec<(String, u64)> {
    v.iter().map(|(s, n)| (s.to_string(), *n)).collect()
}

#[tokio::test]
async fn sums_pages_and_zero_fills_declared_variants() {
    let search = FakeSearch::default()
        .with("Pdf", vec![page("https://a.test/1"), page("https://a.test/2")]);
    let fetcher = Arc::new(
        FakeFetcher::default()
            .page("https://a.test/1", "PDF files use pdf format, not Pdf!")
            .page("https://a.test/2", "Export to PDF. PDFs are PDF."),
    );
    let agg = aggregator(search, fetcher, ProcessedSources::new().shared(), fast_settings());

    let target = KeywordTarget::new("Pdf", &["PDF", "pdf", "Pdf", "pDF"]);
    let out = agg.aggregate(&target).await;

    assert_eq!(pairs(&out.entries), owned(&[("PDF", 3), ("pdf", 1), ("Pdf", 1), ("pDF", 0)]));
    assert_eq!(out.stats.fetched, 2);
}

#[tokio::test]
async fn failed_search_yields_zero_filled_entries() {
    let agg = aggregator(
        FakeSearch::default(),
        Arc::new(FakeFetcher::default()),
        ProcessedSources::new().shared(),
        fast_settings(),
    );
    let out = agg.aggregate(&KeywordTarget::new("ar", &["ar", "AR"])).await;
    assert!(out.stats.search_failed);
    assert_eq!(pairs(&out.entries), owned(&[("ar", 0), ("AR", 0)]));

    let discovery = agg.aggregate(&KeywordTarget::discovery("ar")).await;
    assert!(discovery.entries.is_empty());
}

#[tokio::test]
async fn snippets_are_normalized_and_matched_unanchored() {
    let search = FakeSearch::default().with(
        "Acc线",
        vec![
            snippet("ACC线 怎么接", "汽车acc线, 常电"),
            snippet("Acc 线", "acc线是什么"),
        ],
    );
    let fetcher = Arc::new(FakeFetcher::default());
    let agg = aggregator(
        search,
        fetcher.clone(),
        ProcessedSources::new().shared(),
        fast_settings(),
    );

    let out = agg.aggregate(&KeywordTarget::new("Acc线", &["acc线", "ACC线", "Acc线"])).await;

    // "Acc 线" only matches once whitespace is stripped.
    assert_eq!(pairs(&out.entries), owned(&[("acc线", 2), ("ACC线", 1), ("Acc线", 1)]));
    assert_eq!(out.stats.snippets, 2);
    assert!(fetcher.calls().is_empty());
}

#[tokio::test]
async fn discovery_merges_forms_across_pages() {
    let search = FakeSearch::default()
        .with("wifi", vec![page("https://w.test/a"), page("https://w.test/b")]);
    let fetcher = Arc::new(
        FakeFetcher::default()
            .page("https://w.test/a", "WiFi wifi WIFI wifi")
            .page("https://w.test/b", "WIFI WIFI"),
    );
    let agg = aggregator(search, fetcher, ProcessedSources::new().shared(), fast_settings());

    let out = agg.aggregate(&KeywordTarget::discovery("wifi")).await;
    assert_eq!(pairs(&out.entries), owned(&[("WIFI", 3), ("wifi", 2), ("WiFi", 1)]));
}

#[tokio::test]
async fn second_pass_over_same_urls_fetches_nothing() {
    let urls = vec![page("https://d.test/1"), page("https://d.test/2")];
    let search = FakeSearch::default().with("DOOM", urls);
    let fetcher = Arc::new(
        FakeFetcher::default()
            .page("https://d.test/1", "DOOM Doom doom")
            .page("https://d.test/2", "Doom eternal"),
    );
    let processed = ProcessedSources::new().shared();
    let agg = aggregator(search, fetcher.clone(), processed.clone(), fast_settings());
    let target = KeywordTarget::new("DOOM", &["doom", "Doom", "DOOM"]);

    let first = agg.aggregate(&target).await;
    assert_eq!(pairs(&first.entries), owned(&[("doom", 1), ("Doom", 2), ("DOOM", 1)]));

    let second = agg.aggregate(&target).await;
    assert_eq!(second.stats.fetched, 0);
    assert_eq!(second.stats.skipped_duplicate, 2);
    assert!(second.entries.iter().all(|e| e.count == 0));
    assert_eq!(fetcher.calls().len(), 2);
    assert_eq!(processed.lock().await.len(), 2);
}

#[tokio::test]
async fn preloaded_urls_are_never_fetched() {
    let processed: ProcessedSources = vec!["https://p.test/old".to_string()].into_iter().collect();
    let search = FakeSearch::default()
        .with("SP", vec![page("https://p.test/old"), page("https://p.test/new")]);
    let fetcher = Arc::new(
        FakeFetcher::default()
            .page("https://p.test/old", "SP SP SP")
            .page("https://p.test/new", "sp SP"),
    );
    let agg = aggregator(search, fetcher.clone(), processed.shared(), fast_settings());

    let out = agg.aggregate(&KeywordTarget::new("SP", &["SP", "sp"])).await;
    assert_eq!(pairs(&out.entries), owned(&[("SP", 1), ("sp", 1)]));
    assert_eq!(fetcher.calls(), vec!["https://p.test/new".to_string()]);
}

#[tokio::test]
async fn failed_fetch_is_skipped_but_marked_processed() {
    let search = FakeSearch::default()
        .with("pnc", vec![page("https://f.test/gone"), page("https://f.test/ok")]);
    let fetcher = Arc::new(FakeFetcher::default().page("https://f.test/ok", "PNC pnc PnC PNC"));
    let processed = ProcessedSources::new().shared();
    let agg = aggregator(search, fetcher.clone(), processed.clone(), fast_settings());

    let out = agg.aggregate(&KeywordTarget::new("pnc", &["PNC", "PnC", "pnc"])).await;

    assert_eq!(pairs(&out.entries), owned(&[("PNC", 2), ("PnC", 1), ("pnc", 1)]));
    assert_eq!(out.stats.failed, 1);
    // 404 is permanent: one attempt only.
    assert_eq!(fetcher.calls_for("https://f.test/gone"), 1);
    assert!(processed.lock().await.contains("https://f.test/gone"));
}

#[tokio::test(start_paused = true)]
async fn timeouts_are_retried_until_the_third_attempt_succeeds() {
    let url = "https://r.test/flaky";
    let search = FakeSearch::default().with("CIPA", vec![page(url)]);
    let fetcher = Arc::new(
        FakeFetcher::default()
            .page(url, "CIPA cipa CiPA CIPA")
            .fail_first(url, vec![FetchError::Timeout, FetchError::Timeout]),
    );
    let settings = AggregatorSettings {
        retry: RetryPolicy::default(),
        ..fast_settings()
    };
    let agg = aggregator(search, fetcher.clone(), ProcessedSources::new().shared(), settings);

    let started = tokio::time::Instant::now();
    let out = agg.aggregate(&KeywordTarget::new("CIPA", &["CIPA", "cipa", "CiPA"])).await;

    assert_eq!(pairs(&out.entries), owned(&[("CIPA", 2), ("cipa", 1), ("CiPA", 1)]));
    assert_eq!(fetcher.calls_for(url), 3);
    assert_eq!(out.stats.failed, 0);
    // Two waits, both clamped up to the 4s floor.
    assert!(started.elapsed() >= Duration::from_secs(8));
}

#[tokio::test(start_paused = true)]
async fn fetches_are_paced_with_batch_pauses() {
    let urls: Vec<_> = (0..4).map(|i| page(&format!("https://t.test/{i}"))).collect();
    let mut fetcher = FakeFetcher::default();
    for i in 0..4 {
        fetcher = fetcher.page(&format!("https://t.test/{i}"), "si");
    }
    let settings = AggregatorSettings {
        rate: RateLimit {
            fetch_delay: Duration::from_millis(500),
            batch_size: 2,
            batch_pause: Duration::from_secs(5),
        },
        ..fast_settings()
    };
    let agg = aggregator(
        FakeSearch::default().with("sI", urls),
        Arc::new(fetcher),
        ProcessedSources::new().shared(),
        settings,
    );

    let started = tokio::time::Instant::now();
    let out = agg.aggregate(&KeywordTarget::new("sI", &["si"])).await;
    let elapsed = started.elapsed();

    assert_eq!(out.entries[0].count, 4);
    // 3 inter-fetch delays + 1 batch pause.
    assert!(elapsed >= Duration::from_millis(6500), "elapsed {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(7000), "elapsed {:?}", elapsed);
}

#[tokio::test]
async fn page_boundary_setting_controls_anchoring() {
    let search = FakeSearch::default().with("ar", vec![page("https://b.test/1")]);
    let fetcher = Arc::new(FakeFetcher::default().page("https://b.test/1", "AR glasses, art, AR"));
    let target = KeywordTarget::new("ar", &["ar", "AR"]);

    let anchored = aggregator(
        search,
        fetcher.clone(),
        ProcessedSources::new().shared(),
        fast_settings(),
    );
    assert_eq!(pairs(&anchored.aggregate(&target).await.entries), owned(&[("ar", 0), ("AR", 2)]));

    let search = FakeSearch::default().with("ar", vec![page("https://b.test/1")]);
    let settings = AggregatorSettings {
        page_boundary: Boundary::Unanchored,
        ..fast_settings()
    };
    let loose = aggregator(search, fetcher, ProcessedSources::new().shared(), settings);
    assert_eq!(pairs(&loose.aggregate(&target).await.entries), owned(&[("ar", 1), ("AR", 2)]));
}

#[tokio::test]
async fn duplicate_declared_variants_double_count() {
    let search = FakeSearch::default().with("pnc", vec![page("https://x.test/1")]);
    let fetcher = Arc::new(FakeFetcher::default().page("https://x.test/1", "pnc PNC"));
    let agg = aggregator(search, fetcher, ProcessedSources::new().shared(), fast_settings());

    let out = agg.aggregate(&KeywordTarget::new("pnc", &["pnc", "PNC", "pnc"])).await;
    assert_eq!(pairs(&out.entries), owned(&[("pnc", 2), ("PNC", 1), ("pnc", 2)]));
}

#[tokio::test(start_paused = true)]
async fn concurrent_keywords_count_a_shared_url_once() {
    let shared = "https://s.test/both";
    let search = FakeSearch::default()
        .with("Pdf", vec![page(shared), page("https://s.test/pdf")])
        .with("WiFi", vec![page(shared), page("https://s.test/wifi")]);
    let fetcher = Arc::new(
        FakeFetcher::default()
            .page(shared, "PDF WiFi")
            .page("https://s.test/pdf", "PDF")
            .page("https://s.test/wifi", "WiFi")
            .with_latency(Duration::from_millis(200)),
    );
    let agg = aggregator(
        search,
        fetcher.clone(),
        ProcessedSources::new().shared(),
        fast_settings(),
    );
    let targets = vec![
        KeywordTarget::new("Pdf", &["PDF"]),
        KeywordTarget::new("WiFi", &["WiFi"]),
    ];

    let table = run_targets(&agg, &targets, ExecutionMode::Concurrent, Duration::ZERO).await;

    assert_eq!(fetcher.calls_for(shared), 1);
    let pdf = table.get("Pdf").unwrap()[0].count;
    let wifi = table.get("WiFi").unwrap()[0].count;
    // Each keyword has its own page (1 each); the shared page adds exactly 1 overall.
    assert_eq!(pdf + wifi, 3);
    let keys: Vec<&str> = table.iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec!["Pdf", "WiFi"]);
}

#[tokio::test(start_paused = true)]
async fn sequential_run_keeps_every_keyword_and_pauses_between_them() {
    let search = FakeSearch::default().with("DOOM", vec![page("https://q.test/d")]);
    let fetcher = Arc::new(FakeFetcher::default().page("https://q.test/d", "Doom"));
    let agg = aggregator(search, fetcher, ProcessedSources::new().shared(), fast_settings());
    let targets = vec![
        KeywordTarget::new("DOOM", &["doom", "Doom"]),
        KeywordTarget::new("missing", &["Missing"]),
        KeywordTarget::discovery("also-missing"),
    ];

    let started = tokio::time::Instant::now();
    let table =
        run_targets(&agg, &targets, ExecutionMode::Sequential, Duration::from_secs(5)).await;

    assert!(started.elapsed() >= Duration::from_secs(10));
    assert_eq!(table.len(), 3);
    assert_eq!(pairs(table.get("DOOM").unwrap()), owned(&[("doom", 0), ("Doom", 1)]));
    assert_eq!(pairs(table.get("missing").unwrap()), owned(&[("Missing", 0)]));
    assert_eq!(table.get("also-missing"), Some(&[][..]));
}

#[tokio::test]
async fn repeated_keyword_keeps_the_counts_of_its_first_run() {
    let targets = vec![
        KeywordTarget::new("DOOM", &["doom", "Doom", "DOOM"]),
        KeywordTarget::new("DOOM", &["doom", "Doom", "DOOM"]),
    ];

    for mode in [ExecutionMode::Sequential, ExecutionMode::Concurrent] {
        let search = FakeSearch::default().with("DOOM", vec![page("https://r.test/doom")]);
        let fetcher =
            Arc::new(FakeFetcher::default().page("https://r.test/doom", "Doom DOOM doom Doom"));
        let agg = aggregator(search, fetcher, ProcessedSources::new().shared(), fast_settings());

        let table = run_targets(&agg, &targets, mode, Duration::ZERO).await;
        assert_eq!(table.len(), 1);
        assert_eq!(
            pairs(table.get("DOOM").unwrap()),
            owned(&[("doom", 1), ("Doom", 2), ("DOOM", 1)])
        );
    }
}
