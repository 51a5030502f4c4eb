//! Batch link-context gathering: failures, de-duplication, caching.

mod common;

use common::{fetch_config, link_context, link_context_with_storage, StubFetcher};
use doclass_core::cache::{PageCacheKey, PageCacheValue};
use doclass_core::storage::{FileStorage, PageStorage};
use doclass_core::{DocumentRecord, FetchConfig, RunContext, TokenSet};

fn record(row: usize, url: &str, sources: &[&str]) -> DocumentRecord {
    DocumentRecord {
        row,
        url: url.to_string(),
        file_name: String::new(),
        source_list: sources.iter().map(|s| s.to_string()).collect(),
        file_size: "1KB".to_string(),
        number_of_pages: 1,
    }
}

fn set(tokens: &[&str]) -> TokenSet {
    tokens.iter().map(|t| t.to_string()).collect()
}

fn anchor(href: &str, text: &str) -> String {
    format!(r#"<p><a href="{href}">{text}</a></p>"#)
}

#[test]
fn test_failed_source_is_skipped_and_others_still_count() {
    let doc = "https://x.org/docs/budget.pdf";
    let fetcher = StubFetcher::new()
        .with_timeout("https://slow.example/finance")
        .with_page("https://x.org/finance", &anchor(doc, "FY24 Budget Summary"));
    let fetcher_handle = fetcher.clone();
    let lc = link_context(fetcher, &fetch_config(2));

    let ctx = RunContext::new();
    let tokens = lc.get_link_context(
        doc,
        &[
            "https://slow.example/finance".to_string(),
            "https://x.org/finance".to_string(),
            "https://x.org/missing".to_string(),
        ],
        &ctx,
    );

    assert_eq!(tokens, set(&["fy", "budget", "summary"]));
    assert_eq!(fetcher_handle.calls().len(), 3);
    let stats = ctx.fetch_stats();
    assert_eq!(stats.pages_requested, 3);
    assert_eq!(stats.pages_fetched, 1);
    assert_eq!(stats.pages_failed, 2);
}

#[test]
fn test_shared_source_page_fetched_once() {
    let page = "https://x.org/meetings";
    let html = format!(
        "{}{}{}",
        anchor("https://x.org/a.pdf", "Council Agenda"),
        anchor("https://x.org/b.pdf", "Council Minutes"),
        anchor("https://x.org/a.pdf", "agenda (large print)")
    );
    let fetcher = StubFetcher::new().with_page(page, &html);
    let fetcher_handle = fetcher.clone();
    let lc = link_context(fetcher, &fetch_config(4));

    let records = vec![
        record(0, "https://x.org/a.pdf", &[page]),
        record(1, "https://x.org/b.pdf", &[page, page]),
        record(2, "https://x.org/c.pdf", &[page]),
    ];
    let ctx = RunContext::new();
    let tokens = lc.collect(&records, &ctx);

    assert_eq!(fetcher_handle.calls_for(page), 1);
    assert_eq!(tokens.len(), 3);
    assert_eq!(tokens[0], set(&["council", "agenda", "large", "print"]));
    assert_eq!(tokens[1], set(&["council", "minutes"]));
    assert!(tokens[2].is_empty());
}

#[test]
fn test_union_across_sources() {
    let doc = "https://x.org/notice.pdf";
    let fetcher = StubFetcher::new()
        .with_page("https://x.org/news", &anchor(doc, "Public Notice"))
        .with_page("https://x.org/planning", &anchor(doc, "Zoning Hearing Notice"));
    let lc = link_context(fetcher, &fetch_config(2));

    let tokens = lc.collect(
        &[record(0, doc, &["https://x.org/news", "https://x.org/planning"])],
        &RunContext::new(),
    );
    assert_eq!(tokens[0], set(&["public", "notice", "zoning", "hearing"]));
}

#[test]
fn test_disabled_fetching_makes_no_requests() {
    let fetcher = StubFetcher::new().with_page("https://x.org/p", &anchor("https://x.org/a.pdf", "Agenda"));
    let fetcher_handle = fetcher.clone();
    let config = FetchConfig {
        enabled: false,
        ..fetch_config(2)
    };
    let lc = link_context(fetcher, &config);
    assert!(!lc.is_enabled());

    let tokens = lc.collect(&[record(0, "https://x.org/a.pdf", &["https://x.org/p"])], &RunContext::new());
    assert_eq!(tokens, vec![TokenSet::new()]);
    assert!(fetcher_handle.calls().is_empty());
}

#[test]
fn test_cached_page_reused_across_runs() {
    let dir = tempfile::tempdir().unwrap();
    let page = "https://x.org/meetings";
    let doc = "https://x.org/a.pdf";

    let first = StubFetcher::new().with_page(page, &anchor(doc, "March Agenda"));
    let lc = link_context_with_storage(
        first,
        Box::new(FileStorage::new(dir.path()).unwrap()),
        &fetch_config(1),
    );
    let ctx = RunContext::new();
    assert_eq!(lc.collect(&[record(0, doc, &[page])], &ctx)[0], set(&["march", "agenda"]));
    assert_eq!(ctx.fetch_stats().cache_hits, 0);

    // Network now unavailable; the cached body still answers
    let offline = StubFetcher::new().with_timeout(page);
    let offline_handle = offline.clone();
    let lc = link_context_with_storage(
        offline,
        Box::new(FileStorage::new(dir.path()).unwrap()),
        &fetch_config(1),
    );
    let ctx = RunContext::new();
    assert_eq!(lc.collect(&[record(0, doc, &[page])], &ctx)[0], set(&["march", "agenda"]));
    assert_eq!(ctx.fetch_stats().cache_hits, 1);
    assert!(offline_handle.calls().is_empty());
}

#[test]
fn test_corrupt_cache_entry_falls_back_to_fetch() {
    let dir = tempfile::tempdir().unwrap();
    let page = "https://x.org/meetings";
    let doc = "https://x.org/a.pdf";

    let storage = FileStorage::new(dir.path()).unwrap();
    let entry = dir
        .path()
        .join("pages")
        .join(format!("{}.json", PageCacheKey::new(page).to_cache_hash()));
    std::fs::write(&entry, "{ truncated").unwrap();

    let fetcher = StubFetcher::new().with_page(page, &anchor(doc, "March Agenda"));
    let fetcher_handle = fetcher.clone();
    let lc = link_context_with_storage(fetcher, Box::new(storage), &fetch_config(1));

    let ctx = RunContext::new();
    assert_eq!(lc.collect(&[record(0, doc, &[page])], &ctx)[0], set(&["march", "agenda"]));
    assert_eq!(fetcher_handle.calls_for(page), 1);
    assert_eq!(ctx.fetch_stats().cache_hits, 0);

    // The fresh body replaced the unreadable entry
    let repaired = FileStorage::new(dir.path()).unwrap();
    assert!(repaired.get_page(&PageCacheKey::new(page)).unwrap().is_some());
}

#[test]
fn test_stale_cache_entry_is_refetched() {
    let dir = tempfile::tempdir().unwrap();
    let page = "https://x.org/meetings";
    let doc = "https://x.org/a.pdf";

    let storage = FileStorage::new(dir.path()).unwrap();
    let key = PageCacheKey::new(page);
    let mut stale = PageCacheValue::new(page, anchor(doc, "January Minutes"), 10);
    stale.fetched_at = chrono::Utc::now() - chrono::Duration::hours(3);
    storage.store_page(&key, &stale).unwrap();

    let fetcher = StubFetcher::new().with_page(page, &anchor(doc, "March Agenda"));
    let fetcher_handle = fetcher.clone();
    let config = FetchConfig {
        cache_max_age_hours: Some(1),
        ..fetch_config(1)
    };
    let lc = link_context_with_storage(fetcher, Box::new(storage), &config);

    let ctx = RunContext::new();
    assert_eq!(lc.collect(&[record(0, doc, &[page])], &ctx)[0], set(&["march", "agenda"]));
    assert_eq!(fetcher_handle.calls_for(page), 1);
    assert_eq!(ctx.fetch_stats().cache_hits, 0);
}
