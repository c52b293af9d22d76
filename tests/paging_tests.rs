//! Integration tests for queries, paging and counting.

use std::collections::HashSet;
use std::sync::Arc;

use futures::TryStreamExt;
use serde::{Deserialize, Serialize};

use docstore::contracts::*;
use docstore::{
    field, CancellationToken, ContinuationToken, CrudRepository, Entity, Filter, InMemoryStore,
    ReadRepository, RequestOptions, SqlQuery,
};

#[derive(Debug, Serialize, Deserialize)]
struct Item {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    name: String,
    rank: i64,
    done: bool,
}

impl Entity for Item {
    fn document_id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

/// Provision shop/orders on the given store and fill it with `count` items.
/// Ranks run from 0, even ranks are done.
async fn seeded(store: &InMemoryStore, count: i64) -> CrudRepository<Item> {
    let repo = CrudRepository::new("shop", "orders", Arc::new(store.clone()), None);
    let cancel = CancellationToken::new();
    repo.ready(&cancel).await.unwrap();

    for rank in 0..count {
        let item = Item {
            id: Some(format!("item-{:03}", rank)),
            name: format!("Item {}", rank),
            rank,
            done: rank % 2 == 0,
        };
        repo.add(&item, &cancel).await.unwrap();
    }
    repo
}

#[tokio::test]
async fn test_get_all_returns_only_the_first_page() {
    let store = InMemoryStore::with_page_size(10);
    let repo = seeded(&store, 25).await;
    let cancel = CancellationToken::new();

    // One store round-trip, so the store page cap applies
    let all = repo.get_all(&Filter::all(), &cancel).await.unwrap();
    assert_eq!(all.len(), 10);

    let high = repo.get_all(&field("rank").gte(20), &cancel).await.unwrap();
    assert_eq!(high.len(), 5);
    assert!(high.iter().all(|item| item.rank >= 20));
}

#[tokio::test]
async fn test_request_options_cap_the_default_page_size() {
    let store = InMemoryStore::new();
    seeded(&store, 25).await;
    let cancel = CancellationToken::new();

    let options = RequestOptions {
        max_item_count: Some(7),
        ..Default::default()
    };
    let capped: CrudRepository<Item> =
        CrudRepository::new("shop", "orders", Arc::new(store.clone()), Some(options));
    capped.ready(&cancel).await.unwrap();

    let all = capped.get_all(&Filter::all(), &cancel).await.unwrap();
    assert_eq!(all.len(), 7);

    // An explicit page size still wins over the instance cap
    let page = capped
        .query_page(&Filter::all(), None, Some(4), &cancel)
        .await
        .unwrap();
    assert_eq!(page.len(), 4);
}

#[tokio::test]
async fn test_query_page_chain_is_disjoint_and_complete() {
    let store = InMemoryStore::new();
    let repo = seeded(&store, 25).await;
    let cancel = CancellationToken::new();

    let mut seen = Vec::new();
    let mut token: Option<ContinuationToken> = None;
    let mut rounds = 0;
    loop {
        let page = repo
            .query_page(&Filter::all(), token.as_ref(), Some(10), &cancel)
            .await
            .unwrap();
        rounds += 1;
        for item in &page.items {
            seen.push(item.id.clone().unwrap());
        }
        match page.continuation {
            Some(next) => token = Some(next),
            None => break,
        }
    }

    assert_eq!(rounds, 3);
    assert_eq!(seen.len(), 25);
    let unique: HashSet<&String> = seen.iter().collect();
    assert_eq!(unique.len(), 25);
}

#[tokio::test]
async fn test_exact_fit_drain_ends_on_an_empty_page() {
    let store = InMemoryStore::new();
    let repo = seeded(&store, 30).await;
    let cancel = CancellationToken::new();

    let mut lens = Vec::new();
    let mut token: Option<ContinuationToken> = None;
    loop {
        let page = repo
            .query_page(&Filter::all(), token.as_ref(), Some(10), &cancel)
            .await
            .unwrap();
        lens.push(page.len());
        match page.continuation {
            Some(next) => token = Some(next),
            None => break,
        }
    }

    // A full final page still carries a token; the drain ends one round later
    assert_eq!(lens, vec![10, 10, 10, 0]);
}

#[tokio::test]
async fn test_skip_applies_to_the_first_page_only() {
    let store = InMemoryStore::new();
    let repo = seeded(&store, 25).await;
    let cancel = CancellationToken::new();

    let mut query = repo.query().skip(5).take(10);

    let first = query.next_page(&cancel).await.unwrap().unwrap();
    let ranks: Vec<i64> = first.items.iter().map(|item| item.rank).collect();
    assert_eq!(ranks, (5..15).collect::<Vec<_>>());

    // The token continues from position 15; skip is not applied again
    let second = query.next_page(&cancel).await.unwrap().unwrap();
    let ranks: Vec<i64> = second.items.iter().map(|item| item.rank).collect();
    assert_eq!(ranks, (15..25).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_count_is_exact_beyond_page_caps() {
    let store = InMemoryStore::with_page_size(10);
    let repo = seeded(&store, 25).await;
    let cancel = CancellationToken::new();

    assert_eq!(repo.count(&cancel).await.unwrap(), 25);

    // Predicate counts inspect a single page only
    let matching = repo.count_matching(&Filter::all(), &cancel).await.unwrap();
    assert_eq!(matching, 10);

    let narrow = repo
        .count_matching(&field("rank").lt(3), &cancel)
        .await
        .unwrap();
    assert_eq!(narrow, 3);
}

#[tokio::test]
async fn test_filtered_query_pages_walk_matches_only() {
    let store = InMemoryStore::new();
    let repo = seeded(&store, 25).await;
    let cancel = CancellationToken::new();

    // 13 done items (even ranks 0..=24), walked in pages of 5
    let mut query = repo.query().filter(field("done").eq(true)).take(5);
    let mut total = 0;
    while let Some(page) = query.next_page(&cancel).await.unwrap() {
        assert!(page.items.iter().all(|item| item.done));
        total += page.len();
    }
    assert_eq!(total, 13);
}

#[tokio::test]
async fn test_stream_walks_every_page() {
    let store = InMemoryStore::new();
    let repo = seeded(&store, 25).await;
    let cancel = CancellationToken::new();

    let items: Vec<Item> = repo
        .query()
        .take(8)
        .into_stream(cancel.clone())
        .try_collect()
        .await
        .unwrap();

    assert_eq!(items.len(), 25);
    assert!(items.iter().enumerate().all(|(i, item)| item.rank == i as i64));
}

#[tokio::test]
async fn test_raw_sql_with_named_parameters() {
    let store = InMemoryStore::new();
    let repo = seeded(&store, 25).await;
    let cancel = CancellationToken::new();

    let sql = SqlQuery::new("SELECT * FROM c WHERE c.done = @done AND c.rank >= @min")
        .with_parameter("@done", true)
        .with_parameter("@min", 20);
    let mut query = repo.query_raw(sql);

    let page = query.next_page(&cancel).await.unwrap().unwrap();
    let ranks: Vec<i64> = page.items.iter().map(|item| item.rank).collect();
    assert_eq!(ranks, vec![20, 22, 24]);
    assert!(!page.has_more());

    assert!(query.next_page(&cancel).await.unwrap().is_none());
}

#[tokio::test]
async fn test_raw_value_count_query() {
    let store = InMemoryStore::new();
    seeded(&store, 25).await;
    let cancel = CancellationToken::new();

    // Scalar aggregates come back as a single bare row
    let totals: ReadRepository<u64> =
        ReadRepository::new("shop", "orders", Arc::new(store.clone()), None);
    let mut query = totals.query_raw(SqlQuery::new("SELECT VALUE COUNT(1) FROM c"));

    let page = query.next_page(&cancel).await.unwrap().unwrap();
    assert_eq!(page.items, vec![25]);
    assert!(!page.has_more());
}

#[tokio::test]
async fn test_continuation_token_resumes_across_handles() {
    let store = InMemoryStore::new();
    let repo = seeded(&store, 25).await;
    let cancel = CancellationToken::new();

    let first = repo
        .query_page(&Filter::all(), None, Some(10), &cancel)
        .await
        .unwrap();
    let token = first.continuation.clone().unwrap();

    // A brand-new handle picks up exactly where the first page ended
    let mut resumed = repo.query().take(10).continue_from(token);
    let second = resumed.next_page(&cancel).await.unwrap().unwrap();
    let ranks: Vec<i64> = second.items.iter().map(|item| item.rank).collect();
    assert_eq!(ranks, (10..20).collect::<Vec<_>>());
}
