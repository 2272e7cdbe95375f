//! Tool pipeline tests over a counting in-process upstream
//!
//! Covers:
//! - Cache hits skipping AniList
//! - Cached and uncached answers being identical
//! - Failed fetches never being cached
//! - Validation failing before any fetch
//! - `get_user_list` identity handling

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

use anilist_mcp::cache::{CacheStore, MemoryCache, NullCache};
use anilist_mcp::error::rpc_codes;
use anilist_mcp::pipeline::ToolPipeline;
use anilist_mcp::tools::Caller;
use anilist_mcp::upstream::QueryExecutor;
use anilist_mcp::{Error, Result};

/// Upstream double that records every query it receives
struct FakeAniList {
    calls: AtomicUsize,
    fail_first: AtomicUsize,
    response: Value,
    last_variables: std::sync::Mutex<Option<Value>>,
}

impl FakeAniList {
    fn returning(response: Value) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail_first: AtomicUsize::new(0),
            response,
            last_variables: std::sync::Mutex::new(None),
        })
    }

    fn failing_first(response: Value, failures: usize) -> Arc<Self> {
        let fake = Self::returning(response);
        fake.fail_first.store(failures, Ordering::SeqCst);
        fake
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_variables(&self) -> Option<Value> {
        self.last_variables.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryExecutor for FakeAniList {
    async fn execute(&self, _query: &str, variables: Value) -> Result<Value> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_variables.lock().unwrap() = Some(variables);

        if call < self.fail_first.load(Ordering::SeqCst) {
            return Err(Error::Upstream {
                status: Some(500),
                message: "Internal Server Error".to_string(),
            });
        }
        Ok(self.response.clone())
    }
}

fn media_page() -> Value {
    json!({
        "Page": {
            "pageInfo": {"total": 1, "currentPage": 1, "hasNextPage": false},
            "media": [{"id": 154_587, "title": {"romaji": "Sousou no Frieren"}}]
        }
    })
}

fn pipeline_with(cache: Arc<dyn CacheStore>, upstream: Arc<FakeAniList>) -> ToolPipeline {
    ToolPipeline::new(cache, upstream)
}

#[tokio::test]
async fn repeated_call_is_served_from_cache() {
    let upstream = FakeAniList::returning(media_page());
    let pipeline = pipeline_with(Arc::new(MemoryCache::with_capacity(100)), upstream.clone());
    let args = json!({"query": "frieren"});

    let first = pipeline.call("search_anime", &args, &Caller::anonymous()).await.unwrap();
    let second = pipeline.call("search_anime", &args, &Caller::anonymous()).await.unwrap();

    assert_eq!(upstream.calls(), 1);
    assert_eq!(first, second);
    assert_eq!(first, media_page());
}

#[tokio::test]
async fn cache_is_transparent() {
    let args = json!({"season": "FALL", "year": 2023});

    let cached_upstream = FakeAniList::returning(media_page());
    let cached = pipeline_with(Arc::new(MemoryCache::with_capacity(100)), cached_upstream)
        .call("get_season_anime", &args, &Caller::anonymous())
        .await
        .unwrap();

    let uncached_upstream = FakeAniList::returning(media_page());
    let uncached = pipeline_with(Arc::new(NullCache), uncached_upstream)
        .call("get_season_anime", &args, &Caller::anonymous())
        .await
        .unwrap();

    assert_eq!(cached, uncached);
}

#[tokio::test]
async fn disabled_cache_always_fetches() {
    let upstream = FakeAniList::returning(media_page());
    let pipeline = pipeline_with(Arc::new(NullCache), upstream.clone());

    for _ in 0..3 {
        pipeline
            .call("get_trending_anime", &json!({}), &Caller::anonymous())
            .await
            .unwrap();
    }
    assert_eq!(upstream.calls(), 3);
}

#[tokio::test]
async fn different_arguments_do_not_share_entries() {
    let upstream = FakeAniList::returning(media_page());
    let pipeline = pipeline_with(Arc::new(MemoryCache::with_capacity(100)), upstream.clone());

    pipeline
        .call("get_trending_anime", &json!({"page": 1}), &Caller::anonymous())
        .await
        .unwrap();
    pipeline
        .call("get_trending_anime", &json!({"page": 2}), &Caller::anonymous())
        .await
        .unwrap();

    assert_eq!(upstream.calls(), 2);
}

#[tokio::test]
async fn failed_fetch_is_not_cached() {
    let upstream = FakeAniList::failing_first(media_page(), 1);
    let pipeline = pipeline_with(Arc::new(MemoryCache::with_capacity(100)), upstream.clone());
    let args = json!({"query": "frieren"});

    let err = pipeline
        .call("search_anime", &args, &Caller::anonymous())
        .await
        .unwrap_err();
    assert_eq!(err.to_rpc_code(), rpc_codes::UPSTREAM_ERROR);

    let ok = pipeline.call("search_anime", &args, &Caller::anonymous()).await.unwrap();
    assert_eq!(ok, media_page());
    assert_eq!(upstream.calls(), 2);
}

#[tokio::test]
async fn invalid_arguments_never_reach_upstream() {
    let upstream = FakeAniList::returning(media_page());
    let pipeline = pipeline_with(Arc::new(MemoryCache::with_capacity(100)), upstream.clone());

    let err = pipeline
        .call("search_anime", &json!({"query": "frieren", "perPage": 500}), &Caller::anonymous())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Validation { .. }));
    assert_eq!(err.to_rpc_code(), rpc_codes::INVALID_PARAMS);
    assert_eq!(upstream.calls(), 0);
}

#[tokio::test]
async fn unknown_tool_is_invalid_params() {
    let upstream = FakeAniList::returning(media_page());
    let pipeline = pipeline_with(Arc::new(NullCache), upstream.clone());

    let err = pipeline
        .call("get_manga", &json!({}), &Caller::anonymous())
        .await
        .unwrap_err();

    assert_eq!(err.to_rpc_code(), rpc_codes::INVALID_PARAMS);
    assert_eq!(upstream.calls(), 0);
}

#[tokio::test]
async fn user_list_without_identity_is_configuration_error() {
    let upstream = FakeAniList::returning(json!({"MediaListCollection": {"lists": []}}));
    let pipeline = pipeline_with(Arc::new(MemoryCache::with_capacity(100)), upstream.clone());

    let err = pipeline
        .call("get_user_list", &json!({}), &Caller::anonymous())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Config(_)));
    assert_eq!(err.to_rpc_code(), rpc_codes::CONFIGURATION_ERROR);
    assert_eq!(upstream.calls(), 0);
}

#[tokio::test]
async fn user_list_is_never_cached() {
    let upstream = FakeAniList::returning(json!({"MediaListCollection": {"lists": []}}));
    let pipeline = pipeline_with(Arc::new(MemoryCache::with_capacity(100)), upstream.clone());
    let caller = Caller::user(5_144_233);

    pipeline
        .call("get_user_list", &json!({"status": "CURRENT"}), &caller)
        .await
        .unwrap();
    pipeline
        .call("get_user_list", &json!({"status": "CURRENT"}), &caller)
        .await
        .unwrap();

    assert_eq!(upstream.calls(), 2);
    assert_eq!(
        upstream.last_variables(),
        Some(json!({"userId": 5_144_233, "status": "CURRENT", "page": 1, "perPage": 50}))
    );
}

#[tokio::test]
async fn character_lookup_by_name_is_cached() {
    let upstream = FakeAniList::returning(json!({"Character": {"id": 176_754}}));
    let pipeline = pipeline_with(Arc::new(MemoryCache::with_capacity(100)), upstream.clone());
    let args = json!({"name": "Frieren"});

    pipeline.call("get_character_info", &args, &Caller::anonymous()).await.unwrap();
    pipeline.call("get_character_info", &args, &Caller::anonymous()).await.unwrap();

    assert_eq!(upstream.calls(), 1);
    assert_eq!(upstream.last_variables(), Some(json!({"search": "Frieren"})));
}

fn recommendations() -> Value {
    json!({
        "Media": {
            "id": 154_587,
            "recommendations": {
                "nodes": [
                    {
                        "rating": 120,
                        "mediaRecommendation": {
                            "id": 457,
                            "title": {"romaji": "Mushishi"},
                            "averageScore": 86,
                            "genres": ["Adventure", "Slice of Life"],
                            "studios": {"nodes": [{"name": "Artland"}]}
                        }
                    },
                    {
                        "rating": 80,
                        "mediaRecommendation": {
                            "id": 21_827,
                            "title": {"romaji": "Violet Evergarden"},
                            "averageScore": 85,
                            "genres": ["Drama", "Fantasy"],
                            "studios": {"nodes": [{"name": "Kyoto Animation"}]}
                        }
                    }
                ]
            }
        }
    })
}

#[tokio::test]
async fn recommendations_scored_against_taste_profile() {
    let upstream = FakeAniList::returning(recommendations());
    let pipeline = pipeline_with(Arc::new(NullCache), upstream);

    let result = pipeline
        .call(
            "recommend_anime",
            &json!({
                "animeId": 154_587,
                "tasteProfile": {
                    "genres": {"Drama": 2.0, "Fantasy": 1.0},
                    "studios": {"Kyoto Animation": 3.0}
                }
            }),
            &Caller::anonymous(),
        )
        .await
        .unwrap();

    assert_eq!(result["animeId"], 154_587);
    let recs = result["recommendations"].as_array().unwrap();
    assert_eq!(recs.len(), 2);
    assert_eq!(recs[0]["id"], 457);
    assert_eq!(recs[0]["score"], 0.0);
    assert_eq!(recs[1]["id"], 21_827);
    assert_eq!(recs[1]["score"], 6.0);
}

#[tokio::test]
async fn recommendation_cache_shared_across_taste_profiles() {
    let upstream = FakeAniList::returning(recommendations());
    let pipeline = pipeline_with(Arc::new(MemoryCache::with_capacity(100)), upstream.clone());

    let drama = pipeline
        .call(
            "recommend_anime",
            &json!({"animeId": 154_587, "tasteProfile": {"genres": {"Drama": 1.0}}}),
            &Caller::anonymous(),
        )
        .await
        .unwrap();
    let adventure = pipeline
        .call(
            "recommend_anime",
            &json!({"animeId": 154_587, "tasteProfile": {"genres": {"Adventure": 1.0}}}),
            &Caller::anonymous(),
        )
        .await
        .unwrap();

    assert_eq!(upstream.calls(), 1);
    assert_eq!(drama["recommendations"][1]["score"], 1.0);
    assert_eq!(adventure["recommendations"][0]["score"], 1.0);
    assert_eq!(adventure["recommendations"][1]["score"], 0.0);
}
