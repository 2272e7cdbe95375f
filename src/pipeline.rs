//! Tool execution: validate, look up, fetch, store
//!
//! Validation failures never touch the cache or AniList. Cache hits are
//! returned exactly as stored. Misses go upstream once and are written back
//! with the tool's TTL; failed fetches are never written.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{debug, instrument};

use crate::Result;
use crate::cache::CacheStore;
use crate::policy::derive_key;
use crate::recommend::{recommendations_from, score_items};
use crate::tools::{
    Caller, CharacterParams, RecommendParams, SearchParams, SeasonParams, ToolName, ToolParams,
    TrendingParams, UserListParams, parse_params,
};
use crate::upstream::QueryExecutor;

/// Shared tool runner; cheap to clone
#[derive(Clone)]
pub struct ToolPipeline {
    cache: Arc<dyn CacheStore>,
    upstream: Arc<dyn QueryExecutor>,
}

impl ToolPipeline {
    /// Build a pipeline over an already-selected cache backend and upstream client
    pub fn new(cache: Arc<dyn CacheStore>, upstream: Arc<dyn QueryExecutor>) -> Self {
        Self { cache, upstream }
    }

    /// Name of the active cache backend
    pub fn cache_backend(&self) -> &'static str {
        self.cache.backend()
    }

    /// Whether the cache backend is reachable
    pub async fn cache_reachable(&self) -> bool {
        self.cache.ping().await
    }

    /// Run tool `name` with raw JSON `arguments` on behalf of `caller`
    #[instrument(skip(self, arguments, caller), fields(user_id = ?caller.user_id))]
    pub async fn call(&self, name: &str, arguments: &Value, caller: &Caller) -> Result<Value> {
        match name.parse::<ToolName>()? {
            ToolName::SearchAnime => self.search_anime(parse_params(arguments)?).await,
            ToolName::TrendingAnime => self.trending_anime(parse_params(arguments)?).await,
            ToolName::SeasonAnime => self.season_anime(parse_params(arguments)?).await,
            ToolName::UserList => self.user_list(parse_params(arguments)?, caller).await,
            ToolName::CharacterInfo => self.character_info(parse_params(arguments)?).await,
            ToolName::RecommendAnime => self.recommend_anime(parse_params(arguments)?).await,
        }
    }

    /// `search_anime`
    pub async fn search_anime(&self, params: SearchParams) -> Result<Value> {
        self.fetch(&params, &Caller::anonymous()).await
    }

    /// `get_trending_anime`
    pub async fn trending_anime(&self, params: TrendingParams) -> Result<Value> {
        self.fetch(&params, &Caller::anonymous()).await
    }

    /// `get_season_anime`
    pub async fn season_anime(&self, params: SeasonParams) -> Result<Value> {
        self.fetch(&params, &Caller::anonymous()).await
    }

    /// `get_user_list`; always fetched fresh for the caller's own user
    pub async fn user_list(&self, params: UserListParams, caller: &Caller) -> Result<Value> {
        self.fetch(&params, caller).await
    }

    /// `get_character_info`
    pub async fn character_info(&self, params: CharacterParams) -> Result<Value> {
        self.fetch(&params, &Caller::anonymous()).await
    }

    /// `recommend_anime`: cached community recommendations, scored per call
    pub async fn recommend_anime(&self, params: RecommendParams) -> Result<Value> {
        let data = self.fetch(&params, &Caller::anonymous()).await?;
        let profile = params.taste_profile.unwrap_or_default();
        let scored = score_items(recommendations_from(&data), &profile);

        Ok(json!({
            "animeId": params.anime_id,
            "recommendations": scored,
        }))
    }

    async fn fetch<P: ToolParams>(&self, params: &P, caller: &Caller) -> Result<Value> {
        let variables = params.variables(caller)?;

        let Some((key, ttl)) = derive_key(params) else {
            return self.upstream.execute(P::QUERY, variables).await;
        };

        if let Some(hit) = self.cache.get(key.as_str()).await {
            debug!(key = %key, "Cache hit");
            return Ok(hit);
        }
        debug!(key = %key, "Cache miss");

        let fresh = self.upstream.execute(P::QUERY, variables).await?;
        self.cache.set(key.as_str(), &fresh, ttl).await;
        Ok(fresh)
    }
}
