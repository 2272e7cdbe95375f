//! Tool catalogue: names, schemas and typed parameters

mod params;
mod queries;

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde_json::Value;

pub use params::{
    CharacterParams, ListStatus, MediaFormat, RecommendParams, SearchParams, Season, SeasonParams,
    TrendingParams, UserListParams,
};

use crate::error::rpc_codes;
use crate::protocol::{Tool, ToolAnnotations};
use crate::schema::validate_arguments;
use crate::{Error, Result};

/// Identity of whoever issued a tool call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Caller {
    /// AniList user id, when the caller is bound to one
    pub user_id: Option<i64>,
}

impl Caller {
    /// Caller with no AniList identity
    #[must_use]
    pub const fn anonymous() -> Self {
        Self { user_id: None }
    }

    /// Caller acting as AniList user `user_id`
    #[must_use]
    pub const fn user(user_id: i64) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }
}

/// Every tool this server exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    /// `search_anime`
    SearchAnime,
    /// `get_trending_anime`
    TrendingAnime,
    /// `get_season_anime`
    SeasonAnime,
    /// `get_user_list`
    UserList,
    /// `get_character_info`
    CharacterInfo,
    /// `recommend_anime`
    RecommendAnime,
}

impl ToolName {
    /// All tools, in listing order
    pub const ALL: [Self; 6] = [
        Self::SearchAnime,
        Self::TrendingAnime,
        Self::SeasonAnime,
        Self::UserList,
        Self::CharacterInfo,
        Self::RecommendAnime,
    ];

    /// Wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SearchAnime => "search_anime",
            Self::TrendingAnime => "get_trending_anime",
            Self::SeasonAnime => "get_season_anime",
            Self::UserList => "get_user_list",
            Self::CharacterInfo => "get_character_info",
            Self::RecommendAnime => "recommend_anime",
        }
    }

    fn title(self) -> &'static str {
        match self {
            Self::SearchAnime => "Search anime",
            Self::TrendingAnime => "Trending anime",
            Self::SeasonAnime => "Seasonal anime",
            Self::UserList => "My anime list",
            Self::CharacterInfo => "Character info",
            Self::RecommendAnime => "Recommend anime",
        }
    }

    fn description(self) -> &'static str {
        match self {
            Self::SearchAnime => {
                "Search AniList for anime by title, optionally filtered by genres, season, year and format."
            }
            Self::TrendingAnime => "List the anime currently trending on AniList.",
            Self::SeasonAnime => "List the most popular anime of a given season and year.",
            Self::UserList => {
                "Show the authenticated user's AniList anime list, optionally filtered by status."
            }
            Self::CharacterInfo => {
                "Look up a character by AniList id or by name, with the works they appear in."
            }
            Self::RecommendAnime => {
                "Community recommendations for an anime, each scored against an optional genre/studio taste profile."
            }
        }
    }

    /// JSON Schema for this tool's arguments
    #[must_use]
    pub fn input_schema(self) -> Value {
        match self {
            Self::SearchAnime => SearchParams::input_schema(),
            Self::TrendingAnime => TrendingParams::input_schema(),
            Self::SeasonAnime => SeasonParams::input_schema(),
            Self::UserList => UserListParams::input_schema(),
            Self::CharacterInfo => CharacterParams::input_schema(),
            Self::RecommendAnime => RecommendParams::input_schema(),
        }
    }

    /// MCP tool definition for `tools/list`
    #[must_use]
    pub fn definition(self) -> Tool {
        Tool {
            name: self.as_str().to_string(),
            title: Some(self.title().to_string()),
            description: Some(self.description().to_string()),
            input_schema: self.input_schema(),
            annotations: Some(ToolAnnotations {
                read_only_hint: Some(true),
                idempotent_hint: Some(true),
                open_world_hint: Some(true),
            }),
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|tool| tool.as_str() == s)
            .ok_or_else(|| Error::json_rpc(rpc_codes::INVALID_PARAMS, format!("Unknown tool: {s}")))
    }
}

/// Definitions of every tool
#[must_use]
pub fn definitions() -> Vec<Tool> {
    ToolName::ALL.into_iter().map(ToolName::definition).collect()
}

/// Validated parameters for one tool
pub trait ToolParams: DeserializeOwned + Send + Sync {
    /// Tool these parameters belong to
    const TOOL: ToolName;
    /// GraphQL document sent upstream
    const QUERY: &'static str;

    /// Declared argument schema
    fn input_schema() -> Value;

    /// Values the upstream answer depends on, in declaration order
    fn cache_components(&self) -> Vec<Value>;

    /// GraphQL variables for this call
    fn variables(&self, caller: &Caller) -> Result<Value>;

    /// Cross-field rules the schema cannot express
    fn check(&self) -> Result<()> {
        Ok(())
    }
}

/// Validate raw arguments against `P`'s schema and build the typed record
pub fn parse_params<P: ToolParams>(arguments: &Value) -> Result<P> {
    let tool = P::TOOL.as_str();
    let result = validate_arguments(arguments, &P::input_schema());
    if !result.is_valid() {
        return Err(Error::Validation {
            tool: tool.to_string(),
            violations: result.violations,
        });
    }

    let params: P = serde_json::from_value(result.normalized)
        .map_err(|e| Error::invalid(tool, "", e.to_string()))?;
    params.check()?;
    Ok(params)
}
