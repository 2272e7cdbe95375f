//! Typed, validated parameters for each tool

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::{Caller, ToolName, ToolParams, queries};
use crate::recommend::TasteProfile;
use crate::{Error, Result};

/// Anime season
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Fall,
}

/// Media format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum MediaFormat {
    Tv,
    TvShort,
    Movie,
    Special,
    Ova,
    Ona,
    Music,
}

/// Status of an entry on a user's list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum ListStatus {
    Current,
    Planning,
    Completed,
    Dropped,
    Paused,
    Repeating,
}

const SEASONS: [&str; 4] = ["WINTER", "SPRING", "SUMMER", "FALL"];

fn page_schema() -> Value {
    json!({
        "type": "integer",
        "minimum": 1,
        "maximum": i32::MAX,
        "default": 1,
        "description": "Page number (1-based)"
    })
}

fn per_page_schema(max: u32, default: u32) -> Value {
    json!({
        "type": "integer",
        "minimum": 1,
        "maximum": max,
        "default": default,
        "description": format!("Results per page (1-{max})")
    })
}

/// Serialize to a JSON value; every params type here is plain data
fn to_json<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Drop null variables so AniList applies no filter for them
fn compact(variables: Value) -> Value {
    match variables {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .collect::<Map<_, _>>(),
        ),
        other => other,
    }
}

/// `search_anime` arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct SearchParams {
    pub query: String,
    pub genres: Option<Vec<String>>,
    pub season: Option<Season>,
    pub year: Option<i32>,
    pub format: Option<MediaFormat>,
    pub page: u32,
    pub per_page: u32,
}

impl ToolParams for SearchParams {
    const TOOL: ToolName = ToolName::SearchAnime;
    const QUERY: &'static str = queries::SEARCH_ANIME;

    fn input_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "minLength": 1, "maxLength": 200, "description": "Title to search for" },
                "genres": { "type": "array", "items": { "type": "string" }, "description": "Only titles having all of these genres" },
                "season": { "type": "string", "enum": SEASONS },
                "year": { "type": "integer", "minimum": 1940, "maximum": 2100, "description": "Season year" },
                "format": { "type": "string", "enum": ["TV", "TV_SHORT", "MOVIE", "SPECIAL", "OVA", "ONA", "MUSIC"] },
                "page": page_schema(),
                "perPage": per_page_schema(50, 10)
            },
            "required": ["query"]
        })
    }

    fn cache_components(&self) -> Vec<Value> {
        vec![
            json!(self.query),
            to_json(&self.genres),
            to_json(&self.season),
            json!(self.year),
            to_json(&self.format),
            json!(self.page),
            json!(self.per_page),
        ]
    }

    fn variables(&self, _caller: &Caller) -> Result<Value> {
        Ok(compact(json!({
            "search": self.query,
            "genre_in": self.genres,
            "season": self.season,
            "seasonYear": self.year,
            "format": self.format,
            "page": self.page,
            "perPage": self.per_page,
        })))
    }
}

/// `get_trending_anime` arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct TrendingParams {
    pub page: u32,
    pub per_page: u32,
}

impl ToolParams for TrendingParams {
    const TOOL: ToolName = ToolName::TrendingAnime;
    const QUERY: &'static str = queries::TRENDING_ANIME;

    fn input_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "page": page_schema(),
                "perPage": per_page_schema(50, 10)
            }
        })
    }

    fn cache_components(&self) -> Vec<Value> {
        vec![json!(self.page), json!(self.per_page)]
    }

    fn variables(&self, _caller: &Caller) -> Result<Value> {
        Ok(json!({ "page": self.page, "perPage": self.per_page }))
    }
}

/// `get_season_anime` arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct SeasonParams {
    pub season: Season,
    pub year: i32,
    pub page: u32,
    pub per_page: u32,
}

impl ToolParams for SeasonParams {
    const TOOL: ToolName = ToolName::SeasonAnime;
    const QUERY: &'static str = queries::SEASON_ANIME;

    fn input_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "season": { "type": "string", "enum": SEASONS },
                "year": { "type": "integer", "minimum": 1940, "maximum": 2100 },
                "page": page_schema(),
                "perPage": per_page_schema(50, 20)
            },
            "required": ["season", "year"]
        })
    }

    fn cache_components(&self) -> Vec<Value> {
        vec![
            to_json(&self.season),
            json!(self.year),
            json!(self.page),
            json!(self.per_page),
        ]
    }

    fn variables(&self, _caller: &Caller) -> Result<Value> {
        Ok(json!({
            "season": self.season,
            "seasonYear": self.year,
            "page": self.page,
            "perPage": self.per_page,
        }))
    }
}

/// `get_user_list` arguments; the user comes from the caller, never the arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct UserListParams {
    pub status: Option<ListStatus>,
    pub page: u32,
    pub per_page: u32,
}

impl ToolParams for UserListParams {
    const TOOL: ToolName = ToolName::UserList;
    const QUERY: &'static str = queries::USER_LIST;

    fn input_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "status": {
                    "type": "string",
                    "enum": ["CURRENT", "PLANNING", "COMPLETED", "DROPPED", "PAUSED", "REPEATING"]
                },
                "page": page_schema(),
                "perPage": per_page_schema(500, 50)
            }
        })
    }

    fn cache_components(&self) -> Vec<Value> {
        vec![to_json(&self.status), json!(self.page), json!(self.per_page)]
    }

    fn variables(&self, caller: &Caller) -> Result<Value> {
        let user_id = caller.user_id.ok_or_else(|| {
            Error::Config(
                "get_user_list requires an authenticated AniList user; configure user_id for your API key or pass --user-id".to_string(),
            )
        })?;

        Ok(compact(json!({
            "userId": user_id,
            "status": self.status,
            "page": self.page,
            "perPage": self.per_page,
        })))
    }
}

/// `get_character_info` arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct CharacterParams {
    pub character_id: Option<i64>,
    pub name: Option<String>,
}

impl ToolParams for CharacterParams {
    const TOOL: ToolName = ToolName::CharacterInfo;
    const QUERY: &'static str = queries::CHARACTER_INFO;

    fn input_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "characterId": { "type": "integer", "minimum": 1, "description": "AniList character id" },
                "name": { "type": "string", "minLength": 2, "maxLength": 100, "description": "Character name to search for" }
            }
        })
    }

    fn check(&self) -> Result<()> {
        if self.character_id.is_none() && self.name.is_none() {
            return Err(Error::invalid(
                Self::TOOL.as_str(),
                "characterId",
                "either characterId or name is required",
            ));
        }
        Ok(())
    }

    fn cache_components(&self) -> Vec<Value> {
        vec![json!(self.character_id), json!(self.name)]
    }

    fn variables(&self, _caller: &Caller) -> Result<Value> {
        Ok(compact(json!({ "id": self.character_id, "search": self.name })))
    }
}

/// `recommend_anime` arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct RecommendParams {
    pub anime_id: i64,
    pub per_page: u32,
    #[serde(default)]
    pub taste_profile: Option<TasteProfile>,
}

impl ToolParams for RecommendParams {
    const TOOL: ToolName = ToolName::RecommendAnime;
    const QUERY: &'static str = queries::RECOMMEND_ANIME;

    fn input_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "animeId": { "type": "integer", "minimum": 1, "description": "AniList id of the reference title" },
                "perPage": per_page_schema(25, 10),
                "tasteProfile": {
                    "type": "object",
                    "description": "Weights used to score each recommendation",
                    "properties": {
                        "genres": { "type": "object", "additionalProperties": { "type": "number" } },
                        "studios": { "type": "object", "additionalProperties": { "type": "number" } },
                        "vector": { "type": "array", "items": { "type": "number" } }
                    },
                    "additionalProperties": false
                }
            },
            "required": ["animeId"]
        })
    }

    // The taste profile is applied after the fetch and never reaches AniList.
    fn cache_components(&self) -> Vec<Value> {
        vec![json!(self.anime_id), json!(self.per_page)]
    }

    fn variables(&self, _caller: &Caller) -> Result<Value> {
        Ok(json!({ "id": self.anime_id, "perPage": self.per_page }))
    }
}
