//! Taste-profile scoring for recommendations
//!
//! Each item scores the sum of the profile's weights over its genre tags
//! plus the sum over its studio tags. Tags missing from the profile weigh
//! zero. Scoring never reorders or drops items.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Something carrying genre and studio tags
pub trait Tagged {
    /// Genre names
    fn genres(&self) -> &[String];
    /// Studio names
    fn studios(&self) -> &[String];
}

/// Per-caller preference weights
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TasteProfile {
    /// Genre name to weight
    pub genres: HashMap<String, f64>,
    /// Studio name to weight
    pub studios: HashMap<String, f64>,
    /// Embedding carried alongside the weights; not used for scoring
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vec<f64>>,
}

impl TasteProfile {
    /// Score one item
    #[must_use]
    pub fn score<T: Tagged>(&self, item: &T) -> f64 {
        let genre_score: f64 = item
            .genres()
            .iter()
            .filter_map(|g| self.genres.get(g))
            .sum();
        let studio_score: f64 = item
            .studios()
            .iter()
            .filter_map(|s| self.studios.get(s))
            .sum();
        genre_score + studio_score
    }
}

/// An item with its computed score
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredItem<T> {
    /// Original item, fields preserved
    #[serde(flatten)]
    pub item: T,
    /// Profile score
    pub score: f64,
}

/// Score every item against `profile`, keeping input order
#[must_use]
pub fn score_items<T: Tagged>(items: Vec<T>, profile: &TasteProfile) -> Vec<ScoredItem<T>> {
    items
        .into_iter()
        .map(|item| {
            let score = profile.score(&item);
            ScoredItem { item, score }
        })
        .collect()
}

/// One community recommendation, flattened from the AniList response
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendedAnime {
    /// AniList media id
    pub id: i64,
    /// Title variants as returned by AniList
    pub title: Value,
    /// Cover image URLs
    pub cover_image: Value,
    /// Mean user score (0-100)
    pub average_score: Option<i64>,
    /// Genre tags
    pub genres: Vec<String>,
    /// Main studio names
    pub studios: Vec<String>,
    /// Community rating of the recommendation itself
    pub rating: i64,
}

impl Tagged for RecommendedAnime {
    fn genres(&self) -> &[String] {
        &self.genres
    }

    fn studios(&self) -> &[String] {
        &self.studios
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNode {
    #[serde(default)]
    rating: Option<i64>,
    media_recommendation: Option<RawMedia>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMedia {
    id: i64,
    #[serde(default)]
    title: Value,
    #[serde(default)]
    cover_image: Value,
    average_score: Option<i64>,
    #[serde(default)]
    genres: Vec<String>,
    studios: Option<RawStudios>,
}

#[derive(Deserialize)]
struct RawStudios {
    #[serde(default)]
    nodes: Vec<RawStudio>,
}

#[derive(Deserialize)]
struct RawStudio {
    name: String,
}

/// Flatten `Media.recommendations.nodes` into tagged items.
///
/// Nodes whose recommended title was deleted upstream come back as `null`
/// and are skipped.
#[must_use]
pub fn recommendations_from(data: &Value) -> Vec<RecommendedAnime> {
    let Some(nodes) = data
        .pointer("/Media/recommendations/nodes")
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };

    nodes
        .iter()
        .filter_map(|node| serde_json::from_value::<RawNode>(node.clone()).ok())
        .filter_map(|node| {
            let media = node.media_recommendation?;
            Some(RecommendedAnime {
                id: media.id,
                title: media.title,
                cover_image: media.cover_image,
                average_score: media.average_score,
                genres: media.genres,
                studios: media
                    .studios
                    .map(|s| s.nodes.into_iter().map(|n| n.name).collect())
                    .unwrap_or_default(),
                rating: node.rating.unwrap_or(0),
            })
        })
        .collect()
}
