//! GraphQL documents sent to AniList, one per tool

/// Media fields shared by every listing query
macro_rules! media_fields {
    () => {
        "id
        title { romaji english native }
        coverImage { large color }
        format
        status
        episodes
        season
        seasonYear
        averageScore
        popularity
        genres
        studios(isMain: true) { nodes { name } }"
    };
}

pub const SEARCH_ANIME: &str = concat!(
    "query SearchAnime($search: String, $genre_in: [String], $season: MediaSeason, ",
    "$seasonYear: Int, $format: MediaFormat, $page: Int, $perPage: Int) {
  Page(page: $page, perPage: $perPage) {
    pageInfo { total currentPage lastPage hasNextPage perPage }
    media(type: ANIME, search: $search, genre_in: $genre_in, season: $season, ",
    "seasonYear: $seasonYear, format: $format, sort: SEARCH_MATCH) {
      ",
    media_fields!(),
    "
      description(asHtml: false)
    }
  }
}"
);

pub const TRENDING_ANIME: &str = concat!(
    "query TrendingAnime($page: Int, $perPage: Int) {
  Page(page: $page, perPage: $perPage) {
    pageInfo { total currentPage lastPage hasNextPage perPage }
    media(type: ANIME, sort: TRENDING_DESC) {
      ",
    media_fields!(),
    "
      trending
    }
  }
}"
);

pub const SEASON_ANIME: &str = concat!(
    "query SeasonalAnime($season: MediaSeason, $seasonYear: Int, $page: Int, $perPage: Int) {
  Page(page: $page, perPage: $perPage) {
    pageInfo { total currentPage lastPage hasNextPage perPage }
    media(type: ANIME, season: $season, seasonYear: $seasonYear, sort: POPULARITY_DESC) {
      ",
    media_fields!(),
    "
    }
  }
}"
);

pub const USER_LIST: &str = "query UserList($userId: Int, $status: MediaListStatus, $page: Int, $perPage: Int) {
  Page(page: $page, perPage: $perPage) {
    pageInfo { total currentPage lastPage hasNextPage perPage }
    mediaList(userId: $userId, type: ANIME, status: $status) {
      media {
        id
        title { romaji english }
        coverImage { large }
        episodes
        genres
      }
      progress
      score
      status
      repeat
      updatedAt
    }
  }
}";

pub const CHARACTER_INFO: &str = "query CharacterInfo($id: Int, $search: String) {
  Character(id: $id, search: $search) {
    id
    name { full native alternative }
    image { large medium }
    description(asHtml: false)
    gender
    age
    dateOfBirth { month day }
    favourites
    media(sort: POPULARITY_DESC, perPage: 10) {
      edges {
        characterRole
        node {
          id
          type
          title { romaji english }
          coverImage { large }
        }
      }
    }
  }
}";

pub const RECOMMEND_ANIME: &str = "query AnimeRecommendations($id: Int, $perPage: Int) {
  Media(id: $id, type: ANIME) {
    id
    title { romaji english }
    recommendations(page: 1, perPage: $perPage, sort: RATING_DESC) {
      nodes {
        rating
        mediaRecommendation {
          id
          title { romaji english }
          coverImage { large }
          averageScore
          genres
          studios(isMain: true) { nodes { name } }
        }
      }
    }
  }
}";
