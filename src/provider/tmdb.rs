use super::*;
use serde::Deserialize;
use std::time::Instant;

/// The Movie Database (TMDB) provider implementation
pub struct TmdbProvider {
    base_url: String,
    image_base_url: String,
    language: String,
    api_key: Option<String>,
    timeout: Duration,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct PagedResponse<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct TmdbPerson {
    id: u64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct CreditsResponse {
    #[serde(default)]
    cast: Vec<TmdbCastCredit>,
}

#[derive(Debug, Deserialize)]
struct TmdbCastCredit {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    poster_path: Option<String>,
    #[serde(default)]
    vote_average: f64,
    #[serde(default)]
    vote_count: u32,
}

impl TmdbCastCredit {
    /// TV credits come back without a title and are dropped
    fn into_credit(self) -> Option<MovieCredit> {
        Some(MovieCredit {
            title: self.title?,
            poster_path: self.poster_path,
            vote_average: self.vote_average,
            vote_count: self.vote_count,
        })
    }
}

impl TmdbProvider {
    pub fn new(config: &ProviderConfig) -> ProviderResult<Self> {
        Ok(Self {
            base_url: config.tmdb_base_url.trim_end_matches('/').to_string(),
            image_base_url: config.tmdb_image_base_url.trim_end_matches('/').to_string(),
            language: config.tmdb_language.clone(),
            api_key: config.tmdb_api_key.clone(),
            timeout: config.timeout,
            client: http_client(config.timeout)?,
        })
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> ProviderResult<T> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| ProviderError::ConfigError("TMDB_API_KEY is not set".to_string()))?;

        let start = Instant::now();
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .query(&[("api_key", api_key.as_str()), ("language", self.language.as_str())])
            .query(params)
            .send()
            .await
            .map_err(|e| request_error(e, self.timeout))?;

        if !response.status().is_success() {
            return Err(ProviderError::ApiError(format!(
                "TMDB {} returned status: {}",
                path,
                response.status()
            )));
        }

        let body = response
            .json::<T>()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        tracing::debug!(
            "TMDB {} answered in {}ms",
            path,
            start.elapsed().as_millis()
        );
        Ok(body)
    }
}

#[async_trait]
impl MovieProvider for TmdbProvider {
    async fn popular_people(&self, page: u32) -> ProviderResult<Vec<PersonSummary>> {
        let response: PagedResponse<TmdbPerson> = self
            .get("/person/popular", &[("page", page.to_string())])
            .await?;

        Ok(response
            .results
            .into_iter()
            .map(|p| PersonSummary {
                id: p.id,
                name: p.name,
            })
            .collect())
    }

    async fn movie_credits(&self, person_id: u64) -> ProviderResult<Vec<MovieCredit>> {
        let response: CreditsResponse = self
            .get(&format!("/person/{}/movie_credits", person_id), &[])
            .await?;

        Ok(response
            .cast
            .into_iter()
            .filter_map(TmdbCastCredit::into_credit)
            .collect())
    }

    async fn search_movies(&self, query: &str) -> ProviderResult<Vec<MovieSearchResult>> {
        let response: PagedResponse<MovieSearchResult> = self
            .get("/search/movie", &[("query", query.to_string())])
            .await?;
        Ok(response.results)
    }

    fn poster_url(&self, poster_path: &str) -> String {
        format!("{}{}", self.image_base_url, poster_path)
    }

    fn name(&self) -> &str {
        "tmdb"
    }
}
