use super::*;
use serde::Deserialize;

/// API-Football (via RapidAPI) provider implementation
pub struct ApiFootballProvider {
    host: Option<String>,
    api_key: Option<String>,
    league: String,
    season: String,
    timeout: Duration,
    client: reqwest::Client,
}

/// Every API-Football payload is wrapped in a `response` array
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default = "Vec::new")]
    response: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct PlayerEntry {
    player: ApiPlayer,
}

#[derive(Debug, Deserialize)]
struct ApiPlayer {
    id: u64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct TransferEntry {
    #[serde(default)]
    transfers: Vec<ApiTransfer>,
}

#[derive(Debug, Deserialize)]
struct ApiTransfer {
    teams: TransferTeams,
}

#[derive(Debug, Deserialize)]
struct TransferTeams {
    #[serde(rename = "in", default)]
    joined: Option<ApiTeam>,
    #[serde(rename = "out", default)]
    left: Option<ApiTeam>,
}

#[derive(Debug, Deserialize)]
struct ApiTeam {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TeamEntry {
    team: ApiTeam,
}

fn team_name(team: Option<ApiTeam>) -> Option<String> {
    team.and_then(|t| t.name)
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
}

impl ApiFootballProvider {
    pub fn new(config: &ProviderConfig) -> ProviderResult<Self> {
        Ok(Self {
            host: config.rapidapi_host.clone(),
            api_key: config.rapidapi_key.clone(),
            league: config.football_league.clone(),
            season: config.football_season.clone(),
            timeout: config.timeout,
            client: http_client(config.timeout)?,
        })
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> ProviderResult<Vec<T>> {
        let (Some(host), Some(api_key)) = (&self.host, &self.api_key) else {
            return Err(ProviderError::ConfigError(
                "RAPIDAPI_KEY and RAPIDAPI_HOST must be set".to_string(),
            ));
        };

        let url = format!("https://{}{}", host, path);
        let response = self
            .client
            .get(&url)
            .header("x-rapidapi-key", api_key)
            .header("x-rapidapi-host", host)
            .query(params)
            .send()
            .await
            .map_err(|e| request_error(e, self.timeout))?;

        if !response.status().is_success() {
            return Err(ProviderError::ApiError(format!(
                "API-Football {} returned status: {}",
                path,
                response.status()
            )));
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;
        Ok(envelope.response)
    }
}

#[async_trait]
impl FootballProvider for ApiFootballProvider {
    async fn search_player(&self, name: &str) -> ProviderResult<Option<FootballerSummary>> {
        let entries: Vec<PlayerEntry> = self
            .get(
                "/players",
                &[
                    ("search", name.to_string()),
                    ("league", self.league.clone()),
                    ("season", self.season.clone()),
                ],
            )
            .await?;

        Ok(entries.into_iter().next().map(|entry| FootballerSummary {
            id: entry.player.id,
            name: entry.player.name,
        }))
    }

    async fn transfers(&self, player_id: u64) -> ProviderResult<Vec<Transfer>> {
        let entries: Vec<TransferEntry> = self
            .get("/transfers", &[("player", player_id.to_string())])
            .await?;

        Ok(flatten_transfers(entries))
    }

    async fn league_teams(&self) -> ProviderResult<Vec<String>> {
        let entries: Vec<TeamEntry> = self
            .get(
                "/teams",
                &[
                    ("league", self.league.clone()),
                    ("season", self.season.clone()),
                ],
            )
            .await?;

        Ok(entries
            .into_iter()
            .filter_map(|entry| team_name(Some(entry.team)))
            .collect())
    }

    fn name(&self) -> &str {
        "api-football"
    }
}

fn flatten_transfers(entries: Vec<TransferEntry>) -> Vec<Transfer> {
    entries
        .into_iter()
        .flat_map(|entry| entry.transfers)
        .map(|transfer| Transfer {
            joined: team_name(transfer.teams.joined),
            left: team_name(transfer.teams.left),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_transfers() {
        let body = r#"{
            "get": "transfers",
            "response": [{
                "player": {"id": 276, "name": "Neymar"},
                "transfers": [
                    {"date": "2017-08-03", "type": "€ 222M", "teams": {
                        "in": {"id": 85, "name": "Paris Saint Germain"},
                        "out": {"id": 529, "name": "Barcelona"}
                    }},
                    {"date": "2013-06-03", "type": "€ 88.2M", "teams": {
                        "in": {"id": 529, "name": "Barcelona"},
                        "out": {"id": 128, "name": " Santos "}
                    }},
                    {"date": "2023-08-15", "type": "N/A", "teams": {
                        "in": {"id": 2932, "name": null},
                        "out": {"id": 85, "name": "Paris Saint Germain"}
                    }}
                ]
            }]
        }"#;

        let envelope: Envelope<TransferEntry> = serde_json::from_str(body).unwrap();
        let transfers = flatten_transfers(envelope.response);

        assert_eq!(transfers.len(), 3);
        assert_eq!(transfers[0].joined.as_deref(), Some("Paris Saint Germain"));
        assert_eq!(transfers[1].left.as_deref(), Some("Santos"));
        assert_eq!(transfers[2].joined, None);
    }

    #[test]
    fn test_parse_empty_search() {
        let body = r#"{"get": "players", "errors": [], "results": 0, "response": []}"#;
        let envelope: Envelope<PlayerEntry> = serde_json::from_str(body).unwrap();
        assert!(envelope.response.is_empty());
    }

    #[tokio::test]
    async fn test_missing_credentials_is_config_error() {
        let provider = ApiFootballProvider::new(&ProviderConfig::default()).unwrap();
        let result = provider.league_teams().await;
        assert!(matches!(result, Err(ProviderError::ConfigError(_))));
    }
}
