use std::ops::RangeInclusive;
use std::path::Path;
use std::time::Duration;

const DEFAULT_FOOTBALLERS: &[&str] = &[
    "Messi",
    "Cristiano Ronaldo",
    "Neymar",
    "Kylian Mbappé",
    "Zlatan Ibrahimovic",
    "Andres Iniesta",
    "Luka Modric",
    "Sergio Ramos",
];

/// Game server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Directory the static client is served from
    pub static_dir: String,
    /// Pause between a scored round and the next one
    pub round_delay: Duration,
    /// Pause between a tie notice and the tiebreak round
    pub sudden_death_delay: Duration,
    pub ledger_ttl: chrono::Duration,
    /// Popular-people pages scanned per draw
    pub max_people_pages: usize,
    pub people_page_range: RangeInclusive<u32>,
    /// Subjects tried before a round open gives up
    pub max_subject_draws: usize,
    /// Minimum votes for a credit to count toward the top five
    pub min_vote_count: u32,
    pub top_n: usize,
    pub perfect_bonus: u32,
    pub club_option_count: usize,
    /// Most picks a single selection may carry
    pub max_picks: usize,
    pub footballer_pool: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            static_dir: "public".to_string(),
            round_delay: Duration::from_secs(10),
            sudden_death_delay: Duration::from_secs(5),
            ledger_ttl: chrono::Duration::hours(24),
            max_people_pages: 5,
            people_page_range: 1..=20,
            max_subject_draws: 8,
            min_vote_count: 200,
            top_n: 5,
            perfect_bonus: 5,
            club_option_count: 10,
            max_picks: 5,
            footballer_pool: DEFAULT_FOOTBALLERS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .and_then(|s| s.trim().parse().ok())
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let footballer_pool = match std::env::var("FOOTBALLERS_PATH")
            .ok()
            .filter(|s| !s.trim().is_empty())
        {
            Some(path) => match load_footballers(Path::new(path.trim())) {
                Ok(pool) => {
                    tracing::info!("Loaded {} footballers from {}", pool.len(), path);
                    pool
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to load footballers from {}: {}. Using the built-in list.",
                        path,
                        e
                    );
                    defaults.footballer_pool
                }
            },
            None => defaults.footballer_pool,
        };

        Self {
            port: env_parse("PORT").unwrap_or(defaults.port),
            static_dir: std::env::var("STATIC_DIR")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.static_dir),
            round_delay: env_parse("ROUND_DELAY_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.round_delay),
            sudden_death_delay: env_parse("SUDDEN_DEATH_DELAY_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.sudden_death_delay),
            ledger_ttl: env_parse("LEDGER_TTL_HOURS")
                .map(chrono::Duration::hours)
                .unwrap_or(defaults.ledger_ttl),
            footballer_pool,
            ..defaults
        }
    }
}

/// Read a JSON array of footballer names
pub fn load_footballers(path: &Path) -> Result<Vec<String>, String> {
    let raw = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    let names: Vec<String> = serde_json::from_str(&raw).map_err(|e| e.to_string())?;

    let mut pool: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        let name = name.trim().to_string();
        if !name.is_empty() && !pool.contains(&name) {
            pool.push(name);
        }
    }

    if pool.is_empty() {
        return Err("footballer list is empty".to_string());
    }
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.round_delay, Duration::from_secs(10));
        assert_eq!(config.sudden_death_delay, Duration::from_secs(5));
        assert_eq!(config.footballer_pool.len(), 8);
    }

    #[test]
    fn test_load_footballers_dedups_and_trims() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"["Pedri", " Gavi ", "Pedri", ""]"#).unwrap();

        let pool = load_footballers(file.path()).unwrap();
        assert_eq!(pool, vec!["Pedri", "Gavi"]);
    }

    #[test]
    fn test_load_footballers_rejects_empty_list() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[]").unwrap();
        assert!(load_footballers(file.path()).is_err());
    }

    #[test]
    #[serial]
    fn test_from_env() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"["Pedri"]"#).unwrap();

        std::env::set_var("PORT", "8080");
        std::env::set_var("ROUND_DELAY_SECS", "2");
        std::env::set_var("LEDGER_TTL_HOURS", "");
        std::env::set_var("FOOTBALLERS_PATH", file.path());

        let config = ServerConfig::from_env();
        assert_eq!(config.port, 8080);
        assert_eq!(config.round_delay, Duration::from_secs(2));
        assert_eq!(config.ledger_ttl, chrono::Duration::hours(24));
        assert_eq!(config.footballer_pool, vec!["Pedri"]);

        std::env::remove_var("PORT");
        std::env::remove_var("ROUND_DELAY_SECS");
        std::env::remove_var("LEDGER_TTL_HOURS");
        std::env::remove_var("FOOTBALLERS_PATH");
    }
}
