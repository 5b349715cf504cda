use super::AppState;
use crate::error::{GameError, GameResult};
use crate::protocol::RoundPrompt;
use crate::provider::{MovieCredit, PersonSummary};
use crate::types::*;
use rand::seq::IndexedRandom;
use rand::Rng;
use std::cmp::Ordering;
use std::collections::HashSet;

/// Every distinct credit with a poster, alphabetical
pub fn build_catalog(credits: &[MovieCredit], poster_url: impl Fn(&str) -> String) -> Vec<Movie> {
    let mut seen = HashSet::new();
    let mut catalog: Vec<Movie> = credits
        .iter()
        .filter_map(|c| {
            let poster = c.poster_path.as_deref()?;
            seen.insert(c.title.as_str()).then(|| Movie {
                title: c.title.clone(),
                poster: poster_url(poster),
            })
        })
        .collect();
    catalog.sort_by(|a, b| a.title.cmp(&b.title));
    catalog
}

/// Best-rated credits with enough votes and a poster; equal ratings keep provider order
pub fn top_rated(
    credits: &[MovieCredit],
    min_vote_count: u32,
    limit: usize,
    poster_url: impl Fn(&str) -> String,
) -> Vec<Movie> {
    let mut eligible: Vec<&MovieCredit> = credits
        .iter()
        .filter(|c| c.vote_count > min_vote_count && c.poster_path.is_some())
        .collect();
    eligible.sort_by(|a, b| {
        b.vote_average
            .partial_cmp(&a.vote_average)
            .unwrap_or(Ordering::Equal)
    });

    let mut seen = HashSet::new();
    eligible
        .into_iter()
        .filter(|c| seen.insert(c.title.as_str()))
        .take(limit)
        .filter_map(|c| {
            Some(Movie {
                title: c.title.clone(),
                poster: poster_url(c.poster_path.as_deref()?),
            })
        })
        .collect()
}

impl AppState {
    /// Pick an actor whose filmography can carry a full round
    pub(crate) async fn draw_movie_round(
        &self,
        room: &Room,
    ) -> GameResult<(SubjectId, AnswerKey, RoundPrompt)> {
        let used = self.ledger.list_used(GameType::Movies).await?;
        let mut rejected: HashSet<SubjectId> = HashSet::new();

        for _ in 0..self.config.max_subject_draws {
            let Some(person) = self.pick_popular_person(room, &used, &rejected).await? else {
                break;
            };
            let subject_id = person.id.to_string();
            if !self.ledger.record_use(GameType::Movies, &subject_id).await? {
                tracing::debug!("{} was claimed by another room", person.name);
                rejected.insert(subject_id);
                continue;
            }

            let credits = match self.movies.movie_credits(person.id).await {
                Ok(credits) => credits,
                Err(e) => {
                    self.release_subject(GameType::Movies, &subject_id).await;
                    return Err(e.into());
                }
            };
            let poster_url = |path: &str| self.movies.poster_url(path);
            let catalog = build_catalog(&credits, poster_url);
            let top_movies = top_rated(
                &credits,
                self.config.min_vote_count,
                self.config.top_n,
                poster_url,
            );

            if catalog.len() < self.config.top_n || top_movies.len() < self.config.top_n {
                tracing::debug!(
                    "Skipping {} ({} catalog entries, {} rated)",
                    person.name,
                    catalog.len(),
                    top_movies.len()
                );
                self.release_subject(GameType::Movies, &subject_id).await;
                rejected.insert(subject_id);
                continue;
            }

            tracing::info!("Room {} plays {}", room.code, person.name);
            return Ok((
                subject_id,
                AnswerKey::Movies {
                    actor_name: person.name.clone(),
                    top_movies,
                },
                RoundPrompt::Movies {
                    actor_name: person.name,
                    movie_list: catalog,
                },
            ));
        }

        Err(GameError::NoSubjectsAvailable(
            "Could not find an actor with enough rated movies".to_string(),
        ))
    }

    /// Scan random popular-people pages for someone not played recently
    async fn pick_popular_person(
        &self,
        room: &Room,
        used: &HashSet<String>,
        rejected: &HashSet<SubjectId>,
    ) -> GameResult<Option<PersonSummary>> {
        for _ in 0..self.config.max_people_pages {
            let page = rand::rng().random_range(self.config.people_page_range.clone());
            let people = self.movies.popular_people(page).await?;

            let candidates: Vec<PersonSummary> = people
                .into_iter()
                .filter(|p| {
                    let id = p.id.to_string();
                    !used.contains(&id)
                        && !room.used_subjects.contains(&id)
                        && !rejected.contains(&id)
                })
                .collect();

            let pick = candidates.choose(&mut rand::rng()).cloned();
            if pick.is_some() {
                return Ok(pick);
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    fn url(path: &str) -> String {
        format!("https://img{}", path)
    }

    #[test]
    fn test_catalog_is_distinct_sorted_and_needs_posters() {
        let mut no_poster = credit("Alpha", 5.0, 10);
        no_poster.poster_path = None;
        let credits = vec![
            credit("Zeta", 5.0, 10),
            credit("Beta", 5.0, 10),
            credit("Zeta", 6.0, 300),
            no_poster,
        ];

        let titles: Vec<String> = build_catalog(&credits, url)
            .into_iter()
            .map(|m| m.title)
            .collect();
        assert_eq!(titles, vec!["Beta", "Zeta"]);
    }

    #[test]
    fn test_top_rated_filters_and_keeps_provider_order_on_ties() {
        let credits = vec![
            credit("Popular", 7.0, 201),
            credit("Obscure", 9.9, 200),
            credit("First", 8.0, 500),
            credit("Second", 8.0, 500),
            credit("Best", 9.0, 1000),
        ];

        let top = top_rated(&credits, 200, 3, url);
        let titles: Vec<&str> = top.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, vec!["Best", "First", "Second"]);
        assert_eq!(top[0].poster, "https://img/best.jpg");
    }

    #[tokio::test]
    async fn test_draw_skips_ledger_subjects() {
        let state = test_state();
        for id in 1..=5 {
            state
                .ledger
                .record_use(GameType::Movies, &id.to_string())
                .await
                .unwrap();
        }
        let room = Room::new(
            "ROOMA".into(),
            GameType::Movies,
            10,
            Player {
                id: "c1".into(),
                name: "Ana".into(),
                score: 0,
            },
        );

        let (subject, key, prompt) = state.draw_movie_round(&room).await.unwrap();
        assert_eq!(subject, "6");
        assert_eq!(key.correct_answers(), vec!["X", "Y", "Z", "Q", "W"]);
        assert_eq!(prompt.subject_name(), "Actor 6");
        assert!(prompt.options().contains(&"Flop"));
    }

    #[tokio::test]
    async fn test_thin_filmography_is_never_offered() {
        let movies = FakeMovies {
            credits: vec![credit("X", 9.0, 900), credit("Y", 8.0, 900)],
            ..FakeMovies::default()
        };
        let state = state_with(test_config(), movies, FakeFootball::default());
        let room = Room::new(
            "ROOMA".into(),
            GameType::Movies,
            10,
            Player {
                id: "c1".into(),
                name: "Ana".into(),
                score: 0,
            },
        );

        let result = state.draw_movie_round(&room).await;
        assert!(matches!(result, Err(GameError::NoSubjectsAvailable(_))));
        // Rejected actors are not held back from other rooms
        assert!(state.ledger.list_used(GameType::Movies).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_draws_pick_different_actors() {
        let movies = FakeMovies {
            people: (1..=2)
                .map(|id| PersonSummary {
                    id,
                    name: format!("Actor {}", id),
                })
                .collect(),
            ..FakeMovies::default()
        };
        let state = state_with(test_config(), movies, FakeFootball::default());
        let room_a = Room::new(
            "ROOMA".into(),
            GameType::Movies,
            10,
            Player {
                id: "c1".into(),
                name: "Ana".into(),
                score: 0,
            },
        );
        let mut room_b = room_a.clone();
        room_b.code = "ROOMB".into();

        let (a, b) = tokio::join!(
            state.draw_movie_round(&room_a),
            state.draw_movie_round(&room_b)
        );
        let (subject_a, _, _) = a.unwrap();
        let (subject_b, _, _) = b.unwrap();
        assert_ne!(subject_a, subject_b);

        let used = state.ledger.list_used(GameType::Movies).await.unwrap();
        assert!(used.contains(&subject_a) && used.contains(&subject_b));
    }
}
