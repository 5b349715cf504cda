//! Round grading and win detection.

use crate::config::ServerConfig;
use crate::types::{ConnectionId, GameType, Player};
use std::collections::HashSet;

pub const POINTS_PER_HIT: u32 = 2;

/// What happens after a normal round has been scored
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundOutcome {
    /// Nobody reached the target
    Continue,
    Winner(ConnectionId),
    /// Several players share the maximum at or above the target
    SuddenDeath(Vec<ConnectionId>),
}

/// Trim picks, drop blanks and repeats, keep submission order
pub fn sanitize_selection(selection: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    selection
        .into_iter()
        .map(|pick| pick.trim().to_string())
        .filter(|pick| !pick.is_empty() && seen.insert(pick.clone()))
        .collect()
}

pub fn count_hits(selection: &[String], answers: &[&str]) -> usize {
    selection
        .iter()
        .filter(|pick| answers.contains(&pick.as_str()))
        .count()
}

/// Points awarded for a normal round. Only a perfect movie round earns the bonus.
pub fn round_points(game_type: GameType, hits: usize, config: &ServerConfig) -> u32 {
    let base = hits as u32 * POINTS_PER_HIT;
    match game_type {
        GameType::Movies if hits == config.top_n => base + config.perfect_bonus,
        _ => base,
    }
}

pub fn decide_outcome(players: &[Player], target_score: u32) -> RoundOutcome {
    let Some(max) = players.iter().map(|p| p.score).max() else {
        return RoundOutcome::Continue;
    };
    if max < target_score {
        return RoundOutcome::Continue;
    }

    let mut leaders: Vec<ConnectionId> = players
        .iter()
        .filter(|p| p.score == max)
        .map(|p| p.id.clone())
        .collect();

    if leaders.len() == 1 {
        RoundOutcome::Winner(leaders.remove(0))
    } else {
        RoundOutcome::SuddenDeath(leaders)
    }
}

/// Indices of the entries with the most hits; ties share the win
pub fn best_by_hits(hits: &[usize]) -> Vec<usize> {
    let Some(&max) = hits.iter().max() else {
        return Vec::new();
    };
    hits.iter()
        .enumerate()
        .filter(|(_, h)| **h == max)
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(id: &str, score: u32) -> Player {
        Player {
            id: id.to_string(),
            name: id.to_uppercase(),
            score,
        }
    }

    fn picks(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_sanitize_selection() {
        let clean = sanitize_selection(picks(&[" X ", "Y", "X", "", "  "]));
        assert_eq!(clean, picks(&["X", "Y"]));
    }

    #[test]
    fn test_count_hits_is_exact_match() {
        let answers = ["X", "Y", "Z", "Q", "W"];
        assert_eq!(count_hits(&picks(&["X", "y", "Nope", "W"]), &answers), 2);
    }

    #[test]
    fn test_perfect_bonus_only_for_movies() {
        let config = ServerConfig::default();
        assert_eq!(round_points(GameType::Movies, 5, &config), 15);
        assert_eq!(round_points(GameType::Movies, 4, &config), 8);
        assert_eq!(round_points(GameType::Clubs, 5, &config), 10);
        assert_eq!(round_points(GameType::Clubs, 0, &config), 0);
    }

    #[test]
    fn test_decide_outcome() {
        assert_eq!(
            decide_outcome(&[player("a", 8), player("b", 9)], 10),
            RoundOutcome::Continue
        );
        assert_eq!(
            decide_outcome(&[player("a", 15), player("b", 4)], 10),
            RoundOutcome::Winner("a".to_string())
        );
        assert_eq!(
            decide_outcome(&[player("a", 12), player("b", 12), player("c", 11)], 10),
            RoundOutcome::SuddenDeath(vec!["a".to_string(), "b".to_string()])
        );
        // Only the maximum matters, not everyone above the target
        assert_eq!(
            decide_outcome(&[player("a", 14), player("b", 12)], 10),
            RoundOutcome::Winner("a".to_string())
        );
    }

    #[test]
    fn test_best_by_hits() {
        assert_eq!(best_by_hits(&[2, 4, 1]), vec![1]);
        assert_eq!(best_by_hits(&[3, 3]), vec![0, 1]);
        assert!(best_by_hits(&[]).is_empty());
    }
}
