//! Aggregations over the games collection for the dashboard screen.

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::{
    error::ApiError,
    models::{Game, Item},
    resource::ResourceApi,
    session::SessionGuard,
};

/// Number of entries in the top-rated list.
pub const DEFAULT_TOP_N: usize = 5;

/// Games released before this year are left out of the histogram.
const EARLIEST_YEAR: i64 = 1970;

/// Games per release year, as parallel ascending sequences.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct YearHistogram {
    /// Distinct release years, ascending.
    pub years: Vec<i64>,
    /// Number of games for the year at the same index.
    pub counts: Vec<u64>,
}

impl YearHistogram {
    /// `(year, count)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (i64, u64)> + '_ {
        self.years.iter().copied().zip(self.counts.iter().copied())
    }

    /// Whether no year qualified.
    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }
}

/// Count games per release year, ignoring unknown or pre-1971 years.
pub fn count_by_year(games: &[Game]) -> YearHistogram {
    let mut buckets = BTreeMap::<i64, u64>::new();
    for game in games.iter().filter(|game| game.released > EARLIEST_YEAR) {
        *buckets.entry(game.released).or_default() += 1;
    }
    let (years, counts) = buckets.into_iter().unzip();
    YearHistogram { years, counts }
}

/// The `n` best scored games, highest first. Ties keep input order and
/// unscored games are left out.
pub fn top_rated(games: &[Game], n: usize) -> Vec<Game> {
    let mut ranked = games
        .iter()
        .filter(|game| game.score > 0.0)
        .cloned()
        .collect::<Vec<_>>();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked.truncate(n);
    ranked
}

/// Everything the dashboard screen shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardSummary {
    /// Size of the games collection.
    pub total_games: usize,
    /// Games per release year.
    pub by_year: YearHistogram,
    /// Best scored games.
    pub top_games: Vec<Game>,
}

impl DashboardSummary {
    /// Summarise a list of games.
    pub fn from_games(games: &[Game]) -> Self {
        Self {
            total_games: games.len(),
            by_year: count_by_year(games),
            top_games: top_rated(games, DEFAULT_TOP_N),
        }
    }

    /// Parse raw items. Every item counts toward the total; one that cannot
    /// be read as a game is left out of the histogram and the ranking.
    pub fn from_items(items: &[Item]) -> Self {
        let games = items
            .iter()
            .filter_map(|item| match Game::from_item(item) {
                Ok(game) => Some(game),
                Err(err) => {
                    warn!(%err, "skipping unparseable game");
                    None
                }
            })
            .collect::<Vec<_>>();
        Self {
            total_games: items.len(),
            ..Self::from_games(&games)
        }
    }
}

/// Outcome of the latest dashboard load.
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardState {
    /// Not loaded yet.
    Idle,
    /// Request in flight.
    Loading,
    /// Summary available.
    Ready(DashboardSummary),
    /// Load failed with a user-facing message.
    Error(String),
    /// The token was rejected and the session cleared.
    LoggedOut,
}

/// Loads the games collection and summarises it.
pub struct DashboardController<A> {
    api: A,
    session: SessionGuard,
    state: DashboardState,
}

impl<A: ResourceApi> DashboardController<A> {
    /// Controller over a games API.
    pub fn new(api: A, session: SessionGuard) -> Self {
        Self {
            api,
            session,
            state: DashboardState::Idle,
        }
    }

    /// Underlying API.
    pub fn api(&self) -> &A {
        &self.api
    }

    /// Current state.
    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    /// Summary from the last successful load.
    pub fn summary(&self) -> Option<&DashboardSummary> {
        match &self.state {
            DashboardState::Ready(summary) => Some(summary),
            _ => None,
        }
    }

    /// Mark a load as in flight.
    pub fn begin_load(&mut self) {
        self.state = DashboardState::Loading;
    }

    /// Fetch games and rebuild the summary.
    pub async fn refresh(&mut self) {
        self.begin_load();
        let result = self.api.list().await;
        self.apply_list(result);
    }

    /// Apply the outcome of a `list()` call.
    pub fn apply_list(&mut self, result: Result<Vec<Item>, ApiError>) {
        self.state = match result {
            Ok(items) => {
                let summary = DashboardSummary::from_items(&items);
                info!(games = summary.total_games, "dashboard refreshed");
                DashboardState::Ready(summary)
            }
            Err(ApiError::AuthExpired) => {
                self.session.expire();
                DashboardState::LoggedOut
            }
            Err(err) => {
                warn!(%err, "dashboard load failed");
                DashboardState::Error(format!("Failed to load dashboard: {err}"))
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::Action,
        models::{ItemId, ResourceKind},
        session::MemoryTokenStore,
    };
    use serde_json::json;

    fn game(name: &str, released: i64, score: f64) -> Game {
        Game {
            name: name.to_string(),
            released,
            score,
            ..Game::default()
        }
    }

    #[test]
    fn top_rated_orders_by_score() {
        let games = [game("A", 2000, 80.0), game("B", 2001, 95.0), game("C", 2002, 0.0)];
        let top = top_rated(&games, 5);
        let names = top.iter().map(|g| g.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, ["B", "A"]);
    }

    #[test]
    fn top_rated_is_stable_and_truncates() {
        let games = [
            game("first", 2000, 70.0),
            game("second", 2000, 70.0),
            game("best", 2000, 90.0),
        ];
        let top = top_rated(&games, 2);
        let names = top.iter().map(|g| g.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, ["best", "first"]);
        assert!(top_rated(&games, 0).is_empty());
    }

    #[test]
    fn count_by_year_groups_ascending() {
        let games = [
            game("A", 2001, 1.0),
            game("B", 1999, 1.0),
            game("C", 1999, 1.0),
            game("D", 1970, 1.0),
            game("E", 0, 1.0),
        ];
        let histogram = count_by_year(&games);
        assert_eq!(histogram.years, [1999, 2001]);
        assert_eq!(histogram.counts, [2, 1]);
        assert_eq!(histogram.iter().collect::<Vec<_>>(), [(1999, 2), (2001, 1)]);
        assert!(count_by_year(&[]).is_empty());
    }

    #[test]
    fn top_rated_drops_unscored_and_keeps_n() {
        let games = [
            game("eighty", 2000, 80.0),
            game("ninety-five", 2000, 95.0),
            game("zero", 2000, 0.0),
            game("sixty", 2000, 60.0),
        ];
        let scores = top_rated(&games, 2)
            .iter()
            .map(|g| g.score)
            .collect::<Vec<_>>();
        assert_eq!(scores, [95.0, 80.0]);
    }

    #[test]
    fn summary_keeps_games_with_one_bad_field() {
        let items = [
            json!({"id_game": 1, "name": "Doom", "released": 1993, "score": 90}),
            json!({"id_game": 2, "name": "Quake", "released": "TBA", "score": 95}),
            json!({"id_game": 3, "name": "Heretic", "released": 1994, "score": "N/A"}),
        ]
        .into_iter()
        .filter_map(Item::from_value)
        .collect::<Vec<_>>();
        let summary = DashboardSummary::from_items(&items);
        assert_eq!(summary.total_games, 3);
        assert_eq!(summary.by_year.years, [1993, 1994]);
        assert_eq!(summary.by_year.counts, [1, 1]);
        let top = summary
            .top_games
            .iter()
            .map(|g| g.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(top, ["Quake", "Doom"]);
        assert_eq!(summary.top_games[1].id, Some(ItemId::from(1)));
    }

    #[derive(Clone)]
    struct StaticGames(Result<Vec<Item>, Option<Action>>);

    impl ResourceApi for StaticGames {
        fn kind(&self) -> ResourceKind {
            ResourceKind::Games
        }

        async fn list(&self) -> Result<Vec<Item>, ApiError> {
            match &self.0 {
                Ok(items) => Ok(items.clone()),
                Err(Some(action)) => Err(ApiError::failed(*action, "server responded with 500")),
                Err(None) => Err(ApiError::AuthExpired),
            }
        }

        async fn create(&self, _item: &Item) -> Result<Option<Item>, ApiError> {
            Ok(None)
        }

        async fn update(&self, _id: &ItemId, _patch: &Item) -> Result<(), ApiError> {
            Ok(())
        }

        async fn delete(&self, _id: &ItemId) -> Result<(), ApiError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn controller_builds_summary() {
        let items = vec![Item::new()
            .with("id_game", 1)
            .with("name", "Doom")
            .with("released", 1993)
            .with("score", 9.5)];
        let session = SessionGuard::restore(MemoryTokenStore::with_token("t"));
        let mut controller = DashboardController::new(StaticGames(Ok(items)), session);
        controller.refresh().await;
        let summary = controller.summary().expect("summary");
        assert_eq!(summary.total_games, 1);
        assert_eq!(summary.top_games[0].name, "Doom");
    }

    #[tokio::test]
    async fn controller_reports_failures() {
        let session = SessionGuard::restore(MemoryTokenStore::with_token("t"));
        let mut failing =
            DashboardController::new(StaticGames(Err(Some(Action::List))), session.clone());
        failing.refresh().await;
        assert!(matches!(failing.state(), DashboardState::Error(_)));
        assert!(session.is_authenticated());

        let mut expired = DashboardController::new(StaticGames(Err(None)), session.clone());
        expired.refresh().await;
        assert_eq!(expired.state(), &DashboardState::LoggedOut);
        assert!(!session.is_authenticated());
    }
}
