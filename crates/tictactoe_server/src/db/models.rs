//! Database rows and their conversion to engine types.

use chrono::{NaiveDate, NaiveDateTime};
use derive_getters::Getters;
use derive_new::new;
use diesel::prelude::*;
use tictactoe_engine::{
    Board, Game, GameStatus, HistoryEntry, Outcome, PlayerStats, ScoreResult, Termination, UserId,
};
use tracing::instrument;

use crate::db::{DbError, schema};

/// User profile row.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Getters)]
#[diesel(table_name = schema::users)]
pub struct User {
    id: i32,
    name: String,
    email: Option<String>,
    wins: i32,
    ties: i32,
    losses: i32,
    matches_played: i32,
    created_at: NaiveDateTime,
}

impl User {
    /// Counters as engine stats.
    pub fn stats(&self) -> PlayerStats {
        PlayerStats::new(self.wins, self.ties, self.losses, self.matches_played)
    }

    /// Ranking points.
    pub fn score(&self) -> i32 {
        self.stats().score()
    }
}

/// Insertable user for registration.
#[derive(Debug, Clone, Insertable, new)]
#[diesel(table_name = schema::users)]
pub struct NewUser {
    name: String,
    email: Option<String>,
}

/// Stored game row. Board and history are JSON text.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Getters)]
#[diesel(table_name = schema::games)]
pub struct GameRow {
    id: i32,
    dimension: i32,
    board: String,
    player_x: i32,
    player_o: i32,
    has_to_move: i32,
    history: String,
    game_over: bool,
    winner: Option<i32>,
    loser: Option<i32>,
    tie: bool,
    version: i32,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl GameRow {
    /// Decodes the row into a game with its storage id and version.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the board or history JSON is corrupt or the
    /// terminal flags are inconsistent.
    #[instrument(skip(self), fields(game_id = self.id))]
    pub fn into_stored(self) -> Result<StoredGame, DbError> {
        let board: Board = serde_json::from_str(&self.board)?;
        if i32::try_from(board.dimension()).ok() != Some(self.dimension) {
            return Err(DbError::other(format!(
                "Game {} board does not match dimension {}",
                self.id, self.dimension
            )));
        }
        let history: Vec<HistoryEntry> = serde_json::from_str(&self.history)?;
        let status = match (self.game_over, self.winner, self.tie) {
            (false, None, false) => GameStatus::InProgress,
            (true, Some(winner), false) => GameStatus::Finished(Outcome::WonBy(winner)),
            (true, None, true) => GameStatus::Finished(Outcome::Tied),
            _ => {
                return Err(DbError::other(format!(
                    "Game {} has inconsistent terminal flags",
                    self.id
                )));
            }
        };
        let game = Game::restore(
            board,
            self.player_x,
            self.player_o,
            self.has_to_move,
            history,
            status,
        );
        Ok(StoredGame {
            id: self.id,
            version: self.version,
            game,
        })
    }
}

/// A game with the storage id and the version it was read at.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct StoredGame {
    id: i32,
    version: i32,
    game: Game,
}

impl StoredGame {
    /// Public key used by callers to address this game.
    pub fn key(&self) -> String {
        self.id.to_string()
    }

    /// Replaces the game state, keeping id and read version.
    pub fn with_game(self, game: Game) -> Self {
        Self { game, ..self }
    }
}

/// Columns written for a game, both on insert and on update.
#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = schema::games)]
#[diesel(treat_none_as_null = true)]
pub struct GameRecord {
    dimension: i32,
    board: String,
    player_x: i32,
    player_o: i32,
    has_to_move: i32,
    history: String,
    game_over: bool,
    winner: Option<i32>,
    loser: Option<i32>,
    tie: bool,
}

impl GameRecord {
    /// Encodes a game for storage.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if encoding fails.
    #[instrument(skip(game))]
    pub fn encode(game: &Game) -> Result<Self, DbError> {
        let dimension = i32::try_from(game.dimension())
            .map_err(|_| DbError::other(format!("Dimension {} too large", game.dimension())))?;
        Ok(Self {
            dimension,
            board: serde_json::to_string(game.board())?,
            player_x: game.player_x(),
            player_o: game.player_o(),
            has_to_move: game.has_to_move(),
            history: serde_json::to_string(game.history())?,
            game_over: game.is_over(),
            winner: game.winner(),
            loser: game.loser(),
            tie: game.is_tie(),
        })
    }
}

/// Finished-game score row.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Getters)]
#[diesel(table_name = schema::scores)]
pub struct Score {
    id: i32,
    played_on: NaiveDate,
    player_x: i32,
    player_o: i32,
    result: String,
}

impl Score {
    /// Parses the stored result tag.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the tag is not a known result.
    #[instrument(skip(self), fields(result = %self.result))]
    pub fn parse_result(&self) -> Result<ScoreResult, DbError> {
        self.result
            .parse()
            .map_err(|_| DbError::other(format!("Invalid score result: '{}'", self.result)))
    }
}

/// Insertable score record.
#[derive(Debug, Clone, Insertable, new, Getters)]
#[diesel(table_name = schema::scores)]
pub struct NewScore {
    played_on: NaiveDate,
    player_x: i32,
    player_o: i32,
    result: String,
}

/// Everything written when a game finishes, committed in one transaction.
///
/// Counters are increments applied to the stored values, not new totals.
#[derive(Debug, Clone)]
pub struct FinishedGame {
    /// Game in its terminal state, with the version it was read at.
    pub game: StoredGame,
    /// Seat X's id and counter increments.
    pub player_x: (UserId, PlayerStats),
    /// Seat O's id and counter increments.
    pub player_o: (UserId, PlayerStats),
    /// Score record to append.
    pub score: NewScore,
}

impl FinishedGame {
    /// Builds the batch for `game`, which ended as `termination` on `played_on`.
    pub fn new(game: StoredGame, termination: &Termination, played_on: NaiveDate) -> Self {
        let (x, o) = termination.settle(PlayerStats::default(), PlayerStats::default());
        Self {
            game,
            player_x: (termination.player_x, x),
            player_o: (termination.player_o, o),
            score: NewScore::new(
                played_on,
                termination.player_x,
                termination.player_o,
                termination.result.to_string(),
            ),
        }
    }
}
