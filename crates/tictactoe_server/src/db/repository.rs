//! Repositories for users, games and scores, with a SQLite implementation.

use chrono::Utc;
use diesel::prelude::*;
use tictactoe_engine::{Game, GamePolicy, PlayerStats, UserId};
use tracing::{debug, error, info, instrument, warn};

use crate::db::{
    DbError, DbErrorKind, FinishedGame, GameRecord, GameRow, NewUser, Score, StoredGame, User,
    schema,
};

/// How long a connection waits on another writer's lock.
const BUSY_TIMEOUT_MS: u32 = 5_000;

/// Lookup and registration of users.
pub trait UserRepository {
    /// Registers a user. Names are unique.
    ///
    /// # Errors
    ///
    /// Returns a `UniqueViolation` [`DbError`] if the name is taken.
    fn create_user(&self, name: String, email: Option<String>) -> Result<User, DbError>;

    /// Gets a user by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    fn find_user(&self, id: UserId) -> Result<Option<User>, DbError>;

    /// Gets a user by exact name.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    fn find_user_by_name(&self, name: &str) -> Result<Option<User>, DbError>;

    /// Lists all users in registration order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    fn list_users(&self) -> Result<Vec<User>, DbError>;
}

/// Persistence of games and the score ledger.
pub trait GameRepository {
    /// Stores a new game at version 0.
    ///
    /// The active game cap in `policy` is checked for both seats in the same
    /// write transaction as the insert.
    ///
    /// # Errors
    ///
    /// Returns a `LimitReached` [`DbError`] if either player is at the cap, or
    /// [`DbError`] if a database error occurs.
    fn insert_game(&self, game: &Game, policy: &GamePolicy) -> Result<StoredGame, DbError>;

    /// Gets a game by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the row is corrupt or a database error occurs.
    fn find_game(&self, id: i32) -> Result<Option<StoredGame>, DbError>;

    /// Writes an updated game if its stored version still matches.
    ///
    /// # Errors
    ///
    /// Returns a `Conflict` [`DbError`] when the version moved and
    /// `NotFound` when the game is gone.
    fn save_game(&self, game: &StoredGame) -> Result<StoredGame, DbError>;

    /// Deletes an in-progress game if its stored version still matches.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` when the game changed or finished since it was read
    /// and `NotFound` when it is gone.
    fn delete_game(&self, game: &StoredGame) -> Result<(), DbError>;

    /// Games in progress where `user` holds either seat, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    fn active_games_for(&self, user: UserId) -> Result<Vec<StoredGame>, DbError>;

    /// Number of games in progress for `user`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    fn count_active_games(&self, user: UserId) -> Result<usize, DbError>;

    /// Users holding a seat in at least one game in progress, by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    fn users_with_active_games(&self) -> Result<Vec<User>, DbError>;

    /// Writes a terminal game, adds the counter increments to both users and
    /// appends the score record in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] and writes nothing if any part fails, including a
    /// version conflict on the game.
    fn commit_finished_game(&self, finished: &FinishedGame) -> Result<StoredGame, DbError>;

    /// All score records in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    fn list_scores(&self) -> Result<Vec<Score>, DbError>;

    /// Score records where `user` held either seat.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    fn scores_for(&self, user: UserId) -> Result<Vec<Score>, DbError>;
}

/// Everything the service layer needs from storage.
pub trait LeagueStore: UserRepository + GameRepository + Clone + Send + Sync + 'static {}

impl<T> LeagueStore for T where T: UserRepository + GameRepository + Clone + Send + Sync + 'static {}

/// SQLite-backed repository opening one connection per call.
#[derive(Debug, Clone)]
pub struct SqliteRepository {
    db_path: String,
}

impl SqliteRepository {
    /// Creates a repository for the database at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the path is empty.
    #[instrument(skip(db_path), fields(db_path = %db_path))]
    pub fn new(db_path: String) -> Result<Self, DbError> {
        if db_path.trim().is_empty() {
            return Err(DbError::other("Database path is empty"));
        }
        info!(path = %db_path, "Creating SqliteRepository");
        Ok(Self { db_path })
    }

    /// Path of the database file.
    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    /// Establishes a database connection.
    #[instrument(skip(self))]
    fn connection(&self) -> Result<SqliteConnection, DbError> {
        debug!(path = %self.db_path, "Establishing connection");
        let mut conn = SqliteConnection::establish(&self.db_path).map_err(|e| {
            DbError::other(format!("Failed to connect to '{}': {}", self.db_path, e))
        })?;
        // Writers wait for each other instead of failing with SQLITE_BUSY.
        diesel::sql_query(format!("PRAGMA busy_timeout = {}", BUSY_TIMEOUT_MS)).execute(&mut conn)?;
        Ok(conn)
    }

    /// Distinguishes a vanished game from one whose version moved.
    fn missing_or_conflict(conn: &mut SqliteConnection, id: i32) -> DbError {
        let exists = schema::games::table
            .find(id)
            .select(schema::games::id)
            .first::<i32>(conn)
            .optional();
        match exists {
            Ok(Some(_)) => DbError::conflict(format!("Game {} changed since it was read", id)),
            Ok(None) => DbError::not_found(format!("Game {} not found", id)),
            Err(e) => e.into(),
        }
    }

    fn write_game(conn: &mut SqliteConnection, game: &StoredGame) -> Result<StoredGame, DbError> {
        let record = GameRecord::encode(game.game())?;
        let id = *game.id();
        let version = *game.version();
        let updated = diesel::update(
            schema::games::table
                .filter(schema::games::id.eq(id))
                .filter(schema::games::version.eq(version)),
        )
        .set((
            &record,
            schema::games::version.eq(version + 1),
            schema::games::updated_at.eq(Utc::now().naive_utc()),
        ))
        .returning(GameRow::as_returning())
        .get_result::<GameRow>(conn)
        .optional()?;

        match updated {
            Some(row) => row.into_stored(),
            None => {
                warn!(game_id = id, version, "Game write rejected");
                Err(Self::missing_or_conflict(conn, id))
            }
        }
    }

    fn write_stats(
        conn: &mut SqliteConnection,
        (user, stats): (UserId, PlayerStats),
    ) -> Result<(), DbError> {
        use schema::users::dsl::{losses, matches_played, ties, wins};

        let updated = diesel::update(schema::users::table.find(user))
            .set((
                wins.eq(wins + stats.wins),
                ties.eq(ties + stats.ties),
                losses.eq(losses + stats.losses),
                matches_played.eq(matches_played + stats.matches_played),
            ))
            .execute(conn)?;
        if updated == 0 {
            return Err(DbError::other(format!("User {} vanished before stats update", user)));
        }
        Ok(())
    }

    fn count_active(conn: &mut SqliteConnection, user: UserId) -> Result<usize, DbError> {
        let count: i64 = Self::active_games_query(user).count().get_result(conn)?;
        usize::try_from(count).map_err(|_| DbError::other(format!("Invalid game count {}", count)))
    }

    fn active_games_query(
        user: UserId,
    ) -> schema::games::BoxedQuery<'static, diesel::sqlite::Sqlite> {
        schema::games::table
            .filter(schema::games::game_over.eq(false))
            .filter(
                schema::games::player_x
                    .eq(user)
                    .or(schema::games::player_o.eq(user)),
            )
            .into_boxed()
    }
}

impl UserRepository for SqliteRepository {
    #[instrument(skip(self, email))]
    fn create_user(&self, name: String, email: Option<String>) -> Result<User, DbError> {
        debug!(name = %name, "Creating user");
        let mut conn = self.connection()?;

        let user = diesel::insert_into(schema::users::table)
            .values(&NewUser::new(name, email))
            .returning(User::as_returning())
            .get_result(&mut conn)?;

        info!(user_id = user.id(), name = %user.name(), "User created");
        Ok(user)
    }

    #[instrument(skip(self))]
    fn find_user(&self, id: UserId) -> Result<Option<User>, DbError> {
        let mut conn = self.connection()?;
        let user = schema::users::table
            .find(id)
            .select(User::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(user)
    }

    #[instrument(skip(self))]
    fn find_user_by_name(&self, name: &str) -> Result<Option<User>, DbError> {
        debug!(name = %name, "Looking up user by name");
        let mut conn = self.connection()?;

        let user = schema::users::table
            .filter(schema::users::name.eq(name))
            .select(User::as_select())
            .first(&mut conn)
            .optional()?;

        if let Some(ref u) = user {
            debug!(user_id = u.id(), "User found");
        } else {
            debug!("User not found");
        }

        Ok(user)
    }

    #[instrument(skip(self))]
    fn list_users(&self) -> Result<Vec<User>, DbError> {
        debug!("Listing all users");
        let mut conn = self.connection()?;

        let users = schema::users::table
            .order(schema::users::id.asc())
            .select(User::as_select())
            .load(&mut conn)?;

        info!(count = users.len(), "Users loaded");
        Ok(users)
    }
}

impl GameRepository for SqliteRepository {
    #[instrument(skip(self, game), fields(player_x = game.player_x(), player_o = game.player_o()))]
    fn insert_game(&self, game: &Game, policy: &GamePolicy) -> Result<StoredGame, DbError> {
        let mut conn = self.connection()?;
        let record = GameRecord::encode(game)?;

        let row = conn.immediate_transaction::<_, DbError, _>(|conn| {
            if policy.max_active_games.is_some() {
                for user in [game.player_x(), game.player_o()] {
                    let active = Self::count_active(conn, user)?;
                    policy
                        .check_active_games(user, active)
                        .map_err(|e| DbError::new(DbErrorKind::LimitReached, e.to_string()))?;
                }
            }
            let row = diesel::insert_into(schema::games::table)
                .values(&record)
                .returning(GameRow::as_returning())
                .get_result(conn)?;
            Ok(row)
        })?;

        info!(game_id = row.id(), "Game stored");
        row.into_stored()
    }

    #[instrument(skip(self))]
    fn find_game(&self, id: i32) -> Result<Option<StoredGame>, DbError> {
        debug!(game_id = id, "Loading game");
        let mut conn = self.connection()?;

        schema::games::table
            .find(id)
            .select(GameRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(GameRow::into_stored)
            .transpose()
    }

    #[instrument(skip(self, game), fields(game_id = game.id(), version = game.version()))]
    fn save_game(&self, game: &StoredGame) -> Result<StoredGame, DbError> {
        let mut conn = self.connection()?;
        let saved = Self::write_game(&mut conn, game)?;
        debug!(new_version = saved.version(), "Game saved");
        Ok(saved)
    }

    #[instrument(skip(self, game), fields(game_id = game.id(), version = game.version()))]
    fn delete_game(&self, game: &StoredGame) -> Result<(), DbError> {
        let mut conn = self.connection()?;
        let id = *game.id();

        let deleted = diesel::delete(
            schema::games::table
                .filter(schema::games::id.eq(id))
                .filter(schema::games::version.eq(*game.version()))
                .filter(schema::games::game_over.eq(false)),
        )
        .execute(&mut conn)?;

        if deleted == 0 {
            warn!(game_id = id, "Game delete rejected");
            return Err(Self::missing_or_conflict(&mut conn, id));
        }
        info!(game_id = id, "Game deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    fn active_games_for(&self, user: UserId) -> Result<Vec<StoredGame>, DbError> {
        let mut conn = self.connection()?;

        let rows = Self::active_games_query(user)
            .order(schema::games::id.asc())
            .select(GameRow::as_select())
            .load(&mut conn)?;

        debug!(user, count = rows.len(), "Active games loaded");
        rows.into_iter().map(GameRow::into_stored).collect()
    }

    #[instrument(skip(self))]
    fn count_active_games(&self, user: UserId) -> Result<usize, DbError> {
        let mut conn = self.connection()?;
        Self::count_active(&mut conn, user)
    }

    #[instrument(skip(self))]
    fn users_with_active_games(&self) -> Result<Vec<User>, DbError> {
        let mut conn = self.connection()?;
        let open = || schema::games::table.filter(schema::games::game_over.eq(false));

        let users = schema::users::table
            .filter(
                schema::users::id
                    .eq_any(open().select(schema::games::player_x))
                    .or(schema::users::id.eq_any(open().select(schema::games::player_o))),
            )
            .order(schema::users::id.asc())
            .select(User::as_select())
            .load(&mut conn)?;

        debug!(count = users.len(), "Users with active games loaded");
        Ok(users)
    }

    #[instrument(skip(self, finished), fields(game_id = finished.game.id(), result = %finished.score.result()))]
    fn commit_finished_game(&self, finished: &FinishedGame) -> Result<StoredGame, DbError> {
        let mut conn = self.connection()?;

        let saved = conn
            .immediate_transaction::<_, DbError, _>(|conn| {
                let saved = Self::write_game(conn, &finished.game)?;
                Self::write_stats(conn, finished.player_x)?;
                Self::write_stats(conn, finished.player_o)?;
                diesel::insert_into(schema::scores::table)
                    .values(&finished.score)
                    .execute(conn)?;
                Ok(saved)
            })
            .inspect_err(|e| error!(error = %e, "Finished game rolled back"))?;

        info!(new_version = saved.version(), "Finished game committed");
        Ok(saved)
    }

    #[instrument(skip(self))]
    fn list_scores(&self) -> Result<Vec<Score>, DbError> {
        let mut conn = self.connection()?;
        let scores = schema::scores::table
            .order(schema::scores::id.asc())
            .select(Score::as_select())
            .load(&mut conn)?;
        debug!(count = scores.len(), "Scores loaded");
        Ok(scores)
    }

    #[instrument(skip(self))]
    fn scores_for(&self, user: UserId) -> Result<Vec<Score>, DbError> {
        let mut conn = self.connection()?;
        let scores = schema::scores::table
            .filter(
                schema::scores::player_x
                    .eq(user)
                    .or(schema::scores::player_o.eq(user)),
            )
            .order(schema::scores::id.asc())
            .select(Score::as_select())
            .load(&mut conn)?;
        debug!(user, count = scores.len(), "User scores loaded");
        Ok(scores)
    }
}
