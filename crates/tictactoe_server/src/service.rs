//! League operations: the stateless layer between callers and storage.

use std::collections::HashMap;

use chrono::Utc;
use tictactoe_engine::{Game, GamePolicy, MoveEffect, Termination, UserId, rank_by_score};
use tracing::{debug, info, instrument, warn};

use crate::db::{FinishedGame, Score, StoredGame, User};
use crate::db::{GameRepository, LeagueStore, UserRepository};
use crate::error::{ErrorKind, ServiceError, ServiceResult};
use crate::notify::{Digest, Notifier, Reminder, ReminderQueue};
use crate::views::{GameView, HistoryView, ScoreView, UserView, board_cells};

/// Service layer for league operations.
///
/// Holds no mutable state of its own; every call reads what it needs from
/// the store. Callers may clone it freely.
#[derive(Debug, Clone)]
pub struct LeagueService<S, Q> {
    store: S,
    reminders: Q,
    policy: GamePolicy,
}

impl<S: LeagueStore, Q: ReminderQueue> LeagueService<S, Q> {
    /// Creates a service over the given store and reminder queue.
    #[instrument(skip(store, reminders))]
    pub fn new(store: S, reminders: Q, policy: GamePolicy) -> Self {
        info!("Creating LeagueService");
        Self {
            store,
            reminders,
            policy,
        }
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Registers a user with a unique name.
    ///
    /// # Errors
    ///
    /// `InvalidName` for a blank name, `DuplicateUser` if the name is taken.
    #[instrument(skip(self, email))]
    pub fn create_user(&self, name: String, email: Option<String>) -> ServiceResult<UserView> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(ServiceError::new(ErrorKind::InvalidName, "User name must not be empty"));
        }
        if self.store.find_user_by_name(&name)?.is_some() {
            warn!(name = %name, "Duplicate user name");
            return Err(ServiceError::new(
                ErrorKind::DuplicateUser,
                format!("A user named '{}' already exists", name),
            ));
        }
        let email = email.map(|e| e.trim().to_string()).filter(|e| !e.is_empty());
        let user = self.store.create_user(name, email)?;
        info!(user_id = user.id(), "User registered");
        Ok(UserView::from(&user))
    }

    /// Starts a game between two registered users.
    ///
    /// # Errors
    ///
    /// `UserNotFound`, `InvalidDimension`, `SamePlayer` or
    /// `TooManyActiveGames` when the cap is enabled and reached.
    #[instrument(skip(self))]
    pub fn new_game(
        &self,
        player_x: &str,
        player_o: &str,
        dimension: Option<usize>,
    ) -> ServiceResult<GameView> {
        let x = self.require_user(player_x)?;
        let o = self.require_user(player_o)?;
        let dimension = self.policy.resolve_dimension(dimension)?;
        let game = Game::new(*x.id(), *o.id(), dimension)?;

        let stored = self.store.insert_game(&game, &self.policy)?;
        info!(game_key = %stored.key(), dimension, "Game started");
        Ok(self.game_view_with(&stored, &x, &o))
    }

    /// Applies `user_name`'s move at `cell` to the game at `game_key`.
    ///
    /// Negative cells are reported as `InvalidMove` after the turn check, like
    /// any other index off the board.
    ///
    /// # Errors
    ///
    /// `InvalidKey`, `GameNotFound`, `UserNotFound`, any rule violation, or
    /// `ConcurrentModification` if the game changed since it was read. A
    /// finished game is written together with both users' counters and the
    /// score record; on failure nothing is written.
    #[instrument(skip(self))]
    pub fn apply_move(&self, game_key: &str, user_name: &str, cell: i64) -> ServiceResult<GameView> {
        let stored = self.require_game(game_key)?;
        let user = self.require_user(user_name)?;

        let mut game = stored.game().clone();
        let effect = game.apply_move(*user.id(), usize::try_from(cell).unwrap_or(usize::MAX))?;
        let stored = stored.with_game(game);

        match effect {
            MoveEffect::Remind { recipient } => {
                let saved = self.store.save_game(&stored)?;
                self.remind(recipient, &saved);
                self.game_view(&saved)
            }
            MoveEffect::Finished(termination) => {
                let saved = self.finish(stored, termination)?;
                self.game_view(&saved)
            }
        }
    }

    /// Builds and commits the terminal batch for a finished game.
    #[instrument(skip(self, stored), fields(game_key = %stored.key(), result = %termination.result))]
    fn finish(&self, stored: StoredGame, termination: Termination) -> ServiceResult<StoredGame> {
        let finished = FinishedGame::new(stored, &termination, Utc::now().date_naive());
        let saved = self.store.commit_finished_game(&finished)?;
        info!(
            winner = ?termination.winner(),
            loser = ?termination.loser(),
            "Game finished"
        );
        Ok(saved)
    }

    /// Queues a reminder for the next mover. Failures are logged only.
    fn remind(&self, recipient: UserId, game: &StoredGame) {
        let user = match self.store.find_user(recipient) {
            Ok(Some(user)) => user,
            Ok(None) => {
                warn!(recipient, "Reminder recipient missing");
                return;
            }
            Err(e) => {
                warn!(error = %e, recipient, "Reminder recipient lookup failed");
                return;
            }
        };
        let reminder = Reminder::new(user.name().clone(), user.email().clone(), game.key());
        if let Err(e) = self.reminders.enqueue(reminder) {
            warn!(error = %e, recipient, "Reminder not queued");
        }
    }

    /// Deletes a game that is still in progress.
    ///
    /// # Errors
    ///
    /// `InvalidKey`, `GameNotFound`, `GameAlreadyOver`, or
    /// `ConcurrentModification` if a move landed since it was read.
    #[instrument(skip(self))]
    pub fn cancel_game(&self, game_key: &str) -> ServiceResult<()> {
        let stored = self.require_game(game_key)?;
        stored.game().ensure_cancellable()?;
        self.store.delete_game(&stored)?;
        info!(game_key, "Game cancelled");
        Ok(())
    }

    /// Gets a game's current state.
    ///
    /// # Errors
    ///
    /// `InvalidKey` or `GameNotFound`.
    #[instrument(skip(self))]
    pub fn get_game(&self, game_key: &str) -> ServiceResult<GameView> {
        let stored = self.require_game(game_key)?;
        self.game_view(&stored)
    }

    /// Gets a game's move history, including the win marker if any.
    ///
    /// # Errors
    ///
    /// `InvalidKey` or `GameNotFound`.
    #[instrument(skip(self))]
    pub fn get_game_history(&self, game_key: &str) -> ServiceResult<Vec<HistoryView>> {
        let stored = self.require_game(game_key)?;
        Ok(stored.game().history().iter().map(HistoryView::from).collect())
    }

    /// Games in progress where the user holds either seat.
    ///
    /// # Errors
    ///
    /// `UserNotFound`.
    #[instrument(skip(self))]
    pub fn get_user_games(&self, user_name: &str) -> ServiceResult<Vec<GameView>> {
        let user = self.require_user(user_name)?;
        let games = self.store.active_games_for(*user.id())?;
        debug!(count = games.len(), "Active games found");
        games.iter().map(|game| self.game_view(game)).collect()
    }

    /// Users who finished at least one game, best score first.
    ///
    /// Equal scores keep registration order.
    ///
    /// # Errors
    ///
    /// `Storage` on database failure.
    #[instrument(skip(self))]
    pub fn get_user_rankings(&self) -> ServiceResult<Vec<UserView>> {
        let users: Vec<User> = self
            .store
            .list_users()?
            .into_iter()
            .filter(|user| *user.matches_played() > 0)
            .collect();
        let ranked = rank_by_score(users, User::stats);
        Ok(ranked.iter().map(UserView::from).collect())
    }

    /// All score records.
    ///
    /// # Errors
    ///
    /// `Storage` on database failure.
    #[instrument(skip(self))]
    pub fn get_scores(&self) -> ServiceResult<Vec<ScoreView>> {
        let scores = self.store.list_scores()?;
        self.score_views(&scores)
    }

    /// Score records where the user held either seat.
    ///
    /// # Errors
    ///
    /// `UserNotFound`.
    #[instrument(skip(self))]
    pub fn get_user_scores(&self, user_name: &str) -> ServiceResult<Vec<ScoreView>> {
        let user = self.require_user(user_name)?;
        let scores = self.store.scores_for(*user.id())?;
        self.score_views(&scores)
    }

    /// Digests for every user with an email and at least one game in progress.
    ///
    /// # Errors
    ///
    /// `Storage` on database failure.
    #[instrument(skip(self))]
    pub fn collect_digests(&self) -> ServiceResult<Vec<Digest>> {
        let mut digests = Vec::new();
        for user in self.store.users_with_active_games()? {
            let Some(email) = user.email().clone() else {
                debug!(user_id = user.id(), "No email, skipping digest");
                continue;
            };
            let games = self.store.active_games_for(*user.id())?;
            if games.is_empty() {
                continue;
            }
            let keys = games.iter().map(StoredGame::key).collect();
            digests.push(Digest::new(user.name().clone(), email, keys));
        }
        info!(count = digests.len(), "Digests collected");
        Ok(digests)
    }

    /// Collects digests and hands each to `notifier`. Returns how many went out.
    ///
    /// # Errors
    ///
    /// `Storage` on database failure.
    #[instrument(skip(self, notifier))]
    pub fn send_digests<N: Notifier>(&self, notifier: &N) -> ServiceResult<usize> {
        let digests = self.collect_digests()?;
        for digest in &digests {
            notifier.send_digest(digest);
        }
        Ok(digests.len())
    }

    fn require_user(&self, name: &str) -> ServiceResult<User> {
        self.store
            .find_user_by_name(name)?
            .ok_or_else(|| ServiceError::user_not_found(name))
    }

    fn require_user_id(&self, id: UserId) -> ServiceResult<User> {
        self.store.find_user(id)?.ok_or_else(|| {
            ServiceError::new(ErrorKind::Storage, format!("User {} referenced by a game is missing", id))
        })
    }

    fn require_game(&self, game_key: &str) -> ServiceResult<StoredGame> {
        let id: i32 = game_key.trim().parse().map_err(|_| {
            ServiceError::new(ErrorKind::InvalidKey, format!("Malformed game key '{}'", game_key))
        })?;
        self.store
            .find_game(id)?
            .ok_or_else(|| ServiceError::game_not_found(game_key))
    }

    fn game_view(&self, stored: &StoredGame) -> ServiceResult<GameView> {
        let x = self.require_user_id(stored.game().player_x())?;
        let o = self.require_user_id(stored.game().player_o())?;
        Ok(self.game_view_with(stored, &x, &o))
    }

    fn game_view_with(&self, stored: &StoredGame, x: &User, o: &User) -> GameView {
        let game = stored.game();
        let name_of = |id: UserId| {
            if id == *x.id() {
                x.name().clone()
            } else {
                o.name().clone()
            }
        };
        GameView {
            key: stored.key(),
            board: board_cells(game.board().squares()),
            dimension: game.dimension(),
            player_x: x.name().clone(),
            player_o: o.name().clone(),
            has_to_move: (!game.is_over()).then(|| name_of(game.has_to_move())),
            game_over: game.is_over(),
            winner: game.winner().map(name_of),
            loser: game.loser().map(name_of),
            tie: game.is_tie(),
        }
    }

    fn score_views(&self, scores: &[Score]) -> ServiceResult<Vec<ScoreView>> {
        let names: HashMap<UserId, String> = self
            .store
            .list_users()?
            .into_iter()
            .map(|user| (*user.id(), user.name().clone()))
            .collect();
        let name_of = |id: &i32| names.get(id).cloned().unwrap_or_else(|| format!("#{}", id));
        let views = scores
            .iter()
            .map(|score| ScoreView::new(score, name_of(score.player_x()), name_of(score.player_o())))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(views)
    }
}
