//! Tests for database repository operations.

use chrono::NaiveDate;
use tempfile::NamedTempFile;
use tictactoe_engine::{Game, GamePolicy, MoveEffect, PlayerStats, Termination, UserId};
use tictactoe_server::{
    DbErrorKind, FinishedGame, GameRepository, SqliteRepository, StoredGame, UserRepository,
    run_migrations,
};

/// Creates a temporary database file with schema applied, returns the file
/// handle (must stay in scope to keep the file alive) and a ready repository.
fn setup_test_db() -> (NamedTempFile, SqliteRepository) {
    let db_file = NamedTempFile::new().expect("Failed to create temp file");
    let db_path = db_file.path().to_str().expect("Invalid path").to_string();
    run_migrations(&db_path).expect("Migrations failed");
    let repo = SqliteRepository::new(db_path).expect("Failed to create repository");
    (db_file, repo)
}

fn two_users(repo: &SqliteRepository) -> (UserId, UserId) {
    let a = repo.create_user("Alice".to_string(), None).expect("Create failed");
    let b = repo
        .create_user("Bob".to_string(), Some("bob@example.com".to_string()))
        .expect("Create failed");
    (*a.id(), *b.id())
}

/// Plays X@0, O@4, X@1, O@5, X@2 and returns the game with its termination.
fn won_by_x(x: UserId, o: UserId) -> (Game, Termination) {
    let mut game = Game::new(x, o, 3).expect("New game failed");
    let mut last = None;
    for (user, cell) in [(x, 0), (o, 4), (x, 1), (o, 5), (x, 2)] {
        last = Some(game.apply_move(user, cell).expect("Move failed"));
    }
    match last {
        Some(MoveEffect::Finished(termination)) => (game, termination),
        other => panic!("expected finished game, got {other:?}"),
    }
}

fn finished_batch(stored: StoredGame, game: Game, termination: &Termination) -> FinishedGame {
    FinishedGame::new(
        stored.with_game(game),
        termination,
        NaiveDate::from_ymd_opt(2026, 3, 14).expect("Invalid date"),
    )
}

fn insert(repo: &SqliteRepository, game: &Game) -> StoredGame {
    repo.insert_game(game, &GamePolicy::default())
        .expect("Insert failed")
}

#[test]
fn test_empty_path_rejected() {
    assert!(SqliteRepository::new("  ".to_string()).is_err());
}

#[test]
fn test_create_user() {
    let (_db, repo) = setup_test_db();
    let user = repo
        .create_user("Alice".to_string(), Some("alice@example.com".to_string()))
        .expect("Create failed");
    assert_eq!(user.name(), "Alice");
    assert_eq!(user.email().as_deref(), Some("alice@example.com"));
    assert!(*user.id() > 0);
    assert_eq!(user.stats(), PlayerStats::default());
}

#[test]
fn test_create_user_duplicate_name_fails() {
    let (_db, repo) = setup_test_db();
    repo.create_user("Bob".to_string(), None)
        .expect("First create failed");
    let err = repo
        .create_user("Bob".to_string(), None)
        .expect_err("Duplicate name should fail");
    assert_eq!(err.kind, DbErrorKind::UniqueViolation);
}

#[test]
fn test_find_user_by_name() {
    let (_db, repo) = setup_test_db();
    let created = repo
        .create_user("Carol".to_string(), None)
        .expect("Create failed");
    let found = repo.find_user_by_name("Carol").expect("Query failed");
    assert_eq!(found.map(|u| *u.id()), Some(*created.id()));
    assert!(repo.find_user_by_name("carol").expect("Query failed").is_none());
    assert!(repo.find_user(9999).expect("Query failed").is_none());
}

#[test]
fn test_list_users_ordered_by_creation() {
    let (_db, repo) = setup_test_db();
    for name in ["Alpha", "Beta", "Gamma"] {
        repo.create_user(name.to_string(), None).expect("Create failed");
    }
    let names: Vec<_> = repo
        .list_users()
        .expect("List failed")
        .iter()
        .map(|u| u.name().clone())
        .collect();
    assert_eq!(names, ["Alpha", "Beta", "Gamma"]);
}

#[test]
fn test_insert_and_find_game() {
    let (_db, repo) = setup_test_db();
    let (a, b) = two_users(&repo);
    let game = Game::new(a, b, 4).expect("New game failed");

    let stored = insert(&repo, &game);
    assert_eq!(*stored.version(), 0);

    let found = repo
        .find_game(*stored.id())
        .expect("Query failed")
        .expect("Game missing");
    assert_eq!(found.game(), &game);
    assert_eq!(found.game().dimension(), 4);
    assert!(repo.find_game(*stored.id() + 1).expect("Query failed").is_none());
}

#[test]
fn test_save_game_bumps_version() {
    let (_db, repo) = setup_test_db();
    let (a, b) = two_users(&repo);
    let stored = insert(&repo, &Game::new(a, b, 3).expect("New game failed"));

    let mut game = stored.game().clone();
    game.apply_move(a, 4).expect("Move failed");
    let saved = repo.save_game(&stored.with_game(game.clone())).expect("Save failed");

    assert_eq!(*saved.version(), 1);
    assert_eq!(saved.game(), &game);
    assert_eq!(saved.game().has_to_move(), b);
}

#[test]
fn test_stale_save_is_conflict() {
    let (_db, repo) = setup_test_db();
    let (a, b) = two_users(&repo);
    let stored = insert(&repo, &Game::new(a, b, 3).expect("New game failed"));

    let mut first = stored.game().clone();
    first.apply_move(a, 0).expect("Move failed");
    repo.save_game(&stored.clone().with_game(first.clone()))
        .expect("First save failed");

    let mut second = stored.game().clone();
    second.apply_move(a, 8).expect("Move failed");
    let err = repo
        .save_game(&stored.clone().with_game(second))
        .expect_err("Stale save should fail");
    assert_eq!(err.kind, DbErrorKind::Conflict);

    let current = repo
        .find_game(*stored.id())
        .expect("Query failed")
        .expect("Game missing");
    assert_eq!(current.game(), &first);
}

#[test]
fn test_save_deleted_game_is_not_found() {
    let (_db, repo) = setup_test_db();
    let (a, b) = two_users(&repo);
    let stored = insert(&repo, &Game::new(a, b, 3).expect("New game failed"));
    repo.delete_game(&stored).expect("Delete failed");

    let err = repo.save_game(&stored).expect_err("Save should fail");
    assert_eq!(err.kind, DbErrorKind::NotFound);
}

#[test]
fn test_delete_stale_game_is_conflict() {
    let (_db, repo) = setup_test_db();
    let (a, b) = two_users(&repo);
    let stored = insert(&repo, &Game::new(a, b, 3).expect("New game failed"));
    let mut game = stored.game().clone();
    game.apply_move(a, 0).expect("Move failed");
    repo.save_game(&stored.clone().with_game(game))
        .expect("Save failed");

    let err = repo.delete_game(&stored).expect_err("Delete should fail");
    assert_eq!(err.kind, DbErrorKind::Conflict);
    assert!(repo.find_game(*stored.id()).expect("Query failed").is_some());
}

#[test]
fn test_active_games_queries() {
    let (_db, repo) = setup_test_db();
    let (a, b) = two_users(&repo);
    let c = *repo
        .create_user("Carol".to_string(), None)
        .expect("Create failed")
        .id();

    insert(&repo, &Game::new(a, b, 3).expect("New game failed"));
    insert(&repo, &Game::new(c, a, 3).expect("New game failed"));

    assert_eq!(repo.count_active_games(a).expect("Count failed"), 2);
    assert_eq!(repo.count_active_games(b).expect("Count failed"), 1);
    let for_c = repo.active_games_for(c).expect("Query failed");
    assert_eq!(for_c.len(), 1);
    assert_eq!(for_c[0].game().player_o(), a);

    let ids: Vec<_> = repo
        .users_with_active_games()
        .expect("Query failed")
        .iter()
        .map(|u| *u.id())
        .collect();
    assert_eq!(ids, [a, b, c]);
}

#[test]
fn test_commit_finished_game() {
    let (_db, repo) = setup_test_db();
    let (a, b) = two_users(&repo);
    let stored = insert(&repo, &Game::new(a, b, 3).expect("New game failed"));
    let (game, termination) = won_by_x(a, b);

    let saved = repo
        .commit_finished_game(&finished_batch(stored, game, &termination))
        .expect("Commit failed");
    assert!(saved.game().is_over());
    assert_eq!(saved.game().winner(), Some(a));

    let alice = repo.find_user(a).expect("Query failed").expect("User missing");
    let bob = repo.find_user(b).expect("Query failed").expect("User missing");
    assert_eq!(alice.stats(), PlayerStats::new(1, 0, 0, 1));
    assert_eq!(bob.stats(), PlayerStats::new(0, 0, 1, 1));

    let scores = repo.list_scores().expect("List failed");
    assert_eq!(scores.len(), 1);
    assert_eq!(scores[0].result(), "player_x_won");
    assert_eq!(repo.scores_for(b).expect("Query failed").len(), 1);
    assert_eq!(repo.count_active_games(a).expect("Count failed"), 0);
}

#[test]
fn test_commit_with_stale_version_writes_nothing() {
    let (_db, repo) = setup_test_db();
    let (a, b) = two_users(&repo);
    let stored = insert(&repo, &Game::new(a, b, 3).expect("New game failed"));

    let mut interloper = stored.game().clone();
    interloper.apply_move(a, 8).expect("Move failed");
    repo.save_game(&stored.clone().with_game(interloper))
        .expect("Save failed");

    let (game, termination) = won_by_x(a, b);
    let err = repo
        .commit_finished_game(&finished_batch(stored.clone(), game, &termination))
        .expect_err("Commit should fail");
    assert_eq!(err.kind, DbErrorKind::Conflict);

    let alice = repo.find_user(a).expect("Query failed").expect("User missing");
    assert_eq!(alice.stats(), PlayerStats::default());
    assert!(repo.list_scores().expect("List failed").is_empty());
    let current = repo
        .find_game(*stored.id())
        .expect("Query failed")
        .expect("Game missing");
    assert!(!current.game().is_over());
}

#[test]
fn test_insert_enforces_active_game_cap() {
    let (_db, repo) = setup_test_db();
    let (a, b) = two_users(&repo);
    let c = *repo
        .create_user("Carol".to_string(), None)
        .expect("Create failed")
        .id();
    let policy = GamePolicy {
        max_active_games: Some(1),
        ..GamePolicy::default()
    };

    repo.insert_game(&Game::new(a, b, 3).expect("New game failed"), &policy)
        .expect("First insert failed");
    let err = repo
        .insert_game(&Game::new(c, a, 3).expect("New game failed"), &policy)
        .expect_err("Second game for Alice should be refused");
    assert_eq!(err.kind, DbErrorKind::LimitReached);
    assert_eq!(repo.count_active_games(a).expect("Count failed"), 1);
    assert_eq!(repo.count_active_games(c).expect("Count failed"), 0);

    // Uncapped inserts ignore the count.
    insert(&repo, &Game::new(c, a, 3).expect("New game failed"));
    assert_eq!(repo.count_active_games(a).expect("Count failed"), 2);
}

#[test]
fn test_commit_adds_to_stored_counters() {
    let (_db, repo) = setup_test_db();
    let (a, b) = two_users(&repo);

    for _ in 0..2 {
        let stored = insert(&repo, &Game::new(a, b, 3).expect("New game failed"));
        let (game, termination) = won_by_x(a, b);
        repo.commit_finished_game(&finished_batch(stored, game, &termination))
            .expect("Commit failed");
    }

    let alice = repo.find_user(a).expect("Query failed").expect("User missing");
    let bob = repo.find_user(b).expect("Query failed").expect("User missing");
    assert_eq!(alice.stats(), PlayerStats::new(2, 0, 0, 2));
    assert_eq!(bob.stats(), PlayerStats::new(0, 0, 2, 2));
    assert_eq!(repo.list_scores().expect("List failed").len(), 2);
}
