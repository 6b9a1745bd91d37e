//! REST surface over [`LeagueService`].
//!
//! Every handler runs its service call on the blocking pool, since the store
//! performs synchronous SQLite I/O.

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State, rejection::JsonRejection},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tracing::{debug, error, info, warn};

use crate::db::LeagueStore;
use crate::error::{ErrorKind, ServiceError, ServiceResult};
use crate::notify::ReminderQueue;
use crate::service::LeagueService;
use crate::views::{GameView, HistoryView, ScoreView, UserView};

/// Body of `POST /user`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    /// Unique name to register.
    pub user_name: String,
    /// Optional contact address.
    #[serde(default)]
    pub email: Option<String>,
}

/// Body of `POST /game`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewGameRequest {
    /// Name of the user taking X.
    pub player_x: String,
    /// Name of the user taking O.
    pub player_o: String,
    /// Board side; the configured default when absent.
    #[serde(default)]
    pub board_dimension: Option<usize>,
}

/// Body of `PUT /game/{game_key}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MakeMoveRequest {
    /// Name of the moving user.
    pub user_name: String,
    /// Row-major cell index.
    #[serde(rename = "move")]
    pub cell: i64,
}

/// JSON error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Stable machine code.
    pub code: String,
    /// Human-readable detail.
    pub message: String,
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidRequest
        | ErrorKind::InvalidDimension
        | ErrorKind::InvalidName
        | ErrorKind::InvalidKey
        | ErrorKind::SamePlayer
        | ErrorKind::InvalidMove => StatusCode::BAD_REQUEST,
        ErrorKind::UserNotFound | ErrorKind::GameNotFound => StatusCode::NOT_FOUND,
        ErrorKind::GameAlreadyOver
        | ErrorKind::NotYourTurn
        | ErrorKind::CellOccupied
        | ErrorKind::DuplicateUser
        | ErrorKind::ConcurrentModification
        | ErrorKind::TooManyActiveGames => StatusCode::CONFLICT,
        ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = status_for(self.kind);
        let message = if self.kind == ErrorKind::Storage {
            error!(error = %self, "Internal error returned to client");
            "Internal server error".to_string()
        } else {
            debug!(code = self.kind.code(), message = %self.message, "Request rejected");
            self.message
        };
        let body = ErrorBody {
            code: self.kind.code().to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

/// Runs a service call on the blocking pool.
async fn blocking<T, F>(call: F) -> ServiceResult<T>
where
    F: FnOnce() -> ServiceResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(call).await.map_err(|e| {
        error!(error = %e, "Blocking task failed");
        ServiceError::new(ErrorKind::Storage, format!("Blocking task failed: {}", e))
    })?
}

/// Unwraps a JSON body, reporting a rejected one in the common error shape.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> ServiceResult<T> {
    match payload {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => {
            warn!(status = %rejection.status(), "Request body rejected");
            Err(ServiceError::new(ErrorKind::InvalidRequest, rejection.body_text()))
        }
    }
}

/// Builds the application router.
pub fn router<S: LeagueStore, Q: ReminderQueue>(service: LeagueService<S, Q>) -> Router {
    Router::new()
        .route("/user", post(create_user::<S, Q>))
        .route("/user/ranking", get(get_user_rankings::<S, Q>))
        .route("/user/{user_name}/games", get(get_user_games::<S, Q>))
        .route("/game", post(new_game::<S, Q>))
        .route(
            "/game/{game_key}",
            get(get_game::<S, Q>)
                .put(make_move::<S, Q>)
                .delete(cancel_game::<S, Q>),
        )
        .route("/game/{game_key}/history", get(get_game_history::<S, Q>))
        .route("/scores", get(get_scores::<S, Q>))
        .route("/scores/user/{user_name}", get(get_user_scores::<S, Q>))
        .with_state(service)
        .layer(ServiceBuilder::new().map_request(|req: Request<Body>| {
            info!(method = %req.method(), uri = %req.uri(), "Incoming HTTP request");
            req
        }))
}

async fn create_user<S: LeagueStore, Q: ReminderQueue>(
    State(service): State<LeagueService<S, Q>>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> ServiceResult<(StatusCode, Json<UserView>)> {
    let request = json_body(payload)?;
    let user = blocking(move || service.create_user(request.user_name, request.email)).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn get_user_rankings<S: LeagueStore, Q: ReminderQueue>(
    State(service): State<LeagueService<S, Q>>,
) -> ServiceResult<Json<Vec<UserView>>> {
    blocking(move || service.get_user_rankings()).await.map(Json)
}

async fn get_user_games<S: LeagueStore, Q: ReminderQueue>(
    State(service): State<LeagueService<S, Q>>,
    Path(user_name): Path<String>,
) -> ServiceResult<Json<Vec<GameView>>> {
    blocking(move || service.get_user_games(&user_name)).await.map(Json)
}

async fn new_game<S: LeagueStore, Q: ReminderQueue>(
    State(service): State<LeagueService<S, Q>>,
    payload: Result<Json<NewGameRequest>, JsonRejection>,
) -> ServiceResult<(StatusCode, Json<GameView>)> {
    let request = json_body(payload)?;
    let game = blocking(move || {
        service.new_game(&request.player_x, &request.player_o, request.board_dimension)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(game)))
}

async fn get_game<S: LeagueStore, Q: ReminderQueue>(
    State(service): State<LeagueService<S, Q>>,
    Path(game_key): Path<String>,
) -> ServiceResult<Json<GameView>> {
    blocking(move || service.get_game(&game_key)).await.map(Json)
}

async fn make_move<S: LeagueStore, Q: ReminderQueue>(
    State(service): State<LeagueService<S, Q>>,
    Path(game_key): Path<String>,
    payload: Result<Json<MakeMoveRequest>, JsonRejection>,
) -> ServiceResult<Json<GameView>> {
    let request = json_body(payload)?;
    let result =
        blocking(move || service.apply_move(&game_key, &request.user_name, request.cell)).await;
    if let Err(e) = &result {
        warn!(code = e.kind.code(), "Move rejected");
    }
    result.map(Json)
}

async fn cancel_game<S: LeagueStore, Q: ReminderQueue>(
    State(service): State<LeagueService<S, Q>>,
    Path(game_key): Path<String>,
) -> ServiceResult<StatusCode> {
    blocking(move || service.cancel_game(&game_key)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_game_history<S: LeagueStore, Q: ReminderQueue>(
    State(service): State<LeagueService<S, Q>>,
    Path(game_key): Path<String>,
) -> ServiceResult<Json<Vec<HistoryView>>> {
    blocking(move || service.get_game_history(&game_key)).await.map(Json)
}

async fn get_scores<S: LeagueStore, Q: ReminderQueue>(
    State(service): State<LeagueService<S, Q>>,
) -> ServiceResult<Json<Vec<ScoreView>>> {
    blocking(move || service.get_scores()).await.map(Json)
}

async fn get_user_scores<S: LeagueStore, Q: ReminderQueue>(
    State(service): State<LeagueService<S, Q>>,
    Path(user_name): Path<String>,
) -> ServiceResult<Json<Vec<ScoreView>>> {
    blocking(move || service.get_user_scores(&user_name)).await.map(Json)
}
