use axum::{extract::State, routing::get, Json, Router};
use serde::Deserialize;

use super::{ApiJson, ApiPath, ApiQuery, ApiResponse, AppState, Created};
use crate::{
    auth::AuthUser,
    error::{AppError, AppResult},
    models::{Comment, CreateComment, UpdateComment},
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/comments", get(list_comments).post(create_comment))
        .route(
            "/api/comments/{id}",
            get(get_comment).put(update_comment).delete(delete_comment),
        )
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentQuery {
    task_id: Option<i64>,
}

/// GET /api/comments?taskId=
async fn list_comments(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(query): ApiQuery<CommentQuery>,
) -> AppResult<Json<ApiResponse<Vec<Comment>>>> {
    let comments = state.repos.comments.list(user.site_id, query.task_id).await?;
    Ok(Json(ApiResponse::success(comments)))
}

async fn get_comment(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<ApiResponse<Comment>>> {
    let comment = state.repos.comments.get(user.site_id, id).await?;
    Ok(Json(ApiResponse::success(comment)))
}

/// POST /api/comments
/// Body: { "taskId": 1, "body": "..." }
async fn create_comment(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(input): ApiJson<CreateComment>,
) -> AppResult<Created<Comment>> {
    input.validate()?;
    let comment = state
        .repos
        .comments
        .create(user.site_id, user.user_id, &input)
        .await?;
    Ok(Created(comment))
}

/// PUT /api/comments/{id}; author only
async fn update_comment(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(patch): ApiJson<UpdateComment>,
) -> AppResult<Json<ApiResponse<Comment>>> {
    patch.validate()?;
    let comment = state
        .repos
        .comments
        .update(user.site_id, user.user_id, id, &patch)
        .await?;
    Ok(Json(ApiResponse::success(comment)))
}

/// DELETE /api/comments/{id}; the author or a site admin
async fn delete_comment(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    let comment = state.repos.comments.get(user.site_id, id).await?;
    if comment.created_by != Some(user.user_id) && !user.is_admin() {
        return Err(AppError::Forbidden(
            "only the author or an admin can delete a comment".into(),
        ));
    }
    state.repos.comments.delete(user.site_id, id).await?;
    Ok(Json(ApiResponse::message("Comment deleted")))
}
