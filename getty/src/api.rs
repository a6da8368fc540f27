//! HTTP endpoints under `/api/database`.
//!
//! Every response body is an [`Envelope`]. Logical failures (validation, not found, conflicts,
//! store errors) are answered with `200` and a failure envelope; the status code only reports
//! transport-level problems with the request itself: `405` for the wrong method and `418` for a
//! body that cannot be parsed or lacks a required field.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{FromRequest, Request, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{post, put},
};
use log::debug;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    envelope::{Envelope, ErrorBody},
    models::PostDraft,
    service::GettyService,
    store::DocumentStore,
};

const INVALID_REQUEST: &str = "invalid_request_error";

pub fn make_router<S: DocumentStore>(service: Arc<GettyService<S>>) -> Router {
    Router::new()
        .route("/api/database/posts/createPost", put(create_post::<S>))
        .route("/api/database/posts/getPostFromUser", post(get_post::<S>))
        .route("/api/database/posts/getAllPostsFromUser", post(get_all_posts::<S>))
        .route("/api/database/posts/postExists", post(post_exists::<S>))
        .route("/api/database/posts/likePost", post(like_post::<S>))
        .route("/api/database/posts/unlikePost", post(unlike_post::<S>))
        .route("/api/database/posts/userLikesPost", post(user_likes_post::<S>))
        .route("/api/database/posts/addComment", post(add_comment::<S>))
        .route("/api/database/posts/getHomefeed", post(home_feed::<S>))
        .route("/api/database/profile/followUser", post(follow_user::<S>))
        .route("/api/database/profile/unfollowUser", post(unfollow_user::<S>))
        .route("/api/database/profile/isFollowing", post(is_following::<S>))
        .route("/api/database/profile/getFriends", post(get_friends::<S>))
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(unknown_route)
        .with_state(service)
}

/// JSON body extractor that answers rejections with a failure envelope and `418`.
pub struct Payload<T>(pub T);

impl<S, T> FromRequest<S> for Payload<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Payload(value)),
            Err(rejection) => Err(reject(rejection)),
        }
    }
}

fn reject(rejection: JsonRejection) -> Response {
    debug!("rejected request body: {rejection}");
    failure(
        StatusCode::IM_A_TEAPOT,
        ErrorBody::new(418, rejection.body_text(), "", INVALID_REQUEST),
    )
}

fn respond<T: Serialize>(envelope: Envelope<T>) -> Response {
    (StatusCode::OK, Json(envelope)).into_response()
}

fn failure(status: StatusCode, error: ErrorBody) -> Response {
    (status, Json(Envelope::<()>::Failure(error))).into_response()
}

async fn method_not_allowed() -> Response {
    failure(
        StatusCode::METHOD_NOT_ALLOWED,
        ErrorBody::new(405, "Invalid request method", "", INVALID_REQUEST),
    )
}

async fn unknown_route() -> Response {
    failure(
        StatusCode::NOT_FOUND,
        ErrorBody::new(404, "No such endpoint", "", INVALID_REQUEST),
    )
}

type Service<S> = State<Arc<GettyService<S>>>;

#[derive(Debug, Deserialize)]
struct CreatePostReq {
    #[serde(alias = "userId")]
    user_id: String,
    #[serde(default, alias = "creationDate")]
    date_key: Option<String>,
    #[serde(flatten)]
    draft: PostDraft,
}

#[derive(Debug, Deserialize)]
struct UserReq {
    #[serde(alias = "id")]
    user_id: String,
}

#[derive(Debug, Deserialize)]
struct UserPostReq {
    user_id: String,
    post_id: String,
}

/// `user_id` is the liker; the post belongs to `owner_id`.
#[derive(Debug, Deserialize)]
struct LikeReq {
    user_id: String,
    post_id: String,
    owner_id: String,
}

#[derive(Debug, Deserialize)]
struct CommentReq {
    owner_id: String,
    post_id: String,
    user_id: String,
    #[serde(default)]
    username: String,
    comment: String,
}

#[derive(Debug, Deserialize)]
struct FollowReq {
    #[serde(alias = "id")]
    user_id: String,
    #[serde(alias = "friend_id")]
    target_id: String,
}

async fn create_post<S: DocumentStore>(State(service): Service<S>, Payload(req): Payload<CreatePostReq>) -> Response {
    respond(
        service
            .create_post(&req.user_id, req.date_key.as_deref(), req.draft)
            .await,
    )
}

async fn get_post<S: DocumentStore>(State(service): Service<S>, Payload(req): Payload<UserPostReq>) -> Response {
    respond(service.get_post(&req.user_id, &req.post_id).await)
}

async fn get_all_posts<S: DocumentStore>(State(service): Service<S>, Payload(req): Payload<UserReq>) -> Response {
    respond(service.get_all_posts(&req.user_id).await)
}

async fn post_exists<S: DocumentStore>(State(service): Service<S>, Payload(req): Payload<UserPostReq>) -> Response {
    respond(service.post_exists(&req.user_id, &req.post_id).await)
}

async fn like_post<S: DocumentStore>(State(service): Service<S>, Payload(req): Payload<LikeReq>) -> Response {
    respond(service.like_post(&req.owner_id, &req.post_id, &req.user_id).await)
}

async fn unlike_post<S: DocumentStore>(State(service): Service<S>, Payload(req): Payload<LikeReq>) -> Response {
    respond(service.unlike_post(&req.owner_id, &req.post_id, &req.user_id).await)
}

async fn user_likes_post<S: DocumentStore>(State(service): Service<S>, Payload(req): Payload<LikeReq>) -> Response {
    respond(service.user_likes_post(&req.owner_id, &req.post_id, &req.user_id).await)
}

async fn add_comment<S: DocumentStore>(State(service): Service<S>, Payload(req): Payload<CommentReq>) -> Response {
    respond(
        service
            .add_comment(&req.owner_id, &req.post_id, &req.user_id, &req.username, &req.comment)
            .await,
    )
}

async fn home_feed<S: DocumentStore>(State(service): Service<S>, Payload(req): Payload<UserReq>) -> Response {
    respond(service.home_feed(&req.user_id).await)
}

async fn follow_user<S: DocumentStore>(State(service): Service<S>, Payload(req): Payload<FollowReq>) -> Response {
    respond(service.follow(&req.user_id, &req.target_id).await)
}

async fn unfollow_user<S: DocumentStore>(State(service): Service<S>, Payload(req): Payload<FollowReq>) -> Response {
    respond(service.unfollow(&req.user_id, &req.target_id).await)
}

async fn is_following<S: DocumentStore>(State(service): Service<S>, Payload(req): Payload<FollowReq>) -> Response {
    respond(service.is_following(&req.user_id, &req.target_id).await)
}

async fn get_friends<S: DocumentStore>(State(service): Service<S>, Payload(req): Payload<UserReq>) -> Response {
    respond(service.friends(&req.user_id).await)
}
