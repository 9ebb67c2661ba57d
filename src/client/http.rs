use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{ClientError, ClientResult, PortalApi, PostRef};
use crate::api::{
    AuthResponse, Ballot, CommentDeleted, CommentEnvelope, CommentLikeStatus, CommentList,
    CommentRef, Credentials, EditComment, LikeStatus, NewComment, NewPost, ParticipationSummary,
    PostEnvelope, VoteSummary,
};
use crate::db::models::{Comment, Post};
use crate::domain::Board;

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// [`PortalApi`] over HTTP. The session travels as a bearer token.
#[derive(Debug, Clone)]
pub struct HttpPortal {
    base_url: String,
    http: reqwest::Client,
    token: Option<String>,
}

impl HttpPortal {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Registers an account and keeps the returned session.
    pub async fn register(
        &mut self,
        username: &str,
        password: &str,
    ) -> ClientResult<AuthResponse> {
        let creds = Credentials {
            username: username.to_string(),
            password: password.to_string(),
            display_name: None,
        };
        let auth: AuthResponse = self
            .send(self.request(Method::POST, "/api/auth/register").json(&creds))
            .await?;
        self.token = Some(auth.token.clone());
        Ok(auth)
    }

    pub async fn login(&mut self, username: &str, password: &str) -> ClientResult<AuthResponse> {
        let creds = Credentials {
            username: username.to_string(),
            password: password.to_string(),
            display_name: None,
        };
        let auth: AuthResponse = self
            .send(self.request(Method::POST, "/api/auth/login").json(&creds))
            .await?;
        self.token = Some(auth.token.clone());
        Ok(auth)
    }

    pub async fn create_post(&self, board: Board, post: &NewPost) -> ClientResult<Post> {
        let path = format!("/api/{}", board.segment());
        let env: PostEnvelope = self
            .send(self.request(Method::POST, &path).json(post))
            .await?;
        Ok(env.post)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .http
            .request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn post_path(post: PostRef, suffix: &str) -> String {
        format!("/api/{}/{}{}", post.board.segment(), post.id, suffix)
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> ClientResult<T> {
        let response = builder.send().await?;
        decode(response).await
    }

    async fn send_json<B, T>(
        &self,
        method: Method,
        post: PostRef,
        suffix: &str,
        body: &B,
    ) -> ClientResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let path = Self::post_path(post, suffix);
        self.send(self.request(method, &path).json(body)).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let message = match response.json::<ErrorBody>().await {
        Ok(body) => body.error,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string(),
    };
    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl PortalApi for HttpPortal {
    fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    async fn post(&self, post: PostRef) -> ClientResult<Post> {
        let env: PostEnvelope = self
            .send(self.request(Method::GET, &Self::post_path(post, "")))
            .await?;
        Ok(env.post)
    }

    async fn like_status(&self, post: PostRef) -> ClientResult<LikeStatus> {
        self.send(self.request(Method::GET, &Self::post_path(post, "/like")))
            .await
    }

    async fn toggle_like(&self, post: PostRef) -> ClientResult<LikeStatus> {
        self.send(self.request(Method::POST, &Self::post_path(post, "/like")))
            .await
    }

    async fn participation(&self, post: PostRef) -> ClientResult<ParticipationSummary> {
        self.send(self.request(Method::GET, &Self::post_path(post, "/participate")))
            .await
    }

    async fn toggle_participation(&self, post: PostRef) -> ClientResult<ParticipationSummary> {
        self.send(self.request(Method::POST, &Self::post_path(post, "/participate")))
            .await
    }

    async fn vote_summary(&self, post: PostRef) -> ClientResult<VoteSummary> {
        self.send(self.request(Method::GET, &Self::post_path(post, "/vote")))
            .await
    }

    async fn cast_vote(&self, post: PostRef, option: &str) -> ClientResult<VoteSummary> {
        let ballot = Ballot {
            vote_option: option.to_string(),
        };
        self.send_json(Method::POST, post, "/vote", &ballot).await
    }

    async fn comments(&self, post: PostRef) -> ClientResult<Vec<Comment>> {
        let list: CommentList = self
            .send(self.request(Method::GET, &Self::post_path(post, "/comments")))
            .await?;
        Ok(list.comments)
    }

    async fn create_comment(
        &self,
        post: PostRef,
        content: &str,
        parent_id: Option<i64>,
    ) -> ClientResult<CommentEnvelope> {
        let body = NewComment {
            content: content.to_string(),
            parent_id,
        };
        self.send_json(Method::POST, post, "/comments", &body).await
    }

    async fn edit_comment(
        &self,
        post: PostRef,
        comment_id: i64,
        content: &str,
    ) -> ClientResult<CommentEnvelope> {
        let body = EditComment {
            comment_id,
            content: content.to_string(),
        };
        self.send_json(Method::PUT, post, "/comments", &body).await
    }

    async fn delete_comment(&self, post: PostRef, comment_id: i64) -> ClientResult<CommentDeleted> {
        self.send_json(Method::DELETE, post, "/comments", &CommentRef { comment_id })
            .await
    }

    async fn toggle_comment_like(
        &self,
        post: PostRef,
        comment_id: i64,
    ) -> ClientResult<CommentLikeStatus> {
        self.send_json(Method::POST, post, "/comments/like", &CommentRef { comment_id })
            .await
    }
}
