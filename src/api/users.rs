use futures_util::future::try_join;
use serde_json::json;
use tracing::info;

use crate::error::AppResult;
use crate::pipeline::{OutboundRequest, Transport};

use super::models::{MessageResponse, UserOverview, UserRecord};
use super::{seg, LibraryClient};

impl<T: Transport> LibraryClient<T> {
    pub async fn list_users(&self) -> AppResult<Vec<UserRecord>> {
        self.pipeline.json(OutboundRequest::get("/users")).await
    }

    pub async fn get_user(&self, user_id: &str) -> AppResult<UserRecord> {
        self.pipeline.json(OutboundRequest::get(format!("/users/{}", seg(user_id)))).await
    }

    /// Profile and reservations fetched side by side; either failure fails the whole.
    pub async fn user_overview(&self, user_id: &str) -> AppResult<UserOverview> {
        let (user, reservations) = try_join(self.get_user(user_id), self.user_reservations(user_id)).await?;
        Ok(UserOverview { user, reservations })
    }

    pub async fn set_blocked(&self, user_id: &str, blocked: bool) -> AppResult<String> {
        let req = OutboundRequest::put(format!("/users/{}/block", seg(user_id))).with_json(&json!({"isBlocked": blocked}))?;
        let resp: MessageResponse = self.pipeline.json(req).await?;
        info!(target: "api", user_id, blocked, "user block state changed");
        let fallback = if blocked { "User blocked" } else { "User unblocked" };
        Ok(resp.message.unwrap_or_else(|| fallback.to_string()))
    }
}
