use serde_json::json;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::identity::Session;
use crate::pipeline::{OutboundRequest, SessionEvent, Transport};

use super::models::{LoginResponse, MessageResponse};
use super::{seg, LibraryClient};

pub const MIN_PASSWORD_LEN: usize = 6;
const MIN_EMAIL_LEN: usize = 5;
const EXPIRED_RESET_TOKEN: &str = "Invalid or expired token.";
const REGISTERED: &str = "Registration successful. Please check your email for verification.";
const REGISTRATION_FAILED: &str = "Registration failed.";

pub fn validate_email(email: &str) -> AppResult<()> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') || email.len() < MIN_EMAIL_LEN {
        return Err(AppError::user("invalid_email", "Email is invalid"));
    }
    Ok(())
}

pub fn validate_new_password(password: &str) -> AppResult<()> {
    if password.is_empty() {
        return Err(AppError::user("password_required", "Password is required"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::user(
            "password_too_short",
            format!("Password must be at least {} characters long", MIN_PASSWORD_LEN),
        ));
    }
    Ok(())
}

impl<T: Transport> LibraryClient<T> {
    /// Exchange credentials for a token and persist it. The returned session reflects the
    /// claims carried by the new token.
    pub async fn login(&self, email: &str, password: &str) -> AppResult<Session> {
        let req = OutboundRequest::post("/users/login").with_json(&json!({"email": email, "password": password}))?;
        let resp: LoginResponse = self.pipeline.json(req).await?;
        let token = resp
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::decode("missing_token", "login response carried no token"))?;
        self.store.set(&token)?;
        let session = Session::from_token(token);
        info!(
            target: "auth",
            subject = session.subject_id().unwrap_or("-"),
            role = session.role().map(|r| r.as_str()).unwrap_or("-"),
            "logged in"
        );
        Ok(session)
    }

    /// Drop the local session. The backend keeps no session state to revoke.
    pub fn logout(&self) -> AppResult<()> {
        self.store.clear()?;
        self.events.publish(SessionEvent::SignedOut);
        info!(target: "auth", "logged out");
        Ok(())
    }

    /// Create an account. The backend owns every rule on email and password; the reply
    /// text is fixed on success.
    pub async fn register(&self, email: &str, password: &str) -> AppResult<String> {
        let req = OutboundRequest::post("/users/register").with_json(&json!({"email": email, "password": password}))?;
        match self.pipeline.execute(req).await {
            Ok(_) => Ok(REGISTERED.to_string()),
            Err(e) => Err(e.or_message(REGISTRATION_FAILED)),
        }
    }

    pub async fn forgot_password(&self, email: &str) -> AppResult<String> {
        validate_email(email)?;
        let req = OutboundRequest::post("/users/forgot-password").with_json(&json!({"email": email.trim()}))?;
        let resp: MessageResponse = self.pipeline.json(req).await?;
        Ok(resp.message.unwrap_or_else(|| "Password reset email sent.".to_string()))
    }

    pub async fn reset_password(&self, reset_token: &str, new_password: &str) -> AppResult<String> {
        validate_new_password(new_password)?;
        let req = OutboundRequest::post(format!("/users/reset-password/{}", seg(reset_token)))
            .with_json(&json!({"newPassword": new_password}))?;
        match self.pipeline.json::<MessageResponse>(req).await {
            Ok(resp) => Ok(resp.message.unwrap_or_else(|| "Password has been reset.".to_string())),
            Err(AppError::Rejected { code, message, status }) if message == EXPIRED_RESET_TOKEN => {
                Err(AppError::Rejected { code, message: "Invalid or expired token. Please try again.".into(), status })
            }
            Err(e) => Err(e),
        }
    }
}
