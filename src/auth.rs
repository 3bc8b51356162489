//! Account and session operations: login/logout, registration with OTP
//! verification, password reset, profile maintenance, and the payment-gated
//! teacher-onboarding calls.
//!
//! Failure semantics follow one rule: calls that establish or validate
//! identity (login, me) clear the session on failure; non-critical
//! notifications (logout, OTP resend) swallow transport failures.

use serde::Deserialize;
use serde_json::json;

use crate::client::ApiClient;
use crate::error::{ApiError, ApiResult};
use crate::models::{OtpPurpose, ProfileUpdate, RegisterForm, Teacher, TeacherRequest, User};

#[derive(Debug, Deserialize)]
struct LoginResponse {
    user: User,
    #[serde(rename = "accessToken")]
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct UserEnvelope {
    user: User,
}

#[derive(Debug, Deserialize)]
struct ProfilesEnvelope {
    users: Vec<User>,
}

impl ApiClient {
    /// Authenticate and establish the session. On success the token and
    /// user snapshot are stored and announced to other instances; on any
    /// failure the session is left cleared and the server's message is
    /// surfaced unchanged.
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<User> {
        let resp = self
            .post_raw("/auth/login", &json!({ "email": email, "password": password }))
            .await?;
        if !resp.status().is_success() {
            let err = Self::into_error(resp).await;
            self.store().clear();
            // A rejected login is a business error, not an expiry: it must
            // never enter the refresh protocol.
            return Err(match err {
                ApiError::AuthExpired { message } => ApiError::validation(401, message),
                other => other,
            });
        }
        let body: LoginResponse = match resp.json().await {
            Ok(b) => b,
            Err(e) => {
                self.store().clear();
                return Err(ApiError::decode(format!("unexpected login payload: {}", e)));
            }
        };
        self.store().set_signed_in(body.access_token.clone(), body.user.clone());
        self.announce_signed_in(body.access_token);
        tracing::info!(target: "brightafrica::auth", "signed in as {}", body.user.username);
        Ok(body.user)
    }

    /// Best-effort server-side invalidation of the refresh credential, then
    /// unconditional local clearing plus a signed-out broadcast. A failed
    /// server call never blocks the local transition.
    pub async fn logout(&self) {
        if let Err(e) = self.post_unit("/auth/logout", json!({})).await {
            tracing::warn!(target: "brightafrica::auth", "server logout failed: {}", e);
        }
        self.sign_out_local();
    }

    /// Create an account. Never establishes a session: the server requires
    /// OTP verification before the first login.
    pub async fn register(&self, form: &RegisterForm) -> ApiResult<()> {
        self.post_unit(
            "/auth/register",
            json!({
                "username": form.username,
                "email": form.email,
                "password": form.password,
                "country": form.country,
                "city": form.city,
                "gender": form.gender,
                "tel": form.tel,
            }),
        )
        .await
    }

    /// Re-fetch the user snapshot with the current token. Any failure
    /// (expired, invalid, network) clears the session rather than leaving
    /// stale state.
    pub async fn me(&self) -> ApiResult<User> {
        match self.get_json::<UserEnvelope>("/auth/me").await {
            Ok(env) => {
                self.store().set_user(env.user.clone());
                Ok(env.user)
            }
            Err(e) => {
                self.sign_out_local();
                Err(e)
            }
        }
    }

    // ---- OTP / password reset ----

    pub async fn request_code(&self, email: &str) -> ApiResult<()> {
        self.post_unit("/auth/request-code", json!({ "email": email })).await
    }

    pub async fn verify_otp(&self, email: &str, otp_code: &str, purpose: OtpPurpose) -> ApiResult<()> {
        self.post_unit(
            "/auth/verify-otp",
            json!({ "email": email, "otpCode": otp_code, "context": purpose.as_str() }),
        )
        .await
    }

    /// Resend the code. Transport failures are swallowed (the user can just
    /// press resend again); validation errors still surface.
    pub async fn resend_otp(&self, email: &str, purpose: OtpPurpose) -> ApiResult<()> {
        match self
            .post_unit(
                "/auth/resend-otp",
                json!({ "email": email, "context": purpose.as_str() }),
            )
            .await
        {
            Err(e) if e.is_retryable() => {
                tracing::warn!(target: "brightafrica::auth", "resend-otp swallowed: {}", e);
                Ok(())
            }
            other => other,
        }
    }

    pub async fn reset_password(&self, email: &str, code: &str, new_password: &str) -> ApiResult<()> {
        self.post_unit(
            "/auth/reset-password",
            json!({ "email": email, "code": code, "newPassword": new_password }),
        )
        .await
    }

    // ---- profile ----

    pub async fn update_profile(&self, update: &ProfileUpdate) -> ApiResult<User> {
        let body = serde_json::to_value(update)
            .map_err(|e| ApiError::decode(format!("could not encode profile update: {}", e)))?;
        let env: UserEnvelope = self.put_json("/auth/update-profile", body).await?;
        self.store().set_user(env.user.clone());
        Ok(env.user)
    }

    pub async fn update_password(&self, current_password: &str, new_password: &str) -> ApiResult<()> {
        self.put_unit(
            "/auth/update-password",
            json!({ "currentPassword": current_password, "newPassword": new_password }),
        )
        .await
    }

    pub async fn profiles(&self) -> ApiResult<Vec<User>> {
        let env: ProfilesEnvelope = self.get_json("/auth/profiles").await?;
        Ok(env.users)
    }

    /// Delete the signed-in account, then end the session locally.
    pub async fn delete_profile(&self) -> ApiResult<()> {
        self.delete_unit("/auth/delete").await?;
        self.sign_out_local();
        Ok(())
    }

    // ---- teacher onboarding ----

    pub async fn request_teacher(&self, subjects: &[String]) -> ApiResult<()> {
        self.post_unit("/auth/request-teacher", json!({ "subjects": subjects })).await
    }

    pub async fn teacher_requests(&self) -> ApiResult<Vec<TeacherRequest>> {
        self.get_json("/auth/teacher-requests").await
    }

    pub async fn approve_teacher(&self, user_id: &str, subjects: &[String]) -> ApiResult<()> {
        let path = format!("/auth/approve-teacher/{}", urlencoding::encode(user_id));
        self.put_unit(&path, json!({ "subjects": subjects })).await
    }

    pub async fn approved_teachers(&self) -> ApiResult<Vec<Teacher>> {
        self.get_json("/auth/approved-teachers").await
    }
}
