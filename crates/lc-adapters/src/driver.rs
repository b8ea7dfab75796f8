// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Target-site automation driver. Implementations are expected to honour a
//! 30s action timeout; the worker runtime does not enforce it itself.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("action timed out")]
    Timeout,
    #[error("target site error: {0}")]
    Other(String),
}

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub ok: bool,
    pub nickname: Option<String>,
    pub challenge: bool,
}

#[derive(Debug, Clone)]
pub struct VerifyOutcome {
    pub ok: bool,
    pub nickname: Option<String>,
}

/// Error category taxonomy surfaced to the dashboard on `CREATE_POST`
/// failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    LoginRequired,
    PermissionDenied,
    EditorLoadFail,
    ImageUploadFail,
    NetworkError,
    CafeNotFound,
    RateLimited,
    Unknown,
}

lc_core::simple_display! {
    ErrorCategory {
        LoginRequired => "LOGIN_REQUIRED",
        PermissionDenied => "PERMISSION_DENIED",
        EditorLoadFail => "EDITOR_LOAD_FAIL",
        ImageUploadFail => "IMAGE_UPLOAD_FAIL",
        NetworkError => "NETWORK_ERROR",
        CafeNotFound => "CAFE_NOT_FOUND",
        RateLimited => "RATE_LIMITED",
        Unknown => "UNKNOWN",
    }
}

#[derive(Debug, Clone)]
pub struct PostPayload {
    pub subject: String,
    pub body: String,
    pub image_paths: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct PostOutcome {
    pub ok: bool,
    pub article_id: Option<String>,
    pub article_url: Option<String>,
    pub error_category: Option<ErrorCategory>,
}

#[async_trait]
pub trait TargetSiteDriver: Send + Sync {
    async fn open_profile(&self, profile_handle: &str) -> Result<(), DriverError>;
    async fn login(&self, login_name: &str, plain_password: &str) -> Result<LoginOutcome, DriverError>;
    async fn verify_login(&self) -> Result<VerifyOutcome, DriverError>;
    async fn create_post(&self, payload: PostPayload) -> Result<PostOutcome, DriverError>;
    async fn sync_my_posts(&self) -> Result<(), DriverError>;
    async fn delete_post(&self, article_id: &str) -> Result<(), DriverError>;
}

/// A deterministic fake driver for tests: every profile logs in
/// successfully and every post "succeeds", unless pre-seeded otherwise.
#[derive(Default)]
pub struct MockDriver {
    login_results: Mutex<HashMap<String, LoginOutcome>>,
    post_results: Mutex<Vec<PostOutcome>>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_login(&self, login_name: &str, outcome: LoginOutcome) {
        self.login_results.lock().insert(login_name.to_string(), outcome);
    }

    /// Queue outcomes returned by `create_post`, in order.
    pub fn seed_posts(&self, outcomes: Vec<PostOutcome>) {
        *self.post_results.lock() = outcomes;
    }
}

#[async_trait]
impl TargetSiteDriver for MockDriver {
    async fn open_profile(&self, _profile_handle: &str) -> Result<(), DriverError> {
        Ok(())
    }

    async fn login(&self, login_name: &str, _plain_password: &str) -> Result<LoginOutcome, DriverError> {
        Ok(self.login_results.lock().get(login_name).cloned().unwrap_or(LoginOutcome {
            ok: true,
            nickname: Some(format!("{login_name}-nick")),
            challenge: false,
        }))
    }

    async fn verify_login(&self) -> Result<VerifyOutcome, DriverError> {
        Ok(VerifyOutcome { ok: true, nickname: None })
    }

    async fn create_post(&self, _payload: PostPayload) -> Result<PostOutcome, DriverError> {
        let mut queued = self.post_results.lock();
        if !queued.is_empty() {
            return Ok(queued.remove(0));
        }
        Ok(PostOutcome { ok: true, article_id: Some("art-1".into()), article_url: Some("https://example.invalid/art-1".into()), error_category: None })
    }

    async fn sync_my_posts(&self) -> Result<(), DriverError> {
        Ok(())
    }

    async fn delete_post(&self, _article_id: &str) -> Result<(), DriverError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_driver_defaults_to_success() {
        let driver = MockDriver::new();
        driver.open_profile("p1").await.unwrap();
        let login = driver.login("user", "pw").await.unwrap();
        assert!(login.ok);
        let post = driver
            .create_post(PostPayload { subject: "s".into(), body: "b".into(), image_paths: vec![] })
            .await
            .unwrap();
        assert!(post.ok);
    }

    #[tokio::test]
    async fn seeded_login_outcome_is_used() {
        let driver = MockDriver::new();
        driver.seed_login("user", LoginOutcome { ok: false, nickname: None, challenge: true });
        let login = driver.login("user", "pw").await.unwrap();
        assert!(!login.ok);
        assert!(login.challenge);
    }

    #[tokio::test]
    async fn seeded_post_outcomes_drain_in_order() {
        let driver = MockDriver::new();
        driver.seed_posts(vec![
            PostOutcome { ok: false, article_id: None, article_url: None, error_category: Some(ErrorCategory::NetworkError) },
            PostOutcome { ok: true, article_id: Some("art-2".into()), article_url: None, error_category: None },
        ]);
        let payload = || PostPayload { subject: "s".into(), body: "b".into(), image_paths: vec![] };
        let first = driver.create_post(payload()).await.unwrap();
        assert!(!first.ok);
        let second = driver.create_post(payload()).await.unwrap();
        assert!(second.ok);
    }
}
