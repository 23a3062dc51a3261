//! Settings backend HTTP client.
//!
//! Provides public reads of single settings and admin-authenticated writes,
//! deletes, bulk reads and the login/logout/verify exchange.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use mission_core::{
    ADMIN_TOKEN_HEADER, AdminIdentity, AdminToken, AllSettingsResponse, ErrorBody, LoginRequest,
    LoginResponse, SettingEnvelope, SettingKey, VerifyResponse, WriteSettingBody,
};
use reqwest::{RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use crate::config::ClientConfig;

use super::error::ApiError;

/// TCP connect timeout for backend requests.
///
/// Reads and writes have no overall deadline; only establishing the
/// connection is bounded.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings backend API client.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a client for the backend configured in `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL cannot carry path segments or the
    /// HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        Self::with_base_url(config.api_url.clone())
    }

    /// Create a client for an explicit base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL cannot carry path segments or the
    /// HTTP client cannot be built.
    pub fn with_base_url(base_url: Url) -> Result<Self, ApiError> {
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidBaseUrl(base_url.to_string()));
        }

        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner { client, base_url }),
        })
    }

    /// Backend base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    // =========================================================================
    // Settings
    // =========================================================================

    /// Read a setting.
    ///
    /// Returns `Ok(None)` when the key was never written.
    ///
    /// # Errors
    ///
    /// Returns an error on network failure, a non-success status, or an
    /// undecodable body. Callers binding settings treat all of these as
    /// absence.
    #[instrument(skip(self), fields(key = %key))]
    pub async fn get_setting(&self, key: &SettingKey) -> Result<Option<Value>, ApiError> {
        let url = self.endpoint(&["settings", key.as_str()])?;
        let response = self.inner.client.get(url).send().await?;
        let envelope: SettingEnvelope = Self::decode(response).await?;
        Ok(envelope.into_value())
    }

    /// Write a setting.
    ///
    /// # Errors
    ///
    /// Returns an error on network failure or when the backend rejects the
    /// write; the error text is the backend's when it provided one.
    #[instrument(skip(self, token, value), fields(key = %key))]
    pub async fn put_setting(
        &self,
        token: &AdminToken,
        key: &SettingKey,
        value: &Value,
    ) -> Result<(), ApiError> {
        let url = self.endpoint(&["admin", "settings", key.as_str()])?;
        let body = WriteSettingBody {
            value: value.clone(),
        };
        let request = Self::authed(self.inner.client.put(url), token).json(&body);
        Self::expect_success(request.send().await?).await?;
        debug!("Setting written");
        Ok(())
    }

    /// Delete a setting, reverting subsequent reads to absence.
    ///
    /// # Errors
    ///
    /// Returns an error on network failure or when the backend rejects the
    /// delete.
    #[instrument(skip(self, token), fields(key = %key))]
    pub async fn delete_setting(&self, token: &AdminToken, key: &SettingKey) -> Result<(), ApiError> {
        let url = self.endpoint(&["admin", "settings", key.as_str()])?;
        let request = Self::authed(self.inner.client.delete(url), token);
        Self::expect_success(request.send().await?).await?;
        debug!("Setting deleted");
        Ok(())
    }

    /// Read every stored setting (monitoring).
    ///
    /// # Errors
    ///
    /// Returns an error on network failure, rejection, or an undecodable body.
    #[instrument(skip(self, token))]
    pub async fn all_settings(&self, token: &AdminToken) -> Result<BTreeMap<String, Value>, ApiError> {
        let url = self.endpoint(&["admin", "all-settings"])?;
        let response = Self::authed(self.inner.client.get(url), token).send().await?;
        let all: AllSettingsResponse = Self::decode(response).await?;
        Ok(all.into_map())
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Exchange admin credentials for a token.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Network`] if the backend could not be reached and
    /// [`ApiError::Status`] or [`ApiError::Rejected`] if the credentials were
    /// refused.
    #[instrument(skip(self, password), fields(username = %username))]
    pub async fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<(AdminToken, AdminIdentity), ApiError> {
        let url = self.endpoint(&["admin", "auth", "login"])?;
        let body = LoginRequest {
            username: username.to_owned(),
            password: password.expose_secret().to_owned(),
        };
        let response = self.inner.client.post(url).json(&body).send().await?;
        let login: LoginResponse = Self::decode(response).await?;

        match login {
            LoginResponse {
                success: true,
                token: Some(token),
                admin: Some(admin),
                ..
            } if !token.is_empty() => Ok((token, admin)),
            LoginResponse { error, .. } => Err(ApiError::Rejected(
                error.unwrap_or_else(|| "Invalid credentials".to_owned()),
            )),
        }
    }

    /// Invalidate a token server-side.
    ///
    /// # Errors
    ///
    /// Returns an error on network failure or a non-success status.
    #[instrument(skip(self, token))]
    pub async fn logout(&self, token: &AdminToken) -> Result<(), ApiError> {
        let url = self.endpoint(&["admin", "auth", "logout"])?;
        let request = Self::authed(self.inner.client.post(url), token);
        Self::expect_success(request.send().await?).await?;
        Ok(())
    }

    /// Check a token and fetch the admin it belongs to.
    ///
    /// # Errors
    ///
    /// Returns an error on network failure, a non-success status, or an
    /// undecodable body.
    #[instrument(skip(self, token))]
    pub async fn verify(&self, token: &AdminToken) -> Result<AdminIdentity, ApiError> {
        let url = self.endpoint(&["admin", "auth", "verify"])?;
        let response = Self::authed(self.inner.client.get(url), token).send().await?;
        let verified: VerifyResponse = Self::decode(response).await?;
        Ok(verified.admin)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidBaseUrl(self.inner.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authed(request: RequestBuilder, token: &AdminToken) -> RequestBuilder {
        request.header(ADMIN_TOKEN_HEADER, token.expose())
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let response = Self::expect_success(response).await?;
        response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn expect_success(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.text().map(str::to_owned))
            .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16()));

        Err(ApiError::Status { status, message })
    }
}
