//! Meeting provider adapters.

use crate::providers::{
    MeetingError, MeetingLink, MeetingProvider, MeetingRequest, ProviderFuture,
};
use std::time::Duration;

/// Creates meetings through a JSON HTTP endpoint.
///
/// `POST {base_url}/meetings` with a [`MeetingRequest`] body; the response
/// body must be a [`MeetingLink`].
#[derive(Debug, Clone)]
pub struct HttpMeetingProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpMeetingProvider {
    /// Create a provider for `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`MeetingError::Unavailable`] if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, MeetingError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MeetingError::Unavailable(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

impl MeetingProvider for HttpMeetingProvider {
    fn create_meeting(
        &self,
        request: MeetingRequest,
    ) -> ProviderFuture<'_, Result<MeetingLink, MeetingError>> {
        Box::pin(async move {
            let mut builder = self
                .client
                .post(format!("{}/meetings", self.base_url))
                .json(&request);
            if let Some(key) = &self.api_key {
                builder = builder.bearer_auth(key);
            }

            let response = builder.send().await.map_err(|e| {
                if e.is_timeout() {
                    MeetingError::Timeout
                } else {
                    MeetingError::Unavailable(e.to_string())
                }
            })?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                tracing::warn!(
                    %status,
                    appointment_id = %request.appointment_id,
                    "Meeting provider rejected request"
                );
                return Err(MeetingError::Rejected(format!("{status}: {body}")));
            }

            response
                .json::<MeetingLink>()
                .await
                .map_err(|e| MeetingError::Rejected(format!("invalid response body: {e}")))
        })
    }
}

/// Provider used when no meeting backend is configured.
///
/// Every request fails, so resources with a meeting profile get their
/// appointments committed with a failed meeting status.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredMeetingProvider;

impl MeetingProvider for UnconfiguredMeetingProvider {
    fn create_meeting(
        &self,
        _request: MeetingRequest,
    ) -> ProviderFuture<'_, Result<MeetingLink, MeetingError>> {
        Box::pin(async { Err(MeetingError::NotConfigured) })
    }
}
