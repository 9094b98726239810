//! REST client for the booking service HTTP endpoints.
//!
//! Wraps passenger lookup, booking retrieval and notification session
//! issuance using [`reqwest`]. When fixture fallback is enabled, any
//! failed call is answered by an embedded [`FixtureBookingService`]
//! instead, so the client keeps working with no backend at all.

use async_trait::async_trait;
use gatewatch_core::booking::{Passenger, RetrieveBookingRequest};
use serde::Deserialize;

use crate::config::ApiConfig;
use crate::fixture::FixtureBookingService;
use crate::service::{
    BookingService, BookingServiceError, ChannelSession, CreateSessionRequest, RetrievedBooking,
};

/// HTTP client for the booking service.
pub struct HttpBookingService {
    client: reqwest::Client,
    base_url: String,
    token: String,
    /// Offline answers used when a request fails; `None` disables fallback.
    fallback: Option<FixtureBookingService>,
}

#[derive(Debug, Deserialize)]
struct PassengerMeResponse {
    passenger: Passenger,
}

impl HttpBookingService {
    /// Build a client from configuration.
    pub fn new(config: &ApiConfig) -> Result<Self, BookingServiceError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self::with_client(client, config))
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, config: &ApiConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            fallback: config.fallback_to_fixture.then(FixtureBookingService::new),
        }
    }

    /// Replace the embedded fixture (e.g. to point its sessions elsewhere).
    pub fn with_fallback(mut self, fallback: Option<FixtureBookingService>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn fallback(&self) -> Option<&FixtureBookingService> {
        self.fallback.as_ref()
    }

    // ---- private helpers ----

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder.bearer_auth(&self.token)
    }

    async fn fetch_passenger(&self) -> Result<Passenger, BookingServiceError> {
        let response = self
            .authorized(self.client.get(self.url("/api/v1/passenger/me")))
            .send()
            .await?;
        let body: PassengerMeResponse = Self::parse_response(response).await?;
        Ok(body.passenger)
    }

    async fn fetch_booking(
        &self,
        request: &RetrieveBookingRequest,
    ) -> Result<RetrievedBooking, BookingServiceError> {
        let response = self
            .authorized(self.client.get(self.url("/api/v1/bookings/retrieve")))
            .query(&[
                ("pnr", request.pnr.as_str()),
                ("lastName", request.last_name.as_str()),
            ])
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(BookingServiceError::NotFound(format!(
                "Booking {} not found",
                request.pnr
            )));
        }
        Self::parse_response(response).await
    }

    async fn post_session(
        &self,
        request: &CreateSessionRequest,
    ) -> Result<ChannelSession, BookingServiceError> {
        let response = self
            .authorized(self.client.post(self.url("/api/v1/notifications/sessions")))
            .json(request)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`BookingServiceError::Api`]
    /// containing the status and body text on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, BookingServiceError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(BookingServiceError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, BookingServiceError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl BookingService for HttpBookingService {
    async fn retrieve_booking(
        &self,
        pnr: &str,
        last_name: &str,
    ) -> Result<RetrievedBooking, BookingServiceError> {
        let request = RetrieveBookingRequest::new(pnr, last_name)?;

        match self.fetch_booking(&request).await {
            Ok(found) => Ok(found),
            Err(e) => match &self.fallback {
                Some(fixture) => {
                    tracing::warn!(error = %e, pnr = %request.pnr, "Booking retrieval failed, using fixture");
                    fixture.lookup(&request.pnr, &request.last_name)
                }
                None => Err(e),
            },
        }
    }

    async fn current_passenger(&self) -> Passenger {
        match self.fetch_passenger().await {
            Ok(passenger) => passenger,
            Err(e) => {
                tracing::warn!(error = %e, "Passenger lookup failed, using demo passenger");
                self.fallback
                    .as_ref()
                    .map(FixtureBookingService::passenger)
                    .unwrap_or_else(|| FixtureBookingService::new().passenger())
            }
        }
    }

    async fn create_channel_session(
        &self,
        request: &CreateSessionRequest,
    ) -> Result<ChannelSession, BookingServiceError> {
        match self.post_session(request).await {
            Ok(session) => {
                tracing::info!(session_id = %session.session_id, "Notification session issued");
                Ok(session)
            }
            Err(e) => match &self.fallback {
                Some(fixture) => {
                    tracing::warn!(error = %e, "Session creation failed, using fixture session");
                    Ok(fixture.session())
                }
                None => Err(e),
            },
        }
    }

    async fn close_channel_session(&self, session_id: &str) -> Result<(), BookingServiceError> {
        let mut url = reqwest::Url::parse(&self.url("/api/v1/notifications/sessions"))
            .map_err(|e| BookingServiceError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| BookingServiceError::InvalidUrl(self.base_url.clone()))?
            .push(session_id);

        let response = self.authorized(self.client.delete(url)).send().await?;
        Self::ensure_success(response).await?;
        Ok(())
    }

    fn apply_gate_change(&self, new_gate: &str) {
        if let Some(fixture) = &self.fallback {
            fixture.set_gate(new_gate);
        }
    }
}
