//! Client for the tracking backend.
//!
//! The backend is an external collaborator: it lists satellites, remembers
//! the selected one and serves predicted positions and orbit samples. The
//! [`TrackingBackend`] trait is the seam between the viewer and that service;
//! [`HttpBackend`] is the real implementation and tests plug in stubs.
//!
//! All calls are blocking and are meant to run on Bevy's `IoTaskPool`.

use std::sync::Arc;
use std::time::Duration;

use bevy::prelude::*;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::types::{GeographicSample, OrbitPoint, SatelliteId, SatelliteSummary};

/// Failure talking to the backend.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    #[error("{url} answered HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("server reported: {0}")]
    Server(String),

    #[error("could not decode reply from {url}: {reason}")]
    Decode { url: String, reason: String },
}

/// Operations the viewer needs from the tracking service.
pub trait TrackingBackend: Send + Sync + 'static {
    /// `GET /satellites`
    fn satellites(&self) -> Result<Vec<SatelliteSummary>, FetchError>;

    /// `POST /satellites/current`
    fn select(&self, id: &SatelliteId) -> Result<(), FetchError>;

    /// `GET /satellites/{id}/position_predicted`
    fn predicted_position(&self, id: &SatelliteId) -> Result<GeographicSample, FetchError>;

    /// `GET /satellites/{id}/orbit_predicted?n=..&step=..`
    fn predicted_orbit(
        &self,
        id: &SatelliteId,
        samples: u32,
        step_secs: u32,
    ) -> Result<Vec<OrbitPoint>, FetchError>;
}

/// Resource holding the backend used by the tracking systems.
#[derive(Resource, Clone)]
pub struct Backend(pub Arc<dyn TrackingBackend>);

impl Backend {
    pub fn new(backend: impl TrackingBackend) -> Self {
        Self(Arc::new(backend))
    }
}

/// Body of `POST /satellites/current`.
#[derive(serde::Serialize)]
struct SelectRequest<'a> {
    satellite_id: &'a str,
}

/// Position endpoint reply: either a sample or `{ "error": ... }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum PositionReply {
    Failure { error: String },
    Sample(GeographicSample),
}

/// Error object some endpoints send with non-2xx statuses.
#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// HTTP implementation of [`TrackingBackend`] on top of `ureq`.
pub struct HttpBackend {
    base_url: String,
    agent: ureq::Agent,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            agent,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn read(url: &str, result: Result<ureq::Response, ureq::Error>) -> Result<String, FetchError> {
        match result {
            Ok(response) => response.into_string().map_err(|e| FetchError::Transport {
                url: url.to_string(),
                reason: e.to_string(),
            }),
            Err(ureq::Error::Status(status, response)) => {
                // Prefer the server's own message when it sent one
                let message = response
                    .into_string()
                    .ok()
                    .and_then(|body| serde_json::from_str::<ErrorBody>(&body).ok());
                Err(match message {
                    Some(body) => FetchError::Server(body.error),
                    None => FetchError::Status {
                        url: url.to_string(),
                        status,
                    },
                })
            }
            Err(ureq::Error::Transport(transport)) => Err(FetchError::Transport {
                url: url.to_string(),
                reason: transport.to_string(),
            }),
        }
    }
}

impl TrackingBackend for HttpBackend {
    fn satellites(&self) -> Result<Vec<SatelliteSummary>, FetchError> {
        let url = self.url("/satellites");
        let body = Self::read(&url, self.agent.get(&url).call())?;
        decode(&url, &body)
    }

    fn select(&self, id: &SatelliteId) -> Result<(), FetchError> {
        let url = self.url("/satellites/current");
        let payload = serde_json::to_string(&SelectRequest {
            satellite_id: id.as_str(),
        })
        .map_err(|e| FetchError::Decode {
            url: url.clone(),
            reason: e.to_string(),
        })?;
        let result = self
            .agent
            .post(&url)
            .set("Content-Type", "application/json")
            .send_string(&payload);
        // Response body is an acknowledgement only
        Self::read(&url, result).map(|_| ())
    }

    fn predicted_position(&self, id: &SatelliteId) -> Result<GeographicSample, FetchError> {
        let url = self.url(&format!("/satellites/{id}/position_predicted"));
        let body = Self::read(&url, self.agent.get(&url).call())?;
        decode_position(&url, &body)
    }

    fn predicted_orbit(
        &self,
        id: &SatelliteId,
        samples: u32,
        step_secs: u32,
    ) -> Result<Vec<OrbitPoint>, FetchError> {
        let url = self.url(&format!("/satellites/{id}/orbit_predicted"));
        let result = self
            .agent
            .get(&url)
            .query("n", &samples.to_string())
            .query("step", &step_secs.to_string())
            .call();
        let body = Self::read(&url, result)?;
        decode(&url, &body)
    }
}

fn decode<T: DeserializeOwned>(url: &str, body: &str) -> Result<T, FetchError> {
    serde_json::from_str(body).map_err(|e| FetchError::Decode {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

/// Decode a position reply, mapping `{ "error": ... }` to [`FetchError::Server`].
pub fn decode_position(url: &str, body: &str) -> Result<GeographicSample, FetchError> {
    match decode::<PositionReply>(url, body)? {
        PositionReply::Failure { error } => Err(FetchError::Server(error)),
        PositionReply::Sample(sample) => Ok(sample),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_position_sample() {
        let body = r#"{"latitude": -12.5, "longitude": 130.0,
                       "altitude_km": 415.2, "velocity_kms": 7.66}"#;
        let sample = decode_position("u", body).unwrap();
        assert_eq!(sample.latitude, Some(-12.5));
        assert_eq!(sample.altitude_km, 415.2);
    }

    #[test]
    fn test_decode_position_server_error() {
        let body = r#"{"error": "satellite not found"}"#;
        assert_eq!(
            decode_position("u", body),
            Err(FetchError::Server("satellite not found".to_string()))
        );
    }

    #[test]
    fn test_decode_position_garbage_is_decode_error() {
        assert!(matches!(
            decode_position("u", "<html>"),
            Err(FetchError::Decode { .. })
        ));
    }

    #[test]
    fn test_decode_orbit_ignores_extra_fields() {
        let body = r#"[{"latitude": 1.0, "longitude": 2.0, "altitude": 408, "timestamp": "t"},
                       {"latitude": 1.5, "longitude": 3.0}]"#;
        let orbit: Vec<OrbitPoint> = decode("u", body).unwrap();
        assert_eq!(orbit, vec![OrbitPoint::new(1.0, 2.0), OrbitPoint::new(1.5, 3.0)]);
    }

    #[test]
    fn test_http_backend_trims_trailing_slash() {
        let backend = HttpBackend::new("http://localhost:5000/api/", Duration::from_secs(1));
        assert_eq!(backend.url("/satellites"), "http://localhost:5000/api/satellites");
    }
}
