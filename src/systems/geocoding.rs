use serde::Deserialize;

use crate::{config::EndpointConfig, error::GlobeResult};

use super::{api::checked, geospatial::coordinates::GeoPoint};

pub const UNKNOWN_LOCATION: &str = "Unknown location";

#[derive(Debug, Deserialize)]
struct ReverseReply {
    #[serde(default)]
    display_name: Option<String>,
}

/// Reverse geocoding against a Nominatim compatible `/reverse` endpoint.
#[derive(Debug, Clone)]
pub struct ReverseGeocoder {
    http: reqwest::Client,
    endpoint: String,
}

impl ReverseGeocoder {
    pub fn new(http: reqwest::Client, endpoints: &EndpointConfig) -> Self {
        Self {
            http,
            endpoint: endpoints.geocoder_url.clone(),
        }
    }

    /// `Ok(None)` when the service knows nothing about the spot (open sea).
    /// Rate limiting and outages come back as `GlobeError::Status`.
    pub async fn place_name(&self, geo: GeoPoint) -> GlobeResult<Option<String>> {
        let response = self
            .http
            .get(&self.endpoint)
            .query(&[
                ("format", "json".to_string()),
                ("lat", geo.latitude.to_string()),
                ("lon", geo.longitude.to_string()),
            ])
            .send()
            .await?;
        let body = checked(response)?.text().await?;
        ReverseGeocoder::parse_reply(&body)
    }

    pub fn parse_reply(body: &str) -> GlobeResult<Option<String>> {
        let reply: ReverseReply = serde_json::from_str(body)?;
        Ok(reply.display_name.filter(|name| !name.trim().is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_is_read() {
        let body = r#"{"place_id": 1, "display_name": "Paris, Île-de-France, France", "lat": "48.8"}"#;
        assert_eq!(
            ReverseGeocoder::parse_reply(body).unwrap().as_deref(),
            Some("Paris, Île-de-France, France")
        );
    }

    #[test]
    fn error_replies_have_no_name() {
        let body = r#"{"error": "Unable to geocode"}"#;
        assert_eq!(ReverseGeocoder::parse_reply(body).unwrap(), None);
    }

    #[test]
    fn blank_names_count_as_missing() {
        assert_eq!(
            ReverseGeocoder::parse_reply(r#"{"display_name": "  "}"#).unwrap(),
            None
        );
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod http_tests {
    use super::*;
    use crate::{
        error::GlobeError,
        systems::stub_server::{request_line_and_body, StubServer},
    };

    fn geocoder(base: &str) -> ReverseGeocoder {
        let endpoints = EndpointConfig {
            geocoder_url: format!("{base}/reverse"),
            ..EndpointConfig::default()
        };
        ReverseGeocoder::new(reqwest::Client::new(), &endpoints)
    }

    #[tokio::test]
    async fn query_carries_format_and_coordinates() {
        let server = StubServer::reply("200 OK", r#"{"display_name": "Paris, France"}"#).await;
        let name = geocoder(&server.base_url)
            .place_name(GeoPoint::new(48.85, 2.35))
            .await
            .unwrap();
        assert_eq!(name.as_deref(), Some("Paris, France"));

        let raw = server.request().await;
        let (line, _) = request_line_and_body(&raw);
        assert_eq!(line, "GET /reverse?format=json&lat=48.85&lon=2.35 HTTP/1.1");
    }

    #[tokio::test]
    async fn rate_limited_reply_is_a_status_error() {
        let server =
            StubServer::reply("429 Too Many Requests", "<html>slow down</html>").await;
        let err = geocoder(&server.base_url)
            .place_name(GeoPoint::new(0.0, 0.0))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GlobeError::Status { status, .. } if status == reqwest::StatusCode::TOO_MANY_REQUESTS
        ));
    }
}
