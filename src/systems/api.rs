use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    config::EndpointConfig,
    error::{GlobeError, GlobeResult},
};

use super::geospatial::{borders::BordersSystem, coordinates::GeoPoint};

/// A stored marker as the backend lists it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MarkerRecord {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl MarkerRecord {
    pub fn geo(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewMarker {
    pub lat: f64,
    pub lon: f64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StatusReply {
    #[serde(default)]
    pub status: String,
}

/// Client for the marker backend and the static assets it serves.
#[derive(Debug, Clone)]
pub struct MarkerApiClient {
    http: reqwest::Client,
    base_url: String,
    borders_path: String,
}

impl MarkerApiClient {
    pub fn new(http: reqwest::Client, endpoints: &EndpointConfig) -> Self {
        Self {
            http,
            base_url: endpoints.api_base_url.trim_end_matches('/').to_string(),
            borders_path: endpoints.borders_path.clone(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn list_markers(&self) -> GlobeResult<Vec<MarkerRecord>> {
        let url = self.url("/api/markers/");
        let response = checked(self.http.get(&url).send().await?)?;
        Ok(response.json().await?)
    }

    pub async fn add_marker(&self, marker: &NewMarker) -> GlobeResult<StatusReply> {
        let url = self.url("/api/add-marker/");
        let response = checked(self.http.post(&url).json(marker).send().await?)?;
        Ok(response.json().await?)
    }

    pub async fn delete_marker(&self, id: i64) -> GlobeResult<StatusReply> {
        let url = self.url(&format!("/api/delete-marker/{id}/"));
        let response = checked(self.http.delete(&url).send().await?)?;
        Ok(response.json().await?)
    }

    pub async fn border_points(&self) -> GlobeResult<Vec<GeoPoint>> {
        let url = self.url(&self.borders_path);
        let body = checked(self.http.get(&url).send().await?)?
            .text()
            .await?;
        BordersSystem::border_points_from_geojson(&body)
    }

    pub async fn fetch_bytes(&self, path: &str) -> GlobeResult<Vec<u8>> {
        let url = self.url(path);
        let bytes = checked(self.http.get(&url).send().await?)?
            .bytes()
            .await?;
        Ok(bytes.to_vec())
    }
}

/// Turns any non-2xx reply into [`GlobeError::Status`] before the body is read.
pub(crate) fn checked(response: reqwest::Response) -> GlobeResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(GlobeError::Status {
            url: response.url().to_string(),
            status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> MarkerApiClient {
        let endpoints = EndpointConfig {
            api_base_url: base.to_string(),
            ..EndpointConfig::default()
        };
        MarkerApiClient::new(reqwest::Client::new(), &endpoints)
    }

    #[test]
    fn urls_join_without_double_slashes() {
        let api = client("http://localhost:8000/");
        assert_eq!(api.url("/api/markers/"), "http://localhost:8000/api/markers/");
        assert_eq!(api.url("api/markers/"), "http://localhost:8000/api/markers/");
    }

    #[test]
    fn marker_list_accepts_bare_coordinates() {
        let body = r#"[{"latitude": 48.85, "longitude": 2.35}, {"latitude": -33.9, "longitude": 151.2}]"#;
        let records: Vec<MarkerRecord> = serde_json::from_str(body).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].geo(), GeoPoint::new(48.85, 2.35));
        assert_eq!(records[1].name, None);
        assert_eq!(records[1].id, None);
    }

    #[test]
    fn marker_list_reads_optional_fields() {
        let body = r#"[{
            "latitude": 1.0, "longitude": 2.0, "name": "Somewhere", "id": 17,
            "created_at": "2024-03-01T12:00:00Z", "user": 3
        }]"#;
        let records: Vec<MarkerRecord> = serde_json::from_str(body).unwrap();
        assert_eq!(records[0].id, Some(17));
        assert_eq!(records[0].name.as_deref(), Some("Somewhere"));
        assert!(records[0].created_at.is_some());
    }

    #[test]
    fn new_marker_uses_short_keys() {
        let body = serde_json::to_value(NewMarker {
            lat: 1.5,
            lon: -2.5,
            name: "Here".to_string(),
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"lat": 1.5, "lon": -2.5, "name": "Here"})
        );
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod http_tests {
    use super::*;
    use crate::systems::stub_server::{request_line_and_body, StubServer};

    fn client(base: &str) -> MarkerApiClient {
        let endpoints = EndpointConfig {
            api_base_url: base.to_string(),
            ..EndpointConfig::default()
        };
        MarkerApiClient::new(reqwest::Client::new(), &endpoints)
    }

    #[tokio::test]
    async fn missing_marker_list_is_a_status_error() {
        let server = StubServer::reply("404 Not Found", r#"{"detail": "Not found."}"#).await;
        let err = client(&server.base_url).list_markers().await.unwrap_err();

        match err {
            GlobeError::Status { url, status } => {
                assert_eq!(status, reqwest::StatusCode::NOT_FOUND);
                assert!(url.ends_with("/api/markers/"), "{url}");
            }
            other => panic!("expected a status error, got {other:?}"),
        }
        let raw = server.request().await;
        let (line, _) = request_line_and_body(&raw);
        assert_eq!(line, "GET /api/markers/ HTTP/1.1");
    }

    #[tokio::test]
    async fn marker_list_is_parsed_on_success() {
        let server = StubServer::reply(
            "200 OK",
            r#"[{"latitude": 51.5, "longitude": -0.12, "name": "London", "id": 3}]"#,
        )
        .await;
        let records = client(&server.base_url).list_markers().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, Some(3));
        assert_eq!(records[0].geo(), GeoPoint::new(51.5, -0.12));
    }

    #[tokio::test]
    async fn add_marker_posts_json_to_add_marker() {
        let server = StubServer::reply("200 OK", r#"{"status": "ok"}"#).await;
        let reply = client(&server.base_url)
            .add_marker(&NewMarker {
                lat: 48.85,
                lon: 2.35,
                name: "Paris".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(reply.status, "ok");

        let raw = server.request().await;
        let (line, body) = request_line_and_body(&raw);
        assert_eq!(line, "POST /api/add-marker/ HTTP/1.1");
        assert!(raw.to_ascii_lowercase().contains("content-type: application/json"));
        let body: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"lat": 48.85, "lon": 2.35, "name": "Paris"})
        );
    }

    #[tokio::test]
    async fn delete_marker_targets_its_id() {
        let server = StubServer::reply("200 OK", r#"{"status": "deleted"}"#).await;
        let reply = client(&server.base_url).delete_marker(42).await.unwrap();
        assert_eq!(reply.status, "deleted");

        let raw = server.request().await;
        let (line, _) = request_line_and_body(&raw);
        assert_eq!(line, "DELETE /api/delete-marker/42/ HTTP/1.1");
    }

    #[tokio::test]
    async fn server_errors_on_delete_are_status_errors() {
        let server = StubServer::reply("500 Internal Server Error", "oops").await;
        let err = client(&server.base_url).delete_marker(7).await.unwrap_err();
        assert!(matches!(
            err,
            GlobeError::Status { status, .. } if status == reqwest::StatusCode::INTERNAL_SERVER_ERROR
        ));
    }
}
