use thiserror::Error;

pub type GlobeResult<T> = Result<T, GlobeError>;

#[derive(Debug, Error)]
pub enum GlobeError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} answered with status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed geojson: {0}")]
    GeoJson(String),

    #[error("config parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not decode image: {0}")]
    Image(#[from] image::ImageError),
}
