//! Viewer configuration.
//!
//! Every field has a default so an empty (or missing) YAML file yields the
//! same globe the viewer shows out of the box.

use std::path::Path;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::error::GlobeResult;

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct GlobeConfig {
    #[validate(nested)]
    pub endpoints: EndpointConfig,

    #[validate(nested)]
    pub globe: GlobeStyleConfig,

    #[validate(nested)]
    pub camera: CameraConfig,
}

impl GlobeConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> GlobeResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> GlobeResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }
}

/// Where the viewer talks to. Paths are joined onto `api_base_url`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct EndpointConfig {
    #[validate(url)]
    pub api_base_url: String,

    #[validate(url)]
    pub geocoder_url: String,

    #[validate(length(min = 1))]
    pub user_agent: String,

    pub borders_path: String,
    pub day_texture_path: String,
    pub night_texture_path: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8000".to_string(),
            geocoder_url: "https://nominatim.openstreetmap.org/reverse".to_string(),
            user_agent: concat!("markerglobe/", env!("CARGO_PKG_VERSION")).to_string(),
            borders_path: "/static/globe/world.geo.json".to_string(),
            day_texture_path: "/static/globe/textures/earth.jpg".to_string(),
            night_texture_path: "/static/globe/textures/earth_night.jpg".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct GlobeStyleConfig {
    /// Radius markers are lifted to, just above the unit globe.
    #[validate(range(min = 1.0))]
    pub marker_radius: f64,

    #[validate(range(min = 1.0))]
    pub border_radius: f64,

    #[validate(range(exclusive_min = 0.0))]
    pub marker_size: f32,

    #[validate(range(exclusive_min = 0.0))]
    pub border_dot_size: f32,

    /// World space height of a place name label.
    #[validate(range(exclusive_min = 0.0))]
    pub label_height: f32,

    /// Radians per frame about the polar axis.
    pub rotation_speed: f64,

    /// Right clicks further than this from every marker delete nothing.
    #[validate(range(exclusive_min = 0.0, max = 180.0))]
    pub delete_threshold_deg: f64,

    #[validate(range(min = 3, max = 512))]
    pub segments: u32,
}

impl Default for GlobeStyleConfig {
    fn default() -> Self {
        Self {
            marker_radius: 1.01,
            border_radius: 1.001,
            marker_size: 0.02,
            border_dot_size: 0.002,
            label_height: 0.04,
            rotation_speed: 0.0005,
            delete_threshold_deg: 3.0,
            segments: 64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
#[validate(schema(function = "validate_distance_bounds"))]
pub struct CameraConfig {
    #[validate(range(exclusive_min = 0.0, exclusive_max = 180.0))]
    pub fovy: f32,

    #[validate(range(exclusive_min = 0.0))]
    pub znear: f32,

    #[validate(range(exclusive_min = 0.0))]
    pub zfar: f32,

    pub distance: f32,

    /// Closest the camera may orbit; must stay outside the globe.
    #[validate(range(exclusive_min = 1.0))]
    pub min_distance: f32,

    pub max_distance: f32,

    /// Fraction of orbit velocity shed each frame.
    #[validate(range(min = 0.0, max = 1.0))]
    pub damping: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fovy: 45.0,
            znear: 0.1,
            zfar: 1000.0,
            distance: 3.0,
            min_distance: 1.5,
            max_distance: 5.0,
            damping: 0.1,
        }
    }
}

fn validate_distance_bounds(camera: &CameraConfig) -> Result<(), ValidationError> {
    if camera.min_distance >= camera.max_distance {
        return Err(ValidationError::new("min_distance_not_below_max_distance"));
    }
    if camera.distance < camera.min_distance || camera.distance > camera.max_distance {
        return Err(ValidationError::new("distance_outside_bounds"));
    }
    if camera.znear >= camera.zfar {
        return Err(ValidationError::new("znear_not_below_zfar"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GlobeError;

    #[test]
    fn empty_yaml_gives_defaults() {
        let config = GlobeConfig::from_yaml("{}").unwrap();
        assert_eq!(config.globe.marker_radius, 1.01);
        assert_eq!(config.globe.border_radius, 1.001);
        assert_eq!(config.camera.distance, 3.0);
        assert_eq!(
            config.endpoints.geocoder_url,
            "https://nominatim.openstreetmap.org/reverse"
        );
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let yaml = "endpoints:\n  api_base_url: \"http://globe.local:9000\"\ncamera:\n  max_distance: 8.0\n";
        let config = GlobeConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.endpoints.api_base_url, "http://globe.local:9000");
        assert_eq!(config.endpoints.borders_path, "/static/globe/world.geo.json");
        assert_eq!(config.camera.max_distance, 8.0);
        assert_eq!(config.camera.min_distance, 1.5);
    }

    #[test]
    fn inverted_distance_bounds_are_rejected() {
        let yaml = "camera:\n  min_distance: 4.0\n  max_distance: 2.0\n  distance: 3.0\n";
        let err = GlobeConfig::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, GlobeError::Validation(_)));
    }

    #[test]
    fn marker_radius_inside_globe_is_rejected() {
        let yaml = "globe:\n  marker_radius: 0.5\n";
        assert!(matches!(
            GlobeConfig::from_yaml(yaml),
            Err(GlobeError::Validation(_))
        ));
    }

    #[test]
    fn flat_labels_are_rejected() {
        let yaml = "globe:\n  label_height: 0.0\n";
        assert!(matches!(
            GlobeConfig::from_yaml(yaml),
            Err(GlobeError::Validation(_))
        ));
    }

    #[test]
    fn unknown_fields_fail_parsing() {
        let yaml = "globe:\n  marker_colour: red\n";
        assert!(matches!(
            GlobeConfig::from_yaml(yaml),
            Err(GlobeError::Yaml(_))
        ));
    }

    #[test]
    fn malformed_api_url_is_rejected() {
        let yaml = "endpoints:\n  api_base_url: \"not a url\"\n";
        assert!(matches!(
            GlobeConfig::from_yaml(yaml),
            Err(GlobeError::Validation(_))
        ));
    }
}
