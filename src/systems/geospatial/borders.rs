use serde::Deserialize;

use crate::error::{GlobeError, GlobeResult};

use super::coordinates::GeoPoint;

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    geometry: Option<Geometry>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    #[serde(rename = "type")]
    ty: String,
    #[serde(default)]
    coordinates: serde_json::Value,
}

pub struct BordersSystem {}

impl BordersSystem {
    /// Flattens the outer ring of every country polygon into a list of
    /// border positions. Holes, non-polygon geometry and malformed
    /// coordinate pairs are skipped.
    pub fn border_points_from_geojson(body: &str) -> GlobeResult<Vec<GeoPoint>> {
        let collection: FeatureCollection = serde_json::from_str(body)?;

        let mut points = Vec::new();
        for geometry in collection.features.into_iter().filter_map(|f| f.geometry) {
            match geometry.ty.as_str() {
                "Polygon" => {
                    let rings = geometry.coordinates.as_array().ok_or_else(|| {
                        GlobeError::GeoJson("Polygon coordinates are not an array".to_string())
                    })?;
                    BordersSystem::push_outer_ring(rings, &mut points);
                }
                "MultiPolygon" => {
                    let polygons = geometry.coordinates.as_array().ok_or_else(|| {
                        GlobeError::GeoJson(
                            "MultiPolygon coordinates are not an array".to_string(),
                        )
                    })?;
                    for rings in polygons.iter().filter_map(|p| p.as_array()) {
                        BordersSystem::push_outer_ring(rings, &mut points);
                    }
                }
                other => tracing::debug!("skipping {other} geometry in border data"),
            }
        }

        Ok(points)
    }

    fn push_outer_ring(rings: &[serde_json::Value], out: &mut Vec<GeoPoint>) {
        let Some(outer) = rings.first().and_then(|r| r.as_array()) else {
            return;
        };
        // GeoJSON positions are [longitude, latitude, (altitude)]
        out.extend(outer.iter().filter_map(|position| {
            let pair = position.as_array()?;
            let lon = pair.first()?.as_f64()?;
            let lat = pair.get(1)?.as_f64()?;
            Some(GeoPoint::new(lat, lon))
        }));
    }
}
