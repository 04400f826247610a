use bevy_ecs::world::World;

use crate::{components::earth::EarthRotation, config::GlobeStyleConfig};

use super::{
    dispatch::{Command, TaskResult, TextureKind},
    geocoding::UNKNOWN_LOCATION,
    geospatial::coordinates::{CartesianPoint, CoordinatesSystem, GeoPoint},
    scene::SceneSystem,
};

/// The click to marker pipeline. Every handler mutates the scene and
/// hands back whatever network work should follow; it never waits on it.
pub struct MarkerSystem {
    marker_radius: f64,
    border_radius: f64,
    delete_threshold_deg: f64,
    focused: Option<usize>,
}

impl MarkerSystem {
    pub fn new(style: &GlobeStyleConfig) -> Self {
        Self {
            marker_radius: style.marker_radius,
            border_radius: style.border_radius,
            delete_threshold_deg: style.delete_threshold_deg,
            focused: None,
        }
    }

    pub fn startup_commands() -> Vec<Command> {
        vec![
            Command::LoadTexture(TextureKind::Day),
            Command::LoadTexture(TextureKind::Night),
            Command::LoadMarkers,
            Command::LoadBorders,
        ]
    }

    /// Geographic position under a world space hit on the spinning globe.
    pub fn geo_from_hit(world: &World, hit: CartesianPoint) -> GeoPoint {
        let local = world.resource::<EarthRotation>().to_local(hit);
        let length = local.length();
        let unit = if length > 0.0 {
            local.scaled(1.0 / length)
        } else {
            local
        };
        CoordinatesSystem::cartesian_to_lat_lon(unit)
    }

    pub fn on_globe_click(&self, world: &World, hit: CartesianPoint) -> Command {
        let geo = MarkerSystem::geo_from_hit(world, hit);
        tracing::info!(lat = geo.latitude, lon = geo.longitude, "globe clicked");
        Command::ReverseGeocode(geo)
    }

    /// Removes the marker closest to the hit. Only markers the backend knows
    /// by id produce a delete request.
    pub fn on_delete_click(&mut self, world: &mut World, hit: CartesianPoint) -> Option<Command> {
        let geo = MarkerSystem::geo_from_hit(world, hit);
        let entity = SceneSystem::nearest_marker(world, geo, self.delete_threshold_deg)?;
        let marker = SceneSystem::despawn_marker(world, entity)?;
        self.focused = None;
        tracing::info!(name = %marker.name, id = ?marker.id, "marker removed");
        marker.id.map(Command::DeleteMarker)
    }

    pub fn apply(&self, world: &mut World, result: TaskResult) -> Vec<Command> {
        match result {
            TaskResult::MarkersLoaded(Ok(records)) => {
                tracing::info!(count = records.len(), "markers loaded");
                for record in records {
                    let name = record
                        .name
                        .clone()
                        .filter(|n| !n.is_empty())
                        .unwrap_or_else(|| UNKNOWN_LOCATION.to_string());
                    SceneSystem::spawn_marker(
                        world,
                        record.id,
                        record.geo(),
                        name,
                        self.marker_radius,
                    );
                }
                Vec::new()
            }
            TaskResult::MarkersLoaded(Err(e)) => {
                tracing::warn!("could not load markers: {e}");
                Vec::new()
            }
            TaskResult::BordersLoaded(Ok(points)) => {
                let spawned = SceneSystem::spawn_border_dots(world, &points, self.border_radius);
                tracing::info!(dots = spawned, "borders loaded");
                Vec::new()
            }
            TaskResult::BordersLoaded(Err(e)) => {
                tracing::warn!("could not load borders: {e}");
                Vec::new()
            }
            TaskResult::PlaceResolved { geo, name } => {
                let name = match name {
                    Ok(Some(name)) => name,
                    Ok(None) => UNKNOWN_LOCATION.to_string(),
                    Err(e) => {
                        tracing::warn!("reverse geocoding failed: {e}");
                        UNKNOWN_LOCATION.to_string()
                    }
                };
                tracing::info!(%name, "placing marker");
                SceneSystem::spawn_marker(world, None, geo, name.clone(), self.marker_radius);
                vec![Command::SaveMarker { geo, name }]
            }
            TaskResult::MarkerSaved { geo, reply } => {
                match reply {
                    Ok(reply) => tracing::info!(
                        lat = geo.latitude,
                        lon = geo.longitude,
                        status = %reply.status,
                        "marker saved"
                    ),
                    Err(e) => tracing::warn!("could not save marker: {e}"),
                }
                Vec::new()
            }
            TaskResult::MarkerDeleted { id, reply } => {
                match reply {
                    Ok(_) => tracing::info!(id, "Marker deleted"),
                    Err(e) => tracing::warn!(id, "could not delete marker: {e}"),
                }
                Vec::new()
            }
            TaskResult::TextureLoaded { kind, .. } => {
                tracing::debug!(?kind, "texture results are handled by the renderer");
                Vec::new()
            }
        }
    }

    /// Steps through the marker list in placement order, wrapping around.
    /// Returns the marker's direction in world space for the camera.
    pub fn focus_next(&mut self, world: &mut World) -> Option<CartesianPoint> {
        let markers = SceneSystem::markers_in_order(world);
        if markers.is_empty() {
            self.focused = None;
            return None;
        }
        let index = self.focused.map_or(0, |i| (i + 1) % markers.len());
        self.focused = Some(index);

        let (_, marker) = &markers[index];
        tracing::info!(
            "[{}/{}] {} ({:.4}, {:.4})",
            index + 1,
            markers.len(),
            marker.name,
            marker.geo.latitude,
            marker.geo.longitude
        );
        Some(world.resource::<EarthRotation>().to_world(marker.position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::GlobeError,
        systems::api::{MarkerRecord, StatusReply},
    };

    fn setup() -> (World, MarkerSystem) {
        (
            SceneSystem::new_world(0.0),
            MarkerSystem::new(&GlobeStyleConfig::default()),
        )
    }

    fn records() -> Vec<MarkerRecord> {
        vec![
            MarkerRecord {
                latitude: 48.85,
                longitude: 2.35,
                name: Some("Paris".into()),
                id: Some(1),
                created_at: None,
            },
            MarkerRecord {
                latitude: 35.68,
                longitude: 139.69,
                name: None,
                id: None,
                created_at: None,
            },
        ]
    }

    #[test]
    fn click_asks_for_a_place_name() {
        let (world, markers) = setup();
        let command = markers.on_globe_click(&world, CartesianPoint::new(1.0, 0.0, 0.0));
        match command {
            Command::ReverseGeocode(geo) => {
                assert!(geo.latitude.abs() < 1e-9);
                assert!(geo.longitude.abs() < 1e-9);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn hit_is_normalized_before_inversion() {
        let (world, _) = setup();
        let geo = MarkerSystem::geo_from_hit(&world, CartesianPoint::new(0.0, 2.5, 0.0));
        assert!((geo.latitude - 90.0).abs() < 1e-9);
    }

    #[test]
    fn earth_rotation_is_undone() {
        let (mut world, _) = setup();
        world.resource_mut::<EarthRotation>().angle = std::f64::consts::FRAC_PI_2;
        // lon 0 on the equator has turned from +x to -z
        let geo = MarkerSystem::geo_from_hit(&world, CartesianPoint::new(0.0, 0.0, -1.0));
        assert!(geo.latitude.abs() < 1e-9);
        assert!(geo.longitude.abs() < 1e-9);
    }

    #[test]
    fn resolved_place_spawns_and_saves() {
        let (mut world, markers) = setup();
        let geo = GeoPoint::new(12.0, 34.0);
        let commands = markers.apply(
            &mut world,
            TaskResult::PlaceResolved {
                geo,
                name: Ok(Some("Somewhere".into())),
            },
        );
        assert_eq!(
            commands,
            vec![Command::SaveMarker {
                geo,
                name: "Somewhere".into()
            }]
        );
        let placed = SceneSystem::markers_in_order(&mut world);
        assert_eq!(placed.len(), 1);
        assert_eq!(placed[0].1.name, "Somewhere");
        assert!((placed[0].1.position.length() - 1.01).abs() < 1e-12);
    }

    #[test]
    fn geocode_failure_still_places_marker() {
        let (mut world, markers) = setup();
        let geo = GeoPoint::new(-10.0, -20.0);
        let failure = GlobeError::GeoJson("boom".into());
        let commands = markers.apply(
            &mut world,
            TaskResult::PlaceResolved {
                geo,
                name: Err(failure),
            },
        );
        assert_eq!(
            commands,
            vec![Command::SaveMarker {
                geo,
                name: UNKNOWN_LOCATION.into()
            }]
        );
        let commands = markers.apply(&mut world, TaskResult::PlaceResolved { geo, name: Ok(None) });
        assert_eq!(commands.len(), 1);
        assert_eq!(SceneSystem::marker_count(&mut world), 2);
    }

    #[test]
    fn loading_marker_list_twice_doubles_markers() {
        let (mut world, markers) = setup();
        markers.apply(&mut world, TaskResult::MarkersLoaded(Ok(records())));
        assert_eq!(SceneSystem::marker_count(&mut world), 2);
        markers.apply(&mut world, TaskResult::MarkersLoaded(Ok(records())));
        assert_eq!(SceneSystem::marker_count(&mut world), 4);
    }

    #[test]
    fn failures_leave_scene_untouched() {
        let (mut world, markers) = setup();
        let before = SceneSystem::revision(&world);
        markers.apply(
            &mut world,
            TaskResult::MarkersLoaded(Err(GlobeError::GeoJson("x".into()))),
        );
        markers.apply(
            &mut world,
            TaskResult::BordersLoaded(Err(GlobeError::GeoJson("x".into()))),
        );
        let commands = markers.apply(
            &mut world,
            TaskResult::MarkerSaved {
                geo: GeoPoint::new(0.0, 0.0),
                reply: Ok(StatusReply {
                    status: "ok".into(),
                }),
            },
        );
        assert!(commands.is_empty());
        assert_eq!(SceneSystem::revision(&world), before);
    }

    #[test]
    fn borders_become_dots() {
        let (mut world, markers) = setup();
        markers.apply(
            &mut world,
            TaskResult::BordersLoaded(Ok(vec![GeoPoint::new(1.0, 1.0), GeoPoint::new(2.0, 2.0)])),
        );
        assert_eq!(SceneSystem::border_dot_count(&mut world), 2);
    }

    #[test]
    fn delete_only_requests_backend_for_known_ids() {
        let (mut world, mut markers) = setup();
        markers.apply(&mut world, TaskResult::MarkersLoaded(Ok(records())));

        let paris = CoordinatesSystem::lat_lon_to_cartesian(GeoPoint::new(48.85, 2.35), 1.0);
        assert_eq!(
            markers.on_delete_click(&mut world, paris),
            Some(Command::DeleteMarker(1))
        );

        let tokyo = CoordinatesSystem::lat_lon_to_cartesian(GeoPoint::new(35.68, 139.69), 1.0);
        assert_eq!(markers.on_delete_click(&mut world, tokyo), None);
        assert_eq!(SceneSystem::marker_count(&mut world), 0);
    }

    #[test]
    fn delete_far_from_markers_does_nothing() {
        let (mut world, mut markers) = setup();
        markers.apply(&mut world, TaskResult::MarkersLoaded(Ok(records())));
        let ocean = CoordinatesSystem::lat_lon_to_cartesian(GeoPoint::new(-40.0, -30.0), 1.0);
        assert_eq!(markers.on_delete_click(&mut world, ocean), None);
        assert_eq!(SceneSystem::marker_count(&mut world), 2);
    }

    #[test]
    fn focus_cycles_through_markers() {
        let (mut world, mut markers) = setup();
        assert!(markers.focus_next(&mut world).is_none());

        markers.apply(&mut world, TaskResult::MarkersLoaded(Ok(records())));
        let first = markers.focus_next(&mut world).unwrap();
        let second = markers.focus_next(&mut world).unwrap();
        let again = markers.focus_next(&mut world).unwrap();
        assert_ne!(first, second);
        assert_eq!(first, again);
    }

    #[test]
    fn startup_loads_everything_once() {
        let commands = MarkerSystem::startup_commands();
        assert!(commands.contains(&Command::LoadMarkers));
        assert!(commands.contains(&Command::LoadBorders));
        assert_eq!(commands.len(), 4);
    }
}
