use bevy_ecs::{entity::Entity, world::World};

use crate::components::{
    earth::EarthRotation,
    marker::{BorderDotComponent, MarkerComponent, MarkerSequence, SceneRevision},
    mesh::DotInstance,
};

use super::geospatial::coordinates::{CoordinatesSystem, GeoPoint};

const MARKER_COLOR: [f32; 4] = [1.0, 0.0, 0.0, 1.0];
const HEAT_COLOR: [f32; 4] = [1.0, 0.0, 0.0, 0.3];
const HEAT_SCALE: f32 = 4.0;
const BORDER_COLOR: [f32; 4] = [1.0, 1.0, 1.0, 1.0];
/// Labels float a little further out than the marker they name.
pub const LABEL_LIFT: f64 = 1.05;

/// What the label layer needs to know about one marker.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerLabel {
    pub entity: Entity,
    pub text: String,
    pub anchor: [f32; 3],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerStyle {
    Dot,
    Heatmap,
}

impl MarkerStyle {
    pub fn toggled(self) -> Self {
        match self {
            MarkerStyle::Dot => MarkerStyle::Heatmap,
            MarkerStyle::Heatmap => MarkerStyle::Dot,
        }
    }

    fn instance(self, offset: [f32; 3], size: f32) -> DotInstance {
        match self {
            MarkerStyle::Dot => DotInstance {
                offset,
                scale: size,
                color: MARKER_COLOR,
            },
            MarkerStyle::Heatmap => DotInstance {
                offset,
                scale: size * HEAT_SCALE,
                color: HEAT_COLOR,
            },
        }
    }
}

/// Owns every query and mutation of the scene world, so the revision
/// counter can't be skipped.
pub struct SceneSystem {}

impl SceneSystem {
    pub fn new_world(rotation_speed: f64) -> World {
        let mut world = World::new();
        world.insert_resource(SceneRevision::default());
        world.insert_resource(EarthRotation::new(rotation_speed));
        world
    }

    pub fn revision(world: &World) -> u64 {
        world.resource::<SceneRevision>().0
    }

    fn bump(world: &mut World) -> u64 {
        let mut revision = world.resource_mut::<SceneRevision>();
        revision.0 += 1;
        revision.0
    }

    pub fn spawn_marker(
        world: &mut World,
        id: Option<i64>,
        geo: GeoPoint,
        name: String,
        radius: f64,
    ) -> Entity {
        let position = CoordinatesSystem::lat_lon_to_cartesian(geo, radius);
        let sequence = SceneSystem::bump(world);
        world
            .spawn((
                MarkerComponent {
                    id,
                    geo,
                    name,
                    position,
                },
                MarkerSequence(sequence),
            ))
            .id()
    }

    pub fn spawn_border_dots(world: &mut World, points: &[GeoPoint], radius: f64) -> usize {
        let spawned = world
            .spawn_batch(points.iter().map(|&geo| BorderDotComponent {
                position: CoordinatesSystem::lat_lon_to_cartesian(geo, radius),
            }))
            .count();
        if spawned > 0 {
            SceneSystem::bump(world);
        }
        spawned
    }

    pub fn despawn_marker(world: &mut World, entity: Entity) -> Option<MarkerComponent> {
        let marker = world.get::<MarkerComponent>(entity).cloned()?;
        world.despawn(entity);
        SceneSystem::bump(world);
        Some(marker)
    }

    pub fn marker(world: &World, entity: Entity) -> Option<&MarkerComponent> {
        world.get::<MarkerComponent>(entity)
    }

    /// Markers in the order they were placed or loaded.
    pub fn markers_in_order(world: &mut World) -> Vec<(Entity, MarkerComponent)> {
        let mut query = world.query::<(Entity, &MarkerComponent, &MarkerSequence)>();
        let mut markers: Vec<_> = query
            .iter(world)
            .map(|(entity, marker, sequence)| (*sequence, entity, marker.clone()))
            .collect();
        markers.sort_by_key(|(sequence, _, _)| *sequence);
        markers
            .into_iter()
            .map(|(_, entity, marker)| (entity, marker))
            .collect()
    }

    pub fn marker_count(world: &mut World) -> usize {
        world.query::<&MarkerComponent>().iter(world).count()
    }

    pub fn border_dot_count(world: &mut World) -> usize {
        world.query::<&BorderDotComponent>().iter(world).count()
    }

    /// Closest marker to `geo` no further than `max_angle_deg` of arc.
    pub fn nearest_marker(world: &mut World, geo: GeoPoint, max_angle_deg: f64) -> Option<Entity> {
        world
            .query::<(Entity, &MarkerComponent)>()
            .iter(world)
            .map(|(entity, marker)| {
                (
                    entity,
                    CoordinatesSystem::angular_distance_deg(geo, marker.geo),
                )
            })
            .filter(|(_, angle)| *angle <= max_angle_deg)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(entity, _)| entity)
    }

    pub fn marker_instances(world: &mut World, style: MarkerStyle, size: f32) -> Vec<DotInstance> {
        world
            .query::<&MarkerComponent>()
            .iter(world)
            .map(|marker| style.instance(marker.position.to_array(), size))
            .collect()
    }

    /// One label per marker, in placement order.
    pub fn marker_labels(world: &mut World) -> Vec<MarkerLabel> {
        SceneSystem::markers_in_order(world)
            .into_iter()
            .map(|(entity, marker)| MarkerLabel {
                entity,
                anchor: marker.position.scaled(LABEL_LIFT).to_array(),
                text: marker.name,
            })
            .collect()
    }

    pub fn border_instances(world: &mut World, size: f32) -> Vec<DotInstance> {
        world
            .query::<&BorderDotComponent>()
            .iter(world)
            .map(|dot| DotInstance {
                offset: dot.position.to_array(),
                scale: size,
                color: BORDER_COLOR,
            })
            .collect()
    }
}
