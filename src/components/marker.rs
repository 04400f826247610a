use bevy_ecs::{component::Component, system::Resource};

use crate::systems::geospatial::coordinates::{CartesianPoint, GeoPoint};

#[derive(Component, Debug, Clone, PartialEq)]
pub struct MarkerComponent {
    /// Backend id, when the marker came from the marker list.
    pub id: Option<i64>,
    pub geo: GeoPoint,
    pub name: String,
    /// Position in the earth's frame, lifted to the marker radius.
    pub position: CartesianPoint,
}

#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct BorderDotComponent {
    pub position: CartesianPoint,
}

/// Bumped on every scene change so GPU instance buffers are only rebuilt
/// when something moved.
#[derive(Resource, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SceneRevision(pub u64);

/// Spawn order of markers, used to cycle focus through them.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MarkerSequence(pub u64);
