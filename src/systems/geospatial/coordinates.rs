use serde::{Deserialize, Serialize};

/// Degrees north (+) / south (-) and east (+) / west (-).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// A point in globe space: origin at the centre, +y through the north pole.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CartesianPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl CartesianPoint {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn scaled(&self, factor: f64) -> Self {
        Self::new(self.x * factor, self.y * factor, self.z * factor)
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.x as f32, self.y as f32, self.z as f32]
    }
}

impl From<cgmath::Vector3<f32>> for CartesianPoint {
    fn from(v: cgmath::Vector3<f32>) -> Self {
        Self::new(v.x as f64, v.y as f64, v.z as f64)
    }
}

pub struct CoordinatesSystem {}

impl CoordinatesSystem {
    /// The sign and offset pattern lines markers up with the seam of the
    /// equirectangular earth texture; the sphere mesh is built with it too.
    pub fn lat_lon_to_cartesian(geo: GeoPoint, radius: f64) -> CartesianPoint {
        let phi = (90.0 - geo.latitude).to_radians();
        let theta = (geo.longitude + 180.0).to_radians();

        let x = -radius * phi.sin() * theta.cos();
        let y = radius * phi.cos();
        let z = radius * phi.sin() * theta.sin();

        CartesianPoint { x, y, z }
    }

    /// Inverse of `lat_lon_to_cartesian` at radius 1. The point must already
    /// sit on the unit sphere; nothing here rescales it.
    pub fn cartesian_to_lat_lon(point: CartesianPoint) -> GeoPoint {
        let latitude = 90.0 - point.y.clamp(-1.0, 1.0).acos().to_degrees();
        let longitude = normalize_longitude(-point.z.atan2(point.x).to_degrees());

        GeoPoint {
            latitude,
            longitude,
        }
    }

    /// Great circle angle between two positions, in degrees.
    pub fn angular_distance_deg(a: GeoPoint, b: GeoPoint) -> f64 {
        let pa = CoordinatesSystem::lat_lon_to_cartesian(a, 1.0);
        let pb = CoordinatesSystem::lat_lon_to_cartesian(b, 1.0);
        let dot = pa.x * pb.x + pa.y * pb.y + pa.z * pb.z;
        dot.clamp(-1.0, 1.0).acos().to_degrees()
    }
}

/// Folds any longitude into (-180, 180].
pub fn normalize_longitude(longitude: f64) -> f64 {
    let wrapped = (longitude + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped <= -180.0 {
        wrapped + 360.0
    } else {
        wrapped
    }
}
