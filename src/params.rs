use std::f32::consts::FRAC_PI_3;

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Declarative description of a light component.
///
/// A value of this type is never mutated by the component machinery:
/// callers start from a defaults value and derive new values through
/// [`LightParams::merged`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LightParams {
    pub build: bool,
    pub light: LightSettings,
    pub shadow: ShadowParams,
    pub position: Vec3,
    pub rotation: Vec3,
}

impl Default for LightParams {
    fn default() -> Self {
        Self {
            build: true,
            light: LightSettings::default(),
            shadow: ShadowParams::default(),
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
        }
    }
}

/// Photometric settings. Colors are packed as `0xRRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LightSettings {
    pub color: u32,
    pub sky_color: u32,
    pub ground_color: u32,
    pub intensity: f32,
    pub distance: f32,
    pub angle: f32,
    pub exponent: f32,
    pub decay: f32,
}

impl Default for LightSettings {
    fn default() -> Self {
        Self {
            color: 0xffffff,
            sky_color: 0xffffff,
            ground_color: 0xffffff,
            intensity: 1.0,
            distance: 100.0,
            angle: FRAC_PI_3,
            exponent: 0.0,
            decay: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShadowParams {
    pub cast: bool,
    pub bias: f32,
    pub radius: f32,
    pub map_size: MapSize,
    pub camera: ShadowCameraParams,
}

impl Default for ShadowParams {
    fn default() -> Self {
        Self {
            cast: true,
            bias: 0.0,
            radius: 1.0,
            map_size: MapSize::default(),
            camera: ShadowCameraParams::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapSize {
    pub width: u32,
    pub height: u32,
}

impl Default for MapSize {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 1024,
        }
    }
}

/// Projection used when rendering the shadow map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShadowCameraParams {
    pub near: f32,
    pub far: f32,
    pub fov: f32,
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
}

impl Default for ShadowCameraParams {
    fn default() -> Self {
        Self {
            near: 1.0,
            far: 400.0,
            fov: 60.0,
            top: 200.0,
            bottom: -200.0,
            left: -200.0,
            right: 200.0,
        }
    }
}

/// Caller supplied values layered over a [`LightParams`] defaults value.
///
/// Every field is optional; absent fields keep the default. Transform
/// overrides are per axis so that `position.x` can be set on its own.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LightParamsOverride {
    pub build: Option<bool>,
    pub light: LightSettingsOverride,
    pub shadow: ShadowOverride,
    pub position: AxesOverride,
    pub rotation: AxesOverride,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LightSettingsOverride {
    pub color: Option<u32>,
    pub sky_color: Option<u32>,
    pub ground_color: Option<u32>,
    pub intensity: Option<f32>,
    pub distance: Option<f32>,
    pub angle: Option<f32>,
    pub exponent: Option<f32>,
    pub decay: Option<f32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ShadowOverride {
    pub cast: Option<bool>,
    pub bias: Option<f32>,
    pub radius: Option<f32>,
    pub map_size: MapSizeOverride,
    pub camera: ShadowCameraOverride,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapSizeOverride {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowCameraOverride {
    pub near: Option<f32>,
    pub far: Option<f32>,
    pub fov: Option<f32>,
    pub top: Option<f32>,
    pub bottom: Option<f32>,
    pub left: Option<f32>,
    pub right: Option<f32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxesOverride {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub z: Option<f32>,
}

impl AxesOverride {
    pub fn splat(value: Vec3) -> Self {
        Self {
            x: Some(value.x),
            y: Some(value.y),
            z: Some(value.z),
        }
    }

    fn apply(&self, base: Vec3) -> Vec3 {
        Vec3::new(
            self.x.unwrap_or(base.x),
            self.y.unwrap_or(base.y),
            self.z.unwrap_or(base.z),
        )
    }
}

impl LightParams {
    /// Returns a copy of `self` with every supplied override applied.
    pub fn merged(&self, overrides: &LightParamsOverride) -> LightParams {
        LightParams {
            build: overrides.build.unwrap_or(self.build),
            light: self.light.merged(&overrides.light),
            shadow: self.shadow.merged(&overrides.shadow),
            position: overrides.position.apply(self.position),
            rotation: overrides.rotation.apply(self.rotation),
        }
    }

    /// Shorthand for merging overrides into the stock defaults.
    pub fn from_overrides(overrides: &LightParamsOverride) -> LightParams {
        LightParams::default().merged(overrides)
    }
}

impl LightSettings {
    fn merged(&self, o: &LightSettingsOverride) -> LightSettings {
        LightSettings {
            color: o.color.unwrap_or(self.color),
            sky_color: o.sky_color.unwrap_or(self.sky_color),
            ground_color: o.ground_color.unwrap_or(self.ground_color),
            intensity: o.intensity.unwrap_or(self.intensity),
            distance: o.distance.unwrap_or(self.distance),
            angle: o.angle.unwrap_or(self.angle),
            exponent: o.exponent.unwrap_or(self.exponent),
            decay: o.decay.unwrap_or(self.decay),
        }
    }
}

impl ShadowParams {
    fn merged(&self, o: &ShadowOverride) -> ShadowParams {
        ShadowParams {
            cast: o.cast.unwrap_or(self.cast),
            bias: o.bias.unwrap_or(self.bias),
            radius: o.radius.unwrap_or(self.radius),
            map_size: MapSize {
                width: o.map_size.width.unwrap_or(self.map_size.width),
                height: o.map_size.height.unwrap_or(self.map_size.height),
            },
            camera: self.camera.merged(&o.camera),
        }
    }
}

impl ShadowCameraParams {
    fn merged(&self, o: &ShadowCameraOverride) -> ShadowCameraParams {
        ShadowCameraParams {
            near: o.near.unwrap_or(self.near),
            far: o.far.unwrap_or(self.far),
            fov: o.fov.unwrap_or(self.fov),
            top: o.top.unwrap_or(self.top),
            bottom: o.bottom.unwrap_or(self.bottom),
            left: o.left.unwrap_or(self.left),
            right: o.right.unwrap_or(self.right),
        }
    }
}
