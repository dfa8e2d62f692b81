//! Minimal engine-side light model.
//!
//! These types play the role of the renderer's scene-graph objects. The
//! component layer only talks to them through [`NativeLight`], so any
//! engine type that honours that contract can be driven by a
//! [`crate::LightComponent`].

use glam::{EulerRot, Quat, UVec2, Vec3};
use serde::{Deserialize, Serialize};

/// Transform and shadow flag shared by every scene-graph object.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Object3D {
    pub position: Vec3,
    rotation: Vec3,
    quaternion: Quat,
    pub cast_shadow: bool,
}

impl Default for Object3D {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            quaternion: Quat::IDENTITY,
            cast_shadow: false,
        }
    }
}

impl Object3D {
    /// Euler angles in radians, applied in XYZ order.
    pub fn rotation(&self) -> Vec3 {
        self.rotation
    }

    pub fn quaternion(&self) -> Quat {
        self.quaternion
    }

    /// Sets the Euler rotation and refreshes the quaternion to match.
    pub fn set_rotation(&mut self, rotation: Vec3) {
        self.rotation = rotation;
        self.quaternion = Quat::from_euler(EulerRot::XYZ, rotation.x, rotation.y, rotation.z);
    }

    /// Sets the quaternion and refreshes the Euler rotation to match.
    pub fn set_quaternion(&mut self, quaternion: Quat) {
        self.quaternion = quaternion;
        let (x, y, z) = quaternion.to_euler(EulerRot::XYZ);
        self.rotation = Vec3::new(x, y, z);
    }
}

/// Projection used to render a light's shadow map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShadowCamera {
    pub near: f32,
    pub far: f32,
    pub fov: f32,
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

impl Default for ShadowCamera {
    fn default() -> Self {
        Self {
            near: 0.5,
            far: 500.0,
            fov: 50.0,
            left: -5.0,
            right: 5.0,
            top: 5.0,
            bottom: -5.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LightShadow {
    pub map_size: UVec2,
    pub bias: f32,
    pub radius: f32,
    pub camera: ShadowCamera,
}

impl Default for LightShadow {
    fn default() -> Self {
        Self {
            map_size: UVec2::splat(512),
            bias: 0.0,
            radius: 1.0,
            camera: ShadowCamera::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightKind {
    Ambient,
    Directional,
    Hemisphere,
    Point,
    Spot,
}

impl LightKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LightKind::Ambient => "ambient",
            LightKind::Directional => "directional",
            LightKind::Hemisphere => "hemisphere",
            LightKind::Point => "point",
            LightKind::Spot => "spot",
        }
    }

    pub fn casts_shadow(self) -> bool {
        matches!(
            self,
            LightKind::Directional | LightKind::Point | LightKind::Spot
        )
    }

    pub fn has_target(self) -> bool {
        matches!(self, LightKind::Directional | LightKind::Spot)
    }
}

/// What the component layer needs from an engine light.
///
/// `Clone` must produce an independent deep copy: mutating the clone may
/// never be observable through the original.
pub trait NativeLight: Clone + Send + Sync + 'static {
    fn kind(&self) -> LightKind;
    fn object(&self) -> &Object3D;
    fn object_mut(&mut self) -> &mut Object3D;
    fn color(&self) -> Vec3;
    fn intensity(&self) -> f32;

    fn shadow(&self) -> Option<&LightShadow> {
        None
    }

    fn shadow_mut(&mut self) -> Option<&mut LightShadow> {
        None
    }

    fn target(&self) -> Option<&Object3D> {
        None
    }

    fn target_mut(&mut self) -> Option<&mut Object3D> {
        None
    }
}

/// Stock engine light covering every [`LightKind`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineLight {
    pub kind: LightKind,
    pub object: Object3D,
    pub color: Vec3,
    /// Only meaningful for hemisphere lights; `color` is the sky color.
    pub ground_color: Vec3,
    pub intensity: f32,
    pub distance: f32,
    pub angle: f32,
    pub exponent: f32,
    pub decay: f32,
    pub shadow: Option<LightShadow>,
    pub target: Option<Object3D>,
}

impl EngineLight {
    pub fn new(kind: LightKind, color: Vec3, intensity: f32) -> Self {
        Self {
            kind,
            object: Object3D::default(),
            color,
            ground_color: Vec3::ZERO,
            intensity,
            distance: 0.0,
            angle: 0.0,
            exponent: 0.0,
            decay: 1.0,
            shadow: kind.casts_shadow().then(LightShadow::default),
            target: kind.has_target().then(Object3D::default),
        }
    }

    pub fn color_hex(&self) -> u32 {
        vec3_to_hex(self.color)
    }
}

impl NativeLight for EngineLight {
    fn kind(&self) -> LightKind {
        self.kind
    }

    fn object(&self) -> &Object3D {
        &self.object
    }

    fn object_mut(&mut self) -> &mut Object3D {
        &mut self.object
    }

    fn color(&self) -> Vec3 {
        self.color
    }

    fn intensity(&self) -> f32 {
        self.intensity
    }

    fn shadow(&self) -> Option<&LightShadow> {
        self.shadow.as_ref()
    }

    fn shadow_mut(&mut self) -> Option<&mut LightShadow> {
        self.shadow.as_mut()
    }

    fn target(&self) -> Option<&Object3D> {
        self.target.as_ref()
    }

    fn target_mut(&mut self) -> Option<&mut Object3D> {
        self.target.as_mut()
    }
}

/// Unpacks `0xRRGGBB` into channels in `0..=1`.
pub fn hex_to_vec3(hex: u32) -> Vec3 {
    let r = (hex >> 16) & 0xff;
    let g = (hex >> 8) & 0xff;
    let b = hex & 0xff;
    Vec3::new(r as f32, g as f32, b as f32) / 255.0
}

pub fn vec3_to_hex(color: Vec3) -> u32 {
    let channel = |value: f32| (value.clamp(0.0, 1.0) * 255.0).round() as u32;
    (channel(color.x) << 16) | (channel(color.y) << 8) | channel(color.z)
}
