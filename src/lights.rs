//! Stock light builders backed by [`EngineLight`].

use crate::component::{BuildOutput, LightBuilder};
use crate::engine::{hex_to_vec3, EngineLight, LightKind};
use crate::error::CompositionError;
use crate::params::LightParams;

type Built = Result<BuildOutput<EngineLight>, CompositionError>;

fn base(kind: LightKind, params: &LightParams) -> EngineLight {
    EngineLight::new(kind, hex_to_vec3(params.light.color), params.light.intensity)
}

/// Uniform light with no position-dependent falloff.
#[derive(Debug, Clone, Copy, Default)]
pub struct AmbientLight;

impl LightBuilder for AmbientLight {
    type Native = EngineLight;
    const NAME: &'static str = "AmbientLight";

    fn build(&self, params: &LightParams) -> Built {
        Ok(BuildOutput::Ready(base(LightKind::Ambient, params)))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DirectionalLight;

impl LightBuilder for DirectionalLight {
    type Native = EngineLight;
    const NAME: &'static str = "DirectionalLight";

    fn build(&self, params: &LightParams) -> Built {
        Ok(BuildOutput::Ready(base(LightKind::Directional, params)))
    }
}

/// Sky/ground gradient light.
#[derive(Debug, Clone, Copy, Default)]
pub struct HemisphereLight;

impl LightBuilder for HemisphereLight {
    type Native = EngineLight;
    const NAME: &'static str = "HemisphereLight";

    fn build(&self, params: &LightParams) -> Built {
        let mut light = EngineLight::new(
            LightKind::Hemisphere,
            hex_to_vec3(params.light.sky_color),
            params.light.intensity,
        );
        light.ground_color = hex_to_vec3(params.light.ground_color);
        Ok(BuildOutput::Ready(light))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PointLight;

impl LightBuilder for PointLight {
    type Native = EngineLight;
    const NAME: &'static str = "PointLight";

    fn build(&self, params: &LightParams) -> Built {
        let mut light = base(LightKind::Point, params);
        light.distance = params.light.distance;
        light.decay = params.light.decay;
        Ok(BuildOutput::Ready(light))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SpotLight;

impl LightBuilder for SpotLight {
    type Native = EngineLight;
    const NAME: &'static str = "SpotLight";

    fn build(&self, params: &LightParams) -> Built {
        let mut light = base(LightKind::Spot, params);
        light.distance = params.light.distance;
        light.angle = params.light.angle;
        light.exponent = params.light.exponent;
        light.decay = params.light.decay;
        Ok(BuildOutput::Ready(light))
    }
}
