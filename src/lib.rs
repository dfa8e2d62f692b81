//! Declarative light components for the Crystal scene graph.
//!
//! A [`LightComponent`] merges caller overrides into a [`LightParams`]
//! defaults value, asks a [`LightBuilder`] for the engine light (now or on
//! a later turn of the [`EventLoop`]), and keeps that light's transform
//! and shadow settings in line with the params. Rendering stays outside of
//! the crate so that composition can be exercised headless.

pub mod app;
pub mod component;
pub mod deferred;
pub mod engine;
pub mod error;
pub mod lights;
pub mod params;
pub mod scene;

pub use component::{
    BuildOutput, BuildState, ComponentModule, Container, LightBuilder, LightComponent,
};
pub use deferred::{Abandoned, Defer, EventLoop, Pending, Resolver};
pub use engine::{EngineLight, LightKind, LightShadow, NativeLight, Object3D, ShadowCamera};
pub use error::CompositionError;
pub use lights::{AmbientLight, DirectionalLight, HemisphereLight, PointLight, SpotLight};
pub use params::{LightParams, LightParamsOverride};
pub use scene::{LightDescriptor, LightSummary, Scene, SceneGraph, SceneLight};
