use std::fmt;
use std::sync::Arc;

use glam::{Quat, UVec2, Vec3};
use log::{debug, warn};
use parking_lot::RwLock;

use crate::deferred::{Defer, Pending};
use crate::engine::NativeLight;
use crate::error::CompositionError;
use crate::params::{LightParams, LightParamsOverride, ShadowParams};

/// Result of [`LightBuilder::build`]: the native light now, or later.
pub enum BuildOutput<N> {
    Ready(N),
    Deferred(Pending<N>),
}

/// Produces the engine light a [`LightComponent`] wraps.
pub trait LightBuilder: Send + Sync + 'static {
    type Native: NativeLight;

    /// Name reported in composition errors and logs.
    const NAME: &'static str;

    /// Defaults the caller's overrides are merged into.
    fn defaults(&self) -> LightParams {
        LightParams::default()
    }

    fn build(&self, params: &LightParams) -> Result<BuildOutput<Self::Native>, CompositionError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildState {
    /// `params.build` was false; no native light was requested.
    Skipped,
    Pending,
    Ready,
    Failed(CompositionError),
}

/// Behaviour attached to a component. Modules travel with the component
/// through `copy` and `clone`.
pub trait ComponentModule: Send + Sync {
    fn name(&self) -> &str;
}

/// Anything a component can be attached to.
pub trait Container<T> {
    type Output;

    fn add(&mut self, child: T) -> Self::Output;
}

struct Slot<N> {
    native: Option<N>,
    state: BuildState,
}

type SharedSlot<N> = Arc<RwLock<Slot<N>>>;

/// Scene component owning one engine light built from [`LightParams`].
pub struct LightComponent<B: LightBuilder> {
    builder: B,
    params: Arc<LightParams>,
    slot: SharedSlot<B::Native>,
    modules: Vec<Arc<dyn ComponentModule>>,
    defer: Arc<dyn Defer>,
}

impl<B: LightBuilder> LightComponent<B> {
    /// Builds a component from the builder's defaults and `overrides`.
    pub fn new(
        builder: B,
        overrides: LightParamsOverride,
        defer: Arc<dyn Defer>,
    ) -> Result<Self, CompositionError> {
        let defaults = builder.defaults();
        Self::with_defaults(builder, &defaults, &overrides, defer)
    }

    pub fn with_defaults(
        builder: B,
        defaults: &LightParams,
        overrides: &LightParamsOverride,
        defer: Arc<dyn Defer>,
    ) -> Result<Self, CompositionError> {
        let component = Self::assemble(builder, defaults.merged(overrides), defer);
        if component.params.build {
            component.build()?;
        }
        Ok(component)
    }

    fn assemble(builder: B, params: LightParams, defer: Arc<dyn Defer>) -> Self {
        Self {
            builder,
            params: Arc::new(params),
            slot: Arc::new(RwLock::new(Slot {
                native: None,
                state: BuildState::Skipped,
            })),
            modules: Vec::new(),
            defer,
        }
    }

    fn build(&self) -> Result<(), CompositionError> {
        match self.builder.build(&self.params)? {
            BuildOutput::Ready(native) => {
                install(&self.slot, native, &self.params, B::NAME);
                self.wrap();
            }
            BuildOutput::Deferred(pending) => {
                self.slot.write().state = BuildState::Pending;
                let slot = Arc::clone(&self.slot);
                let params = Arc::clone(&self.params);
                let defer = Arc::clone(&self.defer);
                pending.then(move |outcome| match outcome {
                    Ok(native) => {
                        install(&slot, native, &params, B::NAME);
                        schedule_wrap(&slot, defer.as_ref(), &params);
                    }
                    Err(abandoned) => {
                        warn!("{}: deferred build failed: {abandoned}", B::NAME);
                        let err = CompositionError::new(
                            B::NAME,
                            "build() must resolve with a native light",
                        )
                        .with_context(params.as_ref());
                        slot.write().state = BuildState::Failed(err);
                    }
                });
            }
        }
        Ok(())
    }

    /// Schedules copying `params.position` and `params.rotation` onto the
    /// native light. The returned value settles with `()` once the copy
    /// ran; the component itself stays with the caller, who can read the
    /// applied transform through [`Self::position`] and [`Self::rotation`].
    pub fn wrap(&self) -> Pending<()> {
        schedule_wrap(&self.slot, self.defer.as_ref(), &self.params)
    }

    /// Copies `params.shadow` onto the native light's shadow settings.
    pub fn wrap_shadow(&self) -> Result<(), CompositionError> {
        let mut slot = self.slot.write();
        let native = slot.native.as_mut().ok_or_else(|| {
            CompositionError::new(B::NAME, "wrap_shadow() needs a native light")
        })?;
        if apply_shadow(native, &self.params.shadow) {
            Ok(())
        } else {
            Err(CompositionError::new(
                B::NAME,
                "native light does not support shadow casting",
            ))
        }
    }

    /// Turns `self` into a duplicate of `source`.
    ///
    /// With a native light on the source, the light is deep-copied along
    /// with the params and module list into a fresh slot, so a deferred
    /// build still pending on `self` can no longer overwrite it. Without
    /// one, only the params are shared.
    pub fn copy(&mut self, source: &Self) -> &mut Self {
        let duplicate = source.slot.read().native.clone();
        match duplicate {
            Some(native) => {
                self.slot = Arc::new(RwLock::new(Slot {
                    native: Some(native),
                    state: BuildState::Ready,
                }));
                self.params = Arc::new(source.params.as_ref().clone());
                self.modules = source.modules.clone();
            }
            None => self.params = Arc::clone(&source.params),
        }
        self
    }

    pub fn add_to<C>(self, container: &mut C) -> C::Output
    where
        C: Container<Self>,
    {
        container.add(self)
    }

    pub fn name(&self) -> &'static str {
        B::NAME
    }

    pub fn builder(&self) -> &B {
        &self.builder
    }

    pub fn params(&self) -> &LightParams {
        &self.params
    }

    /// Mutable access to the params; shared params are copied first.
    pub fn params_mut(&mut self) -> &mut LightParams {
        Arc::make_mut(&mut self.params)
    }

    pub fn modules(&self) -> &[Arc<dyn ComponentModule>] {
        &self.modules
    }

    pub fn add_module(&mut self, module: Arc<dyn ComponentModule>) {
        self.modules.push(module);
    }

    pub fn build_state(&self) -> BuildState {
        self.slot.read().state.clone()
    }

    pub fn has_native(&self) -> bool {
        self.slot.read().native.is_some()
    }

    /// Fails unless the native light has been installed.
    pub fn ensure_native(&self) -> Result<(), CompositionError> {
        match &self.slot.read().state {
            BuildState::Ready => Ok(()),
            BuildState::Failed(err) => Err(err.clone()),
            BuildState::Pending => Err(CompositionError::new(
                B::NAME,
                "native light has not resolved yet",
            )),
            BuildState::Skipped => Err(CompositionError::new(
                B::NAME,
                "component was created without building a native light",
            )),
        }
    }

    pub fn with_native<F, R>(&self, reader: F) -> Option<R>
    where
        F: FnOnce(&B::Native) -> R,
    {
        self.slot.read().native.as_ref().map(reader)
    }

    pub fn with_native_mut<F, R>(&self, updater: F) -> Option<R>
    where
        F: FnOnce(&mut B::Native) -> R,
    {
        self.slot.write().native.as_mut().map(updater)
    }

    pub fn position(&self) -> Option<Vec3> {
        self.with_native(|native| native.object().position)
    }

    pub fn set_position(&self, position: Vec3) -> bool {
        self.with_native_mut(|native| native.object_mut().position = position)
            .is_some()
    }

    pub fn rotation(&self) -> Option<Vec3> {
        self.with_native(|native| native.object().rotation())
    }

    pub fn set_rotation(&self, rotation: Vec3) -> bool {
        self.with_native_mut(|native| native.object_mut().set_rotation(rotation))
            .is_some()
    }

    pub fn quaternion(&self) -> Option<Quat> {
        self.with_native(|native| native.object().quaternion())
    }

    pub fn set_quaternion(&self, quaternion: Quat) -> bool {
        self.with_native_mut(|native| native.object_mut().set_quaternion(quaternion))
            .is_some()
    }

    /// Position of the light's target, for kinds that aim at one.
    pub fn target(&self) -> Option<Vec3> {
        self.with_native(|native| native.target().map(|target| target.position))
            .flatten()
    }

    pub fn set_target(&self, position: Vec3) -> bool {
        self.with_native_mut(|native| {
            native
                .target_mut()
                .map(|target| target.position = position)
        })
        .flatten()
        .is_some()
    }
}

impl<B: LightBuilder + Clone> Clone for LightComponent<B> {
    fn clone(&self) -> Self {
        let skip_build = LightParamsOverride {
            build: Some(false),
            ..LightParamsOverride::default()
        };
        let params = self.builder.defaults().merged(&skip_build);
        let mut duplicate = Self::assemble(self.builder.clone(), params, Arc::clone(&self.defer));
        duplicate.copy(self);
        duplicate
    }
}

impl<B: LightBuilder> fmt::Debug for LightComponent<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LightComponent")
            .field("name", &B::NAME)
            .field("params", &self.params)
            .field("state", &self.slot.read().state)
            .field("modules", &self.modules.len())
            .finish()
    }
}

fn install<N: NativeLight>(slot: &RwLock<Slot<N>>, mut native: N, params: &LightParams, name: &str) {
    if native.shadow().is_some() {
        apply_shadow(&mut native, &params.shadow);
    }
    let kind = native.kind();
    let mut slot = slot.write();
    slot.native = Some(native);
    slot.state = BuildState::Ready;
    debug!("{name}: native {} light installed", kind.as_str());
}

fn schedule_wrap<N: NativeLight>(
    slot: &SharedSlot<N>,
    defer: &dyn Defer,
    params: &LightParams,
) -> Pending<()> {
    let (pending, resolver) = Pending::channel();
    let slot = Arc::clone(slot);
    let position = params.position;
    let rotation = params.rotation;
    defer.defer(Box::new(move || {
        if let Some(native) = slot.write().native.as_mut() {
            let object = native.object_mut();
            object.position = position;
            object.set_rotation(rotation);
            debug!("transform applied: position={position} rotation={rotation}");
        }
        resolver.resolve(());
    }));
    pending
}

fn apply_shadow<N: NativeLight>(native: &mut N, shadow: &ShadowParams) -> bool {
    let Some(light_shadow) = native.shadow_mut() else {
        return false;
    };
    light_shadow.map_size = UVec2::new(shadow.map_size.width, shadow.map_size.height);
    light_shadow.bias = shadow.bias;
    light_shadow.radius = shadow.radius;

    let camera = &mut light_shadow.camera;
    camera.near = shadow.camera.near;
    camera.far = shadow.camera.far;
    camera.fov = shadow.camera.fov;
    camera.left = shadow.camera.left;
    camera.right = shadow.camera.right;
    camera.top = shadow.camera.top;
    camera.bottom = shadow.camera.bottom;

    native.object_mut().cast_shadow = shadow.cast;
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deferred::{EventLoop, Resolver};
    use crate::engine::{hex_to_vec3, EngineLight, LightKind};
    use crate::params::{AxesOverride, LightSettingsOverride};
    use parking_lot::Mutex;

    #[derive(Clone)]
    struct Instant {
        kind: LightKind,
    }

    impl LightBuilder for Instant {
        type Native = EngineLight;
        const NAME: &'static str = "InstantLight";

        fn build(&self, params: &LightParams) -> Result<BuildOutput<EngineLight>, CompositionError> {
            let light = EngineLight::new(
                self.kind,
                hex_to_vec3(params.light.color),
                params.light.intensity,
            );
            Ok(BuildOutput::Ready(light))
        }
    }

    #[derive(Clone, Default)]
    struct Late {
        resolver: Arc<Mutex<Option<Resolver<EngineLight>>>>,
    }

    impl LightBuilder for Late {
        type Native = EngineLight;
        const NAME: &'static str = "LateLight";

        fn build(&self, _params: &LightParams) -> Result<BuildOutput<EngineLight>, CompositionError> {
            let (pending, resolver) = Pending::channel();
            *self.resolver.lock() = Some(resolver);
            Ok(BuildOutput::Deferred(pending))
        }
    }

    struct Broken;

    impl LightBuilder for Broken {
        type Native = EngineLight;
        const NAME: &'static str = "BrokenLight";

        fn build(&self, params: &LightParams) -> Result<BuildOutput<EngineLight>, CompositionError> {
            Err(CompositionError::new(Self::NAME, "no engine light available").with_context(params))
        }
    }

    struct Tag(&'static str);

    impl ComponentModule for Tag {
        fn name(&self) -> &str {
            self.0
        }
    }

    fn point() -> Instant {
        Instant {
            kind: LightKind::Point,
        }
    }

    fn placed(position: Vec3) -> LightParamsOverride {
        LightParamsOverride {
            position: AxesOverride::splat(position),
            ..LightParamsOverride::default()
        }
    }

    #[test]
    fn unbuilt_component_has_no_native() {
        let event_loop = EventLoop::new();
        let overrides = LightParamsOverride {
            build: Some(false),
            light: LightSettingsOverride {
                intensity: Some(3.0),
                ..Default::default()
            },
            ..Default::default()
        };
        let component = LightComponent::new(point(), overrides.clone(), event_loop.handle()).unwrap();
        assert!(!component.has_native());
        assert_eq!(component.build_state(), BuildState::Skipped);
        assert_eq!(component.params(), &LightParams::default().merged(&overrides));
        assert_eq!(event_loop.pending_tasks(), 0);
        assert!(component.ensure_native().is_err());
    }

    #[test]
    fn sync_build_installs_native_and_defers_transform() {
        let event_loop = EventLoop::new();
        let rotation = Vec3::new(0.1, 0.2, 0.3);
        let overrides = LightParamsOverride {
            rotation: AxesOverride::splat(rotation),
            ..placed(Vec3::new(4.0, 5.0, 6.0))
        };
        let component = LightComponent::new(point(), overrides, event_loop.handle()).unwrap();
        assert!(component.has_native());
        assert_eq!(component.build_state(), BuildState::Ready);
        assert_eq!(component.position(), Some(Vec3::ZERO));

        event_loop.run_until_idle();
        assert_eq!(component.position(), Some(Vec3::new(4.0, 5.0, 6.0)));
        assert_eq!(component.rotation(), Some(rotation));
        let expected = Quat::from_euler(glam::EulerRot::XYZ, 0.1, 0.2, 0.3);
        assert!(component.quaternion().unwrap().abs_diff_eq(expected, 1e-6));
    }

    #[test]
    fn wrap_settles_after_the_loop_turns() {
        let event_loop = EventLoop::new();
        let component = LightComponent::new(point(), placed(Vec3::X), event_loop.handle()).unwrap();
        event_loop.run_until_idle();
        let wrapped = component.wrap();
        assert!(!wrapped.is_settled());
        event_loop.run_once();
        assert_eq!(wrapped.try_take().ok(), Some(Ok(())));
    }

    #[test]
    fn deferred_build_installs_native_on_resolve() {
        let event_loop = EventLoop::new();
        let builder = Late::default();
        let component =
            LightComponent::new(builder.clone(), placed(Vec3::new(1.0, 2.0, 3.0)), event_loop.handle())
                .unwrap();
        assert!(!component.has_native());
        assert_eq!(component.build_state(), BuildState::Pending);

        event_loop.run_until_idle();
        assert!(!component.has_native());

        let resolver = builder.resolver.lock().take().unwrap();
        resolver.resolve(EngineLight::new(LightKind::Spot, Vec3::ONE, 2.0));
        assert!(component.has_native());
        assert!(component.ensure_native().is_ok());
        assert_eq!(component.position(), Some(Vec3::ZERO));

        event_loop.run_until_idle();
        assert_eq!(component.position(), Some(Vec3::new(1.0, 2.0, 3.0)));
        let cast = component.with_native(|native| native.object.cast_shadow);
        assert_eq!(cast, Some(true));
    }

    #[test]
    fn abandoned_build_reports_composition_error() {
        let event_loop = EventLoop::new();
        let builder = Late::default();
        let component =
            LightComponent::new(builder.clone(), LightParamsOverride::default(), event_loop.handle())
                .unwrap();
        drop(builder.resolver.lock().take());

        let err = component.ensure_native().unwrap_err();
        assert_eq!(err.component(), "LateLight");
        assert!(matches!(component.build_state(), BuildState::Failed(_)));
        assert!(!component.has_native());
    }

    #[test]
    fn failing_builder_aborts_construction() {
        let event_loop = EventLoop::new();
        let err = LightComponent::new(Broken, LightParamsOverride::default(), event_loop.handle())
            .unwrap_err();
        assert_eq!(err.component(), "BrokenLight");
        assert!(err.context().is_some());
    }

    #[test]
    fn clone_owns_an_independent_native() {
        let event_loop = EventLoop::new();
        let source = LightComponent::new(point(), placed(Vec3::new(1.0, 1.0, 1.0)), event_loop.handle())
            .unwrap();
        event_loop.run_until_idle();

        let duplicate = source.clone();
        event_loop.run_until_idle();
        assert!(duplicate.has_native());
        assert_eq!(duplicate.position(), source.position());
        assert_eq!(duplicate.params(), source.params());
        assert_eq!(
            duplicate.with_native(|native| native.shadow),
            source.with_native(|native| native.shadow)
        );

        duplicate.set_position(Vec3::new(9.0, 9.0, 9.0));
        duplicate.with_native_mut(|native| native.intensity = 0.25);
        assert_eq!(source.position(), Some(Vec3::new(1.0, 1.0, 1.0)));
        assert_eq!(source.with_native(|native| native.intensity), Some(1.0));
    }

    #[test]
    fn clone_and_copy_keep_rotation_and_quaternion() {
        let event_loop = EventLoop::new();
        let overrides = LightParamsOverride {
            rotation: AxesOverride::splat(Vec3::new(0.4, -0.7, 1.1)),
            ..placed(Vec3::new(2.0, 0.0, -2.0))
        };
        let source = LightComponent::new(point(), overrides, event_loop.handle()).unwrap();
        event_loop.run_until_idle();
        assert_ne!(source.quaternion(), Some(Quat::IDENTITY));

        let duplicate = source.clone();
        assert_eq!(duplicate.rotation(), source.rotation());
        assert_eq!(duplicate.quaternion(), source.quaternion());

        let mut target = LightComponent::new(
            point(),
            LightParamsOverride {
                build: Some(false),
                ..Default::default()
            },
            event_loop.handle(),
        )
        .unwrap();
        target.copy(&source);
        assert_eq!(target.position(), source.position());
        assert_eq!(target.rotation(), source.rotation());
        assert_eq!(target.quaternion(), source.quaternion());
    }

    #[test]
    fn copy_detaches_a_pending_build() {
        let event_loop = EventLoop::new();
        let early = Late::default();
        let source =
            LightComponent::new(early.clone(), placed(Vec3::splat(5.0)), event_loop.handle())
                .unwrap();
        let resolver = early.resolver.lock().take().unwrap();
        resolver.resolve(EngineLight::new(LightKind::Spot, Vec3::ONE, 7.0));
        event_loop.run_until_idle();

        let late = Late::default();
        let mut target =
            LightComponent::new(late.clone(), LightParamsOverride::default(), event_loop.handle())
                .unwrap();
        assert_eq!(target.build_state(), BuildState::Pending);
        target.copy(&source);

        let resolver = late.resolver.lock().take().unwrap();
        resolver.resolve(EngineLight::new(LightKind::Point, Vec3::ONE, 1.0));
        event_loop.run_until_idle();

        assert_eq!(target.build_state(), BuildState::Ready);
        assert_eq!(target.with_native(|native| native.intensity), Some(7.0));
        assert_eq!(target.with_native(|native| native.kind), Some(LightKind::Spot));
        assert_eq!(target.position(), Some(Vec3::splat(5.0)));
    }

    #[test]
    fn copy_from_unbuilt_source_aliases_params() {
        let event_loop = EventLoop::new();
        let source = LightComponent::new(
            point(),
            LightParamsOverride {
                build: Some(false),
                ..placed(Vec3::Y)
            },
            event_loop.handle(),
        )
        .unwrap();
        let mut target = LightComponent::new(
            point(),
            LightParamsOverride {
                build: Some(false),
                ..Default::default()
            },
            event_loop.handle(),
        )
        .unwrap();

        target.copy(&source);
        assert!(!target.has_native());
        assert!(std::ptr::eq(target.params(), source.params()));

        target.params_mut().position = Vec3::Z;
        assert_eq!(source.params().position, Vec3::Y);
    }

    #[test]
    fn copy_carries_modules_and_target() {
        let event_loop = EventLoop::new();
        let spot = Instant {
            kind: LightKind::Spot,
        };
        let mut source = LightComponent::new(spot.clone(), LightParamsOverride::default(), event_loop.handle())
            .unwrap();
        source.add_module(Arc::new(Tag("helper")));
        assert!(source.set_target(Vec3::new(0.0, -1.0, 0.0)));

        let mut target = LightComponent::new(
            spot,
            LightParamsOverride {
                build: Some(false),
                ..Default::default()
            },
            event_loop.handle(),
        )
        .unwrap();
        target.copy(&source);
        assert_eq!(target.modules().len(), 1);
        assert_eq!(target.modules()[0].name(), "helper");
        assert_eq!(target.target(), Some(Vec3::new(0.0, -1.0, 0.0)));
        assert!(!std::ptr::eq(target.params(), source.params()));
    }

    #[test]
    fn red_light_scenario_uses_defaults_elsewhere() {
        let event_loop = EventLoop::new();
        let overrides = LightParamsOverride {
            light: LightSettingsOverride {
                color: Some(0xff0000),
                ..Default::default()
            },
            ..placed(Vec3::new(1.0, 2.0, 3.0))
        };
        let component = LightComponent::new(point(), overrides, event_loop.handle()).unwrap();
        event_loop.run_until_idle();

        let native = component.with_native(Clone::clone).unwrap();
        assert_eq!(native.object.position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(native.color_hex(), 0xff0000);
        assert_eq!(native.intensity, 1.0);

        let shadow = native.shadow.unwrap();
        assert!(native.object.cast_shadow);
        assert_eq!(shadow.map_size, UVec2::splat(1024));
        assert_eq!(shadow.bias, 0.0);
        assert_eq!(shadow.radius, 1.0);
        assert_eq!(shadow.camera.near, 1.0);
        assert_eq!(shadow.camera.far, 400.0);
        assert_eq!(shadow.camera.fov, 60.0);
        assert_eq!(shadow.camera.top, 200.0);
        assert_eq!(shadow.camera.left, -200.0);
    }

    #[test]
    fn wrap_shadow_rejects_lights_without_shadows() {
        let event_loop = EventLoop::new();
        let ambient = Instant {
            kind: LightKind::Ambient,
        };
        let component = LightComponent::new(ambient, LightParamsOverride::default(), event_loop.handle())
            .unwrap();
        assert!(component.wrap_shadow().is_err());

        let unbuilt = LightComponent::new(
            point(),
            LightParamsOverride {
                build: Some(false),
                ..Default::default()
            },
            event_loop.handle(),
        )
        .unwrap();
        let err = unbuilt.wrap_shadow().unwrap_err();
        assert_eq!(err.component(), "InstantLight");
    }

    #[test]
    fn wrap_shadow_reapplies_edited_params() {
        let event_loop = EventLoop::new();
        let mut component = LightComponent::new(point(), LightParamsOverride::default(), event_loop.handle())
            .unwrap();
        component.params_mut().shadow.cast = false;
        component.params_mut().shadow.camera.far = 25.0;
        component.wrap_shadow().unwrap();
        let (cast, far) = component
            .with_native(|native| (native.object.cast_shadow, native.shadow.unwrap().camera.far))
            .unwrap();
        assert!(!cast);
        assert_eq!(far, 25.0);
    }

    #[test]
    fn add_to_hands_component_to_container() {
        struct Bucket(Vec<&'static str>);

        impl<B: LightBuilder> Container<LightComponent<B>> for Bucket {
            type Output = usize;

            fn add(&mut self, child: LightComponent<B>) -> usize {
                self.0.push(child.name());
                self.0.len()
            }
        }

        let event_loop = EventLoop::new();
        let component = LightComponent::new(point(), LightParamsOverride::default(), event_loop.handle())
            .unwrap();
        let mut bucket = Bucket(Vec::new());
        assert_eq!(component.add_to(&mut bucket), 1);
        assert_eq!(bucket.0, vec!["InstantLight"]);
    }
}
