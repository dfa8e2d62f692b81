use std::fmt;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use glam::Vec3;
use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};

use crate::component::{BuildState, Container, LightBuilder, LightComponent};
use crate::deferred::Defer;
use crate::engine::{vec3_to_hex, LightKind, NativeLight};
use crate::lights::{AmbientLight, DirectionalLight, HemisphereLight, PointLight, SpotLight};
use crate::params::{AxesOverride, LightParamsOverride};

/// Light definitions parsed from a scene document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Scene {
    pub lights: Vec<LightDescriptor>,
}

/// One `<light>` element: which builder to use and what to override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightDescriptor {
    pub name: String,
    pub kind: LightKind,
    #[serde(default)]
    pub overrides: LightParamsOverride,
}

impl Scene {
    /// Reads `<light>` children of the root element. Each needs a `<name>`
    /// and a `<type>`; every other tag, including the nested `<shadow>` and
    /// `<camera>` blocks, becomes an optional override.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let document = Document::parse(xml).context("invalid scene XML")?;
        let mut lights = Vec::new();

        for node in document
            .root_element()
            .children()
            .filter(|n| n.has_tag_name("light"))
        {
            let name = required_text(&node, "name")?;
            let descriptor =
                parse_light(&node, name.clone()).with_context(|| format!("light {name}"))?;
            lights.push(descriptor);
        }

        Ok(Self { lights })
    }

    /// Builds one component per descriptor and collects them in a graph.
    pub fn spawn(&self, defer: Arc<dyn Defer>) -> Result<SceneGraph> {
        let mut graph = SceneGraph::new();
        for descriptor in &self.lights {
            let overrides = descriptor.overrides.clone();
            let defer = Arc::clone(&defer);
            let name = descriptor.name.as_str();
            match descriptor.kind {
                LightKind::Ambient => attach(&mut graph, name, AmbientLight, overrides, defer)?,
                LightKind::Directional => {
                    attach(&mut graph, name, DirectionalLight, overrides, defer)?
                }
                LightKind::Hemisphere => {
                    attach(&mut graph, name, HemisphereLight, overrides, defer)?
                }
                LightKind::Point => attach(&mut graph, name, PointLight, overrides, defer)?,
                LightKind::Spot => attach(&mut graph, name, SpotLight, overrides, defer)?,
            }
        }
        Ok(graph)
    }
}

fn attach<B: LightBuilder>(
    graph: &mut SceneGraph,
    name: &str,
    builder: B,
    overrides: LightParamsOverride,
    defer: Arc<dyn Defer>,
) -> Result<()> {
    let component = LightComponent::new(builder, overrides, defer)
        .with_context(|| format!("failed to build light {name}"))?;
    graph.insert(name, component);
    Ok(())
}

/// Snapshot of a light's engine-side state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightSummary {
    pub kind: LightKind,
    pub position: Vec3,
    pub color: u32,
    pub intensity: f32,
    pub cast_shadow: bool,
}

/// Type-erased view of a component stored in a [`SceneGraph`].
pub trait SceneLight: fmt::Debug {
    fn component_name(&self) -> &'static str;
    fn build_state(&self) -> BuildState;
    /// `None` while the component has no native light.
    fn summary(&self) -> Option<LightSummary>;
}

impl<B: LightBuilder> SceneLight for LightComponent<B> {
    fn component_name(&self) -> &'static str {
        self.name()
    }

    fn build_state(&self) -> BuildState {
        LightComponent::build_state(self)
    }

    fn summary(&self) -> Option<LightSummary> {
        self.with_native(|native| LightSummary {
            kind: native.kind(),
            position: native.object().position,
            color: vec3_to_hex(native.color()),
            intensity: native.intensity(),
            cast_shadow: native.object().cast_shadow,
        })
    }
}

#[derive(Debug)]
pub struct SceneEntry {
    pub name: String,
    pub light: Box<dyn SceneLight>,
}

/// Flat container of named light components.
#[derive(Debug, Default)]
pub struct SceneGraph {
    entries: Vec<SceneEntry>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the component under `name` and returns its index.
    pub fn insert<B: LightBuilder>(
        &mut self,
        name: impl Into<String>,
        component: LightComponent<B>,
    ) -> usize {
        self.entries.push(SceneEntry {
            name: name.into(),
            light: Box::new(component),
        });
        self.entries.len() - 1
    }

    pub fn entries(&self) -> &[SceneEntry] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&dyn SceneLight> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.light.as_ref())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<B: LightBuilder> Container<LightComponent<B>> for SceneGraph {
    type Output = usize;

    fn add(&mut self, child: LightComponent<B>) -> usize {
        let name = child.name();
        self.insert(name, child)
    }
}

fn parse_light(node: &Node<'_, '_>, name: String) -> Result<LightDescriptor> {
    let kind_text = required_text(node, "type")?;
    let kind = parse_kind(&kind_text)?;

    let mut overrides = LightParamsOverride {
        build: parse_bool(optional_text(node, "build"))?,
        ..LightParamsOverride::default()
    };

    let light = &mut overrides.light;
    light.color = parse_color(optional_text(node, "color"))?;
    light.sky_color = parse_color(optional_text(node, "sky-color"))?;
    light.ground_color = parse_color(optional_text(node, "ground-color"))?;
    light.intensity = parse_f32(optional_text(node, "intensity"))?;
    light.distance = parse_f32(optional_text(node, "distance"))?;
    light.angle = parse_f32(optional_text(node, "angle"))?;
    light.exponent = parse_f32(optional_text(node, "exponent"))?;
    light.decay = parse_f32(optional_text(node, "decay"))?;

    if let Some(position) = parse_vec3(optional_text(node, "position"))? {
        overrides.position = AxesOverride::splat(position);
    }
    if let Some(rotation) = parse_vec3(optional_text(node, "rotation"))? {
        overrides.rotation = AxesOverride::splat(rotation);
    }

    if let Some(shadow_node) = child(node, "shadow") {
        let shadow = &mut overrides.shadow;
        shadow.cast = parse_bool(optional_text(&shadow_node, "cast"))?;
        shadow.bias = parse_f32(optional_text(&shadow_node, "bias"))?;
        shadow.radius = parse_f32(optional_text(&shadow_node, "radius"))?;
        if let Some(text) = optional_text(&shadow_node, "map-size") {
            let (width, height) = parse_map_size(&text)?;
            shadow.map_size.width = Some(width);
            shadow.map_size.height = Some(height);
        }
        if let Some(camera_node) = child(&shadow_node, "camera") {
            let camera = &mut shadow.camera;
            camera.near = parse_f32(optional_text(&camera_node, "near"))?;
            camera.far = parse_f32(optional_text(&camera_node, "far"))?;
            camera.fov = parse_f32(optional_text(&camera_node, "fov"))?;
            camera.top = parse_f32(optional_text(&camera_node, "top"))?;
            camera.bottom = parse_f32(optional_text(&camera_node, "bottom"))?;
            camera.left = parse_f32(optional_text(&camera_node, "left"))?;
            camera.right = parse_f32(optional_text(&camera_node, "right"))?;
        }
    }

    Ok(LightDescriptor {
        name,
        kind,
        overrides,
    })
}

fn parse_kind(value: &str) -> Result<LightKind> {
    Ok(match value.to_ascii_lowercase().as_str() {
        "ambient" => LightKind::Ambient,
        "directional" | "sun" => LightKind::Directional,
        "hemisphere" => LightKind::Hemisphere,
        "point" => LightKind::Point,
        "spot" => LightKind::Spot,
        other => bail!("unknown light type: {other}"),
    })
}

fn child<'a, 'input>(node: &Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|child| child.has_tag_name(tag))
}

fn required_text(node: &Node<'_, '_>, tag: &str) -> Result<String> {
    optional_text(node, tag).ok_or_else(|| anyhow!("<{tag}> tag is missing"))
}

fn optional_text(node: &Node<'_, '_>, tag: &str) -> Option<String> {
    child(node, tag)
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| text.to_string())
}

fn parse_vec3(value: Option<String>) -> Result<Option<Vec3>> {
    let Some(value) = value else {
        return Ok(None);
    };
    let numbers = value
        .split_whitespace()
        .map(|component| {
            component
                .parse::<f32>()
                .map_err(|err| anyhow!("invalid vector component {component:?}: {err}"))
        })
        .collect::<Result<Vec<_>>>()?;
    match numbers.as_slice() {
        [x, y, z] => Ok(Some(Vec3::new(*x, *y, *z))),
        _ => Err(anyhow!("vector needs 3 components, got {}", numbers.len())),
    }
}

/// Accepts `#rrggbb`, `0xrrggbb` or bare hex digits.
fn parse_color(value: Option<String>) -> Result<Option<u32>> {
    let Some(value) = value else {
        return Ok(None);
    };
    let digits = value
        .strip_prefix('#')
        .or_else(|| value.strip_prefix("0x"))
        .unwrap_or(value.as_str());
    let hex = u32::from_str_radix(digits, 16)
        .map_err(|err| anyhow!("invalid color {value:?}: {err}"))?;
    if hex > 0xffffff {
        bail!("color {value:?} is out of range");
    }
    Ok(Some(hex))
}

fn parse_map_size(value: &str) -> Result<(u32, u32)> {
    let mut parts = value.split_whitespace().map(str::parse::<u32>);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(Ok(width)), Some(Ok(height)), None) => Ok((width, height)),
        (Some(Ok(size)), None, None) => Ok((size, size)),
        _ => Err(anyhow!("invalid map size {value:?}")),
    }
}

fn parse_f32(value: Option<String>) -> Result<Option<f32>> {
    value
        .map(|value| {
            value
                .parse::<f32>()
                .map_err(|err| anyhow!("failed to parse float: {err}"))
        })
        .transpose()
}

fn parse_bool(value: Option<String>) -> Result<Option<bool>> {
    value
        .map(|value| match value.to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(true),
            "false" | "no" | "0" => Ok(false),
            other => Err(anyhow!("invalid boolean: {other}")),
        })
        .transpose()
}
