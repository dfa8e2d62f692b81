use crate::component::BuildState;
use crate::scene::{Scene, SceneGraph, SceneLight};

pub fn print_scene_summary(scene: &Scene) {
    println!("Loaded scene with {} light(s)", scene.lights.len());
    for light in &scene.lights {
        println!(" - {} ({})", light.name, light.kind.as_str());
    }
}

pub fn print_final_state(graph: &SceneGraph) {
    println!("Final light states:");
    for entry in graph.entries() {
        println!(" - {}", describe(&entry.name, entry.light.as_ref()));
    }
}

fn describe(name: &str, light: &dyn SceneLight) -> String {
    match light.summary() {
        Some(summary) => format!(
            "{} pos=({:.2}, {:.2}, {:.2}) color=#{:06x} intensity={:.2} shadow={}",
            name,
            summary.position.x,
            summary.position.y,
            summary.position.z,
            summary.color,
            summary.intensity,
            if summary.cast_shadow { "on" } else { "off" }
        ),
        None => match light.build_state() {
            BuildState::Skipped => format!("{name} (not built)"),
            BuildState::Pending => format!("{name} (pending)"),
            BuildState::Failed(err) => format!("{name} (failed: {err})"),
            BuildState::Ready => format!("{name} (ready)"),
        },
    }
}
