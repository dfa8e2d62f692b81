use std::env;
use std::fs;

use anyhow::{anyhow, Context, Result};
use log::info;

use crystal_compose::app::{print_final_state, print_scene_summary};
use crystal_compose::{EventLoop, Scene};

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = CliOptions::parse()?;
    let xml = fs::read_to_string(&options.path)
        .with_context(|| format!("failed to read scene {}", options.path))?;
    let scene = Scene::from_xml(&xml).context("failed to parse scene XML")?;

    print_scene_summary(&scene);
    if options.summary_only {
        return Ok(());
    }

    let event_loop = EventLoop::new();
    let graph = scene
        .spawn(event_loop.handle())
        .context("failed to compose scene lights")?;
    let turns = event_loop.run_until_idle();
    info!("event loop idle after {turns} task(s)");

    print_final_state(&graph);
    Ok(())
}

struct CliOptions {
    path: String,
    summary_only: bool,
}

impl CliOptions {
    fn parse() -> Result<Self> {
        let mut args = env::args().skip(1);
        let Some(path) = args.next() else {
            return Err(anyhow!(
                "Usage: crystal-compose <scene.xml> [--summary-only]"
            ));
        };
        let mut summary_only = false;
        for arg in args {
            match arg.as_str() {
                "--summary-only" => summary_only = true,
                other => {
                    return Err(anyhow!(
                        "Unknown argument: {other}. Expected --summary-only"
                    ));
                }
            }
        }
        Ok(Self { path, summary_only })
    }
}
