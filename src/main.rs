mod shader;
mod window;

use organism::config::OrganismConfig;
use organism::error::{OrganismError, ViewerError};
use organism::memory::MemoryGraph;
use tracing_subscriber::EnvFilter;
use winit::event_loop::{ControlFlow, EventLoop};

/// Usage: `organism-viewer [config.json] [memories.json]`
fn main() -> Result<(), ViewerError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("organism=info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => OrganismConfig::load(path).map_err(OrganismError::from)?,
        None => OrganismConfig::default(),
    };
    let graph = match args.next() {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .map_err(|e| OrganismError::from(organism::error::ConfigError::from(e)))?;
            MemoryGraph::from_json(&json).map_err(OrganismError::from)?
        }
        None => MemoryGraph::builtin().map_err(OrganismError::from)?,
    };

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = window::App::new(graph, config)?;
    event_loop.run_app(&mut app)?;

    match app.take_error() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
