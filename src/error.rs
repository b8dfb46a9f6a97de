//! Error types for the organism engine.
//!
//! Only construction-time work can fail: parsing configuration, validating the
//! memory table, and (with the `viewer` feature) bringing up a window and GPU.
//! Everything on the per-frame path degrades locally instead of erroring.

use thiserror::Error;

/// Errors raised while building a [`MemoryGraph`](crate::MemoryGraph).
#[derive(Debug, Error)]
pub enum GraphError {
    /// The node table is not valid JSON or has the wrong shape.
    #[error("failed to parse memory table: {0}")]
    Parse(#[from] serde_json::Error),
    /// The table contains no nodes at all.
    #[error("memory table is empty")]
    Empty,
    /// No node has the `root` type.
    #[error("memory table has no root node")]
    MissingRoot,
    /// More than one node has the `root` type.
    #[error("memory table has {0} root nodes, expected exactly one")]
    MultipleRoots(usize),
    /// Two nodes share an id.
    #[error("duplicate memory id `{0}`")]
    DuplicateId(String),
}

/// Errors raised while loading an [`OrganismConfig`](crate::OrganismConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config is not valid JSON or has the wrong shape.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    /// Failed to read the config file from disk.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    /// A value is outside the range the engine can run with.
    #[error("invalid config value `{field}`: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// Why it was rejected.
        reason: &'static str,
    },
}

/// Top-level error for setting up an organism session.
#[derive(Debug, Error)]
pub enum OrganismError {
    /// Memory table could not be loaded.
    #[error(transparent)]
    Graph(#[from] GraphError),
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors that can occur while starting the windowed viewer.
#[cfg(feature = "viewer")]
#[derive(Debug, Error)]
pub enum ViewerError {
    /// Failed to create the event loop.
    #[error("failed to create event loop: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    /// Failed to create the window.
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    /// Failed to create a surface for rendering.
    #[error("failed to create GPU surface: {0}")]
    SurfaceCreation(#[from] wgpu::CreateSurfaceError),
    /// No compatible GPU adapter found.
    #[error("no compatible GPU adapter found")]
    NoAdapter,
    /// Failed to create the GPU device.
    #[error("failed to create GPU device: {0}")]
    DeviceCreation(#[from] wgpu::RequestDeviceError),
    /// Session setup failed before the window opened.
    #[error(transparent)]
    Organism(#[from] OrganismError),
}
