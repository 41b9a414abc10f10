// Copyright 2026 The vizrpc developers

//! Groups of endpoints registered together.

pub mod builtin;
pub mod resources;

use std::sync::Arc;

use crate::endpoint::{EndpointRegistry, Endpoints, RegistryError};

pub use builtin::Builtin;
pub use resources::ResourceRegistry;

pub trait Component: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    /// Adds the component's endpoints. A duplicate method aborts startup.
    fn register(self: Arc<Self>, endpoints: &mut EndpointRegistry) -> Result<(), RegistryError>;

    /// Called once the registry is complete and frozen.
    fn attach(&self, _endpoints: &Endpoints) {}
}
