//! Adapters for the listing portals Vigia can monitor. Each adapter
//! turns search criteria into portal URLs and portal HTML back into
//! candidates and listing details.

pub mod argenprop;
mod parse;
pub mod zonaprop;

pub use argenprop::ArgenpropAdapter;
pub use zonaprop::ZonapropAdapter;

use std::sync::Arc;
use std::time::Duration;
use vigia_core::{PortalRegistry, PortalResult};

/// A registry with every adapter this crate implements. `timeout`
/// bounds each HTTP request; the engine applies its own per-listing
/// deadline on top.
pub fn default_registry(timeout: Duration) -> PortalResult<PortalRegistry> {
    let mut registry = PortalRegistry::new();
    registry.register(Arc::new(ArgenpropAdapter::new(timeout)?));
    registry.register(Arc::new(ZonapropAdapter::new(timeout)?));
    Ok(registry)
}
