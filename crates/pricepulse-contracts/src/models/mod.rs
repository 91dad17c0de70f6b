mod registry;
mod selectors;

pub use registry::{Capability, ModelRegistry, ModelSpec, DRYRUN_MODEL};
pub use selectors::{ModelSelection, ModelSelector};
