pub mod loader;
pub mod schema;

pub use loader::{load_config, load_diagram, parse_diagram, DataLoadError, Format};
