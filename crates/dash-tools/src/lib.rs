pub mod backend;
pub mod context;
pub mod tools;

pub use backend::{BackendError, Datasource, HttpBackend, ObservabilityBackend, TimeRange};
pub use context::{AppContext, DashboardState, DashboardVariable, PageContext};
pub use tools::register_builtin_tools;
