pub mod controller;
pub mod error;
pub mod projector;
pub mod resolver;
pub mod style;
pub mod view;

pub use controller::{DEFAULT_LABEL, Event, NavigationState, Navigator, NavigatorConfig};
pub use error::NavigationIssue;
pub use projector::{FormatConfig, project, project_current};
pub use resolver::{resolve, resolve_position};
pub use view::{InlineView, LinkView, RenderModel, ViewNode};
