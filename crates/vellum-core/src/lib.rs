pub mod backends;
pub mod dispatch;
pub mod dom;
pub mod error;
pub mod events;
pub mod handlers;
pub mod pipeline;
pub mod placeholder;
pub mod preferences;
pub mod render;
pub mod session;
pub mod streaming;
pub mod test_utils;
pub mod utils;

pub use dispatch::Dispatcher;
pub use dom::{Document, Markup, NodeId};
pub use error::{Error, Result};
pub use events::{OutboundEvent, Severity};
pub use handlers::{DispatchMode, HandlerRegistry};
pub use pipeline::Pipeline;
pub use preferences::Preferences;
pub use render::{RenderEngine, RenderError, SweepReport};
pub use session::SessionContext;
pub use streaming::{StreamState, StreamingCoordinator};
