//! Render-job lifecycle: submission, the server-sent event stream, and
//! the session state machine that turns events into UI effects.

pub mod client;
pub mod events;
pub mod session;

pub use client::{DrawerClient, RenderRequest, ViewerClient};
pub use events::JobEvent;
pub use session::{JobSession, UiEffect};
