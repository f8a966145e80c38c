pub mod context;
pub mod guest;
pub mod process;


pub use context::JsContext;
pub use guest::GuestRuntime;
pub use process::{GuestCommands, ProcessRuntime};
