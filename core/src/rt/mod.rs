pub mod context;
pub mod error;
pub mod trace;


pub use context::Context;
pub use error::{ErrorKind, RuntimeError};
pub use trace::{CallFrameInfo, TracebackFrame};
