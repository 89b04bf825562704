//! Skillchain Process Tools
//!
//! A [`ToolInvoker`](skillchain_engine::ToolInvoker) that runs each tool as an
//! executable from a tools directory. The step's parameters are written to
//! the tool's stdin as JSON and its stdout is read back as the tool output.
//!
//! ```text
//! <tools_dir>/
//! ├── double        # reads {"x": 4}, prints {"result": 8}
//! └── add10
//! ```

mod error;
mod invoker;

pub use error::ProcessToolError;
pub use invoker::{ProcessInvokerConfig, ProcessToolInvoker};
