//! External process execution and the `odin query` indexing path.
//! （外部程序執行與 `odin query` 索引路徑。）
//!
//! The runner wraps `std::process::Command` with output capture and a polling
//! timeout. On top of it, [`OdinQuery`] asks the Odin compiler for the global
//! definitions visible from a file and decodes its JSON report.

mod exec;
mod odin;

pub use exec::{RunError, RunExecutor, RunResult, RunSpec};
pub use odin::{OdinQuery, QueryDefinition, QueryError, QueryOutput, QueryPackage};
