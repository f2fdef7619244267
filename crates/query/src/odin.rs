//! `odin query -global-definitions` invocation and its JSON report.
//! （`odin query -global-definitions` 的呼叫與 JSON 報告。）

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::exec::{RunError, RunExecutor, RunSpec};

/// Ways the external query path can fail. Callers fall back to pattern extraction.
/// （外部查詢路徑的失敗情形，呼叫端會退回樣式擷取。）
#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    Run(#[from] RunError),
    #[error("odin query timed out after {0:?}")]
    TimedOut(Duration),
    #[error("odin query exited with {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },
    #[error("odin query produced malformed output: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Report printed by `odin query <file> -global-definitions`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QueryOutput {
    #[serde(default)]
    pub packages: Vec<QueryPackage>,
    #[serde(default)]
    pub definitions: Vec<QueryDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QueryPackage {
    pub name: String,
    #[serde(default)]
    pub fullpath: Option<String>,
    #[serde(default)]
    pub files: Vec<String>,
}

/// One global definition. `kind` is one of `procedure`, `procedure group`,
/// `constant`, `type name` or `variable`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QueryDefinition {
    pub package: String,
    pub name: String,
    pub kind: String,
    #[serde(default)]
    pub type_kind: Option<String>,
    #[serde(default, rename = "type")]
    pub ty: Option<String>,
    #[serde(default)]
    pub filepath: Option<String>,
    #[serde(default)]
    pub line: Option<u32>,
}

impl QueryOutput {
    pub fn from_json(bytes: &[u8]) -> Result<Self, QueryError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Definitions belonging to `package`, in report order.
    pub fn definitions_for<'a>(
        &'a self,
        package: &'a str,
    ) -> impl Iterator<Item = &'a QueryDefinition> + 'a {
        self.definitions
            .iter()
            .filter(move |definition| definition.package == package)
    }
}

/// Invokes the Odin compiler's query mode.
/// （呼叫 Odin 編譯器的 query 模式。）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OdinQuery {
    pub executable: String,
    pub timeout: Duration,
}

impl OdinQuery {
    pub fn new(executable: impl Into<String>, timeout: Duration) -> Self {
        Self {
            executable: executable.into(),
            timeout,
        }
    }

    pub fn spec(&self, file: &Path) -> RunSpec {
        let mut spec = RunSpec::new(self.executable.clone())
            .with_args([
                "query".to_string(),
                file.display().to_string(),
                "-global-definitions".to_string(),
            ])
            .with_timeout(self.timeout);
        if let Some(dir) = file.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            spec = spec.with_working_dir(dir);
        }
        spec
    }

    /// Runs `odin query` for `file` and decodes the report.
    /// （對 `file` 執行 `odin query` 並解析報告。）
    pub fn run(&self, file: &Path) -> Result<QueryOutput, QueryError> {
        let result = RunExecutor::execute(&self.spec(file))?;
        if result.timed_out {
            return Err(QueryError::TimedOut(self.timeout));
        }
        if !result.success() {
            return Err(QueryError::Failed {
                code: result.exit_code,
                stderr: result.stderr_lossy(),
            });
        }
        let output = QueryOutput::from_json(&result.stdout)?;
        debug!(
            file = %file.display(),
            packages = output.packages.len(),
            definitions = output.definitions.len(),
            elapsed_ms = result.duration.as_millis() as u64,
            "odin query finished"
        );
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = r#"{
        "packages": [
            { "name": "main", "fullpath": "/work/app", "files": ["/work/app/main.odin"] },
            { "name": "fmt", "fullpath": "/odin/core/fmt", "files": [] }
        ],
        "definitions": [
            { "package": "fmt", "name": "println", "kind": "procedure",
              "type": "proc(args: ..any, sep := \" \") -> int", "line": 10 },
            { "package": "fmt", "name": "Info", "kind": "type name", "type_kind": "struct", "type": "Info" },
            { "package": "main", "name": "main", "kind": "procedure", "type": "proc()" }
        ]
    }"#;

    #[test]
    fn decodes_report_and_filters_by_package() {
        let output = QueryOutput::from_json(REPORT.as_bytes()).unwrap();
        assert_eq!(output.packages.len(), 2);
        let fmt: Vec<_> = output.definitions_for("fmt").collect();
        assert_eq!(fmt.len(), 2);
        assert_eq!(fmt[0].ty.as_deref(), Some("proc(args: ..any, sep := \" \") -> int"));
        assert_eq!(fmt[1].type_kind.as_deref(), Some("struct"));
    }

    #[test]
    fn malformed_report_is_an_error() {
        let err = QueryOutput::from_json(b"odin: unknown command").unwrap_err();
        assert!(matches!(err, QueryError::Malformed(_)));
    }

    #[test]
    fn spec_passes_file_and_flag() {
        let query = OdinQuery::new("odin", Duration::from_secs(1));
        let spec = query.spec(Path::new("/work/app/main.odin"));
        assert_eq!(spec.program, "odin");
        assert_eq!(
            spec.args,
            vec!["query", "/work/app/main.odin", "-global-definitions"]
        );
        assert_eq!(spec.working_dir.as_deref(), Some(Path::new("/work/app")));
    }

    #[cfg(unix)]
    #[test]
    fn failing_executable_reports_exit_status() {
        let dir = tempfile::tempdir().unwrap();
        // `sh query ...` cannot open a script named "query" and exits non-zero.
        let query = OdinQuery::new("sh", Duration::from_secs(5));
        let err = query.run(&dir.path().join("main.odin")).unwrap_err();
        match err {
            QueryError::Failed { code, stderr } => {
                assert!(matches!(code, Some(code) if code != 0));
                assert!(!stderr.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
