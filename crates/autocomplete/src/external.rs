//! Completions built from `odin query` reports.
//! （由 `odin query` 報告建立補全項目。）

use odinsense_query::{QueryDefinition, QueryOutput};
use odinsense_symbols::{procedure_type_signature, split_params};

use crate::completion::{procedure_completion, type_completion, Completion, CompletionKind};

pub fn completion_from_query(definition: &QueryDefinition) -> Option<Completion> {
    let name = definition.name.as_str();
    let package = definition.package.as_str();
    match definition.kind.as_str() {
        "procedure" => {
            let signature = definition.ty.as_deref().and_then(procedure_type_signature)?;
            Some(procedure_completion(
                name,
                &split_params(&signature.params),
                signature.return_type.as_deref(),
                package,
            ))
        }
        "type name" => Some(type_completion(
            name,
            definition.type_kind.as_deref().unwrap_or("type"),
            package,
        )),
        "constant" => Some(Completion::new(
            format!("{name}\tconstant {package}"),
            name,
            CompletionKind::Constant,
        )),
        "variable" => Some(Completion::new(
            format!("{name}\t{} {package}", definition.ty.as_deref().unwrap_or("variable")),
            name,
            CompletionKind::Variable,
        )),
        "procedure group" => Some(Completion::new(
            format!("{name}(..)\tproc group {package}"),
            format!("{name}($1)"),
            CompletionKind::ProcedureGroup,
        )),
        _ => None,
    }
}

/// Completions for every definition of `package` in the report.
pub fn package_completions(output: &QueryOutput, package: &str) -> Vec<Completion> {
    output
        .definitions_for(package)
        .filter_map(completion_from_query)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = r#"{
        "packages": [{ "name": "fmt" }],
        "definitions": [
            { "package": "fmt", "name": "println", "kind": "procedure",
              "type": "proc(args: ..any, sep := \" \", flush := true) -> int" },
            { "package": "fmt", "name": "Info", "kind": "type name", "type_kind": "struct" },
            { "package": "fmt", "name": "print_any", "kind": "procedure group" },
            { "package": "fmt", "name": "DEFAULT_BUFFER", "kind": "constant" },
            { "package": "fmt", "name": "stdout_handle", "kind": "variable", "type": "Handle" },
            { "package": "fmt", "name": "weird", "kind": "label" },
            { "package": "os", "name": "exit", "kind": "procedure", "type": "proc(code: int)" }
        ]
    }"#;

    #[test]
    fn converts_each_definition_kind() {
        let output = QueryOutput::from_json(REPORT.as_bytes()).unwrap();
        let completions = package_completions(&output, "fmt");
        let labels: Vec<_> = completions.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "println(args: ..any, sep := \" \", flush := true) -> int\tfmt",
                "Info\tstruct fmt",
                "print_any(..)\tproc group fmt",
                "DEFAULT_BUFFER\tconstant fmt",
                "stdout_handle\tHandle fmt",
            ]
        );
        assert_eq!(
            completions[0].insert_text,
            "println(${1:args: ..any}, ${2:sep := \" \"}, ${3:flush := true})"
        );
    }
}
