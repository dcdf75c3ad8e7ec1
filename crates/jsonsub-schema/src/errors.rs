use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Clone, Error, Diagnostic)]
pub enum ResolveError {
    #[error("unresolved reference: {pointer}")]
    #[diagnostic(code(jsonsub::resolve::unresolved_reference))]
    UnresolvedReference { pointer: String },

    #[error("malformed $ref at {pointer}: expected a string value")]
    #[diagnostic(code(jsonsub::resolve::malformed_reference))]
    MalformedReference { pointer: String },

    #[error("external reference not supported: {uri}")]
    #[diagnostic(
        code(jsonsub::resolve::external_reference),
        help("only same-document references (`#/...`) are resolvable")
    )]
    ExternalReference { uri: String },

    #[error("cyclic references detected: {}", format_cycles(.cycles))]
    #[diagnostic(
        code(jsonsub::resolve::cyclic_schema),
        help("recursive schemas cannot be unfolded; a simulation-based strategy is required")
    )]
    CyclicSchema { cycles: Vec<Vec<String>> },

    #[error("reference expansion exceeded depth limit ({limit})")]
    #[diagnostic(code(jsonsub::resolve::depth_exceeded))]
    DepthExceeded { limit: usize },
}

fn format_cycles(cycles: &[Vec<String>]) -> String {
    cycles
        .iter()
        .map(|cycle| cycle.join(" -> "))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cyclic_error_lists_every_cycle_in_order() {
        let err = ResolveError::CyclicSchema {
            cycles: vec![
                vec!["#/$defs/A".into(), "#/$defs/B".into()],
                vec!["#/$defs/C".into()],
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("#/$defs/A -> #/$defs/B"));
        assert!(msg.contains("#/$defs/C"));
    }

    #[test]
    fn unresolved_reference_names_the_pointer() {
        let err = ResolveError::UnresolvedReference {
            pointer: "#/$defs/Missing".into(),
        };
        assert_eq!(err.to_string(), "unresolved reference: #/$defs/Missing");
    }
}
