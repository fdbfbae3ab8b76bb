use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

use crate::cli::SignatureFormat;
use crate::recording::Recording;
use crate::runtime::TypeCatalog;
use crate::type_checks::{infer_signatures, SignatureSet};

#[derive(Debug, Serialize)]
struct TypeEntry {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    superclass: Option<String>,
}

#[derive(Debug, Serialize)]
struct MethodEntry {
    method: String,
    signature: String,
}

#[derive(Debug, Serialize)]
struct SignatureFile {
    types: Vec<TypeEntry>,
    methods: Vec<MethodEntry>,
}

#[derive(Debug, Serialize)]
struct InferredEntry {
    method: String,
    signature: String,
    samples: usize,
}

/// Render inferred signatures. The TOML layout is the one signature
/// directories are loaded from, so the output can be saved as-is.
pub fn render_signatures(
    signatures: &SignatureSet,
    catalog: &TypeCatalog,
    format: SignatureFormat,
) -> Result<String> {
    match format {
        SignatureFormat::Toml => {
            let file = SignatureFile {
                types: signatures
                    .custom_types
                    .iter()
                    .map(|name| TypeEntry {
                        name: name.to_string(),
                        superclass: catalog
                            .type_def(name)
                            .and_then(|def| def.superclass.as_ref())
                            .map(ToString::to_string),
                    })
                    .collect(),
                methods: signatures
                    .signatures
                    .iter()
                    .map(|sig| MethodEntry {
                        method: sig.describe(),
                        signature: sig.to_method_signature().to_string(),
                    })
                    .collect(),
            };
            toml::to_string(&file).context("Failed to render signatures as TOML")
        }
        SignatureFormat::Json => {
            let entries: Vec<InferredEntry> = signatures
                .signatures
                .iter()
                .map(|sig| InferredEntry {
                    method: sig.describe(),
                    signature: sig.to_method_signature().to_string(),
                    samples: sig.samples,
                })
                .collect();
            serde_json::to_string_pretty(&entries).context("Failed to render signatures as JSON")
        }
    }
}

pub fn infer_from_recording(calls_path: &Path, format: SignatureFormat) -> Result<String> {
    let recording = Recording::load(calls_path)?;
    let calls = recording.calls()?;
    let signatures = infer_signatures(&calls);
    log::info!(
        "Inferred {} signature(s) from {} call(s)",
        signatures.len(),
        calls.len()
    );
    render_signatures(&signatures, &recording.catalog(), format)
}

pub fn infer(calls_path: &Path, format: SignatureFormat) -> Result<()> {
    let rendered = infer_from_recording(calls_path, format)?;
    println!("{}", rendered.trim_end());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CallTarget, Value};
    use crate::testkit::{real_call, tax_result, TAX_RESULT};
    use crate::type_checks::DeclaredSignatures;
    use crate::runtime::TypeDef;
    use std::sync::Arc;

    fn sampled_calls() -> Vec<crate::method_call::MethodCall> {
        vec![
            real_call(
                CallTarget::instance("TaxCalculator"),
                "for_income",
                vec![Value::Int(89)],
                tax_result(89, 0.22),
            ),
            real_call(
                CallTarget::instance("TaxCalculator"),
                "for_income",
                vec![Value::Int(-10)],
                Value::Nil,
            ),
        ]
    }

    #[test]
    fn test_toml_output_loads_as_signature_file() {
        let signatures = infer_signatures(&sampled_calls());
        let mut catalog = TypeCatalog::new();
        catalog.define_type(TypeDef::new(TAX_RESULT).inherits("Struct"));

        let rendered = render_signatures(&signatures, &catalog, SignatureFormat::Toml).unwrap();
        assert!(rendered.contains("[[methods]]"));
        assert!(rendered.contains("TaxCalculator#for_income"));
        assert!(rendered.contains("superclass = \"Struct\""));

        let checker = DeclaredSignatures::new(Arc::new(catalog));
        assert_eq!(checker.load_str(&rendered, "inferred.toml").unwrap(), 1);
        assert!(checker
            .signature_for(&CallTarget::instance("TaxCalculator"), "for_income")
            .is_some());
    }

    #[test]
    fn test_json_output_reports_samples() {
        let signatures = infer_signatures(&sampled_calls());
        let rendered =
            render_signatures(&signatures, &TypeCatalog::new(), SignatureFormat::Json).unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed[0]["method"], "TaxCalculator#for_income");
        assert_eq!(parsed[0]["samples"], 2);
    }
}
