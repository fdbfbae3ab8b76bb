//! Backend reading signatures annotated on runtime method definitions.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use super::check::check_call;
use super::errors::{MissingSignature, TypeCheckError};
use super::inference::SignatureSet;
use super::signature::MethodSignature;
use super::{TypeCheckKind, TypeChecker, TypeEnvironment};
use crate::core::CallTarget;
use crate::method_call::MethodCall;

pub struct AnnotatedSignatures {
    env: Arc<dyn TypeEnvironment>,
    inferred: RwLock<HashMap<(CallTarget, String), MethodSignature>>,
}

impl AnnotatedSignatures {
    pub fn new(env: Arc<dyn TypeEnvironment>) -> Self {
        Self {
            env,
            inferred: RwLock::new(HashMap::new()),
        }
    }

    pub fn signature_for(&self, target: &CallTarget, method: &str) -> Option<MethodSignature> {
        self.env.annotated_signature(target, method).or_else(|| {
            self.inferred
                .read()
                .get(&(target.clone(), method.to_string()))
                .cloned()
        })
    }
}

impl TypeChecker for AnnotatedSignatures {
    fn kind(&self) -> TypeCheckKind {
        TypeCheckKind::Annotations
    }

    fn typecheck(&self, call: &MethodCall, raise_on_missing: bool) -> Result<(), TypeCheckError> {
        match self.signature_for(call.target(), call.method_name()) {
            Some(signature) => {
                check_call(&signature, call, self.env.as_ref()).map_err(TypeCheckError::from)
            }
            None if raise_on_missing => Err(MissingSignature {
                method: call.describe(),
                hint: Some("Annotate the method or set raise_on_missing_types = false".to_string()),
            }
            .into()),
            None => Ok(()),
        }
    }

    fn load_signatures(&self, signatures: &SignatureSet) {
        let mut inferred = self.inferred.write();
        for sig in &signatures.signatures {
            inferred.insert(
                (sig.target.clone(), sig.method_name.clone()),
                sig.to_method_signature(),
            );
        }
        log::debug!("Loaded {} inferred signature(s)", signatures.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{MethodShape, Value};
    use crate::runtime::{Runtime, TypeDef};
    use crate::type_checks::infer_signatures;

    fn runtime() -> Arc<Runtime> {
        let runtime = Runtime::new();
        runtime.define_type(TypeDef::new("TaxCalculator"));
        runtime.define_method(
            CallTarget::instance("TaxCalculator"),
            "for_income",
            MethodShape::new().req("val"),
            "tax_calculator.rs:10",
            |_, _, args| Ok(args.first().cloned().unwrap_or(Value::Nil)),
        );
        Arc::new(runtime)
    }

    #[test]
    fn test_annotation_takes_precedence_over_inferred() {
        let runtime = runtime();
        let target = CallTarget::instance("TaxCalculator");
        runtime.annotate(
            &target,
            "for_income",
            MethodSignature::parse("(Integer) -> Integer").unwrap(),
        );

        let checker = AnnotatedSignatures::new(runtime);
        checker.load_signatures(&infer_signatures(&[MethodCall::new(
            target.clone(),
            "for_income",
            vec![Value::str("x")],
        )
        .with_return(Value::str("x"))]));

        let call = MethodCall::new(target, "for_income", vec![Value::str("125")]).with_return(Value::Int(1));
        let err = checker.typecheck(&call, true).unwrap_err();
        assert!(err.to_string().contains("ArgumentTypeError"));
    }

    #[test]
    fn test_inferred_fills_unannotated_methods() {
        let runtime = runtime();
        let target = CallTarget::instance("TaxCalculator");
        let checker = AnnotatedSignatures::new(runtime);
        assert!(checker.signature_for(&target, "for_income").is_none());

        checker.load_signatures(&infer_signatures(&[MethodCall::new(
            target.clone(),
            "for_income",
            vec![Value::Int(1)],
        )
        .with_return(Value::Int(1))]));
        assert!(checker.signature_for(&target, "for_income").is_some());
    }
}
