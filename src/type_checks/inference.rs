//! Signature inference from sampled real calls.
//!
//! Calls are grouped by target and method name in first-seen order. Each
//! positional slot, named key, and the return value collect the union of the
//! runtime types observed there. Named keys are always optional since not
//! every call supplies every key; constructors return `self`.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use super::signature::{MethodSignature, NamedParam, PositionalParam, SigType};
use crate::core::{CallTarget, TypeName, Value};
use crate::method_call::MethodCall;

/// Types observed at one positional slot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotTypes {
    pub types: BTreeSet<TypeName>,
    /// Some sampled call did not reach this slot
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InferredReturn {
    SelfType,
    Union(BTreeSet<TypeName>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferredSignature {
    pub target: CallTarget,
    pub method_name: String,
    pub positional: Vec<SlotTypes>,
    pub named: BTreeMap<String, BTreeSet<TypeName>>,
    pub returns: InferredReturn,
    /// Number of calls the signature was built from
    pub samples: usize,
}

impl InferredSignature {
    pub fn describe(&self) -> String {
        self.target.describe(&self.method_name)
    }

    /// Convert into the form type-check backends consume
    pub fn to_method_signature(&self) -> MethodSignature {
        let positional = self
            .positional
            .iter()
            .map(|slot| PositionalParam {
                ty: SigType::union_of(slot.types.iter().cloned()),
                optional: slot.optional,
            })
            .collect();
        let named = self
            .named
            .iter()
            .map(|(name, types)| NamedParam {
                name: name.clone(),
                ty: SigType::union_of(types.iter().cloned()),
                required: false,
            })
            .collect();
        let returns = match &self.returns {
            InferredReturn::SelfType => SigType::SelfType,
            InferredReturn::Union(types) => SigType::union_of(types.iter().cloned()),
        };

        MethodSignature {
            positional,
            rest: None,
            named,
            named_rest: None,
            returns,
        }
    }

    fn referenced_types(&self) -> impl Iterator<Item = &TypeName> {
        let returned = match &self.returns {
            InferredReturn::SelfType => None,
            InferredReturn::Union(types) => Some(types.iter()),
        };
        self.positional
            .iter()
            .flat_map(|slot| slot.types.iter())
            .chain(self.named.values().flatten())
            .chain(returned.into_iter().flatten())
    }
}

impl fmt::Display for InferredSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.describe(), self.to_method_signature())
    }
}

/// Inferred signatures plus every non-builtin type they mention
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureSet {
    pub signatures: Vec<InferredSignature>,
    pub custom_types: BTreeSet<TypeName>,
}

impl SignatureSet {
    pub fn get(&self, target: &CallTarget, method_name: &str) -> Option<&InferredSignature> {
        self.signatures
            .iter()
            .find(|sig| &sig.target == target && sig.method_name == method_name)
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }
}

/// Type recorded for a sampled value; doubles never contribute
fn observed_type(value: &Value) -> Option<TypeName> {
    match value {
        Value::Double(_) => None,
        other => Some(other.type_name()),
    }
}

fn key_name(key: &Value) -> String {
    match key {
        Value::Symbol(name) | Value::Str(name) => name.clone(),
        other => other.to_string(),
    }
}

fn infer_group(target: &CallTarget, method_name: &str, calls: &[&MethodCall]) -> InferredSignature {
    let max_arity = calls
        .iter()
        .map(|call| call.positional_args().len())
        .max()
        .unwrap_or(0);
    let mut positional = vec![SlotTypes::default(); max_arity];
    let mut named: BTreeMap<String, BTreeSet<TypeName>> = BTreeMap::new();
    let mut returned = BTreeSet::new();

    for call in calls {
        let args = call.positional_args();
        for (index, slot) in positional.iter_mut().enumerate() {
            match args.get(index) {
                Some(value) => slot.types.extend(observed_type(value)),
                None => slot.optional = true,
            }
        }
        for (key, value) in call.named_args() {
            named
                .entry(key_name(key))
                .or_default()
                .extend(observed_type(value));
        }
        if call.metadata.raised.is_none() {
            returned.extend(observed_type(call.return_value()));
        }
    }

    let returns = if method_name == crate::method_call::CONSTRUCTOR {
        InferredReturn::SelfType
    } else {
        InferredReturn::Union(returned)
    };

    InferredSignature {
        target: target.clone(),
        method_name: method_name.to_string(),
        positional,
        named,
        returns,
        samples: calls.len(),
    }
}

/// Build one signature per (target, method) seen in `calls`
pub fn infer_signatures(calls: &[MethodCall]) -> SignatureSet {
    let mut order: Vec<(CallTarget, String)> = Vec::new();
    let mut groups: HashMap<(CallTarget, String), Vec<&MethodCall>> = HashMap::new();

    for call in calls {
        let key = (call.target().clone(), call.method_name().to_string());
        let group = groups.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            Vec::new()
        });
        group.push(call);
    }

    let signatures: Vec<InferredSignature> = order
        .iter()
        .filter_map(|key| {
            let group = groups.get(key)?;
            Some(infer_group(&key.0, &key.1, group))
        })
        .collect();

    let custom_types = signatures
        .iter()
        .flat_map(|sig| sig.referenced_types())
        .filter(|ty| !ty.is_builtin())
        .cloned()
        .collect();

    SignatureSet {
        signatures,
        custom_types,
    }
}
