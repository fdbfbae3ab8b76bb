//! JSON recordings of captured calls.
//!
//! A recording holds the types the calls refer to and the calls
//! themselves, so real and mocked calls captured in one process can be
//! verified in another:
//!
//! ```json
//! {
//!   "types": [{ "name": "TaxCalculator::Result" }],
//!   "calls": [
//!     { "method": "TaxCalculator#for_income", "arguments": [{ "Int": 89 }], "returns": { "Int": 19 } }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::core::{CallTarget, Error, Result, TypeName, Value};
use crate::method_call::MethodCall;
use crate::runtime::{TypeCatalog, TypeDef};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedType {
    pub name: TypeName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub superclass: Option<TypeName>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedCall {
    /// `Type#method` or `Type.method`
    pub method: String,
    #[serde(default)]
    pub arguments: Vec<Value>,
    /// Whether the trailing argument is a named-argument map
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub named_args: Option<bool>,
    /// Absent when the call never returned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mocked_object: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raised: Option<String>,
}

impl RecordedCall {
    pub fn from_call(call: &MethodCall) -> Self {
        Self {
            method: call.describe(),
            arguments: call.arguments().to_vec(),
            named_args: call.has_named_args().then_some(true),
            returns: call.is_completed().then(|| call.return_value().clone()),
            mocked_object: call.mocked_object().cloned(),
            location: call.metadata.location.clone(),
            example: call.metadata.example.clone(),
            raised: call.metadata.raised.clone(),
        }
    }

    pub fn to_call(&self) -> Result<MethodCall> {
        let (target, method) = CallTarget::parse_method_ref(&self.method).ok_or_else(|| {
            Error::Recording(format!(
                "invalid method reference `{}`, expected Type#method or Type.method",
                self.method
            ))
        })?;

        let mut call = MethodCall::new(target, method, self.arguments.clone())
            .with_named_args(self.named_args.unwrap_or(false))
            .with_example(self.example.clone());
        if let Some(value) = &self.returns {
            call = call.with_return(value.clone());
        }
        if let Some(object) = &self.mocked_object {
            call = call.with_mocked_object(object.clone());
        }
        if let Some(location) = &self.location {
            call = call.with_location(location.clone());
        }
        call.metadata.raised = self.raised.clone();
        Ok(call)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    #[serde(default)]
    pub types: Vec<RecordedType>,
    #[serde(default)]
    pub calls: Vec<RecordedCall>,
}

impl Recording {
    pub fn from_calls<'c>(calls: impl IntoIterator<Item = &'c MethodCall>) -> Self {
        Self {
            types: Vec::new(),
            calls: calls.into_iter().map(RecordedCall::from_call).collect(),
        }
    }

    /// Record the user-defined types of `catalog` alongside the calls
    pub fn with_catalog(mut self, catalog: &TypeCatalog) -> Self {
        let mut names: Vec<&TypeName> = catalog.type_names().collect();
        names.sort();
        self.types = names
            .into_iter()
            .filter_map(|name| catalog.type_def(name))
            .map(|def| RecordedType {
                name: def.name.clone(),
                superclass: def.superclass.clone(),
            })
            .collect();
        self
    }

    pub fn calls(&self) -> Result<Vec<MethodCall>> {
        self.calls.iter().map(RecordedCall::to_call).collect()
    }

    /// Catalog declaring the recorded types and their hierarchy
    pub fn catalog(&self) -> TypeCatalog {
        let mut catalog = TypeCatalog::new();
        for recorded in &self.types {
            let mut def = TypeDef::new(recorded.name.clone());
            def.superclass = recorded.superclass.clone();
            catalog.define_type(def);
        }
        catalog
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| Error::file_system("Cannot read recording", path, e))?;
        Self::from_json(&contents).map_err(|e| e.with_context(path.display().to_string()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json()?)
            .map_err(|e| Error::file_system("Cannot write recording", path, e))
    }
}
