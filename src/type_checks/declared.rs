//! Backend reading declared signatures from TOML files.
//!
//! Every `*.toml` file directly inside a load directory is read:
//!
//! ```toml
//! [[types]]
//! name = "TaxCalculator::Result"
//! superclass = "Struct"
//!
//! [[methods]]
//! method = "TaxCalculator#for_income"
//! signature = "(Integer) -> TaxCalculator::Result"
//! ```
//!
//! Declared signatures take precedence; inferred signatures only fill in
//! methods nothing was declared for.

use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::check::check_call;
use super::errors::{MissingSignature, TypeCheckError};
use super::inference::SignatureSet;
use super::signature::MethodSignature;
use super::{LayeredHierarchy, TypeCheckKind, TypeChecker, TypeEnvironment};
use crate::core::{CallTarget, Error, Result, ResultExt, TypeName};
use crate::method_call::MethodCall;

#[derive(Debug, Deserialize)]
struct SignatureFile {
    #[serde(default)]
    types: Vec<TypeEntry>,
    #[serde(default)]
    methods: Vec<MethodEntry>,
}

#[derive(Debug, Deserialize)]
struct TypeEntry {
    name: String,
    superclass: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MethodEntry {
    method: String,
    signature: String,
}

type SignatureKey = (CallTarget, String);

pub struct DeclaredSignatures {
    env: Arc<dyn TypeEnvironment>,
    declared: RwLock<HashMap<SignatureKey, MethodSignature>>,
    inferred: RwLock<HashMap<SignatureKey, MethodSignature>>,
    declared_types: RwLock<HashMap<TypeName, Option<TypeName>>>,
}

impl DeclaredSignatures {
    pub fn new(env: Arc<dyn TypeEnvironment>) -> Self {
        Self {
            env,
            declared: RwLock::new(HashMap::new()),
            inferred: RwLock::new(HashMap::new()),
            declared_types: RwLock::new(HashMap::new()),
        }
    }

    /// Load every signature file in `dirs`; missing directories are skipped
    pub fn load_dirs(&self, dirs: &[PathBuf]) -> Result<usize> {
        let mut loaded = 0;
        for dir in dirs {
            if !dir.is_dir() {
                log::debug!("Signature dir {} does not exist, skipping", dir.display());
                continue;
            }
            loaded += self.load_dir(dir)?;
        }
        Ok(loaded)
    }

    fn load_dir(&self, dir: &Path) -> Result<usize> {
        let entries = fs::read_dir(dir).map_err(|e| {
            Error::file_system(
                format!("Cannot read signature dir {}", dir.display()),
                dir,
                e,
            )
        })?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "toml"))
            .collect();
        files.sort();

        let mut loaded = 0;
        for file in files {
            let contents = fs::read_to_string(&file).map_err(|e| {
                Error::file_system(
                    format!("Cannot read signature file {}", file.display()),
                    &file,
                    e,
                )
            })?;
            loaded += self.load_str(&contents, &file.display().to_string())?;
        }
        Ok(loaded)
    }

    /// Load signatures from TOML source; returns the number of methods declared
    pub fn load_str(&self, contents: &str, source_name: &str) -> Result<usize> {
        let file: SignatureFile = toml::from_str(contents)
            .map_err(Error::from)
            .context(format!("Failed to parse signature file {}", source_name))?;

        {
            let mut types = self.declared_types.write();
            for entry in file.types {
                types.insert(TypeName::new(entry.name), entry.superclass.map(TypeName::new));
            }
        }

        let count = file.methods.len();
        for entry in file.methods {
            let (target, method) = CallTarget::parse_method_ref(&entry.method).ok_or_else(|| {
                Error::signature(
                    format!("invalid method reference `{}`", entry.method),
                    Some(source_name.to_string()),
                )
            })?;
            let signature = MethodSignature::parse(&entry.signature).map_err(|e| match e {
                Error::Signature { message, .. } => Error::Signature {
                    message: format!("{}: {}", entry.method, message),
                    source_name: Some(source_name.to_string()),
                },
                other => other,
            })?;
            self.warn_unknown_types(&entry.method, &signature);
            self.declare(target, method, signature);
        }

        Ok(count)
    }

    pub fn declare(&self, target: CallTarget, method: impl Into<String>, signature: MethodSignature) {
        self.declared.write().insert((target, method.into()), signature);
    }

    /// Declared signature, else the inferred one
    pub fn signature_for(&self, target: &CallTarget, method: &str) -> Option<MethodSignature> {
        let key = (target.clone(), method.to_string());
        if let Some(sig) = self.declared.read().get(&key) {
            return Some(sig.clone());
        }
        self.inferred.read().get(&key).cloned()
    }

    fn knows_type(&self, name: &TypeName) -> bool {
        self.env.knows_type(name) || self.declared_types.read().contains_key(name)
    }

    fn warn_unknown_types(&self, method: &str, signature: &MethodSignature) {
        for ty in signature.referenced_types() {
            if !self.knows_type(&ty) {
                log::warn!("Unknown type `{}` referenced by {}", ty, method);
            }
        }
    }
}

impl TypeChecker for DeclaredSignatures {
    fn kind(&self) -> TypeCheckKind {
        TypeCheckKind::Signatures
    }

    fn typecheck(&self, call: &MethodCall, raise_on_missing: bool) -> std::result::Result<(), TypeCheckError> {
        let Some(signature) = self.signature_for(call.target(), call.method_name()) else {
            if raise_on_missing {
                return Err(MissingSignature {
                    method: call.describe(),
                    hint: Some(
                        "Declare it in a signature file or set raise_on_missing_types = false"
                            .to_string(),
                    ),
                }
                .into());
            }
            log::debug!("No signature for {}, skipping", call.describe());
            return Ok(());
        };

        let declared_types = self.declared_types.read();
        let hierarchy = LayeredHierarchy {
            env: self.env.as_ref(),
            declared: &declared_types,
        };
        check_call(&signature, call, &hierarchy).map_err(TypeCheckError::from)
    }

    fn load_signatures(&self, signatures: &SignatureSet) {
        let declared = self.declared.read();
        let mut inferred = self.inferred.write();
        let mut skipped = 0;

        for sig in &signatures.signatures {
            let key = (sig.target.clone(), sig.method_name.clone());
            if declared.contains_key(&key) {
                skipped += 1;
                continue;
            }
            inferred.insert(key, sig.to_method_signature());
        }

        let unknown: BTreeSet<&TypeName> = signatures
            .custom_types
            .iter()
            .filter(|ty| !self.knows_type(ty))
            .collect();
        for ty in unknown {
            log::debug!("Inferred signatures reference undeclared type `{}`", ty);
        }

        log::debug!(
            "Loaded {} inferred signature(s), {} shadowed by declarations",
            signatures.len() - skipped,
            skipped
        );
    }
}
