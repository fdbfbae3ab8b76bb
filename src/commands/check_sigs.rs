use anyhow::{bail, Result};
use std::path::Path;
use std::sync::Arc;

use crate::runtime::TypeCatalog;
use crate::type_checks::DeclaredSignatures;

/// Parse every signature file in `dir`; returns the number of methods declared
pub fn check_signature_dir(dir: &Path) -> Result<usize> {
    if !dir.is_dir() {
        bail!("Signature directory {} does not exist", dir.display());
    }
    let checker = DeclaredSignatures::new(Arc::new(TypeCatalog::new()));
    Ok(checker.load_dirs(&[dir.to_path_buf()])?)
}

pub fn check_sigs(dir: &Path) -> Result<()> {
    let count = check_signature_dir(dir)?;
    println!("{} signature(s) in {} are valid", count, dir.display());
    Ok(())
}
