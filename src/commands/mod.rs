//! CLI command implementations.
//!
//! - **infer**: print signatures inferred from a recording of real calls
//! - **verify**: run the type-check and contract passes over two recordings
//! - **check-sigs**: validate a directory of signature files
//! - **init**: write a default `.doublecheck.toml`

pub mod check_sigs;
pub mod infer;
pub mod init;
pub mod verify;

pub use check_sigs::{check_sigs, check_signature_dir};
pub use infer::{infer, infer_from_recording, render_signatures};
pub use init::init_config;
pub use verify::{run_verify, verify, verify_recordings, VerifyConfig, VerifyOutcome};
