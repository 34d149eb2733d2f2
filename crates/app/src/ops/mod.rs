pub mod decapsulate;
pub mod encapsulate;
pub mod init;
pub mod keys;
pub mod reencrypt;
pub mod rekey;
pub mod verify;
pub mod version;

pub use decapsulate::Decapsulate;
pub use encapsulate::Encapsulate;
pub use init::Init;
pub use keys::Keys;
pub use reencrypt::Reencrypt;
pub use rekey::Rekey;
pub use verify::Verify;
pub use version::Version;

use std::fs;
use std::path::Path;

use common::prelude::{Capsule, PublicKey};

/// Read an argument given inline or as a path to a file holding it
pub fn read_arg(value: &str) -> std::io::Result<String> {
    let path = Path::new(value);
    if path.is_file() {
        Ok(fs::read_to_string(path)?.trim().to_string())
    } else {
        Ok(value.trim().to_string())
    }
}

/// Parse a public key given as hex or PEM, inline or from a file
pub fn parse_public_key(value: &str) -> Result<PublicKey, String> {
    let text = read_arg(value).map_err(|e| e.to_string())?;
    let key = if text.starts_with("-----BEGIN") {
        PublicKey::from_pem(&text)
    } else {
        PublicKey::from_hex(&text)
    };
    key.map_err(|e| e.to_string())
}

/// Parse a hex capsule, inline or from a file
pub fn parse_capsule(value: &str) -> Result<Capsule, String> {
    let text = read_arg(value).map_err(|e| e.to_string())?;
    Capsule::from_hex(&text).map_err(|e| e.to_string())
}
