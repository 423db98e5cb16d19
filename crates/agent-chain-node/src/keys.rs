use std::path::Path;

use agent_chain_crypto::KeyPair;
use anyhow::{Context, Result};
use tracing::info;

/// Load the node's keypair from `<data_dir>/node.key` if present, else
/// generate a fresh one and persist it with owner-only permissions (§4.7,
/// §6). A config-supplied `private_key` hex string, if present, takes
/// precedence over both the file and generation.
pub fn load_or_generate(data_dir: &Path, configured_private_key: Option<&str>) -> Result<KeyPair> {
    if let Some(hex_key) = configured_private_key {
        return keypair_from_hex(hex_key).context("parsing configured private_key");
    }

    let key_path = data_dir.join("node.key");
    if key_path.exists() {
        let hex_key = std::fs::read_to_string(&key_path)
            .with_context(|| format!("reading node key {}", key_path.display()))?;
        return keypair_from_hex(hex_key.trim()).with_context(|| format!("parsing node key {}", key_path.display()));
    }

    info!(path = %key_path.display(), "no node key found, generating a fresh keypair");
    let keypair = KeyPair::generate();
    let hex_key = hex::encode(keypair.secret_key_bytes());
    std::fs::write(&key_path, &hex_key).with_context(|| format!("writing node key {}", key_path.display()))?;
    restrict_permissions(&key_path)?;
    Ok(keypair)
}

fn keypair_from_hex(hex_key: &str) -> Result<KeyPair> {
    let bytes = hex::decode(hex_key).context("node key is not valid hex")?;
    let arr: [u8; 32] = bytes.try_into().map_err(|_| anyhow::anyhow!("node key must be 32 bytes"))?;
    KeyPair::from_secret_bytes(arr).map_err(|e| anyhow::anyhow!("invalid node key: {e}"))
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let perms = std::fs::Permissions::from_mode(0o600);
    std::fs::set_permissions(path, perms).with_context(|| format!("restricting permissions on {}", path.display()))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("agent_chain_keys_test_{}_{}", name, std::process::id()))
    }

    #[test]
    fn generates_and_reloads_same_address() {
        let dir = temp_dir("reload");
        std::fs::create_dir_all(&dir).unwrap();

        let first = load_or_generate(&dir, None).unwrap();
        let second = load_or_generate(&dir, None).unwrap();
        assert_eq!(first.address, second.address);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn configured_private_key_takes_precedence() {
        let dir = temp_dir("configured");
        std::fs::create_dir_all(&dir).unwrap();

        let explicit = KeyPair::generate();
        let hex_key = hex::encode(explicit.secret_key_bytes());
        let loaded = load_or_generate(&dir, Some(&hex_key)).unwrap();
        assert_eq!(loaded.address, explicit.address);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[cfg(unix)]
    #[test]
    fn generated_key_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let dir = temp_dir("perms");
        std::fs::create_dir_all(&dir).unwrap();

        let _ = load_or_generate(&dir, None).unwrap();
        let meta = std::fs::metadata(dir.join("node.key")).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o600);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
