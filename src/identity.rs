//! Machine and user identity for machine- and user-bound licenses.

use crate::crypto::digest;
use std::env;

/// Supplies the identity strings license `data` is compared against.
pub trait IdentitySource: Send + Sync {
    /// Fingerprint of the current machine.
    fn machine_id(&self) -> String;

    /// Identity of the current user.
    fn user_id(&self) -> String;
}

/// Identity derived from the running system.
///
/// The machine fingerprint hashes OS, architecture, hostname and the
/// platform machine id; the user identity is `host\user`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemIdentity;

impl IdentitySource for SystemIdentity {
    fn machine_id(&self) -> String {
        let mut parts = vec![
            env::consts::OS.to_string(),
            env::consts::ARCH.to_string(),
            host_name(),
        ];
        if let Some(id) = platform_machine_id() {
            parts.push(id);
        }
        digest::sha256_b64(parts.join("|").as_bytes())
    }

    fn user_id(&self) -> String {
        let user = env::var("USER")
            .or_else(|_| env::var("USERNAME"))
            .unwrap_or_else(|_| "unknown".to_string());
        format!("{}\\{}", host_name(), user)
    }
}

/// Fixed identity, for hosts that manage identity themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticIdentity {
    /// Machine fingerprint.
    pub machine: String,
    /// User identity.
    pub user: String,
}

impl IdentitySource for StaticIdentity {
    fn machine_id(&self) -> String {
        self.machine.clone()
    }

    fn user_id(&self) -> String {
        self.user.clone()
    }
}

fn host_name() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}

fn platform_machine_id() -> Option<String> {
    #[cfg(target_os = "linux")]
    {
        ["/etc/machine-id", "/var/lib/dbus/machine-id"]
            .iter()
            .find_map(|path| std::fs::read_to_string(path).ok())
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
    }

    #[cfg(not(target_os = "linux"))]
    {
        dirs::home_dir().map(|home| home.display().to_string())
    }
}
