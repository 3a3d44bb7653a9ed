//! Phantom registrations and the table that tracks them.

mod table;

pub use table::{RegistrationTable, DEFAULT_RETENTION};

use crate::error::RegistrationResult;
use crate::liveness::LivenessProber;
use secrecy::{ExposeSecret, SecretVec};
use std::fmt;
use std::net::{IpAddr, SocketAddr};

/// Port phantoms are reached on.
pub const PHANTOM_PORT: u16 = 443;

/// Identifier returned when no key material is available.
pub const NULL_ID: &str = "000000";

/// Digest returned for an absent registration.
pub const NULL_DIGEST: &str = "<nil>";

/// Stand-in for key material in `Debug` output.
const REDACTED: &str = "[REDACTED]";

/// Length of the short identifier, in hex characters.
const ID_LEN: usize = 6;

/// Key material derived from the client handshake.
pub struct SharedKeys {
    shared_secret: SecretVec<u8>,
    phantom_seed: SecretVec<u8>,
}

impl SharedKeys {
    pub fn new(shared_secret: Vec<u8>, phantom_seed: Vec<u8>) -> Self {
        Self {
            shared_secret: SecretVec::new(shared_secret),
            phantom_seed: SecretVec::new(phantom_seed),
        }
    }

    /// Raw shared secret. Never log this.
    pub fn shared_secret(&self) -> &[u8] {
        self.shared_secret.expose_secret()
    }

    /// Seed handed to the address selector.
    pub fn phantom_seed(&self) -> &[u8] {
        self.phantom_seed.expose_secret()
    }
}

impl fmt::Debug for SharedKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedKeys")
            .field("shared_secret", &REDACTED)
            .field("phantom_seed", &REDACTED)
            .finish()
    }
}

/// Protocol options negotiated at registration time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RegistrationFlags(u8);

impl RegistrationFlags {
    pub const UPLOAD_ONLY: u8 = 0x01;
    pub const DARK_DECOY: u8 = 0x02;
    pub const PROXY_HEADER: u8 = 0x04;
    pub const USE_TIL: u8 = 0x08;

    pub const fn new(bits: u8) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, flag: u8) -> bool {
        self.0 & flag == flag
    }
}

impl From<u8> for RegistrationFlags {
    fn from(bits: u8) -> Self {
        Self(bits)
    }
}

impl fmt::LowerHex for RegistrationFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

/// Validated client parameters from the registration handshake.
#[derive(Debug, Clone, Default)]
pub struct ClientParams {
    /// Where the client ultimately wants to go
    pub covert_address: String,
    /// Server name presented in the visible handshake
    pub masked_decoy_server_name: String,
    /// Generation of the decoy list the client selected against
    pub decoy_list_generation: u32,
    /// Whether the client can reach IPv6 phantoms
    pub v6_support: bool,
}

/// One accepted binding between a phantom address and a covert destination.
///
/// Never mutated once built; a re-registration replaces the table entry.
#[derive(Debug)]
pub struct PhantomRegistration {
    phantom: IpAddr,
    keys: SharedKeys,
    covert: String,
    mask: String,
    flags: RegistrationFlags,
}

impl PhantomRegistration {
    pub fn new(
        phantom: IpAddr,
        keys: SharedKeys,
        covert: impl Into<String>,
        mask: impl Into<String>,
        flags: RegistrationFlags,
    ) -> Self {
        Self {
            phantom,
            keys,
            covert: covert.into(),
            mask: mask.into(),
            flags,
        }
    }

    pub fn phantom(&self) -> IpAddr {
        self.phantom
    }

    pub fn keys(&self) -> &SharedKeys {
        &self.keys
    }

    pub fn covert(&self) -> &str {
        &self.covert
    }

    pub fn mask(&self) -> &str {
        &self.mask
    }

    pub fn flags(&self) -> RegistrationFlags {
        self.flags
    }

    /// Digest of the identifying fields, including the full shared secret.
    ///
    /// Only for controlled diagnostics: the output is sensitive.
    pub fn digest(&self) -> String {
        format!(
            "{{phantom={}, covert={}, mask={}, flags={:#04x}, Shared Secret:{}}}",
            self.phantom,
            self.covert,
            self.mask,
            self.flags,
            hex::encode(self.keys.shared_secret())
        )
    }

    /// Short correlation token: the first 6 hex characters of the secret.
    pub fn id_string(&self) -> String {
        let secret = self.keys.shared_secret();
        if secret.len() * 2 < ID_LEN {
            return NULL_ID.to_string();
        }
        hex::encode(&secret[..ID_LEN / 2])
    }

    /// Address probes are sent to. Displays as `host:443` for IPv4 and
    /// `[host]:443` for IPv6.
    pub fn probe_target(&self) -> SocketAddr {
        SocketAddr::new(self.phantom, PHANTOM_PORT)
    }

    /// Check whether something is listening on the phantom.
    pub async fn phantom_is_live(&self, prober: &LivenessProber) -> RegistrationResult<()> {
        prober.probe(self.probe_target()).await
    }
}

/// Digest of a possibly absent registration.
pub fn digest_of(reg: Option<&PhantomRegistration>) -> String {
    reg.map_or_else(|| NULL_DIGEST.to_string(), PhantomRegistration::digest)
}

/// Short identifier of a possibly absent registration.
pub fn id_of(reg: Option<&PhantomRegistration>) -> String {
    reg.map_or_else(|| NULL_ID.to_string(), PhantomRegistration::id_string)
}
