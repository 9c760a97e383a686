//! PFX password handling.
//!
//! The certificate password is the one secret this tool touches. It is held
//! in a zeroizing container, redacted from `Debug` output, and never
//! serialized or logged.

use zeroize::Zeroizing;

/// Password protecting a PFX certificate container.
///
/// The inner string is wiped from memory on drop. An empty password is a
/// valid value: some certificates ship without one, and the signing tool
/// decides whether it is acceptable.
#[derive(Clone)]
pub struct PfxPassword(Zeroizing<String>);

impl PfxPassword {
    pub fn new(password: impl Into<String>) -> Self {
        Self(Zeroizing::new(password.into()))
    }

    /// Access the raw password for handing to the signing subprocess.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for PfxPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PfxPassword(***)")
    }
}

impl From<&str> for PfxPassword {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
