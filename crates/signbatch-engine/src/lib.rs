//! Signbatch Engine
//!
//! Orchestration layer between the presentation front-end and `signtool.exe`:
//! - Discovery of the signing tool across Windows SDK install locations
//! - The batch dispatcher: one background worker, strictly sequential files,
//!   per-file events over an mpsc channel
//! - The optional Windows SDK installer collaborator (winget/Chocolatey)

pub mod command;
pub mod discovery;
pub mod dispatch;
pub mod installer;
pub mod session;

pub use discovery::{DiscoveryError, SigntoolLocator, Toolchain};
pub use dispatch::{BatchEvent, DispatchError};
pub use installer::{InstallError, PackageManager, SdkInstaller, SDK_DOWNLOAD_URL};
pub use session::{BatchHandle, SigningSession};
