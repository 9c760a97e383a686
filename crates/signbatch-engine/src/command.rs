//! signtool invocation construction.
//!
//! Every target is signed with the same fixed argument shape:
//!
//! ```text
//! sign /f <pfx> /p <password> /fd SHA256 /tr <url> /td SHA256 /v <target>
//! ```
//!
//! The password travels only inside the argument vector handed to the OS;
//! [`describe_args`] is the form allowed into logs.

use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;

use signbatch_core::batch::SigningRequest;

use crate::discovery::Toolchain;

/// Argument vector for signing one target.
pub fn sign_args(request: &SigningRequest, target: &Path) -> Vec<OsString> {
    let digest = request.digest.as_signtool_arg();
    vec![
        OsString::from("sign"),
        OsString::from("/f"),
        request.certificate.clone().into_os_string(),
        OsString::from("/p"),
        OsString::from(request.password.expose()),
        OsString::from("/fd"),
        OsString::from(digest),
        OsString::from("/tr"),
        OsString::from(&request.timestamp_url),
        OsString::from("/td"),
        OsString::from(digest),
        OsString::from("/v"),
        target.as_os_str().to_os_string(),
    ]
}

/// Log-safe rendering of the argument vector: the value following `/p` is
/// replaced with `***`.
pub fn describe_args(args: &[OsString]) -> String {
    let mut parts = Vec::with_capacity(args.len());
    let mut redact_next = false;
    for arg in args {
        if redact_next {
            parts.push("***".to_string());
            redact_next = false;
            continue;
        }
        if arg.as_os_str() == std::ffi::OsStr::new("/p") {
            redact_next = true;
        }
        parts.push(arg.to_string_lossy().into_owned());
    }
    parts.join(" ")
}

/// Ready-to-spawn signtool command for one target.
///
/// `kill_on_drop` is set so a timed-out invocation does not outlive the
/// dispatcher.
pub fn sign_command(toolchain: &Toolchain, request: &SigningRequest, target: &Path) -> Command {
    let mut cmd = Command::new(&toolchain.signtool);
    cmd.args(sign_args(request, target))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    cmd
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use signbatch_core::PfxPassword;
    use std::path::PathBuf;

    fn request() -> SigningRequest {
        SigningRequest::new(
            PathBuf::from("certs/release.pfx"),
            PfxPassword::new("hunter2"),
            vec![PathBuf::from("out/app.exe")],
        )
    }

    #[test]
    fn argument_shape_matches_signtool_contract() {
        let request = request();
        let args = sign_args(&request, Path::new("out/app.exe"));
        let rendered: Vec<String> = args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            rendered,
            vec![
                "sign",
                "/f",
                "certs/release.pfx",
                "/p",
                "hunter2",
                "/fd",
                "SHA256",
                "/tr",
                "http://timestamp.digicert.com",
                "/td",
                "SHA256",
                "/v",
                "out/app.exe",
            ]
        );
    }

    #[test]
    fn described_args_redact_the_password() {
        let request = request();
        let args = sign_args(&request, Path::new("out/app.exe"));
        let described = describe_args(&args);
        assert!(!described.contains("hunter2"));
        assert!(described.contains("/p ***"));
        assert!(described.contains("/fd SHA256"));
    }

    #[test]
    fn target_is_always_the_final_argument() {
        let request = request();
        let args = sign_args(&request, Path::new("out/helper.dll"));
        assert_eq!(args.last().unwrap().to_string_lossy(), "out/helper.dll");
    }
}
