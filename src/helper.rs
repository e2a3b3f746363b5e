//! Facts about the pod the operator runs in.

use std::path::Path;

use crate::{Error, Result};

pub const SERVICE_ACCOUNT_NAMESPACE_FILE: &str =
    "/var/run/secrets/kubernetes.io/serviceaccount/namespace";
const HOSTNAME_FILE: &str = "/etc/hostname";

fn read_trimmed(path: impl AsRef<Path>) -> Result<String> {
    std::fs::read_to_string(path)
        .map(|s| s.trim().to_string())
        .map_err(Error::IoError)
}

/// Namespace of the service account mounted into this pod.
pub fn get_my_namespace() -> Result<String> {
    read_namespace_file(SERVICE_ACCOUNT_NAMESPACE_FILE)
}

pub(crate) fn read_namespace_file(path: impl AsRef<Path>) -> Result<String> {
    let ns = read_trimmed(path)?;
    if ns.is_empty() {
        return Err(Error::OtherError("service account namespace file is empty".into()));
    }
    Ok(ns)
}

/// Pod name as seen by the container, `HOSTNAME` first.
pub fn get_my_hostname() -> Result<String> {
    match std::env::var("HOSTNAME") {
        Ok(name) if !name.is_empty() => Ok(name),
        _ => read_trimmed(HOSTNAME_FILE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_file_is_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("namespace");
        std::fs::write(&file, "operators\n").unwrap();
        assert_eq!(read_namespace_file(&file).unwrap(), "operators");

        std::fs::write(&file, "\n").unwrap();
        assert!(read_namespace_file(&file).is_err());
    }

    #[test]
    fn missing_namespace_file_is_an_io_error() {
        let err = read_namespace_file("/nonexistent/serviceaccount/namespace").unwrap_err();
        assert!(matches!(err, Error::IoError(_)));
    }
}
