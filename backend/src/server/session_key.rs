//! Session cookie key loading.
//!
//! The key signs and encrypts the cookie issued by the authentication
//! service, so both services read the same mounted secret. Key bytes are
//! wiped from memory once the derived key exists.

use std::path::{Path, PathBuf};

use actix_web::cookie::Key;
use cap_std::{ambient_authority, fs::Dir};
use tracing::warn;
use zeroize::Zeroize;

/// Bytes `Key::derive_from` needs at the very least.
const DERIVE_MIN_LEN: usize = 32;
/// Bytes required of release-build key files.
pub const RELEASE_MIN_LEN: usize = 64;

/// Errors raised while loading the session key.
#[derive(Debug, thiserror::Error)]
pub enum SessionKeyError {
    /// The key file could not be read and no fallback was allowed.
    #[error("failed to read session key at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The key file is shorter than the build requires.
    #[error("session key at {path} too short: need >= {min_len} bytes, got {length}")]
    TooShort {
        path: PathBuf,
        length: usize,
        min_len: usize,
    },
}

fn read_key_bytes(path: &Path) -> std::io::Result<Vec<u8>> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path.file_name().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "key path has no file name")
    })?;
    let dir = Dir::open_ambient_dir(parent, ambient_authority())?;
    dir.read(file_name)
}

/// Load the cookie key from `path`.
///
/// An unreadable file yields a generated key when `allow_ephemeral` is set;
/// sessions then do not survive a restart and cannot be shared with the
/// authentication service.
pub fn load_session_key(
    path: &Path,
    allow_ephemeral: bool,
    release_build: bool,
) -> Result<Key, SessionKeyError> {
    let min_len = if release_build {
        RELEASE_MIN_LEN
    } else {
        DERIVE_MIN_LEN
    };
    match read_key_bytes(path) {
        Ok(mut bytes) => {
            let length = bytes.len();
            if length < min_len {
                bytes.zeroize();
                return Err(SessionKeyError::TooShort {
                    path: path.to_owned(),
                    length,
                    min_len,
                });
            }
            let key = Key::derive_from(&bytes);
            bytes.zeroize();
            Ok(key)
        }
        Err(source) if allow_ephemeral => {
            warn!(
                path = %path.display(),
                error = %source,
                "using temporary session key (dev only)"
            );
            Ok(Key::generate())
        }
        Err(source) => Err(SessionKeyError::Read {
            path: path.to_owned(),
            source,
        }),
    }
}
