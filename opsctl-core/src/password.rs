//! Random password generation and secret file output

use std::fs;
use std::io::Write;
use std::path::Path;

use rand::rngs::OsRng;
use rand::seq::SliceRandom;
use tracing::debug;

use crate::error::{OpsError, Result};

const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";

/// Shortest password that can hold one character of each required class
pub const MIN_PASSWORD_LENGTH: usize = 3;

/// Length used for generated service user passwords
pub const SERVICE_PASSWORD_LENGTH: usize = 30;

/// Generate an alphanumeric password containing at least one lowercase
/// letter, one uppercase letter and one digit.
///
/// Characters are drawn from the OS random source and shuffled so the
/// guaranteed characters do not sit at fixed positions.
pub fn random_password(length: usize) -> Result<String> {
    if length < MIN_PASSWORD_LENGTH {
        return Err(OpsError::PasswordTooShort {
            length,
            minimum: MIN_PASSWORD_LENGTH,
        });
    }

    let alphabet: Vec<u8> = [LOWERCASE, UPPERCASE, DIGITS].concat();
    let mut rng = OsRng;

    let mut chars = Vec::with_capacity(length);
    for class in [LOWERCASE, UPPERCASE, DIGITS] {
        chars.push(*class.choose(&mut rng).expect("non-empty class"));
    }
    for _ in MIN_PASSWORD_LENGTH..length {
        chars.push(*alphabet.choose(&mut rng).expect("non-empty alphabet"));
    }

    chars.shuffle(&mut rng);

    // Every byte comes from an ASCII table above.
    Ok(chars.into_iter().map(char::from).collect())
}

/// Write a secret to `path`, replacing any previous content.
///
/// On unix the file is restricted to the owner (0600).
pub fn write_secret(path: impl AsRef<Path>, content: &str) -> Result<()> {
    let path = path.as_ref();
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
        options.mode(0o600);
        let mut file = options.open(path)?;
        // mode() only applies on creation; tighten a file left by an older run.
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
        file.write_all(content.as_bytes())?;
    }
    #[cfg(not(unix))]
    {
        options.open(path)?.write_all(content.as_bytes())?;
    }

    debug!("Wrote secret to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::tempdir;

    #[test]
    fn test_service_password_shape() {
        let password = random_password(SERVICE_PASSWORD_LENGTH).unwrap();
        assert_eq!(password.len(), 30);
        assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_too_short_rejected() {
        let err = random_password(2).unwrap_err();
        assert!(matches!(
            err,
            OpsError::PasswordTooShort {
                length: 2,
                minimum: 3
            }
        ));
    }

    #[test]
    fn test_write_secret() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".pass");
        write_secret(&path, "first").unwrap();
        write_secret(&path, "second").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_write_secret_tightens_existing_file() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join(".pass");
        fs::write(&path, "a much longer stale secret").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        write_secret(&path, "fresh").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "fresh");
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    proptest! {
        #[test]
        fn prop_password_has_every_class(length in 3usize..64) {
            let password = random_password(length).unwrap();
            prop_assert_eq!(password.len(), length);
            prop_assert!(password.chars().any(|c| c.is_ascii_lowercase()));
            prop_assert!(password.chars().any(|c| c.is_ascii_uppercase()));
            prop_assert!(password.chars().any(|c| c.is_ascii_digit()));
        }
    }
}
