//! Options read when a package is opened or saved.

use crate::error::{Error, Result};
use crate::opc::constants::limits::{MAX_FIELD_LENGTH, STREAM_CHUNK_SIZE, UNZIP_SIZE_LIMIT};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Caller-supplied options.
///
/// Size limits left unset (or set to zero) are derived from each other and from
/// the built-in defaults; see [`Options::limits`].
///
/// # Examples
///
/// ```
/// use longan::Options;
///
/// let opts = Options::from_yaml("unzip_xml_size_limit: 1024\n").unwrap();
/// let limits = opts.limits().unwrap();
/// assert_eq!(limits.part, 1024);
/// assert_eq!(limits.total, 1000 << 24);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Limit on the summed uncompressed size of all archive entries, in bytes
    pub unzip_size_limit: Option<u64>,

    /// Entries larger than this many bytes are kept in a temporary file
    pub unzip_xml_size_limit: Option<u64>,

    /// Reserved; only its length is validated
    pub password: Option<String>,

    /// Directory for overflow files; the system temp dir when unset
    pub tmp_dir: Option<PathBuf>,
}

/// Resolved size limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Whole-archive limit
    pub total: u64,

    /// Per-part in-memory limit
    pub part: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            total: UNZIP_SIZE_LIMIT,
            part: STREAM_CHUNK_SIZE,
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load options from a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_saphyr::from_str(yaml)
            .map_err(|e| Error::Config(format!("failed to parse options: {}", e)))
    }

    pub fn with_unzip_size_limit(mut self, limit: u64) -> Self {
        self.unzip_size_limit = Some(limit);
        self
    }

    pub fn with_unzip_xml_size_limit(mut self, limit: u64) -> Self {
        self.unzip_xml_size_limit = Some(limit);
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_tmp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.tmp_dir = Some(dir.into());
        self
    }

    /// Validate the options and resolve the effective size limits.
    ///
    /// An unset total defaults to 16000 MiB, raised to the per-part limit if that is
    /// larger. An unset per-part limit defaults to 16 MiB, lowered to the total if
    /// that is smaller. Explicit values with `part > total` are rejected.
    pub fn limits(&self) -> Result<Limits> {
        if self
            .password
            .as_ref()
            .is_some_and(|p| p.chars().count() > MAX_FIELD_LENGTH)
        {
            return Err(Error::PasswordLengthInvalid {
                max: MAX_FIELD_LENGTH,
            });
        }

        let explicit_total = self.unzip_size_limit.filter(|&v| v > 0);
        let explicit_part = self.unzip_xml_size_limit.filter(|&v| v > 0);

        let total = match explicit_total {
            Some(total) => total,
            None => UNZIP_SIZE_LIMIT.max(explicit_part.unwrap_or(0)),
        };
        let part = match explicit_part {
            Some(part) => part,
            None => STREAM_CHUNK_SIZE.min(total),
        };
        if part > total {
            return Err(Error::UnzipSizeLimitOrder);
        }

        Ok(Limits { total, part })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(None, None, UNZIP_SIZE_LIMIT, STREAM_CHUNK_SIZE)]
    #[case(Some(0), Some(0), UNZIP_SIZE_LIMIT, STREAM_CHUNK_SIZE)]
    #[case(Some(1024), None, 1024, 1024)]
    #[case(None, Some(2048), UNZIP_SIZE_LIMIT, 2048)]
    #[case(None, Some(UNZIP_SIZE_LIMIT + 1), UNZIP_SIZE_LIMIT + 1, UNZIP_SIZE_LIMIT + 1)]
    #[case(Some(4096), Some(4096), 4096, 4096)]
    fn test_limit_resolution(
        #[case] total: Option<u64>,
        #[case] part: Option<u64>,
        #[case] want_total: u64,
        #[case] want_part: u64,
    ) {
        let opts = Options {
            unzip_size_limit: total,
            unzip_xml_size_limit: part,
            ..Options::default()
        };
        assert_eq!(
            opts.limits().unwrap(),
            Limits {
                total: want_total,
                part: want_part,
            }
        );
    }

    #[test]
    fn test_part_above_total_is_rejected() {
        let opts = Options::new()
            .with_unzip_size_limit(100)
            .with_unzip_xml_size_limit(101);
        assert!(matches!(opts.limits(), Err(Error::UnzipSizeLimitOrder)));
    }

    #[test]
    fn test_password_length() {
        let ok = Options::new().with_password("p".repeat(MAX_FIELD_LENGTH));
        assert!(ok.limits().is_ok());

        let too_long = Options::new().with_password("p".repeat(MAX_FIELD_LENGTH + 1));
        assert!(matches!(
            too_long.limits(),
            Err(Error::PasswordLengthInvalid { max: 255 })
        ));
    }

    #[test]
    fn test_from_yaml() {
        let yaml = "unzip_size_limit: 1000\nunzip_xml_size_limit: 10\ntmp_dir: /var/tmp\n";
        let opts = Options::from_yaml(yaml).unwrap();
        assert_eq!(opts.unzip_size_limit, Some(1000));
        assert_eq!(opts.unzip_xml_size_limit, Some(10));
        assert_eq!(opts.tmp_dir, Some(PathBuf::from("/var/tmp")));
        assert!(opts.password.is_none());
    }

    #[test]
    fn test_from_yaml_rejects_garbage() {
        assert!(matches!(
            Options::from_yaml("unzip_size_limit: [not, a, number]"),
            Err(Error::Config(_))
        ));
    }
}
