//! Repository name and tag grammar
//!
//! Names are one or more path components separated by `/`. A component is lowercase
//! alphanumerics, optionally joined by a single `.`, a single `_`, a double `__`, or
//! a run of `-`. The whole name is at most 255 characters. Tags match
//! `[A-Za-z0-9_][A-Za-z0-9_.-]{0,127}`.

use crate::digest::DigestUtils;
use crate::error::{RegistryError, Result};
use std::fmt;

pub const NAME_TOTAL_LENGTH_MAX: usize = 255;
pub const TAG_LENGTH_MAX: usize = 128;

/// A validated repository name, e.g. `library/alpine`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryName(String);

impl RepositoryName {
    pub fn parse(name: &str) -> Result<Self> {
        if name.is_empty() {
            return Err(RegistryError::Validation("Repository name cannot be empty".to_string()));
        }
        if name.len() > NAME_TOTAL_LENGTH_MAX {
            return Err(RegistryError::Validation(format!(
                "Repository name must not be more than {} characters: {}",
                NAME_TOTAL_LENGTH_MAX, name
            )));
        }
        if let Some(component) = name.split('/').find(|component| !is_valid_component(component)) {
            return Err(RegistryError::Validation(format!(
                "Invalid repository name {}: component '{}' does not match the naming grammar",
                name, component
            )));
        }

        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RepositoryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_alnum(c: u8) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit()
}

fn is_valid_component(component: &str) -> bool {
    let bytes = component.as_bytes();
    let (Some(&first), Some(&last)) = (bytes.first(), bytes.last()) else {
        return false;
    };
    if !is_alnum(first) || !is_alnum(last) {
        return false;
    }

    let mut i = 0;
    while i < bytes.len() {
        if is_alnum(bytes[i]) {
            i += 1;
            continue;
        }

        // Separator run between two alphanumeric runs
        let start = i;
        while i < bytes.len() && !is_alnum(bytes[i]) {
            i += 1;
        }
        let separator = &component[start..i];
        let valid = separator == "."
            || separator == "_"
            || separator == "__"
            || separator.bytes().all(|c| c == b'-');
        if !valid {
            return false;
        }
    }

    true
}

pub fn validate_tag(tag: &str) -> Result<()> {
    let bytes = tag.as_bytes();
    let valid = match bytes.first() {
        Some(&first) => {
            bytes.len() <= TAG_LENGTH_MAX
                && (first.is_ascii_alphanumeric() || first == b'_')
                && bytes[1..]
                    .iter()
                    .all(|&c| c.is_ascii_alphanumeric() || matches!(c, b'_' | b'.' | b'-'))
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(RegistryError::Validation(format!("Invalid tag format: '{}'", tag)))
    }
}

/// Manifest selector: by tag or by content digest
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    Tag(String),
    Digest(String),
}

impl Reference {
    pub fn tag(tag: &str) -> Result<Self> {
        validate_tag(tag)?;
        Ok(Reference::Tag(tag.to_string()))
    }

    pub fn digest(digest: &str) -> Result<Self> {
        DigestUtils::validate(digest)?;
        Ok(Reference::Digest(digest.to_string()))
    }

    /// Path segment used in `/v2/<name>/manifests/<reference>`
    pub fn as_str(&self) -> &str {
        match self {
            Reference::Tag(tag) => tag,
            Reference::Digest(digest) => digest,
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        for name in [
            "alpine",
            "library/alpine",
            "my-org/my--app",
            "a/b/c",
            "foo.bar/baz_qux",
            "foo__bar",
            "0x1/2",
        ] {
            assert!(RepositoryName::parse(name).is_ok(), "{} should be valid", name);
        }
    }

    #[test]
    fn test_invalid_names() {
        for name in [
            "",
            "Library/alpine",
            "library//alpine",
            "/alpine",
            "alpine/",
            "-alpine",
            "alpine.",
            "foo..bar",
            "foo___bar",
            "foo._bar",
            "alpine:3.10",
        ] {
            assert!(RepositoryName::parse(name).is_err(), "{} should be invalid", name);
        }

        let too_long = "a".repeat(NAME_TOTAL_LENGTH_MAX + 1);
        assert!(RepositoryName::parse(&too_long).is_err());
    }

    #[test]
    fn test_tags() {
        for tag in ["v1", "3.10.2", "latest", "_internal", "1.0-rc.1"] {
            assert!(validate_tag(tag).is_ok(), "{} should be valid", tag);
        }
        for tag in ["", ".hidden", "-dash", "with space", "a:b"] {
            assert!(validate_tag(tag).is_err(), "{} should be invalid", tag);
        }
        assert!(validate_tag(&"t".repeat(TAG_LENGTH_MAX + 1)).is_err());
    }

    #[test]
    fn test_reference_constructors() {
        assert_eq!(Reference::tag("v1").unwrap().as_str(), "v1");
        assert!(Reference::digest("sha256:abc").is_err());
        let digest = DigestUtils::compute_docker_digest(b"m");
        assert_eq!(Reference::digest(&digest).unwrap(), Reference::Digest(digest));
    }
}
