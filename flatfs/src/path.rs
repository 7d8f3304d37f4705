//! Helpers for `/`-delimited absolute paths.

use crate::error::{FsError, Result};
use crate::layout::MAX_NAME_LEN;

/// Non-empty components of `path`; repeated and trailing slashes are ignored.
pub fn components(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|part| !part.is_empty())
}

/// Splits `path` into its parent directory and final component. The root has neither.
pub fn split(path: &str) -> Result<(String, &str)> {
    let parts: Vec<&str> = components(path).collect();
    let (name, parents) = parts
        .split_last()
        .ok_or_else(|| FsError::InvalidArgument("path has no final component".to_string()))?;
    Ok((format!("/{}", parents.join("/")), *name))
}

pub fn join(dir: &str, name: &str) -> String {
    if dir.ends_with('/') {
        format!("{}{}", dir, name)
    } else {
        format!("{}/{}", dir, name)
    }
}

/// Whether `path` is `ancestor` or lies underneath it.
pub fn is_within(path: &str, ancestor: &str) -> bool {
    let mut path = components(path);
    components(ancestor).all(|part| path.next() == Some(part))
}

pub fn is_dot_entry(name: &[u8]) -> bool {
    name == b"." || name == b".."
}

/// Names are stored in a fixed-width field and are rejected, never truncated, when too long.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(FsError::InvalidArgument("empty name".to_string()));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(FsError::NameTooLong(MAX_NAME_LEN));
    }
    if name.bytes().any(|b| b == b'/' || b == 0) {
        return Err(FsError::InvalidArgument(format!(
            "name {:?} contains a reserved byte",
            name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_separates_parent_and_name() {
        assert_eq!(split("/a").unwrap(), ("/".to_string(), "a"));
        assert_eq!(split("/a/b/c").unwrap(), ("/a/b".to_string(), "c"));
        assert_eq!(split("//a//b/").unwrap(), ("/a".to_string(), "b"));
        assert!(split("/").is_err());
    }

    #[test]
    fn join_avoids_double_slashes() {
        assert_eq!(join("/", "a"), "/a");
        assert_eq!(join("/a", "b"), "/a/b");
    }

    #[test]
    fn is_within_compares_whole_components() {
        assert!(is_within("/a/b", "/a"));
        assert!(is_within("/a", "/a"));
        assert!(is_within("/a", "/"));
        assert!(!is_within("/ab", "/a"));
        assert!(!is_within("/a", "/a/b"));
    }

    #[test]
    fn validate_name_rejects_bad_names() {
        assert!(validate_name("ok.txt").is_ok());
        assert!(validate_name("..").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("a/b").is_err());
        match validate_name(&"n".repeat(MAX_NAME_LEN + 1)).unwrap_err() {
            FsError::NameTooLong(len) => assert_eq!(len, MAX_NAME_LEN),
            e => panic!("Unexpected error type: {:?}", e),
        }
    }
}
