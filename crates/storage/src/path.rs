//! Storage path validation.
//!
//! Storage paths are always relative to a backend root. Import sources and
//! the preference store both hand paths around that came from somewhere
//! else (a directory walk, a config file), so every backend funnels them
//! through [`validate`] before touching anything.

use crate::error::{ErrorKind, Result};
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

/// Resolve `path` to a normalized path that stays inside the root.
///
/// `.` segments, repeated and trailing separators are dropped, and `..` is
/// resolved lexically. Fails with [`InvalidPath`](ErrorKind::InvalidPath)
/// when the path is empty, climbs above the root, carries a drive prefix
/// or contains a NUL byte. Backslashes are only separators where the
/// platform says so.
///
/// ```
/// use std::path::Path;
/// use shoebox_storage::validate_path;
///
/// assert_eq!(validate_path("Trip//./day2/../beach.jpg/").unwrap(), Path::new("Trip/beach.jpg"));
/// assert!(validate_path("Trip/../../beach.jpg").is_err());
/// assert!(validate_path("./").is_err());
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    let invalid = || exn::Exn::from(ErrorKind::InvalidPath(path.to_path_buf()));

    let mut segments: Vec<&OsStr> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir | Component::RootDir => continue,
            Component::Prefix(_) => return Err(invalid()),
            Component::ParentDir => {
                segments.pop().ok_or_else(invalid)?;
            },
            // NUL survives `components()` on Unix but truncates in syscalls.
            Component::Normal(segment) if segment.as_encoded_bytes().contains(&0) => return Err(invalid()),
            Component::Normal(segment) => segments.push(segment),
        }
    }
    if segments.is_empty() {
        return Err(invalid());
    }
    Ok(segments.into_iter().collect())
}

/// Whether any segment of a (validated) path is hidden, i.e. starts with a
/// dot: `.DS_Store`, `.thumbnails/a.jpg`.
pub(crate) fn is_hidden(path: &Path) -> bool {
    path.iter().any(|segment| segment.as_encoded_bytes().first() == Some(&b'.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Trip/beach.jpg", "Trip/beach.jpg")]
    #[case("2024/Trip/Day 1/clip.mp4", "2024/Trip/Day 1/clip.mp4")]
    #[case("preferences.json", "preferences.json")]
    #[case("/Trip/beach.jpg", "Trip/beach.jpg")]
    #[case("Trip//day2///", "Trip/day2")]
    #[case("./Trip/./beach.jpg", "Trip/beach.jpg")]
    #[case("Trip/day2/..", "Trip")]
    #[case("a/../beach.jpg", "beach.jpg")]
    fn test_valid(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(validate(input).unwrap(), Path::new(expected));
    }

    #[rstest]
    #[case("")]
    #[case(".")]
    #[case("./.")]
    #[case("//")]
    #[case("..")]
    #[case("../etc/passwd")]
    #[case("Trip/../../beach.jpg")]
    #[case("a\0b")]
    fn test_invalid(#[case] input: &str) {
        let err = validate(input).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidPath(p) if p == Path::new(input)));
    }

    #[cfg(windows)]
    #[test]
    fn test_backslashes_are_separators_on_windows() {
        assert_eq!(validate("Trip\\day2/beach.jpg").unwrap(), Path::new("Trip/day2/beach.jpg"));
    }

    #[rstest]
    #[case(".DS_Store", true)]
    #[case("Trip/.thumbnails/a.jpg", true)]
    #[case("Trip/beach.jpg", false)]
    #[case("Trip/beach.tar.gz", false)]
    fn test_is_hidden(#[case] input: &str, #[case] expected: bool) {
        assert_eq!(is_hidden(Path::new(input)), expected);
    }
}
