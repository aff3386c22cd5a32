//! Extended-length path handling.
//!
//! On Windows, paths beyond `MAX_PATH` only stat reliably in the `\\?\`
//! form (`\\?\UNC\` for shares). Stores keep the plain form. Elsewhere both
//! conversions are the identity.

use std::borrow::Cow;
use std::path::Path;

#[cfg(windows)]
const VERBATIM: &str = r"\\?\";
#[cfg(windows)]
const VERBATIM_UNC: &str = r"\\?\UNC\";

/// Form of `path` to hand to the filesystem.
#[cfg(windows)]
pub(crate) fn extended(path: &Path) -> Cow<'_, Path> {
    use std::path::PathBuf;

    let Some(text) = path.to_str() else {
        return Cow::Borrowed(path);
    };
    if text.starts_with(VERBATIM) || !path.is_absolute() {
        Cow::Borrowed(path)
    } else if let Some(share) = text.strip_prefix(r"\\") {
        Cow::Owned(PathBuf::from(format!("{VERBATIM_UNC}{share}")))
    } else {
        Cow::Owned(PathBuf::from(format!("{VERBATIM}{text}")))
    }
}

#[cfg(not(windows))]
pub(crate) fn extended(path: &Path) -> Cow<'_, Path> {
    Cow::Borrowed(path)
}

/// Form of `path` to store and report.
#[cfg(windows)]
pub(crate) fn plain(path: &Path) -> Cow<'_, Path> {
    use std::path::PathBuf;

    let Some(text) = path.to_str() else {
        return Cow::Borrowed(path);
    };
    if let Some(share) = text.strip_prefix(VERBATIM_UNC) {
        Cow::Owned(PathBuf::from(format!(r"\\{share}")))
    } else if let Some(local) = text.strip_prefix(VERBATIM) {
        Cow::Owned(PathBuf::from(local))
    } else {
        Cow::Borrowed(path)
    }
}

#[cfg(not(windows))]
pub(crate) fn plain(path: &Path) -> Cow<'_, Path> {
    Cow::Borrowed(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(windows))]
    #[test]
    fn test_identity_off_windows() {
        let path = Path::new("/very/deep/path/file.txt");
        assert_eq!(extended(path), path);
        assert_eq!(plain(path), path);
    }

    #[cfg(windows)]
    #[test]
    fn test_windows_forms() {
        assert_eq!(
            extended(Path::new(r"C:\data\f.txt")),
            Path::new(r"\\?\C:\data\f.txt")
        );
        assert_eq!(
            extended(Path::new(r"\\server\share\f.txt")),
            Path::new(r"\\?\UNC\server\share\f.txt")
        );
        assert_eq!(plain(Path::new(r"\\?\C:\data\f.txt")), Path::new(r"C:\data\f.txt"));
        assert_eq!(
            plain(Path::new(r"\\?\UNC\server\share\f.txt")),
            Path::new(r"\\server\share\f.txt")
        );
    }
}
