//! Expanding a shell-style pattern into the input files of a batch run.

use std::path::PathBuf;

use glob::glob;

use crate::error::Result;

/// Regular files matching `pattern`, sorted by path.
///
/// Directories that match are left out. An entry that cannot be read while
/// walking the pattern is an I/O error.
pub fn find_inputs(pattern: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in glob(pattern)? {
        let path = entry.map_err(glob::GlobError::into_error)?;
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::fs;

    #[test]
    fn matches_files_in_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b_rateints.fits", "a_rateints.fits", "notes.txt"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("c_rateints.fits")).unwrap();

        let pattern = format!("{}/*_rateints.fits", dir.path().display());
        let found = find_inputs(&pattern).unwrap();
        assert_eq!(
            found,
            vec![
                dir.path().join("a_rateints.fits"),
                dir.path().join("b_rateints.fits"),
            ]
        );
    }

    #[test]
    fn no_match_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = format!("{}/*.fits", dir.path().display());
        assert!(find_inputs(&pattern).unwrap().is_empty());
    }

    #[test]
    fn malformed_pattern_is_an_error() {
        assert!(matches!(find_inputs("[unclosed"), Err(Error::Pattern(_))));
    }
}
