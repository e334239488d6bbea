//! Skills directory synchronization.
//!
//! A set can carry a directory of shared "skills" files. On feature
//! creation the tree is copied into the set root, next to the set's
//! features; failures on this path never abort feature creation.

use std::fs;
use std::path::Path;

use crate::config::{SetConfig, expand_path};
use crate::error::{Result, ThicketError};

/// Name of the shared skills directory inside a set root.
pub const SKILLS_DIR_NAME: &str = ".skills";

/// Copy the set's skills source into `<set_root>/.skills`.
///
/// An absent or unset source is a no-op. An existing destination is
/// replaced, so a re-sync picks up deletions.
pub fn sync_set_skills(set: &SetConfig, set_root: &Path) -> Result<()> {
    if set.skills_dir.is_empty() {
        return Ok(());
    }
    let source = expand_path(&set.skills_dir);
    if !source.exists() {
        return Ok(());
    }

    let dest = set_root.join(SKILLS_DIR_NAME);
    if dest.exists() {
        fs::remove_dir_all(&dest)?;
    }
    copy_tree(&source, &dest)
}

/// Recursively copy a directory tree.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    if !src.is_dir() {
        return Err(ThicketError::Io(std::io::Error::other(format!(
            "{} is not a directory",
            src.display()
        ))));
    }

    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let dst_path = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_tree(&entry.path(), &dst_path)?;
        } else {
            fs::copy(entry.path(), &dst_path)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn set_with_skills(dir: &Path) -> SetConfig {
        SetConfig {
            repos: Vec::new(),
            skills_dir: dir.to_string_lossy().into_owned(),
        }
    }

    #[test]
    fn test_copy_tree_nested() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        fs::create_dir_all(src.join("nested")).unwrap();
        fs::write(src.join("top.md"), "top").unwrap();
        fs::write(src.join("nested").join("deep.md"), "deep").unwrap();

        let dst = temp.path().join("dst");
        copy_tree(&src, &dst).unwrap();

        assert_eq!(fs::read_to_string(dst.join("top.md")).unwrap(), "top");
        assert_eq!(
            fs::read_to_string(dst.join("nested").join("deep.md")).unwrap(),
            "deep"
        );
    }

    #[test]
    fn test_copy_tree_source_not_a_directory() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("file.txt");
        fs::write(&file, "x").unwrap();

        let result = copy_tree(&file, &temp.path().join("dst"));
        assert!(result.is_err());
    }

    #[test]
    fn test_sync_copies_into_set_root() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("skills-src");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("guide.md"), "guide").unwrap();

        let set_root = temp.path().join("core");
        fs::create_dir_all(&set_root).unwrap();

        sync_set_skills(&set_with_skills(&source), &set_root).unwrap();
        assert!(set_root.join(SKILLS_DIR_NAME).join("guide.md").exists());
    }

    #[test]
    fn test_sync_missing_source_is_noop() {
        let temp = TempDir::new().unwrap();
        let set_root = temp.path().join("core");
        fs::create_dir_all(&set_root).unwrap();

        let set = set_with_skills(&temp.path().join("never-created"));
        sync_set_skills(&set, &set_root).unwrap();
        assert!(!set_root.join(SKILLS_DIR_NAME).exists());
    }

    #[test]
    fn test_sync_unset_source_is_noop() {
        let temp = TempDir::new().unwrap();
        let set = SetConfig::default();
        sync_set_skills(&set, temp.path()).unwrap();
        assert!(!temp.path().join(SKILLS_DIR_NAME).exists());
    }

    #[test]
    fn test_resync_replaces_stale_destination() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("skills-src");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("new.md"), "new").unwrap();

        let set_root = temp.path().join("core");
        let dest = set_root.join(SKILLS_DIR_NAME);
        fs::create_dir_all(&dest).unwrap();
        fs::write(dest.join("stale.md"), "stale").unwrap();

        sync_set_skills(&set_with_skills(&source), &set_root).unwrap();
        assert!(dest.join("new.md").exists());
        assert!(!dest.join("stale.md").exists());
    }
}
