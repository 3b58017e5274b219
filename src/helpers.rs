use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Express `path` relative to the current working directory. Absolute paths
/// outside the working directory come back `../`-relative; already-relative
/// paths are left untouched.
pub fn relative_to_cwd(path: &Path) -> PathBuf {
    match env::current_dir() {
        Ok(cwd) => relative_from(path, &cwd),
        Err(_) => path.to_path_buf(),
    }
}

fn relative_from(path: &Path, base: &Path) -> PathBuf {
    if !path.is_absolute() {
        return path.to_path_buf();
    }

    let mut path_components = path.components().peekable();
    let mut base_components = base.components().peekable();
    while let (Some(p), Some(b)) = (path_components.peek(), base_components.peek()) {
        if p != b {
            break;
        }
        path_components.next();
        base_components.next();
    }

    let mut relative = PathBuf::new();
    for _ in base_components {
        relative.push("..");
    }
    for component in path_components {
        relative.push(component.as_os_str());
    }
    relative
}

pub fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Could not read {}", path.display()))
}

pub fn read_file_bytes(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("Could not read {}", path.display()))
}

/// True when the text carries something worth forwarding (not just whitespace
/// or control characters).
pub fn contains_ascii_characters(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_graphic())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_path_is_left_untouched() {
        assert_eq!(relative_to_cwd(Path::new("a/b/main.go")), PathBuf::from("a/b/main.go"));
    }

    #[test]
    fn cwd_prefix_is_stripped() {
        let cwd = env::current_dir().unwrap();
        let abs = cwd.join("pkg").join("main.go");
        assert_eq!(relative_to_cwd(&abs), PathBuf::from("pkg/main.go"));
    }

    #[test]
    fn foreign_absolute_path_becomes_dot_dot_relative() {
        let foreign = Path::new("/definitely/not/the/cwd/main.go");
        let relative = relative_to_cwd(foreign);
        assert!(!relative.is_absolute());
        assert!(relative.starts_with(".."));
        assert!(relative.ends_with("definitely/not/the/cwd/main.go"));
    }

    #[test]
    fn relative_from_walks_up_to_the_common_ancestor() {
        assert_eq!(
            relative_from(Path::new("/a/b/c/main.go"), Path::new("/a/b/x/y")),
            PathBuf::from("../../c/main.go")
        );
        assert_eq!(
            relative_from(Path::new("/a/b/main.go"), Path::new("/a/b")),
            PathBuf::from("main.go")
        );
        assert_eq!(
            relative_from(Path::new("pkg/main.go"), Path::new("/a/b")),
            PathBuf::from("pkg/main.go")
        );
    }

    #[test]
    fn whitespace_only_output_is_not_meaningful() {
        assert!(!contains_ascii_characters("  \n\t  "));
        assert!(!contains_ascii_characters(""));
        assert!(contains_ascii_characters("  compiled ok\n"));
    }
}
