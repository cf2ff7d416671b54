use std::path::{Component, Path, PathBuf};

/// Renders a path for humans: canonical when it exists, otherwise absolute
/// and lexically cleaned.
pub fn best_effort_path_display(path: &Path) -> String {
    match path.canonicalize() {
        Ok(canonical_path) => canonical_path.display().to_string(),
        Err(_) => {
            let absolute_path = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
            lexical_clean(&absolute_path).display().to_string()
        }
    }
}

/// Resolves `.` and `..` components without touching the filesystem.
///
/// A `..` directly below the root stays at the root, the same way the kernel
/// treats `/..`. Leading `..` components of a relative path are kept.
pub fn lexical_clean(path: &Path) -> PathBuf {
    let mut components: Vec<Component> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match components.last() {
                Some(Component::Normal(_)) => {
                    components.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                Some(Component::ParentDir) | Some(Component::CurDir) | None => {
                    components.push(component);
                }
            },
            _ => components.push(component),
        }
    }

    components.iter().collect()
}

pub trait BestEffortPathExt {
    fn best_effort_path_display(&self) -> String;
}

impl BestEffortPathExt for Path {
    fn best_effort_path_display(&self) -> String {
        best_effort_path_display(self)
    }
}

impl BestEffortPathExt for PathBuf {
    fn best_effort_path_display(&self) -> String {
        best_effort_path_display(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[rstest]
    #[case("/a/b/../c", "/a/c")]
    #[case("/a/./b/", "/a/b")]
    #[case("/..", "/")]
    #[case("/a/../../b", "/b")]
    #[case("a/../../b", "../b")]
    #[case("./a", "a")]
    fn test_lexical_clean(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(lexical_clean(Path::new(input)), PathBuf::from(expected));
    }

    #[test]
    fn test_display_of_missing_path_is_absolute() {
        let display = Path::new("does/not/../exist").best_effort_path_display();
        assert!(Path::new(&display).is_absolute());
        assert!(display.ends_with("does/exist"));
    }
}
