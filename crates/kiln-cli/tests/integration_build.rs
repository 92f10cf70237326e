//! Integration tests for the build command.
//!
//! These drive `commands::build` with absolute paths so they do not depend on
//! the working directory of the test process.

use kiln_cli::cli::{BuildArgs, ConfigArgs};
use kiln_cli::commands::build;
use kiln_cli::{BuildError, CliError};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct Project {
    temp: TempDir,
}

impl Project {
    fn new() -> Self {
        Self {
            temp: TempDir::new().unwrap(),
        }
    }

    fn root(&self) -> &Path {
        self.temp.path()
    }

    fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.root().join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    fn out_dir(&self) -> PathBuf {
        self.root().join("build")
    }

    fn cache_dir(&self) -> PathBuf {
        self.root().join(".kiln-cache")
    }

    fn args(&self) -> BuildArgs {
        BuildArgs {
            paths: vec![self.root().join("src")],
            config: ConfigArgs {
                config: None,
                cache_dir: Some(self.cache_dir()),
            },
            out_dir: Some(self.out_dir()),
            ..BuildArgs::default()
        }
    }

    fn cache_entries(&self, name: &str) -> usize {
        let dir = self.cache_dir().join(name);
        fs::read_dir(dir)
            .map(|entries| entries.filter_map(|e| e.ok()).count())
            .unwrap_or(0)
    }
}

#[tokio::test]
async fn test_build_writes_css_and_js_outputs() {
    let project = Project::new();
    project.write("src/button.css", ".button {\n  color: red;\n}\n");
    project.write("src/app.js", "export const answer = 42;\n");

    build::execute(project.args()).await.unwrap();

    let out = project.out_dir();
    let css = fs::read_to_string(out.join("button.css")).unwrap();
    assert!(css.starts_with(".button{color:red}"));
    assert!(css.contains("/*# sourceURL=/"));

    let module = fs::read_to_string(out.join("button.css.js")).unwrap();
    assert!(module.starts_with("export const CSS = \""));

    let js = fs::read_to_string(out.join("app.js")).unwrap();
    assert!(js.contains("answer = 42"));
    assert!(js.ends_with("//# sourceMappingURL=app.js.map\n"));
    assert!(out.join("app.js.map").exists());
}

#[tokio::test]
async fn test_build_persists_cache_entries() {
    let project = Project::new();
    project.write("src/a.css", ".a { color: blue }");
    project.write("src/a.js", "export default 1;");

    build::execute(project.args()).await.unwrap();

    assert_eq!(project.cache_entries("css"), 1);
    assert_eq!(project.cache_entries("js-transform"), 1);

    build::execute(project.args()).await.unwrap();
    assert_eq!(project.cache_entries("css"), 1);
}

#[tokio::test]
async fn test_no_cache_writes_nothing() {
    let project = Project::new();
    project.write("src/a.css", ".a { color: blue }");

    let args = BuildArgs {
        no_cache: true,
        ..project.args()
    };
    build::execute(args).await.unwrap();

    assert!(project.out_dir().join("a.css").exists());
    assert_eq!(project.cache_entries("css"), 0);
}

#[tokio::test]
async fn test_no_sourcemap_skips_map_file() {
    let project = Project::new();
    project.write("src/app.js", "export const a = 1;");

    let args = BuildArgs {
        no_sourcemap: true,
        ..project.args()
    };
    build::execute(args).await.unwrap();

    let js = fs::read_to_string(project.out_dir().join("app.js")).unwrap();
    assert!(!js.contains("sourceMappingURL"));
    assert!(!project.out_dir().join("app.js.map").exists());
}

#[tokio::test]
async fn test_first_failure_aborts() {
    let project = Project::new();
    project.write("src/broken.js", "const = ;");
    project.write("src/good.js", "export const ok = true;");

    let err = build::execute(project.args()).await.unwrap_err();
    assert!(matches!(err, CliError::Transform(_)));
    assert!(err.to_string().contains("broken.js"));
}

#[tokio::test]
async fn test_continue_on_error_builds_remaining_files() {
    let project = Project::new();
    project.write("src/broken.js", "const = ;");
    project.write("src/good.js", "export const ok = true;");

    let args = BuildArgs {
        continue_on_error: true,
        ..project.args()
    };
    let err = build::execute(args).await.unwrap_err();

    assert!(matches!(
        err,
        CliError::Build(BuildError::Incomplete { failed: 1, total: 2 })
    ));
    assert!(project.out_dir().join("good.js").exists());
    assert!(!project.out_dir().join("broken.js").exists());
}

#[tokio::test]
async fn test_empty_source_directory() {
    let project = Project::new();
    project.write("src/readme.md", "# nothing to build");

    let err = build::execute(project.args()).await.unwrap_err();
    assert!(matches!(err, CliError::Build(BuildError::NoSources { .. })));
}

#[tokio::test]
async fn test_duplicate_css_output_name() {
    let project = Project::new();
    project.write("src/a/theme.css", ".a { color: red }");
    project.write("src/b/theme.css", ".b { color: blue }");

    let err = build::execute(project.args()).await.unwrap_err();
    assert!(err.to_string().contains("theme"));
}

#[tokio::test]
async fn test_output_directory_is_not_rebuilt() {
    let project = Project::new();
    project.write("a.css", ".a { color: red }");

    let args = BuildArgs {
        paths: vec![project.root().to_path_buf()],
        ..project.args()
    };
    build::execute(args.clone()).await.unwrap();
    build::execute(args).await.unwrap();

    assert!(project.out_dir().join("a.css").exists());
    assert!(!project.out_dir().join("build").exists());
}
