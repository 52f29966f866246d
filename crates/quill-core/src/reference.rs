/*
 * reference.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Resolution of <%@ Assembly Name="..." %> references to files.
 */

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::compiler::CompilerService;

/// Extensions tried for an assembly, in order.
const ASSEMBLY_EXTENSIONS: &[&str] = &["dll", "exe"];

/// Turns simple assembly names into paths.
///
/// A name is looked up, in order, among the framework assemblies the
/// compiler knows about, in the dependency paths (by exact file name,
/// `.dll` before `.exe`), and in the output directory.
pub struct ReferenceResolver<'a> {
    compiler: &'a dyn CompilerService,
    dependency_paths: &'a [PathBuf],
    output_dir: Option<&'a Path>,
}

impl<'a> ReferenceResolver<'a> {
    pub fn new(
        compiler: &'a dyn CompilerService,
        dependency_paths: &'a [PathBuf],
        output_dir: Option<&'a Path>,
    ) -> Self {
        ReferenceResolver {
            compiler,
            dependency_paths,
            output_dir,
        }
    }

    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        if let Some(path) = self.compiler.resolve_framework_reference(name) {
            debug!(name, path = %path.display(), "framework reference");
            return Some(path);
        }

        for extension in ASSEMBLY_EXTENSIONS {
            let file_name = format!("{name}.{extension}");
            let found = self
                .dependency_paths
                .iter()
                .find(|p| p.file_name().is_some_and(|f| f.eq_ignore_ascii_case(&file_name)));
            if let Some(path) = found {
                return Some(path.clone());
            }
        }

        let dir = self.output_dir?;
        ASSEMBLY_EXTENSIONS
            .iter()
            .map(|extension| dir.join(format!("{name}.{extension}")))
            .find(|candidate| candidate.is_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{
        CompileFailure, CompileRequest, CompiledModule, CompilerError, LibraryOutcome, LibraryRequest,
    };

    struct Framework(Vec<&'static str>);

    impl CompilerService for Framework {
        fn name(&self) -> &str {
            "framework"
        }

        fn compile(&self, _request: &CompileRequest<'_>) -> Result<CompiledModule, CompileFailure> {
            unimplemented!()
        }

        fn compile_library(&self, _request: &LibraryRequest<'_>) -> Result<LibraryOutcome, CompilerError> {
            unimplemented!()
        }

        fn resolve_framework_reference(&self, name: &str) -> Option<PathBuf> {
            self.0
                .contains(&name)
                .then(|| PathBuf::from(format!("/framework/{name}.dll")))
        }
    }

    #[test]
    fn test_framework_wins() {
        let compiler = Framework(vec!["System.Xml"]);
        let deps = [PathBuf::from("/deps/System.Xml.dll")];
        let resolver = ReferenceResolver::new(&compiler, &deps, None);
        assert_eq!(
            resolver.resolve("System.Xml"),
            Some(PathBuf::from("/framework/System.Xml.dll"))
        );
    }

    #[test]
    fn test_dependency_paths_prefer_dll_and_exact_names() {
        let compiler = Framework(vec![]);
        let deps = [
            PathBuf::from("/deps/Acme.Data.exe"),
            PathBuf::from("/deps/Other.Acme.Data.dll"),
            PathBuf::from("/deps/Acme.Data.dll"),
        ];
        let resolver = ReferenceResolver::new(&compiler, &deps, None);
        assert_eq!(
            resolver.resolve("Acme.Data"),
            Some(PathBuf::from("/deps/Acme.Data.dll"))
        );
        assert_eq!(resolver.resolve("Data"), None);
    }

    #[test]
    fn test_output_dir_fallback() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Tool.exe"), b"").unwrap();
        let compiler = Framework(vec![]);
        let resolver = ReferenceResolver::new(&compiler, &[], Some(dir.path()));
        assert_eq!(resolver.resolve("Tool"), Some(dir.path().join("Tool.exe")));
        assert_eq!(resolver.resolve("Missing"), None);
    }
}
