/*
 * unit.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Assembly of translated markup into compilable units.
 */

//! Translation units.
//!
//! A [`TranslationUnit`] is a complete compilation unit: optional `using`
//! lines for `Import` directives, a fixed prefix, the translated body and a
//! fixed suffix. Alongside the code it carries what is needed to map compiler
//! line numbers back to the files the body came from.

use std::path::{Path, PathBuf};

use quill_source_map::{FileId, SourceContext, SourceLocation, SourceMap, count_newlines};
use uuid::Uuid;

use crate::directive::{
    self, ExtractedDirectives, IncludedFile, REGION_DIRECTIVES, TEMPLATE_FILE_DIRECTIVES,
};
use crate::error::DirectiveError;
use crate::markup;
use crate::reference::ReferenceResolver;

/// Writer variable used by region units.
pub const REGION_WRITER: &str = "writer";

/// Writer expression used by whole template files.
pub const TEMPLATE_WRITER: &str = "Quill.Writer";

/// Marker that switches a whole template file into literal text.
pub const TEMPLATE_MARKER: &str = "#if QUILL_TEMPLATE";

/// How the unit is entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    /// An in-place region; `Generate()` returns the generated text
    Region,
    /// A whole template file; `DumpOutput()` runs the entry statement
    TemplateFile,
}

#[derive(Debug, Clone)]
pub struct TranslationUnit {
    pub kind: UnitKind,
    /// Unique name of the generated entry class
    pub class_name: String,
    pub code: String,
    /// Every module the unit is compiled against
    pub references: Vec<PathBuf>,
    /// Added to a 0-based compiled line to get a line of the source map
    pub line_delta: i64,
    pub source_map: SourceMap,
    /// Files the body was assembled from
    pub sources: SourceContext,
}

impl TranslationUnit {
    /// Fully qualified entry routine.
    pub fn entry_symbol(&self) -> String {
        match self.kind {
            UnitKind::Region => format!("QuillGenerated.{}.Generate", self.class_name),
            UnitKind::TemplateFile => format!("{}.DumpOutput", self.class_name),
        }
    }

    /// Map a 1-based compiled line to a 1-based line in an origin file.
    ///
    /// Returns `None` for line 0 (unknown).
    pub fn map_line(&self, line: usize, column: usize) -> Option<SourceLocation> {
        if line == 0 {
            return None;
        }
        let mapped = self.source_map.resolve(line as i64 - 1 + self.line_delta);
        let path = self.sources.path(mapped.file_id)?;
        Some(SourceLocation::new(path, mapped.line + 1, column))
    }

    /// The file the unit was built from.
    pub fn primary_path(&self) -> Option<&str> {
        self.sources.path(self.source_map.primary())
    }
}

/// An `Assembly` directive that named nothing the resolver could find.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedReference {
    pub name: String,
    pub location: SourceLocation,
}

/// A unit plus the references that could not be resolved for it.
#[derive(Debug)]
pub struct BuiltUnit {
    pub unit: TranslationUnit,
    pub unresolved: Vec<UnresolvedReference>,
}

/// Builds units for the three kinds of template code.
pub struct TranslationUnitBuilder<'a> {
    resolver: ReferenceResolver<'a>,
    references: &'a [PathBuf],
}

impl<'a> TranslationUnitBuilder<'a> {
    /// `references` are added to every unit ahead of the unit's own.
    pub fn new(resolver: ReferenceResolver<'a>, references: &'a [PathBuf]) -> Self {
        TranslationUnitBuilder {
            resolver,
            references,
        }
    }

    /// Build the unit for an in-place template region.
    ///
    /// `region_text` is the markup between the marker line and the end of
    /// the region's first branch; `first_line` is its 0-based line in the
    /// host file.
    pub fn region(&self, path: &Path, host_text: &str, region_text: &str, first_line: usize) -> BuiltUnit {
        let extracted = directive::extract(region_text, REGION_DIRECTIVES);
        let class_name = format!("Generator_{}", Uuid::new_v4().simple());

        let prefix = region_prefix(&class_name);
        let mut code = using_lines(&extracted);
        code.push_str(&prefix);
        code.push_str(&markup::translate(&extracted.body, REGION_WRITER));
        code.push_str(REGION_SUFFIX);

        let mut sources = SourceContext::new();
        let primary = sources.add_file(display(path), Some(host_text.to_string()));
        let (references, unresolved) = self.resolve(&extracted, path, first_line);

        let line_delta = first_line as i64 - count_newlines(&prefix) as i64 + extracted.line_delta();

        BuiltUnit {
            unit: TranslationUnit {
                kind: UnitKind::Region,
                class_name,
                code,
                references,
                line_delta,
                source_map: SourceMap::identity(primary),
                sources,
            },
            unresolved,
        }
    }

    /// Build the unit for a whole template file.
    ///
    /// `load` reads the file named by an `Include` directive.
    pub fn template_file<F>(&self, path: &Path, text: &str, load: F) -> Result<BuiltUnit, DirectiveError>
    where
        F: FnMut(&str) -> Result<IncludedFile, DirectiveError>,
    {
        let extracted = directive::extract(text, TEMPLATE_FILE_DIRECTIVES);
        let entry = extracted.entry_point()?.to_string();
        let class_name = format!("GeneratedClass_{}", Uuid::new_v4().simple());

        let mut sources = SourceContext::new();
        let primary: FileId = sources.add_file(display(path), Some(text.to_string()));
        let (body, mut source_map) =
            directive::expand_includes(&extracted.body, primary, &mut sources, load)?;
        source_map.shift(extracted.consumed_lines);

        let mut code = using_lines(&extracted);
        code.push_str(&markup::translate(
            &format!("<%{}%>", literal_sections(&body)),
            TEMPLATE_WRITER,
        ));
        code.push_str(&template_suffix(&class_name, &entry));

        let (references, unresolved) = self.resolve(&extracted, path, 0);

        Ok(BuiltUnit {
            unit: TranslationUnit {
                kind: UnitKind::TemplateFile,
                class_name,
                code,
                references,
                line_delta: extracted.line_delta(),
                source_map,
                sources,
            },
            unresolved,
        })
    }

    /// Translate a template-library region into code for the host file.
    ///
    /// Library regions run inside the host program, so there is no unit to
    /// compile; `writer` names the variable the generated code writes to.
    pub fn library_region(&self, region_text: &str, writer: &str) -> String {
        markup::translate(region_text, writer)
    }

    fn resolve(
        &self,
        extracted: &ExtractedDirectives,
        path: &Path,
        first_line: usize,
    ) -> (Vec<PathBuf>, Vec<UnresolvedReference>) {
        let mut references = self.references.to_vec();
        let mut unresolved = Vec::new();
        for (name, line) in extracted.assembly_refs() {
            match self.resolver.resolve(name) {
                Some(reference) if !references.contains(&reference) => references.push(reference),
                Some(_) => {}
                None => unresolved.push(UnresolvedReference {
                    name: name.to_string(),
                    location: SourceLocation::new(display(path), first_line + line + 1, 1),
                }),
            }
        }
        (references, unresolved)
    }
}

const REGION_SUFFIX: &str = "
            return writer;
        }
    }
}
";

fn region_prefix(class_name: &str) -> String {
    format!(
        "
using System;
using System.IO;

namespace QuillGenerated {{

    internal static class {class_name} {{

        public static StringWriter Generate() {{

            StringWriter writer = new StringWriter();
"
    )
}

fn template_suffix(class_name: &str, entry: &str) -> String {
    format!(
        "

internal static class {class_name} {{

    internal static void DumpOutput() {{
        {entry}
    }}
}}
"
    )
}

fn using_lines(extracted: &ExtractedDirectives) -> String {
    extracted
        .imports()
        .map(|namespace| format!("using {namespace};\n"))
        .collect()
}

/// Turn `#if QUILL_TEMPLATE` ... `#endif` blocks of a whole template file
/// into literal text sections. Line breaks stay where they were.
fn literal_sections(body: &str) -> String {
    body.replace(&format!("{TEMPLATE_MARKER}\r\n"), "\r\n%>")
        .replace(&format!("{TEMPLATE_MARKER}\n"), "\n%>")
        .replace("\r\n#endif", "<%\r\n")
        .replace("\n#endif", "<%\n")
        .replace("#endif", "<%")
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{
        CompileFailure, CompileRequest, CompiledModule, CompilerError, CompilerService, LibraryOutcome,
        LibraryRequest,
    };
    use pretty_assertions::assert_eq;

    struct NoCompiler;

    impl CompilerService for NoCompiler {
        fn name(&self) -> &str {
            "none"
        }

        fn compile(&self, _request: &CompileRequest<'_>) -> Result<CompiledModule, CompileFailure> {
            unimplemented!()
        }

        fn compile_library(&self, _request: &LibraryRequest<'_>) -> Result<LibraryOutcome, CompilerError> {
            unimplemented!()
        }

        fn resolve_framework_reference(&self, name: &str) -> Option<PathBuf> {
            (name == "System.Xml").then(|| PathBuf::from("/fw/System.Xml.dll"))
        }
    }

    fn no_includes(path: &str) -> Result<IncludedFile, DirectiveError> {
        panic!("unexpected include of {path}")
    }

    /// 0-based line of the first occurrence of `needle` in `code`.
    fn line_of(code: &str, needle: &str) -> usize {
        let offset = code.find(needle).unwrap();
        count_newlines(&code[..offset])
    }

    #[test]
    fn test_region_unit_layout() {
        let base = [PathBuf::from("/lib/Templates.dll")];
        let builder = TranslationUnitBuilder::new(ReferenceResolver::new(&NoCompiler, &[], None), &base);
        let host = "class A {\n#if QUILL_TEMPLATE\n<%@ Import Namespace=\"System.Linq\" %>\nvalue <%= 1 %>\n#endif\n}\n";
        let region = "<%@ Import Namespace=\"System.Linq\" %>\nvalue <%= 1 %>\n";

        let built = builder.region(Path::new("A.cs"), host, region, 2);
        let unit = &built.unit;

        assert_eq!(unit.kind, UnitKind::Region);
        assert!(unit.code.starts_with("using System.Linq;\n\nusing System;\n"));
        assert!(unit.code.contains(&format!("internal static class {} {{", unit.class_name)));
        assert!(unit.code.ends_with("            return writer;\n        }\n    }\n}\n"));
        assert_eq!(unit.references, base.to_vec());
        assert!(built.unresolved.is_empty());

        // `value` sits on host line 4 (1-based).
        let compiled = line_of(&unit.code, "writer.Write(\"value \")") + 1;
        assert_eq!(unit.map_line(compiled, 3), Some(SourceLocation::new("A.cs", 4, 3)));
    }

    #[test]
    fn test_region_references() {
        let builder = TranslationUnitBuilder::new(ReferenceResolver::new(&NoCompiler, &[], None), &[]);
        let region = "text\n<%@ Assembly Name=\"System.Xml\" %>\n<%@ Assembly Name=\"Nope\" %>\n";
        let built = builder.region(Path::new("A.cs"), "", region, 10);

        assert_eq!(built.unit.references, vec![PathBuf::from("/fw/System.Xml.dll")]);
        assert_eq!(
            built.unresolved,
            vec![UnresolvedReference {
                name: "Nope".into(),
                location: SourceLocation::new("A.cs", 13, 1),
            }]
        );
    }

    #[test]
    fn test_template_file_requires_one_entry_point() {
        let builder = TranslationUnitBuilder::new(ReferenceResolver::new(&NoCompiler, &[], None), &[]);
        let err = builder
            .template_file(Path::new("t.cst"), "<% %>", no_includes)
            .unwrap_err();
        assert!(matches!(err, DirectiveError::MissingEntryPoint));

        let twice = "<%@ EntryPoint Statement=\"A();\" %>\n<%@ EntryPoint Statement=\"B();\" %>\n";
        let err = builder
            .template_file(Path::new("t.cst"), twice, no_includes)
            .unwrap_err();
        assert!(matches!(err, DirectiveError::DuplicateEntryPoint { count: 2 }));
    }

    #[test]
    fn test_template_file_layout_and_mapping() {
        let builder = TranslationUnitBuilder::new(ReferenceResolver::new(&NoCompiler, &[], None), &[]);
        let text = "\
<%@ EntryPoint Statement=\"Gen.Run();\" %>
<%@ Import Namespace=\"System.Text\" %>
static class Gen {
    public static void Run() {
        Quill.SetOutput(\"A.cs\", Quill.OutputType.Compile);
#if QUILL_TEMPLATE
hello
#endif
        undefined();
    }
}
";
        let built = builder
            .template_file(Path::new("t.cst"), text, no_includes)
            .unwrap();
        let unit = &built.unit;

        assert!(unit.code.starts_with("using System.Text;\n"));
        assert!(unit.code.contains("Quill.Writer.Write(\"hello\");"));
        assert!(unit.code.contains("        Gen.Run();\n"));
        assert_eq!(unit.entry_symbol(), format!("{}.DumpOutput", unit.class_name));

        let compiled = line_of(&unit.code, "undefined();") + 1;
        assert_eq!(unit.map_line(compiled, 9), Some(SourceLocation::new("t.cst", 9, 9)));
        let compiled = line_of(&unit.code, "hello") + 1;
        assert_eq!(unit.map_line(compiled, 1), Some(SourceLocation::new("t.cst", 7, 1)));
    }

    #[test]
    fn test_template_file_include_mapping() {
        let builder = TranslationUnitBuilder::new(ReferenceResolver::new(&NoCompiler, &[], None), &[]);
        let text = "\
<%@ EntryPoint Statement=\"Gen.Run();\" %>
static class Gen {
<%@ Include Path=\"helpers.inc\" %>
    public static void Run() { broken(); }
}
";
        let built = builder
            .template_file(Path::new("t.cst"), text, |path| {
                Ok(IncludedFile {
                    path: format!("inc/{path}"),
                    content: "    static int One() { return 1; }\n    static int Two() { oops(); }".into(),
                })
            })
            .unwrap();
        let unit = &built.unit;

        let compiled = line_of(&unit.code, "oops();") + 1;
        assert_eq!(unit.map_line(compiled, 5), Some(SourceLocation::new("inc/helpers.inc", 2, 5)));
        let compiled = line_of(&unit.code, "broken();") + 1;
        assert_eq!(unit.map_line(compiled, 5), Some(SourceLocation::new("t.cst", 4, 5)));
    }

    #[test]
    fn test_literal_sections() {
        assert_eq!(
            literal_sections("a\n#if QUILL_TEMPLATE\ntext\n#endif\nb"),
            "a\n\n%>text<%\n\nb"
        );
        assert_eq!(
            literal_sections("#if QUILL_TEMPLATE\r\nx\r\n#endif"),
            "\r\n%>x<%\r\n"
        );
    }

    #[test]
    fn test_library_region_uses_named_writer() {
        let builder = TranslationUnitBuilder::new(ReferenceResolver::new(&NoCompiler, &[], None), &[]);
        assert_eq!(builder.library_region("x\n", "sb"), "sb.Write(\"x\\n\");");
    }

    #[test]
    fn test_unknown_line_maps_to_nothing() {
        let builder = TranslationUnitBuilder::new(ReferenceResolver::new(&NoCompiler, &[], None), &[]);
        let built = builder.region(Path::new("A.cs"), "", "x", 0);
        assert_eq!(built.unit.map_line(0, 0), None);
        assert_eq!(built.unit.primary_path(), Some("A.cs"));
    }
}
