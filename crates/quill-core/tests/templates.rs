/*
 * templates.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Whole template files: entry points, outputs and error locations.
 */

mod common;

use common::{ScriptedCompiler, build_lines, inputs, read, run, write};
use pretty_assertions::assert_eq;
use quill_core::batch::debug_path;
use tempfile::TempDir;

const TEMPLATE: &str = r#"<%@ EntryPoint Statement="Gen.Run();" %>
static class Gen {
    public static void Run() {
        Quill.SetOutput("Out.cs", Quill.OutputType.Compile);
#if QUILL_TEMPLATE
class Generated {
}
#endif
        Quill.SetOutput("data/Res.txt", Quill.OutputType.EmbeddedResource);
#if QUILL_TEMPLATE
resource
#endif
    }
}
"#;

#[test]
fn template_writes_each_selected_output() {
    let dir = TempDir::new().unwrap();
    let template = write(dir.path(), "T.cst", TEMPLATE);
    let compiler = ScriptedCompiler::new();

    let mut batch = inputs();
    batch.template_files.push(template.clone());
    let (outputs, sink) = run(&compiler, &batch);

    assert!(outputs.success, "{:?}", build_lines(&sink));
    let out = dir.path().join("Out.cs");
    let res = dir.path().join("data").join("Res.txt");
    // Text sections end where `#endif` begins.
    assert_eq!(read(&out), "class Generated {\n}");
    assert_eq!(read(&res), "resource");
    assert_eq!(outputs.compile_files, vec![out.clone()]);
    assert_eq!(outputs.embedded_resource_files, vec![res.clone()]);
    assert_eq!(
        sink.messages(),
        [
            format!("Generated file '{}' from template '{}'.", out.display(), template.display()),
            format!("Generated file '{}' from template '{}'.", res.display(), template.display()),
            format!("Processed template file '{}'.", template.display()),
            format!("File '{}' was added to compile list.", out.display()),
        ]
    );

    let code = &compiler.compiles()[0].code;
    assert!(code.contains("internal static void DumpOutput() {\n        Gen.Run();\n    }"));
}

#[test]
fn unchanged_outputs_survive_a_rerun() {
    let dir = TempDir::new().unwrap();
    let template = write(dir.path(), "T.cst", TEMPLATE);
    let compiler = ScriptedCompiler::new();
    let mut batch = inputs();
    batch.template_files.push(template);

    run(&compiler, &batch);
    let (outputs, _) = run(&compiler, &batch);

    assert!(outputs.success);
    assert_eq!(read(&dir.path().join("Out.cs")), "class Generated {\n}");
    assert_eq!(outputs.compile_files.len(), 1);
}

#[test]
fn missing_entry_point_is_reported_before_compiling() {
    let dir = TempDir::new().unwrap();
    let template = write(dir.path(), "T.cst", "static class Gen { }\n");
    let compiler = ScriptedCompiler::new();

    let mut batch = inputs();
    batch.template_files.push(template.clone());
    let (outputs, sink) = run(&compiler, &batch);

    assert!(!outputs.success);
    assert_eq!(compiler.compile_count(), 0);
    assert_eq!(
        build_lines(&sink),
        vec![format!(
            "{}: error QL-2-1: The entry point must be specified by using <%@ EntryPoint Statement=\"...\" %>",
            template.display()
        )]
    );
    assert_eq!(sink.messages(), [format!("Processed template file '{}'.", template.display())]);
}

#[test]
fn duplicate_entry_points_are_rejected() {
    let dir = TempDir::new().unwrap();
    let template = write(
        dir.path(),
        "T.cst",
        "<%@ EntryPoint Statement=\"A.Run();\" %>\n<%@ EntryPoint Statement=\"B.Run();\" %>\n",
    );
    let compiler = ScriptedCompiler::new();

    let mut batch = inputs();
    batch.template_files.push(template);
    let (outputs, sink) = run(&compiler, &batch);

    assert!(!outputs.success);
    assert_eq!(compiler.compile_count(), 0);
    let error = sink.errors().next().unwrap();
    assert_eq!(error.code.as_deref(), Some("QL-2-2"));
    assert_eq!(error.message(), "Only one entry point can be defined per file.");
}

#[test]
fn template_without_output_is_a_usage_error() {
    let dir = TempDir::new().unwrap();
    let template = write(
        dir.path(),
        "T.cst",
        "<%@ EntryPoint Statement=\"Gen.Run();\" %>\nstatic class Gen { public static void Run() { } }\n",
    );
    let compiler = ScriptedCompiler::new();

    let mut batch = inputs();
    batch.template_files.push(template);
    let (outputs, sink) = run(&compiler, &batch);

    assert!(!outputs.success);
    assert_eq!(sink.errors().next().unwrap().code.as_deref(), Some("QL-5-1"));
    assert!(outputs.compile_files.is_empty());
}

#[test]
fn text_before_set_output_is_a_usage_error() {
    let dir = TempDir::new().unwrap();
    let template = write(
        dir.path(),
        "T.cst",
        "<%@ EntryPoint Statement=\"Gen.Run();\" %>\nstatic class Gen { public static void Run() {\n#if QUILL_TEMPLATE\nstray\n#endif\n} }\n",
    );
    let compiler = ScriptedCompiler::new();

    let mut batch = inputs();
    batch.template_files.push(template);
    let (outputs, sink) = run(&compiler, &batch);

    assert!(!outputs.success);
    assert_eq!(sink.errors().next().unwrap().code.as_deref(), Some("QL-5-2"));
}

#[test]
fn exception_leaves_earlier_outputs_untouched() {
    let dir = TempDir::new().unwrap();
    let out = write(dir.path(), "Out.cs", "old");
    let template = write(
        dir.path(),
        "T.cst",
        r#"<%@ EntryPoint Statement="Gen.Run();" %>
static class Gen {
    public static void Run() {
        Quill.SetOutput("Out.cs", Quill.OutputType.Compile);
#if QUILL_TEMPLATE
new
#endif
        throw new Exception("template gave up");
    }
}
"#,
    );
    let compiler = ScriptedCompiler::new();

    let mut batch = inputs();
    batch.template_files.push(template);
    let (outputs, sink) = run(&compiler, &batch);

    assert!(!outputs.success);
    assert_eq!(read(&out), "old");
    let error = sink.errors().next().unwrap();
    assert_eq!(error.code.as_deref(), Some("QL-4-1"));
    assert_eq!(error.message(), "template gave up");
    assert!(outputs.compile_files.is_empty());
}

#[test]
fn relative_outputs_resolve_against_the_template_directory() {
    let dir = TempDir::new().unwrap();
    let absolute = dir.path().join("elsewhere").join("Abs.cs");
    let template = write(
        &dir.path().join("templates"),
        "T.cst",
        &format!(
            r#"<%@ EntryPoint Statement="Gen.Run();" %>
static class Gen {{
    public static void Run() {{
        Quill.SetOutput("Out.cs", Quill.OutputType.Compile);
#if QUILL_TEMPLATE
relative
#endif
        Quill.SetOutput("{}", Quill.OutputType.Compile);
#if QUILL_TEMPLATE
absolute
#endif
    }}
}}
"#,
            absolute.display()
        ),
    );
    let compiler = ScriptedCompiler::new();

    let mut batch = inputs();
    batch.template_files.push(template);
    let (outputs, sink) = run(&compiler, &batch);

    assert!(outputs.success, "{:?}", build_lines(&sink));
    let relative = dir.path().join("templates").join("Out.cs");
    assert_eq!(read(&relative), "relative");
    assert_eq!(read(&absolute), "absolute");
    assert_eq!(outputs.compile_files, vec![relative, absolute]);
    assert!(!dir.path().join("Out.cs").exists());
}

#[test]
fn compile_error_maps_to_template_line() {
    let dir = TempDir::new().unwrap();
    let template = write(
        dir.path(),
        "T.cst",
        "<%@ EntryPoint Statement=\"Gen.Run();\" %>\nstatic class Gen {\n    public static void Run() { COMPILE_ERROR; }\n}\n",
    );
    let compiler = ScriptedCompiler::new();

    let mut batch = inputs();
    batch.template_files.push(template.clone());
    let (outputs, sink) = run(&compiler, &batch);

    assert!(!outputs.success);
    assert_eq!(
        build_lines(&sink),
        vec![format!(
            "{}(3,32): error CS0103: The name 'COMPILE_ERROR' does not exist in the current context",
            template.display()
        )]
    );
}

#[test]
fn compile_error_in_include_maps_to_included_file() {
    let dir = TempDir::new().unwrap();
    let helpers = write(
        dir.path(),
        "helpers.inc",
        "static class Helpers {\n    public static void Broken() { COMPILE_ERROR; }\n}\n",
    );
    let template = write(
        dir.path(),
        "T.cst",
        "<%@ EntryPoint Statement=\"Gen.Run();\" %>\n<%@ Include Path=\"helpers.inc\" %>\nstatic class Gen {\n    public static void Run() { COMPILE_ERROR; }\n}\n",
    );
    let compiler = ScriptedCompiler::new();

    let mut batch = inputs();
    batch.template_files.push(template.clone());
    let (_, sink) = run(&compiler, &batch);

    let locations: Vec<_> = sink
        .errors()
        .map(|d| {
            let location = d.location.clone().unwrap();
            (location.path, location.line)
        })
        .collect();
    assert_eq!(
        locations,
        vec![
            (helpers.display().to_string(), 2),
            (template.display().to_string(), 4),
        ]
    );
}

#[test]
fn includes_resolve_through_declared_include_files() {
    let dir = TempDir::new().unwrap();
    let shared = write(
        dir.path(),
        "shared/common.inc",
        "static class Common { public static void Select() { Quill.SetOutput(\"common.txt\", Quill.OutputType.EmbeddedResource); } }\n",
    );
    let template = write(
        dir.path(),
        "templates/T.cst",
        "<%@ EntryPoint Statement=\"Gen.Run();\" %>\n<%@ Include Path=\"common.inc\" %>\nstatic class Gen { public static void Run() { Common.Select();\n#if QUILL_TEMPLATE\nshared\n#endif\n} }\n",
    );
    let compiler = ScriptedCompiler::new();

    let mut batch = inputs();
    batch.template_files.push(template);
    batch.include_files.push(shared);
    let (outputs, sink) = run(&compiler, &batch);

    assert!(outputs.success, "{:?}", build_lines(&sink));
    let generated = dir.path().join("templates").join("common.txt");
    assert_eq!(read(&generated), "shared");
    assert_eq!(outputs.embedded_resource_files, vec![generated]);
    assert!(outputs.compile_files.is_empty());
}

#[test]
fn unreadable_include_is_reported() {
    let dir = TempDir::new().unwrap();
    let template = write(
        dir.path(),
        "T.cst",
        "<%@ EntryPoint Statement=\"Gen.Run();\" %>\n<%@ Include Path=\"nope.inc\" %>\n",
    );
    let compiler = ScriptedCompiler::new();

    let mut batch = inputs();
    batch.template_files.push(template);
    let (outputs, sink) = run(&compiler, &batch);

    assert!(!outputs.success);
    assert_eq!(compiler.compile_count(), 0);
    assert_eq!(sink.errors().next().unwrap().code.as_deref(), Some("QL-1-2"));
}

#[test]
fn unresolved_assembly_in_template_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let template = write(
        dir.path(),
        "T.cst",
        "<%@ EntryPoint Statement=\"Gen.Run();\" %>\n<%@ Assembly Name=\"Nowhere\" %>\nstatic class Gen { public static void Run() { Quill.SetOutput(\"o.txt\", Quill.OutputType.EmbeddedResource); } }\n",
    );
    let compiler = ScriptedCompiler::new();

    let mut batch = inputs();
    batch.template_files.push(template.clone());
    let (outputs, sink) = run(&compiler, &batch);

    assert!(!outputs.success);
    let error = sink.errors().next().unwrap();
    assert_eq!(error.code.as_deref(), Some("QL-2-3"));
    assert_eq!(error.location.as_ref().unwrap().line, 2);
}

#[test]
fn debug_mode_writes_the_generated_unit() {
    let dir = TempDir::new().unwrap();
    let template = write(dir.path(), "T.cst", TEMPLATE);
    let compiler = ScriptedCompiler::new();

    let mut batch = inputs();
    batch.template_files.push(template.clone());
    batch.debug = true;
    let (outputs, sink) = run(&compiler, &batch);

    let debug_file = debug_path(&template);
    assert!(outputs.success);
    assert_eq!(outputs.debug_files, vec![debug_file.clone()]);
    assert_eq!(read(&debug_file), compiler.compiles()[0].code);
    assert!(
        sink.messages()
            .contains(&format!("Generated debug file '{}'.", debug_file.display()))
    );
}
