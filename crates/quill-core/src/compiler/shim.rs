/*
 * compiler/shim.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Host program compiled next to every generated unit.
 */

//! The host shim.
//!
//! A generated unit is compiled into a small executable together with this
//! shim. The shim provides the `Quill` API templates call (`Quill.Writer`,
//! `Quill.SetOutput`) and reports what the template does as lines on
//! standard output:
//!
//! ```text
//! #quill:set-output:<Compile|EmbeddedResource>:<base64 path>
//! #quill:write:<base64 text>
//! ```
//!
//! Payloads are base64 of UTF-8 so that any text survives the line framing.
//! Anything else the template prints to the console is discarded by the
//! shim. An uncaught exception is printed to standard error and the process
//! exits with status 1.
//!
//! The executable runs from its scratch directory, so the shim resolves the
//! assemblies it was compiled against (the template library module and
//! dependency assemblies) from their original paths.
//!
//! The source sticks to C# 5 so the .NET Framework `csc` can build it.

use std::path::PathBuf;

use crate::unit::{TranslationUnit, UnitKind};

/// Prefix of every protocol line.
pub const PROTOCOL_PREFIX: &str = "#quill:";

/// Tag of an output selection line.
pub const SET_OUTPUT: &str = "set-output";

/// Tag of a text line.
pub const WRITE: &str = "write";

const HOST_SOURCE: &str = r##"// Quill host shim
using System;
using System.IO;
using System.Reflection;
using System.Runtime.CompilerServices;
using System.Text;

public static class Quill
{
    public enum OutputType { Compile, EmbeddedResource }

    private static readonly TextWriter writer = new QuillProtocolWriter();

    public static TextWriter Writer
    {
        get { return writer; }
    }

    public static void SetOutput(string outputFile, OutputType outputType)
    {
        writer.Flush();
        QuillHost.Emit("set-output:" + outputType.ToString(), outputFile);
    }
}

internal sealed class QuillProtocolWriter : TextWriter
{
    private readonly StringBuilder pending = new StringBuilder();

    public override Encoding Encoding
    {
        get { return Encoding.UTF8; }
    }

    public override void Write(char value)
    {
        pending.Append(value);
    }

    public override void Write(string value)
    {
        if (value != null)
        {
            pending.Append(value);
        }
    }

    public override void Flush()
    {
        if (pending.Length == 0)
        {
            return;
        }
        QuillHost.Emit("write", pending.ToString());
        pending.Length = 0;
    }
}

internal static class QuillHost
{
    private static readonly string[] references = new string[] { __REFERENCES__ };

    private static TextWriter protocol;

    internal static void Emit(string tag, string payload)
    {
        protocol.WriteLine("#quill:" + tag + ":" + Convert.ToBase64String(Encoding.UTF8.GetBytes(payload)));
        protocol.Flush();
    }

    private static Assembly Resolve(object sender, ResolveEventArgs args)
    {
        string name = new AssemblyName(args.Name).Name;
        foreach (string path in references)
        {
            if (string.Equals(Path.GetFileNameWithoutExtension(path), name, StringComparison.OrdinalIgnoreCase)
                && File.Exists(path))
            {
                return Assembly.LoadFrom(path);
            }
        }
        return null;
    }

    [MethodImpl(MethodImplOptions.NoInlining)]
    private static void Run()
    {
        __ENTRY__
    }

    public static int Main()
    {
        protocol = Console.Out;
        Console.SetOut(TextWriter.Null);
        AppDomain.CurrentDomain.AssemblyResolve += Resolve;
        try
        {
            Run();
            Quill.Writer.Flush();
            return 0;
        }
        catch (Exception e)
        {
            Quill.Writer.Flush();
            Console.Error.WriteLine(e.ToString());
            return 1;
        }
    }
}
"##;

/// The statement the shim's `Main` runs for `unit`.
pub fn entry_invocation(unit: &TranslationUnit) -> String {
    match unit.kind {
        UnitKind::TemplateFile => format!("{}();", unit.entry_symbol()),
        UnitKind::Region => format!("Quill.Writer.Write({}().ToString());", unit.entry_symbol()),
    }
}

/// Host source for `unit`, resolving `references` at run time.
pub fn host_source(unit: &TranslationUnit, references: &[PathBuf]) -> String {
    let references = references
        .iter()
        .map(|path| verbatim_literal(&path.display().to_string()))
        .collect::<Vec<_>>()
        .join(", ");
    HOST_SOURCE
        .replace("__REFERENCES__", &references)
        .replace("__ENTRY__", &entry_invocation(unit))
}

/// A C# verbatim string literal holding `text`.
fn verbatim_literal(text: &str) -> String {
    format!("@\"{}\"", text.replace('"', "\"\""))
}
