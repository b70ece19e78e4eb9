//! End-to-end index construction: parse, elaborate, build, resolve.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use sv_index::{index_design, BuildOutput};
use sv_position::SourceLocation;
use sv_syntax::{SourceManager, SyntaxNode};

fn build(sources: &[(&str, &str)], top: Option<&str>) -> (SourceManager, BuildOutput) {
    let mut sm = SourceManager::new();
    let mut files: Vec<(sv_syntax::FileId, SyntaxNode)> = Vec::new();
    for (path, text) in sources {
        let (file, parsed) = sv_syntax::parse_text(&mut sm, Path::new(path), text.to_string());
        files.push((file, parsed.unwrap()));
    }
    let design = sv_elab::elaborate(&sm, &files, top).unwrap();
    let output = index_design(&sm, &design, &files).unwrap();
    (sm, output)
}

fn loc(path: &str, line: u32, column: u32) -> SourceLocation {
    SourceLocation::new(Arc::new(PathBuf::from(path)), line, column)
}

const FOO_SV: &str = "\
module m #(parameter W=8) (input logic [W-1:0] a);
  logic [W-1:0] b;
  assign b = a;
endmodule
";

#[test]
fn definition_of_port_points_at_name_token() {
    let (_sm, output) = build(&[("/test/foo.sv", FOO_SV)], None);
    // Cursor on the `a` in `b = a` (line 3, column 14).
    let symbol = output
        .core
        .lookup_symbol_at(&loc("/test/foo.sv", 3, 14))
        .unwrap();
    let record = output.core.symbol(symbol);
    assert_eq!(record.name(), "a");
    let source = record.source().unwrap();
    assert_eq!(source.start.position(), (1, 48));
    assert_eq!(source.end.position(), (1, 49));
}

#[test]
fn references_cover_declaration_and_uses() {
    let (_sm, output) = build(&[("/test/foo.sv", FOO_SV)], None);
    // Cursor on the port declaration itself.
    let symbol = output
        .core
        .lookup_symbol_at(&loc("/test/foo.sv", 1, 48))
        .unwrap();
    let record = output.core.symbol(symbol);
    assert_eq!(record.name(), "a");
    let mut positions: Vec<(u32, u32)> = record
        .references()
        .iter()
        .map(|r| r.start.position())
        .collect();
    positions.sort();
    assert_eq!(positions, vec![(1, 48), (3, 14)]);
}

#[test]
fn parameter_has_three_single_char_references() {
    let (_sm, output) = build(&[("/test/foo.sv", FOO_SV)], None);
    let symbol = output
        .core
        .lookup_symbol_at(&loc("/test/foo.sv", 1, 22))
        .unwrap();
    let record = output.core.symbol(symbol);
    assert_eq!(record.name(), "W");
    let mut positions: Vec<(u32, u32)> = record
        .references()
        .iter()
        .map(|r| r.start.position())
        .collect();
    positions.sort();
    assert_eq!(positions, vec![(1, 22), (1, 41), (2, 10)]);
    // Every occurrence spans exactly one character.
    for reference in record.references() {
        assert_eq!(reference.end.column - reference.start.column, 1);
        assert_eq!(reference.end.line, reference.start.line);
    }
}

const DUP_SV: &str = "\
module leaf;
  logic x;
endmodule
module top;
  leaf u0 ();
  leaf u1 ();
endmodule
";

#[test]
fn scope_dedup_shares_reelaborated_body() {
    let (_sm, output) = build(&[("/test/dup.sv", DUP_SV)], Some("top"));
    let core = &output.core;
    let root = core.root().unwrap();
    let top = core.child_by_name(root, "top").unwrap();

    // One body scope, reachable under both instance names.
    let u0 = core.child_by_name(top, "u0").unwrap();
    let u1 = core.child_by_name(top, "u1").unwrap();
    assert_eq!(u0, u1);

    // Hierarchical paths through either instance reach the same symbol.
    let via_u0 = core.resolve_symbol(root, "top.u0.x").unwrap();
    let via_u1 = core.resolve_symbol(root, "top.u1.x").unwrap();
    assert_eq!(via_u0, via_u1);
    assert_eq!(core.symbol(via_u0).name(), "x");
}

#[test]
fn module_type_references_span_declaration_and_instantiations() {
    let (_sm, output) = build(&[("/test/dup.sv", DUP_SV)], Some("top"));
    // Cursor on `leaf` in the first instantiation (line 5, column 3).
    let symbol = output
        .core
        .lookup_symbol_at(&loc("/test/dup.sv", 5, 3))
        .unwrap();
    let record = output.core.symbol(symbol);
    assert_eq!(record.name(), "leaf");
    let mut lines: Vec<u32> = record.references().iter().map(|r| r.start.line).collect();
    lines.sort();
    assert_eq!(lines, vec![1, 5, 6]);
}

const CONN_SV: &str = "\
module leaf #(parameter W=4) (input logic [W-1:0] d);
endmodule
module top;
  logic [3:0] val;
  leaf #(.W(4)) u0 (.d(val));
endmodule
";

#[test]
fn named_connections_resolve_in_instantiated_module() {
    let (_sm, output) = build(&[("/test/conn.sv", CONN_SV)], Some("top"));
    let core = &output.core;
    let root = core.root().unwrap();

    // `.d(` on line 5: column of `d` is 21.
    let d = core.resolve_symbol(root, "top.u0.d").unwrap();
    let d_lines: Vec<u32> = core.symbol(d).references().iter().map(|r| r.start.line).collect();
    assert!(d_lines.contains(&5), "connection name should reference the port: {d_lines:?}");

    let w = core.resolve_symbol(root, "top.u0.W").unwrap();
    let w_lines: Vec<u32> = core.symbol(w).references().iter().map(|r| r.start.line).collect();
    assert!(w_lines.contains(&5), "parameter connection should reference the parameter: {w_lines:?}");

    // The connected expression resolves in the calling scope.
    let val = core.resolve_symbol(root, "top.val").unwrap();
    let val_lines: Vec<u32> = core.symbol(val).references().iter().map(|r| r.start.line).collect();
    assert!(val_lines.contains(&5));
}

#[test]
fn package_scoped_names_resolve_through_the_package() {
    let sources = "\
package pkg;
  parameter P = 1;
endpackage
module top;
  logic [pkg::P:0] q;
endmodule
";
    let (_sm, output) = build(&[("/test/pkg.sv", sources)], Some("top"));
    let core = &output.core;
    let root = core.root().unwrap();
    let p = core.resolve_symbol(root, "pkg.P").unwrap();
    let lines: Vec<u32> = core.symbol(p).references().iter().map(|r| r.start.line).collect();
    assert!(lines.contains(&5), "qualified use should reference the parameter: {lines:?}");
}

#[test]
fn unresolved_references_are_counted_not_fatal() {
    let sources = "\
module top;
  assign mystery = 1;
endmodule
";
    let (_sm, output) = build(&[("/test/unres.sv", sources)], None);
    let file = output.core.file(Path::new("/test/unres.sv")).unwrap();
    assert!(file.unresolved_count() > 0);
}

#[test]
fn macro_expanded_identifiers_reference_at_usage_site() {
    let sources = "\
`define RST rst_n
module top (input logic rst_n);
  logic q;
  assign q = `RST;
endmodule
";
    let (_sm, output) = build(&[("/test/macro.sv", sources)], None);
    let core = &output.core;
    let root = core.root().unwrap();
    let rst = core.resolve_symbol(root, "top.rst_n").unwrap();
    let lines: Vec<u32> = core.symbol(rst).references().iter().map(|r| r.start.line).collect();
    assert!(lines.contains(&4), "expanded use should land on the usage line: {lines:?}");
}

#[test]
fn generate_blocks_stay_virtual_for_lookup() {
    let sources = "\
module top;
  logic clk;
  generate
    if (1) begin : g_blk
      logic inner;
      assign inner = clk;
    end
  endgenerate
endmodule
";
    let (_sm, output) = build(&[("/test/gen.sv", sources)], None);
    let core = &output.core;
    let root = core.root().unwrap();
    // The generate block symbol is reachable by path.
    let inner = core.resolve_symbol(root, "top.g_blk.inner").unwrap();
    assert_eq!(core.symbol(inner).name(), "inner");
    // `clk` resolved from inside the virtual block: the use on line 6
    // was recorded against the module-level symbol.
    let clk = core.resolve_symbol(root, "top.clk").unwrap();
    let lines: Vec<u32> = core.symbol(clk).references().iter().map(|r| r.start.line).collect();
    assert!(lines.contains(&6), "{lines:?}");
}

#[test]
fn dump_has_hier_and_files_sections() {
    let (_sm, output) = build(&[("/test/foo.sv", FOO_SV)], None);
    let dump = sv_index::dump(&output.core);
    assert_eq!(dump["hier"]["name"], "$root");
    assert_eq!(dump["hier"]["virtual"], false);
    let files = dump["files"].as_object().unwrap();
    let file = files.get("/test/foo.sv").unwrap();
    assert_eq!(file["path"], "/test/foo.sv");
    assert!(file["scopes"]
        .as_array()
        .unwrap()
        .iter()
        .any(|s| s.as_str() == Some("$root.m")));
    let symbols = file["symbols"].as_array().unwrap();
    assert!(symbols.iter().any(|s| s["id"] == "W"));
    // Locations serialize as file:line:col strings.
    let w = symbols.iter().find(|s| s["id"] == "W").unwrap();
    assert_eq!(w["loc"]["beg"], "/test/foo.sv:1:22");
}
