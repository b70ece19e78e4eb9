//! Alignment formatter end-to-end: byte-exact columns, block splitting,
//! idempotence, and token preservation.

use pretty_assertions::assert_eq;
use std::path::Path;
use sv_format::{format_file, FormatOptions};
use sv_syntax::{SourceManager, SyntaxNode, TokenKind};

fn parse(text: &str) -> SyntaxNode {
    let mut sm = SourceManager::new();
    let (_, parsed) = sv_syntax::parse_text(&mut sm, Path::new("/test/fmt.sv"), text.to_string());
    parsed.unwrap()
}

fn format(text: &str) -> String {
    format_file(&parse(text), FormatOptions::default())
}

fn token_texts(text: &str) -> Vec<String> {
    parse(text)
        .tokens()
        .iter()
        .filter(|t| t.kind != TokenKind::Eof)
        .map(|t| t.text.clone())
        .collect()
}

#[test]
fn aligns_declaration_block_byte_exact() {
    let input = "\
logic a;
logic [7:0] bb;
wire signed [15:0] ccc;
";
    let expected = "\
    logic               a;
    logic        [ 7:0] bb;
    wire  signed [15:0] ccc;
";
    assert_eq!(format(input), expected);
}

#[test]
fn blank_line_splits_blocks_and_widths_are_per_block() {
    let input = "\
logic a;
logic [7:0] b2;

logic [127:0] wide;
logic c;
";
    let output = format(input);
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines[0], "    logic       a;");
    assert_eq!(lines[1], "    logic [7:0] b2;");
    // Second block measures independently.
    assert_eq!(lines[3], "    logic [127:0] wide;");
    assert_eq!(lines[4], "    logic         c;");
}

#[test]
fn formatting_is_idempotent() {
    let inputs = [
        "logic a;\nlogic [7:0] bb;\nwire signed [15:0] ccc;\n",
        "module m #(parameter W=8) (input logic [W-1:0] a, output logic y);\n  logic [W-1:0] b;\n  assign b = a;\nendmodule\n",
    ];
    for input in inputs {
        let once = format(input);
        let twice = format(&once);
        assert_eq!(twice, once, "second pass must be a fixpoint for {input:?}");
    }
}

#[test]
fn formatting_preserves_the_token_stream() {
    let input = "\
module m;
  logic [3:0] a;
  wire w;

  sub u0 (.x(a));
endmodule
";
    let output = format(input);
    assert_eq!(token_texts(&output), token_texts(input));
}

#[test]
fn port_list_aligns_names_and_commas() {
    let input = "module m (input logic [7:0] data_in, output logic valid, input logic clk);\nendmodule\n";
    let output = format(input);
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines[0], "module m (");
    assert_eq!(lines[1], "    input  logic [7:0] data_in,");
    assert_eq!(lines[2], "    output logic       valid  ,");
    assert_eq!(lines[3], "    input  logic       clk    );");
}

#[test]
fn instance_connections_align_under_nested_indent() {
    let input = "\
module top;
  sub #(.WIDTH(8), .N(2)) u_sub (.a(sig_a), .b(b2));
endmodule
";
    let expected = "\
module top;
    sub #(
        .WIDTH(8),
        .N    (2)
    ) u_sub (
        .a(sig_a),
        .b(b2   )
    );
endmodule
";
    assert_eq!(format(input), expected);
}

#[test]
fn unknown_constructs_pass_through_unchanged() {
    let input = "\
module m;
  defparam u_x.p = 1;
endmodule
";
    let output = format(input);
    // The engine does not align defparams; the line is reproduced.
    assert!(output.contains("  defparam u_x.p = 1;"));
}

#[test]
fn comments_survive_alignment() {
    let input = "\
// interface nets
logic a;
logic [7:0] bb;
// tail section
logic c;
";
    let output = format(input);
    assert!(output.contains("// interface nets"));
    assert!(output.contains("// tail section"));
    assert_eq!(token_texts(&output), token_texts(input));
}

#[test]
fn assigns_terminate_a_block() {
    let input = "\
logic a;
assign a = 1'b0;
logic [7:0] long_name;
";
    let output = format(input);
    let lines: Vec<&str> = output.lines().collect();
    // `a` measured alone, not against `long_name`.
    assert_eq!(lines[0], "    logic a;");
    assert_eq!(lines[2], "    logic [7:0] long_name;");
}

#[test]
fn tabs_and_custom_spacing_are_honored() {
    let input = "logic a;\n";
    let tabs = format_file(&parse(input), FormatOptions { spacing: 4, use_tabs: true });
    assert_eq!(tabs, "\tlogic a;\n");
    let two = format_file(&parse(input), FormatOptions { spacing: 2, use_tabs: false });
    assert_eq!(two, "  logic a;\n");
}
