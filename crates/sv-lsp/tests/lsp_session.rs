//! Full LSP sessions over in-memory streams.

use serde_json::{json, Value};
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};
use sv_lsp::transport::{read_message, write_message};
use sv_lsp::{DiplomatLsp, RpcTransport};

/// Read half of an in-memory pipe.
struct ChannelReader {
    rx: Receiver<Vec<u8>>,
    pending: Vec<u8>,
    pos: usize,
}

impl Read for ChannelReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        while self.pos >= self.pending.len() {
            match self.rx.recv() {
                Ok(chunk) => {
                    self.pending = chunk;
                    self.pos = 0;
                }
                Err(_) => return Ok(0), // peer hung up
            }
        }
        let available = &self.pending[self.pos..];
        let count = available.len().min(buf.len());
        buf[..count].copy_from_slice(&available[..count]);
        self.pos += count;
        Ok(count)
    }
}

/// Write half of an in-memory pipe.
struct ChannelWriter {
    tx: Sender<Vec<u8>>,
}

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let _ = self.tx.send(buf.to_vec());
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Test-side client: frames requests in, scans frames out.
struct TestClient {
    to_server: Sender<Vec<u8>>,
    from_server: BufReader<ChannelReader>,
    next_id: i64,
    server: Option<std::thread::JoinHandle<()>>,
}

impl TestClient {
    fn start() -> Self {
        let (to_server, server_rx) = channel::<Vec<u8>>();
        let (server_tx, from_server) = channel::<Vec<u8>>();
        let server = std::thread::spawn(move || {
            let reader = BufReader::new(ChannelReader { rx: server_rx, pending: Vec::new(), pos: 0 });
            let writer = ChannelWriter { tx: server_tx };
            let transport = RpcTransport::new(reader, writer);
            DiplomatLsp::new(transport).without_pid_watch().run();
        });
        Self {
            to_server,
            from_server: BufReader::new(ChannelReader {
                rx: from_server,
                pending: Vec::new(),
                pos: 0,
            }),
            next_id: 1,
            server: Some(server),
        }
    }

    fn send(&mut self, payload: Value) {
        let mut bytes = Vec::new();
        write_message(&mut bytes, &payload).unwrap();
        self.to_server.send(bytes).unwrap();
    }

    fn notify(&mut self, method: &str, params: Value) {
        self.send(json!({ "jsonrpc": "2.0", "method": method, "params": params }));
    }

    /// Sends a request and blocks until its response, skipping
    /// notifications and server-initiated requests.
    fn request(&mut self, method: &str, params: Value) -> Value {
        let id = self.next_id;
        self.next_id += 1;
        self.send(json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params }));
        loop {
            let message = read_message(&mut self.from_server)
                .unwrap()
                .expect("server closed before responding");
            if message.method.is_none() && message.id == Some(json!(id)) {
                if let Some(error) = message.error {
                    return json!({ "error": error });
                }
                return message.result.unwrap_or(Value::Null);
            }
        }
    }

    fn shutdown(mut self) {
        let _ = self.request("shutdown", Value::Null);
        self.notify("exit", Value::Null);
        if let Some(handle) = self.server.take() {
            handle.join().unwrap();
        }
    }
}

const FOO_SV: &str = "\
module m #(parameter W=8) (input logic [W-1:0] a);
  logic [W-1:0] b;
  assign b = a;
endmodule
";

struct Workspace {
    _dir: tempfile::TempDir,
    root: PathBuf,
}

fn workspace_with(files: &[(&str, &str)]) -> Workspace {
    let dir = tempfile::tempdir().unwrap();
    for (name, text) in files {
        std::fs::write(dir.path().join(name), text).unwrap();
    }
    let root = dir.path().canonicalize().unwrap();
    Workspace { _dir: dir, root }
}

fn file_uri(path: &Path) -> String {
    format!("file://{}", path.display())
}

fn initialize(client: &mut TestClient, root: &Path) {
    let reply = client.request(
        "initialize",
        json!({
            "processId": Value::Null,
            "rootUri": file_uri(root),
            "capabilities": {}
        }),
    );
    assert_eq!(reply["capabilities"]["definitionProvider"], true);
    assert_eq!(reply["capabilities"]["renameProvider"], true);
    assert_eq!(reply["serverInfo"]["name"], "diplomat-lsp");
    client.notify("initialized", json!({}));
}

fn open(client: &mut TestClient, path: &Path, text: &str) {
    client.notify(
        "textDocument/didOpen",
        json!({
            "textDocument": {
                "uri": file_uri(path),
                "languageId": "systemverilog",
                "version": 1,
                "text": text
            }
        }),
    );
}

/// Applies LSP TextEdits (single line each) to a buffer.
fn apply_edits(text: &str, edits: &[Value]) -> String {
    let mut lines: Vec<String> = text.split('\n').map(str::to_string).collect();
    let mut sorted: Vec<&Value> = edits.iter().collect();
    sorted.sort_by_key(|e| {
        (
            e["range"]["start"]["line"].as_u64().unwrap(),
            e["range"]["start"]["character"].as_u64().unwrap(),
        )
    });
    for edit in sorted.iter().rev() {
        let line = edit["range"]["start"]["line"].as_u64().unwrap() as usize;
        let start = edit["range"]["start"]["character"].as_u64().unwrap() as usize;
        let end = edit["range"]["end"]["character"].as_u64().unwrap() as usize;
        let new_text = edit["newText"].as_str().unwrap();
        let original = &lines[line];
        lines[line] = format!("{}{}{}", &original[..start], new_text, &original[end..]);
    }
    lines.join("\n")
}

#[test]
fn definition_references_and_rename_round_trip() {
    let ws = workspace_with(&[("foo.sv", FOO_SV)]);
    let foo = ws.root.join("foo.sv");
    let uri = file_uri(&foo);

    let mut client = TestClient::start();
    initialize(&mut client, &ws.root);
    open(&mut client, &foo, FOO_SV);

    // S1: definition from the `a` in `b = a` lands on the port name.
    let definition = client.request(
        "textDocument/definition",
        json!({
            "textDocument": { "uri": uri },
            "position": { "line": 2, "character": 13 }
        }),
    );
    assert_eq!(definition["uri"], uri);
    assert_eq!(definition["range"]["start"], json!({ "line": 0, "character": 47 }));
    assert_eq!(definition["range"]["end"], json!({ "line": 0, "character": 48 }));

    // S2: references from the declaration cover both occurrences.
    let references = client.request(
        "textDocument/references",
        json!({
            "textDocument": { "uri": uri },
            "position": { "line": 0, "character": 47 },
            "context": { "includeDeclaration": true }
        }),
    );
    let refs = references.as_array().unwrap();
    assert_eq!(refs.len(), 2);
    let mut starts: Vec<(u64, u64)> = refs
        .iter()
        .map(|r| {
            (
                r["range"]["start"]["line"].as_u64().unwrap(),
                r["range"]["start"]["character"].as_u64().unwrap(),
            )
        })
        .collect();
    starts.sort();
    assert_eq!(starts, vec![(0, 47), (2, 13)]);

    // S3: renaming W touches the declaration and both uses.
    let rename = client.request(
        "textDocument/rename",
        json!({
            "textDocument": { "uri": uri },
            "position": { "line": 0, "character": 21 },
            "newName": "V"
        }),
    );
    let edits = rename["changes"][uri.as_str()].as_array().unwrap().clone();
    assert_eq!(edits.len(), 3);
    for edit in &edits {
        assert_eq!(edit["newText"], "V");
        let start = edit["range"]["start"]["character"].as_u64().unwrap();
        let end = edit["range"]["end"]["character"].as_u64().unwrap();
        assert_eq!(end - start, 1);
    }

    // Property 7: rename there and back restores the document.
    let renamed = apply_edits(FOO_SV, &edits);
    assert!(renamed.contains("parameter V=8"));
    open(&mut client, &foo, &renamed);
    let back = client.request(
        "textDocument/rename",
        json!({
            "textDocument": { "uri": uri },
            "position": { "line": 0, "character": 21 },
            "newName": "W"
        }),
    );
    let back_edits = back["changes"][uri.as_str()].as_array().unwrap().clone();
    let restored = apply_edits(&renamed, &back_edits);
    assert_eq!(restored, FOO_SV);

    client.shutdown();
}

#[test]
fn formatting_returns_a_whole_buffer_edit() {
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
    let ws = workspace_with(&[("fmt.sv", input)]);
    let fmt = ws.root.join("fmt.sv");
    let uri = file_uri(&fmt);

    let mut client = TestClient::start();
    initialize(&mut client, &ws.root);
    open(&mut client, &fmt, input);

    let reply = client.request(
        "textDocument/formatting",
        json!({
            "textDocument": { "uri": uri },
            "options": { "tabSize": 4, "insertSpaces": true }
        }),
    );
    let edits = reply.as_array().unwrap();
    assert_eq!(edits.len(), 1);
    assert_eq!(edits[0]["newText"].as_str().unwrap(), expected);
    assert_eq!(edits[0]["range"]["start"], json!({ "line": 0, "character": 0 }));

    client.shutdown();
}

#[test]
fn rename_without_symbol_fails_with_request_error() {
    let ws = workspace_with(&[("foo.sv", FOO_SV)]);
    let foo = ws.root.join("foo.sv");
    let uri = file_uri(&foo);

    let mut client = TestClient::start();
    initialize(&mut client, &ws.root);
    open(&mut client, &foo, FOO_SV);

    // Whitespace at the very start of line 4 maps to nothing.
    let reply = client.request(
        "textDocument/rename",
        json!({
            "textDocument": { "uri": uri },
            "position": { "line": 3, "character": 0 },
            "newName": "X"
        }),
    );
    assert_eq!(reply["error"]["code"], -32803);

    client.shutdown();
}

#[test]
fn custom_methods_answer_over_the_wire() {
    let design = "\
module leaf;
endmodule
module top;
  leaf u_leaf ();
endmodule
";
    let ws = workspace_with(&[("design.sv", design)]);
    let file = ws.root.join("design.sv");

    let mut client = TestClient::start();
    initialize(&mut client, &ws.root);
    open(&mut client, &file, design);

    let modules = client.request("diplomat-server.get-modules", Value::Null);
    let names: Vec<&str> = modules
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["leaf", "top"]);

    let hierarchy = client.request("diplomat-server.get-hierarchy", Value::Null);
    let tops = hierarchy.as_array().unwrap();
    assert_eq!(tops[0]["name"], "top");
    assert_eq!(tops[0]["childs"][0]["name"], "u_leaf");

    let resolved = client.request(
        "diplomat-server.resolve-hier-path",
        json!(["top.u_leaf", "top.missing"]),
    );
    assert!(resolved["top.u_leaf"].is_object());
    assert!(resolved["top.missing"].is_null());

    let bbox = client.request(
        "diplomat-server.get-module-bbox",
        json!({ "file": file.display().to_string() }),
    );
    assert_eq!(bbox["module"], "leaf");

    client.shutdown();
}

#[test]
fn requests_before_initialize_are_rejected() {
    let mut client = TestClient::start();
    let reply = client.request("textDocument/definition", json!({}));
    assert_eq!(reply["error"]["code"], -32002);
    // The server still initializes normally afterwards.
    let ws = workspace_with(&[]);
    initialize(&mut client, &ws.root);
    client.shutdown();
}
