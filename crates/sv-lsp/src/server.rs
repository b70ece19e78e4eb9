//! The diplomat language server.
//!
//! A single worker thread owns the index and serves requests in arrival
//! order; rebuilds run to completion between requests. A failed rebuild
//! keeps the previous index alive and emits one user-visible warning
//! until the next successful build.

use crate::blackbox;
use crate::hierarchy::design_hierarchy;
use crate::protocol::{codes, JsonRpcError, JsonRpcMessage, JsonRpcResponse};
use crate::settings::WorkspaceSettings;
use crate::transport::RpcTransport;
use crate::uri::{path_to_uri, uri_to_path};
use serde_json::{json, Value};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use sv_elab::Design;
use sv_index::IndexCore;
use sv_position::{weakly_canonical, SourceLocation, SourceRange};
use sv_syntax::SourceManager;

/// One successful build: sources, elaboration, and the index.
struct Compilation {
    sm: SourceManager,
    design: Design,
    index: IndexCore,
}

/// The LSP server instance. One per process; tests drive it over
/// in-memory streams.
pub struct DiplomatLsp {
    transport: Arc<RpcTransport>,
    settings: WorkspaceSettings,
    workspace_folders: BTreeSet<PathBuf>,
    /// Open documents, keyed by canonical path; their text wins over the
    /// filesystem during builds.
    documents: HashMap<PathBuf, String>,
    compilation: Option<Compilation>,
    index_broken: bool,
    broken_index_emitted: bool,
    initialized: bool,
    shutdown_requested: bool,
    exiting: bool,
    client_capabilities: Value,
    next_request_id: i64,
    pending_config: HashSet<i64>,
    watch_client_pid: bool,
}

impl DiplomatLsp {
    pub fn new(transport: RpcTransport) -> Self {
        Self {
            transport: Arc::new(transport),
            settings: WorkspaceSettings::default(),
            workspace_folders: BTreeSet::new(),
            documents: HashMap::new(),
            compilation: None,
            index_broken: false,
            broken_index_emitted: false,
            initialized: false,
            shutdown_requested: false,
            exiting: false,
            client_capabilities: Value::Null,
            next_request_id: 1,
            pending_config: HashSet::new(),
            watch_client_pid: true,
        }
    }

    /// Disables the client-PID watchdog (tests have no client process).
    pub fn without_pid_watch(mut self) -> Self {
        self.watch_client_pid = false;
        self
    }

    /// Serves messages until `exit` or transport close.
    pub fn run(&mut self) {
        while !self.exiting {
            let Some(message) = self.transport.receive() else { break };
            self.dispatch(message);
        }
        tracing::info!("server loop finished");
    }

    fn dispatch(&mut self, message: JsonRpcMessage) {
        match (message.method.clone(), message.id.clone()) {
            (Some(method), Some(id)) => {
                let outcome = self.handle_request(&method, message.params);
                let response = match outcome {
                    Ok(result) => JsonRpcResponse::success(Some(id), result),
                    Err(error) => JsonRpcResponse::error(Some(id), error),
                };
                self.send_value(&response);
            }
            (Some(method), None) => self.handle_notification(&method, message.params),
            (None, Some(id)) => self.handle_response(&id, message.result),
            (None, None) => {}
        }
    }

    // ------------------------------------------------------------------
    // Requests
    // ------------------------------------------------------------------

    fn handle_request(
        &mut self,
        method: &str,
        params: Option<Value>,
    ) -> Result<Value, JsonRpcError> {
        if !self.initialized && method != "initialize" {
            return Err(JsonRpcError::new(
                codes::SERVER_NOT_INITIALIZED,
                "initialize has not completed",
            ));
        }
        match method {
            "initialize" => self.h_initialize(params),
            "shutdown" => {
                self.shutdown_requested = true;
                Ok(Value::Null)
            }
            "textDocument/definition" => self.h_definition(params),
            "textDocument/references" => self.h_references(params),
            "textDocument/rename" => self.h_rename(params),
            "textDocument/formatting" => self.h_formatting(params),
            "diplomat-server.get-modules" => self.h_get_modules(),
            "diplomat-server.get-module-bbox" => self.h_get_module_bbox(params),
            "diplomat-server.resolve-hier-path" => self.h_resolve_hier_path(params),
            "diplomat-server.get-hierarchy" => self.h_get_hierarchy(),
            "diplomat-server.list-symbols" => self.h_list_symbols(params),
            other => Err(JsonRpcError::method_not_found(other)),
        }
    }

    fn h_initialize(&mut self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params = params.unwrap_or(Value::Null);
        self.client_capabilities = params["capabilities"].clone();

        let mut got_workspace = false;
        if let Some(folders) = params["workspaceFolders"].as_array() {
            for folder in folders {
                if let Some(path) = folder["uri"].as_str().and_then(uri_to_path) {
                    self.workspace_folders.insert(weakly_canonical(&path));
                    got_workspace = true;
                }
            }
        }
        if !got_workspace {
            if let Some(path) = params["rootUri"].as_str().and_then(uri_to_path) {
                tracing::info!(root = %path.display(), "add root directory from URI");
                self.workspace_folders.insert(weakly_canonical(&path));
            } else if let Some(root) = params["rootPath"].as_str() {
                tracing::info!(root, "add root directory from path");
                self.workspace_folders.insert(weakly_canonical(Path::new(root)));
            }
        }

        if self.watch_client_pid {
            if let Some(pid) = params["processId"].as_i64() {
                self.spawn_pid_watchdog(pid);
            }
        }

        self.initialized = true;
        Ok(json!({
            "capabilities": {
                "textDocumentSync": { "openClose": true, "save": true },
                "definitionProvider": true,
                "referencesProvider": true,
                "documentFormattingProvider": true,
                "renameProvider": true,
                "workspace": {
                    "workspaceFolders": { "supported": true, "changeNotifications": true }
                }
            },
            "serverInfo": { "name": "diplomat-lsp", "version": env!("CARGO_PKG_VERSION") }
        }))
    }

    fn h_definition(&mut self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let Some(location) = self.lookup_location(params)? else {
            return Ok(Value::Null);
        };
        let Some(comp) = self.compilation.as_ref() else { return Ok(Value::Null) };
        match comp.index.lookup_symbol_at(&location) {
            Some(symbol) => {
                let record = comp.index.symbol(symbol);
                tracing::debug!(symbol = record.name(), "definition lookup");
                // A looked-up symbol always carries its source.
                match record.source() {
                    Some(range) => Ok(lsp_location(range)),
                    None => Ok(Value::Null),
                }
            }
            None => {
                tracing::debug!("no symbol at position");
                Ok(Value::Null)
            }
        }
    }

    fn h_references(&mut self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let Some(location) = self.lookup_location(params)? else {
            return Ok(json!([]));
        };
        let Some(comp) = self.compilation.as_ref() else { return Ok(json!([])) };
        match comp.index.lookup_symbol_at(&location) {
            Some(symbol) => {
                let locations: Vec<Value> = comp
                    .index
                    .symbol(symbol)
                    .references()
                    .iter()
                    .map(lsp_location)
                    .collect();
                Ok(Value::Array(locations))
            }
            None => Ok(json!([])),
        }
    }

    fn h_rename(&mut self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params = params.ok_or_else(|| JsonRpcError::invalid_params("missing params"))?;
        let new_name = params["newName"]
            .as_str()
            .ok_or_else(|| JsonRpcError::invalid_params("missing newName"))?
            .to_string();
        let Some(location) = self.lookup_location(Some(params))? else {
            return Err(JsonRpcError::request_failed("index is not available"));
        };
        let Some(comp) = self.compilation.as_ref() else {
            return Err(JsonRpcError::request_failed("index is not available"));
        };
        let Some(symbol) = comp.index.lookup_symbol_at(&location) else {
            return Err(JsonRpcError::request_failed(
                "selected area did not return a significant symbol",
            ));
        };

        let record = comp.index.symbol(symbol);
        // Pad to the old length so surrounding alignment is preserved.
        let new_text = format!("{:width$}", new_name, width = record.name().len());
        let mut changes: HashMap<String, Vec<Value>> = HashMap::new();
        for reference in record.references() {
            let uri = path_to_uri(reference.file().as_ref());
            changes
                .entry(uri)
                .or_default()
                .push(json!({ "range": lsp_range(reference), "newText": new_text }));
        }
        Ok(json!({ "changes": changes }))
    }

    fn h_formatting(&mut self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params = params.ok_or_else(|| JsonRpcError::invalid_params("missing params"))?;
        let path = params["textDocument"]["uri"]
            .as_str()
            .and_then(uri_to_path)
            .ok_or_else(|| JsonRpcError::invalid_params("missing textDocument.uri"))?;
        let path = weakly_canonical(&path);
        let options = sv_format::FormatOptions {
            spacing: params["options"]["tabSize"].as_u64().unwrap_or(4) as u32,
            use_tabs: !params["options"]["insertSpaces"].as_bool().unwrap_or(true),
        };

        let text = match self.documents.get(&path) {
            Some(text) => text.clone(),
            None => std::fs::read_to_string(&path).map_err(|err| {
                JsonRpcError::request_failed(format!("cannot read {}: {err}", path.display()))
            })?,
        };

        tracing::info!(file = %path.display(), "formatting request");
        let mut sm = SourceManager::new();
        let (_, parsed) = sv_syntax::parse_text(&mut sm, &path, text.clone());
        let unit = parsed.map_err(|err| {
            JsonRpcError::request_failed(format!("parse failure: {err}"))
        })?;
        let formatted = sv_format::format_file(&unit, options);

        let end_line = text.matches('\n').count();
        let end_character = text.rsplit('\n').next().unwrap_or("").len();
        Ok(json!([{
            "range": {
                "start": { "line": 0, "character": 0 },
                "end": { "line": end_line, "character": end_character }
            },
            "newText": formatted
        }]))
    }

    fn h_get_modules(&mut self) -> Result<Value, JsonRpcError> {
        if self.compilation.is_none() {
            self.compile();
        }
        let Some(comp) = self.compilation.as_ref() else { return Ok(json!([])) };
        let mut modules: Vec<Value> = comp
            .design
            .definitions
            .iter()
            .map(|(name, def)| {
                json!({ "name": name, "file": comp.sm.path(def.file).display().to_string() })
            })
            .collect();
        modules.sort_by_key(|m| m["name"].as_str().unwrap_or_default().to_string());
        Ok(Value::Array(modules))
    }

    fn h_get_module_bbox(&mut self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params = params.unwrap_or(Value::Null);
        // Invoked both directly ({file}) and as an editor command
        // ([{file}]).
        let file = params["file"]
            .as_str()
            .or_else(|| params[0]["file"].as_str())
            .ok_or_else(|| JsonRpcError::invalid_params("missing file"))?;
        let path = weakly_canonical(Path::new(file));
        tracing::info!(file = %path.display(), "black-box request");

        let text = match self.documents.get(&path) {
            Some(text) => text.clone(),
            None => std::fs::read_to_string(&path).map_err(|err| {
                JsonRpcError::request_failed(format!("cannot read {}: {err}", path.display()))
            })?,
        };
        let mut sm = SourceManager::new();
        let (_, parsed) = sv_syntax::parse_text(&mut sm, &path, text);
        let unit = parsed.map_err(|err| {
            JsonRpcError::request_failed(format!("parse failure: {err}"))
        })?;
        match blackbox::extract(&unit) {
            Some(bb) => serde_json::to_value(bb)
                .map_err(|err| JsonRpcError::request_failed(err.to_string())),
            None => Err(JsonRpcError::request_failed("no module in file")),
        }
    }

    fn h_resolve_hier_path(&mut self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        if !self.ensure_index() {
            return Ok(Value::Null);
        }
        let Some(comp) = self.compilation.as_ref() else { return Ok(Value::Null) };
        let paths: Vec<String> = match params {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|p| p.as_str().map(str::to_string))
                .collect(),
            _ => return Err(JsonRpcError::invalid_params("expected a list of paths")),
        };

        let mut resolved = serde_json::Map::new();
        for path in paths {
            tracing::debug!(path, "resolve hierarchical path");
            let entry = comp
                .index
                .root()
                .and_then(|root| comp.index.resolve_symbol(root, &path))
                .and_then(|symbol| comp.index.symbol(symbol).source().map(lsp_location));
            resolved.insert(path, entry.unwrap_or(Value::Null));
        }
        Ok(Value::Object(resolved))
    }

    fn h_get_hierarchy(&mut self) -> Result<Value, JsonRpcError> {
        if !self.ensure_index() {
            return Ok(json!([]));
        }
        let Some(comp) = self.compilation.as_ref() else { return Ok(json!([])) };
        Ok(design_hierarchy(&comp.sm, &comp.design))
    }

    fn h_list_symbols(&mut self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params = params.unwrap_or(Value::Null);
        let file = params
            .as_str()
            .or_else(|| params[0].as_str())
            .ok_or_else(|| JsonRpcError::invalid_params("missing file path"))?;
        let path = weakly_canonical(Path::new(file));
        let Some(comp) = self.compilation.as_ref() else { return Ok(json!({})) };
        let Some(record) = comp.index.file(&path) else { return Ok(json!({})) };

        let mut symbols: HashMap<String, Vec<Value>> = HashMap::new();
        for (_, symbol_id) in record.declarations() {
            symbols
                .entry(comp.index.symbol(*symbol_id).name().to_string())
                .or_default();
        }
        for reference in record.references().values() {
            let name = comp.index.symbol(reference.symbol).name().to_string();
            symbols
                .entry(name)
                .or_default()
                .push(lsp_range(&reference.range));
        }
        serde_json::to_value(symbols).map_err(|err| JsonRpcError::request_failed(err.to_string()))
    }

    // ------------------------------------------------------------------
    // Notifications
    // ------------------------------------------------------------------

    fn handle_notification(&mut self, method: &str, params: Option<Value>) {
        match method {
            "initialized" => self.n_initialized(),
            "exit" => {
                if !self.shutdown_requested {
                    tracing::warn!("exit received without shutdown");
                }
                self.exiting = true;
                self.transport.abort();
            }
            "textDocument/didOpen" => self.n_did_open(params),
            "textDocument/didSave" => self.n_did_save(params),
            "textDocument/didClose" => {}
            "workspace/didChangeConfiguration" => self.n_did_change_configuration(params),
            "workspace/didChangeWorkspaceFolders" => self.n_did_change_folders(params),
            "diplomat-server.index-dump" => self.n_index_dump(),
            "diplomat-server.ignore" => self.n_ignore(params),
            "diplomat-server.set-top" => self.n_set_top(params),
            "diplomat-server.add-include" => self.n_add_include(params),
            "diplomat-server.force-reindex" | "diplomat-server.full-index" => self.compile(),
            "$/setTrace" | "$/cancelRequest" => {}
            other => tracing::debug!(method = other, "unhandled notification"),
        }
    }

    fn n_initialized(&mut self) {
        tracing::info!("client initialization complete");
        let supports_configuration = self.client_capabilities["workspace"]["configuration"]
            .as_bool()
            .unwrap_or(false);
        if supports_configuration {
            let id = self.send_request(
                "workspace/configuration",
                json!({ "items": [{ "section": "diplomatServer" }] }),
            );
            self.pending_config.insert(id);
        }
    }

    fn n_did_open(&mut self, params: Option<Value>) {
        let params = params.unwrap_or(Value::Null);
        let document = &params["textDocument"];
        let Some(path) = document["uri"].as_str().and_then(uri_to_path) else { return };
        let path = weakly_canonical(&path);
        if let Some(text) = document["text"].as_str() {
            self.documents.insert(path, text.to_string());
        }
        self.compile();
    }

    fn n_did_save(&mut self, params: Option<Value>) {
        let params = params.unwrap_or(Value::Null);
        let Some(path) = params["textDocument"]["uri"].as_str().and_then(uri_to_path) else {
            return;
        };
        let path = weakly_canonical(&path);
        match params["text"].as_str() {
            Some(text) => {
                self.documents.insert(path, text.to_string());
            }
            None => {
                // The saved file is authoritative again.
                self.documents.remove(&path);
            }
        }
        self.compile();
    }

    fn n_did_change_configuration(&mut self, params: Option<Value>) {
        let params = params.unwrap_or(Value::Null);
        let section = &params["settings"]["diplomatServer"];
        if !section.is_null() {
            self.apply_settings(section.clone());
            self.compile();
        }
    }

    fn n_did_change_folders(&mut self, params: Option<Value>) {
        let params = params.unwrap_or(Value::Null);
        if let Some(removed) = params["event"]["removed"].as_array() {
            for folder in removed {
                if let Some(path) = folder["uri"].as_str().and_then(uri_to_path) {
                    self.workspace_folders.remove(&weakly_canonical(&path));
                }
            }
        }
        if let Some(added) = params["event"]["added"].as_array() {
            for folder in added {
                if let Some(path) = folder["uri"].as_str().and_then(uri_to_path) {
                    self.workspace_folders.insert(weakly_canonical(&path));
                }
            }
        }
        self.compile();
    }

    fn n_index_dump(&mut self) {
        if !self.ensure_index() {
            return;
        }
        let Some(comp) = self.compilation.as_ref() else { return };
        let dump = sv_index::dump(&comp.index);
        let target = PathBuf::from("diplomat-index.json");
        match serde_json::to_string_pretty(&dump) {
            Ok(rendered) => {
                if let Err(err) = std::fs::write(&target, rendered) {
                    tracing::error!(error = %err, "cannot write index dump");
                } else {
                    tracing::info!(file = %target.display(), "index dumped");
                }
            }
            Err(err) => tracing::error!(error = %err, "cannot serialize index"),
        }
    }

    fn n_ignore(&mut self, params: Option<Value>) {
        for path in command_paths(&params) {
            tracing::info!(path = %path.display(), "ignore path");
            self.settings.excluded_paths.push(path);
        }
    }

    fn n_set_top(&mut self, params: Option<Value>) {
        let params = params.unwrap_or(Value::Null);
        let top = params["top"]
            .as_str()
            .or_else(|| params[0]["top"].as_str())
            .map(str::to_string);
        if top.is_some() {
            self.settings.top_level = top;
            self.compile();
        }
    }

    fn n_add_include(&mut self, params: Option<Value>) {
        for path in command_paths(&params) {
            tracing::info!(path = %path.display(), "add user include path");
            self.settings.includes.user.push(path);
        }
    }

    // ------------------------------------------------------------------
    // Responses (to server-initiated requests)
    // ------------------------------------------------------------------

    fn handle_response(&mut self, id: &Value, result: Option<Value>) {
        let Some(id) = id.as_i64() else { return };
        if !self.pending_config.remove(&id) {
            return;
        }
        // workspace/configuration answers with one value per requested
        // item.
        if let Some(first) = result.as_ref().and_then(|r| r.as_array()).and_then(|a| a.first()) {
            if !first.is_null() {
                tracing::info!("received configuration from client");
                self.apply_settings(first.clone());
                self.show_message(3, "Configuration successfully loaded by the server.");
                self.compile();
            }
        }
    }

    fn apply_settings(&mut self, value: Value) {
        match serde_json::from_value::<WorkspaceSettings>(value) {
            Ok(settings) => self.settings = settings,
            Err(err) => {
                tracing::warn!(error = %err, "invalid configuration payload");
                self.show_message(2, format!("Invalid configuration: {err}"));
            }
        }
    }

    // ------------------------------------------------------------------
    // Build
    // ------------------------------------------------------------------

    /// Full rebuild: discover, parse, elaborate, index, resolve. On any
    /// build invariant violation the previous compilation stays in
    /// place.
    fn compile(&mut self) {
        let mut paths: BTreeSet<PathBuf> = BTreeSet::new();
        let roots: Vec<PathBuf> = self
            .workspace_folders
            .iter()
            .cloned()
            .chain(self.settings.workspace_dirs.iter().cloned())
            .collect();
        for root in roots {
            collect_source_files(&root, &self.settings, &mut paths);
        }
        for path in self.documents.keys() {
            if !self.settings.is_excluded(path) {
                paths.insert(path.clone());
            }
        }

        let mut sm = SourceManager::new();
        let mut files = Vec::new();
        for path in &paths {
            let text = match self.documents.get(path) {
                Some(text) => text.clone(),
                None => match std::fs::read_to_string(path) {
                    Ok(text) => text,
                    Err(err) => {
                        tracing::warn!(file = %path.display(), error = %err, "unreadable file");
                        continue;
                    }
                },
            };
            let (file, parsed) = sv_syntax::parse_text(&mut sm, path, text);
            match parsed {
                Ok(unit) => {
                    self.publish_diagnostics(path, Vec::new());
                    files.push((file, unit));
                }
                Err(err) => {
                    let location = sm.location_of(file, err.offset);
                    tracing::warn!(file = %path.display(), error = %err, "parse failure");
                    let line = location.line.saturating_sub(1);
                    let character = location.column.saturating_sub(1);
                    self.publish_diagnostics(
                        path,
                        vec![json!({
                            "range": {
                                "start": { "line": line, "character": character },
                                "end": { "line": line, "character": character + 1 }
                            },
                            "severity": 1,
                            "source": "diplomat",
                            "message": err.to_string(),
                        })],
                    );
                }
            }
        }

        let top = self.settings.top_level.clone();
        let design = match sv_elab::elaborate(&sm, &files, top.as_deref()) {
            Ok(design) => design,
            Err(err) => {
                tracing::warn!(error = %err, "falling back to automatic top selection");
                match sv_elab::elaborate(&sm, &files, None) {
                    Ok(design) => design,
                    Err(err) => {
                        tracing::error!(error = %err, "elaboration failed");
                        self.index_broken = true;
                        return;
                    }
                }
            }
        };

        match sv_index::index_design(&sm, &design, &files) {
            Ok(output) => {
                // Swap in atomically; readers on this thread only ever
                // see the previous or the new compilation.
                self.compilation = Some(Compilation { sm, design, index: output.core });
                self.index_broken = false;
                self.broken_index_emitted = false;
                tracing::info!(files = paths.len(), "workspace indexed");
            }
            Err(err) => {
                tracing::error!(error = %err, "index build failed, keeping previous index");
                self.index_broken = true;
            }
        }
    }

    /// True when an index is available. A broken build warns once and
    /// then answers queries with defaults until a build succeeds.
    fn ensure_index(&mut self) -> bool {
        if self.compilation.is_some() && !self.index_broken {
            return true;
        }
        if self.compilation.is_none() {
            self.compile();
        }
        if self.compilation.is_some() && !self.index_broken {
            return true;
        }
        if !self.broken_index_emitted {
            self.broken_index_emitted = true;
            self.show_message(
                2,
                "The design index is not available; navigation answers will be empty until the next successful build.",
            );
        }
        false
    }

    /// Position-bearing request params to an index location, with the
    /// 0-based to 1-based shift.
    fn lookup_location(
        &mut self,
        params: Option<Value>,
    ) -> Result<Option<SourceLocation>, JsonRpcError> {
        let params = params.ok_or_else(|| JsonRpcError::invalid_params("missing params"))?;
        let path = params["textDocument"]["uri"]
            .as_str()
            .and_then(uri_to_path)
            .ok_or_else(|| JsonRpcError::invalid_params("missing textDocument.uri"))?;
        let line = params["position"]["line"]
            .as_u64()
            .ok_or_else(|| JsonRpcError::invalid_params("missing position"))? as u32;
        let character = params["position"]["character"]
            .as_u64()
            .ok_or_else(|| JsonRpcError::invalid_params("missing position"))? as u32;
        if !self.ensure_index() {
            return Ok(None);
        }
        let file = Arc::new(weakly_canonical(&path));
        Ok(Some(SourceLocation::new(file, line + 1, character + 1)))
    }

    // ------------------------------------------------------------------
    // Outgoing traffic
    // ------------------------------------------------------------------

    fn send_value<T: serde::Serialize>(&self, payload: &T) {
        match serde_json::to_value(payload) {
            Ok(value) => self.transport.send(value),
            Err(err) => tracing::error!(error = %err, "cannot serialize outgoing payload"),
        }
    }

    fn send_notification(&self, method: &str, params: Value) {
        self.transport.send(json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
        }));
    }

    fn send_request(&mut self, method: &str, params: Value) -> i64 {
        let id = self.next_request_id;
        self.next_request_id += 1;
        self.transport.send(json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        }));
        id
    }

    fn show_message(&self, message_type: i32, message: impl Into<String>) {
        self.send_notification(
            "window/showMessage",
            json!({ "type": message_type, "message": message.into() }),
        );
    }

    fn publish_diagnostics(&self, path: &Path, diagnostics: Vec<Value>) {
        self.send_notification(
            "textDocument/publishDiagnostics",
            json!({ "uri": path_to_uri(path), "diagnostics": diagnostics }),
        );
    }

    fn spawn_pid_watchdog(&mut self, pid: i64) {
        if !cfg!(target_os = "linux") {
            return;
        }
        tracing::info!(pid, "watching client PID");
        let transport = self.transport.clone();
        std::thread::spawn(move || {
            let proc_path = PathBuf::from(format!("/proc/{pid}"));
            while proc_path.exists() {
                std::thread::sleep(std::time::Duration::from_millis(500));
            }
            tracing::warn!(pid, "client process exited, stopping the server");
            transport.abort();
        });
    }
}

/// Paths from editor-command payloads: `[{path}, ...]` or `{paths: []}`.
fn command_paths(params: &Option<Value>) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let Some(params) = params else { return found };
    let candidates: Vec<&Value> = match params {
        Value::Array(items) => items
            .iter()
            .flat_map(|item| match item {
                Value::Array(inner) => inner.iter().collect::<Vec<_>>(),
                other => vec![other],
            })
            .collect(),
        other => vec![other],
    };
    for candidate in candidates {
        if let Some(path) = candidate["path"].as_str() {
            found.push(weakly_canonical(Path::new(path)));
        }
    }
    found
}

/// Recursive workspace scan honoring extension and exclusion settings.
fn collect_source_files(root: &Path, settings: &WorkspaceSettings, out: &mut BTreeSet<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(root) else { return };
    for entry in entries.flatten() {
        let path = entry.path();
        if settings.is_excluded(&path) {
            continue;
        }
        if path.is_dir() {
            collect_source_files(&path, settings, out);
        } else if settings.accepts_extension(&path) {
            out.insert(weakly_canonical(&path));
        }
    }
}

/// LSP 0-based range from an internal 1-based range.
fn lsp_range(range: &SourceRange) -> Value {
    json!({
        "start": {
            "line": range.start.line.saturating_sub(1),
            "character": range.start.column.saturating_sub(1)
        },
        "end": {
            "line": range.end.line.saturating_sub(1),
            "character": range.end.column.saturating_sub(1)
        }
    })
}

fn lsp_location(range: &SourceRange) -> Value {
    json!({ "uri": path_to_uri(range.file().as_ref()), "range": lsp_range(range) })
}
