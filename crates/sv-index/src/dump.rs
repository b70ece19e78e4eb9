//! JSON serialization of the index.
//!
//! Shape: `{"hier": <Scope>, "files": {<path>: <File>}}` with locations
//! rendered as `file:line:col` strings. Map contents are emitted in
//! deterministic order so dumps diff cleanly between runs.

use crate::core::{IndexCore, ScopeId, SymbolId};
use serde_json::{json, Map, Value};

/// Serializes the whole index.
pub fn dump(core: &IndexCore) -> Value {
    let hier = match core.root() {
        Some(root) => scope_json(core, root),
        None => Value::Null,
    };

    let mut files = Map::new();
    for (path, file) in core.files() {
        let mut scopes: Vec<String> = file
            .scopes()
            .iter()
            .map(|scope| core.full_path(*scope))
            .collect();
        scopes.sort();

        let mut declarations: Vec<(&sv_position::SourceRange, SymbolId)> =
            file.declarations().iter().map(|(range, id)| (range, *id)).collect();
        declarations.sort_by_key(|(range, _)| range.start.position());
        let symbols: Vec<Value> = declarations
            .into_iter()
            .map(|(_, id)| symbol_json(core, id))
            .collect();

        files.insert(
            path.display().to_string(),
            json!({
                "path": path.display().to_string(),
                "scopes": scopes,
                "symbols": symbols,
            }),
        );
    }

    json!({ "hier": hier, "files": Value::Object(files) })
}

fn scope_json(core: &IndexCore, id: ScopeId) -> Value {
    let scope = core.scope(id);

    let mut children = Map::new();
    for child in scope.children() {
        children.insert(
            core.scope(*child).name().to_string(),
            scope_json(core, *child),
        );
    }

    let mut names: Vec<&String> = scope.content().keys().collect();
    names.sort();
    let mut content = Map::new();
    for name in names {
        if let Some(symbol) = scope.content().get(name) {
            content.insert(name.clone(), symbol_json(core, *symbol));
        }
    }

    json!({
        "name": scope.name(),
        "def": scope.source(),
        "virtual": scope.is_virtual(),
        "children": Value::Object(children),
        "content": Value::Object(content),
    })
}

fn symbol_json(core: &IndexCore, id: SymbolId) -> Value {
    let symbol = core.symbol(id);
    let mut refs = symbol.references().to_vec();
    refs.sort_by(|a, b| {
        (a.start.file.as_ref(), a.start.position())
            .cmp(&(b.start.file.as_ref(), b.start.position()))
    });
    json!({
        "id": symbol.name(),
        "loc": symbol.source(),
        "refs": refs,
    })
}
