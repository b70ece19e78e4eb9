//! Design-hierarchy rendering for `diplomat-server.get-hierarchy`.

use serde_json::{json, Value};
use sv_elab::{Design, ElabKind, SymbolIdx};
use sv_syntax::SourceManager;

/// Renders the instance tree as a JSON array of
/// `{name, module, def, file, childs}` records.
pub fn design_hierarchy(sm: &SourceManager, design: &Design) -> Value {
    let root = design.tree.root();
    Value::Array(instance_records(sm, design, root))
}

fn instance_records(sm: &SourceManager, design: &Design, scope: SymbolIdx) -> Vec<Value> {
    let mut records = Vec::new();
    collect_instances(sm, design, scope, &mut records);
    records
}

/// Gathers instance children, looking through non-instance scopes
/// (generate blocks and the like) without emitting records for them.
fn collect_instances(sm: &SourceManager, design: &Design, scope: SymbolIdx, out: &mut Vec<Value>) {
    for &child in design.tree.children(scope) {
        let symbol = design.tree.symbol(child);
        match symbol.kind {
            ElabKind::Instance => {
                let module = symbol.type_name.clone().unwrap_or_default();
                let file = design
                    .definitions
                    .get(&module)
                    .map(|def| sm.path(def.file).display().to_string())
                    .unwrap_or_default();
                let mut childs = Vec::new();
                for &body in design.tree.children(child) {
                    if design.tree.symbol(body).kind == ElabKind::InstanceBody {
                        collect_instances(sm, design, body, &mut childs);
                    }
                }
                out.push(json!({
                    "name": symbol.name,
                    "module": module,
                    "def": true,
                    "file": file,
                    "childs": childs,
                }));
            }
            ElabKind::CompilationUnit | ElabKind::Package => {}
            kind if kind.is_scope() => collect_instances(sm, design, child, out),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use sv_syntax::SyntaxNode;

    #[test]
    fn renders_nested_instances() {
        let mut sm = SourceManager::new();
        let text = "\
module leaf;
endmodule
module mid;
  leaf u_leaf ();
endmodule
module top;
  mid u_mid ();
endmodule
";
        let (file, parsed) =
            sv_syntax::parse_text(&mut sm, Path::new("/test/hier.sv"), text.to_string());
        let files: Vec<(sv_syntax::FileId, SyntaxNode)> = vec![(file, parsed.unwrap())];
        let design = sv_elab::elaborate(&sm, &files, Some("top")).unwrap();
        let hierarchy = design_hierarchy(&sm, &design);

        let tops = hierarchy.as_array().unwrap();
        assert_eq!(tops.len(), 1);
        assert_eq!(tops[0]["name"], "top");
        assert_eq!(tops[0]["module"], "top");
        let mids = tops[0]["childs"].as_array().unwrap();
        assert_eq!(mids[0]["name"], "u_mid");
        assert_eq!(mids[0]["module"], "mid");
        let leaves = mids[0]["childs"].as_array().unwrap();
        assert_eq!(leaves[0]["name"], "u_leaf");
        assert_eq!(leaves[0]["module"], "leaf");
        assert_eq!(leaves[0]["childs"].as_array().unwrap().len(), 0);
    }
}
