//! Elaborated design tree for the diplomat SystemVerilog tools.
//!
//! Sits between the CST front end and the cross-reference index: the
//! elaborator expands the instance hierarchy from parsed compilation
//! units, and the index build visitor walks the resulting tree.

mod elaborate;
mod tree;

pub use elaborate::{elaborate, Design, ElabError, ModuleDefinition};
pub use tree::{ElabKind, ElabSymbol, ElabTree, SymbolIdx};

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use sv_syntax::{SourceManager, SyntaxNode};

    fn parse_all(sources: &[(&str, &str)]) -> (SourceManager, Vec<(sv_syntax::FileId, SyntaxNode)>) {
        let mut sm = SourceManager::new();
        let mut files = Vec::new();
        for (path, text) in sources {
            let (file, parsed) =
                sv_syntax::parse_text(&mut sm, Path::new(path), text.to_string());
            files.push((file, parsed.unwrap()));
        }
        (sm, files)
    }

    fn find_children<'a>(design: &'a Design, idx: SymbolIdx, kind: ElabKind) -> Vec<SymbolIdx> {
        design
            .tree
            .children(idx)
            .iter()
            .copied()
            .filter(|c| design.tree.symbol(*c).kind == kind)
            .collect()
    }

    #[test]
    fn selects_uninstantiated_modules_as_tops() {
        let (sm, files) = parse_all(&[(
            "/test/design.sv",
            "module leaf;\nendmodule\nmodule top;\n  leaf u_leaf ();\nendmodule\n",
        )]);
        let design = elaborate(&sm, &files, None).unwrap();
        assert_eq!(design.tops, vec!["top".to_string()]);
    }

    #[test]
    fn forced_top_must_exist() {
        let (sm, files) = parse_all(&[("/test/one.sv", "module a;\nendmodule\n")]);
        let err = elaborate(&sm, &files, Some("missing"));
        assert!(matches!(err, Err(ElabError::TopNotFound { .. })));
    }

    #[test]
    fn two_instances_share_one_declaration_range() {
        let (sm, files) = parse_all(&[(
            "/test/dup.sv",
            "module leaf;\n  logic x;\nendmodule\nmodule top;\n  leaf u0 ();\n  leaf u1 ();\nendmodule\n",
        )]);
        let design = elaborate(&sm, &files, Some("top")).unwrap();
        let root = design.tree.root();
        let tops = find_children(&design, root, ElabKind::Instance);
        assert_eq!(tops.len(), 1);
        let top_body = find_children(&design, tops[0], ElabKind::InstanceBody)[0];
        let instances = find_children(&design, top_body, ElabKind::Instance);
        assert_eq!(instances.len(), 2);

        let body_range = |idx: SymbolIdx| {
            let body = find_children(&design, idx, ElabKind::InstanceBody)[0];
            design.tree.symbol(body).syntax_range.clone().unwrap()
        };
        // Same module text: both bodies cover the identical range.
        assert_eq!(body_range(instances[0]), body_range(instances[1]));
        assert_ne!(
            design.tree.symbol(instances[0]).name,
            design.tree.symbol(instances[1]).name
        );
    }

    #[test]
    fn ports_and_parameters_live_in_the_body() {
        let (sm, files) = parse_all(&[(
            "/test/ports.sv",
            "module m #(parameter W=8) (input logic [W-1:0] a, output logic y);\nendmodule\n",
        )]);
        let design = elaborate(&sm, &files, None).unwrap();
        let root = design.tree.root();
        let top = find_children(&design, root, ElabKind::Instance)[0];
        let body = find_children(&design, top, ElabKind::InstanceBody)[0];
        let names: Vec<_> = design
            .tree
            .children(body)
            .iter()
            .map(|c| design.tree.symbol(*c).name.clone())
            .collect();
        assert_eq!(names, vec!["W", "a", "y"]);
        // Declaration sites are the name tokens.
        let w = design.tree.children(body)[0];
        let range = design.tree.symbol(w).name_range.clone().unwrap();
        assert_eq!(range.start.position(), (1, 22));
        assert_eq!(range.end.position(), (1, 23));
    }

    #[test]
    fn generate_blocks_and_named_always_blocks_are_scopes() {
        let (sm, files) = parse_all(&[(
            "/test/gen.sv",
            "module g;\n  generate\n    if (1) begin : g_if\n      logic v;\n    end\n  endgenerate\n  always_ff @(posedge clk) begin : p_reg\n    logic t;\n  end\nendmodule\n",
        )]);
        let design = elaborate(&sm, &files, None).unwrap();
        let root = design.tree.root();
        let top = find_children(&design, root, ElabKind::Instance)[0];
        let body = find_children(&design, top, ElabKind::InstanceBody)[0];
        let gen = find_children(&design, body, ElabKind::GenerateBlock);
        assert_eq!(gen.len(), 1);
        assert_eq!(design.tree.symbol(gen[0]).name, "g_if");
        let blocks = find_children(&design, body, ElabKind::StatementBlock);
        assert_eq!(blocks.len(), 1);
        assert_eq!(design.tree.symbol(blocks[0]).name, "p_reg");
    }

    #[test]
    fn recursive_instantiation_is_cut() {
        let (sm, files) = parse_all(&[(
            "/test/rec.sv",
            "module r;\n  r u_r ();\nendmodule\n",
        )]);
        // Must terminate; the nested instance is dropped.
        let design = elaborate(&sm, &files, Some("r")).unwrap();
        assert!(design.tree.len() > 1);
    }
}
