//! Module black-box extraction: parameter and port shapes without
//! running the indexer.

use serde::{Deserialize, Serialize};
use sv_syntax::{Kw, SyntaxKind, SyntaxNode, TokenKind};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModuleParam {
    pub name: String,
    #[serde(rename = "default")]
    pub default_value: String,
    #[serde(rename = "type")]
    pub param_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModulePort {
    pub name: String,
    pub size: String,
    #[serde(rename = "type")]
    pub port_type: String,
    pub direction: String,
    pub is_interface: bool,
    pub modport: String,
}

impl Default for ModulePort {
    fn default() -> Self {
        Self {
            name: String::new(),
            size: "1".to_string(),
            port_type: "logic".to_string(),
            direction: String::new(),
            is_interface: false,
            modport: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModuleBlackBox {
    #[serde(rename = "module")]
    pub module_name: String,
    pub parameters: Vec<ModuleParam>,
    pub ports: Vec<ModulePort>,
}

/// Extracts the black box of the first module in a parsed file.
pub fn extract(unit: &SyntaxNode) -> Option<ModuleBlackBox> {
    let module = unit.find_node(SyntaxKind::ModuleDeclaration)?;
    let header = module.find_node(SyntaxKind::ModuleHeader)?;
    let mut bb = ModuleBlackBox {
        module_name: header
            .child_tokens()
            .find(|t| t.kind == TokenKind::Identifier)?
            .text
            .clone(),
        ..Default::default()
    };

    if let Some(params) = header.find_node(SyntaxKind::ParameterPortList) {
        for decl in params.child_nodes() {
            if decl.kind == SyntaxKind::ParameterDeclaration {
                read_parameter(decl, &mut bb);
            }
        }
    }
    if let Some(ports) = header.find_node(SyntaxKind::AnsiPortList) {
        for port in ports.child_nodes() {
            if port.kind == SyntaxKind::ImplicitAnsiPort {
                read_port(port, &mut bb);
            }
        }
    }
    Some(bb)
}

fn read_parameter(decl: &SyntaxNode, bb: &mut ModuleBlackBox) {
    // localparams are not part of the box.
    if decl
        .child_tokens()
        .any(|t| t.kind == TokenKind::Keyword(Kw::Localparam))
    {
        return;
    }
    let param_type = decl
        .child_nodes()
        .find(|n| matches!(n.kind, SyntaxKind::IntegerType | SyntaxKind::NamedType))
        .and_then(|n| n.first_token())
        .map(|t| t.text.clone())
        .unwrap_or_default();

    for declarator in decl.child_nodes() {
        if declarator.kind != SyntaxKind::Declarator {
            continue;
        }
        let mut param = ModuleParam { param_type: param_type.clone(), ..Default::default() };
        if let Some(name) = declarator.child_tokens().next() {
            param.name = name.text.clone();
        }
        if let Some(init) = declarator.find_node(SyntaxKind::EqualsInitializer) {
            if let Some(expr) = init.find_node(SyntaxKind::Expression) {
                param.default_value = expr.raw_text();
            }
        }
        bb.parameters.push(param);
    }
}

fn read_port(port: &SyntaxNode, bb: &mut ModuleBlackBox) {
    let mut record = ModulePort::default();

    if let Some(declarator) = port.find_node(SyntaxKind::Declarator) {
        if let Some(name) = declarator.child_tokens().next() {
            record.name = name.text.clone();
        }
    }

    if let Some(header) = port.find_node(SyntaxKind::InterfacePortHeader) {
        record.is_interface = true;
        let mut idents = header
            .child_tokens()
            .filter(|t| t.kind == TokenKind::Identifier);
        if let Some(iface) = idents.next() {
            record.port_type = iface.text.clone();
        }
        if let Some(modport) = idents.next() {
            record.modport = modport.text.clone();
        }
    } else if let Some(header) = port.find_node(SyntaxKind::VariablePortHeader) {
        for token in header.child_tokens() {
            if let TokenKind::Keyword(kw) = token.kind {
                if kw.is_direction() {
                    record.direction = token.text.clone();
                }
            }
        }
        if let Some(ty) = header
            .child_nodes()
            .find(|n| matches!(n.kind, SyntaxKind::IntegerType | SyntaxKind::NamedType))
        {
            if let Some(keyword) = ty.first_token() {
                record.port_type = keyword.text.clone();
            }
            let dims: Vec<String> = ty
                .child_nodes()
                .filter(|n| n.kind == SyntaxKind::RangeDimension)
                .map(|n| n.raw_text())
                .collect();
            if !dims.is_empty() {
                record.size = dims.join("");
            }
        }
    }

    bb.ports.push(record);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use sv_syntax::SourceManager;

    fn parse(text: &str) -> SyntaxNode {
        let mut sm = SourceManager::new();
        let (_, parsed) = sv_syntax::parse_text(&mut sm, Path::new("/test/bb.sv"), text.to_string());
        parsed.unwrap()
    }

    #[test]
    fn extracts_parameters_and_ports() {
        let unit = parse(
            "module axi_buf #(parameter W=8, localparam D=2) (input logic [W-1:0] din, output logic [W-1:0] dout);\nendmodule\n",
        );
        let bb = extract(&unit).unwrap();
        assert_eq!(bb.module_name, "axi_buf");
        // localparam D is not part of the box.
        assert_eq!(bb.parameters.len(), 1);
        assert_eq!(bb.parameters[0].name, "W");
        assert_eq!(bb.parameters[0].default_value, "8");
        assert_eq!(bb.ports.len(), 2);
        assert_eq!(bb.ports[0].name, "din");
        assert_eq!(bb.ports[0].direction, "input");
        assert_eq!(bb.ports[0].size, "[W-1:0]");
        assert_eq!(bb.ports[1].name, "dout");
    }

    #[test]
    fn interface_ports_carry_modport() {
        let unit = parse("module m (bus_if.slave bus, input logic clk);\nendmodule\n");
        let bb = extract(&unit).unwrap();
        assert!(bb.ports[0].is_interface);
        assert_eq!(bb.ports[0].port_type, "bus_if");
        assert_eq!(bb.ports[0].modport, "slave");
        assert_eq!(bb.ports[0].name, "bus");
        assert!(!bb.ports[1].is_interface);
    }

    #[test]
    fn portless_module() {
        let unit = parse("module empty;\nendmodule\n");
        let bb = extract(&unit).unwrap();
        assert!(bb.parameters.is_empty());
        assert!(bb.ports.is_empty());
    }
}
