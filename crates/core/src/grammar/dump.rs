use super::ast::Module;

/// Serialize a VU AST to a pretty-printed JSON string.
pub fn to_pretty_json(module: &Module) -> String {
    // Every AST field is a string, number, bool or nested AST node.
    serde_json::to_string_pretty(module).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::parser::parse_vu;

    #[test]
    fn dump_tags_node_kinds() {
        let module = parse_vu("require(a.valid())").unwrap();
        let json = to_pretty_json(&module);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let call = &value["body"][0]["kind"]["value"]["kind"];
        assert_eq!(value["body"][0]["kind"]["kind"], "Expr");
        assert_eq!(call["kind"], "Call");
        assert_eq!(call["args"][0]["kind"]["kind"], "Call");
    }
}
