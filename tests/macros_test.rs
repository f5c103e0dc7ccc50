use axion_syntax::ast::{MacroPart, NodeKind};
use axion_syntax::macros::{MacroDef, Pattern, Syntax};
use axion_syntax::{analyze, SourceUnit};
use serde_json::Value;

fn ast_json(source: &str) -> Value {
    let result = analyze(source, "test.ax");
    assert!(result.blames().is_empty(), "{:?}", result.blames());
    let json: Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();
    json["ast"].clone()
}

#[test]
fn test_for_in_application() {
    let ast = ast_json("for i in range(10):\n    print(i)\n");
    let application = &ast["children"][0];
    assert_eq!(application["node"], "MacroApplication");
    assert_eq!(application["text"], "for-in");
    assert_eq!(application["tokens"], serde_json::json!(["for", "in"]));
    let parts = application["children"].as_array().unwrap();
    assert_eq!(parts.len(), 3);
    assert_eq!(parts[0]["text"], "i");
    assert_eq!(parts[1]["node"], "Call");
    assert_eq!(parts[2]["node"], "Block");
}

#[test]
fn test_macros_nest() {
    let ast = ast_json("for x in [1, 2]:\n    total = {x: [x]}\n");
    let iterable = &ast["children"][0]["children"][1];
    assert_eq!(iterable["text"], "list");
    assert_eq!(iterable["tokens"], serde_json::json!(["[", ",", "]"]));
    let body = &ast["children"][0]["children"][2];
    let value = &body["children"][0]["children"][1];
    assert_eq!(value["text"], "map");
    assert_eq!(value["children"][1]["text"], "list");
}

#[test]
fn test_rewrites_reach_macro_parts() {
    let ast = ast_json("unless a < b < c:\n    pass\n");
    let condition = &ast["children"][0]["children"][0];
    assert_eq!(condition["node"], "Binary");
    assert_eq!(condition["text"], "and");
}

#[test]
fn test_application_covers_its_source() {
    let code = "do:\n    n -= 1\nwhile n > 0";
    let mut unit = SourceUnit::from_code(code);
    unit.process();
    assert!(unit.blames().is_empty(), "{:?}", unit.blames());
    let ast = unit.ast().unwrap();
    let id = ast.root_items()[0];
    let NodeKind::MacroApplication { name, head, parts } = ast.kind(id) else {
        panic!("expected a macro application, got {:?}", ast.kind(id));
    };
    assert_eq!(name, "do-while");
    assert_eq!(head.as_ref().map(|t| t.value.as_str()), Some("do"));
    assert!(matches!(&parts[1], MacroPart::Token(t) if t.value == "while"));
    assert_eq!(unit.render_span(ast.span(id)), code);
}

#[test]
fn test_match_arms() {
    let ast = ast_json("label = code match:\n    200 => 'ok'\n    _ => 'error'\n");
    let application = &ast["children"][0]["children"][1];
    assert_eq!(application["text"], "match");
    assert_eq!(application["children"][0]["text"], "code");
    let arms = application["children"].as_array().unwrap().len();
    assert_eq!(arms, 5);
}

#[test]
fn test_macro_defined_in_code() {
    let ast = ast_json(concat!(
        "macro check ('check', value: Infix, body: Block):\n",
        "    pass\n",
        "check n:\n",
        "    reset()\n",
    ));
    let definition = &ast["children"][0];
    assert_eq!(definition["node"], "MacroDefinition");
    assert_eq!(definition["syntax"], serde_json::json!(["'check'", "Infix", "Block"]));
    assert_eq!(definition["children"][0]["text"], "check");
    let application = &ast["children"][1];
    assert_eq!(application["node"], "MacroApplication");
    assert_eq!(application["text"], "check");
    assert_eq!(application["children"][1]["node"], "Block");
}

#[test]
fn test_registered_macro_with_statement_and_atom_parts() {
    let guard = MacroDef::new(
        "guard",
        vec![
            Pattern::token("guard"),
            Pattern::Expression(Syntax::Any),
            Pattern::token("else"),
            Pattern::Expression(Syntax::Atom),
        ],
    );
    let mut unit = SourceUnit::from_code("guard x = compute() else fail\n").with_macro(guard);
    unit.process();
    assert!(unit.blames().is_empty(), "{:?}", unit.blames());
    let ast = unit.ast().unwrap();
    assert_eq!(ast.macros().last().map(|def| def.name.as_str()), Some("guard"));
    let NodeKind::MacroApplication { name, parts, .. } = ast.kind(ast.root_items()[0]) else {
        panic!("expected a macro application, got {:?}", ast.kind(ast.root_items()[0]));
    };
    assert_eq!(name, "guard");
    assert!(matches!(parts[0], MacroPart::Node(n) if ast.kind(n).name() == "VarDef"));
    assert!(matches!(&parts[1], MacroPart::Token(t) if t.value == "else"));
    assert!(matches!(parts[2], MacroPart::Node(n) if ast.name_text(n).as_deref() == Some("fail")));
}
