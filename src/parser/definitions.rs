use super::{punct, Parser};
use crate::ast::{BlockKind, NodeId, NodeKind, ParamKind};
use crate::error::BlameKind;
use crate::location::Span;
use crate::macros::{MacroDef, Pattern, Syntax};
use crate::token::{Operator, Punctuation, Token, TokenKind};
use log::trace;
use std::collections::{HashMap, HashSet};

impl Parser<'_> {
    // === Functions ===

    /// Function ::= "fn" [ Identifier ] [ "(" Parameters ")" ] [ "->" Type ] Block
    ///
    /// Without a name the function is a lambda, whose body cannot be indented.
    pub(crate) fn parse_function(&mut self) -> NodeId {
        self.spanned(|p| {
            p.cursor.advance();
            let name = p
                .cursor
                .peek_is(&[TokenKind::Identifier])
                .then(|| p.parse_simple_name());
            let name_text = name.and_then(|n| p.ast.name_text(n));
            if let Some(text) = &name_text {
                trace!("Parsing function '{text}'");
                p.define(text.clone());
            }
            let params = if p.cursor.peek_is(&[punct(Punctuation::OpenParenthesis)]) {
                p.parse_parameters()
            } else {
                Vec::new()
            };
            let return_type = p
                .cursor
                .consume_if(&[punct(Punctuation::RightArrow)])
                .then(|| p.parse_type());

            let mut frame: Vec<String> = name_text.into_iter().collect();
            frame.extend(p.parameter_names(&params));
            p.enter_function(frame);
            let kind = if name.is_some() {
                BlockKind::Default
            } else {
                BlockKind::Lambda
            };
            let block = p.parse_block(kind);
            p.exit_scope();
            NodeKind::FuncDef {
                name,
                params,
                return_type,
                block,
            }
        })
    }

    fn parameter_names(&self, params: &[NodeId]) -> Vec<String> {
        params
            .iter()
            .filter_map(|param| match self.ast.kind(*param) {
                NodeKind::Param { name, .. } => self.ast.name_text(*name),
                _ => None,
            })
            .collect()
    }

    /// Parameters ::= "(" [ Parameter { "," Parameter } [","] ] ")"
    pub(crate) fn parse_parameters(&mut self) -> Vec<NodeId> {
        self.cursor.advance();
        self.grouped(|p| {
            let mut params = Vec::new();
            let mut names = HashSet::new();
            let mut seen_list = false;
            let mut seen_default = false;
            while !p
                .cursor
                .peek_is(&[punct(Punctuation::CloseParenthesis), TokenKind::End])
            {
                let param = p.parse_parameter();
                if let NodeKind::Param {
                    name,
                    default,
                    kind,
                    ..
                } = p.ast.kind(param).clone()
                {
                    let span = p.span_of(name);
                    if let Some(text) = p.ast.name_text(name) {
                        if !names.insert(text) {
                            p.cursor.blame(BlameKind::DuplicatedParameterInFunction, span);
                        }
                    }
                    match kind {
                        ParamKind::List if seen_list => {
                            let span = p.span_of(param);
                            p.cursor.blame(BlameKind::CannotHaveMoreThan1ListParameter, span);
                        }
                        ParamKind::List => seen_list = true,
                        ParamKind::Map => {}
                        ParamKind::Normal if default.is_some() => seen_default = true,
                        ParamKind::Normal if seen_default && !seen_list => {
                            p.cursor.blame(BlameKind::ExpectedDefaultParameterValue, span);
                        }
                        ParamKind::Normal => {}
                    }
                }
                params.push(param);
                if !p.cursor.consume_if(&[punct(Punctuation::Comma)]) {
                    break;
                }
            }
            p.cursor.expect(&[punct(Punctuation::CloseParenthesis)]);
            params
        })
    }

    /// Parameter ::= [ "*" | "**" ] Identifier [ ":" Type ] [ "=" Infix ]
    fn parse_parameter(&mut self) -> NodeId {
        self.spanned(|p| {
            let kind = match p.cursor.peek().operator() {
                Some(Operator::Multiply) => ParamKind::List,
                Some(Operator::Power) => ParamKind::Map,
                _ => ParamKind::Normal,
            };
            if kind != ParamKind::Normal {
                p.cursor.advance();
            }
            let name = p.parse_simple_name();
            let value_type = p
                .cursor
                .consume_if(&[punct(Punctuation::Colon)])
                .then(|| p.parse_type());
            let default = p
                .cursor
                .consume_if(&[TokenKind::Operator(Operator::Assign)])
                .then(|| p.parse_infix());
            NodeKind::Param {
                name,
                value_type,
                default,
                kind,
            }
        })
    }

    // === Types of objects ===

    /// Class ::= "class" Identifier [ "(" Parameters ")" ] [ "<" Type { "," Type } ] Block
    pub(crate) fn parse_class(&mut self) -> NodeId {
        self.spanned(|p| {
            p.cursor.advance();
            let name = p.parse_simple_name();
            let name_text = p.ast.name_text(name);
            if let Some(text) = &name_text {
                p.define(text.clone());
            }
            let members = if p.cursor.peek_is(&[punct(Punctuation::OpenParenthesis)]) {
                p.parse_parameters()
            } else {
                Vec::new()
            };
            let bases = p.parse_bases();
            let mut frame: Vec<String> = name_text.into_iter().collect();
            frame.extend(p.parameter_names(&members));
            p.enter_function(frame);
            let block = p.parse_block(BlockKind::Default);
            p.exit_scope();
            NodeKind::ClassDef {
                name,
                members,
                bases,
                block,
            }
        })
    }

    fn parse_bases(&mut self) -> Vec<NodeId> {
        let mut bases = Vec::new();
        if self.cursor.consume_if(&[TokenKind::Operator(Operator::Less)]) {
            bases.push(self.parse_type());
            while self.cursor.consume_if(&[punct(Punctuation::Comma)]) {
                bases.push(self.parse_type());
            }
        }
        bases
    }

    /// Module ::= "module" Identifier Block
    pub(crate) fn parse_module(&mut self) -> NodeId {
        self.spanned(|p| {
            let keyword = p.cursor.advance();
            if p.options().interpretation {
                p.cursor
                    .blame(BlameKind::ModuleNotSupportedInInterpretationMode, keyword.span);
            }
            let name = p.parse_simple_name();
            if let Some(text) = p.ast.name_text(name) {
                p.define(text);
            }
            let block = p.parse_block(BlockKind::Default);
            NodeKind::ModuleDef { name, block }
        })
    }

    /// Enum ::= "enum" Identifier [ "<" Type { "," Type } ] EnumBody
    /// EnumBody ::= ":" EnumItems
    ///            | [":"] "{" EnumItems "}"
    ///            | [":"] NEWLINE INDENT EnumItems OUTDENT
    /// EnumItems ::= EnumItem { ( "," | ";" | NEWLINE ) EnumItem }
    pub(crate) fn parse_enum(&mut self) -> NodeId {
        self.spanned(|p| {
            p.cursor.advance();
            let name = p.parse_simple_name();
            if let Some(text) = p.ast.name_text(name) {
                p.define(text);
            }
            let bases = p.parse_bases();
            let items = p.parse_enum_body();
            NodeKind::EnumDef { name, bases, items }
        })
    }

    fn parse_enum_body(&mut self) -> Vec<NodeId> {
        let colon = self.cursor.consume(&[punct(Punctuation::Colon)]);
        if self.cursor.peek_line_is(&[punct(Punctuation::OpenBrace)]) {
            if let Some(colon) = &colon {
                self.cursor.blame(BlameKind::RedundantColonWithBraces, colon.span);
            }
            self.cursor.advance();
            let items = self.parse_enum_items(&[punct(Punctuation::CloseBrace)]);
            self.cursor.expect(&[punct(Punctuation::CloseBrace)]);
            return items;
        }
        if self.cursor.peek_line_is(&[TokenKind::Newline]) {
            while self.cursor.consume_newline() {}
            if self.cursor.consume_if(&[TokenKind::Indent]) {
                let items = self.parse_enum_items(&[TokenKind::Outdent]);
                self.cursor.consume_if(&[TokenKind::Outdent]);
                return items;
            }
            self.cursor.blame(BlameKind::ExpectedBlockDeclaration, Span::zero());
            return Vec::new();
        }
        if colon.is_none() {
            self.cursor.blame(BlameKind::ExpectedBlockDeclaration, Span::zero());
            return Vec::new();
        }
        let mut items = vec![self.parse_enum_item()];
        while self
            .cursor
            .peek_line_is(&[punct(Punctuation::Comma), punct(Punctuation::Semicolon)])
        {
            self.cursor.advance();
            if !self.cursor.peek_line_is(&[TokenKind::Identifier]) {
                break;
            }
            items.push(self.parse_enum_item());
        }
        items
    }

    fn parse_enum_items(&mut self, terminators: &[TokenKind]) -> Vec<NodeId> {
        let mut items = Vec::new();
        loop {
            while self.cursor.consume_newline()
                || self
                    .cursor
                    .consume_if(&[punct(Punctuation::Comma), punct(Punctuation::Semicolon)])
            {}
            if self.cursor.peek_is(terminators) || self.cursor.peek_is(&[TokenKind::End]) {
                break;
            }
            let before = self.cursor.mark();
            items.push(self.parse_enum_item());
            if self.cursor.mark() == before {
                self.cursor.advance();
            }
        }
        items
    }

    /// EnumItem ::= Identifier [ "=" Infix ]
    fn parse_enum_item(&mut self) -> NodeId {
        self.spanned(|p| {
            let name = p.parse_simple_name();
            let value = p
                .cursor
                .consume_if(&[TokenKind::Operator(Operator::Assign)])
                .then(|| p.parse_infix());
            NodeKind::EnumItem { name, value }
        })
    }

    // === Macros ===

    /// Macro ::= "macro" Identifier [ "(" MacroCascade ")" ] Block
    ///
    /// The macro is registered before its block is read, so the block and
    /// the rest of the unit can use it. Named parts are visible in the block.
    pub(crate) fn parse_macro(&mut self) -> NodeId {
        self.spanned(|p| {
            p.cursor.advance();
            let name = p.parse_simple_name();
            let mut parameters = HashMap::new();
            let syntax = if p.cursor.peek_line_is(&[punct(Punctuation::OpenParenthesis)]) {
                p.cursor.advance();
                p.grouped(|p| {
                    let closing = Punctuation::CloseParenthesis;
                    let syntax = p.parse_macro_cascade(&mut parameters, closing);
                    p.cursor.expect(&[punct(closing)]);
                    syntax
                })
            } else {
                Vec::new()
            };
            if let Some(text) = p.ast.name_text(name) {
                if p.ast.macros().iter().any(|def| def.name == text) {
                    let span = p.span_of(name);
                    p.cursor.blame(BlameKind::NameIsAlreadyDefined, span);
                } else {
                    trace!("Defining macro '{text}'");
                    p.register_macro(MacroDef::new(text, syntax.clone()));
                }
            }
            p.enter_function(parameters.into_keys().collect());
            let block = p.parse_block(BlockKind::Default);
            p.exit_scope();
            NodeKind::MacroDefinition {
                name,
                syntax,
                block,
            }
        })
    }

    /// MacroCascade ::= [ MacroPattern { "," MacroPattern } ]
    fn parse_macro_cascade(
        &mut self,
        parameters: &mut HashMap<String, Syntax>,
        closing: Punctuation,
    ) -> Vec<Pattern> {
        let mut patterns = Vec::new();
        while !self.cursor.peek_is(&[punct(closing), TokenKind::End]) {
            patterns.push(self.parse_macro_pattern(parameters));
            if !self.cursor.consume_if(&[punct(Punctuation::Comma)]) {
                break;
            }
        }
        patterns
    }

    /// MacroPattern ::= MacroPrimary [ "|" MacroPattern ]
    /// MacroPrimary ::= "(" MacroCascade ")" | "[" MacroCascade "]" | "{" MacroCascade "}"
    ///                | String | Identifier [ ":" Identifier ]
    ///
    /// Parentheses group, brackets make the parts optional and braces repeat
    /// them. A string matches its text, a name matches an expression.
    fn parse_macro_pattern(&mut self, parameters: &mut HashMap<String, Syntax>) -> Pattern {
        let token = self.cursor.advance();
        let pattern = match token.kind {
            TokenKind::Punctuation(
                open @ (Punctuation::OpenParenthesis
                | Punctuation::OpenBracket
                | Punctuation::OpenBrace),
            ) => {
                let closing = open.closing().unwrap_or(Punctuation::CloseParenthesis);
                let patterns = self.parse_macro_cascade(parameters, closing);
                self.cursor.expect(&[punct(closing)]);
                match open {
                    Punctuation::OpenBracket => Pattern::Optional(patterns),
                    Punctuation::OpenBrace => Pattern::Multiple(patterns),
                    _ => Pattern::Cascade(patterns),
                }
            }
            TokenKind::String if !token.content.is_empty() => Pattern::Token(token.content),
            TokenKind::Identifier => {
                Pattern::Expression(self.parse_macro_parameter(&token, parameters))
            }
            _ => {
                self.cursor.blame(BlameKind::InvalidMacroParameter, token.span);
                Pattern::Cascade(Vec::new())
            }
        };
        if self.cursor.consume_if(&[TokenKind::Operator(Operator::BitOr)]) {
            let alternative = self.parse_macro_pattern(parameters);
            return Pattern::or(pattern, alternative);
        }
        pattern
    }

    /// `name: Syntax` declares a part, a bare `name` reuses the syntax it was
    /// declared with.
    fn parse_macro_parameter(
        &mut self,
        name: &Token,
        parameters: &mut HashMap<String, Syntax>,
    ) -> Syntax {
        if !self.cursor.consume_if(&[punct(Punctuation::Colon)]) {
            return match parameters.get(&name.value) {
                Some(syntax) => *syntax,
                None => {
                    self.cursor.blame(BlameKind::ImpossibleToInferType, name.span);
                    Syntax::Any
                }
            };
        }
        let syntax_name = self
            .cursor
            .expect_or(&[TokenKind::Identifier], BlameKind::InvalidMacroParameter);
        let syntax = match Syntax::from_name(&syntax_name.value) {
            Some(syntax) => syntax,
            None => {
                if syntax_name.is(TokenKind::Identifier) {
                    self.cursor.blame(BlameKind::InvalidMacroParameter, syntax_name.span);
                }
                Syntax::Any
            }
        };
        if parameters.insert(name.value.clone(), syntax).is_some() {
            self.cursor.blame(BlameKind::NameIsAlreadyDefined, name.span);
        }
        syntax
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{NodeKind, ParamKind};
    use crate::error::BlameKind;
    use crate::macros::{Pattern, Syntax};
    use crate::parser::tests::{blame_kinds, parse_ok};
    use crate::source::ProcessingOptions;

    #[test]
    fn test_lambda_with_indented_body_is_a_warning() {
        let ast = parse_ok("f = fn(x): x + 1\n");
        let NodeKind::VarDef {
            value: Some(value),
            ..
        } = ast.kind(ast.root_items()[0]) else {
            panic!("expected definition");
        };
        assert!(matches!(ast.kind(*value), NodeKind::FuncDef { name: None, .. }));
        assert_eq!(
            blame_kinds("f = fn(x)\n    x\n"),
            vec![BlameKind::LambdaCannotHaveIndentedBody]
        );
    }

    #[test]
    fn test_list_parameter_allows_required_after_default() {
        assert!(blame_kinds("fn f(a = 1, *rest, b): pass\n").is_empty());
    }

    #[test]
    fn test_typed_parameter_with_default() {
        let ast = parse_ok("fn f(a: int = 3): pass\n");
        let NodeKind::FuncDef { params, .. } = ast.kind(ast.root_items()[0]) else {
            panic!("expected function");
        };
        assert!(matches!(
            ast.kind(params[0]),
            NodeKind::Param {
                value_type: Some(_),
                default: Some(_),
                kind: ParamKind::Normal,
                ..
            }
        ));
    }

    #[test]
    fn test_class_with_members_and_bases() {
        let ast = parse_ok(
            "class Point(x: int, y: int) < Shape, Printable:\n    fn norm(): x * x + y * y\n",
        );
        let NodeKind::ClassDef {
            members, bases, ..
        } = ast.kind(ast.root_items()[0])
        else {
            panic!("expected class");
        };
        assert_eq!(members.len(), 2);
        assert_eq!(bases.len(), 2);
    }

    #[test]
    fn test_module_in_interpretation_mode() {
        assert!(blame_kinds("module m:\n    x = 1\n").is_empty());
        let options = ProcessingOptions {
            interpretation: true,
            ..ProcessingOptions::default()
        };
        let tokens = crate::lexer::tokenize("module m:\n    x = 1\n", &options).tokens;
        let output = crate::parser::parse(&tokens, &options);
        assert_eq!(
            output.blames.iter().map(|b| b.kind).collect::<Vec<_>>(),
            vec![BlameKind::ModuleNotSupportedInInterpretationMode]
        );
    }

    #[test]
    fn test_enum_forms() {
        for code in [
            "enum Color: Red, Green = 2, Blue\n",
            "enum Color { Red; Green = 2\n Blue }\n",
            "enum Color\n    Red\n    Green = 2\n    Blue\n",
        ] {
            let ast = parse_ok(code);
            let NodeKind::EnumDef { items, .. } = ast.kind(ast.root_items()[0]) else {
                panic!("expected enum in {code:?}");
            };
            assert_eq!(items.len(), 3, "{code:?}");
        }
    }

    #[test]
    fn test_macro_definition_is_usable_right_away() {
        let ast = parse_ok(concat!(
            "macro repeat ('repeat', count: Infix, body: Block):\n",
            "    pass\n",
            "repeat 3:\n",
            "    step()\n",
        ));
        let NodeKind::MacroDefinition { name, syntax, .. } = ast.kind(ast.root_items()[0]) else {
            panic!("expected a macro definition");
        };
        assert_eq!(ast.name_text(*name).as_deref(), Some("repeat"));
        assert_eq!(
            syntax,
            &vec![
                Pattern::token("repeat"),
                Pattern::Expression(Syntax::Infix),
                Pattern::Expression(Syntax::Block),
            ]
        );
        assert!(matches!(
            ast.kind(ast.root_items()[1]),
            NodeKind::MacroApplication { name, parts, .. } if name == "repeat" && parts.len() == 2
        ));
        assert_eq!(ast.macros().last().map(|def| def.name.as_str()), Some("repeat"));
    }

    #[test]
    fn test_macro_description_forms() {
        let ast = parse_ok(
            "macro swap ('swap', a: Postfix, ['with' | 'and', b: Postfix], {',', a}):\n    pass\n",
        );
        let NodeKind::MacroDefinition { syntax, .. } = ast.kind(ast.root_items()[0]) else {
            panic!("expected a macro definition");
        };
        let rendered: Vec<String> = syntax.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec!["'swap'", "Postfix", "['with' | 'and', Postfix]", "{',', Postfix}"]
        );
    }

    #[test]
    fn test_user_infix_macro() {
        let ast = parse_ok(
            "macro times (n: Infix, 'times', body: Scope): pass\n3 times:\n    step()\n",
        );
        let NodeKind::MacroApplication { name, head, parts } = ast.kind(ast.root_items()[1]) else {
            panic!("expected a macro application");
        };
        assert_eq!(name, "times");
        assert!(head.is_none());
        assert_eq!(parts.len(), 3);
    }

    #[test]
    fn test_macro_without_description() {
        let ast = parse_ok("macro m:\n    pass\n");
        assert!(matches!(
            ast.kind(ast.root_items()[0]),
            NodeKind::MacroDefinition { syntax, .. } if syntax.is_empty()
        ));
    }

    #[test]
    fn test_macro_description_errors() {
        assert_eq!(
            blame_kinds("macro m ('m', x: Infix, x: Atom): pass\n"),
            vec![BlameKind::NameIsAlreadyDefined]
        );
        assert_eq!(
            blame_kinds("macro m ('m', x: Statement): pass\n"),
            vec![BlameKind::InvalidMacroParameter]
        );
        assert_eq!(
            blame_kinds("macro m ('m', x): pass\n"),
            vec![BlameKind::ImpossibleToInferType]
        );
        assert_eq!(
            blame_kinds("macro m ('m', 42): pass\n"),
            vec![BlameKind::InvalidMacroParameter]
        );
        assert_eq!(
            blame_kinds("macro unless ('unless', x: Infix): pass\n"),
            vec![BlameKind::NameIsAlreadyDefined]
        );
    }
}
