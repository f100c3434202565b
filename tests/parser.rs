mod parser_tests {
    use treelox::ast::{Expr, ExprIdGen, LiteralValue, Stmt};
    use treelox::ast_printer::AstPrinter;
    use treelox::error::LoxError;
    use treelox::parser::Parser;
    use treelox::scanner::Scanner;
    use treelox::token::Token;

    fn parse_source(source: &str) -> (Vec<Stmt>, Vec<LoxError>) {
        let tokens: Vec<Token> = Scanner::new(source.as_bytes())
            .collect::<Result<Vec<_>, _>>()
            .expect("test source should scan cleanly");

        let mut ids = ExprIdGen::new();
        let mut parser = Parser::new(tokens, &mut ids);
        let statements = parser.parse();
        let diagnostics = parser.take_diagnostics();

        (statements, diagnostics)
    }

    /// Parse a single expression statement and return its printed form.
    fn printed(source: &str) -> String {
        let (statements, diagnostics) = parse_source(source);

        assert!(diagnostics.is_empty(), "unexpected errors: {:?}", diagnostics);
        assert_eq!(statements.len(), 1);

        match &statements[0] {
            Stmt::Expression(expr) => AstPrinter::print(expr),
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_parser_01_precedence() {
        assert_eq!(printed("1 + 2 * 3;"), "(+ 1.0 (* 2.0 3.0))");
        assert_eq!(printed("1 * 2 + 3;"), "(+ (* 1.0 2.0) 3.0)");
        assert_eq!(printed("1 < 2 == true;"), "(== (< 1.0 2.0) true)");
    }

    #[test]
    fn test_parser_02_unary_and_grouping() {
        assert_eq!(printed("-(1 + 2) * 3;"), "(* (- (group (+ 1.0 2.0))) 3.0)");
        assert_eq!(printed("!!false;"), "(! (! false))");
    }

    #[test]
    fn test_parser_03_logical_precedence() {
        assert_eq!(printed("a or b and c;"), "(or a (and b c))");
    }

    #[test]
    fn test_parser_04_assignment_targets() {
        assert_eq!(printed("a = 1;"), "(= a 1.0)");
        assert_eq!(printed("a.b = 1;"), "(set a b 1.0)");
        assert_eq!(printed("a.b.c;"), "(get (get a b) c)");
    }

    #[test]
    fn test_parser_05_calls() {
        assert_eq!(printed("f(1, g(2));"), "(call f 1.0 (call g 2.0))");
        assert_eq!(printed("obj.method(1);"), "(call (get obj method) 1.0)");
    }

    #[test]
    fn test_parser_06_invalid_assignment_target() {
        let (statements, diagnostics) = parse_source("1 = 2;");

        // Reported, but parsing continues without panic-mode.
        assert_eq!(statements.len(), 1);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].to_string().contains("Invalid assignment target."));
    }

    #[test]
    fn test_parser_07_for_desugars_to_while() {
        let (statements, diagnostics) =
            parse_source("for (var i = 0; i < 3; i = i + 1) print i;");

        assert!(diagnostics.is_empty());
        assert_eq!(statements.len(), 1);

        // Outer block: initializer, then the while loop.
        let inner = match &statements[0] {
            Stmt::Block(inner) => inner,
            other => panic!("expected block, got {:?}", other),
        };

        assert_eq!(inner.len(), 2);
        assert!(matches!(inner[0], Stmt::Var { .. }));

        let (condition, body) = match &inner[1] {
            Stmt::While { condition, body } => (condition, body),
            other => panic!("expected while, got {:?}", other),
        };

        assert_eq!(AstPrinter::print(condition), "(< i 3.0)");

        // Loop body: the original statement plus the increment.
        let body_stmts = match body.as_ref() {
            Stmt::Block(stmts) => stmts,
            other => panic!("expected block body, got {:?}", other),
        };

        assert_eq!(body_stmts.len(), 2);
        assert!(matches!(body_stmts[0], Stmt::Print(_)));
        assert!(matches!(body_stmts[1], Stmt::Expression(Expr::Assign { .. })));
    }

    #[test]
    fn test_parser_08_for_with_empty_clauses() {
        let (statements, diagnostics) = parse_source("for (;;) print 1;");

        assert!(diagnostics.is_empty());

        // No initializer: the while loop is the whole desugaring, and the
        // omitted condition becomes `true`.
        match &statements[0] {
            Stmt::While { condition, .. } => {
                assert!(matches!(condition, Expr::Literal(LiteralValue::True)));
            }
            other => panic!("expected while, got {:?}", other),
        }
    }

    #[test]
    fn test_parser_09_if_keeps_both_branches() {
        let (statements, diagnostics) = parse_source("if (true) print 1; else print 2;");

        assert!(diagnostics.is_empty());

        match &statements[0] {
            Stmt::If {
                then_branch,
                else_branch,
                ..
            } => {
                assert!(matches!(then_branch.as_ref(), Stmt::Print(_)));
                assert!(matches!(
                    else_branch.as_deref(),
                    Some(Stmt::Print(_))
                ));
            }
            other => panic!("expected if, got {:?}", other),
        }
    }

    #[test]
    fn test_parser_10_class_declaration() {
        let (statements, diagnostics) =
            parse_source("class B < A { init(x) { this.x = x; } twice() { return 2; } }");

        assert!(diagnostics.is_empty());

        match &statements[0] {
            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                assert_eq!(name.lexeme, "B");
                assert!(matches!(superclass, Some(Expr::Variable { .. })));
                assert_eq!(methods.len(), 2);
                assert_eq!(methods[0].name.lexeme, "init");
                assert_eq!(methods[0].params.len(), 1);
                assert_eq!(methods[1].name.lexeme, "twice");
            }
            other => panic!("expected class, got {:?}", other),
        }
    }

    #[test]
    fn test_parser_11_synchronizes_after_error() {
        let (statements, diagnostics) = parse_source("var = 1; print 2;");

        // The bad declaration is dropped; the next statement still parses.
        assert_eq!(statements.len(), 1);
        assert!(matches!(statements[0], Stmt::Print(_)));

        assert_eq!(diagnostics.len(), 1);
        let rendered = diagnostics[0].to_string();
        assert!(rendered.contains("error at '='"));
        assert!(rendered.contains("Expect variable name."));
    }

    #[test]
    fn test_parser_12_error_at_end() {
        let (_, diagnostics) = parse_source("print 1");

        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].to_string().contains("error at end"));
    }

    #[test]
    fn test_parser_13_super_expression() {
        let (statements, diagnostics) =
            parse_source("class B < A { m() { return super.m(); } }");

        assert!(diagnostics.is_empty());
        assert_eq!(statements.len(), 1);

        let methods = match &statements[0] {
            Stmt::Class { methods, .. } => methods,
            other => panic!("expected class, got {:?}", other),
        };

        match &methods[0].body[0] {
            Stmt::Return {
                value: Some(value), ..
            } => {
                assert_eq!(AstPrinter::print(value), "(call (super m))");
            }
            other => panic!("expected return, got {:?}", other),
        }
    }
}
