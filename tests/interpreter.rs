mod interpreter_tests {
    use treelox::lox::Lox;

    struct RunOutcome {
        stdout: String,
        had_error: bool,
        had_runtime_error: bool,
    }

    fn run(source: &str) -> RunOutcome {
        let mut output: Vec<u8> = Vec::new();
        let had_error;
        let had_runtime_error;

        {
            let mut lox = Lox::new(&mut output);
            lox.run(source.as_bytes());
            had_error = lox.had_error();
            had_runtime_error = lox.had_runtime_error();
        }

        RunOutcome {
            stdout: String::from_utf8(output).expect("interpreter output should be UTF-8"),
            had_error,
            had_runtime_error,
        }
    }

    fn assert_prints(source: &str, expected: &str) {
        let outcome = run(source);

        assert!(!outcome.had_error, "unexpected compile error for {:?}", source);
        assert!(
            !outcome.had_runtime_error,
            "unexpected runtime error for {:?}",
            source
        );
        assert_eq!(outcome.stdout, expected);
    }

    fn assert_runtime_error(source: &str, expected_stdout: &str) {
        let outcome = run(source);

        assert!(!outcome.had_error, "expected clean compile for {:?}", source);
        assert!(
            outcome.had_runtime_error,
            "expected runtime error for {:?}",
            source
        );
        assert_eq!(outcome.stdout, expected_stdout);
    }

    // ── arithmetic and precedence ──────────────────────────────────────────

    #[test]
    fn test_interp_01_arithmetic_precedence() {
        assert_prints("print 1 + 2 * 3;", "7\n");
        assert_prints("print (1 + 2) * 3;", "9\n");
        assert_prints("print 10 - 4 / 2;", "8\n");
        assert_prints("print -3 + 5;", "2\n");
    }

    #[test]
    fn test_interp_02_comparison_and_equality() {
        assert_prints("print 1 < 2;", "true\n");
        assert_prints("print 2 <= 2;", "true\n");
        assert_prints("print 1 == 1.0;", "true\n");
        assert_prints("print \"a\" == \"a\";", "true\n");
        assert_prints("print \"a\" == 1;", "false\n");
        assert_prints("print nil == nil;", "true\n");
        assert_prints("print nil != false;", "true\n");
    }

    // ── scoping ────────────────────────────────────────────────────────────

    #[test]
    fn test_interp_03_block_scoping() {
        assert_prints("var a = 1; { var a = 2; print a; } print a;", "2\n1\n");
    }

    #[test]
    fn test_interp_04_static_scoping_in_closures() {
        // The closure binds `a` at declaration, not at call time.
        assert_prints(
            r#"
            var a = "global";
            {
              fun show() { print a; }
              show();
              var a = "block";
              show();
            }
            "#,
            "global\nglobal\n",
        );
    }

    // ── closures ───────────────────────────────────────────────────────────

    #[test]
    fn test_interp_05_counter_closure() {
        assert_prints(
            r#"
            fun makeCounter() {
              var i = 0;
              fun count() { i = i + 1; return i; }
              return count;
            }
            var c = makeCounter();
            print c(); print c(); print c();
            "#,
            "1\n2\n3\n",
        );
    }

    #[test]
    fn test_interp_06_closures_share_environment() {
        assert_prints(
            r#"
            fun makePair() {
              var n = 0;
              fun inc() { n = n + 1; }
              fun get() { return n; }
              inc();
              inc();
              return get;
            }
            print makePair()();
            "#,
            "2\n",
        );
    }

    #[test]
    fn test_interp_07_closure_sees_later_assignment() {
        assert_prints(
            r#"
            var a = "before";
            fun get() { return a; }
            a = "after";
            print get();
            "#,
            "after\n",
        );
    }

    // ── control flow ───────────────────────────────────────────────────────

    #[test]
    fn test_interp_08_if_else() {
        assert_prints("if (1 < 2) print \"yes\"; else print \"no\";", "yes\n");
        assert_prints("if (nil) print \"yes\"; else print \"no\";", "no\n");
    }

    #[test]
    fn test_interp_09_while_loop() {
        assert_prints(
            "var i = 0; while (i < 3) { print i; i = i + 1; }",
            "0\n1\n2\n",
        );
    }

    #[test]
    fn test_interp_10_for_loop() {
        assert_prints("for (var i = 0; i < 3; i = i + 1) print i;", "0\n1\n2\n");
    }

    #[test]
    fn test_interp_11_truthiness_and_short_circuit() {
        // 0 is truthy, so `and` yields the right operand.
        assert_prints("print nil or \"hi\"; print 0 and \"x\";", "hi\nx\n");
        assert_prints("print false or false;", "false\n");
        assert_prints("print 1 or ignored;", "1\n");
        assert_prints("print nil and ignored;", "nil\n");
    }

    // ── functions and returns ──────────────────────────────────────────────

    #[test]
    fn test_interp_12_return_unwinds_nested_frames() {
        assert_prints(
            r#"
            fun find() {
              for (var i = 0; i < 10; i = i + 1) {
                if (i == 3) { return i; }
              }
              return -1;
            }
            print find();
            "#,
            "3\n",
        );
    }

    #[test]
    fn test_interp_13_function_without_return_yields_nil() {
        assert_prints("fun noop() {} print noop();", "nil\n");
    }

    #[test]
    fn test_interp_14_recursion() {
        assert_prints(
            r#"
            fun fib(n) {
              if (n < 2) return n;
              return fib(n - 2) + fib(n - 1);
            }
            print fib(10);
            "#,
            "55\n",
        );
    }

    // ── classes ────────────────────────────────────────────────────────────

    #[test]
    fn test_interp_15_class_with_initializer() {
        assert_prints(
            r#"
            class Point { init(x,y){ this.x=x; this.y=y; }
                          sum(){ return this.x + this.y; } }
            print Point(3,4).sum();
            "#,
            "7\n",
        );
    }

    #[test]
    fn test_interp_16_fields_shadow_methods() {
        assert_prints(
            r#"
            class C { m() { return "method"; } }
            var c = C();
            c.m = "field";
            print c.m;
            "#,
            "field\n",
        );
    }

    #[test]
    fn test_interp_17_bound_method_keeps_this() {
        assert_prints(
            r#"
            class Greeter {
              init(name) { this.name = name; }
              greet() { print this.name; }
            }
            var g = Greeter("world").greet;
            g();
            "#,
            "world\n",
        );
    }

    #[test]
    fn test_interp_18_initializer_returns_instance() {
        assert_prints(
            r#"
            class C { init() { this.n = 1; } }
            var c = C();
            print c.init();
            "#,
            "C instance\n",
        );
    }

    #[test]
    fn test_interp_19_bare_return_in_initializer() {
        assert_prints(
            r#"
            class C {
              init(x) {
                this.x = x;
                if (x < 0) return;
                this.x = x + 1;
              }
            }
            print C(-5).x;
            print C(5).x;
            "#,
            "-5\n6\n",
        );
    }

    // ── inheritance ────────────────────────────────────────────────────────

    #[test]
    fn test_interp_20_super_call() {
        assert_prints(
            r#"
            class A { hello(){ print "A"; } }
            class B < A { hello(){ super.hello(); print "B"; } }
            B().hello();
            "#,
            "A\nB\n",
        );
    }

    #[test]
    fn test_interp_21_inherited_method_lookup() {
        assert_prints(
            r#"
            class A { m() { return "A"; } }
            class B < A {}
            print B().m();
            "#,
            "A\n",
        );
    }

    #[test]
    fn test_interp_22_super_binds_in_declaring_class() {
        assert_prints(
            r#"
            class A { method() { print "A method"; } }
            class B < A {
              method() { print "B method"; }
              test() { super.method(); }
            }
            class C < B {}
            C().test();
            "#,
            "A method\n",
        );
    }

    #[test]
    fn test_interp_23_inherited_initializer() {
        assert_prints(
            r#"
            class A { init(n) { this.n = n; } }
            class B < A {}
            print B(7).n;
            "#,
            "7\n",
        );
    }

    // ── display rules ──────────────────────────────────────────────────────

    #[test]
    fn test_interp_24_number_display() {
        assert_prints("print 3.0;", "3\n");
        assert_prints("print 2.5;", "2.5\n");
        assert_prints("print 10 / 4;", "2.5\n");
    }

    #[test]
    fn test_interp_25_value_display() {
        assert_prints("print nil; print true; print false;", "nil\ntrue\nfalse\n");
        assert_prints("fun f() {} print f;", "<function f>\n");
        assert_prints("class C {} print C; print C();", "C\nC instance\n");
        assert_prints("print clock;", "<native function>\n");
    }

    #[test]
    fn test_interp_26_string_concatenation_coerces() {
        assert_prints("print \"a\" + \"b\";", "ab\n");
        assert_prints("print 1 + \"x\";", "1x\n");
        assert_prints("print \"n=\" + 4.0;", "n=4\n");
    }

    #[test]
    fn test_interp_27_clock_returns_number() {
        assert_prints("print clock() >= 0;", "true\n");
    }

    // ── runtime errors ─────────────────────────────────────────────────────

    #[test]
    fn test_interp_28_division_by_zero() {
        assert_runtime_error("print 1 / 0;", "");
    }

    #[test]
    fn test_interp_29_operand_type_errors() {
        assert_runtime_error("print -\"x\";", "");
        assert_runtime_error("print true + nil;", "");
        assert_runtime_error("print 1 < \"x\";", "");
    }

    #[test]
    fn test_interp_30_property_on_non_instance() {
        assert_runtime_error("\"a\".foo;", "");
        assert_runtime_error("1.5.foo = 2;", "");
    }

    #[test]
    fn test_interp_31_undefined_names() {
        assert_runtime_error("print missing;", "");
        assert_runtime_error("missing = 1;", "");
        assert_runtime_error("class C {} print C().nope;", "");
    }

    #[test]
    fn test_interp_32_call_errors() {
        assert_runtime_error("\"x\"();", "");
        assert_runtime_error("fun f(a) {} f();", "");
        assert_runtime_error("clock(1);", "");
    }

    #[test]
    fn test_interp_33_superclass_must_be_a_class() {
        assert_runtime_error("var notAClass = 1; class C < notAClass {}", "");
    }

    #[test]
    fn test_interp_34_runtime_error_stops_execution() {
        // Output before the error survives; nothing after it runs.
        assert_runtime_error("print 1; print nil + nil; print 2;", "1\n");
    }

    #[test]
    fn test_interp_35_compile_error_prevents_execution() {
        let outcome = run("print 1; return 2;");

        assert!(outcome.had_error);
        assert!(!outcome.had_runtime_error);
        assert_eq!(outcome.stdout, "");
    }

    // ── driver state across runs ───────────────────────────────────────────

    #[test]
    fn test_interp_36_state_persists_across_runs() {
        let mut output: Vec<u8> = Vec::new();

        {
            let mut lox = Lox::new(&mut output);

            lox.run(b"class Counter { init() { this.n = 0; } bump() { this.n = this.n + 1; return this.n; } }");
            lox.run(b"var c = Counter();");
            lox.run(b"print c.bump();");
            lox.run(b"print c.bump();");

            assert!(!lox.had_error());
            assert!(!lox.had_runtime_error());
        }

        assert_eq!(String::from_utf8(output).unwrap(), "1\n2\n");
    }

    #[test]
    fn test_interp_37_error_flag_clears_between_runs() {
        let mut output: Vec<u8> = Vec::new();

        {
            let mut lox = Lox::new(&mut output);

            lox.run(b"print ;");
            assert!(lox.had_error());

            lox.clear_error();
            assert!(!lox.had_error());

            lox.run(b"print 42;");
            assert!(!lox.had_error());
        }

        assert_eq!(String::from_utf8(output).unwrap(), "42\n");
    }

    #[test]
    fn test_interp_38_literal_only_expressions() {
        // Pure literal trees evaluate without any environment in play.
        assert_prints("print 1 + 2 + 3 + 4;", "10\n");
        assert_prints("print !nil;", "true\n");
        assert_prints("print \"lone\";", "lone\n");
    }
}
