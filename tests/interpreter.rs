#[cfg(test)]
mod interpreter_tests {
    use quill::runner::{Outcome, Runner};

    fn run(source: &str) -> (String, Outcome) {
        let mut output: Vec<u8> = Vec::new();

        let outcome = {
            let mut runner = Runner::new(&mut output);
            runner.run(source)
        };

        let printed = String::from_utf8(output).expect("interpreter output is not UTF-8");

        (printed, outcome)
    }

    fn run_ok(source: &str) -> String {
        let (printed, outcome) = run(source);
        assert_eq!(outcome, Outcome::Success, "unexpected outcome for:\n{}", source);
        printed
    }

    // ─── Expressions ────────────────────────────────────────────────────

    #[test]
    fn arithmetic_precedence() {
        assert_eq!(run_ok("print 1 + 2 * 3; print (1 + 2) * 3;"), "7\n9\n");
    }

    #[test]
    fn unary_operators() {
        assert_eq!(run_ok("print -(3); print !0; print !\"\";"), "-3\ntrue\nfalse\n");
    }

    #[test]
    fn number_formatting() {
        assert_eq!(run_ok("print 4 / 2; print 5 / 2;"), "2\n2.5\n");
    }

    #[test]
    fn division_by_zero_is_infinite() {
        assert_eq!(run_ok("print 1 / 0;"), "inf\n");
    }

    #[test]
    fn bitwise_operators_truncate() {
        assert_eq!(
            run_ok("print 6 & 3; print 6 | 3; print 6 ^ 3; print 6.9 & 3.9;"),
            "2\n7\n5\n2\n"
        );
    }

    #[test]
    fn bitwise_binds_looser_than_equality() {
        assert_eq!(run_ok("print (1 & 3) == 1;"), "true\n");

        let (_, outcome) = run("print 1 & 2 == 2;");
        assert_eq!(outcome, Outcome::RuntimeError);
    }

    #[test]
    fn string_concatenation_stringifies_right_operand() {
        assert_eq!(
            run_ok("print \"n=\" + 3; print \"v:\" + true; print \"x\" + null;"),
            "n=3\nv:true\nxnull\n"
        );
    }

    #[test]
    fn addition_type_errors() {
        let (_, outcome) = run("print 1 + \"a\";");
        assert_eq!(outcome, Outcome::RuntimeError);

        let (_, outcome) = run("print true + 1;");
        assert_eq!(outcome, Outcome::RuntimeError);
    }

    #[test]
    fn relational_operators() {
        assert_eq!(
            run_ok("print 1 < 2; print 2 <= 2; print \"a\" < \"b\"; print \"b\" >= \"b\";"),
            "true\ntrue\ntrue\ntrue\n"
        );

        let (_, outcome) = run("print \"a\" < 1;");
        assert_eq!(outcome, Outcome::RuntimeError);
    }

    #[test]
    fn equality_is_cross_type_false() {
        assert_eq!(
            run_ok("print 1 == \"1\"; print 1 != \"1\"; print null == null;"),
            "false\ntrue\ntrue\n"
        );
    }

    #[test]
    fn runtime_type_error_stops_the_run() {
        let (printed, outcome) = run("print \"a\" - 1; print \"after\";");
        assert_eq!(outcome, Outcome::RuntimeError);
        assert_eq!(printed, "");
    }

    // ─── Truthiness and logic ───────────────────────────────────────────

    #[test]
    fn zero_and_null_and_false_are_falsey() {
        assert_eq!(
            run_ok(
                "if (0) print \"t\"; else print \"f\";\n\
                 if (null) print \"t\"; else print \"f\";\n\
                 if (false) print \"t\"; else print \"f\";\n\
                 if (\"\") print \"t\"; else print \"f\";\n\
                 if (0.5) print \"t\"; else print \"f\";"
            ),
            "f\nf\nf\nt\nt\n"
        );
    }

    #[test]
    fn logical_operators_return_operand_values() {
        assert_eq!(run_ok("print 0 || \"x\"; print 1 && 2; print 0 && 2;"), "x\n2\n0\n");
        assert_eq!(run_ok("print 1 or 2; print null and 2;"), "1\nnull\n");
    }

    #[test]
    fn logical_operators_short_circuit() {
        let source = "\
            fun loud() { print \"evaluated\"; return true; }\n\
            true || loud();\n\
            false && loud();\n\
            true or loud();\n\
            false and loud();\n\
            print \"done\";";
        assert_eq!(run_ok(source), "done\n");
    }

    // ─── Variables and scope ────────────────────────────────────────────

    #[test]
    fn compound_assignment() {
        assert_eq!(run_ok("var x = 1; x += 2; print x; x -= 3; print x;"), "3\n0\n");
    }

    #[test]
    fn compound_assignment_requires_numbers() {
        let (_, outcome) = run("var s = \"a\"; s += 1;");
        assert_eq!(outcome, Outcome::RuntimeError);
    }

    #[test]
    fn assignment_is_an_expression() {
        assert_eq!(run_ok("var a = 1; var b = 2; a = b = 3; print a; print b;"), "3\n3\n");
    }

    #[test]
    fn undefined_variable_read_and_write() {
        let (_, outcome) = run("print missing;");
        assert_eq!(outcome, Outcome::RuntimeError);

        let (_, outcome) = run("missing = 1;");
        assert_eq!(outcome, Outcome::RuntimeError);
    }

    #[test]
    fn blocks_shadow_and_restore() {
        assert_eq!(
            run_ok("var a = \"outer\"; { var a = \"inner\"; print a; } print a;"),
            "inner\nouter\n"
        );
    }

    #[test]
    fn globals_may_redeclare() {
        assert_eq!(run_ok("var a = 1; var a = 2; print a;"), "2\n");
    }

    #[test]
    fn function_sees_the_scope_it_was_defined_in() {
        let source = "\
            var a = \"global\";\n\
            {\n\
              fun show() { print a; }\n\
              show();\n\
              var a = \"local\";\n\
              show();\n\
            }";
        assert_eq!(run_ok(source), "global\nglobal\n");
    }

    // ─── Functions and closures ─────────────────────────────────────────

    #[test]
    fn closures_capture_by_reference() {
        let source = "\
            fun makeCounter() {\n\
              var n = 0;\n\
              fun c() { n = n + 1; return n; }\n\
              return c;\n\
            }\n\
            var k = makeCounter();\n\
            print k(); print k(); print k();";
        assert_eq!(run_ok(source), "1\n2\n3\n");
    }

    #[test]
    fn sibling_closures_share_one_capture() {
        let source = "\
            fun make() {\n\
              var n = 0;\n\
              fun bump() { n += 1; }\n\
              fun read() { return n; }\n\
              bump(); bump();\n\
              return read;\n\
            }\n\
            print make()();";
        assert_eq!(run_ok(source), "2\n");
    }

    #[test]
    fn implicit_return_is_null() {
        assert_eq!(run_ok("fun f() {} print f();"), "null\n");
    }

    #[test]
    fn return_unwinds_nested_blocks_and_loops() {
        let source = "\
            fun find() {\n\
              var i = 0;\n\
              while (true) {\n\
                { if (i == 2) return i; }\n\
                i = i + 1;\n\
              }\n\
            }\n\
            print find();";
        assert_eq!(run_ok(source), "2\n");
    }

    #[test]
    fn anonymous_functions() {
        assert_eq!(
            run_ok("var f = fun (x) { return x * 2; }; print f(4); print f;"),
            "8\n<anonymous>\n"
        );
    }

    #[test]
    fn anonymous_function_single_statement_body() {
        assert_eq!(run_ok("var g = fun (x) return x + 1;; print g(1);"), "2\n");
    }

    #[test]
    fn callable_display_forms() {
        assert_eq!(
            run_ok("fun h() {} print h; print readline; print __SysClockSeconds;"),
            "<fun h>\n<native fun readline>\n<native fun __SysClockSeconds>\n"
        );
    }

    #[test]
    fn arity_is_checked() {
        let (_, outcome) = run("fun f(a, b) { return a; } f(1);");
        assert_eq!(outcome, Outcome::RuntimeError);

        let (_, outcome) = run("fun f() { return 1; } f(1);");
        assert_eq!(outcome, Outcome::RuntimeError);
    }

    #[test]
    fn only_callables_can_be_called() {
        let (_, outcome) = run("var x = 3; x();");
        assert_eq!(outcome, Outcome::RuntimeError);
    }

    #[test]
    fn recursion() {
        assert_eq!(
            run_ok("fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); } print fib(10);"),
            "55\n"
        );
    }

    #[test]
    fn clock_native_returns_a_number() {
        assert_eq!(run_ok("print __SysClockSeconds() > 0;"), "true\n");
    }

    // ─── Loops ──────────────────────────────────────────────────────────

    #[test]
    fn while_loop() {
        assert_eq!(run_ok("var i = 0; while (i < 3) { print i; i = i + 1; }"), "0\n1\n2\n");
    }

    #[test]
    fn break_exits_only_innermost_loop() {
        let source = "\
            var i = 0;\n\
            while (i < 3) { var j = 0;\n\
              while (j < 3) { if (j == 1) break; print j; j = j + 1; }\n\
              i = i + 1; }";
        assert_eq!(run_ok(source), "0\n0\n0\n");
    }

    #[test]
    fn for_loop_matches_handwritten_while() {
        let for_version = "for (var i = 0; i < 4; i = i + 1) { print i * i; }";
        let while_version = "{ var i = 0; while (i < 4) { { print i * i; } i = i + 1; } }";

        assert_eq!(run_ok(for_version), run_ok(while_version));
    }

    #[test]
    fn for_loop_with_empty_clauses() {
        assert_eq!(
            run_ok("var i = 0; for (;;) { if (i == 2) break; print i; i = i + 1; }"),
            "0\n1\n"
        );
    }

    #[test]
    fn break_inside_for_skips_increment() {
        assert_eq!(
            run_ok("for (var i = 0; i < 3; i = i + 1) { if (i == 1) break; print i; }"),
            "0\n"
        );
    }

    // ─── Classes ────────────────────────────────────────────────────────

    #[test]
    fn class_with_init_and_method() {
        let source = "\
            class Box { init(x) { this.x = x; } get() { return this.x; } }\n\
            var b = Box(42);\n\
            print b.get();";
        assert_eq!(run_ok(source), "42\n");
    }

    #[test]
    fn fields_are_created_on_assignment() {
        assert_eq!(
            run_ok("class Bag {} var b = Bag(); b.item = \"pen\"; print b.item;"),
            "pen\n"
        );
    }

    #[test]
    fn fields_shadow_methods() {
        let source = "\
            class C { tag() { return \"method\"; } }\n\
            var c = C();\n\
            c.tag = fun () { return \"field\"; };\n\
            print c.tag();";
        assert_eq!(run_ok(source), "field\n");
    }

    #[test]
    fn bound_methods_remember_their_instance() {
        let source = "\
            class Box { init(x) { this.x = x; } get() { return this.x; } }\n\
            var b = Box(42);\n\
            var m = b.get;\n\
            print m();";
        assert_eq!(run_ok(source), "42\n");
    }

    #[test]
    fn init_returns_the_instance_despite_bare_return() {
        let source = "\
            class A { init() { this.v = 1; return; } }\n\
            var a = A();\n\
            print a.v;";
        assert_eq!(run_ok(source), "1\n");
    }

    #[test]
    fn class_and_instance_display_forms() {
        assert_eq!(run_ok("class K {} print K; print K();"), "K\nK instance\n");
    }

    #[test]
    fn undefined_property_is_a_runtime_error() {
        let (_, outcome) = run("class C {} print C().missing;");
        assert_eq!(outcome, Outcome::RuntimeError);
    }

    #[test]
    fn property_access_requires_an_instance() {
        let (_, outcome) = run("var x = 3; print x.field;");
        assert_eq!(outcome, Outcome::RuntimeError);

        let (_, outcome) = run("var x = 3; x.field = 1;");
        assert_eq!(outcome, Outcome::RuntimeError);
    }

    #[test]
    fn compound_assignment_never_targets_a_property() {
        let (_, outcome) = run("class C {} var c = C(); c.x = 1; c.x += 1;");
        assert_eq!(outcome, Outcome::RuntimeError);
    }

    #[test]
    fn methods_are_inherited() {
        let source = "\
            class A { hello() { return \"hi\"; } }\n\
            class B : A {}\n\
            print B().hello();";
        assert_eq!(run_ok(source), "hi\n");
    }

    #[test]
    fn init_is_inherited_and_sets_class_arity() {
        let source = "\
            class P { init(x) { this.x = x; } }\n\
            class Q : P {}\n\
            var q = Q(5);\n\
            print q.x;";
        assert_eq!(run_ok(source), "5\n");
    }

    #[test]
    fn superclass_must_be_a_class() {
        let (_, outcome) = run("var NotAClass = 1; class C : NotAClass {}");
        assert_eq!(outcome, Outcome::RuntimeError);
    }

    #[test]
    fn instances_compare_by_identity() {
        let source = "\
            class C {}\n\
            var a = C();\n\
            var b = a;\n\
            print a == b; print a == C();";
        assert_eq!(run_ok(source), "true\nfalse\n");
    }

    // ─── Static errors ──────────────────────────────────────────────────

    #[test]
    fn return_outside_a_function_is_static() {
        let (_, outcome) = run("return 1;");
        assert_eq!(outcome, Outcome::StaticError);
    }

    #[test]
    fn break_outside_a_loop_is_static() {
        let (_, outcome) = run("break;");
        assert_eq!(outcome, Outcome::StaticError);
    }

    #[test]
    fn reading_a_local_in_its_own_initializer_is_static() {
        let (_, outcome) = run("var a = 1; { var a = a; }");
        assert_eq!(outcome, Outcome::StaticError);
    }

    #[test]
    fn duplicate_local_declaration_is_static() {
        let (_, outcome) = run("{ var a = 1; var a = 2; }");
        assert_eq!(outcome, Outcome::StaticError);
    }

    #[test]
    fn this_outside_a_class_is_static() {
        let (_, outcome) = run("print this;");
        assert_eq!(outcome, Outcome::StaticError);

        let (_, outcome) = run("fun f() { return this; }");
        assert_eq!(outcome, Outcome::StaticError);
    }

    #[test]
    fn syntax_errors_are_static() {
        let (_, outcome) = run("print 1 +;");
        assert_eq!(outcome, Outcome::StaticError);

        let (_, outcome) = run("var = 3;");
        assert_eq!(outcome, Outcome::StaticError);
    }

    #[test]
    fn lexical_errors_are_static() {
        let (_, outcome) = run("var a = $;");
        assert_eq!(outcome, Outcome::StaticError);

        let (_, outcome) = run("print \"unterminated;");
        assert_eq!(outcome, Outcome::StaticError);
    }

    #[test]
    fn invalid_assignment_target_is_static() {
        let (_, outcome) = run("var a = 1; var b = 2; a + b = 3;");
        assert_eq!(outcome, Outcome::StaticError);
    }

    #[test]
    fn static_errors_suppress_execution() {
        let (printed, outcome) = run("print \"should not run\"; return 1;");
        assert_eq!(outcome, Outcome::StaticError);
        assert_eq!(printed, "");
    }

    // ─── Session persistence (REPL behavior) ────────────────────────────

    #[test]
    fn definitions_survive_across_runs() {
        let mut output: Vec<u8> = Vec::new();
        let mut runner = Runner::new(&mut output);

        assert_eq!(runner.run("var a = 1;"), Outcome::Success);
        assert_eq!(runner.run("print a;"), Outcome::Success);

        drop(runner);
        assert_eq!(output, b"1\n");
    }

    #[test]
    fn closures_created_in_one_run_work_in_later_runs() {
        let mut output: Vec<u8> = Vec::new();
        let mut runner = Runner::new(&mut output);

        let setup = "\
            fun mk() {\n\
              var n = 0;\n\
              fun c() { n += 1; return n; }\n\
              return c;\n\
            }\n\
            var k = mk();";

        assert_eq!(runner.run(setup), Outcome::Success);
        assert_eq!(runner.run("print k(); print k();"), Outcome::Success);
        assert_eq!(runner.run("var unrelated = 99; print k();"), Outcome::Success);

        drop(runner);
        assert_eq!(output, b"1\n2\n3\n");
    }

    #[test]
    fn errors_do_not_poison_later_runs() {
        let mut output: Vec<u8> = Vec::new();
        let mut runner = Runner::new(&mut output);

        assert_eq!(runner.run("var a = 1;"), Outcome::Success);
        assert_eq!(runner.run("print a +;"), Outcome::StaticError);
        assert_eq!(runner.run("print missing;"), Outcome::RuntimeError);
        assert_eq!(runner.run("print a;"), Outcome::Success);

        drop(runner);
        assert_eq!(output, b"1\n");
    }
}
