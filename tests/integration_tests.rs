//! Decaf 编译器集成测试
//!
//! 从源码出发驱动公开接口：检查、布局与三地址码输出

use decafc::Compiler;
use decafc::ast::{ClassDecl, Decl, FnDecl, Program};
use decafc::codegen::{ClassLayouts, Segment, SlotDecision, TacBuilder, merge_method};
use decafc::config::CodegenOptions;
use decafc::error::DecafError;
use decafc::lexer::lex;
use decafc::parser::parse;
use decafc::semantic::{Diagnostic, check};
use pretty_assertions::assert_eq;

fn parse_program(source: &str) -> Program {
    parse(lex(source).expect("lex")).expect("parse")
}

fn diagnostics_for(source: &str) -> Vec<Diagnostic> {
    let program = parse_program(source);
    check(&program).diagnostics.into_iter().collect()
}

/// 检查并生成，返回指令输出器和各类布局的快照
fn emit<'a>(program: &'a Program, options: &CodegenOptions) -> (TacBuilder, ClassLayouts<'a>) {
    let checked = match check(program).into_checked() {
        Ok(checked) => checked,
        Err(diagnostics) => panic!("unexpected diagnostics:\n{}", diagnostics),
    };
    let mut tac = TacBuilder::new();
    let layouts = checked.emit(&mut tac, options).expect("emit");
    (tac, layouts)
}

fn class<'a>(program: &'a Program, name: &str) -> &'a ClassDecl {
    program.find_class(name).expect("class")
}

fn method<'a>(class: &'a ClassDecl, name: &str) -> &'a FnDecl {
    class.methods().find(|m| m.name() == name).expect("method")
}

#[test]
fn test_subclass_fields_follow_parent_fields() {
    let program = parse_program("class A { int x; } class B extends A { int y; }");
    let (tac, layouts) = emit(&program, &CodegenOptions::default());

    let b = layouts.by_name("B").expect("layout for B");
    assert_eq!(b.field_names(), vec!["x", "y"]);

    let x = b.field_location("x").expect("x");
    let y = b.field_location("y").expect("y");
    assert_eq!(x.segment, Segment::Field);
    assert_eq!(y.offset - x.offset, 4);
    assert_eq!(b.instance_size(), 12);

    assert!(b.vtable.is_empty());
    assert_eq!(tac.vtable("B"), Some(&[][..]));
    assert_eq!(tac.vtable("A"), Some(&[][..]));
}

#[test]
fn test_missing_interface_method_is_reported_once() {
    let source = "interface I { int f(); int g(); } class C implements I { }";
    let outcome = {
        let program = parse_program(source);
        let outcome = check(&program);
        (outcome.success, outcome.diagnostics.into_iter().collect::<Vec<_>>())
    };

    assert!(!outcome.0);
    match outcome.1.as_slice() {
        [Diagnostic::InterfaceNotImplemented { class, interface, .. }] => {
            assert_eq!(class, "C");
            assert_eq!(interface, "I");
        }
        other => panic!("unexpected diagnostics: {:?}", other),
    }
}

#[test]
fn test_partial_interface_implementation_reports_only_missing_obligation() {
    let source = "interface I { int f(); int g(); } class C implements I { int f() { return 1; } }";
    let program = parse_program(source);
    let outcome = check(&program);
    assert!(!outcome.success);

    let diagnostics: Vec<Diagnostic> = outcome.diagnostics.into_iter().collect();
    match diagnostics.as_slice() {
        [Diagnostic::InterfaceNotImplemented { class, interface, .. }] => {
            assert_eq!(class, "C");
            assert_eq!(interface, "I");
        }
        other => panic!("unexpected diagnostics: {:?}", other),
    }
}

#[test]
fn test_failed_check_yields_no_checked_program() {
    let source = "class A extends Missing { } void main() { int x; x = true; }";
    let program = parse_program(source);
    let outcome = check(&program);
    assert!(!outcome.success);

    match outcome.into_checked() {
        Err(diagnostics) => assert_eq!(diagnostics.len(), 2),
        Ok(_) => panic!("a failed check must not reach code generation"),
    }
}

#[test]
fn test_override_with_different_arity_is_rejected() {
    let source = "class P { int f(int x) { return x; } }\n\
                  class Q extends P { int f(int x, int y) { return x + y; } }";
    let program = parse_program(source);
    let outcome = check(&program);
    assert!(!outcome.success);

    let diagnostics: Vec<Diagnostic> = outcome.diagnostics.into_iter().collect();
    match diagnostics.as_slice() {
        [Diagnostic::OverrideMismatch { name, loc }] => {
            assert_eq!(name, "f");
            assert_eq!(loc.line, 2);
        }
        other => panic!("unexpected diagnostics: {:?}", other),
    }

    // 拒绝的覆盖保留父类原有的槽位
    let p = class(&program, "P");
    let q = class(&program, "Q");
    let mut vtable = Vec::new();
    merge_method(&mut vtable, "P", method(p, "f"));
    let decision = merge_method(&mut vtable, "Q", method(q, "f"));

    assert_eq!(decision, SlotDecision::Rejected(0));
    assert_eq!(vtable.len(), 1);
    assert_eq!(vtable[0].label, "P.f");
    assert_eq!(vtable[0].decl.id, method(p, "f").id);
}

#[test]
fn test_conflicting_declaration_reported_once() {
    let diagnostics = diagnostics_for("int a; bool a; class K { int a; void a() { } }");
    let messages: Vec<String> = diagnostics.iter().map(|d| d.to_string()).collect();
    assert_eq!(
        messages,
        vec![
            "*** Declaration of 'a' here conflicts with declaration on line 1".to_string(),
            "*** Declaration of 'a' here conflicts with declaration on line 1".to_string(),
        ]
    );
}

#[test]
fn test_override_keeps_slot_and_new_methods_append() {
    let source = r#"
        class P { int f(int x) { return x; } int g() { return 1; } }
        class Q extends P { int g() { return 2; } int h() { return 3; } }
        class R extends Q { }
    "#;
    let program = parse_program(source);
    let (tac, layouts) = emit(&program, &CodegenOptions::default());

    let labels = |name: &str| tac.vtable(name).map(|labels| labels.to_vec());
    assert_eq!(labels("P"), Some(vec!["P.f".to_string(), "P.g".to_string()]));
    assert_eq!(
        labels("Q"),
        Some(vec!["P.f".to_string(), "Q.g".to_string(), "Q.h".to_string()])
    );
    assert_eq!(labels("R"), labels("Q"));

    let q = layouts.by_name("Q").expect("layout for Q");
    assert_eq!(q.slot_index("g"), layouts.by_name("P").and_then(|p| p.slot_index("g")));
    assert_eq!(q.slot_index("h"), Some(2));
}

#[test]
fn test_subclass_declared_before_parent() {
    let source = r#"
        class Child extends Base { int b; int two() { return b; } }
        class Base { int a; int one() { return a; } }
    "#;
    let program = parse_program(source);
    let (tac, layouts) = emit(&program, &CodegenOptions::default());

    assert_eq!(layouts.len(), 2);
    let child = layouts.by_name("Child").expect("layout for Child");
    assert_eq!(child.field_names(), vec!["a", "b"]);
    assert_eq!(
        tac.vtable("Child").map(|labels| labels.to_vec()),
        Some(vec!["Base.one".to_string(), "Child.two".to_string()])
    );
}

#[test]
fn test_function_and_print_tac() {
    let source = r#"
        int sq(int n) { return n * n; }
        void main() { int x; x = sq(3); Print(x); }
    "#;
    let tac = Compiler::new().compile(source).expect("compile");
    assert_eq!(
        tac,
        "_sq:\n\
         \tBeginFunc 4 ;\n\
         \t_tmp0(fp-8) = n(fp+4) * n(fp+4) ;\n\
         \tReturn _tmp0(fp-8) ;\n\
         \tEndFunc ;\n\
         main:\n\
         \tBeginFunc 12 ;\n\
         \t_tmp1(fp-12) = 3 ;\n\
         \tPushParam _tmp1(fp-12) ;\n\
         \t_tmp2(fp-16) = LCall _sq ;\n\
         \tPopParams 4 ;\n\
         \tx(fp-8) = _tmp2(fp-16) ;\n\
         \tPushParam x(fp-8) ;\n\
         \tLCall _PrintInt ;\n\
         \tPopParams 4 ;\n\
         \tEndFunc ;\n"
    );
}

#[test]
fn test_same_name_in_different_scopes_gets_distinct_operands() {
    let source = r#"
        int a;
        void set() { a = 3; }
        void main() { int a; a = 1; { int a; a = 2; } Print(a); }
    "#;
    let tac = Compiler::new().compile(source).expect("compile");
    assert_eq!(
        tac,
        "_set:\n\
         \tBeginFunc 4 ;\n\
         \t_tmp0(fp-8) = 3 ;\n\
         \ta(gp+0) = _tmp0(fp-8) ;\n\
         \tEndFunc ;\n\
         main:\n\
         \tBeginFunc 16 ;\n\
         \t_tmp1(fp-12) = 1 ;\n\
         \ta(fp-8) = _tmp1(fp-12) ;\n\
         \t_tmp2(fp-20) = 2 ;\n\
         \ta(fp-16) = _tmp2(fp-20) ;\n\
         \tPushParam a(fp-8) ;\n\
         \tLCall _PrintInt ;\n\
         \tPopParams 4 ;\n\
         \tEndFunc ;\n"
    );
}

#[test]
fn test_method_call_dispatches_through_vtable() {
    let source = r#"
        class A { int v; int get() { return v; } }
        void main() { A a; a = new A; Print(a.get()); }
    "#;
    let tac = Compiler::new().compile(source).expect("compile");
    assert_eq!(
        tac,
        "A.get:\n\
         \tBeginFunc 4 ;\n\
         \t_tmp0(fp-8) = *(this(fp+4) + 4) ;\n\
         \tReturn _tmp0(fp-8) ;\n\
         \tEndFunc ;\n\
         VTable A =\n\
         \tA.get,\n\
         ;\n\
         main:\n\
         \tBeginFunc 28 ;\n\
         \t_tmp1(fp-12) = 8 ;\n\
         \tPushParam _tmp1(fp-12) ;\n\
         \t_tmp2(fp-16) = LCall _Alloc ;\n\
         \tPopParams 4 ;\n\
         \t_tmp3(fp-20) = A ;\n\
         \t*(_tmp2(fp-16)) = _tmp3(fp-20) ;\n\
         \ta(fp-8) = _tmp2(fp-16) ;\n\
         \tPushParam a(fp-8) ;\n\
         \t_tmp4(fp-24) = *(a(fp-8)) ;\n\
         \t_tmp5(fp-28) = *(_tmp4(fp-24)) ;\n\
         \t_tmp6(fp-32) = ACall _tmp5(fp-28) ;\n\
         \tPopParams 4 ;\n\
         \tPushParam _tmp6(fp-32) ;\n\
         \tLCall _PrintInt ;\n\
         \tPopParams 4 ;\n\
         \tEndFunc ;\n"
    );
}

#[test]
fn test_inherited_method_uses_parent_slot() {
    let source = r#"
        class A { int get() { return 1; } }
        class B extends A { int both() { return get(); } }
        void main() { B b; b = new B; Print(b.get()); Print(b.both()); }
    "#;
    let program = parse_program(source);
    let (tac, layouts) = emit(&program, &CodegenOptions::default());

    let a = layouts.by_name("A").expect("layout for A");
    let b = layouts.by_name("B").expect("layout for B");
    assert_eq!(b.slot_index("get"), a.slot_index("get"));
    assert_eq!(b.slot_index("get"), Some(0));
    assert_eq!(b.slot_index("both"), Some(1));

    assert_eq!(
        tac.to_string(),
        "A.get:\n\
         \tBeginFunc 4 ;\n\
         \t_tmp0(fp-8) = 1 ;\n\
         \tReturn _tmp0(fp-8) ;\n\
         \tEndFunc ;\n\
         VTable A =\n\
         \tA.get,\n\
         ;\n\
         B.both:\n\
         \tBeginFunc 12 ;\n\
         \tPushParam this(fp+4) ;\n\
         \t_tmp1(fp-8) = *(this(fp+4)) ;\n\
         \t_tmp2(fp-12) = *(_tmp1(fp-8)) ;\n\
         \t_tmp3(fp-16) = ACall _tmp2(fp-12) ;\n\
         \tPopParams 4 ;\n\
         \tReturn _tmp3(fp-16) ;\n\
         \tEndFunc ;\n\
         VTable B =\n\
         \tA.get,\n\
         \tB.both,\n\
         ;\n\
         main:\n\
         \tBeginFunc 40 ;\n\
         \t_tmp4(fp-12) = 4 ;\n\
         \tPushParam _tmp4(fp-12) ;\n\
         \t_tmp5(fp-16) = LCall _Alloc ;\n\
         \tPopParams 4 ;\n\
         \t_tmp6(fp-20) = B ;\n\
         \t*(_tmp5(fp-16)) = _tmp6(fp-20) ;\n\
         \tb(fp-8) = _tmp5(fp-16) ;\n\
         \tPushParam b(fp-8) ;\n\
         \t_tmp7(fp-24) = *(b(fp-8)) ;\n\
         \t_tmp8(fp-28) = *(_tmp7(fp-24)) ;\n\
         \t_tmp9(fp-32) = ACall _tmp8(fp-28) ;\n\
         \tPopParams 4 ;\n\
         \tPushParam _tmp9(fp-32) ;\n\
         \tLCall _PrintInt ;\n\
         \tPopParams 4 ;\n\
         \tPushParam b(fp-8) ;\n\
         \t_tmp10(fp-36) = *(b(fp-8)) ;\n\
         \t_tmp11(fp-40) = *(_tmp10(fp-36) + 4) ;\n\
         \t_tmp12(fp-44) = ACall _tmp11(fp-40) ;\n\
         \tPopParams 4 ;\n\
         \tPushParam _tmp12(fp-44) ;\n\
         \tLCall _PrintInt ;\n\
         \tPopParams 4 ;\n\
         \tEndFunc ;\n"
    );
}

#[test]
fn test_loops_and_arrays_compile() {
    let source = r#"
        int total;
        void main() {
            int[] xs;
            int i;
            xs = NewArray(4, int);
            for (i = 0; i < xs.length(); i++) {
                if (i >= 3) break;
                xs[i] = i * 2;
                total = total + xs[i];
            }
            while (total != 0) { total--; }
            Print("done", total == 0);
        }
    "#;
    let tac = Compiler::new().compile(source).expect("compile");

    assert!(tac.contains("LCall _Alloc"));
    assert!(tac.contains("Array subscript out of bounds"));
    assert!(tac.contains("LCall _Halt"));
    assert!(tac.contains("LCall _PrintString"));
    assert!(tac.contains("LCall _PrintBool"));
    assert!(tac.contains("\ttotal(gp+0) = "));

    let unchecked = Compiler::with_options(CodegenOptions::default().without_bounds_checks())
        .compile(source)
        .expect("compile");
    assert!(!unchecked.contains("Array subscript out of bounds"));
    assert!(unchecked.contains("Array size is <= 0"));
}

#[test]
fn test_string_equality_uses_runtime() {
    let source = r#"
        void main() {
            string s;
            s = ReadLine();
            if (s == "quit") Print("bye");
        }
    "#;
    let tac = Compiler::new().compile(source).expect("compile");
    assert!(tac.contains("LCall _ReadLine"));
    assert!(tac.contains("LCall _StringEqual"));
    assert!(tac.contains("PopParams 8"));
}

#[test]
fn test_interface_dispatch_is_not_emitted() {
    let source = r#"
        interface Shape { int area(); }
        class Square implements Shape { int area() { return 4; } }
        void main() { Shape s; s = new Square; Print(s.area()); }
    "#;
    match Compiler::new().compile(source) {
        Err(DecafError::CodeGen(message)) => assert!(message.contains("interface 'Shape'"), "{}", message),
        other => panic!("expected a codegen error, got {:?}", other),
    }
}

#[test]
fn test_compile_reports_every_diagnostic() {
    let source = r#"
        class A extends Missing { }
        void main() { int x; x = "s"; y = 1; }
    "#;
    match Compiler::new().compile(source) {
        Err(DecafError::Check(diagnostics)) => {
            let messages: Vec<String> = diagnostics.iter().map(|d| d.to_string()).collect();
            assert_eq!(
                messages,
                vec![
                    "*** No declaration found for class 'Missing'".to_string(),
                    "*** Incompatible operands: int = string".to_string(),
                    "*** No declaration found for variable 'y'".to_string(),
                ]
            );
        }
        other => panic!("expected check failure, got {:?}", other),
    }
}

#[test]
fn test_program_declarations_keep_source_order() {
    let program = parse_program("int g; void f() { } class C { } interface I { }");
    let names: Vec<&str> = program.decls.iter().map(|d| d.ident().name.as_str()).collect();
    assert_eq!(names, vec!["g", "f", "C", "I"]);
    assert!(matches!(program.decls[2], Decl::Class(_)));
}
