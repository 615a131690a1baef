//! End-to-end scenarios exercising the analyses together.

use crate::analysis::dead_code::dead_code;
use crate::analysis::inter_constprop::InterConstantPropagation;
use crate::analysis::pta::context::KCallSiteSelector;
use crate::analysis::pta::taint::{TaintConfig, TaintFlow};
use crate::analysis::pta::{ci, cs};
use crate::analysis::constprop::Value;
use crate::ir::{
    BinaryOp, CfgEdgeKind, Exp, Icfg, Invoke, InvokeKind, MethodRef, ProgramBuilder, Site,
    StmtKind, Type,
};

/// int x = 2;
/// switch (x + 1) {
///     case 1: y = 100; break;
///     case 2: y = 200;
///     case 3: y = 300; break;
///     default: y = 666;
/// }
/// return y;
///
/// x + 1 is the constant 3, so only the case-3 edge is followed: case 1,
/// its break, case 2's body, and the default are dead.
#[test]
fn switch_dead_code() {
    let mut builder = ProgramBuilder::new();
    let class = builder.add_class("Main", None);
    let mut m = builder.method(class, "main()", true);
    let x = m.var("x", Type::int());
    let t = m.var("t", Type::int());
    let y = m.var("y", Type::int());

    // 0: x = 2
    m.stmt(StmtKind::Assign {
        lhs: x,
        rhs: Exp::IntLiteral(2),
    });
    // 1: one = 1
    let one = m.var("one", Type::int());
    m.stmt(StmtKind::Assign {
        lhs: one,
        rhs: Exp::IntLiteral(1),
    });
    // 2: t = x + one
    m.stmt(StmtKind::Assign {
        lhs: t,
        rhs: Exp::Binary {
            op: BinaryOp::Add,
            lhs: x,
            rhs: one,
        },
    });
    // 3: switch (t)
    let switch = m.stmt(StmtKind::Switch {
        var: t,
        cases: vec![1, 2, 3],
    });
    // 4: y = 100      (case 1)
    let case1 = m.stmt(StmtKind::Assign {
        lhs: y,
        rhs: Exp::IntLiteral(100),
    });
    // 5: goto return  (break)
    let break1 = m.stmt(StmtKind::Goto);
    // 6: y = 200      (case 2, falls through)
    let case2 = m.stmt(StmtKind::Assign {
        lhs: y,
        rhs: Exp::IntLiteral(200),
    });
    // 7: y = 300      (case 3)
    let case3 = m.stmt(StmtKind::Assign {
        lhs: y,
        rhs: Exp::IntLiteral(300),
    });
    // 8: goto return  (break)
    let break2 = m.stmt(StmtKind::Goto);
    // 9: y = 666      (default)
    let default = m.stmt(StmtKind::Assign {
        lhs: y,
        rhs: Exp::IntLiteral(666),
    });
    // 10: return y
    let ret = m.stmt(StmtKind::Return { value: Some(y) });

    m.edge(switch, case1, CfgEdgeKind::SwitchCase(1));
    m.edge(switch, case2, CfgEdgeKind::SwitchCase(2));
    m.edge(switch, case3, CfgEdgeKind::SwitchCase(3));
    m.edge(switch, default, CfgEdgeKind::SwitchDefault);
    m.edge(break1, ret, CfgEdgeKind::Goto);
    m.edge(break2, ret, CfgEdgeKind::Goto);
    let m = m.finish();
    let program = builder.finish();

    let dead = dead_code(&program, m).unwrap();
    assert!(dead.contains(&case1));
    assert!(dead.contains(&break1));
    assert!(dead.contains(&case2));
    assert!(dead.contains(&default));
    assert!(!dead.contains(&case3));
    assert!(!dead.contains(&break2));
    assert!(!dead.contains(&ret));
    // the exit is never reported, and neither is the reachable prefix
    assert!(!dead.contains(&switch));
}

/// set(A o, int v) { o.f = v; }  get(A o) { return o.f; }
///
/// A single call set(a, 5) makes get(a) yield the constant 5; a second
/// call set(a, 7) on the same object demotes the field to NAC.
#[test]
fn interprocedural_constants_through_field() {
    // one store: the load site sees CONST(5)
    let (program, main, get_call) = field_program(false);
    let pta = ci::solve(&program).unwrap();
    let icfg = Icfg::build(&program, pta.call_graph()).unwrap();
    let result = InterConstantPropagation::new(&program, &icfg, &pta)
        .solve()
        .unwrap();

    // the return edge binds the result at the call's return site
    let return_site = icfg.node_of(main, get_call + 1).unwrap();
    let x = program.method(main).stmts()[get_call]
        .def()
        .expect("get call defines its result");
    assert_eq!(result.out_fact(return_site).get(x), Value::Const(5));

    // two stores of different constants: NAC
    let (program, main, get_call) = field_program(true);
    let pta = ci::solve(&program).unwrap();
    let icfg = Icfg::build(&program, pta.call_graph()).unwrap();
    let result = InterConstantPropagation::new(&program, &icfg, &pta)
        .solve()
        .unwrap();

    let return_site = icfg.node_of(main, get_call + 1).unwrap();
    let x = program.method(main).stmts()[get_call].def().unwrap();
    assert_eq!(result.out_fact(return_site).get(x), Value::Nac);
}

/// Builds main() { a = new A; set(a, 5); [set(a, 7);] x = get(a); }
/// Returns (program, main id, index of the get call in main).
fn field_program(second_store: bool) -> (crate::ir::Program, crate::ir::MethodId, usize) {
    let mut builder = ProgramBuilder::new();
    let a_class = builder.add_class("A", None);
    let f = builder.add_field(a_class, "f", Type::int(), false);
    let util = builder.add_class("Util", None);

    let mut set = builder.method(util, "set(A,int)", true);
    let o = set.param("o", Type::Reference(a_class));
    let v = set.param("v", Type::int());
    set.stmt(StmtKind::StoreField {
        base: Some(o),
        field: f,
        rhs: v,
    });
    set.stmt(StmtKind::Return { value: None });
    set.finish();

    let mut get = builder.method(util, "get(A)", true);
    get.set_return_ty(Type::int());
    let o = get.param("o", Type::Reference(a_class));
    let t = get.var("t", Type::int());
    get.stmt(StmtKind::LoadField {
        lhs: t,
        base: Some(o),
        field: f,
    });
    get.stmt(StmtKind::Return { value: Some(t) });
    get.finish();

    let main_class = builder.add_class("Main", None);
    let mut main = builder.method(main_class, "main()", true);
    let a = main.var("a", Type::Reference(a_class));
    let v5 = main.var("v5", Type::int());
    let x = main.var("x", Type::int());
    main.stmt(StmtKind::New {
        lhs: a,
        ty: Type::Reference(a_class),
    });
    main.stmt(StmtKind::Assign {
        lhs: v5,
        rhs: Exp::IntLiteral(5),
    });
    main.stmt(StmtKind::Invoke(Invoke {
        kind: InvokeKind::Static,
        method_ref: MethodRef::new(util, "set(A,int)"),
        recv: None,
        args: vec![a, v5],
        result: None,
    }));
    if second_store {
        let v7 = main.var("v7", Type::int());
        main.stmt(StmtKind::Assign {
            lhs: v7,
            rhs: Exp::IntLiteral(7),
        });
        main.stmt(StmtKind::Invoke(Invoke {
            kind: InvokeKind::Static,
            method_ref: MethodRef::new(util, "set(A,int)"),
            recv: None,
            args: vec![a, v7],
            result: None,
        }));
    }
    let get_call = main.stmt(StmtKind::Invoke(Invoke {
        kind: InvokeKind::Static,
        method_ref: MethodRef::new(util, "get(A)"),
        recv: None,
        args: vec![a],
        result: Some(x),
    }));
    main.stmt(StmtKind::Return { value: None });
    let main = main.finish();
    builder.set_entry(main);
    (builder.finish(), main, get_call)
}

/// s = readSecret(); t = "x".concat(s); log(0, t);
///
/// With readSecret as a source, concat transferring arg 0 to its result,
/// and log's argument 1 as a sink, exactly one taint flow is reported.
#[test]
fn taint_source_transfer_sink() {
    let mut builder = ProgramBuilder::new();
    let string = builder.add_class("String", None);
    let secret = builder.add_class("Secret", None);
    let log_class = builder.add_class("Log", None);

    // concat allocates its result, so taint reaches it only through the
    // configured transfer
    let mut concat = builder.method(string, "concat(String)", false);
    concat.set_return_ty(Type::Reference(string));
    concat.this(Type::Reference(string));
    concat.param("p", Type::Reference(string));
    let fresh = concat.var("fresh", Type::Reference(string));
    concat.stmt(StmtKind::New {
        lhs: fresh,
        ty: Type::Reference(string),
    });
    concat.stmt(StmtKind::Return { value: Some(fresh) });
    concat.finish();

    let mut read = builder.method(secret, "readSecret()", true);
    read.set_return_ty(Type::Reference(string));
    let r = read.var("r", Type::Reference(string));
    read.stmt(StmtKind::New {
        lhs: r,
        ty: Type::Reference(string),
    });
    read.stmt(StmtKind::Return { value: Some(r) });
    read.finish();

    let mut log = builder.method(log_class, "log(int,String)", true);
    log.param("level", Type::int());
    log.param("message", Type::Reference(string));
    log.stmt(StmtKind::Return { value: None });
    log.finish();

    let main_class = builder.add_class("Main", None);
    let mut main = builder.method(main_class, "main()", true);
    let level = main.var("level", Type::int());
    let s = main.var("s", Type::Reference(string));
    let x = main.var("x", Type::Reference(string));
    let t = main.var("t", Type::Reference(string));
    // 0: level = 0
    main.stmt(StmtKind::Assign {
        lhs: level,
        rhs: Exp::IntLiteral(0),
    });
    // 1: s = Secret.readSecret()
    let source_site = main.stmt(StmtKind::Invoke(Invoke {
        kind: InvokeKind::Static,
        method_ref: MethodRef::new(secret, "readSecret()"),
        recv: None,
        args: vec![],
        result: Some(s),
    }));
    // 2: x = new String
    main.stmt(StmtKind::New {
        lhs: x,
        ty: Type::Reference(string),
    });
    // 3: t = x.concat(s)
    main.stmt(StmtKind::Invoke(Invoke {
        kind: InvokeKind::Virtual,
        method_ref: MethodRef::new(string, "concat(String)"),
        recv: Some(x),
        args: vec![s],
        result: Some(t),
    }));
    // 4: Log.log(level, t)
    let sink_site = main.stmt(StmtKind::Invoke(Invoke {
        kind: InvokeKind::Static,
        method_ref: MethodRef::new(log_class, "log(int,String)"),
        recv: None,
        args: vec![level, t],
        result: None,
    }));
    main.stmt(StmtKind::Return { value: None });
    let main = main.finish();
    builder.set_entry(main);
    let program = builder.finish();

    let config = TaintConfig::from_json(
        r#"{
            "sources": [
                {"class": "Secret", "method": "readSecret()", "type": "String"}
            ],
            "sinks": [
                {"class": "Log", "method": "log(int,String)", "index": 1}
            ],
            "transfers": [
                {"class": "String", "method": "concat(String)",
                 "from": 0, "to": "result", "type": "String"}
            ]
        }"#,
        &program,
    )
    .unwrap();

    let selector = KCallSiteSelector::new(2);
    let result = cs::solve_with_taint(&program, &selector, config).unwrap();

    let expected = TaintFlow {
        source: Site::new(main, source_site),
        sink: Site::new(main, sink_site),
        index: 1,
    };
    assert_eq!(
        result.taint_flows().iter().copied().collect::<Vec<_>>(),
        vec![expected]
    );
}
