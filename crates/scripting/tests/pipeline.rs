//! End-to-end tests: source text in, program text out

use blockcode_scripting::builtins::system_modules;
use blockcode_scripting::dsl::{parse_source, validate, Node};
use blockcode_scripting::{CodegenOptions, ErrorCode, Module, ModuleLoader};

fn loader() -> ModuleLoader {
    ModuleLoader::with_system_modules(system_modules())
}

fn compile(source: &str) -> String {
    let mut loader = loader();
    loader.load_source("main", source).unwrap();
    loader.generate(&CodegenOptions::default()).unwrap()
}

fn is_async(module: &Module, name: &str) -> bool {
    module.is_async(module.find_function(name).unwrap())
}

#[test]
fn test_parse_is_deterministic() {
    let source = "var a := 1\n\
                  on start begin\n  forever\n    step a\n  end\nend\n\
                  function step(n: number) begin\n  if n > 0 then Sprite.turn n end\nend\n";

    let first = parse_source("main", source).unwrap();
    let second = parse_source("main", source).unwrap();

    assert_eq!(first.nodes(), second.nodes());
    assert_eq!(first.on_defs, second.on_defs);
    assert_eq!(first.func_defs, second.func_defs);
    assert_eq!(first.var_defs, second.var_defs);
}

#[test]
fn test_forever_forces_async() {
    let mut loader = loader();
    let id = loader
        .load_source(
            "main",
            "on start begin forever end end\nfunction idle() begin forever end end",
        )
        .unwrap();

    let module = loader.user_module("main").unwrap();
    assert_eq!(module.id, id);
    assert!(module.is_async(module.on_defs[0]));
    assert!(is_async(module, "idle"));
}

#[test]
fn test_async_propagates_through_chain() {
    let mut loader = loader();
    loader
        .load_source(
            "main",
            "function a() begin b() end\n\
             function b() begin c() end\n\
             function c() begin Sprite.wait(1) end\n\
             function unrelated() begin Sprite.say \"x\" end",
        )
        .unwrap();
    let module = loader.user_module("main").unwrap();

    assert!(is_async(module, "a"));
    assert!(is_async(module, "b"));
    assert!(is_async(module, "c"));
    assert!(!is_async(module, "unrelated"));

    let js = loader.generate(&CodegenOptions::default()).unwrap();
    assert!(js.contains("async function a() {\n  await b();\n}"), "{js}");
    assert!(js.contains("function unrelated() {\n  Sprite.say(\"x\");\n}"), "{js}");
}

#[test]
fn test_sync_callee_inside_forever() {
    let mut module = parse_source(
        "main",
        "function bar() begin end\nfunction foo() begin\n  forever\n    bar()\n  end\nend",
    )
    .unwrap();
    validate(&mut module, None).unwrap();

    assert!(is_async(&module, "foo"));
    assert!(!is_async(&module, "bar"));
}

#[test]
fn test_undeclared_call_fails() {
    let err = loader()
        .load_source("main", "on start begin jump() end")
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::UnknownFunctionName);
    assert_eq!(err.token().unwrap().value, "jump");
}

#[test]
fn test_operator_rewriting_is_total() {
    let js = compile(
        "function f(a: number, b: number) begin\n\
         var p := a = b\nvar q := a == b\nvar r := a <> b\nvar s := a != b\n\
         var t := a and b\nvar u := a && b\nvar v := a or b\nvar w := a || b\n\
         var x := not a\nvar y := a is b\n\
         end",
    );

    let expected = [
        "let p = a === b;",
        "let q = a === b;",
        "let r = a !== b;",
        "let s = a !== b;",
        "let t = a && b;",
        "let u = a && b;",
        "let v = a || b;",
        "let w = a || b;",
        "let x = !a;",
        "let y = a instanceof b;",
    ];
    for line in expected {
        assert!(js.contains(line), "missing '{line}' in {js}");
    }
    for source_op in [" == ", " <> ", " != ", " and ", " or ", " is ", "not "] {
        assert!(!js.contains(source_op), "'{source_op}' left in {js}");
    }
}

#[test]
fn test_proc_with_local_var() {
    let module = parse_source("main", "proc foo() begin var x := 3 end").unwrap();

    assert_eq!(module.func_defs.len(), 1);
    let foo = module.find_function("foo").unwrap();
    let body = match &module.func_def(foo).unwrap().body {
        blockcode_scripting::dsl::FuncBody::Block(block) => module.statements(*block),
        _ => panic!("expected a block body"),
    };
    assert_eq!(body.len(), 1);
    match module.node(body[0]) {
        Node::VarDef(var) => assert_eq!(module.source_text(var.value.unwrap()), "3"),
        other => panic!("expected var, got {}", other.kind_name()),
    }
}

#[test]
fn test_for_range_extraction() {
    let module = parse_source(
        "main",
        "function f() begin\n  for x := 1 to 5 by 4 do\n    Game.log x\n  end\nend",
    )
    .unwrap();

    let for_loop = module
        .nodes()
        .iter()
        .find_map(|data| match &data.node {
            Node::For(node) => Some(node),
            _ => None,
        })
        .unwrap();
    assert_eq!(module.source_text(for_loop.start), "1");
    assert_eq!(module.source_text(for_loop.end), "5");
    assert_eq!(module.source_text(for_loop.step.unwrap()), "4");
}

#[test]
fn test_generation_without_validation_fails() {
    let module = parse_source("main", "on start begin helper() end\nfunction helper() begin end").unwrap();
    let mut loader = loader();
    loader.insert_user_module(module);

    let err = loader.generate(&CodegenOptions::default()).unwrap_err();
    assert_eq!(err.code(), ErrorCode::UnknownFunctionName);
}

#[test]
fn test_full_program() {
    let js = compile(
        "var speed := 2\n\
         on start begin\n  Sprite.show()\n  forever\n    Sprite.moveBy speed 0\n  end\nend\n\
         on message \"stop\" begin\n  speed := 0\nend\n",
    );

    let expected = "\
const Sprite = loader.getModule(\"Sprite\");
const Math = loader.getModule(\"Math\");
const Text = loader.getModule(\"Text\");
const Game = loader.getModule(\"Game\");

let speed = 2;
runner.onStart(async () => {
  Sprite.show();
  while (true) {
    await new Promise((resolve) => setTimeout(resolve, 0));
    Sprite.moveBy(speed, 0);
  }
});

runner.onMessage(\"stop\", () => {
  speed = 0;
});

";
    assert_eq!(js, expected);
}
