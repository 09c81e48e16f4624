//! Tests for lowering shapes and emitted text.

use std::collections::BTreeMap;

use rhizome_sedge_ast::builders::*;
use rhizome_sedge_ast::{
    Backend, BinOp, CallArgs, CallConv, Chunk, Config, Expr, ForeignImport, LuaVersion, Span,
    Stmt, TypeName, UnOp,
};
use rhizome_sedge_meta::Session;

use crate::{generate, Error};

fn session(version: LuaVersion, backend: Backend) -> Session {
    let config = Config {
        target_version: version,
        target_backend: backend,
        flags: BTreeMap::new(),
    };
    Session::new(config).unwrap()
}

fn emit_unit(unit: &Chunk) -> String {
    generate(unit, &mut Session::default()).unwrap()
}

fn emit_unit_at(unit: &Chunk, version: LuaVersion) -> String {
    generate(unit, &mut session(version, Backend::Lua)).unwrap()
}

// ============================================================================
// Switch desugaring
// ============================================================================

#[test]
fn test_switch_lowers_to_if_chain() {
    let unit = chunk(vec![switch(
        int(0),
        vec![case(int(1), block(vec![]))],
        Some(block(vec![])),
    )]);
    assert_eq!(
        emit_unit(&unit),
        "local __switchval1 = 0\nif __switchval1 == 1 then\nelse\nend\n"
    );
}

#[test]
fn test_switch_branch_count_and_bodies() {
    let unit = chunk(vec![switch(
        name("x"),
        vec![
            case(int(1), block(vec![ret(vec![str_("one")])])),
            case(int(2), block(vec![ret(vec![str_("two")])])),
        ],
        None,
    )]);
    assert_eq!(
        emit_unit(&unit),
        "local __switchval1 = x\n\
         if __switchval1 == 1 then\n  return \"one\"\nelseif __switchval1 == 2 then\n  return \"two\"\nend\n"
    );
}

#[test]
fn test_switch_temporary_avoids_user_names() {
    let unit = chunk(vec![
        local_(vec![untyped("__switchval1")], vec![int(9)]),
        switch(int(0), vec![case(int(1), block(vec![]))], None),
    ]);
    let text = emit_unit(&unit);
    assert!(text.contains("local __switchval2 = 0"), "{text}");
    assert!(text.contains("if __switchval2 == 1 then"), "{text}");
}

#[test]
fn test_nested_switches_get_distinct_temporaries() {
    let unit = chunk(vec![switch(
        int(0),
        vec![case(
            int(1),
            block(vec![switch(int(2), vec![case(int(3), block(vec![]))], None)]),
        )],
        None,
    )]);
    let text = emit_unit(&unit);
    assert!(text.contains("local __switchval1 = 0"), "{text}");
    assert!(text.contains("  local __switchval2 = 2"), "{text}");
}

// ============================================================================
// Arity padding and typed defaults
// ============================================================================

#[test]
fn test_short_value_lists_pad_with_nil() {
    let unit = chunk(vec![local_(
        vec![untyped("a"), untyped("b")],
        vec![int(1)],
    )]);
    assert_eq!(emit_unit(&unit), "local a, b = 1, nil\n");

    let unit = chunk(vec![
        local_(vec![untyped("a"), untyped("b"), untyped("c")], vec![]),
        assign(vec![name("a"), name("b"), name("c")], vec![int(1)]),
    ]);
    assert_eq!(
        emit_unit(&unit),
        "local a, b, c\na, b, c = 1, nil, nil\n"
    );
}

#[test]
fn test_untyped_bare_declaration_stays_bare() {
    let unit = chunk(vec![local_(vec![untyped("a"), untyped("b")], vec![])]);
    assert_eq!(emit_unit(&unit), "local a, b\n");
}

#[test]
fn test_typed_declarations_get_zero_values() {
    let unit = chunk(vec![local_(
        vec![
            typed("n", TypeName::Integer),
            typed("x", TypeName::Number),
            typed("ok", TypeName::Boolean),
            typed("s", TypeName::String),
            typed("t", TypeName::Table),
            typed("f", TypeName::Function),
        ],
        vec![],
    )]);
    assert_eq!(emit_unit(&unit), "local n, x, ok, s, t, f = 0, 0, false, \"\", {}, nil\n");
}

#[test]
fn test_type_annotations_are_stripped_from_parameters() {
    let unit = chunk(vec![local_(
        vec![typed("f", TypeName::Function)],
        vec![func(
            vec![typed("a", TypeName::Integer), untyped("b")],
            block(vec![ret(vec![name("a")])]),
        )],
    )]);
    assert_eq!(
        emit_unit(&unit),
        "local f = function(a, b)\n  return a\nend\n"
    );
}

// ============================================================================
// Call sugar
// ============================================================================

#[test]
fn test_string_call_sugar_gets_parentheses() {
    let unit = chunk(vec![call_stmt(Expr::Call {
        callee: Box::new(name("f")),
        args: CallArgs::Str(b"a".to_vec()),
    })]);
    assert_eq!(emit_unit(&unit), "f(\"a\")\n");
}

#[test]
fn test_table_call_sugar_gets_parentheses() {
    let unit = chunk(vec![call_stmt(Expr::Call {
        callee: Box::new(name("setup")),
        args: CallArgs::Table(vec![named("debug", bool_(true))]),
    })]);
    assert_eq!(emit_unit(&unit), "setup({ debug = true })\n");
}

#[test]
fn test_method_call_sugar_keeps_colon_form() {
    let unit = chunk(vec![call_stmt(Expr::MethodCall {
        obj: Box::new(name("obj")),
        method: "greet".to_string(),
        args: CallArgs::Str(b"hi".to_vec()),
    })]);
    assert_eq!(emit_unit(&unit), "obj:greet(\"hi\")\n");
}

#[test]
fn test_call_sugar_rewrite_is_idempotent() {
    let mut once = chunk(vec![call_stmt(Expr::Call {
        callee: Box::new(name("f")),
        args: CallArgs::Str(b"a".to_vec()),
    })]);
    let config = Config::default();
    crate::lower::lower(&mut once, &config);
    let mut twice = once.clone();
    crate::lower::lower(&mut twice, &config);
    assert_eq!(once, twice);
}

// ============================================================================
// Operator lowering
// ============================================================================

#[test]
fn test_pow_is_version_gated() {
    let unit = chunk(vec![ret(vec![binary(BinOp::Pow, name("a"), name("b"))])]);
    assert_eq!(emit_unit_at(&unit, LuaVersion::Lua51), "return math_pow(a, b)\n");
    assert_eq!(emit_unit_at(&unit, LuaVersion::Lua52), "return math_pow(a, b)\n");
    assert_eq!(emit_unit_at(&unit, LuaVersion::Lua53), "return a ^ b\n");
    assert_eq!(emit_unit_at(&unit, LuaVersion::Lua54), "return a ^ b\n");
}

#[test]
fn test_floor_division_shim_wraps_plain_division() {
    let unit = chunk(vec![ret(vec![binary(BinOp::IDiv, name("a"), name("b"))])]);
    assert_eq!(emit_unit_at(&unit, LuaVersion::Lua51), "return math_floor(a / b)\n");
    assert_eq!(emit_unit_at(&unit, LuaVersion::Lua54), "return a // b\n");
}

#[test]
fn test_bitwise_shims() {
    let unit = chunk(vec![ret(vec![binary(
        BinOp::BOr,
        binary(BinOp::BAnd, name("a"), name("b")),
        binary(
            BinOp::Shl,
            unary(UnOp::BNot, name("c")),
            binary(BinOp::Shr, name("d"), binary(BinOp::BXor, name("e"), int(1))),
        ),
    )])]);
    assert_eq!(
        emit_unit_at(&unit, LuaVersion::Lua51),
        "return bit_bor(bit_band(a, b), bit_lshift(bit_bnot(c), bit_rshift(d, bit_bxor(e, 1))))\n"
    );
    assert_eq!(
        emit_unit_at(&unit, LuaVersion::Lua53),
        "return a & b | ~c << (d >> (e ~ 1))\n"
    );
}

// ============================================================================
// Emitter: precedence and prefix expressions
// ============================================================================

#[test]
fn test_precedence_parentheses_match_tree_shape() {
    let grouped = chunk(vec![ret(vec![binary(
        BinOp::Mul,
        binary(BinOp::Add, name("a"), name("b")),
        name("c"),
    )])]);
    assert_eq!(emit_unit(&grouped), "return (a + b) * c\n");

    let natural = chunk(vec![ret(vec![binary(
        BinOp::Add,
        name("a"),
        binary(BinOp::Mul, name("b"), name("c")),
    )])]);
    assert_eq!(emit_unit(&natural), "return a + b * c\n");
}

#[test]
fn test_pow_and_unary_minus_binding() {
    let neg_of_pow = chunk(vec![ret(vec![unary(
        UnOp::Neg,
        binary(BinOp::Pow, name("x"), int(2)),
    )])]);
    assert_eq!(emit_unit(&neg_of_pow), "return -x ^ 2\n");

    let pow_of_neg = chunk(vec![ret(vec![binary(
        BinOp::Pow,
        unary(UnOp::Neg, name("x")),
        int(2),
    )])]);
    assert_eq!(emit_unit(&pow_of_neg), "return (-x) ^ 2\n");

    let nested_neg = chunk(vec![ret(vec![unary(UnOp::Neg, unary(UnOp::Neg, name("x")))])]);
    assert_eq!(emit_unit(&nested_neg), "return -(-x)\n");
}

#[test]
fn test_negative_literal_binds_like_unary_minus() {
    let unit = chunk(vec![ret(vec![binary(BinOp::Pow, lit("-2"), int(2))])]);
    assert_eq!(emit_unit(&unit), "return (-2) ^ 2\n");

    // Looser contexts need no parentheses around the signed literal.
    let unit = chunk(vec![ret(vec![binary(BinOp::Add, int(1), lit("-2"))])]);
    assert_eq!(emit_unit(&unit), "return 1 + -2\n");

    let unit = chunk(vec![ret(vec![lit("-2")])]);
    assert_eq!(emit_unit(&unit), "return -2\n");
}

#[test]
fn test_concat_associativity() {
    let natural = chunk(vec![ret(vec![binary(
        BinOp::Concat,
        name("a"),
        binary(BinOp::Concat, name("b"), name("c")),
    )])]);
    assert_eq!(emit_unit(&natural), "return a .. b .. c\n");

    let forced_left = chunk(vec![ret(vec![binary(
        BinOp::Concat,
        binary(BinOp::Concat, name("a"), name("b")),
        name("c"),
    )])]);
    assert_eq!(emit_unit(&forced_left), "return (a .. b) .. c\n");
}

#[test]
fn test_call_of_call_needs_no_extra_parentheses() {
    let unit = chunk(vec![call_stmt(call(call(name("g"), vec![]), vec![]))]);
    assert_eq!(emit_unit(&unit), "g()()\n");
}

#[test]
fn test_non_prefix_call_targets_are_wrapped() {
    let table_call = chunk(vec![call_stmt(call(table(vec![]), vec![]))]);
    assert_eq!(emit_unit(&table_call), ";({})()\n");

    let string_method = chunk(vec![ret(vec![mcall(str_("a"), "rep", vec![int(2)])])]);
    assert_eq!(emit_unit(&string_method), "return (\"a\"):rep(2)\n");

    let sum_index = chunk(vec![ret(vec![dot(
        binary(BinOp::Add, name("a"), name("b")),
        "x",
    )])]);
    assert_eq!(emit_unit(&sum_index), "return (a + b).x\n");
}

#[test]
fn test_index_key_sugar() {
    let unit = chunk(vec![ret(vec![dot(name("t"), "field")])]);
    assert_eq!(emit_unit(&unit), "return t.field\n");

    let keyword = chunk(vec![ret(vec![index(name("t"), str_("end"))])]);
    assert_eq!(emit_unit(&keyword), "return t[\"end\"]\n");

    let numeric = chunk(vec![ret(vec![index(name("t"), int(1))])]);
    assert_eq!(emit_unit(&numeric), "return t[1]\n");
}

// ============================================================================
// Emitter: statements
// ============================================================================

#[test]
fn test_control_flow_layout() {
    let unit = chunk(vec![
        while_(
            binary(BinOp::Lt, name("i"), int(10)),
            block(vec![
                if_(
                    vec![arm(name("p"), block(vec![break_()]))],
                    Some(block(vec![assign(
                        vec![name("i")],
                        vec![binary(BinOp::Add, name("i"), int(1))],
                    )])),
                ),
            ]),
        ),
        repeat(block(vec![call_stmt(call(name("tick"), vec![]))]), name("done")),
    ]);
    assert_eq!(
        emit_unit(&unit),
        "while i < 10 do\n  if p then\n    break\n  else\n    i = i + 1\n  end\nend\n\
         repeat\n  tick()\nuntil done\n"
    );
}

#[test]
fn test_for_loops() {
    let unit = chunk(vec![
        for_num(untyped("i"), int(1), int(10), Some(int(2)), block(vec![])),
        for_in(
            vec![untyped("k"), untyped("v")],
            vec![call(name("pairs"), vec![name("t")])],
            block(vec![]),
        ),
    ]);
    assert_eq!(
        emit_unit(&unit),
        "for i = 1, 10, 2 do\nend\nfor k, v in pairs(t) do\nend\n"
    );
}

#[test]
fn test_goto_is_version_gated() {
    let unit = chunk(vec![label("top"), goto("top")]);
    assert_eq!(emit_unit_at(&unit, LuaVersion::Lua52), "::top::\ngoto top\n");

    let err = generate(&unit, &mut session(LuaVersion::Lua51, Backend::Lua)).unwrap_err();
    assert!(matches!(
        err,
        Error::UnsupportedConstruct {
            construct: "goto/label",
            ..
        }
    ));

    // LuaJIT carries goto as an extension at the 5.1 level.
    let text = generate(&unit, &mut session(LuaVersion::Lua51, Backend::LuaJit)).unwrap();
    assert_eq!(text, "::top::\ngoto top\n");
}

#[test]
fn test_varargs_function() {
    let unit = chunk(vec![local_(
        vec![untyped("f")],
        vec![Expr::Function {
            params: vec![untyped("a")],
            varargs: true,
            body: rhizome_sedge_ast::Block::new(vec![ret(vec![varargs()])]),
        }],
    )]);
    assert_eq!(emit_unit(&unit), "local f = function(a, ...)\n  return ...\nend\n");
}

// ============================================================================
// Foreign imports
// ============================================================================

fn import(name: &str, symbol: &str, cdecl: Option<&str>) -> Stmt {
    Stmt::ForeignImport(ForeignImport {
        name: name.to_string(),
        symbol: symbol.to_string(),
        header: Some("stdlib.h".to_string()),
        convention: CallConv::C,
        cdecl: cdecl.map(str::to_string),
        span: Span::default(),
    })
}

#[test]
fn test_ffi_preamble_and_binding() {
    let unit = chunk(vec![
        import("c_abs", "abs", Some("int abs(int);")),
        call_stmt(call(name("c_abs"), vec![int(-5)])),
    ]);
    let text = generate(&unit, &mut session(LuaVersion::Lua51, Backend::LuaJit)).unwrap();
    assert_eq!(
        text,
        "local ffi = require(\"ffi\")\nffi.cdef[[\nint abs(int);\n]]\nlocal c_abs = ffi.C.abs\nc_abs(-5)\n"
    );
}

#[test]
fn test_ffi_dedups_by_symbol_and_header() {
    let unit = chunk(vec![
        import("c_abs", "abs", Some("int abs(int);")),
        import("c_abs", "abs", Some("int abs(int);")),
    ]);
    let text = generate(&unit, &mut session(LuaVersion::Lua51, Backend::LuaJit)).unwrap();
    assert_eq!(text.matches("ffi.C.abs").count(), 1);
    assert_eq!(text.matches("int abs(int);").count(), 1);
}

#[test]
fn test_ffi_requires_interop_backend() {
    let unit = chunk(vec![import("c_abs", "abs", None)]);
    let err = generate(&unit, &mut Session::default()).unwrap_err();
    let Error::ForeignImportUnsupported { symbol, .. } = err else {
        panic!("expected foreign import diagnostic, got {err:?}");
    };
    assert_eq!(symbol, "abs");
}

#[test]
fn test_ffi_rejects_non_c_conventions() {
    let unit = chunk(vec![Stmt::ForeignImport(ForeignImport {
        name: "w".to_string(),
        symbol: "WinFn".to_string(),
        header: None,
        convention: CallConv::Stdcall,
        cdecl: None,
        span: Span::default(),
    })]);
    let err = generate(&unit, &mut session(LuaVersion::Lua51, Backend::LuaJit)).unwrap_err();
    assert!(matches!(err, Error::UnsupportedConstruct { .. }));
}

// ============================================================================
// Assembly order and validation
// ============================================================================

#[test]
fn test_unit_assembly_order() {
    let unit = chunk(vec![
        meta("include(\"socket\")\nemit_decl(\"local buffer = {}\")"),
        import("c_abs", "abs", Some("int abs(int);")),
        call_stmt(call(name("print"), vec![name("buffer")])),
    ]);
    let text = generate(&unit, &mut session(LuaVersion::Lua51, Backend::LuaJit)).unwrap();
    assert_eq!(
        text,
        "local ffi = require(\"ffi\")\n\
         ffi.cdef[[\nint abs(int);\n]]\n\
         require(\"socket\")\n\
         local buffer = {}\n\
         local c_abs = ffi.C.abs\n\
         print(buffer)\n"
    );
}

#[test]
fn test_generate_rejects_malformed_units() {
    let unit = chunk(vec![local_(vec![untyped("end")], vec![])]);
    assert!(matches!(
        generate(&unit, &mut Session::default()),
        Err(Error::Validation(_))
    ));
}

#[test]
fn test_number_canonicalization_end_to_end() {
    let unit = chunk(vec![ret(vec![lit("0xffffffffffffffff.001")])]);
    assert_eq!(emit_unit(&unit), "return 1.8446744073709552e+19\n");

    let unit = chunk(vec![ret(vec![lit("0b11.11p2")])]);
    assert_eq!(emit_unit(&unit), "return 0xf\n");
}

#[test]
fn test_string_bytes_render_with_decimal_escapes() {
    let unit = chunk(vec![ret(vec![bytes(vec![b'o', b'k', 0x01, 0xff])])]);
    assert_eq!(emit_unit(&unit), "return \"ok\\001\\255\"\n");
}
