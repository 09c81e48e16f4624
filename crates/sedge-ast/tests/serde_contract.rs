//! The JSON contract frontends deliver units through.

use rhizome_sedge_ast::builders::*;
use rhizome_sedge_ast::{BinOp, Chunk, Config, Expr, LuaVersion, TypeName, VerbatimScope};

#[test]
fn test_chunk_round_trips_through_json() {
    let unit = chunk(vec![
        local_(vec![typed("n", TypeName::Integer)], vec![lit("0x10")]),
        meta("if version_at_least(\"5.3\") then emit(\"-- native\") end"),
        switch(
            name("n"),
            vec![case(int(1), block(vec![ret(vec![str_("one")])]))],
            Some(block(vec![ret(vec![str_("other")])])),
        ),
        verbatim("collectgarbage()", VerbatimScope::Statement),
        foreign("c_abs", "abs"),
        ret(vec![binary(BinOp::Add, name("n"), num(0.5))]),
    ]);

    let text = serde_json::to_string(&unit).unwrap();
    let back: Chunk = serde_json::from_str(&text).unwrap();
    assert_eq!(back, unit);
}

#[test]
fn test_string_bytes_survive_json() {
    let unit = chunk(vec![ret(vec![bytes(vec![0x01, 0xff, b'"'])])]);
    let text = serde_json::to_string(&unit).unwrap();
    let back: Chunk = serde_json::from_str(&text).unwrap();
    assert_eq!(back, unit);
}

#[test]
fn test_config_json_names() {
    let mut config = Config::default();
    config.target_version = LuaVersion::Lua52;
    config.flags.insert("assertions".to_string(), true);

    let text = serde_json::to_string(&config).unwrap();
    assert!(text.contains("\"5.2\""));
    assert!(text.contains("\"lua\""));

    let back: Config = serde_json::from_str(&text).unwrap();
    assert_eq!(back, config);
}

#[test]
fn test_number_literal_shape() {
    let Expr::Number(n) = lit("-0x1.8p3") else {
        panic!("expected number");
    };
    let text = serde_json::to_string(&n).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["negative"], serde_json::json!(true));
    assert_eq!(value["int_digits"], serde_json::json!("1"));
    assert_eq!(value["frac_digits"], serde_json::json!("8"));
    assert_eq!(value["exponent"], serde_json::json!(3));
}
