#![expect(clippy::unwrap_used)] // test code OK

use pretty_assertions::assert_eq;
use stackrpl::evaluator::CaptureBuffer;
use stackrpl::{Config, Error, Interpreter, Value};

fn interpreter() -> (Interpreter, CaptureBuffer) {
    let capture = CaptureBuffer::new();
    let interp = Interpreter::new(&Config::default()).with_output(capture.clone());
    (interp, capture)
}

/// Run a script and return the rendered stack, bottom first
fn run(source: &str) -> Result<Vec<String>, Error> {
    let (mut interp, _) = interpreter();
    interp.run_source("<script>", source)?;
    Ok(interp.stack().items().iter().map(Value::to_string).collect())
}

#[test]
fn test_script_programs() {
    let test_cases = vec![
        (
            "recursive factorial through a variable",
            r#"
            # n -- n!
            << IF DUP 1 GT THEN DUP 1 SUB fact CALL MUL ENDIF >> fact STO
            5 fact CALL
            "#,
            vec!["120"],
        ),
        (
            "iterative fibonacci with locals",
            r#"
            << n LSTO 0 1
               WHILE n LRCL 0 GT REPEAT
                 SWAP OVER ADD
                 n LRCL 1 SUB n LSTO
               ENDWHILE
               DROP >> fib STO
            10 fib CALL
            "#,
            vec!["55"],
        ),
        (
            "sum of squares over a range",
            r#"
            << DUP MUL >> "SQUARE" REGISTER
            0 1 5 RANGE FOR SQUARE ADD ENDFOR
            "#,
            vec!["30"],
        ),
        (
            "word counts in a map",
            r#"
            { } counts STO
            [ "a" "b" "a" "c" "a" ] FOR
              w STO
              counts RCL w RCL
              # GET leaves its operands behind when the key is missing
              << counts RCL w RCL GET >> << DROP DROP DROP 0 >> TRYCATCH
              1 ADD PUT DROP
            ENDFOR
            counts RCL
            "#,
            vec![r#"{ "a" 3 "b" 1 "c" 1 }"#],
        ),
        (
            "string building",
            r#"
            "" [ "x" "y" "z" ] FOR ADD "-" ADD ENDFOR
            "#,
            vec![r#""x-y-z-""#],
        ),
        (
            "nested lists and maps",
            r#"
            { "list" [ 1 2 ] } DUP "list" GET 3 APPEND DROP
            "#,
            vec![r#"{ "list" [ 1 2 3 ] }"#],
        ),
    ];

    for (name, source, expected) in test_cases {
        let stack = run(source).unwrap_or_else(|e| panic!("{name}: {e}"));
        assert_eq!(stack, expected, "{name}");
    }
}

#[test]
fn test_script_stops_at_first_error() {
    let (mut interp, capture) = interpreter();
    let err = interp
        .run_source("<script>", "1 2 ADD \"x\" SUB 100")
        .unwrap_err();
    assert!(matches!(err, Error::TypeMismatch { .. }), "{err}");
    assert_eq!(interp.stack().depth(), 2);
    assert!(capture.contents().is_empty());
}

#[test]
fn test_malformed_script_reports_context() {
    let (mut interp, _) = interpreter();
    let err = interp.run_source("<script>", "1 2 ] 3").unwrap_err();
    let Error::MalformedToken(parse) = &err else {
        panic!("expected MalformedToken, got {err}");
    };
    assert!(parse.context.is_some());
    assert_eq!(interp.stack().depth(), 2);
}

#[test]
fn test_print_output() {
    let (mut interp, capture) = interpreter();
    interp
        .run_source("<script>", "[ 1 2 3 ] FOR DUP MUL TOSTR PRINT ENDFOR \"done\" PRINT")
        .unwrap();
    assert_eq!(capture.contents(), "1\n4\n9\ndone\n");
}

#[test]
fn test_configured_namespace_and_limits() {
    let config = Config::from_toml_str(
        r#"
        [session]
        namespace = "calc"
        [limits]
        max_call_depth = 4
        "#,
    )
    .unwrap();
    let mut interp = Interpreter::new(&config).with_output(CaptureBuffer::new());
    interp.run_source("<script>", "NS").unwrap();
    assert_eq!(interp.stack().items(), &[Value::from("calc")]);

    let err = interp
        .run_source("<script>", "<< r CALL >> r STO r CALL")
        .unwrap_err();
    assert!(matches!(err, Error::OperationFailed(_)), "{err}");
    assert_eq!(interp.call_depth(), 0);
}
