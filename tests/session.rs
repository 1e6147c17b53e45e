use pretty_assertions::assert_eq;
use stackrpl::evaluator::CaptureBuffer;
use stackrpl::{Config, Feed, Interpreter, Session, Value};

fn session() -> (Session, CaptureBuffer) {
    let capture = CaptureBuffer::new();
    let interp = Interpreter::new(&Config::default()).with_output(capture.clone());
    (Session::new(interp), capture)
}

#[test]
fn test_interactive_transcript() {
    let (mut session, capture) = session();

    // (line, expected feed, expected stack listing after the line)
    let transcript: Vec<(&str, Feed, Vec<&str>)> = vec![
        ("3 4", Feed::Ready, vec!["2: 3", "1: 4"]),
        ("ADD", Feed::Ready, vec!["1: 7"]),
        ("<< DUP", Feed::NeedsMore, vec!["1: 7"]),
        ("MUL >> \"SQ\" REGISTER", Feed::Ready, vec!["1: 7"]),
        ("SQ", Feed::Ready, vec!["1: 49"]),
        ("IF DUP 40 GT THEN", Feed::NeedsMore, vec!["1: 49"]),
        ("\"big\" ELSE \"small\"", Feed::NeedsMore, vec!["1: 49"]),
        ("ENDIF", Feed::Ready, vec!["2: 49", "1: \"big\""]),
        ("CLEAR", Feed::Ready, vec![]),
    ];

    for (line, feed, stack) in transcript {
        assert_eq!(session.feed(line), feed, "{line}");
        assert_eq!(session.stack_lines(), stack, "{line}");
    }
    assert_eq!(capture.contents(), "");
}

#[test]
fn test_errors_do_not_end_session() {
    let (mut session, capture) = session();
    assert_eq!(session.feed("DROP"), Feed::Ready);
    assert!(capture.take().starts_with("Error: stack underflow"));

    assert_eq!(session.feed("\"unterminated"), Feed::NeedsMore);
    assert_eq!(session.feed("string\" 1"), Feed::Ready);
    assert_eq!(
        session.interpreter().stack().items(),
        &[Value::from("unterminated\nstring"), Value::from(1)]
    );

    assert_eq!(session.feed("x LRCL 2"), Feed::Ready);
    assert!(capture.take().starts_with("Error: no active frame"));
    assert_eq!(session.interpreter().stack().depth(), 4);
}

#[test]
fn test_help_output() {
    let (mut session, capture) = session();
    session.feed("DUP?");
    assert_eq!(
        capture.take(),
        "DUP (stack): ( a -- a a ) duplicate the top value\n"
    );

    session.feed("<< 1 ADD >> \"INC\" REGISTER INC?");
    assert_eq!(capture.take(), "INC (user): user program << 1 ADD >>\n");

    session.feed("HELP");
    let help = capture.take();
    assert!(help.contains("arithmetic: ADD DIV MOD MUL NEG SUB"), "{help}");
    assert!(help.contains("user: INC"), "{help}");
}

#[test]
fn test_exit_from_program() {
    let (mut session, _) = session();
    assert_eq!(session.feed("<< 1 EXIT 2 >> EVAL 3"), Feed::Exit);
    assert_eq!(session.interpreter().stack().items(), &[Value::from(1)]);
}
