//! Interactive session driver.
//!
//! A [`Session`] accepts input one line at a time. Complete top-level units
//! are executed as soon as they are read; a form left open at the end of a
//! line is kept and re-read once more lines arrive. Errors are reported on
//! the interpreter's output sink and never end the session.

use crate::Error;
use crate::evaluator::Interpreter;
use crate::reader::Reader;

/// Source name used in error contexts for interactive input
pub const INPUT_NAME: &str = "<input>";

/// Outcome of feeding one line to a [`Session`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feed {
    /// Everything read so far has been executed
    Ready,
    /// A form is still open; the next line continues it
    NeedsMore,
    /// `EXIT` ran; the driver should end the session
    Exit,
}

pub struct Session {
    interp: Interpreter,
    pending: String,
}

impl Session {
    pub fn new(interp: Interpreter) -> Self {
        Session {
            interp,
            pending: String::new(),
        }
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interp
    }

    pub fn interpreter_mut(&mut self) -> &mut Interpreter {
        &mut self.interp
    }

    /// True while an unterminated form is waiting for more lines
    pub fn is_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Drop a pending unterminated form, e.g. when the user presses Ctrl-C
    /// at a continuation prompt
    pub fn cancel_pending(&mut self) {
        if self.is_pending() {
            tracing::debug!(discarded = self.pending.len(), "pending input cancelled");
        }
        self.pending.clear();
    }

    pub fn feed(&mut self, line: &str) -> Feed {
        self.interp.interrupt().clear();
        if !self.pending.is_empty() {
            self.pending.push('\n');
        }
        self.pending.push_str(line);

        let text = std::mem::take(&mut self.pending);
        let mut reader = Reader::new(INPUT_NAME, text);
        loop {
            if self.interp.exit_requested() {
                return Feed::Exit;
            }
            if self.interp.interrupt().is_raised() {
                tracing::debug!("remaining input discarded after interrupt");
                break;
            }

            let next = reader.read_next(&self.interp.read_context());
            match next {
                Ok(Some(value)) => {
                    if let Err(error) = self.interp.execute(&value) {
                        self.interp.report(&error);
                    }
                }
                Ok(None) => break,
                Err(error) if error.is_incomplete() => {
                    self.pending = reader.unit_text().to_owned();
                    return Feed::NeedsMore;
                }
                Err(error) => {
                    // The rest of the line cannot be resynchronized
                    self.interp.report(&error);
                    break;
                }
            }
        }

        if self.interp.exit_requested() {
            Feed::Exit
        } else {
            Feed::Ready
        }
    }

    /// Feed a whole text, line by line, stopping early on `EXIT`.
    ///
    /// Returns an `UnterminatedForm` error if the text ends inside a form.
    pub fn feed_text(&mut self, text: &str) -> Result<Feed, Error> {
        let mut last = Feed::Ready;
        for line in text.lines() {
            last = self.feed(line);
            if last == Feed::Exit {
                return Ok(last);
            }
        }
        if last == Feed::NeedsMore {
            let unit = std::mem::take(&mut self.pending);
            return Err(Error::UnterminatedForm(crate::ParseError::new(
                "input ended inside an open form",
                Some(unit),
                None,
            )));
        }
        Ok(last)
    }

    /// The stack as numbered levels, deepest first: `3: a`, `2: b`, `1: c`.
    /// Level 1 is the top. Values are rendered with the display limits.
    pub fn stack_lines(&self) -> Vec<String> {
        let items = self.interp.stack().items();
        items
            .iter()
            .enumerate()
            .map(|(i, value)| format!("{}: {}", items.len() - i, self.interp.render(value)))
            .collect()
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::Config;
    use crate::evaluator::CaptureBuffer;
    use crate::value::val;
    use pretty_assertions::assert_eq;

    fn session() -> (Session, CaptureBuffer) {
        let capture = CaptureBuffer::new();
        let interp = Interpreter::new(&Config::default()).with_output(capture.clone());
        (Session::new(interp), capture)
    }

    #[test]
    fn test_multi_line_program() {
        let (mut session, _) = session();
        assert_eq!(session.feed("<< 1"), Feed::NeedsMore);
        assert!(session.is_pending());
        assert!(session.interpreter().stack().is_empty());

        assert_eq!(session.feed("2 ADD >> EVAL"), Feed::Ready);
        assert!(!session.is_pending());
        assert_eq!(session.interpreter().stack().items(), &[val(3)]);
    }

    #[test]
    fn test_complete_units_run_before_open_form() {
        let (mut session, _) = session();
        assert_eq!(session.feed("1 2 ADD [ 4"), Feed::NeedsMore);
        assert_eq!(session.interpreter().stack().items(), &[val(3)]);

        assert_eq!(session.feed("5 ]"), Feed::Ready);
        assert_eq!(
            session.interpreter().stack().items(),
            &[val(3), val(vec![4, 5])]
        );
    }

    #[test]
    fn test_errors_are_reported_and_session_continues() {
        let (mut session, capture) = session();
        assert_eq!(session.feed("1 0 DIV 7"), Feed::Ready);
        assert_eq!(capture.take(), "Error: operation failed: division by zero\n");
        assert_eq!(session.interpreter().stack().items(), &[val(1), val(0), val(7)]);

        assert_eq!(session.feed("] 8"), Feed::Ready);
        assert!(capture.take().starts_with("Error: malformed token"));
        assert_eq!(session.interpreter().stack().depth(), 3);

        assert_eq!(session.feed("9"), Feed::Ready);
        assert_eq!(session.interpreter().stack().depth(), 4);
    }

    #[test]
    fn test_exit_ends_session() {
        let (mut session, _) = session();
        assert_eq!(session.feed("1 EXIT 2"), Feed::Exit);
        assert_eq!(session.interpreter().stack().items(), &[val(1)]);
    }

    #[test]
    fn test_interrupt_is_cleared_for_next_line() {
        let (mut session, _) = session();
        assert_eq!(session.feed("1 INTERRUPT 2"), Feed::Ready);
        assert_eq!(session.interpreter().stack().items(), &[val(1)]);

        assert_eq!(session.feed("3"), Feed::Ready);
        assert_eq!(session.interpreter().stack().items(), &[val(1), val(3)]);
    }

    #[test]
    fn test_cancel_pending() {
        let (mut session, _) = session();
        assert_eq!(session.feed("IF 1 THEN"), Feed::NeedsMore);
        session.cancel_pending();
        assert_eq!(session.feed("5"), Feed::Ready);
        assert_eq!(session.interpreter().stack().items(), &[val(5)]);
    }

    #[test]
    fn test_feed_text() {
        let (mut session, _) = session();
        let feed = session.feed_text("<< 2\nMUL >> \"DOUBLE\" REGISTER\n21 DOUBLE\n").unwrap();
        assert_eq!(feed, Feed::Ready);
        assert_eq!(session.interpreter().stack().items(), &[val(42)]);

        assert!(session.feed_text("[ 1").unwrap_err().is_incomplete());
        assert!(!session.is_pending());
    }

    #[test]
    fn test_stack_lines() {
        let mut config = Config::default();
        config.display.max_list_items = Some(2);
        let mut session = Session::new(Interpreter::new(&config).with_output(CaptureBuffer::new()));
        session.feed("\"a\" [ 1 2 3 ] 42");
        assert_eq!(
            session.stack_lines(),
            vec!["3: \"a\"", "2: [ 1 2 ... ]", "1: 42"]
        );
    }
}
