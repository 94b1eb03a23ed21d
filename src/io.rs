//! Console boundary used by the IN and OUT instructions.
//!
//! The engine only ever talks to a [`Console`]; [`StdConsole`] binds it to
//! real streams and [`ScriptedConsole`] to in-memory queues for tests and
//! embedding hosts.

use std::collections::VecDeque;
use std::io::{self, BufRead, ErrorKind, Write};

use crate::error::Result;

pub trait Console {
    /// Blocks until one integer is available.
    fn read_integer(&mut self) -> Result<i32>;
    fn write_integer(&mut self, value: i32) -> Result<()>;
}

/// Parses an integer the way C's `%i` conversion does: optional sign,
/// `0x` for hexadecimal, a leading `0` for octal, decimal otherwise.
pub fn parse_integer(token: &str) -> Option<i32> {
    let (negative, digits) = match token.as_bytes().first()? {
        b'-' => (true, &token[1..]),
        b'+' => (false, &token[1..]),
        _ => (false, token),
    };

    let (radix, digits) = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        (16, hex)
    } else if digits.len() > 1 && digits.starts_with('0') {
        (8, &digits[1..])
    } else {
        (10, digits)
    };

    // from_str_radix would accept a second sign
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }

    let magnitude = i64::from_str_radix(digits, radix).ok()?;
    let value = if negative { -magnitude } else { magnitude };
    i32::try_from(value).ok()
}

/// Splits a buffered stream into whitespace-separated tokens, pulling one
/// line at a time so interactive input is consumed lazily.
#[derive(Debug)]
pub struct IntegerReader<R> {
    reader: R,
    pending: VecDeque<String>,
}

impl<R: BufRead> IntegerReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            pending: VecDeque::new(),
        }
    }

    /// Returns the next token, or `None` at end of input.
    pub fn next_token(&mut self) -> io::Result<Option<String>> {
        while self.pending.is_empty() {
            let mut line = String::new();
            if self.reader.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            self.pending
                .extend(line.split_whitespace().map(str::to_string));
        }
        Ok(self.pending.pop_front())
    }

    /// Reads the next integer. A token that is not an integer is consumed
    /// and reported as `InvalidData`; end of input as `UnexpectedEof`.
    pub fn next_integer(&mut self) -> io::Result<i32> {
        match self.next_token()? {
            Some(token) => parse_integer(&token).ok_or_else(|| {
                io::Error::new(
                    ErrorKind::InvalidData,
                    format!("expected an integer, found `{}`", token),
                )
            }),
            None => Err(io::Error::new(
                ErrorKind::UnexpectedEof,
                "end of input reached",
            )),
        }
    }
}

/// Console over arbitrary streams; `StdConsole::stdio()` binds it to the
/// process's stdin and stdout.
#[derive(Debug)]
pub struct StdConsole<R, W> {
    input: IntegerReader<R>,
    output: W,
}

impl<R: BufRead, W: Write> StdConsole<R, W> {
    pub fn new(input: IntegerReader<R>, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }
}

impl StdConsole<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(IntegerReader::new(io::stdin().lock()), io::stdout())
    }
}

impl<R: BufRead, W: Write> Console for StdConsole<R, W> {
    fn read_integer(&mut self) -> Result<i32> {
        Ok(self.input.next_integer()?)
    }

    fn write_integer(&mut self, value: i32) -> Result<()> {
        writeln!(self.output, "{}", value)?;
        self.output.flush()?;
        Ok(())
    }
}

/// In-memory console: inputs are served from a queue and every OUT value
/// is recorded in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptedConsole {
    inputs: VecDeque<i32>,
    outputs: Vec<i32>,
}

impl ScriptedConsole {
    pub fn new<I: IntoIterator<Item = i32>>(inputs: I) -> Self {
        Self {
            inputs: inputs.into_iter().collect(),
            outputs: Vec::new(),
        }
    }

    pub fn outputs(&self) -> &[i32] {
        &self.outputs
    }

    pub fn remaining_inputs(&self) -> usize {
        self.inputs.len()
    }
}

impl Console for ScriptedConsole {
    fn read_integer(&mut self) -> Result<i32> {
        self.inputs.pop_front().ok_or_else(|| {
            io::Error::new(ErrorKind::UnexpectedEof, "scripted input exhausted").into()
        })
    }

    fn write_integer(&mut self, value: i32) -> Result<()> {
        self.outputs.push(value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VmError;

    #[test]
    fn parses_c_style_integers() {
        assert_eq!(parse_integer("42"), Some(42));
        assert_eq!(parse_integer("-17"), Some(-17));
        assert_eq!(parse_integer("+5"), Some(5));
        assert_eq!(parse_integer("0"), Some(0));
        assert_eq!(parse_integer("0x1F"), Some(31));
        assert_eq!(parse_integer("-0X10"), Some(-16));
        assert_eq!(parse_integer("017"), Some(15));
        assert_eq!(parse_integer("2147483647"), Some(i32::MAX));
        assert_eq!(parse_integer("-2147483648"), Some(i32::MIN));
    }

    #[test]
    fn rejects_non_integers() {
        for token in ["", "-", "abc", "0x", "09", "--1", "+-1", "12a", "2147483648"] {
            assert_eq!(parse_integer(token), None, "token {:?}", token);
        }
    }

    #[test]
    fn reader_spans_lines() {
        let mut reader = IntegerReader::new("1 2\n\n  3\n".as_bytes());
        assert_eq!(reader.next_integer().unwrap(), 1);
        assert_eq!(reader.next_integer().unwrap(), 2);
        assert_eq!(reader.next_integer().unwrap(), 3);
        assert_eq!(
            reader.next_integer().unwrap_err().kind(),
            ErrorKind::UnexpectedEof
        );
    }

    #[test]
    fn reader_reports_invalid_tokens() {
        let mut reader = IntegerReader::new("x 4".as_bytes());
        assert_eq!(
            reader.next_integer().unwrap_err().kind(),
            ErrorKind::InvalidData
        );
        assert_eq!(reader.next_integer().unwrap(), 4);
    }

    #[test]
    fn std_console_writes_one_value_per_line() {
        let mut console = StdConsole::new(IntegerReader::new("10\n".as_bytes()), Vec::new());
        assert_eq!(console.read_integer().unwrap(), 10);
        console.write_integer(15).unwrap();
        console.write_integer(-2).unwrap();
        assert!(matches!(console.read_integer(), Err(VmError::Io(_))));
        assert_eq!(console.into_output(), b"15\n-2\n".to_vec());
    }

    #[test]
    fn scripted_console_records_outputs() {
        let mut console = ScriptedConsole::new(vec![3]);
        assert_eq!(console.read_integer().unwrap(), 3);
        assert_eq!(console.remaining_inputs(), 0);
        console.write_integer(9).unwrap();
        assert_eq!(console.outputs(), &[9]);
        assert!(matches!(console.read_integer(), Err(VmError::Io(_))));
    }
}
