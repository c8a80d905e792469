//! Interactive lookup loop.

use log::debug;
use std::io::{self, BufRead, Write};
use std::num::IntErrorKind;

use crate::{display_person, PersonId, PersonTable};

pub const PROMPT: &str = "Enter an ID to lookup (<=0 to quit): ";
pub const GUIDANCE: &str = "Please enter an integer ID.";

/// What a line typed by the user asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Empty,
    Invalid,
    Quit,
    Lookup(PersonId),
}

pub fn classify(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }
    match line.parse::<i64>() {
        Ok(id) if id <= 0 => Input::Quit,
        Ok(id) => Input::Lookup(id.into()),
        Err(err) => match err.kind() {
            IntErrorKind::NegOverflow => Input::Quit,
            // still an integer, keyed the same way the parser keys it
            IntErrorKind::PosOverflow => Input::Lookup(PersonId::parse(line)),
            _ => Input::Invalid,
        },
    }
}

#[derive(Debug, PartialEq, Eq)]
enum State {
    AwaitingInput,
    Validating(String),
    Lookup(PersonId),
    Error,
    Terminated,
}

/// Prompts on `output`, reads ids from `input` and answers them from `table`
/// until the user enters a non-positive id or the input ends.
pub struct Session<'a, R, W> {
    table: &'a PersonTable,
    input: R,
    output: W,
}

impl<'a, R: BufRead, W: Write> Session<'a, R, W> {
    pub fn new(table: &'a PersonTable, input: R, output: W) -> Self {
        Session {
            table,
            input,
            output,
        }
    }

    pub fn run(&mut self) -> io::Result<()> {
        let mut state = State::AwaitingInput;
        loop {
            state = match state {
                State::AwaitingInput => self.read_line()?,
                State::Validating(line) => match classify(&line) {
                    Input::Empty => State::AwaitingInput,
                    Input::Invalid => State::Error,
                    Input::Quit => State::Terminated,
                    Input::Lookup(id) => State::Lookup(id),
                },
                State::Lookup(id) => {
                    display_person(&mut self.output, &id, self.table)?;
                    State::AwaitingInput
                }
                State::Error => {
                    writeln!(self.output, "{}", GUIDANCE)?;
                    State::AwaitingInput
                }
                State::Terminated => return self.output.flush(),
            };
        }
    }

    fn read_line(&mut self) -> io::Result<State> {
        write!(self.output, "{}", PROMPT)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            debug!("input closed, ending session");
            return Ok(State::Terminated);
        }
        Ok(State::Validating(line))
    }

    pub fn into_output(self) -> W {
        self.output
    }
}

#[cfg(test)]
use crate::Person;
#[cfg(test)]
use chrono::NaiveDate;

#[cfg(test)]
fn table() -> PersonTable {
    let mut table = PersonTable::new();
    table.insert(
        PersonId::Number(1),
        Person::new("Alice", NaiveDate::from_ymd_opt(1990, 12, 5).unwrap()),
    );
    table
}

#[cfg(test)]
fn run(table: &PersonTable, input: &str) -> String {
    let mut session = Session::new(table, input.as_bytes(), Vec::new());
    session.run().unwrap();
    String::from_utf8(session.into_output()).unwrap()
}

#[test]
fn classify_inputs() {
    assert_eq!(classify(""), Input::Empty);
    assert_eq!(classify("  \n"), Input::Empty);
    assert_eq!(classify("abc"), Input::Invalid);
    assert_eq!(classify("1.5"), Input::Invalid);
    assert_eq!(classify("0"), Input::Quit);
    assert_eq!(classify("-5\n"), Input::Quit);
    assert_eq!(classify("-99999999999999999999"), Input::Quit);
    assert_eq!(classify(" 42 \r\n"), Input::Lookup(PersonId::Number(42)));
    assert_eq!(classify("+3"), Input::Lookup(PersonId::Number(3)));
    assert_eq!(
        classify("99999999999999999999"),
        Input::Lookup(PersonId::Text("99999999999999999999".to_string()))
    );
}

#[test]
fn lookup_then_quit() {
    let table = table();
    assert_eq!(
        run(&table, "1\n2\n0\n3\n"),
        format!(
            "{p}Person #1 is Alice with a birthday of 1990-12-05\n\
             {p}No user found with that id\n\
             {p}",
            p = PROMPT
        )
    );
}

#[test]
fn negative_quits_without_another_prompt() {
    let table = table();
    assert_eq!(run(&table, "-5\n1\n"), PROMPT);
    assert_eq!(run(&table, "-99999999999999999999\n1\n"), PROMPT);
}

#[test]
fn oversized_id_is_not_found() {
    let table = table();
    assert_eq!(
        run(&table, "99999999999999999999\n0\n"),
        format!("{p}No user found with that id\n{p}", p = PROMPT)
    );
}

#[test]
fn oversized_id_reaches_matching_row() {
    let mut table = table();
    table.insert(
        PersonId::parse("099999999999999999999"),
        Person::new("Zed", NaiveDate::from_ymd_opt(2000, 1, 2).unwrap()),
    );
    assert_eq!(
        run(&table, "+99999999999999999999\n0\n"),
        format!(
            "{p}Person #99999999999999999999 is Zed with a birthday of 2000-01-02\n{p}",
            p = PROMPT
        )
    );
}

#[test]
fn invalid_and_empty_reprompt() {
    let table = table();
    assert_eq!(
        run(&table, "abc\n\n   \n1\n0\n"),
        format!(
            "{p}{g}\n{p}{p}{p}Person #1 is Alice with a birthday of 1990-12-05\n{p}",
            p = PROMPT,
            g = GUIDANCE
        )
    );
}

#[test]
fn end_of_input_terminates() {
    let table = table();
    assert_eq!(
        run(&table, "1"),
        format!("{p}Person #1 is Alice with a birthday of 1990-12-05\n{p}", p = PROMPT)
    );
    assert_eq!(run(&table, ""), PROMPT);
}
