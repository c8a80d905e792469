use chrono::NaiveDate;
use csv::StringRecord;
use log::{debug, info};
use std::collections::HashMap;
use std::fmt;
use std::io::{self, Write};
use std::num::IntErrorKind;

pub mod fetch;
pub mod report;
pub mod session;

use crate::report::{Reporter, RowError};

/// Birthdays are always written day first: `05/12/1990` is 5 December 1990.
const BIRTHDAY_FORMAT: &str = "%d/%m/%Y";

/// Identifier of a row. Numeric ids are the common case; anything that does not
/// parse as an integer keeps its raw text. Integers too wide for an `i64` are
/// kept as text in canonical form (no `+`, no leading zeros) so the lookup loop
/// can still reach them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PersonId {
    Number(i64),
    Text(String),
}

impl PersonId {
    pub fn parse(raw: &str) -> Self {
        match raw.parse::<i64>() {
            Ok(id) => PersonId::Number(id),
            Err(err) => match err.kind() {
                IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => {
                    PersonId::Text(canonical_integer(raw))
                }
                _ => PersonId::Text(raw.to_string()),
            },
        }
    }
}

fn canonical_integer(raw: &str) -> String {
    let (sign, digits) = match raw.as_bytes().first() {
        Some(b'-') => ("-", &raw[1..]),
        Some(b'+') => ("", &raw[1..]),
        _ => ("", raw),
    };
    format!("{}{}", sign, digits.trim_start_matches('0'))
}

impl From<i64> for PersonId {
    fn from(id: i64) -> Self {
        PersonId::Number(id)
    }
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersonId::Number(id) => write!(f, "{}", id),
            PersonId::Text(raw) => f.write_str(raw),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Person {
    pub name: String,
    pub birthday: NaiveDate,
}

impl Person {
    pub fn new(name: impl Into<String>, birthday: NaiveDate) -> Self {
        Person {
            name: name.into(),
            birthday,
        }
    }
}

/// People keyed by id. Later rows overwrite earlier rows with the same id.
#[derive(Debug, Default)]
pub struct PersonTable {
    people: HashMap<PersonId, Person>,
}

impl PersonTable {
    pub fn new() -> Self {
        PersonTable::default()
    }

    pub fn insert(&mut self, id: PersonId, person: Person) -> Option<Person> {
        self.people.insert(id, person)
    }

    pub fn get(&self, id: &PersonId) -> Option<&Person> {
        self.people.get(id)
    }

    pub fn len(&self) -> usize {
        self.people.len()
    }

    pub fn is_empty(&self) -> bool {
        self.people.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PersonId, &Person)> {
        self.people.iter()
    }
}

/// Zero-based position of each logical field inside a data row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnIndexMap {
    pub id: usize,
    pub name: usize,
    pub birthday: usize,
}

impl Default for ColumnIndexMap {
    fn default() -> Self {
        ColumnIndexMap {
            id: 0,
            name: 1,
            birthday: 2,
        }
    }
}

fn split_fields(line: &str) -> StringRecord {
    let mut record: StringRecord = line.split(',').collect();
    record.trim();
    record
}

/// Works out the column order from the header line.
///
/// Names are matched case-insensitively; `birthdate` is accepted for the
/// birthday column and a repeated name keeps its last position. A header that
/// does not name all three fields is treated as absent and the default order is
/// used instead.
pub fn detect_columns(header_line: &str) -> ColumnIndexMap {
    if header_line.is_empty() {
        return ColumnIndexMap::default();
    }

    let (mut id, mut name, mut birthday) = (None, None, None);
    for (position, field) in split_fields(header_line).iter().enumerate() {
        match field.to_lowercase().as_str() {
            "id" => id = Some(position),
            "name" => name = Some(position),
            "birthday" | "birthdate" => birthday = Some(position),
            _ => {}
        }
    }

    match (id, name, birthday) {
        (Some(id), Some(name), Some(birthday)) => ColumnIndexMap { id, name, birthday },
        _ => {
            debug!("header {:?} is incomplete, using default columns", header_line);
            ColumnIndexMap::default()
        }
    }
}

/// Parses a strict `dd/mm/yyyy` birthday. Anything else, including dates that
/// do not exist on the calendar, yields `None`.
pub fn parse_birthday(raw: &str) -> Option<NaiveDate> {
    let mut parts = raw.split('/');
    let (day, month, year) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    let well_formed = [(day, 2), (month, 2), (year, 4)]
        .into_iter()
        .all(|(part, width)| part.len() == width && part.bytes().all(|b| b.is_ascii_digit()));
    if !well_formed {
        return None;
    }

    NaiveDate::parse_from_str(raw, BIRTHDAY_FORMAT).ok()
}

fn parse_row(
    line_number: usize,
    line: &str,
    columns: &ColumnIndexMap,
) -> Result<(PersonId, Person), RowError> {
    let record = split_fields(line);
    let (raw_id, name, raw_birthday) = match (
        record.get(columns.id),
        record.get(columns.name),
        record.get(columns.birthday),
    ) {
        (Some(id), Some(name), Some(birthday)) => (id, name, birthday),
        _ => return Err(RowError::new(line_number, None)),
    };

    let id = PersonId::parse(raw_id);
    match parse_birthday(raw_birthday) {
        Some(birthday) => Ok((id, Person::new(name, birthday))),
        None => Err(RowError::new(line_number, Some(id))),
    }
}

/// Builds the person table from raw CSV text.
///
/// The first line is always consumed as the header, even when it does not name
/// the columns. Blank lines are ignored. Rows that are too short or carry a bad
/// birthday are handed to `reporter` with their 1-based line number and skipped.
pub fn parse_records<R: Reporter + ?Sized>(text: &str, reporter: &mut R) -> PersonTable {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut lines = normalized.split('\n');
    let mut table = PersonTable::new();

    let columns = match lines.next() {
        Some(header) => detect_columns(header),
        None => return table,
    };
    debug!("using columns {:?}", columns);

    let mut skipped = 0;
    for (offset, line) in lines.enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        // header is line 1
        let line_number = offset + 2;
        match parse_row(line_number, line, &columns) {
            Ok((id, person)) => {
                if let Some(previous) = table.insert(id, person) {
                    debug!("line #{} replaces {:?}", line_number, previous);
                }
            }
            Err(err) => {
                reporter.report(err.line, err.id.as_ref());
                skipped += 1;
            }
        }
    }

    info!("loaded {} people, skipped {} rows", table.len(), skipped);
    table
}

/// Writes the person with `id`, or the not-found message, to `target`.
pub fn display_person<W: Write>(
    target: &mut W,
    id: &PersonId,
    table: &PersonTable,
) -> io::Result<()> {
    match table.get(id) {
        Some(person) => writeln!(
            target,
            "Person #{} is {} with a birthday of {}",
            id,
            person.name,
            person.birthday.format("%Y-%m-%d")
        ),
        None => writeln!(target, "No user found with that id"),
    }
}

#[cfg(test)]
use crate::report::MemoryReporter;

#[cfg(test)]
fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

#[test]
fn header_permutations() {
    assert_eq!(
        detect_columns("name,birthday,id"),
        ColumnIndexMap {
            id: 2,
            name: 0,
            birthday: 1
        }
    );
    assert_eq!(
        detect_columns(" BirthDate , ID ,Name"),
        ColumnIndexMap {
            id: 1,
            name: 2,
            birthday: 0
        }
    );
    assert_eq!(
        detect_columns("id,email,name,birthday"),
        ColumnIndexMap {
            id: 0,
            name: 2,
            birthday: 3
        }
    );
}

#[test]
fn repeated_header_name_keeps_last() {
    assert_eq!(
        detect_columns("id,name,id,birthday"),
        ColumnIndexMap {
            id: 2,
            name: 1,
            birthday: 3
        }
    );
}

#[test]
fn incomplete_header_falls_back() {
    assert_eq!(detect_columns(""), ColumnIndexMap::default());
    assert_eq!(detect_columns("name,birthday"), ColumnIndexMap::default());
    assert_eq!(detect_columns("1,Alice,05/12/1990"), ColumnIndexMap::default());
    assert_eq!(detect_columns("   "), ColumnIndexMap::default());
}

#[test]
fn birthday_format() {
    assert_eq!(parse_birthday("05/12/1990"), Some(date(1990, 12, 5)));
    assert_eq!(parse_birthday("29/02/2000"), Some(date(2000, 2, 29)));
    assert_eq!(parse_birthday("31/02/1999"), None);
    assert_eq!(parse_birthday("29/02/1900"), None);
    assert_eq!(parse_birthday("5/12/1990"), None);
    assert_eq!(parse_birthday("05/12/90"), None);
    assert_eq!(parse_birthday("1990-12-05"), None);
    assert_eq!(parse_birthday("05/12/1990/01"), None);
    assert_eq!(parse_birthday(""), None);
}

#[test]
fn sanity() {
    let mut reporter = MemoryReporter::default();
    let table = parse_records(
        "id,name,birthday\n1,Alice,05/12/1990\n2,Bob,31/02/1999",
        &mut reporter,
    );

    assert_eq!(table.len(), 1);
    assert_eq!(
        table.get(&PersonId::Number(1)),
        Some(&Person::new("Alice", date(1990, 12, 5)))
    );
    assert_eq!(reporter.errors(), &[RowError::new(3, Some(PersonId::Number(2)))]);
}

#[test]
fn short_row_is_reported_without_id() {
    let mut reporter = MemoryReporter::default();
    let table = parse_records("id,name,birthday\n3,Carol\n4,Dan,01/01/2001\n", &mut reporter);

    assert_eq!(table.len(), 1);
    assert!(table.get(&PersonId::Number(4)).is_some());
    assert_eq!(reporter.errors(), &[RowError::new(2, None)]);
}

#[test]
fn blank_lines_are_ignored() {
    let mut reporter = MemoryReporter::default();
    let table = parse_records(
        "id,name,birthday\r\n\r\n1,Alice,05/12/1990\r\n   \r2,Bob,06/07/1985\n\n\n",
        &mut reporter,
    );

    assert_eq!(table.len(), 2);
    assert!(reporter.errors().is_empty());
}

#[test]
fn line_numbers_count_blank_lines() {
    let mut reporter = MemoryReporter::default();
    parse_records("id,name,birthday\r\n\r\n\r1,Alice,bad", &mut reporter);

    assert_eq!(reporter.errors(), &[RowError::new(4, Some(PersonId::Number(1)))]);
}

#[test]
fn later_rows_overwrite_earlier() {
    let mut reporter = MemoryReporter::default();
    let table = parse_records(
        "id,name,birthday\n7,Alice,05/12/1990\n7,Alicia,06/12/1990",
        &mut reporter,
    );

    assert_eq!(table.len(), 1);
    assert_eq!(
        table.get(&PersonId::Number(7)),
        Some(&Person::new("Alicia", date(1990, 12, 6)))
    );
}

#[test]
fn reordered_columns() {
    let mut reporter = MemoryReporter::default();
    let table = parse_records(
        "Birthdate, Name ,ID\n 05/12/1990 , Alice , 12 ",
        &mut reporter,
    );

    assert_eq!(
        table.get(&PersonId::Number(12)),
        Some(&Person::new("Alice", date(1990, 12, 5)))
    );
}

#[test]
fn headerless_first_line_is_consumed() {
    let mut reporter = MemoryReporter::default();
    let table = parse_records("1,Alice,05/12/1990\n2,Bob,06/07/1985", &mut reporter);

    assert_eq!(table.len(), 1);
    assert!(table.get(&PersonId::Number(1)).is_none());
    assert!(table.get(&PersonId::Number(2)).is_some());
}

#[test]
fn non_numeric_id_keeps_text() {
    let mut reporter = MemoryReporter::default();
    let table = parse_records("id,name,birthday\nA7,Alice,05/12/1990\n007,Bond,13/04/1968", &mut reporter);

    assert!(table.get(&PersonId::Text("A7".to_string())).is_some());
    assert!(table.get(&PersonId::Number(7)).is_some());
    assert!(reporter.errors().is_empty());
}

#[test]
fn empty_input() {
    let mut reporter = MemoryReporter::default();
    assert!(parse_records("", &mut reporter).is_empty());
    assert!(parse_records("id,name,birthday\n", &mut reporter).is_empty());
    assert!(reporter.errors().is_empty());
}

#[test]
fn person_output() {
    let mut table = PersonTable::new();
    table.insert(PersonId::Number(1), Person::new("Alice", date(1990, 12, 5)));

    let mut output = Vec::new();
    display_person(&mut output, &PersonId::from(1i64), &table).unwrap();
    display_person(&mut output, &PersonId::from(2i64), &table).unwrap();

    assert_eq!(
        String::from_utf8(output).unwrap(),
        "Person #1 is Alice with a birthday of 1990-12-05\nNo user found with that id\n"
    );
}

#[test]
fn oversized_ids_are_canonical_text() {
    assert_eq!(PersonId::parse("42"), PersonId::Number(42));
    assert_eq!(
        PersonId::parse("+0099999999999999999999"),
        PersonId::Text("99999999999999999999".to_string())
    );
    assert_eq!(
        PersonId::parse("-99999999999999999999"),
        PersonId::Text("-99999999999999999999".to_string())
    );
    assert_eq!(PersonId::parse("12a"), PersonId::Text("12a".to_string()));
}

#[test]
fn table_iterates_every_person() {
    let mut reporter = MemoryReporter::default();
    let table = parse_records(
        "id,name,birthday\n1,Alice,05/12/1990\n2,Bob,06/07/1985\n1,Alicia,06/12/1990",
        &mut reporter,
    );

    let mut names: Vec<_> = table
        .iter()
        .map(|(id, person)| format!("{}={}", id, person.name))
        .collect();
    names.sort();
    assert_eq!(names, ["1=Alicia", "2=Bob"]);
}
