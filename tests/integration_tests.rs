use chrono::NaiveDate;
use roster::report::{MemoryReporter, RowError, WriterReporter};
use roster::session::{Session, PROMPT};
use roster::{parse_records, PersonId};

const PEOPLE: &str = "Name,ID,Birthday\r\n\
    Alice,1,05/12/1990\r\n\
    Bob,2,31/02/1999\r\n\
    Carol,3\r\n\
    \r\n\
    Dan,4,01/01/2001\r\n";

#[test]
fn sanity() {
    let mut reporter = MemoryReporter::default();
    let table = parse_records(PEOPLE, &mut reporter);

    assert_eq!(table.len(), 2);
    assert_eq!(
        table.get(&PersonId::Number(4)).map(|p| p.birthday),
        NaiveDate::from_ymd_opt(2001, 1, 1)
    );
    assert_eq!(
        reporter.errors(),
        &[
            RowError::new(3, Some(PersonId::Number(2))),
            RowError::new(4, None)
        ]
    );
}

#[test]
fn error_log_lines() {
    let mut reporter = WriterReporter::new(Vec::new());
    parse_records(PEOPLE, &mut reporter);

    assert_eq!(
        reporter.into_inner(),
        b"Error processing line #3 for ID #2\nError processing line #4 for ID #<unknown>\n"
    );
}

#[test]
fn lookup_session() {
    let mut reporter = MemoryReporter::default();
    let table = parse_records(PEOPLE, &mut reporter);

    let mut output = Vec::new();
    Session::new(&table, &b"2\nfour\n4\n0\n"[..], &mut output)
        .run()
        .unwrap();

    assert_eq!(
        String::from_utf8(output).unwrap(),
        format!(
            "{p}No user found with that id\n\
             {p}Please enter an integer ID.\n\
             {p}Person #4 is Dan with a birthday of 2001-01-01\n\
             {p}",
            p = PROMPT
        )
    );
}

#[test]
fn oversized_ids_round_trip_through_session() {
    let mut reporter = MemoryReporter::default();
    let table = parse_records(
        "id,name,birthday\n00123456789012345678901,Eve,24/12/1980\n",
        &mut reporter,
    );

    let mut output = Vec::new();
    Session::new(
        &table,
        &b"123456789012345678901\n99999999999999999999\n-99999999999999999999\n1\n"[..],
        &mut output,
    )
    .run()
    .unwrap();

    assert_eq!(
        String::from_utf8(output).unwrap(),
        format!(
            "{p}Person #123456789012345678901 is Eve with a birthday of 1980-12-24\n\
             {p}No user found with that id\n\
             {p}",
            p = PROMPT
        )
    );
}
