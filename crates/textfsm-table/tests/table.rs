use std::io::Cursor;

use pretty_assertions::assert_eq;
use textfsm_table::{Cell, TableError, TextTable};

fn basic_table() -> TextTable {
    let mut t = TextTable::with_header(["a", "b", "c"]).unwrap();
    t.append(["1", "2", "3"]).unwrap();
    t.append(["10", "20", "30"]).unwrap();
    t
}

#[test]
fn string_form() {
    assert_eq!(basic_table().to_string(), "a, b, c\n1, 2, 3\n10, 20, 30\n");
}

#[test]
fn append_coerces_scalars() {
    let mut t = basic_table();
    t.append([Cell::from(1i64), Cell::from("two"), Cell::from(3i64)])
        .unwrap();
    assert_eq!(
        t.row(3).unwrap().values(),
        [Cell::from("1"), Cell::from("two"), Cell::from("3")]
    );
    assert_eq!(t.size(), 3);
}

#[test]
fn append_keeps_lists_for_display() {
    let mut t = basic_table();
    t.append([
        Cell::from("one"),
        Cell::List(vec!["two".to_string(), "2".to_string()]),
        Cell::from(""),
    ])
    .unwrap();
    assert_eq!(t.row(3).unwrap().values()[1].to_string(), "two, 2");
}

#[test]
fn append_map_requires_all_columns_and_ignores_extras() {
    let mut t = basic_table();
    t.append_map([
        ("a", Cell::from("11")),
        ("b", Cell::from("12")),
        ("c", Cell::from("13")),
        ("d", Cell::from("14")),
    ])
    .unwrap();
    assert_eq!(
        t.row(3).unwrap().values(),
        [Cell::from("11"), Cell::from("12"), Cell::from("13")]
    );

    assert!(matches!(
        t.append_map([("a", Cell::from("1")), ("b", Cell::from("2"))]),
        Err(TableError::MissingColumn(_))
    ));
}

#[test]
fn append_validates_row_length() {
    let mut t = basic_table();
    assert!(matches!(
        t.append(["20", "30"]),
        Err(TableError::RowLength { want: 3, got: 2 })
    ));
    assert!(matches!(
        t.append(["1", "2", "3", "4"]),
        Err(TableError::RowLength { want: 3, got: 4 })
    ));
}

#[test]
fn rows_know_their_index_and_it_survives_mutation() {
    let mut t = basic_table();
    t.append(["x", "y", "z"]).unwrap();
    for (expected, row) in (1..).zip(t.rows()) {
        assert_eq!(row.index(), expected);
    }

    t.remove(1).unwrap();
    assert_eq!(t.size(), 2);
    assert_eq!(t.row(1).unwrap().values()[0], Cell::from("10"));
    for (expected, row) in (1..).zip(t.rows()) {
        assert_eq!(row.index(), expected);
    }

    assert!(matches!(t.remove(0), Err(TableError::RowIndex(0))));
    assert!(matches!(t.remove(9), Err(TableError::RowIndex(9))));
}

#[test]
fn row_with_finds_the_first_match() {
    let t = basic_table();
    assert_eq!(t.row_with("a", "10").unwrap().index(), 2);
    assert!(matches!(
        t.row_with("g", "5"),
        Err(TableError::UnknownColumn(_))
    ));
    assert!(matches!(
        t.row_with("a", "5"),
        Err(TableError::NoMatchingRow { .. })
    ));
}

#[test]
fn add_column_positions() {
    let mut t = basic_table();
    t.add_column("Beer", "", -1).unwrap();
    assert_eq!(t.header(), ["a", "b", "c", "Beer"]);
    assert_eq!(
        t.row(2).unwrap().values(),
        [
            Cell::from("10"),
            Cell::from("20"),
            Cell::from("30"),
            Cell::from("")
        ]
    );

    t.add_column("Wine", "Merlot", 1).unwrap();
    assert_eq!(t.header(), ["a", "Wine", "b", "c", "Beer"]);
    assert_eq!(t.row(2).unwrap().values()[1], Cell::from("Merlot"));

    t.add_column("Spirits", "", -2).unwrap();
    assert_eq!(t.header(), ["a", "Wine", "b", "Spirits", "c", "Beer"]);

    assert!(matches!(
        t.add_column("x", "", 7),
        Err(TableError::ColumnIndex(7))
    ));
    assert!(matches!(
        t.add_column("x", "", -8),
        Err(TableError::ColumnIndex(-8))
    ));
    assert!(matches!(
        t.add_column("b", "", -1),
        Err(TableError::DuplicateColumn(_))
    ));
}

#[test]
fn extend_joins_on_explicit_keys() {
    let mut t2 = basic_table();
    t2.add_column("Beer", "", -1).unwrap();
    t2.set_cell(1, "Beer", Cell::from("Lager")).unwrap();
    t2.append(["one", "two", "three", "Stout"]).unwrap();

    let mut t = basic_table();
    t.extend(&t2, Some(&["a".to_string()])).unwrap();
    assert_eq!(t.header(), ["a", "b", "c", "Beer"]);
    // Only the new columns pick up values.
    assert_eq!(
        t.row(1).unwrap().values(),
        [
            Cell::from("1"),
            Cell::from("2"),
            Cell::from("3"),
            Cell::from("Lager")
        ]
    );
    // Every row is widened, matched or not.
    assert_eq!(t.row(2).unwrap().values()[3], Cell::from(""));
    // Unmatched rows of the other table are not imported.
    assert_eq!(t.size(), 2);
}

#[test]
fn extend_uses_the_first_match_for_duplicate_keys() {
    let mut t2 = basic_table();
    t2.add_column("Beer", "", -1).unwrap();
    t2.set_cell(1, "Beer", Cell::from("Lager")).unwrap();
    t2.append(["one", "two", "three", "Stout"]).unwrap();
    t2.append(["1", "two", "", "Ale"]).unwrap();

    let mut t = basic_table();
    t.append(["1", "2b", "3b"]).unwrap();
    t.extend(&t2, Some(&["a".to_string()])).unwrap();
    assert_eq!(t.row(1).unwrap().values()[3], Cell::from("Lager"));
    assert_eq!(
        t.row(3).unwrap().values(),
        [
            Cell::from("1"),
            Cell::from("2b"),
            Cell::from("3b"),
            Cell::from("Lager")
        ]
    );
}

#[test]
fn extend_without_keys_joins_on_row_number() {
    let mut t2 = basic_table();
    t2.add_column("Beer", "", -1).unwrap();
    t2.set_cell(1, "Beer", Cell::from("Lager")).unwrap();
    t2.append(["one", "two", "three", "Stout"]).unwrap();

    let mut t = basic_table();
    t.extend(&t2, None).unwrap();
    assert_eq!(t.header(), ["a", "b", "c", "Beer"]);
    assert_eq!(t.row(1).unwrap().values()[3], Cell::from("Lager"));
    assert_eq!(t.row(2).unwrap().values()[3], Cell::from(""));
    assert_eq!(t.size(), 2);
}

#[test]
fn extend_superkey_needs_every_column_to_agree() {
    let mut t = basic_table();
    t.append(["1", "two", "3"]).unwrap();
    t.append(["two", "1", "three"]).unwrap();
    let mut t2 = TextTable::with_header(["a", "b", "c", "Beer"]).unwrap();
    t2.append(["1", "two", "three", "Stout"]).unwrap();

    t.extend(&t2, Some(&["a".to_string(), "b".to_string()]))
        .unwrap();
    assert_eq!(t.row(1).unwrap().values()[3], Cell::from(""));
    assert_eq!(t.row(3).unwrap().values()[3], Cell::from("Stout"));
    assert_eq!(t.row(4).unwrap().values()[3], Cell::from(""));
    assert_eq!(t.size(), 4);

    assert!(matches!(
        t.extend(&t2, Some(&["a".to_string(), "bogus".to_string()])),
        Err(TableError::UnknownColumn(_))
    ));
}

#[test]
fn label_value_table_output() {
    let t = basic_table();
    assert_eq!(
        t.label_value_table(None).unwrap(),
        "# LABEL a\n1.b 2\n1.c 3\n10.b 20\n10.c 30\n"
    );
    assert_eq!(
        t.label_value_table(Some(&["a".to_string()])).unwrap(),
        "# LABEL a\n1.b 2\n1.c 3\n10.b 20\n10.c 30\n"
    );
    assert_eq!(
        t.label_value_table(Some(&["a".to_string(), "c".to_string()]))
            .unwrap(),
        "# LABEL a.c\n1.3.b 2\n10.30.b 20\n"
    );
    // Key order follows the header, not the argument.
    assert_eq!(
        t.label_value_table(Some(&["c".to_string(), "a".to_string()]))
            .unwrap(),
        "# LABEL a.c\n1.3.b 2\n10.30.b 20\n"
    );
    assert!(matches!(
        t.label_value_table(Some(&["a".to_string(), "z".to_string()])),
        Err(TableError::UnknownColumn(_))
    ));
}

#[test]
fn csv_ingest() {
    let buf = "\n    # A comment\na,b, c, d  # Trim comment\n# Inline comment\n# 1,2,3,4\n\
               1,2,3,4\n5, 6, 7, 8\n10, 11\n# More comments.\n";
    let mut t = TextTable::new();
    assert_eq!(t.csv_to_table(Cursor::new(buf)).unwrap(), 2);
    assert_eq!(t.header(), ["a", "b", "c", "d"]);
    assert_eq!(
        t.row(1).unwrap().values(),
        [
            Cell::from("1"),
            Cell::from("2"),
            Cell::from("3"),
            Cell::from("4")
        ]
    );
    assert_eq!(
        t.row(2).unwrap().values(),
        [
            Cell::from("5"),
            Cell::from("6"),
            Cell::from("7"),
            Cell::from("8")
        ]
    );
    assert_eq!(t.size(), 2);
}

fn sortable_table() -> TextTable {
    let mut t = TextTable::with_header(["Col1", "Col2", "Col3"]).unwrap();
    t.append(["lorem", "ipsum", "dolor"]).unwrap();
    t.append(["ut", "enim", "ad"]).unwrap();
    t.append(["duis", "aute", "irure"]).unwrap();
    t
}

#[test]
fn sort_by_whole_row_and_by_keys() {
    let mut t = sortable_table();
    t.sort();
    assert_eq!(t.row(1).unwrap().values()[0], Cell::from("duis"));
    assert_eq!(t.row(2).unwrap().values()[0], Cell::from("lorem"));
    assert_eq!(t.row(3).unwrap().values()[0], Cell::from("ut"));

    let mut t = sortable_table();
    t.sort_with(Some(&["Col2".to_string()]), false).unwrap();
    assert_eq!(t.row(1).unwrap().values()[0], Cell::from("duis"));
    assert_eq!(t.row(2).unwrap().values()[0], Cell::from("ut"));
    assert_eq!(t.row(3).unwrap().values()[0], Cell::from("lorem"));

    // More than one key; ties break on the later column.
    let mut t = sortable_table();
    t.append(["duis", "aute", "aute"]).unwrap();
    t.sort_with(Some(&["Col2".to_string(), "Col3".to_string()]), false)
        .unwrap();
    assert_eq!(t.row(1).unwrap().values()[2], Cell::from("aute"));
    assert_eq!(t.row(2).unwrap().values()[2], Cell::from("irure"));

    let mut t = sortable_table();
    t.sort_with(Some(&["Col2".to_string()]), true).unwrap();
    assert_eq!(t.row(1).unwrap().values()[0], Cell::from("lorem"));
    assert_eq!(t.row(2).unwrap().values()[0], Cell::from("ut"));
    assert_eq!(t.row(3).unwrap().values()[0], Cell::from("duis"));

    assert!(matches!(
        sortable_table().sort_with(Some(&["bogus".to_string()]), false),
        Err(TableError::UnknownColumn(_))
    ));
}

#[test]
fn header_columns_must_be_unique() {
    assert!(matches!(
        TextTable::with_header(["a", "b", "a"]),
        Err(TableError::DuplicateColumn(_))
    ));
}
