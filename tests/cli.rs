use std::fs;
use std::path::Path;

use assert_cmd::Command;
use tempfile::TempDir;

const TEMPLATE: &str = "Value boo (.*)\n\nStart\n  ^$boo -> Next.Record\n\nEOF\n";
const INPUT: &str = "Matching text\nAnd again";

fn textfsm() -> Command {
    Command::cargo_bin("textfsm").expect("binary builds")
}

fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn reprints_the_canonical_template() {
    let dir = TempDir::new().unwrap();
    let template = write(dir.path(), "simple.textfsm", TEMPLATE);
    textfsm().arg(&template).assert().success().stdout(
        "FSM Template:\nValue boo (.*)\n\nStart\n  ^$boo -> Next.Record\n\nEOF\n\n",
    );
}

#[test]
fn parses_input_into_a_table() {
    let dir = TempDir::new().unwrap();
    let template = write(dir.path(), "simple.textfsm", TEMPLATE);
    let input = write(dir.path(), "input.txt", INPUT);
    textfsm().arg(&template).arg(&input).assert().success().stdout(
        "FSM Template:\nValue boo (.*)\n\nStart\n  ^$boo -> Next.Record\n\nEOF\n\n\
         FSM Table:\nboo\nMatching text\nAnd again\n",
    );
}

#[test]
fn formatted_output_pads_columns() {
    let dir = TempDir::new().unwrap();
    let template = write(dir.path(), "simple.textfsm", TEMPLATE);
    let input = write(dir.path(), "input.txt", "one\ntwo");
    textfsm()
        .arg("--format")
        .arg(&template)
        .arg(&input)
        .assert()
        .success()
        .stdout(
            "FSM Template:\nValue boo (.*)\n\nStart\n  ^$boo -> Next.Record\n\nEOF\n\n\
             FSM Table:\n boo \n=====\n one \n two \n",
        );
}

#[test]
fn json_output_keys_rows_by_header() {
    let dir = TempDir::new().unwrap();
    let template = write(dir.path(), "simple.textfsm", TEMPLATE);
    let input = write(dir.path(), "input.txt", "Matching text");
    textfsm()
        .arg("--json")
        .arg(&template)
        .arg(&input)
        .assert()
        .success()
        .stdout(
            "FSM Template:\nValue boo (.*)\n\nStart\n  ^$boo -> Next.Record\n\nEOF\n\n\
             FSM Table:\n[\n  {\n    \"boo\": \"Matching text\"\n  }\n]\n",
        );
}

#[test]
fn compares_against_expected_output() {
    let dir = TempDir::new().unwrap();
    let template = write(dir.path(), "simple.textfsm", TEMPLATE);
    let input = write(dir.path(), "input.txt", INPUT);
    let good = write(dir.path(), "good.txt", "boo\nMatching text\nAnd again\n");
    let bad = write(dir.path(), "bad.txt", "boo\nSomething else\n");

    textfsm()
        .arg(&template)
        .arg(&input)
        .arg(&good)
        .assert()
        .success();
    textfsm()
        .arg(&template)
        .arg(&input)
        .arg(&bad)
        .assert()
        .code(1);
}

#[test]
fn failures_exit_with_two() {
    let dir = TempDir::new().unwrap();
    // Missing template file.
    textfsm()
        .arg(dir.path().join("no_such.textfsm"))
        .assert()
        .code(2);

    // Template error.
    let broken = write(dir.path(), "broken.textfsm", "Value boo (.*\n\nStart\n");
    textfsm().arg(&broken).assert().code(2);

    // Error operator during the parse.
    let template = write(
        dir.path(),
        "error.textfsm",
        "Value boo (.*)\n\nStart\n  ^$boo -> Error \"bad input\"\n",
    );
    let input = write(dir.path(), "input.txt", "anything");
    textfsm().arg(&template).arg(&input).assert().code(2);

    // No arguments at all.
    textfsm().assert().code(2);
}
