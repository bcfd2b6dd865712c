use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const SUM: &str = "%tokens NUM@ PLUS %end\nsum : NUM PLUS NUM {} : NUM {}\n";

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn compile_emits_c_table_with_enums() {
    let dir = TempDir::new().unwrap();
    let grammar = write(dir.path(), "sum.sapcc", SUM);

    let mut cmd = cargo_bin_cmd!("sapcc");
    cmd.current_dir(dir.path()).arg("compile").arg(&grammar);

    cmd.assert().success().stdout(
        predicate::str::contains("_TOK_NUM = 500,")
            .and(predicate::str::contains("static const uint16_t parser_table[] = {"))
            .and(predicate::str::contains("3, _TOK_NUM, _TOK_PLUS, _TOK_NUM,")),
    );
}

#[test]
fn compile_words_format() {
    let dir = TempDir::new().unwrap();
    let grammar = write(dir.path(), "sum.sapcc", SUM);

    let mut cmd = cargo_bin_cmd!("sapcc");
    cmd.current_dir(dir.path())
        .args(["compile", "--format", "words"])
        .arg(&grammar);

    cmd.assert()
        .success()
        .stdout("1\n10 1000 100 2 3 500 501 500 1 500\n");
}

#[test]
fn compile_numeric_table_to_file() {
    let dir = TempDir::new().unwrap();
    let grammar = write(dir.path(), "sum.sapcc", SUM);
    let out = dir.path().join("table.c");

    let mut cmd = cargo_bin_cmd!("sapcc");
    cmd.current_dir(dir.path())
        .args(["compile", "--numeric", "--table-name", "sum_table", "-o"])
        .arg(&out)
        .arg(&grammar);
    cmd.assert().success().stdout(predicate::str::is_empty());

    let table = fs::read_to_string(&out).unwrap();
    assert!(table.starts_with("// parser table encoding\nstatic const uint16_t sum_table[] = {"));
    assert!(table.contains("        3, 500, 501, 500,\n"));
    assert!(!table.contains("typedef enum"));
}

#[test]
fn config_file_selects_output_format() {
    let dir = TempDir::new().unwrap();
    let grammar = write(dir.path(), "sum.sapcc", SUM);
    write(dir.path(), "sapcc.toml", "[output]\nformat = \"json\"\n");

    let mut cmd = cargo_bin_cmd!("sapcc");
    cmd.current_dir(dir.path()).arg("compile").arg(&grammar);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"records\"").and(predicate::str::contains("\"name\": \"sum\"")));
}

#[test]
fn invalid_grammar_fails_with_diagnostics() {
    let dir = TempDir::new().unwrap();
    let grammar = write(dir.path(), "bad.sapcc", "%tokens A %end\nstart : A B {}\n");

    let mut cmd = cargo_bin_cmd!("sapcc");
    cmd.current_dir(dir.path()).arg("check").arg(&grammar);

    cmd.assert()
        .failure()
        .stderr(
            predicate::str::contains("semantic error:")
                .and(predicate::str::contains("undefined symbol B in a rule of start"))
                .and(predicate::str::contains("1 error(s), 0 warning(s)")),
        );
}

#[test]
fn warnings_do_not_fail_the_check() {
    let dir = TempDir::new().unwrap();
    let grammar = write(dir.path(), "spare.sapcc", "%tokens USED SPARE %end\nstart : USED {}\n");

    let mut cmd = cargo_bin_cmd!("sapcc");
    cmd.current_dir(dir.path()).arg("check").arg(&grammar);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("2 terminal(s), 1 non-terminal(s)"))
        .stderr(
            predicate::str::contains("terminal symbol \"SPARE\" has no references in grammar")
                .and(predicate::str::contains("0 error(s), 1 warning(s)")),
        );
}

#[test]
fn missing_grammar_file() {
    let dir = TempDir::new().unwrap();

    let mut cmd = cargo_bin_cmd!("sapcc");
    cmd.current_dir(dir.path()).args(["check", "nope.sapcc"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("cannot compile nope.sapcc"));
}

#[test]
fn dump_lists_symbols() {
    let dir = TempDir::new().unwrap();
    let grammar = write(dir.path(), "sum.sapcc", SUM);

    let mut cmd = cargo_bin_cmd!("sapcc");
    cmd.current_dir(dir.path()).arg("dump").arg(&grammar);

    cmd.assert().success().stdout(
        predicate::str::contains("TERMINALS:")
            .and(predicate::str::contains("NUM"))
            .and(predicate::str::contains("PLUS")),
    );
}

#[test]
fn parse_trace_prints_ast() {
    let dir = TempDir::new().unwrap();
    let grammar = write(dir.path(), "sum.sapcc", SUM);
    let trace = write(dir.path(), "input.trace", "NUM=1 PLUS\nNUM=2\n");

    let mut cmd = cargo_bin_cmd!("sapcc");
    cmd.current_dir(dir.path()).arg("parse").arg(&grammar).arg(&trace);

    cmd.assert()
        .success()
        .stdout("sum #0\n  NUM \"1\"\n  PLUS\n  NUM \"2\"\n");
}

#[test]
fn parse_trace_as_json() {
    let dir = TempDir::new().unwrap();
    let grammar = write(dir.path(), "sum.sapcc", SUM);
    let trace = write(dir.path(), "input.trace", "NUM=7");

    let mut cmd = cargo_bin_cmd!("sapcc");
    cmd.current_dir(dir.path())
        .args(["parse", "--json"])
        .arg(&grammar)
        .arg(&trace);

    let output = cmd.assert().success().get_output().stdout.clone();
    let ast: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(ast["kind"], 1000);
    assert_eq!(ast["alternative"], 1);
}

#[test]
fn parse_reports_syntax_error() {
    let dir = TempDir::new().unwrap();
    let grammar = write(dir.path(), "sum.sapcc", SUM);
    let trace = write(dir.path(), "input.trace", "PLUS NUM");

    let mut cmd = cargo_bin_cmd!("sapcc");
    cmd.current_dir(dir.path()).arg("parse").arg(&grammar).arg(&trace);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("syntax error:").and(predicate::str::contains("expected NUM")));
}

#[test]
fn parse_partial_accepts_trailing_input() {
    let dir = TempDir::new().unwrap();
    let grammar = write(dir.path(), "sum.sapcc", SUM);
    let trace = write(dir.path(), "input.trace", "NUM NUM");

    let mut complete = cargo_bin_cmd!("sapcc");
    complete.current_dir(dir.path()).arg("parse").arg(&grammar).arg(&trace);
    complete.assert().failure().stderr(predicate::str::contains("expected end of input"));

    let mut partial = cargo_bin_cmd!("sapcc");
    partial
        .current_dir(dir.path())
        .args(["parse", "--partial"])
        .arg(&grammar)
        .arg(&trace);
    partial.assert().success().stdout("sum #1\n  NUM\n");
}
