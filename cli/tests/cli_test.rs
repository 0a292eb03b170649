use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::NamedTempFile;

fn luma() -> Command {
    Command::cargo_bin("luma").expect("binary built")
}

fn script(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".luma")
        .tempfile()
        .expect("create temp script");
    file.write_all(contents.as_bytes()).expect("write script");
    file
}

#[test]
fn runs_a_script_file() {
    let file = script(
        "local t = { m = function(self) return \"ok\" end }\n\
         local r = t:m\n\
         print(r())\n",
    );
    luma()
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("ok"));
}

#[test]
fn bound_reference_equality_from_a_script() {
    let file = script(
        "local t = { m = function(self) return 1 end }\n\
         print((t:m) == (t:m))\n\
         print((t:m) == (t.m))\n",
    );
    luma()
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("true").and(predicate::str::contains("false")));
}

#[test]
fn eval_flag_prints_the_value() {
    luma().args(["-e", "1 + 2"]).assert().success().stdout("3\n");
    luma()
        .args(["-e", "\"a\" .. \"b\""])
        .assert()
        .success()
        .stdout("ab\n");
}

#[test]
fn dump_ast_emits_json() {
    let file = script("return t:m\n");
    luma()
        .arg("--dump-ast")
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("MethodRef").and(predicate::str::contains("\"method\": \"m\"")));
}

#[test]
fn runtime_errors_report_a_traceback() {
    let file = script(
        "local t = { fn = function(self) error(\"boom\") end }\n\
         t:fn()\n",
    );
    luma()
        .arg(file.path())
        .assert()
        .failure()
        .stderr(
            predicate::str::contains("boom")
                .and(predicate::str::contains("stack traceback:"))
                .and(predicate::str::contains("in main chunk")),
        );
}

#[test]
fn syntax_errors_fail_with_a_message() {
    let file = script("local x = a.b:c\n");
    luma()
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("function arguments expected"));
}

#[test]
fn missing_file_fails() {
    luma().arg("does-not-exist.luma").assert().failure();
}
