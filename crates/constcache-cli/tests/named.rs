#![allow(clippy::unwrap_used)]

mod common;

use common::Workspace;
use predicates::prelude::*;

#[test]
fn named_accessor_returns_the_record() {
    let ws = Workspace::new();

    ws.cmd()
        .args(["named", "ConstantNamedPie", "tasty_beef_steak"])
        .assert()
        .success()
        .stdout("filling=Tasty beef steak id=1\n");
}

#[test]
fn prefixed_accessor_names() {
    let ws = Workspace::new();

    ws.cmd()
        .args(["named", "ConstantLongNamedPie", "a_mince_pie"])
        .assert()
        .success()
        .stdout(predicate::str::contains("id=3"));
}

#[test]
fn unknown_accessor_exits_non_zero() {
    let ws = Workspace::new();

    ws.cmd()
        .args(["named", "ConstantNamedPie", "unicorn_and_thyme"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("unicorn_and_thyme"));
}

#[test]
fn accessors_listed_in_record_order() {
    let ws = Workspace::new();

    ws.cmd()
        .args(["accessors", "ConstantNamedPie"])
        .assert()
        .success()
        .stdout("tasty_beef_steak\ntasty_mushrooms_with_tarragon\nmince\n");
}

#[test]
fn tables_without_a_name_field_have_no_accessors() {
    let ws = Workspace::new();

    ws.cmd()
        .args(["--format", "json", "accessors", "pies"])
        .assert()
        .success()
        .stdout("[]\n");
}
