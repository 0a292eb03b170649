use std::path::Path;

use crate::chunk_name;
use crate::repl::should_continue_multiline;

#[test]
fn chunk_name_uses_the_file_stem() {
    assert_eq!(chunk_name(Path::new("scripts/demo.luma")), "demo");
    assert_eq!(chunk_name(Path::new("plain")), "plain");
}

#[test]
fn multiline_continues_while_blocks_are_open() {
    assert!(should_continue_multiline("local f = function(x)"));
    assert!(should_continue_multiline("if x then"));
    assert!(should_continue_multiline("while x do\nprint(x)"));
    assert!(should_continue_multiline("local t = {"));
    assert!(should_continue_multiline("f(1,"));
}

#[test]
fn multiline_stops_when_balanced() {
    assert!(!should_continue_multiline("local x = 1"));
    assert!(!should_continue_multiline("if x then y = 1 end"));
    assert!(!should_continue_multiline("local f = function(x) return x end"));
    assert!(!should_continue_multiline("local t = { a = 1 }"));
}

#[test]
fn multiline_ignores_strings_and_comments() {
    assert!(!should_continue_multiline("print(\"function if do {\")"));
    assert!(!should_continue_multiline("local x = 1 -- if function ("));
    assert!(!should_continue_multiline("print('do')"));
}
