use anyhow::Result;
use rustyline::{DefaultEditor, error::ReadlineError};

use luma_core::Engine;
use luma_core::rt::RuntimeError;

pub fn run() -> Result<()> {
    eprintln!("Luma REPL — :quit to exit");
    let mut editor = DefaultEditor::new()?;
    let mut engine = Engine::new();
    let mut buffer = String::new();

    loop {
        let prompt = if buffer.is_empty() { "> " } else { ">> " };
        match editor.readline(prompt) {
            Ok(line) => {
                if buffer.is_empty() && matches!(line.trim(), ":quit" | ":exit" | ":q") {
                    break;
                }
                if !buffer.is_empty() {
                    buffer.push('\n');
                }
                buffer.push_str(&line);
                if should_continue_multiline(&buffer) {
                    continue;
                }
                let source = std::mem::take(&mut buffer);
                if source.trim().is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(source.as_str());
                dispatch(&mut engine, &source);
            }
            Err(ReadlineError::Interrupted) => {
                buffer.clear();
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

/// Evaluate as an expression first so `1 + 1` prints its value; fall back to
/// statement execution. A runtime failure from the expression path is final,
/// only parse failures fall through.
fn dispatch(engine: &mut Engine, source: &str) {
    match engine.eval_expr(source) {
        Ok(value) => {
            if !value.is_nil() {
                println!("{}", value);
            }
        }
        Err(err) if err.downcast_ref::<RuntimeError>().is_some() => report(&err),
        Err(_) => match engine.exec(source) {
            Ok(value) => {
                if !value.is_nil() {
                    println!("{}", value);
                }
            }
            Err(err) => report(&err),
        },
    }
}

fn report(err: &anyhow::Error) {
    match err.downcast_ref::<RuntimeError>() {
        Some(rt) => eprintln!("{}", rt.full_message()),
        None => eprintln!("{}", err),
    }
}

/// Bracket/block balance check driving multiline input: keep reading while
/// a delimiter or a `function`/`if`/`do` block is still open. Strings and
/// comments are skipped so their contents cannot unbalance the count.
pub(crate) fn should_continue_multiline(buf: &str) -> bool {
    let mut paren = 0i32;
    let mut brace = 0i32;
    let mut bracket = 0i32;
    let mut blocks = 0i32;
    let mut word = String::new();
    let mut in_string: Option<char> = None;
    let mut in_comment = false;

    let mut chars = buf.chars().peekable();
    while let Some(c) = chars.next() {
        if in_comment {
            if c == '\n' {
                in_comment = false;
            }
            continue;
        }
        if let Some(quote) = in_string {
            if c == '\\' {
                chars.next();
            } else if c == quote {
                in_string = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => in_string = Some(c),
            '-' if chars.peek() == Some(&'-') => {
                chars.next();
                in_comment = true;
            }
            '(' => paren += 1,
            ')' => paren -= 1,
            '{' => brace += 1,
            '}' => brace -= 1,
            '[' => bracket += 1,
            ']' => bracket -= 1,
            _ => {}
        }
        if c.is_ascii_alphanumeric() || c == '_' {
            word.push(c);
        } else {
            flush_word(&word, &mut blocks);
            word.clear();
        }
    }
    flush_word(&word, &mut blocks);

    paren > 0 || brace > 0 || bracket > 0 || blocks > 0
}

fn flush_word(word: &str, blocks: &mut i32) {
    // `while cond do` and `if cond then` each open exactly one block, so
    // only the tokens that demand an `end` are counted.
    match word {
        "function" | "if" | "do" => *blocks += 1,
        "end" => *blocks -= 1,
        _ => {}
    }
}
