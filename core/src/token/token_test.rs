use crate::token::{Token, Tokenizer};

fn toks(src: &str) -> Vec<Token> {
    Tokenizer::tokenize(src).expect("tokenize").0
}

#[test]
fn symbols_and_keywords() {
    assert_eq!(
        toks("local x = 1 + 2"),
        vec![
            Token::Local,
            Token::Id("x".into()),
            Token::Assign,
            Token::Int(1),
            Token::Add,
            Token::Int(2),
        ]
    );
    assert_eq!(
        toks("a ~= b and a == b or not a"),
        vec![
            Token::Id("a".into()),
            Token::Ne,
            Token::Id("b".into()),
            Token::And,
            Token::Id("a".into()),
            Token::Eq,
            Token::Id("b".into()),
            Token::Or,
            Token::Not,
            Token::Id("a".into()),
        ]
    );
}

#[test]
fn colon_and_call_syntax() {
    assert_eq!(
        toks("obj:method(1)"),
        vec![
            Token::Id("obj".into()),
            Token::Colon,
            Token::Id("method".into()),
            Token::LParen,
            Token::Int(1),
            Token::RParen,
        ]
    );
    // The bare reference form lexes the same way; disambiguation is the
    // parser's job.
    assert_eq!(
        toks("obj:method"),
        vec![Token::Id("obj".into()), Token::Colon, Token::Id("method".into())]
    );
}

#[test]
fn concat_vs_dot() {
    assert_eq!(
        toks("a.b .. c"),
        vec![
            Token::Id("a".into()),
            Token::Dot,
            Token::Id("b".into()),
            Token::Concat,
            Token::Id("c".into()),
        ]
    );
}

#[test]
fn numbers() {
    assert_eq!(toks("42"), vec![Token::Int(42)]);
    assert_eq!(toks("1.5"), vec![Token::Float(1.5)]);
    assert_eq!(toks("2e3"), vec![Token::Float(2000.0)]);
    assert_eq!(toks("1.5e-1"), vec![Token::Float(0.15)]);
    // "1..2" is integer, concat, integer.
    assert_eq!(toks("1..2"), vec![Token::Int(1), Token::Concat, Token::Int(2)]);
    assert!(Tokenizer::tokenize("1abc").is_err());
}

#[test]
fn strings_and_escapes() {
    assert_eq!(toks("\"hi\""), vec![Token::Str("hi".into())]);
    assert_eq!(toks("'hi'"), vec![Token::Str("hi".into())]);
    assert_eq!(toks("\"a\\tb\\n\""), vec![Token::Str("a\tb\n".into())]);
    assert!(Tokenizer::tokenize("\"unterminated").is_err());
    assert!(Tokenizer::tokenize("\"bad\\qescape\"").is_err());
}

#[test]
fn comments() {
    assert_eq!(toks("1 -- trailing\n+ 2"), vec![Token::Int(1), Token::Add, Token::Int(2)]);
    assert_eq!(toks("--[[ block\ncomment ]] 7"), vec![Token::Int(7)]);
    assert!(Tokenizer::tokenize("--[[ never closed").is_err());
}

#[test]
fn token_positions_track_lines() {
    let (tokens, positions) = Tokenizer::tokenize("local x\nx = 2\n").expect("tokenize");
    assert_eq!(tokens.len(), positions.len());
    assert_eq!(positions[0].line, 1); // local
    assert_eq!(positions[1].line, 1); // x
    assert_eq!(positions[2].line, 2); // x
    assert_eq!(positions[3].line, 2); // =
    assert_eq!(positions[2].column, 1);
}

#[test]
fn rejects_stray_tilde() {
    assert!(Tokenizer::tokenize("a ~ b").is_err());
}
