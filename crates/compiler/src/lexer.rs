//! SPL tokenizer
//!
//! Streams source text into whitespace-separated tokens. Four things need
//! more than a straight split: string constants (either quote character,
//! delimiters preserved in the token), `#` line comments, `/* ... */`
//! block comments, and `/# ... #/` inline assembly blocks, which become a
//! single token with their interior bytes, newlines included, verbatim.
//!
//! Whitespace is any character `<= ' '`. Tokens carry no position data;
//! diagnostics quote the offending token text instead.

/// Lexical mode. `Normal` is between tokens.
#[derive(Clone, Copy)]
enum Mode {
    Normal,
    /// Accumulating an ordinary token.
    InToken,
    /// Inside a string constant started by `delim`.
    Str { delim: char },
    /// After `#`, discarding until end of line.
    LineComment,
    /// Inside `/* ... */`. `closing` is set right after a `*`.
    BlockComment { closing: bool },
    /// Inside `/# ... #/`. `closing` is set right after a `#`.
    InlineAsm { closing: bool },
}

/// Break source text into tokens.
///
/// An unterminated string, block comment, or inline assembly block at end
/// of input is an error.
pub fn tokenize(source: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut mode = Mode::Normal;

    for c in source.chars() {
        match mode {
            Mode::Normal => {
                if c == '"' || c == '\'' {
                    current.push(c);
                    mode = Mode::Str { delim: c };
                } else if c == '#' {
                    mode = Mode::LineComment;
                } else if c > ' ' {
                    current.push(c);
                    mode = Mode::InToken;
                }
            }
            Mode::InToken => {
                if current == "/" && c == '#' {
                    // a bare slash upgrades to an inline assembly block
                    current.push(c);
                    mode = Mode::InlineAsm { closing: false };
                } else if current == "/" && c == '*' {
                    current.clear();
                    mode = Mode::BlockComment { closing: false };
                } else if c <= ' ' {
                    tokens.push(std::mem::take(&mut current));
                    mode = Mode::Normal;
                } else {
                    current.push(c);
                }
            }
            Mode::Str { delim } => {
                current.push(c);
                if c == delim {
                    tokens.push(std::mem::take(&mut current));
                    mode = Mode::Normal;
                }
            }
            Mode::LineComment => {
                if c == '\n' {
                    mode = Mode::Normal;
                }
            }
            Mode::BlockComment { closing } => {
                if closing && c == '/' {
                    mode = Mode::Normal;
                } else {
                    // only a `*` immediately followed by `/` closes
                    mode = Mode::BlockComment {
                        closing: !closing && c == '*',
                    };
                }
            }
            Mode::InlineAsm { closing } => {
                current.push(c);
                if closing && c == '/' {
                    tokens.push(std::mem::take(&mut current));
                    mode = Mode::Normal;
                } else {
                    mode = Mode::InlineAsm {
                        closing: !closing && c == '#',
                    };
                }
            }
        }
    }

    match mode {
        Mode::Str { .. } => {
            return Err(format!("Unterminated string constant: {}", current));
        }
        Mode::BlockComment { .. } => {
            return Err("Unterminated block comment".to_string());
        }
        Mode::InlineAsm { .. } => {
            return Err("Unterminated inline assembly block".to_string());
        }
        Mode::InToken => tokens.push(current),
        Mode::Normal | Mode::LineComment => {}
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(src: &str) -> Vec<String> {
        tokenize(src).expect("tokenize")
    }

    #[test]
    fn test_whitespace_split() {
        assert_eq!(toks("a b  c"), ["a", "b", "c"]);
        assert_eq!(toks("  a\tb\nc  "), ["a", "b", "c"]);
        assert_eq!(toks(""), Vec::<String>::new());
    }

    #[test]
    fn test_trailing_token_flushed() {
        assert_eq!(toks(": main ;"), [":", "main", ";"]);
        assert_eq!(toks("word"), ["word"]);
    }

    #[test]
    fn test_string_constants_keep_quotes() {
        assert_eq!(toks(r#"str greet "hi there""#), ["str", "greet", "\"hi there\""]);
        assert_eq!(toks("'a b' x"), ["'a b'", "x"]);
    }

    #[test]
    fn test_string_may_contain_other_quote() {
        assert_eq!(toks(r#""it's fine""#), ["\"it's fine\""]);
    }

    #[test]
    fn test_line_comment() {
        assert_eq!(toks("a # comment here\nb"), ["a", "b"]);
        assert_eq!(toks("# only a comment"), Vec::<String>::new());
    }

    #[test]
    fn test_block_comment() {
        assert_eq!(toks("a /* ignore all this */ b"), ["a", "b"]);
        assert_eq!(toks("a /* multi\nline\ncomment */ b"), ["a", "b"]);
    }

    #[test]
    fn test_block_comment_needs_bare_slash() {
        // a slash inside a longer token does not open a comment
        assert_eq!(toks("a/*b c"), ["a/*b", "c"]);
    }

    #[test]
    fn test_inline_asm_token() {
        let t = toks("code beep /# LDA #$07\n JSR $FFEF #/");
        assert_eq!(t[0], "code");
        assert_eq!(t[1], "beep");
        assert_eq!(t[2], "/# LDA #$07\n JSR $FFEF #/");
    }

    #[test]
    fn test_inline_asm_hash_does_not_close_early() {
        // interior `#` characters only close when directly followed by `/`
        let t = toks("/# LDA #3 #/");
        assert_eq!(t, ["/# LDA #3 #/"]);
    }

    #[test]
    fn test_unterminated_string() {
        assert!(tokenize("str s \"oops").is_err());
    }

    #[test]
    fn test_unterminated_block_comment() {
        assert!(tokenize("a /* never closed").is_err());
    }

    #[test]
    fn test_unterminated_inline_asm() {
        assert!(tokenize("code c /# NOP").is_err());
    }

    #[test]
    fn test_control_chars_are_whitespace() {
        assert_eq!(toks("a\u{1}b"), ["a", "b"]);
    }
}
