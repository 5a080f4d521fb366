//! Lexer for `!` command lines.
//!
//! A command line has the shape
//!
//! ```text
//! ! [name] {arg} [-> reference | : inline text]
//! ```
//!
//! where an argument is a `"string"`, an integer, a bare word or a
//! `[bracketed markup]` fragment. Markup and immediate text are returned as
//! raw slices with their byte offset inside the line; turning them into
//! inline nodes is the structural parser's job.

/// A lexed command line, borrowing from the source line.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandLine<'s> {
    pub name: Option<&'s str>,
    pub args: Vec<RawArg<'s>>,
    pub tail: Option<Tail<'s>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RawArg<'s> {
    Word(&'s str),
    Str(String),
    Int(i64),
    /// Bracketed inline markup, without the brackets. `offset` is the byte
    /// offset of `text` within the line.
    Markup { text: &'s str, offset: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Tail<'s> {
    /// `-> target`
    Reference(&'s str),
    /// `: inline text`
    Immediate { text: &'s str, offset: usize },
}

/// A lexing failure. `offset`/`len` are relative to the line.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxError {
    pub offset: usize,
    pub len: usize,
    pub message: String,
}

pub fn lex_command_line(line: &str) -> Result<CommandLine<'_>, SyntaxError> {
    let mut lexer = Lexer { line, pos: 0 };
    lexer.expect_bang()?;

    let mut name = None;
    let mut args = Vec::new();
    let mut tail = None;
    let mut first = true;

    loop {
        lexer.skip_whitespace();
        let Some(c) = lexer.peek() else {
            break;
        };

        match c {
            '"' => args.push(RawArg::Str(lexer.string()?)),
            '[' => args.push(lexer.markup()?),
            ':' => {
                tail = Some(lexer.immediate()?);
                break;
            }
            '-' if lexer.peek_second() == Some('>') => {
                tail = Some(lexer.reference()?);
                break;
            }
            c if c.is_ascii_digit()
                || ((c == '-' || c == '+')
                    && lexer.peek_second().is_some_and(|d| d.is_ascii_digit())) =>
            {
                args.push(RawArg::Int(lexer.int()?));
            }
            c if is_word_start(c) => {
                let word = lexer.word();
                if first {
                    name = Some(word);
                } else {
                    args.push(RawArg::Word(word));
                }
            }
            other => {
                return Err(lexer.error_here(
                    other.len_utf8(),
                    format!("unexpected character `{}` in command line", other),
                ));
            }
        }
        first = false;
    }

    Ok(CommandLine { name, args, tail })
}

fn is_word_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '/')
}

struct Lexer<'s> {
    line: &'s str,
    pos: usize,
}

impl<'s> Lexer<'s> {
    fn rest(&self) -> &'s str {
        &self.line[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.rest().chars().nth(1)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn error_here(&self, len: usize, message: impl Into<String>) -> SyntaxError {
        SyntaxError {
            offset: self.pos,
            len,
            message: message.into(),
        }
    }

    fn expect_bang(&mut self) -> Result<(), SyntaxError> {
        match self.bump() {
            Some('!') => Ok(()),
            _ => Err(SyntaxError {
                offset: 0,
                len: 1,
                message: "command lines start with `!`".into(),
            }),
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn word(&mut self) -> &'s str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == '-' && self.peek_second() == Some('>') {
                break;
            }
            if !is_word_char(c) {
                break;
            }
            self.bump();
        }
        &self.line[start..self.pos]
    }

    fn int(&mut self) -> Result<i64, SyntaxError> {
        let start = self.pos;
        if matches!(self.peek(), Some('-' | '+')) {
            self.bump();
        }
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        let literal = &self.line[start..self.pos];
        literal.parse::<i64>().map_err(|_| SyntaxError {
            offset: start,
            len: literal.len(),
            message: format!("integer literal `{}` is out of range", literal),
        })
    }

    fn string(&mut self) -> Result<String, SyntaxError> {
        let start = self.pos;
        self.bump();
        let mut value = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(value),
                Some('\\') => match self.bump() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some(other) => value.push(other),
                    None => break,
                },
                Some(c) => value.push(c),
                None => break,
            }
        }
        Err(SyntaxError {
            offset: start,
            len: 1,
            message: "unterminated string literal".into(),
        })
    }

    fn markup(&mut self) -> Result<RawArg<'s>, SyntaxError> {
        let start = self.pos;
        self.bump();
        let inner_start = self.pos;
        let mut depth = 1usize;
        while let Some(c) = self.bump() {
            match c {
                '[' => depth += 1,
                ']' => {
                    depth -= 1;
                    if depth == 0 {
                        let text = &self.line[inner_start..self.pos - 1];
                        return Ok(RawArg::Markup {
                            text,
                            offset: inner_start,
                        });
                    }
                }
                _ => {}
            }
        }
        Err(SyntaxError {
            offset: start,
            len: 1,
            message: "unterminated `[` markup argument".into(),
        })
    }

    fn immediate(&mut self) -> Result<Tail<'s>, SyntaxError> {
        let colon = self.pos;
        self.bump();
        let after = self.rest();
        let text = after.trim();
        if text.is_empty() {
            return Err(SyntaxError {
                offset: colon,
                len: 1,
                message: "expected inline content after `:`".into(),
            });
        }
        let offset = self.pos + (after.len() - after.trim_start().len());
        self.pos = self.line.len();
        Ok(Tail::Immediate { text, offset })
    }

    fn reference(&mut self) -> Result<Tail<'s>, SyntaxError> {
        let arrow = self.pos;
        self.bump();
        self.bump();
        let target = self.rest().trim();
        if target.is_empty() {
            return Err(SyntaxError {
                offset: arrow,
                len: 2,
                message: "expected a reference target after `->`".into(),
            });
        }
        self.pos = self.line.len();
        Ok(Tail::Reference(target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_and_string_argument() {
        let line = lex_command_line("! image \"cat.png\"").unwrap();
        assert_eq!(line.name, Some("image"));
        assert_eq!(line.args, vec![RawArg::Str("cat.png".into())]);
        assert_eq!(line.tail, None);
    }

    #[test]
    fn mixed_arguments() {
        let line = lex_command_line("! go page-2 -3 [see *this*]").unwrap();
        assert_eq!(line.name, Some("go"));
        assert_eq!(
            line.args,
            vec![
                RawArg::Word("page-2"),
                RawArg::Int(-3),
                RawArg::Markup {
                    text: "see *this*",
                    offset: 16
                },
            ]
        );
    }

    #[test]
    fn anonymous_command_starts_with_literal() {
        let line = lex_command_line("! \"just a string\"").unwrap();
        assert_eq!(line.name, None);
        assert_eq!(line.args, vec![RawArg::Str("just a string".into())]);
    }

    #[test]
    fn bare_bang_has_no_name() {
        let line = lex_command_line("!").unwrap();
        assert_eq!(line.name, None);
        assert!(line.args.is_empty());
    }

    #[test]
    fn reference_tail() {
        let line = lex_command_line("! see -> The beginning").unwrap();
        assert_eq!(line.name, Some("see"));
        assert_eq!(line.tail, Some(Tail::Reference("The beginning")));
    }

    #[test]
    fn word_stops_before_arrow() {
        let line = lex_command_line("! see->there").unwrap();
        assert_eq!(line.name, Some("see"));
        assert_eq!(line.tail, Some(Tail::Reference("there")));
    }

    #[test]
    fn immediate_tail_keeps_offset() {
        let line = lex_command_line("! note:  hello *you*").unwrap();
        assert_eq!(
            line.tail,
            Some(Tail::Immediate {
                text: "hello *you*",
                offset: 9
            })
        );
    }

    #[test]
    fn unterminated_string_points_at_quote() {
        let err = lex_command_line("! image \"cat.png").unwrap_err();
        assert_eq!(err.offset, 8);
        assert!(err.message.contains("unterminated string"));
    }

    #[test]
    fn unterminated_markup() {
        let err = lex_command_line("! say [oops").unwrap_err();
        assert_eq!(err.offset, 6);
    }

    #[test]
    fn empty_reference_is_an_error() {
        let err = lex_command_line("! see ->  ").unwrap_err();
        assert!(err.message.contains("reference target"));
    }

    #[test]
    fn stray_character() {
        let err = lex_command_line("! image (x)").unwrap_err();
        assert_eq!(err.offset, 8);
    }

    #[test]
    fn string_escapes() {
        let line = lex_command_line(r#"! say "a \"b\" c""#).unwrap();
        assert_eq!(line.args, vec![RawArg::Str("a \"b\" c".into())]);
    }
}
