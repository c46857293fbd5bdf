/// Operator symbols recognized by the tokenizer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorToken {
    Colon,
    Gt,
    Gte,
    Lt,
    Lte,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A bare word directly followed by `:`
    Field(String),
    Operator(OperatorToken),
    /// Quoted phrase, unescaped
    Value(String),
    /// Verbatim range literal including brackets, `[.. TO ..]`
    Range(String),
    /// Any other bare word
    Text(String),
    Paren(char),
    And,
    Or,
    Not,
}

fn is_special(c: char) -> bool {
    c.is_whitespace() || matches!(c, '"' | ':' | '(' | ')' | '[' | ']' | '<' | '>')
}

/// Splits a query string into tokens in a single left-to-right pass.
///
/// A bare word directly adjacent to an operator is always a value: it may
/// contain `:` (so clock times survive) and is never read as a keyword
/// or field name. After whitespace, words are classified as usual.
pub fn tokenize(input: &str) -> Vec<Token> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        match c {
            '"' => {
                let mut value = String::new();
                i += 1;
                while i < chars.len() && chars[i] != '"' {
                    if chars[i] == '\\' && i + 1 < chars.len() && chars[i + 1] == '"' {
                        value.push('"');
                        i += 2;
                        continue;
                    }
                    value.push(chars[i]);
                    i += 1;
                }
                // closing quote, if any
                i += 1;
                tokens.push(Token::Value(value));
            }
            '[' => {
                let start = i;
                while i < chars.len() && chars[i] != ']' {
                    i += 1;
                }
                let end = (i + 1).min(chars.len());
                tokens.push(Token::Range(chars[start..end].iter().collect()));
                i = end;
            }
            ':' => {
                tokens.push(Token::Operator(OperatorToken::Colon));
                i += 1;
            }
            '>' | '<' => {
                let inclusive = chars.get(i + 1) == Some(&'=');
                let op = match (c, inclusive) {
                    ('>', false) => OperatorToken::Gt,
                    ('>', true) => OperatorToken::Gte,
                    ('<', false) => OperatorToken::Lt,
                    _ => OperatorToken::Lte,
                };
                tokens.push(Token::Operator(op));
                i += if inclusive { 2 } else { 1 };
            }
            '(' | ')' => {
                tokens.push(Token::Paren(c));
                i += 1;
            }
            ']' => {
                // stray closing bracket
                i += 1;
            }
            _ => {
                let after_operator = matches!(tokens.last(), Some(Token::Operator(_)))
                    && !chars[i - 1].is_whitespace();
                let start = i;
                while i < chars.len() {
                    let ch = chars[i];
                    let stops = if after_operator {
                        ch.is_whitespace() || matches!(ch, '"' | '(' | ')' | '[' | ']')
                    } else {
                        is_special(ch)
                    };
                    if stops {
                        break;
                    }
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();

                if after_operator {
                    tokens.push(Token::Text(word));
                    continue;
                }

                let next_significant = chars[i..].iter().find(|ch| !ch.is_whitespace());
                let token = if word.eq_ignore_ascii_case("AND") {
                    Token::And
                } else if word.eq_ignore_ascii_case("OR") {
                    Token::Or
                } else if word.eq_ignore_ascii_case("NOT") {
                    Token::Not
                } else if next_significant == Some(&':') {
                    Token::Field(word)
                } else {
                    Token::Text(word)
                };
                tokens.push(token);
            }
        }
    }

    tokens
}
