//! Recognizer for the statements the simulator understands.
//!
//! This is not a SQL parser: it tokenizes the text and matches the handful of
//! statement shapes the probe issues, rejecting everything else with a
//! compilation error.

use super::{codes, SimError};

/// Column types supported by `CREATE TABLE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Text,
}

impl ColumnType {
    fn parse(word: &str) -> Option<Self> {
        match word.to_ascii_uppercase().as_str() {
            "INTEGER" | "INT" | "BIGINT" | "SMALLINT" | "NUMBER" => Some(ColumnType::Integer),
            "VARCHAR" | "STRING" | "TEXT" => Some(ColumnType::Text),
            _ => None,
        }
    }
}

/// Literal in a `VALUES` list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Number(String),
    Text(String),
    Null,
}

/// Recognized statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimStatement {
    CreateTable {
        table: String,
        columns: Vec<(String, ColumnType)>,
    },
    DropTable {
        table: String,
    },
    Insert {
        table: String,
        values: Vec<Literal>,
    },
    Begin,
    Commit,
    Rollback,
    SetAutocommit(bool),
    CountRows {
        table: String,
    },
    CopyInto {
        location: String,
        source: String,
        format: String,
    },
}

impl SimStatement {
    /// DDL statements commit any open transaction before running.
    pub fn is_ddl(&self) -> bool {
        matches!(
            self,
            SimStatement::CreateTable { .. } | SimStatement::DropTable { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Word(String),
    Quoted(String),
    QuotedIdent(String),
    Punct(char),
}

impl Token {
    fn is_keyword(&self, kw: &str) -> bool {
        matches!(self, Token::Word(w) if w.eq_ignore_ascii_case(kw))
    }
}

fn tokenize(sql: &str) -> Result<Vec<Token>, SimError> {
    let mut tokens = Vec::new();
    let mut chars = sql.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if matches!(c, '(' | ')' | ',' | '=' | ';') {
            tokens.push(Token::Punct(c));
            chars.next();
        } else if c == '\'' || c == '"' {
            chars.next();
            let mut text = String::new();
            let mut closed = false;
            while let Some(ch) = chars.next() {
                if ch == c {
                    // Doubled quote is an escaped quote.
                    if chars.peek() == Some(&c) {
                        text.push(c);
                        chars.next();
                    } else {
                        closed = true;
                        break;
                    }
                } else {
                    text.push(ch);
                }
            }
            if !closed {
                return Err(SimError::new(
                    codes::SYNTAX_ERROR,
                    "SQL compilation error: unterminated quoted literal",
                ));
            }
            tokens.push(if c == '\'' {
                Token::Quoted(text)
            } else {
                Token::QuotedIdent(text)
            });
        } else {
            let mut word = String::new();
            while let Some(&ch) = chars.peek() {
                if ch.is_whitespace() || matches!(ch, '(' | ')' | ',' | '=' | ';' | '\'' | '"') {
                    break;
                }
                word.push(ch);
                chars.next();
            }
            tokens.push(Token::Word(word));
        }
    }

    while tokens.last() == Some(&Token::Punct(';')) {
        tokens.pop();
    }
    Ok(tokens)
}

/// Normalizes an identifier: unquoted names fold to upper case.
fn is_plain_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Resolves a table name the way unquoted SQL identifiers are resolved.
///
/// Plain names are upper-cased; anything else is taken as a quoted name.
pub fn normalize_identifier(name: &str) -> String {
    if is_plain_identifier(name) {
        name.to_ascii_uppercase()
    } else {
        name.to_string()
    }
}

fn identifier(token: &Token) -> Option<String> {
    match token {
        Token::Word(w) if is_plain_identifier(w) => Some(w.to_ascii_uppercase()),
        Token::QuotedIdent(name) => Some(name.clone()),
        _ => None,
    }
}

fn unsupported(sql: &str) -> SimError {
    SimError::new(
        codes::SYNTAX_ERROR,
        format!("SQL compilation error: unsupported statement '{}'", sql.trim()),
    )
}

/// Recognizes one statement.
pub fn parse(sql: &str) -> Result<SimStatement, SimError> {
    let tokens = tokenize(sql)?;
    let kw = |i: usize, k: &str| tokens.get(i).is_some_and(|t| t.is_keyword(k));

    if tokens.len() == 1 && (kw(0, "BEGIN") || kw(0, "START")) {
        return Ok(SimStatement::Begin);
    }
    if tokens.len() == 2 && kw(0, "BEGIN") && (kw(1, "TRANSACTION") || kw(1, "WORK")) {
        return Ok(SimStatement::Begin);
    }
    if tokens.len() == 1 && kw(0, "COMMIT") {
        return Ok(SimStatement::Commit);
    }
    if tokens.len() == 1 && kw(0, "ROLLBACK") {
        return Ok(SimStatement::Rollback);
    }

    if kw(0, "CREATE") && kw(1, "TABLE") {
        return parse_create(sql, &tokens[2..]);
    }
    if kw(0, "DROP") && kw(1, "TABLE") && tokens.len() == 3 {
        let table = identifier(&tokens[2]).ok_or_else(|| unsupported(sql))?;
        return Ok(SimStatement::DropTable { table });
    }
    if kw(0, "INSERT") && kw(1, "INTO") && kw(3, "VALUES") {
        let table = tokens.get(2).and_then(identifier).ok_or_else(|| unsupported(sql))?;
        let values = parse_values(sql, &tokens[4..])?;
        return Ok(SimStatement::Insert { table, values });
    }
    if kw(0, "ALTER") && kw(1, "SESSION") && kw(2, "SET") && kw(3, "AUTOCOMMIT") {
        if tokens.get(4) == Some(&Token::Punct('=')) && tokens.len() == 6 {
            if kw(5, "TRUE") {
                return Ok(SimStatement::SetAutocommit(true));
            }
            if kw(5, "FALSE") {
                return Ok(SimStatement::SetAutocommit(false));
            }
        }
        return Err(unsupported(sql));
    }
    if kw(0, "SELECT")
        && kw(1, "COUNT")
        && tokens.get(2) == Some(&Token::Punct('('))
        && kw(3, "*")
        && tokens.get(4) == Some(&Token::Punct(')'))
        && kw(5, "FROM")
        && tokens.len() == 7
    {
        let table = identifier(&tokens[6]).ok_or_else(|| unsupported(sql))?;
        return Ok(SimStatement::CountRows { table });
    }
    if kw(0, "COPY") && kw(1, "INTO") && kw(3, "FROM") {
        return parse_copy(sql, &tokens);
    }

    Err(unsupported(sql))
}

fn parse_create(sql: &str, rest: &[Token]) -> Result<SimStatement, SimError> {
    let table = rest.first().and_then(identifier).ok_or_else(|| unsupported(sql))?;
    if rest.get(1) != Some(&Token::Punct('(')) || rest.last() != Some(&Token::Punct(')')) {
        return Err(unsupported(sql));
    }

    let mut columns = Vec::new();
    for def in rest[2..rest.len() - 1].split(|t| *t == Token::Punct(',')) {
        match def {
            [name, Token::Word(ty)] => {
                let name = identifier(name).ok_or_else(|| unsupported(sql))?;
                let ty = ColumnType::parse(ty).ok_or_else(|| {
                    SimError::new(
                        codes::SYNTAX_ERROR,
                        format!("SQL compilation error: unsupported data type '{}'", ty),
                    )
                })?;
                columns.push((name, ty));
            }
            _ => return Err(unsupported(sql)),
        }
    }
    if columns.is_empty() {
        return Err(unsupported(sql));
    }
    Ok(SimStatement::CreateTable { table, columns })
}

fn parse_values(sql: &str, rest: &[Token]) -> Result<Vec<Literal>, SimError> {
    if rest.first() != Some(&Token::Punct('(')) || rest.last() != Some(&Token::Punct(')')) {
        return Err(unsupported(sql));
    }
    rest[1..rest.len() - 1]
        .split(|t| *t == Token::Punct(','))
        .map(|item| match item {
            [Token::Quoted(text)] => Ok(Literal::Text(text.clone())),
            [Token::Word(w)] if w.eq_ignore_ascii_case("NULL") => Ok(Literal::Null),
            [Token::Word(w)] => Ok(Literal::Number(w.clone())),
            _ => Err(unsupported(sql)),
        })
        .collect()
}

fn parse_copy(sql: &str, tokens: &[Token]) -> Result<SimStatement, SimError> {
    let location = match &tokens[2] {
        Token::Word(w) | Token::Quoted(w) => w.clone(),
        _ => return Err(unsupported(sql)),
    };
    let source = tokens.get(4).and_then(identifier).ok_or_else(|| unsupported(sql))?;

    // file_format = ( type = <fmt> )
    let format = tokens
        .windows(6)
        .find(|w| {
            w[0].is_keyword("file_format")
                && w[1] == Token::Punct('=')
                && w[2] == Token::Punct('(')
                && w[3].is_keyword("type")
                && w[4] == Token::Punct('=')
        })
        .and_then(|w| match &w[5] {
            Token::Word(f) | Token::Quoted(f) => Some(f.to_ascii_uppercase()),
            _ => None,
        })
        .unwrap_or_else(|| "CSV".to_string());

    Ok(SimStatement::CopyInto {
        location,
        source,
        format,
    })
}
