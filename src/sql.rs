// SQL module - the small statement language of the command loop

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod token;

pub use ast::*;
pub use lexer::Lexer;
pub use parser::Parser;
pub use token::Token;

use anyhow::Result;

/// Parse one statement.
pub fn parse(sql: &str) -> Result<Statement> {
    Parser::new(sql).parse()
}

/// Split buffered input into complete `;`-terminated statements.
///
/// Returns the statements (without their terminator, trimmed, empty ones
/// dropped) and the unterminated remainder. Semicolons inside quoted literals
/// do not terminate a statement.
pub fn split_statements(buffer: &str) -> (Vec<String>, String) {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for ch in buffer.chars() {
        match (ch, quote) {
            (';', None) => {
                let statement = current.trim();
                if !statement.is_empty() {
                    statements.push(statement.to_string());
                }
                current.clear();
                continue;
            }
            ('\'' | '"', None) => quote = Some(ch),
            (c, Some(q)) if c == q => quote = None,
            _ => {}
        }
        current.push(ch);
    }

    (statements, current.trim().to_string())
}
