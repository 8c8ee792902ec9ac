// SQL parser - converts tokens to statements

use super::ast::*;
use super::lexer::Lexer;
use super::token::Token;
use crate::access::{Column, Value};
use anyhow::{anyhow, bail, Result};

pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    pub fn new(sql: &str) -> Self {
        let tokens = Lexer::new(sql).tokenize();
        Parser {
            tokens,
            position: 0,
        }
    }

    /// Parse a single SQL statement, optionally terminated by `;`
    pub fn parse(&mut self) -> Result<Statement> {
        let statement = match self.current_token() {
            Token::Create => self.parse_create_table()?,
            Token::Insert => self.parse_insert()?,
            Token::Select => self.parse_select()?,
            _ => bail!("Unknown SQL"),
        };

        if self.match_token(&Token::Semicolon) {
            self.advance();
        }
        if !self.match_token(&Token::Eof) {
            bail!("Unexpected {:?} after statement", self.current_token());
        }

        Ok(statement)
    }

    fn parse_create_table(&mut self) -> Result<Statement> {
        self.expect_token(Token::Create)?;
        self.expect_token(Token::Table)?;

        let if_not_exists = if self.match_token(&Token::If) {
            self.advance();
            self.expect_token(Token::Not)?;
            self.expect_token(Token::Exists)?;
            true
        } else {
            false
        };

        let name = self.expect_identifier()?;
        self.expect_token(Token::LeftParen)?;

        let mut columns = Vec::new();
        if self.match_token(&Token::RightParen) {
            self.advance();
        } else {
            loop {
                columns.push(self.parse_column_definition()?);
                match self.current_token() {
                    Token::Comma => self.advance(),
                    Token::RightParen => {
                        self.advance();
                        break;
                    }
                    other => bail!("Expected ',' or ')' in column list, found {:?}", other),
                }
            }
        }

        Ok(Statement::CreateTable(CreateTable {
            name,
            columns,
            if_not_exists,
        }))
    }

    /// `name TYPE` with an optional, ignored length such as `VARCHAR(255)`
    fn parse_column_definition(&mut self) -> Result<Column> {
        let name = self.expect_identifier()?;
        let type_name = self.expect_identifier()?;

        if self.match_token(&Token::LeftParen) {
            self.advance();
            match self.current_token() {
                Token::Number(_) => self.advance(),
                other => bail!("Expected type length, found {:?}", other),
            }
            self.expect_token(Token::RightParen)?;
        }

        Ok(Column::new(name, type_name.as_str()))
    }

    fn parse_insert(&mut self) -> Result<Statement> {
        self.expect_token(Token::Insert)?;
        self.expect_token(Token::Into)?;
        let table = self.expect_identifier()?;

        self.expect_token(Token::LeftParen)?;
        let mut columns = vec![self.expect_identifier()?];
        while self.match_token(&Token::Comma) {
            self.advance();
            columns.push(self.expect_identifier()?);
        }
        self.expect_token(Token::RightParen)?;

        self.expect_token(Token::Values)?;
        self.expect_token(Token::LeftParen)?;
        let mut values = vec![self.parse_literal()?];
        while self.match_token(&Token::Comma) {
            self.advance();
            values.push(self.parse_literal()?);
        }
        self.expect_token(Token::RightParen)?;

        if columns.len() != values.len() {
            bail!(
                "{} columns but {} values in INSERT INTO {}",
                columns.len(),
                values.len(),
                table
            );
        }

        Ok(Statement::InsertInto(InsertInto {
            table,
            columns,
            values,
        }))
    }

    fn parse_select(&mut self) -> Result<Statement> {
        self.expect_token(Token::Select)?;
        self.expect_token(Token::Star)?;
        self.expect_token(Token::From)?;
        let table = self.expect_identifier()?;

        let filter = if self.match_token(&Token::Where) {
            self.advance();
            let column = self.expect_identifier()?;
            self.expect_token(Token::Equal)?;
            let value = self.parse_literal()?;
            Some(Filter {
                column,
                value: value.to_string(),
            })
        } else {
            None
        };

        Ok(Statement::Select(Select { table, filter }))
    }

    /// Quoted literals are text, bare numbers are integers
    fn parse_literal(&mut self) -> Result<Value> {
        let negative = if self.match_token(&Token::Minus) {
            self.advance();
            true
        } else {
            false
        };

        let value = match self.current_token().clone() {
            Token::Number(digits) => {
                let literal = if negative {
                    format!("-{}", digits)
                } else {
                    digits
                };
                let n = literal
                    .parse::<i32>()
                    .map_err(|e| anyhow!("Invalid integer {}: {}", literal, e))?;
                Value::Int(n)
            }
            Token::String(s) if !negative => Value::Text(s),
            other => bail!("Expected literal value, found {:?}", other),
        };
        self.advance();

        Ok(value)
    }

    fn current_token(&self) -> &Token {
        // tokenize() always ends with Eof
        &self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() - 1 {
            self.position += 1;
        }
    }

    fn match_token(&self, expected: &Token) -> bool {
        self.current_token() == expected
    }

    fn expect_token(&mut self, expected: Token) -> Result<()> {
        if self.current_token() == &expected {
            self.advance();
            Ok(())
        } else {
            bail!("Expected {:?}, found {:?}", expected, self.current_token())
        }
    }

    fn expect_identifier(&mut self) -> Result<String> {
        match self.current_token().clone() {
            Token::Identifier(name) => {
                self.advance();
                Ok(name)
            }
            other => bail!("Expected identifier, found {:?}", other),
        }
    }
}
