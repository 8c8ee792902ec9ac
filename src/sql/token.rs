// SQL tokens for lexical analysis

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Identifier(String),
    Number(String),
    String(String),

    // Keywords
    Select,
    From,
    Where,
    Insert,
    Into,
    Values,
    Create,
    Table,
    If,
    Not,
    Exists,

    // Operators and punctuation
    Star,
    Equal,
    Minus,
    LeftParen,
    RightParen,
    Comma,
    Semicolon,

    // Anything the lexer does not understand
    Unknown(char),
    Eof,
}

impl Token {
    pub fn keyword_from_str(s: &str) -> Option<Token> {
        match s.to_ascii_uppercase().as_str() {
            "SELECT" => Some(Token::Select),
            "FROM" => Some(Token::From),
            "WHERE" => Some(Token::Where),
            "INSERT" => Some(Token::Insert),
            "INTO" => Some(Token::Into),
            "VALUES" => Some(Token::Values),
            "CREATE" => Some(Token::Create),
            "TABLE" => Some(Token::Table),
            "IF" => Some(Token::If),
            "NOT" => Some(Token::Not),
            "EXISTS" => Some(Token::Exists),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_are_case_insensitive() {
        assert_eq!(Token::keyword_from_str("select"), Some(Token::Select));
        assert_eq!(Token::keyword_from_str("Exists"), Some(Token::Exists));
        assert_eq!(Token::keyword_from_str("users"), None);
        // Type names stay identifiers
        assert_eq!(Token::keyword_from_str("INT"), None);
    }
}
