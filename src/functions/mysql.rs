use std::fmt::{Formatter, Result};

use super::{FunctionNode, ParseFunction};
use crate::{
    lex::TokenType,
    parser::{self, ExpressionId, Parser},
    walker::SqlWalker,
};

/// `DATE_FORMAT(date, pattern)`
///
/// Formats the date value according to the format string. See
///  <https://dev.mysql.com/doc/refman/8.0/en/date-and-time-functions.html#function_date-format>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateFormat {
    pub date: ExpressionId,
    pub pattern: ExpressionId,
}

impl ParseFunction for DateFormat {
    fn parse(parser: &mut Parser<'_>) -> std::result::Result<Self, parser::Error> {
        parser.match_token(TokenType::Identifier)?;
        parser.match_token(TokenType::ParenLeft)?;
        let date = parser.arithmetic_expression()?;
        parser.match_token(TokenType::Comma)?;
        let pattern = parser.string_primary()?;
        parser.match_token(TokenType::ParenRight)?;
        Ok(Self { date, pattern })
    }
}

impl FunctionNode for DateFormat {
    fn name(&self) -> &'static str {
        "DATE_FORMAT"
    }

    fn to_sql(&self, out: &mut Formatter<'_>, walker: &SqlWalker<'_>) -> Result {
        write!(
            out,
            "DATE_FORMAT({}, {})",
            walker.node(self.date),
            walker.node(self.pattern)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        functions::render_call,
        parser::{Error, Expected, Found},
    };

    #[test]
    fn renders_path_and_pattern() {
        let (_, sql) =
            render_call::<DateFormat>("DATE_FORMAT(u.createdAt, '%Y-%m-%d')").expect("a valid parse");
        assert_eq!(sql, "DATE_FORMAT(u.createdAt, '%Y-%m-%d')");
    }

    #[test]
    fn name_is_case_insensitive_and_output_is_canonical() {
        let (_, sql) = render_call::<DateFormat>("date_format(u.createdAt,'%Y')").expect("a valid parse");
        assert_eq!(sql, "DATE_FORMAT(u.createdAt, '%Y')");
    }

    #[test]
    fn nested_function_call() {
        let (_, sql) =
            render_call::<DateFormat>("DATE_FORMAT(CURRENT_DATE(), '%Y')").expect("a valid parse");
        assert_eq!(sql, "DATE_FORMAT(CURRENT_DATE(), '%Y')");
    }

    #[test]
    fn date_is_a_full_arithmetic_expression() {
        let (_, sql) =
            render_call::<DateFormat>("DATE_FORMAT(u.createdAt + 1, :fmt)").expect("a valid parse");
        assert_eq!(sql, "DATE_FORMAT(u.createdAt + 1, ?)");
    }

    #[test]
    fn pattern_must_be_a_string_primary() {
        assert_eq!(
            render_call::<DateFormat>("DATE_FORMAT(u.createdAt, 12)").unwrap_err(),
            Error::Syntax {
                position: 25,
                expected: Expected::StringPrimary,
                found: Found::Token("12".into()),
            }
        );
    }

    #[test]
    fn pattern_cannot_be_an_identification_variable() {
        assert_eq!(
            render_call::<DateFormat>("DATE_FORMAT(u.createdAt, fmt)").unwrap_err(),
            Error::Syntax {
                position: 25,
                expected: Expected::StringPrimary,
                found: Found::Token("fmt".into()),
            }
        );
        // A call is still fine
        let (_, sql) = render_call::<DateFormat>("DATE_FORMAT(u.createdAt, LOWER(:fmt))")
            .expect("a valid parse");
        assert_eq!(sql, "DATE_FORMAT(u.createdAt, LOWER(?))");
    }

    #[test]
    fn signed_date() {
        let (_, sql) =
            render_call::<DateFormat>("DATE_FORMAT(-u.b, '%Y')").expect("a valid parse");
        assert_eq!(sql, "DATE_FORMAT(-u.b, '%Y')");
        assert_eq!(
            render_call::<DateFormat>("DATE_FORMAT(- -u.b, '%Y')").unwrap_err(),
            Error::Syntax {
                position: 14,
                expected: Expected::ArithmeticPrimary,
                found: Found::Token("-".into()),
            }
        );
    }

    #[test]
    fn missing_comma() {
        assert_eq!(
            render_call::<DateFormat>("DATE_FORMAT(u.createdAt '%Y')").unwrap_err(),
            Error::Syntax {
                position: 24,
                expected: Expected::Token(TokenType::Comma),
                found: Found::Token("'%Y'".into()),
            }
        );
    }

    #[test]
    fn missing_close_paren() {
        assert_eq!(
            render_call::<DateFormat>("DATE_FORMAT(u.createdAt, '%Y'").unwrap_err(),
            Error::Syntax {
                position: 29,
                expected: Expected::Token(TokenType::ParenRight),
                found: Found::EndOfString,
            }
        );
    }
}
