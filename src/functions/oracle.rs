use std::fmt::{Formatter, Result};

use super::{FunctionNode, ParseFunction};
use crate::{
    lex::TokenType,
    parser::{self, ExpressionId, Parser},
    walker::SqlWalker,
};

/// `EXTRACT(unit FROM date)`
///
/// Extracts a datetime field from a date. See
///  <https://docs.oracle.com/cd/B19306_01/server.102/b14200/functions050.htm>
///
/// The unit is copied into the SQL as written. Nothing checks it against the
///  units the database accepts, so a bad unit is reported by the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extract {
    pub unit: String,
    pub date: ExpressionId,
}

impl ParseFunction for Extract {
    fn parse(parser: &mut Parser<'_>) -> std::result::Result<Self, parser::Error> {
        parser.match_token(TokenType::Identifier)?;
        parser.match_token(TokenType::ParenLeft)?;
        let unit = parser.match_token(TokenType::Identifier)?;
        let unit = parser.text(&unit).to_owned();
        // FROM
        parser.match_token(TokenType::Identifier)?;
        let date = parser.arithmetic_primary()?;
        parser.match_token(TokenType::ParenRight)?;
        Ok(Self { unit, date })
    }
}

impl FunctionNode for Extract {
    fn name(&self) -> &'static str {
        "EXTRACT"
    }

    fn to_sql(&self, out: &mut Formatter<'_>, walker: &SqlWalker<'_>) -> Result {
        write!(out, "EXTRACT({} from {})", self.unit, walker.node(self.date))
    }
}

/// `NVL2(expr1, expr2, expr3)`
///
/// Returns expr2 when expr1 is not null and expr3 otherwise. See
///  <http://docs.oracle.com/database/121/SQLRF/functions132.htm#SQLRF00685>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nvl2 {
    pub expr1: ExpressionId,
    pub expr2: ExpressionId,
    pub expr3: ExpressionId,
}

impl ParseFunction for Nvl2 {
    fn parse(parser: &mut Parser<'_>) -> std::result::Result<Self, parser::Error> {
        parser.match_token(TokenType::Identifier)?;
        parser.match_token(TokenType::ParenLeft)?;
        let expr1 = parser.arithmetic_primary()?;
        parser.match_token(TokenType::Comma)?;
        let expr2 = parser.arithmetic_primary()?;
        parser.match_token(TokenType::Comma)?;
        let expr3 = parser.arithmetic_primary()?;
        parser.match_token(TokenType::ParenRight)?;
        Ok(Self {
            expr1,
            expr2,
            expr3,
        })
    }
}

impl FunctionNode for Nvl2 {
    fn name(&self) -> &'static str {
        "NVL2"
    }

    fn to_sql(&self, out: &mut Formatter<'_>, walker: &SqlWalker<'_>) -> Result {
        write!(
            out,
            "NVL2({}, {}, {})",
            walker.node(self.expr1),
            walker.node(self.expr2),
            walker.node(self.expr3)
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
    fn extract_year() {
        let (node, sql) =
            render_call::<Extract>("EXTRACT(YEAR FROM u.createdAt)").expect("a valid parse");
        assert_eq!(node.unit, "YEAR");
        assert_eq!(sql, "EXTRACT(YEAR from u.createdAt)");
    }

    #[test]
    fn extract_keeps_unit_verbatim() {
        // Neither the unit nor the FROM keyword is checked
        let (node, sql) =
            render_call::<Extract>("extract(fortnight of u.createdAt)").expect("a valid parse");
        assert_eq!(node.unit, "fortnight");
        assert_eq!(sql, "EXTRACT(fortnight from u.createdAt)");
    }

    #[test]
    fn extract_from_nested_call() {
        let (_, sql) =
            render_call::<Extract>("EXTRACT(MONTH FROM CURRENT_DATE())").expect("a valid parse");
        assert_eq!(sql, "EXTRACT(MONTH from CURRENT_DATE())");
    }

    #[test]
    fn extract_missing_from() {
        let err = render_call::<Extract>("EXTRACT(YEAR u.createdAt)").unwrap_err();
        assert_eq!(
            err,
            Error::Syntax {
                position: 13,
                expected: Expected::Token(TokenType::Identifier),
                found: Found::Token("u.createdAt".into()),
            }
        );
        assert_eq!(
            err.to_string(),
            "[Syntax Error] col 13: Expected identifier, got 'u.createdAt'"
        );
    }

    #[test]
    fn extract_date_is_a_primary() {
        // Only a primary is accepted, arithmetic needs parentheses
        assert_eq!(
            render_call::<Extract>("EXTRACT(DAY FROM u.a + 1)").unwrap_err(),
            Error::Syntax {
                position: 21,
                expected: Expected::Token(TokenType::ParenRight),
                found: Found::Token("+".into()),
            }
        );
        let (_, sql) =
            render_call::<Extract>("EXTRACT(DAY FROM (u.a + 1))").expect("a valid parse");
        assert_eq!(sql, "EXTRACT(DAY from (u.a + 1))");
    }

    #[test]
    fn nvl2_with_string_literal() {
        let (_, sql) = render_call::<Nvl2>("NVL2(u.middleName, u.middleName, 'N/A')")
            .expect("a valid parse");
        assert_eq!(sql, "NVL2(u.middleName, u.middleName, 'N/A')");
    }

    #[test]
    fn nvl2_mixed_arguments() {
        let (_, sql) = render_call::<Nvl2>("NVL2(:deletedAt, 1, 0.5)").expect("a valid parse");
        assert_eq!(sql, "NVL2(?, 1, 0.5)");
    }

    #[test]
    fn nvl2_missing_second_comma() {
        assert_eq!(
            render_call::<Nvl2>("NVL2(u.a, u.b u.c)").unwrap_err(),
            Error::Syntax {
                position: 14,
                expected: Expected::Token(TokenType::Comma),
                found: Found::Token("u.c".into()),
            }
        );
    }

    #[test]
    fn nvl2_too_many_arguments() {
        assert_eq!(
            render_call::<Nvl2>("NVL2(u.a, u.b, u.c, u.d)").unwrap_err(),
            Error::Syntax {
                position: 18,
                expected: Expected::Token(TokenType::ParenRight),
                found: Found::Token(",".into()),
            }
        );
    }

    #[test]
    fn rendering_is_repeatable() {
        let registry = crate::registry::Registry::new();
        let mut parser = Parser::new("NVL2(u.a, 'yes', 'no')", &registry);
        let node = Nvl2::parse(&mut parser).expect("a valid parse");
        let tree = parser.finish();
        let config = crate::walker::WalkerConfig::default();
        let walker = SqlWalker::new(&tree, &config);
        let first = walker.walk_function(&node);
        assert_eq!(first, walker.walk_function(&node));
        assert_eq!(first, "NVL2(u.a, 'yes', 'no')");
    }
}
