use std::fmt::{Debug, Formatter, Result};

use crate::{
    parser::{self, Parser},
    walker::SqlWalker,
};

pub mod mysql;
pub mod oracle;

/// A parsed call to a function the DQL grammar doesn't know natively.
///
/// Nodes are created by [ParseFunction::parse], so a node always holds fully
///  parsed argument slots and rendering it can't fail for lack of input.
pub trait FunctionNode: Debug {
    /// The canonical SQL name of the function.
    fn name(&self) -> &'static str;

    /// Writes the vendor SQL for this call. Sub-expressions go through
    ///  [SqlWalker::node] so that nested expressions render with the same
    ///  rules as everything else.
    fn to_sql(&self, out: &mut Formatter<'_>, walker: &SqlWalker<'_>) -> Result;
}

/// The parsing half of a function extension.
///
/// `parse` is handed the parser positioned at the function's name and must
///  consume everything up to and including the closing parenthesis.
pub trait ParseFunction: FunctionNode + Sized + 'static {
    fn parse(parser: &mut Parser<'_>) -> std::result::Result<Self, parser::Error>;
}

/// How the registry instantiates extensions: one call per call site.
pub type FunctionFactory =
    fn(&mut Parser<'_>) -> std::result::Result<Box<dyn FunctionNode>, parser::Error>;

pub fn factory<T: ParseFunction>(
    parser: &mut Parser<'_>,
) -> std::result::Result<Box<dyn FunctionNode>, parser::Error> {
    Ok(Box::new(T::parse(parser)?))
}

/// Shared by the extension test modules: parse a single call with [T] and
///  render it on its own.
#[cfg(test)]
pub(crate) fn render_call<T: ParseFunction>(
    input: &str,
) -> std::result::Result<(T, String), parser::Error> {
    let registry = crate::registry::Registry::with_defaults();
    let mut parser = Parser::new(input, &registry);
    let node = T::parse(&mut parser)?;
    parser.expect_end()?;
    let tree = parser.finish();
    let config = crate::walker::WalkerConfig::default();
    let sql = SqlWalker::new(&tree, &config).walk_function(&node);
    Ok((node, sql))
}
