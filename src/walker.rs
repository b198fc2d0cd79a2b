use std::fmt::{self, Debug, Display, Formatter};

use crate::{
    functions::FunctionNode,
    parser::{Expression, ExpressionId, ParseTree, UnaryOp},
};

/// Decides how a path expression (`u.createdAt`) appears in the generated SQL.
///  The ORM would map entity aliases and fields to table aliases and columns
///  here.
pub trait PathResolver: Debug {
    fn write_path(&self, out: &mut Formatter<'_>, alias: &str, field: Option<&str>) -> fmt::Result;
}

/// Writes paths exactly as they appeared in the DQL.
#[derive(Debug, Clone, Copy, Default)]
pub struct VerbatimPaths;

impl PathResolver for VerbatimPaths {
    fn write_path(&self, out: &mut Formatter<'_>, alias: &str, field: Option<&str>) -> fmt::Result {
        match field {
            Some(field) => write!(out, "{alias}.{field}"),
            None => out.write_str(alias),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ParameterStyle {
    /// Every input parameter becomes `?`, the ORM binds them in order
    #[default]
    Positional,
    /// `:name` and `?1` are written as they appeared
    Verbatim,
}

#[derive(Debug)]
pub struct WalkerConfig {
    pub paths: Box<dyn PathResolver>,
    pub parameters: ParameterStyle,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            paths: Box::new(VerbatimPaths),
            parameters: ParameterStyle::default(),
        }
    }
}

/// Turns a [ParseTree] into SQL text. Function extensions receive the walker
///  in [FunctionNode::to_sql] and use it to render their sub-expressions.
pub struct SqlWalker<'a> {
    tree: &'a ParseTree<'a>,
    config: &'a WalkerConfig,
}

/// A sub-expression ready to be written with `{}`.
pub struct Walked<'w, 'a> {
    walker: &'w SqlWalker<'a>,
    id: ExpressionId,
}

impl Display for Walked<'_, '_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.walker.write_expr(f, self.id)
    }
}

struct WalkedFunction<'w, 'a> {
    walker: &'w SqlWalker<'a>,
    node: &'w dyn FunctionNode,
}

impl Display for WalkedFunction<'_, '_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.node.to_sql(f, self.walker)
    }
}

impl<'a> SqlWalker<'a> {
    pub fn new(tree: &'a ParseTree<'a>, config: &'a WalkerConfig) -> Self {
        Self { tree, config }
    }

    pub fn node(&self, id: ExpressionId) -> Walked<'_, 'a> {
        Walked { walker: self, id }
    }

    /// Renders a sub-expression to a string.
    pub fn dispatch(&self, id: ExpressionId) -> String {
        self.node(id).to_string()
    }

    /// Renders a function node that may not be part of the tree itself (a node
    ///  obtained from calling [ParseFunction::parse] directly, say).
    pub fn walk_function(&self, node: &dyn FunctionNode) -> String {
        WalkedFunction { walker: self, node }.to_string()
    }

    pub fn write_expr(&self, out: &mut Formatter<'_>, id: ExpressionId) -> fmt::Result {
        match self.tree.expr(id) {
            Expression::NumberLiteral(v) => out.write_str(v),
            // Escapes were kept as written, so this is already valid SQL
            Expression::StringLiteral(v) => write!(out, "'{v}'"),
            Expression::Path { alias, field } => self.config.paths.write_path(out, alias, *field),
            Expression::InputParameter(name) => match self.config.parameters {
                ParameterStyle::Positional => out.write_str("?"),
                ParameterStyle::Verbatim => out.write_str(name),
            },
            Expression::FunctionCall { name, args } => {
                write!(out, "{name}(")?;
                let mut is_first = true;
                for arg in self.tree.get_args(args) {
                    if is_first {
                        is_first = false;
                    } else {
                        write!(out, ", ")?;
                    }
                    self.write_expr(out, *arg)?;
                }
                write!(out, ")")
            }
            Expression::Custom(function) => self.tree.function(*function).to_sql(out, self),
            Expression::BinaryOperator(l, op, r) => {
                self.write_expr(out, *l)?;
                write!(out, " {} ", op.symbol())?;
                self.write_expr(out, *r)
            }
            Expression::UnaryOperator(op, operand) => {
                match op {
                    UnaryOp::Plus => write!(out, "+"),
                    UnaryOp::Neg => write!(out, "-"),
                }?;
                self.write_expr(out, *operand)
            }
            Expression::Parenthesized(inner) => {
                write!(out, "(")?;
                self.write_expr(out, *inner)?;
                write!(out, ")")
            }
        }
    }
}
