use crate::builtin_functions::BuiltinFunction;
use crate::functions::FunctionNode;
use crate::lex::{Error as LexerError, Lexer, Token, TokenType};
use crate::registry::Registry;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Neg,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression<'input> {
    NumberLiteral(&'input str),
    /// Contents between the quotes, doubled quotes left as written
    StringLiteral(&'input str),
    /// `u` or `u.createdAt`; [field] keeps any further dotted segments
    Path {
        alias: &'input str,
        field: Option<&'input str>,
    },
    InputParameter(&'input str),
    FunctionCall {
        name: BuiltinFunction,
        args: ArgList,
    },
    /// A call handled by a registered function extension
    Custom(FunctionId),
    BinaryOperator(ExpressionId, BinaryOp, ExpressionId),
    UnaryOperator(UnaryOp, ExpressionId),
    Parenthesized(ExpressionId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpressionId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgList {
    start: usize,
    len: usize,
}

/// Instead of generating a tree of references or smart pointers (Rc), we'll
///  pack all expressions into a flat array and have them refer to each other by
///  an id (which is simply an index into that array).
///
/// Argument lists of built-in functions are packed contiguously into
///  [arg_lists], each [ArgList] referring to a span of it.
///
/// Nodes produced by function extensions are stored in [functions]. An
///  extension holds the ids of the sub-expressions it parsed; nothing else in
///  the tree refers to them.
#[derive(Debug, Default)]
pub struct ParseTree<'input> {
    /// All expressions are stored in a flat list. References are via ExpressionId.
    expressions: Vec<Expression<'input>>,
    /// All argument lists are stored packed contiguously
    arg_lists: Vec<ExpressionId>,
    functions: Vec<Box<dyn FunctionNode>>,
}

impl<'input> ParseTree<'input> {
    pub fn push_expr(&mut self, expr: Expression<'input>) -> ExpressionId {
        let id = ExpressionId(self.expressions.len());
        self.expressions.push(expr);
        id
    }

    pub fn push_args(&mut self, ids: impl ExactSizeIterator<Item = ExpressionId>) -> ArgList {
        let start = self.arg_lists.len();
        let len = ids.len();
        self.arg_lists.extend(ids);
        ArgList { start, len }
    }

    pub fn push_function(&mut self, node: Box<dyn FunctionNode>) -> FunctionId {
        let id = FunctionId(self.functions.len());
        self.functions.push(node);
        id
    }

    /// Ids are only ever handed out by this tree, so indexing can't miss.
    #[inline]
    pub fn expr(&self, id: ExpressionId) -> &Expression<'input> {
        &self.expressions[id.0]
    }

    /// Get the ExpressionIds representing a particular argument list
    #[inline]
    pub fn get_args(&self, list: &ArgList) -> &[ExpressionId] {
        &self.arg_lists[list.start..list.start + list.len]
    }

    #[inline]
    pub fn function(&self, id: FunctionId) -> &dyn FunctionNode {
        self.functions[id.0].as_ref()
    }

    pub fn functions(&self) -> impl Iterator<Item = &dyn FunctionNode> {
        self.functions.iter().map(|f| f.as_ref())
    }
}

/// What the parser was looking for when it gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expected {
    Token(TokenType),
    ArithmeticPrimary,
    StringPrimary,
    KnownFunction,
    EndOfString,
}

impl std::fmt::Display for Expected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Token(ty) => write!(f, "{ty}"),
            Self::ArithmeticPrimary => write!(f, "arithmetic primary"),
            Self::StringPrimary => write!(f, "string primary"),
            Self::KnownFunction => write!(f, "known function"),
            Self::EndOfString => write!(f, "end of string"),
        }
    }
}

/// What the parser found instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Found {
    Token(String),
    EndOfString,
}

impl std::fmt::Display for Found {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Token(text) => write!(f, "'{text}'"),
            Self::EndOfString => write!(f, "end of string"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("[Syntax Error] {0}")]
    Lexical(#[from] LexerError),
    #[error("[Syntax Error] col {position}: Expected {expected}, got {found}")]
    Syntax {
        position: usize,
        expected: Expected,
        found: Found,
    },
    #[error(
        "[Syntax Error] col {position}: Expressions can't nest deeper than {} levels",
        MAX_NESTING_DEPTH
    )]
    TooDeep { position: usize },
}

/// How many primaries may be open at once. Parsing and rendering both recurse
///  once per level, so this bounds their stack use.
pub const MAX_NESTING_DEPTH: usize = 256;

/// The recursive-descent parser for DQL scalar expressions. Function
///  extensions receive it by `&mut` while they parse their own arguments and
///  drive it through [match_token] and the `*_primary`/`*_expression` entry
///  points.
pub struct Parser<'a> {
    input: &'a str,
    lexer: Lexer<'a>,
    registry: &'a Registry,
    tree: ParseTree<'a>,
    scratch: Vec<ExpressionId>,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str, registry: &'a Registry) -> Self {
        Self {
            input,
            lexer: Lexer::new(input),
            registry,
            tree: ParseTree {
                expressions: Vec::with_capacity(16),
                arg_lists: Vec::with_capacity(8),
                functions: Vec::new(),
            },
            scratch: Vec::with_capacity(16),
            depth: 0,
        }
    }

    pub fn tree(&self) -> &ParseTree<'a> {
        &self.tree
    }

    pub fn finish(self) -> ParseTree<'a> {
        self.tree
    }

    /// The next token, without consuming it.
    pub fn lookahead(&self) -> Result<Option<Token>, Error> {
        Ok(self.lexer.peek_token()?)
    }

    /// Source text of a token produced by this parser.
    pub fn text(&self, token: &Token) -> &'a str {
        self.lexer.source_of(token)
    }

    fn syntax_error(&self, expected: Expected, found: Option<Token>) -> Error {
        match found {
            Some(tok) => Error::Syntax {
                position: tok.start,
                expected,
                found: Found::Token(self.text(&tok).to_owned()),
            },
            None => Error::Syntax {
                position: self.input.len(),
                expected,
                found: Found::EndOfString,
            },
        }
    }

    /// Consumes the next token if it is of kind [ty], otherwise fails without
    ///  advancing.
    pub fn match_token(&mut self, ty: TokenType) -> Result<Token, Error> {
        let mut lexer = self.lexer.clone();
        match lexer.next_token()? {
            Some(tok) if tok.ty == ty => {
                self.lexer = lexer;
                Ok(tok)
            }
            other => Err(self.syntax_error(Expected::Token(ty), other)),
        }
    }

    /// Fails unless all input has been consumed.
    pub fn expect_end(&self) -> Result<(), Error> {
        match self.lexer.peek_token()? {
            None => Ok(()),
            tok => Err(self.syntax_error(Expected::EndOfString, tok)),
        }
    }

    /// `term {("+" | "-") term}*` where a term is `factor {("*" | "/") factor}*`
    ///  and a factor is an optionally signed arithmetic primary.
    pub fn arithmetic_expression(&mut self) -> Result<ExpressionId, Error> {
        self.parse_binary_op(0)
    }

    pub fn arithmetic_primary(&mut self) -> Result<ExpressionId, Error> {
        self.parse_primary(Expected::ArithmeticPrimary)
    }

    /// Like [arithmetic_primary] but without numbers, parenthesized
    ///  arithmetic or bare identification variables.
    pub fn string_primary(&mut self) -> Result<ExpressionId, Error> {
        self.parse_primary(Expected::StringPrimary)
    }

    fn parse_binary_op(&mut self, min_binding_power: u8) -> Result<ExpressionId, Error> {
        let mut lhs = match self.lexer.peek_token()? {
            Some(prefix) if prefix.ty == TokenType::Plus || prefix.ty == TokenType::Minus => {
                self.lexer.next_token()?;
                // A single sign only: `--` would open a comment in the SQL
                let operand = self.arithmetic_primary()?;
                let op = if prefix.ty == TokenType::Minus {
                    UnaryOp::Neg
                } else {
                    UnaryOp::Plus
                };
                self.tree.push_expr(Expression::UnaryOperator(op, operand))
            }
            _ => self.arithmetic_primary()?,
        };

        // now that we have our left side, expect a series of operators or EOF
        loop {
            let Some(op_tok) = self.lexer.peek_token()? else {
                break;
            };
            let Some((op, l_pow, r_pow)) = infix_binding(op_tok.ty) else {
                break;
            };
            if l_pow < min_binding_power {
                break;
            }

            // Consume the operator token
            self.lexer.next_token()?;
            let rhs = self.parse_binary_op(r_pow)?;
            lhs = self
                .tree
                .push_expr(Expression::BinaryOperator(lhs, op, rhs));
        }

        Ok(lhs)
    }

    fn parse_primary(&mut self, expected: Expected) -> Result<ExpressionId, Error> {
        // Every recursive path (parentheses, call arguments, extensions) goes
        //  through here
        if self.depth >= MAX_NESTING_DEPTH {
            let position = self
                .lexer
                .peek_token()?
                .map_or(self.input.len(), |tok| tok.start);
            return Err(Error::TooDeep { position });
        }
        self.depth += 1;
        let res = self.parse_nested_primary(expected);
        self.depth -= 1;
        res
    }

    fn parse_nested_primary(&mut self, expected: Expected) -> Result<ExpressionId, Error> {
        let arithmetic = expected == Expected::ArithmeticPrimary;
        let Some(tok) = self.lexer.peek_token()? else {
            return Err(self.syntax_error(expected, None));
        };

        let expr = match tok.ty {
            TokenType::ParenLeft if arithmetic => {
                self.lexer.next_token()?;
                let inner = self.arithmetic_expression()?;
                self.match_token(TokenType::ParenRight)?;
                Expression::Parenthesized(inner)
            }
            TokenType::Integer | TokenType::Float if arithmetic => {
                self.lexer.next_token()?;
                Expression::NumberLiteral(self.text(&tok))
            }
            TokenType::String => {
                self.lexer.next_token()?;
                Expression::StringLiteral(self.lexer.contents(&tok))
            }
            TokenType::InputParameter => {
                self.lexer.next_token()?;
                Expression::InputParameter(self.text(&tok))
            }
            TokenType::Path => {
                self.lexer.next_token()?;
                let (alias, field) = self
                    .text(&tok)
                    .split_once('.')
                    .map_or((self.text(&tok), None), |(alias, field)| {
                        (alias, Some(field))
                    });
                Expression::Path { alias, field }
            }
            TokenType::Identifier => {
                // If next token is a left paren, it's a function call
                if let Some(Token {
                    ty: TokenType::ParenLeft,
                    ..
                }) = self.lexer.peek_second_token()?
                {
                    return self.function_declaration(tok);
                }
                // otherwise an identification variable, which only arithmetic
                //  accepts
                if !arithmetic {
                    return Err(self.syntax_error(expected, Some(tok)));
                }
                self.lexer.next_token()?;
                Expression::Path {
                    alias: self.text(&tok),
                    field: None,
                }
            }
            _ => return Err(self.syntax_error(expected, Some(tok))),
        };
        Ok(self.tree.push_expr(expr))
    }

    /// Built-in functions win over registered ones. The name token is left in
    ///  the stream: the function's own grammar starts with it.
    fn function_declaration(&mut self, name_token: Token) -> Result<ExpressionId, Error> {
        let name = self.text(&name_token);
        if let Some(builtin) = BuiltinFunction::lookup(name) {
            return self.builtin_call(builtin);
        }

        let Some(factory) = self.registry.lookup(name) else {
            return Err(self.syntax_error(Expected::KnownFunction, Some(name_token)));
        };
        trace!(
            function = name,
            position = name_token.start,
            "dispatching to custom function"
        );
        let node = factory(self)?;
        let id = self.tree.push_function(node);
        Ok(self.tree.push_expr(Expression::Custom(id)))
    }

    fn builtin_call(&mut self, name: BuiltinFunction) -> Result<ExpressionId, Error> {
        // We'll use the scratch buffer to accumulate the ExpressionIds of the args
        // At the end we'll drain them into the ParseTree. We do need to track where
        //  we're starting because we might be recursed multiple levels and prior
        //  stack frames are also using this buffer so it might not be empty.
        let scratch_start = self.scratch.len();

        self.match_token(TokenType::Identifier)?;
        self.match_token(TokenType::ParenLeft)?;

        // Zero or more arguments
        if !matches!(
            self.lexer.peek_token()?,
            Some(Token {
                ty: TokenType::ParenRight,
                ..
            })
        ) {
            loop {
                let arg = self.arithmetic_expression()?;
                self.scratch.push(arg);
                if self.match_token(TokenType::Comma).is_err() {
                    break;
                }
            }
        }
        self.match_token(TokenType::ParenRight)?;

        let args = self.tree.push_args(self.scratch.drain(scratch_start..));
        Ok(self
            .tree
            .push_expr(Expression::FunctionCall { name, args }))
    }
}

/// Parses a complete DQL scalar expression.
pub fn parse<'a>(
    input: &'a str,
    registry: &'a Registry,
) -> Result<(ParseTree<'a>, ExpressionId), Error> {
    let mut parser = Parser::new(input, registry);
    let root = parser.arithmetic_expression()?;

    // Make sure we've completely parsed the input
    parser.expect_end()?;
    Ok((parser.finish(), root))
}

// NOTE infix_binding specifies the "binding power" of the infix operators.
//  Binding power is a more intuitive version of "precedence": higher binding
//  power means the operator binds more tightly. So multiplication has a higher
//  binding power than addition. Prefix signs apply to a single primary and
//  bind tighter than any of them.

// NOTE for infix bindings we specify a left and right side of the operator,
//  this slight assymetry prevents us from getting stuck on ties and makes
//  every operator left-associative.
fn infix_binding(ty: TokenType) -> Option<(BinaryOp, u8, u8)> {
    match ty {
        TokenType::Plus => Some((BinaryOp::Add, 50, 51)),
        TokenType::Minus => Some((BinaryOp::Sub, 50, 51)),
        TokenType::Asterisk => Some((BinaryOp::Mul, 60, 61)),
        TokenType::ForwardSlash => Some((BinaryOp::Div, 60, 61)),
        _ => None,
    }
}
