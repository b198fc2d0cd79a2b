pub mod builtin_functions;
pub mod functions;
pub mod fuzz_helper;
pub mod lex;
pub mod parser;
pub mod registry;
pub mod walker;


use tracing::debug;

pub use functions::{FunctionNode, ParseFunction};
pub use parser::{Error, Parser};
pub use registry::{FunctionCategory, FunctionKind, Registry};
pub use walker::{SqlWalker, WalkerConfig};

/// Compiles a DQL scalar expression to SQL, dispatching calls to registered
///  function extensions.
pub fn compile(input: &str, registry: &Registry, config: &WalkerConfig) -> Result<String, Error> {
    let (tree, root) = parser::parse(input, registry)?;
    let sql = SqlWalker::new(&tree, config).dispatch(root);
    debug!(dql = input, sql = %sql, "compiled expression");
    Ok(sql)
}
