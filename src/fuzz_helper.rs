use crate::{Registry, WalkerConfig, compile, parser, walker::SqlWalker};

/// Compiles arbitrary input with every shipped extension registered. Errors
///  are expected and ignored; anything that parses must render the same way
///  twice.
pub fn compile_expr(expr: &str) {
    let registry = Registry::with_defaults();
    let config = WalkerConfig::default();
    let Ok((tree, root)) = parser::parse(expr, &registry) else {
        return;
    };
    let walker = SqlWalker::new(&tree, &config);
    let first = walker.dispatch(root);
    assert_eq!(first, walker.dispatch(root));

    // Compiled SQL only uses the spacing and case the walker produces, so it
    //  must be a fixed point when it is itself valid DQL.
    if let Ok(again) = compile(&first, &registry, &config) {
        assert_eq!(first, again, "recompiling {expr:?}");
    }
}
