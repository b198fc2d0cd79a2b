use dql_functions::{Registry, WalkerConfig, compile};
use tracing_subscriber::EnvFilter;

// Registration and compilation events are logged at debug
const DEFAULT_FILTER: &str = "dql_functions=debug";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .init();

    let registry = Registry::with_defaults();
    let config = WalkerConfig::default();

    for line in std::io::stdin().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                eprintln!("Error reading input: {e}");
                break;
            }
        };
        let now = std::time::Instant::now();
        let res = compile(&line, &registry, &config);
        print!("[in {}μs] ", now.elapsed().as_micros());
        match res {
            Err(e) => println!("Error compiling input: {e}"),
            Ok(sql) => println!("{sql}"),
        }
    }
}
