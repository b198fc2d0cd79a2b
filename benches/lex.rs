use criterion::{Criterion, criterion_group, criterion_main};

const TESTS: [&str; 5] = [
    r#"DATE_FORMAT(u.createdAt, '%Y-%m-%d')"#,
    r#"EXTRACT(YEAR FROM u.createdAt)"#,
    r#"NVL2(u.middleName, u.middleName, 'N/A')"#,
    r#"nvl2(u.deletedAt, date_format(u.deletedAt, '%d/%m'), 'it''s active')"#,
    r#"(u.price + :tax) * 1.25 - ?1 / CONCAT(LOWER(u.name), '-')"#,
];

fn lex_all() {
    use dql_functions::lex::Lexer;
    // we'll track the number of tokens seen to ensure that the loop below doesn't
    //  get optimized out
    let mut num_tokens: u64 = 0;
    for test in TESTS {
        let mut lexer = Lexer::new(test);
        loop {
            match lexer.next_token() {
                Ok(Some(_)) => num_tokens += 1,
                Ok(None) => break,
                Err(e) => panic!("Unexpected: {e}"),
            }
        }
    }
    assert_eq!(num_tokens, 52);
}

fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("lex some expressions", |b| b.iter(lex_all));
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
