use criterion::{black_box, criterion_group, criterion_main, Criterion};

use interviewbot_core::generation::parse_generated_pairs;
use interviewbot_core::parser::parse_question_bank_str;

fn bench_generated_output(c: &mut Criterion) {
    let mut group = c.benchmark_group("generated_output");

    let strict = generated_list(10, '"');
    let chatty = format!("Sure! Here are the questions you asked for:\n\n{strict}\n\nGood luck!");
    let single_quoted = format!("Output: {}", generated_list(10, '\''));

    group.bench_function("strict", |b| {
        b.iter(|| parse_generated_pairs(black_box(&strict)))
    });

    group.bench_function("with_commentary", |b| {
        b.iter(|| parse_generated_pairs(black_box(&chatty)))
    });

    group.bench_function("single_quoted", |b| {
        b.iter(|| parse_generated_pairs(black_box(&single_quoted)))
    });

    group.finish();
}

fn bench_bank_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("bank_parsing");

    for n in [10, 100, 500] {
        let toml = generate_bank_toml(n);
        group.bench_function(format!("{n}_questions"), |b| {
            b.iter(|| parse_question_bank_str(black_box(&toml), black_box("bench.toml".as_ref())))
        });
    }

    group.finish();
}

fn generated_list(n: usize, quote: char) -> String {
    let items: Vec<String> = (0..n)
        .map(|i| {
            format!(
                "{{{quote}question{quote}: {quote}What is concept {i}?{quote}, \
                 {quote}answer{quote}: {quote}Concept {i} explained{quote}}}"
            )
        })
        .collect();
    format!("[{}]", items.join(", "))
}

fn generate_bank_toml(n: usize) -> String {
    let mut s = String::from("[bank]\nid = \"bench\"\nname = \"Benchmark\"\n");
    for i in 0..n {
        s.push_str(&format!(
            r#"
[[questions]]
question = "What is concept {i}?"
answer = "Concept {i} explained"
tags = ["bench"]
"#
        ));
    }
    s
}

criterion_group!(benches, bench_generated_output, bench_bank_parsing);
criterion_main!(benches);
