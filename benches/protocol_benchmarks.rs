//! Benchmarks for command parsing and option handling.

use std::collections::VecDeque;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use uci_frontend::engine::{Perft, PositionSpec};
use uci_frontend::engines::position::ShakmatyPerft;
use uci_frontend::sync::StopFlag;
use uci_frontend::uci::command::parse_uci_command;
use uci_frontend::uci::options::{ComboOption, IntegerSpinOption, UciOption};
use uci_frontend::uci::parameters::{tokens, GoParameters, PerftParameters};

fn bench_go_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("go_parsing");

    let lines = [
        ("depth", "depth 12"),
        ("clock", "wtime 300000 btime 295000 winc 2000 binc 2000 movestogo 40"),
        ("searchmoves", "searchmoves e2e4 d2d4 g1f3 c2c4 nodes 1000000 ponder"),
        ("ignored", "depth 5 foo bar baz infinite"),
    ];
    for (name, line) in lines {
        group.bench_with_input(BenchmarkId::new("go", name), &line, |b, line| {
            b.iter(|| {
                let mut toks: VecDeque<String> = tokens(black_box(line));
                GoParameters::parse(&mut toks)
            })
        });
    }

    group.finish();
}

fn bench_command_split(c: &mut Criterion) {
    c.bench_function("position_command", |b| {
        b.iter(|| {
            parse_uci_command(black_box(
                "position startpos moves e2e4 e7e5 g1f3 b8c6 f1b5 a7a6 b5a4 g8f6 e1g1 f8e7",
            ))
        })
    });
}

fn bench_options(c: &mut Criterion) {
    let mut group = c.benchmark_group("options");

    let mut spin = IntegerSpinOption::new("Hash", 16, 1, 65536, |_| {}).expect("valid option");
    group.bench_function("spin_set", |b| {
        let mut value = 0;
        b.iter(|| {
            value = (value + 1) % 70000;
            let text = value.to_string();
            let _ = spin.set_value(black_box(Some(text.as_str())));
        })
    });

    let mut combo = ComboOption::new(
        "Style",
        "Normal",
        ["Solid", "Normal", "Risky", "Berserk"],
        |_| {},
    )
    .expect("valid option");
    group.bench_function("combo_set", |b| {
        b.iter(|| {
            let _ = combo.set_value(black_box(Some("risky")));
            let _ = combo.set_value(black_box(Some("Normal")));
        })
    });
    group.bench_function("combo_to_uci", |b| b.iter(|| black_box(combo.to_uci())));

    group.finish();
}

fn bench_perft(c: &mut Criterion) {
    let mut group = c.benchmark_group("perft");
    let perft = ShakmatyPerft::new(shakmaty::CastlingMode::Standard);
    let startpos = PositionSpec::start_position();

    for depth in 1..=3 {
        let params = PerftParameters {
            depth,
            ..PerftParameters::default()
        };
        group.bench_with_input(BenchmarkId::new("startpos", depth), &params, |b, params| {
            b.iter(|| perft.divide(&startpos, black_box(params), &StopFlag::new()))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_go_parsing,
    bench_command_split,
    bench_options,
    bench_perft
);
criterion_main!(benches);
