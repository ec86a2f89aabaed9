use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};

use chess_rooms::game::GameEngine;

/// Italian opening after 1.e4 e5 2.Nf3 Nc6 3.Bc4 Bc5; both sides can castle short.
const MIDDLEGAME: &[&str] = &["46:44:N", "41:43:N", "67:55:N", "10:22:N", "57:24:N", "50:23:N"];

fn engine_after(moves: &[&str]) -> GameEngine {
    let mut engine = GameEngine::new();
    for mv in moves {
        if let Err(e) = engine.make_move_str(mv) {
            panic!("bench setup move {} failed: {}", mv, e);
        }
    }
    engine
}

fn bench_legal_moves(c: &mut Criterion) {
    let mut group = c.benchmark_group("legal_moves");

    for (name, moves) in [("initial", &[][..]), ("middlegame", MIDDLEGAME)] {
        let mut engine = engine_after(moves);
        let expected = engine.legal_moves().map(|sets| sets.white.len()).unwrap_or(0);
        assert!(expected > 0, "{} has no white moves", name);

        group.bench_function(name, |b| {
            b.iter(|| {
                let sets = engine.legal_moves().map(|sets| sets.white.len() + sets.black.len());
                black_box(sets)
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_legal_moves);
criterion_main!(benches);
