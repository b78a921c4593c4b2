//! Backward-transformer benchmark: the three-qubit bit-flip code

use criterion::{criterion_group, criterion_main, Criterion};
use nqpv::session::Session;

const BIT_FLIP: &str = r#"
    setting SILENT := true end
    def pf := proof [q q1 q2] :
        { P0[q] };
        [q1 q2] :=0;
        [q q1] *= CX;
        [q q2] *= CX;
        ( skip # q *= X # q1 *= X # q2 *= X );
        [q q1] *= CX;
        [q q2] *= CX;
        [q1 q2 q] *= CCX;
        { P0[q] }
    end
"#;

fn bench_bit_flip_code(c: &mut Criterion) {
    c.bench_function("verify_bit_flip_code", |b| {
        b.iter(|| {
            let mut session = Session::new(std::env::temp_dir());
            session.run(BIT_FLIP).expect("benchmark source parses")
        })
    });
}

criterion_group!(benches, bench_bit_flip_code);
criterion_main!(benches);
