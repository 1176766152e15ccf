use criterion::{black_box, criterion_group, criterion_main, Criterion};
use varaction::{BlockId, Context, MemoryStore, NodeId, Op, Statement, TypeSpec};

/// `x = x + 1` repeated `n` times against a local uint32.
fn arithmetic_action(ctx: &mut Context, store: &mut MemoryStore, n: usize) -> BlockId {
    let x = ctx.new_identifier(store, "x", true).unwrap();
    ctx.arena_mut().declare(TypeSpec::Int, x);
    let block = (0..n)
        .map(|_| {
            let a = ctx.arena_mut();
            let one = a.new_number("1");
            let add = a.create_variable(Op::Add, Some(x), Some(one));
            Statement::expr(a.create_variable(Op::Assign, Some(x), Some(add)))
        })
        .collect();
    ctx.add_block(block)
}

/// `level += 1` on a store-bound variable, with write-back on every pass.
fn sysvar_action(ctx: &mut Context, store: &mut MemoryStore) -> BlockId {
    store.insert("level", 0u32);
    let level = ctx.new_identifier(store, "level", false).unwrap();
    let a = ctx.arena_mut();
    let one = a.new_number("1");
    let inc = a.create_variable(Op::PlusEquals, Some(level), Some(one));
    ctx.add_block(vec![Statement::expr(inc)])
}

/// `s = s + "abc"` with the local reset once it grows past 4 KiB.
fn string_action(ctx: &mut Context, store: &mut MemoryStore) -> (BlockId, NodeId) {
    let s = ctx.new_identifier(store, "s", true).unwrap();
    ctx.arena_mut().declare(TypeSpec::String, s);
    let a = ctx.arena_mut();
    let tail = a.new_string("abc");
    let cat = a.create_variable(Op::Add, Some(s), Some(tail));
    let asg = a.create_variable(Op::Assign, Some(s), Some(cat));
    (ctx.add_block(vec![Statement::expr(asg)]), s)
}

fn bench_eval(c: &mut Criterion) {
    let mut g = c.benchmark_group("eval");

    let mut ctx = Context::default();
    let mut store = MemoryStore::new();
    let arith = arithmetic_action(&mut ctx, &mut store, 64);
    g.bench_function("arith_64_stmts", |b| {
        b.iter(|| ctx.process_compound_statement(&mut store, black_box(arith)))
    });

    let mut ctx = Context::default();
    let mut store = MemoryStore::new();
    let sysvar = sysvar_action(&mut ctx, &mut store);
    g.bench_function("sysvar_write_back", |b| {
        b.iter(|| ctx.process_compound_statement(&mut store, black_box(sysvar)))
    });

    let mut ctx = Context::default();
    let mut store = MemoryStore::new();
    let (concat, s) = string_action(&mut ctx, &mut store);
    let reset = ctx.arena_mut().new_string("");
    let clear = ctx.arena_mut().create_variable(Op::Assign, Some(s), Some(reset));
    g.bench_function("string_concat", |b| {
        b.iter(|| {
            if ctx.value(s).map_or(0, |v| v.len()) > 4096 {
                let _ = ctx.process_variable(&mut store, clear);
            }
            ctx.process_compound_statement(&mut store, black_box(concat))
        })
    });

    g.finish();
}

criterion_group!(benches, bench_eval);
criterion_main!(benches);
