//! Benchmark for transformation operations
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use graph_splice::graph::{DType, Graph, OpSpec, TensorId};
use graph_splice::subgraph::SubgraphView;
use graph_splice::transform::{copy, graph_replace};
use rustc_hash::FxHashMap;

/// A linear chain of `len` unary operations
fn make_chain(len: usize) -> (Graph, Vec<TensorId>) {
    let g = Graph::new();
    let mut tensors = Vec::with_capacity(len);
    let src = g.create_op(OpSpec::new("src", "Source").outputs_of(1, DType::F32));
    let mut prev = TensorId::new(src, 0);
    tensors.push(prev);
    for i in 0..len {
        let op = g.create_op(
            OpSpec::new(format!("step_{i}"), "Relu")
                .input(prev)
                .outputs_of(1, DType::F32),
        );
        prev = TensorId::new(op, 0);
        tensors.push(prev);
    }
    (g, tensors)
}

fn transform_benchmark(c: &mut Criterion) {
    c.bench_function("copy_chain_256_cross_graph", |b| {
        let (g, _) = make_chain(256);
        let sgv = SubgraphView::make_view(&g, g.ops()).unwrap();
        b.iter(|| {
            let dst = Graph::new();
            let result = copy(black_box(&sgv), &dst, "", "", true).unwrap();
            black_box(result)
        })
    });

    c.bench_function("graph_replace_chain_64", |b| {
        b.iter(|| {
            let (g, tensors) = make_chain(64);
            let alt = g.create_op(OpSpec::new("alt", "Source").outputs_of(1, DType::F32));
            let mut replacements = FxHashMap::default();
            replacements.insert(tensors[0], TensorId::new(alt, 0));
            let last = *tensors.last().unwrap();
            let result =
                graph_replace(&g, &[last], &replacements, "rw", "", false).unwrap();
            black_box(result)
        })
    });
}

criterion_group!(benches, transform_benchmark);
criterion_main!(benches);
