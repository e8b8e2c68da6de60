use std::sync::Arc;

use fusor::types::{DataType, FieldInfo, StructType};
use fusor::{EvalError, Evaluator, Graph, NodeId, Value};
use miette::{Result, miette};
use once_cell::sync::Lazy;
use pretty_assertions::assert_eq;

static LAUNCH: Lazy<Arc<StructType>> = Lazy::new(|| {
    Arc::new(
        StructType::new(
            "Launch",
            [
                FieldInfo::new("blocks", DataType::Int),
                FieldInfo::new("threads", DataType::Int),
                FieldInfo::new("smem", DataType::Int).host_only(),
            ],
        )
        .expect("valid struct type"),
    )
});

fn eval(evaluator: &Evaluator<'_>, node: NodeId) -> Result<Value> {
    evaluator
        .evaluate(node)?
        .ok_or_else(|| miette!("{} is unknown", node))
}

#[test]
fn launch_parameters() -> Result<()> {
    let mut g = Graph::new();
    let numel = g.named_symbol("numel", DataType::Int)?;
    let threads = g.int(128);
    let blocks = g.ceil_div(numel, threads)?;
    let four = g.int(4);
    let elem_bytes = g.int(4);
    let smem = g.mul(threads, elem_bytes)?;
    let smem = g.mul(smem, four)?;
    let launch = g.struct_construct(
        LAUNCH.clone(),
        &[("blocks", blocks), ("threads", threads), ("smem", smem)],
    )?;
    let launch_blocks = g.get_attr(launch, "blocks")?;

    let mut evaluator = Evaluator::new(&g);
    assert_eq!(evaluator.evaluate(launch)?, None);

    evaluator.bind(numel, 1000i64)?;
    assert_eq!(eval(&evaluator, launch_blocks)?, Value::Int(8));
    let launch = eval(&evaluator, launch)?;
    assert_eq!(launch.attr("threads")?, Value::Int(128));
    assert_eq!(launch.attr("smem")?, Value::Int(2048));
    assert_eq!(
        launch.to_string(),
        "Launch { blocks: 8, threads: 128, smem: 2048 }"
    );
    Ok(())
}

#[test]
fn mixed_arithmetic_promotes_to_double() -> Result<()> {
    let mut g = Graph::new();
    let n = g.symbol(DataType::Int)?;
    let half = g.double(0.5);
    let scaled = g.mul(n, half)?;
    let rounded = g.cast(scaled, DataType::Int)?;
    let is_even = g.eq(scaled, rounded)?;

    assert_eq!(g.ty(scaled)?, &DataType::Double);

    let mut evaluator = Evaluator::new(&g);
    evaluator.bind(n, 7i64)?;
    assert_eq!(eval(&evaluator, scaled)?, Value::Double(3.5));
    assert_eq!(eval(&evaluator, rounded)?, Value::Int(3));
    assert_eq!(eval(&evaluator, is_even)?, Value::Bool(false));

    evaluator.bind(n, 8i64)?;
    assert_eq!(eval(&evaluator, is_even)?, Value::Bool(true));
    Ok(())
}

#[test]
fn integer_division_truncates_and_ceil_div_rounds_up() -> Result<()> {
    let mut g = Graph::new();
    let a = g.symbol(DataType::Int)?;
    let b = g.symbol(DataType::Int)?;
    let div = g.div(a, b)?;
    let rem = g.modulo(a, b)?;
    let ceil = g.ceil_div(a, b)?;

    let mut evaluator = Evaluator::new(&g);
    for (va, vb, q, r, c) in [
        (7i64, 2i64, 3i64, 1i64, 4i64),
        (-7, 2, -3, -1, -3),
        (7, -2, -3, 1, -3),
        (-7, -2, 3, -1, 4),
        (6, 3, 2, 0, 2),
    ] {
        evaluator.bind(a, va)?;
        evaluator.bind(b, vb)?;
        assert_eq!(eval(&evaluator, div)?, Value::Int(q), "{} / {}", va, vb);
        assert_eq!(eval(&evaluator, rem)?, Value::Int(r), "{} % {}", va, vb);
        assert_eq!(eval(&evaluator, ceil)?, Value::Int(c), "ceil({} / {})", va, vb);
    }
    Ok(())
}

#[test]
fn errors_render_as_diagnostics() -> Result<()> {
    let mut g = Graph::new();
    let a = g.symbol(DataType::Int)?;
    let zero = g.int(0);
    let q = g.div(a, zero)?;

    let mut evaluator = Evaluator::new(&g);
    evaluator.bind(a, 1i64)?;
    let err = evaluator.evaluate(q).unwrap_err();
    assert_eq!(err, EvalError::DivisionByZero { op: "div" });

    let report = miette::Report::new(err);
    assert_eq!(report.to_string(), "integer division by zero in `div`");
    assert_eq!(
        report.code().map(|code| code.to_string()),
        Some("fusor::division_by_zero".to_string())
    );
    Ok(())
}

#[test]
fn graphs_are_shared_across_threads() -> Result<()> {
    let mut g = Graph::new();
    let a = g.symbol(DataType::Int)?;
    let b = g.mul(a, a)?;

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4i64)
            .map(|i| {
                let g = &g;
                scope.spawn(move || -> Result<Value> {
                    let mut evaluator = Evaluator::new(g);
                    evaluator.bind(a, i)?;
                    eval(&evaluator, b)
                })
            })
            .collect();
        for (i, handle) in handles.into_iter().enumerate() {
            let value = handle.join().map_err(|_| miette!("worker panicked"))??;
            assert_eq!(value, Value::Int((i * i) as i64));
        }
        Ok(())
    })
}
