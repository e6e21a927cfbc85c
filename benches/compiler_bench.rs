use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use smlc::*;
use std::collections::BTreeSet;
use std::path::Path;

// Translation latency scenarios over the test fixtures.

const LIF_REFRACTORY: &str = include_str!("../compiler/tests/fixtures/lif_refractory.xml");
const IZHIKEVICH: &str = include_str!("../compiler/tests/fixtures/izhikevich.xml");
const EXP_SYN: &str = include_str!("../compiler/tests/fixtures/exp_syn.xml");
const FIXED_WEIGHT: &str = include_str!("../compiler/tests/fixtures/fixed_weight.xml");
const NETWORK: &str = include_str!("../compiler/tests/fixtures/network.xml");

fn scenarios() -> [(&'static str, &'static str, component::ComponentKind); 4] {
    use smlc::component::ComponentKind::*;
    [
        ("lif_refractory", LIF_REFRACTORY, NeuronBody),
        ("izhikevich", IZHIKEVICH, NeuronBody),
        ("exp_syn", EXP_SYN, Postsynaptic),
        ("fixed_weight", FIXED_WEIGHT, WeightUpdate),
    ]
}

/// Neuron body with `n_regimes` regimes chained in a ring, each with one
/// condition, one assignment and one derivative.
fn generate_ring_component(n_regimes: usize) -> String {
    let mut xml = String::from(
        "<SpineML><ComponentClass name=\"Ring\" type=\"neuron_body\"><Dynamics>\n",
    );
    for r in 0..n_regimes {
        let next = (r + 1) % n_regimes;
        xml.push_str(&format!(
            "<Regime name=\"r{r}\">\
             <OnCondition target_regime=\"r{next}\">\
             <StateAssignment variable=\"V\"><MathInline>V - k{r}</MathInline></StateAssignment>\
             <Trigger><MathInline>V &gt; k{r}</MathInline></Trigger>\
             <EventOut port=\"spike\"/>\
             </OnCondition>\
             <TimeDerivative variable=\"V\"><MathInline>(k{r} - V) / tau + I</MathInline></TimeDerivative>\
             </Regime>\n"
        ));
    }
    xml.push_str("<StateVariable name=\"V\"/></Dynamics>\n<AnalogReceivePort name=\"I\"/>\n");
    for r in 0..n_regimes {
        xml.push_str(&format!("<Parameter name=\"k{r}\"/>\n"));
    }
    xml.push_str("<Parameter name=\"tau\"/></ComponentClass></SpineML>\n");
    xml
}

fn memory_components() -> source::MemorySource {
    source::MemorySource::new()
        .with("lif_refractory.xml", LIF_REFRACTORY)
        .with("exp_syn.xml", EXP_SYN)
        .with("fixed_weight.xml", FIXED_WEIGHT)
}

// KPI: markup parse latency.
fn bench_kpi_parse_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("kpi/parse_latency");

    for (name, text, _) in scenarios() {
        group.bench_with_input(BenchmarkId::from_parameter(name), text, |b, text| {
            b.iter(|| {
                let result = parser::parse(black_box(text));
                black_box(&result.document);
            });
        });
    }

    group.finish();
}

// KPI: full component translation latency (parse -> read -> generate -> substitute).
fn bench_kpi_component_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("kpi/component_latency");
    let variables = BTreeSet::new();

    for (name, text, kind) in scenarios() {
        group.bench_with_input(BenchmarkId::from_parameter(name), text, |b, text| {
            b.iter(|| {
                let translated = pipeline::translate_component_text(
                    name,
                    black_box(text),
                    kind,
                    &variables,
                    &mut observe::NullObserver,
                )
                .expect("benchmark scenario must translate");
                black_box(translated);
            });
        });
    }

    group.finish();
}

// KPI: network translation latency, components served from memory.
fn bench_kpi_network_latency(c: &mut Criterion) {
    let source = memory_components();
    let options = network::TranslateOptions::default();

    c.bench_function("kpi/network_latency", |b| {
        b.iter(|| {
            let plan = pipeline::translate_network_text(
                "network.xml",
                black_box(NETWORK),
                "network",
                Path::new(""),
                &source,
                &options,
                &mut observe::NullObserver,
            )
            .expect("benchmark network must translate");
            black_box(plan);
        });
    });
}

// KPI: translation scaling with regime count.
fn bench_kpi_regime_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("kpi/regime_scaling");
    let variables = BTreeSet::new();

    for n in [1usize, 10, 50, 100] {
        let text = generate_ring_component(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &text, |b, text| {
            b.iter(|| {
                let translated = pipeline::translate_component_text(
                    "ring.xml",
                    black_box(text),
                    component::ComponentKind::NeuronBody,
                    &variables,
                    &mut observe::NullObserver,
                )
                .expect("ring component must translate");
                black_box(translated);
            });
        });
    }

    group.finish();
}

// KPI: token substitution throughput on a long buffer.
fn bench_kpi_substitution(c: &mut Criterion) {
    let mut group = c.benchmark_group("kpi/substitution");

    for n in [100usize, 1000] {
        let code: String = (0..n)
            .map(|i| format!("V{i} += DT * (V - V{i}x + tau);\n"))
            .collect();
        group.bench_with_input(BenchmarkId::from_parameter(n), &code, |b, code| {
            b.iter_batched(
                || code.clone(),
                |mut buffer| {
                    subst::wrap_variable_names(&mut buffer, "V");
                    subst::wrap_variable_names(&mut buffer, "tau");
                    black_box(buffer);
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_kpi_parse_latency,
    bench_kpi_component_latency,
    bench_kpi_network_latency,
    bench_kpi_regime_scaling,
    bench_kpi_substitution,
);
criterion_main!(benches);
