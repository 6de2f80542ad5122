use criterion::{Criterion, black_box, criterion_group, criterion_main};
use heap::HeapSettings;
use object::Value;
use vm::{Vm, VmSettings, demos};

fn bench_settings(initial_capacity: usize) -> VmSettings {
    VmSettings {
        heap: HeapSettings {
            initial_capacity,
            ..HeapSettings::default()
        },
        ..VmSettings::default()
    }
}

fn prepared_vm(initial_capacity: usize) -> Vm {
    let mut vm = Vm::new(bench_settings(initial_capacity)).expect("bootstrap");
    demos::install_factorial(&mut vm).expect("install factorial");
    demos::install_adder(&mut vm).expect("install adder");
    demos::install_safe_divide(&mut vm).expect("install safeDivide:");
    vm
}

fn run_case(c: &mut Criterion, name: &str, initial_capacity: usize, iters_per_sample: usize) {
    let mut vm = prepared_vm(initial_capacity);
    let receiver = Value::from_integer(15).expect("integer");
    let warmup = vm.send(receiver, "factorial", &[]).expect("warmup");
    black_box(warmup);

    c.bench_function(&format!("{name}_factorial"), |b| {
        b.iter(|| {
            for _ in 0..iters_per_sample {
                let value = vm.send(receiver, "factorial", &[]).expect("factorial");
                black_box(value);
            }
        })
    });

    c.bench_function(&format!("{name}_closure"), |b| {
        let n = Value::from_integer(3).expect("integer");
        let x = Value::from_integer(4).expect("integer");
        b.iter(|| {
            for _ in 0..iters_per_sample {
                let block = vm.send(Value::NIL, "adder:", &[n]).expect("adder:");
                let value = vm.call_block(block, &[x]).expect("value:");
                black_box(value);
            }
        })
    });

    c.bench_function(&format!("{name}_handled_zero_divide"), |b| {
        let zero = Value::from_integer(0).expect("integer");
        b.iter(|| {
            for _ in 0..iters_per_sample {
                let value = vm.send(receiver, "safeDivide:", &[zero]).expect("safeDivide:");
                black_box(value);
            }
        })
    });
}

fn bench_interpreter(c: &mut Criterion) {
    run_case(c, "roomy_heap", 1 << 20, 16);
    // Small enough that most samples include a collection.
    run_case(c, "tight_heap", 4_000, 16);
}

criterion_group!(benches, bench_interpreter);
criterion_main!(benches);
