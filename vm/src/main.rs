use clap::{Parser as ClapParser, ValueEnum};
use std::process;

use heap::HeapSettings;
use object::{Value, ValueKind};
use vm::{Vm, VmError, VmSettings, demos};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Demo {
    /// `n factorial`
    Factorial,
    /// `(nil adder: n) value: m`, run after `adder:` has returned
    Closure,
    /// `n safeDivide: m`, answering 0 when m is zero
    Exception,
}

#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Built-in program to run
    #[arg(value_enum, default_value_t = Demo::Factorial)]
    demo: Demo,

    /// First operand
    #[arg(short, default_value_t = 10)]
    n: i64,

    /// Second operand (closure argument or divisor)
    #[arg(short, default_value_t = 5)]
    m: i64,

    /// Print the program's bytecode instead of running it
    #[arg(long, help = "Disassemble the demo method")]
    dump_bytecode: bool,

    /// Initial semispace size in words
    #[arg(long)]
    heap_words: Option<usize>,

    /// Maximum context depth
    #[arg(long)]
    max_depth: Option<usize>,

    /// Maximum number of nested run loops
    #[arg(long)]
    max_nested_runs: Option<usize>,

    /// Print collector statistics after the run
    #[arg(long)]
    gc_stats: bool,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if cli.dump_bytecode {
        let code = match cli.demo {
            Demo::Factorial => demos::factorial_bytecode(),
            Demo::Closure => demos::adder_bytecode(),
            Demo::Exception => demos::safe_divide_bytecode(),
        };
        match bytecode::disassemble(&code) {
            Ok(text) => print!("{text}"),
            Err(err) => {
                eprintln!("Error disassembling {:?}: {}", cli.demo, err);
                process::exit(1);
            }
        }
        return;
    }

    let mut settings = VmSettings::default();
    if let Some(words) = cli.heap_words {
        settings.heap = HeapSettings {
            initial_capacity: words,
            max_capacity: settings.heap.max_capacity.max(words),
            ..settings.heap
        };
    }
    if let Some(depth) = cli.max_depth {
        settings.max_depth = depth;
    }
    if let Some(runs) = cli.max_nested_runs {
        settings.max_nested_runs = runs;
    }

    let mut vm = match Vm::new(settings) {
        Ok(vm) => vm,
        Err(err) => {
            eprintln!("Error starting vm: {}", err);
            process::exit(1);
        }
    };

    match run(&mut vm, &cli) {
        Ok(value) => println!("{}", describe(&vm, value)),
        Err(err) => {
            eprintln!("Error: {}", err);
            process::exit(1);
        }
    }

    if cli.gc_stats {
        let stats = vm.gc_stats();
        eprintln!(
            "collections: {}, growths: {}, live: {} objects / {} words, copied: {}, capacity: {} words",
            stats.collections,
            stats.growths,
            stats.live_objects,
            stats.live_words,
            stats.total_copied,
            vm.heap().capacity_words()
        );
    }
}

fn run(vm: &mut Vm, cli: &Cli) -> Result<Value, VmError> {
    match cli.demo {
        Demo::Factorial => demos::run_factorial(vm, cli.n),
        Demo::Closure => demos::run_closure(vm, cli.n, cli.m),
        Demo::Exception => demos::run_exception(vm, cli.n, cli.m),
    }
}

fn describe(vm: &Vm, value: Value) -> String {
    match value.kind() {
        ValueKind::Integer => value.as_integer().map_or_else(|e| e.to_string(), |n| n.to_string()),
        ValueKind::Float => value.as_float().map_or_else(|e| e.to_string(), |f| f.to_string()),
        ValueKind::Nil | ValueKind::True | ValueKind::False => value.kind().name().to_string(),
        ValueKind::Reference => {
            let class = vm
                .class_of(value)
                .and_then(|c| vm.class_name(c).map(str::to_string))
                .unwrap_or_else(|_| "?".to_string());
            match vm.text_of(value) {
                Ok(text) => format!("{class} {text:?}"),
                Err(_) => format!("a {class}"),
            }
        }
    }
}
