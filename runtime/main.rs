use std::path::PathBuf;

use anyhow::{Context, Result};
use cell_core::{Opcode, RootSet, RuntimeConfig, Value, Vm};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Runs the cell_core demo program", long_about = None)]
struct Cli {
    /// TOML file with runtime limits and the collector root set
    #[arg(long)]
    config: Option<PathBuf>,
    /// Collect from the argument stack only; the global namespace is kept
    /// but not traced
    #[arg(long)]
    argument_roots: bool,
    /// Also bind `put_5` globally and run it through a named call
    #[arg(long)]
    invoke: bool,
}

fn main() -> Result<()> {
    install_tracing();
    let cli = Cli::parse();

    let mut config = match cli.config.as_deref() {
        Some(path) => RuntimeConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => RuntimeConfig::default(),
    };
    if cli.argument_roots {
        config = config.with_roots(RootSet::ArgumentStack);
    }

    let mut vm = Vm::with_config(config);
    let name = vm.make_string("put_5");
    let entry = vm.assemble(vec![
        Value::Opcode(Opcode::Compile),
        Value::Integer(3),
        Value::Opcode(Opcode::LoadImmediate),
        Value::Integer(17),
        Value::Opcode(Opcode::Return),
        Value::Opcode(Opcode::LoadImmediate),
        Value::Str(name),
        Value::Opcode(Opcode::MakeRecord),
        Value::Opcode(Opcode::SetAttr),
        Value::Opcode(Opcode::Halt),
    ]);

    let result = vm
        .execute(entry)
        .with_context(|| format!("demo program failed\n{}", vm.backtrace().join("\n")))?;
    println!("Result {}", vm.render(&result));

    if cli.invoke {
        invoke_put_5(&mut vm, result)?;
    }

    vm.reset();
    info!(heap = %vm.heap().stats(), "collecting after reset");
    let stats = vm.collect_garbage();
    println!("Collected: {stats}");
    Ok(())
}

fn invoke_put_5(vm: &mut Vm, record: Value) -> Result<()> {
    let record = record.expect_record("cell-runtime.result")?;
    let key = vm.make_string("put_5");
    let code = vm
        .heap()
        .get_attr(record, Value::Str(key))?
        .expect_procedure("cell-runtime.put_5")?;
    vm.define_word("put_5", code)?;

    let caller = vm.assemble(vec![Value::Str(key), Value::Opcode(Opcode::Halt)]);
    let value = vm
        .execute(caller)
        .with_context(|| format!("named call failed\n{}", vm.backtrace().join("\n")))?;
    println!("put_5 {}", vm.render(&value));
    Ok(())
}

fn install_tracing() {
    let filter = EnvFilter::try_from_env("CELL_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
