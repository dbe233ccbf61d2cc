use std::fs;
use std::process;

use anyhow::{Context, Result, bail};
use decafc::Compiler;
use decafc::config::CodegenOptions;
use decafc::error::DecafError;
use tracing_subscriber::EnvFilter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

struct CliOptions {
    input: Option<String>,
    output: Option<String>,
    bounds_checks: bool,
}

impl Default for CliOptions {
    fn default() -> Self {
        CliOptions {
            input: None,
            output: None,
            bounds_checks: true,
        }
    }
}

fn print_usage() {
    println!("Decaf Compiler v{}", VERSION);
    println!("Usage: dcc [options] <source_file.decaf>");
    println!();
    println!("Options:");
    println!("  -o <file>             输出三地址码到文件 (默认: 标准输出)");
    println!("  --no-bounds-checks    不生成数组越界检查");
    println!("  --version, -v         显示版本号");
    println!("  --help, -h            显示帮助信息");
    println!();
    println!("Environment:");
    println!("  RUST_LOG=debug        输出各编译阶段的日志");
}

fn parse_args(args: &[String]) -> Result<CliOptions> {
    let mut options = CliOptions::default();
    let mut i = 1;

    while i < args.len() {
        let arg = &args[i];
        match arg.as_str() {
            "--version" | "-v" => {
                println!("Decaf Compiler v{}", VERSION);
                process::exit(0);
            }
            "--help" | "-h" => {
                print_usage();
                process::exit(0);
            }
            "-o" => {
                i += 1;
                match args.get(i) {
                    Some(path) => options.output = Some(path.clone()),
                    None => bail!("-o 需要一个文件名"),
                }
            }
            "--no-bounds-checks" => {
                options.bounds_checks = false;
            }
            _ if arg.starts_with('-') => bail!("未知选项: {}", arg),
            _ => {
                if options.input.is_some() {
                    bail!("只能指定一个源文件");
                }
                options.input = Some(arg.clone());
            }
        }
        i += 1;
    }

    Ok(options)
}

fn run(args: &[String]) -> Result<()> {
    let options = parse_args(args)?;
    let Some(input) = options.input else {
        print_usage();
        bail!("缺少源文件");
    };

    let source = fs::read_to_string(&input).with_context(|| format!("无法读取 {}", input))?;

    let mut codegen = CodegenOptions::default();
    if !options.bounds_checks {
        codegen = codegen.without_bounds_checks();
    }

    let tac = match Compiler::with_options(codegen).compile(&source) {
        Ok(tac) => tac,
        Err(DecafError::Check(diagnostics)) => {
            eprintln!("{}", diagnostics);
            bail!("{}: {} 个语义错误", input, diagnostics.len());
        }
        Err(err) => return Err(err).with_context(|| format!("编译 {} 失败", input)),
    };

    match options.output {
        Some(path) => fs::write(&path, tac).with_context(|| format!("无法写入 {}", path))?,
        None => print!("{}", tac),
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if let Err(err) = run(&args) {
        eprintln!("Error: {:#}", err);
        process::exit(1);
    }
}
