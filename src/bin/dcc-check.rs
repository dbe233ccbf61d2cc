use std::fs;
use std::process;

use anyhow::{Context, Result, bail};
use decafc::Compiler;
use tracing_subscriber::EnvFilter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_usage() {
    println!("Decaf Checker v{}", VERSION);
    println!("Usage: dcc-check <source_file.decaf>...");
    println!();
    println!("只运行语义检查，逐个文件输出诊断。");
    println!();
    println!("Options:");
    println!("  --version, -v         显示版本号");
    println!("  --help, -h            显示帮助信息");
}

/// 检查一个文件，返回诊断条数
fn check_file(compiler: &Compiler, path: &str) -> Result<usize> {
    let source = fs::read_to_string(path).with_context(|| format!("无法读取 {}", path))?;
    let diagnostics = compiler.check(&source).with_context(|| format!("检查 {} 失败", path))?;

    if diagnostics.is_empty() {
        println!("{}: ok", path);
    } else {
        println!("{}:", path);
        println!("{}", diagnostics);
    }
    Ok(diagnostics.len())
}

fn run(args: &[String]) -> Result<usize> {
    let mut files = Vec::new();
    for arg in &args[1..] {
        match arg.as_str() {
            "--version" | "-v" => {
                println!("Decaf Checker v{}", VERSION);
                process::exit(0);
            }
            "--help" | "-h" => {
                print_usage();
                process::exit(0);
            }
            _ if arg.starts_with('-') => bail!("未知选项: {}", arg),
            _ => files.push(arg.as_str()),
        }
    }

    if files.is_empty() {
        print_usage();
        bail!("缺少源文件");
    }

    let compiler = Compiler::new();
    let mut total = 0;
    for file in files {
        total += check_file(&compiler, file)?;
    }
    Ok(total)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    match run(&args) {
        Ok(0) => {}
        Ok(_) => process::exit(1),
        Err(err) => {
            eprintln!("Error: {:#}", err);
            process::exit(2);
        }
    }
}
