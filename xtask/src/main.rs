use anyhow::{bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "x")]
#[command(about = "Development automation for r4300")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Formatting and clippy gate
    Check {
        /// Apply rustfmt and clippy fixes instead of failing
        #[arg(long)]
        fix: bool,
    },
    /// Run test suites
    Test {
        /// Suites to run (all tests when omitted)
        #[arg(value_enum)]
        suites: Vec<Suite>,
        #[arg(long)]
        ignored: bool,
    },
    /// Run criterion benchmarks
    Bench {
        /// Only benchmarks whose name contains this
        filter: Option<String>,
    },
    /// Run a code image on both engines and keep a register snapshot of each
    RunImage {
        /// Raw big-endian code image
        image: PathBuf,
        /// Load address (and initial PC)
        #[arg(short = 'a', long, default_value = "0x80000000")]
        address: String,
        /// Engine steps per run
        #[arg(short = 'n', long, default_value = "100000")]
        steps: u64,
        #[arg(long)]
        release: bool,
    },
}

/// Test groups addressable by module path
#[derive(Clone, Copy, ValueEnum)]
enum Suite {
    /// Decoder, interpreter and COP0/COP1
    Cpu,
    /// Block builder, caches and the recompiler bridge
    Jit,
    /// Interpreter against recompiler on the same programs
    Equivalence,
    /// Data memory adapter and flat bus
    Memory,
    /// tests/ integration suite
    Integration,
}

impl Suite {
    fn label(self) -> &'static str {
        match self {
            Suite::Cpu => "cpu",
            Suite::Jit => "jit",
            Suite::Equivalence => "equivalence",
            Suite::Memory => "memory",
            Suite::Integration => "integration",
        }
    }

    fn cargo_args(self) -> Vec<&'static str> {
        match self {
            Suite::Cpu => vec!["--lib", "core::cpu"],
            Suite::Jit => vec!["--lib", "core::jit"],
            Suite::Equivalence => vec!["--lib", "core::jit::tests::equivalence"],
            Suite::Memory => vec!["--lib", "core::memory"],
            Suite::Integration => vec!["--test", "integration_test"],
        }
    }
}

fn main() -> Result<()> {
    match Cli::parse().command {
        Commands::Check { fix } => run_check(fix),
        Commands::Test { suites, ignored } => run_tests(&suites, ignored),
        Commands::Bench { filter } => run_bench(filter.as_deref()),
        Commands::RunImage {
            image,
            address,
            steps,
            release,
        } => run_image(&image, &address, steps, release),
    }
}

fn run_check(fix: bool) -> Result<()> {
    println!("{}", "=== Check ===".bold().blue());
    let start = Instant::now();

    let mut fmt = cargo(&["fmt", "--all"]);
    if !fix {
        fmt.args(["--", "--check"]);
    }
    run_task("rustfmt", &mut fmt)?;

    let mut clippy = cargo(&["clippy", "--workspace", "--all-targets"]);
    if fix {
        clippy.args(["--fix", "--allow-dirty"]);
    } else {
        clippy.args(["--", "-D", "warnings"]);
    }
    run_task("clippy", &mut clippy)?;

    println!(
        "\n{} {}",
        "✓ Checks passed in".green().bold(),
        format!("{:.2}s", start.elapsed().as_secs_f64()).bold()
    );
    Ok(())
}

fn run_tests(suites: &[Suite], ignored: bool) -> Result<()> {
    let with_ignored = |cmd: &mut Command| {
        if ignored {
            cmd.args(["--", "--ignored"]);
        }
    };

    if suites.is_empty() {
        let mut cmd = cargo(&["test", "--workspace"]);
        with_ignored(&mut cmd);
        return execute(&mut cmd);
    }

    let mut failed = Vec::new();
    for &suite in suites {
        let mut cmd = cargo(&["test"]);
        cmd.args(suite.cargo_args());
        with_ignored(&mut cmd);

        println!("{} {} tests", "→".blue(), suite.label().bold());
        if execute(&mut cmd).is_err() {
            println!("{} {} failed\n", "✗".red(), suite.label());
            failed.push(suite.label());
        } else {
            println!("{} {} passed\n", "✓".green(), suite.label());
        }
    }

    if !failed.is_empty() {
        bail!("failing suites: {}", failed.join(", "));
    }
    Ok(())
}

fn run_bench(filter: Option<&str>) -> Result<()> {
    let mut cmd = cargo(&["bench", "--bench", "cpu_bench"]);
    if let Some(filter) = filter {
        cmd.args(["--", filter]);
    }
    execute(&mut cmd)
}

fn run_image(image: &Path, address: &str, steps: u64, release: bool) -> Result<()> {
    println!("{}", "=== Image Run ===".bold().blue());

    let size = match std::fs::metadata(image) {
        Ok(meta) => meta.len(),
        Err(_) => bail!("image not found: {}", image.display()),
    };
    if size == 0 || size % 4 != 0 {
        bail!("image size {} is not a whole number of instructions", size);
    }
    println!(
        "{} {} ({} instructions), {} steps\n",
        "→".blue(),
        image.display().to_string().cyan(),
        size / 4,
        steps
    );

    let out_dir = Path::new("target").join("xtask");
    std::fs::create_dir_all(&out_dir)?;

    for engine in ["interpreter", "recompiler"] {
        let dump = out_dir.join(format!("{}.json", engine));
        let mut cmd = cargo(&["run", "--bin", "r4300"]);
        if release {
            cmd.arg("--release");
        }
        cmd.arg("--")
            .arg(image)
            .args(["-a", address, "-n", &steps.to_string(), "--engine", engine])
            .arg("--dump")
            .arg(&dump);

        let start = Instant::now();
        execute(&mut cmd)?;
        println!(
            "{} {} in {}, snapshot at {}\n",
            "✓".green().bold(),
            engine.bold(),
            format!("{:.2}s", start.elapsed().as_secs_f64()).bold(),
            dump.display()
        );
    }
    Ok(())
}

fn cargo(args: &[&str]) -> Command {
    let mut cmd = Command::new("cargo");
    cmd.args(args);
    cmd
}

fn run_task(name: &str, cmd: &mut Command) -> Result<()> {
    println!("{} {}", "→".blue(), name);
    execute(cmd).inspect_err(|_| println!("{} {}", "✗".red().bold(), name))
}

fn execute(cmd: &mut Command) -> Result<()> {
    let status = cmd
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()?;

    if !status.success() {
        bail!("command failed with {}", status);
    }
    Ok(())
}
