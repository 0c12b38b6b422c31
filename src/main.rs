// External crates
use anyhow::{bail, Context, Result};
use burn::tensor::backend::Backend as BurnBackendTrait;
use log::{error, info};
use rayon::prelude::*;
use std::env;
use std::path::PathBuf;

// Local modules
use fusion_gru_check::fusion_gru::step_5_bf16_kernel::default_registry;
use fusion_gru_check::fusion_gru::step_6_test_cases::{
    registered_cases, test_check_output, FusionGruTestConfig,
};
use fusion_gru_check::util::run_report::{CaseOutcome, CheckRunReport};
use fusion_gru_check::CpuBackend;

/// Command-line options
#[derive(Debug, Default)]
struct CliArgs {
    config_path: Option<PathBuf>,
    seed: Option<u64>,
    report_dir: Option<PathBuf>,
}

fn parse_args(args: &[String]) -> Result<CliArgs> {
    let mut cli = CliArgs::default();
    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--seed" => {
                let value = iter.next().context("--seed needs a value")?;
                cli.seed = Some(value.parse().with_context(|| format!("Invalid seed '{}'", value))?);
            }
            "--report" => {
                let value = iter.next().context("--report needs a directory")?;
                cli.report_dir = Some(PathBuf::from(value));
            }
            flag if flag.starts_with("--") => bail!("Unknown option '{}'", flag),
            path => {
                if cli.config_path.is_some() {
                    bail!("Only one config path may be given");
                }
                cli.config_path = Some(PathBuf::from(path));
            }
        }
    }
    Ok(cli)
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let cli = parse_args(&args)?;

    let device = <CpuBackend as BurnBackendTrait>::Device::default();
    let registry = default_registry::<CpuBackend>(&device);
    let kernels = registry.op_types().join(", ");
    info!("Registered kernels: {}", kernels);

    let mut report = CheckRunReport::new(cli.seed);
    report.add_note(&format!("kernels: {}", kernels));
    if let Some(path) = &cli.config_path {
        report.add_note(&format!("config: {}", path.display()));
    }

    // Either one ad-hoc case from JSON or every registered case
    let cases: Vec<(String, FusionGruTestConfig)> = match &cli.config_path {
        Some(path) => {
            let config = FusionGruTestConfig::load(path)?;
            vec![(path.display().to_string(), config)]
        }
        None => registered_cases()
            .into_iter()
            .map(|case| (case.name.to_string(), case.config()))
            .collect(),
    };
    info!("Running {} fusion GRU case(s)", cases.len());

    let outcomes: Vec<CaseOutcome> = cases
        .into_par_iter()
        .map(|(name, mut config)| {
            if let Some(seed) = cli.seed {
                config.seed = seed;
            }
            match test_check_output::<CpuBackend>(&config, &registry, &device) {
                Ok(check) => CaseOutcome::passed(&name, config.seed, check.max_abs_diff()),
                Err(e) => CaseOutcome::failed(&name, config.seed, &e),
            }
        })
        .collect();

    for outcome in outcomes {
        match (&outcome.error, outcome.max_abs_diff) {
            (None, Some(diff)) => println!(
                "ok      {} (seed {}, max abs diff {})",
                outcome.name, outcome.seed, diff
            ),
            (Some(e), _) => {
                error!("{} failed: {}", outcome.name, e);
                println!("FAILED  {}: {}", outcome.name, e);
            }
            _ => println!("FAILED  {}", outcome.name),
        }
        report.record(outcome);
    }

    if let Some(dir) = &cli.report_dir {
        let path = report.save(dir)?;
        println!("Report written to {}", path.display());
    }

    let failed = report.failed_count();
    if failed > 0 {
        bail!("{} of {} case(s) failed", failed, report.cases.len());
    }
    println!("All {} case(s) passed", report.cases.len());
    Ok(())
}
