use clap::{Parser, Subcommand};
use qtl_clock::{FixedClock, LogicalClock, Ordinal, WallClock};
use qtl_core::config::{administrator_from_env_value, state_file_from_env_value};
use qtl_core::constants::{ADMIN_ENV_VAR, STATE_FILE_ENV_VAR};
use qtl_core::{
    BatchId, CoreConfig, LedgerError, LedgerState, Principal, QualityService, TestId, TestOutcome,
    TestRecord,
};
use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "qtl")]
#[command(about = "Quality test ledger CLI")]
struct Cli {
    /// Administrator principal
    #[arg(long, env = ADMIN_ENV_VAR, global = true)]
    admin: Option<String>,
    /// State snapshot file
    #[arg(long, env = STATE_FILE_ENV_VAR, global = true)]
    state: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a testing lab, or reactivate and rename an existing one
    AddLab {
        /// Principal performing the change (must be the administrator)
        #[arg(long)]
        caller: Principal,
        /// Lab principal
        lab: Principal,
        /// Lab display name
        name: String,
    },
    /// Deactivate a testing lab
    DeactivateLab {
        /// Principal performing the change (must be the administrator)
        #[arg(long)]
        caller: Principal,
        /// Lab principal
        lab: Principal,
    },
    /// Print whether a lab may submit results
    IsActive { lab: Principal },
    /// List registered labs
    Labs,
    /// Record a test result
    Record {
        /// Submitting lab principal
        #[arg(long)]
        caller: Principal,
        /// Logical ordinal (e.g. block height) to stamp; defaults to wall-clock milliseconds
        #[arg(long)]
        ordinal: Option<Ordinal>,
        test_id: TestId,
        batch_id: BatchId,
        /// fail, pass, inconclusive, or a raw result code
        #[arg(value_parser = parse_result_code)]
        result: u32,
        /// Free-form measurement payload
        #[arg(default_value = "")]
        parameters: String,
    },
    /// Show a recorded test result
    Get { test_id: TestId },
    /// Print whether a test passed for the given batch
    BatchPassed { batch_id: BatchId, test_id: TestId },
    /// List every result recorded for a batch
    Batch { batch_id: BatchId },
}

impl Commands {
    fn is_mutation(&self) -> bool {
        matches!(
            self,
            Commands::AddLab { .. } | Commands::DeactivateLab { .. } | Commands::Record { .. }
        )
    }

    /// Picks the clock for this invocation. `floor` is the latest ordinal already stored, so
    /// submission ordinals never decrease across runs.
    fn clock(&self, floor: Ordinal) -> Result<Arc<dyn LogicalClock>, LedgerError> {
        match self {
            Commands::Record {
                ordinal: Some(ordinal),
                ..
            } if *ordinal < floor => Err(LedgerError::InvalidInput(format!(
                "ordinal {ordinal} is below the latest recorded ordinal {floor}"
            ))),
            Commands::Record {
                ordinal: Some(ordinal),
                ..
            } => Ok(Arc::new(FixedClock::new(*ordinal))),
            _ => Ok(Arc::new(WallClock::starting_at(floor))),
        }
    }
}

/// Maps a label to its code; numeric input passes through untouched so the ledger can
/// reject out-of-domain codes itself.
fn parse_result_code(input: &str) -> Result<u32, String> {
    let trimmed = input.trim();
    if let Ok(code) = trimmed.parse::<u32>() {
        return Ok(code);
    }
    trimmed
        .parse::<TestOutcome>()
        .map(TestOutcome::code)
        .map_err(|e| e.to_string())
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("qtl_core=info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    let stdout = io::stdout();
    match run(cli, &mut stdout.lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<LedgerError>() {
                Some(ledger_err) => eprintln!("error {}: {}", ledger_err.code(), ledger_err),
                None => eprintln!("error: {err:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, out: &mut dyn Write) -> anyhow::Result<()> {
    let administrator = administrator_from_env_value(cli.admin)?;
    let state_file = state_file_from_env_value(cli.state);
    let cfg = Arc::new(CoreConfig::new(administrator, state_file)?);

    let state = LedgerState::load(cfg.state_file())?;
    let floor = state.ledger.latest_submission().unwrap_or_default();
    let clock = cli.command.clock(floor)?;
    let service = QualityService::with_state(cfg, clock, state);
    let mutation = cli.command.is_mutation();

    execute(&service, cli.command, out)?;

    if mutation {
        service.save()?;
    }
    Ok(())
}

fn execute(service: &QualityService, command: Commands, out: &mut dyn Write) -> anyhow::Result<()> {
    match command {
        Commands::AddLab { caller, lab, name } => {
            service.add_lab(&caller, lab.clone(), name.as_str())?;
            writeln!(out, "Added lab {lab} ({name})")?;
        }
        Commands::DeactivateLab { caller, lab } => {
            service.deactivate_lab(&caller, &lab)?;
            writeln!(out, "Deactivated lab {lab}")?;
        }
        Commands::IsActive { lab } => {
            writeln!(out, "{}", service.is_active(&lab))?;
        }
        Commands::Labs => {
            let labs = service.labs();
            if labs.is_empty() {
                writeln!(out, "No labs registered.")?;
            }
            for (lab, entry) in labs {
                let status = if entry.is_active { "active" } else { "inactive" };
                writeln!(out, "{lab}\t{}\t{status}", entry.name)?;
            }
        }
        Commands::Record {
            caller,
            test_id,
            batch_id,
            result,
            parameters,
            ..
        } => {
            service.record_result(&caller, test_id.clone(), batch_id.clone(), result, parameters)?;
            writeln!(out, "Recorded test {test_id} for batch {batch_id}")?;
        }
        Commands::Get { test_id } => match service.get_result(&test_id) {
            Some(record) => write_record(out, &test_id, &record)?,
            None => writeln!(out, "No result recorded for test {test_id}")?,
        },
        Commands::BatchPassed { batch_id, test_id } => {
            writeln!(out, "{}", service.is_batch_passed(&batch_id, &test_id))?;
        }
        Commands::Batch { batch_id } => {
            let results = service.results_for_batch(&batch_id);
            if results.is_empty() {
                writeln!(out, "No results recorded for batch {batch_id}")?;
            }
            for (test_id, record) in results {
                writeln!(
                    out,
                    "{test_id}\t{}\t{}\t{}",
                    record.result, record.lab, record.submitted_at
                )?;
            }
        }
    }
    Ok(())
}

fn write_record(out: &mut dyn Write, test_id: &TestId, record: &TestRecord) -> io::Result<()> {
    writeln!(out, "test:         {test_id}")?;
    writeln!(out, "batch:        {}", record.batch_id)?;
    writeln!(out, "lab:          {}", record.lab)?;
    writeln!(out, "submitted at: {}", record.submitted_at)?;
    writeln!(out, "result:       {} ({})", record.result, record.result.code())?;
    writeln!(out, "parameters:   {}", record.parameters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const ADMIN: &str = "ST1ADMIN";

    fn invoke(state: &TempDir, args: &[&str]) -> (anyhow::Result<()>, String) {
        let state_path = state.path().join("state.yaml");
        let mut argv = vec![
            "qtl".to_string(),
            "--admin".to_string(),
            ADMIN.to_string(),
            "--state".to_string(),
            state_path.display().to_string(),
        ];
        argv.extend(args.iter().map(|a| a.to_string()));

        let cli = Cli::try_parse_from(argv).expect("valid arguments");
        let mut out = Vec::new();
        let result = run(cli, &mut out);
        (result, String::from_utf8(out).unwrap())
    }

    fn ledger_code(result: anyhow::Result<()>) -> u32 {
        result
            .unwrap_err()
            .downcast_ref::<LedgerError>()
            .expect("ledger error")
            .code()
    }

    #[test]
    fn parse_result_code_accepts_labels_and_raw_codes() {
        assert_eq!(parse_result_code("pass"), Ok(1));
        assert_eq!(parse_result_code("Inconclusive"), Ok(2));
        assert_eq!(parse_result_code("3"), Ok(3));
        assert!(parse_result_code("maybe").is_err());
    }

    #[test]
    fn full_workflow_across_invocations() {
        let state = TempDir::new().unwrap();

        let (res, out) = invoke(&state, &["add-lab", "--caller", ADMIN, "L1", "Lab One"]);
        res.unwrap();
        assert_eq!(out, "Added lab L1 (Lab One)\n");

        let (res, out) = invoke(
            &state,
            &["record", "--caller", "L1", "--ordinal", "42", "T1", "B1", "pass", "ok"],
        );
        res.unwrap();
        assert_eq!(out, "Recorded test T1 for batch B1\n");

        let (res, out) = invoke(&state, &["get", "T1"]);
        res.unwrap();
        assert!(out.contains("batch:        B1"));
        assert!(out.contains("submitted at: 42"));
        assert!(out.contains("result:       pass (1)"));

        let (_, out) = invoke(&state, &["batch-passed", "B1", "T1"]);
        assert_eq!(out, "true\n");
        let (_, out) = invoke(&state, &["batch-passed", "B2", "T1"]);
        assert_eq!(out, "false\n");

        invoke(&state, &["deactivate-lab", "--caller", ADMIN, "L1"])
            .0
            .unwrap();
        let (_, out) = invoke(&state, &["is-active", "L1"]);
        assert_eq!(out, "false\n");

        let (res, _) = invoke(&state, &["record", "--caller", "L1", "T2", "B1", "1", "ok"]);
        assert_eq!(ledger_code(res), 403);
    }

    #[test]
    fn guard_failures_surface_ledger_codes() {
        let state = TempDir::new().unwrap();
        invoke(&state, &["add-lab", "--caller", ADMIN, "L1", "Lab One"])
            .0
            .unwrap();

        let (res, _) = invoke(&state, &["record", "--caller", "L9", "T1", "B1", "pass"]);
        assert_eq!(ledger_code(res), 401);

        let (res, _) = invoke(&state, &["record", "--caller", "L1", "T1", "B1", "3"]);
        assert_eq!(ledger_code(res), 400);

        invoke(&state, &["record", "--caller", "L1", "T1", "B1", "fail"])
            .0
            .unwrap();
        let (res, _) = invoke(&state, &["record", "--caller", "L9", "T1", "B1", "3"]);
        assert_eq!(ledger_code(res), 100);

        let (res, _) = invoke(&state, &["deactivate-lab", "--caller", ADMIN, "L9"]);
        assert_eq!(ledger_code(res), 404);

        let (res, _) = invoke(&state, &["add-lab", "--caller", "L1", "L2", "Rogue"]);
        assert_eq!(ledger_code(res), 405);
    }

    #[test]
    fn submission_ordinals_never_decrease_across_runs() {
        let state = TempDir::new().unwrap();
        invoke(&state, &["add-lab", "--caller", ADMIN, "L1", "Lab One"])
            .0
            .unwrap();
        invoke(
            &state,
            &["record", "--caller", "L1", "--ordinal", "99999999999999999", "T1", "B1", "pass"],
        )
        .0
        .unwrap();

        invoke(&state, &["record", "--caller", "L1", "T2", "B1", "pass"])
            .0
            .unwrap();

        let (_, out) = invoke(&state, &["get", "T2"]);
        assert!(out.contains("submitted at: 99999999999999999"), "{out}");
    }

    #[test]
    fn explicit_ordinal_below_stored_one_is_rejected() {
        let state = TempDir::new().unwrap();
        invoke(&state, &["add-lab", "--caller", ADMIN, "L1", "Lab One"])
            .0
            .unwrap();
        invoke(&state, &["record", "--caller", "L1", "--ordinal", "50", "T1", "B1", "pass"])
            .0
            .unwrap();

        let (res, _) = invoke(
            &state,
            &["record", "--caller", "L1", "--ordinal", "49", "T2", "B1", "pass"],
        );
        assert_eq!(ledger_code(res), 422);

        invoke(&state, &["record", "--caller", "L1", "--ordinal", "50", "T2", "B1", "pass"])
            .0
            .unwrap();
        let (_, out) = invoke(&state, &["get", "T2"]);
        assert!(out.contains("submitted at: 50"));
    }

    #[test]
    fn listing_commands_report_empty_state() {
        let state = TempDir::new().unwrap();

        let (_, out) = invoke(&state, &["labs"]);
        assert_eq!(out, "No labs registered.\n");
        let (_, out) = invoke(&state, &["batch", "B1"]);
        assert_eq!(out, "No results recorded for batch B1\n");
        let (_, out) = invoke(&state, &["get", "T1"]);
        assert_eq!(out, "No result recorded for test T1\n");
        assert!(!state.path().join("state.yaml").exists());
    }

    #[test]
    fn labs_and_batch_listings() {
        let state = TempDir::new().unwrap();
        invoke(&state, &["add-lab", "--caller", ADMIN, "L2", "Beta"])
            .0
            .unwrap();
        invoke(&state, &["add-lab", "--caller", ADMIN, "L1", "Alpha"])
            .0
            .unwrap();
        invoke(&state, &["deactivate-lab", "--caller", ADMIN, "L2"])
            .0
            .unwrap();
        invoke(
            &state,
            &["record", "--caller", "L1", "--ordinal", "5", "T1", "B1", "inconclusive"],
        )
        .0
        .unwrap();

        let (_, out) = invoke(&state, &["labs"]);
        assert_eq!(out, "L1\tAlpha\tactive\nL2\tBeta\tinactive\n");

        let (_, out) = invoke(&state, &["batch", "B1"]);
        assert_eq!(out, "T1\tinconclusive\tL1\t5\n");
    }
}
