use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use ward_core::config::collection_from_env_value;
use ward_core::constants::{
    DEFAULT_CENSUS_COLLECTION, DEFAULT_DATA_DIR, DEFAULT_MORTALITY_COLLECTION, EXPORT_HEADERS,
    KNOWN_CONSULTANTS, KNOWN_LOCATIONS,
};
use ward_core::export::{export_rows, export_title};
use ward_core::view::{CensusFilter, DateRange};
use ward_core::{
    AdmissionForm, Category, CensusError, CensusResult, CensusService, CodeStatus, Collection,
    CoreConfig, FileStore, Gender, OperationContext, PatientRecord, Role, SystemClock, Unit,
};

#[derive(Parser)]
#[command(name = "ward")]
#[command(about = "Ward census and mortality archive CLI")]
struct Cli {
    /// Directory of the file-backed document store
    #[arg(long, env = "WARD_DATA_DIR", default_value = DEFAULT_DATA_DIR, global = true)]
    data_dir: PathBuf,
    /// Clinical unit to work in
    #[arg(long, env = "WARD_UNIT", default_value = "ICU", global = true)]
    unit: Unit,
    /// Role of the person running the command
    #[arg(long, env = "WARD_ROLE", default_value = "Staff", global = true)]
    role: Role,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the live census
    Census(ListArgs),
    /// List the mortality archive
    Mortality(ListArgs),
    /// Admit a patient
    Admit {
        #[command(flatten)]
        form: FormArgs,
    },
    /// Edit a census record; --discharged marks it discharged
    Update {
        /// Record id
        id: String,
        #[command(flatten)]
        form: FormArgs,
        /// Clear the discharge date, returning the patient to Active
        #[arg(long, conflicts_with = "discharged")]
        clear_discharge: bool,
    },
    /// Move a census record into the mortality archive
    Archive {
        /// Record id
        id: String,
        /// Date of death (YYYY-MM-DD); defaults to the discharge date, then today
        #[arg(long)]
        date_of_death: Option<NaiveDate>,
    },
    /// Edit a mortality archive record
    EditArchive {
        /// Record id
        id: String,
        #[command(flatten)]
        form: FormArgs,
    },
    /// List units and the admission form choices
    Options,
    /// Permanently delete a record (admin only)
    Delete {
        /// Record id
        id: String,
        /// Delete from the mortality archive instead of the census
        #[arg(long)]
        archived: bool,
    },
}

#[derive(Args, Debug, Default)]
struct ListArgs {
    /// Whitespace-separated search terms; all must match
    #[arg(long)]
    search: Option<String>,
    /// Inclusive start date (admission date, or date of death for the archive)
    #[arg(long)]
    from: Option<NaiveDate>,
    /// Inclusive end date
    #[arg(long)]
    to: Option<NaiveDate>,
}

/// Admission form fields. Omitted fields keep their current value when editing.
#[derive(Args, Debug, Default)]
struct FormArgs {
    /// Medical record number
    #[arg(long)]
    reg_no: Option<String>,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    gender: Option<String>,
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    location: Option<String>,
    #[arg(long)]
    code_status: Option<String>,
    #[arg(long)]
    consultant: Option<String>,
    /// Admission date (YYYY-MM-DD)
    #[arg(long)]
    admitted: Option<String>,
    /// Discharge date, or date of death for archive edits (YYYY-MM-DD)
    #[arg(long)]
    discharged: Option<String>,
}

impl FormArgs {
    fn apply(self, form: &mut AdmissionForm) {
        let fields = [
            (self.reg_no, &mut form.registration_number),
            (self.name, &mut form.name),
            (self.gender, &mut form.gender),
            (self.category, &mut form.category),
            (self.location, &mut form.location),
            (self.code_status, &mut form.code_status),
            (self.consultant, &mut form.consultant),
            (self.admitted, &mut form.admission_date),
            (self.discharged, &mut form.discharge_date),
        ];
        for (value, slot) in fields {
            if let Some(value) = value {
                *slot = value;
            }
        }
    }
}

fn print_records(title: &str, records: &[&PatientRecord], next_serial: &str, today: NaiveDate) {
    println!("{title}");
    println!("ID\t{}", EXPORT_HEADERS.join("\t"));
    for (record, row) in records.iter().zip(export_rows(records.iter().copied(), today)) {
        println!("{}\t{}", record.id, row.cells().join("\t"));
    }
    println!("{} record(s); next serial {}", records.len(), next_serial);
}

fn print_record(action: &str, record: &PatientRecord) {
    println!(
        "{action} {} (serial {}, {}, status {}, LOS {} day(s))",
        record.id, record.serial_number, record.name, record.status, record.length_of_stay
    );
}

fn join<T: ToString>(values: &[T]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn print_options() {
    println!("Units:");
    for unit in Unit::ALL {
        println!("  {unit}\t{}", unit.label());
    }
    println!("Gender: {}", join(Gender::ALL));
    println!("Category: {}", join(Category::ALL));
    println!("Code status: {}", join(CodeStatus::ALL));
    println!("Locations (suggested): {}", join(KNOWN_LOCATIONS));
    println!("Consultants (suggested): {}", join(KNOWN_CONSULTANTS));
}

async fn list(
    service: &CensusService,
    collection: Collection,
    unit: Unit,
    args: ListArgs,
) -> CensusResult<()> {
    let set = service.working_set(collection, unit).await?;
    let today = service.today();
    let view = CensusFilter::new()
        .search(args.search.as_deref().unwrap_or_default())
        .within(DateRange::new(args.from, args.to)?)
        .apply(set.records(), today);
    print_records(
        &export_title(unit, collection),
        &view,
        &set.next_serial(),
        today,
    );
    Ok(())
}

async fn run(cli: Cli, service: CensusService) -> CensusResult<()> {
    let ctx = OperationContext::new(cli.unit, cli.role);
    let Some(command) = cli.command else {
        println!("Use 'ward --help' for commands");
        return Ok(());
    };

    match command {
        Commands::Census(args) => list(&service, Collection::Census, cli.unit, args).await?,
        Commands::Mortality(args) => list(&service, Collection::Mortality, cli.unit, args).await?,
        Commands::Admit { form } => {
            let mut admission = AdmissionForm::default();
            form.apply(&mut admission);
            let record = service.admit(&ctx, &admission).await?;
            print_record("Admitted", &record);
        }
        Commands::Update {
            id,
            form,
            clear_discharge,
        } => {
            let record = service.find(Collection::Census, &id).await?;
            let mut edit = AdmissionForm::from_record(&record);
            form.apply(&mut edit);
            if clear_discharge {
                edit.discharge_date.clear();
            }
            let updated = service.update(&ctx, &record, &edit).await?;
            print_record("Updated", &updated);
        }
        Commands::Archive { id, date_of_death } => {
            let record = service.find(Collection::Census, &id).await?;
            let archived = service.archive(&ctx, &record, date_of_death).await?;
            print_record("Archived", &archived);
        }
        Commands::EditArchive { id, form } => {
            let record = service.find(Collection::Mortality, &id).await?;
            let mut edit = AdmissionForm::from_record(&record);
            form.apply(&mut edit);
            let updated = service.update_archived(&ctx, &record, &edit).await?;
            print_record("Updated", &updated);
        }
        Commands::Options => print_options(),
        Commands::Delete { id, archived } => {
            if !ctx.is_admin() {
                return Err(CensusError::PermissionDenied {
                    role: ctx.role,
                    action: "delete",
                });
            }
            let collection = if archived {
                Collection::Mortality
            } else {
                Collection::Census
            };
            let record = service.find(collection, &id).await?;
            service.delete(&ctx, &record).await?;
            print_record("Deleted", &record);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("ward=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let cfg = Arc::new(CoreConfig::new(
        cli.data_dir.clone(),
        collection_from_env_value(
            std::env::var("WARD_CENSUS_COLLECTION").ok(),
            DEFAULT_CENSUS_COLLECTION,
        ),
        collection_from_env_value(
            std::env::var("WARD_MORTALITY_COLLECTION").ok(),
            DEFAULT_MORTALITY_COLLECTION,
        ),
    )?);
    let store = Arc::new(FileStore::new(cfg.data_dir()));
    let service = CensusService::new(cfg, store, Arc::new(SystemClock));

    match run(cli, service).await {
        Ok(()) => Ok(()),
        Err(CensusError::Validation(errors)) => {
            for (field, message) in errors.iter() {
                eprintln!("{field}: {message}");
            }
            anyhow::bail!("record not saved")
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_global_options_after_subcommand() {
        let cli = Cli::try_parse_from([
            "ward", "archive", "abc", "--unit", "hdu", "--role", "consultant",
            "--date-of-death", "2025-03-10",
        ])
        .unwrap();
        assert_eq!(cli.unit, Unit::Hdu);
        assert_eq!(cli.role, Role::Consultant);
        match cli.command {
            Some(Commands::Archive { id, date_of_death }) => {
                assert_eq!(id, "abc");
                assert_eq!(date_of_death, NaiveDate::from_ymd_opt(2025, 3, 10));
            }
            _ => panic!("expected archive command"),
        }
    }

    #[test]
    fn test_join_keeps_display_order() {
        assert_eq!(join(CodeStatus::ALL), "Full Code, DNR, DNI");
        assert_eq!(join(&["OT", "ER"]), "OT, ER");
    }

    #[test]
    fn test_parses_options_command() {
        let cli = Cli::try_parse_from(["ward", "options"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Options)));
    }

    #[test]
    fn test_rejects_unknown_unit() {
        assert!(Cli::try_parse_from(["ward", "census", "--unit", "CCU"]).is_err());
    }

    #[test]
    fn test_update_flags_conflict() {
        let result = Cli::try_parse_from([
            "ward",
            "update",
            "abc",
            "--discharged",
            "2025-03-10",
            "--clear-discharge",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_form_args_only_override_given_fields() {
        let mut form = AdmissionForm {
            name: "AMNA".into(),
            consultant: "Dr. Shariq".into(),
            ..AdmissionForm::default()
        };
        FormArgs {
            consultant: Some("Dr. Shakeel".into()),
            discharged: Some("2025-03-10".into()),
            ..FormArgs::default()
        }
        .apply(&mut form);

        assert_eq!(form.name, "AMNA");
        assert_eq!(form.consultant, "Dr. Shakeel");
        assert_eq!(form.discharge_date, "2025-03-10");
    }
}
