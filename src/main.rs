use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crud_audit::cli::{
    handle_audit_command, handle_delete, handle_get, handle_save, AuditCommands, AuditOutput,
    AuditSource, DeleteArgs, GetArgs, SaveArgs,
};
use crud_audit::config::{AuditBackend, CrudOptions, CrudPaths};
use crud_audit::{
    AccessGate, AuditStore, CrudEngine, JsonlAuditStore, QueryCache, ResponseMessage, RoleAccessGate,
    SqliteStore,
};

#[derive(Parser)]
#[command(
    name = "crud-audit",
    version,
    about = "Generic record access with mandatory audit logging",
    long_about = "crud-audit reads, creates, updates and deletes records of any table \
                  in its SQLite database and writes an audit entry for every logged \
                  action. Results are printed as JSON envelopes."
)]
struct Cli {
    /// Log engine decisions to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read records by id, id set, filter, or page through all rows
    Get(GetArgs),

    /// Create or update records, depending on the payload shape
    Save(SaveArgs),

    /// Hard-delete records by id, id set or filter
    Delete(DeleteArgs),

    /// Audit trail commands
    #[command(subcommand)]
    Audit(AuditCommands),

    /// Write the settings file if missing and show configuration and paths
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let paths = CrudPaths::new()?;
    let options = CrudOptions::load_or_create(&paths)?;
    paths.ensure_directories()?;

    if let Commands::Config = cli.command {
        options.save(&paths)?;
        println!("crud-audit Configuration");
        println!("========================");
        println!("Base directory:  {}", paths.base_dir().display());
        println!("Settings file:   {}", paths.settings_file().display());
        println!("Database:        {}", paths.database_file().display());
        println!("Audit directory: {}", paths.audit_dir().display());
        println!();
        println!("{}", serde_json::to_string_pretty(&options)?);
        return Ok(());
    }

    let store = SqliteStore::open(paths.database_file())?;
    let files = JsonlAuditStore::new(paths.audit_dir());
    let (audit_store, source): (&dyn AuditStore, AuditSource<'_>) = match options.audit_backend {
        AuditBackend::Database => (&store, AuditSource::Database(&store)),
        AuditBackend::File => (&files, AuditSource::File(&files)),
    };

    let gate_user = match (&cli.command, options.check_access) {
        (Commands::Get(args), true) => Some(&args.selection.user),
        (Commands::Save(args), true) => Some(&args.selection.user),
        (Commands::Delete(args), true) => Some(&args.selection.user),
        _ => None,
    };
    let role_gate = match gate_user.map(|user| RoleAccessGate::load(&store, &options, user)) {
        Some(Ok(gate)) => Some(gate),
        Some(Err(err)) => return print_envelope(&ResponseMessage::from(err)),
        None => None,
    };

    let cache = QueryCache::from_options(&options);
    let mut engine = CrudEngine::new(&store, audit_store, &options).with_cache(&cache);
    if let Some(gate) = role_gate.as_ref() {
        engine = engine.with_access_gate(gate as &dyn AccessGate);
    }

    let res = match cli.command {
        Commands::Get(args) => handle_get(&engine, args).unwrap_or_else(ResponseMessage::from),
        Commands::Save(args) => handle_save(&engine, args).unwrap_or_else(ResponseMessage::from),
        Commands::Delete(args) => handle_delete(&engine, args).unwrap_or_else(ResponseMessage::from),
        Commands::Audit(cmd) => match handle_audit_command(&engine, &source, cmd) {
            Ok(AuditOutput::Lines(lines)) => {
                for line in lines {
                    println!("{}", line);
                }
                return Ok(());
            }
            Ok(AuditOutput::Envelope(res)) => res,
            Err(err) => ResponseMessage::from(err),
        },
        Commands::Config => return Ok(()),
    };

    print_envelope(&res)
}

fn print_envelope(res: &ResponseMessage) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(res)?);
    if !res.is_success() {
        std::process::exit(1);
    }
    Ok(())
}
