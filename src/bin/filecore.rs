//! File lifecycle CLI (filecore) - Main binary entry point

use filecore::cli::args::{
    BinCommand, CliArgs, Command, CommonArgs, FindArgs, StorageArgs, TransferArgs, parse_args,
};
use filecore::cli::output::{
    format_entries, format_json, format_records, format_report, format_storage, storage_json,
};
use filecore::services::format::format_size;
use filecore::{
    BatchReport, CoreConfig, Error, ErrorKind, FileCatalog, FileCategory, FileIndex, IndexQuery,
    IndexSort, StatvfsProbe, StorageAnalyzer, TransferEngine, TransferEvent, TransferRequest,
    TrashStore, WalkIndex,
};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

fn main() {
    // Initialize logger (controlled by RUST_LOG environment variable)
    // Example: RUST_LOG=debug filecore bin list
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_help();
        return;
    }

    match args[1].as_str() {
        "--help" | "-h" => {
            print_help();
            return;
        }
        "--version" | "-v" => {
            print_version();
            return;
        }
        _ => {}
    }

    let cli_args = match parse_args(&args) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("Use --help for usage information");
            process::exit(2);
        }
    };

    let config = match load_config(&cli_args.common) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(exit_code(&e));
        }
    };

    let exit_code = match run(&cli_args, &config) {
        Ok(code) => code,
        Err(e) => {
            log::debug!("Command failed: {e}");
            eprintln!("Error: {}", e.user_message());
            exit_code(&e)
        }
    };

    process::exit(exit_code);
}

fn load_config(common: &CommonArgs) -> Result<CoreConfig, Error> {
    let mut config = match &common.config {
        Some(path) => CoreConfig::load(path)?,
        None => CoreConfig::default(),
    };
    if let Some(store) = &common.store {
        config.store_dir.clone_from(store);
    }
    Ok(config)
}

fn exit_code(err: &Error) -> i32 {
    match err.kind() {
        ErrorKind::Invalid => 2,
        ErrorKind::Partial => 3,
        _ => 4,
    }
}

/// 0 when every item succeeded, 3 when some did, 4 when none did.
fn report_exit_code(report: &BatchReport) -> i32 {
    if report.is_complete() {
        0
    } else if report.succeeded > 0 {
        3
    } else {
        4
    }
}

fn run(cli: &CliArgs, config: &CoreConfig) -> Result<i32, Error> {
    let common = &cli.common;
    match &cli.command {
        Command::Trash(paths) => {
            let store = TrashStore::open(&config.store_dir, config.trash.clone())?;
            let report = store.move_all_to_trash(paths);
            emit_report(common, &report, "Trashed");
            Ok(report_exit_code(&report))
        }
        Command::Bin(action) => handle_bin(common, config, action),
        Command::Transfer(transfer) => handle_transfer(common, config, transfer),
        Command::Rename { path, new_name } => {
            let engine = TransferEngine::new(config.transfer.clone());
            let renamed = engine.rename(path, new_name)?;
            if !common.quiet {
                println!("Renamed to {}", renamed.display());
            }
            Ok(0)
        }
        Command::List(dir) => {
            let catalog = FileCatalog::new(Arc::new(WalkIndex::new(config.index.clone())))
                .with_hidden(config.index.include_hidden);
            let entries = catalog.list_directory(dir)?;
            if common.json {
                println!("{}", format_json(&entries));
            } else {
                print!("{}", format_entries(&entries));
            }
            Ok(0)
        }
        Command::Find(find) => handle_find(common, config, find),
        Command::Storage(storage) => handle_storage(common, config, storage),
    }
}

fn handle_bin(common: &CommonArgs, config: &CoreConfig, action: &BinCommand) -> Result<i32, Error> {
    let store = TrashStore::open(&config.store_dir, config.trash.clone())?;

    match action {
        BinCommand::List => {
            let records = store.records()?;
            if common.json {
                println!("{}", format_json(&records));
            } else {
                print!("{}", format_records(&records));
            }
            Ok(0)
        }
        BinCommand::Restore(id) => {
            let restored = store.restore(*id)?;
            if !common.quiet {
                println!("Restored {}", restored.display());
            }
            Ok(0)
        }
        BinCommand::RestoreAll => {
            let report = store.restore_all();
            emit_report(common, &report, "Restored");
            Ok(report_exit_code(&report))
        }
        BinCommand::Delete(id) => {
            store.delete_permanently(*id)?;
            if !common.quiet {
                println!("Deleted record {id}");
            }
            Ok(0)
        }
        BinCommand::Empty => {
            let removed = store.empty_trash()?;
            if !common.quiet {
                println!("Removed {removed} item(s) from the bin");
            }
            Ok(0)
        }
        BinCommand::Purge { retention_days } => {
            let removed = match retention_days {
                Some(days) => store.cleanup_expired(*days)?,
                None => store.cleanup_expired_default()?,
            };
            if !common.quiet {
                println!("Purged {removed} expired item(s)");
            }
            Ok(0)
        }
    }
}

fn handle_transfer(
    common: &CommonArgs,
    config: &CoreConfig,
    transfer: &TransferArgs,
) -> Result<i32, Error> {
    let request = if transfer.is_move {
        TransferRequest::relocate(transfer.sources.clone(), &transfer.dest_dir)
    } else {
        TransferRequest::copy(transfer.sources.clone(), &transfer.dest_dir)
    };
    let verb = request.kind.verb();

    let engine = TransferEngine::new(config.transfer.clone());
    let handle = engine.spawn_batch(request)?;

    for event in &handle.events {
        match event {
            TransferEvent::Started {
                kind,
                total_bytes,
                file_count,
            } if !common.quiet => {
                eprintln!(
                    "Starting {kind} of {file_count} item(s), {}",
                    format_size(total_bytes)
                );
            }
            TransferEvent::Progress(progress) if !common.quiet => {
                let throughput_suffix = progress
                    .throughput_bytes_per_sec
                    .map(|bps| format!(", ~{}/s", format_size(bps)))
                    .unwrap_or_default();
                eprintln!(
                    "[{}/{}] {} {:.0}% ({} of {}){throughput_suffix}",
                    progress.file_index,
                    progress.file_count,
                    progress.current_file,
                    progress.fraction * 100.0,
                    format_size(progress.bytes_transferred),
                    format_size(progress.total_bytes)
                );
            }
            _ => {}
        }
    }

    let report = handle.join()?;
    emit_report(common, &report, verb);
    Ok(report_exit_code(&report))
}

fn handle_find(common: &CommonArgs, config: &CoreConfig, find: &FindArgs) -> Result<i32, Error> {
    let mut options = config.index.clone();
    if !find.roots.is_empty() {
        options.roots.clone_from(&find.roots);
    }
    if options.roots.is_empty() && find.category != Some(FileCategory::Download) {
        return Err(Error::InvalidInput("no root to search".to_string()));
    }
    let index = WalkIndex::new(options).excluding(&config.store_dir);

    let mut query = IndexQuery::all();
    if let Some(category) = find.category {
        query = query.category(category);
    }
    if let Some(name) = &find.name {
        query = query.name_contains(name.as_str()).sorted_by(IndexSort::Name);
    }
    if let Some(min) = find.min_size {
        query = query.min_size(min).sorted_by(IndexSort::Largest);
    }
    if let Some(days) = find.recent_days {
        let since = chrono::Utc::now().timestamp_millis() - i64::from(days) * MS_PER_DAY;
        query = query.modified_since(since).sorted_by(IndexSort::Recent);
    }
    if let Some(top) = find.top {
        query = query.limit(top);
    }

    let entries = index.query(&query)?;
    if common.json {
        println!("{}", format_json(&entries));
    } else {
        print!("{}", format_entries(&entries));
    }
    Ok(0)
}

fn handle_storage(
    common: &CommonArgs,
    config: &CoreConfig,
    storage: &StorageArgs,
) -> Result<i32, Error> {
    let mut options = config.index.clone();
    if !storage.roots.is_empty() {
        options.roots.clone_from(&storage.roots);
    }
    if options.roots.is_empty() {
        options.roots.push(home_dir());
    }
    let volume = storage
        .volume
        .clone()
        .unwrap_or_else(|| options.roots[0].clone());

    let store = Arc::new(TrashStore::open(&config.store_dir, config.trash.clone())?);
    let index = WalkIndex::new(options).excluding(store.files_dir());
    let analyzer = StorageAnalyzer::new(
        Arc::new(index),
        Arc::new(StatvfsProbe),
        volume,
        config.analyzer.clone(),
    )
    .with_trash(store);

    let info = analyzer.get_storage_info()?;
    let daily = analyzer.get_average_daily_usage_bytes()?;
    let forecast = filecore::calculate_forecast(info.free_bytes, daily);

    if common.json {
        println!("{}", storage_json(&info, daily, forecast));
    } else {
        print!("{}", format_storage(&info, daily, forecast));
    }
    Ok(0)
}

fn emit_report(common: &CommonArgs, report: &BatchReport, verb: &str) {
    if common.json {
        println!("{}", format_json(report));
    } else if !common.quiet || !report.is_complete() {
        print!("{}", format_report(report, verb));
    }
}

fn home_dir() -> PathBuf {
    std::env::var_os("HOME").map_or_else(|| Path::new(".").to_path_buf(), PathBuf::from)
}

fn print_help() {
    println!("File lifecycle CLI (filecore) - Bin, transfers, and storage analysis");
    println!();
    println!("USAGE:");
    println!("    filecore trash <PATH>...");
    println!("    filecore bin [list|restore <ID>|restore-all|delete <ID>|empty|purge]");
    println!("    filecore copy <SRC>... --to <DIR>");
    println!("    filecore move <SRC>... --to <DIR>");
    println!("    filecore rename <PATH> <NEW_NAME>");
    println!("    filecore ls <DIR>");
    println!("    filecore find [OPTIONS] <ROOT>...");
    println!("    filecore storage [--volume <PATH>] [ROOT...]");
    println!();
    println!("COMMANDS:");
    println!("    trash     Move files or directories into the bin");
    println!("    bin       List, restore, or permanently delete bin contents");
    println!("    copy      Copy sources into a directory with progress");
    println!("    move      Move sources into a directory with progress");
    println!("    rename    Rename a file or directory in place");
    println!("    ls        List a directory (directories first)");
    println!("    find      Query files by category, name, size, or age");
    println!("    storage   Show categorized usage and a days-until-full forecast");
    println!();
    println!("GLOBAL OPTIONS:");
    println!("    -h, --help                 Show this help message");
    println!("    -v, --version              Show version information");
    println!("    --store <DIR>              Bin location (default: ~/.filecore)");
    println!("    --config <FILE>            Load settings from a JSON file");
    println!("    --json                     Emit machine-readable output");
    println!("    -q, --quiet                Suppress non-error output");
    println!();
    println!("BIN OPTIONS:");
    println!("    purge --retention-days <N> Remove items older than N days (default: 30)");
    println!();
    println!("FIND OPTIONS:");
    println!("    --category <NAME>          image|video|audio|document|apk|archive|download|other");
    println!("    --name <TEXT>              Case-insensitive name substring");
    println!("    --min-size <BYTES>         Only files at least this large, largest first");
    println!("    --recent <DAYS>            Only files modified in the last N days");
    println!("    --top <K>                  Show at most K results");
    println!();
    println!("EXAMPLES:");
    println!("    filecore trash ~/Downloads/old.zip");
    println!("    filecore bin restore 1717171717171");
    println!("    filecore copy photos/ --to /mnt/backup");
    println!("    filecore find --category video --top 20 ~/");
    println!("    filecore storage --json ~/");
}

fn print_version() {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("GIT_HASH");
    const GIT_DATE: &str = env!("GIT_DATE");
    const BUILD_TARGET: &str = env!("BUILD_TARGET");

    println!("filecore {VERSION}");
    println!("Commit: {GIT_HASH} ({GIT_DATE})");
    println!("Target: {BUILD_TARGET}");

    #[cfg(debug_assertions)]
    println!("Build: debug");
    #[cfg(not(debug_assertions))]
    println!("Build: release");
}
