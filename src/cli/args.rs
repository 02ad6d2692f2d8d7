//! CLI argument parsing

use crate::models::FileCategory;
use std::path::PathBuf;
use std::str::FromStr;

/// Flags accepted by every command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommonArgs {
    pub store: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    pub common: CommonArgs,
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Trash(Vec<PathBuf>),
    Bin(BinCommand),
    Transfer(TransferArgs),
    Rename { path: PathBuf, new_name: String },
    List(PathBuf),
    Find(FindArgs),
    Storage(StorageArgs),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BinCommand {
    List,
    Restore(i64),
    RestoreAll,
    Delete(i64),
    Empty,
    Purge { retention_days: Option<i64> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferArgs {
    pub is_move: bool,
    pub sources: Vec<PathBuf>,
    pub dest_dir: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindArgs {
    pub roots: Vec<PathBuf>,
    pub category: Option<FileCategory>,
    pub name: Option<String>,
    pub min_size: Option<u64>,
    pub recent_days: Option<u32>,
    pub top: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageArgs {
    pub volume: Option<PathBuf>,
    pub roots: Vec<PathBuf>,
}

/// Parse command line arguments
pub fn parse_args(args: &[String]) -> Result<CliArgs, String> {
    if args.len() < 2 {
        return Err("No command specified".to_string());
    }

    let mut common = CommonArgs::default();
    let rest = take_common(&args[2..], &mut common)?;

    let command = match args[1].as_str() {
        "trash" => {
            if rest.is_empty() {
                return Err("Missing required argument: PATH".to_string());
            }
            reject_options(&rest)?;
            Command::Trash(rest.iter().map(PathBuf::from).collect())
        }
        "bin" => Command::Bin(parse_bin_args(&rest)?),
        "copy" => Command::Transfer(parse_transfer_args(&rest, false)?),
        "move" => Command::Transfer(parse_transfer_args(&rest, true)?),
        "rename" => {
            reject_options(&rest)?;
            match rest.as_slice() {
                [path, name] => Command::Rename {
                    path: PathBuf::from(path),
                    new_name: name.clone(),
                },
                _ => return Err("rename expects <PATH> <NEW_NAME>".to_string()),
            }
        }
        "ls" => {
            reject_options(&rest)?;
            match rest.as_slice() {
                [dir] => Command::List(PathBuf::from(dir)),
                [] => return Err("Missing required argument: DIR".to_string()),
                [_, extra, ..] => return Err(format!("Unexpected argument: {extra}")),
            }
        }
        "find" => Command::Find(parse_find_args(&rest)?),
        "storage" => Command::Storage(parse_storage_args(&rest)?),
        _ => return Err(format!("Unknown command: {}", args[1])),
    };

    Ok(CliArgs { common, command })
}

/// Strip the flags shared by all commands, returning what is left in order.
fn take_common(args: &[String], common: &mut CommonArgs) -> Result<Vec<String>, String> {
    let mut rest = Vec::new();
    let mut i = 0;

    while i < args.len() {
        match args[i].as_str() {
            "--store" => {
                i += 1;
                if i >= args.len() {
                    return Err("--store requires a directory".to_string());
                }
                common.store = Some(PathBuf::from(&args[i]));
            }
            "--config" => {
                i += 1;
                if i >= args.len() {
                    return Err("--config requires a file path".to_string());
                }
                common.config = Some(PathBuf::from(&args[i]));
            }
            "--json" => common.json = true,
            "--quiet" | "-q" => common.quiet = true,
            _ => rest.push(args[i].clone()),
        }
        i += 1;
    }

    Ok(rest)
}

fn reject_options(args: &[String]) -> Result<(), String> {
    match args.iter().find(|a| a.starts_with("--")) {
        Some(option) => Err(format!("Unknown option: {option}")),
        None => Ok(()),
    }
}

fn parse_bin_args(args: &[String]) -> Result<BinCommand, String> {
    let Some(action) = args.first() else {
        return Ok(BinCommand::List);
    };
    let rest = &args[1..];

    match action.as_str() {
        "list" => {
            reject_options(rest)?;
            Ok(BinCommand::List)
        }
        "restore" => Ok(BinCommand::Restore(parse_id(rest)?)),
        "restore-all" => Ok(BinCommand::RestoreAll),
        "delete" => Ok(BinCommand::Delete(parse_id(rest)?)),
        "empty" => Ok(BinCommand::Empty),
        "purge" => {
            let mut retention_days = None;
            let mut i = 0;
            while i < rest.len() {
                match rest[i].as_str() {
                    "--retention-days" => {
                        i += 1;
                        if i >= rest.len() {
                            return Err("--retention-days requires a value".to_string());
                        }
                        retention_days = Some(
                            rest[i]
                                .parse()
                                .map_err(|_| "--retention-days must be a number".to_string())?,
                        );
                    }
                    other => return Err(format!("Unexpected argument: {other}")),
                }
                i += 1;
            }
            Ok(BinCommand::Purge { retention_days })
        }
        other => Err(format!("Unknown bin action: {other}")),
    }
}

fn parse_id(args: &[String]) -> Result<i64, String> {
    match args {
        [id] => id
            .parse()
            .map_err(|_| format!("Invalid record id: {id}")),
        [] => Err("Missing required argument: ID".to_string()),
        [_, extra, ..] => Err(format!("Unexpected argument: {extra}")),
    }
}

fn parse_transfer_args(args: &[String], is_move: bool) -> Result<TransferArgs, String> {
    let mut sources = Vec::new();
    let mut dest_dir = None;
    let mut i = 0;

    while i < args.len() {
        match args[i].as_str() {
            "--to" => {
                i += 1;
                if i >= args.len() {
                    return Err("--to requires a directory".to_string());
                }
                dest_dir = Some(PathBuf::from(&args[i]));
            }
            arg if !arg.starts_with("--") => sources.push(PathBuf::from(arg)),
            _ => return Err(format!("Unknown option: {}", args[i])),
        }
        i += 1;
    }

    if sources.is_empty() {
        return Err("Missing required argument: SOURCE".to_string());
    }
    let Some(dest_dir) = dest_dir else {
        return Err("Missing required option: --to <DIR>".to_string());
    };

    Ok(TransferArgs {
        is_move,
        sources,
        dest_dir,
    })
}

fn parse_find_args(args: &[String]) -> Result<FindArgs, String> {
    let mut find = FindArgs::default();
    let mut i = 0;

    while i < args.len() {
        match args[i].as_str() {
            "--category" => {
                i += 1;
                if i >= args.len() {
                    return Err("--category requires a value".to_string());
                }
                find.category = Some(FileCategory::from_str(&args[i])?);
            }
            "--name" => {
                i += 1;
                if i >= args.len() {
                    return Err("--name requires a value".to_string());
                }
                find.name = Some(args[i].clone());
            }
            "--min-size" => {
                i += 1;
                if i >= args.len() {
                    return Err("--min-size requires a value".to_string());
                }
                find.min_size = Some(
                    args[i]
                        .parse()
                        .map_err(|_| "--min-size must be a number of bytes".to_string())?,
                );
            }
            "--recent" => {
                i += 1;
                if i >= args.len() {
                    return Err("--recent requires a number of days".to_string());
                }
                find.recent_days = Some(
                    args[i]
                        .parse()
                        .map_err(|_| "--recent must be a number".to_string())?,
                );
            }
            "--top" => {
                i += 1;
                if i >= args.len() {
                    return Err("--top requires a value".to_string());
                }
                find.top = Some(
                    args[i]
                        .parse()
                        .map_err(|_| "--top must be a number".to_string())?,
                );
            }
            arg if !arg.starts_with("--") => find.roots.push(PathBuf::from(arg)),
            _ => return Err(format!("Unknown option: {}", args[i])),
        }
        i += 1;
    }

    Ok(find)
}

fn parse_storage_args(args: &[String]) -> Result<StorageArgs, String> {
    let mut storage = StorageArgs::default();
    let mut i = 0;

    while i < args.len() {
        match args[i].as_str() {
            "--volume" => {
                i += 1;
                if i >= args.len() {
                    return Err("--volume requires a path".to_string());
                }
                storage.volume = Some(PathBuf::from(&args[i]));
            }
            arg if !arg.starts_with("--") => storage.roots.push(PathBuf::from(arg)),
            _ => return Err(format!("Unknown option: {}", args[i])),
        }
        i += 1;
    }

    Ok(storage)
}
