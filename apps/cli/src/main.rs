use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use odinsense_autocomplete::{
    insert_import, odin_files_recursive, package_completions, rank_completions, typed_prefix,
    CompletionRequest, CursorScope, FileSystemHost, Indexer,
};
use odinsense_query::OdinQuery;
use odinsense_settings::{Settings, SettingsStore};
use odinsense_symbols::{extract_definitions, normalize, Definition, DefinitionKind, NormalizeOptions};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "odinsense",
    about = "Completion indexer for Odin sources",
    author,
    version
)]
struct Cli {
    /// 設定檔路徑。 / Settings file (defaults to the user config directory).
    #[arg(long, global = true, value_name = "PATH")]
    settings: Option<PathBuf>,
    /// 顯示除錯記錄。 / Log debug output to stderr.
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 列出游標位置的補全。 / List completions at a cursor position.
    Complete(CompleteArgs),
    /// 列出檔案中擷取到的定義。 / Print the definitions extracted from files.
    Symbols(SymbolsArgs),
    /// 建立並列出套件索引。 / Build and print the package index.
    Index(IndexArgs),
    /// 透過 `odin query` 取得定義。 / Fetch definitions through `odin query`.
    Query(QueryArgs),
    /// 檢視或修改設定。 / Inspect or change settings.
    #[command(subcommand)]
    Settings(SettingsCommand),
}

#[derive(Args)]
struct CompleteArgs {
    /// 目前編輯的檔案。 / File being edited.
    file: PathBuf,
    /// 游標所在行（從 1 起算）。 / Cursor line, 1-based.
    #[arg(long)]
    line: usize,
    /// 游標所在欄（從 1 起算）；預設為行尾。 / Cursor column in characters, 1-based; defaults to end of line.
    #[arg(long)]
    column: Option<usize>,
    /// 游標位於註解內。 / The cursor sits inside a comment.
    #[arg(long)]
    in_comment: bool,
    /// 游標位於字串內。 / The cursor sits inside a string literal.
    #[arg(long)]
    in_string: bool,
    /// 依已輸入的前綴排序並過濾。 / Filter and rank by the identifier typed before the cursor.
    #[arg(long)]
    rank: bool,
    /// 若有建議的 import 則寫入檔案。 / Write the suggested import into the file when one is offered.
    #[arg(long)]
    apply_fix: bool,
    /// 以 JSON 輸出。 / Emit JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct SymbolsArgs {
    /// 檔案或資料夾。 / Files or folders to scan.
    #[arg(required = true)]
    paths: Vec<PathBuf>,
    /// 保留註解內容。 / Keep comments when scanning.
    #[arg(long)]
    keep_comments: bool,
}

#[derive(Args)]
struct IndexArgs {
    /// 額外的專案資料夾。 / Project folders to index besides core and shared.
    folders: Vec<PathBuf>,
}

#[derive(Args)]
struct QueryArgs {
    /// 交給 `odin query` 的檔案。 / File passed to `odin query`.
    file: PathBuf,
    /// 只輸出此套件。 / Only print this package.
    #[arg(long)]
    package: Option<String>,
}

#[derive(Subcommand)]
enum SettingsCommand {
    /// 輸出有效設定。 / Print the effective settings.
    Show,
    /// 設定 Odin 安裝路徑。 / Set the Odin install path.
    SetInstallPath { path: String },
    /// 開關 `odin query` 索引。 / Enable or disable `odin query` indexing.
    SetQuery {
        #[arg(value_name = "true|false", action = clap::ArgAction::Set)]
        enabled: bool,
    },
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let Cli {
        settings,
        verbose,
        command,
    } = Cli::parse();
    init_logging(verbose);

    let settings_path = resolve_settings_path(settings);
    debug!(path = %settings_path.display(), "loading settings");
    let store = SettingsStore::load(&settings_path)?;

    match command {
        Commands::Complete(args) => execute_complete(args, store.into_settings()),
        Commands::Symbols(args) => execute_symbols(args),
        Commands::Index(args) => execute_index(args, store.into_settings()),
        Commands::Query(args) => execute_query(args, store.settings()),
        Commands::Settings(subcommand) => execute_settings(subcommand, store),
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn resolve_settings_path(explicit: Option<PathBuf>) -> PathBuf {
    explicit.unwrap_or_else(|| {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("odinsense")
            .join("settings.json")
    })
}

fn execute_complete(args: CompleteArgs, settings: Settings) -> Result<()> {
    let text = fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let Some(line_text) = args
        .line
        .checked_sub(1)
        .and_then(|index| line_at(&text, index))
    else {
        bail!("line {} is outside {}", args.line, args.file.display());
    };
    let cursor = match args.column {
        Some(column) => byte_offset(line_text, column),
        None => line_text.len(),
    };

    let folders = args.file.parent().map(Path::to_path_buf).into_iter().collect();
    let host = FileSystemHost::new(folders);
    let mut indexer = Indexer::new(settings);
    let request = CompletionRequest::new(&args.file, line_text, cursor).with_scope(CursorScope {
        in_comment: args.in_comment,
        in_string: args.in_string,
    });

    let mut completions = indexer.on_completion_request(&host, &request);
    if args.rank {
        completions = rank_completions(typed_prefix(line_text, cursor), completions);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&completions)?);
    } else {
        for completion in &completions {
            println!("{}\t{}", completion.label, completion.insert_text);
        }
    }

    for suggestion in host.quick_fixes() {
        if args.apply_fix {
            let updated = insert_import(&text, &suggestion.statement);
            fs::write(&args.file, updated)
                .with_context(|| format!("failed to write {}", args.file.display()))?;
            eprintln!("Added {} to {}", suggestion.statement, args.file.display());
            break;
        }
        eprintln!("hint: {}", suggestion.label());
    }
    Ok(())
}

/// Zero-based line of `text`. The empty line after a trailing newline is addressable.
fn line_at(text: &str, index: usize) -> Option<&str> {
    text.split('\n')
        .nth(index)
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
}

/// Byte offset of the 1-based character column, clamped to the line end.
fn byte_offset(line: &str, column: usize) -> usize {
    line.char_indices()
        .nth(column.saturating_sub(1))
        .map_or(line.len(), |(offset, _)| offset)
}

fn execute_symbols(args: SymbolsArgs) -> Result<()> {
    let options = NormalizeOptions {
        strip_comments: !args.keep_comments,
    };
    let files = collect_source_files(&args.paths);
    if files.is_empty() {
        println!("No Odin files found.");
        return Ok(());
    }
    for path in files {
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) => {
                eprintln!("warning: {}: {}", path.display(), err);
                continue;
            }
        };
        let definitions = extract_definitions(&normalize(&text, &options));
        println!("{} ({} definitions)", path.display(), definitions.len());
        for definition in &definitions {
            println!("  {}", describe(definition));
        }
    }
    Ok(())
}

fn describe(definition: &Definition) -> String {
    let kind = definition.kind.as_str();
    match definition.kind {
        DefinitionKind::Procedure => {
            let Some(signature) = &definition.signature else {
                return format!("{kind} {}", definition.name);
            };
            let mut line = format!("{kind} {}({})", definition.name, signature.parameters().join(", "));
            if let Some(ret) = &signature.return_type {
                line.push_str(" -> ");
                line.push_str(ret);
            }
            line
        }
        DefinitionKind::ProcedureGroup => {
            format!("{kind} {} {{{}}}", definition.name, definition.members.join(", "))
        }
        DefinitionKind::Type | DefinitionKind::Constant => match &definition.detail {
            Some(detail) => format!("{kind} {} :: {detail}", definition.name),
            None => format!("{kind} {}", definition.name),
        },
    }
}

fn collect_source_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_file() {
            files.push(path.clone());
        } else if path.is_dir() {
            files.extend(odin_files_recursive(path));
        } else {
            eprintln!("warning: {} does not exist", path.display());
        }
    }
    files
}

fn execute_index(args: IndexArgs, settings: Settings) -> Result<()> {
    let host = FileSystemHost::new(args.folders);
    let mut indexer = Indexer::new(settings);
    indexer.reindex(&host, None, std::time::Instant::now());

    let index = indexer.package_index();
    if index.is_empty() {
        println!("No packages found.");
        return Ok(());
    }
    for (name, location) in index.iter() {
        println!("{name}\t{}", location.reference());
    }
    Ok(())
}

fn execute_query(args: QueryArgs, settings: &Settings) -> Result<()> {
    let query = OdinQuery::new(
        settings.odin_query.executable.clone(),
        settings.odin_query.timeout(),
    );
    let output = query
        .run(&args.file)
        .with_context(|| format!("odin query failed for {}", args.file.display()))?;
    for package in &output.packages {
        if args
            .package
            .as_deref()
            .is_some_and(|wanted| wanted != package.name)
        {
            continue;
        }
        let completions = package_completions(&output, &package.name);
        println!("{} ({} definitions)", package.name, completions.len());
        for completion in completions {
            println!("  {}", completion.label);
        }
    }
    Ok(())
}

fn execute_settings(command: SettingsCommand, mut store: SettingsStore) -> Result<()> {
    match command {
        SettingsCommand::Show => {
            println!("{}", serde_json::to_string_pretty(store.settings())?);
        }
        SettingsCommand::SetInstallPath { path } => {
            store.update(|settings| settings.odin_install_path = path.clone())?;
            println!("Saved settings to {}", store.path().display());
        }
        SettingsCommand::SetQuery { enabled } => {
            store.update(|settings| settings.odin_query.enabled = enabled)?;
            println!("Saved settings to {}", store.path().display());
        }
    }
    Ok(())
}
