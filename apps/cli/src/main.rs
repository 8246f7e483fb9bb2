mod host;
mod logging;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use polynav_runexec::{LogSink, RunExecutor, RunSpec};
use polynav_settings::{Settings, SettingsStore};
use polynav_workspace::{
    discover_root, list_immediate_directories, list_project_names, resolve_components_dir,
    resolve_dir, to_counterpart, Notice, TargetKind, WorkspaceConfig, DEFAULT_ROOT_MARKER,
};
use tracing::debug;

use crate::host::{
    confirm, Chooser, CommandOpener, InquireChooser, Opener, Preselected, PrintOpener,
    SystemOpener,
};

#[derive(Parser)]
#[command(
    name = "polynav",
    about = "Navigate component/base/project workspaces",
    author,
    version
)]
struct Cli {
    /// 指定工作區根目錄；預設自動尋找。 / Workspace root (discovered from the current directory by default).
    #[arg(long, global = true, value_name = "PATH", env = "POLYNAV_WORKSPACE")]
    workspace: Option<PathBuf>,
    /// 標示工作區根目錄的檔案名稱。 / File name that marks a workspace root during discovery.
    #[arg(
        long,
        global = true,
        value_name = "NAME",
        env = "POLYNAV_ROOT_MARKER",
        default_value = DEFAULT_ROOT_MARKER
    )]
    marker: String,
    /// 提高日誌詳細程度（可重複）。 / Increase log verbosity (repeatable).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 選擇元件並開啟其目錄。 / Pick a component and open its directory.
    FindComponent(FindArgs),
    /// 選擇基底並開啟其目錄。 / Pick a base and open its directory.
    FindBase(FindArgs),
    /// 開啟元件根目錄。 / Open the components directory.
    ComponentsDir(OpenArgs),
    /// 列出元件、基底或專案名稱。 / List component, base or project names.
    List(ListArgs),
    /// 為選定專案執行建置指令。 / Run the build command for a project.
    Build(BuildArgs),
    /// 在原始碼檔與測試檔之間切換。 / Switch between a source file and its test.
    Toggle(ToggleArgs),
    /// 檢視或修改工作區設定。 / Inspect or change workspace settings.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Args)]
struct FindArgs {
    /// 直接指定名稱，略過互動選單。 / Choose this name instead of prompting.
    #[arg(long, value_name = "NAME")]
    select: Option<String>,
    #[command(flatten)]
    open: OpenArgs,
}

#[derive(Args)]
struct OpenArgs {
    /// 只輸出路徑，不開啟。 / Print the path instead of opening it.
    #[arg(long)]
    print: bool,
}

#[derive(Args)]
struct ListArgs {
    /// 要列出的目錄種類。 / Which directory kind to list.
    #[arg(value_enum)]
    kind: KindChoice,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum KindChoice {
    #[value(alias = "components")]
    Component,
    #[value(alias = "bases")]
    Base,
    #[value(alias = "projects")]
    Project,
}

impl From<KindChoice> for TargetKind {
    fn from(choice: KindChoice) -> Self {
        match choice {
            KindChoice::Component => TargetKind::Component,
            KindChoice::Base => TargetKind::Base,
            KindChoice::Project => TargetKind::Project,
        }
    }
}

#[derive(Args)]
struct BuildArgs {
    /// 要建置的專案；略過時以選單選擇。 / Project to build; prompts when omitted.
    #[arg(long, value_name = "NAME")]
    project: Option<String>,
    /// 等待建置完成並輸出結果。 / Wait for the build and print its output.
    #[arg(long)]
    wait: bool,
    /// 等待時的逾時秒數。 / Timeout in seconds when waiting.
    #[arg(long, value_name = "SECS", requires = "wait")]
    timeout: Option<u64>,
}

#[derive(Args)]
struct ToggleArgs {
    /// 目前的原始碼或測試檔案。 / The current source or test file.
    #[arg(value_name = "FILE")]
    file: PathBuf,
    /// 只輸出對應檔路徑，不建立也不開啟。 / Print the counterpart path without creating or opening it.
    #[arg(long)]
    print: bool,
    /// 對應檔不存在時直接建立。 / Create a missing counterpart without asking.
    #[arg(long, short = 'y')]
    yes: bool,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// 以 JSON 顯示目前設定。 / Print the effective settings as JSON.
    Show,
    /// 顯示設定檔位置。 / Print the settings file location.
    Path,
    /// 讀取單一設定值。 / Print a single setting.
    Get {
        #[arg(value_name = "KEY")]
        key: String,
    },
    /// 修改並儲存單一設定值。 / Change and persist a single setting.
    Set {
        #[arg(value_name = "KEY")]
        key: String,
        #[arg(value_name = "VALUE", allow_hyphen_values = true)]
        value: String,
    },
}

/// Resolved workspace state for a single invocation.
struct Session {
    store: SettingsStore,
    config: WorkspaceConfig,
}

impl Session {
    fn open(workspace: Option<PathBuf>, marker: &str) -> Result<Self> {
        let root = resolve_workspace(workspace, marker)?;
        let store = SettingsStore::load_for_root(&root)
            .with_context(|| format!("failed to load settings for {}", root.display()))?;
        let config = store
            .settings()
            .to_config(&root)
            .context("invalid workspace configuration")?;
        debug!(root = %config.root().display(), "workspace resolved");
        Ok(Self { store, config })
    }

    fn settings(&self) -> &Settings {
        self.store.settings()
    }

    fn opener(&self, print: bool) -> Result<Box<dyn Opener>> {
        if print {
            return Ok(Box::new(PrintOpener));
        }
        match self.settings().opener.as_deref() {
            Some(command) => Ok(Box::new(CommandOpener::parse(command)?)),
            None => Ok(Box::new(SystemOpener)),
        }
    }
}

fn chooser(preselected: Option<String>) -> Box<dyn Chooser> {
    match preselected {
        Some(name) => Box::new(Preselected(name)),
        None => Box::new(InquireChooser),
    }
}

fn notify(notice: Notice) {
    eprintln!("info: {notice}");
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let Cli {
        workspace,
        marker,
        verbose,
        command,
    } = Cli::parse();
    logging::init(verbose);

    let session = Session::open(workspace, &marker)?;
    match command {
        Commands::FindComponent(args) => execute_find(&session, TargetKind::Component, args),
        Commands::FindBase(args) => execute_find(&session, TargetKind::Base, args),
        Commands::ComponentsDir(args) => execute_components_dir(&session, args),
        Commands::List(args) => execute_list(&session, args.kind.into()),
        Commands::Build(args) => execute_build(&session, args),
        Commands::Toggle(args) => execute_toggle(&session, args),
        Commands::Config(subcommand) => execute_config_command(session, subcommand),
    }
}

fn execute_find(session: &Session, kind: TargetKind, args: FindArgs) -> Result<()> {
    let dir = resolve_dir(&session.config, kind);
    let mut entries = list_immediate_directories(&dir);
    if entries.is_empty() {
        notify(Notice::for_empty_listing(kind, dir));
        return Ok(());
    }
    entries.sort();

    let names = entries.iter().map(|entry| entry.name.clone()).collect();
    let prompt = format!("Find {}:", kind.label());
    let Some(choice) = chooser(args.select).choose(&prompt, names)? else {
        return Ok(());
    };
    let entry = entries
        .into_iter()
        .find(|entry| entry.name == choice)
        .ok_or_else(|| anyhow!("{} '{choice}' disappeared", kind.label()))?;
    session.opener(args.open.print)?.open(&entry.path)
}

fn execute_components_dir(session: &Session, args: OpenArgs) -> Result<()> {
    let dir = resolve_components_dir(&session.config);
    if !dir.is_dir() {
        notify(Notice::DirectoryNotFound {
            kind: TargetKind::Component,
            path: dir,
        });
        return Ok(());
    }
    session.opener(args.print)?.open(&dir)
}

fn execute_list(session: &Session, kind: TargetKind) -> Result<()> {
    let dir = resolve_dir(&session.config, kind);
    let mut names = list_project_names(&dir);
    if names.is_empty() {
        notify(Notice::for_empty_listing(kind, dir));
        return Ok(());
    }
    names.sort();
    for name in names {
        println!("{name}");
    }
    Ok(())
}

fn execute_build(session: &Session, args: BuildArgs) -> Result<()> {
    let projects_dir = resolve_dir(&session.config, TargetKind::Project);
    let mut names = list_project_names(&projects_dir);
    if names.is_empty() {
        notify(Notice::for_empty_listing(TargetKind::Project, projects_dir));
        return Ok(());
    }
    names.sort();

    let Some(project) = chooser(args.project).choose("Build project:", names)? else {
        return Ok(());
    };

    let root = session.config.root();
    let build = &session.settings().build;
    let project_dir = projects_dir.join(&project);
    let command = build.render(&project, root, &project_dir);
    let mut spec = RunSpec::shell(command)
        .with_working_dir(root)
        .with_env("POLYNAV_PROJECT", project.as_str())
        .with_env("POLYNAV_ROOT", root.display().to_string())
        .with_env("POLYNAV_PROJECT_DIR", project_dir.display().to_string());
    if let Some(secs) = args.timeout {
        spec = spec.with_timeout(Duration::from_secs(secs));
    }
    let sink = LogSink::new(build.log_file(root, &project));

    if !args.wait {
        let process = RunExecutor::launch(&spec, &sink)
            .with_context(|| format!("failed to start build for '{project}'"))?;
        println!(
            "Started build for '{}' (pid {}); output: {}",
            project,
            process.pid(),
            process.log_path().display()
        );
        return Ok(());
    }

    let result = RunExecutor::execute(&spec)
        .with_context(|| format!("failed to run build for '{project}'"))?;
    sink.record(&spec, &result)?;
    print!("{}", String::from_utf8_lossy(&result.stdout));
    eprint!("{}", String::from_utf8_lossy(&result.stderr));
    if result.timed_out {
        bail!("build for '{project}' timed out; log: {}", sink.path().display());
    }
    if !result.success() {
        bail!(
            "build for '{project}' failed with exit code {}; log: {}",
            result
                .exit_code
                .map_or_else(|| "none".to_string(), |code| code.to_string()),
            sink.path().display()
        );
    }
    println!("Build for '{project}' succeeded; log: {}", sink.path().display());
    Ok(())
}

fn execute_toggle(session: &Session, args: ToggleArgs) -> Result<()> {
    let file = resolve_input_path(&args.file)?;
    let Some(target) = counterpart_within_root(&file, &session.config) else {
        notify(Notice::NoCounterpart(file));
        return Ok(());
    };

    if args.print {
        if !target.exists() {
            notify(Notice::TargetMissing(target.clone()));
        }
        println!("{}", target.display());
        return Ok(());
    }

    if !target.exists() {
        notify(Notice::TargetMissing(target.clone()));
        if !confirm(&format!("Create {}?", target.display()), args.yes)? {
            return Ok(());
        }
        create_empty_file(&target)?;
    }
    session.opener(false)?.open(&target)
}

/// Maps `file` relative to the workspace root so directories above the root
/// never count as source or test segments.
fn counterpart_within_root(file: &Path, config: &WorkspaceConfig) -> Option<PathBuf> {
    let rules = config.counterpart_rules();
    match file.strip_prefix(config.root()) {
        Ok(relative) => to_counterpart(relative, rules).map(|target| config.root().join(target)),
        Err(_) => to_counterpart(file, rules),
    }
}

fn create_empty_file(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    Ok(())
}

fn execute_config_command(mut session: Session, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            let json = serde_json::to_string_pretty(session.settings())?;
            println!("{json}");
        }
        ConfigCommand::Path => println!("{}", session.store.path().display()),
        ConfigCommand::Get { key } => println!("{}", session.settings().get(&key)?),
        ConfigCommand::Set { key, value } => {
            session
                .store
                .set(&key, &value)
                .with_context(|| format!("failed to update '{key}'"))?;
            session.store.reload()?;
            println!("Set {key} = {}", session.settings().get(&key)?);
        }
    }
    Ok(())
}

/// Picks the workspace root: explicit flag or environment, then marker
/// discovery from the current directory, then the current directory itself.
fn resolve_workspace(workspace: Option<PathBuf>, marker: &str) -> Result<PathBuf> {
    match workspace {
        Some(path) => resolve_input_path(&path),
        None => {
            let cwd = std::env::current_dir().context("determine current directory")?;
            Ok(discover_root(&cwd, marker).unwrap_or(cwd))
        }
    }
}

fn resolve_input_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()
            .context("determine current directory")?
            .join(path))
    }
}
