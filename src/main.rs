use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, bail, eyre};
use colored::Colorize;
use envledger::{
    ChangeSet, EnvLedger, Environment, EnvironmentVariable, ImportFormat, NewVariable,
    Notification, Notifier, SortBy, SortOrder, StorageRegistry, TransferKind, TransferOperation,
    VariableUpdate, config, mask_value,
};
use inquire::Confirm;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Main CLI structure for the envledger application.
#[derive(Parser)]
#[command(name = "envledger")]
#[command(about = "Stage environment variables across development, preview and production", long_about = None)]
struct Cli {
    /// Path to an envledger.toml file
    #[arg(short, long, global = true, env = "ENVLEDGER_CONFIG")]
    config: Option<PathBuf>,
    /// Storage URI overriding the configuration (memory, file:<dir>)
    #[arg(short, long, global = true, env = "ENVLEDGER_STORAGE")]
    storage: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List variables through the saved filters
    List {
        /// Ignore the saved filters
        #[arg(long)]
        all: bool,
    },
    /// Show one variable
    Show {
        /// Variable id or name
        var: String,
        /// Unmask secret values
        #[arg(long)]
        reveal: bool,
    },
    /// Create a variable
    Add {
        name: String,
        /// Value as ENV=VALUE, repeatable
        #[arg(short, long = "value", value_parser = parse_env_value)]
        values: Vec<(Environment, String)>,
        /// Prompt for the value of ENV without echoing it, repeatable
        #[arg(long)]
        prompt: Vec<Environment>,
        #[arg(long)]
        secret: bool,
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Update a variable
    Set {
        /// Variable id or name
        var: String,
        /// New value as ENV=VALUE, repeatable
        #[arg(short, long = "value", value_parser = parse_env_value)]
        values: Vec<(Environment, String)>,
        /// Unset the value in ENV, repeatable
        #[arg(long)]
        unset: Vec<Environment>,
        /// Prompt for the value of ENV without echoing it, repeatable
        #[arg(long)]
        prompt: Vec<Environment>,
        /// Rename the variable
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        secret: Option<bool>,
        #[arg(short, long)]
        description: Option<String>,
        /// Remove the description
        #[arg(long, conflicts_with = "description")]
        clear_description: bool,
    },
    /// Delete variables
    Rm {
        /// Variable ids or names
        #[arg(required = true)]
        vars: Vec<String>,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Import variables from a file, or stdin with "-"
    Import {
        file: PathBuf,
        #[arg(short, long, default_value = "kv")]
        format: ImportFormat,
        /// Target environments; defaults to the saved environment selection
        #[arg(short, long)]
        env: Vec<Environment>,
        /// Mark imported variables secret unless the input says otherwise
        #[arg(long)]
        secret: bool,
    },
    /// Print KEY=value lines for one environment
    Export {
        #[arg(short, long)]
        env: Environment,
        /// Variable ids or names; all when omitted
        vars: Vec<String>,
    },
    /// Copy or move values between environments
    Transfer {
        #[arg(value_parser = parse_transfer_kind)]
        kind: TransferKind,
        #[arg(long)]
        from: Environment,
        #[arg(long)]
        to: Environment,
        /// Variable ids or names
        #[arg(required = true)]
        vars: Vec<String>,
    },
    /// Manage the saved search filters
    Filter {
        #[command(subcommand)]
        action: FilterAction,
    },
    /// Manage change sets
    Changes {
        #[command(subcommand)]
        action: ChangesAction,
    },
    /// Inspect the history log
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
    /// Track the onboarding walkthrough
    Walkthrough {
        #[command(subcommand)]
        action: WalkthroughAction,
    },
    /// List the available storage backends
    Backends,
}

#[derive(Subcommand)]
enum FilterAction {
    /// Show the saved filters
    Show,
    /// Change one or more filters
    Set {
        #[arg(short, long)]
        query: Option<String>,
        /// Environments to filter on, repeatable
        #[arg(short, long)]
        env: Vec<Environment>,
        #[arg(long)]
        secrets_only: Option<bool>,
        #[arg(long)]
        sort_by: Option<SortBy>,
        #[arg(long)]
        order: Option<SortOrder>,
    },
    /// Toggle one environment in the filter
    ToggleEnv { env: Environment },
    /// Reset every filter
    Clear,
}

#[derive(Subcommand)]
enum ChangesAction {
    /// List change sets
    List,
    /// Show a change set; the current draft when no id is given
    Show { id: Option<String> },
    /// Apply a change set; the current draft when no id is given
    Apply { id: Option<String> },
    /// Delete a change set
    Delete {
        id: String,
        #[arg(short, long)]
        yes: bool,
    },
    /// Set the environments a change set targets
    Envs {
        id: String,
        #[arg(required = true)]
        envs: Vec<Environment>,
    },
}

#[derive(Subcommand)]
enum HistoryAction {
    /// List commits, newest first
    List,
    /// Show the changes recorded by one entry
    Show { id: String },
    /// Show the variables as they were after one entry
    At { id: String },
    /// Drop every history entry
    Clear {
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum WalkthroughAction {
    Done,
    Reset,
    Status,
}

/// Prints notifications as status lines.
struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: Notification) {
        println!(
            "{} {}: {}",
            "✓".green(),
            notification.title.bold(),
            notification.description
        );
    }
}

fn parse_env_value(s: &str) -> std::result::Result<(Environment, String), String> {
    let (env, value) = s
        .split_once('=')
        .ok_or_else(|| format!("Expected ENV=VALUE, got '{}'", s))?;
    Ok((env.parse()?, value.to_string()))
}

fn parse_transfer_kind(s: &str) -> std::result::Result<TransferKind, String> {
    match s {
        "copy" => Ok(TransferKind::Copy),
        "move" => Ok(TransferKind::Move),
        other => Err(format!("Expected copy or move, got '{}'", other)),
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn confirm(message: &str, skip: bool) -> Result<bool> {
    if skip {
        return Ok(true);
    }
    Ok(Confirm::new(message).with_default(false).prompt()?)
}

fn prompt_value(name: &str, env: Environment) -> Result<String> {
    rpassword::prompt_password(format!("Value for {} ({}): ", name, env))
        .wrap_err("Failed to read value")
}

/// Resolve an id or a name to a variable id. Ids win over names.
fn resolve(ledger: &EnvLedger, key: &str) -> Result<String> {
    ledger
        .variable(key)
        .or_else(|| ledger.variables().iter().find(|v| v.name == key))
        .map(|v| v.id.clone())
        .ok_or_else(|| eyre!("Variable '{}' not found", key))
}

fn resolve_all(ledger: &EnvLedger, keys: &[String]) -> Result<Vec<String>> {
    keys.iter().map(|key| resolve(ledger, key)).collect()
}

fn print_variable(ledger: &EnvLedger, var: &EnvironmentVariable) {
    let secret = if var.is_secret {
        format!(" {}", "[secret]".yellow())
    } else {
        String::new()
    };
    println!("{}{}  {}", var.name.bold(), secret, var.id.dimmed());
    if let Some(description) = &var.description {
        println!("  {}", description.dimmed());
    }
    let masked = var.is_secret && !ledger.selection().is_revealed(&var.id);
    for env in Environment::ALL {
        let shown = match var.value(env) {
            Some(value) if masked => mask_value(value),
            Some(value) => value.to_string(),
            None => "(unset)".dimmed().to_string(),
        };
        println!("  {:<12} {}", env.label(), shown);
    }
}

fn print_change_set(change_set: &ChangeSet) {
    println!(
        "{}  {}  [{}]",
        change_set.name.bold(),
        change_set.id.dimmed(),
        change_set.status
    );
    if let Some(description) = &change_set.description {
        println!("  {}", description);
    }
    let envs: Vec<&str> = change_set.environments.iter().map(|e| e.as_str()).collect();
    println!("  targets: {}", envs.join(", "));
    if let Some(applied_at) = change_set.applied_at {
        println!("  applied: {}", applied_at.format("%Y-%m-%d %H:%M:%S"));
    }
    for change in &change_set.changes {
        println!("  {} {}", change.action.to_string().cyan(), change.name);
        for (env, value) in &change.values {
            println!(
                "      {:<12} {} -> {}",
                env.as_str(),
                value.before.as_deref().unwrap_or("(unset)"),
                value.after.as_deref().unwrap_or("(unset)")
            );
        }
    }
}

fn read_input(file: &PathBuf) -> Result<String> {
    if file.as_os_str() == "-" {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .wrap_err("Failed to read stdin")?;
        return Ok(text);
    }
    fs::read_to_string(file).wrap_err_with(|| format!("Failed to read {}", file.display()))
}

fn main() -> Result<()> {
    color_eyre::install()?;
    init_logging();
    let cli = Cli::parse();

    if let Commands::Backends = cli.command {
        for info in StorageRegistry::backends() {
            println!("{}", info.display_with_examples());
        }
        return Ok(());
    }

    let cwd = std::env::current_dir().wrap_err("Failed to determine current directory")?;
    let mut ledger_config = config::load_config(cli.config.as_deref(), &cwd)?;
    if let Some(storage) = cli.storage {
        ledger_config.storage.uri = Some(storage);
    }
    let mut ledger = config::open_ledger(&ledger_config)?.with_notifier(Arc::new(ConsoleNotifier));

    match cli.command {
        Commands::Backends => {}
        Commands::List { all } => {
            let variables = if all {
                ledger.variables().to_vec()
            } else {
                ledger.filtered_variables()
            };
            if variables.is_empty() {
                println!("No variables found.");
            }
            for var in &variables {
                print_variable(&ledger, var);
            }
            if !all && ledger.search().has_active_filters() {
                println!(
                    "\n{} filters active; showing {} of {}",
                    "!".yellow(),
                    variables.len(),
                    ledger.variables().len()
                );
            }
        }
        Commands::Show { var, reveal } => {
            let id = resolve(&ledger, &var)?;
            if reveal {
                ledger.selection_mut().reveal(&id);
            }
            if let Some(var) = ledger.variable(&id) {
                print_variable(&ledger, var);
            }
        }
        Commands::Add {
            name,
            values,
            prompt,
            secret,
            description,
        } => {
            let mut data = NewVariable::new(name).secret(secret);
            for (env, value) in values {
                data = data.value(env, value);
            }
            for env in prompt {
                let value = prompt_value(&data.name, env)?;
                data = data.value(env, value);
            }
            if let Some(description) = description {
                data = data.description(description);
            }
            ledger.create_variable(data)?;
        }
        Commands::Set {
            var,
            values,
            unset,
            prompt,
            name,
            secret,
            description,
            clear_description,
        } => {
            let id = resolve(&ledger, &var)?;
            let mut update = VariableUpdate::new();
            if let Some(name) = name {
                update = update.name(name);
            }
            for (env, value) in values {
                update = update.value(env, value);
            }
            for env in unset {
                update = update.unset(env);
            }
            for env in prompt {
                update = update.value(env, prompt_value(&var, env)?);
            }
            if let Some(secret) = secret {
                update = update.secret(secret);
            }
            if description.is_some() || clear_description {
                update = update.description(description);
            }
            if update.is_empty() {
                bail!("Nothing to update");
            }
            ledger.update_variable(&id, &update)?;
        }
        Commands::Rm { vars, yes } => {
            let ids = resolve_all(&ledger, &vars)?;
            if !confirm(&format!("Delete {} variable(s)?", ids.len()), yes)? {
                println!("Cancelled.");
                return Ok(());
            }
            if let [id] = ids.as_slice() {
                ledger.delete_variable(id);
            } else {
                ledger.delete_variables(&ids);
            }
        }
        Commands::Import {
            file,
            format,
            env,
            secret,
        } => {
            let text = read_input(&file)?;
            let environments = if env.is_empty() {
                ledger.environments().selected().to_vec()
            } else {
                env
            };
            if let Err(err) = ledger.import(&text, format, &environments, secret) {
                for message in err.messages() {
                    eprintln!("{} {}", "✗".red(), message);
                }
                bail!("Import failed");
            }
        }
        Commands::Export { env, vars } => {
            let ids = resolve_all(&ledger, &vars)?;
            print!("{}", ledger.export(&ids, env));
        }
        Commands::Transfer {
            kind,
            from,
            to,
            vars,
        } => {
            let var_ids = resolve_all(&ledger, &vars)?;
            let updated = ledger.transfer(&TransferOperation {
                kind,
                source_env: from,
                target_env: to,
                var_ids,
            })?;
            if updated.is_empty() {
                println!("No variables had a value in {}.", from);
            }
        }
        Commands::Filter { action } => {
            match action {
                FilterAction::Show => {}
                FilterAction::Set {
                    query,
                    env,
                    secrets_only,
                    sort_by,
                    order,
                } => {
                    let search = ledger.search_mut();
                    if let Some(query) = query {
                        search.set_search_query(query);
                    }
                    if !env.is_empty() {
                        search.set_selected_environments(&env);
                    }
                    if let Some(secrets_only) = secrets_only {
                        search.set_show_secrets_only(secrets_only);
                    }
                    if let Some(sort_by) = sort_by {
                        search.set_sort_by(sort_by);
                    }
                    if let Some(order) = order {
                        search.set_sort_order(order);
                    }
                }
                FilterAction::ToggleEnv { env } => ledger.search_mut().toggle_environment(env),
                FilterAction::Clear => ledger.search_mut().clear_filters(),
            }
            let filters = ledger.search().filters();
            let envs: Vec<&str> = filters
                .selected_environments
                .iter()
                .map(|e| e.as_str())
                .collect();
            println!("query:        {:?}", filters.search_query);
            println!("environments: {}", envs.join(", "));
            println!("secrets only: {}", filters.show_secrets_only);
            println!("sort:         {:?} {:?}", filters.sort_by, filters.sort_order);
        }
        Commands::Changes { action } => match action {
            ChangesAction::List => {
                let current = ledger.change_sets().current_change_set().map(|cs| cs.id.clone());
                for cs in ledger.change_sets().change_sets() {
                    let marker = if current.as_deref() == Some(cs.id.as_str()) {
                        "*".green().to_string()
                    } else {
                        " ".to_string()
                    };
                    println!(
                        "{} {}  {}  [{}]  {} change(s)",
                        marker,
                        cs.id.dimmed(),
                        cs.name,
                        cs.status,
                        cs.changes.len()
                    );
                }
            }
            ChangesAction::Show { id } => {
                let change_set = match &id {
                    Some(id) => ledger.change_sets().get(id),
                    None => ledger.change_sets().current_change_set(),
                };
                match change_set {
                    Some(cs) => print_change_set(cs),
                    None => println!("No change set found."),
                }
            }
            ChangesAction::Apply { id } => {
                let report = match id {
                    Some(id) => ledger.apply_change_set(&id),
                    None => ledger.apply_current_change_set(),
                };
                let Some(report) = report else {
                    bail!("No change set to apply");
                };
                for conflict in &report.conflicts {
                    println!("{} {}: {}", "!".yellow(), conflict.var_name, conflict.details);
                }
            }
            ChangesAction::Delete { id, yes } => {
                if !confirm(&format!("Delete change set {}?", id), yes)? {
                    println!("Cancelled.");
                    return Ok(());
                }
                if ledger.delete_change_set(&id).is_none() {
                    bail!("Change set '{}' not found", id);
                }
                println!("{} Deleted change set {}", "✓".green(), id);
            }
            ChangesAction::Envs { id, envs } => {
                if !ledger
                    .change_sets_mut()
                    .update_change_set_environments(&id, envs)
                {
                    bail!("Change set '{}' not found", id);
                }
            }
        },
        Commands::History { action } => match action {
            HistoryAction::List => {
                for commit in ledger.history().commit_history() {
                    println!(
                        "{}  {}  {:<16} {} ({} change(s))",
                        commit.id.dimmed(),
                        commit.timestamp.format("%Y-%m-%d %H:%M:%S"),
                        commit.action.to_string(),
                        commit.message,
                        commit.changes_count
                    );
                }
            }
            HistoryAction::Show { id } => {
                let entry = ledger
                    .history()
                    .commit_details(&id)
                    .ok_or_else(|| eyre!("History entry '{}' not found", id))?;
                println!("{}  {}", entry.description.bold(), entry.action);
                for change in &entry.changes {
                    println!("  {} {}", change.action.to_string().cyan(), change.name);
                }
            }
            HistoryAction::At { id } => {
                let snapshot = ledger
                    .time_travel(&id)
                    .ok_or_else(|| eyre!("No snapshot recorded for '{}'", id))?;
                for var in snapshot {
                    print_variable(&ledger, var);
                }
            }
            HistoryAction::Clear { yes } => {
                if !confirm("Clear the entire history?", yes)? {
                    println!("Cancelled.");
                    return Ok(());
                }
                ledger.history_mut().clear_history();
                println!("{} History cleared", "✓".green());
            }
        },
        Commands::Walkthrough { action } => match action {
            WalkthroughAction::Done => ledger.walkthrough_mut().mark_complete(),
            WalkthroughAction::Reset => ledger.walkthrough_mut().reset(),
            WalkthroughAction::Status => {
                if ledger.walkthrough().has_completed() {
                    println!("completed");
                } else {
                    println!("not completed");
                }
            }
        },
    }

    Ok(())
}
