use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use gcloud_console::adapters::outbound::{init_combined_logger, GcloudCli, TokioProcessRunner};
use gcloud_console::common::format::{
    format_cpu, format_duration, format_file_size, format_memory, format_permission_members,
    parse_env_vars, sanitize_filename, severity_tone, status_tone, truncate_text,
    validate_image_name, validate_project_id, Tone,
};
use gcloud_console::domains::platform::{BuildConfig, ServiceConfig};
use gcloud_console::{
    catalog, Config, ConfigStore, Dispatcher, LogLevel, OperationGateway, OperationRequest, Record,
    UnitOutput,
};
use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "gcloud-console", about = "Inspect and operate cloud platform resources")]
struct Cli {
    /// TOML settings file
    #[arg(long, default_value = "gcloud-console.toml")]
    config: PathBuf,

    #[arg(long)]
    project: Option<String>,

    #[arg(long)]
    location: Option<String>,

    /// Also write domain messages to this file
    #[arg(long)]
    log_file: Option<String>,

    /// Print raw JSON instead of tables
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List services
    Services,
    /// Deploy a new service
    CreateService {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        image: Option<String>,
        #[arg(long)]
        port: Option<u16>,
        #[arg(long)]
        cpu: Option<String>,
        #[arg(long)]
        memory: Option<String>,
        /// basic, high_performance or cost_optimized
        #[arg(long)]
        template: Option<String>,
        /// KEY=VALUE, repeatable
        #[arg(long = "env")]
        env: Vec<String>,
    },
    /// List artifact repositories
    Images,
    /// Read recent log entries
    Logs {
        #[arg(long)]
        filter: Option<String>,
    },
    /// Start a container build from a storage object
    Build {
        #[arg(long)]
        bucket: Option<String>,
        #[arg(long)]
        object: Option<String>,
        #[arg(long)]
        image: Option<String>,
        #[arg(long)]
        template: Option<String>,
    },
    /// Push a local image
    Push { image: String },
    /// List service accounts
    Accounts,
    /// List IAM bindings
    Permissions,
    /// Grant a role to a member
    Grant {
        /// Role id or catalog label such as "Logs Viewer"
        #[arg(long)]
        role: String,
        #[arg(long)]
        member: String,
    },
    /// List accessible projects
    Projects,
    /// Check default credentials
    Auth,
    /// Run the platform CLI with the given arguments
    Cli {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Write the current settings to a JSON backup
    BackupConfig { path: Option<PathBuf> },
}

fn build_request(command: Command, store: &ConfigStore) -> anyhow::Result<Option<OperationRequest>> {
    let request = match command {
        Command::Services => OperationRequest::new("get_services"),
        Command::CreateService { name, image, port, cpu, memory, template, env } => {
            let mut service = match template {
                Some(t) => catalog::service_template(&t, &store.project_id())
                    .with_context(|| format!("unknown service template: {}", t))?,
                None => ServiceConfig::default(),
            };
            if let Some(v) = name { service.name = v; }
            if let Some(v) = image { service.image = v; }
            if let Some(v) = port { service.port = v; }
            if let Some(v) = cpu { service.cpu = v; }
            if let Some(v) = memory { service.memory = v; }
            service.env.extend(parse_env_vars(&env.join("\n")));
            check_image(&service.image)?;
            info!(
                service = %service.name,
                cpu = %format_cpu(&service.cpu),
                memory = %format_memory(&service.memory),
                "deploying service"
            );
            OperationRequest::create_service(&service)
        }
        Command::Images => OperationRequest::new("get_images"),
        Command::Logs { filter } => match filter {
            Some(f) => OperationRequest::get_logs(&f),
            None => OperationRequest::new("get_logs"),
        },
        Command::Build { bucket, object, image, template } => {
            let mut build = BuildConfig { bucket, template, ..BuildConfig::default() };
            if let Some(v) = object { build.object = v; }
            if let Some(v) = image { build.image_name = v; }
            check_image(&build.image_name)?;
            OperationRequest::build_image(&build)
        }
        Command::Push { image } => {
            check_image(&image)?;
            OperationRequest::push_image(&image)
        }
        Command::Accounts => OperationRequest::new("get_service_accounts"),
        Command::Permissions => OperationRequest::new("get_permissions"),
        Command::Grant { role, member } => {
            let role = catalog::role_id(&role).map(str::to_string).unwrap_or(role);
            OperationRequest::add_permission(&role, &member)
        }
        Command::Projects => OperationRequest::new("get_projects"),
        Command::Auth => OperationRequest::new("check_auth"),
        Command::Cli { args } => OperationRequest::run_command(args),
        Command::BackupConfig { path } => {
            let path = path.map(|p| match p.file_name().and_then(|n| n.to_str()) {
                Some(name) => p.with_file_name(sanitize_filename(name)),
                None => p,
            });
            let written = store.create_backup(path.as_deref())?;
            let size = std::fs::metadata(&written).map(|m| m.len()).unwrap_or(0);
            println!(
                "Configuration written to {} ({})",
                written.display(),
                format_file_size(size)
            );
            return Ok(None);
        }
    };
    Ok(Some(request))
}

fn check_image(image: &str) -> anyhow::Result<()> {
    if !validate_image_name(image) {
        bail!("invalid image name: {} (expected gcr.io/<project>/<name> or <registry>/<name>:<tag>)", image);
    }
    Ok(())
}

fn marker(tone: Tone) -> &'static str {
    match tone {
        Tone::Good => "+",
        Tone::Bad => "!",
        Tone::Pending => "~",
        Tone::Info => "i",
        Tone::Muted | Tone::Neutral => " ",
    }
}

fn render(output: UnitOutput, as_json: bool) -> bool {
    if as_json {
        match serde_json::to_string_pretty(&output) {
            Ok(text) => println!("{}", text),
            Err(e) => eprintln!("Failed to encode output: {}", e),
        }
    }
    match output {
        UnitOutput::Envelope(env) => {
            if !env.ok {
                eprintln!("Error ({}): {}", env.kind, env.error.unwrap_or_default());
                return false;
            }
            if as_json {
                return true;
            }
            if env.payload.is_empty() {
                println!("No {} found", env.kind);
            }
            for record in &env.payload {
                match record {
                    Record::Service(s) => println!("{} {:<40} {:<12} {:<40} {}", marker(status_tone(&s.status)), s.name, s.status, s.url, s.created),
                    Record::Image(i) => println!("{:<50} {:<8} {}", i.name, i.format, i.description),
                    Record::Log(l) => println!("{} {} {:<8} [{}] {}", marker(severity_tone(&l.severity)), l.timestamp, l.severity, l.resource_type, truncate_text(&l.text, 120)),
                    Record::Operation(h) => println!("Operation: {}", h.operation),
                    Record::Message(m) => println!("{}", m.message),
                    Record::ServiceAccount(a) => println!("{:<50} {:<30} {}", a.email, a.display_name, if a.disabled { "disabled" } else { "enabled" }),
                    Record::Binding(b) => println!("{:<40} {}", b.role, format_permission_members(&b.members)),
                    Record::Project(p) => println!("{:<30} {:<30} {}", p.project_id, p.display_name, p.state),
                }
            }
            true
        }
        UnitOutput::Auth(status) => {
            if !as_json {
                match (&status.project, &status.error) {
                    (Some(p), _) if status.authenticated => println!("Authenticated, project {}", p),
                    (_, Some(e)) => eprintln!("{}", e),
                    _ => eprintln!("Not authenticated"),
                }
            }
            status.authenticated
        }
        UnitOutput::Command(out) => {
            if !as_json {
                print!("{}", out.stdout);
                eprint!("{}", out.stderr);
                if let Some(e) = &out.error {
                    eprintln!("{}", e);
                }
            }
            out.ok
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(Some(cli.config.as_path()))?;
    if let Some(project) = cli.project.clone() {
        if !validate_project_id(&project) {
            bail!("invalid project id: {}", project);
        }
        config.project_id = project;
    }
    if let Some(location) = cli.location.clone() {
        config.location = location;
    }

    let level: LogLevel = config.log_level.parse().unwrap_or(LogLevel::Info);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.directive()));
    // `set_global_default` leaves the `log` facade free for the fast_log file sink.
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("installing tracing subscriber")?;

    // Terminal output already comes from tracing; the domain logger only adds the file.
    let logger = init_combined_logger(cli.log_file.as_deref(), level, false);
    let clients = GcloudCli::from_config(Arc::new(TokioProcessRunner), &config).into_clients();
    let store = Arc::new(ConfigStore::new(config));
    let gateway = Arc::new(OperationGateway::new(store.clone(), clients, logger));

    let started = Instant::now();
    let succeeded = Rc::new(Cell::new(false));
    let mut dispatcher = Dispatcher::new(gateway, tokio::runtime::Handle::current());
    let needs_project = !matches!(
        cli.command,
        Command::Auth | Command::Cli { .. } | Command::Projects | Command::BackupConfig { .. }
    );
    if needs_project && dispatcher.resolve_project().is_some() {
        let interrupted = tokio::select! {
            _ = dispatcher.drain() => false,
            _ = tokio::signal::ctrl_c() => true,
        };
        if interrupted {
            dispatcher.teardown().await;
            bail!("interrupted while resolving the project");
        }
    }

    let Some(request) = build_request(cli.command, &store)? else {
        return Ok(());
    };
    info!(project = %store.project_id(), location = %store.location(), "gcloud-console starting");

    let as_json = cli.json;
    let flag = succeeded.clone();
    dispatcher.dispatch(
        request,
        move |output| flag.set(render(output, as_json)),
        |message| eprintln!("Operation failed: {}", message),
    );

    tokio::select! {
        _ = dispatcher.drain() => {}
        _ = tokio::signal::ctrl_c() => {
            eprintln!("Interrupted");
        }
    }
    dispatcher.teardown().await;
    info!(elapsed = %format_duration(started.elapsed().as_secs()), "operation finished");

    if !succeeded.get() {
        bail!("operation did not succeed");
    }
    Ok(())
}
