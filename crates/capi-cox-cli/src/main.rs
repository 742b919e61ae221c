use capi_cox_cloud::{CoxClient, Credentials, WorkloadApi};
use clap::{Parser, Subcommand};
use colored::Colorize;

#[derive(Parser)]
#[command(name = "cox")]
#[command(about = "Inspect CoxEdge workloads behind the infrastructure provider", long_about = None)]
struct Cli {
    /// CoxEdge API key
    #[arg(long, env = "COX_API_KEY", hide_env_values = true)]
    api_key: String,

    /// CoxEdge service slug
    #[arg(long, env = "COX_SERVICE")]
    service: String,

    /// CoxEdge environment name
    #[arg(long, env = "COX_ENVIRONMENT")]
    environment: String,

    /// Portal base URL override
    #[arg(long, env = "COX_API_BASE_URL")]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage workloads
    #[command(subcommand)]
    Workload(WorkloadCommands),
    /// Inspect workload instances
    #[command(subcommand)]
    Instance(InstanceCommands),
    /// Inspect provisioning tasks
    #[command(subcommand)]
    Task(TaskCommands),
}

#[derive(Subcommand)]
enum WorkloadCommands {
    /// List all workloads in the environment
    List,
    /// Show one workload
    Get {
        /// Workload ID
        id: String,
    },
    /// Delete a workload
    Delete {
        /// Workload ID
        id: String,
    },
}

#[derive(Subcommand)]
enum InstanceCommands {
    /// List the instances of a workload
    List {
        /// Workload ID
        workload_id: String,
    },
}

#[derive(Subcommand)]
enum TaskCommands {
    /// Show a provisioning task
    Get {
        /// Task ID
        id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let mut credentials = Credentials::new(&cli.api_key, &cli.service, &cli.environment);
    credentials.base_url = cli.base_url.clone();
    let client = CoxClient::new(&credentials)?;

    match cli.command {
        Commands::Workload(WorkloadCommands::List) => {
            let workloads = client.list_workloads().await?;
            if workloads.is_empty() {
                println!("{}", "no workloads".yellow());
                return Ok(());
            }
            for workload in workloads {
                println!(
                    "{}  {}  {}  {}",
                    workload.id.cyan(),
                    workload.name,
                    workload.workload_type,
                    workload.status.green(),
                );
            }
        }
        Commands::Workload(WorkloadCommands::Get { id }) => {
            let workload = client.get_workload(&id).await?;
            println!("{}: {}", "name".bold(), workload.name);
            println!("{}: {}", "type".bold(), workload.workload_type);
            println!("{}: {}", "image".bold(), workload.image);
            println!("{}: {}", "specs".bold(), workload.specs);
            println!("{}: {}", "status".bold(), workload.status.green());
            if !workload.anycast_ip_address.is_empty() {
                println!("{}: {}", "anycast ip".bold(), workload.anycast_ip_address);
            }
            for kv in &workload.environment_variables {
                println!("{}: {}={}", "env".bold(), kv.key, kv.value);
            }
        }
        Commands::Workload(WorkloadCommands::Delete { id }) => {
            let handle = client.delete_workload(&id).await?;
            println!(
                "{} {} (task {})",
                "delete accepted:".green(),
                id,
                handle.task_id.cyan(),
            );
        }
        Commands::Instance(InstanceCommands::List { workload_id }) => {
            let instances = client.list_instances(&workload_id).await?;
            if instances.is_empty() {
                println!("{}", "no instances".yellow());
                return Ok(());
            }
            for instance in instances {
                println!(
                    "{}  {}  public={}  internal={}  {}",
                    instance.name.cyan(),
                    instance.location,
                    instance.public_ip_address,
                    instance.ip_address,
                    instance.status.green(),
                );
            }
        }
        Commands::Task(TaskCommands::Get { id }) => {
            let task = client.get_task(&id).await?;
            println!("{}: {:?}", "status".bold(), task.status);
            if !task.workload_id().is_empty() {
                println!("{}: {}", "workload".bold(), task.workload_id());
            }
        }
    }

    Ok(())
}
