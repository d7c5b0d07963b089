use clap::{Parser, Subcommand};

use crate::database::Database;
use crate::services::CompanyService;

#[derive(Parser)]
#[command(name = "crewdesk", about = "CrewDesk admin CLI", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the API server
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
    /// Manage companies. These commands are cross-tenant by nature and run
    /// outside any tenant scope.
    #[command(subcommand)]
    Company(CompanyCommand),
}

#[derive(Subcommand)]
pub enum CompanyCommand {
    /// Provision a company with its first admin account
    Create {
        name: String,
        #[arg(long)]
        admin_email: String,
        #[arg(long)]
        admin_password: String,
    },
    /// List all companies
    List,
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve { port } => crate::server::serve(port).await,
        Command::Company(command) => {
            let service = CompanyService::new(Database::pool().await?);
            match command {
                CompanyCommand::Create { name, admin_email, admin_password } => {
                    let (company, user) =
                        service.create_company(&name, &admin_email, &admin_password).await?;
                    println!("created company {} ({})", company.slug, company.id);
                    println!("created admin   {} ({})", user.email, user.id);
                }
                CompanyCommand::List => {
                    for company in service.list_companies().await? {
                        println!(
                            "{}  {:<24}  active={}",
                            company.id, company.slug, company.is_active
                        );
                    }
                }
            }
            Ok(())
        }
    }
}
