use std::sync::Arc;

use clap::{Parser, Subcommand};
use miette::Result;
use tracing_subscriber::{fmt, EnvFilter};

use pariah::access::{ResourceAcl, ResourceId, User};
use pariah::mapper::{Criteria, MapperRegistry};
use pariah::model::EntityKind;
use pariah::settings::Settings;
use pariah::storage::SqlStore;

#[derive(Parser, Debug)]
#[command(
    name = "pariah",
    version,
    about = "Entity mapping and resource access control"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check whether a user may perform an action on a resource
    Check {
        /// Resource id, e.g. BlogArticle:42
        #[arg(long)]
        resource: String,
        /// Username to check
        #[arg(long)]
        user: String,
        /// Action name, e.g. delete
        #[arg(long)]
        action: String,
    },
}

fn main() -> Result<()> {
    // logging
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    // load settings
    let settings = Settings::load(&cli.config)?;
    tracing::info!(?settings, "Loaded configuration");

    // init storage (database)
    let store = SqlStore::connect(&settings.database)?;
    let registry = MapperRegistry::new(Arc::new(store), settings.mapping());

    match cli.command {
        Command::Check {
            resource,
            user,
            action,
        } => {
            let resource_id: ResourceId = resource.parse()?;
            let user = load_user(&registry, &user)?;
            let acl = ResourceAcl::from_resource_id(&registry, &resource_id)?;

            let allowed = acl.is_allowed(&user, action.as_str());
            tracing::debug!(%resource_id, %action, allowed, "Checked permission");
            println!("{}", if allowed { "allowed" } else { "denied" });
        }
    }
    Ok(())
}

fn load_user(registry: &MapperRegistry, username: &str) -> Result<User> {
    let users = registry.component_mapper(EntityKind::User)?;
    let mut entity = users.load_model(&Criteria::new().with("username", username))?;
    users.load_components(registry, &mut entity, Some(EntityKind::Role))?;
    Ok(User::try_from(entity)?)
}
