use std::{fs, num::NonZeroUsize, path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use client_core::{export_file_name, EntityTable, RestStore};
use listing::{ListConfig, SortDirection, DEFAULT_PAGE_SIZE};
use shared::{
    domain::{EntityKind, RecordId},
    entity::persons_with_reg_no,
    store::RecordStore,
};
use storage::Storage;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod render;

use render::{parse_record, parse_seed_file, render_page};

#[derive(Parser, Debug)]
#[command(name = "records", about = "Browse, edit and export institute records")]
struct Cli {
    #[arg(long, env = "RECORDS_DATABASE_URL", default_value = "sqlite://./data/records.db")]
    database_url: String,
    /// Talk to a running mock REST server instead of the local database.
    #[arg(long, env = "RECORDS_SERVER_URL")]
    server_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug)]
struct Query {
    #[arg(long)]
    search: Option<String>,
    /// Sort field; repeating a field toggles its direction.
    #[arg(long = "sort")]
    sort: Vec<String>,
    #[arg(long)]
    desc: bool,
    #[arg(long, value_enum)]
    role: Option<Role>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Role {
    Students,
    Tutors,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load default records, or a json-server style database file, into the local store.
    Seed {
        #[arg(long)]
        from: Option<PathBuf>,
    },
    List {
        entity: EntityKind,
        #[command(flatten)]
        query: Query,
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        page_size: NonZeroUsize,
    },
    Show {
        entity: EntityKind,
        id: i64,
    },
    /// Look a student or tutor up by registration number.
    Person {
        reg_no: String,
    },
    Export {
        entity: EntityKind,
        #[command(flatten)]
        query: Query,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    Create {
        entity: EntityKind,
        json: String,
    },
    Update {
        entity: EntityKind,
        id: i64,
        json: String,
    },
    Delete {
        entity: EntityKind,
        id: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Seed { from } => seed(&cli.database_url, cli.server_url.is_some(), from).await?,
        Command::List {
            entity,
            query,
            page,
            page_size,
        } => {
            let store = open_store(&cli.database_url, cli.server_url.as_deref()).await?;
            let config = ListConfig::new(entity.searchable_fields().iter().copied())
                .with_page_size(page_size);
            let mut table = EntityTable::with_config(store, entity, config);
            load(&mut table, &query).await?;
            apply_query(&mut table, &query);
            table.controller_mut().go_to_page(page);
            if table.controller().page_index() != page {
                let shown = table.controller().page_index();
                info!(page, shown, "requested page out of range");
            }
            println!("{}", render_page(table.controller(), entity));
        }
        Command::Show { entity, id } => {
            let store = open_store(&cli.database_url, cli.server_url.as_deref()).await?;
            let record = store.get_by_id(entity, RecordId(id)).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Command::Person { reg_no } => {
            let store = open_store(&cli.database_url, cli.server_url.as_deref()).await?;
            let persons = persons_with_reg_no(store.list(EntityKind::Person).await?, &reg_no);
            if persons.is_empty() {
                bail!("no person with registration number {reg_no}");
            }
            println!("{}", serde_json::to_string_pretty(&persons)?);
        }
        Command::Export { entity, query, out } => {
            let store = open_store(&cli.database_url, cli.server_url.as_deref()).await?;
            let mut table = EntityTable::new(store, entity);
            load(&mut table, &query).await?;
            apply_query(&mut table, &query);

            let path = out.unwrap_or_else(|| {
                PathBuf::from(export_file_name(entity, chrono::Local::now().date_naive()))
            });
            fs::write(&path, table.export_csv())
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!(
                "exported {} {entity} to {}",
                table.controller().filtered_count(),
                path.display()
            );
        }
        Command::Create { entity, json } => {
            let store = open_store(&cli.database_url, cli.server_url.as_deref()).await?;
            let record = store.create(entity, parse_record(&json)?).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Command::Update { entity, id, json } => {
            let store = open_store(&cli.database_url, cli.server_url.as_deref()).await?;
            let record = store
                .update(entity, RecordId(id), parse_record(&json)?)
                .await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Command::Delete { entity, id } => {
            let store = open_store(&cli.database_url, cli.server_url.as_deref()).await?;
            store.delete(entity, RecordId(id)).await?;
            println!("deleted {} {id}", entity.singular());
        }
    }

    Ok(())
}

async fn open_store(
    database_url: &str,
    server_url: Option<&str>,
) -> Result<Arc<dyn RecordStore>> {
    if let Some(server_url) = server_url {
        return Ok(Arc::new(RestStore::new(server_url)?));
    }
    Ok(Arc::new(open_storage(database_url).await?))
}

async fn open_storage(database_url: &str) -> Result<Storage> {
    Storage::new(database_url)
        .await
        .with_context(|| format!("failed to open {database_url}"))
}

async fn seed(database_url: &str, remote: bool, from: Option<PathBuf>) -> Result<()> {
    if remote {
        bail!("seed writes to the local database; drop --server-url");
    }
    let storage = open_storage(database_url).await?;

    let Some(path) = from else {
        if storage.seed_defaults().await? {
            println!("seeded default records into {database_url}");
        } else {
            println!("store already holds records; nothing seeded");
        }
        return Ok(());
    };

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    for (entity, records) in parse_seed_file(&raw)? {
        let imported = storage.import_collection(entity, records).await?;
        println!("imported {imported} {entity}");
    }
    Ok(())
}

async fn load(table: &mut EntityTable<Arc<dyn RecordStore>>, query: &Query) -> Result<()> {
    match query.role {
        None => table.load().await?,
        Some(_) if table.entity() != EntityKind::Person => {
            bail!("--role only applies to persons")
        }
        Some(Role::Students) => table.load_students().await?,
        Some(Role::Tutors) => table.load_tutors().await?,
    }
    Ok(())
}

fn apply_query(table: &mut EntityTable<Arc<dyn RecordStore>>, query: &Query) {
    let controller = table.controller_mut();
    if let Some(search) = &query.search {
        controller.set_search_text(search.as_str());
    }
    for field in &query.sort {
        controller.set_sort(field);
    }
    if query.desc {
        if let Some(sort) = controller.sort() {
            if sort.direction == SortDirection::Asc {
                let field = sort.field.clone();
                controller.set_sort(&field);
            }
        }
    }
}
