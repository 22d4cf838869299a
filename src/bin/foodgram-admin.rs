use std::path::PathBuf;

use clap::{Parser, Subcommand};
use csv::{ReaderBuilder, Trim};
use foodgram::{
    actions::{ingredients::import_ingredients, tags::create_tag, users::register_user},
    config::Config,
    error::ApiError,
    form::Form,
    payload::UserRegistration,
};
use log::{error, info};
use serde_json::json;
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};

#[derive(Parser)]
#[command(name = "foodgram-admin", about = "Maintenance commands for the Foodgram database")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import ingredients from a `name,unit` CSV file.
    LoadIngredients {
        #[arg(default_value = "data/ingredients.csv")]
        file: PathBuf,
    },
    /// Create a staff account with every permission.
    CreateSuperuser {
        #[arg(long)]
        email: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        password: String,
    },
    /// Add a recipe tag.
    CreateTag {
        #[arg(long)]
        name: String,
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        slug: Option<String>,
    },
    /// Apply pending migrations.
    Migrate,
}

/// `name,unit` records, no header row.
fn parse_ingredients(content: &[u8]) -> Result<Vec<(String, String)>, String> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(content);

    let mut rows = vec![];
    for (index, record) in reader.records().enumerate() {
        let record = record.map_err(|e| format!("Row {}: CSV parse error: {e}", index + 1))?;
        match (record.get(0), record.get(1), record.len()) {
            (Some(name), Some(unit), 2) => rows.push((name.to_string(), unit.to_string())),
            _ => return Err(format!("Row {}: expected `name,unit`", index + 1)),
        }
    }

    Ok(rows)
}

async fn load_ingredients(file: PathBuf, pool: &Pool<Postgres>) -> Result<(), String> {
    let content = tokio::fs::read(&file)
        .await
        .map_err(|e| format!("Could not read {}: {e}", file.display()))?;
    let rows = parse_ingredients(&content)?;

    let inserted = import_ingredients(&rows, pool)
        .await
        .map_err(|e| e.to_string())?;
    info!("Imported {inserted} of {} ingredients", rows.len());
    Ok(())
}

async fn create_superuser(data: serde_json::Value, pool: &Pool<Postgres>) -> Result<(), String> {
    let form = match data {
        serde_json::Value::Object(data) => Form::from_data(data),
        _ => return Err("Invalid superuser data".to_string()),
    };
    let describe = |e: ApiError| match e {
        ApiError::Validation(errors) => format!("Invalid superuser data {errors}"),
        other => other.to_string(),
    };

    let registration = UserRegistration::from_form(&form).map_err(describe)?;
    let user = register_user(&registration, true, pool).await.map_err(describe)?;
    info!("Superuser {} created", user.email);
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let result = run(cli).await;

    if let Err(e) = result {
        error!("{e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    let config = Config::load().map_err(|e| e.to_string())?;
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await
        .map_err(|e| format!("Could not connect to the database: {e}"))?;

    match cli.command {
        Command::LoadIngredients { file } => load_ingredients(file, &pool).await,
        Command::CreateSuperuser {
            email,
            username,
            first_name,
            last_name,
            password,
        } => {
            let data = json!({
                "email": email,
                "username": username,
                "first_name": first_name,
                "last_name": last_name,
                "password": password,
            });
            create_superuser(data, &pool).await
        }
        Command::CreateTag { name, color, slug } => {
            let tag = create_tag(name.trim(), color.as_deref(), slug.as_deref(), &pool)
                .await
                .map_err(|e| e.to_string())?;
            info!("Tag {} created with id {}", tag.name, tag.id);
            Ok(())
        }
        Command::Migrate => {
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .map_err(|e| format!("Could not apply migrations: {e}"))?;
            info!("Migrations applied");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_plain_and_quoted_records() {
        let rows =
            parse_ingredients(b"salt, g\n\"beans, canned\",g\r\n\"say \"\"cheese\"\"\",pcs\n").unwrap();
        assert_eq!(
            rows,
            vec![
                ("salt".to_string(), "g".to_string()),
                ("beans, canned".to_string(), "g".to_string()),
                ("say \"cheese\"".to_string(), "pcs".to_string()),
            ]
        );
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(parse_ingredients(b"salt\n").is_err());
        assert!(parse_ingredients(b"a,b,c\n").is_err());
    }
}
