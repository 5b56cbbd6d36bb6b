//! Demonstration program: connect, optionally run one query, disconnect.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use pgsqldb::{ConnectOptions, DbQuery, PgSql, PgSqlDb};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "pgsql-demo",
    version,
    about = "Connect to PostgreSQL, run an optional query, and disconnect"
)]
struct Cli {
    #[arg(long, help = "TOML file with a [database] table")]
    config: Option<PathBuf>,

    #[arg(long, env = "PGHOST", help = "Server host, optionally host:port")]
    host: Option<String>,

    #[arg(long, env = "PGPORT")]
    port: Option<u16>,

    #[arg(long, env = "PGDATABASE")]
    database: Option<String>,

    #[arg(long, env = "PGUSER")]
    user: Option<String>,

    #[arg(long, env = "PGPASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[arg(long, help = "Query to execute, with $1, $2, ... placeholders")]
    query: Option<String>,

    #[arg(
        long = "param",
        value_name = "VALUE",
        help = "Text value bound to the next placeholder (repeatable)"
    )]
    params: Vec<String>,
}

impl Cli {
    fn connect_options(&self) -> Result<ConnectOptions> {
        let mut options = match &self.config {
            Some(path) => ConnectOptions::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => ConnectOptions::default(),
        };
        if let Some(host) = &self.host {
            options.host = host.clone();
        }
        if let Some(port) = self.port {
            options.port = port;
        }
        if let Some(database) = &self.database {
            options.database = database.clone();
        }
        if let Some(user) = &self.user {
            options.user = user.clone();
        }
        if let Some(password) = &self.password {
            options.password = password.clone();
        }
        options.keep_password = false;
        Ok(options)
    }
}

fn install_tracing_subscriber() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

fn run_query(db: &PgSqlDb, sql: &str, params: &[String]) -> Result<()> {
    let mut query = db.new_query("demo", sql)?;
    if params.len() != query.param_count() {
        anyhow::bail!(
            "query expects {} parameter(s), {} given",
            query.param_count(),
            params.len()
        );
    }
    for (attr, value) in params.iter().enumerate() {
        query.set_cstring(attr, value.as_bytes())?;
    }

    query.execute().context("executing query")?;
    while query.fetch()? {
        let mut cells = Vec::with_capacity(query.column_count());
        for attr in 0..query.column_count() {
            cells.push(query.out(attr)?.value().to_string());
        }
        println!("{}", cells.join("\t"));
    }
    println!("({} row(s))", query.num_rows());
    Ok(())
}

fn main() -> Result<()> {
    install_tracing_subscriber();
    let cli = Cli::parse();
    let options = cli.connect_options()?;

    let lib = PgSql::init();
    {
        let mut db = PgSqlDb::new(&lib)?;
        db.connect_with(&options)
            .with_context(|| format!("connecting to {}:{}", options.host, options.port))?;
        db.ping_connection()?;

        if let Some(sql) = &cli.query {
            run_query(&db, sql, &cli.params)?;
        }
        db.disconnect();
    }
    lib.quit()?;
    Ok(())
}
