use destiny_store::run_migrations;
use serde::Serialize;

use crate::exit_codes;
use crate::output::{print_error, print_result, OutputFormat};
use crate::{OutputArgs, StoreArgs};

use super::config::{connect_store, get_database_url};

#[derive(Serialize)]
struct MigrateResult {
    success: bool,
    message: String,
}

pub async fn migrate_cmd(store: StoreArgs, output: OutputArgs) -> i32 {
    let Some(database_url) = get_database_url(&store) else {
        print_error(
            output.format,
            output.quiet,
            "missing database url (use --store or set DESTINY_DATABASE_URL / DATABASE_URL)",
        );
        return exit_codes::RUNTIME_ERROR;
    };
    let Some(pg) = connect_store(&database_url, &store, &output).await else {
        return exit_codes::RUNTIME_ERROR;
    };

    match run_migrations(pg.pool()).await {
        Ok(()) => {
            if output.format == OutputFormat::Text && !output.quiet {
                println!("ok: migrations applied");
            } else {
                let result = MigrateResult {
                    success: true,
                    message: "migrations applied".to_string(),
                };
                print_result(output.format, output.quiet, &result);
            }
            exit_codes::SUCCESS
        }
        Err(e) => {
            print_error(output.format, output.quiet, &format!("migration failed: {e}"));
            exit_codes::RUNTIME_ERROR
        }
    }
}
