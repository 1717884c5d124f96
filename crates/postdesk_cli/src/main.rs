//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `postdesk_core` linkage, configuration and store bootstrap.
//! - Print deterministic `key=value` lines for quick local sanity checks.

use log::{error, info};
use postdesk_core::{CoreConfig, CustomerService, PostService};
use std::process::ExitCode;

fn main() -> ExitCode {
    let config = CoreConfig::from_env();
    if let Err(err) = config.init_logging() {
        eprintln!("postdesk logging disabled: {err}");
    }

    println!("postdesk_core ping={}", postdesk_core::ping());
    println!("postdesk_core version={}", postdesk_core::core_version());

    let conn = match config.open_store() {
        Ok(conn) => conn,
        Err(err) => {
            error!("event=cli_probe module=cli status=error error={err}");
            eprintln!("failed to open store: {err}");
            return ExitCode::FAILURE;
        }
    };

    let customers = CustomerService::new(&conn).list_customers();
    let posts = PostService::new(&conn).list_posts();
    match (customers, posts) {
        (Ok(customers), Ok(posts)) => {
            println!(
                "postdesk store={}",
                config
                    .db_path
                    .as_deref()
                    .map_or_else(|| "memory".to_string(), |path| path.display().to_string())
            );
            println!("postdesk customers={}", customers.len());
            println!("postdesk posts={}", posts.len());
            info!(
                "event=cli_probe module=cli status=ok customers={} posts={}",
                customers.len(),
                posts.len()
            );
            ExitCode::SUCCESS
        }
        (Err(err), _) | (_, Err(err)) => {
            error!(
                "event=cli_probe module=cli status=error error_kind={} error={}",
                err.kind(),
                err
            );
            eprintln!("failed to read store: {err}");
            ExitCode::FAILURE
        }
    }
}
