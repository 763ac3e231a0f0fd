//! `nbops` binary entrypoint.

use std::process;

#[tokio::main]
async fn main() {
    let code = nbops_cli::run().await;
    process::exit(code);
}
