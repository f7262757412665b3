//! Template-match worker process. Spawned by the pool with its
//! endpoint path and the template directory; serves one request per
//! connection until killed.

use std::env;
use std::path::PathBuf;

use staffnote::pool::service;

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let mut args = env::args().skip(1);
    let endpoint = args
        .next()
        .map(PathBuf::from)
        .ok_or("usage: match-worker <endpoint> <template-dir>")?;
    let template_dir = args
        .next()
        .map(PathBuf::from)
        .ok_or("usage: match-worker <endpoint> <template-dir>")?;

    service::serve(&endpoint, &template_dir)
        .map_err(|e| format!("worker failed on {}: {e}", endpoint.display()))
}
