//! Batch entry point: annotate every page image in the input
//! directory. Pages that fail are logged and skipped; the run always
//! continues to the next page.

use std::env;
use std::path::Path;
use std::time::Instant;

use log::{error, info};

use staffnote::place::GlyphCache;
use staffnote::{annotate_page, load_config, WorkerPool};

const PAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let config_path = env::args().nth(1).unwrap_or_else(|| "staffnote.json".to_string());
    let config = load_config(Path::new(&config_path))?;

    let worker_exe = WorkerPool::default_worker_exe()
        .map_err(|e| format!("Failed to locate match-worker binary: {e}"))?;
    let pool = WorkerPool::spawn(&worker_exe, config.worker_num, &config.template_dir)
        .map_err(|e| format!("Failed to spawn worker pool: {e}"))?;
    let mut glyphs = GlyphCache::new(config.label_dir.clone());

    std::fs::create_dir_all(&config.output_dir)
        .map_err(|e| format!("Failed to create {}: {e}", config.output_dir.display()))?;

    let mut file_names: Vec<String> = std::fs::read_dir(&config.input_dir)
        .map_err(|e| format!("Failed to read {}: {e}", config.input_dir.display()))?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| {
            Path::new(name)
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| PAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        })
        .collect();
    file_names.sort();

    for file_name in &file_names {
        if !config.file_allowed(file_name) {
            info!("{file_name} not in files field, skip");
            continue;
        }

        let start = Instant::now();
        info!("handling file: {file_name}");
        let input_path = config.input_dir.join(file_name);
        let output_path = config.output_dir.join(file_name);

        let outcome = annotate_page(&input_path, &config, &pool, &mut glyphs)
            .and_then(|annotated| annotated.save(&output_path).map_err(Into::into));
        match outcome {
            Ok(()) => info!(
                "file finish: {file_name}, cost: {}ms",
                start.elapsed().as_millis()
            ),
            Err(err) => error!("error on file: {file_name}, error: {err}"),
        }
    }

    info!("done");
    Ok(())
}
