use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use engine_logging::{engine_info, engine_warn};
use linkbinder_core::{
    normalize_collection_key, ArticleRef, Collection, CollectionStore, ExportProgress,
    ExportSettings,
};
use linkbinder_engine::{ExportController, ProgressSink};
use tempfile::NamedTempFile;

use crate::cli::{Cli, CollectionCommand, Command, ExportArgs};
use crate::file_store::FileStore;

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let store = FileStore::new(&cli.collections_file);
    match cli.command {
        Command::Export(args) => export(args, &store).await,
        Command::Collection { command } => collection(command, store),
    }
}

/// Forwards engine progress into the log stream.
struct LogProgressSink;

impl ProgressSink for LogProgressSink {
    fn emit(&self, progress: ExportProgress) {
        if let Some(message) = progress.message {
            engine_info!("[{}/{}] {}", progress.current, progress.total, message);
        }
    }
}

async fn export(args: ExportArgs, store: &FileStore) -> anyhow::Result<()> {
    let (urls, default_title) = match &args.collection {
        Some(page_url) => {
            let key = normalize_collection_key(page_url)
                .with_context(|| format!("not an absolute page URL: {page_url}"))?;
            let collection = store
                .get(&key)
                .context("failed to read the collections file")?
                .with_context(|| format!("no collection saved for {key}"))?;
            engine_info!(
                "exporting collection {:?} ({} articles)",
                collection.name,
                collection.articles.len()
            );
            let name = collection.name.clone();
            (collection.urls(), Some(name))
        }
        None => (args.urls.clone(), None),
    };
    if urls.is_empty() {
        bail!("nothing to export: pass article URLs or --collection");
    }

    let settings = ExportSettings {
        format: args.format.into(),
        title: args.title.clone().or(default_title).unwrap_or_default(),
        include_offline_images: args.offline_images,
        include_hyperlinks: args.keep_hyperlinks,
        timeout_ms: args.timeout_ms,
        max_concurrency: args.max_concurrency,
    };

    let controller = Arc::new(ExportController::new(settings, Arc::new(LogProgressSink)));

    // Ctrl-C requests a cooperative abort; the in-flight article finishes
    // and the export returns a failure result.
    let signal_task = {
        let controller = controller.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                engine_warn!("abort requested, finishing the current article");
                controller.abort().await;
            }
        })
    };

    let result = controller.export(&urls).await;
    signal_task.abort();

    if !result.success {
        bail!(result.error.unwrap_or_else(|| "export failed".to_string()));
    }
    let data = result
        .data
        .context("export reported success without output data")?;
    write_atomic(&args.output, &data)
        .with_context(|| format!("failed to write {:?}", args.output))?;

    println!(
        "Wrote {:?}: {} of {} articles, {} bytes",
        args.output,
        result.processed_urls,
        result.total_urls,
        data.len()
    );
    Ok(())
}

fn collection(command: CollectionCommand, mut store: FileStore) -> anyhow::Result<()> {
    match command {
        CollectionCommand::Add { page_url, urls, name } => {
            let key = normalize_collection_key(&page_url)
                .with_context(|| format!("not an absolute page URL: {page_url}"))?;
            let mut collection = store
                .get(&key)
                .context("failed to read the collections file")?
                .unwrap_or_else(|| Collection::new(name.clone().unwrap_or_else(|| key.clone())));
            let mut added = 0usize;
            for url in urls {
                if collection.articles.iter().any(|article| article.url == url) {
                    continue;
                }
                collection.articles.push(ArticleRef {
                    title: url.clone(),
                    url,
                });
                added += 1;
            }
            store.set(&key, collection)?;
            println!("Added {added} article(s) to {key}");
        }
        CollectionCommand::List => {
            for key in store.keys()? {
                println!("{key}");
            }
        }
        CollectionCommand::Show { page_url } => {
            let key = normalize_collection_key(&page_url)
                .with_context(|| format!("not an absolute page URL: {page_url}"))?;
            let collection = store
                .get(&key)?
                .with_context(|| format!("no collection saved for {key}"))?;
            println!("{} ({})", collection.name, key);
            for article in &collection.articles {
                println!("  {}", article.url);
            }
        }
        CollectionCommand::Remove { page_url } => {
            let key = normalize_collection_key(&page_url)
                .with_context(|| format!("not an absolute page URL: {page_url}"))?;
            store.remove(&key)?;
            println!("Removed {key}");
        }
    }
    Ok(())
}

/// Write the output file through a temp file so an interrupted run never
/// leaves a truncated book behind.
fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|err| err.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_write_replaces_existing_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.epub");
        std::fs::write(&path, b"old").unwrap();

        write_atomic(&path, b"new bytes").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"new bytes");
    }
}
