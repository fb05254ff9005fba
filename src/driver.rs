//! Top-level orchestration: manifest loading, ingestion, the sequential
//! per-file assembly loop, and the post-assembly integrity pass.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use tracing::{error, info};
use walkdir::WalkDir;

use mosaic_assemble::{mirror_chunks, verify_files, Assembled, Pipeline, PipelineOptions};
use mosaic_chunk::ChunkCache;
use mosaic_fetch::{
    CdnPool, HttpClient, LauncherClient, ReqwestClient, MANIFEST_ARCHIVE_URL,
};
use mosaic_manifest::{Catalog, Chunk, Manifest, ManifestFile};

use crate::cli::Args;

// Catalog coordinates of the live build.
const CATALOG_NAMESPACE: &str = "fn";
const CATALOG_ITEM: &str = "4fe75bbc5a674f4f9b356b5c90567da5";
const CATALOG_APP: &str = "Fortnite";
const CATALOG_LABEL: &str = "Live";

struct Ingest {
    /// Destination path -> manifest file, in deterministic path order.
    files: BTreeMap<PathBuf, ManifestFile>,
    /// Every chunk referenced by at least one selected file.
    chunks: HashMap<String, Chunk>,
}

/// Initialization errors abort with a diagnostic; per-file download
/// failures are logged and the run still exits zero.
pub async fn run(args: Args) -> anyhow::Result<()> {
    let timeout = Duration::from_secs(args.http_timeout);
    let client =
        Arc::new(ReqwestClient::new(timeout).context("failed to build HTTP client")?);
    let pool = Arc::new(CdnPool::new(args.urls.clone()));

    let manifests = load_manifests(&args, client.as_ref(), timeout).await?;

    let cache = Arc::new(ChunkCache::new());
    let ingest = ingest(&args, &manifests, &cache)?;

    let interrupt = Arc::new(AtomicBool::new(false));
    {
        let interrupt = Arc::clone(&interrupt);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutting down...");
                interrupt.store(true, Ordering::Relaxed);
            }
        });
    }

    let options = PipelineOptions {
        worker_count: args.workers,
        chunk_dir: args.chunk_dir.clone(),
        ..PipelineOptions::default()
    };

    if args.chunks_only {
        let dir = args.chunk_dir.clone().unwrap_or_else(|| PathBuf::from("."));
        let chunks: Vec<Chunk> = ingest.chunks.values().cloned().collect();
        info!(count = chunks.len(), "downloading chunks...");
        let report = mirror_chunks(
            Arc::clone(&client),
            Arc::clone(&pool),
            chunks,
            &dir,
            Arc::clone(&interrupt),
            &options,
        )
        .await?;
        info!(
            downloaded = report.downloaded,
            skipped = report.skipped,
            failed = report.failed,
            "done"
        );
        return Ok(());
    }

    info!(
        files = ingest.files.len(),
        chunks = ingest.chunks.len(),
        manifests = manifests.len(),
        "downloading files"
    );

    let pipeline = Pipeline::new(client, pool, cache, Arc::clone(&interrupt), options);

    let mut prechecked: HashSet<PathBuf> = HashSet::new();
    for (dest, file) in &ingest.files {
        if interrupt.load(Ordering::Relaxed) {
            break;
        }
        match pipeline.assemble_file(file, &ingest.chunks, dest).await {
            Ok(Assembled::AlreadyPresent) => {
                info!(path = %dest.display(), "file found on disk");
                prechecked.insert(dest.clone());
            }
            Ok(Assembled::Written) => {}
            Err(e) => error!(path = %dest.display(), error = %e, "failed to assemble file"),
        }
    }

    if !args.skip_check && !interrupt.load(Ordering::Relaxed) {
        info!("verifying file integrity...");
        let files: Vec<(PathBuf, ManifestFile)> = ingest
            .files
            .iter()
            .map(|(path, file)| (path.clone(), file.clone()))
            .collect();
        let corrupt = verify_files(&files, &prechecked).await;
        if corrupt > 0 {
            error!(count = corrupt, "corrupt files detected");
        }
    }

    info!("done");
    Ok(())
}

async fn load_manifests<C: HttpClient>(
    args: &Args,
    client: &C,
    timeout: Duration,
) -> anyhow::Result<Vec<Manifest>> {
    let ids: Vec<&String> = args.manifest_ids.iter().filter(|s| !s.is_empty()).collect();
    let paths: Vec<String> = args
        .manifest_paths()
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect();

    let mut manifests = Vec::new();

    if !ids.is_empty() {
        for id in ids {
            info!(%id, "fetching manifest...");
            let url = format!("{MANIFEST_ARCHIVE_URL}/{id}.manifest");
            let bytes = client
                .get(&url)
                .await
                .with_context(|| format!("failed to fetch manifest {id}"))?;
            manifests.push(
                Manifest::parse(&bytes)
                    .with_context(|| format!("failed to parse manifest {id}"))?,
            );
        }
    } else if !paths.is_empty() {
        for path in &paths {
            let path = Path::new(path);
            if path.is_dir() {
                let mut loaded = 0usize;
                for entry in WalkDir::new(path) {
                    let entry = entry.context("failed to walk manifest folder")?;
                    if !entry.file_type().is_file() {
                        continue;
                    }
                    if entry.metadata().map(|m| m.len()).unwrap_or(0) == 0 {
                        continue;
                    }
                    manifests.push(read_manifest_file(entry.path())?);
                    loaded += 1;
                }
                info!(count = loaded, path = %path.display(), "loaded manifests from folder");
            } else {
                let manifest = read_manifest_file(path)?;
                info!(
                    app = %manifest.app_name,
                    version = %manifest.build_version,
                    "manifest loaded"
                );
                manifests.push(manifest);
            }
        }
    } else {
        info!("fetching latest catalog...");
        let launcher = LauncherClient::new(timeout).context("failed to build launcher client")?;
        let bytes = launcher
            .fetch_catalog(
                &args.platform,
                CATALOG_NAMESPACE,
                CATALOG_ITEM,
                CATALOG_APP,
                CATALOG_LABEL,
            )
            .await
            .context("failed to fetch catalog")?;
        let catalog = Catalog::parse(&bytes).context("failed to parse catalog")?;
        if catalog.elements.len() != 1 || catalog.elements[0].manifests.is_empty() {
            bail!("unsupported catalog");
        }
        let element = &catalog.elements[0];
        info!(
            app = %element.app_name,
            label = %element.label_name,
            version = %element.build_version,
            "catalog loaded"
        );

        let url = catalog
            .manifest_url()
            .context("catalog has no usable manifest url")?;
        info!("fetching latest manifest...");
        let bytes = client.get(&url).await.context("failed to fetch manifest")?;
        manifests.push(Manifest::parse(&bytes).context("failed to parse manifest")?);
    }

    if manifests.is_empty() {
        bail!("no manifests loaded");
    }
    Ok(manifests)
}

fn read_manifest_file(path: &Path) -> anyhow::Result<Manifest> {
    let data = std::fs::read(path)
        .with_context(|| format!("failed to read manifest {}", path.display()))?;
    Manifest::parse(&data).with_context(|| format!("failed to parse manifest {}", path.display()))
}

/// Merge the selected files of every manifest, register chunk refcounts,
/// and collect the referenced chunk descriptors. Duplicate destination
/// paths across manifests are skipped before any registration so the
/// cache refcounts stay balanced.
fn ingest(args: &Args, manifests: &[Manifest], cache: &ChunkCache) -> anyhow::Result<Ingest> {
    let filter: HashSet<&str> = args
        .files
        .iter()
        .filter(|f| !f.is_empty())
        .map(String::as_str)
        .collect();

    let mut files = BTreeMap::new();
    let mut chunks: HashMap<String, Chunk> = HashMap::new();

    for manifest in manifests {
        let root = Path::new(&args.install_dir).join(manifest.install_root(&args.platform));
        for file in &manifest.files {
            if !filter.is_empty() && !filter.contains(file.name.as_str()) {
                continue;
            }
            let dest = root.join(&file.name);
            if files.contains_key(&dest) {
                continue;
            }
            for part in &file.parts {
                cache.register(&part.guid);
                if !chunks.contains_key(&part.guid) {
                    let chunk = manifest.chunks.get(&part.guid).with_context(|| {
                        format!("manifest references unknown chunk {}", part.guid)
                    })?;
                    chunks.insert(part.guid.clone(), chunk.clone());
                }
            }
            files.insert(dest, file.clone());
        }
    }

    Ok(Ingest { files, chunks })
}
