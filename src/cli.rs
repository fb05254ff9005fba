use std::path::PathBuf;

use clap::Parser;

use mosaic_fetch::DEFAULT_CDN_URL;

/// Content-addressed chunk downloader for Epic build manifests.
#[derive(Debug, Clone, Parser)]
#[command(name = "mosaic", version, about, long_about = None)]
pub struct Args {
    /// Platform to download for.
    #[arg(long, default_value = "Windows")]
    pub platform: String,

    /// Specific manifest ID(s) to fetch from the manifest archive.
    #[arg(long = "manifest", value_delimiter = ',')]
    pub manifest_ids: Vec<String>,

    /// Local manifest file(s), or a directory to walk for manifests.
    #[arg(long = "manifest-file", value_delimiter = ',')]
    pub manifest_files: Vec<String>,

    /// Folder to write downloaded files to; derived from the build
    /// version when empty.
    #[arg(long = "install-dir", default_value = "")]
    pub install_dir: String,

    /// Folder of predownloaded chunk objects, consulted before the
    /// network; also the destination in chunks-only mode.
    #[arg(long = "chunk-dir")]
    pub chunk_dir: Option<PathBuf>,

    /// Only download raw chunk objects, skip file assembly.
    #[arg(long = "chunks-only")]
    pub chunks_only: bool,

    /// Only download the listed file paths.
    #[arg(long = "files", value_delimiter = ',')]
    pub files: Vec<String>,

    /// CDN origin(s); each download picks one at random.
    #[arg(long = "url", value_delimiter = ',', default_value = DEFAULT_CDN_URL)]
    pub urls: Vec<String>,

    /// Per-request HTTP timeout in seconds.
    #[arg(long = "http-timeout", default_value_t = 60)]
    pub http_timeout: u64,

    /// Skip the post-assembly file integrity check.
    #[arg(long = "skipcheck")]
    pub skip_check: bool,

    /// Amount of download workers.
    #[arg(long, default_value_t = 10)]
    pub workers: usize,

    /// Positional fallback for --manifest-file.
    #[arg(value_name = "MANIFEST_FILE")]
    pub manifest_file_arg: Option<String>,
}

impl Args {
    /// Manifest paths from the flag, falling back to the positional
    /// argument.
    pub fn manifest_paths(&self) -> Vec<String> {
        if self.manifest_files.is_empty() {
            self.manifest_file_arg.clone().into_iter().collect()
        } else {
            self.manifest_files.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn args_are_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn comma_separated_lists_split() {
        let args = Args::parse_from(["mosaic", "--files", "a,b", "--url", "http://x,http://y"]);
        assert_eq!(args.files, ["a", "b"]);
        assert_eq!(args.urls, ["http://x", "http://y"]);
    }

    #[test]
    fn defaults_match_the_documented_surface() {
        let args = Args::parse_from(["mosaic"]);
        assert_eq!(args.platform, "Windows");
        assert_eq!(args.urls, [DEFAULT_CDN_URL]);
        assert_eq!(args.http_timeout, 60);
        assert_eq!(args.workers, 10);
        assert!(!args.chunks_only);
        assert!(!args.skip_check);
    }

    #[test]
    fn positional_argument_backfills_manifest_file() {
        let args = Args::parse_from(["mosaic", "build.manifest"]);
        assert_eq!(args.manifest_paths(), ["build.manifest"]);

        let args = Args::parse_from(["mosaic", "--manifest-file", "a.manifest", "ignored"]);
        assert_eq!(args.manifest_paths(), ["a.manifest"]);
    }
}
