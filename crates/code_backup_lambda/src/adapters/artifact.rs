use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use std::time::{SystemTime, UNIX_EPOCH};

const FETCH_TIMEOUT: Duration = Duration::from_secs(60);

/// A fully fetched artifact staged on local disk, ready for a single atomic
/// put. The file only exists once every byte has been received; a fetch that
/// dies partway leaves nothing behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedArtifact {
    pub path: PathBuf,
    pub content_length: u64,
}

pub trait ArtifactFetcher {
    fn fetch_to_disk(&self, url: &str) -> Result<StagedArtifact, String>;
}

pub struct HttpArtifactFetcher {
    http_client: reqwest::Client,
}

impl Default for HttpArtifactFetcher {
    fn default() -> Self {
        Self {
            http_client: reqwest::Client::new(),
        }
    }
}

impl ArtifactFetcher for HttpArtifactFetcher {
    fn fetch_to_disk(&self, url: &str) -> Result<StagedArtifact, String> {
        let client = self.http_client.clone();
        let fetch_url = url.to_string();
        let staging_path = staging_file_path()?;
        let download_path = staging_path.clone();

        let download = tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let mut response = client
                    .get(&fetch_url)
                    .timeout(FETCH_TIMEOUT)
                    .send()
                    .await
                    .map_err(|error| format!("artifact fetch request failed: {error}"))?;

                if !response.status().is_success() {
                    return Err(format!(
                        "artifact fetch returned status {}",
                        response.status()
                    ));
                }

                let mut file = fs::File::create(&download_path).map_err(|error| {
                    format!(
                        "failed to create staging file {}: {error}",
                        download_path.display()
                    )
                })?;

                let mut bytes_written = 0u64;
                while let Some(chunk) = response
                    .chunk()
                    .await
                    .map_err(|error| format!("artifact fetch interrupted: {error}"))?
                {
                    file.write_all(&chunk)
                        .map_err(|error| format!("failed to write staging file: {error}"))?;
                    bytes_written += chunk.len() as u64;
                }

                file.flush()
                    .map_err(|error| format!("failed to flush staging file: {error}"))?;
                Ok(bytes_written)
            })
        });

        match download {
            Ok(content_length) => Ok(StagedArtifact {
                path: staging_path,
                content_length,
            }),
            Err(error) => {
                let _ = fs::remove_file(&staging_path);
                Err(error)
            }
        }
    }
}

fn staging_file_path() -> Result<PathBuf, String> {
    let mut path = std::env::temp_dir();
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|error| format!("failed to read clock for staging file name: {error}"))?
        .as_nanos();
    path.push(format!("code-backup-artifact-{timestamp}.zip"));
    Ok(path)
}
