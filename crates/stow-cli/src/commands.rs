//! Subcommands and their execution against a [`BlobContainer`].

use std::path::PathBuf;

use anyhow::Context;
use clap::Subcommand;
use stow_container::{BlobContainer, ContainerConfig, DownloadOutcome};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::TRACING_TARGET_COMMAND;

/// Operation to run against the configured container.
///
/// Blob name arguments accept either a container-relative name or the
/// blob's full URL.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Create the container if needed and enable blob-level public access
    Init,

    /// Upload a local file
    Upload {
        /// File to upload
        file: PathBuf,

        /// Blob name (defaults to the file name)
        #[arg(long)]
        name: Option<String>,
    },

    /// Upload text as a blob
    PutText {
        /// Blob name
        name: String,

        /// Text content
        text: String,
    },

    /// Download a blob into a local folder
    Download {
        /// Blob name
        name: String,

        /// Destination folder; one sub-directory per name segment
        folder: PathBuf,
    },

    /// Write a blob's content to stdout
    Cat {
        /// Blob name
        name: String,
    },

    /// Rename a blob (copy, then delete the source)
    Rename {
        /// Current blob name
        from: String,

        /// New blob name
        to: String,
    },

    /// Delete a blob if it exists
    Delete {
        /// Blob name
        name: String,
    },

    /// List blob names, optionally restricted to a prefix
    List {
        /// Name prefix such as `photos/2024/`
        #[arg(default_value = "")]
        prefix: String,

        /// Print entries with size and metadata as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the full URL of a blob
    Url {
        /// Blob name
        name: String,
    },

    /// Print the storage connection string
    ConnectionString,
}

impl Command {
    /// Subcommand name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Upload { .. } => "upload",
            Self::PutText { .. } => "put-text",
            Self::Download { .. } => "download",
            Self::Cat { .. } => "cat",
            Self::Rename { .. } => "rename",
            Self::Delete { .. } => "delete",
            Self::List { .. } => "list",
            Self::Url { .. } => "url",
            Self::ConnectionString => "connection-string",
        }
    }

    /// Run the command, writing its output to `out`.
    pub async fn execute<W>(
        self,
        config: &ContainerConfig,
        container: &BlobContainer,
        out: &mut W,
    ) -> anyhow::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        tracing::debug!(
            target: TRACING_TARGET_COMMAND,
            command = self.name(),
            container = container.container_name(),
            "Running command"
        );

        match self {
            Self::Init => {
                let outcome = container
                    .ensure_accessible()
                    .await
                    .context("failed to prepare the container")?;
                write_line(out, outcome).await?;
            }
            Self::Upload { file, name } => {
                let uploaded = match name {
                    Some(name) => {
                        let name = resolve_name(&name, container)?;
                        container.upload_file_as(&file, &name).await
                    }
                    None => container.upload_file(&file).await,
                }
                .with_context(|| format!("failed to upload '{}'", file.display()))?;
                write_line(out, uploaded).await?;
            }
            Self::PutText { name, text } => {
                let name = resolve_name(&name, container)?;
                let uploaded = container
                    .upload_text(&text, &name)
                    .await
                    .with_context(|| format!("failed to upload text to '{name}'"))?;
                write_line(out, uploaded).await?;
            }
            Self::Download { name, folder } => {
                let name = resolve_name(&name, container)?;
                let outcome = container
                    .download_to_file(&name, &folder)
                    .await
                    .with_context(|| format!("failed to download '{name}'"))?;
                if outcome == DownloadOutcome::NotFound {
                    anyhow::bail!("blob '{name}' does not exist");
                }
                write_line(out, outcome).await?;
            }
            Self::Cat { name } => {
                let name = resolve_name(&name, container)?;
                container
                    .download_to_stream(&name, out)
                    .await
                    .with_context(|| format!("failed to read '{name}'"))?;
            }
            Self::Rename { from, to } => {
                let from = resolve_name(&from, container)?;
                let to = resolve_name(&to, container)?;
                let outcome = container
                    .rename_blob(&from, &to)
                    .await
                    .with_context(|| format!("failed to rename '{from}' to '{to}'"))?;
                write_line(out, outcome).await?;
            }
            Self::Delete { name } => {
                let name = resolve_name(&name, container)?;
                let outcome = container
                    .delete_blob(&name)
                    .await
                    .with_context(|| format!("failed to delete '{name}'"))?;
                write_line(out, outcome).await?;
            }
            Self::List { prefix, json } => {
                if json {
                    let entries = container
                        .list_entries(&prefix)
                        .await
                        .context("failed to list blobs")?;
                    let rendered = serde_json::to_string_pretty(&entries)?;
                    write_line(out, rendered).await?;
                } else {
                    let names = container
                        .list_by_prefix(&prefix)
                        .await
                        .context("failed to list blobs")?;
                    for name in names {
                        write_line(out, name).await?;
                    }
                }
            }
            Self::Url { name } => {
                let name = resolve_name(&name, container)?;
                write_line(out, container.blob_url(&name)?).await?;
            }
            Self::ConnectionString => {
                write_line(out, config.connection_string()).await?;
            }
        }

        out.flush().await?;
        Ok(())
    }
}

/// Accept a blob name or a full blob URL in this container.
fn resolve_name(raw: &str, container: &BlobContainer) -> anyhow::Result<String> {
    if !raw.contains("://") {
        return Ok(raw.to_owned());
    }

    let name = container
        .logical_name(raw)
        .with_context(|| format!("cannot resolve blob URL '{raw}'"))?;
    Ok(name.into())
}

async fn write_line<W>(out: &mut W, line: impl std::fmt::Display) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    out.write_all(format!("{line}\n").as_bytes()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "c3RvdyBzaGFyZWQga2V5IHRlc3QgdmVjdG9yIDAwMDE=";

    fn fixture() -> (ContainerConfig, BlobContainer) {
        let config = ContainerConfig::new("myaccount", KEY, "photos");
        (config, BlobContainer::in_memory("photos"))
    }

    async fn run(
        command: Command,
        config: &ContainerConfig,
        container: &BlobContainer,
    ) -> anyhow::Result<String> {
        let mut out = Vec::new();
        command.execute(config, container, &mut out).await?;
        Ok(String::from_utf8(out)?)
    }

    #[tokio::test]
    async fn put_text_then_cat() {
        let (config, container) = fixture();
        let put = Command::PutText {
            name: "notes/hello.txt".to_owned(),
            text: "hello".to_owned(),
        };
        let output = run(put, &config, &container).await.unwrap();
        assert_eq!(output, "Uploaded notes/hello.txt (5 bytes).\n");

        let cat = Command::Cat {
            name: "notes/hello.txt".to_owned(),
        };
        assert_eq!(run(cat, &config, &container).await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn cat_accepts_blob_url() {
        let (config, container) = fixture();
        container.upload_text("by url", "a/b.txt").await.unwrap();

        let cat = Command::Cat {
            name: "https://myaccount.blob.core.windows.net/photos/a/b.txt".to_owned(),
        };
        assert_eq!(run(cat, &config, &container).await.unwrap(), "by url");
    }

    #[tokio::test]
    async fn list_prints_one_name_per_line() {
        let (config, container) = fixture();
        for name in ["b.txt", "a/1.txt", "a/2.txt"] {
            container.upload_text("x", name).await.unwrap();
        }

        let list = Command::List {
            prefix: "/a/".to_owned(),
            json: false,
        };
        let output = run(list, &config, &container).await.unwrap();
        assert_eq!(output, "a/1.txt\na/2.txt\n");
    }

    #[tokio::test]
    async fn list_json_includes_sizes() {
        let (config, container) = fixture();
        container.upload_text("four", "x.txt").await.unwrap();

        let list = Command::List {
            prefix: String::new(),
            json: true,
        };
        let output = run(list, &config, &container).await.unwrap();
        let entries: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(entries[0]["name"], "x.txt");
        assert_eq!(entries[0]["size"], 4);
    }

    #[tokio::test]
    async fn download_missing_blob_fails() {
        let (config, container) = fixture();
        let dir = tempfile::tempdir().unwrap();
        let download = Command::Download {
            name: "absent.txt".to_owned(),
            folder: dir.path().to_path_buf(),
        };
        let err = run(download, &config, &container).await.unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[tokio::test]
    async fn download_writes_nested_file() {
        let (config, container) = fixture();
        container.upload_text("nested", "a/b/c.txt").await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let download = Command::Download {
            name: "a/b/c.txt".to_owned(),
            folder: dir.path().to_path_buf(),
        };
        let output = run(download, &config, &container).await.unwrap();

        let expected = dir.path().join("a").join("b").join("c.txt");
        assert_eq!(
            output,
            format!("Downloaded file to {} (6 bytes).\n", expected.display())
        );
        assert_eq!(tokio::fs::read(&expected).await.unwrap(), b"nested");
    }

    #[tokio::test]
    async fn upload_uses_file_name_or_explicit_name() {
        let (config, container) = fixture();
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("report.csv");
        tokio::fs::write(&file, b"a,b\n").await.unwrap();

        let upload = Command::Upload {
            file: file.clone(),
            name: None,
        };
        let output = run(upload, &config, &container).await.unwrap();
        assert_eq!(output, "Uploaded report.csv (4 bytes).\n");

        let upload = Command::Upload {
            file,
            name: Some("2024/report.csv".to_owned()),
        };
        let output = run(upload, &config, &container).await.unwrap();
        assert_eq!(output, "Uploaded 2024/report.csv (4 bytes).\n");
        assert_eq!(
            container.list_all().await.unwrap(),
            vec!["2024/report.csv", "report.csv"]
        );
    }

    #[tokio::test]
    async fn rename_moves_blob() {
        let (config, container) = fixture();
        container.upload_text("x", "old.txt").await.unwrap();

        let rename = Command::Rename {
            from: "old.txt".to_owned(),
            to: "new.txt".to_owned(),
        };
        let output = run(rename, &config, &container).await.unwrap();
        assert_eq!(output, "Finished renaming the blob.\n");
        assert_eq!(container.list_all().await.unwrap(), vec!["new.txt"]);
    }

    #[tokio::test]
    async fn url_prints_blob_address() {
        let (config, _) = fixture();
        let container = BlobContainer::connect(config.clone()).unwrap();

        let url = Command::Url {
            name: "dir/my file.txt".to_owned(),
        };
        let output = run(url, &config, &container).await.unwrap();
        assert_eq!(
            output,
            "https://myaccount.blob.core.windows.net/photos/dir/my%20file.txt\n"
        );
    }

    #[tokio::test]
    async fn init_creates_then_keeps_container() {
        let (config, container) = fixture();

        let output = run(Command::Init, &config, &container).await.unwrap();
        assert_eq!(output, "Container created with blob-level public access.\n");

        let output = run(Command::Init, &config, &container).await.unwrap();
        assert_eq!(
            output,
            "Container exists with blob-level public access; nothing to do.\n"
        );
    }

    #[test]
    fn resolve_name_skips_emulator_account() {
        let config = ContainerConfig::new("photos", KEY, "photos")
            .with_endpoint("http://127.0.0.1:10000/photos");
        let container = BlobContainer::connect(config.clone()).unwrap();
        assert_eq!(
            resolve_name("http://127.0.0.1:10000/photos/photos/a.txt", &container).unwrap(),
            "a.txt"
        );
    }

    #[tokio::test]
    async fn delete_reports_existence() {
        let (config, container) = fixture();
        container.upload_text("x", "gone.txt").await.unwrap();

        let delete = || Command::Delete {
            name: "gone.txt".to_owned(),
        };
        assert_eq!(
            run(delete(), &config, &container).await.unwrap(),
            "Blob existed; deleted.\n"
        );
        assert_eq!(
            run(delete(), &config, &container).await.unwrap(),
            "Blob did not exist.\n"
        );
    }

    #[tokio::test]
    async fn connection_string_uses_config() {
        let (config, container) = fixture();
        let output = run(Command::ConnectionString, &config, &container)
            .await
            .unwrap();
        assert_eq!(
            output,
            format!("DefaultEndpointsProtocol=https;AccountName=myaccount;AccountKey={KEY}\n")
        );
    }

    #[test]
    fn resolve_name_rejects_foreign_container() {
        let (_, container) = fixture();
        let result = resolve_name("https://acct.blob.core.windows.net/other/a.txt", &container);
        assert!(result.is_err());
        assert_eq!(resolve_name("plain/name", &container).unwrap(), "plain/name");
    }
}
