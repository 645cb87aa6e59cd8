//! Archive repackaging through external tools
//!
//! A repackage job owns the lifecycle of one downloaded archive: unpack it
//! into a working folder, delete the original, then bundle the folder's
//! contents into a single `.tar.xz`. The unpack and compress steps are an
//! opaque subprocess contract behind the [`Toolchain`] trait, so alternate
//! codecs can be substituted (tests inject a double that touches no
//! subprocess at all).

use std::path::Path;
use std::process::ExitStatus;

use async_trait::async_trait;
use tokio::fs;
use tokio::process::Command;
use tracing::{debug, info};

use crate::constants::{archive, tools};
use crate::errors::{RepackError, RepackResult};

/// External unpack/compress capability
///
/// Both steps inherit the parent's standard streams and report the tool
/// name and exit code on failure.
#[async_trait]
pub trait Toolchain: Send + Sync {
    /// Executables that must be on PATH before a run may start
    fn required_tools(&self) -> &[&str];

    /// Extracts `archive` directly into `into`, flattening any single
    /// top-level directory
    async fn unpack(&self, archive: &Path, into: &Path) -> RepackResult<()>;

    /// Bundles the entire contents of `folder` into `<output_name>.tar.xz`
    /// inside it, removing source files as they are consumed
    async fn compress(&self, folder: &Path, output_name: &str) -> RepackResult<()>;
}

/// Default toolchain: `unar` for unpacking, `tar` piped through `xz` for
/// compression
#[derive(Debug, Default)]
pub struct XzToolchain;

#[async_trait]
impl Toolchain for XzToolchain {
    fn required_tools(&self) -> &[&str] {
        tools::REQUIRED
    }

    async fn unpack(&self, archive: &Path, into: &Path) -> RepackResult<()> {
        let mut cmd = Command::new(tools::UNPACK);
        cmd.arg("-no-directory")
            .arg("-output-directory")
            .arg(into)
            .arg(archive);
        run_tool(tools::UNPACK, &mut cmd).await
    }

    async fn compress(&self, folder: &Path, output_name: &str) -> RepackResult<()> {
        let output = folder.join(format!("{output_name}.{}", archive::OUTPUT_EXTENSION));

        // List the members up front: the archive is written into the same
        // folder and must not try to contain itself
        let mut members = Vec::new();
        let mut entries = fs::read_dir(folder).await?;
        while let Some(entry) = entries.next_entry().await? {
            members.push(Path::new(".").join(entry.file_name()));
        }

        let mut cmd = Command::new(tools::ARCHIVE);
        cmd.arg("--remove-files")
            .arg("-cI")
            .arg(tools::XZ_FILTER)
            .arg("-C")
            .arg(folder)
            .arg("-f")
            .arg(&output)
            .args(&members);
        run_tool(tools::ARCHIVE, &mut cmd).await
    }
}

/// Runs a subprocess to completion with inherited stdio
async fn run_tool(tool: &str, cmd: &mut Command) -> RepackResult<()> {
    debug!("running {tool}: {cmd:?}");
    let status = cmd.status().await?;
    check_exit(tool, status)
}

fn check_exit(tool: &str, status: ExitStatus) -> RepackResult<()> {
    if status.success() {
        return Ok(());
    }
    match status.code() {
        Some(code) => Err(RepackError::ToolFailed {
            tool: tool.to_string(),
            code,
        }),
        None => Err(RepackError::ToolTerminated {
            tool: tool.to_string(),
        }),
    }
}

/// Repackages downloaded archives through a toolchain
#[derive(Clone)]
pub struct Repackager {
    toolchain: std::sync::Arc<dyn Toolchain>,
}

impl Repackager {
    pub fn new(toolchain: std::sync::Arc<dyn Toolchain>) -> Self {
        Self { toolchain }
    }

    /// Unpacks `input` into `working_folder`, deletes `input`, and
    /// recompresses the folder into a single archive named after the input
    /// (or `name_override` when given)
    ///
    /// Intermediate files are owned by the job: the unpacked tree is
    /// consumed by the compress step, leaving only the output archive.
    pub async fn repackage(
        &self,
        input: &Path,
        working_folder: &Path,
        name_override: Option<&str>,
    ) -> RepackResult<()> {
        let name = match name_override {
            Some(name) => name.to_string(),
            None => base_name(input)?,
        };

        fs::create_dir_all(working_folder).await?;
        self.toolchain.unpack(input, working_folder).await?;
        fs::remove_file(input).await?;
        self.toolchain.compress(working_folder, &name).await?;

        info!(
            "repackaged {} -> {}/{name}.{}",
            input.display(),
            working_folder.display(),
            archive::OUTPUT_EXTENSION
        );
        Ok(())
    }
}

/// Base name of the input file: everything before the first dot
fn base_name(input: &Path) -> RepackResult<String> {
    let file_name = input
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| RepackError::NoFileName {
            path: input.to_path_buf(),
        })?;

    let base = file_name.split('.').next().unwrap_or(file_name);
    if base.is_empty() {
        return Err(RepackError::NoFileName {
            path: input.to_path_buf(),
        });
    }
    Ok(base.to_string())
}
