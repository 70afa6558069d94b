//! # Terraform Orchestrator
//!
//! Drives the `terraform` binary. Every session owns a temporary working
//! directory holding `main.tf`, the pinned `provider.tf` and the local state
//! file; imports run in a separate subdirectory so they never touch the
//! session's state.
//!
//! Child processes are killed when their future is dropped, so the caller's
//! step timeout also stops a hung terraform.

use super::{Operation, Orchestrator, OrchestratorError, Session};
use crate::config::HarnessConfig;
use crate::constants::DEFAULT_AZURERM_VERSION;
use crate::model::{LifecycleState, ResourceAddress, ResourceState};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tempfile::TempDir;
use tracing::{debug, info};

const CONFIG_FILE: &str = "main.tf";
const PROVIDER_FILE: &str = "provider.tf";

#[derive(Debug, Clone)]
pub struct TerraformOrchestrator {
    binary: PathBuf,
    azurerm_version: String,
}

impl TerraformOrchestrator {
    /// Resolve the binary from `TERRAFORM_BINARY` or `PATH`
    pub fn new(config: &HarnessConfig) -> Result<Self> {
        let binary = match &config.terraform_binary {
            Some(path) => path.clone(),
            None => which::which("terraform")
                .context("terraform binary not found in PATH (set TERRAFORM_BINARY to override)")?,
        };
        info!(
            "Using terraform binary {} with azurerm {}",
            binary.display(),
            config.azurerm_version
        );
        Ok(Self {
            binary,
            azurerm_version: config.azurerm_version.clone(),
        })
    }

    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            azurerm_version: DEFAULT_AZURERM_VERSION.to_string(),
        }
    }

    /// Override the azurerm provider version constraint
    #[must_use]
    pub fn with_azurerm_version(mut self, version: impl Into<String>) -> Self {
        self.azurerm_version = version.into();
        self
    }
}

/// Provider requirements written next to every rendered configuration
///
/// The collection's `indexes { key, unique }` blocks only exist in the 1.x
/// provider line, which also predates the mandatory `features {}` block.
fn provider_config(azurerm_version: &str) -> String {
    format!(
        r#"terraform {{
  required_providers {{
    azurerm = {{
      source  = "hashicorp/azurerm"
      version = "{azurerm_version}"
    }}
  }}
}}

provider "azurerm" {{
}}
"#
    )
}

#[async_trait]
impl Orchestrator for TerraformOrchestrator {
    async fn begin(&self, run_id: &str) -> Result<Box<dyn Session>, OrchestratorError> {
        let workdir = tempfile::Builder::new()
            .prefix(&format!("acctest-{run_id}-"))
            .tempdir()
            .map_err(|e| {
                OrchestratorError::failed(Operation::Begin, format!("failed to create workspace: {e}"))
            })?;
        debug!("Terraform workspace for {}: {}", run_id, workdir.path().display());

        Ok(Box::new(TerraformSession {
            binary: self.binary.clone(),
            provider: provider_config(&self.azurerm_version),
            workdir,
            initialized: false,
            imports: 0,
        }))
    }
}

#[derive(Debug)]
struct TerraformSession {
    binary: PathBuf,
    provider: String,
    workdir: TempDir,
    initialized: bool,
    imports: usize,
}

impl TerraformSession {
    async fn run(&self, dir: &Path, args: &[&str]) -> Result<String> {
        debug!("Executing: terraform {}", args.join(" "));
        let output = tokio::process::Command::new(&self.binary)
            .args(args)
            .current_dir(dir)
            .env("TF_IN_AUTOMATION", "1")
            .env("TF_INPUT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("Failed to execute terraform {}", args.join(" ")))?;

        if !output.status.success() {
            let error_msg = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow::anyhow!(
                "terraform {} exited with {}: {}",
                args.join(" "),
                output.status,
                error_msg.trim()
            ));
        }

        String::from_utf8(output.stdout).context("terraform produced non-UTF-8 output")
    }

    async fn write_config(&self, dir: &Path, config: &str) -> Result<()> {
        write_workspace(dir, &self.provider, config).await
    }

    async fn init(&self, dir: &Path) -> Result<()> {
        self.run(dir, &["init", "-no-color"]).await.map(|_| ())
    }

    async fn show(&self, dir: &Path) -> Result<LifecycleState> {
        let json = self.run(dir, &["show", "-json", "-no-color"]).await?;
        state_from_show(&json).context("Failed to parse terraform show output")
    }

    async fn apply_inner(&mut self, config: &str) -> Result<LifecycleState> {
        let dir = self.workdir.path().to_path_buf();
        self.write_config(&dir, config).await?;
        if !self.initialized {
            self.init(&dir).await?;
            self.initialized = true;
        }
        self.run(&dir, &["apply", "-auto-approve", "-no-color"]).await?;
        self.show(&dir).await
    }

    async fn state_inner(&self) -> Result<LifecycleState> {
        if !self.initialized {
            return Ok(LifecycleState::default());
        }
        self.show(self.workdir.path()).await
    }

    async fn import_inner(
        &mut self,
        config: &str,
        address: &ResourceAddress,
        id: &str,
    ) -> Result<ResourceState> {
        self.imports += 1;
        let dir = self.workdir.path().join(format!("import-{}", self.imports));
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        self.write_config(&dir, config).await?;
        self.init(&dir).await?;

        let address_text = address.to_string();
        self.run(&dir, &["import", "-no-color", &address_text, id]).await?;

        let state = self.show(&dir).await?;
        state
            .get(address)
            .cloned()
            .with_context(|| format!("{address} missing from state after import"))
    }

    async fn destroy_inner(&mut self, config: &str) -> Result<()> {
        let dir = self.workdir.path().to_path_buf();
        self.write_config(&dir, config).await?;
        if !self.initialized {
            self.init(&dir).await?;
            self.initialized = true;
        }
        self.run(&dir, &["destroy", "-auto-approve", "-no-color"])
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl Session for TerraformSession {
    async fn apply(&mut self, config: &str) -> Result<LifecycleState, OrchestratorError> {
        self.apply_inner(config)
            .await
            .map_err(|e| OrchestratorError::from_anyhow(Operation::Apply, &e))
    }

    async fn import(
        &mut self,
        config: &str,
        address: &ResourceAddress,
        id: &str,
    ) -> Result<ResourceState, OrchestratorError> {
        self.import_inner(config, address, id)
            .await
            .map_err(|e| OrchestratorError::from_anyhow(Operation::Import, &e))
    }

    async fn destroy(&mut self, config: &str) -> Result<(), OrchestratorError> {
        self.destroy_inner(config)
            .await
            .map_err(|e| OrchestratorError::from_anyhow(Operation::Destroy, &e))
    }

    /// Reads the local state file, which terraform writes even when apply fails
    async fn state(&mut self) -> Result<LifecycleState, OrchestratorError> {
        self.state_inner()
            .await
            .map_err(|e| OrchestratorError::from_anyhow(Operation::State, &e))
    }
}

/// Write the rendered configuration and provider requirements into `dir`
async fn write_workspace(dir: &Path, provider: &str, config: &str) -> Result<()> {
    for (file, content) in [(PROVIDER_FILE, provider), (CONFIG_FILE, config)] {
        tokio::fs::write(dir.join(file), content)
            .await
            .with_context(|| format!("Failed to write {file} in {}", dir.display()))?;
    }
    Ok(())
}

/// `terraform show -json` output, reduced to what the harness reads
#[derive(Debug, Default, Deserialize)]
struct ShowOutput {
    #[serde(default)]
    values: Option<ShowValues>,
}

#[derive(Debug, Default, Deserialize)]
struct ShowValues {
    #[serde(default)]
    root_module: ShowModule,
}

#[derive(Debug, Default, Deserialize)]
struct ShowModule {
    #[serde(default)]
    resources: Vec<ShowResource>,
    #[serde(default)]
    child_modules: Vec<ShowModule>,
}

#[derive(Debug, Deserialize)]
struct ShowResource {
    #[serde(default)]
    mode: String,
    #[serde(rename = "type")]
    resource_type: String,
    name: String,
    #[serde(default)]
    values: serde_json::Value,
}

/// Build lifecycle state from `terraform show -json`
///
/// Only managed resources are kept; data sources are not part of the lifecycle.
fn state_from_show(json: &str) -> Result<LifecycleState, serde_json::Error> {
    let output: ShowOutput = serde_json::from_str(json)?;
    let mut resources = Vec::new();
    if let Some(values) = output.values {
        collect_module(&values.root_module, &mut resources);
    }
    Ok(LifecycleState::new(resources))
}

fn collect_module(module: &ShowModule, out: &mut Vec<ResourceState>) {
    for resource in &module.resources {
        if resource.mode != "managed" {
            continue;
        }
        let address = ResourceAddress::new(&resource.resource_type, &resource.name);
        out.push(ResourceState::from_values(address, &resource.values));
    }
    for child in &module.child_modules {
        collect_module(child, out);
    }
}
