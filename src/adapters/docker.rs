//! Docker CLI adapter: pull, retag and push images.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;

use super::{cli_arg, AdapterError, CommandOutput, CommandRunner, CommandSpec};
use crate::config::DockerConfig;
use crate::envelope::Envelope;
use crate::registry::BuildContext;
use crate::tool::{bind, OperationSpec, Toolset};

pub const PULL_IMAGE: OperationSpec = OperationSpec::mutating(
    "pull_image",
    "Pull an image (e.g. 'ghcr.io/open-webui/open-webui:v0.6.14') to the local Docker host.",
);
pub const RETAG_IMAGE: OperationSpec = OperationSpec::mutating(
    "retag_image",
    "Tag a local image with a new name, typically for the target registry.",
);
pub const PUSH_IMAGE: OperationSpec = OperationSpec::mutating(
    "push_image",
    "Push a tagged local image to its registry.",
);

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ImageParams {
    #[schemars(description = "Full image reference including the tag")]
    pub image_name_with_tag: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RetagParams {
    #[schemars(description = "Existing local image reference")]
    pub source_image: String,
    #[schemars(description = "New image reference")]
    pub target_image: String,
}

pub struct DockerAdapter {
    runner: Arc<dyn CommandRunner>,
    binary: String,
    host: Option<String>,
}

impl DockerAdapter {
    pub fn new(config: &DockerConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            binary: config.binary.clone(),
            host: config.host.clone(),
        }
    }

    async fn docker(&self, args: &[&str]) -> Result<CommandOutput, AdapterError> {
        let mut all: Vec<String> = Vec::with_capacity(args.len() + 2);
        if let Some(host) = &self.host {
            all.push("-H".into());
            all.push(host.clone());
        }
        all.extend(args.iter().map(|a| a.to_string()));
        self.runner.run(&CommandSpec::new(&self.binary, all)).await
    }

    pub async fn pull(&self, image: &str) -> Result<Envelope, AdapterError> {
        cli_arg("image_name_with_tag", image)?;
        self.docker(&["pull", "--quiet", image]).await?;
        let inspect = self
            .docker(&["image", "inspect", "--format", "{{.Id}}", image])
            .await?;

        tracing::info!(image, "image pulled");
        Ok(Envelope::record(json!({
            "image": image,
            "pulled_image_id": short_id(inspect.stdout.trim()),
        })))
    }

    pub async fn retag(&self, source: &str, target: &str) -> Result<Envelope, AdapterError> {
        cli_arg("source_image", source)?;
        cli_arg("target_image", target)?;
        self.docker(&["tag", source, target]).await?;

        tracing::info!(source, target, "image retagged");
        Ok(Envelope::record(json!({ "source": source, "new_tag": target })))
    }

    pub async fn push(&self, image: &str) -> Result<Envelope, AdapterError> {
        cli_arg("image_name_with_tag", image)?;
        self.docker(&["push", "--quiet", image]).await?;

        tracing::info!(image, "image pushed");
        Ok(Envelope::success(format!("Successfully pushed {image}.")))
    }
}

/// `sha256:<64 hex>` shortened to `sha256:<12 hex>`.
fn short_id(id: &str) -> String {
    match id.split_once(':') {
        Some((algo, digest)) => format!("{algo}:{}", digest.chars().take(12).collect::<String>()),
        None => id.chars().take(12).collect(),
    }
}

pub fn toolset(ctx: &BuildContext) -> anyhow::Result<Toolset> {
    let adapter = Arc::new(DockerAdapter::new(&ctx.config.docker, Arc::clone(&ctx.runner)));
    Ok(vec![
        bind(&adapter, PULL_IMAGE, |a, p: ImageParams| async move {
            a.pull(&p.image_name_with_tag).await
        }),
        bind(&adapter, RETAG_IMAGE, |a, p: RetagParams| async move {
            a.retag(&p.source_image, &p.target_image).await
        }),
        bind(&adapter, PUSH_IMAGE, |a, p: ImageParams| async move {
            a.push(&p.image_name_with_tag).await
        }),
    ])
}
