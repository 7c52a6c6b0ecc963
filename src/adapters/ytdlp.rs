use crate::config::APP_NAME;
use crate::domain::metadata::ResolvedMetadata;
use crate::domain::reference::VideoReference;
use crate::ports::fetch::VideoFetcher;
use crate::ports::lookup::MetadataLookup;
use async_trait::async_trait;
use serde_json::Value;
use std::error::Error;
use tokio::process::Command as TokioCommand;

/// Adapter over the `youtube-dl` binary for both lookup and fetch.
/// Lookup runs `--dump-json --id`; fetch runs `-q --id` and relies on the
/// tool writing the file into the current working directory.
#[derive(Clone)]
pub struct YoutubeDl {
    program: String,
}

impl YoutubeDl {
    pub fn new() -> Self {
        Self {
            program: "youtube-dl".to_owned(),
        }
    }
}

impl Default for YoutubeDl {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetadataLookup for YoutubeDl {
    async fn lookup(
        &self,
        reference: &VideoReference,
    ) -> Result<ResolvedMetadata, Box<dyn Error + Send + Sync>> {
        let output = TokioCommand::new(&self.program)
            .arg("--dump-json")
            .arg("--id")
            .arg(reference.as_str())
            .output()
            .await?;

        if !output.stderr.is_empty() {
            eprint!("{}", String::from_utf8_lossy(&output.stderr));
        }
        if !output.status.success() {
            return Err(format!("{} exited with {}", self.program, output.status).into());
        }

        parse_metadata(reference, &output.stdout)
    }
}

#[async_trait]
impl VideoFetcher for YoutubeDl {
    async fn fetch(&self, reference: &VideoReference) -> Result<(), Box<dyn Error + Send + Sync>> {
        let output = TokioCommand::new(&self.program)
            .arg("-q")
            .arg("--id")
            .arg(reference.as_str())
            .output()
            .await?;

        if !output.stdout.is_empty() {
            print!("{}", String::from_utf8_lossy(&output.stdout));
        }
        if !output.stderr.is_empty() {
            eprint!("{}", String::from_utf8_lossy(&output.stderr));
        }
        if !output.status.success() {
            eprintln!(
                "[{}] {} closed with {}",
                APP_NAME, self.program, output.status
            );
            return Err(format!("{} exited with {}", self.program, output.status).into());
        }
        Ok(())
    }
}

/// Pull `_filename` and the filesize of the selected format out of a
/// `--dump-json` document. Filesize falls back to 0 when the selected
/// format is missing or carries no filesize field.
fn parse_metadata(
    reference: &VideoReference,
    stdout: &[u8],
) -> Result<ResolvedMetadata, Box<dyn Error + Send + Sync>> {
    let document: Value = serde_json::from_slice(stdout)?;

    let filename = document
        .get("_filename")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();

    let format_id = document.get("format_id").and_then(Value::as_str);
    let filesize = match format_id {
        Some(format_id) => document
            .get("formats")
            .and_then(Value::as_array)
            .and_then(|formats| {
                formats.iter().find(|format| {
                    format.get("format_id").and_then(Value::as_str) == Some(format_id)
                })
            })
            .and_then(|format| format.get("filesize"))
            .and_then(Value::as_u64)
            .unwrap_or(0),
        None => 0,
    };

    Ok(ResolvedMetadata {
        reference: reference.clone(),
        filename,
        filesize,
    })
}
