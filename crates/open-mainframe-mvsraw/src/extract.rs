//! Result extraction: what each DD holds after the program ran.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::{debug, warn};

use crate::binding::{Binding, ReturnContent};
use crate::error::{MvsRawError, Result};
use crate::executor::ExecutionOutcome;
use crate::provision::{Resolution, ResolvedBindings};
use crate::report::BindingResult;
use crate::request::InvocationRequest;
use crate::storage::{DatasetStorage, StorageError};

/// Render bytes per the requested content mode.
pub fn render_content(bytes: &[u8], mode: ReturnContent) -> Option<String> {
    match mode {
        ReturnContent::None => None,
        ReturnContent::Text => Some(String::from_utf8_lossy(bytes).into_owned()),
        ReturnContent::Base64 => Some(STANDARD.encode(bytes)),
    }
}

/// Records in `bytes`: line separators plus one.
pub fn count_records(bytes: &[u8]) -> u64 {
    bytes.iter().filter(|&&b| b == b'\n').count() as u64 + 1
}

/// Collect per-DD results in binding order.
///
/// A data set binding with several targets yields one result per target.
pub fn extract_results<S: DatasetStorage>(
    request: &InvocationRequest,
    resolved: &ResolvedBindings,
    outcome: &ExecutionOutcome,
    storage: &S,
) -> Result<Vec<BindingResult>> {
    let mut results = Vec::with_capacity(request.bindings.len());
    for (index, binding) in request.bindings.iter().enumerate() {
        let name = binding.name();
        let mode = binding.return_content();
        match binding {
            Binding::Sysout(dd) if dd.is_stdout() => results.push(BindingResult {
                name: name.to_string(),
                target: "stdout".to_string(),
                content: render_content(&outcome.stdout, mode),
                record_count: count_records(&outcome.stdout),
                byte_count: outcome.stdout.len() as u64,
            }),
            Binding::Sysout(dd) => {
                warn!(binding = %name, class = %dd.class, "SYSOUT class output is not captured");
                results.push(BindingResult {
                    name: name.to_string(),
                    target: format!("sysout={}", dd.class),
                    content: None,
                    record_count: 0,
                    byte_count: 0,
                });
            }
            Binding::Dummy(_) => results.push(BindingResult {
                name: name.to_string(),
                target: "dummy".to_string(),
                content: Some(String::new()),
                record_count: 0,
                byte_count: 0,
            }),
            Binding::InlineInput(dd) => {
                let text = dd.content.to_text();
                let target = match resolved.get(index) {
                    Some(Resolution::InlineDataset(dsn)) => dsn.clone(),
                    _ => "stdin".to_string(),
                };
                results.push(BindingResult {
                    name: name.to_string(),
                    target,
                    content: render_content(text.as_bytes(), mode),
                    record_count: count_records(text.as_bytes()),
                    byte_count: text.len() as u64,
                });
            }
            Binding::UssFile(dd) => {
                let target = dd.path.display().to_string();
                let bytes = std::fs::read(&dd.path).map_err(|e| MvsRawError::ResourceNotFound {
                    binding: name.to_string(),
                    target: target.clone(),
                    reason: e.to_string(),
                })?;
                results.push(BindingResult {
                    name: name.to_string(),
                    target,
                    content: render_content(&bytes, mode),
                    record_count: count_records(&bytes),
                    byte_count: bytes.len() as u64,
                });
            }
            Binding::Dataset(dd) => {
                let targets = match resolved.get(index) {
                    Some(Resolution::Datasets(names)) => names.as_slice(),
                    _ => dd.targets.as_slice(),
                };
                for dsn in targets {
                    results.push(extract_dataset(name, dsn, mode, storage)?);
                }
            }
        }
    }
    Ok(results)
}

fn extract_dataset<S: DatasetStorage>(
    binding: &str,
    dsn: &str,
    mode: ReturnContent,
    storage: &S,
) -> Result<BindingResult> {
    let content = match storage.read_content(dsn) {
        Ok(content) => content,
        Err(e @ (StorageError::NotFound(_) | StorageError::NotSequential(_))) => {
            debug!(binding, dsname = %dsn, error = %e, "no sequential content");
            Vec::new()
        }
        Err(source) => {
            return Err(MvsRawError::Storage {
                binding: binding.to_string(),
                target: dsn.to_string(),
                source,
            })
        }
    };
    let meta = storage
        .read_metadata(dsn)
        .map_err(|e| MvsRawError::ResourceNotFound {
            binding: binding.to_string(),
            target: dsn.to_string(),
            reason: e.to_string(),
        })?;
    Ok(BindingResult {
        name: binding.to_string(),
        target: dsn.to_string(),
        content: render_content(&content, mode),
        record_count: count_records(&content),
        byte_count: meta.used_bytes,
    })
}
