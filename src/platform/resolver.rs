//! Per-format decipher and n-transform, and batch aggregation

use crate::core::{BatchResult, FailurePolicy, FormatDescriptor, ResolvedFormat};
use crate::diag;
use crate::error::SigError;
use crate::platform::extractor::FragmentList;
use crate::platform::sandbox::{is_truthy, value_to_param, ExecutableProgram};
use crate::utils::url::{get_query_param, parse_query_string, set_query_param};
use serde_json::Value;
use tracing::warn;
use url::Url;

/// Query parameter carrying the deciphered signature when the payload names none
pub const DEFAULT_SIGNATURE_PARAM: &str = "sig";

/// Programs shared by every format of one batch
#[derive(Debug, Clone)]
pub struct BatchPrograms {
    pub decipher: ExecutableProgram,
    pub n_transform: Option<ExecutableProgram>,
}

impl BatchPrograms {
    /// Assemble both programs from a positional fragment list
    pub fn from_fragments(fragments: &FragmentList) -> Result<Self, SigError> {
        let decipher = fragments.decipher().ok_or(SigError::NoDecipherFunction)?;
        let programs = Self {
            decipher: ExecutableProgram::decipher(fragments.helpers(), decipher),
            n_transform: fragments.n_transform().map(ExecutableProgram::n_transform),
        };
        diag!(
            "Built programs: helpers={} n_transform={}",
            fragments.helpers().len(),
            programs.n_transform.is_some()
        );
        Ok(programs)
    }
}

/// Apply the decipher program to a cipher payload and return the signed URL.
///
/// The program must return a string; any other result is an evaluation error.
pub fn decipher_url(payload: &str, program: &ExecutableProgram) -> Result<String, SigError> {
    let args = parse_query_string(payload);
    let base = args
        .get("url")
        .filter(|url| !url.is_empty())
        .ok_or_else(|| SigError::CipherError("cipher payload has no url".to_string()))?;

    let Some(signature) = args.get("s").filter(|s| !s.is_empty()) else {
        diag!("No signature to decipher, using payload url as-is");
        return Ok(base.clone());
    };

    let mut url = Url::parse(base)?;
    diag!(
        "Deciphering signature for {}{}",
        url.origin().ascii_serialization(),
        url.path()
    );

    let deciphered = match program.run(&Value::String(signature.clone()))? {
        Value::String(s) => s,
        other => {
            return Err(SigError::Evaluation(format!(
                "decipher returned a non-string value: {}",
                other
            )))
        }
    };

    let key = args
        .get("sp")
        .map(String::as_str)
        .filter(|sp| !sp.is_empty())
        .unwrap_or(DEFAULT_SIGNATURE_PARAM);
    set_query_param(&mut url, key, &deciphered);
    diag!("Applied {}={}...", key, deciphered.chars().take(16).collect::<String>());

    Ok(url.to_string())
}

/// Apply the n-transform program to the `n` parameter.
///
/// Never fails: a missing parameter, missing program, evaluation fault or falsy result returns
/// `url` untouched.
pub fn n_transform_url(url: String, program: Option<&ExecutableProgram>) -> String {
    let Some(program) = program else {
        diag!("No n-transform program, skipping");
        return url;
    };

    let mut parsed = match Url::parse(&url) {
        Ok(parsed) => parsed,
        Err(e) => {
            diag!("Cannot parse url for n-transform: {}", e);
            return url;
        }
    };
    let Some(n) = get_query_param(&parsed, "n").filter(|n| !n.is_empty()) else {
        diag!("No 'n' param found, skipping");
        return url;
    };

    match program.run(&Value::String(n)) {
        Ok(result) if is_truthy(&result) => {
            let transformed = value_to_param(&result);
            diag!("Applied n={}...", transformed.chars().take(16).collect::<String>());
            set_query_param(&mut parsed, "n", &transformed);
            parsed.to_string()
        }
        Ok(_) => {
            diag!("n-transform returned a falsy result, keeping original n");
            url
        }
        Err(e) => {
            diag!("n-transform failed, keeping original n: {}", e);
            url
        }
    }
}

/// Resolve one format into a value carrying a single URL.
///
/// Empty fields count as absent. `Ok(None)` means the descriptor had neither a URL nor a cipher
/// payload.
pub fn resolve_one(
    format: FormatDescriptor,
    decipher: &ExecutableProgram,
    n_transform: Option<&ExecutableProgram>,
) -> Result<Option<ResolvedFormat>, SigError> {
    let url = match (format.direct_url(), format.cipher_payload()) {
        (Some(url), _) => url.to_string(),
        (None, Some(payload)) => decipher_url(payload, decipher)?,
        (None, None) => {
            warn!(
                "Format itag={} has neither url nor cipher, skipping",
                format.itag
            );
            return Ok(None);
        }
    };

    let url = n_transform_url(url, n_transform);
    Ok(Some(format.into_resolved(url)))
}

/// Resolve formats sequentially in input order; later formats win URL collisions
pub fn resolve_formats(
    formats: Vec<FormatDescriptor>,
    programs: &BatchPrograms,
    policy: FailurePolicy,
) -> Result<BatchResult, SigError> {
    let mut resolved = BatchResult::with_capacity(formats.len());

    for format in formats {
        let itag = format.itag;
        diag!("Processing itag={} mime={:?}", itag, format.mime_type);

        match resolve_one(format, &programs.decipher, programs.n_transform.as_ref()) {
            Ok(Some(format)) => {
                diag!("OK itag={} url_len={}", itag, format.url.len());
                resolved.insert(format.url.clone(), format);
            }
            Ok(None) => {}
            Err(e) => match policy {
                FailurePolicy::AllOrNothing => return Err(e),
                FailurePolicy::PerFormat => warn!("Skipping itag={}: {}", itag, e),
            },
        }
    }

    diag!("Resolved {} format(s)", resolved.len());
    Ok(resolved)
}
