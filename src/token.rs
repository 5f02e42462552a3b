use crate::config::ConfigError;

/// Resolves the authentication token. A non-empty `token_from` path wins over
/// the inline value: the file is read whole and only trailing newlines are
/// stripped, so token files written by editors that append one still work.
/// The inline value is taken verbatim.
pub(crate) fn resolve(token: &str, token_from: &str) -> Result<String, ConfigError> {
    if token_from.is_empty() {
        return Ok(token.to_string());
    }
    let contents = std::fs::read_to_string(token_from)
        .map_err(|err| ConfigError::TokenFile(err, token_from.to_string()))?;
    Ok(contents.trim_end_matches('\n').to_string())
}
