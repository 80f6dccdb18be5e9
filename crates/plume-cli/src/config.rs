//! TOML loading for [`EditorConfig`].

use std::fs;
use std::path::{Path, PathBuf};

use miette::{Diagnostic, NamedSource, SourceSpan};
use plume_editor_core::EditorConfig;

#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum ConfigError {
    #[error("could not read config file {}", path.display())]
    #[diagnostic(code(plume::config::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {message}")]
    #[diagnostic(
        code(plume::config::parse),
        help("every key is optional; remove it to fall back to the default")
    )]
    Parse {
        message: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("here")]
        span: Option<SourceSpan>,
    },
}

/// Read the config at `path`, or the defaults when no path is given.
pub fn load(path: Option<&Path>) -> Result<EditorConfig, ConfigError> {
    let Some(path) = path else {
        return Ok(EditorConfig::default());
    };
    let src = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_owned(),
        source,
    })?;
    let config = parse(&path.display().to_string(), src)?;
    tracing::debug!(target: "plume::cli", path = %path.display(), "loaded config");
    Ok(config)
}

pub fn parse(name: &str, src: String) -> Result<EditorConfig, ConfigError> {
    match toml::from_str::<EditorConfig>(&src) {
        Ok(config) => Ok(config),
        Err(err) => Err(ConfigError::Parse {
            message: err.message().to_owned(),
            span: err.span().map(SourceSpan::from),
            src: NamedSource::new(name, src),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plume_editor_core::ClearMode;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = parse(
            "plume.toml",
            r#"
indent_step = 20
clear_format_default = "full"
disabled_plugins = ["insertTable"]
"#
            .to_owned(),
        )
        .unwrap();
        assert_eq!(config.indent_step, 20);
        assert_eq!(config.clear_format_default, ClearMode::Full);
        assert!(config.is_disabled("insertTable"));
        assert_eq!(config.max_indent, EditorConfig::default().max_indent);
    }

    #[test]
    fn test_bad_value_points_at_source() {
        let err = parse("plume.toml", "clear_format_default = \"nuclear\"\n".to_owned()).unwrap_err();
        match err {
            ConfigError::Parse { span, .. } => assert!(span.is_some()),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_path_is_defaults() {
        assert_eq!(load(None).unwrap(), EditorConfig::default());
    }
}
