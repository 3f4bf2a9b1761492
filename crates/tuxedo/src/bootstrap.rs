use std::path::PathBuf;

use editor::config::SERVER_URL_ENV_VAR;
use editor::EditorConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct CliArgs {
    pub(crate) config_path: Option<PathBuf>,
    pub(crate) server_url: Option<String>,
    pub(crate) show_help: bool,
}

pub(crate) fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

pub(crate) fn parse_args(args: &[String]) -> Result<CliArgs, String> {
    let mut parsed = CliArgs::default();
    let mut index = 0usize;
    while index < args.len() {
        match args[index].as_str() {
            "-h" | "--help" => {
                parsed.show_help = true;
                index += 1;
            }
            "--config" => {
                let value = args
                    .get(index + 1)
                    .ok_or_else(|| "missing value for --config".to_string())?;
                parsed.config_path = Some(PathBuf::from(value));
                index += 2;
            }
            "--server" => {
                let value = args
                    .get(index + 1)
                    .ok_or_else(|| "missing value for --server".to_string())?;
                parsed.server_url = Some(value.clone());
                index += 2;
            }
            other => return Err(format!("unknown argument '{other}'")),
        }
    }
    Ok(parsed)
}

/// File first, then `TUXEDO_*` variables, then `--server`.
pub(crate) fn load_config(args: &CliArgs) -> Result<EditorConfig, String> {
    let mut config =
        EditorConfig::load(args.config_path.as_deref()).map_err(|error| error.to_string())?;
    if let Some(url) = &args.server_url {
        config.server.url = url.clone();
        config.validate().map_err(|error| error.to_string())?;
    }
    info!(
        server_url = %config.server.url,
        config_file = ?args.config_path,
        resolution_cache_scope = ?config.assets.resolution_cache_scope,
        font_count = config.fonts.len(),
        "config_loaded"
    );
    Ok(config)
}

pub(crate) fn usage_text() -> String {
    format!(
        "tuxedo - scene editor shell\n\
         \n\
         Usage:\n  tuxedo [--config <file.json>] [--server <url>]\n\
         \n\
         Reads one command per line from stdin; type 'help' for the list.\n\
         \n\
         Environment:\n  {SERVER_URL_ENV_VAR}  scene service base url\n  RUST_LOG           log filter (default: info)"
    )
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn flags_are_parsed_in_any_order() {
        let parsed = parse_args(&args(&["--server", "http://editor:3000", "--config", "tuxedo.json"]))
            .expect("parse");
        assert_eq!(parsed.server_url.as_deref(), Some("http://editor:3000"));
        assert_eq!(parsed.config_path, Some(PathBuf::from("tuxedo.json")));
        assert!(!parsed.show_help);
        assert!(parse_args(&args(&["-h"])).expect("help").show_help);
    }

    #[test]
    fn missing_values_and_unknown_flags_are_rejected() {
        assert_eq!(
            parse_args(&args(&["--config"])),
            Err("missing value for --config".to_string())
        );
        assert_eq!(
            parse_args(&args(&["--verbose"])),
            Err("unknown argument '--verbose'".to_string())
        );
    }

    #[test]
    fn server_flag_overrides_the_config_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{ "server": {{ "url": "http://from-file:3000" }} }}"#).expect("write");
        let parsed = CliArgs {
            config_path: Some(file.path().to_path_buf()),
            server_url: Some("http://from-flag:4000".to_string()),
            show_help: false,
        };

        let config = load_config(&parsed).expect("config");
        assert_eq!(config.server.url, "http://from-flag:4000");

        let rejected = load_config(&CliArgs {
            server_url: Some("not a url".to_string()),
            ..parsed
        });
        assert!(rejected.is_err());
    }
}
