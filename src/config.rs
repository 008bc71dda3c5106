use anyhow::{Result, anyhow, bail};
use serde::Deserialize;
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

pub const DEFAULT_LISTEN: &str = "127.0.0.1:0";

const CONFIG_DIR_NAME: &str = "pyreflect";
const CONFIG_FILE_NAME: &str = "config.toml";
const LISTEN_ENV: &str = "PYREFLECT_LISTEN";
const STARTUP_FILE_ENV: &str = "PYREFLECT_STARTUP_FILE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelConfig {
    pub config_path: PathBuf,
    pub config_is_explicit: bool,
    pub listen: SocketAddr,
    pub startup_file: Option<PathBuf>,
    pub trace: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawFileConfig {
    listen: Option<String>,
    startup_file: Option<String>,
    trace: Option<bool>,
}

impl KernelConfig {
    pub fn load() -> Result<Self> {
        Self::load_with_path(None)
    }

    pub fn load_with_path(explicit_path: Option<&Path>) -> Result<Self> {
        let config_is_explicit = explicit_path.is_some();
        let config_path = match explicit_path {
            Some(path) => path.to_path_buf(),
            None => discover_config_path()?,
        };
        if config_is_explicit && !config_path.is_file() {
            bail!(
                "Failed to load config {}: file does not exist",
                config_path.display()
            );
        }
        let file_config = load_file_config(&config_path)?;

        dotenvy::dotenv().ok();

        let file_listen = file_config
            .as_ref()
            .and_then(|cfg| cfg.listen.as_deref())
            .and_then(non_empty)
            .map(|value| {
                parse_listen(value).map_err(|reason| config_error(&config_path, "listen", &reason))
            })
            .transpose()?;
        let env_listen = env_non_empty(LISTEN_ENV)
            .map(|value| {
                parse_listen(&value).map_err(|reason| anyhow!("Invalid {LISTEN_ENV}: {reason}"))
            })
            .transpose()?;
        let listen = match env_listen.or(file_listen) {
            Some(addr) => addr,
            None => parse_listen(DEFAULT_LISTEN).map_err(|reason| anyhow!(reason))?,
        };

        let file_startup = file_config
            .as_ref()
            .and_then(|cfg| cfg.startup_file.as_deref())
            .and_then(non_empty)
            .map(PathBuf::from);

        Ok(Self {
            listen,
            startup_file: env_non_empty(STARTUP_FILE_ENV)
                .map(PathBuf::from)
                .or(file_startup),
            trace: file_config
                .as_ref()
                .and_then(|cfg| cfg.trace)
                .unwrap_or(true),
            config_path,
            config_is_explicit,
        })
    }
}

fn discover_config_path() -> Result<PathBuf> {
    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        let trimmed = xdg.trim();
        if trimmed.is_empty() {
            bail!("Failed to resolve config path: XDG_CONFIG_HOME is set but empty");
        }

        return Ok(PathBuf::from(trimmed)
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME));
    }

    let home = dirs::home_dir().ok_or_else(|| {
        anyhow!("Failed to resolve config path: HOME directory is unavailable")
    })?;

    Ok(home
        .join(".config")
        .join(CONFIG_DIR_NAME)
        .join(CONFIG_FILE_NAME))
}

fn load_file_config(config_path: &Path) -> Result<Option<RawFileConfig>> {
    if !config_path.is_file() {
        return Ok(None);
    }

    let config_text = fs::read_to_string(config_path).map_err(|err| {
        anyhow!(
            "Failed to load config {}: unable to read file: {err}",
            config_path.display()
        )
    })?;

    toml::from_str(&config_text).map(Some).map_err(|err| {
        anyhow!(
            "Failed to load config {}: {err}",
            config_path.display()
        )
    })
}

fn parse_listen(value: &str) -> std::result::Result<SocketAddr, String> {
    value
        .parse()
        .map_err(|err| format!("invalid socket address '{value}': {err}"))
}

fn env_non_empty(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| non_empty(&value).map(ToOwned::to_owned))
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn config_error(config_path: &Path, key_path: &str, reason: &str) -> anyhow::Error {
    anyhow!(
        "Failed to load config {}: {key_path}: {reason}",
        config_path.display()
    )
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_LISTEN, KernelConfig};
    use serial_test::serial;
    use std::env;
    use std::fs;
    use std::path::{Path, PathBuf};

    fn reset_vars() {
        unsafe {
            env::remove_var("PYREFLECT_LISTEN");
            env::remove_var("PYREFLECT_STARTUP_FILE");
            env::remove_var("XDG_CONFIG_HOME");
        }
    }

    fn with_cwd<T>(path: &Path, f: impl FnOnce() -> T) -> T {
        let cwd = env::current_dir().expect("current dir");
        env::set_current_dir(path).expect("set current dir");
        let result = f();
        env::set_current_dir(cwd).expect("restore current dir");
        result
    }

    fn write_config(root: &Path, contents: &str) -> PathBuf {
        let config_dir = root.join("pyreflect");
        fs::create_dir_all(&config_dir).expect("create config dir");
        let path = config_dir.join("config.toml");
        fs::write(&path, contents).expect("write config");
        path
    }

    #[test]
    #[serial]
    fn load_uses_defaults_without_file() {
        let tmp = tempfile::tempdir().expect("tempdir");
        reset_vars();
        unsafe {
            env::set_var("XDG_CONFIG_HOME", tmp.path());
        }

        let cfg = with_cwd(tmp.path(), || KernelConfig::load().expect("load config"));
        assert_eq!(cfg.listen.to_string(), DEFAULT_LISTEN);
        assert_eq!(cfg.startup_file, None);
        assert!(cfg.trace);
        assert!(!cfg.config_is_explicit);
        assert_eq!(cfg.config_path, tmp.path().join("pyreflect").join("config.toml"));
    }

    #[test]
    #[serial]
    fn load_reads_file_values() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write_config(
            tmp.path(),
            r#"
listen = "127.0.0.1:4567"
startup_file = "/tmp/boot.py"
trace = false
"#,
        );

        reset_vars();
        unsafe {
            env::set_var("XDG_CONFIG_HOME", tmp.path());
        }

        let cfg = with_cwd(tmp.path(), || KernelConfig::load().expect("load config"));
        assert_eq!(cfg.listen.port(), 4567);
        assert_eq!(cfg.startup_file, Some(PathBuf::from("/tmp/boot.py")));
        assert!(!cfg.trace);
    }

    #[test]
    #[serial]
    fn load_env_overrides_file() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write_config(
            tmp.path(),
            r#"
listen = "127.0.0.1:4567"
startup_file = "/tmp/file.py"
"#,
        );

        reset_vars();
        unsafe {
            env::set_var("XDG_CONFIG_HOME", tmp.path());
            env::set_var("PYREFLECT_LISTEN", "127.0.0.1:9999");
            env::set_var("PYREFLECT_STARTUP_FILE", "/tmp/env.py");
        }

        let cfg = with_cwd(tmp.path(), || KernelConfig::load().expect("load config"));
        assert_eq!(cfg.listen.port(), 9999);
        assert_eq!(cfg.startup_file, Some(PathBuf::from("/tmp/env.py")));
        reset_vars();
    }

    #[test]
    #[serial]
    fn load_ignores_empty_env_values() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write_config(tmp.path(), r#"listen = "127.0.0.1:4567""#);

        reset_vars();
        unsafe {
            env::set_var("XDG_CONFIG_HOME", tmp.path());
            env::set_var("PYREFLECT_LISTEN", "  ");
        }

        let cfg = with_cwd(tmp.path(), || KernelConfig::load().expect("load config"));
        assert_eq!(cfg.listen.port(), 4567);
        reset_vars();
    }

    #[test]
    #[serial]
    fn load_reads_listen_from_dotenv() {
        let tmp = tempfile::tempdir().expect("tempdir");
        fs::write(tmp.path().join(".env"), "PYREFLECT_LISTEN=127.0.0.1:7001\n")
            .expect("write env file");

        reset_vars();
        unsafe {
            env::set_var("XDG_CONFIG_HOME", tmp.path());
        }

        let cfg = with_cwd(tmp.path(), || KernelConfig::load().expect("load config"));
        assert_eq!(cfg.listen.port(), 7001);
        reset_vars();
    }

    #[test]
    #[serial]
    fn load_fails_when_xdg_config_home_is_empty() {
        reset_vars();
        unsafe {
            env::set_var("XDG_CONFIG_HOME", "   ");
        }

        let err = KernelConfig::load().expect_err("load should fail");
        assert!(
            err.to_string()
                .contains("Failed to resolve config path: XDG_CONFIG_HOME is set but empty")
        );
        reset_vars();
    }

    #[test]
    #[serial]
    fn load_fails_on_unknown_root_key() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write_config(tmp.path(), "unknown_key = 1");

        reset_vars();
        unsafe {
            env::set_var("XDG_CONFIG_HOME", tmp.path());
        }

        let err = with_cwd(tmp.path(), || KernelConfig::load().expect_err("load should fail"));
        assert!(err.to_string().contains("Failed to load config"));
        assert!(err.to_string().contains("unknown field"));
    }

    #[test]
    #[serial]
    fn load_fails_on_invalid_listen_address() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write_config(tmp.path(), r#"listen = "localhost""#);

        reset_vars();
        unsafe {
            env::set_var("XDG_CONFIG_HOME", tmp.path());
        }

        let err = with_cwd(tmp.path(), || KernelConfig::load().expect_err("load should fail"));
        assert!(
            err.to_string()
                .contains("listen: invalid socket address 'localhost'")
        );
    }

    #[test]
    #[serial]
    fn explicit_path_must_exist() {
        let tmp = tempfile::tempdir().expect("tempdir");
        reset_vars();

        let missing = tmp.path().join("missing.toml");
        let err = with_cwd(tmp.path(), || {
            KernelConfig::load_with_path(Some(&missing)).expect_err("load should fail")
        });
        assert!(err.to_string().contains("file does not exist"));
    }

    #[test]
    #[serial]
    fn explicit_path_is_marked_explicit() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("custom.toml");
        fs::write(&path, "trace = false").expect("write config");
        reset_vars();

        let cfg = with_cwd(tmp.path(), || {
            KernelConfig::load_with_path(Some(&path)).expect("load config")
        });
        assert!(cfg.config_is_explicit);
        assert_eq!(cfg.config_path, path);
        assert!(!cfg.trace);
    }
}
