use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Parser, Clone, PartialEq, Eq)]
#[command(name = "pyreflect")]
#[command(
    about = "Python kernel that answers introspection requests about its live namespace",
    long_about = "Python kernel that answers introspection requests about its live namespace\n\nSource lines are read from stdin and run in __main__. Introspection requests\n(dir, dir2, signature, doc, eval, interrupt, terminate) are served as\nline-delimited JSON on a TCP socket; the bound address is printed at startup.\n\nConfig file loading:\n  - --config <path> (explicit file, overrides default path discovery)\n  - Default probe path when --config is not provided:\n    1. $XDG_CONFIG_HOME/pyreflect/config.toml\n    2. ~/.config/pyreflect/config.toml"
)]
pub struct CliArgs {
    /// Load config from this file path instead of the default discovery path.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Address for the introspection socket; overrides the config file.
    #[arg(long, value_name = "ADDR")]
    pub listen: Option<SocketAddr>,

    /// Initialise the interpreter, report, and exit.
    #[arg(long)]
    pub smoke_python: bool,
}
