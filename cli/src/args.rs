use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use vm::Role;

#[derive(Parser)]
#[command(name = "qcvm")]
#[command(about = "QuakeC progs inspector", long_about = None)]
pub struct Cli {
    /// Runtime configuration (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum RoleArg {
    #[default]
    Server,
    Client,
    Menu,
}

impl From<&RoleArg> for Role {
    fn from(arg: &RoleArg) -> Self {
        match arg {
            RoleArg::Server => Role::Server,
            RoleArg::Client => Role::Client,
            RoleArg::Menu => Role::Menu,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load a progs image and print its summary
    Inspect {
        /// Path to the progs file (.dat)
        path: PathBuf,
        /// Role to load the image as
        #[arg(long, value_enum, default_value_t)]
        role: RoleArg,
    },
    /// List script functions with their source file and parameter count
    Functions {
        path: PathBuf,
        #[arg(long, value_enum, default_value_t)]
        role: RoleArg,
    },
    /// Load a server progs image, spawn an entity lump into it and dump
    /// every entity
    Edicts {
        path: PathBuf,
        /// Entity lump text (.ent)
        #[arg(short, long)]
        lump: Option<PathBuf>,
    },
    /// Write the builtin declarations header
    Builtins {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}
