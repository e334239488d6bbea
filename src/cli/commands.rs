//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - add/remove: set and feature lifecycle
//! - list/status: registry and per-repository reports
//! - sync/exec: fan a git sync or an arbitrary command across a feature
//! - switch/init: shell integration
//! - skills: per-set skills directory management

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// thicket - multi-repository feature workspaces on git worktrees
#[derive(Parser, Debug)]
#[command(name = "thicket")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional registry file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Define a set or create a feature
    Add {
        #[command(subcommand)]
        command: AddCommands,
    },

    /// Remove a feature or a set definition
    Remove {
        #[command(subcommand)]
        command: RemoveCommands,
    },

    /// List all sets and active features
    List,

    /// Check the status of all repositories in a feature
    Status {
        /// Feature to report on
        feature: String,
    },

    /// Sync all repositories in a feature with their remotes
    Sync {
        /// Feature to sync
        feature: String,
    },

    /// Execute a command across all repositories in a feature
    Exec {
        /// Feature to run in
        feature: String,

        /// Command and arguments, e.g. `-- git log --oneline -1`
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        command: Vec<String>,
    },

    /// Print the path of a feature workspace (use with `cd $(...)`)
    Switch {
        /// Feature to switch to
        feature: String,
    },

    /// Generate shell integration code
    Init,

    /// Manage skills for sets
    Skills {
        #[command(subcommand)]
        command: SkillsCommands,
    },

    /// Shortcut: `thicket <feature> [tool [args...]]` runs the tool in
    /// the feature workspace, or prints its path with no tool given
    #[command(external_subcommand)]
    Shortcut(Vec<String>),
}

/// `add` subcommands
#[derive(Subcommand, Debug)]
pub enum AddCommands {
    /// Define a new set of repositories
    Set {
        /// Set name
        name: String,

        /// Repository URLs or local paths
        #[arg(required = true)]
        repos: Vec<String>,
    },

    /// Create a new feature workspace
    Feature {
        /// Set to instantiate
        set: String,

        /// Feature (and branch) name
        feature: String,
    },

    /// Shortcut: `add <set> <feature>`
    #[command(external_subcommand)]
    Shorthand(Vec<String>),
}

/// `remove` subcommands
#[derive(Subcommand, Debug)]
pub enum RemoveCommands {
    /// Remove a set definition
    Set {
        /// Set name
        name: String,
    },

    /// Remove a feature workspace
    Feature {
        /// Feature name
        name: String,
    },

    /// Shortcut: `remove <feature>`
    #[command(external_subcommand)]
    Shorthand(Vec<String>),
}

/// `skills` subcommands
#[derive(Subcommand, Debug)]
pub enum SkillsCommands {
    /// Show the skills directory configured for a set
    List {
        /// Set name
        set: String,
    },

    /// Set the source directory for a set's skills
    SetDir {
        /// Set name
        set: String,

        /// Source directory path
        path: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parse_no_args() {
        let cli = Cli::try_parse_from(["thicket"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_cli_verbose_flag() {
        let cli = Cli::try_parse_from(["thicket", "-v"]).unwrap();
        assert!(cli.is_verbose());
    }

    #[test]
    fn test_cli_config_option() {
        let cli = Cli::try_parse_from(["thicket", "-c", "/path/to/registry.json"]).unwrap();
        assert_eq!(cli.config.as_ref(), Some(&PathBuf::from("/path/to/registry.json")));
    }

    #[test]
    fn test_add_set() {
        let cli = Cli::try_parse_from([
            "thicket",
            "add",
            "set",
            "core",
            "git@example.com:org/api.git",
            "git@example.com:org/web.git",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Add {
                command: AddCommands::Set { name, repos },
            }) => {
                assert_eq!(name, "core");
                assert_eq!(repos.len(), 2);
            }
            _ => panic!("Expected add set command"),
        }
    }

    #[test]
    fn test_add_set_requires_repos() {
        let result = Cli::try_parse_from(["thicket", "add", "set", "core"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_add_feature() {
        let cli = Cli::try_parse_from(["thicket", "add", "feature", "core", "login"]).unwrap();
        match cli.command {
            Some(Commands::Add {
                command: AddCommands::Feature { set, feature },
            }) => {
                assert_eq!(set, "core");
                assert_eq!(feature, "login");
            }
            _ => panic!("Expected add feature command"),
        }
    }

    #[test]
    fn test_add_shorthand() {
        let cli = Cli::try_parse_from(["thicket", "add", "core", "login"]).unwrap();
        match cli.command {
            Some(Commands::Add {
                command: AddCommands::Shorthand(args),
            }) => {
                assert_eq!(args, vec!["core".to_string(), "login".to_string()]);
            }
            _ => panic!("Expected add shorthand"),
        }
    }

    #[test]
    fn test_remove_set() {
        let cli = Cli::try_parse_from(["thicket", "remove", "set", "core"]).unwrap();
        match cli.command {
            Some(Commands::Remove {
                command: RemoveCommands::Set { name },
            }) => {
                assert_eq!(name, "core");
            }
            _ => panic!("Expected remove set command"),
        }
    }

    #[test]
    fn test_remove_feature() {
        let cli = Cli::try_parse_from(["thicket", "remove", "feature", "login"]).unwrap();
        match cli.command {
            Some(Commands::Remove {
                command: RemoveCommands::Feature { name },
            }) => {
                assert_eq!(name, "login");
            }
            _ => panic!("Expected remove feature command"),
        }
    }

    #[test]
    fn test_remove_shorthand() {
        let cli = Cli::try_parse_from(["thicket", "remove", "login"]).unwrap();
        match cli.command {
            Some(Commands::Remove {
                command: RemoveCommands::Shorthand(args),
            }) => {
                assert_eq!(args, vec!["login".to_string()]);
            }
            _ => panic!("Expected remove shorthand"),
        }
    }

    #[test]
    fn test_list_command() {
        let cli = Cli::try_parse_from(["thicket", "list"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::List)));
    }

    #[test]
    fn test_status_command() {
        let cli = Cli::try_parse_from(["thicket", "status", "login"]).unwrap();
        match cli.command {
            Some(Commands::Status { feature }) => {
                assert_eq!(feature, "login");
            }
            _ => panic!("Expected status command"),
        }
    }

    #[test]
    fn test_sync_command() {
        let cli = Cli::try_parse_from(["thicket", "sync", "login"]).unwrap();
        match cli.command {
            Some(Commands::Sync { feature }) => {
                assert_eq!(feature, "login");
            }
            _ => panic!("Expected sync command"),
        }
    }

    #[test]
    fn test_exec_command() {
        let cli =
            Cli::try_parse_from(["thicket", "exec", "login", "--", "git", "log", "--oneline"])
                .unwrap();
        match cli.command {
            Some(Commands::Exec { feature, command }) => {
                assert_eq!(feature, "login");
                assert_eq!(command, vec!["git", "log", "--oneline"]);
            }
            _ => panic!("Expected exec command"),
        }
    }

    #[test]
    fn test_exec_requires_command() {
        let result = Cli::try_parse_from(["thicket", "exec", "login"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_switch_command() {
        let cli = Cli::try_parse_from(["thicket", "switch", "login"]).unwrap();
        match cli.command {
            Some(Commands::Switch { feature }) => {
                assert_eq!(feature, "login");
            }
            _ => panic!("Expected switch command"),
        }
    }

    #[test]
    fn test_init_command() {
        let cli = Cli::try_parse_from(["thicket", "init"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Init)));
    }

    #[test]
    fn test_skills_list() {
        let cli = Cli::try_parse_from(["thicket", "skills", "list", "core"]).unwrap();
        match cli.command {
            Some(Commands::Skills {
                command: SkillsCommands::List { set },
            }) => {
                assert_eq!(set, "core");
            }
            _ => panic!("Expected skills list command"),
        }
    }

    #[test]
    fn test_skills_set_dir() {
        let cli =
            Cli::try_parse_from(["thicket", "skills", "set-dir", "core", "~/skills"]).unwrap();
        match cli.command {
            Some(Commands::Skills {
                command: SkillsCommands::SetDir { set, path },
            }) => {
                assert_eq!(set, "core");
                assert_eq!(path, "~/skills");
            }
            _ => panic!("Expected skills set-dir command"),
        }
    }

    #[test]
    fn test_feature_shortcut() {
        let cli = Cli::try_parse_from(["thicket", "login"]).unwrap();
        match cli.command {
            Some(Commands::Shortcut(args)) => {
                assert_eq!(args, vec!["login".to_string()]);
            }
            _ => panic!("Expected feature shortcut"),
        }
    }

    #[test]
    fn test_feature_shortcut_with_tool() {
        let cli = Cli::try_parse_from(["thicket", "login", "make", "test"]).unwrap();
        match cli.command {
            Some(Commands::Shortcut(args)) => {
                assert_eq!(
                    args,
                    vec!["login".to_string(), "make".to_string(), "test".to_string()]
                );
            }
            _ => panic!("Expected feature shortcut"),
        }
    }

    #[test]
    fn test_help_works() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_version_flag() {
        let result = Cli::try_parse_from(["thicket", "--version"]);
        // version flag causes early exit with error (expected)
        assert!(result.is_err());
    }
}
