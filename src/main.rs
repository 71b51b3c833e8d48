use std::process;
use std::sync::Arc;

use clap::Parser;

use grove::cli::{Cli, Commands, SelectorArgs, WorkspaceCommands};
use grove::config::{Config, set_config_path};
use grove::error::Error;
use grove::forge::GhCliForge;
use grove::fs::OsFilesystem;
use grove::git::CliGit;
use grove::ide::CommandIde;
use grove::init::{self, InitOptions};
use grove::orchestrator::{OperationOptions, Orchestrator, Ports};
use grove::prompt::TerminalPrompt;
use grove::status::{FileBackend, StatusStore};

fn ports() -> Ports {
    Ports {
        fs: Arc::new(OsFilesystem::new()),
        git: Arc::new(CliGit::new()),
        prompt: Arc::new(TerminalPrompt::new()),
        ide: Arc::new(CommandIde::new()),
        forge: Arc::new(GhCliForge::new()),
    }
}

fn orchestrator(non_interactive: bool) -> Result<Orchestrator, Error> {
    let mut config = Config::load()?;
    if non_interactive {
        config.non_interactive = true;
    }
    let store = StatusStore::open(Box::new(FileBackend::open(&config.status_file)?))?;
    Ok(Orchestrator::new(config, ports(), store))
}

fn selector_options(selectors: &SelectorArgs) -> OperationOptions {
    OperationOptions {
        workspace_name: selectors.workspace.clone(),
        repository_name: selectors.repository.clone(),
        ..Default::default()
    }
}

fn run(cli: Cli) -> Result<(), Error> {
    match cli.command {
        Commands::Init {
            base_path,
            reset,
            force,
        } => {
            let ports = ports();
            let opts = InitOptions {
                base_path,
                reset,
                force,
                non_interactive: cli.non_interactive,
            };
            let config = init::run(&*ports.fs, &*ports.prompt, &opts)?;
            if reset {
                println!("Status document reset.");
            } else {
                println!(
                    "Initialized. Repositories under {}, workspaces under {}.",
                    config.repositories_dir.display(),
                    config.workspaces_dir.display()
                );
            }
            Ok(())
        }

        Commands::Clone { url } => {
            let mut orchestrator = orchestrator(cli.non_interactive)?;
            let path = orchestrator.clone_repository(&url, &[])?;
            println!("{}", path.display());
            Ok(())
        }

        Commands::Create {
            branch,
            force,
            remote,
            issue,
            ide,
            selectors,
        } => {
            let mut orchestrator = orchestrator(cli.non_interactive)?;
            let bundles = [
                selector_options(&selectors),
                OperationOptions {
                    force: Some(force),
                    remote,
                    issue,
                    ide,
                    ..Default::default()
                },
            ];
            let path = orchestrator.create_worktree(branch.as_deref(), &bundles)?;
            println!("{}", path.display());
            Ok(())
        }

        Commands::Load {
            source,
            ide,
            selectors,
        } => {
            let mut orchestrator = orchestrator(cli.non_interactive)?;
            let bundles = [
                selector_options(&selectors),
                OperationOptions {
                    ide,
                    ..Default::default()
                },
            ];
            let path = orchestrator.load_worktree(&source, &bundles)?;
            println!("{}", path.display());
            Ok(())
        }

        Commands::Delete {
            branch,
            all,
            force,
            selectors,
        } => {
            let mut orchestrator = orchestrator(cli.non_interactive)?;
            let bundles = [
                selector_options(&selectors),
                OperationOptions {
                    force: Some(force),
                    ..Default::default()
                },
            ];
            if all {
                orchestrator.delete_all_worktrees(&bundles)
            } else {
                // clap guarantees the branch when --all is absent.
                let branch = branch.ok_or_else(|| Error::InvalidInput {
                    reason: "a branch name is required".to_string(),
                })?;
                orchestrator.delete_worktree(&branch, &bundles)
            }
        }

        Commands::List { selectors } => {
            let mut orchestrator = orchestrator(cli.non_interactive)?;
            let rows = orchestrator.list_worktrees(&[selector_options(&selectors)])?;
            if rows.is_empty() {
                println!("No worktrees.");
                return Ok(());
            }
            for row in rows {
                println!(
                    "{}  {}:{}  {}",
                    row.repository,
                    row.info.remote,
                    row.info.branch,
                    row.path.display()
                );
            }
            Ok(())
        }

        Commands::Open {
            branch,
            ide,
            selectors,
        } => {
            let mut orchestrator = orchestrator(cli.non_interactive)?;
            let bundles = [
                selector_options(&selectors),
                OperationOptions {
                    ide,
                    ..Default::default()
                },
            ];
            let path = orchestrator.open_worktree(&branch, &bundles)?;
            println!("{}", path.display());
            Ok(())
        }

        Commands::Repos => {
            let mut orchestrator = orchestrator(cli.non_interactive)?;
            let rows = orchestrator.list_repositories()?;
            if rows.is_empty() {
                println!("No repositories tracked.");
                return Ok(());
            }
            for row in rows {
                println!(
                    "{}  {} worktree(s)  {}",
                    row.id,
                    row.worktree_count,
                    row.path.display()
                );
            }
            Ok(())
        }

        Commands::Workspace(command) => {
            let mut orchestrator = orchestrator(cli.non_interactive)?;
            match command {
                WorkspaceCommands::Create { name, repositories } => {
                    let file = orchestrator.create_workspace(&name, &repositories, &[])?;
                    println!("{}", file.display());
                    Ok(())
                }
                WorkspaceCommands::Delete { name, force } => {
                    let bundles = [OperationOptions {
                        force: Some(force),
                        ..Default::default()
                    }];
                    orchestrator.delete_workspace(&name, &bundles)
                }
                WorkspaceCommands::List => {
                    let rows = orchestrator.list_workspaces()?;
                    if rows.is_empty() {
                        println!("No workspaces.");
                        return Ok(());
                    }
                    for row in rows {
                        println!(
                            "{}  [{}]  {} worktree(s)",
                            row.name,
                            row.repositories.join(", "),
                            row.worktrees.len()
                        );
                    }
                    Ok(())
                }
            }
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if let Some(path) = cli.config.clone() {
        set_config_path(path);
    }

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if cli.verbose { "debug" } else { "off" }),
    )
    .format_timestamp(None)
    .init();

    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        process::exit(e.exit_code());
    }
}
