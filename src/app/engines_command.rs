use super::{cli_manager, command::Command};
use anyhow::Result;
use clap::{App, AppSettings, ArgMatches, SubCommand};
use satbridge::sat::EngineKind;
use std::path::PathBuf;

const CMD_NAME: &str = "engines";

pub(crate) struct EnginesCommand;

impl EnginesCommand {
    pub(crate) fn new() -> Self {
        EnginesCommand
    }
}

impl<'a> Command<'a> for EnginesCommand {
    fn name(&self) -> &str {
        CMD_NAME
    }

    fn clap_subcommand(&self) -> App<'a, 'a> {
        SubCommand::with_name(CMD_NAME)
            .about("Displays the engines that can back a session")
            .setting(AppSettings::DisableVersion)
            .arg(cli_manager::logging_level_cli_arg())
    }

    fn execute(&self, _arg_matches: &ArgMatches<'_>) -> Result<()> {
        let parameterized = vec![
            (
                EngineKind::External {
                    program: String::new(),
                    options: vec![],
                },
                "--external-sat-solver",
            ),
            (
                EngineKind::Ipasir {
                    library: PathBuf::new(),
                },
                "--ipasir-library",
            ),
        ];
        EngineKind::in_process()
            .into_iter()
            .map(|k| (k, ""))
            .chain(parameterized)
            .for_each(|(kind, required)| {
                if required.is_empty() {
                    println!("{} ({} codec)", kind, kind.codec());
                } else {
                    println!("{} ({} codec, requires {})", kind, kind.codec(), required);
                }
            });
        Ok(())
    }
}
