// src/cli/dispatcher.rs

use crate::{cli::handlers, context::AppContext, options::Options};
use anyhow::Result;

/// A command, when it applies, and its handler.
struct CommandDefinition {
    name: &'static str,
    applies: fn(&Options) -> bool,
    handler: fn(&AppContext) -> Result<()>,
}

/// Checked in order; the first command that applies runs.
static COMMAND_REGISTRY: &[CommandDefinition] = &[
    CommandDefinition {
        name: "configure",
        applies: wants_configure,
        handler: handlers::configure::handle,
    },
    CommandDefinition {
        name: "edit",
        applies: wants_edit,
        handler: handlers::edit::handle,
    },
    CommandDefinition {
        name: "show",
        applies: always,
        handler: handlers::show::handle,
    },
];

fn wants_configure(options: &Options) -> bool {
    options.configure
}

fn wants_edit(options: &Options) -> bool {
    options.edit_params.is_some()
}

fn always(_: &Options) -> bool {
    true
}

fn find_command(options: &Options) -> Option<&'static CommandDefinition> {
    COMMAND_REGISTRY.iter().find(|cmd| (cmd.applies)(options))
}

/// Runs the command selected by the context's options.
pub fn dispatch(context: &AppContext) -> Result<()> {
    match find_command(context.options()) {
        Some(command) => {
            log::debug!("Dispatching to '{}'.", command.name);
            (command.handler)(context)
        }
        None => Ok(()),
    }
}
