//! Command map: script commands by case-insensitive name and alias.

use std::collections::{BTreeMap, HashMap};

use hookbind_api::{
    CommandFn, CommandInvocation, CommandManager, CommandSender, CommandSpec, HookError,
    NativeHandle, TabFn,
};

use crate::actions::{with_api, PendingAction};

pub const NO_PERMISSION: &str = "You do not have permission to use this command.";

/// Result of running a command line.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CommandResult {
    /// Whether the command executed successfully.
    pub success: bool,
    /// Messages to send back to the command sender.
    pub messages: Vec<String>,
    /// Side effects the command's callback queued.
    pub actions: Vec<PendingAction>,
}

impl CommandResult {
    pub fn ok(actions: Vec<PendingAction>) -> Self {
        Self {
            success: true,
            messages: Vec::new(),
            actions,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            messages: vec![message.into()],
            actions: Vec::new(),
        }
    }
}

struct RegisteredCommand {
    script: String,
    spec: CommandSpec,
    run: CommandFn,
    tab: Option<TabFn>,
}

#[derive(Default)]
pub struct CommandMap {
    next_handle: u64,
    commands: BTreeMap<u64, RegisteredCommand>,
    /// lowercase label → handle
    labels: HashMap<String, u64>,
}

impl CommandMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Split `line` into label and arguments and run the matching command.
    ///
    /// Returns `None` if no script command owns the label.
    pub fn execute(&mut self, sender: &CommandSender, line: &str, tick: u64) -> Option<CommandResult> {
        let invocation = parse_line(sender, line, false)?;
        let handle = *self.labels.get(&invocation.label)?;
        let command = self.commands.get_mut(&handle)?;

        if let Some(node) = &command.spec.permission {
            if !sender.has_permission(node) {
                return Some(CommandResult::err(NO_PERMISSION));
            }
        }

        let run = &mut command.run;
        let (success, actions) = with_api(&command.script, tick, |api| run(&invocation, api));
        if success {
            Some(CommandResult::ok(actions))
        } else {
            let usage = if command.spec.usage.is_empty() {
                format!("/{}", command.spec.name)
            } else {
                command.spec.usage.clone()
            };
            Some(CommandResult {
                success: false,
                messages: vec![format!("Usage: {usage}")],
                actions,
            })
        }
    }

    /// Completions for a partial command line. Empty when the command has
    /// no tab function or the sender lacks permission.
    pub fn tab_complete(&mut self, sender: &CommandSender, line: &str, tick: u64) -> Vec<String> {
        let Some(invocation) = parse_line(sender, line, true) else {
            return Vec::new();
        };
        let Some(command) = self
            .labels
            .get(&invocation.label)
            .and_then(|handle| self.commands.get_mut(handle))
        else {
            return Vec::new();
        };
        if let Some(node) = &command.spec.permission {
            if !sender.has_permission(node) {
                return Vec::new();
            }
        }
        let script = command.script.clone();
        match command.tab.as_mut() {
            Some(tab) => with_api(&script, tick, |api| tab(&invocation, api)).0,
            None => Vec::new(),
        }
    }

    /// (label, owning script) pairs, sorted by label.
    pub fn labels(&self) -> Vec<(String, String)> {
        let mut labels: Vec<(String, String)> = self
            .labels
            .iter()
            .filter_map(|(label, handle)| {
                self.commands
                    .get(handle)
                    .map(|c| (label.clone(), c.script.clone()))
            })
            .collect();
        labels.sort();
        labels
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }
}

impl CommandManager for CommandMap {
    fn register_command(
        &mut self,
        script: &str,
        spec: &CommandSpec,
        callback: CommandFn,
        tab: Option<TabFn>,
    ) -> Result<NativeHandle, HookError> {
        let labels: Vec<String> = spec.labels().map(str::to_lowercase).collect();
        for label in &labels {
            if let Some(owner) = self.labels.get(label).and_then(|h| self.commands.get(h)) {
                return Err(HookError::CommandConflict {
                    label: label.clone(),
                    owner: owner.script.clone(),
                });
            }
        }

        self.next_handle += 1;
        let handle = self.next_handle;
        for label in labels {
            self.labels.insert(label, handle);
        }
        self.commands.insert(
            handle,
            RegisteredCommand {
                script: script.to_string(),
                spec: spec.clone(),
                run: callback,
                tab,
            },
        );
        Ok(NativeHandle(handle))
    }

    fn set_tab_function(&mut self, handle: NativeHandle, tab: TabFn) -> bool {
        match self.commands.get_mut(&handle.0) {
            Some(command) => {
                command.tab = Some(tab);
                true
            }
            None => false,
        }
    }

    fn unregister_command(&mut self, handle: NativeHandle) -> bool {
        if self.commands.remove(&handle.0).is_none() {
            return false;
        }
        self.labels.retain(|_, h| *h != handle.0);
        true
    }
}

/// With `completing` set, a line ending in whitespace gets an empty last
/// argument: the word being completed has not been started yet.
fn parse_line(sender: &CommandSender, line: &str, completing: bool) -> Option<CommandInvocation> {
    let line = line.trim_start().trim_start_matches('/');
    let mut parts = line.split_whitespace();
    let label = parts.next()?.to_lowercase();
    let mut args: Vec<String> = parts.map(str::to_string).collect();
    if completing && line.ends_with(char::is_whitespace) {
        args.push(String::new());
    }
    Some(CommandInvocation {
        sender: sender.clone(),
        label,
        args,
    })
}
