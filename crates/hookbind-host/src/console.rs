//! Console commands for driving the host by hand.

use hookbind_api::{
    CommandSender, HookDescriptor, HookError, PacketDirection, PacketEvent, PacketFlow,
    PluginMessage, ScriptEvent,
};
use serde_json::Value;

use crate::host::ServerHost;

/// Upper bound for `tick <n>`, so one console line cannot stall the main loop.
pub const MAX_TICKS_PER_COMMAND: u64 = 12_000;

pub const HELP: &[&str] = &[
    "event <name> [json]                                   fire an event",
    "cmd <sender> <line>                                   run a script command",
    "tab <sender> <line>                                   tab-complete a command line",
    "packet <receive|send> <type> <upstream|downstream> [json]",
    "papi <identifier> <params>                            request a placeholder",
    "msg <channel> <text>                                  deliver a plugin message",
    "publish <channel> <text>                              publish on a pub/sub channel",
    "tick [n]                                              advance the scheduler (at most 12000)",
    "list                                                  show scripts and registrations",
    "info <script>                                         show one script's registrations",
    "load <script>                                         start a stopped script",
    "reload <script>                                       unload and start a script again",
    "reloadall                                             reload every script",
    "unload <script>                                       unload a script",
    "stop                                                  shut down",
];

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Event { name: String, data: Value },
    Command { sender: String, line: String },
    Tab { sender: String, line: String },
    Packet {
        flow: PacketFlow,
        packet_type: String,
        direction: PacketDirection,
        payload: Value,
    },
    Placeholder { identifier: String, params: String },
    Message { channel: String, text: String },
    Publish { channel: String, text: String },
    Tick(u64),
    List,
    Info(String),
    Load(String),
    Reload(String),
    ReloadAll,
    Unload(String),
    Help,
    Stop,
}

/// Output of one console command.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ConsoleOutput {
    pub lines: Vec<String>,
    /// If true, the host should shut down.
    pub should_stop: bool,
}

impl ConsoleOutput {
    fn line(line: impl Into<String>) -> Self {
        Self {
            lines: vec![line.into()],
            should_stop: false,
        }
    }
}

/// Split off the first whitespace-delimited word.
fn next_word(input: &str) -> Option<(&str, &str)> {
    let input = input.trim_start();
    if input.is_empty() {
        return None;
    }
    match input.split_once(char::is_whitespace) {
        Some((word, rest)) => Some((word, rest)),
        None => Some((input, "")),
    }
}

fn parse_json(text: &str) -> Result<Value, String> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_str(text).map_err(|e| format!("invalid JSON: {e}"))
}

pub fn parse(line: &str) -> Result<ConsoleCommand, String> {
    let (word, rest) = next_word(line).ok_or("empty command")?;
    let usage = |u: &str| format!("usage: {u}");
    match word.to_ascii_lowercase().as_str() {
        "event" => {
            let (name, data) = next_word(rest).ok_or_else(|| usage("event <name> [json]"))?;
            Ok(ConsoleCommand::Event {
                name: name.to_string(),
                data: parse_json(data)?,
            })
        }
        "cmd" | "tab" => {
            let (sender, command_line) =
                next_word(rest).ok_or_else(|| usage(&format!("{word} <sender> <line>")))?;
            if command_line.trim().is_empty() {
                return Err(usage(&format!("{word} <sender> <line>")));
            }
            let sender = sender.to_string();
            // trailing whitespace matters for completion
            let line = command_line.trim_start().to_string();
            if word.eq_ignore_ascii_case("cmd") {
                Ok(ConsoleCommand::Command { sender, line })
            } else {
                Ok(ConsoleCommand::Tab { sender, line })
            }
        }
        "packet" => {
            let help = "packet <receive|send> <type> <upstream|downstream> [json]";
            let (flow, rest) = next_word(rest).ok_or_else(|| usage(help))?;
            let (packet_type, rest) = next_word(rest).ok_or_else(|| usage(help))?;
            let (direction, payload) = next_word(rest).ok_or_else(|| usage(help))?;
            let flow = match flow.to_ascii_lowercase().as_str() {
                "receive" => PacketFlow::Receive,
                "send" => PacketFlow::Send,
                other => return Err(format!("unknown packet flow '{other}'")),
            };
            let direction = PacketDirection::parse(direction)
                .ok_or_else(|| format!("unknown packet direction '{direction}'"))?;
            Ok(ConsoleCommand::Packet {
                flow,
                packet_type: packet_type.to_string(),
                direction,
                payload: parse_json(payload)?,
            })
        }
        "papi" => {
            let (identifier, params) =
                next_word(rest).ok_or_else(|| usage("papi <identifier> <params>"))?;
            Ok(ConsoleCommand::Placeholder {
                identifier: identifier.to_string(),
                params: params.trim().to_string(),
            })
        }
        "msg" | "publish" => {
            let (channel, text) =
                next_word(rest).ok_or_else(|| usage(&format!("{word} <channel> <text>")))?;
            let (channel, text) = (channel.to_string(), text.trim().to_string());
            if word.eq_ignore_ascii_case("msg") {
                Ok(ConsoleCommand::Message { channel, text })
            } else {
                Ok(ConsoleCommand::Publish { channel, text })
            }
        }
        "tick" => match next_word(rest) {
            None => Ok(ConsoleCommand::Tick(1)),
            Some((n, _)) => n
                .parse()
                .map(ConsoleCommand::Tick)
                .map_err(|_| format!("invalid tick count '{n}'")),
        },
        "list" => Ok(ConsoleCommand::List),
        "reloadall" => Ok(ConsoleCommand::ReloadAll),
        "info" | "load" | "reload" | "unload" => {
            let lowered = word.to_ascii_lowercase();
            let (script, _) =
                next_word(rest).ok_or_else(|| usage(&format!("{lowered} <script>")))?;
            let script = script.to_string();
            Ok(match lowered.as_str() {
                "info" => ConsoleCommand::Info(script),
                "load" => ConsoleCommand::Load(script),
                "reload" => ConsoleCommand::Reload(script),
                _ => ConsoleCommand::Unload(script),
            })
        }
        "help" => Ok(ConsoleCommand::Help),
        "stop" => Ok(ConsoleCommand::Stop),
        other => Err(format!("unknown command '{other}', try 'help'")),
    }
}

fn sender_for(name: &str) -> CommandSender {
    if name.eq_ignore_ascii_case("console") {
        CommandSender::console()
    } else {
        CommandSender::player(name)
    }
}

/// One-line summary of a hook.
pub fn describe_hook(descriptor: &HookDescriptor) -> String {
    match descriptor {
        HookDescriptor::Event {
            event, priority, ..
        } => format!("event {event} ({priority:?})"),
        HookDescriptor::Command(spec) => format!("command /{}", spec.name),
        HookDescriptor::Packet {
            packet_type,
            direction,
            priority,
            ..
        } => format!("packet {packet_type} {direction:?} (priority {priority})"),
        HookDescriptor::Task {
            delay, interval, ..
        } => format!("task delay={delay} interval={interval}"),
        HookDescriptor::SyncCallbackTask { delay } => format!("sync callback task delay={delay}"),
        HookDescriptor::Placeholder { identifier, .. } => {
            format!("placeholder %{}%", identifier.as_deref().unwrap_or("?"))
        }
        HookDescriptor::PluginMessage { channel } => format!("plugin messages on {channel}"),
        HookDescriptor::PubSub { channel, mode } => format!("pub/sub {channel} ({mode:?})"),
    }
}

/// A script's state line followed by one line per registration.
fn script_lines(host: &ServerHost, name: &str, lines: &mut Vec<String>) {
    if let Some(info) = host.scripts().info(name) {
        let state = if host.scripts().is_running(name) {
            "running"
        } else {
            "stopped"
        };
        lines.push(format!("{} v{} [{state}] {}", info.name, info.version, info.description));
    }
    for id in host.facade().registrations(name) {
        if let Some(registration) = host.facade().describe(id) {
            let pending = if registration.active { "" } else { " (pending)" };
            lines.push(format!("  {id} {}{pending}", describe_hook(registration.descriptor)));
        }
    }
}

fn lifecycle_result(verb: &str, script: &str, result: Result<(), HookError>) -> ConsoleOutput {
    match result {
        Ok(()) => ConsoleOutput::line(format!("{verb} {script}")),
        Err(e) => ConsoleOutput::line(format!("could not {verb} {script}: {e}")),
    }
}

/// Run a parsed console command against the host.
pub fn execute(host: &mut ServerHost, command: ConsoleCommand) -> ConsoleOutput {
    match command {
        ConsoleCommand::Event { name, data } => {
            let mut event = ScriptEvent::cancellable(name, data);
            host.fire_event(&mut event);
            ConsoleOutput::line(format!(
                "{} dispatched{}",
                event.name,
                if event.is_cancelled() { " (cancelled)" } else { "" }
            ))
        }
        ConsoleCommand::Command { sender, line } => {
            match host.run_command(&sender_for(&sender), &line) {
                Some(result) if result.messages.is_empty() => {
                    ConsoleOutput::line(if result.success { "ok" } else { "failed" })
                }
                Some(result) => ConsoleOutput {
                    lines: result.messages,
                    should_stop: false,
                },
                None => ConsoleOutput::line(format!("Unknown command: {line}")),
            }
        }
        ConsoleCommand::Tab { sender, line } => {
            let completions = host.tab_complete(&sender_for(&sender), &line);
            ConsoleOutput::line(format!("[{}]", completions.join(", ")))
        }
        ConsoleCommand::Packet {
            flow,
            packet_type,
            direction,
            payload,
        } => {
            let mut packet = PacketEvent::new(packet_type, direction, flow, payload);
            host.intercept_packet(&mut packet);
            ConsoleOutput::line(format!(
                "{} {:?} {:?}: {}",
                packet.packet_type,
                packet.direction,
                packet.flow,
                if packet.is_cancelled() { "cancelled" } else { "passed" }
            ))
        }
        ConsoleCommand::Placeholder { identifier, params } => {
            match host.request_placeholder(&identifier, None, &params) {
                Some(value) => ConsoleOutput::line(value),
                None => ConsoleOutput::line(format!("%{identifier}_{params}% has no value")),
            }
        }
        ConsoleCommand::Message { channel, text } => {
            host.deliver_message(&PluginMessage {
                channel: channel.clone(),
                player: None,
                payload: text.into_bytes(),
            });
            ConsoleOutput::line(format!("delivered on {channel}"))
        }
        ConsoleCommand::Publish { channel, text } => match host.publish(&channel, &text) {
            Some(reached) => {
                ConsoleOutput::line(format!("published on {channel} to {reached} listeners"))
            }
            None => ConsoleOutput::line("pub/sub integration is disabled"),
        },
        ConsoleCommand::Tick(n) => {
            let ticks = n.min(MAX_TICKS_PER_COMMAND);
            for _ in 0..ticks {
                host.tick();
            }
            let mut output = ConsoleOutput::line(format!("tick {}", host.current_tick()));
            if ticks < n {
                output
                    .lines
                    .push(format!("ran {ticks} of {n} ticks, the limit per command"));
            }
            output
        }
        ConsoleCommand::List => {
            let names: Vec<String> = host.scripts().infos().iter().map(|i| i.name.clone()).collect();
            let mut lines = Vec::new();
            for name in &names {
                script_lines(host, name, &mut lines);
            }
            if lines.is_empty() {
                lines.push("no scripts".into());
            }
            ConsoleOutput {
                lines,
                should_stop: false,
            }
        }
        ConsoleCommand::Info(script) => {
            let mut lines = Vec::new();
            script_lines(host, &script, &mut lines);
            if lines.is_empty() {
                lines.push(format!("no script or registrations named {script}"));
            }
            ConsoleOutput {
                lines,
                should_stop: false,
            }
        }
        ConsoleCommand::Load(script) => {
            if host.scripts().is_running(&script) {
                return ConsoleOutput::line(format!("{script} is already running"));
            }
            let result = host.load(&script);
            lifecycle_result("load", &script, result)
        }
        ConsoleCommand::Reload(script) => {
            let result = host.reload(&script);
            lifecycle_result("reload", &script, result)
        }
        ConsoleCommand::ReloadAll => {
            let failures = host.reload_all();
            let mut lines = vec![format!("{} scripts running", host.scripts().running().len())];
            lines.extend(
                failures
                    .into_iter()
                    .map(|(name, e)| format!("{name} failed to start: {e}")),
            );
            ConsoleOutput {
                lines,
                should_stop: false,
            }
        }
        ConsoleCommand::Unload(script) => {
            if host.unload(&script) {
                ConsoleOutput::line(format!("unloaded {script}"))
            } else {
                ConsoleOutput::line(format!("{script} is not running"))
            }
        }
        ConsoleCommand::Help => ConsoleOutput {
            lines: HELP.iter().map(|l| l.to_string()).collect(),
            should_stop: false,
        },
        ConsoleCommand::Stop => ConsoleOutput {
            lines: vec!["stopping".into()],
            should_stop: true,
        },
    }
}

/// Parse and run one console line.
pub fn handle_line(host: &mut ServerHost, line: &str) -> ConsoleOutput {
    match parse(line) {
        Ok(command) => execute(host, command),
        Err(e) => ConsoleOutput::line(e),
    }
}
