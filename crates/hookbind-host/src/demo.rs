//! Built-in demo scripts.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use hookbind_api::{CommandSpec, EventPriority, HookError, LogLevel, PacketDirection};
use hookbind_core::{Hooks, Script, ScriptInfo};

/// Every demo script, in no particular order.
pub fn all() -> Vec<Box<dyn Script>> {
    vec![
        Box::new(WelcomeScript::default()),
        Box::new(AnnouncerScript),
        Box::new(ChatFilterScript),
    ]
}

// ─── welcome ─────────────────────────────────────────────────────────────────

const WELCOME_DEFAULTS: &str = r#"
greeting = "Welcome to the server, {player}!"
"#;

/// Greets joining players, counts joins and exposes `%script:welcome_joins%`.
#[derive(Default)]
pub struct WelcomeScript {
    joins: Rc<Cell<u32>>,
}

impl Script for WelcomeScript {
    fn info(&self) -> ScriptInfo {
        ScriptInfo::new("welcome", "1.0.0", "Greets players when they join")
    }

    fn on_start(&mut self, hooks: &mut Hooks<'_>) -> Result<(), HookError> {
        let config = hooks
            .config()
            .load_config("welcome/config.toml", Some(WELCOME_DEFAULTS))?;
        hooks.config().save_config(&config)?;
        let greeting: String = config.get_or("greeting", "Welcome, {player}!".to_string());

        let seen: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));

        let (joins, names, template) = (self.joins.clone(), seen.clone(), greeting.clone());
        hooks.event_listener("PlayerJoinEvent", EventPriority::Monitor, move |event, api| {
            let Some(player) = event.data["player"].as_str() else {
                return;
            };
            joins.set(joins.get() + 1);
            if !names.borrow().iter().any(|n| n == player) {
                names.borrow_mut().push(player.to_string());
            }
            api.send_message(player, &template.replace("{player}", player));
        })?;

        let template = greeting;
        hooks.command(
            CommandSpec::new("welcome")
                .alias("greet")
                .description("Greet a player again")
                .usage("/welcome <player>")
                .permission("hookbind.welcome"),
            move |invocation, api| match invocation.args.first() {
                Some(player) => {
                    api.send_message(player, &template.replace("{player}", player));
                    true
                }
                None => false,
            },
        )?;
        hooks.tab("welcome", move |invocation, _| {
            let prefix = invocation.args.last().map(String::as_str).unwrap_or("");
            seen.borrow()
                .iter()
                .filter(|n| n.starts_with(prefix))
                .cloned()
                .collect()
        })?;

        let joins = self.joins.clone();
        hooks.placeholder(move |request| match request.params.as_str() {
            "joins" => Some(joins.get().to_string()),
            _ => None,
        })?;
        Ok(())
    }

    fn on_stop(&mut self) {
        self.joins.set(0);
    }
}

// ─── announcer ───────────────────────────────────────────────────────────────

const ANNOUNCER_DEFAULTS: &str = r#"
interval = 1200
messages = [
    "Remember to vote for the server!",
    "Type /welcome <player> to greet a friend.",
]
"#;

/// Broadcasts a rotating message on a repeating task, and relays text sent
/// on the `hookbind:announce` channel.
pub struct AnnouncerScript;

impl Script for AnnouncerScript {
    fn info(&self) -> ScriptInfo {
        ScriptInfo::new("announcer", "1.0.0", "Periodic broadcast messages")
    }

    fn on_start(&mut self, hooks: &mut Hooks<'_>) -> Result<(), HookError> {
        let config = hooks
            .config()
            .load_config("announcer.toml", Some(ANNOUNCER_DEFAULTS))?;
        let interval: i64 = config.get_or("interval", 1200);
        let messages: Vec<String> = config.get_or("messages", Vec::new());

        if !messages.is_empty() {
            let mut next = 0;
            hooks.task(interval, interval, move |api| {
                api.broadcast_message(&messages[next % messages.len()]);
                next += 1;
            })?;
        }

        hooks.plugin_message_listener("hookbind:announce", |message, api| {
            let text = String::from_utf8_lossy(&message.payload);
            api.broadcast_message(&text);
        })?;
        Ok(())
    }
}

// ─── chat-filter ─────────────────────────────────────────────────────────────

const CHAT_FILTER_DEFAULTS: &str = r#"
blocked = ["griefing", "hacks"]
"#;

/// Drops incoming chat packets containing blocked words. Needs the protocol
/// integration.
pub struct ChatFilterScript;

impl Script for ChatFilterScript {
    fn info(&self) -> ScriptInfo {
        ScriptInfo::new("chat-filter", "1.0.0", "Blocks chat containing banned words")
    }

    fn on_start(&mut self, hooks: &mut Hooks<'_>) -> Result<(), HookError> {
        let config = hooks
            .config()
            .load_config("chat-filter.toml", Some(CHAT_FILTER_DEFAULTS))?;
        let blocked: Vec<String> = config.get_or("blocked", Vec::new());

        let filter = hooks.packet_listener_receive(
            "Chat",
            PacketDirection::Upstream,
            0,
            move |packet, api| {
                let text = packet.payload["text"].as_str().unwrap_or("").to_lowercase();
                if blocked.iter().any(|word| text.contains(word.as_str())) {
                    packet.set_cancelled(true);
                    if let Some(player) = packet.player.as_deref() {
                        api.send_message(player, "Your message was blocked.");
                    }
                }
            },
        )?;
        hooks.pair_with(filter, |packet, api| {
            api.log(LogLevel::Debug, &format!("outgoing chat {}", packet.payload));
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HostConfig;
    use crate::host::{Delivery, ServerHost};
    use crate::script_options::ScriptOptionsFile;
    use hookbind_api::{CommandSender, PacketEvent, PacketFlow, PluginMessage, ScriptEvent};
    use serde_json::json;
    use std::path::PathBuf;

    fn demo_host(name: &str, protocol: bool) -> (ServerHost, PathBuf) {
        let dir = std::env::temp_dir().join(format!("hookbind_test_demo_{name}"));
        let _ = std::fs::remove_dir_all(&dir);
        let mut config = HostConfig::default();
        config.integrations.protocol = protocol;
        config.paths.configs = dir.to_string_lossy().into_owned();
        let mut host = ServerHost::new(&config, ScriptOptionsFile::default());
        for script in all() {
            host.add_script(script);
        }
        (host, dir)
    }

    #[test]
    fn welcome_greets_and_counts() {
        let (mut host, dir) = demo_host("welcome", true);
        assert!(host.start_all().is_empty());
        assert!(dir.join("welcome/config.toml").exists());

        let mut join = ScriptEvent::new("PlayerJoinEvent", json!({ "player": "Alice" }));
        host.fire_event(&mut join);
        assert_eq!(
            host.drain_outbox(),
            vec![Delivery {
                target: Some("Alice".into()),
                message: "Welcome to the server, Alice!".into()
            }]
        );
        assert_eq!(host.request_placeholder("script:welcome", None, "joins"), Some("1".into()));

        let console = CommandSender::console();
        assert_eq!(host.tab_complete(&console, "greet Al"), vec!["Alice"]);
        let denied = host
            .run_command(&CommandSender::player("Bob"), "welcome Alice")
            .unwrap();
        assert!(!denied.success);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn announcer_rotates_messages() {
        let (mut host, dir) = demo_host("announcer", true);
        host.start_all();
        for _ in 0..2400 {
            host.tick();
        }
        let messages: Vec<String> = host.drain_outbox().into_iter().map(|d| d.message).collect();
        assert_eq!(
            messages,
            vec![
                "Remember to vote for the server!".to_string(),
                "Type /welcome <player> to greet a friend.".to_string(),
            ]
        );

        host.deliver_message(&PluginMessage {
            channel: "hookbind:announce".into(),
            player: None,
            payload: b"Restart in 5 minutes".to_vec(),
        });
        assert_eq!(host.drain_outbox()[0].message, "Restart in 5 minutes");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn chat_filter_blocks_words() {
        let (mut host, dir) = demo_host("filter", true);
        assert!(host.start_all().is_empty());

        let mut chat = PacketEvent::new(
            "Chat",
            PacketDirection::Upstream,
            PacketFlow::Receive,
            json!({ "text": "free HACKS here" }),
        )
        .with_player("Mallory");
        host.intercept_packet(&mut chat);
        assert!(chat.is_cancelled());
        assert_eq!(host.drain_outbox()[0].target.as_deref(), Some("Mallory"));

        let mut clean = PacketEvent::new(
            "Chat",
            PacketDirection::Upstream,
            PacketFlow::Receive,
            json!({ "text": "hello" }),
        );
        host.intercept_packet(&mut clean);
        assert!(!clean.is_cancelled());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn chat_filter_needs_protocol() {
        let (mut host, dir) = demo_host("no_protocol", false);
        let failures = host.start_all();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "chat-filter");
        assert!(host.scripts().is_running("welcome"));
        assert!(host.scripts().is_running("announcer"));
        assert!(host.facade().registrations("chat-filter").is_empty());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
