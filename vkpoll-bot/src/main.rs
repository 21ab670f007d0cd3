//! vkpoll-bot: answers every inbound VK message with a Dialogflow reply.
//!
//! # Setup
//! ```text
//! VK_TOKEN=… AI_TOKEN=… [AI_LANG=ru] cargo run -p vkpoll-bot
//! ```

mod responder;

use chrono::Utc;
use vkpoll_client::events::MessageAdded;
use vkpoll_client::{CancellationToken, Client, Config, HandlerError, MessageHandler};

use responder::Responder;

const DEFAULT_LANG: &str = "ru";

struct Bot {
    client:    Client,
    responder: Responder,
}

impl MessageHandler for Bot {
    async fn handle_message(&self, msg: MessageAdded) -> Result<(), HandlerError> {
        let lag = msg.sent_at().map(|t| (Utc::now() - t).num_seconds()).unwrap_or_default();
        log::info!("[vkpoll-bot] ← {} (msg {}, {lag}s ago): {}", msg.user_id, msg.id, msg.text);

        let answer = self.responder.reply(msg.user_id, &msg.text).await;
        self.client.send_message(msg.user_id, &answer, &[]).await?;
        log::info!("[vkpoll-bot] → {}: {answer}", msg.user_id);
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("vkpoll_client=info,vkpoll_bot=info"),
    )
    .init();

    if let Err(e) = run().await {
        log::error!("[vkpoll-bot] {e}");
        eprintln!("✗ {e}");
        std::process::exit(1);
    }
}

fn require_env(name: &str) -> String {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => v,
        _ => {
            eprintln!("Set {name} in the environment (VK_TOKEN, AI_TOKEN, optional AI_LANG)");
            std::process::exit(1);
        }
    }
}

/// Agent language; Russian unless `AI_LANG` names another.
fn agent_lang(var: Option<String>) -> String {
    var.filter(|v| !v.trim().is_empty()).unwrap_or_else(|| DEFAULT_LANG.to_string())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let vk_token = require_env("VK_TOKEN");
    let ai_token = require_env("AI_TOKEN");
    let lang = agent_lang(std::env::var("AI_LANG").ok());

    let client = Client::connect(Config { access_token: vk_token, ..Default::default() })?;
    let bot = Bot { client: client.clone(), responder: Responder::new(ai_token, lang)? };

    let token = CancellationToken::new();
    let mut poller = {
        let token = token.clone();
        tokio::spawn(async move { client.run(&bot, token).await })
    };

    println!("👂 Listening for messages… (Ctrl+C to quit)");
    tokio::select! {
        res = &mut poller => return Ok(res??),
        sig = tokio::signal::ctrl_c() => {
            sig?;
            println!("\n🛑 Stopping…");
            token.cancel();
        }
    }
    poller.await??;
    Ok(())
}
