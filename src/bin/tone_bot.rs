//! Telegram front end: answers voice messages with the predicted tone.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{ensure, Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tonalyzer::bot::telegram::{run_polling, TelegramTransport};
use tonalyzer::bot::ToneBot;
use tonalyzer::config::BotConfig;
use tonalyzer::features::FeatureExtractor;
use tonalyzer::model::{OnnxToneModel, ToneClassifier};

#[derive(Parser, Debug)]
#[command(name = "tone-bot", version, about = "Telegram bot for tone classification")]
struct Args {
    /// TOML config with [telegram], [model], and [paths] tables
    #[arg(long, short, default_value = "bot.toml")]
    config: PathBuf,

    /// Bot token; overrides the one in the config file
    #[arg(long, env = "TONE_BOT_TOKEN", hide_env_values = true)]
    token: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tonalyzer=info,tone_bot=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = BotConfig::load(&args.config)?.with_token(args.token);
    ensure!(
        !config.telegram.token.trim().is_empty(),
        "No bot token configured; set [telegram] token or TONE_BOT_TOKEN"
    );

    tokio::fs::create_dir_all(&config.paths.temp_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create temp directory {}",
                config.paths.temp_dir.display()
            )
        })?;

    // A missing model is not fatal; voice messages get an explanation instead.
    let classifier: Option<Arc<dyn ToneClassifier>> =
        match OnnxToneModel::load(&config.model.model_path) {
            Ok(model) => Some(Arc::new(model)),
            Err(err) => {
                error!(
                    model = %config.model.model_path.display(),
                    error = %err,
                    "failed to load tone model"
                );
                None
            }
        };

    let allowed_chats = config.allowed_chats();
    if allowed_chats.is_empty() {
        warn!("allowed_chat_ids is empty; the bot will answer every chat");
    } else {
        info!(chats = allowed_chats.len(), "access restricted to allow-list");
    }

    let bot = Arc::new(ToneBot::new(
        classifier,
        FeatureExtractor::default(),
        config.model.class_names.clone(),
        allowed_chats,
        config.paths.temp_dir.clone(),
    ));
    let transport = Arc::new(TelegramTransport::new(&config.telegram.token)?);

    info!(
        classes = config.model.class_names.len(),
        model_loaded = bot.model_loaded(),
        "starting tone bot"
    );
    run_polling(bot, transport).await
}
