//! Veilpost command line decryption.
//!
//! # Usage
//!
//! ```bash
//! # Decrypt a tweet as bob, trusting the page that alice wrote it
//! veilpost --fixture install.json --network twitter --profile bob --author alice \
//!     --text "look https://veilpost.io/?PostData=..."
//!
//! # Decrypt an image post
//! veilpost --fixture install.json --network facebook --profile bob --author alice \
//!     --image post.png
//!
//! # Decrypt a raw envelope
//! veilpost --fixture install.json --profile bob --payload a46176...
//! ```
//!
//! Each progress event is printed on its own line. The exit status is zero
//! only if the post was decrypted.

use std::{io::Write, path::PathBuf, process::ExitCode, time::Duration};

use clap::{ArgGroup, Parser};
use futures_util::StreamExt;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use veilpost_cli::{Fixture, report};
use veilpost_core::{DecryptProgress, DecryptionConfig, DecryptionContext, EncodedPayload};
use veilpost_proto::{ProfileIdentifier, SocialNetwork};

/// Veilpost post decryption
#[derive(Parser, Debug)]
#[command(name = "veilpost")]
#[command(about = "Decrypt veilpost posts against a fixture installation")]
#[command(version)]
#[command(group(
    ArgGroup::new("input").required(true).args(["text", "image", "image_url", "payload"])
))]
struct Args {
    /// Installation fixture (JSON)
    #[arg(short, long)]
    fixture: PathBuf,

    /// Social network the post was found on
    #[arg(short, long, default_value = "facebook")]
    network: SocialNetwork,

    /// Signed-in profile: user id, or full `person:` identifier
    #[arg(short, long)]
    profile: Option<String>,

    /// Author the page attributes the post to: user id, or full `person:`
    /// identifier
    #[arg(short, long)]
    author: Option<String>,

    /// Page the post was found on
    #[arg(long)]
    url: Option<String>,

    /// Post text
    #[arg(long)]
    text: Option<String>,

    /// Image file carrying a hidden payload
    #[arg(long)]
    image: Option<PathBuf>,

    /// Image URL carrying a hidden payload
    #[arg(long)]
    image_url: Option<String>,

    /// Raw envelope, hex
    #[arg(long)]
    payload: Option<String>,

    /// Give up after this many seconds
    #[arg(long, default_value = "60")]
    timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn profile(network: SocialNetwork, text: &str) -> ProfileIdentifier {
    text.parse().unwrap_or_else(|_| ProfileIdentifier::new(network.profile_domain(), text))
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let fixture = Fixture::load(&args.fixture).await?;
    let config = DecryptionConfig {
        default_timeout: Duration::from_secs(args.timeout_secs),
        ..Default::default()
    };
    let installation = fixture.install(args.network, config).await?;
    tracing::info!(network = args.network.name(), "installation ready");

    let mut context = DecryptionContext::new(args.network);
    if let Some(user) = &args.profile {
        context = context.with_current_profile(profile(args.network, user));
    }
    if let Some(author) = &args.author {
        context = context.with_author_hint(profile(args.network, author));
    }
    if let Some(url) = args.url {
        context = context.with_post_url(url);
    }

    let engine = &installation.engine;
    let mut progress = if let Some(payload) = &args.payload {
        engine.decrypt(&hex::decode(payload)?, context, None)?
    } else {
        let encoded = if let Some(text) = args.text {
            EncodedPayload::Text(text)
        } else if let Some(path) = &args.image {
            EncodedPayload::Image(tokio::fs::read(path).await?)
        } else if let Some(url) = args.image_url {
            EncodedPayload::ImageUrl(url)
        } else {
            return Err("no input given".into());
        };
        engine.decrypt_with_social_network_decoding(encoded, context, None)?
    };

    let mut decrypted = false;
    while let Some(event) = progress.next().await {
        decrypted |= matches!(event, DecryptProgress::Success(_));
        writeln!(std::io::stdout(), "{}", report::render(&event))?;
    }

    if decrypted {
        Ok(ExitCode::SUCCESS)
    } else {
        tracing::info!("post not decrypted");
        Ok(ExitCode::FAILURE)
    }
}
