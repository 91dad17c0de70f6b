mod card;

use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use clap::{Args, Parser, Subcommand};
use pricepulse_contracts::chat::{parse_intent, CHAT_HELP_COMMANDS};
use pricepulse_contracts::events::EventWriter;
use pricepulse_contracts::models::ModelRegistry;
use pricepulse_contracts::products::{InputKind, ProductInput};
use pricepulse_engine::{EngineConfig, IgnoreReason, PricePipeline, SubmitOutcome, Tracker};
use serde_json::{json, Map, Value};

#[derive(Debug, Parser)]
#[command(name = "pricepulse", version, about = "Price Pulse product price tracker")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Identify one product and print its price analysis.
    Track(TrackArgs),
    /// Interactive tracking session.
    Chat(ChatArgs),
    /// List known models and their capabilities.
    Models,
}

#[derive(Debug, Args)]
struct EngineArgs {
    #[arg(long)]
    events: Option<PathBuf>,
    /// Use the offline provider; no API key needed.
    #[arg(long)]
    dryrun: bool,
    #[arg(long)]
    identity_model: Option<String>,
    #[arg(long)]
    image_model: Option<String>,
    #[arg(long)]
    valuation_model: Option<String>,
}

#[derive(Debug, Parser)]
struct TrackArgs {
    /// URL, TEXT or IMAGE.
    kind: String,
    /// Link, description, or image path / data URI.
    value: String,
    #[arg(long)]
    json: bool,
    #[command(flatten)]
    engine: EngineArgs,
}

#[derive(Debug, Parser)]
struct ChatArgs {
    #[command(flatten)]
    engine: EngineArgs,
}

struct Session {
    pipeline: PricePipeline,
    events: EventWriter,
    currency: String,
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("pricepulse error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Track(args) => run_track(args),
        Command::Chat(args) => {
            run_chat(args)?;
            Ok(0)
        }
        Command::Models => {
            run_models();
            Ok(0)
        }
    }
}

fn engine_config(args: &EngineArgs) -> Result<EngineConfig> {
    let mut config = if args.dryrun {
        EngineConfig::dryrun()
    } else {
        EngineConfig::from_env()?
    };
    if let Some(model) = non_empty(args.identity_model.as_deref()) {
        config.identity_model = Some(model);
    }
    if let Some(model) = non_empty(args.image_model.as_deref()) {
        config.image_model = Some(model);
    }
    if let Some(model) = non_empty(args.valuation_model.as_deref()) {
        config.valuation_model = Some(model);
    }
    Ok(config)
}

fn start_session(args: &EngineArgs, mode: &str) -> Result<Session> {
    let config = engine_config(args)?;
    let session_id = format!("session-{}", unix_epoch_millis());
    let events = match args.events.as_ref() {
        Some(path) => EventWriter::new(path, session_id),
        None => EventWriter::discard(session_id),
    };
    events.record(
        "session_started",
        event_payload(json!({
            "mode": mode,
            "dryrun": args.dryrun,
            "region": config.market.region,
            "currency": config.market.currency,
        })),
    );
    let pipeline = PricePipeline::new(&config, events.clone())?;
    Ok(Session {
        pipeline,
        events,
        currency: config.market.currency,
    })
}

fn run_track(args: TrackArgs) -> Result<i32> {
    let kind: InputKind = args.kind.parse()?;
    let input = build_input(kind, &args.value)?;
    let session = start_session(&args.engine, "track")?;
    let mut tracker = Tracker::new(session.events.clone());

    match tracker.submit(&session.pipeline, &input) {
        SubmitOutcome::Added(product) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&product)?);
            } else {
                print!("{}", card::render_card(&product, &session.currency));
            }
            Ok(0)
        }
        SubmitOutcome::Failed(message) => {
            eprintln!("{message}");
            Ok(1)
        }
        SubmitOutcome::Ignored(reason) => {
            eprintln!("{}", ignored_message(reason));
            Ok(1)
        }
    }
}

fn run_chat(args: ChatArgs) -> Result<()> {
    let session = start_session(&args.engine, "chat")?;
    let mut tracker = Tracker::new(session.events.clone());
    let models = session.pipeline.models();
    println!(
        "Price Pulse chat started ({} / {}). Type /help for commands.",
        models.identify.name, models.valuation.name
    );

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        let read = match stdin.read_line(&mut line) {
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        if read == 0 {
            break;
        }

        let intent = parse_intent(line.trim_end_matches(['\n', '\r']));
        match intent.action.as_str() {
            "noop" => {}
            "help" => println!("Commands: {}", CHAT_HELP_COMMANDS.join(" ")),
            "quit" => break,
            "track" => {
                let kind = intent.arg("kind").unwrap_or_default();
                let Some(value) = intent.arg("value") else {
                    println!("Nothing to track. Give a link, a description or an image path.");
                    continue;
                };
                let parsed = kind
                    .parse::<InputKind>()
                    .map_err(anyhow::Error::from)
                    .and_then(|kind| build_input(kind, value));
                let input = match parsed {
                    Ok(input) => input,
                    Err(err) => {
                        println!("{err:#}");
                        continue;
                    }
                };
                println!("Analyzing...");
                match tracker.submit(&session.pipeline, &input) {
                    SubmitOutcome::Added(product) => {
                        print!("{}", card::render_card(&product, &session.currency));
                    }
                    SubmitOutcome::Failed(message) => println!("{message}"),
                    SubmitOutcome::Ignored(reason) => println!("{}", ignored_message(reason)),
                }
            }
            "list" => {
                if tracker.products().is_empty() {
                    println!("No products tracked yet.");
                }
                for product in tracker.products() {
                    println!("{}", card::summary_line(product, &session.currency));
                }
            }
            "show" => match intent.arg("id").and_then(|id| tracker.get(id)) {
                Some(product) => print!("{}", card::render_card(product, &session.currency)),
                None => println!("{}", unknown_product(intent.arg("id"))),
            },
            "toggle_notifications" => {
                match intent
                    .arg("id")
                    .and_then(|id| tracker.toggle_notifications(id))
                {
                    Some(true) => println!("Notifications on."),
                    Some(false) => println!("Notifications off."),
                    None => println!("{}", unknown_product(intent.arg("id"))),
                }
            }
            "remove" => match intent.arg("id").and_then(|id| tracker.remove_product(id)) {
                Some(product) => println!("Removed {}.", product.name),
                None => println!("{}", unknown_product(intent.arg("id"))),
            },
            _ => {
                let command = intent.arg("command").unwrap_or_default();
                println!("Unknown command /{command}. Type /help for commands.");
            }
        }
    }
    Ok(())
}

fn run_models() {
    for model in ModelRegistry::default().list() {
        let capabilities = model
            .capabilities
            .iter()
            .map(|capability| capability.as_str())
            .collect::<Vec<&str>>()
            .join(", ");
        println!("{:<24} {:<8} {capabilities}", model.name, model.provider);
    }
}

/// Builds a typed input. IMAGE values may be a data URI or a path to an
/// image file, which is inlined as a data URI.
fn build_input(kind: InputKind, value: &str) -> Result<ProductInput> {
    let value = value.trim();
    if value.is_empty() {
        bail!("{kind} input needs a value");
    }
    match kind {
        InputKind::Image if !value.starts_with("data:") => {
            Ok(ProductInput::image(read_image_as_data_url(Path::new(value))?))
        }
        _ => Ok(ProductInput::new(kind, value)),
    }
}

fn read_image_as_data_url(path: &Path) -> Result<String> {
    let bytes =
        fs::read(path).with_context(|| format!("failed to read image {}", path.display()))?;
    let mime = image::guess_format(&bytes)
        .map(|format| format.to_mime_type())
        .unwrap_or_else(|_| guess_image_mime(path));
    Ok(format!("data:{mime};base64,{}", BASE64.encode(bytes)))
}

fn guess_image_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "heic" | "heif" => "image/heic",
        _ => "image/png",
    }
}

fn ignored_message(reason: IgnoreReason) -> &'static str {
    match reason {
        IgnoreReason::Busy => "A product is already being analyzed.",
        IgnoreReason::BlankInput => "Nothing to track.",
    }
}

fn unknown_product(id: Option<&str>) -> String {
    match id {
        Some(id) => format!("No tracked product with id {id}."),
        None => "A product id is required.".to_string(),
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn event_payload(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn unix_epoch_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use image::{Rgb, RgbImage};
    use pricepulse_contracts::products::InputKind;

    use super::{build_input, engine_config, guess_image_mime, Cli, Command};

    #[test]
    fn track_args_parse_with_overrides() {
        let cli = Cli::try_parse_from([
            "pricepulse",
            "track",
            "text",
            "Sony WH-1000XM5",
            "--dryrun",
            "--json",
            "--valuation-model",
            "gemini-2.5-flash",
        ])
        .unwrap();
        let Command::Track(args) = cli.command else {
            panic!("expected track");
        };
        assert_eq!(args.kind, "text");
        assert!(args.json);
        assert!(args.engine.dryrun);

        let config = engine_config(&args.engine).unwrap();
        assert_eq!(config.valuation_model.as_deref(), Some("gemini-2.5-flash"));
        assert_eq!(config.identity_model.as_deref(), Some("dryrun-1"));
    }

    #[test]
    fn image_path_becomes_sniffed_data_uri() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("photo.bin");
        RgbImage::from_pixel(2, 2, Rgb([200, 10, 10]))
            .save_with_format(&path, image::ImageFormat::Png)?;

        let input = build_input(InputKind::Image, path.to_str().unwrap())?;
        assert_eq!(input.kind, InputKind::Image);
        assert!(input.value.starts_with("data:image/png;base64,"));
        assert_eq!(input.image_payload()?.mime_type, "image/png");
        Ok(())
    }

    #[test]
    fn data_uri_and_text_pass_through() -> anyhow::Result<()> {
        let input = build_input(InputKind::Image, " data:image/jpeg;base64,/9j/ ")?;
        assert_eq!(input.value, "data:image/jpeg;base64,/9j/");
        let input = build_input(InputKind::Text, "Kindle")?;
        assert_eq!(input.value, "Kindle");
        assert!(build_input(InputKind::Url, "  ").is_err());
        Ok(())
    }

    #[test]
    fn missing_image_file_is_an_error() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let missing = temp.path().join("nope.jpg");
        let err = build_input(InputKind::Image, missing.to_str().unwrap()).unwrap_err();
        assert!(format!("{err:#}").contains("failed to read image"));
        assert_eq!(guess_image_mime(&missing), "image/jpeg");
        Ok(())
    }
}
