//! todak-fetch — 게이트웨이 점검용 명령행 도구
//!
//! Usage:
//!   todak-fetch get <target> [--repeat <n>]     Fetch through the gateway
//!   todak-fetch post <target> <json>            POST a JSON body
//!   todak-fetch chat <message>                  Send one chat turn
//!   todak-fetch hint <text>                     Parse a color hint locally
//!   todak-fetch palette [emotion]               Show emotion colors

use anyhow::{bail, Context};
use reqwest::Method;
use todak_fetch::chat::{
    parse_color_hint, strip_color_hint, user_facing_message, ChatClient, ChatMessage, ColorHint,
};
use todak_fetch::emotion::{
    color_name, contrast_text_color, emotion_color, known_emotions, palette_from_base,
};
use todak_fetch::{CachedResponse, Credentials, FetchGateway, FetchOptions};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("todak_fetch=info"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    match args[1].as_str() {
        "get" => cmd_get(&args[2..]).await,
        "post" => cmd_post(&args[2..]).await,
        "chat" => cmd_chat(&args[2..]).await,
        "hint" => cmd_hint(&args[2..]),
        "palette" => cmd_palette(&args[2..]),
        "version" | "--version" | "-V" => {
            println!("todak-fetch {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}

fn print_usage() {
    println!(
        r#"todak-fetch — 토닥톡 fetch gateway tool

USAGE:
    todak-fetch <COMMAND> [OPTIONS]

COMMANDS:
    get <target> [--repeat <n>]   Fetch a URL; --repeat fires n identical requests at once
    post <target> <json>          POST a JSON body with credentials included
    chat <message>                Send a single chat turn to the backend
    hint <text>                   Extract the color hint from a reply (offline)
    palette [emotion]             List emotion colors, or show one
    version                       Show version information
    help                          Show this help message

ENVIRONMENT:
    TODAK_BASE_URL                Base URL for relative targets
    TODAK_SESSION_COOKIE          Cookie sent to the base URL's origin
    TODAK_MAX_RETRIES             Retry budget per request (default 4)
    TODAK_CACHE_TTL_MS            Identity cache lifetime (default 1500)
    RUST_LOG                      Log filter (default todak_fetch=info)"#
    );
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

async fn cmd_get(args: &[String]) -> anyhow::Result<()> {
    let Some(target) = args.first() else {
        bail!("usage: todak-fetch get <target> [--repeat <n>]");
    };
    let repeat = match flag_value(args, "--repeat") {
        Some(n) => n.parse::<usize>().context("--repeat expects a number")?,
        None => 1,
    }
    .max(1);

    let gateway = FetchGateway::from_env()?;
    let calls = (0..repeat).map(|_| gateway.get(target.as_str()));
    let results = futures::future::join_all(calls).await;

    for (i, result) in results.into_iter().enumerate() {
        let resp = result.with_context(|| format!("request #{} failed", i + 1))?;
        if i == 0 {
            print_response(&resp);
        }
    }

    let stats = gateway.stats();
    eprintln!(
        "network attempts: {}, joined: {}, cache hits: {}, retries: {}/{}",
        stats.network_attempts,
        stats.dedup_joins,
        stats.cache_hits,
        stats.rate_limit_retries,
        stats.transport_retries,
    );
    Ok(())
}

async fn cmd_post(args: &[String]) -> anyhow::Result<()> {
    let (Some(target), Some(raw)) = (args.first(), args.get(1)) else {
        bail!("usage: todak-fetch post <target> <json>");
    };
    let body: serde_json::Value = serde_json::from_str(raw).context("body is not valid JSON")?;

    let gateway = FetchGateway::from_env()?;
    let options = FetchOptions::new()
        .method(Method::POST)
        .credentials(Credentials::Include)
        .json(&body)?;
    let resp = gateway.fetch(target.as_str(), options).await?;
    print_response(&resp);
    Ok(())
}

async fn cmd_chat(args: &[String]) -> anyhow::Result<()> {
    if args.is_empty() {
        bail!("usage: todak-fetch chat <message>");
    }
    let message = args.join(" ");

    let chat = ChatClient::new(FetchGateway::from_env()?);
    match chat.send(&[ChatMessage::user(message)]).await {
        Ok(reply) => {
            println!("{}", reply.text);
            if let Some(color) = reply.color {
                println!(
                    "color: {color} {} (text {})",
                    color_name(&color),
                    contrast_text_color(&color)
                );
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", user_facing_message(&e));
            Err(e.into())
        }
    }
}

fn cmd_hint(args: &[String]) -> anyhow::Result<()> {
    if args.is_empty() {
        bail!("usage: todak-fetch hint <text>");
    }
    let text = args.join(" ");

    match parse_color_hint(&text) {
        ColorHint::FoundWithColor { color, fragment } => {
            println!(
                "color: {color} {} (bytes {}..{})",
                color_name(&color),
                fragment.start,
                fragment.end
            );
            if let Some(p) = palette_from_base(&color) {
                println!("palette: {} {} {}", p.light, p.dark, p.shifted);
            }
        }
        ColorHint::FoundWithoutColor { fragment } => {
            println!("fragment without color (bytes {}..{})", fragment.start, fragment.end);
        }
        ColorHint::NotFound => println!("no color hint"),
    }
    println!("visible: {}", strip_color_hint(&text));
    Ok(())
}

fn cmd_palette(args: &[String]) -> anyhow::Result<()> {
    if let Some(emotion) = args.first() {
        let c = emotion_color(emotion);
        println!("{emotion}: {} on {} ({})", c.text, c.background, c.color_name);
        return Ok(());
    }
    for name in known_emotions() {
        let c = emotion_color(name);
        println!("{name:<6} {}  {:<8} {}", c.background, c.text, c.color_name);
    }
    Ok(())
}

fn print_response(resp: &CachedResponse) {
    println!("HTTP {}", resp.status());
    match resp.json_value() {
        Some(v) => match serde_json::to_string_pretty(&v) {
            Ok(pretty) => println!("{pretty}"),
            Err(_) => println!("{}", resp.text()),
        },
        None => println!("{}", resp.text()),
    }
}
