use std::process::ExitCode;

use chrono::{DateTime, Local};
use clap::Parser;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderMap};
use serde_json::{Value, json};

/// 向通知中继推送一条消息
#[derive(Parser)]
#[command(name = "notify")]
#[command(about = "Send a notification to a relay token", long_about = None)]
struct Cli {
    /// 接收通知的令牌
    token: String,

    /// 通知内容
    message: String,

    #[arg(short, long, default_value = "http://localhost:8000")]
    url: String,

    #[arg(long, default_value = "/api/v1")]
    base: String,
}

fn header_or_unknown<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown")
}

fn print_rate_limit(headers: &HeaderMap) {
    let reset = header_or_unknown(headers, "x-ratelimit-reset");
    let reset = reset
        .parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|at| at.with_timezone(&Local).to_rfc2822())
        .unwrap_or_else(|| reset.to_string());

    println!("Rate limit info:");
    println!("  Limit: {}", header_or_unknown(headers, "x-ratelimit-limit"));
    println!("  Remaining: {}", header_or_unknown(headers, "x-ratelimit-remaining"));
    println!("  Reset: {}", reset);
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    println!("Sending notification to token {}...", cli.token);
    println!("Message: {}", cli.message);

    let res = client
        .post(format!("{}{}/notify", cli.url.trim_end_matches('/'), cli.base))
        .header(AUTHORIZATION, format!("Bearer {}", cli.token))
        .json(&json!({ "message": cli.message }))
        .send()
        .await?;

    let status = res.status();
    print_rate_limit(res.headers());

    if status == StatusCode::TOO_MANY_REQUESTS {
        let body: Value = res.json().await.unwrap_or(Value::Null);
        eprintln!("Rate limit exceeded!");
        if let Some(message) = body.get("message").and_then(Value::as_str) {
            eprintln!("{}", message);
        }
        return Ok(ExitCode::FAILURE);
    }

    if !status.is_success() {
        let text = res.text().await.unwrap_or_default();
        eprintln!("Failed to send notification: {} - {}", status, text);
        return Ok(ExitCode::FAILURE);
    }

    let body: Value = res.json().await?;
    println!("Notification sent successfully!");
    println!("Response: {}", serde_json::to_string_pretty(&body)?);

    Ok(ExitCode::SUCCESS)
}
