//! Provisioning and diagnostic commands

use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use ivr_core::{CheckStatus, Config, ConfigCheck};
use ivr_twilio::{IncomingNumber, NumberSearch, PurchaseRequest, TwilioClient};

const SMOKE_TEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Simulated incoming call used by `test-webhooks`
const TEST_CALL_FORM: [(&str, &str); 4] = [
    ("From", "+15551234567"),
    ("To", "+15559876543"),
    ("CallSid", "CAtest1234567890"),
    ("AccountSid", "ACtest1234567890"),
];

fn format_check(check: &ConfigCheck) -> String {
    let marker = match check.status {
        CheckStatus::Ok => "ok",
        CheckStatus::Missing => "MISSING",
        CheckStatus::Placeholder => "PLACEHOLDER",
    };
    format!("  [{:>11}] {:<20} {}", marker, check.name, check.display)
}

/// Print the configuration report. Returns false when anything needs attention.
pub fn check_config(config: &Config) -> bool {
    let checks = config.diagnose();

    println!("Configuration for {}", config.business.name);
    for check in &checks {
        println!("{}", format_check(check));
    }
    println!(
        "  mode: {}",
        if config.is_demo_mode() { "demo" } else { "production" }
    );

    let mut issues = checks.iter().filter(|c| !c.is_ok()).count();
    if config.signature_check_unusable() {
        println!("  VALIDATE_SIGNATURES is on without a real TWILIO_AUTH_TOKEN; every webhook would get 403");
        issues += 1;
    }
    if issues == 0 {
        println!("All settings look good.");
        true
    } else {
        println!("{} setting(s) need attention. Set them in .env or ivr-gateway.toml.", issues);
        false
    }
}

fn client(config: &Config) -> anyhow::Result<TwilioClient> {
    TwilioClient::new(
        config.twilio.account_sid.clone(),
        config.twilio.auth_token.clone(),
    )
    .context("TWILIO_ACCOUNT_SID and TWILIO_AUTH_TOKEN must be set")
}

/// Webhook URLs a provisioned number should point at
fn expected_webhooks(config: &Config) -> anyhow::Result<(String, String)> {
    match (config.webhook_url("/voice"), config.webhook_url("/call_status")) {
        (Some(voice), Some(status)) => Ok((voice, status)),
        _ => bail!("WEBHOOK_BASE_URL must be set to configure phone numbers"),
    }
}

/// Search local numbers and buy the `pick`-th one (1-based)
pub async fn setup_number(
    config: &Config,
    country: String,
    area_code: Option<u16>,
    pick: usize,
) -> anyhow::Result<()> {
    let (voice_url, status_url) = expected_webhooks(config)?;
    let client = client(config)?;

    let search = NumberSearch {
        country,
        area_code,
        ..NumberSearch::default()
    };
    let available = client.search_local_numbers(&search).await?;
    if available.is_empty() {
        bail!("No numbers available in {}", search.country);
    }

    println!("Available numbers:");
    for (i, number) in available.iter().enumerate() {
        let place = match (&number.locality, &number.region) {
            (Some(locality), Some(region)) => format!(" ({}, {})", locality, region),
            _ => String::new(),
        };
        println!("  {}. {}{}", i + 1, number.friendly_name, place);
    }

    let chosen = pick
        .checked_sub(1)
        .and_then(|i| available.get(i))
        .ok_or_else(|| anyhow!("--pick must be between 1 and {}", available.len()))?;

    let request = PurchaseRequest::new(&chosen.phone_number, &voice_url, &status_url);
    let purchased = client.purchase_number(&request).await?;

    println!("Purchased {} ({})", purchased.phone_number, purchased.sid);
    println!("  voice webhook:   {}", voice_url);
    println!("  status callback: {}", status_url);
    println!("Set TWILIO_PHONE_NUMBER={} in your environment.", purchased.phone_number);
    Ok(())
}

/// Problems with a number's webhook configuration
fn webhook_mismatches(number: &IncomingNumber, voice_url: &str, status_url: &str) -> Vec<String> {
    let mut problems = Vec::new();
    if number.voice_url.as_deref() != Some(voice_url) {
        problems.push(format!(
            "voice URL is {}, expected {}",
            number.voice_url.as_deref().unwrap_or("unset"),
            voice_url
        ));
    }
    if number.status_callback.as_deref() != Some(status_url) {
        problems.push(format!(
            "status callback is {}, expected {}",
            number.status_callback.as_deref().unwrap_or("unset"),
            status_url
        ));
    }
    problems
}

/// List owned numbers and compare their webhooks with this deployment
pub async fn verify_numbers(config: &Config) -> anyhow::Result<()> {
    let client = client(config)?;

    let account = client.fetch_account().await?;
    println!(
        "Account {} ({}): {}",
        account.friendly_name, account.sid, account.status
    );

    let numbers = client.incoming_numbers().await?;
    if numbers.is_empty() {
        println!("No phone numbers on this account. Run `ivr-gateway setup-number`.");
        return Ok(());
    }

    let expected = expected_webhooks(config).ok();
    if expected.is_none() {
        println!("WEBHOOK_BASE_URL not set; listing numbers without checking webhooks.");
    }

    for number in &numbers {
        println!("{}", number.phone_number);
        let Some((voice_url, status_url)) = &expected else {
            println!("  voice URL: {}", number.voice_url.as_deref().unwrap_or("unset"));
            continue;
        };

        let problems = webhook_mismatches(number, voice_url, status_url);
        if problems.is_empty() {
            println!("  webhooks ok");
        }
        for problem in problems {
            println!("  {}", problem);
        }
    }
    Ok(())
}

/// Add `https://` when no scheme is given and drop the trailing slash
fn normalize_base_url(url: &str) -> String {
    let url = url.trim().trim_end_matches('/');
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}

fn is_xml(content_type: &str) -> bool {
    content_type.contains("xml")
}

fn check_voice_response(content_type: &str, body: &str) -> Result<(), String> {
    if !is_xml(content_type) {
        return Err(format!("expected XML, got {}", content_type));
    }
    for element in ["Gather", "Say"] {
        if !body.contains(element) {
            return Err(format!("response has no <{}>", element));
        }
    }
    Ok(())
}

fn report(name: &str, result: &Result<(), String>) {
    match result {
        Ok(()) => println!("  [ok]   {}", name),
        Err(e) => println!("  [FAIL] {}: {}", name, e),
    }
}

async fn fetch(request: reqwest::RequestBuilder) -> Result<(String, String), String> {
    let response = request.send().await.map_err(|e| e.to_string())?;
    let status = response.status();
    if !status.is_success() {
        return Err(format!("HTTP {}", status));
    }
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let body = response.text().await.map_err(|e| e.to_string())?;
    Ok((content_type, body))
}

/// Smoke-test a deployment. Returns true when every check passes.
pub async fn test_webhooks(base_url: &str) -> anyhow::Result<bool> {
    let base = normalize_base_url(base_url);
    let http = reqwest::Client::builder()
        .timeout(SMOKE_TEST_TIMEOUT)
        .build()?;

    println!("Testing webhooks at {}", base);

    let health = fetch(http.get(format!("{}/health", base)))
        .await
        .and_then(|(_, body)| {
            serde_json::from_str::<serde_json::Value>(&body)
                .map(|_| ())
                .map_err(|e| format!("invalid JSON: {}", e))
        });
    report("GET /health", &health);

    let tts = fetch(http.get(format!("{}/test_tts", base)))
        .await
        .and_then(|(content_type, _)| {
            if is_xml(&content_type) {
                Ok(())
            } else {
                Err(format!("expected XML, got {}", content_type))
            }
        });
    report("GET /test_tts", &tts);

    let voice = fetch(http.post(format!("{}/voice", base)).form(&TEST_CALL_FORM[..]))
        .await
        .and_then(|(content_type, body)| check_voice_response(&content_type, &body));
    report("POST /voice", &voice);

    let passed = health.is_ok() && tts.is_ok() && voice.is_ok();
    if passed {
        println!("All webhook checks passed.");
    } else {
        println!("Some webhook checks failed.");
    }
    Ok(passed)
}
