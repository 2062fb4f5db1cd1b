//! Walks one session through login, refresh, replay and logout
//!
//! Run with: cargo run -p sg_infra --example session_demo
//! Point at Redis with: SG__REVOCATION__BACKEND=redis

use std::sync::Arc;

use anyhow::Context;
use sg_core::{Principal, SystemClock, TokenAttributes, TracingEventSink};
use sg_infra::{build_session_guard, init_tracing, load_settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_settings().context("loading settings")?;
    init_tracing(&config.logging).context("initialising tracing")?;

    let guard = build_session_guard(
        &config,
        Arc::new(SystemClock),
        Arc::new(TracingEventSink),
    )
    .await
    .context("building session guard")?;
    let service = guard.service.clone();

    let attributes = TokenAttributes::new()
        .with("tenant", "acme")?
        .with("mfa", true)?;
    let principal = Principal::new("user-42", ["customer", "beta"], "device-7f3a")
        .with_attributes(attributes);

    println!("\n=== Login ===");
    let login = service.login(&principal).await?;
    println!("family:        {}", login.family_id);
    println!("generation:    {}", login.generation);
    println!("access expiry: {}s", login.access_expires_in);

    let authenticated = service.authenticate(&login.access_token)?;
    println!("authenticated: {} {:?}", authenticated.subject(), authenticated.roles());

    println!("\n=== Refresh ===");
    let rotated = service.refresh(&login.refresh_token).await?;
    println!("generation:    {}", rotated.generation);

    println!("\n=== Replay of the spent refresh token ===");
    match service.refresh(&login.refresh_token).await {
        Ok(_) => println!("unexpected: replay accepted"),
        Err(e) => println!("rejected:      {}", e),
    }
    match service.refresh(&rotated.refresh_token).await {
        Ok(_) => println!("unexpected: family still alive"),
        Err(e) => println!("family dead:   {}", e),
    }

    println!("\n=== New session and logout ===");
    let second = service.login(&principal).await?;
    println!("active sessions: {}", service.active_sessions("user-42").await?.len());
    service.logout(&second.refresh_token).await?;
    println!("active sessions: {}", service.active_sessions("user-42").await?.len());

    guard.shutdown();
    Ok(())
}
