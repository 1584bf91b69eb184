use crate::api_client::ApiClient;
use crate::output::TestResult;
use crate::sse_client::{Connection, UNNAMED_EVENT};
use anyhow::Result;
use colored::*;
use serde_json::json;
use std::time::{Duration, Instant};

const EVENT_TIMEOUT: Duration = Duration::from_secs(5);
const QUIET_WINDOW: Duration = Duration::from_secs(1);

pub struct TestUser {
    pub user_id: String,
    pub label: String,
}

/// Both users receive the greeting and show up in the client listing.
pub async fn test_connection(
    user1: &TestUser,
    user2: &TestUser,
    api_client: &ApiClient,
    sse1: &mut Connection,
    sse2: &mut Connection,
) -> Result<TestResult> {
    let name = "Connection";
    println!("\n{} Running {} scenario...", "→".blue(), name);
    let start = Instant::now();

    for sse in [&mut *sse1, &mut *sse2] {
        let greeting = match sse.wait_for_event(UNNAMED_EVENT, EVENT_TIMEOUT).await {
            Ok(event) => event,
            Err(e) => return Ok(TestResult::fail(name, start.elapsed(), e.to_string())),
        };
        if greeting.data != json!("Hi") {
            return Ok(TestResult::fail(
                name,
                start.elapsed(),
                format!("{} got greeting {}", sse.user_label, greeting.data),
            ));
        }
        println!("{} {} received greeting", "✓".green(), sse.user_label);
    }

    let connected = api_client.connected_users().await?;
    for user in [user1, user2] {
        if !connected.contains(&user.user_id) {
            return Ok(TestResult::fail(
                name,
                start.elapsed(),
                format!("{} missing from client listing", user.label),
            ));
        }
    }

    Ok(TestResult::pass(name, start.elapsed()))
}

/// A targeted publish reaches only its recipient.
pub async fn test_send_to(
    user1: &TestUser,
    _user2: &TestUser,
    api_client: &ApiClient,
    sse1: &mut Connection,
    sse2: &mut Connection,
) -> Result<TestResult> {
    let name = "SendTo";
    println!("\n{} Running {} scenario...", "→".blue(), name);
    let start = Instant::now();

    let payload = json!({"message": "Hello", "from": "sse-test-client"});
    let status = api_client
        .publish(Some("greeting"), payload.clone(), Some(&user1.user_id))
        .await?;
    if status != "delivered" {
        return Ok(TestResult::fail(
            name,
            start.elapsed(),
            format!("publish returned status {status}"),
        ));
    }

    match sse1.wait_for_event("greeting", EVENT_TIMEOUT).await {
        Ok(event) if event.data == payload => {
            println!("{} {} received targeted event", "✓".green(), sse1.user_label)
        }
        Ok(event) => {
            return Ok(TestResult::fail(
                name,
                start.elapsed(),
                format!("unexpected payload {}", event.data),
            ))
        }
        Err(e) => return Ok(TestResult::fail(name, start.elapsed(), e.to_string())),
    }

    if let Err(e) = sse2.expect_no_event("greeting", QUIET_WINDOW).await {
        return Ok(TestResult::fail(name, start.elapsed(), e.to_string()));
    }
    println!("{} {} did not receive it", "✓".green(), sse2.user_label);

    let missing = api_client
        .publish(Some("greeting"), payload, Some("sse-test-client-nobody"))
        .await?;
    if missing != "not_delivered" {
        return Ok(TestResult::fail(
            name,
            start.elapsed(),
            format!("publish to unknown user returned {missing}"),
        ));
    }

    Ok(TestResult::pass(name, start.elapsed()))
}

/// A broadcast reaches every connected user.
pub async fn test_broadcast(
    _user1: &TestUser,
    _user2: &TestUser,
    api_client: &ApiClient,
    sse1: &mut Connection,
    sse2: &mut Connection,
) -> Result<TestResult> {
    let name = "Broadcast";
    println!("\n{} Running {} scenario...", "→".blue(), name);
    let start = Instant::now();

    let payload = json!({"message": "Hey everyone"});
    let status = api_client
        .publish(Some("announcement"), payload.clone(), None)
        .await?;
    if status != "broadcasted" {
        return Ok(TestResult::fail(
            name,
            start.elapsed(),
            format!("publish returned status {status}"),
        ));
    }

    for sse in [&mut *sse1, &mut *sse2] {
        match sse.wait_for_event("announcement", EVENT_TIMEOUT).await {
            Ok(event) if event.data == payload => {
                println!("{} {} received broadcast", "✓".green(), sse.user_label)
            }
            Ok(event) => {
                return Ok(TestResult::fail(
                    name,
                    start.elapsed(),
                    format!("unexpected payload {}", event.data),
                ))
            }
            Err(e) => return Ok(TestResult::fail(name, start.elapsed(), e.to_string())),
        }
    }

    Ok(TestResult::pass(name, start.elapsed()))
}

/// Reconnecting as an already connected user ends the older stream and
/// routes new events to the replacement.
pub async fn test_replace(
    base_url: &str,
    identity_header: &str,
    user1: &TestUser,
    api_client: &ApiClient,
    sse1: &mut Connection,
) -> Result<TestResult> {
    let name = "Replace";
    println!("\n{} Running {} scenario...", "→".blue(), name);
    let start = Instant::now();

    let mut replacement = Connection::establish(
        base_url,
        identity_header,
        &user1.user_id,
        format!("{} (replacement)", user1.label),
    )
    .await?;
    if let Err(e) = replacement.wait_for_event(UNNAMED_EVENT, EVENT_TIMEOUT).await {
        return Ok(TestResult::fail(name, start.elapsed(), e.to_string()));
    }

    if let Err(e) = sse1.wait_for_close(EVENT_TIMEOUT).await {
        return Ok(TestResult::fail(name, start.elapsed(), e.to_string()));
    }
    println!("{} Old stream for {} was closed", "✓".green(), user1.label);

    let payload = json!({"message": "still here"});
    api_client
        .publish(Some("greeting"), payload.clone(), Some(&user1.user_id))
        .await?;
    match replacement.wait_for_event("greeting", EVENT_TIMEOUT).await {
        Ok(event) if event.data == payload => Ok(TestResult::pass(name, start.elapsed())),
        Ok(event) => Ok(TestResult::fail(
            name,
            start.elapsed(),
            format!("unexpected payload {}", event.data),
        )),
        Err(e) => Ok(TestResult::fail(name, start.elapsed(), e.to_string())),
    }
}
