use miette::{miette, IntoDiagnostic};
use serde_json::json;

// Posts a rendered figure to a Bluesky feed. Credentials come from the
// BSKY_HANDLE and BSKY_APP_PASSWORD environment variables; pass the uri and
// cid of an earlier post to reply to it instead of posting top-level.
fn main() -> miette::Result<()> {
    let image = std::env::args().nth(1).expect("Missing image file");
    let text = std::env::args().nth(2).unwrap_or_default();
    let alt = std::env::args().nth(3).unwrap_or_default();
    let reply_uri = std::env::args().nth(4);
    let reply_cid = std::env::args().nth(5);

    let handle = std::env::var("BSKY_HANDLE").into_diagnostic()?;
    let password = std::env::var("BSKY_APP_PASSWORD").into_diagnostic()?;

    let session: serde_json::Value =
        ureq::post("https://bsky.social/xrpc/com.atproto.server.createSession")
            .send_json(json!({ "identifier": handle, "password": password }))
            .into_diagnostic()?
            .into_json()
            .into_diagnostic()?;
    let token = session["accessJwt"]
        .as_str()
        .ok_or_else(|| miette!("no access token in the session response"))?;
    let did = session["did"]
        .as_str()
        .ok_or_else(|| miette!("no did in the session response"))?;

    let bytes = std::fs::read(&image).into_diagnostic()?;
    let mime = if image.ends_with(".png") {
        "image/png"
    } else {
        "image/jpeg"
    };
    let upload: serde_json::Value =
        ureq::post("https://bsky.social/xrpc/com.atproto.repo.uploadBlob")
            .set("Authorization", &format!("Bearer {token}"))
            .set("Content-Type", mime)
            .send_bytes(&bytes)
            .into_diagnostic()?
            .into_json()
            .into_diagnostic()?;

    let mut record = json!({
        "$type": "app.bsky.feed.post",
        "text": text,
        "createdAt": created_at(),
        "langs": ["en", "de"],
        "embed": {
            "$type": "app.bsky.embed.images",
            "images": [{
                "image": upload["blob"],
                "alt": alt,
                "aspectRatio": { "width": 2, "height": 1 },
            }],
        },
    });
    if let Some(reply) = reply_to(reply_uri, reply_cid) {
        record["reply"] = reply;
    }

    let response: serde_json::Value =
        ureq::post("https://bsky.social/xrpc/com.atproto.repo.createRecord")
            .set("Authorization", &format!("Bearer {token}"))
            .send_json(json!({
                "repo": did,
                "collection": "app.bsky.feed.post",
                "record": record,
            }))
            .into_diagnostic()?
            .into_json()
            .into_diagnostic()?;

    println!("Posted {}", response["uri"].as_str().unwrap_or("(no uri)"));
    Ok(())
}

// Replying to a top-level post points both references at the root.
fn reply_to(root_uri: Option<String>, root_cid: Option<String>) -> Option<serde_json::Value> {
    let uri = root_uri?;
    let cid = root_cid?;
    let root = json!({ "uri": uri, "cid": cid });
    Some(json!({ "root": root, "parent": root }))
}

fn created_at() -> String {
    let now = time::OffsetDateTime::now_utc();
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        now.year(),
        u8::from(now.month()),
        now.day(),
        now.hour(),
        now.minute(),
        now.second()
    )
}
